mod archive;
mod dispatch;
mod extract;
mod filter;
mod scratch;
mod service;

#[cfg(test)]
mod testing;

pub use archive::{normalize, Normalized};
pub use dispatch::{dispatch_all, resolve_import};
pub use extract::save_attachments;
pub use filter::SubjectFilter;
pub use scratch::{CleanupSummary, Scratch};
pub use service::{ImportService, RunSettings};
