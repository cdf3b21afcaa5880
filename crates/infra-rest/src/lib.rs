mod adapter;

pub use adapter::{normalize_host, ImportClient, RemoteConfig};
