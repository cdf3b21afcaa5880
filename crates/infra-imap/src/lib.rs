mod adapter;

pub use adapter::{ImapMailbox, MailConfig};
