pub mod bulk;
pub mod credential_store;
pub mod playlist_ops;
pub mod usage;
