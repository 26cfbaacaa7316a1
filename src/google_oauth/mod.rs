pub mod client_secrets;
pub mod credentials;
pub mod endpoints;
pub mod service;
