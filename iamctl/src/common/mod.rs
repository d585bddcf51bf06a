pub mod config;
pub mod credentials;
pub mod session;
pub mod types;

pub use credentials::CredentialContext;
pub use session::Session;
pub use types::*;
