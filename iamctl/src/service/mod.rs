pub mod accounts;
mod error;
pub mod users;
mod validation;

pub use accounts::AccountService;
pub use error::{ServiceError, ServiceResult};
pub use users::{AccountLogin, UserService};
