//! Authentication service models

pub mod account;
pub mod role;
pub mod session;

// Re-export for convenience
pub use account::{Account, LoginCredentials, NewAccount};
pub use role::{Role, UnknownRole};
pub use session::{NewRefreshSession, RefreshSession};
