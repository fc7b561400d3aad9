pub mod middleware;
pub mod service;
pub mod token;

pub use service::AuthService;
pub use token::{AccessClaims, TokenSigner};
