//! Credential, grant, and token models exchanged with the token endpoint.

pub mod credentials;
pub mod grant;
pub mod secret;
pub mod token;

pub use credentials::*;
pub use grant::*;
pub use secret::*;
pub use token::*;
