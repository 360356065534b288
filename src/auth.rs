//! Access tokens, their embedded claims, and the session contract used to attach them.

pub mod claims;
pub mod session;
pub mod token;

pub use claims::*;
pub use session::*;
pub use token::*;
