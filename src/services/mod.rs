//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They own
//! validation, ownership rules and token handling, and report failures as
//! typed errors the API layer maps to responses.

pub mod park;
pub mod password;
pub mod user;

pub use park::{ParkService, ParkServiceError};
pub use user::{UserService, UserServiceError};
