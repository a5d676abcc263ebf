//! Data models
//!
//! Documents stored by the guide and the request payloads that create or
//! change them:
//! - Park documents, with create/update payloads and query filters
//! - Users and their auth tokens
//! - Field validation errors shared by both

mod id;
mod park;
mod token;
mod user;
mod validation;

pub use id::DocumentId;
pub use park::{CreateParkInput, NewPark, Park, ParkFilter, ParkPatch, UpdateParkInput, MIN_TEXT_LENGTH};
pub use token::{AuthToken, ACCESS_AUTH};
pub use user::{Credentials, NewUser, User};
pub use validation::{ValidationError, ValidationErrors};
