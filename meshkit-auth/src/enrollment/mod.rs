//! Credentials accepted by the controller's signing endpoints.
//!
//! A node proves it may join the overlay in one of two ways:
//! 1. A [`BearerToken`] obtained from an interactive federated login, sent
//!    as `Authorization: Bearer` to the signing endpoint
//! 2. A pre-issued [`OneTimeToken`], sent in the body of an enrollment request
//!
//! Neither token is validated locally beyond being non-empty; the controller
//! decides whether it is acceptable. Both redact their value from `Debug`.

mod error;
mod token;

pub use error::EnrollmentError;
pub use token::{BearerToken, OneTimeToken};
