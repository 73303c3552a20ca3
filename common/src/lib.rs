//! Types shared by every crate in the reflex workspace.
//!
//! ## Architecture
//!
//! - **common** (this crate): error location tracking used by all error enums
//! - **reflex-client**: connection, event encoding and session logic
//! - **reflex**: terminal client wiring everything together

pub mod error;

pub use error::error_location::ErrorLocation;
