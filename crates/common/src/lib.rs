//! Common types, wire constants, and errors shared across `secure-server` crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
pub use protocol::Payload;
