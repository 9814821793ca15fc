//! Structured logging and optional OpenTelemetry span export.
//!
//! # Telemetry invariants
//!
//! - **No key material, bearer tokens, session ids, or decrypted payloads**
//!   may appear in any span attribute or log field.
//! - Decryption failure reasons are logged on the `security` target only.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`) or `RUST_LOG`.

pub mod init;

pub use init::{init_telemetry, shutdown_telemetry};
