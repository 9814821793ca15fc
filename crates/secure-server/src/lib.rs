//! `secure-server` — end-to-end payload encryption for an HTTP API.
//!
//! Every JSON body and every `encrypted=` query string exchanged with an
//! authenticated client is sealed with AES-256-GCM under a key derived from
//! the client's bearer token and session id. Decrypted requests must carry a
//! fresh `_timestamp` or they are rejected as replays.
//!
//! The HTTP layer talks to the crypto core only through
//! [`gateway::EncryptionGateway`].

pub mod config;
pub mod crypto;
pub mod gateway;
pub mod keys;
pub mod server;
pub mod telemetry;
