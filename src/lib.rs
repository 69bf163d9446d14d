//! packet-log: a request/reply text logging server
//!
//! The server receives text messages one at a time and answers each one:
//! - any message is appended to a log file as `Packet #<n>: <message>`
//!   and acknowledged with `hello from server (packet #<n>)`
//! - the message `show` returns the whole log file instead
//!
//! Features:
//! - Length-prefixed framing over TCP, one reply per request
//! - Append-only log file that survives restarts
//! - Graceful shutdown on Ctrl-C
//! - Configuration via CLI arguments or TOML file

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod server;
pub mod storage;

pub use client::{send_once, Client};
pub use config::Config;
pub use error::{StoreError, TransportError};
pub use handler::MessageHandler;
pub use protocol::Request;
pub use server::Server;
pub use storage::{Contents, LogStore};
