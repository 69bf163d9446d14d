//! Message handler: turns one request into one reply.
//!
//! The handler owns the session counter and the packet log. A write
//! request appends `Packet #<n>: <message>` and acknowledges with the same
//! `n`; a `show` request returns the whole log untouched.

use tracing::{debug, info};

use crate::error::StoreError;
use crate::protocol::Request;
use crate::storage::{Contents, LogStore};

/// Reply to `show` when the log file exists but holds nothing
pub const EMPTY_REPLY: &str = "file is empty";

/// Reply to `show` when the log file has never been created
pub const MISSING_REPLY: &str = "file does not exist";

/// Format the log line for packet `n`
pub fn format_entry(n: u64, message: &str) -> String {
    format!("Packet #{n}: {message}")
}

/// Format the acknowledgement for packet `n`
pub fn format_ack(n: u64) -> String {
    format!("hello from server (packet #{n})")
}

/// Request handler with its session state
#[derive(Debug)]
pub struct MessageHandler {
    /// Number of packets logged by this process
    counter: u64,
    store: LogStore,
}

impl MessageHandler {
    /// Create a handler with a fresh session counter
    pub fn new(store: LogStore) -> Self {
        Self { counter: 0, store }
    }

    /// Packets logged so far in this session
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// The backing log
    pub fn store(&self) -> &LogStore {
        &self.store
    }

    /// Handle one request.
    ///
    /// On error nothing has been written and the counter is unchanged.
    pub fn handle(&mut self, request: Request) -> Result<String, StoreError> {
        match request {
            Request::ReadAll => self.show(),
            Request::Write(message) => self.write(&message),
        }
    }

    fn show(&self) -> Result<String, StoreError> {
        let reply = match self.store.read_all()? {
            Contents::Text(text) => text,
            Contents::Empty => {
                info!("Log file is empty");
                EMPTY_REPLY.to_string()
            }
            Contents::Missing => {
                info!("Log file does not exist");
                MISSING_REPLY.to_string()
            }
        };
        debug!(bytes = reply.len(), "Showing log");
        Ok(reply)
    }

    fn write(&mut self, message: &str) -> Result<String, StoreError> {
        let next = self
            .counter
            .checked_add(1)
            .ok_or(StoreError::CounterExhausted)?;

        self.store.append(&format_entry(next, message))?;
        self.counter = next;

        debug!(packet = next, "Logged packet");
        Ok(format_ack(next))
    }
}
