//! Stored Value Module
//!
//! Defines a single value held by the in-process store, with optional expiry.

use std::time::Duration;

use tokio::time::Instant;

// == Stored Value ==
/// Raw bytes plus an optional deadline after which the value is invisible.
#[derive(Debug, Clone)]
pub struct StoredValue {
    /// The stored bytes
    pub data: Vec<u8>,
    /// Instant at which the value expires, None = no expiration
    pub expires_at: Option<Instant>,
}

impl StoredValue {
    // == Constructors ==
    /// Creates a value that never expires.
    pub fn persistent(data: Vec<u8>) -> Self {
        Self {
            data,
            expires_at: None,
        }
    }

    /// Creates a value that expires `ttl` from now.
    pub fn expiring(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: Some(Instant::now() + ttl),
        }
    }

    // == Is Expired ==
    /// Checks if the value has expired.
    ///
    /// A value is visible only while the current time is strictly before
    /// `expires_at`; at the deadline itself it is already expired.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => Instant::now() >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, or None if no expiration is set.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(Instant::now()))
    }
}
