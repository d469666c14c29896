//! Configuration epochs and the request context that carries them
//!
//! Every observed change to the dataset or query configuration advances the
//! epoch. Requests capture the epoch they were issued under, and a response
//! is only applied while that epoch is still current.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Monotonically increasing configuration snapshot token
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Epoch(u64);

impl Epoch {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Advance in place and return the new epoch
    pub fn advance(&mut self) -> Epoch {
        self.0 += 1;
        *self
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one issued request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub epoch: Epoch,
    pub request_id: Uuid,
    pub issued_at: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(epoch: Epoch) -> Self {
        Self {
            epoch,
            request_id: Uuid::new_v4(),
            issued_at: Utc::now(),
        }
    }

    pub fn is_current(&self, current: Epoch) -> bool {
        self.epoch == current
    }
}

/// A cached result together with the epoch it was computed for
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Versioned<T> {
    pub value: T,
    pub epoch: Epoch,
    pub updated_at: DateTime<Utc>,
}

impl<T> Versioned<T> {
    pub fn new(value: T, epoch: Epoch) -> Self {
        Self {
            value,
            epoch,
            updated_at: Utc::now(),
        }
    }

    /// Whether the result still describes the current configuration
    pub fn is_fresh(&self, current: Epoch) -> bool {
        self.epoch == current
    }
}
