//! Write queue and dispatcher configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::DEFAULT_MAX_CHUNK_SIZE;
use crate::errors::LinkError;
use crate::Result;

// ----------------------------------------------------------------------------
// Write Queue Configuration
// ----------------------------------------------------------------------------

/// Pacing and fragmentation for outbound messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Largest payload handed to a single channel write
    pub max_chunk_size: usize,
    /// Pause between chunks of the same message
    #[serde(with = "duration_ms", rename = "chunk_delay_ms")]
    pub chunk_delay: Duration,
    /// Pause before the single retry of a busy write
    #[serde(with = "duration_ms", rename = "busy_retry_delay_ms")]
    pub busy_retry_delay: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            chunk_delay: Duration::ZERO,
            busy_retry_delay: Duration::from_millis(30),
        }
    }
}

impl QueueConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_chunk_size(mut self, size: usize) -> Self {
        self.max_chunk_size = size;
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    pub fn with_busy_retry_delay(mut self, delay: Duration) -> Self {
        self.busy_retry_delay = delay;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_size == 0 {
            return Err(LinkError::Config("max_chunk_size must be at least 1".into()));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Dispatcher Configuration
// ----------------------------------------------------------------------------

/// Hold-to-repeat timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Cadence of `hold` packets while a direction is pressed
    #[serde(with = "duration_ms", rename = "hold_interval_ms")]
    pub hold_interval: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            hold_interval: Duration::from_millis(140),
        }
    }
}

impl DispatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hold_interval(mut self, interval: Duration) -> Self {
        self.hold_interval = interval;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.hold_interval.is_zero() {
            return Err(LinkError::Config("hold_interval must be non-zero".into()));
        }
        Ok(())
    }
}

/// Durations as whole milliseconds in config files
pub mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
