//! Snowflake IDs: 64-bit, time-ordered, unique across workers
//!
//! Layout: 41 bits of milliseconds since a custom epoch, 10 bits of worker
//! ID, 12 bits of per-millisecond sequence. Serialized as a string in JSON
//! because the full range does not fit a JavaScript number.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

const TIMESTAMP_SHIFT: i64 = 22;
const WORKER_SHIFT: i64 = 12;
const SEQUENCE_BITS: i64 = 12;
const SEQUENCE_MASK: i64 = (1 << SEQUENCE_BITS) - 1;
const MAX_WORKER_ID: u16 = 1 << 10;

/// A 64-bit time-ordered unique ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Snowflake(i64);

impl Snowflake {
    /// Custom epoch: 2024-01-01 00:00:00 UTC (milliseconds)
    pub const EPOCH: i64 = 1_704_067_200_000;

    #[inline]
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[inline]
    #[must_use]
    pub const fn into_inner(self) -> i64 {
        self.0
    }

    /// Zero is the "not yet assigned" sentinel
    #[inline]
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Milliseconds since the Unix epoch at which this ID was minted
    #[inline]
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        (self.0 >> TIMESTAMP_SHIFT) + Self::EPOCH
    }

    pub fn parse(s: &str) -> Result<Self, SnowflakeParseError> {
        s.parse::<i64>()
            .map(Snowflake)
            .map_err(|_| SnowflakeParseError::InvalidFormat)
    }
}

/// Error when parsing a Snowflake from string
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SnowflakeParseError {
    #[error("invalid snowflake format")]
    InvalidFormat,
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for Snowflake {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<Snowflake> for i64 {
    fn from(id: Snowflake) -> Self {
        id.0
    }
}

impl std::str::FromStr for Snowflake {
    type Err = SnowflakeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Snowflake::parse(s)
    }
}

impl Serialize for Snowflake {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct IdVisitor;

        impl<'de> Visitor<'de> for IdVisitor {
            type Value = Snowflake;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a snowflake ID as a string or integer")
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Snowflake, E> {
                Ok(Snowflake(value))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Snowflake, E> {
                i64::try_from(value)
                    .map(Snowflake)
                    .map_err(|_| E::custom("snowflake out of range"))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Snowflake, E> {
                Snowflake::parse(value).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// Lock-free Snowflake generator
///
/// The last-issued (timestamp, sequence) pair is packed into a single atomic
/// word and advanced with compare-and-swap, so concurrent callers never
/// block and never repeat an ID. A clock that jumps backwards is tolerated:
/// the generator keeps sequencing against the last observed timestamp.
pub struct SnowflakeGenerator {
    worker_id: u16,
    state: AtomicI64,
}

impl SnowflakeGenerator {
    /// # Panics
    /// Panics if `worker_id` >= 1024 (it must fit the 10-bit field).
    #[must_use]
    pub fn new(worker_id: u16) -> Self {
        assert!(worker_id < MAX_WORKER_ID, "Worker ID must be < 1024");
        Self {
            worker_id,
            state: AtomicI64::new(0),
        }
    }

    /// Mint the next ID. Spins briefly when a single millisecond's 4096
    /// sequence numbers are exhausted.
    pub fn generate(&self) -> Snowflake {
        loop {
            let now = Self::clock_millis();
            let current = self.state.load(Ordering::Acquire);
            let (last, seq) = (current >> SEQUENCE_BITS, current & SEQUENCE_MASK);

            let (timestamp, sequence) = if now > last {
                (now, 0)
            } else if seq < SEQUENCE_MASK {
                (last, seq + 1)
            } else {
                while Self::clock_millis() <= last {
                    std::hint::spin_loop();
                }
                continue;
            };

            let next = (timestamp << SEQUENCE_BITS) | sequence;
            if self
                .state
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                let id = ((timestamp - Snowflake::EPOCH) << TIMESTAMP_SHIFT)
                    | (i64::from(self.worker_id) << WORKER_SHIFT)
                    | sequence;
                return Snowflake::new(id);
            }
        }
    }

    #[inline]
    fn clock_millis() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as i64)
    }
}

impl Default for SnowflakeGenerator {
    fn default() -> Self {
        Self::new(0)
    }
}
