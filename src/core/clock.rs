//! Ledger clock supplied to every program operation

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// The ledger's notion of "now", in unix seconds
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Clock {
    pub unix_timestamp: i64,
}

impl Clock {
    pub fn new(unix_timestamp: i64) -> Self {
        Self { unix_timestamp }
    }

    /// Wall clock, used by the CLI and API front ends
    pub fn now() -> Self {
        Self::new(Utc::now().timestamp())
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.unix_timestamp, 0).single()
    }
}
