//! Device clock records.

use serde::{Deserialize, Serialize};

/// Per-device synchronization watermarks.
///
/// One row exists per `(userId, deviceId)`. `lastPullAt` is the version
/// watermark up to which the device has applied a full pull response;
/// `updatedAt` records the device's last successful push. Both advance
/// only after the corresponding step fully succeeds, never on a partial
/// or interrupted cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceClock {
    /// Device identifier.
    pub device_id: String,
    /// Version watermark of the last fully applied pull.
    #[serde(default)]
    pub last_pull_at: i64,
    /// Time of the last successful push, Unix milliseconds.
    #[serde(default)]
    pub updated_at: i64,
}

impl DeviceClock {
    /// Creates a fresh clock for a device with zeroed watermarks.
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            last_pull_at: 0,
            updated_at: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_clock_is_zeroed() {
        let clock = DeviceClock::new("device-a");
        assert_eq!(clock.last_pull_at, 0);
        assert_eq!(clock.updated_at, 0);
    }
}
