// MIT License - Copyright (c) 2026 ialarm-mk-core contributors
// Vendor status code translation

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ArmMode;

/// Canonical panel arm state.
///
/// Exactly one value is current at any time. Only the core's state-owner
/// task mutates it; any number of observers read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PanelState {
    /// Fully armed, all zones active
    ArmedAway,
    /// Partially armed, perimeter zones only
    ArmedStay,
    /// Disarmed
    Disarmed,
    /// Alarm in progress
    Triggered,
    /// Exit-delay countdown after an away-arm command
    Arming,
    /// Panel unreachable or reporting an unknown status
    Unavailable,
}

impl PanelState {
    /// Translate a push event category id into a panel state.
    ///
    /// The panel's push stream tags every event with a vendor "category id".
    /// Only a few of them describe an arm-state transition:
    ///
    /// | category id | state |
    /// |---|---|
    /// | 1401, 1406 | Disarmed |
    /// | 3401 | ArmedAway |
    /// | 3441 | ArmedStay |
    /// | 1100, 1101, 1120, 1131, 1132, 1133, 1134, 1137 | Triggered |
    ///
    /// Every other category id (zone faults, supervisory traffic, test
    /// reports) carries no arm-state information and returns `None`; the
    /// current state is left unchanged. This is a fixed vendor taxonomy,
    /// not logic to re-derive.
    pub fn from_event_code(cid: u32) -> Option<Self> {
        match cid {
            1401 | 1406 => Some(Self::Disarmed),
            3401 => Some(Self::ArmedAway),
            3441 => Some(Self::ArmedStay),
            1100 | 1101 | 1120 | 1131 | 1132 | 1133 | 1134 | 1137 => Some(Self::Triggered),
            _ => None,
        }
    }

    /// Translate a device status integer from the alarm-status query.
    ///
    /// The vendor numbering: 0 armed away, 1 disarmed, 2 armed stay,
    /// 4 triggered, 5 arming. 3 is the cancel command code, not a resting
    /// state; it and every other unrecognized value map to `Unavailable`.
    pub fn from_device_status(status: u8) -> Self {
        match status {
            0 => Self::ArmedAway,
            1 => Self::Disarmed,
            2 => Self::ArmedStay,
            4 => Self::Triggered,
            5 => Self::Arming,
            _ => Self::Unavailable,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ArmedAway => "armed_away",
            Self::ArmedStay => "armed_stay",
            Self::Disarmed => "disarmed",
            Self::Triggered => "triggered",
            Self::Arming => "arming",
            Self::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for PanelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sensor status codes that mean the contact is currently open or triggered.
pub const OPEN_STATUS_CODES: [u8; 4] = [9, 11, 17, 27];

/// Sensor status codes that mean the sensor battery is low.
pub const LOW_BATTERY_STATUS_CODES: [u8; 2] = [17, 25];

/// Sensor status codes that mean the sensor is currently in alarm.
/// Used for iconography, not arm-state truth.
pub const ALARM_STATUS_CODES: [u8; 4] = [3, 11, 19, 27];

// The three sets overlap on purpose (17 is both open and low battery,
// 11 and 27 are both open and in alarm). A sensor can satisfy several
// predicates at once; never deduplicate or prioritize them.

/// Whether a sensor status code reports the contact open/triggered.
pub fn is_open_code(code: u8) -> bool {
    OPEN_STATUS_CODES.contains(&code)
}

/// Whether a sensor status code reports a low battery.
pub fn is_low_battery_code(code: u8) -> bool {
    LOW_BATTERY_STATUS_CODES.contains(&code)
}

/// Whether a sensor status code reports the sensor in alarm.
pub fn is_alarm_code(code: u8) -> bool {
    ALARM_STATUS_CODES.contains(&code)
}

/// Commands accepted by the panel's set-alarm-status operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmCommand {
    /// Full/away arm. The panel runs an exit-delay countdown first.
    ArmAway,
    /// Disarm.
    Disarm,
    /// Partial/stay/home arm. Takes effect immediately.
    ArmStay,
    /// Cancel an active alarm.
    CancelAlarm,
}

impl AlarmCommand {
    /// Create an arm command from an ArmMode.
    pub fn arm(mode: ArmMode) -> Self {
        match mode {
            ArmMode::Away => Self::ArmAway,
            ArmMode::Home => Self::ArmStay,
        }
    }

    /// Vendor command code for the set-alarm-status operation.
    pub fn code(&self) -> u8 {
        match self {
            Self::ArmAway => 0,
            Self::Disarm => 1,
            Self::ArmStay => 2,
            Self::CancelAlarm => 3,
        }
    }

    /// The state the panel is expected to settle into once the command
    /// lands. Applied optimistically before the panel confirms; the next
    /// push or poll re-establishes truth.
    pub fn expected_state(&self) -> PanelState {
        match self {
            Self::ArmAway => PanelState::Arming,
            Self::Disarm => PanelState::Disarmed,
            Self::ArmStay => PanelState::ArmedStay,
            Self::CancelAlarm => PanelState::Disarmed,
        }
    }

    /// Operation name used in logs and diagnostic events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ArmAway => "arm_away",
            Self::Disarm => "disarm",
            Self::ArmStay => "arm_stay",
            Self::CancelAlarm => "cancel_alarm",
        }
    }
}
