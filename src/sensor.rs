// MIT License - Copyright (c) 2026 ialarm-mk-core contributors
// Sensor table

use std::collections::HashMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::client::ZoneInfo;
use crate::error::{CoreError, Result};
use crate::status;

/// Device class assigned to sensors when the panel does not say otherwise.
/// The iAlarm-MK zone list carries no device-class field, so every sensor
/// starts as a door contact; hosts may reclassify from the zone name.
pub const DEFAULT_DEVICE_CLASS: &str = "door";

bitflags! {
    /// Zone attribute bits packed into bulk status values.
    ///
    /// Diagnostic view only. The open/low-battery/in-alarm predicates are
    /// fixed literal code sets (see [`crate::status`]), not derived from
    /// these bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SensorFlags: u8 {
        /// Zone is bound to a sensor
        const IN_USE      = 1 << 0;
        /// Zone in alarm
        const ALARM       = 1 << 1;
        /// Zone bypassed
        const BYPASS      = 1 << 2;
        /// Zone fault
        const FAULT       = 1 << 3;
        /// Sensor battery low
        const LOW_BATTERY = 1 << 4;
        /// Sensor supervision lost
        const LOSS        = 1 << 5;
    }
}

impl SensorFlags {
    /// Decode the attribute bits of a bulk status value.
    pub fn from_status(code: u8) -> Self {
        Self::from_bits_truncate(code)
    }
}

/// A single panel sensor (one zone contact).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sensor {
    /// Vendor-assigned id, unique per panel
    pub id: String,
    /// Name of the zone the sensor is bound to
    pub zone_name: String,
    /// Position in the panel's bulk-status reply
    pub index: usize,
    /// Last known vendor status code
    pub state: u8,
    /// Host-facing device class (defaults to "door")
    pub device_class: String,
}

impl Sensor {
    /// Whether the contact is currently open/triggered.
    pub fn is_open(&self) -> bool {
        status::is_open_code(self.state)
    }

    /// Whether the sensor reports a low battery.
    pub fn is_low_battery(&self) -> bool {
        status::is_low_battery_code(self.state)
    }

    /// Whether the sensor is currently in alarm.
    pub fn is_alarmed(&self) -> bool {
        status::is_alarm_code(self.state)
    }

    /// Diagnostic view of the status code's attribute bits.
    pub fn flags(&self) -> SensorFlags {
        SensorFlags::from_status(self.state)
    }
}

/// Build the sensor table from one enumeration session's replies.
///
/// The three lists are index-aligned. Blank ids mark unbound panel slots:
/// they are skipped, but keep their position so every kept sensor's `index`
/// still addresses the right entry of later bulk replies.
pub(crate) fn build_table(
    ids: Vec<String>,
    zones: Vec<ZoneInfo>,
    states: Vec<u8>,
) -> Result<HashMap<String, Sensor>> {
    let mut table = HashMap::new();
    for (index, id) in ids.into_iter().enumerate() {
        if id.is_empty() {
            continue;
        }
        let zone = zones.get(index).ok_or_else(|| CoreError::Protocol {
            details: format!("zone list has no entry for sensor slot {index}"),
        })?;
        let state = *states.get(index).ok_or_else(|| CoreError::Protocol {
            details: format!("bulk status has no entry for sensor slot {index}"),
        })?;
        table.insert(
            id.clone(),
            Sensor {
                id,
                zone_name: zone.name.clone(),
                index,
                state,
                device_class: DEFAULT_DEVICE_CLASS.to_string(),
            },
        );
    }
    Ok(table)
}

/// Apply one bulk status snapshot to the table in place.
///
/// Validated up front: if the snapshot is too short for any recorded index,
/// nothing is written and the table keeps its previous cycle's values. No
/// sensor ever mixes two cycles.
pub(crate) fn apply_bulk(table: &mut HashMap<String, Sensor>, states: &[u8]) -> Result<()> {
    if let Some(max_index) = table.values().map(|s| s.index).max() {
        if states.len() <= max_index {
            return Err(CoreError::Protocol {
                details: format!(
                    "bulk status has {} entries, sensor table needs index {}",
                    states.len(),
                    max_index
                ),
            });
        }
    }
    for sensor in table.values_mut() {
        sensor.state = states[sensor.index];
    }
    Ok(())
}
