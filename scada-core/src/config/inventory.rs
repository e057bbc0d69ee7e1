//! Device inventory: machines, PLCs and sensors
//!
//! Stored in `{data_dir}/inventory.yaml`. Records are kept as supplied by the
//! collector or the front-end; ids may be numbers or strings.

use serde::{Deserialize, Serialize};

use crate::types::{find_by_id, Record};

/// Inventory document stored in inventory.yaml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub machines: Vec<Record>,
    #[serde(default)]
    pub plcs: Vec<Record>,
    #[serde(default)]
    pub sensors: Vec<Record>,
}

/// Partial inventory replacement: only the lists that are present are replaced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machines: Option<Vec<Record>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plcs: Option<Vec<Record>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensors: Option<Vec<Record>>,
}

/// Entity counts of an inventory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCounts {
    pub machines: usize,
    pub plcs: usize,
    pub sensors: usize,
}

impl Inventory {
    /// Shallow-merge `patch` into the PLC with the given id.
    pub fn update_plc(&mut self, id: &str, patch: Record) -> Option<&Record> {
        let plc = find_by_id(&mut self.plcs, id)?;
        plc.merge(patch);
        Some(&*plc)
    }

    /// Shallow-merge `patch` into the sensor with the given id.
    pub fn update_sensor(&mut self, id: &str, patch: Record) -> Option<&Record> {
        let sensor = find_by_id(&mut self.sensors, id)?;
        sensor.merge(patch);
        Some(&*sensor)
    }

    /// Replace each list present in `update`, keeping the others.
    pub fn merge_save(&mut self, update: InventoryUpdate) {
        if let Some(machines) = update.machines {
            self.machines = machines;
        }
        if let Some(plcs) = update.plcs {
            self.plcs = plcs;
        }
        if let Some(sensors) = update.sensors {
            self.sensors = sensors;
        }
    }

    /// Find a sensor by its `code` field.
    pub fn sensor_by_code(&self, code: &str) -> Option<&Record> {
        self.sensors.iter().find(|s| s.str_field("code") == Some(code))
    }

    /// Count machines, PLCs and sensors.
    pub fn counts(&self) -> InventoryCounts {
        InventoryCounts {
            machines: self.machines.len(),
            plcs: self.plcs.len(),
            sensors: self.sensors.len(),
        }
    }
}
