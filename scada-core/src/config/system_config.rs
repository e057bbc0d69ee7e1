//! System configuration document: backends, dashboard metrics, machine layouts
//!
//! Stored in `{data_dir}/config.yaml`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{Result, ScadaError};
use crate::types::{Layout, Record};

/// Key of the layout used when a machine has none of its own.
pub const DEFAULT_LAYOUT: &str = "default";

/// Dashboard section of the system configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dashboards {
    #[serde(default)]
    pub metrics: Vec<Record>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// System configuration stored in config.yaml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Configured data backends, keyed by `id`
    #[serde(default)]
    pub backends: Vec<Record>,

    /// Dashboard definitions
    #[serde(default)]
    pub dashboards: Dashboards,

    /// Per-machine widget layouts, with an optional `default` entry
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub layouts: BTreeMap<String, Layout>,

    /// Unrecognized top-level sections are preserved across writes
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A layout resolved for a specific machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineLayout {
    pub machine_id: String,
    pub widgets: Vec<Record>,
}

impl SystemConfig {
    /// Insert a backend, replacing any existing backend with the same id.
    ///
    /// Returns an error if the record has no usable `id`.
    pub fn upsert_backend(&mut self, backend: Record) -> Result<&Record> {
        let id = backend
            .id_string()
            .ok_or_else(|| ScadaError::InvalidInput("backend requires an 'id'".to_string()))?;

        let index = match self.backends.iter().position(|b| b.id_matches(&id)) {
            Some(index) => {
                self.backends[index] = backend;
                index
            }
            None => {
                self.backends.push(backend);
                self.backends.len() - 1
            }
        };
        Ok(&self.backends[index])
    }

    /// Remove the backend with the given id.
    ///
    /// Returns `true` if a backend was removed.
    pub fn remove_backend(&mut self, id: &str) -> bool {
        let before = self.backends.len();
        self.backends.retain(|b| !b.id_matches(id));
        self.backends.len() != before
    }

    /// Append a dashboard metric.
    pub fn add_metric(&mut self, metric: Record) {
        self.dashboards.metrics.push(metric);
    }

    /// Shallow-merge `patch` into the metric with the given id.
    pub fn update_metric(&mut self, id: &str, patch: Record) -> Option<&Record> {
        let metric = crate::types::find_by_id(&mut self.dashboards.metrics, id)?;
        metric.merge(patch);
        Some(&*metric)
    }

    /// Remove the metric with the given id.
    ///
    /// Returns `true` if a metric was removed.
    pub fn remove_metric(&mut self, id: &str) -> bool {
        let metrics = &mut self.dashboards.metrics;
        let before = metrics.len();
        metrics.retain(|m| !m.id_matches(id));
        metrics.len() != before
    }

    /// Resolve the layout for a machine, falling back to the default layout.
    ///
    /// Every widget is stamped with the requested `machineId`.
    pub fn layout_for(&self, machine_id: &str) -> Option<MachineLayout> {
        let layout = self
            .layouts
            .get(machine_id)
            .or_else(|| self.layouts.get(DEFAULT_LAYOUT))?;

        let widgets = layout
            .widgets
            .iter()
            .cloned()
            .map(|mut widget| {
                widget.insert("machineId", Value::String(machine_id.to_string()));
                widget
            })
            .collect();

        Some(MachineLayout {
            machine_id: machine_id.to_string(),
            widgets,
        })
    }
}
