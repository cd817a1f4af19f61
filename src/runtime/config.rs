use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::drag::DEFAULT_ACTIVATION_DISTANCE;
use crate::error::{DashboardError, Result};
use crate::layout::GridDimensions;
use crate::logging::{Logger, METRICS_TARGET};
use crate::metrics::DashboardMetrics;

/// Board shape and spacing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub columns: u16,
    pub rows: u16,
    /// Pixels between adjacent cells.
    pub gap: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: 16,
            rows: 9,
            gap: 10.0,
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.gap.is_finite() && self.gap >= 0.0) {
            return Err(DashboardError::Config(format!(
                "grid gap must be a non-negative number, got {}",
                self.gap
            )));
        }
        self.dimensions().map(|_| ())
    }

    pub fn dimensions(&self) -> Result<GridDimensions> {
        Ok(GridDimensions::new(self.columns, self.rows)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragConfig {
    /// Pointer travel in pixels before a press shows a drag preview.
    pub activation_distance: f32,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            activation_distance: DEFAULT_ACTIVATION_DISTANCE,
        }
    }
}

impl DragConfig {
    pub fn validate(&self) -> Result<()> {
        if self.activation_distance.is_finite() && self.activation_distance >= 0.0 {
            Ok(())
        } else {
            Err(DashboardError::Config(format!(
                "activation distance must be a non-negative number, got {}",
                self.activation_distance
            )))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    grid: GridConfig,
    drag: DragConfig,
}

/// Configuration knobs for a [`Dashboard`](super::Dashboard).
#[derive(Clone)]
pub struct DashboardConfig {
    pub grid: GridConfig,
    pub drag: DragConfig,
    /// Optional structured logger used by the dashboard.
    pub logger: Option<Logger>,
    /// Metrics accumulator shared with the host.
    pub metrics: Option<Arc<Mutex<DashboardMetrics>>>,
    /// Target field used when emitting metrics snapshots.
    pub metrics_target: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            drag: DragConfig::default(),
            logger: None,
            metrics: None,
            metrics_target: METRICS_TARGET.to_string(),
        }
    }
}

impl DashboardConfig {
    /// Parse `{ "grid": {...}, "drag": {...} }`; missing fields take defaults.
    pub fn from_json_str(input: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(input)
            .map_err(|err| DashboardError::Config(err.to_string()))?;
        let config = Self {
            grid: file.grid,
            drag: file.drag,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;
        self.drag.validate()
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(DashboardMetrics::new())));
        }
    }

    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    /// Access the shared metrics handle if metrics are enabled.
    pub fn metrics_handle(&self) -> Option<Arc<Mutex<DashboardMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}

impl std::fmt::Debug for DashboardConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardConfig")
            .field("grid", &self.grid)
            .field("drag", &self.drag)
            .field("logger", &self.logger.is_some())
            .field("metrics", &self.metrics.is_some())
            .field("metrics_target", &self.metrics_target)
            .finish()
    }
}
