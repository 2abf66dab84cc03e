use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

use crate::config::Config;

/// Hourly PV generation (kWh) of the reference 24h scenario.
pub const DEFAULT_PV_PROFILE: [f64; 24] = [
    0.0, 0.0, 0.0, 0.0, 0.2, 0.5, 1.0, 1.5, 2.0, 2.2, 2.0, 1.5, 1.0, 0.8, 0.5, 0.2, 0.0, 0.0, 0.0,
    0.0, 0.0, 0.0, 0.0, 0.0,
];

/// Flat household demand (kWh per step) of the reference scenario.
pub const DEFAULT_LOAD_KWH: f64 = 2.0;

/// Numeric state of one scenario.
///
/// Built fresh for every request, mutated by the modification engine and
/// dropped after a single solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_series"))]
pub struct Dataset {
    #[validate(range(min = 1))]
    pub horizon: usize,
    pub load: Vec<f64>,
    pub pv: Vec<f64>,
    #[validate(range(min = 0.0))]
    pub price_import: f64,
    #[validate(range(min = 0.0))]
    pub price_export: f64,
    #[validate(range(min = 0.0))]
    pub battery_capacity: f64,
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub battery_efficiency: f64,
    #[validate(range(min = 0.0))]
    pub battery_power_limit: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub initial_soc_fraction: f64,
    /// Upper bound on grid import per step; `None` leaves it unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_limit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_limit: Option<f64>,
}

fn validate_series(dataset: &Dataset) -> Result<(), ValidationError> {
    let fail = |code: &'static str, message: String| {
        let mut err = ValidationError::new(code);
        err.message = Some(Cow::Owned(message));
        Err(err)
    };

    if dataset.load.len() != dataset.horizon || dataset.pv.len() != dataset.horizon {
        return fail(
            "series_length",
            format!(
                "load ({}) and pv ({}) must both have horizon length {}",
                dataset.load.len(),
                dataset.pv.len(),
                dataset.horizon
            ),
        );
    }
    if let Some(v) = dataset
        .load
        .iter()
        .chain(dataset.pv.iter())
        .find(|v| !v.is_finite() || **v < 0.0)
    {
        return fail(
            "series_value",
            format!("series values must be finite and non-negative, got {v}"),
        );
    }
    for limit in [dataset.import_limit, dataset.export_limit].into_iter().flatten() {
        if !limit.is_finite() || limit < 0.0 {
            return fail(
                "grid_limit",
                format!("grid limits must be finite and non-negative, got {limit}"),
            );
        }
    }
    Ok(())
}

impl Default for Dataset {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

fn cyclic(profile: Option<&[f64]>, fallback: &[f64], horizon: usize) -> Vec<f64> {
    let source = match profile {
        Some(p) if !p.is_empty() => p,
        _ => fallback,
    };
    source.iter().copied().cycle().take(horizon).collect()
}

impl Dataset {
    /// Build the baseline dataset described by `cfg`.
    ///
    /// Profiles are repeated cyclically when their length differs from the
    /// horizon; missing or empty ones fall back to the reference curves.
    pub fn from_config(cfg: &Config) -> Self {
        let horizon = cfg.optimization.horizon;
        let load = cyclic(cfg.profiles.load.as_deref(), &[DEFAULT_LOAD_KWH], horizon);
        let pv = cyclic(cfg.profiles.pv.as_deref(), &DEFAULT_PV_PROFILE, horizon);

        Self {
            horizon,
            load,
            pv,
            price_import: cfg.prices.import,
            price_export: cfg.prices.export,
            battery_capacity: cfg.battery.capacity_kwh,
            battery_efficiency: cfg.battery.efficiency,
            battery_power_limit: cfg.battery.max_power_kw,
            initial_soc_fraction: cfg.battery.initial_soc,
            import_limit: cfg.grid.import_limit_kw,
            export_limit: cfg.grid.export_limit_kw,
        }
    }

    pub fn initial_soc(&self) -> f64 {
        self.initial_soc_fraction * self.battery_capacity
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            horizon: self.horizon,
            total_load: self.load.iter().sum(),
            total_pv: self.pv.iter().sum(),
            peak_load: self.load.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            peak_pv: self.pv.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            price_import: self.price_import,
            price_export: self.price_export,
            battery_capacity: self.battery_capacity,
            battery_power_limit: self.battery_power_limit,
        }
    }
}

/// Aggregates handed to explanation collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub horizon: usize,
    pub total_load: f64,
    pub total_pv: f64,
    pub peak_load: f64,
    pub peak_pv: f64,
    pub price_import: f64,
    pub price_export: f64,
    pub battery_capacity: f64,
    pub battery_power_limit: f64,
}
