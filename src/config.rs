use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ScenarioError;
use crate::optimizer::SolverBackend;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub battery: BatteryConfig,
    pub prices: PricesConfig,
    pub grid: GridConfig,
    pub optimization: OptimizationConfig,
    pub profiles: ProfilesConfig,
    pub llm: LlmConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryConfig {
    pub capacity_kwh: f64,
    pub efficiency: f64,
    pub max_power_kw: f64,
    /// Fraction of capacity (0..1) at the start of the horizon.
    pub initial_soc: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            capacity_kwh: 5.0,
            efficiency: 0.95,
            max_power_kw: 2.0,
            initial_soc: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricesConfig {
    pub import: f64,
    pub export: f64,
    pub currency: String,
}

impl Default for PricesConfig {
    fn default() -> Self {
        Self {
            import: 0.25,
            export: 0.10,
            currency: "EUR".to_string(),
        }
    }
}

/// Optional caps on grid exchange. Absent means unbounded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub import_limit_kw: Option<f64>,
    pub export_limit_kw: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationConfig {
    pub horizon: usize,
    pub default_backend: SolverBackend,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            horizon: 24,
            default_backend: SolverBackend::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilesConfig {
    pub pv: Option<Vec<f64>>,
    pub load: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    pub icl_path: PathBuf,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            temperature: 0.0,
            max_tokens: 300,
            timeout_seconds: 30,
            icl_path: PathBuf::from("icl/examples.jsonl"),
        }
    }
}

impl LlmConfig {
    /// Explicit key first, then `OPENAI_API_KEY`. Blank keys count as absent.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub max_question_chars: usize,
    pub compare_baseline: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_question_chars: 1000,
            compare_baseline: true,
        }
    }
}

impl Config {
    /// Defaults, then the TOML file (if present), then `WHATIF__*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ScenarioError> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("WHATIF__").split("__"));
        Ok(figment.extract()?)
    }

    /// Parse a TOML document on top of the defaults, without touching the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self, ScenarioError> {
        let figment =
            Figment::from(Serialized::defaults(Config::default())).merge(Toml::string(toml));
        Ok(figment.extract()?)
    }
}
