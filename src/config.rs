use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cartlab_cart::{CartConfig, ShelfSpec};
use cartlab_core::{Aabb, Transform};
use cartlab_experiment::ExperimentConfig;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Everything a session needs, loaded from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub products_csv: PathBuf,
    pub trials_csv: PathBuf,
    pub preferences: PathBuf,
    pub trial_log: PathBuf,
    pub experiment: ExperimentConfig,
    pub cart: CartConfig,
    /// Physics tick rate the cart pipeline is polled at.
    pub tick_hz: f64,
    /// Shelf anchors in shelf order.
    pub shelf_anchors: [Transform; 4],
    pub shelf: ShelfSpec,
    /// Pivot-relative bounds given to every simulated product.
    pub product_bounds: Aabb,
    pub simulation: SimulationConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            products_csv: PathBuf::from("Data/Products.csv"),
            trials_csv: PathBuf::from("Data/Trials.csv"),
            preferences: PathBuf::from("Data/session.json"),
            trial_log: PathBuf::from("Data/TrialData.csv"),
            experiment: ExperimentConfig::default(),
            cart: CartConfig::default(),
            tick_hz: 50.0,
            shelf_anchors: std::array::from_fn(|i| {
                Transform::from_position(Point3::new(-0.9 + i as f32 * 0.6, 1.1, 2.0))
            }),
            shelf: ShelfSpec::default(),
            product_bounds: Aabb::new(Point3::new(-0.04, 0.0, -0.04), Point3::new(0.04, 0.2, 0.04)),
            simulation: SimulationConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Reads a config file; `None` gives the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

/// The simulated participant in a headless run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
    /// Chance per trial that the participant walks away without buying.
    pub skip_probability: f64,
    /// Downward speed of a product as it lands in the cart.
    pub drop_speed: f32,
    /// Fraction of velocity kept per tick while settling.
    pub damping: f32,
    /// Ticks the participant browses before choosing.
    pub browse_ticks: u64,
    /// Run ticks back to back instead of in real time.
    pub unpaced: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            skip_probability: 0.1,
            drop_speed: 1.5,
            damping: 0.6,
            browse_ticks: 25,
            unpaced: false,
        }
    }
}
