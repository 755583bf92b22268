use crate::defaults::*;
use serde::{Deserialize, Serialize};

fn default_verbose() -> i8 {
    0
}
fn default_method() -> String {
    String::from(ROOT_METHOD)
}
fn default_eta() -> f64 {
    ETA
}
fn default_vir_sign() -> f64 {
    VIR_SIGN
}
fn default_tol() -> f64 {
    ROOT_TOL
}
fn default_max_iter() -> usize {
    ROOT_MAX_ITER
}
fn default_linearized() -> bool {
    LINEARIZED
}
fn default_orbs() -> Option<Vec<usize>> {
    None
}
fn default_data_dir() -> String {
    String::from(DATA_DIR)
}
fn default_gw_config() -> GwConfig {
    let gw_config: GwConfig = toml::from_str("").unwrap();
    gw_config
}
fn default_data_config() -> DataConfig {
    let data_config: DataConfig = toml::from_str("").unwrap();
    data_config
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Configuration {
    #[serde(default = "default_verbose")]
    pub verbose: i8,
    #[serde(default = "default_gw_config")]
    pub gw: GwConfig,
    #[serde(default = "default_data_config")]
    pub data: DataConfig,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct GwConfig {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default = "default_eta")]
    pub eta: f64,
    #[serde(default = "default_vir_sign")]
    pub vir_sign: f64,
    #[serde(default = "default_tol")]
    pub tol: f64,
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    #[serde(default = "default_linearized")]
    pub linearized: bool,
    /// Orbital indices to correct; the entire space when absent.
    #[serde(default = "default_orbs")]
    pub orbs: Option<Vec<usize>>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct DataConfig {
    /// Directory holding the mean-field/TDHF input deck.
    #[serde(default = "default_data_dir")]
    pub path: String,
}
