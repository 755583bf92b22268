// GW RUN SPECIFICATION
// config file
pub const CONFIG_FILE_NAME: &str = "gw.toml";
// directory holding the mean-field/TDHF input deck
pub const DATA_DIR: &str = ".";

// SELF-ENERGY
// imaginary broadening keeping the self-energy poles off the real axis
pub const ETA: f64 = 1.0e-3;
// side of the virtual pole branch that carries the broadening shift
pub const VIR_SIGN: f64 = 1.0;

// ROOT SEARCH
// strategy for the quasiparticle equation: "newton", "bisect" or "fallback"
pub const ROOT_METHOD: &str = "fallback";
// absolute tolerance of the root search
pub const ROOT_TOL: f64 = 1.0e-9;
// iteration budget of each root finder
pub const ROOT_MAX_ITER: usize = 100;
// fixed bisection window in Hartree
pub const BISECT_LOWER: f64 = -100.0;
pub const BISECT_UPPER: f64 = 100.0;
// single-shot linearized correction instead of the iterative search
pub const LINEARIZED: bool = false;
