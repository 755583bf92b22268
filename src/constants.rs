// UNIT CONVERSION
pub const HARTREE_TO_EV: f64 = 27.211396132;
pub const EV_TO_HARTREE: f64 = 1.0 / HARTREE_TO_EV;
