pub use imds::*;
pub use kernel::*;
pub use logging::*;
pub use solver::{CallHistory, RootError};

mod imds;
mod kernel;
mod logging;
mod solver;

use crate::scf::MeanField;
use crate::tdhf::TdhfData;
use ndarray::prelude::*;

/// A GW calculation on top of a converged TDHF run. The intermediates are
/// built once at construction; the corrected energies end up in
/// `mo_energy`.
pub struct Gw<'a> {
    imds: Imds<'a>,
    pub params: GwParams,
    /// Orbital index lists to correct; the entire space when `None`.
    pub orbs: Option<Vec<Vec<usize>>>,
    pub mo_energy: Option<ArrayD<f64>>,
}

impl<'a> Gw<'a> {
    /// Builds the spectral intermediates. The mean-field object is only
    /// mutated inside a scoped configuration override during this call.
    pub fn new<M: MeanField>(tdhf: &'a TdhfData, mf: &mut M) -> Self {
        Gw {
            imds: Imds::new(tdhf, mf),
            params: GwParams::default(),
            orbs: None,
            mo_energy: None,
        }
    }

    pub fn imds(&self) -> &Imds<'a> {
        &self.imds
    }

    /// Runs the root searches and stores the corrected energies.
    pub fn kernel(&mut self) -> Result<ArrayD<f64>, GwError> {
        let energies: ArrayD<f64> = kernel(&self.imds, self.orbs.clone(), &self.params)?;
        self.mo_energy = Some(energies.clone());
        Ok(energies)
    }
}
