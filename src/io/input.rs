use crate::scf::RestrictedScf;
use crate::tdhf::{MoIntegrals, TdhfData};
use anyhow::{ensure, Context, Result};
use ndarray::prelude::*;
use ndarray_npy::read_npy;
use std::path::{Path, PathBuf};

/// Loads the mean-field and TDHF input deck from `path`. The deck consists
/// of seven `.npy` files: `mo_energy`, `mo_coeff`, `mo_occ`, `eri_ao`
/// (chemists' notation), `td_e`, `td_x` and `td_y`. The number of occupied
/// orbitals is taken from the occupation vector.
pub fn read_input(path: &Path) -> Result<(TdhfData, RestrictedScf)> {
    let load = |name: &str| -> PathBuf { path.join(format!("{}.npy", name)) };

    let mo_energy: Array1<f64> = read_npy(load("mo_energy"))
        .with_context(|| format!("failed to read {:?}", load("mo_energy")))?;
    let mo_coeff: Array2<f64> = read_npy(load("mo_coeff"))
        .with_context(|| format!("failed to read {:?}", load("mo_coeff")))?;
    let mo_occ: Array1<f64> = read_npy(load("mo_occ"))
        .with_context(|| format!("failed to read {:?}", load("mo_occ")))?;
    let eri_ao: Array4<f64> = read_npy(load("eri_ao"))
        .with_context(|| format!("failed to read {:?}", load("eri_ao")))?;
    let td_e: Array1<f64> = read_npy(load("td_e"))
        .with_context(|| format!("failed to read {:?}", load("td_e")))?;
    let td_x: Array3<f64> = read_npy(load("td_x"))
        .with_context(|| format!("failed to read {:?}", load("td_x")))?;
    let td_y: Array3<f64> = read_npy(load("td_y"))
        .with_context(|| format!("failed to read {:?}", load("td_y")))?;

    let nao: usize = mo_coeff.nrows();
    let nmo: usize = mo_coeff.ncols();
    ensure!(
        mo_energy.len() == nmo && mo_occ.len() == nmo,
        "inconsistent orbital counts: {} coefficients, {} energies, {} occupations",
        nmo,
        mo_energy.len(),
        mo_occ.len()
    );
    ensure!(
        eri_ao.dim() == (nao, nao, nao, nao),
        "AO integral tensor has shape {:?}, expected nao = {} on every axis",
        eri_ao.dim(),
        nao
    );

    let nocc: usize = mo_occ.iter().filter(|&&f| f > 0.0).count();
    ensure!(
        nocc > 0 && nocc < nmo,
        "occupation vector splits the orbitals into {} occupied of {} total",
        nocc,
        nmo
    );

    let eri = MoIntegrals::from_ao(eri_ao.view(), mo_coeff.view(), mo_energy.view(), nocc);
    let tdhf = TdhfData::new(td_e, td_x, td_y, eri);
    let scf = RestrictedScf::new(mo_coeff, mo_occ, eri_ao);
    Ok((tdhf, scf))
}
