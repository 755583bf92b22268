use crate::constants::HARTREE_TO_EV;
use crate::gw::kernel::GwParams;
use log::info;
use ndarray::prelude::*;
use ndarray_stats::QuantileExt;

pub fn print_gw_init(n_orbs: usize, params: &GwParams) {
    info!("{:^80}", "");
    info!("{: ^80}", "GW Quasiparticle Corrections");
    info!("{:-^75}", "");
    info!("{: <25} {}", "root search:", params.method);
    info!("{: <25} {:.1e} Hartree", "broadening eta:", params.eta);
    info!("{: <25} {:.1e}", "tolerance:", params.tol);
    info!("{: <25} {}", "corrected orbitals:", n_orbs);
    info!("{:-^75}", "");
}

/// The corrected energies next to their mean-field values. Occupied
/// orbitals are labelled relative to the HOMO, virtual ones relative to
/// the LUMO.
pub fn print_qp_energies(
    mo_energy: ArrayView1<f64>,
    qp_energy: ArrayView1<f64>,
    orbs: &[usize],
    nocc: usize,
) {
    info!("{:^80}", "");
    info!("{: ^80}", "GW Quasiparticle Energies");
    info!("{:-^75}", "");
    info!(
        "  {: <10} {: >14} {: >14} {: >12}",
        "orbital", "E(mf) [eV]", "E(qp) [eV]", "shift [eV]"
    );
    for (&p, &e_qp) in orbs.iter().zip(qp_energy.iter()) {
        let label: String = if p < nocc {
            let h: usize = nocc - 1 - p;
            if h == 0 {
                String::from("H")
            } else {
                format!("H-{}", h)
            }
        } else {
            let l: usize = p - nocc;
            if l == 0 {
                String::from("L")
            } else {
                format!("L+{}", l)
            }
        };
        let e_mf: f64 = mo_energy[p] * HARTREE_TO_EV;
        let e_qp: f64 = e_qp * HARTREE_TO_EV;
        info!(
            "  {: <10} {: >14.6} {: >14.6} {: >12.6}",
            label,
            e_mf,
            e_qp,
            e_qp - e_mf
        );
    }
    let shifts: Array1<f64> = orbs
        .iter()
        .zip(qp_energy.iter())
        .map(|(&p, &e_qp)| (e_qp - mo_energy[p]).abs() * HARTREE_TO_EV)
        .collect();
    if let Ok(&largest) = shifts.max() {
        info!("largest correction: {:10.6} eV", largest);
    }
    info!("{:-^75} ", "");
}
