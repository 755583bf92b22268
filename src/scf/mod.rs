use ndarray::prelude::*;
use ndarray_einsum_beta::einsum;

/// Treatment of the exchange divergence used by periodic mean-field
/// implementations. The molecular mean field carries no such treatment.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Exxdiv {
    Ewald,
}

/// The surface of the converged mean-field calculation the GW run sits on
/// top of. The occupation vector is mutable so that the double-counting
/// correction can be evaluated with a masked occupation, see
/// [`ScopedMeanField`].
pub trait MeanField {
    /// Effective potential matrix in the AO basis for the current
    /// occupations.
    fn get_veff(&self) -> Array2<f64>;

    /// Coulomb matrix in the AO basis for the current occupations.
    fn get_j(&self) -> Array2<f64>;

    fn mo_occ(&self) -> ArrayView1<f64>;

    fn set_mo_occ(&mut self, occ: Array1<f64>);

    /// Exchange-divergence treatment, if the implementation supports one.
    fn exxdiv(&self) -> Option<Exxdiv> {
        None
    }

    fn set_exxdiv(&mut self, _exxdiv: Option<Exxdiv>) {}
}

/// Spin-restricted closed-shell mean field over an explicit AO integral
/// tensor in chemists' notation.
pub struct RestrictedScf {
    /// MO coefficients (AO x MO).
    pub mo_coeff: Array2<f64>,
    /// Occupation numbers per molecular orbital.
    pub mo_occ: Array1<f64>,
    /// AO two-electron integrals (pq|rs).
    pub eri_ao: Array4<f64>,
    pub exxdiv: Option<Exxdiv>,
}

impl RestrictedScf {
    pub fn new(mo_coeff: Array2<f64>, mo_occ: Array1<f64>, eri_ao: Array4<f64>) -> Self {
        assert_eq!(mo_coeff.ncols(), mo_occ.len());
        RestrictedScf {
            mo_coeff,
            mo_occ,
            eri_ao,
            exxdiv: None,
        }
    }

    /// AO density matrix from the current occupations, P = C f C^T.
    fn density_matrix(&self) -> Array2<f64> {
        let weighted: Array2<f64> = &self.mo_coeff * &self.mo_occ;
        weighted.dot(&self.mo_coeff.t())
    }

    /// Exchange matrix K_pq = sum_rs (pr|sq) P_rs.
    fn get_k(&self) -> Array2<f64> {
        let dm: Array2<f64> = self.density_matrix();
        einsum("prsq,rs->pq", &[&self.eri_ao, &dm])
            .unwrap()
            .into_dimensionality::<Ix2>()
            .unwrap()
    }
}

impl MeanField for RestrictedScf {
    fn get_veff(&self) -> Array2<f64> {
        // closed shell: Veff = J - K/2
        self.get_j() - 0.5 * self.get_k()
    }

    fn get_j(&self) -> Array2<f64> {
        let dm: Array2<f64> = self.density_matrix();
        einsum("pqrs,rs->pq", &[&self.eri_ao, &dm])
            .unwrap()
            .into_dimensionality::<Ix2>()
            .unwrap()
    }

    fn mo_occ(&self) -> ArrayView1<f64> {
        self.mo_occ.view()
    }

    fn set_mo_occ(&mut self, occ: Array1<f64>) {
        assert_eq!(occ.len(), self.mo_occ.len());
        self.mo_occ = occ;
    }

    fn exxdiv(&self) -> Option<Exxdiv> {
        self.exxdiv
    }

    fn set_exxdiv(&mut self, exxdiv: Option<Exxdiv>) {
        self.exxdiv = exxdiv;
    }
}

/// Scoped override of the mean-field configuration: occupations outside the
/// active space are zeroed and the exchange-divergence treatment is switched
/// off while the guard lives. The previous state is restored when the guard
/// is dropped, on every exit path.
pub struct ScopedMeanField<'a, M: MeanField> {
    mf: &'a mut M,
    occ_backup: Array1<f64>,
    exxdiv_backup: Option<Exxdiv>,
}

impl<'a, M: MeanField> ScopedMeanField<'a, M> {
    pub fn mask_occupation(mf: &'a mut M, space: ArrayView1<bool>) -> Self {
        let occ_backup: Array1<f64> = mf.mo_occ().to_owned();
        let exxdiv_backup: Option<Exxdiv> = mf.exxdiv();
        assert_eq!(space.len(), occ_backup.len());

        let mut occ: Array1<f64> = occ_backup.clone();
        for (f, &active) in occ.iter_mut().zip(space.iter()) {
            if !active {
                *f = 0.0;
            }
        }
        mf.set_mo_occ(occ);
        mf.set_exxdiv(None);

        ScopedMeanField {
            mf,
            occ_backup,
            exxdiv_backup,
        }
    }

    pub fn get(&self) -> &M {
        &*self.mf
    }
}

impl<'a, M: MeanField> Drop for ScopedMeanField<'a, M> {
    fn drop(&mut self) {
        self.mf.set_mo_occ(std::mem::take(&mut self.occ_backup));
        self.mf.set_exxdiv(self.exxdiv_backup);
    }
}
