use ndarray::prelude::*;
use ndarray_einsum_beta::einsum;
use std::ops::Range;

/// Two-electron integrals over the active molecular orbitals in physicists'
/// notation, <pq|rs>. Blocks are addressed by a four letter occupation
/// pattern, e.g. "oovo", where each letter selects the occupied or the
/// virtual subspace of the corresponding index.
pub struct MoIntegrals {
    /// Mean-field energies of the active orbitals.
    pub mo_energy: Array1<f64>,
    /// MO coefficients (AO x MO) of the active orbitals.
    pub mo_coeff: Array2<f64>,
    /// Activity mask over the full orbital set of the mean field.
    pub space: Array1<bool>,
    /// Number of occupied orbitals within the active space.
    pub nocc: usize,
    phys: Array4<f64>,
    complex: bool,
}

impl MoIntegrals {
    /// Wraps an already transformed integral tensor <pq|rs>. The activity
    /// mask defaults to the entire orbital set.
    pub fn new(
        phys: Array4<f64>,
        mo_energy: Array1<f64>,
        mo_coeff: Array2<f64>,
        nocc: usize,
    ) -> Self {
        let nmo: usize = mo_energy.len();
        assert_eq!(phys.dim(), (nmo, nmo, nmo, nmo));
        assert_eq!(mo_coeff.ncols(), nmo);
        assert!(nocc <= nmo);
        // mask over the molecular orbitals of the mean field
        let space: Array1<bool> = Array1::from_elem(nmo, true);
        MoIntegrals {
            mo_energy,
            mo_coeff,
            space,
            nocc,
            phys,
            complex: false,
        }
    }

    /// Transforms the AO integrals (pq|rs) in chemists' notation to the MO
    /// basis and reorders them to <pq|rs>. The transformation is done one
    /// index at a time.
    pub fn from_ao(
        eri_ao: ArrayView4<f64>,
        mo_coeff: ArrayView2<f64>,
        mo_energy: ArrayView1<f64>,
        nocc: usize,
    ) -> Self {
        let t1 = einsum("pi,pqrs->iqrs", &[&mo_coeff, &eri_ao]).unwrap();
        let t2 = einsum("qj,iqrs->ijrs", &[&mo_coeff, &t1]).unwrap();
        let t3 = einsum("rk,ijrs->ijks", &[&mo_coeff, &t2]).unwrap();
        let chem: Array4<f64> = einsum("sl,ijks->ijkl", &[&mo_coeff, &t3])
            .unwrap()
            .into_dimensionality::<Ix4>()
            .unwrap();
        // <pq|rs> = (pr|qs)
        let phys: Array4<f64> = chem.view().permuted_axes([0, 2, 1, 3]).to_owned();
        MoIntegrals::new(
            phys,
            mo_energy.to_owned(),
            mo_coeff.to_owned(),
            nocc,
        )
    }

    /// Replaces the orbital activity mask.
    pub fn with_space(mut self, space: Array1<bool>) -> Self {
        assert_eq!(space.len(), self.nmo());
        self.space = space;
        self
    }

    pub fn nmo(&self) -> usize {
        self.mo_energy.len()
    }

    pub fn nvirt(&self) -> usize {
        self.nmo() - self.nocc
    }

    /// Whether the stored integrals carry a complex part.
    pub fn is_complex(&self) -> bool {
        self.complex
    }

    /// Returns the integral block selected by a four letter occupation
    /// pattern over {o, v}.
    pub fn block(&self, key: &str) -> ArrayView4<f64> {
        assert_eq!(key.len(), 4, "integral block key must have four letters");
        let subspace = |letter: u8| -> Range<usize> {
            match letter {
                b'o' => 0..self.nocc,
                b'v' => self.nocc..self.nmo(),
                _ => panic!("unknown subspace letter in integral block key '{}'", key),
            }
        };
        let k = key.as_bytes();
        self.phys.slice(s![
            subspace(k[0]),
            subspace(k[1]),
            subspace(k[2]),
            subspace(k[3])
        ])
    }
}

/// Excitation spectrum of a converged TDHF calculation together with the MO
/// integrals it was solved in. Read-only input to the GW run.
pub struct TdhfData {
    /// Excitation energies in ascending order.
    pub e: Array1<f64>,
    /// X amplitudes, (excitation x occupied x virtual).
    pub x: Array3<f64>,
    /// Y amplitudes, (excitation x occupied x virtual).
    pub y: Array3<f64>,
    pub eri: MoIntegrals,
}

impl TdhfData {
    pub fn new(e: Array1<f64>, x: Array3<f64>, y: Array3<f64>, eri: MoIntegrals) -> Self {
        let nstates: usize = e.len();
        assert_eq!(x.dim(), (nstates, eri.nocc, eri.nvirt()));
        assert_eq!(y.dim(), x.dim());
        TdhfData { e, x, y, eri }
    }

    pub fn nstates(&self) -> usize {
        self.e.len()
    }

    /// X and Y amplitudes stacked along a component axis,
    /// (excitation x component x occupied x virtual).
    pub fn xy(&self) -> Array4<f64> {
        let (nstates, nocc, nvirt) = self.x.dim();
        let mut xy: Array4<f64> = Array4::zeros((nstates, 2, nocc, nvirt));
        xy.slice_mut(s![.., 0, .., ..]).assign(&self.x);
        xy.slice_mut(s![.., 1, .., ..]).assign(&self.y);
        xy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable_eri(nao: usize) -> Array4<f64> {
        // (pq|rs) = A_pq * A_rs with a symmetric A keeps the full
        // permutational symmetry of real integrals.
        let a: Array2<f64> =
            Array2::from_shape_fn((nao, nao), |(p, q)| 1.0 / (1.0 + (p + q) as f64));
        Array4::from_shape_fn((nao, nao, nao, nao), |(p, q, r, s)| {
            a[[p, q]] * a[[r, s]] * 0.3
        })
    }

    #[test]
    fn ao_transform_with_identity_coefficients_reorders_only() {
        let nao: usize = 3;
        let eri_ao: Array4<f64> = separable_eri(nao);
        let mo_coeff: Array2<f64> = Array2::eye(nao);
        let mo_energy: Array1<f64> = array![-0.9, -0.2, 0.4];
        let eri = MoIntegrals::from_ao(eri_ao.view(), mo_coeff.view(), mo_energy.view(), 2);
        // With C = 1 the physicists' tensor is just the chemists' one with
        // the two bra indices decoupled: <pq|rs> = (pr|qs).
        for p in 0..nao {
            for q in 0..nao {
                for r in 0..nao {
                    for s in 0..nao {
                        assert_eq!(eri.phys[[p, q, r, s]], eri_ao[[p, r, q, s]]);
                    }
                }
            }
        }
    }

    #[test]
    fn block_lookup_selects_the_right_subspaces() {
        let nao: usize = 4;
        let nocc: usize = 2;
        let eri_ao: Array4<f64> = separable_eri(nao);
        let mo_coeff: Array2<f64> = Array2::eye(nao);
        let mo_energy: Array1<f64> = array![-1.1, -0.4, 0.2, 0.7];
        let eri = MoIntegrals::from_ao(eri_ao.view(), mo_coeff.view(), mo_energy.view(), nocc);

        assert_eq!(eri.block("oooo").dim(), (2, 2, 2, 2));
        assert_eq!(eri.block("oovo").dim(), (2, 2, 2, 2));
        assert_eq!(eri.block("oovv").dim(), (2, 2, 2, 2));
        assert_eq!(eri.block("ovvv").dim(), (2, 2, 2, 2));
        assert_eq!(eri.block("ovvo").dim(), (2, 2, 2, 2));
        let ovvo = eri.block("ovvo");
        assert_eq!(ovvo[[0, 1, 0, 1]], eri.phys[[0, nocc + 1, nocc, 1]]);
    }

    #[test]
    fn stacked_amplitudes_keep_their_components() {
        let e: Array1<f64> = array![0.5];
        let x: Array3<f64> = array![[[0.7, 0.1]]];
        let y: Array3<f64> = array![[[0.05, 0.02]]];
        let eri = MoIntegrals::new(
            Array4::zeros((3, 3, 3, 3)),
            array![-1.0, 0.3, 0.6],
            Array2::eye(3),
            1,
        );
        let tdhf = TdhfData::new(e, x.clone(), y.clone(), eri);
        let xy: Array4<f64> = tdhf.xy();
        assert_eq!(xy.slice(s![.., 0, .., ..]), x.view());
        assert_eq!(xy.slice(s![.., 1, .., ..]), y.view());
    }
}
