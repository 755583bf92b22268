use crate::scf::{MeanField, ScopedMeanField};
use crate::tdhf::{MoIntegrals, TdhfData};
use ndarray::concatenate;
use ndarray::prelude::*;
use ndarray_einsum_beta::einsum;
use num_complex::Complex64;
use num_traits::Zero;

/// Capability set of a GW intermediates container. One implementation exists
/// per physical variant; the molecular one is [`Imds`]. The quasiparticle
/// kernel only talks to this trait, so tuple-indexed variants with more than
/// one orbital dimension plug into the same driver.
pub trait Intermediates: Sync {
    /// Number of independent orbital indices a correction requires.
    fn orb_dims(&self) -> usize {
        1
    }

    /// The entire orbital space, one index list per orbital dimension.
    fn entire_space(&self) -> Vec<Vec<usize>>;

    /// Right-hand side of the quasiparticle equation for orbital `p`.
    fn get_rhs(&self, p: &[usize]) -> f64;

    /// Diagonal self-energy matrix element at the energy `omega`.
    fn get_sigma_element(&self, omega: f64, p: &[usize], eta: f64, vir_sign: f64) -> Complex64;

    /// Initial guess for the quasiparticle energy of orbital `p`.
    fn initial_guess(&self, p: &[usize]) -> f64;

    /// The residual whose root is the quasiparticle energy,
    /// `f(omega) = omega - Re Sigma(omega, p) - rhs(p)`.
    fn quasiparticle_eq(&self, p: &[usize], eta: f64, vir_sign: f64) -> QpEquation<'_, Self>
    where
        Self: Sized,
    {
        QpEquation {
            imds: self,
            p: p.to_vec(),
            rhs: self.get_rhs(p),
            eta,
            vir_sign,
        }
    }
}

/// Scalar residual of the quasiparticle equation for one fixed orbital.
/// A pure function of omega; the right-hand side is captured once.
pub struct QpEquation<'a, I: Intermediates> {
    imds: &'a I,
    p: Vec<usize>,
    rhs: f64,
    eta: f64,
    vir_sign: f64,
}

impl<'a, I: Intermediates> QpEquation<'a, I> {
    pub fn eval(&self, omega: f64) -> f64 {
        omega
            - self
                .imds
                .get_sigma_element(omega, &self.p, self.eta, self.vir_sign)
                .re
            - self.rhs
    }
}

/// Molecular GW intermediates. Everything shared between the orbital root
/// searches is computed once here: the transition density tensor, the pole
/// denominators and the double-counting correction of the mean field. The
/// mean-field object is only touched during construction, under a scoped
/// configuration override.
pub struct Imds<'a> {
    eri: &'a MoIntegrals,
    nocc: usize,
    /// diagonal of the exchange-correlation-only mean-field potential in
    /// the MO basis
    v_mf: Array1<f64>,
    /// transition density tensor (excitation x component x orbital x orbital)
    tdm: Array4<f64>,
    /// component-summed transition densities entering the pole sums
    tdm_s: Array3<f64>,
    /// evi[v, i] = e[v] - eps_occ[i]
    evi: Array2<f64>,
    /// eva[v, a] = e[v] + eps_vir[a]
    eva: Array2<f64>,
}

impl<'a> Imds<'a> {
    pub fn new<M: MeanField>(tdhf: &'a TdhfData, mf: &mut M) -> Self {
        let eri: &MoIntegrals = &tdhf.eri;
        let nocc: usize = eri.nocc;
        let occ_energy: ArrayView1<f64> = eri.mo_energy.slice(s![..nocc]);
        let vir_energy: ArrayView1<f64> = eri.mo_energy.slice(s![nocc..]);

        // Exchange-correlation-only potential of the mean field. The
        // occupations outside the active space are masked and the
        // exchange-divergence treatment is suppressed for this single
        // evaluation; both settings are restored when the guard drops.
        let v_mf_ao: Array2<f64> = {
            let scoped = ScopedMeanField::mask_occupation(mf, eri.space.view());
            scoped.get().get_veff() - scoped.get().get_j()
        };
        let v_mf: Array1<f64> = eri
            .mo_coeff
            .t()
            .dot(&v_mf_ao)
            .dot(&eri.mo_coeff)
            .diag()
            .to_owned();

        let tdm: Array4<f64> = construct_tdm(tdhf);
        let tdm_s: Array3<f64> = tdm.sum_axis(Axis(1));

        // pole denominators, fixed for the entire run
        let evi: Array2<f64> = Array2::from_shape_fn((tdhf.nstates(), nocc), |(v, i)| {
            tdhf.e[v] - occ_energy[i]
        });
        let eva: Array2<f64> =
            Array2::from_shape_fn((tdhf.nstates(), vir_energy.len()), |(v, a)| {
                tdhf.e[v] + vir_energy[a]
            });

        Imds {
            eri,
            nocc,
            v_mf,
            tdm,
            tdm_s,
            evi,
            eva,
        }
    }

    /// The three additive parts of the right-hand side: the mean-field
    /// orbital energy, the bare-exchange self-energy and the (negated)
    /// double-counting correction.
    pub fn get_rhs_components(&self, p: &[usize]) -> (f64, f64, f64) {
        debug_assert_eq!(p.len(), 1);
        let p: usize = p[0];
        let moe: f64 = self.eri.mo_energy[p];
        let vk: f64 = if p < self.nocc {
            let oooo: ArrayView4<f64> = self.eri.block("oooo");
            -(0..self.nocc).map(|i| oooo[[p, i, i, p]]).sum::<f64>()
        } else {
            let ovvo: ArrayView4<f64> = self.eri.block("ovvo");
            let pv: usize = p - self.nocc;
            -(0..self.nocc).map(|i| ovvo[[i, pv, pv, i]]).sum::<f64>()
        };
        (moe, vk, -self.v_mf[p])
    }

    /// The assembled transition density tensor.
    pub fn tdm(&self) -> ArrayView4<f64> {
        self.tdm.view()
    }
}

impl<'a> Intermediates for Imds<'a> {
    fn entire_space(&self) -> Vec<Vec<usize>> {
        vec![(0..self.eri.nmo()).collect()]
    }

    fn get_rhs(&self, p: &[usize]) -> f64 {
        let (moe, vk, v_mf) = self.get_rhs_components(p);
        moe + vk + v_mf
    }

    fn get_sigma_element(&self, omega: f64, p: &[usize], eta: f64, vir_sign: f64) -> Complex64 {
        debug_assert_eq!(p.len(), 1);
        let p: usize = p[0];
        let (nstates, nocc) = self.evi.dim();
        let nvirt: usize = self.eva.ncols();

        let mut sigma: Complex64 = Complex64::zero();
        for v in 0..nstates {
            for i in 0..nocc {
                let t: f64 = self.tdm_s[[v, i, p]];
                sigma += Complex64::new(t * t, 0.0)
                    / Complex64::new(omega + self.evi[[v, i]], -eta);
            }
            for a in 0..nvirt {
                let t: f64 = self.tdm_s[[v, nocc + a, p]];
                sigma += Complex64::new(t * t, 0.0)
                    / Complex64::new(omega - self.eva[[v, a]], vir_sign * eta);
            }
        }
        sigma
    }

    fn initial_guess(&self, p: &[usize]) -> f64 {
        debug_assert_eq!(p.len(), 1);
        self.eri.mo_energy[p[0]]
    }
}

/// Builds the transition density tensor from the doubled TDHF amplitudes and
/// four integral blocks, one quadrant per block. The quadrants are glued
/// together along both orbital axes into one square matrix per excitation
/// and component.
fn construct_tdm(tdhf: &TdhfData) -> Array4<f64> {
    let eri: &MoIntegrals = &tdhf.eri;
    let td_xy: Array4<f64> = 2.0 * tdhf.xy();

    let tdm_oo: Array4<f64> = contract_quadrant(&td_xy, eri.block("oovo"));
    let tdm_ov: Array4<f64> = contract_quadrant(&td_xy, eri.block("oovv"));
    let tdm_vv: Array4<f64> = contract_quadrant(&td_xy, eri.block("ovvv"));

    // For a real-valued store the virtual-occupied quadrant is the conjugate
    // transpose of the occupied-virtual one; only a complex store needs the
    // fourth contraction.
    let tdm_vo: Array4<f64> = if eri.is_complex() {
        contract_quadrant(&td_xy, eri.block("ovvo"))
    } else {
        tdm_ov.view().permuted_axes([0, 1, 3, 2]).to_owned()
    };

    let top: Array4<f64> = concatenate![Axis(3), tdm_oo, tdm_ov];
    let bottom: Array4<f64> = concatenate![Axis(3), tdm_vo, tdm_vv];
    concatenate![Axis(2), top, bottom]
}

fn contract_quadrant(td_xy: &Array4<f64>, block: ArrayView4<f64>) -> Array4<f64> {
    einsum("vxia,ipaq->vxpq", &[td_xy, &block])
        .unwrap()
        .into_dimensionality::<Ix4>()
        .unwrap()
}
