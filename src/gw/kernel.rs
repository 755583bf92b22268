use crate::defaults;
use crate::gw::imds::{Intermediates, QpEquation};
use crate::gw::solver::{bisect, newton, CallHistory, RootError};
use itertools::Itertools;
use log::{debug, error, warn};
use ndarray::prelude::*;
use rayon::prelude::*;
use std::fmt;
use std::str::FromStr;

/// Root search strategy for the quasiparticle equation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RootMethod {
    /// Fast local secant search from the initial guess; a convergence
    /// failure is fatal.
    Newton,
    /// Bisection on a fixed window; finds a root no matter what, though
    /// possibly one on a satellite branch.
    Bisect,
    /// Secant first, bisection over the recorded evaluations on failure.
    Fallback,
}

impl Default for RootMethod {
    fn default() -> Self {
        RootMethod::Fallback
    }
}

impl FromStr for RootMethod {
    type Err = GwError;

    fn from_str(s: &str) -> Result<Self, GwError> {
        match s {
            "newton" => Ok(RootMethod::Newton),
            "bisect" => Ok(RootMethod::Bisect),
            "fallback" => Ok(RootMethod::Fallback),
            _ => Err(GwError::Configuration(format!(
                "Cannot recognize method='{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for RootMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name: &str = match self {
            RootMethod::Newton => "newton",
            RootMethod::Bisect => "bisect",
            RootMethod::Fallback => "fallback",
        };
        write!(f, "{}", name)
    }
}

/// Options of a GW run.
#[derive(Clone, Debug)]
pub struct GwParams {
    /// Imaginary broadening of the self-energy poles.
    pub eta: f64,
    /// Sign of the broadening on the virtual pole branch.
    pub vir_sign: f64,
    /// Absolute tolerance of the root search.
    pub tol: f64,
    /// Iteration budget of each root finder.
    pub max_iter: usize,
    pub method: RootMethod,
    /// Single-shot linearized correction instead of the iterative search.
    pub linearized: bool,
}

impl Default for GwParams {
    fn default() -> Self {
        GwParams {
            eta: defaults::ETA,
            vir_sign: defaults::VIR_SIGN,
            tol: defaults::ROOT_TOL,
            max_iter: defaults::ROOT_MAX_ITER,
            method: RootMethod::default(),
            linearized: defaults::LINEARIZED,
        }
    }
}

#[derive(Debug, Clone)]
pub enum GwError {
    /// Invalid method string or a malformed orbital space.
    Configuration(String),
    /// The secant search exhausted its iteration budget. The full
    /// evaluation history is attached for diagnosis.
    Convergence {
        orbital: Vec<usize>,
        iterations: usize,
        history: Vec<(f64, f64)>,
    },
    /// No sign change over the bisection interval.
    Bracketing {
        orbital: Vec<usize>,
        lower: f64,
        upper: f64,
        history: Vec<(f64, f64)>,
    },
    /// The requested correction mode is not available.
    Unimplemented(String),
}

impl fmt::Display for GwError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GwError::Configuration(msg) => write!(f, "{}", msg),
            GwError::Convergence {
                orbital,
                iterations,
                history,
            } => write!(
                f,
                "root search @p={:?} did not converge within {} iterations ({} residual evaluations recorded)",
                orbital,
                iterations,
                history.len()
            ),
            GwError::Bracketing {
                orbital,
                lower,
                upper,
                history,
            } => write!(
                f,
                "no sign change of the residual @p={:?} on [{:.3e}, {:.3e}] ({} evaluations recorded)",
                orbital,
                lower,
                upper,
                history.len()
            ),
            GwError::Unimplemented(what) => write!(f, "{} is not implemented", what),
        }
    }
}

impl std::error::Error for GwError {}

/// Finds the quasiparticle energies for the requested orbitals.
///
/// Missing leading orbital dimensions default to the entire space, so a
/// container with `orb_dims > 1` can be driven with a plain orbital list.
/// The output tensor has one axis per orbital dimension with the sizes of
/// the requested index lists. Every orbital tuple is an independent root
/// search; the searches run in parallel and each one records its own
/// evaluation history.
pub fn kernel<I: Intermediates>(
    imds: &I,
    orbs: Option<Vec<Vec<usize>>>,
    params: &GwParams,
) -> Result<ArrayD<f64>, GwError> {
    if params.linearized {
        return Err(GwError::Unimplemented(
            "the linearized quasiparticle correction".to_string(),
        ));
    }

    // implementation consistency of the intermediates container
    let space: Vec<Vec<usize>> = imds.entire_space();
    if space.len() != imds.orb_dims() {
        return Err(GwError::Configuration(format!(
            "'entire_space' is not a list of length {}: got {} dimensions",
            imds.orb_dims(),
            space.len()
        )));
    }

    let mut orbs: Vec<Vec<usize>> = orbs.unwrap_or_else(|| space.clone());
    if orbs.len() < imds.orb_dims() {
        // missing leading dimensions default to the entire space
        let missing: usize = imds.orb_dims() - orbs.len();
        let mut expanded: Vec<Vec<usize>> = space[..missing].to_vec();
        expanded.append(&mut orbs);
        orbs = expanded;
    }

    let shape: Vec<usize> = orbs.iter().map(|dim| dim.len()).collect();
    let tuples: Vec<Vec<usize>> = orbs
        .iter()
        .map(|dim| dim.iter().copied())
        .multi_cartesian_product()
        .collect();

    let energies: Vec<f64> = tuples
        .par_iter()
        .map(|p| solve_orbital(imds, p, params))
        .collect::<Result<Vec<f64>, GwError>>()?;

    Ok(ArrayD::from_shape_vec(IxDyn(&shape), energies).unwrap())
}

/// One root search. Under the fallback strategy a failed secant run is
/// recovered with bisection over the interval the secant already explored,
/// provided the recorded residuals bracket a sign change.
fn solve_orbital<I: Intermediates>(
    imds: &I,
    p: &[usize],
    params: &GwParams,
) -> Result<f64, GwError> {
    let eq: QpEquation<I> = imds.quasiparticle_eq(p, params.eta, params.vir_sign);
    let func = |omega: f64| eq.eval(omega);
    let guess: f64 = imds.initial_guess(p);
    let mut history = CallHistory::new();

    let result: Result<f64, RootError> = match params.method {
        RootMethod::Newton => newton(&func, guess, params.tol, params.max_iter, &mut history),
        RootMethod::Bisect => bisect(
            &func,
            defaults::BISECT_LOWER,
            defaults::BISECT_UPPER,
            params.tol,
            params.max_iter,
            &mut history,
        ),
        RootMethod::Fallback => {
            match newton(&func, guess, params.tol, params.max_iter, &mut history) {
                Ok(root) => Ok(root),
                Err(RootError::Convergence { .. }) => {
                    let (lower, upper) = history.bracket().unwrap();
                    if history.sign_change() {
                        warn!(
                            "Failed to converge with newton, using bisect on the interval [{:.3e}, {:.3e}]",
                            lower, upper
                        );
                        bisect(&func, lower, upper, params.tol, params.max_iter, &mut history)
                    } else {
                        // the failed run never crossed the root, there is no
                        // bracket to hand to bisection
                        let (f_lower, f_upper) = history.bracket_values().unwrap();
                        Err(RootError::Bracketing {
                            lower,
                            upper,
                            f_lower,
                            f_upper,
                        })
                    }
                }
                Err(err) => Err(err),
            }
        }
    };

    result.map_err(|err| {
        dump_history(p, &history);
        match err {
            RootError::Convergence { iterations } => GwError::Convergence {
                orbital: p.to_vec(),
                iterations,
                history: history.to_pairs(),
            },
            RootError::Bracketing { lower, upper, .. } => GwError::Bracketing {
                orbital: p.to_vec(),
                lower,
                upper,
                history: history.to_pairs(),
            },
        }
    })
}

/// On a fatal failure every attempted evaluation goes to the log, plus a
/// machine-readable copy at debug level.
fn dump_history(p: &[usize], history: &CallHistory) {
    error!(
        "Root search failed @p={:?} after {} residual evaluations:",
        p,
        history.len()
    );
    for (omega, residual) in history.pairs() {
        error!("  omega = {:+.10e}    residual = {:+.10e}", omega, residual);
    }
    if let Ok(json) = serde_json::to_string(&history.to_pairs()) {
        debug!("call history @p={:?}: {}", p, json);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use num_complex::Complex64;

    /// Linear residual, orb_dims = 2: the root for (p, q) is just rhs(p, q).
    struct PairIndexed {
        n: usize,
    }

    impl Intermediates for PairIndexed {
        fn orb_dims(&self) -> usize {
            2
        }

        fn entire_space(&self) -> Vec<Vec<usize>> {
            vec![(0..self.n).collect(), (0..self.n).collect()]
        }

        fn get_rhs(&self, p: &[usize]) -> f64 {
            (10 * p[0] + p[1]) as f64 * 0.01
        }

        fn get_sigma_element(&self, _omega: f64, _p: &[usize], _eta: f64, _vs: f64) -> Complex64 {
            Complex64::new(0.0, 0.0)
        }

        fn initial_guess(&self, p: &[usize]) -> f64 {
            self.get_rhs(p)
        }
    }

    /// Scalar residual shaped by a closure on omega.
    struct Shaped<F: Fn(f64) -> f64 + Sync> {
        shape: F,
        guess: f64,
    }

    impl<F: Fn(f64) -> f64 + Sync> Intermediates for Shaped<F> {
        fn entire_space(&self) -> Vec<Vec<usize>> {
            vec![vec![0]]
        }

        fn get_rhs(&self, _p: &[usize]) -> f64 {
            0.0
        }

        fn get_sigma_element(&self, omega: f64, _p: &[usize], _eta: f64, _vs: f64) -> Complex64 {
            // residual = omega - Re(sigma) - rhs = shape(omega)
            Complex64::new(omega - (self.shape)(omega), 0.0)
        }

        fn initial_guess(&self, _p: &[usize]) -> f64 {
            self.guess
        }
    }

    #[test]
    fn missing_leading_dimensions_expand_to_the_entire_space() {
        let imds = PairIndexed { n: 5 };
        let result = kernel(&imds, Some(vec![vec![3]]), &GwParams::default()).unwrap();
        assert_eq!(result.shape(), &[5, 1]);
        for p in 0..5 {
            assert_abs_diff_eq!(result[[p, 0]], (10 * p + 3) as f64 * 0.01, epsilon = 1e-9);
        }
    }

    #[test]
    fn malformed_entire_space_is_a_configuration_error() {
        struct Broken;
        impl Intermediates for Broken {
            fn orb_dims(&self) -> usize {
                2
            }
            fn entire_space(&self) -> Vec<Vec<usize>> {
                vec![vec![0, 1]]
            }
            fn get_rhs(&self, _p: &[usize]) -> f64 {
                0.0
            }
            fn get_sigma_element(&self, _o: f64, _p: &[usize], _e: f64, _v: f64) -> Complex64 {
                Complex64::new(0.0, 0.0)
            }
            fn initial_guess(&self, _p: &[usize]) -> f64 {
                0.0
            }
        }
        match kernel(&Broken, None, &GwParams::default()) {
            Err(GwError::Configuration(msg)) => assert!(msg.contains("entire_space")),
            other => panic!("expected a configuration error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn unknown_method_strings_are_rejected() {
        assert!("fallback".parse::<RootMethod>().is_ok());
        match "brent".parse::<RootMethod>() {
            Err(GwError::Configuration(msg)) => assert!(msg.contains("brent")),
            other => panic!("expected a configuration error, got {:?}", other),
        }
    }

    #[test]
    fn linearized_mode_is_unimplemented() {
        let imds = PairIndexed { n: 2 };
        let params = GwParams {
            linearized: true,
            ..GwParams::default()
        };
        match kernel(&imds, None, &params) {
            Err(GwError::Unimplemented(_)) => {}
            other => panic!("expected an unimplemented error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn bisection_results_are_reproducible() {
        let imds = Shaped {
            shape: |omega: f64| omega - 0.731,
            guess: 0.0,
        };
        let params = GwParams {
            method: RootMethod::Bisect,
            ..GwParams::default()
        };
        let first = kernel(&imds, None, &params).unwrap();
        let second = kernel(&imds, None, &params).unwrap();
        // bit-identical, not merely close
        assert_eq!(first.as_slice().unwrap(), second.as_slice().unwrap());
        assert_abs_diff_eq!(first[[0]], 0.731, epsilon = 1e-8);
    }

    #[test]
    fn fallback_without_a_recorded_sign_change_fails_fatally() {
        // constant residual of 1: the secant stalls immediately and the
        // history stays strictly positive
        let imds = Shaped {
            shape: |_omega: f64| 1.0,
            guess: 6.0,
        };
        let params = GwParams {
            method: RootMethod::Fallback,
            ..GwParams::default()
        };
        match kernel(&imds, None, &params) {
            Err(GwError::Bracketing { history, .. }) => assert!(!history.is_empty()),
            other => panic!("expected a bracketing failure, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn fallback_recovers_through_the_recorded_bracket() {
        let _ = env_logger::builder().is_test(true).try_init();
        // the secant oscillates on the odd cube root without converging,
        // while its evaluations quickly surround the root at 0.5
        let imds = Shaped {
            shape: |omega: f64| (omega - 0.5).cbrt(),
            guess: 1.0,
        };
        let params = GwParams {
            method: RootMethod::Fallback,
            ..GwParams::default()
        };
        let root = kernel(&imds, None, &params).unwrap();
        assert_abs_diff_eq!(root[[0]], 0.5, epsilon = 1e-6);

        // the same residual under plain newton is a fatal convergence
        // failure with the history attached
        let params = GwParams {
            method: RootMethod::Newton,
            ..GwParams::default()
        };
        match kernel(&imds, None, &params) {
            Err(GwError::Convergence { history, .. }) => assert!(history.len() > 100),
            other => panic!("expected a convergence failure, got {:?}", other.map(|_| ())),
        }
    }
}
