use std::fmt;

/// Ordered record of every residual evaluation made during one root search.
/// The fallback strategy derives its bisection bracket from it, and on a
/// fatal failure the whole record goes into the log.
#[derive(Debug, Clone, Default)]
pub struct CallHistory {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl CallHistory {
    pub fn new() -> Self {
        CallHistory::default()
    }

    pub fn record(&mut self, x: f64, y: f64) {
        self.x.push(x);
        self.y.push(y);
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }

    pub fn to_pairs(&self) -> Vec<(f64, f64)> {
        self.pairs().collect()
    }

    /// Extremal abscissas visited so far, (min, max).
    pub fn bracket(&self) -> Option<(f64, f64)> {
        if self.is_empty() {
            return None;
        }
        let lower: f64 = self.x.iter().fold(f64::INFINITY, |m, &x| m.min(x));
        let upper: f64 = self.x.iter().fold(f64::NEG_INFINITY, |m, &x| m.max(x));
        Some((lower, upper))
    }

    /// Residual values at the extremal abscissas, in the same order as
    /// [`CallHistory::bracket`].
    pub fn bracket_values(&self) -> Option<(f64, f64)> {
        let (lower, upper) = self.bracket()?;
        let at = |x0: f64| {
            self.pairs()
                .find(|&(x, _)| x == x0)
                .map(|(_, y)| y)
                .unwrap()
        };
        Some((at(lower), at(upper)))
    }

    /// True if the residuals at the extremal abscissas differ in sign, i.e.
    /// the visited interval brackets a root.
    pub fn sign_change(&self) -> bool {
        match self.bracket_values() {
            Some((f_lower, f_upper)) => f_lower.signum() != f_upper.signum(),
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RootError {
    /// The iteration budget was exhausted or the secant stalled on a flat
    /// segment.
    Convergence { iterations: usize },
    /// The residual does not change sign over the search interval.
    Bracketing {
        lower: f64,
        upper: f64,
        f_lower: f64,
        f_upper: f64,
    },
}

impl fmt::Display for RootError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RootError::Convergence { iterations } => {
                write!(f, "root search did not converge within {} iterations", iterations)
            }
            RootError::Bracketing {
                lower,
                upper,
                f_lower,
                f_upper,
            } => write!(
                f,
                "no sign change on [{:.3e}, {:.3e}]: f(a) = {:.3e}, f(b) = {:.3e}",
                lower, upper, f_lower, f_upper
            ),
        }
    }
}

impl std::error::Error for RootError {}

/// Derivative-free secant search for a root of `func` starting from `x0`.
/// The second starting point is displaced from `x0` by a relative and an
/// absolute offset, and the search stops once the step size drops below
/// `tol`. Every evaluation is recorded in `history`.
pub fn newton<F: Fn(f64) -> f64>(
    func: &F,
    x0: f64,
    tol: f64,
    maxiter: usize,
    history: &mut CallHistory,
) -> Result<f64, RootError> {
    let eps: f64 = 1.0e-4;
    let mut p0: f64 = x0;
    let mut p1: f64 = if x0 >= 0.0 {
        x0 * (1.0 + eps) + eps
    } else {
        x0 * (1.0 + eps) - eps
    };
    let mut q0: f64 = func(p0);
    history.record(p0, q0);
    let mut q1: f64 = func(p1);
    history.record(p1, q1);
    // the point with the smaller residual leads the iteration
    if q1.abs() < q0.abs() {
        std::mem::swap(&mut p0, &mut p1);
        std::mem::swap(&mut q0, &mut q1);
    }

    for itr in 0..maxiter {
        if q1 == q0 {
            if p1 != p0 {
                // secant slope vanished before the step size converged
                return Err(RootError::Convergence { iterations: itr });
            }
            return Ok(0.5 * (p0 + p1));
        }
        // secant step, formulated to avoid cancellation in the quotient
        let p: f64 = if q1.abs() > q0.abs() {
            (-q0 / q1 * p1 + p0) / (1.0 - q0 / q1)
        } else {
            (-q1 / q0 * p0 + p1) / (1.0 - q1 / q0)
        };
        if (p - p1).abs() <= tol {
            return Ok(p);
        }
        p0 = p1;
        q0 = q1;
        p1 = p;
        q1 = func(p1);
        history.record(p1, q1);
    }
    Err(RootError::Convergence {
        iterations: maxiter,
    })
}

/// Bisection search on `[a, b]`. The residual must change sign over the
/// interval. Converges once the half width of the interval drops below
/// `tol`. Every evaluation is recorded in `history`.
pub fn bisect<F: Fn(f64) -> f64>(
    func: &F,
    a: f64,
    b: f64,
    tol: f64,
    maxiter: usize,
    history: &mut CallHistory,
) -> Result<f64, RootError> {
    let mut lo: f64 = a;
    let mut hi: f64 = b;
    let mut flo: f64 = func(lo);
    history.record(lo, flo);
    let fhi: f64 = func(hi);
    history.record(hi, fhi);

    if flo == 0.0 {
        return Ok(lo);
    }
    if fhi == 0.0 {
        return Ok(hi);
    }
    if flo.signum() == fhi.signum() {
        return Err(RootError::Bracketing {
            lower: a,
            upper: b,
            f_lower: flo,
            f_upper: fhi,
        });
    }

    for _ in 0..maxiter {
        let mid: f64 = 0.5 * (lo + hi);
        let fmid: f64 = func(mid);
        history.record(mid, fmid);
        if fmid == 0.0 || 0.5 * (hi - lo) <= tol {
            return Ok(mid);
        }
        if fmid.signum() == flo.signum() {
            lo = mid;
            flo = fmid;
        } else {
            hi = mid;
        }
    }
    Err(RootError::Convergence {
        iterations: maxiter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn secant_finds_the_quadratic_root() {
        let func = |x: f64| x * x - 2.0;
        let mut history = CallHistory::new();
        let root: f64 = newton(&func, 1.0, 1e-12, 100, &mut history).unwrap();
        assert_abs_diff_eq!(root, 2.0_f64.sqrt(), epsilon = 1e-10);
        // two starting points plus one evaluation per accepted step
        assert!(history.len() >= 3);
    }

    #[test]
    fn secant_stalls_on_a_flat_segment() {
        // constant residual around the starting point
        let func = |_x: f64| 1.0;
        let mut history = CallHistory::new();
        let err = newton(&func, 6.0, 1e-9, 100, &mut history).unwrap_err();
        assert_eq!(err, RootError::Convergence { iterations: 0 });
        assert!(!history.sign_change());
    }

    #[test]
    fn secant_oscillates_on_a_cube_root() {
        // the secant step overshoots indefinitely on f(x) = cbrt(x - 1/2),
        // while the recorded evaluations end up on both sides of the root
        let func = |x: f64| (x - 0.5).cbrt();
        let mut history = CallHistory::new();
        let err = newton(&func, 1.0, 1e-9, 100, &mut history).unwrap_err();
        assert_eq!(err, RootError::Convergence { iterations: 100 });
        assert!(history.sign_change());
    }

    #[test]
    fn bisection_finds_the_linear_root() {
        let func = |x: f64| x - 1.2345;
        let mut history = CallHistory::new();
        let root: f64 = bisect(&func, -100.0, 100.0, 1e-9, 100, &mut history).unwrap();
        assert_abs_diff_eq!(root, 1.2345, epsilon = 1e-8);
    }

    #[test]
    fn bisection_rejects_an_unbracketed_interval() {
        let func = |x: f64| x * x + 1.0;
        let mut history = CallHistory::new();
        let err = bisect(&func, -1.0, 1.0, 1e-9, 100, &mut history).unwrap_err();
        match err {
            RootError::Bracketing { f_lower, f_upper, .. } => {
                assert!(f_lower > 0.0 && f_upper > 0.0);
            }
            other => panic!("expected a bracketing failure, got {}", other),
        }
    }

    #[test]
    fn history_tracks_bracket_and_signs() {
        let mut history = CallHistory::new();
        history.record(0.5, 1.0);
        history.record(-0.25, -2.0);
        history.record(0.1, 0.3);
        assert_eq!(history.bracket(), Some((-0.25, 0.5)));
        assert_eq!(history.bracket_values(), Some((-2.0, 1.0)));
        assert!(history.sign_change());
    }
}
