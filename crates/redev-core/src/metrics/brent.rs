/// Bracketed scalar root finding with Brent's method.
///
/// Combines bisection, the secant method, and inverse quadratic
/// interpolation, falling back to bisection whenever an interpolated step
/// would be unreliable. Returns `None` when `[a, b]` does not bracket a sign
/// change or the iteration budget runs out.
pub fn find_root<F>(f: F, a: f64, b: f64, tolerance: f64, max_iterations: u32) -> Option<f64>
where
    F: Fn(f64) -> f64,
{
    let mut a = a;
    let mut b = b;
    let mut fa = f(a);
    let mut fb = f(b);

    if fa * fb > 0.0 {
        return None;
    }

    // Keep |f(a)| >= |f(b)| so b is the best estimate.
    if fa.abs() < fb.abs() {
        std::mem::swap(&mut a, &mut b);
        std::mem::swap(&mut fa, &mut fb);
    }

    let mut c = a;
    let mut fc = fa;
    let mut d = b - a;
    let mut e = d;

    for _ in 0..max_iterations {
        if fb.abs() < tolerance {
            return Some(b);
        }

        let m = (c - b) / 2.0;
        if m.abs() <= tolerance {
            return Some(b);
        }

        let use_bisection;
        if fa != fc && fb != fc {
            // Inverse quadratic interpolation
            let r = fb / fc;
            let s = fb / fa;
            let t = fa / fc;
            let p = s * (t * (r - t) * (c - b) - (1.0 - r) * (b - a));
            let q = (t - 1.0) * (r - 1.0) * (s - 1.0);
            if p.abs() < (3.0 * m * q).abs() / 2.0 && p.abs() < (e * q).abs() / 2.0 {
                e = d;
                d = p / q;
                use_bisection = false;
            } else {
                use_bisection = true;
            }
        } else if fb != fa {
            // Secant step
            let s = fb / fa;
            let p = 2.0 * m * s;
            let q = 1.0 - s;
            if p.abs() < (3.0 * m * q).abs() / 2.0 && p.abs() < (e * q).abs() / 2.0 {
                e = d;
                d = p / q;
                use_bisection = false;
            } else {
                use_bisection = true;
            }
        } else {
            use_bisection = true;
        }

        if use_bisection {
            d = m;
            e = m;
        }

        a = b;
        fa = fb;

        if d.abs() > tolerance {
            b += d;
        } else {
            b += if m > 0.0 { tolerance } else { -tolerance };
        }
        fb = f(b);

        // Re-anchor c so [b, c] keeps bracketing the root.
        if (fb > 0.0 && fc > 0.0) || (fb < 0.0 && fc < 0.0) {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }

        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-12;

    #[test]
    fn test_finds_sqrt_two() {
        let root = find_root(|x| x * x - 2.0, 0.0, 2.0, TOL, 100).unwrap();
        assert!((root - std::f64::consts::SQRT_2).abs() < 1e-9);
    }

    #[test]
    fn test_finds_cubic_root() {
        let f = |x: f64| x * x * x - x - 2.0;
        let root = find_root(f, 1.0, 2.0, TOL, 100).unwrap();
        assert!(f(root).abs() < 1e-9);
    }

    #[test]
    fn test_reversed_bracket() {
        let root = find_root(|x| x * x - 2.0, 2.0, 0.0, TOL, 100).unwrap();
        assert!((root - std::f64::consts::SQRT_2).abs() < 1e-9);
    }

    #[test]
    fn test_no_sign_change_returns_none() {
        assert!(find_root(|x| x * x + 1.0, -1.0, 1.0, TOL, 100).is_none());
    }

    #[test]
    fn test_iteration_budget_exhausted_returns_none() {
        assert!(find_root(|x| x * x - 2.0, 0.0, 2.0, 1e-300, 3).is_none());
    }

    #[test]
    fn test_root_at_endpoint() {
        let root = find_root(|x| x - 1.0, 0.0, 1.0, TOL, 100).unwrap();
        assert!((root - 1.0).abs() < 1e-9);
    }
}
