use statrs::function::erf;
use std::f64::consts::SQRT_2;

const SQRT_TWO_PI: f64 = 2.506_628_274_631_000_7;

/// The mode of a standard skew-normal lies inside this bracket for any skew.
const MODE_SEARCH_BRACKET: (f64, f64) = (-1.0, 1.0);
const MODE_SEARCH_TOLERANCE: f64 = 1e-9;

fn normal_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / SQRT_TWO_PI
}

fn normal_cdf(x: f64) -> f64 {
    0.5 * erf::erfc(-x / SQRT_2)
}

/// Standard (location 0, scale 1) skew-normal density: 2·φ(x)·Φ(skew·x).
pub fn standard_pdf(x: f64, skew: f64) -> f64 {
    2.0 * normal_pdf(x) * normal_cdf(skew * x)
}

/// Skew-normal density with location and scale.
pub fn pdf(x: f64, skew: f64, location: f64, scale: f64) -> f64 {
    standard_pdf((x - location) / scale, skew) / scale
}

/// Offset between the mode and the location parameter of the standard
/// density.
///
/// The skew-normal mode has no closed form, so it is found by locally
/// maximising the standard density with a golden-section search.
pub fn standard_mode_offset(skew: f64) -> f64 {
    let (a, b) = MODE_SEARCH_BRACKET;
    golden_section_max(|x| standard_pdf(x, skew), a, b, MODE_SEARCH_TOLERANCE)
}

/// Location parameter that places the distribution mode at `peak`.
pub fn location_for_peak(peak: f64, skew: f64, scale: f64) -> f64 {
    peak - scale * standard_mode_offset(skew)
}

/// Golden-section search for the maximum of a unimodal function on [a, b].
fn golden_section_max<F>(f: F, mut a: f64, mut b: f64, tolerance: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    const INV_PHI: f64 = 0.618_033_988_749_894_9;

    let mut c = b - INV_PHI * (b - a);
    let mut d = a + INV_PHI * (b - a);
    let mut fc = f(c);
    let mut fd = f(d);

    while (b - a).abs() > tolerance {
        if fc > fd {
            b = d;
            d = c;
            fd = fc;
            c = b - INV_PHI * (b - a);
            fc = f(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + INV_PHI * (b - a);
            fd = f(d);
        }
    }

    0.5 * (a + b)
}
