//! Random variate generation and special functions for Beta posteriors.

use rand::Rng;
use std::f64::consts::PI;

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

/// Standard normal draw (Box–Muller).
pub fn standard_normal(rng: &mut impl Rng) -> f64 {
    // 1 - U keeps the argument of ln inside (0, 1].
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Gamma(shape, 1) draw using Marsaglia–Tsang.
pub fn gamma_sample(rng: &mut impl Rng, shape: f64) -> f64 {
    debug_assert!(shape > 0.0);
    if shape < 1.0 {
        let u = 1.0 - rng.gen::<f64>();
        return gamma_sample(rng, shape + 1.0) * u.powf(1.0 / shape);
    }

    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();
    loop {
        let x = standard_normal(rng);
        let v = 1.0 + c * x;
        if v <= 0.0 {
            continue;
        }
        let v = v * v * v;
        let u = 1.0 - rng.gen::<f64>();
        if u < 1.0 - 0.0331 * x.powi(4) {
            return d * v;
        }
        if u.ln() < 0.5 * x * x + d * (1.0 - v + v.ln()) {
            return d * v;
        }
    }
}

/// Beta(alpha, beta) draw as a ratio of Gamma variates.
pub fn beta_sample(rng: &mut impl Rng, alpha: f64, beta: f64) -> f64 {
    let x = gamma_sample(rng, alpha);
    let y = gamma_sample(rng, beta);
    x / (x + y)
}

/// Natural log of the Gamma function (Lanczos approximation).
pub fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        // Reflection formula.
        return (PI / (PI * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut a = LANCZOS_COEFFICIENTS[0];
    for (i, coefficient) in LANCZOS_COEFFICIENTS.iter().enumerate().skip(1) {
        a += coefficient / (x + i as f64);
    }
    let t = x + LANCZOS_G + 0.5;
    0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
}

pub fn ln_beta(a: f64, b: f64) -> f64 {
    ln_gamma(a) + ln_gamma(b) - ln_gamma(a + b)
}

/// Density of Beta(alpha, beta) at `x`; zero outside [0, 1].
pub fn beta_pdf(x: f64, alpha: f64, beta: f64) -> f64 {
    if !(0.0..=1.0).contains(&x) {
        return 0.0;
    }
    let left = if alpha == 1.0 { 0.0 } else { (alpha - 1.0) * x.ln() };
    let right = if beta == 1.0 { 0.0 } else { (beta - 1.0) * (1.0 - x).ln() };
    (left + right - ln_beta(alpha, beta)).exp()
}

/// Closed-form P(X_b > X_a) for X_a ~ Beta(alpha_a, beta_a) and
/// X_b ~ Beta(alpha_b, beta_b). `alpha_b` must be a positive integer.
pub fn probability_b_beats_a(alpha_a: f64, beta_a: f64, alpha_b: f64, beta_b: f64) -> f64 {
    let terms = alpha_b.round() as u64;
    let base = ln_beta(alpha_a, beta_a);
    let total: f64 = (0..terms)
        .map(|i| {
            let i = i as f64;
            (ln_beta(alpha_a + i, beta_a + beta_b)
                - (beta_b + i).ln()
                - ln_beta(1.0 + i, beta_b)
                - base)
                .exp()
        })
        .sum();
    total.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_ln_gamma_known_values() {
        assert!(ln_gamma(1.0).abs() < 1e-10);
        assert!(ln_gamma(2.0).abs() < 1e-10);
        assert!((ln_gamma(5.0) - 24f64.ln()).abs() < 1e-10);
        assert!((ln_gamma(0.5) - PI.sqrt().ln()).abs() < 1e-10);
    }

    #[test]
    fn test_beta_pdf_integrates_to_one() {
        let n = 10_000;
        let h = 1.0 / n as f64;
        let integral: f64 = (0..n)
            .map(|i| {
                let x0 = i as f64 * h;
                0.5 * h * (beta_pdf(x0, 3.0, 5.0) + beta_pdf(x0 + h, 3.0, 5.0))
            })
            .sum();
        assert!((integral - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_beta_pdf_uniform_and_outside_support() {
        assert!((beta_pdf(0.0, 1.0, 1.0) - 1.0).abs() < 1e-10);
        assert!((beta_pdf(0.7, 1.0, 1.0) - 1.0).abs() < 1e-10);
        assert_eq!(beta_pdf(1.2, 2.0, 2.0), 0.0);
        assert_eq!(beta_pdf(0.0, 2.0, 2.0), 0.0);
    }

    #[test]
    fn test_beta_sample_mean() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 20_000;
        let mean = (0..n).map(|_| beta_sample(&mut rng, 2.0, 8.0)).sum::<f64>() / n as f64;
        assert!((mean - 0.2).abs() < 0.01, "mean = {mean}");
    }

    #[test]
    fn test_gamma_sample_small_shape_mean() {
        let mut rng = StdRng::seed_from_u64(11);
        let n = 20_000;
        let mean = (0..n).map(|_| gamma_sample(&mut rng, 0.5)).sum::<f64>() / n as f64;
        assert!((mean - 0.5).abs() < 0.05, "mean = {mean}");
    }

    #[test]
    fn test_exact_probability_reference_cases() {
        assert!((probability_b_beats_a(1.0, 1.0, 1.0, 1.0) - 0.5).abs() < 1e-10);
        assert!((probability_b_beats_a(1.0, 1.0, 2.0, 1.0) - 2.0 / 3.0).abs() < 1e-10);
    }
}
