use std::f32::consts::{E, PI};

/// `0.5 * ln(2π)`, the constant term of a univariate normal log-density
pub const HALF_LN_2PI: f32 = 0.918_938_5;

/// Differential entropy of a diagonal Gaussian with standard deviations `sigma`
///
/// H = Σ<sub>i</sub> 0.5 * ln(2πeσ<sub>i</sub><sup>2</sup>)
pub fn gauss_entropy(sigma: &[f32]) -> f32 {
    sigma
        .iter()
        .map(|s| 0.5 * (2.0 * PI * E * s * s).ln())
        .sum()
}

/// Log-density of `x` under a diagonal Gaussian
pub fn gauss_log_density(x: &[f32], mu: &[f32], sigma: &[f32]) -> f32 {
    x.iter()
        .zip(mu)
        .zip(sigma)
        .map(|((x, m), s)| {
            let z = (x - m) / s;
            -0.5 * z * z - s.ln() - HALF_LN_2PI
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use statrs::distribution::{Continuous, Normal};
    use statrs::statistics::Distribution;

    use super::*;

    #[test]
    fn entropy_matches_statrs() {
        for sigma in [0.1, 0.5, 1.0, 3.0] {
            let expected = Normal::new(0.0, sigma).unwrap().entropy().unwrap();
            let actual = gauss_entropy(&[sigma as f32]);
            assert!(
                (actual as f64 - expected).abs() < 1e-5,
                "entropy for sigma={sigma}: {actual} vs {expected}"
            );
        }
    }

    #[test]
    fn entropy_sums_over_dimensions() {
        let one = gauss_entropy(&[0.7]);
        let two = gauss_entropy(&[0.7, 0.7]);
        assert!((two - 2.0 * one).abs() < 1e-6, "independent dims add up");
    }

    #[test]
    fn log_density_matches_statrs() {
        let (x, mu, sigma) = ([0.3, -1.2], [0.0, -1.0], [0.5, 2.0]);
        let expected: f64 = (0..2)
            .map(|i| {
                Normal::new(mu[i] as f64, sigma[i] as f64)
                    .unwrap()
                    .ln_pdf(x[i] as f64)
            })
            .sum();
        let actual = gauss_log_density(&x, &mu, &sigma);
        assert!(
            (actual as f64 - expected).abs() < 1e-5,
            "log density {actual} vs {expected}"
        );
    }
}
