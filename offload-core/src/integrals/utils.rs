//! Hermite Gaussian building blocks of the McMurchie-Davidson scheme.
//!
//! [1] Helgaker, Jorgensen, Olsen. Molecular Electronic-Structure Theory, ch. 9.
use nalgebra::Vector3;

/// Hermite expansion coefficient E^{ij}_t of the overlap distribution of two
/// 1D Gaussians with exponents `a` and `b`, separated by `diff` = A - B.
pub(super) fn hermite_expansion([i, j, t]: [i32; 3], diff: f64, a: f64, b: f64) -> f64 {
    let p = a + b;
    let q = a * b / p;

    if t < 0 || t > i + j || i < 0 || j < 0 {
        0.0
    } else if i == 0 && j == 0 && t == 0 {
        (-q * diff * diff).exp()
    } else if j == 0 {
        (2.0 * p).recip() * hermite_expansion([i - 1, j, t - 1], diff, a, b)
            - (q * diff / a) * hermite_expansion([i - 1, j, t], diff, a, b)
            + (t + 1) as f64 * hermite_expansion([i - 1, j, t + 1], diff, a, b)
    } else {
        (2.0 * p).recip() * hermite_expansion([i, j - 1, t - 1], diff, a, b)
            + (q * diff / b) * hermite_expansion([i, j - 1, t], diff, a, b)
            + (t + 1) as f64 * hermite_expansion([i, j - 1, t + 1], diff, a, b)
    }
}

/// Hermite Coulomb integral R^n_{tuv} for reduced exponent `p` and `diff` = P - C.
pub(super) fn coulomb_auxiliary(t: i32, u: i32, v: i32, n: i32, p: f64, diff: Vector3<f64>) -> f64 {
    if t < 0 || u < 0 || v < 0 {
        return 0.0;
    }

    if t == 0 && u == 0 && v == 0 {
        let x = p * diff.norm_squared();
        return (-2.0 * p).powi(n) * boys(n as u32, x);
    }

    if t == 0 && u == 0 {
        (v - 1) as f64 * coulomb_auxiliary(t, u, v - 2, n + 1, p, diff)
            + diff.z * coulomb_auxiliary(t, u, v - 1, n + 1, p, diff)
    } else if t == 0 {
        (u - 1) as f64 * coulomb_auxiliary(t, u - 2, v, n + 1, p, diff)
            + diff.y * coulomb_auxiliary(t, u - 1, v, n + 1, p, diff)
    } else {
        (t - 1) as f64 * coulomb_auxiliary(t - 2, u, v, n + 1, p, diff)
            + diff.x * coulomb_auxiliary(t - 1, u, v, n + 1, p, diff)
    }
}

/// Boys function F_n(x) = int_0^1 t^2n exp(-x t^2) dt
pub(super) fn boys(n: u32, x: f64) -> f64 {
    const TINY: f64 = 1e-13;
    const ASYMPTOTIC: f64 = 40.0;

    if x < TINY {
        return (2.0 * n as f64 + 1.0).recip();
    }

    if x > ASYMPTOTIC {
        // (2n-1)!! / 2^(n+1) * sqrt(pi / x^(2n+1))
        let double_factorial = (1..2 * n as u64).step_by(2).product::<u64>() as f64;
        return double_factorial / 2f64.powi(n as i32 + 1)
            * (std::f64::consts::PI / x.powi(2 * n as i32 + 1)).sqrt();
    }

    // all terms are positive, so the series is stable for any x below the asymptotic cutoff
    let mut term = (2.0 * n as f64 + 1.0).recip();
    let mut sum = term;
    let mut k = 1.0;
    while term > sum * 1e-17 {
        term *= 2.0 * x / (2.0 * n as f64 + 2.0 * k + 1.0);
        sum += term;
        k += 1.0;
    }
    (-x).exp() * sum
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    use super::{boys, coulomb_auxiliary, hermite_expansion};

    #[test]
    fn boys_reference_values() {
        assert_relative_eq!(boys(0, 1.0), 0.7468241328124269, max_relative = 1e-12);
        assert_relative_eq!(boys(1, 1.0), 0.18947234582049163, max_relative = 1e-12);
        assert_relative_eq!(boys(2, 5.0), 0.010995436178434312, max_relative = 1e-12);
        assert_relative_eq!(boys(6, 0.3), 0.059348523582398977, max_relative = 1e-12);
        assert_relative_eq!(boys(4, 20.0), 8.127855549358555e-06, max_relative = 1e-10);
        assert_relative_eq!(boys(0, 50.0), 0.12533141373152903, max_relative = 1e-12);
        assert_relative_eq!(boys(3, 45.0), 2.7183314798391283e-06, max_relative = 1e-9);
        assert_relative_eq!(boys(0, 0.0), 1.0);
        assert_relative_eq!(boys(2, 0.0), 0.2);
    }

    #[test]
    fn boys_is_continuous_at_cutoff() {
        for n in 0..8 {
            assert_relative_eq!(boys(n, 40.0 - 1e-9), boys(n, 40.0 + 1e-9), max_relative = 1e-7);
        }
    }

    #[test]
    fn hermite_expansion_of_s_functions() {
        // E^{00}_0 is the Gaussian product prefactor
        let value = hermite_expansion([0, 0, 0], 1.5, 0.7, 0.3);
        assert_relative_eq!(value, (-0.21 * 1.5 * 1.5_f64).exp(), epsilon = 1e-14);
        assert_eq!(hermite_expansion([0, 0, 1], 1.5, 0.7, 0.3), 0.0);
    }

    #[test]
    fn coulomb_auxiliary_is_odd_in_displacement() {
        let diff = Vector3::new(0.3, -0.2, 0.5);
        let plus = coulomb_auxiliary(1, 0, 1, 0, 0.9, diff);
        let minus = coulomb_auxiliary(1, 0, 1, 0, 0.9, -diff);
        assert_relative_eq!(plus, minus, epsilon = 1e-14);

        let plus = coulomb_auxiliary(0, 1, 0, 0, 0.9, diff);
        let minus = coulomb_auxiliary(0, 1, 0, 0, 0.9, -diff);
        assert_relative_eq!(plus, -minus, epsilon = 1e-14);
    }
}
