//! McMurchie Davidon integration scheme.
//! Reference:
//!
//! [1] Goings, J. Integrals. https://joshuagoings.com/2017/04/28/integrals/
use std::f64::consts::PI;

use nalgebra::Vector3;

use crate::{
    atom::Atom,
    basis::{BasisFunction, ContractedGaussian, Gaussian},
};

use super::{
    utils::{coulomb_auxiliary, hermite_expansion},
    Integrator,
};

/// McMurchie-Davidson integrator.
///
/// `omega` selects the two-electron operator: `None` is the bare Coulomb
/// operator 1/r, a positive value the long-range part erf(omega r)/r and a
/// negative value the short-range part erfc(|omega| r)/r.
#[derive(Default, Copy, Clone, Debug, PartialEq)]
pub struct McMurchieDavidson {
    omega: Option<f64>,
}

impl McMurchieDavidson {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range_separated(omega: Option<f64>) -> Self {
        Self {
            omega: omega.filter(|&omega| omega != 0.0),
        }
    }

    pub fn omega(&self) -> Option<f64> {
        self.omega
    }
}

impl Integrator for McMurchieDavidson {
    type Function = BasisFunction;

    fn overlap(&self, functions: (&Self::Function, &Self::Function)) -> f64 {
        let (basis_a, basis_b) = functions;
        let diff = basis_a.position - basis_b.position;
        let (ContractedGaussian(data_a), ContractedGaussian(data_b)) =
            (&basis_a.contracted_gaussian, &basis_b.contracted_gaussian);

        let mut output = 0.0;
        for (&primitive_a, &primitive_b) in itertools::iproduct!(data_a, data_b) {
            output += primitive_a.coefficient
                * primitive_b.coefficient
                * primitive_overlap(primitive_a, primitive_b, diff);
        }
        output
    }

    fn kinetic(&self, functions: (&Self::Function, &Self::Function)) -> f64 {
        let (basis_a, basis_b) = functions;
        let diff = basis_a.position - basis_b.position;
        let (ContractedGaussian(data_a), ContractedGaussian(data_b)) =
            (&basis_a.contracted_gaussian, &basis_b.contracted_gaussian);

        let mut output = 0.0;
        for (&primitive_a, &primitive_b) in itertools::iproduct!(data_a, data_b) {
            output += primitive_a.coefficient
                * primitive_b.coefficient
                * primitive_kinetic(primitive_a, primitive_b, diff);
        }
        output
    }

    fn nuclear(&self, functions: (&Self::Function, &Self::Function), nuclei: &[Atom]) -> f64 {
        let (basis_a, basis_b) = functions;
        let diff = basis_a.position - basis_b.position;
        let (ContractedGaussian(data_a), ContractedGaussian(data_b)) =
            (&basis_a.contracted_gaussian, &basis_b.contracted_gaussian);

        let mut output = 0.0;
        for (&primitive_a, &primitive_b) in itertools::iproduct!(data_a, data_b) {
            let product_center = product_center(
                basis_a.position,
                primitive_a.exponent,
                basis_b.position,
                primitive_b.exponent,
            );

            let coefficient = primitive_a.coefficient * primitive_b.coefficient;
            for nucleus in nuclei {
                output += coefficient
                    * primitive_nuclear(primitive_a, primitive_b, diff, product_center, nucleus)
            }
        }

        output
    }

    fn electron_repulsion(
        &self,
        functions: (
            &Self::Function,
            &Self::Function,
            &Self::Function,
            &Self::Function,
        ),
    ) -> f64 {
        let (basis_a, basis_b, basis_c, basis_d) = functions;
        let diff_ab = basis_a.position - basis_b.position;
        let diff_cd = basis_c.position - basis_d.position;

        let mut output = 0.0;
        for (&primitive_a, &primitive_b) in itertools::iproduct!(
            basis_a.contracted_gaussian.primitives(),
            basis_b.contracted_gaussian.primitives()
        ) {
            let product_center_ab = product_center(
                basis_a.position,
                primitive_a.exponent,
                basis_b.position,
                primitive_b.exponent,
            );
            let bra = HermitePair::new(primitive_a, primitive_b, diff_ab);

            for (&primitive_c, &primitive_d) in itertools::iproduct!(
                basis_c.contracted_gaussian.primitives(),
                basis_d.contracted_gaussian.primitives()
            ) {
                let product_center_cd = product_center(
                    basis_c.position,
                    primitive_c.exponent,
                    basis_d.position,
                    primitive_d.exponent,
                );
                let ket = HermitePair::new(primitive_c, primitive_d, diff_cd);

                output += primitive_a.coefficient
                    * primitive_b.coefficient
                    * primitive_c.coefficient
                    * primitive_d.coefficient
                    * self.primitive_electron(&bra, &ket, product_center_ab - product_center_cd);
            }
        }

        output
    }
}

impl McMurchieDavidson {
    fn primitive_electron(
        &self,
        bra: &HermitePair,
        ket: &HermitePair,
        diff_product: Vector3<f64>,
    ) -> f64 {
        let (p, q) = (bra.exponent, ket.exponent);
        let alpha = p * q / (p + q);
        let prefactor = 2.0 * PI.powi(5).sqrt() * (p * q * (p + q).sqrt()).recip();

        let long_range = |omega: f64| {
            let attenuated = alpha * omega * omega / (alpha + omega * omega);
            (attenuated / alpha).sqrt() * hermite_coulomb(bra, ket, attenuated, diff_product)
        };

        prefactor
            * match self.omega {
                None => hermite_coulomb(bra, ket, alpha, diff_product),
                Some(omega) if omega > 0.0 => long_range(omega),
                Some(omega) => hermite_coulomb(bra, ket, alpha, diff_product) - long_range(-omega),
            }
    }
}

/// Hermite expansion coefficients of a primitive product, for all t, u, v.
struct HermitePair {
    exponent: f64,
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
}

impl HermitePair {
    fn new(primitive_a: Gaussian, primitive_b: Gaussian, diff: Vector3<f64>) -> Self {
        let Gaussian {
            exponent: a,
            angular: (l1, m1, n1),
            ..
        } = primitive_a;
        let Gaussian {
            exponent: b,
            angular: (l2, m2, n2),
            ..
        } = primitive_b;

        let axis = |i: i32, j: i32, diff: f64| {
            (0..=i + j)
                .map(|t| hermite_expansion([i, j, t], diff, a, b))
                .collect::<Vec<_>>()
        };

        Self {
            exponent: a + b,
            x: axis(l1, l2, diff.x),
            y: axis(m1, m2, diff.y),
            z: axis(n1, n2, diff.z),
        }
    }
}

fn hermite_coulomb(bra: &HermitePair, ket: &HermitePair, alpha: f64, diff: Vector3<f64>) -> f64 {
    let mut sum = 0.0;
    for (t1, &e1) in bra.x.iter().enumerate() {
        for (u1, &e2) in bra.y.iter().enumerate() {
            for (v1, &e3) in bra.z.iter().enumerate() {
                let bra_coefficient = e1 * e2 * e3;
                for (t2, &e4) in ket.x.iter().enumerate() {
                    for (u2, &e5) in ket.y.iter().enumerate() {
                        for (v2, &e6) in ket.z.iter().enumerate() {
                            // (-1)^(t2 + u2 + v2)
                            let sign = if (t2 + u2 + v2) % 2 == 0 { 1.0 } else { -1.0 };
                            sum += bra_coefficient
                                * e4
                                * e5
                                * e6
                                * sign
                                * coulomb_auxiliary(
                                    (t1 + t2) as i32,
                                    (u1 + u2) as i32,
                                    (v1 + v2) as i32,
                                    0,
                                    alpha,
                                    diff,
                                );
                        }
                    }
                }
            }
        }
    }
    sum
}

fn primitive_overlap(primitive_a: Gaussian, primitive_b: Gaussian, diff: Vector3<f64>) -> f64 {
    let Gaussian {
        exponent: exp_a,
        angular: (l1, m1, n1),
        ..
    } = primitive_a;

    let Gaussian {
        exponent: exp_b,
        angular: (l2, m2, n2),
        ..
    } = primitive_b;

    if [l1, m1, n1, l2, m2, n2].iter().any(|&l| l < 0) {
        return 0.0;
    }

    hermite_expansion([l1, l2, 0], diff.x, exp_a, exp_b)
        * hermite_expansion([m1, m2, 0], diff.y, exp_a, exp_b)
        * hermite_expansion([n1, n2, 0], diff.z, exp_a, exp_b)
        * (PI / (exp_a + exp_b)).powi(3).sqrt()
}

fn primitive_kinetic(primitive_a: Gaussian, primitive_b: Gaussian, diff: Vector3<f64>) -> f64 {
    let Gaussian {
        exponent: b_exp,
        angular: (l, m, n),
        ..
    } = primitive_b;

    let angular_step =
        |i, j, k| primitive_overlap(primitive_a, add_angular(primitive_b, [i, j, k]), diff);

    let term_0 =
        b_exp * (2 * (l + m + n) + 3) as f64 * primitive_overlap(primitive_a, primitive_b, diff);
    let term_1 = -2.0
        * b_exp.powi(2)
        * (angular_step(2, 0, 0) + angular_step(0, 2, 0) + angular_step(0, 0, 2));
    let term_2 = -0.5
        * ((l * (l - 1)) as f64 * angular_step(-2, 0, 0)
            + (m * (m - 1)) as f64 * angular_step(0, -2, 0)
            + (n * (n - 1)) as f64 * angular_step(0, 0, -2));
    term_0 + term_1 + term_2
}

fn primitive_nuclear(
    primitive_a: Gaussian,
    primitive_b: Gaussian,
    // difference of the positions of the two basis functions: a - b
    diff: Vector3<f64>,
    // the product center of the two basis functions
    product_center: Vector3<f64>,
    nucleus: &Atom,
) -> f64 {
    let Gaussian {
        exponent: a,
        angular: (l1, m1, n1),
        ..
    } = primitive_a;

    let Gaussian {
        exponent: b,
        angular: (l2, m2, n2),
        ..
    } = primitive_b;

    let p = a + b;
    let diff_nucleus = product_center - nucleus.position;

    let mut sum = 0.0;
    for t in 0..=l1 + l2 {
        let e1 = hermite_expansion([l1, l2, t], diff.x, a, b);
        for u in 0..=m1 + m2 {
            let e2 = hermite_expansion([m1, m2, u], diff.y, a, b);
            for v in 0..=n1 + n2 {
                let e3 = hermite_expansion([n1, n2, v], diff.z, a, b);
                sum += e1 * e2 * e3 * coulomb_auxiliary(t, u, v, 0, p, diff_nucleus)
            }
        }
    }
    (-nucleus.nuclear_charge() as f64 * std::f64::consts::TAU / p) * sum
}

#[inline(always)]
fn add_angular(gaussian: Gaussian, [i, j, k]: [i32; 3]) -> Gaussian {
    let Gaussian {
        angular: (l, m, n), ..
    } = gaussian;

    Gaussian {
        angular: (l + i, m + j, n + k),
        ..gaussian
    }
}

#[inline(always)]
fn product_center(
    a_pos: Vector3<f64>,
    a_exp: f64,
    b_pos: Vector3<f64>,
    b_exp: f64,
) -> Vector3<f64> {
    (a_exp * a_pos + b_exp * b_pos) / (a_exp + b_exp)
}
