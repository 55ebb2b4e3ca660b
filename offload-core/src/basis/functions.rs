use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Function of the form K*x^i*y^j*z^k*exp(-alpha*x^2)
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gaussian {
    pub exponent: f64,
    /// The coefficient of this gaussian and optionally the normalization constant
    pub coefficient: f64,
    /// (i, j, k) exponents of polynomial terms
    pub angular: (i32, i32, i32),
}

impl Gaussian {
    pub fn norm(exponent: f64, angular: (i32, i32, i32)) -> f64 {
        let (i, j, k) = angular;

        (std::f64::consts::FRAC_2_PI * exponent)
            .powi(3)
            .sqrt()
            .sqrt()
            * f64::sqrt(
                (8.0 * exponent).powi(i + j + k)
                    / ((i + 1..=2 * i).product::<i32>()
                        * (j + 1..=2 * j).product::<i32>()
                        * (k + 1..=2 * k).product::<i32>()) as f64,
            )
    }
}

/// Linear combination of many [`Gaussian`]s
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContractedGaussian(pub SmallVec<[Gaussian; 6]>);

impl ContractedGaussian {
    /// Rescales the coefficients so the contracted function has unit self overlap.
    /// All primitives of a contraction share the same angular part.
    pub fn normalized(self) -> Self {
        let Self(primitives) = self;

        let mut self_overlap = 0.0;
        for (a, b) in itertools::iproduct!(&primitives, &primitives) {
            self_overlap +=
                a.coefficient * b.coefficient * same_center_overlap(a.exponent + b.exponent, a.angular);
        }

        if self_overlap <= 0.0 {
            return Self(primitives);
        }

        let scale = self_overlap.sqrt().recip();
        Self(
            primitives
                .into_iter()
                .map(|gaussian| Gaussian {
                    coefficient: gaussian.coefficient * scale,
                    ..gaussian
                })
                .collect(),
        )
    }

    pub fn primitives(&self) -> &[Gaussian] {
        &self.0
    }
}

/// int x^2i y^2j z^2k exp(-p r^2) over all space
fn same_center_overlap(p: f64, (i, j, k): (i32, i32, i32)) -> f64 {
    let axis = |l: i32| {
        let double_factorial = (1..2 * l).step_by(2).product::<i32>() as f64;
        double_factorial / (2.0 * p).powi(l) * (std::f64::consts::PI / p).sqrt()
    };
    axis(i) * axis(j) * axis(k)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BasisFunction {
    /// The type of basis function this basis function has
    pub contracted_gaussian: ContractedGaussian,
    /// The position of this basis function, in natural units
    pub position: Vector3<f64>,
}
