//! The two numerically heavy operations of an SCF iteration, behind one
//! interface: building Coulomb/exchange matrices from densities and solving
//! the generalized eigenproblem F C = S C e.
//!
//! [`HostKernel`] is the serial reference implementation, [`AcceleratedKernel`]
//! runs the same computation on a dedicated worker pool. Which one a solver
//! uses is decided by [`Backend`].
use std::{borrow::Cow, fmt::Debug};

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::{
    density::Hermiticity,
    integrals::{ElectronTensor, McMurchieDavidson},
    system::MolecularSystem,
    Error, Result,
};

mod accelerated;
mod host;

pub use accelerated::AcceleratedKernel;
pub use host::HostKernel;

/// Where a kernel executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Device {
    Host,
    Accelerator { threads: usize },
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Host => write!(f, "host"),
            Device::Accelerator { threads } => write!(f, "accelerator ({threads} threads)"),
        }
    }
}

/// Which contributions a JK build should produce.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JkRequest {
    pub with_j: bool,
    pub with_k: bool,
    /// Range separation parameter, see [`McMurchieDavidson`].
    pub omega: Option<f64>,
}

impl Default for JkRequest {
    fn default() -> Self {
        Self {
            with_j: true,
            with_k: true,
            omega: None,
        }
    }
}

/// Result of a JK build: one matrix per input density for every requested contribution.
#[derive(Debug, Clone, PartialEq)]
pub struct JkBatch {
    pub vj: Option<Vec<DMatrix<f64>>>,
    pub vk: Option<Vec<DMatrix<f64>>>,
}

/// Solution of F C = S C e. Energies ascend, columns of `coefficients` are
/// the matching S-orthonormal eigenvectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Eigen {
    pub energies: DVector<f64>,
    pub coefficients: DMatrix<f64>,
}

/// The capability interface shared by reference and accelerated kernels.
///
/// Implementations must be interchangeable: the same inputs give results of
/// the same shape and, within numerical tolerance, the same values.
pub trait ScfKernel: Send + Sync + Debug {
    /// Returns the name of this kernel (e.g., "host", "accelerated").
    fn name(&self) -> &str;

    fn device(&self) -> Device;

    /// Coulomb and exchange matrices for a batch of N x N densities.
    ///
    /// J_ij = sum_kl (ij|kl) D_lk and K_ij = sum_kl (ik|lj) D_kl, where N is
    /// the number of atomic orbitals of `system`.
    fn build_jk(
        &self,
        system: &MolecularSystem,
        densities: &[DMatrix<f64>],
        hermi: Hermiticity,
        request: JkRequest,
    ) -> Result<JkBatch>;

    /// Solves the generalized symmetric eigenproblem F C = S C e.
    fn diagonalize(&self, fock: &DMatrix<f64>, overlap: &DMatrix<f64>) -> Result<Eigen>;
}

/// Kernel selection, as found in configuration files and on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "device", rename_all = "snake_case")]
pub enum Backend {
    #[default]
    Host,
    Accelerated {
        /// worker count, all available cores if unset
        #[serde(default)]
        threads: Option<usize>,
        /// retry on the host when the accelerated kernel fails
        #[serde(default = "fallback_default")]
        fallback: bool,
    },
}

fn fallback_default() -> bool {
    true
}

impl Backend {
    pub fn kernel(&self) -> Result<Box<dyn ScfKernel>> {
        Ok(match *self {
            Backend::Host => Box::new(HostKernel),
            Backend::Accelerated { threads, .. } => Box::new(AcceleratedKernel::new(threads)?),
        })
    }
}

/// Checks that every density is N x N for the basis of `system`.
pub(crate) fn check_densities(system: &MolecularSystem, densities: &[DMatrix<f64>]) -> Result<()> {
    let n_ao = system.n_ao();
    match densities.iter().find(|density| density.shape() != (n_ao, n_ao)) {
        Some(density) => Err(Error::DensityShape {
            rows: density.nrows(),
            cols: density.ncols(),
            n_ao,
        }),
        None => Ok(()),
    }
}

/// Repulsion integrals for the requested operator. The plain Coulomb tensor
/// is precomputed on the system, attenuated ones are evaluated on demand.
pub(crate) fn electron_tensor(
    system: &MolecularSystem,
    omega: Option<f64>,
    parallel: bool,
) -> Cow<'_, ElectronTensor> {
    match omega.filter(|&omega| omega != 0.0) {
        None => Cow::Borrowed(system.electron()),
        Some(omega) => {
            log::debug!("evaluating repulsion integrals for omega = {omega}");
            let integrator = McMurchieDavidson::range_separated(Some(omega));
            Cow::Owned(if parallel {
                ElectronTensor::par_from_basis(system.basis(), &integrator)
            } else {
                ElectronTensor::from_basis(system.basis(), &integrator)
            })
        }
    }
}

/// J_ij = sum_kl (ij|kl) D_lk
#[inline]
pub(crate) fn coulomb_element(
    eri: &ElectronTensor,
    density: &DMatrix<f64>,
    i: usize,
    j: usize,
) -> f64 {
    let n = density.nrows();
    let mut sum = 0.0;
    for l in 0..n {
        for k in 0..n {
            sum += eri[(i, j, k, l)] * density[(l, k)];
        }
    }
    sum
}

/// K_ij = sum_kl (ik|lj) D_kl
#[inline]
pub(crate) fn exchange_element(
    eri: &ElectronTensor,
    density: &DMatrix<f64>,
    i: usize,
    j: usize,
) -> f64 {
    let n = density.nrows();
    let mut sum = 0.0;
    for l in 0..n {
        for k in 0..n {
            sum += eri[(i, k, l, j)] * density[(k, l)];
        }
    }
    sum
}

/// Fills the lower triangle from the upper one according to `hermi`.
pub(crate) fn complete_triangle(matrix: &mut DMatrix<f64>, hermi: Hermiticity) {
    let sign = match hermi {
        Hermiticity::NonHermitian => return,
        Hermiticity::Hermitian => 1.0,
        Hermiticity::AntiHermitian => -1.0,
    };

    for j in 0..matrix.ncols() {
        for i in j + 1..matrix.nrows() {
            matrix[(i, j)] = sign * matrix[(j, i)];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Backend, Device};

    #[test]
    fn backend_from_json() {
        let host: Backend = serde_json::from_str(r#"{"device": "host"}"#).unwrap();
        assert_eq!(host, Backend::Host);

        let accelerated: Backend =
            serde_json::from_str(r#"{"device": "accelerated", "threads": 2}"#).unwrap();
        assert_eq!(
            accelerated,
            Backend::Accelerated {
                threads: Some(2),
                fallback: true
            }
        );
    }

    #[test]
    fn backend_selects_kernel() {
        let kernel = Backend::Host.kernel().unwrap();
        assert_eq!(kernel.device(), Device::Host);

        let kernel = Backend::Accelerated {
            threads: Some(2),
            fallback: false,
        }
        .kernel()
        .unwrap();
        assert_eq!(kernel.device(), Device::Accelerator { threads: 2 });
        assert_eq!(kernel.name(), "accelerated");
    }
}
