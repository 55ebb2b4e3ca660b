//! Hartree-Fock solvers.
//!
//! [`ScfMethod`] is the surface the SCF driver works against. The reference
//! solvers [`Rhf`], [`Uhf`] and [`Ghf`] run their JK builds and
//! diagonalizations on the [`HostKernel`](crate::kernel::HostKernel);
//! [`Accelerated`] wraps any of them and moves exactly those two operations to
//! another kernel while delegating everything else.
mod accelerated;
mod ghf;
mod rhf;
mod scf;
mod uhf;
pub(crate) mod utils;

use std::fmt::Debug;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub use accelerated::Accelerated;
pub use ghf::Ghf;
pub use rhf::Rhf;
pub use scf::{run_scf, ScfOutput};
pub use uhf::Uhf;

use crate::{
    density::{Hermiticity, SpinKind, SpinMatrix},
    jk::JkMatrices,
    kernel::{Backend, Device, Eigen, JkRequest},
    system::MolecularSystem,
    Result,
};

/// Wolfsberg-Helmholz constant of the extended Hueckel guess, halved.
const HUECKEL_FACTOR: f64 = 0.875;

/// Parameters of the SCF iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HartreeFockConfig {
    /// the maximum number of iterations to try
    pub max_iterations: usize,
    /// the smallest number that isn't treated as zero. If the density matrix
    /// rms changes by less than this, the system is considered converged.
    pub epsilon: f64,
}

impl Default for HartreeFockConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            epsilon: 1e-6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    /// Restricted (closed shell) Hartree-Fock
    Rhf,
    /// Unrestricted Hartree-Fock
    Uhf,
    /// Generalized Hartree-Fock over two-component spinors
    Ghf,
}

impl MethodKind {
    /// Spin layout of the densities this method works with.
    pub fn spin_kind(&self) -> SpinKind {
        match self {
            MethodKind::Rhf => SpinKind::Restricted,
            MethodKind::Uhf => SpinKind::Unrestricted,
            MethodKind::Ghf => SpinKind::TwoComponent,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MethodKind::Rhf => "RHF",
            MethodKind::Uhf => "UHF",
            MethodKind::Ghf => "GHF",
        }
    }
}

impl std::fmt::Display for MethodKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A Hartree-Fock solver as seen by [`run_scf`].
///
/// `get_jk` and `eigh` are the two operations a kernel backend replaces. The
/// provided methods only reach the kernels through them, so a wrapper that
/// overrides those two changes where every JK build and diagonalization of
/// the iteration runs.
pub trait ScfMethod: Debug + Send + Sync {
    fn system(&self) -> &MolecularSystem;

    fn kind(&self) -> MethodKind;

    /// Where `get_jk` and `eigh` execute.
    fn device(&self) -> Device;

    /// Coulomb and exchange matrices of `dm`, same tag and shape as `dm`.
    fn get_jk(&self, dm: &SpinMatrix, hermi: Hermiticity, request: JkRequest) -> Result<JkMatrices>;

    /// Solves F C = S C e for one block.
    fn eigh(&self, fock: &DMatrix<f64>, overlap: &DMatrix<f64>) -> Result<Eigen>;

    /// Initial density from a set of spatial orbitals.
    fn guess_density(&self, orbitals: &Eigen) -> Result<SpinMatrix>;

    /// Occupation numbers for every block, given its orbital energies.
    fn get_occ(&self, energies: &[DVector<f64>]) -> Vec<DVector<f64>>;

    /// Density from orbitals and occupations, D = C diag(n) C^T per block.
    fn make_rdm1(&self, orbitals: &[Eigen], occupations: &[DVector<f64>]) -> Result<SpinMatrix>;

    /// Effective two-electron potential from a JK build of `dm`.
    fn combine_veff(&self, dm: &SpinMatrix, jk: &JkMatrices) -> Result<SpinMatrix>;

    /// Core Hamiltonian in the layout of this method.
    fn core_hamiltonian(&self) -> SpinMatrix {
        spin_layout(self.kind().spin_kind(), self.system(), self.system().core_hamiltonian())
    }

    /// Overlap in the layout of this method.
    fn spin_overlap(&self) -> SpinMatrix {
        spin_layout(self.kind().spin_kind(), self.system(), self.system().overlap().clone())
    }

    fn get_veff(&self, dm: &SpinMatrix) -> Result<SpinMatrix> {
        let jk = self.get_jk(dm, Hermiticity::Hermitian, JkRequest::default())?;
        self.combine_veff(dm, &jk)
    }

    fn get_fock(&self, veff: &SpinMatrix) -> SpinMatrix {
        self.core_hamiltonian().zip_map(veff, |h, v| h + v)
    }

    /// Diagonalizes every block of `fock` against the matching overlap block.
    fn eig(&self, fock: &SpinMatrix) -> Result<Vec<Eigen>> {
        let overlap = self.spin_overlap();
        fock.blocks()
            .iter()
            .zip(overlap.blocks())
            .map(|(fock, overlap)| self.eigh(fock, overlap))
            .collect()
    }

    /// sum D.h + 1/2 sum D.V over all blocks
    fn energy_elec(&self, dm: &SpinMatrix, veff: &SpinMatrix) -> f64 {
        dm.dot(&self.core_hamiltonian()) + 0.5 * dm.dot(veff)
    }

    /// Extended Hueckel guess, diagonalized through `eigh`.
    fn init_guess(&self) -> Result<SpinMatrix> {
        let system = self.system();
        let hamiltonian = system.core_hamiltonian();
        let overlap = system.overlap();

        let hamiltonian_eht = utils::symmetric_matrix(system.n_ao(), |i, j| {
            HUECKEL_FACTOR * overlap[(i, j)] * (hamiltonian[(i, i)] + hamiltonian[(j, j)])
        });
        let orbitals = self.eigh(&hamiltonian_eht, overlap)?;
        self.guess_density(&orbitals)
    }
}

/// Creates the solver for `method`, with its kernel operations on `backend`.
pub fn solver<'a>(
    system: &'a MolecularSystem,
    method: MethodKind,
    backend: Backend,
) -> Result<Box<dyn ScfMethod + 'a>> {
    log::debug!("setting up {method} on {backend:?}");

    let solver: Box<dyn ScfMethod + 'a> = match (method, backend) {
        (MethodKind::Rhf, Backend::Host) => Box::new(Rhf::new(system)?),
        (MethodKind::Uhf, Backend::Host) => Box::new(Uhf::new(system)),
        (MethodKind::Ghf, Backend::Host) => Box::new(Ghf::new(system)),
        (MethodKind::Rhf, Backend::Accelerated { threads, fallback }) => {
            Box::new(Accelerated::new(Rhf::new(system)?, threads)?.with_fallback(fallback))
        }
        (MethodKind::Uhf, Backend::Accelerated { threads, fallback }) => {
            Box::new(Accelerated::new(Uhf::new(system), threads)?.with_fallback(fallback))
        }
        (MethodKind::Ghf, Backend::Accelerated { threads, fallback }) => {
            Box::new(Accelerated::new(Ghf::new(system), threads)?.with_fallback(fallback))
        }
    };

    log::debug!("{method} runs on {}", solver.device());
    Ok(solver)
}

/// Places an N x N matrix into the block layout of `kind`.
fn spin_layout(kind: SpinKind, system: &MolecularSystem, matrix: DMatrix<f64>) -> SpinMatrix {
    let n_ao = system.n_ao();
    let blocks: SmallVec<[DMatrix<f64>; 2]> = match kind {
        SpinKind::Restricted => smallvec::smallvec![matrix],
        SpinKind::Unrestricted => smallvec::smallvec![matrix.clone(), matrix],
        SpinKind::TwoComponent => smallvec::smallvec![utils::block_diagonal(&matrix, &matrix)],
    };
    SpinMatrix::from_blocks(kind, n_ao, blocks)
}

/// C diag(n) C^T
pub(crate) fn density_from_orbitals(
    coefficients: &DMatrix<f64>,
    occupations: &DVector<f64>,
) -> DMatrix<f64> {
    coefficients * DMatrix::from_diagonal(occupations) * coefficients.transpose()
}

/// Density of the lowest `n_occupied` orbitals, each holding `occupation` electrons.
pub(crate) fn aufbau_density(
    coefficients: &DMatrix<f64>,
    n_occupied: usize,
    occupation: f64,
) -> DMatrix<f64> {
    let occupied = coefficients.columns(0, n_occupied.min(coefficients.ncols()));
    occupied * occupied.transpose() * occupation
}

/// The lowest `n_occupied` of `n` orbitals hold `occupation` electrons each.
pub(crate) fn aufbau_occupations(n: usize, n_occupied: usize, occupation: f64) -> DVector<f64> {
    DVector::from_fn(n, |k, _| if k < n_occupied { occupation } else { 0.0 })
}
