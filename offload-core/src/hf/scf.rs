use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::{density::SpinMatrix, diis::Diis, kernel::Device, Error, Result};

use super::{HartreeFockConfig, MethodKind, ScfMethod};

/// The result of a converged SCF calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ScfOutput {
    pub method: MethodKind,
    /// where the JK builds and diagonalizations ran
    pub device: Device,
    /// orbital energies per block (one for RHF and GHF, alpha and beta for
    /// UHF), sorted in ascending order
    pub orbital_energies: Vec<DVector<f64>>,
    /// orbital coefficients per block, one column per orbital
    pub coefficients: Vec<DMatrix<f64>>,
    pub occupations: Vec<DVector<f64>>,
    /// the converged density matrix
    pub density: SpinMatrix,
    /// The electronic energy of the system
    pub electronic_energy: f64,
    /// The nuclear repulsion energy
    pub nuclear_repulsion: f64,
    /// After how many iterations did the system converge
    pub iterations: usize,
}

impl ScfOutput {
    pub fn total_energy(&self) -> f64 {
        self.electronic_energy + self.nuclear_repulsion
    }
}

/// Runs the SCF iteration of `method` to self-consistency.
///
/// Every JK build goes through [`ScfMethod::get_jk`] and every
/// diagonalization through [`ScfMethod::eigh`], so the same loop drives
/// reference and accelerated solvers.
pub fn run_scf<M>(method: &M, config: &HartreeFockConfig) -> Result<ScfOutput>
where
    M: ScfMethod + ?Sized,
{
    let system = method.system();
    let overlap = method.spin_overlap();
    log::info!(
        "{} with {} basis functions and {} electrons on {}",
        method.kind(),
        system.n_ao(),
        system.n_electrons(),
        method.device()
    );

    let mut density = method.init_guess()?;
    let mut diis = Diis::new();

    // start of scf iteration
    for iteration in 1..=config.max_iterations {
        let veff = method.get_veff(&density)?;
        let fock = method.get_fock(&veff);
        let electronic_energy = method.energy_elec(&density, &veff);

        let error = commutator(&fock, &density, &overlap);
        let fock = diis.fock(error, fock)?;

        let orbitals = method.eig(&fock)?;
        let energies = orbitals
            .iter()
            .map(|orbitals| orbitals.energies.clone())
            .collect::<Vec<_>>();
        let occupations = method.get_occ(&energies);
        let new_density = method.make_rdm1(&orbitals, &occupations)?;

        let density_rms = new_density.zip_map(&density, |new, old| new - old).rms();
        density = new_density;

        log::info!(
            "iteration {iteration:<4} - electronic energy {electronic_energy:1.8}. density rms {density_rms:1.4e}",
        );

        if density_rms < config.epsilon {
            // energy of the density that is returned
            let veff = method.get_veff(&density)?;
            let electronic_energy = method.energy_elec(&density, &veff);

            return Ok(ScfOutput {
                method: method.kind(),
                device: method.device(),
                coefficients: orbitals.into_iter().map(|orbitals| orbitals.coefficients).collect(),
                orbital_energies: energies,
                occupations,
                density,
                electronic_energy,
                nuclear_repulsion: system.nuclear_repulsion(),
                iterations: iteration,
            });
        }
    }

    log::warn!("{} did not converge", method.kind());
    Err(Error::NotConverged {
        iterations: config.max_iterations,
    })
}

/// FDS - SDF for every block, zero at self-consistency.
fn commutator(fock: &SpinMatrix, density: &SpinMatrix, overlap: &SpinMatrix) -> SpinMatrix {
    let fds = fock.zip_map(density, |f, d| f * d);
    let fds = fds.zip_map(overlap, |fd, s| fd * s);
    fds.map(|fds| fds - fds.transpose())
}
