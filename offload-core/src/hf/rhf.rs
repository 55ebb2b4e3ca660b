use nalgebra::{DMatrix, DVector};

use crate::{
    density::{Hermiticity, SpinKind, SpinMatrix},
    jk::{self, JkMatrices},
    kernel::{Device, Eigen, HostKernel, JkRequest, ScfKernel},
    system::MolecularSystem,
    Error, Result,
};

use super::{aufbau_density, aufbau_occupations, density_from_orbitals, MethodKind, ScfMethod};

/// Closed-shell Hartree-Fock. The density holds both spins, every occupied
/// orbital carries two electrons.
#[derive(Debug, Clone, Copy)]
pub struct Rhf<'a> {
    system: &'a MolecularSystem,
    kernel: HostKernel,
}

impl<'a> Rhf<'a> {
    pub fn new(system: &'a MolecularSystem) -> Result<Self> {
        if system.n_alpha() != system.n_beta() {
            return Err(Error::UnsupportedConfiguration {
                method: "RHF",
                requirement: "a closed-shell configuration",
            });
        }

        Ok(Self {
            system,
            kernel: HostKernel,
        })
    }

    fn n_occupied(&self) -> usize {
        self.system.n_electrons() / 2
    }
}

impl ScfMethod for Rhf<'_> {
    fn system(&self) -> &MolecularSystem {
        self.system
    }

    fn kind(&self) -> MethodKind {
        MethodKind::Rhf
    }

    fn device(&self) -> Device {
        self.kernel.device()
    }

    fn get_jk(&self, dm: &SpinMatrix, hermi: Hermiticity, request: JkRequest) -> Result<JkMatrices> {
        jk::get_jk(&self.kernel, self.system, dm, hermi, request)
    }

    fn eigh(&self, fock: &DMatrix<f64>, overlap: &DMatrix<f64>) -> Result<Eigen> {
        self.kernel.diagonalize(fock, overlap)
    }

    fn guess_density(&self, orbitals: &Eigen) -> Result<SpinMatrix> {
        let density = aufbau_density(&orbitals.coefficients, self.n_occupied(), 2.0);
        SpinMatrix::restricted(density, self.system.n_ao())
    }

    fn get_occ(&self, energies: &[DVector<f64>]) -> Vec<DVector<f64>> {
        energies
            .iter()
            .map(|energies| aufbau_occupations(energies.len(), self.n_occupied(), 2.0))
            .collect()
    }

    fn make_rdm1(&self, orbitals: &[Eigen], occupations: &[DVector<f64>]) -> Result<SpinMatrix> {
        let blocks = orbitals
            .iter()
            .zip(occupations)
            .map(|(orbitals, occupations)| density_from_orbitals(&orbitals.coefficients, occupations))
            .collect::<Vec<_>>();
        SpinMatrix::new(SpinKind::Restricted, self.system.n_ao(), blocks)
    }

    /// V = J - K/2
    fn combine_veff(&self, _dm: &SpinMatrix, jk: &JkMatrices) -> Result<SpinMatrix> {
        Ok(jk.vj()?.zip_map(jk.vk()?, |vj, vk| vj - vk * 0.5))
    }
}
