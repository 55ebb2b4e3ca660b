use nalgebra::{DMatrix, DVector};

use crate::{
    density::{Hermiticity, SpinKind, SpinMatrix},
    jk::{self, JkMatrices},
    kernel::{Device, Eigen, HostKernel, JkRequest, ScfKernel},
    system::MolecularSystem,
    Error, Result,
};

use super::{aufbau_density, aufbau_occupations, density_from_orbitals, MethodKind, ScfMethod};

/// Unrestricted Hartree-Fock with separate alpha and beta orbitals.
#[derive(Debug, Clone, Copy)]
pub struct Uhf<'a> {
    system: &'a MolecularSystem,
    kernel: HostKernel,
}

impl<'a> Uhf<'a> {
    pub fn new(system: &'a MolecularSystem) -> Self {
        Self {
            system,
            kernel: HostKernel,
        }
    }

    /// Electrons per spin, alpha first.
    fn n_occupied(&self) -> [usize; 2] {
        [self.system.n_alpha(), self.system.n_beta()]
    }
}

impl ScfMethod for Uhf<'_> {
    fn system(&self) -> &MolecularSystem {
        self.system
    }

    fn kind(&self) -> MethodKind {
        MethodKind::Uhf
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
        let [n_alpha, n_beta] = self.n_occupied();
        SpinMatrix::unrestricted(
            aufbau_density(&orbitals.coefficients, n_alpha, 1.0),
            aufbau_density(&orbitals.coefficients, n_beta, 1.0),
            self.system.n_ao(),
        )
    }

    fn get_occ(&self, energies: &[DVector<f64>]) -> Vec<DVector<f64>> {
        energies
            .iter()
            .zip(self.n_occupied())
            .map(|(energies, n_occupied)| aufbau_occupations(energies.len(), n_occupied, 1.0))
            .collect()
    }

    fn make_rdm1(&self, orbitals: &[Eigen], occupations: &[DVector<f64>]) -> Result<SpinMatrix> {
        let blocks = orbitals
            .iter()
            .zip(occupations)
            .map(|(orbitals, occupations)| density_from_orbitals(&orbitals.coefficients, occupations))
            .collect::<Vec<_>>();
        SpinMatrix::new(SpinKind::Unrestricted, self.system.n_ao(), blocks)
    }

    /// V_s = J_a + J_b - K_s
    fn combine_veff(&self, _dm: &SpinMatrix, jk: &JkMatrices) -> Result<SpinMatrix> {
        let (vj, vk) = match (jk.vj()?.blocks(), jk.vk()?.blocks()) {
            ([j_alpha, j_beta], [k_alpha, k_beta]) => ((j_alpha, j_beta), (k_alpha, k_beta)),
            (vj, _) => {
                return Err(Error::BlockCount {
                    expected: 2,
                    got: vj.len(),
                })
            }
        };

        let coulomb = vj.0 + vj.1;
        SpinMatrix::unrestricted(&coulomb - vk.0, &coulomb - vk.1, self.system.n_ao())
    }
}
