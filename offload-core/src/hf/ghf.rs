use nalgebra::{DMatrix, DVector};

use crate::{
    density::{Hermiticity, SpinKind, SpinMatrix},
    jk::{self, JkMatrices},
    kernel::{Device, Eigen, HostKernel, JkRequest, ScfKernel},
    system::MolecularSystem,
    Result,
};

use super::{
    aufbau_density, aufbau_occupations, density_from_orbitals, utils, MethodKind, ScfMethod,
};

/// Generalized Hartree-Fock over real two-component spinors.
///
/// Orbitals live in the 2N-dimensional space spanned by alpha and beta copies
/// of the basis, so the density, Fock and overlap are all 2N x 2N and alpha
/// and beta may mix. JK builds go through the two-component composer.
#[derive(Debug, Clone, Copy)]
pub struct Ghf<'a> {
    system: &'a MolecularSystem,
    kernel: HostKernel,
}

impl<'a> Ghf<'a> {
    pub fn new(system: &'a MolecularSystem) -> Self {
        Self {
            system,
            kernel: HostKernel,
        }
    }
}

impl ScfMethod for Ghf<'_> {
    fn system(&self) -> &MolecularSystem {
        self.system
    }

    fn kind(&self) -> MethodKind {
        MethodKind::Ghf
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

    /// Spin-pure start: alpha and beta blocks filled from the same spatial orbitals.
    fn guess_density(&self, orbitals: &Eigen) -> Result<SpinMatrix> {
        let alpha = aufbau_density(&orbitals.coefficients, self.system.n_alpha(), 1.0);
        let beta = aufbau_density(&orbitals.coefficients, self.system.n_beta(), 1.0);
        SpinMatrix::two_component(utils::block_diagonal(&alpha, &beta), self.system.n_ao())
    }

    /// The lowest n_electrons spinors are singly occupied.
    fn get_occ(&self, energies: &[DVector<f64>]) -> Vec<DVector<f64>> {
        energies
            .iter()
            .map(|energies| aufbau_occupations(energies.len(), self.system.n_electrons(), 1.0))
            .collect()
    }

    fn make_rdm1(&self, orbitals: &[Eigen], occupations: &[DVector<f64>]) -> Result<SpinMatrix> {
        let blocks = orbitals
            .iter()
            .zip(occupations)
            .map(|(orbitals, occupations)| density_from_orbitals(&orbitals.coefficients, occupations))
            .collect::<Vec<_>>();
        SpinMatrix::new(SpinKind::TwoComponent, self.system.n_ao(), blocks)
    }

    /// V = J - K
    fn combine_veff(&self, _dm: &SpinMatrix, jk: &JkMatrices) -> Result<SpinMatrix> {
        Ok(jk.vj()?.zip_map(jk.vk()?, |vj, vk| vj - vk))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    use crate::{
        density::SpinKind,
        hf::{run_scf, HartreeFockConfig, Rhf, ScfMethod, Uhf},
        testing,
    };

    use super::Ghf;

    #[test]
    fn layout_is_two_component() {
        let system = testing::hydrogen_sto_3g();
        let ghf = Ghf::new(&system);

        let overlap = ghf.spin_overlap();
        assert_eq!(overlap.kind(), SpinKind::TwoComponent);
        assert_eq!(overlap.blocks()[0].shape(), (4, 4));
        assert_eq!(overlap.blocks()[0].view((0, 2), (2, 2)), DMatrix::<f64>::zeros(2, 2));

        let guess = ghf.init_guess().unwrap();
        assert_eq!(guess.kind(), SpinKind::TwoComponent);
        assert_relative_eq!(guess.dot(&overlap), 2.0, epsilon = 1e-10);
    }

    #[test]
    fn hydrogen_molecule_matches_rhf() {
        let system = testing::hydrogen_sto_3g();
        // orbital energies are first order in the density error
        let config = HartreeFockConfig {
            epsilon: 1e-10,
            ..HartreeFockConfig::default()
        };

        let ghf = run_scf(&Ghf::new(&system), &config).unwrap();
        let rhf = run_scf(&Rhf::new(&system).unwrap(), &config).unwrap();

        assert_relative_eq!(ghf.total_energy(), rhf.total_energy(), epsilon = 1e-8);
        assert_relative_eq!(ghf.total_energy(), -1.1167, epsilon = 1e-4);

        // every spatial orbital energy appears twice among the spinors
        let spinor = &ghf.orbital_energies[0];
        let spatial = &rhf.orbital_energies[0];
        assert_eq!(spinor.len(), 4);
        for (k, &energy) in spatial.iter().enumerate() {
            assert_relative_eq!(spinor[2 * k], energy, epsilon = 1e-8);
            assert_relative_eq!(spinor[2 * k + 1], energy, epsilon = 1e-8);
        }
        assert_eq!(ghf.occupations[0].as_slice(), &[1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn hydrogen_atom_matches_uhf() {
        let system = testing::hydrogen_atom_sto_3g();
        let config = HartreeFockConfig::default();

        let ghf = run_scf(&Ghf::new(&system), &config).unwrap();
        let uhf = run_scf(&Uhf::new(&system), &config).unwrap();

        assert_relative_eq!(ghf.total_energy(), -0.46658, epsilon = 1e-5);
        assert_relative_eq!(ghf.total_energy(), uhf.total_energy(), epsilon = 1e-10);
    }

    #[test]
    fn water_matches_rhf() {
        let system = testing::water_sto_3g();
        let config = HartreeFockConfig::default();

        let ghf = run_scf(&Ghf::new(&system), &config).unwrap();
        let rhf = run_scf(&Rhf::new(&system).unwrap(), &config).unwrap();

        assert_relative_eq!(ghf.total_energy(), rhf.total_energy(), epsilon = 1e-6);
    }
}
