use std::num::NonZeroU32;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::{
    atom::Atom,
    basis::{BasisFunction, BasisSet},
    hf::utils,
    integrals::{DefaultIntegrator, ElectronTensor, Integrator},
    molecule::Molecule,
    Error, Result,
};

/// The electronic state of a molecule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MolecularElectronConfig {
    ClosedShell,
    OpenShell {
        molecular_charge: i32,
        spin_multiplicity: NonZeroU32,
    },
}

/// A molecule in a concrete basis, together with every integral an SCF
/// calculation needs. This is the descriptor handed to the JK and
/// diagonalization kernels.
#[derive(Debug, Clone)]
pub struct MolecularSystem {
    atoms: Vec<Atom>,
    basis: Vec<BasisFunction>,
    configuration: MolecularElectronConfig,
    overlap: DMatrix<f64>,
    kinetic: DMatrix<f64>,
    nuclear: DMatrix<f64>,
    electron: ElectronTensor,
    nuclear_repulsion: f64,
    n_electrons: usize,
}

impl MolecularSystem {
    pub fn new(
        molecule: &Molecule,
        basis_set: &BasisSet,
        configuration: MolecularElectronConfig,
    ) -> Result<Self> {
        if molecule.atoms().is_empty() {
            return Err(Error::Molecule("molecule has no atoms".to_owned()));
        }

        let mut basis = Vec::new();
        for atom in molecule.atoms() {
            let atomic_basis = basis_set
                .for_atom(atom)
                .ok_or(Error::MissingBasis(atom.element_type))?;
            basis.extend(atomic_basis.basis_for(atom));
        }

        let nuclear_charge = molecule.nuclear_charge();
        let (n_electrons, multiplicity) = match configuration {
            MolecularElectronConfig::ClosedShell => (nuclear_charge as i64, 1),
            MolecularElectronConfig::OpenShell {
                molecular_charge,
                spin_multiplicity,
            } => (
                nuclear_charge as i64 - molecular_charge as i64,
                spin_multiplicity.get(),
            ),
        };

        let n_unpaired = multiplicity as i64 - 1;
        if n_electrons < n_unpaired || (n_electrons - n_unpaired) % 2 != 0 {
            return Err(Error::InvalidSpin {
                n_electrons: n_electrons.max(0) as usize,
                multiplicity,
            });
        }

        let integrator = DefaultIntegrator::default();
        let atoms = molecule.atoms().to_vec();

        let nuclear_repulsion = compute_nuclear_repulsion(&atoms);
        log::debug!("nuclear repulsion energy: {nuclear_repulsion}");

        let overlap = compute_overlap_matrix(&basis, &integrator);
        log::debug!("overlap matrix: {overlap:0.4}");
        let kinetic = compute_kinetic_matrix(&basis, &integrator);
        log::debug!("kinetic matrix: {kinetic:0.4}");
        let nuclear = compute_nuclear_matrix(&basis, &atoms, &integrator);
        log::debug!("nuclear matrix: {nuclear:0.4}");
        let electron = ElectronTensor::from_basis(&basis, &integrator);

        Ok(Self {
            atoms,
            basis,
            configuration,
            overlap,
            kinetic,
            nuclear,
            electron,
            nuclear_repulsion,
            n_electrons: n_electrons as usize,
        })
    }

    /// Number of atomic orbitals.
    pub fn n_ao(&self) -> usize {
        self.basis.len()
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn basis(&self) -> &[BasisFunction] {
        &self.basis
    }

    pub fn configuration(&self) -> MolecularElectronConfig {
        self.configuration
    }

    pub fn overlap(&self) -> &DMatrix<f64> {
        &self.overlap
    }

    pub fn kinetic(&self) -> &DMatrix<f64> {
        &self.kinetic
    }

    pub fn nuclear(&self) -> &DMatrix<f64> {
        &self.nuclear
    }

    pub fn core_hamiltonian(&self) -> DMatrix<f64> {
        &self.kinetic + &self.nuclear
    }

    /// Two-electron integrals of the bare Coulomb operator.
    pub fn electron(&self) -> &ElectronTensor {
        &self.electron
    }

    pub fn nuclear_repulsion(&self) -> f64 {
        self.nuclear_repulsion
    }

    /// Returns the number of total electrons in the system
    pub fn n_electrons(&self) -> usize {
        self.n_electrons
    }

    /// 2S + 1
    pub fn spin_multiplicity(&self) -> u32 {
        match self.configuration {
            MolecularElectronConfig::ClosedShell => 1,
            MolecularElectronConfig::OpenShell {
                spin_multiplicity, ..
            } => spin_multiplicity.get(),
        }
    }

    /// Returns the number of electrons in the alpha (by convention, spin up) state
    pub fn n_alpha(&self) -> usize {
        (self.n_electrons() + self.spin_multiplicity() as usize - 1) / 2
    }

    /// Returns the number of electrons in the beta (by convention, spin down) state
    pub fn n_beta(&self) -> usize {
        self.n_electrons() - self.n_alpha()
    }
}

fn compute_nuclear_repulsion(atoms: &[Atom]) -> f64 {
    let n_atoms = atoms.len();

    let mut potential = 0.0;
    for atom_a in 0..n_atoms {
        for atom_b in atom_a + 1..n_atoms {
            potential += (atoms[atom_a].nuclear_charge() * atoms[atom_b].nuclear_charge()) as f64
                / (atoms[atom_b].position - atoms[atom_a].position).norm()
        }
    }
    potential
}

pub fn compute_overlap_matrix(
    basis: &[BasisFunction],
    integrator: &impl Integrator<Function = BasisFunction>,
) -> DMatrix<f64> {
    utils::symmetric_matrix(basis.len(), |i, j| {
        let overlap_ij = integrator.overlap((&basis[i], &basis[j]));
        log::trace!("overlap ({i}{j}) = {overlap_ij}");
        overlap_ij
    })
}

pub fn compute_kinetic_matrix(
    basis: &[BasisFunction],
    integrator: &impl Integrator<Function = BasisFunction>,
) -> DMatrix<f64> {
    utils::symmetric_matrix(basis.len(), |i, j| {
        let kinetic_ij = integrator.kinetic((&basis[i], &basis[j]));
        log::trace!("kinetic ({i}{j}) = {kinetic_ij}");
        kinetic_ij
    })
}

pub fn compute_nuclear_matrix(
    basis: &[BasisFunction],
    nuclei: &[Atom],
    integrator: &impl Integrator<Function = BasisFunction>,
) -> DMatrix<f64> {
    utils::symmetric_matrix(basis.len(), |i, j| {
        let nuclear_ij = integrator.nuclear((&basis[i], &basis[j]), nuclei);
        log::trace!("nuclear ({i}{j}) = {nuclear_ij}");
        nuclear_ij
    })
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use approx::assert_relative_eq;

    use crate::{testing, Error};

    use super::{MolecularElectronConfig, MolecularSystem};

    #[test]
    fn hydrogen_molecule_integrals() {
        let system = testing::hydrogen_sto_3g();

        assert_eq!(system.n_ao(), 2);
        assert_eq!(system.n_electrons(), 2);
        assert_relative_eq!(system.nuclear_repulsion(), 1.0 / 1.4, epsilon = 1e-12);

        // Szabo & Ostlund, section 3.5.2
        assert_relative_eq!(system.overlap()[(0, 1)], 0.6593, epsilon = 1e-4);
        assert_relative_eq!(system.kinetic()[(0, 0)], 0.7600, epsilon = 1e-4);
        assert_relative_eq!(system.kinetic()[(0, 1)], 0.2365, epsilon = 1e-4);
        assert_relative_eq!(system.core_hamiltonian()[(0, 0)], -1.1204, epsilon = 1e-4);
        assert_relative_eq!(system.core_hamiltonian()[(0, 1)], -0.9584, epsilon = 1e-4);
        assert_relative_eq!(system.electron()[(0, 0, 0, 0)], 0.7746, epsilon = 1e-4);
        assert_relative_eq!(system.electron()[(0, 0, 1, 1)], 0.5697, epsilon = 1e-4);
        assert_relative_eq!(system.electron()[(1, 0, 0, 0)], 0.4441, epsilon = 1e-4);
        assert_relative_eq!(system.electron()[(1, 0, 1, 0)], 0.2970, epsilon = 1e-4);
    }

    #[test]
    fn spin_counts() {
        let doublet = MolecularElectronConfig::OpenShell {
            molecular_charge: 1,
            spin_multiplicity: NonZeroU32::new(2).unwrap(),
        };
        let system = testing::hydrogen_system(doublet).unwrap();
        assert_eq!(system.n_electrons(), 1);
        assert_eq!((system.n_alpha(), system.n_beta()), (1, 0));

        let triplet = MolecularElectronConfig::OpenShell {
            molecular_charge: 0,
            spin_multiplicity: NonZeroU32::new(3).unwrap(),
        };
        let system = testing::hydrogen_system(triplet).unwrap();
        assert_eq!((system.n_alpha(), system.n_beta()), (2, 0));
    }

    #[test]
    fn rejects_impossible_multiplicity() {
        let even = MolecularElectronConfig::OpenShell {
            molecular_charge: 0,
            spin_multiplicity: NonZeroU32::new(2).unwrap(),
        };
        assert!(matches!(
            testing::hydrogen_system(even),
            Err(Error::InvalidSpin { n_electrons: 2, multiplicity: 2 })
        ));
    }

    #[test]
    fn extreme_charges_do_not_overflow() {
        let anion = MolecularElectronConfig::OpenShell {
            molecular_charge: i32::MIN,
            spin_multiplicity: NonZeroU32::new(1).unwrap(),
        };
        let system = testing::hydrogen_system(anion).unwrap();
        assert_eq!(system.n_electrons(), 2 + 2_147_483_648);
        assert_eq!(system.n_alpha(), system.n_beta());
    }

    #[test]
    fn empty_molecule_is_rejected() {
        let result = MolecularSystem::new(
            &crate::molecule::Molecule::new(Vec::new()),
            &testing::sto_3g(),
            MolecularElectronConfig::ClosedShell,
        );
        assert!(matches!(result, Err(Error::Molecule(_))));
    }

    #[test]
    fn missing_basis_is_reported() {
        let molecule = crate::molecule::Molecule::new(vec![crate::atom::Atom::new(
            crate::periodic_table::ElementType::Fe,
            nalgebra::Vector3::zeros(),
        )]);
        let result = MolecularSystem::new(
            &molecule,
            &testing::sto_3g(),
            MolecularElectronConfig::ClosedShell,
        );
        assert!(matches!(result, Err(Error::MissingBasis(_))));
    }
}
