//! Fixtures shared by the unit tests. Positions are in bohr.
use nalgebra::{DMatrix, Vector3};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    atom::Atom,
    basis::BasisSet,
    config::ConfigBasisSet,
    molecule::Molecule,
    periodic_table::ElementType,
    system::{MolecularElectronConfig, MolecularSystem},
    Result,
};

/// STO-3G for H, He, C, N and O in the Basis Set Exchange JSON format.
pub const STO_3G: &str = r#"{"molssi_bse_schema":{"schema_type":"complete","schema_version":"0.1"},"revision_description":"DatafromGaussian09","revision_date":"2018-06-19","elements":{"1":{"electron_shells":[{"function_type":"gto","region":"","angular_momentum":[0],"exponents":["0.3425250914E+01","0.6239137298E+00","0.1688554040E+00"],"coefficients":[["0.1543289673E+00","0.5353281423E+00","0.4446345422E+00"]]}],"references":[{"reference_description":"STO-3GMinimalBasis(3functions/AO)","reference_keys":["hehre1969a"]}]},"2":{"electron_shells":[{"function_type":"gto","region":"","angular_momentum":[0],"exponents":["0.6362421394E+01","0.1158922999E+01","0.3136497915E+00"],"coefficients":[["0.1543289673E+00","0.5353281423E+00","0.4446345422E+00"]]}],"references":[{"reference_description":"STO-3GMinimalBasis(3functions/AO)","reference_keys":["hehre1969a"]}]},"6":{"electron_shells":[{"function_type":"gto","region":"","angular_momentum":[0],"exponents":["0.7161683735E+02","0.1304509632E+02","0.3530512160E+01"],"coefficients":[["0.1543289673E+00","0.5353281423E+00","0.4446345422E+00"]]},{"function_type":"gto","region":"","angular_momentum":[0,1],"exponents":["0.2941249355E+01","0.6834830964E+00","0.2222899159E+00"],"coefficients":[["-0.9996722919E-01","0.3995128261E+00","0.7001154689E+00"],["0.1559162750E+00","0.6076837186E+00","0.3919573931E+00"]]}],"references":[{"reference_description":"STO-3GMinimalBasis(3functions/AO)","reference_keys":["hehre1969a"]}]},"7":{"electron_shells":[{"function_type":"gto","region":"","angular_momentum":[0],"exponents":["0.9910616896E+02","0.1805231239E+02","0.4885660238E+01"],"coefficients":[["0.1543289673E+00","0.5353281423E+00","0.4446345422E+00"]]},{"function_type":"gto","region":"","angular_momentum":[0,1],"exponents":["0.3780455879E+01","0.8784966449E+00","0.2857143744E+00"],"coefficients":[["-0.9996722919E-01","0.3995128261E+00","0.7001154689E+00"],["0.1559162750E+00","0.6076837186E+00","0.3919573931E+00"]]}],"references":[{"reference_description":"STO-3GMinimalBasis(3functions/AO)","reference_keys":["hehre1969a"]}]},"8":{"electron_shells":[{"function_type":"gto","region":"","angular_momentum":[0],"exponents":["0.1307093214E+03","0.2380886605E+02","0.6443608313E+01"],"coefficients":[["0.1543289673E+00","0.5353281423E+00","0.4446345422E+00"]]},{"function_type":"gto","region":"","angular_momentum":[0,1],"exponents":["0.5033151319E+01","0.1169596125E+01","0.3803889600E+00"],"coefficients":[["-0.9996722919E-01","0.3995128261E+00","0.7001154689E+00"],["0.1559162750E+00","0.6076837186E+00","0.3919573931E+00"]]}],"references":[{"reference_description":"STO-3GMinimalBasis(3functions/AO)","reference_keys":["hehre1969a"]}]}},"version":"1","function_types":["gto"],"names":["STO-3G"],"tags":[],"family":"sto","description":"STO-3GMinimalBasis(3functions/AO)","role":"orbital","auxiliaries":{},"name":"STO-3G"}"#;

pub fn sto_3g() -> BasisSet {
    let config: ConfigBasisSet = serde_json::from_str(STO_3G).unwrap();
    BasisSet::try_from(config).unwrap()
}

/// H2 at a bond length of 1.4 bohr.
pub fn hydrogen_molecule() -> Molecule {
    Molecule::new(vec![
        Atom::new(ElementType::H, Vector3::new(0.0, 0.0, 0.0)),
        Atom::new(ElementType::H, Vector3::new(0.0, 0.0, 1.4)),
    ])
}

pub fn hydrogen_system(configuration: MolecularElectronConfig) -> Result<MolecularSystem> {
    MolecularSystem::new(&hydrogen_molecule(), &sto_3g(), configuration)
}

/// Closed-shell H2 in STO-3G, two basis functions.
pub fn hydrogen_sto_3g() -> MolecularSystem {
    hydrogen_system(MolecularElectronConfig::ClosedShell).unwrap()
}

/// A single hydrogen atom (doublet) in STO-3G.
pub fn hydrogen_atom_sto_3g() -> MolecularSystem {
    let molecule = Molecule::new(vec![Atom::new(ElementType::H, Vector3::zeros())]);
    let doublet = MolecularElectronConfig::OpenShell {
        molecular_charge: 0,
        spin_multiplicity: std::num::NonZeroU32::new(2).unwrap(),
    };
    MolecularSystem::new(&molecule, &sto_3g(), doublet).unwrap()
}

/// Water in STO-3G at R(OH) = 1.1 A, 104 degrees; seven basis functions.
pub fn water_sto_3g() -> MolecularSystem {
    let molecule = Molecule::new(vec![
        Atom::new(ElementType::O, Vector3::new(0.0, -0.143225816552, 0.0)),
        Atom::new(ElementType::H, Vector3::new(1.638036840407, 1.136548822547, 0.0)),
        Atom::new(ElementType::H, Vector3::new(-1.638036840407, 1.136548822547, 0.0)),
    ]);
    MolecularSystem::new(&molecule, &sto_3g(), MolecularElectronConfig::ClosedShell).unwrap()
}

/// Symmetric n x n matrix with entries in [-0.5, 0.5).
pub fn random_symmetric(n: usize, seed: u64) -> DMatrix<f64> {
    let matrix = random_matrix(n, seed);
    (&matrix + matrix.transpose()) * 0.5
}

/// n x n matrix with entries in [-0.5, 0.5).
pub fn random_matrix(n: usize, seed: u64) -> DMatrix<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    DMatrix::from_fn(n, n, |_, _| rng.gen::<f64>() - 0.5)
}
