use std::{collections::HashMap, fs::File, io::BufReader, path::Path};

use serde::Deserialize;
use smallvec::SmallVec;

use crate::{
    basis::{AtomicBasis, BasisSet, ContractedGaussian, ElectronShell, Gaussian},
    periodic_table::ElementType,
    Error, Result,
};

/// A basis set in the Basis Set Exchange JSON format.
#[derive(Deserialize)]
pub struct ConfigBasisSet {
    elements: HashMap<ElementType, ConfigElectronicConfiguration>,
}

#[derive(Deserialize)]
struct ConfigElectronicConfiguration {
    electron_shells: Vec<ConfigElectronShell>,
}

#[derive(Deserialize)]
struct ConfigElectronShell {
    function_type: String,
    angular_momentum: Vec<i32>,
    exponents: Vec<String>,
    coefficients: Vec<Vec<String>>,
}

impl TryFrom<ConfigBasisSet> for BasisSet {
    type Error = Error;

    fn try_from(value: ConfigBasisSet) -> Result<Self> {
        let mut atomic_mapping = HashMap::with_capacity(value.elements.len());

        for (element, configuration) in value.elements {
            let mut element_atomic_basis = AtomicBasis::empty();

            for electron_shell in &configuration.electron_shells {
                if !electron_shell.function_type.starts_with("gto") {
                    return Err(Error::BasisSet(format!(
                        "unsupported function type {:?} for {element}",
                        electron_shell.function_type
                    )));
                }

                let exponents = parse_all(&electron_shell.exponents)?;

                for (index, &angular_magnitude) in
                    electron_shell.angular_momentum.iter().enumerate()
                {
                    let coefficients = electron_shell
                        .coefficients
                        .get(index)
                        .ok_or_else(|| {
                            Error::BasisSet(format!(
                                "{element}: shell with angular momentum {angular_magnitude} has no coefficients"
                            ))
                        })
                        .and_then(|coefficients| parse_all(coefficients))?;

                    let mut shell = ElectronShell::new(angular_magnitude);

                    for angular in generate_angular_vectors(angular_magnitude) {
                        let primitives = exponents
                            .iter()
                            .zip(&coefficients)
                            .map(|(&exponent, &coefficient)| Gaussian {
                                exponent,
                                coefficient: coefficient * Gaussian::norm(exponent, angular),
                                angular,
                            })
                            .collect::<SmallVec<_>>();

                        shell
                            .basis_functions
                            .push(ContractedGaussian(primitives).normalized());
                    }

                    element_atomic_basis.shells.push(shell);
                }
            }

            atomic_mapping.insert(element, element_atomic_basis);
        }

        Ok(Self::new(atomic_mapping))
    }
}

impl BasisSet {
    /// Reads a basis set in Basis Set Exchange JSON format.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config: ConfigBasisSet = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        config.try_into()
    }
}

fn parse_all(values: &[String]) -> Result<Vec<f64>> {
    values
        .iter()
        .map(|value| {
            value
                .trim()
                .replace(['D', 'd'], "E")
                .parse::<f64>()
                .map_err(|err| Error::BasisSet(format!("{value:?}: {err}")))
        })
        .collect()
}

// generate all (i, j, k) such that i + j + k = angular
fn generate_angular_vectors(angular_magnitude: i32) -> Vec<(i32, i32, i32)> {
    let mut angular_vectors = Vec::with_capacity(8);

    for (i, j, k) in itertools::iproduct!(
        (0..=angular_magnitude).rev(),
        (0..=angular_magnitude).rev(),
        0..=angular_magnitude
    ) {
        if i + j + k == angular_magnitude {
            angular_vectors.push((i, j, k));
        }
    }

    angular_vectors
}

#[cfg(test)]
mod tests {
    use crate::{atom::Atom, basis::BasisSet, periodic_table::ElementType, testing};

    use super::{generate_angular_vectors, ConfigBasisSet};

    #[test]
    fn cartesian_components() {
        assert_eq!(generate_angular_vectors(0), vec![(0, 0, 0)]);
        assert_eq!(
            generate_angular_vectors(1),
            vec![(1, 0, 0), (0, 1, 0), (0, 0, 1)]
        );
        assert_eq!(generate_angular_vectors(2).len(), 6);
    }

    #[test]
    fn sp_shells_expand_to_four_functions() {
        let config: ConfigBasisSet = serde_json::from_str(testing::STO_3G).unwrap();
        let basis_set = BasisSet::try_from(config).unwrap();

        let oxygen = Atom::new(ElementType::O, nalgebra::Vector3::zeros());
        let hydrogen = Atom::new(ElementType::H, nalgebra::Vector3::zeros());

        assert_eq!(basis_set.for_atom(&oxygen).unwrap().basis_functions().count(), 5);
        assert_eq!(basis_set.for_atom(&hydrogen).unwrap().basis_functions().count(), 1);
    }

    #[test]
    fn rejects_bad_numbers() {
        let config: ConfigBasisSet = serde_json::from_str(
            r#"{"elements": {"1": {"electron_shells": [{"function_type": "gto",
                "angular_momentum": [0], "exponents": ["abc"], "coefficients": [["1.0"]]}]}}}"#,
        )
        .unwrap();
        assert!(BasisSet::try_from(config).is_err());
    }
}
