use std::{fs::File, io::BufReader, path::Path};

use nalgebra::Vector3;
use serde::Deserialize;

use crate::{atom::Atom, molecule::Molecule, periodic_table::ElementType, Error, Result};

/// Represents a full molecule in a config file.
/// A molecule is just a list of positioned atoms, positions in bohr.
#[derive(Deserialize)]
pub struct ConfigMolecule(Vec<ConfigAtom>);

#[derive(Deserialize)]
struct ConfigAtom {
    element: ElementType,
    position: Vec<f64>,
}

impl TryFrom<ConfigMolecule> for Molecule {
    type Error = Error;

    fn try_from(value: ConfigMolecule) -> Result<Self> {
        let ConfigMolecule(config_atoms) = value;

        let mut atoms = Vec::with_capacity(config_atoms.len());

        for atom in config_atoms {
            let &[x, y, z] = atom.position.as_slice() else {
                return Err(Error::Molecule(format!(
                    "{} atom has {} coordinates instead of 3",
                    atom.element,
                    atom.position.len()
                )));
            };

            atoms.push(Atom {
                position: Vector3::new(x, y, z),
                element_type: atom.element,
            });
        }

        Ok(Self { atoms })
    }
}

impl Molecule {
    /// Reads a molecule from a JSON file of `{ "element": .., "position": [x, y, z] }` entries.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config: ConfigMolecule = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        config.try_into()
    }
}

#[cfg(test)]
mod tests {
    use crate::{molecule::Molecule, periodic_table::ElementType};

    use super::ConfigMolecule;

    #[test]
    fn reads_symbols_and_numbers() {
        let config: ConfigMolecule = serde_json::from_str(
            r#"[{"element": "O", "position": [0.0, 0.0, 0.0]},
                {"element": 1, "position": [0.0, 1.43, 1.1]}]"#,
        )
        .unwrap();
        let molecule = Molecule::try_from(config).unwrap();

        assert_eq!(molecule.atoms().len(), 2);
        assert_eq!(molecule.atoms()[1].element_type(), ElementType::H);
        assert_eq!(molecule.nuclear_charge(), 9);
    }

    #[test]
    fn rejects_wrong_coordinate_count() {
        let config: ConfigMolecule =
            serde_json::from_str(r#"[{"element": "H", "position": [0.0, 0.0]}]"#).unwrap();
        assert!(Molecule::try_from(config).is_err());
    }
}
