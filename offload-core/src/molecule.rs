use crate::atom::Atom;

/// Represents a molecule
#[derive(Debug, Clone)]
pub struct Molecule {
    pub(crate) atoms: Vec<Atom>,
}

impl Molecule {
    pub fn new(atoms: Vec<Atom>) -> Self {
        Self { atoms }
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Sum of the nuclear charges, i.e. the electron count of the neutral molecule.
    pub fn nuclear_charge(&self) -> usize {
        self.atoms
            .iter()
            .map(|atom| atom.element_type as usize)
            .sum()
    }
}
