use std::ops::Index;

use rayon::prelude::*;

use crate::basis::BasisFunction;

use super::Integrator;

/// An integral index used in the two-electron integrals of a basis set.
///
/// The index represents the four indices (i, j, k, l) of the integral
///   (ij|kl) = int i(1) j(1) 1/r12 k(2) l(2)
///
/// Real two-electron integrals are invariant under i <-> j, k <-> l and
/// (ij) <-> (kl), so every index is stored in the canonical order
/// i >= j, k >= l, ij >= kl.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct IntegralIndex(usize, usize, usize, usize);

impl IntegralIndex {
    /// Creates a new integral index with the given indices.
    pub(crate) const fn new(index: (usize, usize, usize, usize)) -> Self {
        let (i, j, k, l) = index;
        let (i, j) = if i >= j { (i, j) } else { (j, i) };
        let (k, l) = if k >= l { (k, l) } else { (l, k) };

        if pair(i, j) >= pair(k, l) {
            Self(i, j, k, l)
        } else {
            Self(k, l, i, j)
        }
    }

    /// Position of this index in the packed storage.
    pub(crate) const fn compound(&self) -> usize {
        let &Self(i, j, k, l) = self;
        let ij = pair(i, j);
        let kl = pair(k, l);
        ij * (ij + 1) / 2 + kl
    }
}

#[inline(always)]
const fn pair(i: usize, j: usize) -> usize {
    i * (i + 1) / 2 + j
}

impl std::fmt::Display for IntegralIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let &Self(i, j, k, l) = self;
        write!(f, "({} {}|{} {})", i, j, k, l)
    }
}

/// An electron tensor representing electron-electron repulsion integrals between
/// four contracted Gaussian functions in a given basis set.
#[derive(Clone, Debug)]
pub struct ElectronTensor {
    data: Vec<f64>,
    /// side length
    size: usize,
}

impl ElectronTensor {
    /// Computes every symmetry-unique repulsion integral of the basis, one after another.
    pub fn from_basis(
        basis: &[BasisFunction],
        integrator: &impl Integrator<Function = BasisFunction>,
    ) -> Self {
        let n_basis = basis.len();
        let indices = unique_indices(n_basis);
        let mut data = vec![0.0; indices.len()];

        for index @ IntegralIndex(i, j, k, l) in indices {
            let integral =
                integrator.electron_repulsion((&basis[i], &basis[j], &basis[k], &basis[l]));
            log::trace!("ERI {index} = {integral:<1.8}");
            data[index.compound()] = integral;
        }

        Self {
            data,
            size: n_basis,
        }
    }

    /// Same as [`ElectronTensor::from_basis`], but distributes the integrals over the
    /// current rayon thread pool.
    pub fn par_from_basis<I>(basis: &[BasisFunction], integrator: &I) -> Self
    where
        I: Integrator<Function = BasisFunction> + Sync,
    {
        let n_basis = basis.len();
        let indices = unique_indices(n_basis);
        let mut data = vec![0.0; indices.len()];

        indices
            .par_chunks(512)
            .map(|indices| {
                let mut output = Vec::with_capacity(indices.len());
                for index @ &IntegralIndex(i, j, k, l) in indices {
                    let integral = integrator
                        .electron_repulsion((&basis[i], &basis[j], &basis[k], &basis[l]));

                    log::trace!("ERI {index} = {integral:<1.8}");
                    output.push((index.compound(), integral))
                }
                output
            })
            .collect::<Vec<_>>() // iterators are lazy - we collect to evaluate all elements
            .into_iter()
            .flatten()
            .for_each(|(index, integral)| data[index] = integral);

        Self {
            data,
            size: n_basis,
        }
    }

    /// Number of basis functions along each of the four axes.
    pub fn size(&self) -> usize {
        self.size
    }
}

fn unique_indices(n_basis: usize) -> Vec<IntegralIndex> {
    let n_pairs = n_basis * (n_basis + 1) / 2;
    let mut indices = Vec::with_capacity(n_pairs * (n_pairs + 1) / 2);

    for i in 0..n_basis {
        for j in 0..=i {
            for k in 0..=i {
                let l_max = if k == i { j } else { k };
                for l in 0..=l_max {
                    indices.push(IntegralIndex(i, j, k, l));
                }
            }
        }
    }

    indices
}

impl Index<(usize, usize, usize, usize)> for ElectronTensor {
    type Output = f64;

    fn index(&self, index: (usize, usize, usize, usize)) -> &Self::Output {
        &self.data[IntegralIndex::new(index).compound()]
    }
}

impl Index<IntegralIndex> for ElectronTensor {
    type Output = f64;

    fn index(&self, index: IntegralIndex) -> &Self::Output {
        &self.data[index.compound()]
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::{integrals::McMurchieDavidson, testing};

    use super::{unique_indices, ElectronTensor, IntegralIndex};

    #[test]
    fn unique_indices_cover_packed_storage() {
        for n in 1..6 {
            let mut compounds = unique_indices(n)
                .iter()
                .map(IntegralIndex::compound)
                .collect::<Vec<_>>();
            compounds.sort_unstable();

            let n_pairs = n * (n + 1) / 2;
            assert_eq!(compounds, (0..n_pairs * (n_pairs + 1) / 2).collect::<Vec<_>>());
        }
    }

    #[test]
    fn eightfold_symmetry() {
        let index = IntegralIndex::new((0, 3, 2, 1));
        for permuted in [
            (3, 0, 2, 1),
            (0, 3, 1, 2),
            (3, 0, 1, 2),
            (2, 1, 0, 3),
            (1, 2, 0, 3),
            (2, 1, 3, 0),
            (1, 2, 3, 0),
        ] {
            assert_eq!(IntegralIndex::new(permuted), index);
        }
    }

    #[test]
    fn parallel_construction_matches_serial() {
        let system = testing::water_sto_3g();
        let integrator = McMurchieDavidson::new();

        let serial = ElectronTensor::from_basis(system.basis(), &integrator);
        let parallel = ElectronTensor::par_from_basis(system.basis(), &integrator);

        assert_eq!(serial.size(), parallel.size());
        for (a, b) in serial.data.iter().zip(&parallel.data) {
            assert_relative_eq!(a, b, epsilon = 1e-14);
        }
    }
}
