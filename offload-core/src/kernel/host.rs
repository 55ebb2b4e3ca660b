use nalgebra::DMatrix;

use crate::{
    density::Hermiticity,
    hf::utils,
    integrals::ElectronTensor,
    system::MolecularSystem,
    Error, Result,
};

use super::{
    check_densities, complete_triangle, coulomb_element, electron_tensor, exchange_element, Device,
    Eigen, JkBatch, JkRequest, ScfKernel,
};

/// Overlap eigenvalues below this are treated as linear dependencies.
const LINEAR_DEPENDENCE: f64 = 1e-10;

/// Serial reference kernel.
///
/// Builds J and K element by element on the calling thread and solves the
/// eigenproblem through symmetric (Loewdin) orthogonalization.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostKernel;

impl ScfKernel for HostKernel {
    fn name(&self) -> &str {
        "host"
    }

    fn device(&self) -> Device {
        Device::Host
    }

    fn build_jk(
        &self,
        system: &MolecularSystem,
        densities: &[DMatrix<f64>],
        hermi: Hermiticity,
        request: JkRequest,
    ) -> Result<JkBatch> {
        check_densities(system, densities)?;
        let eri = electron_tensor(system, request.omega, false);

        let vj = request.with_j.then(|| {
            densities
                .iter()
                .map(|density| coulomb_matrix(&eri, density, hermi))
                .collect()
        });
        let vk = request.with_k.then(|| {
            densities
                .iter()
                .map(|density| exchange_matrix(&eri, density, hermi))
                .collect()
        });

        Ok(JkBatch { vj, vk })
    }

    fn diagonalize(&self, fock: &DMatrix<f64>, overlap: &DMatrix<f64>) -> Result<Eigen> {
        let transform = compute_transformation_matrix(overlap)?;

        let transformed_fock = &transform.transpose() * (fock * &transform);
        let (transformed_coefficients, energies) = utils::sorted_eigs(transformed_fock);

        Ok(Eigen {
            energies,
            coefficients: &transform * &transformed_coefficients,
        })
    }
}

fn coulomb_matrix(eri: &ElectronTensor, density: &DMatrix<f64>, hermi: Hermiticity) -> DMatrix<f64> {
    let n = density.nrows();
    match hermi {
        Hermiticity::NonHermitian => {
            DMatrix::from_fn(n, n, |i, j| coulomb_element(eri, density, i, j))
        }
        Hermiticity::Hermitian => {
            utils::symmetric_matrix(n, |i, j| coulomb_element(eri, density, i, j))
        }
        // (ij|kl) is symmetric in k, l while D is antisymmetric
        Hermiticity::AntiHermitian => DMatrix::zeros(n, n),
    }
}

fn exchange_matrix(eri: &ElectronTensor, density: &DMatrix<f64>, hermi: Hermiticity) -> DMatrix<f64> {
    let n = density.nrows();
    if hermi == Hermiticity::NonHermitian {
        return DMatrix::from_fn(n, n, |i, j| exchange_element(eri, density, i, j));
    }

    let mut exchange = DMatrix::from_fn(n, n, |i, j| {
        if i <= j {
            exchange_element(eri, density, i, j)
        } else {
            0.0
        }
    });
    complete_triangle(&mut exchange, hermi);
    exchange
}

/// X = S^-1/2
fn compute_transformation_matrix(overlap: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let (u, eigenvalues) = utils::eigs(overlap.clone());

    if eigenvalues.iter().any(|&value| value < LINEAR_DEPENDENCE) {
        return Err(Error::NotPositiveDefinite);
    }

    let diagonal_inv_sqrt = DMatrix::from_diagonal(&eigenvalues.map(|f| f.sqrt().recip()));
    Ok(&u * (diagonal_inv_sqrt * &u.transpose()))
}
