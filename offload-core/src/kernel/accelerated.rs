use nalgebra::DMatrix;
use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};

use crate::{
    density::Hermiticity, hf::utils, system::MolecularSystem, Error, Result,
};

use super::{
    check_densities, complete_triangle, coulomb_element, electron_tensor, exchange_element, Device,
    Eigen, JkBatch, JkRequest, ScfKernel,
};

/// Kernel that runs on its own rayon worker pool.
///
/// Every row of every requested J/K matrix is an independent task, and
/// attenuated repulsion integrals are evaluated in parallel. The eigenproblem
/// is reduced to standard form with a Cholesky factor of the overlap.
#[derive(Debug)]
pub struct AcceleratedKernel {
    pool: ThreadPool,
}

impl AcceleratedKernel {
    /// Starts the worker pool. `threads = None` uses one worker per core.
    pub fn new(threads: Option<usize>) -> Result<Self> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|index| format!("offload-{index}"));
        if let Some(threads) = threads {
            builder = builder.num_threads(threads);
        }

        let pool = builder.build()?;
        log::debug!("accelerator started with {} threads", pool.current_num_threads());
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl ScfKernel for AcceleratedKernel {
    fn name(&self) -> &str {
        "accelerated"
    }

    fn device(&self) -> Device {
        Device::Accelerator {
            threads: self.threads(),
        }
    }

    fn build_jk(
        &self,
        system: &MolecularSystem,
        densities: &[DMatrix<f64>],
        hermi: Hermiticity,
        request: JkRequest,
    ) -> Result<JkBatch> {
        check_densities(system, densities)?;

        self.pool.install(|| {
            let eri = electron_tensor(system, request.omega, true);

            let vj = request.with_j.then(|| {
                densities
                    .par_iter()
                    .map(|density| match hermi {
                        // (ij|kl) is symmetric in k, l while D is antisymmetric
                        Hermiticity::AntiHermitian => DMatrix::zeros(density.nrows(), density.ncols()),
                        _ => parallel_rows(density, hermi, |i, j| coulomb_element(&eri, density, i, j)),
                    })
                    .collect::<Vec<_>>()
            });

            let vk = request.with_k.then(|| {
                densities
                    .par_iter()
                    .map(|density| parallel_rows(density, hermi, |i, j| exchange_element(&eri, density, i, j)))
                    .collect::<Vec<_>>()
            });

            Ok(JkBatch { vj, vk })
        })
    }

    fn diagonalize(&self, fock: &DMatrix<f64>, overlap: &DMatrix<f64>) -> Result<Eigen> {
        self.pool.install(|| {
            let cholesky = overlap
                .clone()
                .cholesky()
                .ok_or(Error::NotPositiveDefinite)?;
            let lower = cholesky.l();

            // L^-1 F L^-T, using the symmetry of F for the second solve
            let half = lower
                .solve_lower_triangular(fock)
                .ok_or(Error::SingularTransform("Cholesky reduction"))?;
            let reduced = lower
                .solve_lower_triangular(&half.transpose())
                .ok_or(Error::SingularTransform("Cholesky reduction"))?;
            let reduced = (&reduced + reduced.transpose()) * 0.5;

            let (reduced_coefficients, energies) = utils::sorted_eigs(reduced);
            let coefficients = lower
                .transpose()
                .solve_upper_triangular(&reduced_coefficients)
                .ok_or(Error::SingularTransform("back transformation"))?;

            Ok(Eigen {
                energies,
                coefficients,
            })
        })
    }
}

/// Evaluates `element` for every entry, one parallel task per row. With a
/// (anti-)Hermitian density only the upper triangle is evaluated.
fn parallel_rows(
    density: &DMatrix<f64>,
    hermi: Hermiticity,
    element: impl Fn(usize, usize) -> f64 + Sync,
) -> DMatrix<f64> {
    let n = density.nrows();
    let upper_only = hermi != Hermiticity::NonHermitian;

    let rows = (0..n)
        .into_par_iter()
        .map(|i| {
            let start = if upper_only { i } else { 0 };
            (start..n).map(|j| element(i, j)).collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let mut matrix = DMatrix::zeros(n, n);
    for (i, row) in rows.into_iter().enumerate() {
        let start = n - row.len();
        for (offset, value) in row.into_iter().enumerate() {
            matrix[(i, start + offset)] = value;
        }
    }

    complete_triangle(&mut matrix, hermi);
    matrix
}
