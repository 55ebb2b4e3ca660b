use thiserror::Error;

use crate::periodic_table::ElementType;

#[derive(Error, Debug)]
pub enum Error {
    #[error("basis set has no functions for element {0:?}")]
    MissingBasis(ElementType),
    #[error("invalid basis set: {0}")]
    BasisSet(String),
    #[error("invalid molecule: {0}")]
    Molecule(String),
    #[error("spin multiplicity {multiplicity} is impossible with {n_electrons} electrons")]
    InvalidSpin {
        n_electrons: usize,
        multiplicity: u32,
    },
    #[error("{method} requires {requirement}")]
    UnsupportedConfiguration {
        method: &'static str,
        requirement: &'static str,
    },
    #[error("density matrix of shape {rows}x{cols} is neither {n_ao}x{n_ao} nor its two-component double")]
    DensityShape { rows: usize, cols: usize, n_ao: usize },
    #[error("expected {expected} matrix blocks, got {got}")]
    BlockCount { expected: usize, got: usize },
    #[error("kernel did not return the requested {0} matrices")]
    MissingContribution(&'static str),
    #[error("overlap matrix is not positive definite")]
    NotPositiveDefinite,
    #[error("triangular solve in {0} failed")]
    SingularTransform(&'static str),
    #[error("DIIS extrapolation failed")]
    Diis,
    #[error("SCF did not converge within {iterations} iterations")]
    NotConverged { iterations: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("failed to start accelerator thread pool: {0}")]
    Device(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    /// Errors that originate on the accelerator itself rather than in the input.
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            Error::Device(_) | Error::NotPositiveDefinite | Error::SingularTransform(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
