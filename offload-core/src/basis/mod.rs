mod functions;
mod set;

pub use functions::{BasisFunction, ContractedGaussian, Gaussian};
pub use set::{AtomicBasis, BasisSet};
pub(crate) use set::ElectronShell;
