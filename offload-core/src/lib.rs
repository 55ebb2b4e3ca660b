//! Hartree-Fock with pluggable compute kernels.
//!
//! The two expensive steps of every SCF iteration, building Coulomb/exchange
//! matrices and solving the generalized eigenproblem, sit behind the
//! [`kernel::ScfKernel`] interface. [`hf::Accelerated`] moves them from the
//! serial [`kernel::HostKernel`] to the worker pool of
//! [`kernel::AcceleratedKernel`] without touching the rest of a solver, and
//! [`jk::get_jk`] routes restricted, unrestricted and two-component densities
//! to whichever kernel is in use.
pub mod atom;
pub mod basis;
pub mod config;
pub mod density;
mod diis;
mod error;
pub mod hf;
pub mod integrals;
pub mod jk;
pub mod kernel;
pub mod molecule;
pub mod periodic_table;
pub mod system;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
