//! Coulomb/exchange builds for every density layout.
//!
//! Kernels only understand N x N matrices. [`get_jk`] hands restricted and
//! unrestricted densities to the kernel as they are and routes two-component
//! densities through [`two_component_jk`], which calls the kernel once per
//! group of spin blocks.
use nalgebra::DMatrix;

use crate::{
    density::{Hermiticity, SpinKind, SpinMatrix},
    kernel::{JkBatch, JkRequest, ScfKernel},
    system::MolecularSystem,
    Error, Result,
};

/// J and K for one density, tagged like the density they were built from.
#[derive(Debug, Clone, PartialEq)]
pub struct JkMatrices {
    pub vj: Option<SpinMatrix>,
    pub vk: Option<SpinMatrix>,
}

impl JkMatrices {
    pub fn vj(&self) -> Result<&SpinMatrix> {
        self.vj.as_ref().ok_or(Error::MissingContribution("Coulomb"))
    }

    pub fn vk(&self) -> Result<&SpinMatrix> {
        self.vk.as_ref().ok_or(Error::MissingContribution("exchange"))
    }
}

/// Builds the requested J/K contributions of `dm` with `kernel`.
///
/// Restricted and unrestricted densities are passed to
/// [`ScfKernel::build_jk`] in a single call with the blocks unchanged.
/// Two-component densities are split into spin blocks by [`two_component_jk`].
pub fn get_jk<K>(
    kernel: &K,
    system: &MolecularSystem,
    dm: &SpinMatrix,
    hermi: Hermiticity,
    request: JkRequest,
) -> Result<JkMatrices>
where
    K: ScfKernel + ?Sized,
{
    let n_ao = system.n_ao();
    if dm.n_ao() != n_ao {
        let (rows, cols) = dm.blocks()[0].shape();
        return Err(Error::DensityShape { rows, cols, n_ao });
    }

    match dm.kind() {
        kind @ (SpinKind::Restricted | SpinKind::Unrestricted) => {
            let JkBatch { vj, vk } = kernel.build_jk(system, dm.blocks(), hermi, request)?;
            Ok(JkMatrices {
                vj: vj.map(|blocks| SpinMatrix::new(kind, n_ao, blocks)).transpose()?,
                vk: vk.map(|blocks| SpinMatrix::new(kind, n_ao, blocks)).transpose()?,
            })
        }
        SpinKind::TwoComponent => {
            log::trace!("two-component JK build with {}", kernel.name());
            let (vj, vk) = two_component_jk(
                n_ao,
                &dm.blocks()[0],
                hermi,
                request,
                |densities, hermi, request| kernel.build_jk(system, densities, hermi, request),
            )?;
            Ok(JkMatrices {
                vj: vj.map(|vj| SpinMatrix::two_component(vj, n_ao)).transpose()?,
                vk: vk.map(|vk| SpinMatrix::two_component(vk, n_ao)).transpose()?,
            })
        }
    }
}

/// J and K of a 2N x 2N spinor density `dm = [aa ab; ba bb]`.
///
/// `jkbuild` is called with the diagonal blocks `[aa, bb]` and, when exchange
/// is requested, once more with the off-diagonal blocks (`[ab]` for
/// (anti-)Hermitian input, `[ab, ba]` otherwise) as non-Hermitian densities
/// without Coulomb. The result is
///
/// ```text
/// J = [J(aa) + J(bb)        0      ]     K = [K(aa) K(ab)]
///     [      0        J(aa) + J(bb)]         [K(ba) K(bb)]
/// ```
///
/// with K(ba) = +-K(ab)^T when `dm` is (anti-)Hermitian.
pub fn two_component_jk<F>(
    n_ao: usize,
    dm: &DMatrix<f64>,
    hermi: Hermiticity,
    request: JkRequest,
    mut jkbuild: F,
) -> Result<(Option<DMatrix<f64>>, Option<DMatrix<f64>>)>
where
    F: FnMut(&[DMatrix<f64>], Hermiticity, JkRequest) -> Result<JkBatch>,
{
    if dm.shape() != (2 * n_ao, 2 * n_ao) {
        let (rows, cols) = dm.shape();
        return Err(Error::DensityShape { rows, cols, n_ao });
    }
    if !request.with_j && !request.with_k {
        return Ok((None, None));
    }

    let block = |row: usize, col: usize| -> DMatrix<f64> {
        dm.view((row * n_ao, col * n_ao), (n_ao, n_ao)).into_owned()
    };

    let diagonal = jkbuild(&[block(0, 0), block(1, 1)], hermi, request)?;

    let vj = if request.with_j {
        let vj = diagonal.vj.as_deref().ok_or(Error::MissingContribution("Coulomb"))?;
        let [aa, bb] = pair(vj, "Coulomb")?;
        let total = aa + bb;
        let mut output = DMatrix::zeros(2 * n_ao, 2 * n_ao);
        output.view_mut((0, 0), (n_ao, n_ao)).copy_from(&total);
        output.view_mut((n_ao, n_ao), (n_ao, n_ao)).copy_from(&total);
        Some(output)
    } else {
        None
    };

    let vk = if request.with_k {
        let diagonal_k = diagonal.vk.as_deref().ok_or(Error::MissingContribution("exchange"))?;
        let [aa, bb] = pair(diagonal_k, "exchange")?;

        let off_diagonal = match hermi {
            Hermiticity::NonHermitian => vec![block(0, 1), block(1, 0)],
            Hermiticity::Hermitian | Hermiticity::AntiHermitian => vec![block(0, 1)],
        };
        let off_request = JkRequest {
            with_j: false,
            with_k: true,
            ..request
        };
        let off = jkbuild(&off_diagonal, Hermiticity::NonHermitian, off_request)?;
        let off = off.vk.ok_or(Error::MissingContribution("exchange"))?;
        if off.len() != off_diagonal.len() {
            return Err(Error::BlockCount {
                expected: off_diagonal.len(),
                got: off.len(),
            });
        }

        let ab = &off[0];
        let ba = match hermi {
            Hermiticity::NonHermitian => off[1].clone(),
            Hermiticity::Hermitian => ab.transpose(),
            Hermiticity::AntiHermitian => -ab.transpose(),
        };

        let mut output = DMatrix::zeros(2 * n_ao, 2 * n_ao);
        output.view_mut((0, 0), (n_ao, n_ao)).copy_from(aa);
        output.view_mut((0, n_ao), (n_ao, n_ao)).copy_from(ab);
        output.view_mut((n_ao, 0), (n_ao, n_ao)).copy_from(&ba);
        output.view_mut((n_ao, n_ao), (n_ao, n_ao)).copy_from(bb);
        Some(output)
    } else {
        None
    };

    Ok((vj, vk))
}

fn pair<'a>(
    matrices: &'a [DMatrix<f64>],
    contribution: &'static str,
) -> Result<[&'a DMatrix<f64>; 2]> {
    match matrices {
        [a, b] => Ok([a, b]),
        _ => {
            log::error!("kernel returned {} {contribution} matrices for 2 densities", matrices.len());
            Err(Error::BlockCount {
                expected: 2,
                got: matrices.len(),
            })
        }
    }
}
