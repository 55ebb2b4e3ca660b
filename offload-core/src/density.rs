//! Spin structure of AO-basis matrices.
//!
//! A density matrix is classified once, when it is constructed, and the
//! resulting [`SpinKind`] travels with it. The JK dispatcher branches on the
//! tag instead of re-inspecting array shapes.
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpinKind {
    /// One N x N block holding the total (closed shell) density.
    Restricted,
    /// Two N x N blocks, alpha then beta.
    Unrestricted,
    /// One 2N x 2N spinor block ordered [aa ab; ba bb].
    TwoComponent,
}

impl SpinKind {
    pub fn n_blocks(&self) -> usize {
        match self {
            SpinKind::Restricted | SpinKind::TwoComponent => 1,
            SpinKind::Unrestricted => 2,
        }
    }

    /// Side length of each block for a basis of `n_ao` functions.
    pub fn block_dim(&self, n_ao: usize) -> usize {
        match self {
            SpinKind::Restricted | SpinKind::Unrestricted => n_ao,
            SpinKind::TwoComponent => 2 * n_ao,
        }
    }
}

/// Hermiticity of the matrices handed to a JK build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hermiticity {
    /// No symmetry may be assumed.
    #[default]
    NonHermitian,
    /// D = D^T, results are symmetric.
    Hermitian,
    /// D = -D^T, J vanishes and K is antisymmetric.
    AntiHermitian,
}

/// One or more AO-basis matrices tagged with their spin structure.
///
/// Used both for density matrices and for the matrices derived from them
/// (J, K, Fock), which always carry the tag of the density they came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinMatrix {
    kind: SpinKind,
    n_ao: usize,
    blocks: SmallVec<[DMatrix<f64>; 2]>,
}

impl SpinMatrix {
    pub fn restricted(matrix: DMatrix<f64>, n_ao: usize) -> Result<Self> {
        Self::new(SpinKind::Restricted, n_ao, smallvec![matrix])
    }

    pub fn unrestricted(alpha: DMatrix<f64>, beta: DMatrix<f64>, n_ao: usize) -> Result<Self> {
        Self::new(SpinKind::Unrestricted, n_ao, smallvec![alpha, beta])
    }

    pub fn two_component(matrix: DMatrix<f64>, n_ao: usize) -> Result<Self> {
        Self::new(SpinKind::TwoComponent, n_ao, smallvec![matrix])
    }

    /// Tags a single matrix by its shape: N x N is restricted, 2N x 2N is a
    /// two-component spinor matrix. Anything else is rejected.
    pub fn classify(matrix: DMatrix<f64>, n_ao: usize) -> Result<Self> {
        match matrix.shape() {
            (rows, cols) if rows == n_ao && cols == n_ao => Self::restricted(matrix, n_ao),
            (rows, cols) if rows == 2 * n_ao && cols == 2 * n_ao => {
                Self::two_component(matrix, n_ao)
            }
            (rows, cols) => Err(Error::DensityShape { rows, cols, n_ao }),
        }
    }

    /// Builds a matrix of the given kind from its blocks, checking count and shape.
    pub fn new(
        kind: SpinKind,
        n_ao: usize,
        blocks: impl Into<SmallVec<[DMatrix<f64>; 2]>>,
    ) -> Result<Self> {
        let blocks = blocks.into();
        if blocks.len() != kind.n_blocks() {
            return Err(Error::BlockCount {
                expected: kind.n_blocks(),
                got: blocks.len(),
            });
        }

        let dim = kind.block_dim(n_ao);
        if let Some(block) = blocks.iter().find(|block| block.shape() != (dim, dim)) {
            let (rows, cols) = block.shape();
            return Err(Error::DensityShape { rows, cols, n_ao });
        }

        Ok(Self { kind, n_ao, blocks })
    }

    /// Wraps blocks whose count and shape are correct by construction.
    pub(crate) fn from_blocks(
        kind: SpinKind,
        n_ao: usize,
        blocks: SmallVec<[DMatrix<f64>; 2]>,
    ) -> Self {
        debug_assert_eq!(blocks.len(), kind.n_blocks());
        Self { kind, n_ao, blocks }
    }

    pub fn kind(&self) -> SpinKind {
        self.kind
    }

    pub fn n_ao(&self) -> usize {
        self.n_ao
    }

    pub fn blocks(&self) -> &[DMatrix<f64>] {
        &self.blocks
    }

    pub fn into_blocks(self) -> SmallVec<[DMatrix<f64>; 2]> {
        self.blocks
    }

    /// Zero matrix with the same tag and shape.
    pub fn zeros_like(&self) -> Self {
        self.map(|block| DMatrix::zeros(block.nrows(), block.ncols()))
    }

    /// Applies `func` to every block, keeping the tag.
    pub fn map(&self, mut func: impl FnMut(&DMatrix<f64>) -> DMatrix<f64>) -> Self {
        Self {
            kind: self.kind,
            n_ao: self.n_ao,
            blocks: self.blocks.iter().map(|block| func(block)).collect(),
        }
    }

    /// Combines blocks pairwise with another matrix of the same kind.
    pub fn zip_map(
        &self,
        other: &SpinMatrix,
        mut func: impl FnMut(&DMatrix<f64>, &DMatrix<f64>) -> DMatrix<f64>,
    ) -> Self {
        debug_assert_eq!(self.kind, other.kind);
        Self {
            kind: self.kind,
            n_ao: self.n_ao,
            blocks: self
                .blocks
                .iter()
                .zip(&other.blocks)
                .map(|(a, b)| func(a, b))
                .collect(),
        }
    }

    /// self += factor * other
    pub fn add_scaled(&mut self, factor: f64, other: &SpinMatrix) {
        debug_assert_eq!(self.kind, other.kind);
        for (block, other) in self.blocks.iter_mut().zip(&other.blocks) {
            *block += other * factor;
        }
    }

    /// Frobenius inner product summed over all blocks.
    pub fn dot(&self, other: &SpinMatrix) -> f64 {
        self.blocks
            .iter()
            .zip(&other.blocks)
            .map(|(a, b)| a.dot(b))
            .sum()
    }

    /// Root mean square of all entries.
    pub fn rms(&self) -> f64 {
        let count = self.blocks.iter().map(|block| block.len()).sum::<usize>().max(1);
        (self.dot(self) / count as f64).sqrt()
    }
}
