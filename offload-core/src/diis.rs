use nalgebra::{DMatrix, DVector};
use std::collections::VecDeque;

use crate::{density::SpinMatrix, Error, Result};

/// DIIS only extrapolates once this many samples are stored.
const MIN_SAMPLES: usize = 5;
const MAX_SAMPLES: usize = 12;

struct Sample {
    error: SpinMatrix,
    fock: SpinMatrix,
}

/// Pulay's direct inversion in the iterative subspace, over Fock matrices of
/// any spin layout.
pub(crate) struct Diis {
    previous_samples: VecDeque<Sample>,
}

impl Diis {
    pub fn new() -> Self {
        Self {
            previous_samples: VecDeque::new(),
        }
    }

    /// Stores a sample and returns the extrapolated Fock matrix.
    pub fn fock(&mut self, error: SpinMatrix, fock: SpinMatrix) -> Result<SpinMatrix> {
        self.previous_samples.push_front(Sample { error, fock });
        self.previous_samples.truncate(MAX_SAMPLES);

        let n = self.previous_samples.len();
        if n < MIN_SAMPLES {
            return Ok(self.previous_samples[0].fock.clone());
        }

        let matrix = DMatrix::from_fn(n + 1, n + 1, |i, j| match (i, j) {
            (i, j) if i == n && j == n => 0.0,
            (i, j) if i == n || j == n => 1.0,
            _ => self.previous_samples[j]
                .error
                .dot(&self.previous_samples[i].error),
        });

        let b = DVector::from_fn(n + 1, |i, _| if i == n { 1.0 } else { 0.0 });

        let qr = matrix.qr();
        let solution = qr.solve(&b).ok_or(Error::Diis)?;

        let mut fock = self.previous_samples[0].fock.zeros_like();
        for (sample, &weight) in self.previous_samples.iter().zip(solution.iter()) {
            fock.add_scaled(weight, &sample.fock);
        }
        Ok(fock)
    }
}
