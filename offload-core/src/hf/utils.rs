use nalgebra::{DMatrix, DVector, SymmetricEigen};

#[inline(always)]
/// Create a symmetric, square matrix. Function is only run for upper triangle of the matrix
pub(crate) fn symmetric_matrix(
    n: usize,
    mut func: impl FnMut(usize, usize) -> f64,
) -> DMatrix<f64> {
    let m = DMatrix::from_fn(n, n, |i, j| if i <= j { func(i, j) } else { 0.0 });
    DMatrix::from_fn(n, n, |i, j| if i <= j { m[(i, j)] } else { m[(j, i)] })
}

const MAX_JACOBI_SWEEPS: usize = 50;

/// Eigen decomposition of a symmetric matrix, accurate to machine precision.
///
/// `SymmetricEigen` alone leaves residuals near 1e-6 on some Fock matrices.
/// Cyclic Jacobi sweeps on V^T A V take them down to rounding error.
pub(crate) fn eigs(matrix: DMatrix<f64>) -> (DMatrix<f64>, DVector<f64>) {
    let matrix = (&matrix + matrix.transpose()) * 0.5;
    let mut eigenvectors = SymmetricEigen::new(matrix.clone()).eigenvectors;
    let mut reduced = eigenvectors.transpose() * (&matrix * &eigenvectors);

    let n = reduced.nrows();
    for _ in 0..MAX_JACOBI_SWEEPS {
        let off_diagonal = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .map(|(i, j)| reduced[(i, j)].powi(2))
            .sum::<f64>();
        if off_diagonal.sqrt() <= f64::EPSILON * reduced.norm() {
            break;
        }

        for p in 0..n {
            for q in p + 1..n {
                let apq = reduced[(p, q)];
                if apq == 0.0 {
                    continue;
                }

                let theta = (reduced[(q, q)] - reduced[(p, p)]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = (t * t + 1.0).sqrt().recip();
                let s = t * c;

                rotate_columns(&mut reduced, p, q, c, s);
                rotate_rows(&mut reduced, p, q, c, s);
                rotate_columns(&mut eigenvectors, p, q, c, s);
            }
        }
    }

    (eigenvectors, reduced.diagonal())
}

fn rotate_columns(matrix: &mut DMatrix<f64>, p: usize, q: usize, c: f64, s: f64) {
    for k in 0..matrix.nrows() {
        let (kp, kq) = (matrix[(k, p)], matrix[(k, q)]);
        matrix[(k, p)] = c * kp - s * kq;
        matrix[(k, q)] = s * kp + c * kq;
    }
}

fn rotate_rows(matrix: &mut DMatrix<f64>, p: usize, q: usize, c: f64, s: f64) {
    for k in 0..matrix.ncols() {
        let (pk, qk) = (matrix[(p, k)], matrix[(q, k)]);
        matrix[(p, k)] = c * pk - s * qk;
        matrix[(q, k)] = s * pk + c * qk;
    }
}

/// Eigen decomposition with eigenvalues in ascending order
pub(crate) fn sorted_eigs(matrix: DMatrix<f64>) -> (DMatrix<f64>, DVector<f64>) {
    let (eigenvectors, eigenvalues) = eigs(matrix);

    let mut val_vec_pairs = eigenvalues
        .into_iter()
        .zip(eigenvectors.column_iter())
        .collect::<Vec<_>>();

    val_vec_pairs.sort_by(|(a, _), (b, _)| a.total_cmp(b));

    let (values, vectors): (Vec<_>, Vec<_>) = val_vec_pairs.into_iter().unzip();

    (
        DMatrix::from_columns(&vectors),
        DVector::from_column_slice(&values),
    )
}

/// [a 0; 0 b]
pub(crate) fn block_diagonal(a: &DMatrix<f64>, b: &DMatrix<f64>) -> DMatrix<f64> {
    let mut output = DMatrix::zeros(a.nrows() + b.nrows(), a.ncols() + b.ncols());
    output.view_mut((0, 0), a.shape()).copy_from(a);
    output.view_mut(a.shape(), b.shape()).copy_from(b);
    output
}


#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    use crate::testing;

    use super::{eigs, sorted_eigs};

    fn residual(matrix: &DMatrix<f64>, vectors: &DMatrix<f64>, values: &nalgebra::DVector<f64>) -> f64 {
        (matrix * vectors - vectors * DMatrix::from_diagonal(values)).amax()
    }

    #[test]
    fn orthogonalized_fock_is_diagonalized_exactly() {
        let system = testing::water_sto_3g();
        let (u, s) = eigs(system.overlap().clone());
        let x = &u * DMatrix::from_diagonal(&s.map(|v| v.sqrt().recip())) * u.transpose();
        let fock = x.transpose() * system.core_hamiltonian() * &x;

        let (vectors, values) = sorted_eigs(fock.clone());

        assert!(residual(&fock, &vectors, &values) < 1e-12);
        assert_relative_eq!(
            vectors.transpose() * &vectors,
            DMatrix::identity(7, 7),
            epsilon = 1e-13
        );
        assert!(values.as_slice().windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn random_and_degenerate_matrices() {
        for seed in 0..4 {
            let matrix = testing::random_symmetric(9, seed);
            let (vectors, values) = eigs(matrix.clone());
            assert!(residual(&matrix, &vectors, &values) < 1e-12);
        }

        let mut degenerate = DMatrix::from_diagonal_element(3, 3, 1.0);
        degenerate[(2, 2)] = 2.0;
        degenerate[(0, 1)] = 1e-7;
        degenerate[(1, 0)] = 1e-7;
        let (_, values) = sorted_eigs(degenerate);
        assert_relative_eq!(values[0], 1.0 - 1e-7, epsilon = 1e-14);
        assert_relative_eq!(values[1], 1.0 + 1e-7, epsilon = 1e-14);
        assert_relative_eq!(values[2], 2.0, epsilon = 1e-14);
    }
}
