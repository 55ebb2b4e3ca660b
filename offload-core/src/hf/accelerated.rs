use nalgebra::{DMatrix, DVector};

use crate::{
    density::{Hermiticity, SpinMatrix},
    jk::{self, JkMatrices},
    kernel::{AcceleratedKernel, Device, Eigen, JkRequest, ScfKernel},
    system::MolecularSystem,
    Result,
};

use super::{MethodKind, ScfMethod};

/// A solver whose JK builds and diagonalizations run on another kernel.
///
/// Wraps a reference solver and overrides exactly the operations listed in
/// [`Accelerated::OVERRIDDEN`]; everything else, including occupations,
/// densities and energies, is delegated to the wrapped solver. Both overrides
/// keep the signature of the operation they replace, so [`run_scf`] drives
/// either one unchanged.
///
/// When fallback is enabled (the default), a device failure of the kernel is
/// logged and the wrapped solver's own operation is used for that call.
///
/// [`run_scf`]: super::run_scf
#[derive(Debug)]
pub struct Accelerated<S, K = AcceleratedKernel> {
    inner: S,
    kernel: K,
    fallback: bool,
}

impl<S: ScfMethod> Accelerated<S> {
    /// Wraps `inner` with an accelerator pool of `threads` workers.
    pub fn new(inner: S, threads: Option<usize>) -> Result<Self> {
        Ok(Self::with_kernel(inner, AcceleratedKernel::new(threads)?))
    }
}

impl<S: ScfMethod, K: ScfKernel> Accelerated<S, K> {
    /// Names of the [`ScfMethod`] operations this wrapper replaces.
    pub const OVERRIDDEN: [&'static str; 2] = ["get_jk", "eigh"];

    pub fn with_kernel(inner: S, kernel: K) -> Self {
        Self {
            inner,
            kernel,
            fallback: true,
        }
    }

    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn overrides(operation: &str) -> bool {
        Self::OVERRIDDEN.contains(&operation)
    }

    /// The wrapped solver, whose operations serve as fallback.
    pub fn original(&self) -> &S {
        &self.inner
    }

    pub fn into_original(self) -> S {
        self.inner
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    fn or_fallback<T>(
        &self,
        operation: &str,
        result: Result<T>,
        original: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        match result {
            Err(error) if self.fallback && error.is_device_error() => {
                log::warn!(
                    "{operation} failed on {}: {error}, falling back to {}",
                    self.kernel.device(),
                    self.inner.device()
                );
                original()
            }
            result => result,
        }
    }
}

impl<S: ScfMethod, K: ScfKernel> ScfMethod for Accelerated<S, K> {
    fn system(&self) -> &MolecularSystem {
        self.inner.system()
    }

    fn kind(&self) -> MethodKind {
        self.inner.kind()
    }

    fn device(&self) -> Device {
        self.kernel.device()
    }

    fn get_jk(&self, dm: &SpinMatrix, hermi: Hermiticity, request: JkRequest) -> Result<JkMatrices> {
        let result = jk::get_jk(&self.kernel, self.system(), dm, hermi, request);
        self.or_fallback("get_jk", result, || self.inner.get_jk(dm, hermi, request))
    }

    fn eigh(&self, fock: &DMatrix<f64>, overlap: &DMatrix<f64>) -> Result<Eigen> {
        let result = self.kernel.diagonalize(fock, overlap);
        self.or_fallback("eigh", result, || self.inner.eigh(fock, overlap))
    }

    fn guess_density(&self, orbitals: &Eigen) -> Result<SpinMatrix> {
        self.inner.guess_density(orbitals)
    }

    fn get_occ(&self, energies: &[DVector<f64>]) -> Vec<DVector<f64>> {
        self.inner.get_occ(energies)
    }

    fn make_rdm1(&self, orbitals: &[Eigen], occupations: &[DVector<f64>]) -> Result<SpinMatrix> {
        self.inner.make_rdm1(orbitals, occupations)
    }

    fn combine_veff(&self, dm: &SpinMatrix, jk: &JkMatrices) -> Result<SpinMatrix> {
        self.inner.combine_veff(dm, jk)
    }

    fn core_hamiltonian(&self) -> SpinMatrix {
        self.inner.core_hamiltonian()
    }

    fn spin_overlap(&self) -> SpinMatrix {
        self.inner.spin_overlap()
    }

    fn energy_elec(&self, dm: &SpinMatrix, veff: &SpinMatrix) -> f64 {
        self.inner.energy_elec(dm, veff)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    use crate::{
        density::{Hermiticity, SpinMatrix},
        hf::{run_scf, solver, Ghf, HartreeFockConfig, MethodKind, Rhf, ScfMethod, Uhf},
        kernel::{Backend, Device, Eigen, HostKernel, JkBatch, JkRequest, ScfKernel},
        system::MolecularSystem,
        testing, Error, Result,
    };

    use super::Accelerated;

    /// Kernel whose diagonalization always fails like a broken device.
    #[derive(Debug, Default)]
    struct FailingKernel {
        attempts: AtomicUsize,
    }

    impl ScfKernel for FailingKernel {
        fn name(&self) -> &str {
            "failing"
        }

        fn device(&self) -> Device {
            Device::Accelerator { threads: 1 }
        }

        fn build_jk(
            &self,
            system: &MolecularSystem,
            densities: &[DMatrix<f64>],
            hermi: Hermiticity,
            request: JkRequest,
        ) -> Result<JkBatch> {
            HostKernel.build_jk(system, densities, hermi, request)
        }

        fn diagonalize(&self, _fock: &DMatrix<f64>, _overlap: &DMatrix<f64>) -> Result<Eigen> {
            self.attempts.fetch_add(1, Ordering::Relaxed);
            Err(Error::SingularTransform("test device"))
        }
    }

    #[test]
    fn introspection() {
        let system = testing::hydrogen_sto_3g();
        let accelerated = Accelerated::new(Rhf::new(&system).unwrap(), Some(2)).unwrap();

        assert_eq!(Accelerated::<Rhf>::OVERRIDDEN, ["get_jk", "eigh"]);
        assert!(Accelerated::<Rhf>::overrides("eigh"));
        assert!(!Accelerated::<Rhf>::overrides("get_occ"));

        assert_eq!(accelerated.device(), Device::Accelerator { threads: 2 });
        assert_eq!(accelerated.original().device(), Device::Host);
        assert_eq!(accelerated.kind(), MethodKind::Rhf);
        assert_eq!(accelerated.kernel().name(), "accelerated");
    }

    #[test]
    fn overrides_match_original_operations() {
        let system = testing::water_sto_3g();
        let accelerated = Accelerated::new(Uhf::new(&system), Some(3)).unwrap();
        let original = accelerated.original();
        let n = system.n_ao();

        let dm = SpinMatrix::unrestricted(
            testing::random_symmetric(n, 50),
            testing::random_symmetric(n, 51),
            n,
        )
        .unwrap();
        let expected = original.get_jk(&dm, Hermiticity::Hermitian, JkRequest::default()).unwrap();
        let actual = accelerated.get_jk(&dm, Hermiticity::Hermitian, JkRequest::default()).unwrap();
        for (a, b) in expected.vk().unwrap().blocks().iter().zip(actual.vk().unwrap().blocks()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }

        let fock = system.core_hamiltonian();
        let expected = original.eigh(&fock, system.overlap()).unwrap();
        let actual = accelerated.eigh(&fock, system.overlap()).unwrap();
        assert_eq!(actual.coefficients.shape(), expected.coefficients.shape());
        assert_relative_eq!(actual.energies, expected.energies, epsilon = 1e-10);
    }

    #[test]
    fn accelerated_scf_matches_reference() {
        let system = testing::water_sto_3g();
        let config = HartreeFockConfig::default();

        let reference = run_scf(&Rhf::new(&system).unwrap(), &config).unwrap();
        let accelerated =
            run_scf(&Accelerated::new(Rhf::new(&system).unwrap(), Some(4)).unwrap(), &config).unwrap();

        assert_eq!(accelerated.device, Device::Accelerator { threads: 4 });
        assert_relative_eq!(accelerated.total_energy(), reference.total_energy(), epsilon = 1e-8);
        assert_relative_eq!(
            accelerated.orbital_energies[0],
            reference.orbital_energies[0],
            epsilon = 1e-6
        );
    }

    #[test]
    fn accelerated_ghf_matches_reference() {
        let system = testing::hydrogen_sto_3g();
        let config = HartreeFockConfig::default();

        let reference = run_scf(&Ghf::new(&system), &config).unwrap();
        let accelerated =
            run_scf(&Accelerated::new(Ghf::new(&system), Some(2)).unwrap(), &config).unwrap();

        assert_relative_eq!(accelerated.total_energy(), reference.total_energy(), epsilon = 1e-8);
        assert_eq!(accelerated.density.blocks()[0].shape(), (4, 4));
    }

    #[test]
    fn falls_back_to_original_eigensolver() {
        let system = testing::hydrogen_sto_3g();
        let accelerated = Accelerated::with_kernel(Rhf::new(&system).unwrap(), FailingKernel::default());

        let output = run_scf(&accelerated, &HartreeFockConfig::default()).unwrap();

        assert!(accelerated.kernel().attempts.load(Ordering::Relaxed) > 0);
        assert_relative_eq!(output.total_energy(), -1.1167, epsilon = 1e-4);
    }

    #[test]
    fn without_fallback_device_errors_surface() {
        let system = testing::hydrogen_sto_3g();
        let accelerated = Accelerated::with_kernel(Rhf::new(&system).unwrap(), FailingKernel::default())
            .with_fallback(false);

        assert!(matches!(
            run_scf(&accelerated, &HartreeFockConfig::default()),
            Err(Error::SingularTransform("test device"))
        ));
    }

    #[test]
    fn input_errors_are_not_retried() {
        let system = testing::hydrogen_sto_3g();
        let accelerated = Accelerated::new(Rhf::new(&system).unwrap(), Some(1)).unwrap();
        let dm = SpinMatrix::classify(DMatrix::identity(3, 3), 3).unwrap();

        assert!(matches!(
            accelerated.get_jk(&dm, Hermiticity::Hermitian, JkRequest::default()),
            Err(Error::DensityShape { .. })
        ));
    }

    #[test]
    fn factory_selects_backend() {
        let system = testing::hydrogen_sto_3g();

        let host = solver(&system, MethodKind::Uhf, Backend::Host).unwrap();
        assert_eq!(host.device(), Device::Host);
        assert_eq!(host.kind(), MethodKind::Uhf);

        let backend = Backend::Accelerated {
            threads: Some(2),
            fallback: true,
        };
        let accelerated = solver(&system, MethodKind::Ghf, backend).unwrap();
        assert_eq!(accelerated.device(), Device::Accelerator { threads: 2 });

        let output = run_scf(accelerated.as_ref(), &HartreeFockConfig::default()).unwrap();
        assert_relative_eq!(output.total_energy(), -1.1167, epsilon = 1e-4);
    }
}
