use std::{fs::File, io::BufWriter, num::NonZeroU32, path::PathBuf, time::Instant};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use offload_core::{
    basis::BasisSet,
    hf::{run_scf, solver, HartreeFockConfig, MethodKind, ScfOutput},
    kernel::Backend,
    molecule::Molecule,
    system::{MolecularElectronConfig, MolecularSystem},
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: QcCommand,
}

#[derive(Subcommand, Debug)]
enum QcCommand {
    /// Restricted (closed shell) Hartree-Fock
    #[command(name = "rhf")]
    RestrictedHartreeFock(ScfArgs),
    /// Unrestricted Hartree-Fock
    #[command(name = "uhf")]
    UnrestrictedHartreeFock(ScfArgs),
    /// Generalized (two-component) Hartree-Fock
    #[command(name = "ghf")]
    GeneralizedHartreeFock(ScfArgs),
}

#[derive(Args, Debug)]
struct ScfArgs {
    /// What basis set to use for the hartree fock calculation
    #[arg(long, short)]
    basis_set: PathBuf,
    /// A path to the molecule to perform the calculation on
    #[arg(long, short)]
    molecule: PathBuf,
    /// The charge of the molecule
    #[arg(long, short, default_value_t = 0, allow_negative_numbers = true)]
    charge: i32,
    /// The spin multiplicity of the molecule
    #[arg(long, short, default_value_t = 1)]
    spin_multiplicity: u32,
    /// The maximum number of iterations the SCF loop should attempt before the
    /// system is considered to not converge
    #[arg(long, default_value_t = 100)]
    max_iterations: usize,
    /// if the rms of the density matrix drops below this, the system is considered
    /// converged
    #[arg(long, default_value_t = 1e-6)]
    epsilon: f64,
    /// Where JK builds and diagonalizations run
    #[arg(long, value_enum, default_value_t = DeviceArg::Host)]
    device: DeviceArg,
    /// Worker threads of the accelerator, all cores if omitted
    #[arg(long)]
    threads: Option<usize>,
    /// Fail instead of retrying on the host when the accelerator fails
    #[arg(long)]
    no_fallback: bool,
    /// Write the full result as JSON to this file
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DeviceArg {
    Host,
    Accelerated,
}

impl ScfArgs {
    fn backend(&self) -> Backend {
        match self.device {
            DeviceArg::Host => Backend::Host,
            DeviceArg::Accelerated => Backend::Accelerated {
                threads: self.threads,
                fallback: !self.no_fallback,
            },
        }
    }

    fn configuration(&self) -> anyhow::Result<MolecularElectronConfig> {
        if self.charge == 0 && self.spin_multiplicity == 1 {
            return Ok(MolecularElectronConfig::ClosedShell);
        }

        let spin_multiplicity = NonZeroU32::new(self.spin_multiplicity)
            .context("spin multiplicity must be at least 1")?;
        Ok(MolecularElectronConfig::OpenShell {
            molecular_charge: self.charge,
            spin_multiplicity,
        })
    }
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    let (method, args) = match cli.command {
        QcCommand::RestrictedHartreeFock(args) => (MethodKind::Rhf, args),
        QcCommand::UnrestrictedHartreeFock(args) => (MethodKind::Uhf, args),
        QcCommand::GeneralizedHartreeFock(args) => (MethodKind::Ghf, args),
    };

    let basis_set = BasisSet::load(&args.basis_set)
        .with_context(|| format!("failed to load basis set {}", args.basis_set.display()))?;
    let molecule = Molecule::load(&args.molecule)
        .with_context(|| format!("failed to load molecule {}", args.molecule.display()))?;
    let system = MolecularSystem::new(&molecule, &basis_set, args.configuration()?)?;

    let method = solver(&system, method, args.backend())?;
    let config = HartreeFockConfig {
        max_iterations: args.max_iterations,
        epsilon: args.epsilon,
    };

    let start = Instant::now();
    let output = run_scf(method.as_ref(), &config)?;
    print_summary(&output, start);

    if let Some(path) = &args.output {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &output)?;
        log::info!("wrote result to {}", path.display());
    }

    Ok(())
}

fn print_summary(output: &ScfOutput, start: Instant) {
    println!(
        "{} converged on {} after {} iterations and {:0.2?}",
        output.method,
        output.device,
        output.iterations,
        start.elapsed()
    );
    println!("electronic energy: {:3.8}", output.electronic_energy);
    println!("nuclear repulsion energy: {:3.8}", output.nuclear_repulsion);
    println!("hartree fock energy: {:3.8}", output.total_energy());

    let labels: &[&str] = match output.method {
        MethodKind::Uhf => &["alpha spin", "beta spin"],
        MethodKind::Rhf => &["spatial"],
        MethodKind::Ghf => &["spinor"],
    };
    for (label, energies) in labels.iter().zip(&output.orbital_energies) {
        println!("orbital energies ({label}): {:3.4?}", energies.as_slice());
    }
}
