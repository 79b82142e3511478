use clap::{Parser, Subcommand};
use device_spinner::{Config, DeviceSpinner};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "device-spinner")]
#[command(about = "Build wired object graphs from declarative spec files", long_about = None)]
struct Cli {
    /// Log every construction (same as RUST_LOG=debug).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every instance in a spec file with the builtin factories.
    Build {
        #[arg(long)]
        config: PathBuf,

        /// Top-level section holding the specs (e.g. `devices`).
        #[arg(long)]
        section: Option<String>,
    },
    /// Re-save a spec file, converting by the output suffix.
    Convert {
        #[arg(long)]
        config: PathBuf,

        #[arg(short = 'o', long)]
        out: PathBuf,

        #[arg(long)]
        no_overwrite: bool,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.cmd {
        Commands::Build { config, section } => {
            // 1) Load specs.
            let cfg = Config::open(&config)?;
            let specs = cfg.specs(section.as_deref())?;

            // 2) Build.
            let mut spinner = DeviceSpinner::with_builtins();
            let devices = spinner.create_devices_from_specs(&specs)?;

            // 3) Report.
            for (name, instance) in devices {
                println!("{}: {}", name, instance.type_name());
            }
        }
        Commands::Convert {
            config,
            out,
            no_overwrite,
        } => {
            let cfg = Config::open(&config)?;
            let written = cfg.save(Some(out.as_path()), !no_overwrite)?;
            println!("Wrote {}", written.display());
        }
    }

    Ok(())
}
