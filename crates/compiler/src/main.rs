//! Rill CLI
//!
//! Compiles and runs a Rill source file:
//! `rill [-v] [--profile] FILE [ARG ...]`

use clap::Parser as ClapParser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io;
use std::path::PathBuf;
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use rill_runtime::RunConfig;

#[derive(ClapParser)]
#[command(name = "rill")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Rill interpreter - run Rill programs", long_about = None)]
struct Cli {
    /// Dump the compiled bytecode before execution
    #[arg(short, long)]
    verbose: bool,

    /// Count instruction dispatches and dump the bytecode again at halt
    #[arg(long)]
    profile: bool,

    /// Source file
    file: PathBuf,

    /// Integer arguments exposed to the program as the `!args` array
    #[arg(allow_negative_numbers = true)]
    args: Vec<i64>,
}

fn main() {
    let cli = Cli::parse();

    let mut image = match rillc::compile_file(&cli.file, &cli.args) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let config = RunConfig::new()
        .with_verbose(cli.verbose)
        .with_profile(cli.profile);

    // the PRNG behind `random` is seeded once per run, from the wall clock
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let mut rng = StdRng::seed_from_u64(seed);

    let stdin = io::stdin();
    let stdout = io::stdout();
    if let Err(e) = rill_runtime::run(
        &mut image,
        &config,
        stdin.lock(),
        stdout.lock(),
        &mut rng,
    ) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
