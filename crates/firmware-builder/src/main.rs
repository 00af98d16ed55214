//! # Firmware Builder
//!
//! Command-line utility for selecting and building APrinter MCU firmware
//! targets. Its `generate` subcommand is the build-time config codegen step:
//! it reads a declarative machine profile (kinematics variant, steps/mm,
//! heater PID gains and safety limits) and emits a Rust source module a
//! board crate can include next to its hand-written pin mapping.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::info;

mod codegen;
mod profile;

use profile::MachineProfile;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a machine profile without generating anything.
    Check(CheckArgs),
    /// Generate a Rust config module from a machine profile.
    Generate(GenerateArgs),
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// Path to the machine profile TOML file.
    profile_path: PathBuf,
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// Path to the machine profile TOML file.
    profile_path: PathBuf,

    /// Where to write the generated Rust module.
    #[arg(short, long, default_value = "machine_config.rs")]
    out: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Check(args) => run_check(args),
        Commands::Generate(args) => run_generate(args),
    }
}

fn load_profile(path: &PathBuf) -> Result<MachineProfile> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read machine profile: {path:?}"))?;
    MachineProfile::from_toml_str(&raw)
        .with_context(|| format!("failed to parse machine profile: {path:?}"))
}

fn run_check(args: CheckArgs) -> Result<()> {
    let profile = load_profile(&args.profile_path)?;
    info!(
        "profile \"{}\" is valid: {} heater(s) declared",
        profile.name,
        profile.heaters.len()
    );
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    let profile = load_profile(&args.profile_path)?;
    let rendered = codegen::render(&profile);
    fs::write(&args.out, rendered)
        .with_context(|| format!("failed to write generated module to {:?}", args.out))?;
    info!("wrote generated config module to {:?}", args.out);
    Ok(())
}
