//! graft - Main Entry Point

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use graft_cli::{Assembler, Plan};
use graft_core::{rebase, repair_order, verify, violations, RepairConfig};
use graft_xml::{to_xml, write_file, SerializeOptions, XmlParser};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "graft", version, about = "Assemble identifier-linked XML documents")]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an assembly plan
    Assemble {
        /// Plan file (TOML)
        plan: PathBuf,

        /// Output file; overrides the plan's [output] path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report duplicate, dangling and forward references
    Check {
        /// Document to check
        file: PathBuf,
    },

    /// Move definitions ahead of their references
    Repair {
        /// Document to repair
        file: PathBuf,

        /// Output file; stdout when absent
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Renumber identifiers from 1 afterwards
        #[arg(long)]
        rebase: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Assemble { plan, output } => assemble(plan, output),
        Command::Check { file } => check(file),
        Command::Repair { file, output, rebase } => repair(file, output, rebase),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

fn assemble(plan_path: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let plan = Plan::load(&plan_path)?;
    let Some(target) = output.or_else(|| plan.output.path.clone()) else {
        bail!("no output path: pass -o or set [output] path in {}", plan_path.display());
    };
    let options = plan.output.serialize_options();

    let outcome = Assembler::new(plan)?
        .run()
        .with_context(|| format!("assembly plan {} failed", plan_path.display()))?;

    write_file(&outcome.document, &target, &options)?;
    tracing::info!(
        "Wrote {} ({} grafts, {} swaps)",
        target.display(),
        outcome.grafts,
        outcome.repair.swaps
    );
    Ok(())
}

fn check(file: PathBuf) -> Result<()> {
    let doc = XmlParser::new().parse_file(&file)?;
    let found = violations(&doc);
    for violation in &found {
        println!("{}", violation.to_error(&doc));
    }
    if !found.is_empty() {
        bail!("{} has {} violations", file.display(), found.len());
    }
    println!("{}: {} elements, no violations", file.display(), doc.element_count());
    Ok(())
}

fn repair(file: PathBuf, output: Option<PathBuf>, renumber: bool) -> Result<()> {
    let mut doc = XmlParser::new().parse_file(&file)?;
    let report = repair_order(&mut doc, &RepairConfig::default())
        .with_context(|| format!("cannot repair {}", file.display()))?;
    verify(&doc)?;
    if renumber {
        rebase(&mut doc)?;
    }
    tracing::info!("{} swaps over {} scans", report.swaps, report.scans);

    let options = SerializeOptions::default();
    match output {
        Some(path) => write_file(&doc, &path, &options)?,
        None => print!("{}", to_xml(&doc, &options)?),
    }
    Ok(())
}
