use std::io::Write;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Parser;
use mips5_pipe_rs::{ForwardingMode, Program, Renderer, Scheduler};

/// Cycle-accurate five-stage pipeline simulator for a small MIPS-like
/// instruction subset.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// forwarding setting: `F` (EX->EX forwarding) or `N` (none)
    forwarding: Forwarding,
    /// instruction file path
    input: String,
    /// print a per-cycle trace to stderr
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy)]
enum Forwarding {
    Enabled,
    Disabled,
}

impl FromStr for Forwarding {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "F" => Ok(Forwarding::Enabled),
            "N" => Ok(Forwarding::Disabled),
            other => anyhow::bail!("invalid forwarding setting `{other}` (expected `F` or `N`)"),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let content = std::fs::read_to_string(&args.input)
        .with_context(|| format!("could not read file `{}`", &args.input))?;
    let program = Program::parse(&content)
        .with_context(|| format!("could not load program `{}`", &args.input))?;

    let mode = match args.forwarding {
        Forwarding::Enabled => ForwardingMode::Forwarding,
        Forwarding::Disabled => ForwardingMode::NoForwarding,
    };
    let mut scheduler = Scheduler::new(&program, mode);
    let renderer = Renderer::new();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let stderr = std::io::stderr();
    let mut err = stderr.lock();

    renderer.start_banner(&mut out, matches!(args.forwarding, Forwarding::Enabled))?;
    loop {
        let trace = scheduler.step()?;
        renderer.render_cycle(&mut out, &scheduler)?;
        if args.verbose {
            renderer.render_trace(&mut err, &trace)?;
        }
        if scheduler.is_finished() {
            break;
        }
    }
    renderer.end_banner(&mut out)?;
    out.flush()?;
    Ok(())
}
