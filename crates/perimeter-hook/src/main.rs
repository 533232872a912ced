//! Perimeter hook - boundary gate for assistant shell commands
//!
//! Usage:
//!   perimeter-hook pre-tool-use             Answer a hook payload read from stdin
//!   perimeter-hook post-tool-use            Acknowledge a hook payload with `{}`
//!   perimeter-hook check --cwd DIR -- CMD   Evaluate one command, print the verdict
//!   perimeter-hook policy                   Print the resolved policy
//!
//! The policy file comes from `--config` or `PERIMETER_CONFIG`.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use perimeter::config::{CONFIG_ENV, home_dir, load_policy};
use perimeter::hook::{self, HookError, HookOutput};
use perimeter::{BoundaryPolicy, CommandGate, InvocationRequest};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Perimeter hook - working-directory boundary gate
#[derive(Parser, Debug)]
#[command(name = "perimeter-hook")]
#[command(about = "Working-directory boundary gate for assistant shell commands")]
struct Args {
    /// Policy file (TOML)
    #[arg(long, env = "PERIMETER_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Allow every command (standalone repositories with no boundary)
    #[arg(long, global = true)]
    permissive: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer a pre-tool-use hook payload read from stdin
    PreToolUse,
    /// Acknowledge a post-tool-use hook payload
    PostToolUse,
    /// Evaluate one command and print the verdict
    Check {
        /// Working directory (defaults to the current directory)
        #[arg(long)]
        cwd: Option<PathBuf>,
        /// The command to evaluate
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Print the resolved policy
    Policy,
}

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the hook response.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("perimeter-hook: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(args: &Args) -> Result<ExitCode> {
    match &args.command {
        Command::PreToolUse => Ok(pre_tool_use(args)),
        Command::PostToolUse => Ok(post_tool_use()),
        Command::Check { cwd, command } => check(&load(args)?, cwd.clone(), command),
        Command::Policy => {
            print_policy(&load(args)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load(args: &Args) -> Result<BoundaryPolicy> {
    if args.permissive {
        return Ok(BoundaryPolicy::allow_all());
    }
    let path = args
        .config
        .as_deref()
        .with_context(|| format!("no policy file: pass --config or set {CONFIG_ENV}"))?;
    let home = home_dir();
    load_policy(path, home.as_deref())
        .with_context(|| format!("loading policy {}", path.display()))
}

/// Always exits 0 so the host reads the decision from stdout.
fn pre_tool_use(args: &Args) -> ExitCode {
    let output = match load(args) {
        Ok(policy) => match hook::read_input(io::stdin().lock()) {
            Ok(raw) => hook::respond(&raw, &policy, std::env::current_dir().ok()),
            Err(error) => {
                tracing::warn!(%error, "blocking hook payload");
                HookOutput::from_error(&error)
            }
        },
        Err(e) => {
            let error = HookError::PolicyUnavailable(format!("{e:#}"));
            tracing::warn!(%error, "blocking hook payload");
            HookOutput::from_error(&error)
        }
    };

    writeln!(io::stdout(), "{}", output.to_json()).ok();
    ExitCode::SUCCESS
}

fn post_tool_use() -> ExitCode {
    let mut sink = String::new();
    io::stdin().read_to_string(&mut sink).ok();
    writeln!(io::stdout(), "{{}}").ok();
    ExitCode::SUCCESS
}

fn check(policy: &BoundaryPolicy, cwd: Option<PathBuf>, command: &[String]) -> Result<ExitCode> {
    let here = std::env::current_dir().context("reading current directory")?;
    let cwd = match cwd {
        Some(dir) if dir.is_absolute() => dir,
        Some(dir) => here.join(dir),
        None => here,
    };

    let verdict = policy.evaluate(&InvocationRequest::shell(command.join(" "), cwd));
    let mut stdout = io::stdout();
    match verdict.reason() {
        Some(reason) => writeln!(stdout, "{}: {reason}", verdict.kind.label())?,
        None => writeln!(stdout, "{}", verdict.kind.label())?,
    }

    Ok(if verdict.is_denied() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}

fn print_policy(policy: &BoundaryPolicy) {
    println!("mode: {}", policy.mode());
    println!("scan_arguments: {}", policy.scans_arguments());
    for root in policy.roots() {
        println!("root: {} ({})", root.path(), root.access().as_str());
        for companion in root.companions() {
            println!("  companion: {companion}");
        }
    }
    for pattern in policy.patterns() {
        println!("pattern: {}", pattern.name());
    }
}
