//=====================================================
// File: main.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: RuleScript CLI entry point
// Objective: Command-line interface for running, checking and formatting
//            RuleScript files, with token/AST dumps and JSON output
//=====================================================

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rulescript::{EngineConfig, Program, ScriptRunner, Value, compile, subscriptions, tokenize};

#[derive(Parser, Debug)]
#[command(name = "rulescript", about = "RuleScript CLI")]
pub struct Args {
    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute a script and print its output.
    Run(RunArgs),
    /// Validate syntax and list subscriptions.
    Check(FileArgs),
    /// Print the canonical rendering of a script.
    Fmt(FileArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct FileArgs {
    /// Path to the script.
    pub script: PathBuf,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Path to the script to execute.
    pub script: PathBuf,

    /// TOML engine configuration.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Seed for roll(); overrides the configuration file.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the token stream before execution.
    #[arg(long = "print-tokens")]
    pub print_tokens: bool,

    /// Print parsed AST before execution.
    #[arg(long = "print-ast")]
    pub print_ast: bool,

    /// Emit the execution result as JSON.
    #[arg(long)]
    pub json: bool,
}

fn install_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    install_tracing(args.verbose);

    match args.command {
        Command::Run(cmd) => run_entry(cmd),
        Command::Check(cmd) => check_entry(&cmd.script),
        Command::Fmt(cmd) => fmt_entry(&cmd.script),
    }
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn parse_source(path: &Path) -> Result<Program> {
    let source = read_source(path)?;
    compile(&source).map_err(|err| anyhow!("{}: [{}] {}", path.display(), err.code_str(), err))
}

fn run_entry(args: RunArgs) -> Result<ExitCode> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    if args.print_tokens {
        let source = read_source(&args.script)?;
        let tokens = tokenize(&source)
            .map_err(|err| anyhow!("{}: [E001] {}", args.script.display(), err))?;
        for token in tokens {
            println!(
                "{:>4}:{:<4} {}",
                token.position.line, token.position.column, token.kind
            );
        }
    }

    let program = parse_source(&args.script)?;
    if args.print_ast {
        println!("{:#?}", program);
    }

    let result = ScriptRunner::new(config).run_program(&program);

    if args.json {
        let json = serde_json::to_string_pretty(&result.to_json())
            .map_err(|err| anyhow!("failed to serialise execution result: {err}"))?;
        println!("{json}");
    } else {
        for message in &result.announce_messages {
            println!("[announce] {message}");
        }
        for group in &result.log_messages {
            let rendered: Vec<String> = group.iter().map(Value::to_string).collect();
            println!("[log] {}", rendered.join(" "));
        }
        match &result.error {
            Some(err) => eprintln!("error[{}]: {}", err.code_str(), err),
            None => println!("{}", result.value),
        }
    }

    Ok(if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn check_entry(path: &Path) -> Result<ExitCode> {
    let program = parse_source(path)?;
    println!(
        "{}: ok ({} top-level statements)",
        path.display(),
        program.statements.len()
    );
    let names = subscriptions(&program);
    if !names.is_empty() {
        println!("subscribes to: {}", names.join(", "));
    }
    Ok(ExitCode::SUCCESS)
}

fn fmt_entry(path: &Path) -> Result<ExitCode> {
    let program = parse_source(path)?;
    print!("{program}");
    Ok(ExitCode::SUCCESS)
}

//=====================================================
// End of file
//=====================================================
