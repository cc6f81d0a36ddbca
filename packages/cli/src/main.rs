mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{fill, list, render, FillArgs, ListArgs, RenderArgs};
use tracing_subscriber::EnvFilter;

/// Fieldmark CLI - inspect, fill and render documents with placeholder fields
#[derive(Parser, Debug)]
#[command(name = "fieldmark")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log command activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the fields of a document
    List(ListArgs),

    /// Render a document to HTML
    Render(RenderArgs),

    /// Set field values and optionally finalize them
    Fill(FillArgs),
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = std::env::current_dir()
        .map(|dir| dir.display().to_string())
        .unwrap_or_else(|_| ".".to_string());

    let result = match cli.command {
        Command::List(args) => list(args, &cwd),
        Command::Render(args) => render(args, &cwd),
        Command::Fill(args) => fill(args, &cwd),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
