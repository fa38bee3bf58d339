// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! cw: command-line front end for the chartwork engine.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "cw", version, about = "Sandboxed chart-generation engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an event log and evaluate SLO thresholds; exits 1 on violation
    SloCheck {
        /// Event log to check (default: <data-root>/metrics/events.jsonl)
        #[arg(long)]
        log: Option<PathBuf>,
        /// Also write the JSON report to this path
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Render one chart synchronously and print the job snapshot
    Render {
        #[arg(long)]
        dataset: String,
        /// bar, line, or scatter (anything else falls back to bar)
        #[arg(long, default_value = "bar")]
        hint: String,
    },
    /// List saved charts, newest first
    Saved {
        #[arg(long)]
        dataset: Option<String>,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::SloCheck { log, output } => commands::slo::run(log, output),
        Commands::Render { dataset, hint } => commands::render::run(&dataset, &hint),
        Commands::Saved { dataset } => commands::saved::run(dataset.as_deref()),
    }
}
