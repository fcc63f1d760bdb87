// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! stepflow - Local Build Orchestrator
//!
//! Resolve project dependencies and run incremental pipeline steps.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stepflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stepflow=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if !stepflow::utils::should_use_colors() {
        colored::control::set_override(false);
    }

    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    match cli.command {
        Commands::Graph {
            project,
            simple,
            format,
        } => stepflow::cli::graph::run(project, simple, format, cli.verbose).await,
        Commands::Order => stepflow::cli::order::run(cli.verbose).await,
        Commands::Status {
            project,
            flow,
            format,
        } => stepflow::cli::status::run(project, flow, format).await,
        Commands::Run {
            project,
            flow,
            step,
            upstream,
        } => stepflow::cli::run::run(project, flow, step, upstream, cli.verbose).await,
        Commands::Manifest {
            project,
            flow,
            step,
        } => stepflow::cli::manifest::run(project, flow, step).await,
    }
}
