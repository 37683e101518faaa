// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use brainconn_cli::{
    error_kind, logging_options, print_json, run_init_weights, run_inspect_weights,
    run_process, run_purge, split_debug_args, Cli, Command, ErrorResponse, InitWeightsOptions,
};
use brainconn_config::BrainconnConfig;
use brainconn_observability::{init_logging, CrateDebugFlags, DEBUG_ENV_VAR};
use brainconn_structures::ConnectivityError;
use clap::Parser;
use std::env;
use std::process::ExitCode;
use tracing::{error, info};

fn main() -> ExitCode {
    let (debug_args, clap_args) = split_debug_args(env::args());
    let cli = Cli::parse_from(clap_args);

    let mut debug_flags = CrateDebugFlags::from_args(debug_args);
    if let Ok(value) = env::var(DEBUG_ENV_VAR) {
        debug_flags.merge_env_value(&value);
    }

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            report(&e, false);
            return ExitCode::from(2);
        }
    };

    // Keep the guard alive so file writers flush on exit
    let _logging = match init_logging(&debug_flags, &logging_options(&config)) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {:#}", e);
            None
        }
    };

    let pretty = matches!(cli.command, Command::Process { pretty: true, .. });
    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(target: "brainconn-cli", "{:#}", e);
            report(&e, pretty);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, config: &BrainconnConfig) -> Result<()> {
    match &cli.command {
        Command::Process { scan, pretty, .. } => {
            info!(target: "brainconn-cli", "Processing {}", scan.display());
            let response = run_process(config, scan)?;
            print_json(&response, *pretty)
        }
        Command::InitWeights {
            timepoints,
            regions,
            hidden_dim,
            seed,
            output,
        } => {
            let options = InitWeightsOptions {
                timepoints: *timepoints,
                regions: *regions,
                hidden_dim: *hidden_dim,
                seed: *seed,
                output: output.clone(),
            };
            print_json(&run_init_weights(config, &options)?, true)
        }
        Command::InspectWeights { checkpoint } => {
            print_json(&run_inspect_weights(checkpoint)?, true)
        }
        Command::PurgeArtifacts => {
            let report = run_purge(config)?;
            info!(
                target: "brainconn-cli",
                "Purged {} request directories and {} staging directories",
                report.removed_requests,
                report.removed_staging
            );
            print_json(&report, true)
        }
    }
}

/// Print `{error, kind}` to stdout
fn report(error: &anyhow::Error, pretty: bool) {
    let response = match error.downcast_ref::<ConnectivityError>() {
        Some(pipeline_error) => ErrorResponse::from(pipeline_error),
        None => ErrorResponse {
            error: format!("{:#}", error),
            kind: error_kind(error),
        },
    };
    if let Err(e) = print_json(&response, pretty) {
        eprintln!("{:#}: {:#}", error, e);
    }
}
