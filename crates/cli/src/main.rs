//! `pharo-grammar` binary.
//!
//! Loads, fetches and builds the Pharo tree-sitter grammar from the command
//! line. The `check` subcommand is the smoke test for a built grammar.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use cli::Cli;

fn main() -> ExitCode {
	let cli = Cli::parse();

	setup_tracing(cli.verbose);

	match commands::run(cli.command) {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			eprintln!("{e:#}");
			ExitCode::FAILURE
		}
	}
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("pharo_grammar=debug,info")
		} else {
			EnvFilter::new("pharo_grammar=info,warn")
		}
	});

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(verbose)
		.init();
}
