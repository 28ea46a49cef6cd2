//! Parallel grammar fetching and building.

use std::sync::mpsc;
use std::thread;

use super::Result;
use super::compile::{BuildStatus, build_grammar};
use super::config::GrammarConfig;
use super::fetch::{FetchStatus, fetch_grammar};

/// Callback type for progress reporting: `(grammar_id, status)`.
pub type ProgressCallback = Box<dyn Fn(&str, &str) + Send + Sync>;

/// Fetch all grammars in parallel.
pub fn fetch_all_grammars(
	grammars: Vec<GrammarConfig>,
	on_progress: Option<ProgressCallback>,
) -> Vec<(GrammarConfig, Result<FetchStatus>)> {
	run_parallel(grammars, fetch_grammar, on_progress, |result| match result {
		Ok(FetchStatus::UpToDate) => "up to date",
		Ok(FetchStatus::Updated) => "updated",
		Ok(FetchStatus::Local) => "local",
		Err(_) => "error",
	})
}

/// Build all grammars in parallel.
pub fn build_all_grammars(
	grammars: Vec<GrammarConfig>,
	on_progress: Option<ProgressCallback>,
) -> Vec<(GrammarConfig, Result<BuildStatus>)> {
	run_parallel(grammars, build_grammar, on_progress, |result| match result {
		Ok(BuildStatus::AlreadyBuilt) => "up to date",
		Ok(BuildStatus::Built) => "built",
		Err(_) => "error",
	})
}

/// Runs `job` over chunks of `grammars` on worker threads.
///
/// Results arrive in completion order, one per grammar.
fn run_parallel<T: Send + 'static>(
	grammars: Vec<GrammarConfig>,
	job: fn(&GrammarConfig) -> Result<T>,
	on_progress: Option<ProgressCallback>,
	label: fn(&Result<T>) -> &'static str,
) -> Vec<(GrammarConfig, Result<T>)> {
	let (tx, rx) = mpsc::channel();
	let num_jobs = thread::available_parallelism().map(|n| n.get()).unwrap_or(4).min(8);

	let chunk_size = grammars.len().div_ceil(num_jobs).max(1);
	let chunks: Vec<Vec<GrammarConfig>> = grammars.chunks(chunk_size).map(|c| c.to_vec()).collect();

	for chunk in chunks {
		let tx = tx.clone();

		thread::spawn(move || {
			for grammar in chunk {
				let result = job(&grammar);
				let _ = tx.send((grammar, result));
			}
		});
	}

	drop(tx);

	let mut results = Vec::new();
	for (grammar, result) in rx {
		if let Some(cb) = &on_progress {
			cb(&grammar.grammar_id, label(&result));
		}
		results.push((grammar, result));
	}

	results
}
