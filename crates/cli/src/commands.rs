//! Subcommand handlers.

use std::path::PathBuf;

use anyhow::{Result, bail};
use pharo_grammar::build::{
	GrammarBuildError, GrammarConfig, ProgressCallback, build_all_grammars, fetch_all_grammars, grammar_config_path, grammar_lib_dir, grammar_sources_dir,
	load_grammar_configs,
};
use pharo_grammar::{GrammarError, LanguageHandle, cache_dir, grammar_search_paths, load_grammar, load_grammar_from_path, load_grammar_or_build, runtime_dir};
use tracing::{debug, info};

use crate::cli::{Command, GrammarAction};

/// Where `check` gets the grammar from.
enum CheckTarget {
	/// Search the grammar directories.
	Search,
	/// Search, fetching and building on a miss.
	Build,
	/// A specific library file.
	Library(PathBuf),
	/// The grammar linked into this binary.
	#[cfg(feature = "bundled")]
	Bundled,
}

pub fn run(command: Command) -> Result<()> {
	match command {
		Command::Check {
			name,
			library,
			build,
			#[cfg(feature = "bundled")]
			bundled,
			repeat,
		} => {
			let target = match library {
				Some(path) => CheckTarget::Library(path),
				None if build => CheckTarget::Build,
				None => CheckTarget::Search,
			};
			#[cfg(feature = "bundled")]
			let target = if bundled { CheckTarget::Bundled } else { target };
			check(&name, &target, repeat)
		}
		Command::Grammar { action } => grammar(action),
		Command::Paths => {
			paths();
			Ok(())
		}
	}
}

/// Loads the grammar `repeat` times and reports the last handle.
///
/// Every attempt goes through the construction entrypoint again, so a
/// grammar that only loads once fails here.
fn check(name: &str, target: &CheckTarget, repeat: u32) -> Result<()> {
	let load = || -> Result<LanguageHandle, GrammarError> {
		match target {
			CheckTarget::Search => load_grammar(name),
			CheckTarget::Build => load_grammar_or_build(name),
			CheckTarget::Library(path) => load_grammar_from_path(path, name),
			#[cfg(feature = "bundled")]
			CheckTarget::Bundled => Ok(LanguageHandle::bundled()?),
		}
	};

	let mut handle = load()?;
	for attempt in 2..=repeat {
		handle = load()?;
		debug!(grammar = name, attempt, "Grammar loaded again");
	}

	info!(grammar = name, source = %handle.source(), repeat, "Grammar check passed");
	println!(
		"{}: ok ({}, ABI {}, {} node kinds, {} fields)",
		handle.grammar(),
		handle.source(),
		handle.abi_version(),
		handle.node_kind_count(),
		handle.field_count()
	);
	Ok(())
}

fn grammar(action: GrammarAction) -> Result<()> {
	match action {
		GrammarAction::Fetch { only } => fetch(selected_grammars(only)?),
		GrammarAction::Build { only } => build(selected_grammars(only)?),
		GrammarAction::Sync { only } => {
			let grammars = selected_grammars(only)?;
			fetch(grammars.clone())?;
			build(grammars)
		}
	}
}

/// Loads configured grammars, keeping only the names in `only` when given.
fn selected_grammars(only: Option<Vec<String>>) -> Result<Vec<GrammarConfig>> {
	let configs = load_grammar_configs()?;
	let Some(only) = only else {
		return Ok(configs);
	};

	if let Some(unknown) = only.iter().find(|name| !configs.iter().any(|c| &c.grammar_id == *name)) {
		bail!("no grammar named {unknown:?} in grammars.toml");
	}

	Ok(configs.into_iter().filter(|c| only.contains(&c.grammar_id)).collect())
}

fn print_progress() -> Option<ProgressCallback> {
	Some(Box::new(|id: &str, status: &str| println!("{id}: {status}")))
}

fn fetch(grammars: Vec<GrammarConfig>) -> Result<()> {
	info!(count = grammars.len(), dir = %grammar_sources_dir().display(), "Fetching grammars");
	let results = fetch_all_grammars(grammars, print_progress());
	report_failures(results.iter().filter_map(|(g, r)| r.as_ref().err().map(|e| (g, e))))
}

fn build(grammars: Vec<GrammarConfig>) -> Result<()> {
	info!(count = grammars.len(), dir = %grammar_lib_dir().display(), "Building grammars");
	let results = build_all_grammars(grammars, print_progress());
	report_failures(results.iter().filter_map(|(g, r)| r.as_ref().err().map(|e| (g, e))))
}

fn report_failures<'a>(failures: impl Iterator<Item = (&'a GrammarConfig, &'a GrammarBuildError)>) -> Result<()> {
	let mut failed = 0usize;
	for (grammar, err) in failures {
		eprintln!("{}: {err}", grammar.grammar_id);
		failed += 1;
	}

	if failed > 0 {
		bail!("{failed} grammar(s) failed");
	}
	Ok(())
}

fn paths() {
	println!("runtime: {}", runtime_dir().display());
	match cache_dir() {
		Some(dir) => println!("cache: {}", dir.display()),
		None => println!("cache: (none)"),
	}
	match grammar_config_path() {
		Some(path) => println!("config: {}", path.display()),
		None => println!("config: (built-in)"),
	}
	println!("sources: {}", grammar_sources_dir().display());
	println!("libraries: {}", grammar_lib_dir().display());
	for dir in grammar_search_paths() {
		println!("search: {}", dir.display());
	}
}
