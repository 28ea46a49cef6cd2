//! Grammar loading and search path configuration.
//!
//! Compiled grammars are shared libraries named after the grammar
//! (`libpharo.so`, `libpharo.dylib`, `pharo.dll`) exporting
//! `tree_sitter_<name>`. This module finds and opens them.
//!
//! # Directories
//!
//! * `$PHARO_GRAMMAR_PATH`: extra library directories, searched first
//! * `~/.cache/pharo-grammar/grammars/`: where [`crate::build`] puts libraries
//! * `~/.local/share/pharo-grammar/grammars/` (or `$PHARO_GRAMMAR_RUNTIME/grammars/`)

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::Library;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::build::{GrammarBuildError, library_extension};
use crate::entrypoint::{GrammarEntrypoint, language_symbol};
use crate::handle::LanguageHandle;
use crate::validate::LoadError;

/// Errors that can occur when loading a grammar.
#[derive(Error, Debug)]
pub enum GrammarError {
	/// Grammar library not found in any search path.
	#[error("grammar not found: {0}")]
	NotFound(String),

	/// Failed to open the dynamic library.
	#[error("failed to load grammar library: {0}")]
	Library(String),

	/// Library exists but doesn't export the expected symbol.
	#[error("grammar library missing language function: {0}")]
	MissingSymbol(String),

	/// Library loaded but the language it produced is unusable.
	#[error(transparent)]
	Invalid(#[from] LoadError),

	/// Fetching or compiling a missing grammar failed.
	#[error(transparent)]
	Build(#[from] GrammarBuildError),
}

/// Where a loaded grammar came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarSource {
	/// Loaded from a shared library file.
	Library(PathBuf),
	/// Linked into the binary.
	Builtin(&'static str),
}

impl fmt::Display for GrammarSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Library(path) => write!(f, "library {}", path.display()),
			Self::Builtin(name) => write!(f, "builtin {name}"),
		}
	}
}

/// Loads a grammar by name from the search paths.
///
/// The first search directory containing the grammar's library wins. For
/// building missing grammars on demand, use [`load_grammar_or_build`].
pub fn load_grammar(name: &str) -> Result<LanguageHandle, GrammarError> {
	let lib_name = grammar_library_name(name);

	for dir in grammar_search_paths() {
		let lib_path = dir.join(&lib_name);

		if lib_path.exists() {
			debug!(grammar = name, path = %lib_path.display(), "Found grammar library");
			return load_grammar_from_path(&lib_path, name);
		}
	}

	Err(GrammarError::NotFound(name.to_string()))
}

/// Loads a grammar by name, fetching and compiling it if no library exists.
///
/// Only [`GrammarError::NotFound`] triggers a build; a library that exists but
/// fails to load is reported as is.
pub fn load_grammar_or_build(name: &str) -> Result<LanguageHandle, GrammarError> {
	match load_grammar(name) {
		Ok(handle) => return Ok(handle),
		Err(GrammarError::NotFound(_)) => {
			info!(grammar = name, "Grammar not found, attempting to fetch and build");
		}
		Err(e) => return Err(e),
	}

	if let Err(e) = auto_build_grammar(name) {
		warn!(grammar = name, error = %e, "Failed to auto-build grammar");
		return Err(e.into());
	}

	load_grammar(name)
}

fn auto_build_grammar(name: &str) -> Result<(), GrammarBuildError> {
	use crate::build::{build_grammar, fetch_grammar, load_grammar_configs};

	let config = load_grammar_configs()?
		.into_iter()
		.find(|c| c.grammar_id == name)
		.ok_or_else(|| GrammarBuildError::UnknownGrammar(name.to_string()))?;

	info!(grammar = name, "Fetching grammar source");
	fetch_grammar(&config)?;

	info!(grammar = name, "Building grammar");
	build_grammar(&config)?;

	info!(grammar = name, "Successfully built grammar");
	Ok(())
}

/// Loads a grammar from a specific library path.
///
/// # Errors
///
/// * [`GrammarError::Library`] if the file cannot be opened as a shared library.
/// * [`GrammarError::MissingSymbol`] if it does not export `tree_sitter_<name>`.
/// * [`GrammarError::Invalid`] if the exported function yields an unusable language.
pub fn load_grammar_from_path(path: &Path, name: &str) -> Result<LanguageHandle, GrammarError> {
	// SAFETY: grammar libraries have no initialisers of their own; the handle
	// keeps the library open for as long as its language is reachable.
	let library = unsafe { Library::new(path) }.map_err(|e| GrammarError::Library(format!("{}: {}", path.display(), e)))?;

	let entry = GrammarEntrypoint::from_library(name, Arc::new(library))
		.map_err(|e| GrammarError::MissingSymbol(format!("{} in {}: {}", language_symbol(name), path.display(), e)))?;

	Ok(LanguageHandle::new(&entry, GrammarSource::Library(path.to_path_buf()))?)
}

/// Returns the platform-specific library filename for a grammar.
pub fn grammar_library_name(name: &str) -> String {
	let safe_name = name.replace('-', "_");
	let ext = library_extension();
	if cfg!(target_os = "windows") {
		format!("{safe_name}.{ext}")
	} else {
		format!("lib{safe_name}.{ext}")
	}
}

/// Returns the runtime directory: `~/.local/share/pharo-grammar/`.
pub fn runtime_dir() -> PathBuf {
	if let Some(runtime) = std::env::var_os("PHARO_GRAMMAR_RUNTIME") {
		return PathBuf::from(runtime);
	}

	data_local_dir()
		.map(|d| d.join("pharo-grammar"))
		.unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the cache directory: `~/.cache/pharo-grammar/`.
pub fn cache_dir() -> Option<PathBuf> {
	let base = user_dir(UserDir::Cache)?;
	Some(if cfg!(windows) {
		base.join("pharo-grammar").join("cache")
	} else {
		base.join("pharo-grammar")
	})
}

/// Returns directories to search for compiled grammar libraries, in priority order.
pub fn grammar_search_paths() -> Vec<PathBuf> {
	let mut dirs = Vec::new();

	if let Some(paths) = std::env::var_os("PHARO_GRAMMAR_PATH") {
		dirs.extend(std::env::split_paths(&paths).filter(|p| !p.as_os_str().is_empty()));
	}

	if let Some(cache) = cache_dir() {
		dirs.push(cache.join("grammars"));
	}

	dirs.push(runtime_dir().join("grammars"));

	dirs
}

/// Returns the platform-specific user configuration directory.
pub(crate) fn config_dir() -> Option<PathBuf> {
	user_dir(UserDir::Config)
}

fn data_local_dir() -> Option<PathBuf> {
	user_dir(UserDir::Data)
}

#[derive(Clone, Copy)]
enum UserDir {
	Cache,
	Config,
	Data,
}

/// Per-user base directory: the XDG variable or its `$HOME` default on unix,
/// the matching known folder on Windows.
fn user_dir(kind: UserDir) -> Option<PathBuf> {
	let (xdg, home_default, windows) = match kind {
		UserDir::Cache => ("XDG_CACHE_HOME", ".cache", "LOCALAPPDATA"),
		UserDir::Config => ("XDG_CONFIG_HOME", ".config", "APPDATA"),
		UserDir::Data => ("XDG_DATA_HOME", ".local/share", "LOCALAPPDATA"),
	};

	if cfg!(windows) {
		return std::env::var_os(windows).map(PathBuf::from);
	}
	if !cfg!(unix) {
		return None;
	}

	std::env::var_os(xdg)
		.filter(|v| !v.is_empty())
		.map(PathBuf::from)
		.or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(home_default)))
}
