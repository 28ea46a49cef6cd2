//! Grammar fetching and building.
//!
//! Grammar sources (a checkout holding `src/parser.c` and optionally a
//! scanner) are fetched from git and compiled into shared libraries that
//! [`crate::grammar`] can load at runtime.

mod compile;
mod config;
mod fetch;
mod parallel;

use std::path::PathBuf;

pub use compile::{BuildStatus, build_grammar, build_grammar_in};
pub use config::{
	GrammarConfig, SourceLocation, get_grammar_src_dir, grammar_config_path, grammar_lib_dir, grammar_sources_dir,
	library_extension, load_grammar_configs, parse_grammar_configs,
};
pub use fetch::{FetchStatus, fetch_grammar};
pub use parallel::{ProgressCallback, build_all_grammars, fetch_all_grammars};
use thiserror::Error;

/// Errors that can occur during grammar fetching or building.
#[derive(Debug, Error)]
pub enum GrammarBuildError {
	#[error("git is not available on PATH")]
	GitNotAvailable,
	#[error("failed to read grammars.toml: {0}")]
	ConfigRead(#[source] std::io::Error),
	#[error("failed to parse grammars.toml: {0}")]
	ConfigParse(#[from] toml::de::Error),
	#[error("no grammar named {0:?} in grammars.toml")]
	UnknownGrammar(String),
	#[error("git command failed: {0}")]
	GitCommand(String),
	#[error("compilation failed: {0}")]
	Compilation(String),
	#[error("no parser.c found in {0}")]
	NoParserSource(PathBuf),
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

/// Result type for grammar operations.
pub type Result<T> = std::result::Result<T, GrammarBuildError>;
