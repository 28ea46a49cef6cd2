//! Load-time validation of grammar artifacts.
//!
//! Generated grammars signal failure with a null language pointer. The check
//! here turns that sentinel into a [`LoadError`] at the boundary, so code past
//! it never looks at raw pointers again.

use thiserror::Error;
use tracing::debug;
use tree_sitter::{LANGUAGE_VERSION, MIN_COMPATIBLE_LANGUAGE_VERSION};

use crate::entrypoint::{GrammarEntrypoint, language_symbol};

/// Reasons a grammar artifact cannot become a language handle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
	/// The construction entrypoint returned null: corrupt, mismatched or missing artifact.
	#[error("Error loading {} grammar: `{}` returned a null language", display_name(.grammar), language_symbol(.grammar))]
	NullLanguage { grammar: String },

	/// The artifact was generated for an ABI the linked runtime cannot read.
	#[error(
		"Error loading {} grammar: ABI version {} is outside the supported range {}..={}",
		display_name(.grammar),
		.version,
		.min,
		.max
	)]
	IncompatibleAbi {
		grammar: String,
		version: usize,
		min: usize,
		max: usize,
	},

	/// The runtime refused the language when attaching it to a parser.
	#[error("Error loading {} grammar: {}", display_name(.grammar), .reason)]
	Rejected { grammar: String, reason: String },
}

/// Checks that a grammar's construction entrypoint yields a language.
///
/// Succeeds silently for a non-null result. Never retries; every call invokes
/// the entrypoint afresh.
///
/// # Errors
///
/// Returns [`LoadError::NullLanguage`] when the entrypoint returns null.
pub fn validate_entrypoint(entry: &GrammarEntrypoint) -> Result<(), LoadError> {
	if entry.construct().is_null() {
		return Err(LoadError::NullLanguage {
			grammar: entry.grammar().to_string(),
		});
	}

	debug!(grammar = entry.grammar(), "Grammar entrypoint returned a language");
	Ok(())
}

/// Checks the statically linked Pharo grammar.
#[cfg(feature = "bundled")]
pub fn validate_grammar_load() -> Result<(), LoadError> {
	validate_entrypoint(&GrammarEntrypoint::bundled())
}

/// Checks an artifact's ABI version against the linked tree-sitter runtime.
pub(crate) fn check_abi(grammar: &str, version: usize) -> Result<(), LoadError> {
	if (MIN_COMPATIBLE_LANGUAGE_VERSION..=LANGUAGE_VERSION).contains(&version) {
		return Ok(());
	}

	Err(LoadError::IncompatibleAbi {
		grammar: grammar.to_string(),
		version,
		min: MIN_COMPATIBLE_LANGUAGE_VERSION,
		max: LANGUAGE_VERSION,
	})
}

/// `pharo` -> `Pharo`
fn display_name(grammar: &str) -> String {
	let mut chars = grammar.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}
