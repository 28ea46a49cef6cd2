//! Runtime language handles.

use std::fmt;
use std::sync::Arc;

use libloading::Library;
use tracing::debug;
use tree_sitter::{Language, Parser};

use crate::entrypoint::GrammarEntrypoint;
use crate::grammar::GrammarSource;
use crate::validate::{LoadError, check_abi, validate_entrypoint};

/// A grammar that the tree-sitter runtime has accepted.
///
/// Never wraps a null language. A handle loaded from a shared library keeps
/// that library open; languages cloned out of [`LanguageHandle::language`]
/// must not outlive the handle.
pub struct LanguageHandle {
	grammar: String,
	language: Language,
	source: GrammarSource,
	// Dropped after `language`.
	_library: Option<Arc<Library>>,
}

impl LanguageHandle {
	/// Builds a handle from an entrypoint.
	///
	/// The entrypoint is checked for a null result before anything reads the
	/// language, then the language is checked against the runtime's ABI range.
	/// That range is the same one [`Parser::set_language`] enforces, so a
	/// handle always attaches.
	///
	/// # Errors
	///
	/// * [`LoadError::NullLanguage`] if the entrypoint returns null.
	/// * [`LoadError::IncompatibleAbi`] if the artifact's ABI version is unsupported.
	pub fn new(entry: &GrammarEntrypoint, source: GrammarSource) -> Result<Self, LoadError> {
		validate_entrypoint(entry)?;

		let language = Language::new(entry.language_fn());
		check_abi(entry.grammar(), language.abi_version())?;

		debug!(
			grammar = entry.grammar(),
			source = %source,
			abi = language.abi_version(),
			node_kinds = language.node_kind_count(),
			"Loaded grammar"
		);

		Ok(Self {
			grammar: entry.grammar().to_string(),
			language,
			source,
			_library: entry.library().cloned(),
		})
	}

	/// Loads the statically linked Pharo grammar.
	#[cfg(feature = "bundled")]
	pub fn bundled() -> Result<Self, LoadError> {
		Self::new(&GrammarEntrypoint::bundled(), GrammarSource::Builtin(crate::PHARO))
	}

	pub fn grammar(&self) -> &str {
		&self.grammar
	}

	pub fn language(&self) -> &Language {
		&self.language
	}

	/// Where the grammar was loaded from.
	pub fn source(&self) -> &GrammarSource {
		&self.source
	}

	pub fn abi_version(&self) -> usize {
		self.language.abi_version()
	}

	pub fn node_kind_count(&self) -> usize {
		self.language.node_kind_count()
	}

	pub fn field_count(&self) -> usize {
		self.language.field_count()
	}

	/// Sets this grammar as the parser's language.
	///
	/// The parser must not be used after the handle is dropped.
	pub fn attach(&self, parser: &mut Parser) -> Result<(), LoadError> {
		parser.set_language(&self.language).map_err(|e| LoadError::Rejected {
			grammar: self.grammar.clone(),
			reason: e.to_string(),
		})
	}
}

impl fmt::Debug for LanguageHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LanguageHandle")
			.field("grammar", &self.grammar)
			.field("source", &self.source)
			.field("abi_version", &self.abi_version())
			.finish_non_exhaustive()
	}
}
