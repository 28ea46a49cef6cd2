//! Grammar construction entrypoints.
//!
//! A generated grammar exposes exactly one function, `tree_sitter_<name>`,
//! which takes no arguments and returns a pointer to its static parse tables.
//! Everything else in this crate reaches the grammar through that function.

use std::fmt;
use std::sync::Arc;

use libloading::{Library, Symbol};
use tree_sitter_language::LanguageFn;

#[cfg(feature = "bundled")]
unsafe extern "C" {
	fn tree_sitter_pharo() -> *const ();
}

/// The statically linked Pharo grammar.
///
/// # Example
///
/// ```
/// let language = pharo_grammar::LANGUAGE;
/// let mut parser = tree_sitter::Parser::new();
/// parser.set_language(&language.into()).expect("Error loading Pharo grammar");
/// ```
#[cfg(feature = "bundled")]
pub const LANGUAGE: LanguageFn = unsafe { LanguageFn::from_raw(tree_sitter_pharo) };

/// The content of the grammar's `node-types.json`.
#[cfg(feature = "bundled")]
pub const NODE_TYPES: &str = include_str!(env!("PHARO_NODE_TYPES"));

/// Returns the exported construction symbol for a grammar name.
pub fn language_symbol(grammar: &str) -> String {
	format!("tree_sitter_{}", grammar.replace('-', "_"))
}

/// A grammar's construction function, plus whatever keeps it callable.
///
/// Entrypoints resolved from a shared library share ownership of that
/// library, so the function pointer stays valid for as long as any clone is
/// alive.
#[derive(Clone)]
pub struct GrammarEntrypoint {
	grammar: String,
	func: LanguageFn,
	library: Option<Arc<Library>>,
}

impl GrammarEntrypoint {
	/// Wraps a construction function that lives as long as the process.
	pub fn new(grammar: impl Into<String>, func: LanguageFn) -> Self {
		Self {
			grammar: grammar.into(),
			func,
			library: None,
		}
	}

	/// The statically linked Pharo grammar.
	#[cfg(feature = "bundled")]
	pub fn bundled() -> Self {
		Self::new(crate::PHARO, LANGUAGE)
	}

	/// Resolves `tree_sitter_<grammar>` from an opened library.
	///
	/// # Errors
	///
	/// Returns the [`libloading::Error`] when the library does not export the symbol.
	pub fn from_library(grammar: impl Into<String>, library: Arc<Library>) -> Result<Self, libloading::Error> {
		let grammar = grammar.into();
		let symbol = language_symbol(&grammar);

		// SAFETY: generated grammars export `const TSLanguage *tree_sitter_<name>(void)`,
		// and the returned entrypoint holds the library open.
		let func = unsafe {
			let sym: Symbol<'_, unsafe extern "C" fn() -> *const ()> = library.get(symbol.as_bytes())?;
			LanguageFn::from_raw(*sym)
		};

		Ok(Self {
			grammar,
			func,
			library: Some(library),
		})
	}

	/// Grammar name, e.g. `pharo`.
	pub fn grammar(&self) -> &str {
		&self.grammar
	}

	pub fn language_fn(&self) -> LanguageFn {
		self.func
	}

	pub(crate) fn library(&self) -> Option<&Arc<Library>> {
		self.library.as_ref()
	}

	/// Calls the construction function and returns its raw result, which may be null.
	pub fn construct(&self) -> *const () {
		// SAFETY: the function takes no arguments and only hands out a pointer to
		// static tables; a backing library is kept open by `self`.
		unsafe { (self.func.into_raw())() }
	}
}

impl fmt::Debug for GrammarEntrypoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("GrammarEntrypoint")
			.field("grammar", &self.grammar)
			.field("dynamic", &self.library.is_some())
			.finish()
	}
}
