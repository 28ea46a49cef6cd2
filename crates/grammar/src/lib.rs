// Grammar operations report through tracing, never stderr
#![deny(clippy::print_stderr)]

//! Tree-sitter grammar loading for Pharo.
//!
//! The grammar itself (parse tables plus the keyword scanner) is produced by
//! `tree-sitter generate` outside this crate. This crate only cares whether
//! that artifact can be turned into a usable [`tree_sitter::Language`].
//!
//! # Architecture
//!
//! * [`entrypoint`]: The `tree_sitter_pharo` construction function, linked or resolved from a library
//! * [`validate`]: The load check and its [`LoadError`]
//! * [`handle`]: Non-null, ABI-checked [`LanguageHandle`]
//! * [`grammar`]: Search paths and dynamic loading by grammar name
//! * [`build`]: Fetching grammar sources and compiling them into shared libraries
//!
//! # Example
//!
//! ```no_run
//! let handle = pharo_grammar::load_grammar("pharo")?;
//! let mut parser = tree_sitter::Parser::new();
//! handle.attach(&mut parser)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod build;
pub mod entrypoint;
pub mod grammar;
pub mod handle;
pub mod validate;

pub use entrypoint::{GrammarEntrypoint, language_symbol};
#[cfg(feature = "bundled")]
pub use entrypoint::{LANGUAGE, NODE_TYPES};
pub use grammar::{
	GrammarError, GrammarSource, cache_dir, grammar_library_name, grammar_search_paths, load_grammar, load_grammar_from_path,
	load_grammar_or_build, runtime_dir,
};
pub use handle::LanguageHandle;
#[cfg(feature = "bundled")]
pub use validate::validate_grammar_load;
pub use validate::{LoadError, validate_entrypoint};

/// Grammar name used for symbols, library files and configuration.
pub const PHARO: &str = "pharo";
