//! Grammar source configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use super::{GrammarBuildError, Result};
use crate::grammar::{cache_dir, config_dir, runtime_dir};

/// Built-in `grammars.toml`, used when no override exists.
const DEFAULT_GRAMMARS_TOML: &str = include_str!("../../grammars.toml");

/// Grammar configuration from `grammars.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GrammarConfig {
	/// The grammar name (used for the library name and the language symbol).
	#[serde(rename = "name")]
	pub grammar_id: String,
	/// Where the grammar source lives.
	pub source: SourceLocation,
}

/// Source location for a grammar.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SourceLocation {
	/// A local checkout of the grammar.
	Local { path: PathBuf },
	/// A git repository containing the grammar.
	Git {
		#[serde(rename = "git")]
		remote: String,
		#[serde(rename = "rev", default = "default_revision")]
		revision: String,
		/// Optional subdirectory within the repository.
		#[serde(default)]
		subpath: Option<String>,
	},
}

fn default_revision() -> String {
	"HEAD".to_string()
}

#[derive(Debug, Deserialize)]
struct GrammarsFile {
	#[serde(default)]
	grammar: Vec<GrammarConfig>,
}

/// Parses the contents of a `grammars.toml` file.
pub fn parse_grammar_configs(text: &str) -> Result<Vec<GrammarConfig>> {
	let file: GrammarsFile = toml::from_str(text)?;
	Ok(file.grammar)
}

/// Returns the user's `grammars.toml`, if one applies.
///
/// `$PHARO_GRAMMAR_CONFIG` always wins, even when the file is missing, so a
/// bad override surfaces as a read error instead of being skipped.
pub fn grammar_config_path() -> Option<PathBuf> {
	if let Some(path) = std::env::var_os("PHARO_GRAMMAR_CONFIG") {
		return Some(PathBuf::from(path));
	}

	config_dir()
		.map(|d| d.join("pharo-grammar").join("grammars.toml"))
		.filter(|p| p.exists())
}

/// Loads grammar configurations from the user's file or the built-in default.
///
/// Relative local paths are resolved against the directory of the file they
/// were read from.
pub fn load_grammar_configs() -> Result<Vec<GrammarConfig>> {
	let Some(path) = grammar_config_path() else {
		return parse_grammar_configs(DEFAULT_GRAMMARS_TOML);
	};

	debug!(path = %path.display(), "Reading grammar configuration");
	let mut configs = parse_grammar_configs(&fs::read_to_string(&path).map_err(GrammarBuildError::ConfigRead)?)?;

	if let Some(base) = path.parent() {
		for config in &mut configs {
			resolve_relative(config, base);
		}
	}

	Ok(configs)
}

fn resolve_relative(config: &mut GrammarConfig, base: &Path) {
	if let SourceLocation::Local { path } = &mut config.source
		&& path.is_relative()
	{
		*path = base.join(&*path);
	}
}

/// Directory where fetched grammar sources are stored.
///
/// Sources live in the cache directory since they can be re-fetched at any time.
pub fn grammar_sources_dir() -> PathBuf {
	cache_dir().unwrap_or_else(runtime_dir).join("grammars").join("sources")
}

/// Directory where compiled grammars are written. Always one of the search paths.
pub fn grammar_lib_dir() -> PathBuf {
	cache_dir()
		.map(|c| c.join("grammars"))
		.unwrap_or_else(|| runtime_dir().join("grammars"))
}

/// Returns the directory holding a grammar's `parser.c`.
pub fn get_grammar_src_dir(grammar: &GrammarConfig) -> PathBuf {
	match &grammar.source {
		SourceLocation::Local { path } => path.join("src"),
		SourceLocation::Git { subpath, .. } => {
			let base = grammar_sources_dir().join(&grammar.grammar_id);
			match subpath {
				Some(sub) => base.join(sub).join("src"),
				None => base.join("src"),
			}
		}
	}
}

/// Shared library file extension for the current platform.
pub fn library_extension() -> &'static str {
	if cfg!(target_os = "windows") {
		"dll"
	} else if cfg!(target_os = "macos") {
		"dylib"
	} else {
		"so"
	}
}

#[cfg(test)]
mod tests {
	use serial_test::serial;

	use super::*;

	#[test]
	fn test_default_config_has_pharo() {
		let configs = parse_grammar_configs(DEFAULT_GRAMMARS_TOML).unwrap();
		let pharo = configs.iter().find(|c| c.grammar_id == "pharo").expect("pharo grammar");
		assert!(matches!(
			&pharo.source,
			SourceLocation::Git { remote, revision, subpath: None }
				if remote.ends_with("tree-sitter-pharo") && revision == "HEAD"
		));
	}

	#[test]
	fn test_grammar_source_deserialization() {
		let toml_git = r#"
            [[grammar]]
            name = "pharo"
            source = { git = "https://example.com/tree-sitter-pharo", rev = "abc123", subpath = "pharo" }
        "#;

		let configs = parse_grammar_configs(toml_git).unwrap();
		assert_eq!(configs.len(), 1);
		assert_eq!(
			configs[0].source,
			SourceLocation::Git {
				remote: "https://example.com/tree-sitter-pharo".to_string(),
				revision: "abc123".to_string(),
				subpath: Some("pharo".to_string()),
			}
		);

		let toml_local = r#"
            [[grammar]]
            name = "pharo"
            source = { path = "/path/to/grammar" }
        "#;

		let configs = parse_grammar_configs(toml_local).unwrap();
		assert_eq!(
			configs[0].source,
			SourceLocation::Local {
				path: PathBuf::from("/path/to/grammar")
			}
		);
	}

	#[test]
	fn test_empty_config() {
		assert!(parse_grammar_configs("").unwrap().is_empty());
		assert!(parse_grammar_configs("[[grammar]]\nname = 1").is_err());
	}

	#[test]
	fn test_src_dir() {
		let local = GrammarConfig {
			grammar_id: "pharo".to_string(),
			source: SourceLocation::Local {
				path: PathBuf::from("/checkout"),
			},
		};
		assert_eq!(get_grammar_src_dir(&local), PathBuf::from("/checkout/src"));

		let git = GrammarConfig {
			grammar_id: "pharo".to_string(),
			source: SourceLocation::Git {
				remote: "r".to_string(),
				revision: default_revision(),
				subpath: Some("sub".to_string()),
			},
		};
		assert!(get_grammar_src_dir(&git).ends_with("pharo/sub/src"));
	}

	#[test]
	#[serial]
	fn test_override_file_resolves_relative_paths() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("grammars.toml");
		fs::write(&path, "[[grammar]]\nname = \"pharo\"\nsource = { path = \"checkout\" }\n").unwrap();

		// SAFETY: env-mutating tests are serialised.
		unsafe { std::env::set_var("PHARO_GRAMMAR_CONFIG", &path) };
		let configs = load_grammar_configs();
		unsafe { std::env::remove_var("PHARO_GRAMMAR_CONFIG") };

		let configs = configs.unwrap();
		assert_eq!(
			configs[0].source,
			SourceLocation::Local {
				path: dir.path().join("checkout")
			}
		);
	}

	#[test]
	#[serial]
	fn test_missing_override_is_an_error() {
		let dir = tempfile::tempdir().unwrap();

		// SAFETY: env-mutating tests are serialised.
		unsafe { std::env::set_var("PHARO_GRAMMAR_CONFIG", dir.path().join("missing.toml")) };
		let result = load_grammar_configs();
		unsafe { std::env::remove_var("PHARO_GRAMMAR_CONFIG") };

		assert!(matches!(result, Err(GrammarBuildError::ConfigRead(_))));
	}

	#[test]
	fn test_library_extension() {
		let ext = library_extension();
		#[cfg(target_os = "linux")]
		assert_eq!(ext, "so");
		#[cfg(target_os = "macos")]
		assert_eq!(ext, "dylib");
		#[cfg(target_os = "windows")]
		assert_eq!(ext, "dll");
	}
}
