use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "pharo-grammar")]
#[command(about = "Check, fetch and build the Pharo tree-sitter grammar")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Verbose logging
	#[arg(short, long, global = true)]
	pub verbose: bool,

	/// Subcommand to execute.
	#[command(subcommand)]
	pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
	/// Check that the grammar loads into the tree-sitter runtime
	Check {
		/// Grammar name; selects the library file and `tree_sitter_<name>` symbol
		#[arg(long, default_value = pharo_grammar::PHARO)]
		name: String,

		/// Load this library instead of searching the grammar directories
		#[arg(long, value_name = "PATH", conflicts_with = "build")]
		library: Option<PathBuf>,

		/// Fetch and build the grammar if no library is found
		#[arg(long)]
		build: bool,

		/// Check the grammar linked into this binary
		#[cfg(feature = "bundled")]
		#[arg(long, conflicts_with_all = ["build", "library"])]
		bundled: bool,

		/// Validate the entrypoint this many times
		#[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
		repeat: u32,
	},
	/// Manage grammar sources and libraries
	Grammar {
		/// Grammar subcommand action.
		#[command(subcommand)]
		action: GrammarAction,
	},
	/// Print the directories used for grammars
	Paths,
}

/// Grammar management subcommands.
#[derive(Subcommand, Debug)]
pub enum GrammarAction {
	/// Fetch grammar sources from git repositories
	Fetch {
		/// Only fetch specific grammars (comma-separated)
		#[arg(long, value_delimiter = ',')]
		only: Option<Vec<String>>,
	},
	/// Build grammar shared libraries
	Build {
		/// Only build specific grammars (comma-separated)
		#[arg(long, value_delimiter = ',')]
		only: Option<Vec<String>>,
	},
	/// Fetch and build all grammars
	Sync {
		/// Only sync specific grammars (comma-separated)
		#[arg(long, value_delimiter = ',')]
		only: Option<Vec<String>>,
	},
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;

	use super::*;

	#[test]
	fn test_cli_definition() {
		Cli::command().debug_assert();
	}

	#[test]
	fn test_check_defaults() {
		let cli = Cli::try_parse_from(["pharo-grammar", "check"]).unwrap();
		let Command::Check {
			name, library, build, repeat, ..
		} = cli.command
		else {
			panic!("expected check");
		};

		assert_eq!(name, "pharo");
		assert!(library.is_none());
		assert!(!build);
		assert_eq!(repeat, 1);
		assert!(!cli.verbose);
	}

	#[test]
	fn test_check_with_library() {
		let cli = Cli::try_parse_from(["pharo-grammar", "-v", "check", "--library", "/tmp/libpharo.so", "--repeat", "3"]).unwrap();
		assert!(cli.verbose);
		assert!(matches!(
			cli.command,
			Command::Check { library: Some(ref p), repeat: 3, .. } if p == &PathBuf::from("/tmp/libpharo.so")
		));
	}

	#[test]
	fn test_check_rejects_conflicts() {
		assert!(Cli::try_parse_from(["pharo-grammar", "check", "--library", "x.so", "--build"]).is_err());
		assert!(Cli::try_parse_from(["pharo-grammar", "check", "--repeat", "0"]).is_err());
	}

	#[test]
	fn test_grammar_only_list() {
		let cli = Cli::try_parse_from(["pharo-grammar", "grammar", "build", "--only", "pharo,other"]).unwrap();
		let Command::Grammar {
			action: GrammarAction::Build { only },
		} = cli.command
		else {
			panic!("expected grammar build");
		};
		assert_eq!(only, Some(vec!["pharo".to_string(), "other".to_string()]));
	}
}
