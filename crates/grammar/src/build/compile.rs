//! Grammar compilation into dynamic libraries.

use std::fs;
use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use super::config::{GrammarConfig, get_grammar_src_dir, grammar_lib_dir};
use super::{GrammarBuildError, Result};
use crate::grammar::grammar_library_name;

/// Status of a build operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
	/// Grammar was already built and up to date.
	AlreadyBuilt,
	/// Grammar was newly built.
	Built,
}

/// Scanner sources a grammar may ship next to `parser.c`.
const SCANNER_SOURCES: [&str; 2] = ["scanner.c", "scanner.cc"];

/// Returns true if any source file is newer than the compiled library.
fn needs_recompile(src_dir: &Path, lib_path: &Path) -> bool {
	let Ok(lib_mtime) = fs::metadata(lib_path).and_then(|m| m.modified()) else {
		return true;
	};

	std::iter::once("parser.c").chain(SCANNER_SOURCES).any(|file| {
		fs::metadata(src_dir.join(file))
			.and_then(|m| m.modified())
			.is_ok_and(|src_mtime| src_mtime > lib_mtime)
	})
}

/// Compiles a configured grammar into [`grammar_lib_dir`].
pub fn build_grammar(grammar: &GrammarConfig) -> Result<BuildStatus> {
	build_grammar_in(&grammar.grammar_id, &get_grammar_src_dir(grammar), &grammar_lib_dir())
}

/// Compiles the grammar sources in `src_dir` into a shared library in `lib_dir`.
///
/// 1. Verifies the presence of `parser.c`.
/// 2. Skips the build when the library is newer than every source.
/// 3. Resolves a C (or, for `scanner.cc`, C++) compiler through [`cc`].
/// 4. Links `parser.c` and the scanner into a platform-specific shared library.
///
/// # Errors
///
/// * [`GrammarBuildError::NoParserSource`] if `parser.c` is missing.
/// * [`GrammarBuildError::Io`] if `lib_dir` cannot be created.
/// * [`GrammarBuildError::Compilation`] if no compiler is found or the compiler fails.
pub fn build_grammar_in(grammar_id: &str, src_dir: &Path, lib_dir: &Path) -> Result<BuildStatus> {
	if !src_dir.join("parser.c").exists() {
		return Err(GrammarBuildError::NoParserSource(src_dir.to_path_buf()));
	}

	fs::create_dir_all(lib_dir)?;
	let lib_path = lib_dir.join(grammar_library_name(grammar_id));

	debug!(
		grammar = %grammar_id,
		lib_path = %lib_path.display(),
		lib_exists = lib_path.exists(),
		"Grammar library path"
	);

	if !needs_recompile(src_dir, &lib_path) {
		return Ok(BuildStatus::AlreadyBuilt);
	}

	info!(grammar = %grammar_id, lib_path = %lib_path.display(), "Compiling grammar");
	let cmd = link_command(src_dir, &lib_path)?;
	run_compiler(cmd)?;

	if !lib_path.exists() {
		return Err(GrammarBuildError::Compilation(format!(
			"compiler succeeded but library not found at {}",
			lib_path.display()
		)));
	}

	debug!(grammar = %grammar_id, lib_path = %lib_path.display(), "Successfully compiled grammar");
	Ok(BuildStatus::Built)
}

/// Target triple for the running host; `$TARGET` wins when set.
fn host_target() -> String {
	std::env::var("TARGET").unwrap_or_else(|_| {
		let arch = std::env::consts::ARCH;
		if cfg!(target_os = "windows") {
			format!("{arch}-pc-windows-msvc")
		} else if cfg!(target_os = "macos") {
			format!("{arch}-apple-darwin")
		} else {
			format!("{arch}-unknown-linux-gnu")
		}
	})
}

/// Builds the single compile-and-link invocation for a grammar.
///
/// The compiler comes from [`cc`], which honours `$CC`/`$CXX` and falls back
/// to the platform default.
fn link_command(src_dir: &Path, lib_path: &Path) -> Result<Command> {
	let scanner_cc = src_dir.join("scanner.cc");
	let scanner_c = src_dir.join("scanner.c");
	let needs_cxx = scanner_cc.exists();
	let target = host_target();

	let tool = cc::Build::new()
		.opt_level(3)
		.debug(false)
		.cargo_metadata(false)
		.cargo_warnings(false)
		.warnings(false)
		.host(&target)
		.target(&target)
		.cpp(needs_cxx)
		.try_get_compiler()
		.map_err(|e| {
			GrammarBuildError::Compilation(format!(
				"{} compiler required but none found ({e}). Install clang/gcc or set {}.",
				if needs_cxx { "C++" } else { "C" },
				if needs_cxx { "CXX" } else { "CC" },
			))
		})?;

	let mut cmd = tool.to_command();

	if tool.is_like_msvc() {
		cmd.args(["/nologo", "/LD", "/utf-8"])
			.arg(format!("/I{}", src_dir.display()))
			.arg(format!("/Fe:{}", lib_path.display()))
			.arg(src_dir.join("parser.c"));

		if needs_cxx {
			cmd.arg("/std:c++14").arg(&scanner_cc);
		} else if scanner_c.exists() {
			cmd.arg(&scanner_c);
		}
	} else {
		cmd.args(["-shared", "-fPIC", "-fno-exceptions"])
			.arg("-I")
			.arg(src_dir)
			.arg("-o")
			.arg(lib_path)
			.arg(src_dir.join("parser.c"));

		if needs_cxx {
			cmd.arg("-std=c++14").arg(&scanner_cc).arg("-lstdc++");
		} else if scanner_c.exists() {
			cmd.arg(&scanner_c);
		}

		if cfg!(target_os = "linux") {
			cmd.arg("-Wl,-z,relro,-z,now");
		}
	}

	Ok(cmd)
}

fn run_compiler(mut cmd: Command) -> Result<()> {
	debug!(command = ?cmd, "Running compiler");
	let output = cmd.output().map_err(|e| GrammarBuildError::Compilation(e.to_string()))?;

	if output.status.success() {
		Ok(())
	} else {
		Err(GrammarBuildError::Compilation(String::from_utf8_lossy(&output.stderr).into()))
	}
}
