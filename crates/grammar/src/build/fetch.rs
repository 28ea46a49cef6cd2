//! Grammar fetching from git repositories.

use std::fs;
use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use super::config::{GrammarConfig, SourceLocation, grammar_sources_dir};
use super::{GrammarBuildError, Result};

/// Status of a fetch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
	/// Grammar was already up to date.
	UpToDate,
	/// Grammar was updated to a new revision.
	Updated,
	/// Grammar uses a local path (no fetch needed).
	Local,
}

fn ensure_git_available() -> Result<()> {
	Command::new("git")
		.arg("--version")
		.output()
		.map_err(|_| GrammarBuildError::GitNotAvailable)?;
	Ok(())
}

/// Fetches a grammar from its git repository into [`grammar_sources_dir`].
///
/// An existing checkout already at the requested revision is left alone.
/// Returns [`FetchStatus::Local`] for local sources without touching git.
pub fn fetch_grammar(grammar: &GrammarConfig) -> Result<FetchStatus> {
	let SourceLocation::Git { remote, revision, .. } = &grammar.source else {
		return Ok(FetchStatus::Local);
	};

	ensure_git_available()?;
	fetch_into(&grammar_sources_dir().join(&grammar.grammar_id), &grammar.grammar_id, remote, revision)
}

fn fetch_into(grammar_dir: &Path, grammar_id: &str, remote: &str, revision: &str) -> Result<FetchStatus> {
	fs::create_dir_all(grammar_dir)?;

	if is_valid_git_repo(grammar_dir) {
		update_existing_repo(grammar_dir, grammar_id, revision)
	} else {
		clone_fresh(grammar_dir, grammar_id, remote, revision)
	}
}

fn is_valid_git_repo(dir: &Path) -> bool {
	dir.join(".git").join("HEAD").exists()
}

/// Pinned hashes are compared locally. Symbolic refs (`HEAD`, branches, tags)
/// are fetched and compared by the commit they resolve to.
fn update_existing_repo(grammar_dir: &Path, grammar_id: &str, revision: &str) -> Result<FetchStatus> {
	let current_rev = git_rev_parse(grammar_dir, "HEAD")?;

	if is_same_revision(&current_rev, revision) {
		return Ok(FetchStatus::UpToDate);
	}

	git_fetch(grammar_dir, revision)?;
	let fetched_rev = git_rev_parse(grammar_dir, "FETCH_HEAD")?;

	if fetched_rev == current_rev {
		debug!(grammar = %grammar_id, revision = %revision, "Grammar already at fetched revision");
		return Ok(FetchStatus::UpToDate);
	}

	info!(grammar = %grammar_id, from = %current_rev, to = %fetched_rev, "Updating grammar");
	git_checkout(grammar_dir, "FETCH_HEAD")?;

	Ok(FetchStatus::Updated)
}

/// Abbreviated hashes match their full form in either direction.
fn is_same_revision(current: &str, wanted: &str) -> bool {
	!current.is_empty() && !wanted.is_empty() && (current.starts_with(wanted) || wanted.starts_with(current))
}

fn clone_fresh(grammar_dir: &Path, grammar_id: &str, remote: &str, revision: &str) -> Result<FetchStatus> {
	if grammar_dir.exists() {
		fs::remove_dir_all(grammar_dir)?;
		fs::create_dir_all(grammar_dir)?;
	}

	info!(grammar = %grammar_id, remote = %remote, "Cloning grammar");
	git_clone(remote, grammar_dir)?;
	git_fetch(grammar_dir, revision).or_else(|_| git_fetch_full(grammar_dir, revision))?;
	git_checkout(grammar_dir, revision).or_else(|_| git_checkout(grammar_dir, "FETCH_HEAD"))?;

	Ok(FetchStatus::Updated)
}

fn git_rev_parse(dir: &Path, rev: &str) -> Result<String> {
	Ok(run_git(Some(dir), &["rev-parse", rev])?.trim().to_string())
}

fn git_fetch(dir: &Path, revision: &str) -> Result<()> {
	run_git(Some(dir), &["fetch", "--depth", "1", "origin", revision]).map(drop)
}

fn git_fetch_full(dir: &Path, revision: &str) -> Result<()> {
	run_git(Some(dir), &["fetch", "origin", revision]).map(drop)
}

fn git_checkout(dir: &Path, target: &str) -> Result<()> {
	run_git(Some(dir), &["checkout", target]).map(drop)
}

fn git_clone(remote: &str, dest: &Path) -> Result<()> {
	let dest = dest.to_string_lossy().into_owned();
	run_git(None, &["clone", "--depth", "1", "--single-branch", remote, dest.as_str()]).map(drop)
}

/// Runs git and returns its stdout.
fn run_git(dir: Option<&Path>, args: &[&str]) -> Result<String> {
	let mut cmd = Command::new("git");
	cmd.args(args);
	if let Some(dir) = dir {
		cmd.current_dir(dir);
	}

	let output = cmd.output().map_err(|e| GrammarBuildError::GitCommand(e.to_string()))?;

	if output.status.success() {
		Ok(String::from_utf8_lossy(&output.stdout).into_owned())
	} else {
		Err(GrammarBuildError::GitCommand(String::from_utf8_lossy(&output.stderr).into()))
	}
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use super::*;

	#[test]
	fn test_local_source_skips_git() {
		let grammar = GrammarConfig {
			grammar_id: "pharo".to_string(),
			source: SourceLocation::Local {
				path: PathBuf::from("/nonexistent/tree-sitter-pharo"),
			},
		};

		assert_eq!(fetch_grammar(&grammar).unwrap(), FetchStatus::Local);
	}

	#[test]
	fn test_revision_matching() {
		assert!(is_same_revision("0123456789abcdef", "0123456"));
		assert!(is_same_revision("0123456", "0123456789abcdef"));
		assert!(!is_same_revision("0123456789abcdef", "HEAD"));
		assert!(!is_same_revision("", "0123456"));
	}

	#[test]
	fn test_non_repo_is_not_valid() {
		let dir = tempfile::tempdir().unwrap();
		assert!(!is_valid_git_repo(dir.path()));

		std::fs::create_dir_all(dir.path().join(".git")).unwrap();
		std::fs::write(dir.path().join(".git").join("HEAD"), "ref: refs/heads/main\n").unwrap();
		assert!(is_valid_git_repo(dir.path()));
	}

	fn git(dir: &Path, args: &[&str]) -> String {
		let mut full = vec!["-c", "user.name=pharo", "-c", "user.email=pharo@localhost", "-c", "commit.gpgsign=false"];
		full.extend_from_slice(args);
		run_git(Some(dir), &full).unwrap().trim().to_string()
	}

	fn commit(repo: &Path, message: &str) -> String {
		git(repo, &["commit", "--allow-empty", "-m", message]);
		git(repo, &["rev-parse", "HEAD"])
	}

	#[test]
	fn test_symbolic_revision_is_up_to_date_until_remote_moves() {
		let upstream = tempfile::tempdir().unwrap();
		let cache = tempfile::tempdir().unwrap();
		let checkout = cache.path().join("pharo");
		let remote = format!("file://{}", upstream.path().display());

		git(upstream.path(), &["init", "--quiet"]);
		commit(upstream.path(), "first");

		assert_eq!(fetch_into(&checkout, "pharo", &remote, "HEAD").unwrap(), FetchStatus::Updated);
		assert_eq!(fetch_into(&checkout, "pharo", &remote, "HEAD").unwrap(), FetchStatus::UpToDate);

		let second = commit(upstream.path(), "second");
		assert_eq!(fetch_into(&checkout, "pharo", &remote, "HEAD").unwrap(), FetchStatus::Updated);
		assert_eq!(git_rev_parse(&checkout, "HEAD").unwrap(), second);
		assert_eq!(fetch_into(&checkout, "pharo", &remote, "HEAD").unwrap(), FetchStatus::UpToDate);
	}

	#[test]
	fn test_pinned_revision_skips_fetch() {
		let upstream = tempfile::tempdir().unwrap();
		let cache = tempfile::tempdir().unwrap();
		let checkout = cache.path().join("pharo");
		let remote = format!("file://{}", upstream.path().display());

		git(upstream.path(), &["init", "--quiet"]);
		let first = commit(upstream.path(), "first");
		fetch_into(&checkout, "pharo", &remote, "HEAD").unwrap();

		// An unreachable remote proves no network round trip happens.
		git(&checkout, &["remote", "set-url", "origin", "file:///nonexistent/pharo"]);
		assert_eq!(fetch_into(&checkout, "pharo", &remote, &first[..12]).unwrap(), FetchStatus::UpToDate);
	}
}
