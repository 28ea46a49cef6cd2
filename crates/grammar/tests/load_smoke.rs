#![allow(unused_crate_dependencies)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use pharo_grammar::{GrammarEntrypoint, GrammarError, LoadError, validate_entrypoint};
use tree_sitter_language::LanguageFn;

static TABLES: [u64; 8] = [0; 8];
static STUB_CALLS: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C" fn stub_language() -> *const () {
	STUB_CALLS.fetch_add(1, Ordering::SeqCst);
	TABLES.as_ptr().cast()
}

unsafe extern "C" fn null_language() -> *const () {
	std::ptr::null()
}

fn stub() -> GrammarEntrypoint {
	GrammarEntrypoint::new("pharo", unsafe { LanguageFn::from_raw(stub_language) })
}

#[test]
fn test_cold_entrypoint_validates() {
	// No setup before the first call.
	assert!(validate_entrypoint(&stub()).is_ok());
}

#[test]
fn test_concurrent_validation() {
	let entry = Arc::new(stub());
	let before = STUB_CALLS.load(Ordering::SeqCst);

	let workers: Vec<_> = (0..8)
		.map(|_| {
			let entry = Arc::clone(&entry);
			thread::spawn(move || (0..32).map(|_| validate_entrypoint(&entry)).collect::<Vec<_>>())
		})
		.collect();

	let results: Vec<_> = workers.into_iter().flat_map(|w| w.join().unwrap()).collect();

	assert_eq!(results.len(), 8 * 32);
	assert!(results.iter().all(Result::is_ok));
	assert!(STUB_CALLS.load(Ordering::SeqCst) - before >= 8 * 32);
}

#[test]
fn test_null_entrypoint_message() {
	let entry = GrammarEntrypoint::new("pharo", unsafe { LanguageFn::from_raw(null_language) });
	let err = validate_entrypoint(&entry).unwrap_err();

	assert!(matches!(err, LoadError::NullLanguage { ref grammar } if grammar == "pharo"));
	assert!(err.to_string().starts_with("Error loading Pharo grammar"));

	let wrapped = GrammarError::from(err);
	assert!(wrapped.to_string().starts_with("Error loading Pharo grammar"));
}

#[cfg(feature = "bundled")]
mod bundled {
	use pharo_grammar::{LANGUAGE, LanguageHandle, NODE_TYPES, validate_grammar_load};

	#[test]
	fn test_can_load_grammar() {
		let mut parser = tree_sitter::Parser::new();
		parser
			.set_language(&LANGUAGE.into())
			.expect("Error loading Pharo parser");
	}

	#[test]
	fn test_repeated_loads() {
		for _ in 0..4 {
			validate_grammar_load().expect("Error loading Pharo grammar");
		}

		let handles: Vec<_> = (0..4).map(|_| LanguageHandle::bundled().unwrap()).collect();
		assert!(handles.iter().all(|h| h.node_kind_count() == handles[0].node_kind_count()));
	}

	#[test]
	fn test_node_types_present() {
		assert!(NODE_TYPES.trim_start().starts_with('['));
	}
}
