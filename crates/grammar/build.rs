use std::path::PathBuf;

fn main() {
	println!("cargo:rerun-if-env-changed=PHARO_GRAMMAR_SRC");

	if std::env::var_os("CARGO_FEATURE_BUNDLED").is_none() {
		return;
	}

	let src_dir = match std::env::var_os("PHARO_GRAMMAR_SRC") {
		Some(dir) => PathBuf::from(dir),
		None => panic!("the `bundled` feature needs PHARO_GRAMMAR_SRC pointing at the grammar's generated src/ directory"),
	};

	let parser_path = src_dir.join("parser.c");
	if !parser_path.exists() {
		panic!("no parser.c in {}; run `tree-sitter generate` in the grammar checkout first", src_dir.display());
	}

	let mut c_config = cc::Build::new();
	c_config.std("c11").include(&src_dir).warnings(false);

	c_config.file(&parser_path);
	println!("cargo:rerun-if-changed={}", parser_path.display());

	let scanner_path = src_dir.join("scanner.c");
	if scanner_path.exists() {
		c_config.file(&scanner_path);
		println!("cargo:rerun-if-changed={}", scanner_path.display());
	}

	c_config.compile("tree-sitter-pharo");

	let node_types = src_dir.join("node-types.json");
	println!("cargo:rustc-env=PHARO_NODE_TYPES={}", node_types.display());
	println!("cargo:rerun-if-changed={}", node_types.display());
}
