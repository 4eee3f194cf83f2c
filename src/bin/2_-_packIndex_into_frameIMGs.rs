#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	pws_sprite_project::{
		extract, index::IndexTable, readArtifact, Error, ASSETS_FILE, DIST_DIR, INDEX_FILE,
	},
	std::{fs, process},
};

fn main() {
	if let Err(err) = run() {
		eprintln!("✗ {err}");
		process::exit(err.exitCode());
	}
}

fn run() -> Result<(), Error> {
	let index = IndexTable::fromBytes(readArtifact(INDEX_FILE)?);
	let pack = readArtifact(ASSETS_FILE)?;
	println!("Index entries: {}", index.entryCount());

	let mut written = 0;
	for (id, slot, record) in extract::dumpRecords(&index, &pack) {
		let outPath = format!("{DIST_DIR}/pw-{id}-{slot}.img");
		fs::write(&outPath, record)
			.map_err(|err| Error::Io { path: outPath.clone(), reason: err.to_string() })?;
		written += 1;
	}

	println!("Wrote {written} files to {DIST_DIR}");
	Ok(())
}
