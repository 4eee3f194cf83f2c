#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	clap::Parser,
	pws_sprite_project::{
		index::IndexTable, partFilePair, readArtifact, split::splitPack, Error, ASSETS_FILE,
		INDEX_FILE,
	},
	std::{fs, process},
};

fn main() {
	#[derive(Parser)]
	struct Args {
		#[clap(default_value_t = 4)]
		parts: usize,
	}
	let Args { parts } = Args::parse();
	if let Err(err) = run(parts.max(1)) {
		eprintln!("✗ {err}");
		process::exit(err.exitCode());
	}
}

fn run(parts: usize) -> Result<(), Error> {
	let index = IndexTable::fromBytes(readArtifact(INDEX_FILE)?);
	let pack = readArtifact(ASSETS_FILE)?;
	eprintln!(
		"Entries: {} IDs: {} Splitting into {parts} parts",
		index.entryCount(),
		index.idCount()
	);

	for (p, part) in splitPack(&index, &pack, parts)?.iter().enumerate() {
		let (assetsPath, indexPath) = partFilePair(p);
		let ioErr = |path: &str| {
			let path = path.to_owned();
			move |err: std::io::Error| Error::Io { path, reason: err.to_string() }
		};
		fs::write(&assetsPath, &part.pack).map_err(ioErr(&assetsPath))?;
		fs::write(&indexPath, part.index.asBytes()).map_err(ioErr(&indexPath))?;
		eprintln!(
			"Wrote part {p}: IDs {}-{} -> {assetsPath} ({} bytes)",
			part.firstId,
			part.lastId,
			part.pack.len()
		);
	}

	eprintln!("Done.");
	Ok(())
}
