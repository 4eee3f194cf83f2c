#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	pws_sprite_project::{
		config::EncoderConfig, index::IndexTable, readArtifact, validate::validate, Error,
		ASSETS_FILE, CONFIG_FILE, INDEX_FILE,
	},
	std::{path::Path, process},
};

/* How many ids the per-entry report samples; the bound check itself is cheap either way. */
const ID_SAMPLE: usize = 50;

fn main() {
	if let Err(err) = run() {
		eprintln!("✗ {err}");
		process::exit(err.exitCode());
	}
}

fn run() -> Result<(), Error> {
	let config = if Path::new(CONFIG_FILE).exists() {
		EncoderConfig::load(Path::new(CONFIG_FILE))?
	} else {
		EncoderConfig::default()
	};
	let index = IndexTable::fromBytes(readArtifact(INDEX_FILE)?);
	let pack = readArtifact(ASSETS_FILE)?;

	println!("Index entries: {}", index.entryCount());
	let report = validate(&index, &pack, &config, Some(ID_SAMPLE));
	for line in &report.lines {
		println!(
			"ID {} f{}: off={} len={} hdr=[{},{},{}] nonzero_payload={}",
			line.id,
			line.slot,
			line.offset,
			line.length,
			line.header[0],
			line.header[1],
			line.header[2],
			line.nonzeroPayload
		);
	}
	for finding in &report.findings {
		println!(
			"ID {} frame {}: INVALID offset/length -> offset {} + length {} > assets size {}",
			finding.id,
			finding.slot,
			finding.offset,
			finding.length,
			pack.len()
		);
	}

	println!("\nQuick summary of distinct headers in asset pack:");
	for ([h0, h1, h2], count) in &report.headerCounts {
		println!("{h0}-{h1}-{h2} count= {count}");
	}
	println!("\nDone.");

	if let Some(finding) = report.findings.first() {
		return Err(Error::AssetRange {
			offset: finding.offset,
			length: finding.length,
			packLen: pack.len(),
		});
	}
	Ok(())
}
