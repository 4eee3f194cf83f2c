#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	clap::Parser,
	pws_sprite_project::{
		config::EncoderConfig, pack::buildPack, source::PngStripSource, Error, ASSETS_FILE,
		CONFIG_FILE, DIST_DIR, INDEX_FILE, SOURCE_DIR,
	},
	std::{
		fs,
		path::{Path, PathBuf},
		process,
	},
};

fn main() {
	#[derive(Parser)]
	struct Args {
		#[clap(long)]
		config: Option<PathBuf>,
	}
	let Args { config } = Args::parse();
	if let Err(err) = run(config.as_deref()) {
		eprintln!("✗ {err}");
		process::exit(err.exitCode());
	}
}

fn run(configPath: Option<&Path>) -> Result<(), Error> {
	let config = match configPath {
		Some(path) => EncoderConfig::load(path)?,
		None if Path::new(CONFIG_FILE).exists() => EncoderConfig::load(Path::new(CONFIG_FILE))?,
		None => EncoderConfig::default(),
	};

	let ioErr = |path: &str| {
		let path = path.to_owned();
		move |err: std::io::Error| Error::Io { path, reason: err.to_string() }
	};

	/* Filename stem is the entity id; anything else in the directory is noise. */
	let mut found = Vec::new();
	let entries = fs::read_dir(SOURCE_DIR).map_err(|err| Error::MissingArtifact {
		path: SOURCE_DIR.to_owned(),
		reason: err.to_string(),
	})?;
	for entry in entries {
		let path = entry.map_err(ioErr(SOURCE_DIR))?.path();
		if !path.extension().map_or(false, |extension| extension == "png") {
			continue;
		}
		match path.file_stem().and_then(|stem| stem.to_str()).and_then(|stem| stem.parse().ok()) {
			// filter over-max ids here, before they pay for a PNG decode
			Some(id) if id <= config.maxId => found.push((id, path)),
			Some(id) => eprintln!("✗ Skipping id {id}: beyond maxId {}", config.maxId),
			None => eprintln!("✗ Skipping {}: stem is not an id", path.display()),
		}
	}
	found.sort_unstable();

	fs::create_dir_all(DIST_DIR).map_err(ioErr(DIST_DIR))?;
	// Clear previous asset pack if it exists; a build never appends across runs
	if Path::new(ASSETS_FILE).exists() {
		fs::remove_file(ASSETS_FILE).map_err(ioErr(ASSETS_FILE))?;
	}

	let (pack, index) = buildPack(
		found.iter().map(|&(id, ref path)| (id, PngStripSource::load(path, &config))),
		&config,
	);
	fs::write(ASSETS_FILE, &pack).map_err(ioErr(ASSETS_FILE))?;
	fs::write(INDEX_FILE, index.asBytes()).map_err(ioErr(INDEX_FILE))?;

	let bundled = (0..=config.maxId)
		.filter(|&id| matches!(index.get(id, 0), Ok((_, length)) if length > 0))
		.count();
	eprintln!("\nFinal: Created pws.assets and pws.index mapping {bundled} sprites.");
	Ok(())
}
