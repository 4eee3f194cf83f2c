#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	clap::Parser,
	png::ColorType,
	pws_sprite_project::{
		extract, frame, index::IndexTable, readArtifact, Error, ASSETS_FILE, INDEX_FILE,
	},
	std::{fs::File, io::BufWriter, process},
};

fn main() {
	#[derive(Parser)]
	struct Args {
		id: u32,

		/// Frame slot, 0 or 1
		frame: u32,
	}
	let Args { id, frame } = Args::parse();
	if let Err(err) = run(id, frame) {
		eprintln!("✗ {err}");
		process::exit(err.exitCode());
	}
}

fn run(id: u32, slot: u32) -> Result<(), Error> {
	let index = IndexTable::fromBytes(readArtifact(INDEX_FILE)?);
	let pack = readArtifact(ASSETS_FILE)?;

	let (offset, length) = index.get(id, slot)?;
	eprintln!("ID {id} f{slot}: off={offset} len={length}");
	let record = extract::fetch(&pack, offset, length)?;
	let (header, indices) = frame::decode(record)?;
	eprintln!("header= [{}, {}, {}]", header.width, header.height, header.bitDepth);

	let outPath = format!("frame_{id}_f{slot}.png");
	let ioErr = |err: &dyn core::fmt::Display| Error::Io {
		path: outPath.clone(),
		reason: err.to_string(),
	};
	let (palette, trns) = extract::greyPalette(header.bitDepth);
	let mut encoder = png::Encoder::new(
		BufWriter::new(File::create(&outPath).map_err(|err| ioErr(&err))?),
		header.width.into(),
		header.height.into(),
	);
	encoder.set_color(ColorType::Indexed);
	encoder.set_depth(png::BitDepth::Eight);
	encoder.set_palette(palette);
	encoder.set_trns(trns);
	encoder
		.write_header()
		.map_err(|err| ioErr(&err))?
		.write_image_data(&indices)
		.map_err(|err| ioErr(&err))?;
	eprintln!("Wrote {outPath}");
	Ok(())
}
