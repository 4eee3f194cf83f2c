#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use const_format::concatcp;

pub const FRAMES_PER_ID: usize = 2;
pub const INDEX_ENTRY_LEN: usize = 8;

pub const SOURCE_DIR: &str = "assets/showdown";
pub const DIST_DIR: &str = "assets/dist";
pub const INDEX_FILE: &str = concatcp!(DIST_DIR, "/pws.index");
pub const ASSETS_FILE: &str = concatcp!(DIST_DIR, "/pws.assets");
pub const CONFIG_FILE: &str = "pws.toml";

#[must_use]
pub fn partFilePair(part: usize) -> (String, String) {
	(format!("{DIST_DIR}/pws.part{part}.assets"), format!("{DIST_DIR}/pws.part{part}.index"))
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("source decode: {0}")]
	SourceDecode(String),

	#[error("index out of range: id {id} frame {slot} needs an entry past the {tableLen}-byte index")]
	IndexRange { id: u32, slot: u32, tableLen: usize },

	#[error("asset slice out of range: offset {offset} + length {length} > assets size {packLen}")]
	AssetRange { offset: u32, length: u32, packLen: usize },

	#[error("frame record truncated: {have} bytes, header declares {need}")]
	TruncatedRecord { have: usize, need: usize },

	#[error("corrupt frame header: width {width} height {height} bitDepth {bitDepth}")]
	CorruptHeader { width: u8, height: u8, bitDepth: u8 },

	#[error("missing {path}: {reason}")]
	MissingArtifact { path: String, reason: String },

	#[error("{path}: {reason}")]
	Io { path: String, reason: String },

	#[error("bad config: {0}")]
	Config(String),
}

impl Error {
	/* Tool exit codes: missing/unreadable inputs are distinct from out-of-range lookups. */
	#[must_use]
	pub fn exitCode(&self) -> i32 {
		match self {
			Error::MissingArtifact { .. } | Error::Io { .. } | Error::Config(_) => 1,
			_ => 2,
		}
	}
}

pub fn readArtifact(path: &str) -> Result<Vec<u8>, Error> {
	std::fs::read(path)
		.map_err(|err| Error::MissingArtifact { path: path.to_owned(), reason: err.to_string() })
}

pub mod config {
	use {
		crate::Error,
		serde::{Deserialize, Serialize},
		std::{fs, path::Path},
	};

	/*
		One encoder, parameterized; the old per-depth / per-resolution converter
		variants all collapse into a choice of these fields.
	*/
	#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
	#[serde(default)]
	pub struct EncoderConfig {
		pub width: u8,
		pub height: u8,
		pub bitDepth: u8,
		pub secondFrameOffset: usize,
		pub maxId: u32,
	}

	impl Default for EncoderConfig {
		fn default() -> Self {
			Self { width: 64, height: 64, bitDepth: 4, secondFrameOffset: 4, maxId: 1023 }
		}
	}

	impl EncoderConfig {
		#[must_use]
		pub fn pixelCount(&self) -> usize {
			usize::from(self.width) * usize::from(self.height)
		}

		pub fn fromToml(text: &str) -> Result<Self, Error> {
			let config: Self = toml::from_str(text).map_err(|err| Error::Config(err.to_string()))?;
			if !(1..=8).contains(&config.bitDepth) {
				return Err(Error::Config(format!("bitDepth {} not in 1..=8", config.bitDepth)));
			}
			if config.width == 0 || config.height == 0 {
				return Err(Error::Config(format!("empty frame {}x{}", config.width, config.height)));
			}
			Ok(config)
		}

		pub fn load(path: &Path) -> Result<Self, Error> {
			let text = fs::read_to_string(path).map_err(|err| Error::MissingArtifact {
				path: path.display().to_string(),
				reason: err.to_string(),
			})?;
			Self::fromToml(&text)
		}
	}
}

pub mod quantize {
	pub const ALPHA_THRESHOLD: u8 = 128;

	#[must_use]
	pub fn maxIndex(bitDepth: u8) -> u8 {
		((1_u16 << bitDepth) - 1) as _
	}

	/*
		Palette index 0 is transparency, nothing else; opaque pixels land in
		[1, 2^bitDepth - 1] on a light-to-dark luminance scale (index 1 is the
		lightest bucket, the top index the darkest).
	*/
	#[must_use]
	pub fn quantize(r: u8, g: u8, b: u8, a: u8, bitDepth: u8) -> u8 {
		if a < ALPHA_THRESHOLD {
			return 0;
		}
		let lum = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
		let step = f32::from(256_u16 >> bitDepth);
		(((255.0 - lum) / step) as u8).clamp(1, maxIndex(bitDepth))
	}
}

pub mod bitpack {
	#[must_use]
	pub fn packedLen(count: usize, bitDepth: u8) -> usize {
		(count * usize::from(bitDepth) + 7) / 8
	}

	/*
		Values go in most-significant-first at a running bit offset. A value whose
		bitDepth doesn't divide the remaining bits of the current byte is split:
		its high bits finish the current byte, its low bits start the next one.
	*/
	#[must_use]
	pub fn pack(indices: &[u8], bitDepth: u8) -> Vec<u8> {
		let (depth, mut packed) = (usize::from(bitDepth), vec![0_u8; packedLen(indices.len(), bitDepth)]);
		let mut bitOffset = 0;
		for &index in indices {
			debug_assert_eq!(u16::from(index) >> depth, 0);
			let (byteIndex, bitsInFirst) = (bitOffset / 8, 8 - bitOffset % 8);
			if bitsInFirst >= depth {
				packed[byteIndex] |= index << (bitsInFirst - depth);
			} else {
				let spill = depth - bitsInFirst;
				packed[byteIndex] |= index >> spill;
				packed[byteIndex + 1] |= index << (8 - spill);
			}
			bitOffset += depth;
		}
		packed
	}

	#[must_use]
	pub fn unpack(packed: &[u8], count: usize, bitDepth: u8) -> Vec<u8> {
		let (depth, mask) = (usize::from(bitDepth), ((1_u16 << bitDepth) - 1) as u8);
		let mut indices = Vec::with_capacity(count);
		let mut bitOffset = 0;
		for _ in 0..count {
			let (byteIndex, bitsInFirst) = (bitOffset / 8, 8 - bitOffset % 8);
			let value = if bitsInFirst >= depth {
				packed[byteIndex] >> (bitsInFirst - depth)
			} else {
				let spill = depth - bitsInFirst;
				packed[byteIndex] << spill | packed[byteIndex + 1] >> (8 - spill)
			};
			indices.push(value & mask);
			bitOffset += depth;
		}
		indices
	}
}

pub mod frame {
	use crate::{bitpack, Error};

	pub const HEADER_LEN: usize = 3;

	pub struct Header {
		pub width: u8,
		pub height: u8,
		pub bitDepth: u8,
	}

	impl Header {
		#[must_use]
		pub fn pixelCount(&self) -> usize {
			usize::from(self.width) * usize::from(self.height)
		}
	}

	#[must_use]
	pub fn encode(width: u8, height: u8, bitDepth: u8, indices: &[u8]) -> Vec<u8> {
		debug_assert_eq!(indices.len(), usize::from(width) * usize::from(height));
		let mut record = Vec::with_capacity(HEADER_LEN + bitpack::packedLen(indices.len(), bitDepth));
		record.extend_from_slice(&[width, height, bitDepth]);
		record.extend_from_slice(&bitpack::pack(indices, bitDepth));
		record
	}

	/* The bit depth embedded in the record wins; callers never supply one. */
	pub fn decode(record: &[u8]) -> Result<(Header, Vec<u8>), Error> {
		if record.len() < HEADER_LEN {
			return Err(Error::TruncatedRecord { have: record.len(), need: HEADER_LEN });
		}
		let header = Header { width: record[0], height: record[1], bitDepth: record[2] };
		if !(1..=8).contains(&header.bitDepth) {
			return Err(Error::CorruptHeader {
				width: header.width,
				height: header.height,
				bitDepth: header.bitDepth,
			});
		}
		let need = HEADER_LEN + bitpack::packedLen(header.pixelCount(), header.bitDepth);
		if record.len() < need {
			return Err(Error::TruncatedRecord { have: record.len(), need });
		}
		let indices = bitpack::unpack(&record[HEADER_LEN..], header.pixelCount(), header.bitDepth);
		Ok((header, indices))
	}
}

pub mod index {
	use {
		crate::{Error, FRAMES_PER_ID, INDEX_ENTRY_LEN},
		byteorder::{ByteOrder, LE},
	};

	/*
		Direct-addressed (offset, length) table: entry id * 2 + slot at byte
		entry * 8, uint32LE offset then uint32LE length. length 0 is the "no
		data" sentinel, so the table stays the same fixed size no matter how
		many ids were actually found.
	*/
	pub struct IndexTable {
		bytes: Vec<u8>,
	}

	impl IndexTable {
		#[must_use]
		pub fn forMaxId(maxId: u32) -> Self {
			Self { bytes: vec![0; (maxId as usize + 1) * FRAMES_PER_ID * INDEX_ENTRY_LEN] }
		}

		#[must_use]
		pub fn fromBytes(bytes: Vec<u8>) -> Self {
			Self { bytes }
		}

		#[must_use]
		pub fn asBytes(&self) -> &[u8] {
			&self.bytes
		}

		#[must_use]
		pub fn entryCount(&self) -> usize {
			self.bytes.len() / INDEX_ENTRY_LEN
		}

		#[must_use]
		pub fn idCount(&self) -> usize {
			self.entryCount() / FRAMES_PER_ID
		}

		fn entryPos(&self, id: u32, slot: u32) -> Result<usize, Error> {
			let pos = (id as usize * FRAMES_PER_ID + slot as usize) * INDEX_ENTRY_LEN;
			if slot >= FRAMES_PER_ID as u32 || pos + INDEX_ENTRY_LEN > self.bytes.len() {
				return Err(Error::IndexRange { id, slot, tableLen: self.bytes.len() });
			}
			Ok(pos)
		}

		pub fn get(&self, id: u32, slot: u32) -> Result<(u32, u32), Error> {
			let pos = self.entryPos(id, slot)?;
			Ok((LE::read_u32(&self.bytes[pos..]), LE::read_u32(&self.bytes[pos + 4..])))
		}

		pub fn set(&mut self, id: u32, slot: u32, offset: u32, length: u32) -> Result<(), Error> {
			let pos = self.entryPos(id, slot)?;
			LE::write_u32(&mut self.bytes[pos..pos + 4], offset);
			LE::write_u32(&mut self.bytes[pos + 4..pos + 8], length);
			Ok(())
		}
	}
}

pub mod source {
	use {
		crate::{config::EncoderConfig, Error},
		std::{fs::File, path::Path},
	};

	/*
		The build path never sees the animated originals, only this seam: a pose
		count and fixed-size RGBA buffers at the configured resolution.
	*/
	pub trait FrameSource {
		fn poseCount(&self) -> usize;
		fn rgbaPose(&self, pose: usize) -> Result<Vec<u8>, Error>;
	}

	/* A vertical strip of square poses, one width x width band per pose. */
	pub struct PngStripSource {
		poses: Vec<Vec<u8>>,
	}

	impl PngStripSource {
		pub fn load(path: &Path, config: &EncoderConfig) -> Result<Self, Error> {
			let decodeErr =
				|err: &dyn core::fmt::Display| Error::SourceDecode(format!("{}: {err}", path.display()));
			let file = File::open(path).map_err(|err| decodeErr(&err))?;
			let mut decoder = png::Decoder::new(file);
			decoder.set_transformations(
				png::Transformations::EXPAND
					| png::Transformations::ALPHA
					| png::Transformations::STRIP_16,
			);
			let mut reader = decoder.read_info().map_err(|err| decodeErr(&err))?;
			let mut buffer = vec![0; reader.output_buffer_size()];
			let info = reader.next_frame(&mut buffer).map_err(|err| decodeErr(&err))?;
			buffer.truncate(info.buffer_size());
			let rgba = match info.color_type {
				png::ColorType::Rgba => buffer,
				png::ColorType::GrayscaleAlpha => buffer
					.chunks_exact(2)
					.flat_map(|pixel| [pixel[0], pixel[0], pixel[0], pixel[1]])
					.collect(),
				other => return Err(decodeErr(&format!("unsupported color type {other:?}"))),
			};
			let (srcWidth, srcHeight) = (info.width as usize, info.height as usize);
			let poseCount = (srcHeight / srcWidth).max(1);
			let poseHeight = srcHeight / poseCount;
			let mut poses = Vec::with_capacity(poseCount);
			for pose in 0..poseCount {
				let band = &rgba[pose * poseHeight * srcWidth * 4..][..poseHeight * srcWidth * 4];
				poses.push(resizeNearest(band, srcWidth, poseHeight, config.width, config.height));
			}
			Ok(Self { poses })
		}
	}

	impl FrameSource for PngStripSource {
		fn poseCount(&self) -> usize {
			self.poses.len()
		}

		fn rgbaPose(&self, pose: usize) -> Result<Vec<u8>, Error> {
			self.poses
				.get(pose)
				.cloned()
				.ok_or_else(|| Error::SourceDecode(format!("pose {pose} out of range")))
		}
	}

	#[must_use]
	pub fn resizeNearest(
		src: &[u8],
		srcWidth: usize,
		srcHeight: usize,
		dstWidth: u8,
		dstHeight: u8,
	) -> Vec<u8> {
		let (dstWidth, dstHeight) = (usize::from(dstWidth), usize::from(dstHeight));
		let mut dst = Vec::with_capacity(dstWidth * dstHeight * 4);
		for y in 0..dstHeight {
			let srcY = y * srcHeight / dstHeight;
			for x in 0..dstWidth {
				let srcX = x * srcWidth / dstWidth;
				let i = (srcY * srcWidth + srcX) * 4;
				dst.extend_from_slice(&src[i..i + 4]);
			}
		}
		dst
	}
}

pub mod pack {
	use crate::{
		config::EncoderConfig, frame, index::IndexTable, quantize, source::FrameSource, Error,
		FRAMES_PER_ID,
	};

	/*
		Append-only log with an internal cursor; append() hands the caller the
		record's offset so nobody else ever computes one.
	*/
	#[derive(Default)]
	pub struct AssetPackWriter {
		bytes: Vec<u8>,
	}

	impl AssetPackWriter {
		#[must_use]
		pub fn new() -> Self {
			Self::default()
		}

		pub fn append(&mut self, record: &[u8]) -> u32 {
			let offset = self.bytes.len() as u32;
			self.bytes.extend_from_slice(record);
			offset
		}

		#[must_use]
		pub fn len(&self) -> usize {
			self.bytes.len()
		}

		#[must_use]
		pub fn is_empty(&self) -> bool {
			self.bytes.is_empty()
		}

		#[must_use]
		pub fn intoBytes(self) -> Vec<u8> {
			self.bytes
		}
	}

	fn encodeRecord<S: FrameSource>(
		source: &S,
		pose: usize,
		config: &EncoderConfig,
	) -> Result<Vec<u8>, Error> {
		let rgba = source.rgbaPose(pose)?;
		if rgba.len() != config.pixelCount() * 4 {
			return Err(Error::SourceDecode(format!(
				"pose {pose}: {} bytes, want {}",
				rgba.len(),
				config.pixelCount() * 4
			)));
		}
		let mut indices = Vec::with_capacity(config.pixelCount());
		for pixel in rgba.chunks_exact(4) {
			indices.push(quantize::quantize(pixel[0], pixel[1], pixel[2], pixel[3], config.bitDepth));
		}
		Ok(frame::encode(config.width, config.height, config.bitDepth, &indices))
	}

	fn encodeEntity<S: FrameSource>(
		source: &S,
		config: &EncoderConfig,
	) -> Result<[Vec<u8>; FRAMES_PER_ID], Error> {
		if source.poseCount() == 0 {
			return Err(Error::SourceDecode("no poses".to_owned()));
		}
		/* A source with a single pose just repeats it in the second slot. */
		let secondPose = config.secondFrameOffset.min(source.poseCount() - 1);
		Ok([encodeRecord(source, 0, config)?, encodeRecord(source, secondPose, config)?])
	}

	/*
		The write path. One bad source skips one entity (its entries stay at the
		zero sentinel) and the run keeps going; the pack and index always come
		out together, however much they accumulated.
	*/
	pub fn buildPack<S: FrameSource>(
		entities: impl IntoIterator<Item = (u32, Result<S, Error>)>,
		config: &EncoderConfig,
	) -> (Vec<u8>, IndexTable) {
		let (mut writer, mut table) = (AssetPackWriter::new(), IndexTable::forMaxId(config.maxId));
		for (id, source) in entities {
			if id > config.maxId {
				eprintln!("✗ Skipping id {id}: beyond maxId {}", config.maxId);
				continue;
			}
			let records = match source.and_then(|source| encodeEntity(&source, config)) {
				Ok(records) => records,
				Err(err) => {
					eprintln!("✗ Error processing id {id}: {err}");
					continue;
				}
			};
			for (slot, record) in records.iter().enumerate() {
				let offset = writer.append(record);
				// id and slot were both bounds-checked above
				table.set(id, slot as u32, offset, record.len() as u32).unwrap();
			}
		}
		(writer.intoBytes(), table)
	}
}

pub mod extract {
	use crate::{index::IndexTable, quantize, Error, FRAMES_PER_ID};

	pub fn fetch(pack: &[u8], offset: u32, length: u32) -> Result<&[u8], Error> {
		let (start, end) = (offset as usize, offset as usize + length as usize);
		if end > pack.len() {
			return Err(Error::AssetRange { offset, length, packLen: pack.len() });
		}
		Ok(&pack[start..end])
	}

	/*
		Every non-sentinel record, in entry order, for the bulk unpack tool. An
		out-of-range entry is logged and skipped so one corrupt entry doesn't
		abort the rest of the dump.
	*/
	#[must_use]
	pub fn dumpRecords<'a>(index: &IndexTable, pack: &'a [u8]) -> Vec<(u32, u32, &'a [u8])> {
		let mut records = Vec::new();
		for id in 0..index.idCount() as u32 {
			for slot in 0..FRAMES_PER_ID as u32 {
				let Ok((offset, length)) = index.get(id, slot) else { continue };
				if length == 0 {
					continue;
				}
				match fetch(pack, offset, length) {
					Ok(record) => records.push((id, slot, record)),
					Err(err) => eprintln!("✗ Skipping ID {id} f{slot}: {err}"),
				}
			}
		}
		records
	}

	/*
		Inspection palette for the extract tool: index 0 fully transparent, the
		opaque indices an even grey ramp up to white at the top index.
	*/
	#[must_use]
	pub fn greyPalette(bitDepth: u8) -> (Vec<u8>, Vec<u8>) {
		let maxIndex = usize::from(quantize::maxIndex(bitDepth));
		let (mut palette, mut trns) =
			(Vec::with_capacity((maxIndex + 1) * 3), Vec::with_capacity(maxIndex + 1));
		for k in 0..=maxIndex {
			let grey = ((k * 255 + maxIndex / 2) / maxIndex) as u8;
			palette.extend_from_slice(&[grey, grey, grey]);
			trns.push(if k == 0 { 0 } else { 255 });
		}
		(palette, trns)
	}
}

pub mod split {
	use crate::{extract, index::IndexTable, Error, FRAMES_PER_ID};

	pub struct Part {
		pub firstId: u32,
		pub lastId: u32,
		pub index: IndexTable,
		pub pack: Vec<u8>,
	}

	/*
		Contiguous equal id ranges (the last part may come up short). Every part
		gets an index of the same total size as the source, with offsets re-based
		to its own pack; ids outside the range and zero-length source entries
		stay at the sentinel, so each pair is valid alone under the same lookup
		contract as the full one.
	*/
	pub fn splitPack(index: &IndexTable, pack: &[u8], parts: usize) -> Result<Vec<Part>, Error> {
		let (parts, idCount) = (parts.max(1), index.idCount());
		let idsPerPart = (idCount + parts - 1) / parts;
		let mut out = Vec::with_capacity(parts);
		for p in 0..parts {
			let firstId = p * idsPerPart;
			let lastId = ((p + 1) * idsPerPart).min(idCount);
			let mut part = Part {
				firstId: firstId as u32,
				lastId: lastId.saturating_sub(1) as u32,
				index: IndexTable::fromBytes(vec![0; index.asBytes().len()]),
				pack: Vec::new(),
			};
			for id in firstId..lastId {
				let id = id as u32;
				for slot in 0..FRAMES_PER_ID as u32 {
					let (offset, length) = index.get(id, slot)?;
					if length == 0 {
						continue;
					}
					let record = extract::fetch(pack, offset, length)?;
					let rebased = part.pack.len() as u32;
					part.pack.extend_from_slice(record);
					part.index.set(id, slot, rebased, length)?;
				}
			}
			out.push(part);
		}
		Ok(out)
	}
}

pub mod validate {
	use crate::{bitpack, config::EncoderConfig, frame, index::IndexTable, FRAMES_PER_ID};

	pub struct EntryLine {
		pub id: u32,
		pub slot: u32,
		pub offset: u32,
		pub length: u32,
		pub header: [u8; 3],
		pub nonzeroPayload: usize,
	}

	pub struct Finding {
		pub id: u32,
		pub slot: u32,
		pub offset: u32,
		pub length: u32,
	}

	pub struct Report {
		pub entryCount: usize,
		pub lines: Vec<EntryLine>,
		pub findings: Vec<Finding>,
		pub headerCounts: Vec<([u8; 3], usize)>,
	}

	/*
		Two passes. The entry scan is the authoritative bound check; the header
		walk is a best-effort drift detector only, since it degrades to a
		byte-by-byte crawl as soon as a triple doesn't match the expected one.
	*/
	#[must_use]
	pub fn validate(
		index: &IndexTable,
		pack: &[u8],
		expected: &EncoderConfig,
		idSample: Option<usize>,
	) -> Report {
		let mut report = Report {
			entryCount: index.entryCount(),
			lines: Vec::new(),
			findings: Vec::new(),
			headerCounts: Vec::new(),
		};

		let idLimit = idSample.map_or(index.idCount(), |n| n.min(index.idCount()));
		for id in 0..idLimit as u32 {
			for slot in 0..FRAMES_PER_ID as u32 {
				let Ok((offset, length)) = index.get(id, slot) else { continue };
				if length == 0 {
					continue;
				}
				if offset as usize + length as usize > pack.len() {
					report.findings.push(Finding { id, slot, offset, length });
					continue;
				}
				let record = &pack[offset as usize..(offset as usize + length as usize)];
				let headerLen = record.len().min(frame::HEADER_LEN);
				let mut header = [0; frame::HEADER_LEN];
				header[..headerLen].copy_from_slice(&record[..headerLen]);
				let nonzeroPayload = record
					.get(frame::HEADER_LEN..)
					.map_or(0, |payload| payload.iter().filter(|&&byte| byte != 0).count());
				report.lines.push(EntryLine { id, slot, offset, length, header, nonzeroPayload });
			}
		}

		let expectedTriple = [expected.width, expected.height, expected.bitDepth];
		let jump = frame::HEADER_LEN + bitpack::packedLen(expected.pixelCount(), expected.bitDepth);
		let mut offset = 0;
		while offset + frame::HEADER_LEN <= pack.len() {
			let triple = [pack[offset], pack[offset + 1], pack[offset + 2]];
			match report.headerCounts.iter_mut().find(|(seen, _)| *seen == triple) {
				Some((_, count)) => *count += 1,
				None => report.headerCounts.push((triple, 1)),
			}
			offset += if triple == expectedTriple { jump } else { 1 };
		}

		report
	}
}

#[cfg(test)]
mod tests {
	use {
		super::{
			bitpack, config::EncoderConfig, extract, frame, index::IndexTable, pack, quantize,
			source::{self, FrameSource},
			split, validate, Error,
		},
		rand::{rngs::StdRng, Rng, SeedableRng},
	};

	fn testConfig() -> EncoderConfig {
		EncoderConfig { width: 2, height: 2, bitDepth: 4, secondFrameOffset: 4, maxId: 7 }
	}

	struct FakeSource {
		poses: Vec<Vec<u8>>,
	}

	impl FrameSource for FakeSource {
		fn poseCount(&self) -> usize {
			self.poses.len()
		}

		fn rgbaPose(&self, pose: usize) -> Result<Vec<u8>, Error> {
			self.poses
				.get(pose)
				.cloned()
				.ok_or_else(|| Error::SourceDecode(format!("pose {pose} out of range")))
		}
	}

	fn opaquePose(grey: u8, pixelCount: usize) -> Vec<u8> {
		[grey, grey, grey, 255].repeat(pixelCount)
	}

	#[test]
	fn quantize_transparent_is_zero_at_any_depth() {
		for bitDepth in [3, 4] {
			assert_eq!(quantize::quantize(0, 0, 0, 0, bitDepth), 0);
			assert_eq!(quantize::quantize(255, 255, 255, 127, bitDepth), 0);
		}
	}

	#[test]
	fn quantize_white_remaps_to_one() {
		assert_eq!(quantize::quantize(255, 255, 255, 255, 4), 1);
		assert_eq!(quantize::quantize(255, 255, 255, 128, 3), 1);
	}

	#[test]
	fn quantize_black_hits_top_index() {
		assert_eq!(quantize::quantize(0, 0, 0, 255, 4), 15);
		assert_eq!(quantize::quantize(0, 0, 0, 255, 3), 7);
	}

	#[test]
	fn quantize_opaque_never_emits_zero() {
		let mut rng = StdRng::seed_from_u64(7);
		for bitDepth in [3, 4] {
			for _ in 0..2000 {
				let index = quantize::quantize(
					rng.gen(),
					rng.gen(),
					rng.gen(),
					rng.gen_range(quantize::ALPHA_THRESHOLD..=255),
					bitDepth,
				);
				assert!((1..=quantize::maxIndex(bitDepth)).contains(&index));
			}
		}
	}

	#[test]
	fn pack_two_nibbles_into_one_byte() {
		assert_eq!(bitpack::pack(&[3, 10], 4), [0x3A]);
	}

	#[test]
	fn pack_splits_a_3bit_value_across_bytes() {
		// third value starts at bit offset 6: 0b10 ends byte 0, 0b1 opens byte 1
		assert_eq!(bitpack::pack(&[0, 0, 5], 3), [0b0000_0010, 0b1000_0000]);
	}

	#[test]
	fn packed_len_rounds_up() {
		assert_eq!(bitpack::packedLen(4096, 4), 2048);
		assert_eq!(bitpack::packedLen(3, 3), 2);
		assert_eq!(bitpack::packedLen(0, 3), 0);
	}

	#[test]
	fn pack_unpack_round_trips() {
		let mut rng = StdRng::seed_from_u64(42);
		for bitDepth in [3, 4] {
			for _ in 0..50 {
				let indices: Vec<u8> = (0..rng.gen_range(1..200))
					.map(|_| rng.gen_range(0..=quantize::maxIndex(bitDepth)))
					.collect();
				let packed = bitpack::pack(&indices, bitDepth);
				assert_eq!(packed.len(), bitpack::packedLen(indices.len(), bitDepth));
				assert_eq!(bitpack::unpack(&packed, indices.len(), bitDepth), indices);
			}
		}
	}

	#[test]
	fn frame_decode_uses_embedded_bit_depth() {
		let indices = [1, 5, 7, 2, 0, 3];
		let record = frame::encode(3, 2, 3, &indices);
		assert_eq!(record[..3], [3, 2, 3]);
		let (header, decoded) = frame::decode(&record).unwrap();
		assert_eq!((header.width, header.height, header.bitDepth), (3, 2, 3));
		assert_eq!(decoded, indices);
	}

	#[test]
	fn frame_decode_rejects_short_records() {
		assert!(matches!(
			frame::decode(&[2, 2]),
			Err(Error::TruncatedRecord { have: 2, need: 3 })
		));
		assert!(matches!(
			frame::decode(&[2, 2, 4, 0x11]),
			Err(Error::TruncatedRecord { have: 4, need: 5 })
		));
	}

	#[test]
	fn frame_decode_rejects_corrupt_bit_depth() {
		assert!(matches!(frame::decode(&[2, 2, 0, 0, 0]), Err(Error::CorruptHeader { .. })));
		assert!(matches!(frame::decode(&[2, 2, 9, 0, 0]), Err(Error::CorruptHeader { .. })));
	}

	#[test]
	fn index_entry_position_matches_layout() {
		let mut table = IndexTable::forMaxId(31);
		table.set(25, 0, 7, 9).unwrap();
		let bytes = table.asBytes();
		assert_eq!(bytes.len(), 32 * 2 * 8);
		assert_eq!(bytes[400..408], [7, 0, 0, 0, 9, 0, 0, 0]);
		assert_eq!(table.get(25, 0).unwrap(), (7, 9));
	}

	#[test]
	fn index_zero_length_is_the_sentinel() {
		let table = IndexTable::forMaxId(3);
		for id in 0..=3 {
			for slot in 0..2 {
				assert_eq!(table.get(id, slot).unwrap(), (0, 0));
			}
		}
	}

	#[test]
	fn index_rejects_out_of_range_lookups() {
		let table = IndexTable::forMaxId(1);
		assert!(matches!(table.get(2, 0), Err(Error::IndexRange { id: 2, slot: 0, .. })));
		assert!(matches!(table.get(0, 2), Err(Error::IndexRange { id: 0, slot: 2, .. })));
	}

	#[test]
	fn writer_appends_contiguously() {
		let mut writer = pack::AssetPackWriter::new();
		assert_eq!(writer.append(&[1, 2, 3]), 0);
		assert_eq!(writer.append(&[4, 5]), 3);
		assert_eq!(writer.len(), 5);
		assert_eq!(writer.intoBytes(), [1, 2, 3, 4, 5]);
	}

	#[test]
	fn builder_packs_both_slots_and_skips_bad_entities() {
		let config = testConfig();
		let good = FakeSource { poses: vec![opaquePose(255, 4), opaquePose(0, 4)] };
		let entities: Vec<(u32, Result<FakeSource, Error>)> = vec![
			(1, Ok(good)),
			(3, Err(Error::SourceDecode("corrupt gif".to_owned()))),
		];
		let (packBytes, table) = pack::buildPack(entities, &config);

		// slot 1 comes from pose min(4, 1) = 1
		let record = [2, 2, 4, 0x11, 0x11];
		let darkRecord = [2, 2, 4, 0xFF, 0xFF];
		assert_eq!(table.get(1, 0).unwrap(), (0, 5));
		assert_eq!(table.get(1, 1).unwrap(), (5, 5));
		assert_eq!(packBytes[..5], record);
		assert_eq!(packBytes[5..], darkRecord);

		// the skipped entity keeps its sentinel, and every live entry stays in bounds
		assert_eq!(table.get(3, 0).unwrap(), (0, 0));
		assert_eq!(table.get(3, 1).unwrap(), (0, 0));
		for id in 0..=config.maxId {
			for slot in 0..2 {
				let (offset, length) = table.get(id, slot).unwrap();
				assert!(offset as usize + length as usize <= packBytes.len());
			}
		}
	}

	#[test]
	fn builder_repeats_a_single_pose() {
		let config = testConfig();
		let single = FakeSource { poses: vec![opaquePose(255, 4)] };
		let (packBytes, table) = pack::buildPack(vec![(0, Ok(single))], &config);
		let (offset0, length0) = table.get(0, 0).unwrap();
		let (offset1, length1) = table.get(0, 1).unwrap();
		assert_eq!(
			packBytes[offset0 as usize..(offset0 + length0) as usize],
			packBytes[offset1 as usize..(offset1 + length1) as usize]
		);
	}

	#[test]
	fn builder_ignores_ids_beyond_max() {
		let config = testConfig();
		let source = FakeSource { poses: vec![opaquePose(255, 4)] };
		let (packBytes, _) = pack::buildPack(vec![(8, Ok(source))], &config);
		assert!(packBytes.is_empty());
	}

	#[test]
	fn fetch_checks_pack_bounds() {
		let pack = vec![0_u8; 120];
		assert!(matches!(
			extract::fetch(&pack, 100, 50),
			Err(Error::AssetRange { offset: 100, length: 50, packLen: 120 })
		));
		assert_eq!(extract::fetch(&pack, 100, 20).unwrap().len(), 20);
	}

	#[test]
	fn dump_derives_ids_and_skips_out_of_range_entries() {
		let mut table = IndexTable::forMaxId(2);
		table.set(0, 0, 0, 4).unwrap();
		table.set(1, 1, 100, 50).unwrap();
		table.set(2, 0, 4, 3).unwrap();
		let pack = [9, 9, 9, 9, 8, 8, 8];

		// sentinels and the out-of-range entry drop out; ids come from the entries themselves
		let records = extract::dumpRecords(&table, &pack);
		assert_eq!(records.len(), 2);
		assert_eq!(records[0], (0, 0, &pack[..4]));
		assert_eq!(records[1], (2, 0, &pack[4..]));
	}

	#[test]
	fn grey_palette_ramps_with_transparent_zero() {
		let (palette, trns) = extract::greyPalette(4);
		assert_eq!(palette.len(), 16 * 3);
		assert_eq!(trns.len(), 16);
		assert_eq!(trns[0], 0);
		assert_eq!(&palette[3..6], &[17, 17, 17]);
		assert_eq!(&palette[45..48], &[255, 255, 255]);
		assert!(trns[1..].iter().all(|&alpha| alpha == 255));
	}

	#[test]
	fn resize_nearest_identity_and_downsample() {
		#[rustfmt::skip]
		let src = [
			1, 1, 1, 255,  2, 2, 2, 255,
			3, 3, 3, 255,  4, 4, 4, 255,
		];
		assert_eq!(source::resizeNearest(&src, 2, 2, 2, 2), src);
		assert_eq!(source::resizeNearest(&src, 2, 2, 1, 1), [1, 1, 1, 255]);
	}

	fn builtPair() -> (Vec<u8>, IndexTable, EncoderConfig) {
		let config = EncoderConfig { maxId: 5, ..testConfig() };
		let entities: Vec<(u32, Result<FakeSource, Error>)> = [0, 2, 5]
			.into_iter()
			.map(|id| {
				(id, Ok(FakeSource { poses: vec![opaquePose(id as u8 * 40, 4), opaquePose(200, 4)] }))
			})
			.collect();
		let (packBytes, table) = pack::buildPack(entities, &config);
		(packBytes, table, config)
	}

	#[test]
	fn split_conserves_every_non_sentinel_byte() {
		let (packBytes, table, _) = builtPair();
		let parts = split::splitPack(&table, &packBytes, 2).unwrap();
		assert_eq!(parts.len(), 2);

		let sourceTotal: u32 = (0..table.idCount() as u32)
			.flat_map(|id| (0..2).map(move |slot| (id, slot)))
			.map(|(id, slot)| table.get(id, slot).unwrap().1)
			.sum();
		let partTotal: u32 = parts
			.iter()
			.flat_map(|part| {
				(0..part.index.idCount() as u32)
					.flat_map(move |id| (0..2).map(move |slot| part.index.get(id, slot).unwrap().1))
			})
			.sum();
		assert_eq!(partTotal, sourceTotal);
		assert_eq!(parts.iter().map(|part| part.pack.len()).sum::<usize>(), packBytes.len());
	}

	#[test]
	fn split_rebases_offsets_per_part() {
		let (packBytes, table, _) = builtPair();
		let parts = split::splitPack(&table, &packBytes, 2).unwrap();

		// ids 0..=2 land in part 0, ids 3..=5 in part 1; indexes keep full size
		assert_eq!((parts[0].firstId, parts[0].lastId), (0, 2));
		assert_eq!((parts[1].firstId, parts[1].lastId), (3, 5));
		for part in &parts {
			assert_eq!(part.index.asBytes().len(), table.asBytes().len());
		}
		assert_eq!(parts[1].index.get(5, 0).unwrap().0, 0);
		assert_eq!(parts[1].index.get(0, 0).unwrap(), (0, 0));

		// a re-based entry decodes to the same record as the source pack
		let (offset, length) = parts[1].index.get(5, 1).unwrap();
		let partRecord = extract::fetch(&parts[1].pack, offset, length).unwrap();
		let (sourceOffset, sourceLength) = table.get(5, 1).unwrap();
		assert_eq!(partRecord, extract::fetch(&packBytes, sourceOffset, sourceLength).unwrap());
	}

	#[test]
	fn validator_flags_out_of_range_entries() {
		let mut table = IndexTable::forMaxId(0);
		table.set(0, 0, 100, 50).unwrap();
		let report = validate::validate(&table, &vec![0_u8; 120], &testConfig(), None);
		assert_eq!(report.findings.len(), 1);
		let finding = &report.findings[0];
		assert_eq!((finding.id, finding.slot, finding.offset, finding.length), (0, 0, 100, 50));
		assert!(report.lines.is_empty());
	}

	#[test]
	fn validator_tallies_headers_and_payloads() {
		let (packBytes, table, config) = builtPair();
		let report = validate::validate(&table, &packBytes, &config, Some(50));
		assert!(report.findings.is_empty());
		assert_eq!(report.entryCount, table.entryCount());
		assert_eq!(report.lines.len(), 6);
		// every record opens with the one configured triple, so the walk never drifts
		assert_eq!(report.headerCounts, [([2, 2, 4], 6)]);
		// id 0 slot 0 is the all-dark pose: both payload bytes are nonzero
		assert_eq!(report.lines[0].nonzeroPayload, 2);
	}

	#[test]
	fn validator_walks_byte_by_byte_past_junk() {
		let junkThenRecord = [[9].as_slice(), &[2, 2, 4, 0xAA, 0xBB]].concat();
		let report =
			validate::validate(&IndexTable::forMaxId(0), &junkThenRecord, &testConfig(), None);
		assert_eq!(report.headerCounts, [([9, 2, 2], 1), ([2, 2, 4], 1)]);
	}

	#[test]
	fn config_defaults_match_the_shipped_format() {
		let config = EncoderConfig::default();
		assert_eq!(
			(config.width, config.height, config.bitDepth, config.secondFrameOffset, config.maxId),
			(64, 64, 4, 4, 1023)
		);
		assert_eq!(config.pixelCount(), 4096);
	}

	#[test]
	fn config_partial_toml_fills_defaults() {
		let config = EncoderConfig::fromToml("bitDepth = 3\nmaxId = 99\n").unwrap();
		assert_eq!((config.bitDepth, config.maxId, config.width), (3, 99, 64));
	}

	#[test]
	fn config_rejects_unusable_values() {
		assert!(matches!(EncoderConfig::fromToml("bitDepth = 9"), Err(Error::Config(_))));
		assert!(matches!(EncoderConfig::fromToml("width = 0"), Err(Error::Config(_))));
		assert!(matches!(EncoderConfig::fromToml("width = \"wide\""), Err(Error::Config(_))));
	}

	#[test]
	fn exit_codes_distinguish_missing_from_range() {
		let missing = Error::MissingArtifact { path: "x".to_owned(), reason: "gone".to_owned() };
		let range = Error::AssetRange { offset: 1, length: 2, packLen: 0 };
		assert_eq!(missing.exitCode(), 1);
		assert_eq!(range.exitCode(), 2);
	}
}
