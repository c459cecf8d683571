// Ogg decoder and encoder written in Rust
//
// Copyright (c) 2016-2017 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Redistribution or use only under the terms
// specified in the LICENSE file attached to this
// source distribution.

/*!
Opus streams inside Ogg

The first packet of an Opus logical bitstream is the identification
header, the second one the comment header. Granule positions count
samples at 48 kHz, whatever the sample rate of the original input was.
*/

use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use byteorder::{ReadBytesExt, LittleEndian};
use log::debug;
use crate::comment::{self, CommentHeader};
use crate::config::{EditOptions, ParseOptions};
use crate::editing::{self, SetLen};
use crate::error::{OggError, Result};
use crate::page::Page;
use crate::reading::{self, PageReader};
use crate::writing::packets_to_pages_like;

/// Magic the identification header packet starts with.
pub const OPUS_HEAD :&[u8; 8] = b"OpusHead";
/// Size of the identification header without channel mapping table.
pub const ID_HEADER_SIZE :usize = 19;
/// Rate of the clock granule positions are expressed in.
pub const GRANULE_RATE :u32 = 48_000;
/// Mime types of Ogg Opus files.
pub const MIMES :&[&str] = &["audio/ogg", "audio/ogg; codecs=opus"];

/// Channel mapping table, present for mapping families other than 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelMapping {
	/// Number of Opus streams in each packet
	pub stream_count :u8,
	/// Number of those streams that are coupled (stereo)
	pub coupled_count :u8,
	/// Output channel to decoded channel mapping, one byte per channel
	pub mapping :Vec<u8>,
}

/// The Opus identification header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpusHeader {
	/// Raw version byte. The high nibble is the major version.
	pub version :u8,
	/// Number of output channels
	pub channels :u8,
	/// Samples (at 48 kHz) to discard from the decoder output at the start
	pub pre_skip :u16,
	/// Sample rate of the original input. Informational only.
	pub input_sample_rate :u32,
	/// Output gain in Q7.8 dB
	pub output_gain :i16,
	/// Channel mapping family
	pub mapping_family :u8,
	/// Channel mapping table, `None` for family 0
	pub mapping :Option<ChannelMapping>,
}

impl OpusHeader {
	/// Parses the identification header packet.
	///
	/// Only the major version (high nibble of the version byte) has to be
	/// zero, minor version bumps are backwards compatible.
	pub fn parse(packet :&[u8]) -> Result<OpusHeader> {
		if packet.len() < ID_HEADER_SIZE || &packet[.. 8] != OPUS_HEAD {
			return Err(OggError::format("not an Opus identification header"));
		}
		let mut rdr = Cursor::new(&packet[8 ..]);
		let version = rdr.read_u8()?;
		if version >> 4 != 0 {
			return Err(OggError::UnsupportedVersion(version));
		}
		let channels = rdr.read_u8()?;
		if channels == 0 {
			return Err(OggError::format("Opus stream with zero channels"));
		}
		let pre_skip = rdr.read_u16::<LittleEndian>()?;
		let input_sample_rate = rdr.read_u32::<LittleEndian>()?;
		let output_gain = rdr.read_i16::<LittleEndian>()?;
		let mapping_family = rdr.read_u8()?;

		let mapping = if mapping_family != 0 {
			if packet.len() < ID_HEADER_SIZE + 2 + channels as usize {
				return Err(OggError::format("truncated channel mapping table"));
			}
			let stream_count = rdr.read_u8()?;
			let coupled_count = rdr.read_u8()?;
			let mut mapping = vec![0; channels as usize];
			rdr.read_exact(&mut mapping)?;
			Some(ChannelMapping { stream_count, coupled_count, mapping })
		} else {
			None
		};
		debug!("Opus header: version {}, {} channel(s), pre-skip {}, family {}",
			version, channels, pre_skip, mapping_family);

		Ok(OpusHeader {
			version,
			channels,
			pre_skip,
			input_sample_rate,
			output_gain,
			mapping_family,
			mapping,
		})
	}

	/// Returns the major version, the high nibble of the version byte
	pub fn major_version(&self) -> u8 {
		self.version >> 4
	}

	/// Returns the output gain in dB
	pub fn output_gain_db(&self) -> f64 {
		self.output_gain as f64 / 256.0
	}
}

/// Computes the duration in seconds of a stream whose last page
/// has the granule position `last_granule`.
///
/// Streams shorter than their pre-skip have a duration of zero.
pub fn compute_duration(last_granule :i64, pre_skip :u16) -> f64 {
	let samples = last_granule.saturating_sub(pre_skip as i64).max(0);
	samples as f64 / GRANULE_RATE as f64
}

/// Stream information of an Ogg Opus file.
#[derive(Clone, Debug, PartialEq)]
pub struct OpusInfo {
	/// Serial of the Opus logical bitstream
	pub serial :u32,
	/// The identification header
	pub header :OpusHeader,
	/// Duration in seconds
	pub length :f64,
	/// Average bitrate in bits per second, if the duration is non zero
	pub bitrate :Option<u32>,
}

impl OpusInfo {
	/// Reads the stream information of the first Opus logical bitstream.
	///
	/// Only the identification header and the last page of the bitstream
	/// are looked at. The bitrate counts all bytes following the
	/// identification header page.
	pub fn read<T :Read + Seek>(rdr :&mut T) -> Result<OpusInfo> {
		rdr.seek(SeekFrom::Start(0))?;
		let id = IdPage::read(&mut PageReader::new(&mut *rdr))?;
		id.info(rdr, id.end)
	}

	/// Returns the number of output channels
	pub fn channels(&self) -> u8 {
		self.header.channels
	}
}

/// The identification header page of an Opus logical bitstream.
struct IdPage {
	header :OpusHeader,
	serial :u32,
	/// Offset right after the page
	end :u64,
}

impl IdPage {
	fn read<T :Read + Seek>(pages :&mut PageReader<T>) -> Result<IdPage> {
		// Other logical bitstreams may start before the Opus one
		let id_page = loop {
			match pages.read_page()? {
				Some(pg) => if pg.packets.first().map_or(false, |p| p.starts_with(OPUS_HEAD)) {
					break pg;
				},
				None => return Err(OggError::format("no Opus stream found")),
			}
		};
		if !id_page.first {
			return Err(OggError::format(
				"page has an Opus identification header, but doesn't start a stream"));
		}
		if !id_page.complete && id_page.packets.len() == 1 {
			return Err(OggError::format("Opus identification header spans pages"));
		}
		Ok(IdPage {
			header : OpusHeader::parse(&id_page.packets[0])?,
			serial : id_page.serial,
			end : id_page.offset.unwrap_or(0) + id_page.size() as u64,
		})
	}

	/// Stream information, with audio data assumed to start at `audio_start`.
	fn info<T :Read + Seek>(&self, rdr :&mut T, audio_start :u64) -> Result<OpusInfo> {
		let last = match reading::find_last(rdr, self.serial, true)? {
			Some(pg) => pg,
			None => return Err(OggError::format("unable to find the last Opus page")),
		};
		let length = compute_duration(last.position, self.header.pre_skip);
		let file_len = rdr.seek(SeekFrom::End(0))?;
		let audio_bytes = file_len.saturating_sub(audio_start);
		let bitrate = if length > 0.0 {
			Some((audio_bytes as f64 * 8.0 / length).round() as u32)
		} else {
			None
		};
		Ok(OpusInfo {
			serial : self.serial,
			header : self.header.clone(),
			length,
			bitrate,
		})
	}
}

/// The header pages of an Opus logical bitstream, as found in a file.
struct Headers {
	id :IdPage,
	/// The pages holding the comment header
	comment_pages :Vec<Page>,
	/// All packets of `comment_pages`, the comment header first
	comment_pages_packets :Vec<Vec<u8>>,
}

impl Headers {
	fn read<T :Read + Seek>(rdr :&mut T) -> Result<Headers> {
		rdr.seek(SeekFrom::Start(0))?;
		let mut pages = PageReader::new(&mut *rdr);
		let id = IdPage::read(&mut pages)?;

		let mut comment_pages = Vec::new();
		loop {
			let pg = match pages.read_page()? {
				Some(pg) => pg,
				None => return Err(OggError::format("missing Opus comment header")),
			};
			if pg.serial != id.serial {
				continue;
			}
			let done = pg.complete || pg.packets.len() > 1;
			comment_pages.push(pg);
			if done {
				break;
			}
		}
		let comment_pages_packets = reading::pages_to_packets(&comment_pages,
			&ParseOptions::default())?;
		if comment_pages_packets.is_empty() {
			return Err(OggError::format("missing Opus comment header"));
		}
		Ok(Headers { id, comment_pages, comment_pages_packets })
	}

	fn comment_packet(&self) -> &[u8] {
		&self.comment_pages_packets[0]
	}

	fn comment_end(&self) -> u64 {
		self.comment_pages.last()
			.map_or(self.id.end, |pg| pg.offset.unwrap_or(0) + pg.size() as u64)
	}

	fn info<T :Read + Seek>(&self, rdr :&mut T) -> Result<OpusInfo> {
		self.id.info(rdr, self.comment_end())
	}

	/// Replaces the comment header inside the file
	fn save<F>(&self, file :&mut F, comment_packet :&[u8], opts :&EditOptions)
			-> Result<()>
			where F :Read + Write + Seek + SetLen {
		comment::structure_len(comment_packet)?;
		let mut packets = self.comment_pages_packets.clone();
		packets[0] = comment_packet.to_vec();
		let new_pages = packets_to_pages_like(&packets, &self.comment_pages)?;
		editing::replace(file, &self.comment_pages, &new_pages, opts)
	}
}

/// An Ogg Opus file: its stream information and comment header.
#[derive(Clone, Debug)]
pub struct OpusFile {
	/// Stream information
	pub info :OpusInfo,
	/// The parsed comment header
	pub comment :CommentHeader,
	comment_packet :Vec<u8>,
}

impl OpusFile {
	/// Reads stream information and comment header of the first
	/// Opus logical bitstream.
	pub fn read<T :Read + Seek>(rdr :&mut T) -> Result<OpusFile> {
		let headers = Headers::read(rdr)?;
		let comment = CommentHeader::parse(headers.comment_packet())?;
		let info = headers.info(rdr)?;
		Ok(OpusFile {
			info,
			comment,
			comment_packet : headers.comment_packet().to_vec(),
		})
	}

	/// Returns the raw comment header packet, as read.
	pub fn comment_packet(&self) -> &[u8] {
		&self.comment_packet
	}

	/// Writes a fully serialized comment header packet into the file,
	/// replacing the old one.
	///
	/// Audio pages are only moved, never rewritten; see `editing::replace`.
	pub fn save<F>(file :&mut F, comment_packet :&[u8], opts :&EditOptions) -> Result<()>
			where F :Read + Write + Seek + SetLen {
		Headers::read(file)?.save(file, comment_packet, opts)
	}

	/// Removes all comment entries from the file.
	///
	/// The vendor string and extension data following the entries are kept.
	/// Zero padding grows by the size of the removed entries, so the audio
	/// pages stay where they are.
	pub fn delete<F>(file :&mut F, opts :&EditOptions) -> Result<()>
			where F :Read + Write + Seek + SetLen {
		let headers = Headers::read(file)?;
		let old = CommentHeader::parse(headers.comment_packet())?;
		let no_entries :&[(&str, &str)] = &[];
		let packet = comment::rewrite_comment_padded(headers.comment_packet(), &old.vendor,
			no_entries)?;
		headers.save(file, &packet, opts)
	}
}
