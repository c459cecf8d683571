// Ogg decoder and encoder written in Rust
//
// Copyright (c) 2016-2017 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Redistribution or use only under the terms
// specified in the LICENSE file attached to this
// source distribution.

/*!
The Opus comment header

The header consists of the `OpusTags` magic, a length prefixed vendor
string and a counted list of length prefixed `key=value` entries, all
lengths being 32 bit little endian. Whatever follows that structure is
kept as opaque trailer, so data appended by other tools survives edits.
*/

use std::io::{Cursor, Read};
use byteorder::{ReadBytesExt, WriteBytesExt, LittleEndian};
use crate::error::{OggError, Result};

/// Magic the comment header packet starts with.
pub const OPUS_TAGS :&[u8; 8] = b"OpusTags";

/// A parsed comment header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommentHeader {
	/// Name of the software that wrote the stream
	pub vendor :String,
	/// The `key=value` entries, in file order
	pub entries :Vec<(String, String)>,
	/// Bytes following the entries
	pub trailer :Vec<u8>,
}

impl CommentHeader {
	/// Parses a complete comment header packet, magic included.
	pub fn parse(packet :&[u8]) -> Result<CommentHeader> {
		let mut rdr = CommentReader::new(packet)?;
		let vendor = String::from_utf8_lossy(rdr.read_string()?).into_owned();
		let count = rdr.read_u32()?;
		let mut entries = Vec::new();
		for _ in 0 .. count {
			let entry = String::from_utf8_lossy(rdr.read_string()?).into_owned();
			match entry.find('=') {
				Some(idx) => entries.push((entry[.. idx].to_owned(), entry[idx + 1 ..].to_owned())),
				None => return Err(OggError::format(format!(
					"comment entry {:?} has no '='", entry))),
			}
		}
		Ok(CommentHeader {
			vendor,
			entries,
			trailer : packet[rdr.position() ..].to_vec(),
		})
	}

	/// Serializes the header into a packet, trailer included.
	pub fn to_packet(&self) -> Vec<u8> {
		let mut packet = write_structure(&self.vendor, &self.entries);
		packet.extend_from_slice(&self.trailer);
		packet
	}

	/// Returns `true` if the trailer holds data that has to be kept,
	/// and `false` if it is padding that may be resized or dropped.
	///
	/// By convention, preserved data starts with a byte whose least
	/// significant bit is set, while padding is zeros.
	pub fn trailer_is_extension(&self) -> bool {
		self.trailer.first().map_or(false, |b| b & 1 != 0)
	}
}

/**
Rewrites a comment header packet with a new vendor string and new entries.

The old packet is only parsed far enough to find the end of its vendor and
entry list; everything after that is copied verbatim behind the new entries.
*/
pub fn rewrite_comment<K, V>(old_packet :&[u8], vendor :&str, entries :&[(K, V)])
		-> Result<Vec<u8>>
		where K :AsRef<str>, V :AsRef<str> {
	let structure_end = structure_len(old_packet)?;
	let mut packet = write_structure(vendor, entries);
	packet.extend_from_slice(&old_packet[structure_end ..]);
	Ok(packet)
}

/**
Like `rewrite_comment`, but keeps the packet size where possible.

A trailer that is padding (see `CommentHeader::trailer_is_extension`) is
resized so the new packet is as long as the old one, or dropped if the new
entries need more room than that. An empty or extension trailer is copied
verbatim.
*/
pub fn rewrite_comment_padded<K, V>(old_packet :&[u8], vendor :&str, entries :&[(K, V)])
		-> Result<Vec<u8>>
		where K :AsRef<str>, V :AsRef<str> {
	let structure_end = structure_len(old_packet)?;
	let trailer = &old_packet[structure_end ..];
	let mut packet = write_structure(vendor, entries);
	if trailer.first().map_or(true, |b| b & 1 != 0) {
		packet.extend_from_slice(trailer);
	} else {
		let size = packet.len().max(old_packet.len());
		packet.resize(size, 0);
	}
	Ok(packet)
}

/// Returns the length of the magic, vendor and entry list of the packet.
pub fn structure_len(packet :&[u8]) -> Result<usize> {
	let mut rdr = CommentReader::new(packet)?;
	rdr.read_string()?;
	let count = rdr.read_u32()?;
	for _ in 0 .. count {
		rdr.read_string()?;
	}
	Ok(rdr.position())
}

fn write_structure<K, V>(vendor :&str, entries :&[(K, V)]) -> Vec<u8>
		where K :AsRef<str>, V :AsRef<str> {
	let mut packet = Vec::new();
	packet.extend_from_slice(OPUS_TAGS);
	write_string(&mut packet, vendor.as_bytes());
	write_len(&mut packet, entries.len());
	for (key, value) in entries {
		let (key, value) = (key.as_ref(), value.as_ref());
		write_len(&mut packet, key.len() + 1 + value.len());
		packet.extend_from_slice(key.as_bytes());
		packet.push(b'=');
		packet.extend_from_slice(value.as_bytes());
	}
	packet
}

fn write_len(packet :&mut Vec<u8>, len :usize) {
	// Writing into a Vec can't fail
	let _ = packet.write_u32::<LittleEndian>(len as u32);
}

fn write_string(packet :&mut Vec<u8>, s :&[u8]) {
	write_len(packet, s.len());
	packet.extend_from_slice(s);
}

/// Bounds checked reading of the length prefixed fields.
struct CommentReader<'a> {
	rdr :Cursor<&'a [u8]>,
}

impl<'a> CommentReader<'a> {
	fn new(packet :&'a [u8]) -> Result<Self> {
		let mut rdr = Cursor::new(packet);
		let mut magic = [0; 8];
		if rdr.read_exact(&mut magic).is_err() || &magic != OPUS_TAGS {
			return Err(OggError::format("comment header doesn't start with OpusTags"));
		}
		Ok(CommentReader { rdr })
	}

	fn position(&self) -> usize {
		self.rdr.position() as usize
	}

	fn read_u32(&mut self) -> Result<u32> {
		self.rdr.read_u32::<LittleEndian>()
			.map_err(|_| OggError::format("truncated comment header"))
	}

	fn read_string(&mut self) -> Result<&'a [u8]> {
		let len = self.read_u32()? as usize;
		let start = self.position();
		let data :&'a [u8] = *self.rdr.get_ref();
		if data.len() - start < len {
			return Err(OggError::format(format!(
				"comment string of {} bytes exceeds the packet", len)));
		}
		self.rdr.set_position((start + len) as u64);
		Ok(&data[start .. start + len])
	}
}
