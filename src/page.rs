// Ogg decoder and encoder written in Rust
//
// Copyright (c) 2016-2017 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Redistribution or use only under the terms
// specified in the LICENSE file attached to this
// source distribution.

/*!
Framing and deframing of single Ogg pages
*/

use std::io::{Cursor, Read};
use byteorder::{ReadBytesExt, WriteBytesExt, LittleEndian};
use crate::crc::vorbis_crc32_update;
use crate::error::{OggError, Result};

/// The capture pattern every page starts with.
pub const CAPTURE_PATTERN :&[u8; 4] = b"OggS";
/// Size of the fixed part of the page header, up to and
/// including the segment count.
pub const HEADER_SIZE :usize = 27;
/// Maximum number of entries in the segment table.
pub const MAX_SEGMENTS :usize = 255;
/// Maximum amount of packet data a single page can carry.
pub const MAX_BODY_SIZE :usize = MAX_SEGMENTS * 255;

pub(crate) const FLAG_CONTINUED :u8 = 0x01;
pub(crate) const FLAG_FIRST :u8 = 0x02;
pub(crate) const FLAG_LAST :u8 = 0x04;

pub(crate) const SEQUENCE_OFFS :usize = 18;
pub(crate) const CHECKSUM_OFFS :usize = 22;

/**
Ogg page representation.

A page is the smallest unit the container frames and checksums.
It carries fragments of one or more packets of a single logical
bitstream, identified by `serial`.

The segment table is not stored, but derived from `packets` and
`complete`: every packet takes `len / 255` segments of 255 bytes
and one terminating segment of `len % 255` bytes, except for a
trailing packet that is continued on the next page, which has no
terminating segment.
*/
#[derive(Clone, Debug)]
pub struct Page {
	/// `true` if the first packet fragment continues a packet
	/// from the page before.
	pub continued :bool,
	/// `true` if this page is the first one in the logical bitstream
	pub first :bool,
	/// `true` if this page is the last one in the logical bitstream
	pub last :bool,
	/// Absolute granule position. The codec defines further meaning.
	/// -1 means that no packet finishes on this page.
	pub position :i64,
	/// Serial number. Uniquely identifying the logical bitstream.
	pub serial :u32,
	/// Page counter inside the logical bitstream
	pub sequence :u32,
	/// The packet fragments contained in this page
	pub packets :Vec<Vec<u8>>,
	/// `false` if the last packet is continued in the next page
	pub complete :bool,
	/// Offset inside the physical stream the page was read from,
	/// `None` for pages that were constructed in memory.
	pub offset :Option<u64>,
}

impl Default for Page {
	fn default() -> Self {
		Page {
			continued : false,
			first : false,
			last : false,
			position : 0,
			serial : 0,
			sequence : 0,
			packets : Vec::new(),
			complete : true,
			offset : None,
		}
	}
}

// The offset is where the page came from, not part of it.
impl PartialEq for Page {
	fn eq(&self, other :&Page) -> bool {
		self.continued == other.continued
			&& self.first == other.first
			&& self.last == other.last
			&& self.position == other.position
			&& self.serial == other.serial
			&& self.sequence == other.sequence
			&& self.complete == other.complete
			&& self.packets == other.packets
	}
}

impl Eq for Page {}

impl Page {
	/// Returns the header type flag byte
	pub fn flags(&self) -> u8 {
		let mut flags = 0;
		if self.continued { flags |= FLAG_CONTINUED; }
		if self.first { flags |= FLAG_FIRST; }
		if self.last { flags |= FLAG_LAST; }
		flags
	}

	/// Returns the segment table that describes the packets of this page.
	pub fn lacing(&self) -> Vec<u8> {
		let mut lacing = Vec::with_capacity(self.packets.len());
		for pck in self.packets.iter() {
			lacing.extend(std::iter::repeat(255).take(pck.len() / 255));
			lacing.push((pck.len() % 255) as u8);
		}
		if !self.complete && lacing.last() == Some(&0) {
			lacing.pop();
		}
		lacing
	}

	/// Returns the total size of the packet data.
	pub fn body_size(&self) -> usize {
		self.packets.iter().map(|p| p.len()).sum()
	}

	/// Returns the size of the serialized page in bytes.
	pub fn size(&self) -> usize {
		HEADER_SIZE + self.lacing().len() + self.body_size()
	}

	/// Serializes the page, computing its segment table and checksum.
	///
	/// Fails if the packets need more than 255 segments, or if the
	/// page is marked incomplete but its last packet can't end
	/// with a segment of 255 bytes.
	pub fn encode(&self) -> Result<Vec<u8>> {
		if !self.complete {
			match self.packets.last() {
				Some(pck) if !pck.is_empty() && pck.len() % 255 == 0 => (),
				_ => return Err(OggError::format(
					"incomplete page must end with a continued packet")),
			}
		}
		let lacing = self.lacing();
		if lacing.len() > MAX_SEGMENTS {
			return Err(OggError::format(format!(
				"{} segments don't fit into one page", lacing.len())));
		}

		let mut data = Vec::with_capacity(HEADER_SIZE + lacing.len() + self.body_size());
		data.extend_from_slice(CAPTURE_PATTERN);
		// Ogg format version, always zero.
		data.push(0);
		data.push(self.flags());
		data.write_i64::<LittleEndian>(self.position)?;
		data.write_u32::<LittleEndian>(self.serial)?;
		data.write_u32::<LittleEndian>(self.sequence)?;
		// checksum, calculated later on
		data.write_u32::<LittleEndian>(0)?;
		data.push(lacing.len() as u8);
		data.extend_from_slice(&lacing);
		for pck in self.packets.iter() {
			data.extend_from_slice(pck);
		}

		let hash_calculated = vorbis_crc32_update(0, &data);
		data[CHECKSUM_OFFS .. CHECKSUM_OFFS + 4]
			.copy_from_slice(&hash_calculated.to_le_bytes());
		Ok(data)
	}

	/// Parses the page at the start of `bytes`.
	///
	/// Data following the page is ignored, use `size` to find
	/// out where the page ended.
	pub fn decode(bytes :&[u8]) -> Result<Page> {
		if bytes.len() < HEADER_SIZE {
			return Err(OggError::format("truncated page header"));
		}
		let mut header_buf = [0; HEADER_SIZE];
		header_buf.copy_from_slice(&bytes[.. HEADER_SIZE]);
		let segments = check_header(&header_buf)?;

		let lacing_end = HEADER_SIZE + segments;
		if bytes.len() < lacing_end {
			return Err(OggError::format("truncated segment table"));
		}
		let lacing = &bytes[HEADER_SIZE .. lacing_end];
		let body_end = lacing_end + body_size(lacing);
		if bytes.len() < body_end {
			return Err(OggError::format("truncated page body"));
		}
		from_parts(header_buf, lacing, &bytes[lacing_end .. body_end])
	}

	/// Reads a page from the current position of the reader.
	///
	/// Unlike the `PageReader` this doesn't search for the capture
	/// pattern, the page has to start right at the current position.
	pub fn read<R :Read>(rdr :&mut R) -> Result<Page> {
		let mut header_buf = [0; HEADER_SIZE];
		rdr.read_exact(&mut header_buf)?;
		let segments = check_header(&header_buf)?;

		let mut lacing = vec![0; segments];
		rdr.read_exact(&mut lacing)?;
		let mut body = vec![0; body_size(&lacing)];
		rdr.read_exact(&mut body)?;
		from_parts(header_buf, &lacing, &body)
	}
}

/// Sum of the segment table
pub(crate) fn body_size(lacing :&[u8]) -> usize {
	lacing.iter().map(|&v| v as usize).sum()
}

/// Validates capture pattern and stream structure version,
/// and returns the number of segments.
pub(crate) fn check_header(header_buf :&[u8; HEADER_SIZE]) -> Result<usize> {
	if &header_buf[0 .. 4] != CAPTURE_PATTERN {
		return Err(OggError::format("no Ogg capture pattern found"));
	}
	if header_buf[4] != 0 {
		return Err(OggError::format(format!(
			"non zero stream structure version {}", header_buf[4])));
	}
	Ok(header_buf[HEADER_SIZE - 1] as usize)
}

fn from_parts(mut header_buf :[u8; HEADER_SIZE], lacing :&[u8], body :&[u8])
		-> Result<Page> {
	let mut header_rdr = Cursor::new(&header_buf[..]);
	header_rdr.set_position(5);
	let header_type_flag = header_rdr.read_u8()?;
	let position = header_rdr.read_i64::<LittleEndian>()?;
	let serial = header_rdr.read_u32::<LittleEndian>()?;
	let sequence = header_rdr.read_u32::<LittleEndian>()?;
	let checksum = header_rdr.read_u32::<LittleEndian>()?;

	// The checksum is calculated with the checksum field zeroed
	header_buf[CHECKSUM_OFFS .. CHECKSUM_OFFS + 4].copy_from_slice(&[0; 4]);
	let mut hash_calculated = vorbis_crc32_update(0, &header_buf);
	hash_calculated = vorbis_crc32_update(hash_calculated, lacing);
	hash_calculated = vorbis_crc32_update(hash_calculated, body);
	if checksum != hash_calculated {
		return Err(OggError::Checksum {
			expected : checksum,
			calculated : hash_calculated,
		});
	}

	// Split the body along the lacing values
	let mut packets = Vec::new();
	let mut offs = 0;
	let mut cur_packet_siz = 0;
	for &val in lacing {
		cur_packet_siz += val as usize;
		if val < 255 {
			packets.push(body[offs .. offs + cur_packet_siz].to_vec());
			offs += cur_packet_siz;
			cur_packet_siz = 0;
		}
	}
	let complete = cur_packet_siz == 0;
	if !complete {
		packets.push(body[offs ..].to_vec());
	}

	Ok(Page {
		continued : header_type_flag & FLAG_CONTINUED != 0,
		first : header_type_flag & FLAG_FIRST != 0,
		last : header_type_flag & FLAG_LAST != 0,
		position,
		serial,
		sequence,
		packets,
		complete,
		offset : None,
	})
}
