// Ogg decoder and encoder written in Rust
//
// Copyright (c) 2017 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Redistribution or use only under the terms
// specified in the LICENSE file attached to this
// source distribution.

/*!
Reading logic

Pages are read from a physical stream with the `PageReader`,
and logical packets get reconstructed from a list of pages
with `pages_to_packets`.
*/

use std::io::{self, Read, Seek, SeekFrom};
use log::{debug, warn};
use crate::config::ParseOptions;
use crate::error::{OggError, Result};
use crate::page::{self, Page, CAPTURE_PATTERN, HEADER_SIZE, MAX_BODY_SIZE, MAX_SEGMENTS};

/// Largest possible size of a page, header included.
const MAX_PAGE_SIZE :usize = HEADER_SIZE + MAX_SEGMENTS + MAX_BODY_SIZE;

/**
Reader for pages from an Ogg stream.

Pages are expected to follow each other without any gap. Every
returned page has its `offset` set to the position it was read from,
so that it can later be passed to the stream editor.
*/
pub struct PageReader<T :Read + Seek> {
	rdr :T,
}

impl<T :Read + Seek> PageReader<T> {
	/// Constructs a new `PageReader` with a given `Read`.
	pub fn new(rdr :T) -> PageReader<T> {
		PageReader { rdr }
	}
	/// Returns the wrapped reader, consuming the `PageReader`.
	pub fn into_inner(self) -> T {
		self.rdr
	}
	/// Access the interior reader mutably.
	pub fn inner_mut(&mut self) -> &mut T {
		&mut self.rdr
	}

	/// Reads the page starting at the current position.
	///
	/// Returns `Ok(None)` if the reader is at its end. Hitting the
	/// end in the middle of a page is an error.
	pub fn read_page(&mut self) -> Result<Option<Page>> {
		let offset = self.rdr.stream_position()?;
		let mut header_buf = [0; HEADER_SIZE];
		let mut filled = 0;
		while filled < HEADER_SIZE {
			match self.rdr.read(&mut header_buf[filled ..]) {
				Ok(0) => break,
				Ok(n) => filled += n,
				Err(ref e) if e.kind() == io::ErrorKind::Interrupted => (),
				Err(e) => return Err(e.into()),
			}
		}
		if filled == 0 {
			return Ok(None);
		}
		if filled < HEADER_SIZE {
			return Err(OggError::format(format!(
				"truncated page header at offset {}", offset)));
		}
		let segments = page::check_header(&header_buf)?;
		let mut lacing = vec![0; segments];
		self.rdr.read_exact(&mut lacing)?;
		let mut data = Vec::with_capacity(HEADER_SIZE + segments + page::body_size(&lacing));
		data.extend_from_slice(&header_buf);
		data.extend_from_slice(&lacing);
		let body_start = data.len();
		data.resize(body_start + page::body_size(&lacing), 0);
		self.rdr.read_exact(&mut data[body_start ..])?;

		let mut page = Page::decode(&data)?;
		page.offset = Some(offset);
		Ok(Some(page))
	}

	/// Seeks the underlying reader
	pub fn seek(&mut self, pos :SeekFrom) -> Result<u64> {
		Ok(self.rdr.seek(pos)?)
	}
}

impl<T :Read + Seek> Iterator for PageReader<T> {
	type Item = Result<Page>;

	fn next(&mut self) -> Option<Result<Page>> {
		self.read_page().transpose()
	}
}

/**
Reconstructs the packets contained in the passed pages.

Whether the first fragment of a page continues the packet of the page
before is decided by the lacing values alone: a page that ends with a
segment of 255 bytes leaves its last packet open. The continued flag of
the page is only checked against that; a mismatch is logged, and only
an error in strict mode.

All pages have to belong to the same logical bitstream and carry
consecutive sequence numbers.

A packet left open after the last page is an error if that page ends the
logical bitstream, or in strict mode. Otherwise the fragment is returned
as last packet, as the passed pages might just be a part of the stream.
*/
pub fn pages_to_packets(pages :&[Page], opts :&ParseOptions) -> Result<Vec<Vec<u8>>> {
	let mut packets = Vec::new();
	let (serial, mut sequence) = match pages.first() {
		Some(pg) => (pg.serial, pg.sequence),
		None => return Ok(packets),
	};
	if opts.strict && pages[0].continued {
		return Err(OggError::format("first packet is continued"));
	}

	// Fragments of the packet currently being assembled.
	// Gluing them only once the packet ends keeps this O(n).
	let mut fragments :Vec<&[u8]> = Vec::new();
	let mut open = false;

	for (idx, pg) in pages.iter().enumerate() {
		if pg.serial != serial {
			return Err(OggError::format(format!(
				"page {} has serial 0x{:08x}, expected 0x{:08x}", idx, pg.serial, serial)));
		}
		if pg.sequence != sequence {
			return Err(OggError::format(format!(
				"bad sequence number {} of page {}, expected {}", pg.sequence, idx, sequence)));
		}
		sequence = sequence.wrapping_add(1);

		if idx > 0 && pg.continued != open {
			if opts.strict {
				return Err(OggError::format(format!(
					"continued flag of page {} doesn't match the lacing", pg.sequence)));
			}
			warn!("serial 0x{:08x}: continued flag of page {} is {}, but lacing says {}",
				serial, pg.sequence, pg.continued, open);
		}

		if pg.packets.is_empty() {
			continue;
		}
		let last_idx = pg.packets.len() - 1;
		for (pck_idx, pck) in pg.packets.iter().enumerate() {
			fragments.push(pck);
			if pck_idx < last_idx || pg.complete {
				packets.push(fragments.concat());
				fragments.clear();
			}
		}
		open = !pg.complete;
	}

	if open {
		let ends_stream = pages.last().map_or(false, |pg| pg.last);
		if ends_stream || opts.strict {
			return Err(OggError::TruncatedStream);
		}
		debug!("serial 0x{:08x}: returning unfinished packet of {} fragment(s)",
			serial, fragments.len());
		packets.push(fragments.concat());
	}
	Ok(packets)
}

/**
Finds the last page of the logical bitstream `serial`.

If `finishing` is set, only pages with a granule position other than -1,
meaning at least one packet finishes on them, are considered.

For the common case of a single logical bitstream, only the end of the
stream is looked at. If that doesn't yield the final page of the searched
bitstream, all pages are scanned from the start.
*/
pub fn find_last<T :Read + Seek>(rdr :&mut T, serial :u32, finishing :bool)
		-> Result<Option<Page>> {
	let is_valid = |pg :&Page| pg.serial == serial && (!finishing || pg.position != -1);

	let len = rdr.seek(SeekFrom::End(0))?;
	let tail_start = len.saturating_sub(MAX_PAGE_SIZE as u64);
	rdr.seek(SeekFrom::Start(tail_start))?;
	let mut tail = Vec::with_capacity((len - tail_start) as usize);
	rdr.read_to_end(&mut tail)?;

	let cap_pos = tail.windows(CAPTURE_PATTERN.len())
		.rposition(|w| w == CAPTURE_PATTERN);
	if let Some(idx) = cap_pos {
		if let Ok(mut pg) = Page::decode(&tail[idx ..]) {
			if pg.last && is_valid(&pg) {
				pg.offset = Some(tail_start + idx as u64);
				return Ok(Some(pg));
			}
		}
	}

	// The stream is multiplexed or ends oddly, so use the slow way.
	debug!("scanning all pages for the end of serial 0x{:08x}", serial);
	rdr.seek(SeekFrom::Start(0))?;
	let mut best = None;
	for pg in PageReader::new(&mut *rdr) {
		let pg = match pg {
			Ok(pg) => pg,
			Err(e) => {
				debug!("stopping scan for the last page: {}", e);
				break;
			},
		};
		if pg.serial == serial {
			let last = pg.last;
			if is_valid(&pg) {
				best = Some(pg);
			}
			if last {
				break;
			}
		}
	}
	Ok(best)
}
