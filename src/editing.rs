// Ogg decoder and encoder written in Rust
//
// Copyright (c) 2016-2017 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Redistribution or use only under the terms
// specified in the LICENSE file attached to this
// source distribution.

/*!
In-place editing of the pages of a logical bitstream inside a file
*/

use std::cmp::min;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use crate::config::EditOptions;
use crate::crc::vorbis_crc32_patch;
use crate::error::{OggError, Result};
use crate::page::{self, Page, HEADER_SIZE, SEQUENCE_OFFS, CHECKSUM_OFFS};

/// Storage whose length can be changed, like `File::set_len`.
pub trait SetLen {
	/// Truncates or extends the underlying storage to `len` bytes.
	/// Extending fills with zeros.
	fn set_len(&mut self, len :u64) -> io::Result<()>;
}

impl SetLen for File {
	fn set_len(&mut self, len :u64) -> io::Result<()> {
		File::set_len(self, len)
	}
}

impl SetLen for Cursor<Vec<u8>> {
	fn set_len(&mut self, len :u64) -> io::Result<()> {
		self.get_mut().resize(buffer_len(len)?, 0);
		Ok(())
	}
}

impl SetLen for Cursor<&mut Vec<u8>> {
	fn set_len(&mut self, len :u64) -> io::Result<()> {
		self.get_mut().resize(buffer_len(len)?, 0);
		Ok(())
	}
}

/// Converts a file length to an in-memory buffer length.
pub(crate) fn buffer_len(len :u64) -> io::Result<usize> {
	usize::try_from(len).map_err(|_| io::Error::new(io::ErrorKind::InvalidInput,
		format!("length {} exceeds the address space", len)))
}

impl<T :SetLen + ?Sized> SetLen for &mut T {
	fn set_len(&mut self, len :u64) -> io::Result<()> {
		(**self).set_len(len)
	}
}

/**
Replaces the pages `old_pages` of a file with `new_pages`.

`old_pages` must have been read from `file` (so that their offsets are
known), belong to a single logical bitstream and follow each other
directly inside the file.

The new pages are adjusted to take the place of the old ones: they are
assigned the serial of the old pages and renumbered starting with the
sequence number of the first old page. The first new page takes over the
first and continued flags of the first old page, the last new page the
last flag of the last old page.

If the byte size changes, all content after the edited range is moved,
using a buffer of `opts.chunk_size` bytes. If the page count changes, all
later pages of the same logical bitstream are renumbered. Pages of other
logical bitstreams keep their bytes, only their offsets change.

The operation can't be undone half way. If it fails, the file has to be
considered corrupted; callers that care should operate on a copy.
*/
pub fn replace<F>(file :&mut F, old_pages :&[Page], new_pages :&[Page],
		opts :&EditOptions) -> Result<()>
		where F :Read + Write + Seek + SetLen {
	let (old_first, old_last) = match (old_pages.first(), old_pages.last()) {
		(Some(first), Some(last)) => (first, last),
		_ => return Err(OggError::invalid_input("empty list of old pages")),
	};
	if new_pages.is_empty() {
		return Err(OggError::invalid_input("empty list of new pages"));
	}
	let serial = old_first.serial;
	let start = match old_first.offset {
		Some(offs) => offs,
		None => return Err(OggError::invalid_input("old pages weren't read from a file")),
	};
	let mut end = start;
	for pg in old_pages {
		if pg.serial != serial {
			return Err(OggError::invalid_input("old pages belong to multiple streams"));
		}
		if pg.offset != Some(end) {
			return Err(OggError::invalid_input("old pages are not contiguous"));
		}
		end += pg.size() as u64;
	}

	let mut new_pages = new_pages.to_vec();
	for (idx, pg) in new_pages.iter_mut().enumerate() {
		pg.serial = serial;
		pg.sequence = old_first.sequence.wrapping_add(idx as u32);
	}
	if let Some(pg) = new_pages.first_mut() {
		pg.first = old_first.first;
		pg.continued = old_first.continued;
	}
	if let Some(pg) = new_pages.last_mut() {
		pg.last = old_last.last;
	}
	let next_sequence = old_first.sequence.wrapping_add(new_pages.len() as u32);

	let mut data = Vec::new();
	for pg in new_pages.iter() {
		data.extend_from_slice(&pg.encode()?);
	}

	debug!("serial 0x{:08x}: replacing {} page(s) ({} bytes at {}) with {} page(s) ({} bytes)",
		serial, old_pages.len(), end - start, start, new_pages.len(), data.len());
	resize_bytes(file, end - start, data.len() as u64, start, opts.chunk_size)?;
	file.seek(SeekFrom::Start(start))?;
	file.write_all(&data)?;

	if new_pages.len() != old_pages.len() && !old_last.last {
		let renumbered = renumber(file, start + data.len() as u64, serial, next_sequence)?;
		debug!("serial 0x{:08x}: renumbered {} following page(s)", serial, renumbered);
	}
	file.flush()?;
	Ok(())
}

/**
Changes the size of the region of `old_size` bytes at `offset` to
`new_size` bytes, moving everything after it.

The moved content is copied in chunks of at most `chunk_size` bytes, so
the file never has to fit into memory. When growing, the new bytes at the
end of the region have unspecified content; when shrinking, the tail of
the region is dropped.
*/
pub fn resize_bytes<F>(file :&mut F, old_size :u64, new_size :u64, offset :u64,
		chunk_size :usize) -> Result<()>
		where F :Read + Write + Seek + SetLen {
	let len = file.seek(SeekFrom::End(0))?;
	let old_end = offset + old_size;
	if old_end > len {
		return Err(OggError::invalid_input("resized region exceeds the file"));
	}
	let trailing = len - old_end;
	if new_size > old_size {
		let grow = new_size - old_size;
		file.set_len(len + grow)?;
		move_bytes(file, old_end + grow, old_end, trailing, chunk_size)?;
	} else if new_size < old_size {
		let shrink = old_size - new_size;
		move_bytes(file, old_end - shrink, old_end, trailing, chunk_size)?;
		file.set_len(len - shrink)?;
	}
	Ok(())
}

/// Copies `count` bytes from `src` to `dest`. The ranges may overlap.
fn move_bytes<F :Read + Write + Seek>(file :&mut F, dest :u64, src :u64, count :u64,
		chunk_size :usize) -> io::Result<()> {
	if dest == src || count == 0 {
		return Ok(());
	}
	let mut buf = vec![0; min(chunk_size.max(1) as u64, count) as usize];
	let mut moved = 0;
	while moved < count {
		let n = min(buf.len() as u64, count - moved);
		// Moving towards the end, copy from the back so that
		// no byte gets overwritten before it was read.
		let pos = if dest > src { count - moved - n } else { moved };
		let chunk = &mut buf[.. n as usize];
		file.seek(SeekFrom::Start(src + pos))?;
		file.read_exact(chunk)?;
		file.seek(SeekFrom::Start(dest + pos))?;
		file.write_all(chunk)?;
		moved += n;
	}
	Ok(())
}

/**
Renumbers the pages of the logical bitstream `serial`, starting at
`offset` inside the file, so that their sequence numbers continue
from `start`.

Only the sequence number and the checksum are rewritten, the checksum
gets patched instead of recomputed so page bodies are never read.
Pages of other logical bitstreams are skipped. Renumbering stops at the
end of the file or after the page that ends the bitstream.

Returns the number of pages that were renumbered.
*/
pub fn renumber<F>(file :&mut F, offset :u64, serial :u32, start :u32) -> Result<u32>
		where F :Read + Write + Seek {
	let len = file.seek(SeekFrom::End(0))?;
	let mut pos = offset;
	let mut number = start;
	let mut count = 0;
	while pos < len {
		file.seek(SeekFrom::Start(pos))?;
		let mut header_buf = [0; HEADER_SIZE];
		file.read_exact(&mut header_buf)?;
		let segments = page::check_header(&header_buf)?;
		let mut lacing = vec![0; segments];
		file.read_exact(&mut lacing)?;
		let size = HEADER_SIZE + segments + page::body_size(&lacing);

		let pg_serial = LittleEndian::read_u32(&header_buf[14 .. 18]);
		if pg_serial == serial {
			let old_seq = &header_buf[SEQUENCE_OFFS .. SEQUENCE_OFFS + 4];
			let new_seq = number.to_le_bytes();
			let checksum = LittleEndian::read_u32(&header_buf[CHECKSUM_OFFS .. CHECKSUM_OFFS + 4]);
			if old_seq != new_seq {
				// The checksum is computed with its own field zeroed,
				// so it doesn't take part in the patch
				let patched = vorbis_crc32_patch(checksum, SEQUENCE_OFFS, old_seq,
					&new_seq, size);
				let mut field = [0; 8];
				field[.. 4].copy_from_slice(&new_seq);
				field[4 ..].copy_from_slice(&patched.to_le_bytes());
				file.seek(SeekFrom::Start(pos + SEQUENCE_OFFS as u64))?;
				file.write_all(&field)?;
				count += 1;
			}
			number = number.wrapping_add(1);
			if header_buf[5] & page::FLAG_LAST != 0 {
				break;
			}
		}
		pos += size as u64;
	}
	Ok(count)
}
