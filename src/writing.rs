// Ogg decoder and encoder written in Rust
//
// Copyright (c) 2016-2017 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Redistribution or use only under the terms
// specified in the LICENSE file attached to this
// source distribution.

/*!
Writing logic

Lays out logical packets onto pages.
*/

use std::cmp::min;
use crate::config::ParseOptions;
use crate::error::{OggError, Result};
use crate::page::{Page, MAX_SEGMENTS};
use crate::reading::pages_to_packets;

/// Stream level information for the pages created from packets.
///
/// The `first` flag goes to the first created page, `last` and
/// `position` to the last one. All other pages get a granule
/// position of -1, as no packet is regarded as finishing on them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PagingInfo {
	/// Serial number of the logical bitstream
	pub serial :u32,
	/// Whether the first page starts the logical bitstream
	pub first :bool,
	/// Whether the last page ends the logical bitstream
	pub last :bool,
	/// Absolute granule position of the last page
	pub position :i64,
}

impl PagingInfo {
	/// Info for pages in the middle of the bitstream `serial`.
	pub fn new(serial :u32) -> Self {
		PagingInfo { serial, first : false, last : false, position : -1 }
	}
}

/**
Lays out the packets onto as few pages as possible.

Every page is filled up to its 255 segments. A packet that doesn't fit
into the remaining segments is split, its remainder goes to the next page
which gets the continued flag set. Sequence numbers start at `sequence`
and increase by one per page.

Passing no packets yields a single empty page.
*/
pub fn packets_to_pages<P :AsRef<[u8]>>(packets :&[P], sequence :u32,
		info :&PagingInfo) -> Vec<Page> {
	let mut pages = Vec::new();
	let mut cur = Page::default();
	let mut segment_cnt = 0;

	for pck in packets {
		let pck = pck.as_ref();
		// Every packet needs a terminating segment of < 255 bytes,
		// even if that means a segment of length zero.
		let needed_segments = pck.len() / 255 + 1;
		let mut segment_i = 0;
		let mut written = 0;
		while segment_i < needed_segments {
			let take = min(MAX_SEGMENTS - segment_cnt, needed_segments - segment_i);
			segment_i += take;
			segment_cnt += take;
			let end = if segment_i < needed_segments {
				written + take * 255
			} else {
				pck.len()
			};
			cur.packets.push(pck[written .. end].to_vec());
			written = end;

			if segment_cnt == MAX_SEGMENTS {
				let continues = segment_i < needed_segments;
				cur.complete = !continues;
				pages.push(cur);
				cur = Page::default();
				cur.continued = continues;
				segment_cnt = 0;
			}
		}
	}
	if !cur.packets.is_empty() || pages.is_empty() {
		pages.push(cur);
	}

	let page_count = pages.len();
	for (idx, pg) in pages.iter_mut().enumerate() {
		pg.serial = info.serial;
		pg.sequence = sequence.wrapping_add(idx as u32);
		pg.position = -1;
		pg.first = idx == 0 && info.first;
		if idx + 1 == page_count {
			pg.last = info.last;
			pg.position = info.position;
		}
	}
	pages
}

/**
Lays out the packets like the packets in `old_pages`.

If the new packets have exactly the sizes of the packets contained in
`old_pages`, the old page boundaries, flags, granule positions and
sequence numbers are kept, so a same-size edit doesn't move any page.
Otherwise this falls back to `packets_to_pages`, taking over serial,
first flag and starting sequence number of the first old page, and last
flag and granule position of the last one.

If the last old page ends with a packet that continues on the page after
it, the last packet is treated as that fragment and stays open, so the
continuation still joins it.
*/
pub fn packets_to_pages_like<P :AsRef<[u8]>>(packets :&[P], old_pages :&[Page])
		-> Result<Vec<Page>> {
	let (first, last) = match (old_pages.first(), old_pages.last()) {
		(Some(first), Some(last)) => (first, last),
		_ => return Err(OggError::invalid_input("no pages to take the layout from")),
	};
	let old_packets = pages_to_packets(old_pages, &ParseOptions::default())?;
	let same_sizes = old_packets.len() == packets.len()
		&& old_packets.iter().zip(packets.iter())
			.all(|(o, n)| o.len() == n.as_ref().len());

	if !same_sizes {
		let info = PagingInfo {
			serial : first.serial,
			first : first.first,
			last : last.last,
			position : last.position,
		};
		let mut pages = packets_to_pages(packets, first.sequence, &info);
		if !last.complete {
			keep_last_open(&mut pages, last.position);
		}
		return Ok(pages);
	}

	// Walk the new packets along the old fragments
	let mut pck_iter = packets.iter().map(|p| p.as_ref());
	let mut cur_pck :&[u8] = &[];
	let mut open = false;
	let mut new_pages = Vec::with_capacity(old_pages.len());
	for old in old_pages {
		let mut new = Page {
			packets : Vec::with_capacity(old.packets.len()),
			offset : None,
			.. old.clone()
		};
		for (idx, frag) in old.packets.iter().enumerate() {
			if !(idx == 0 && open) {
				cur_pck = pck_iter.next().unwrap_or(&[]);
			}
			let (head, tail) = cur_pck.split_at(frag.len());
			new.packets.push(head.to_vec());
			cur_pck = tail;
		}
		if !old.packets.is_empty() {
			open = !old.complete;
		}
		new_pages.push(new);
	}
	Ok(new_pages)
}

/// Leaves the final packet of `pages` unterminated.
fn keep_last_open(pages :&mut Vec<Page>, position :i64) {
	// A fragment filling its page up leaves only the empty
	// terminating segment for a page of its own
	let only_terminator = pages.len() > 1 && pages.last().map_or(false, |pg|
		pg.continued && pg.packets.len() == 1 && pg.packets[0].is_empty());
	if only_terminator {
		pages.pop();
	}
	if let Some(pg) = pages.last_mut() {
		pg.complete = false;
		// No packet finishes on a page that holds only the fragment
		pg.position = if pg.packets.len() == 1 { -1 } else { position };
	}
}
