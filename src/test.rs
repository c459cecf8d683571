// Ogg decoder and encoder written in Rust
//
// Copyright (c) 2016-2017 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Redistribution or use only under the terms
// specified in the LICENSE file attached to this
// source distribution.

use super::*;

use std::io::{self, Cursor, SeekFrom};
use rand::Rng;
use crate::comment::structure_len;
use crate::editing::resize_bytes;
use crate::opus::ChannelMapping;
use crate::writing::packets_to_pages_like;

macro_rules! test_arr_eq {
	($a_arr:expr, $b_arr:expr) => {
		let a_arr = &$a_arr;
		let b_arr = &$b_arr;
		assert_eq!(a_arr.len(), b_arr.len(), "Length mismatch");
		for i in 0 .. b_arr.len() {
			if a_arr[i] != b_arr[i] {
				panic!("Mismatch of values at index {}: {} {}", i, a_arr[i], b_arr[i]);
			}
		}
	}
}

macro_rules! assert_invalid_input {
	($e:expr) => {
		match $e {
			Err(OggError::Io(ref err)) if err.kind() == io::ErrorKind::InvalidInput => (),
			other => panic!("Expected invalid input error, got {:?}", other),
		}
	}
}

struct XorShift {
	state :(u32, u32, u32, u32),
}
impl XorShift {
	fn from_two(seed :(u32, u32)) -> Self {
		let mut xs = XorShift {
			state : (seed.0 ^ 0x2a24a930, seed.1 ^ 0xa9f60227,
				!seed.0 ^ 0x68c44d2d, !seed.1 ^ 0xa1f9794a)
		};
		xs.next();
		xs.next();
		xs.next();
		xs
	}

	fn next(&mut self) -> u32 {
		let mut r = self.state.3;
		r ^= r << 11;
		r ^= r >> 8;
		self.state.3 = self.state.2;
		self.state.2 = self.state.1;
		self.state.1 = self.state.0;
		r ^= self.state.0;
		r ^= self.state.0 >> 19;
		self.state.0 = r;
		r
	}
}

fn gen_pck(seed :u32, len_d_four :usize) -> Vec<u8> {
	let mut ret = Vec::with_capacity(len_d_four * 4);
	let mut xs = XorShift::from_two((seed, len_d_four as u32));
	if len_d_four > 0 {
		ret.extend_from_slice(&seed.to_le_bytes());
	}
	for _ in 1..len_d_four {
		ret.extend_from_slice(&xs.next().to_le_bytes());
	}
	ret
}

fn mk_page(serial :u32, sequence :u32, packets :Vec<Vec<u8>>) -> Page {
	Page {
		serial,
		sequence,
		packets,
		position : sequence as i64 * 960,
		.. Page::default()
	}
}

fn read_all(data :&[u8]) -> Vec<Page> {
	PageReader::new(Cursor::new(data))
		.collect::<Result<Vec<Page>>>()
		.unwrap()
}

#[test]
fn test_page_write() {
	// Test page taken from real Ogg file
	let test_arr_out = [
	0x4f, 0x67, 0x67, 0x53, 0x00, 0x02, 0x00, 0x00,
	0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x74, 0xa3,
	0x90, 0x5b, 0x00, 0x00, 0x00, 0x00, 0x6d, 0x94,
	0x4e, 0x3d, 0x01, 0x1e, 0x01, 0x76, 0x6f, 0x72,
	0x62, 0x69, 0x73, 0x00, 0x00, 0x00, 0x00, 0x02,
	0x44, 0xac, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
	0x80, 0xb5, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
	0xb8, 0x01u8];
	let test_arr_in = [0x01, 0x76, 0x6f, 0x72,
	0x62, 0x69, 0x73, 0x00, 0x00, 0x00, 0x00, 0x02,
	0x44, 0xac, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
	0x80, 0xb5, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
	0xb8, 0x01u8];

	let pg = Page {
		first : true,
		position : 0,
		serial : 0x5b90a374,
		sequence : 0,
		packets : vec![test_arr_in.to_vec()],
		.. Page::default()
	};
	let data = pg.encode().unwrap();
	test_arr_eq!(data, test_arr_out);
	assert_eq!(pg.size(), test_arr_out.len());

	let decoded = Page::decode(&test_arr_out).unwrap();
	assert_eq!(decoded, pg);
	assert_eq!(decoded.lacing(), vec![0x1e]);
}

#[test]
fn test_page_roundtrip() {
	let pages = [
		Page::default(),
		mk_page(1, 2, vec![vec![]]),
		mk_page(1, 3, vec![gen_pck(1, 10), vec![], gen_pck(2, 600)]),
		Page {
			continued : true,
			last : true,
			position : -1,
			complete : false,
			.. mk_page(0xdeadb33f, 7, vec![gen_pck(3, 100), vec![7; 510]])
		},
		mk_page(4, 0, vec![gen_pck(4, 255 * 200 / 4), vec![1, 2, 3]]),
	];
	for pg in pages.iter() {
		let data = pg.encode().unwrap();
		assert_eq!(data.len(), pg.size());
		assert_eq!(&Page::decode(&data).unwrap(), pg);
		assert_eq!(&Page::read(&mut Cursor::new(&data)).unwrap(), pg);
	}
}

#[test]
fn test_page_encode_limits() {
	// 255 * 255 bytes need 255 segments of 255 plus a terminating one
	let pg = mk_page(1, 0, vec![vec![0; 255 * 255]]);
	assert!(matches!(pg.encode(), Err(OggError::Format(_))));
	// Unless the packet continues on the next page
	let pg = Page { complete : false, .. pg };
	let data = pg.encode().unwrap();
	assert_eq!(Page::decode(&data).unwrap(), pg);

	// An incomplete page has to end with a multiple of 255 bytes
	let pg = Page { complete : false, .. mk_page(1, 0, vec![vec![0; 300]]) };
	assert!(matches!(pg.encode(), Err(OggError::Format(_))));
	let pg = Page { complete : false, .. Page::default() };
	assert!(matches!(pg.encode(), Err(OggError::Format(_))));
}

#[test]
fn test_page_decode_errors() {
	let data = mk_page(1, 0, vec![gen_pck(1, 20)]).encode().unwrap();

	let mut bad = data.clone();
	bad[0] = b'o';
	assert!(matches!(Page::decode(&bad), Err(OggError::Format(_))));

	let mut bad = data.clone();
	bad[4] = 1;
	assert!(matches!(Page::decode(&bad), Err(OggError::Format(_))));

	assert!(matches!(Page::decode(&data[.. 20]), Err(OggError::Format(_))));
	assert!(matches!(Page::decode(&data[.. data.len() - 1]), Err(OggError::Format(_))));
	assert!(matches!(Page::read(&mut Cursor::new(&data[.. 40])), Err(OggError::Io(_))));

	// Trailing data is fine
	let mut longer = data.clone();
	longer.extend_from_slice(b"OggS");
	assert!(Page::decode(&longer).is_ok());
}

#[test]
fn test_page_bit_flips() {
	let pg = Page {
		first : true,
		.. mk_page(0x1234, 5, vec![gen_pck(9, 30), gen_pck(10, 70)])
	};
	let data = pg.encode().unwrap();
	let segments = data[26] as usize;
	let mut rng = rand::thread_rng();

	// Everything but capture pattern, version, checksum and
	// the size determining bytes is only covered by the checksum
	let covered = (5 .. 22).chain(27 + segments .. data.len());
	for idx in covered {
		let mut bad = data.clone();
		let bit :u8 = 1 << rng.gen_range(0..8u32);
		bad[idx] ^= bit;
		match Page::decode(&bad) {
			Err(OggError::Checksum { expected, calculated }) => assert_ne!(expected, calculated),
			other => panic!("Flip at {} not detected: {:?}", idx, other),
		}
	}
}

#[test]
fn test_packets_roundtrip() {
	let test_arr = vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
	let test_arr_2 = vec![2, 4, 8, 16, 32, 64, 128, 127, 126, 125, 124];
	let mut test_arr_3 = vec![0; 700];
	for (idx, a) in test_arr_3.iter_mut().enumerate() {
		*a = (idx as u8) / 4;
	}
	let info = PagingInfo::new(0xdeadb33f);
	let opts = ParseOptions::new().strict(true);

	// Everything on a single page
	let packets = vec![test_arr.clone(), test_arr_2.clone(), test_arr_3.clone(), vec![]];
	let pages = packets_to_pages(&packets, 0, &info);
	assert_eq!(pages.len(), 1);
	assert_eq!(pages_to_packets(&pages, &opts).unwrap(), packets);

	// Packets spanning multiple pages
	for &len in [65_025, 65_100, 70_000, 270_000].iter() {
		let big = gen_pck(len as u32, len / 4);
		let packets = vec![test_arr.clone(), big, test_arr_2.clone()];
		let pages = packets_to_pages(&packets, 3, &info);
		assert!(pages.len() > 1);
		let back = pages_to_packets(&pages, &opts).unwrap();
		assert_eq!(back.len(), packets.len());
		for (a, b) in back.iter().zip(packets.iter()) {
			test_arr_eq!(a, b);
		}
	}

	// Also after encoding
	let packets = vec![gen_pck(7, 40_000), vec![1; 255], vec![2; 510]];
	let pages = packets_to_pages(&packets, 0, &info);
	let mut data = Vec::new();
	for pg in pages.iter() {
		data.extend_from_slice(&pg.encode().unwrap());
	}
	let read = read_all(&data);
	assert_eq!(read, pages);
	assert_eq!(pages_to_packets(&read, &opts).unwrap(), packets);
}

#[test]
fn test_packets_to_pages_layout() {
	let info = PagingInfo { serial : 77, first : true, last : true, position : 4242 };
	let packets = vec![gen_pck(1, 100_000 / 4), gen_pck(2, 10)];
	let pages = packets_to_pages(&packets, 5, &info);

	assert_eq!(pages.len(), 2);
	for (idx, pg) in pages.iter().enumerate() {
		assert_eq!(pg.serial, 77);
		assert_eq!(pg.sequence, 5 + idx as u32);
		assert!(pg.lacing().len() <= 255);
		assert!(pg.body_size() <= 255 * 255);
	}
	assert!(pages[0].first && !pages[0].continued && !pages[0].last);
	assert!(!pages[0].complete);
	assert_eq!(pages[0].lacing().len(), 255);
	assert_eq!(pages[0].position, -1);
	assert!(!pages[1].first && pages[1].continued && pages[1].last);
	assert_eq!(pages[1].position, 4242);

	// A packet ending exactly with the page doesn't continue
	let packets = vec![vec![3; 254 * 255 + 10], vec![4; 5]];
	let pages = packets_to_pages(&packets, 0, &PagingInfo::new(1));
	assert_eq!(pages.len(), 2);
	assert!(pages[0].complete);
	assert!(!pages[1].continued);

	// No packets still produce a page for the flags
	let none :&[Vec<u8>] = &[];
	let pages = packets_to_pages(none, 9, &info);
	assert_eq!(pages.len(), 1);
	assert!(pages[0].packets.is_empty() && pages[0].first && pages[0].last);
	assert_eq!(pages[0].sequence, 9);
}

#[test]
fn test_continued_flag_mismatch() {
	let packets = vec![gen_pck(1, 20_000)];
	let mut pages = packets_to_pages(&packets, 0, &PagingInfo::new(3));
	assert!(pages[1].continued);
	pages[1].continued = false;

	// The lacing alone tells us that the packet continues
	let back = pages_to_packets(&pages, &ParseOptions::default()).unwrap();
	assert_eq!(back, packets);
	assert!(matches!(pages_to_packets(&pages, &ParseOptions::new().strict(true)),
		Err(OggError::Format(_))));

	// Flag set, but nothing to continue
	let mut pages = packets_to_pages(&[vec![1; 10], vec![2; 10]], 0, &PagingInfo::new(3));
	pages.extend(packets_to_pages(&[vec![3; 10]], 1, &PagingInfo::new(3)));
	pages[1].continued = true;
	let back = pages_to_packets(&pages, &ParseOptions::default()).unwrap();
	assert_eq!(back, vec![vec![1; 10], vec![2; 10], vec![3; 10]]);
}

#[test]
fn test_truncated_stream() {
	let mut pages = packets_to_pages(&[gen_pck(1, 20_000)], 0,
		&PagingInfo { last : true, .. PagingInfo::new(3) });
	let last = pages.pop().unwrap();
	assert!(last.last);
	pages.last_mut().unwrap().last = true;
	assert!(matches!(pages_to_packets(&pages, &ParseOptions::default()),
		Err(OggError::TruncatedStream)));

	// Without the end of stream flag the fragment is returned
	pages.last_mut().unwrap().last = false;
	let back = pages_to_packets(&pages, &ParseOptions::default()).unwrap();
	assert_eq!(back.len(), 1);
	assert_eq!(back[0].len(), 255 * 255);
	assert!(matches!(pages_to_packets(&pages, &ParseOptions::new().strict(true)),
		Err(OggError::TruncatedStream)));
}

#[test]
fn test_pages_to_packets_stream_checks() {
	let mut pages = packets_to_pages(&[vec![1; 70_000]], 0, &PagingInfo::new(3));
	pages[1].sequence = 5;
	assert!(matches!(pages_to_packets(&pages, &ParseOptions::default()),
		Err(OggError::Format(_))));
	pages[1].sequence = 1;
	pages[1].serial = 4;
	assert!(matches!(pages_to_packets(&pages, &ParseOptions::default()),
		Err(OggError::Format(_))));
	assert!(pages_to_packets(&[], &ParseOptions::default()).unwrap().is_empty());
}

#[test]
fn test_packets_to_pages_like() {
	let old_packets = vec![vec![1; 100], vec![2; 65_025], vec![3; 3]];
	let old_pages = packets_to_pages(&old_packets, 4,
		&PagingInfo { position : 0, .. PagingInfo::new(8) });

	// Same sizes: same layout
	let new_packets = vec![vec![4; 100], vec![5; 65_025], vec![6; 3]];
	let new_pages = packets_to_pages_like(&new_packets, &old_pages).unwrap();
	assert_eq!(new_pages.len(), old_pages.len());
	for (n, o) in new_pages.iter().zip(old_pages.iter()) {
		assert_eq!(n.lacing(), o.lacing());
		assert_eq!((n.sequence, n.position, n.continued, n.complete),
			(o.sequence, o.position, o.continued, o.complete));
	}
	assert_eq!(pages_to_packets(&new_pages, &ParseOptions::default()).unwrap(), new_packets);

	// Different sizes: fresh layout
	let new_packets = vec![vec![4; 101], vec![5; 10], vec![6; 3]];
	let new_pages = packets_to_pages_like(&new_packets, &old_pages).unwrap();
	assert_eq!(new_pages.len(), 1);
	assert_eq!(new_pages[0].sequence, 4);
	assert_eq!(new_pages[0].position, 0);
	assert_eq!(pages_to_packets(&new_pages, &ParseOptions::default()).unwrap(), new_packets);

	assert_invalid_input!(packets_to_pages_like(&new_packets, &[]));
}

const SERIAL_A :u32 = 0xa;
const SERIAL_B :u32 = 0xb;

/// Two multiplexed streams: A0 B0 A1 B1 A2 A3 B2
fn build_muxed() -> Vec<u8> {
	let a = |seq :u32| mk_page(SERIAL_A, seq, vec![gen_pck(seq, 50 + seq as usize)]);
	let b = |seq :u32| mk_page(SERIAL_B, seq, vec![gen_pck(100 + seq, 30)]);
	let pages = vec![
		Page { first : true, .. a(0) },
		Page { first : true, .. b(0) },
		a(1),
		b(1),
		a(2),
		Page { last : true, .. a(3) },
		Page { last : true, .. b(2) },
	];
	let mut data = Vec::new();
	for pg in pages.iter() {
		data.extend_from_slice(&pg.encode().unwrap());
	}
	data
}

fn stream_of(pages :&[Page], serial :u32) -> Vec<Page> {
	pages.iter().filter(|pg| pg.serial == serial).cloned().collect()
}

#[test]
fn test_replace_grow() {
	let data = build_muxed();
	let before = read_all(&data);
	let old :Vec<Page> = before.iter()
		.filter(|pg| pg.serial == SERIAL_A && pg.sequence == 1)
		.cloned().collect();

	let big = gen_pck(9, 40_000);
	let new = packets_to_pages(&[big.clone()], 0, &PagingInfo::new(SERIAL_A));
	assert_eq!(new.len(), 3);

	let mut c = Cursor::new(data);
	replace(&mut c, &old, &new, &EditOptions::new().chunk_size(100)).unwrap();

	let after = read_all(c.get_ref());
	let a_pages = stream_of(&after, SERIAL_A);
	assert_eq!(a_pages.len(), 6);
	for (idx, pg) in a_pages.iter().enumerate() {
		assert_eq!(pg.sequence, idx as u32);
	}
	assert!(a_pages[5].last);
	let packets = pages_to_packets(&a_pages, &ParseOptions::new().strict(true)).unwrap();
	assert_eq!(packets.len(), 4);
	test_arr_eq!(packets[1], big);
	assert_eq!(packets[2], gen_pck(2, 52));
	assert_eq!(packets[3], gen_pck(3, 53));

	// The other stream is untouched
	assert_eq!(stream_of(&after, SERIAL_B), stream_of(&before, SERIAL_B));
}

#[test]
fn test_replace_shrink() {
	let data = build_muxed();
	let before = read_all(&data);
	// A2 and A3 follow each other directly
	let old = vec![before[4].clone(), before[5].clone()];
	let new = packets_to_pages(&[vec![1, 2, 3]], 0, &PagingInfo::new(SERIAL_A));

	let mut c = Cursor::new(data);
	replace(&mut c, &old, &new, &EditOptions::new().chunk_size(7)).unwrap();
	let new_len = c.get_ref().len();

	let after = read_all(c.get_ref());
	assert_eq!(after.len(), before.len() - 1);
	let a_pages = stream_of(&after, SERIAL_A);
	assert_eq!(a_pages.len(), 3);
	assert_eq!(a_pages[2].sequence, 2);
	assert!(a_pages[2].last);
	assert_eq!(pages_to_packets(&a_pages, &ParseOptions::new().strict(true)).unwrap(),
		vec![gen_pck(0, 50), gen_pck(1, 51), vec![1, 2, 3]]);
	assert_eq!(stream_of(&after, SERIAL_B), stream_of(&before, SERIAL_B));
	let last = after.last().unwrap();
	assert_eq!(last.offset.unwrap() + last.size() as u64, new_len as u64);
}

#[test]
fn test_replace_invalid() {
	let data = build_muxed();
	let before = read_all(&data);
	let new = packets_to_pages(&[vec![1]], 0, &PagingInfo::new(SERIAL_A));
	let mut c = Cursor::new(data.clone());
	let opts = EditOptions::default();

	assert_invalid_input!(replace(&mut c, &[], &new, &opts));
	assert_invalid_input!(replace(&mut c, &before[.. 1], &[], &opts));
	// A1 and A2 have B1 between them
	assert_invalid_input!(replace(&mut c, &[before[2].clone(), before[4].clone()], &new, &opts));
	// Mixed streams
	assert_invalid_input!(replace(&mut c, &before[.. 2], &new, &opts));
	// Not read from a file
	assert_invalid_input!(replace(&mut c, &[mk_page(SERIAL_A, 0, vec![])], &new, &opts));
	assert_eq!(c.get_ref(), &data);
}

#[test]
fn test_resize_bytes() {
	let orig :Vec<u8> = (0 .. 100).collect();

	let mut c = Cursor::new(orig.clone());
	resize_bytes(&mut c, 10, 25, 20, 3).unwrap();
	let data = c.get_ref();
	assert_eq!(data.len(), 115);
	assert_eq!(&data[.. 20], &orig[.. 20]);
	assert_eq!(&data[45 ..], &orig[30 ..]);

	let mut c = Cursor::new(orig.clone());
	resize_bytes(&mut c, 10, 2, 20, 3).unwrap();
	let data = c.get_ref();
	assert_eq!(data.len(), 92);
	assert_eq!(&data[.. 20], &orig[.. 20]);
	assert_eq!(&data[22 ..], &orig[30 ..]);

	let mut c = Cursor::new(orig.clone());
	assert_invalid_input!(resize_bytes(&mut c, 10, 2, 95, 3));
}

#[test]
fn test_renumber() {
	let mut data = build_muxed();
	let before = read_all(&data);
	let a2 = before[4].offset.unwrap();
	let mut c = Cursor::new(&mut data);
	let count = editing::renumber(&mut c, a2, SERIAL_A, 10).unwrap();
	assert_eq!(count, 2);

	let after = read_all(&data);
	let seqs :Vec<u32> = stream_of(&after, SERIAL_A).iter().map(|pg| pg.sequence).collect();
	assert_eq!(seqs, vec![0, 1, 10, 11]);
	assert_eq!(stream_of(&after, SERIAL_B), stream_of(&before, SERIAL_B));
}

#[test]
fn test_find_last() {
	let data = build_muxed();
	let mut c = Cursor::new(data.clone());
	// B ends the file
	let pg = reading::find_last(&mut c, SERIAL_B, false).unwrap().unwrap();
	assert_eq!(pg.sequence, 2);
	// A needs the slow path
	let pg = reading::find_last(&mut c, SERIAL_A, true).unwrap().unwrap();
	assert_eq!(pg.sequence, 3);
	assert!(pg.last);
	let offs = pg.offset.unwrap() as usize;
	assert_eq!(Page::decode(&data[offs ..]).unwrap(), pg);
	assert_eq!(reading::find_last(&mut c, 0x999, false).unwrap(), None);
}

#[test]
fn test_page_reader_truncated() {
	let data = build_muxed();
	let mut rdr = PageReader::new(Cursor::new(&data[.. data.len() - 10]));
	let mut count = 0;
	loop {
		match rdr.read_page() {
			Ok(Some(_)) => count += 1,
			Ok(None) => panic!("Truncated page not detected"),
			Err(_) => break,
		}
	}
	assert_eq!(count, 6);
	let mut rdr = PageReader::new(Cursor::new(&data[.. data.len() - 40]));
	rdr.seek(SeekFrom::Start(0)).unwrap();
	assert!(rdr.any(|pg| pg.is_err()));
}

fn opus_head(version :u8, channels :u8, family :u8) -> Vec<u8> {
	let mut head = b"OpusHead".to_vec();
	head.push(version);
	head.push(channels);
	head.extend_from_slice(&312u16.to_le_bytes());
	head.extend_from_slice(&44_100u32.to_le_bytes());
	head.extend_from_slice(&(-256i16).to_le_bytes());
	head.push(family);
	head
}

#[test]
fn test_opus_header() {
	let head = OpusHeader::parse(&opus_head(1, 2, 0)).unwrap();
	assert_eq!(head.version, 1);
	assert_eq!(head.major_version(), 0);
	assert_eq!(head.channels, 2);
	assert_eq!(head.pre_skip, 312);
	assert_eq!(head.input_sample_rate, 44_100);
	assert_eq!(head.output_gain, -256);
	assert_eq!(head.output_gain_db(), -1.0);
	assert_eq!(head.mapping, None);

	// Minor version bumps are fine, major ones not
	assert!(OpusHeader::parse(&opus_head(0x03, 1, 0)).is_ok());
	assert!(OpusHeader::parse(&opus_head(0x0f, 1, 0)).is_ok());
	assert!(matches!(OpusHeader::parse(&opus_head(0x10, 1, 0)),
		Err(OggError::UnsupportedVersion(0x10))));

	let head = opus_head(1, 1, 0);
	assert!(matches!(OpusHeader::parse(&head[.. 18]), Err(OggError::Format(_))));
	let mut bad = head.clone();
	bad[4] = b'X';
	assert!(matches!(OpusHeader::parse(&bad), Err(OggError::Format(_))));
	assert!(matches!(OpusHeader::parse(&opus_head(1, 0, 0)), Err(OggError::Format(_))));
}

#[test]
fn test_opus_header_mapping() {
	let mut head = opus_head(1, 3, 1);
	assert!(matches!(OpusHeader::parse(&head), Err(OggError::Format(_))));
	head.extend_from_slice(&[2, 1, 0, 2, 1]);
	let parsed = OpusHeader::parse(&head).unwrap();
	assert_eq!(parsed.mapping_family, 1);
	assert_eq!(parsed.mapping, Some(ChannelMapping {
		stream_count : 2,
		coupled_count : 1,
		mapping : vec![0, 2, 1],
	}));
}

#[test]
fn test_compute_duration() {
	assert_eq!(compute_duration(545_112, 312), 11.35);
	assert_eq!(compute_duration(48_000, 0), 1.0);
	assert_eq!(compute_duration(100, 312), 0.0);
}

fn comment_packet(trailer :&[u8]) -> Vec<u8> {
	CommentHeader {
		vendor : "libopus 1.3".to_owned(),
		entries : vec![("TITLE".to_owned(), "a=b".to_owned()),
			("ARTIST".to_owned(), "".to_owned())],
		trailer : trailer.to_vec(),
	}.to_packet()
}

#[test]
fn test_comment_parse() {
	let packet = comment_packet(&[0, 0, 0]);
	let header = CommentHeader::parse(&packet).unwrap();
	assert_eq!(header.vendor, "libopus 1.3");
	assert_eq!(header.entries[0], ("TITLE".to_owned(), "a=b".to_owned()));
	assert_eq!(header.entries[1], ("ARTIST".to_owned(), "".to_owned()));
	assert_eq!(header.trailer, vec![0, 0, 0]);
	assert!(!header.trailer_is_extension());
	assert_eq!(structure_len(&packet).unwrap(), packet.len() - 3);
	assert_eq!(header.to_packet(), packet);

	let header = CommentHeader::parse(&comment_packet(&[1, 0xde, 0xad])).unwrap();
	assert!(header.trailer_is_extension());
}

#[test]
fn test_comment_parse_errors() {
	let packet = comment_packet(&[]);
	assert!(matches!(CommentHeader::parse(&packet[.. packet.len() - 1]),
		Err(OggError::Format(_))));
	assert!(matches!(structure_len(&packet[.. 10]), Err(OggError::Format(_))));
	let mut bad = packet.clone();
	bad[0] = b'V';
	assert!(matches!(CommentHeader::parse(&bad), Err(OggError::Format(_))));

	let mut no_eq = CommentHeader {
		entries : vec![("NOEQUALS".to_owned(), "x".to_owned())],
		.. CommentHeader::default()
	}.to_packet();
	// Turn "NOEQUALS=x" into "NOEQUALSxx"
	let pos = no_eq.iter().position(|&b| b == b'=').unwrap();
	no_eq[pos] = b'x';
	assert!(matches!(CommentHeader::parse(&no_eq), Err(OggError::Format(_))));
}

#[test]
fn test_rewrite_comment() {
	let trailer = [1, 0xde, 0xad, 0xbe, 0xef];
	let old = comment_packet(&trailer);
	let new = rewrite_comment(&old, "other vendor", &[("FOO", "BAR")]).unwrap();
	assert!(new.ends_with(&trailer));
	let header = CommentHeader::parse(&new).unwrap();
	assert_eq!(header.vendor, "other vendor");
	assert_eq!(header.entries, vec![("FOO".to_owned(), "BAR".to_owned())]);
	assert_eq!(header.trailer, trailer.to_vec());

	assert!(matches!(rewrite_comment(&old[.. 12], "v", &[("A", "B")]),
		Err(OggError::Format(_))));
}

#[test]
fn test_packets_to_pages_like_open_packet() {
	// Comment header sharing its page with the start of an audio packet
	let audio = gen_pck(5, 150);
	let tags = comment_packet(&[]);
	let page1 = Page {
		complete : false,
		.. mk_page(7, 1, vec![tags.clone(), audio[.. 510].to_vec()])
	};
	let page2 = Page {
		continued : true,
		.. mk_page(7, 2, vec![audio[510 ..].to_vec(), vec![9; 20]])
	};

	let mut packets = pages_to_packets(&[page1.clone()], &ParseOptions::default()).unwrap();
	assert_eq!(packets[1].len(), 510);
	let new_tags = rewrite_comment(&tags, "libopus 1.3", &[("TITLE", "a longer title")]).unwrap();
	packets[0] = new_tags.clone();

	let mut pages = packets_to_pages_like(&packets, &[page1]).unwrap();
	assert_eq!(pages.len(), 1);
	assert!(!pages[0].complete);
	assert!(pages[0].encode().is_ok());
	pages.push(page2);
	assert_eq!(pages_to_packets(&pages, &ParseOptions::new().strict(true)).unwrap(),
		vec![new_tags, audio, vec![9; 20]]);
}

#[test]
fn test_packets_to_pages_like_open_packet_filling_page() {
	let old = Page {
		complete : false,
		.. mk_page(7, 1, vec![vec![1; 10], vec![2; 510]])
	};
	// 253 segments for the first packet leave room for
	// exactly the two full segments of the fragment
	let packets = vec![vec![1; 252 * 255], vec![2; 510]];
	let pages = packets_to_pages_like(&packets, &[old.clone()]).unwrap();
	assert_eq!(pages.len(), 1);
	assert!(!pages[0].complete);
	assert_eq!(pages[0].lacing().len(), 255);
	assert_eq!(pages[0].position, old.position);
	assert_eq!(pages[0].packets, packets);
	assert!(pages[0].encode().is_ok());

	// A page holding nothing but the fragment has no packet finishing on it
	let old = Page {
		continued : true,
		complete : false,
		.. mk_page(7, 1, vec![vec![2; 510]])
	};
	let pages = packets_to_pages_like(&[vec![2; 765]], &[old]).unwrap();
	assert_eq!(pages.len(), 1);
	assert!(!pages[0].complete);
	assert_eq!(pages[0].position, -1);
}

#[test]
fn test_rewrite_comment_padded() {
	let old = comment_packet(&[0; 64]);
	let new = rewrite_comment_padded(&old, "libopus 1.3", &[("A", "B")]).unwrap();
	assert_eq!(new.len(), old.len());
	let header = CommentHeader::parse(&new).unwrap();
	assert_eq!(header.entries, vec![("A".to_owned(), "B".to_owned())]);
	assert!(header.trailer.len() > 64);
	assert!(header.trailer.iter().all(|&b| b == 0));

	// Not enough padding to absorb the growth
	let long = "x".repeat(200);
	let new = rewrite_comment_padded(&old, "libopus 1.3", &[("A", long.as_str())]).unwrap();
	assert!(new.len() > old.len());
	assert!(CommentHeader::parse(&new).unwrap().trailer.is_empty());

	// Extension data is never resized
	let trailer = [1, 0xde, 0xad, 0xbe, 0xef];
	let old = comment_packet(&trailer);
	let new = rewrite_comment_padded(&old, "libopus 1.3", &[("A", "B")]).unwrap();
	assert!(new.len() < old.len());
	assert!(new.ends_with(&trailer));
}

#[test]
fn test_cursor_set_len() {
	let mut c = Cursor::new(vec![1u8; 10]);
	SetLen::set_len(&mut c, 4).unwrap();
	assert_eq!(c.get_ref(), &vec![1; 4]);
	SetLen::set_len(&mut c, 6).unwrap();
	assert_eq!(c.get_ref(), &vec![1, 1, 1, 1, 0, 0]);

	assert_eq!(editing::buffer_len(4096).unwrap(), 4096);
	if usize::BITS < 64 {
		let err = editing::buffer_len(u64::MAX).unwrap_err();
		assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
	}
}
