// Ogg decoder and encoder written in Rust
//
// Copyright (c) 2016 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Redistribution or use only under the terms
// specified in the LICENSE file attached to this
// source distribution.

use std::env;
use std::fs::File;
use std::io::{Seek, SeekFrom};
use oggopus::{OggError, OpusFile, PageReader};

fn main() {
	env_logger::init();
	match run() {
		Ok(_) =>(),
		Err(err) => println!("Error: {}", err),
	}
}

fn run() -> Result<(), OggError> {
	let file_path = env::args().nth(1).expect("No arg found. Please specify a file to open.");
	println!("Opening file: {}", file_path);
	let mut f = File::open(&file_path)?;

	let opus = OpusFile::read(&mut f)?;
	let info = &opus.info;
	println!("Opus stream: serial 0x{:08x}, version {}, {} channel(s), pre-skip {}",
		info.serial, info.header.version, info.channels(), info.header.pre_skip);
	println!("Input sample rate {} Hz, output gain {:.2} dB",
		info.header.input_sample_rate, info.header.output_gain_db());
	match info.bitrate {
		Some(br) => println!("Length {:.3} s, {} bit/s", info.length, br),
		None => println!("Length {:.3} s", info.length),
	}
	println!("Vendor: {}", opus.comment.vendor);
	for (key, value) in opus.comment.entries.iter() {
		println!("  {}={}", key, value);
	}
	if !opus.comment.trailer.is_empty() {
		println!("{} trailing byte(s) after the comments, {}", opus.comment.trailer.len(),
			if opus.comment.trailer_is_extension() { "kept on edits" } else { "padding" });
	}

	// Page summary of all logical bitstreams
	let mut pages = 0;
	let mut bytes = 0;
	f.seek(SeekFrom::Start(0))?;
	for pg in PageReader::new(&mut f) {
		let pg = pg?;
		pages += 1;
		bytes += pg.size();
	}
	println!("{} page(s), {} byte(s) in total", pages, bytes);
	Ok(())
}
