// Ogg decoder and encoder written in Rust
//
// Copyright (c) 2016-2017 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Redistribution or use only under the terms
// specified in the LICENSE file attached to this
// source distribution.

/*!
Options for reading and editing
*/

/// Default size of the scratch buffer used when shifting file contents.
pub const DEFAULT_CHUNK_SIZE :usize = 64 * 1024;

/// Options controlling how tolerant packet reconstruction is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseOptions {
	/// If `true`, a continued flag that disagrees with the lacing
	/// of the previous page is an error instead of a logged warning,
	/// and so is a partial packet at the end of the passed pages.
	pub strict :bool,
}

impl ParseOptions {
	/// Creates the default, tolerant options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets whether continuation mismatches are fatal.
	pub fn strict(mut self, strict :bool) -> Self {
		self.strict = strict;
		self
	}
}

/// Options for in-place file edits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EditOptions {
	/// Size of the buffer used to move the content following
	/// an edited range. Larger values mean fewer, bigger I/O calls.
	pub chunk_size :usize,
}

impl Default for EditOptions {
	fn default() -> Self {
		EditOptions { chunk_size : DEFAULT_CHUNK_SIZE }
	}
}

impl EditOptions {
	/// Creates the default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the size of the scratch buffer. A size of zero is
	/// treated as one byte.
	pub fn chunk_size(mut self, chunk_size :usize) -> Self {
		self.chunk_size = chunk_size.max(1);
		self
	}
}
