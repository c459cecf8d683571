// Ogg decoder and encoder written in Rust
//
// Copyright (c) 2016 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Redistribution or use only under the terms
// specified in the LICENSE file attached to this
// source distribution.

#![forbid(unsafe_code)]

/*!
Ogg container engine and Opus header reader

The crate works on three levels:

* single pages, framed and checksummed by `Page::encode` and `Page::decode`,
* logical packets, reconstructed from pages with `pages_to_packets`
  and laid out onto pages with `packets_to_pages`,
* files, where the pages of one logical bitstream can be replaced in place
  with `editing::replace`, moving the rest of the file as needed.

On top of that, the `opus` module reads the identification header of Opus
streams and the `comment` module rewrites their comment header without losing
data that other tools appended to it. `OpusFile` ties both to a file.

Every logical bitstream is identified by the serial number its pages have
stored. Pages of other logical bitstreams are never touched by edits, apart
from moving them around.
*/

#[cfg(test)]
mod test;

mod crc;
pub mod comment;
pub mod config;
pub mod editing;
pub mod error;
pub mod opus;
pub mod page;
pub mod reading;
pub mod writing;

pub use comment::{rewrite_comment, rewrite_comment_padded, CommentHeader};
pub use config::{EditOptions, ParseOptions};
pub use editing::{replace, SetLen};
pub use error::{OggError, Result};
pub use opus::{compute_duration, OpusFile, OpusHeader, OpusInfo};
pub use page::Page;
pub use reading::{pages_to_packets, PageReader};
pub use writing::{packets_to_pages, PagingInfo};
