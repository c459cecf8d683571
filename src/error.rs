// Ogg decoder and encoder written in Rust
//
// Copyright (c) 2016-2017 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Redistribution or use only under the terms
// specified in the LICENSE file attached to this
// source distribution.

/*!
Error type shared by all parts of the crate
*/

use std::error;
use std::io;
use std::fmt::{self, Display, Formatter};

/// Error that can be raised when decoding, assembling or editing
/// an Ogg transport or the Opus headers inside it.
#[derive(Debug)]
pub enum OggError {
	/// Malformed data: bad capture pattern, non zero stream
	/// structure version, bad codec magic or a truncated header.
	Format(String),
	/// Mismatch of the stored checksum with the one calculated
	/// over the page.
	Checksum {
		/// The value stored inside the page header
		expected :u32,
		/// The value computed over the page bytes
		calculated :u32,
	},
	/// The codec header announces a major version we don't understand.
	/// The raw version byte is attached.
	UnsupportedVersion(u8),
	/// A packet was never terminated before the logical stream ended.
	TruncatedStream,
	/// I/O error occured, or invalid arguments were passed
	/// to a file editing operation.
	Io(io::Error),
}

impl OggError {
	pub(crate) fn format<S :Into<String>>(msg :S) -> Self {
		OggError::Format(msg.into())
	}

	pub(crate) fn invalid_input(msg :&str) -> Self {
		OggError::Io(io::Error::new(io::ErrorKind::InvalidInput, msg.to_owned()))
	}
}

impl error::Error for OggError {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		match self {
			OggError::Io(err) => Some(err),
			_ => None,
		}
	}
}

impl Display for OggError {
	fn fmt(&self, fmt :&mut Formatter) -> fmt::Result {
		match self {
			OggError::Format(msg) => write!(fmt, "Malformed data: {}", msg),
			OggError::Checksum { expected, calculated } =>
				write!(fmt, "CRC32 hash mismatch (stored 0x{:08x}, calculated 0x{:08x})",
					expected, calculated),
			OggError::UnsupportedVersion(v) =>
				write!(fmt, "Unsupported header version {} (major {})", v, v >> 4),
			OggError::TruncatedStream => write!(fmt, "Packet not terminated before end of stream"),
			OggError::Io(err) => write!(fmt, "I/O error: {}", err),
		}
	}
}

impl From<io::Error> for OggError {
	fn from(err :io::Error) -> OggError {
		return OggError::Io(err);
	}
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OggError>;
