// Copyright 2017, 2021 Parity Technologies
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Integer and byte-slice encoding used by node hashing and operator serialization.
//!
//! Unsigned integers are LEB128 (`uvarint`), signed integers are zig-zag mapped before being
//! written as `uvarint` (`varint`), and byte slices are prefixed with their `uvarint` length.
//! These encodings are part of the hashed node layout: changing any of them changes every
//! digest of the tree.

use crate::rstd::vec::Vec;

/// Maximum encoded length of a 64 bit `uvarint`.
pub const MAX_VARINT_LEN: usize = 10;

/// Decoding errors.
#[derive(PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum Error {
	/// Input ended in the middle of an item.
	UnexpectedEof,
	/// A varint does not fit in 64 bits.
	Overflow,
}

impl Error {
	/// Static description of the error.
	pub fn as_str(&self) -> &'static str {
		match self {
			Error::UnexpectedEof => "unexpected end of input",
			Error::Overflow => "varint overflows 64 bits",
		}
	}
}

#[cfg(feature = "std")]
impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Append the `uvarint` encoding of `v`.
pub fn encode_uvarint(output: &mut Vec<u8>, mut v: u64) {
	while v >= 0x80 {
		output.push((v as u8) | 0x80);
		v >>= 7;
	}
	output.push(v as u8);
}

/// Append the zig-zag `varint` encoding of `v`.
pub fn encode_varint(output: &mut Vec<u8>, v: i64) {
	encode_uvarint(output, ((v << 1) ^ (v >> 63)) as u64)
}

/// Append an `int8`, which is written as the `varint` of its sign extension.
pub fn encode_int8(output: &mut Vec<u8>, v: i8) {
	encode_varint(output, v as i64)
}

/// Append `bytes` prefixed with its `uvarint` length.
pub fn encode_byte_slice(output: &mut Vec<u8>, bytes: &[u8]) {
	encode_uvarint(output, bytes.len() as u64);
	output.extend_from_slice(bytes);
}

/// `bytes` prefixed with its `uvarint` length.
pub fn length_prefixed(bytes: &[u8]) -> Vec<u8> {
	let mut output = Vec::with_capacity(bytes.len() + MAX_VARINT_LEN);
	encode_byte_slice(&mut output, bytes);
	output
}

/// Number of bytes `encode_uvarint` writes for `v`.
pub fn uvarint_len(mut v: u64) -> usize {
	let mut len = 1;
	while v >= 0x80 {
		v >>= 7;
		len += 1;
	}
	len
}

/// Decode a `uvarint` from the start of `input`, returning it with the number of bytes read.
pub fn decode_uvarint(input: &[u8]) -> Result<(u64, usize), Error> {
	let mut value = 0u64;
	let mut shift = 0u32;
	for (i, b) in input.iter().enumerate() {
		if i == MAX_VARINT_LEN {
			return Err(Error::Overflow);
		}
		if *b < 0x80 {
			if i == MAX_VARINT_LEN - 1 && *b > 1 {
				return Err(Error::Overflow);
			}
			return Ok((value | (*b as u64) << shift, i + 1));
		}
		value |= ((*b & 0x7f) as u64) << shift;
		shift += 7;
	}
	Err(Error::UnexpectedEof)
}

/// Decode a zig-zag `varint` from the start of `input`.
pub fn decode_varint(input: &[u8]) -> Result<(i64, usize), Error> {
	let (ux, read) = decode_uvarint(input)?;
	let x = (ux >> 1) as i64;
	Ok((if ux & 1 != 0 { !x } else { x }, read))
}

/// Decode a length-prefixed byte slice from the start of `input`.
pub fn decode_byte_slice(input: &[u8]) -> Result<(&[u8], usize), Error> {
	let (len, read) = decode_uvarint(input)?;
	let end = read.checked_add(len as usize).ok_or(Error::Overflow)?;
	if len > usize::MAX as u64 || input.len() < end {
		return Err(Error::UnexpectedEof);
	}
	Ok((&input[read..end], end))
}

/// Cursor over encoded input.
pub struct Reader<'a> {
	input: &'a [u8],
}

impl<'a> Reader<'a> {
	/// Read from the start of `input`.
	pub fn new(input: &'a [u8]) -> Self {
		Reader { input }
	}

	/// Read a `uvarint`.
	pub fn uvarint(&mut self) -> Result<u64, Error> {
		let (v, read) = decode_uvarint(self.input)?;
		self.input = &self.input[read..];
		Ok(v)
	}

	/// Read a zig-zag `varint`.
	pub fn varint(&mut self) -> Result<i64, Error> {
		let (v, read) = decode_varint(self.input)?;
		self.input = &self.input[read..];
		Ok(v)
	}

	/// Read a length-prefixed byte slice.
	pub fn byte_slice(&mut self) -> Result<&'a [u8], Error> {
		let (v, read) = decode_byte_slice(self.input)?;
		self.input = &self.input[read..];
		Ok(v)
	}

	/// Read a single byte.
	pub fn byte(&mut self) -> Result<u8, Error> {
		let (first, rest) = self.input.split_first().ok_or(Error::UnexpectedEof)?;
		self.input = rest;
		Ok(*first)
	}

	/// Whether all input was consumed.
	pub fn is_empty(&self) -> bool {
		self.input.is_empty()
	}
}
