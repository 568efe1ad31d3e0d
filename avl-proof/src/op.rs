// Copyright 2019 Parity Technologies
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

//! Proof operators.
//!
//! An operator consumes a stack of byte buffers and produces a new one. Operators are pure
//! functions of their parameters and their input, so a chain of them can be replayed by anyone
//! holding the chain and its initial input. Each operator also has a wire form, a
//! [`ProofOpRecord`], made of a stable type tag, an optional application key and the operator's
//! encoded parameters.

use crate::codec::{self, encode_byte_slice, encode_uvarint, Reader};
use crate::rstd::{string::String, vec::Vec};
use node_db::Hasher;
use smallvec::SmallVec;

/// Stack of buffers passed from operator to operator.
pub type Stack = SmallVec<[Vec<u8>; 2]>;

const TYPE_PREPEND_LENGTH: &str = "prepend_length";
const TYPE_CONCAT: &str = "concat";
const TYPE_HASH: &str = "hash";
const TYPE_ASSERT_VALUES: &str = "assert_values";
const TYPE_HASH_CHAIN: &str = "hash_chain";
const TYPE_APPLY: &str = "apply";

/// Deepest nesting of `BatchApply` operators accepted when decoding.
pub const MAX_APPLY_DEPTH: usize = 8;

/// Errors raised while running or decoding operators.
#[derive(PartialEq, Eq, Clone)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum OpError {
	/// The operator received a stack of the wrong size.
	Arity {
		/// Type tag of the failing operator.
		op: &'static str,
		/// Number of buffers the operator requires.
		expected: usize,
		/// Number of buffers it was given.
		found: usize,
	},
	/// A buffer is not part of the set accepted by `AssertValues`.
	Assertion(Vec<u8>),
	/// Operator parameters are malformed.
	InvalidInputs(&'static str),
	/// A chain ran to completion but left an empty stack.
	EmptyResult,
}

#[cfg(feature = "std")]
impl std::fmt::Display for OpError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OpError::Arity { op, expected, found } =>
				write!(f, "Operator `{}` expects {} input value(s), got {}", op, expected, found),
			OpError::Assertion(value) =>
				write!(f, "Value {} is not in the accepted set", crate::ToHex(value)),
			OpError::InvalidInputs(reason) =>
				write!(f, "Invalid operator inputs: {}", reason),
			OpError::EmptyResult =>
				write!(f, "Operator chain produced no value"),
		}
	}
}

#[cfg(feature = "std")]
impl std::error::Error for OpError {}

impl From<codec::Error> for OpError {
	fn from(err: codec::Error) -> Self {
		OpError::InvalidInputs(err.as_str())
	}
}

/// One round of a `HashChain`: the digest of `prefix || leaf || suffix`.
#[derive(PartialEq, Eq, Clone, Default)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct Round {
	/// Bytes written before the round input.
	pub prefix: Vec<u8>,
	/// Bytes written after the round input.
	pub suffix: Vec<u8>,
}

/// One partition of a `BatchApply`.
#[derive(PartialEq, Eq, Clone)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct Partition {
	/// Number of consecutive stack buffers this partition consumes.
	pub arity: usize,
	/// Chain run over those buffers.
	pub ops: Vec<Operator>,
}

/// A proof operator.
#[derive(PartialEq, Eq, Clone)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum Operator {
	/// Prefix every buffer with its `uvarint` length. Accepts any number of buffers.
	LengthPrefix,
	/// Wrap a single buffer as `prefix || [bytes(key)] || value || suffix`.
	Affix {
		/// Key written, length prefixed, in front of the value.
		key: Option<Vec<u8>>,
		/// Bytes written first.
		prefix: Vec<u8>,
		/// Bytes written last.
		suffix: Vec<u8>,
	},
	/// Hash a single buffer.
	Digest,
	/// Certify the stack against a fixed set of accepted buffers. An empty stack is replaced by
	/// the accepted set itself.
	AssertValues {
		/// Accepted buffers.
		values: Vec<Vec<u8>>,
	},
	/// A sequence of `Affix` + `Digest` rounds over a single buffer, the first round seeing
	/// `[bytes(key)] || value`.
	HashChain {
		/// Key written, length prefixed, in front of the value of the first round.
		key: Option<Vec<u8>>,
		/// Rounds, applied in order.
		rounds: Vec<Round>,
	},
	/// Split the stack into consecutive partitions, run an independent chain over each and
	/// concatenate their outputs.
	BatchApply {
		/// Partitions, in stack order. Their arities must add up to the stack size.
		partitions: Vec<Partition>,
	},
}

/// Wire form of an operator.
#[derive(PartialEq, Eq, Clone)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct ProofOpRecord {
	/// Type tag.
	pub op_type: String,
	/// Application key the operator pertains to.
	pub key: Option<Vec<u8>>,
	/// Encoded operator parameters.
	pub data: Vec<u8>,
}

impl ProofOpRecord {
	/// Append the self-delimiting encoding of this record:
	/// `bytes(type) || key_flag || [bytes(key)] || bytes(data)`.
	pub fn encode_to(&self, output: &mut Vec<u8>) {
		encode_byte_slice(output, self.op_type.as_bytes());
		match &self.key {
			Some(key) => {
				output.push(1);
				encode_byte_slice(output, key);
			},
			None => output.push(0),
		}
		encode_byte_slice(output, &self.data);
	}

	/// Read a record written by `encode_to`.
	pub fn decode_from(reader: &mut Reader) -> Result<Self, OpError> {
		let record = RecordRef::read(reader)?;
		Ok(ProofOpRecord {
			op_type: record.op_type.into(),
			key: record.key.map(|k| k.to_vec()),
			data: record.data.to_vec(),
		})
	}

	fn borrowed(&self) -> RecordRef {
		RecordRef { op_type: &self.op_type, key: self.key.as_deref(), data: &self.data }
	}
}

/// A record borrowed from the buffer it was read from.
struct RecordRef<'a> {
	op_type: &'a str,
	key: Option<&'a [u8]>,
	data: &'a [u8],
}

impl<'a> RecordRef<'a> {
	fn read(reader: &mut Reader<'a>) -> Result<Self, OpError> {
		let op_type = core::str::from_utf8(reader.byte_slice()?)
			.map_err(|_| OpError::InvalidInputs("operator type is not utf-8"))?;
		let key = match reader.byte()? {
			0 => None,
			1 => Some(reader.byte_slice()?),
			_ => return Err(OpError::InvalidInputs("invalid key flag")),
		};
		let data = reader.byte_slice()?;
		Ok(RecordRef { op_type, key, data })
	}
}

/// Encode a whole chain of records as one byte string.
pub fn encode_records(records: &[ProofOpRecord]) -> Vec<u8> {
	let mut output = Vec::new();
	encode_uvarint(&mut output, records.len() as u64);
	for record in records {
		record.encode_to(&mut output);
	}
	output
}

/// Decode a chain written by `encode_records`.
pub fn decode_records(input: &[u8]) -> Result<Vec<ProofOpRecord>, OpError> {
	let mut reader = Reader::new(input);
	let count = reader.uvarint()?;
	// Every record takes at least three bytes.
	if count > input.len() as u64 / 3 {
		return Err(OpError::InvalidInputs("record count exceeds input"));
	}
	let mut records = Vec::with_capacity(count as usize);
	for _ in 0..count {
		records.push(ProofOpRecord::decode_from(&mut reader)?);
	}
	if !reader.is_empty() {
		return Err(OpError::InvalidInputs("trailing bytes after records"));
	}
	Ok(records)
}

fn expect_arity(op: &'static str, values: &Stack, expected: usize) -> Result<(), OpError> {
	if values.len() != expected {
		return Err(OpError::Arity { op, expected, found: values.len() });
	}
	Ok(())
}

fn single(value: Vec<u8>) -> Stack {
	let mut stack = Stack::new();
	stack.push(value);
	stack
}

impl Operator {
	/// Run the operator over `values`.
	pub fn run<H: Hasher>(&self, values: Stack) -> Result<Stack, OpError> {
		match self {
			Operator::LengthPrefix =>
				Ok(values.iter().map(|v| codec::length_prefixed(v)).collect()),
			Operator::Affix { key, prefix, suffix } => {
				expect_arity(TYPE_CONCAT, &values, 1)?;
				let value = &values[0];
				let mut output = Vec::with_capacity(
					prefix.len() + value.len() + suffix.len() + key.as_ref().map_or(0, |k| k.len() + codec::MAX_VARINT_LEN),
				);
				output.extend_from_slice(prefix);
				if let Some(key) = key {
					encode_byte_slice(&mut output, key);
				}
				output.extend_from_slice(value);
				output.extend_from_slice(suffix);
				Ok(single(output))
			},
			Operator::Digest => {
				expect_arity(TYPE_HASH, &values, 1)?;
				Ok(single(H::hash(&values[0]).as_ref().to_vec()))
			},
			Operator::AssertValues { values: accepted } => {
				if values.is_empty() {
					return Ok(accepted.iter().cloned().collect());
				}
				if let Some(rejected) = values.iter().find(|v| !accepted.contains(v)) {
					return Err(OpError::Assertion(rejected.clone()));
				}
				Ok(values)
			},
			Operator::HashChain { key, rounds } => {
				expect_arity(TYPE_HASH_CHAIN, &values, 1)?;
				if rounds.is_empty() {
					return Err(OpError::InvalidInputs("hash chain without rounds"));
				}
				let mut buffer = Vec::new();
				let mut leaf = H::Out::default();
				for (i, round) in rounds.iter().enumerate() {
					buffer.clear();
					buffer.extend_from_slice(&round.prefix);
					if i == 0 {
						if let Some(key) = key {
							encode_byte_slice(&mut buffer, key);
						}
						buffer.extend_from_slice(&values[0]);
					} else {
						buffer.extend_from_slice(leaf.as_ref());
					}
					buffer.extend_from_slice(&round.suffix);
					leaf = H::hash(&buffer);
				}
				Ok(single(leaf.as_ref().to_vec()))
			},
			Operator::BatchApply { partitions } => {
				let expected = partitions
					.iter()
					.try_fold(0usize, |sum, p| sum.checked_add(p.arity))
					.ok_or(OpError::InvalidInputs("partition arities overflow"))?;
				expect_arity(TYPE_APPLY, &values, expected)?;
				let mut output = Stack::new();
				let mut remaining = values.into_iter();
				for partition in partitions {
					let input = remaining.by_ref().take(partition.arity).collect();
					output.extend(run_chain::<H>(input, &partition.ops)?);
				}
				Ok(output)
			},
		}
	}

	/// The application key this operator pertains to, if any.
	pub fn key(&self) -> Option<&[u8]> {
		match self {
			Operator::Affix { key, .. } | Operator::HashChain { key, .. } => key.as_deref(),
			_ => None,
		}
	}

	/// Stable type tag of the operator.
	pub fn op_type(&self) -> &'static str {
		match self {
			Operator::LengthPrefix => TYPE_PREPEND_LENGTH,
			Operator::Affix { .. } => TYPE_CONCAT,
			Operator::Digest => TYPE_HASH,
			Operator::AssertValues { .. } => TYPE_ASSERT_VALUES,
			Operator::HashChain { .. } => TYPE_HASH_CHAIN,
			Operator::BatchApply { .. } => TYPE_APPLY,
		}
	}

	/// Wire form of the operator.
	pub fn encode(&self) -> ProofOpRecord {
		let mut data = Vec::new();
		match self {
			Operator::LengthPrefix | Operator::Digest => {},
			Operator::Affix { prefix, suffix, .. } => {
				encode_byte_slice(&mut data, prefix);
				encode_byte_slice(&mut data, suffix);
			},
			Operator::AssertValues { values } => {
				encode_uvarint(&mut data, values.len() as u64);
				for value in values {
					encode_byte_slice(&mut data, value);
				}
			},
			Operator::HashChain { rounds, .. } => {
				encode_uvarint(&mut data, rounds.len() as u64);
				for round in rounds {
					encode_byte_slice(&mut data, &round.prefix);
					encode_byte_slice(&mut data, &round.suffix);
				}
			},
			Operator::BatchApply { partitions } => {
				encode_uvarint(&mut data, partitions.len() as u64);
				for partition in partitions {
					encode_uvarint(&mut data, partition.arity as u64);
					encode_uvarint(&mut data, partition.ops.len() as u64);
					for op in &partition.ops {
						op.encode().encode_to(&mut data);
					}
				}
			},
		}
		ProofOpRecord { op_type: self.op_type().into(), key: self.key().map(|k| k.to_vec()), data }
	}

	/// Rebuild an operator from its wire form.
	pub fn decode(record: &ProofOpRecord) -> Result<Self, OpError> {
		Self::decode_nested(record.borrowed(), 0)
	}

	fn decode_nested(record: RecordRef, depth: usize) -> Result<Self, OpError> {
		let data = record.data;
		let key = || record.key.map(|k| k.to_vec());
		let mut reader = Reader::new(data);
		let op = match record.op_type {
			TYPE_PREPEND_LENGTH => Operator::LengthPrefix,
			TYPE_HASH => Operator::Digest,
			TYPE_CONCAT => Operator::Affix {
				key: key(),
				prefix: reader.byte_slice()?.to_vec(),
				suffix: reader.byte_slice()?.to_vec(),
			},
			TYPE_ASSERT_VALUES => {
				let count = reader.uvarint()?;
				if count > data.len() as u64 {
					return Err(OpError::InvalidInputs("value count exceeds data"));
				}
				let values = (0..count)
					.map(|_| reader.byte_slice().map(|v| v.to_vec()))
					.collect::<Result<_, _>>()?;
				Operator::AssertValues { values }
			},
			TYPE_HASH_CHAIN => {
				let count = reader.uvarint()?;
				if count == 0 {
					return Err(OpError::InvalidInputs("hash chain without rounds"));
				}
				if count > data.len() as u64 / 2 {
					return Err(OpError::InvalidInputs("round count exceeds data"));
				}
				let rounds = (0..count)
					.map(|_| -> Result<Round, codec::Error> {
						Ok(Round {
							prefix: reader.byte_slice()?.to_vec(),
							suffix: reader.byte_slice()?.to_vec(),
						})
					})
					.collect::<Result<_, _>>()?;
				Operator::HashChain { key: key(), rounds }
			},
			TYPE_APPLY => {
				if depth >= MAX_APPLY_DEPTH {
					return Err(OpError::InvalidInputs("apply nesting too deep"));
				}
				let count = reader.uvarint()?;
				if count > data.len() as u64 / 2 {
					return Err(OpError::InvalidInputs("partition count exceeds data"));
				}
				let mut partitions = Vec::with_capacity(count as usize);
				for _ in 0..count {
					let arity = reader.uvarint()? as usize;
					let op_count = reader.uvarint()?;
					if op_count > data.len() as u64 / 3 {
						return Err(OpError::InvalidInputs("operator count exceeds data"));
					}
					let mut ops = Vec::with_capacity(op_count as usize);
					for _ in 0..op_count {
						ops.push(Self::decode_nested(RecordRef::read(&mut reader)?, depth + 1)?);
					}
					partitions.push(Partition { arity, ops });
				}
				Operator::BatchApply { partitions }
			},
			_ => return Err(OpError::InvalidInputs("unknown operator type")),
		};
		if !reader.is_empty() {
			return Err(OpError::InvalidInputs("trailing bytes in operator data"));
		}
		Ok(op)
	}
}

fn run_chain<H: Hasher>(mut values: Stack, ops: &[Operator]) -> Result<Stack, OpError> {
	for op in ops {
		values = op.run::<H>(values)?;
	}
	Ok(values)
}

/// Run `chains` in order over an initial stack, returning the final stack.
pub fn run_stack<H, I>(values: Stack, chains: I) -> Result<Stack, OpError>
where
	H: Hasher,
	I: IntoIterator,
	I::Item: AsRef<[Operator]>,
{
	chains.into_iter().try_fold(values, |values, ops| run_chain::<H>(values, ops.as_ref()))
}

/// Run `chains` in order, seeding the stack with `input` when there is one, and return the first
/// buffer of the final stack.
///
/// This is the verification primitive: a leaf chain followed by the inner chains of its path,
/// leaf to root, computes the root digest.
pub fn run_ops<H, I>(input: Option<&[u8]>, chains: I) -> Result<Vec<u8>, OpError>
where
	H: Hasher,
	I: IntoIterator,
	I::Item: AsRef<[Operator]>,
{
	let values = input.map(|input| single(input.to_vec())).unwrap_or_default();
	run_stack::<H, _>(values, chains)?.into_iter().next().ok_or(OpError::EmptyResult)
}
