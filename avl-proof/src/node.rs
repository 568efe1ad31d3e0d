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

//! Proof descriptors of tree nodes and the operator chains recomputing their digests.
//!
//! Leaf digest:
//! `hash(int8(0) || varint(1) || varint(version) || bytes(key) || bytes(hash(value)))`.
//!
//! Inner digest:
//! `hash(int8(height) || varint(size) || varint(version) || bytes(left) || bytes(right))`.
//!
//! In a proof one child digest of every inner node is known (the sibling) and the other one is
//! the digest computed so far from the leaf. The known left sibling ends up in the prefix of the
//! node's hash round, the known right sibling in its suffix.

use crate::codec::{encode_byte_slice, encode_int8, encode_uvarint, encode_varint};
use crate::op::{run_ops, OpError, Operator, Round};
use crate::rstd::{vec, vec::Vec};
use node_db::Hasher;

/// Known child of an inner node on a proof path.
#[derive(PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum Sibling<HO> {
	/// The path continues right; this is the left child digest.
	Left(HO),
	/// The path continues left; this is the right child digest.
	Right(HO),
}

/// One inner node of a path to a leaf.
#[derive(PartialEq, Eq, Clone)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct ProofInnerNode<HO> {
	/// Height of the node, at least 1.
	pub height: i8,
	/// Number of leaves below the node.
	pub size: i64,
	/// Version the node was written at.
	pub version: i64,
	/// Digest of the child the path does not go through.
	pub sibling: Sibling<HO>,
}

impl<HO: AsRef<[u8]>> ProofInnerNode<HO> {
	/// Left child digest, if it is the known sibling.
	pub fn left(&self) -> Option<&HO> {
		match &self.sibling {
			Sibling::Left(hash) => Some(hash),
			Sibling::Right(_) => None,
		}
	}

	/// Right child digest, if it is the known sibling.
	pub fn right(&self) -> Option<&HO> {
		match &self.sibling {
			Sibling::Right(hash) => Some(hash),
			Sibling::Left(_) => None,
		}
	}

	/// The hash round of this node, taking the length-prefixed child digest as input.
	pub fn round(&self) -> Round {
		let mut prefix = Vec::new();
		let mut suffix = Vec::new();
		encode_int8(&mut prefix, self.height);
		encode_varint(&mut prefix, self.size);
		encode_varint(&mut prefix, self.version);
		match &self.sibling {
			Sibling::Left(left) => encode_byte_slice(&mut prefix, left.as_ref()),
			Sibling::Right(right) => encode_byte_slice(&mut suffix, right.as_ref()),
		}
		Round { prefix, suffix }
	}

	/// Same as `round`, but taking the raw child digest of `hash_len` bytes as input.
	pub(crate) fn unprefixed_round(&self, hash_len: usize) -> Round {
		let mut round = self.round();
		// Child digests have a fixed length, so their length prefix can be baked in.
		encode_uvarint(&mut round.prefix, hash_len as u64);
		round
	}

	/// Operators computing this node's digest from the digest of the child on the path.
	pub fn proof_ops(&self) -> Vec<Operator> {
		vec![Operator::LengthPrefix, Operator::HashChain { key: None, rounds: vec![self.round()] }]
	}

	/// Digest of this node given the digest of the child on the path.
	pub fn hash<H: Hasher<Out = HO>>(&self, child: &[u8]) -> Result<HO, OpError> {
		let out = run_ops::<H, _>(Some(child), &[self.proof_ops()])?;
		H::out_from_slice(&out).ok_or(OpError::InvalidInputs("digest length mismatch"))
	}
}

/// The leaf a proof is about.
#[derive(PartialEq, Eq, Clone)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct ProofLeafNode<HO> {
	/// Application key.
	pub key: Vec<u8>,
	/// Digest of the leaf value.
	pub value_hash: HO,
	/// Version the leaf was written at.
	pub version: i64,
}

impl<HO: AsRef<[u8]>> ProofLeafNode<HO> {
	fn round(&self) -> Round {
		let mut prefix = Vec::new();
		encode_int8(&mut prefix, 0);
		encode_varint(&mut prefix, 1);
		encode_varint(&mut prefix, self.version);
		Round { prefix, suffix: Vec::new() }
	}

	/// Operators computing the leaf digest from the raw value.
	pub fn proof_ops(&self) -> Vec<Operator> {
		vec![
			Operator::Digest,
			Operator::LengthPrefix,
			Operator::HashChain { key: Some(self.key.clone()), rounds: vec![self.round()] },
		]
	}

	/// Operators computing the leaf digest from an empty stack, sourcing the value hash from the
	/// descriptor itself. Also accepts a stack holding exactly the value hash.
	pub fn proof_ops_range(&self) -> Vec<Operator> {
		vec![
			Operator::AssertValues { values: vec![self.value_hash.as_ref().to_vec()] },
			Operator::LengthPrefix,
			Operator::HashChain { key: Some(self.key.clone()), rounds: vec![self.round()] },
		]
	}

	/// Digest of this leaf holding `value`.
	pub fn hash<H: Hasher<Out = HO>>(&self, value: &[u8]) -> Result<HO, OpError> {
		let out = run_ops::<H, _>(Some(value), &[self.proof_ops()])?;
		H::out_from_slice(&out).ok_or(OpError::InvalidInputs("digest length mismatch"))
	}
}

#[cfg(feature = "std")]
impl<HO: AsRef<[u8]>> ProofInnerNode<HO> {
	fn fmt_indented(&self, f: &mut std::fmt::Formatter<'_>, indent: &str) -> std::fmt::Result {
		let hex = |hash: Option<&HO>| hash.map(|h| crate::ToHex(h.as_ref()).to_string()).unwrap_or_default();
		writeln!(f, "ProofInnerNode{{")?;
		writeln!(f, "{}  Height:  {}", indent, self.height)?;
		writeln!(f, "{}  Size:    {}", indent, self.size)?;
		writeln!(f, "{}  Version: {}", indent, self.version)?;
		writeln!(f, "{}  Left:    {}", indent, hex(self.left()))?;
		writeln!(f, "{}  Right:   {}", indent, hex(self.right()))?;
		write!(f, "{}}}", indent)
	}
}

#[cfg(feature = "std")]
impl<HO: AsRef<[u8]>> std::fmt::Display for ProofInnerNode<HO> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let indent = if f.alternate() { "  " } else { "" };
		self.fmt_indented(f, indent)
	}
}

#[cfg(feature = "std")]
impl<HO: AsRef<[u8]>> std::fmt::Display for ProofLeafNode<HO> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let indent = if f.alternate() { "  " } else { "" };
		writeln!(f, "ProofLeafNode{{")?;
		writeln!(f, "{}  Key:       {}", indent, crate::ToHex(&self.key))?;
		writeln!(f, "{}  ValueHash: {}", indent, crate::ToHex(self.value_hash.as_ref()))?;
		writeln!(f, "{}  Version:   {}", indent, self.version)?;
		write!(f, "{}}}", indent)
	}
}
