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
#![cfg_attr(not(feature = "std"), no_std)]

//! Merkle proofs for versioned, balanced binary search trees.
//!
//! A proof is a chain of [`Operator`]s: small, pure transformations over a stack of byte buffers.
//! Replaying the chain of a leaf followed by the chains of every inner node on its path
//! recomputes the root digest of the tree, which the verifier compares against a trusted root.
//!
//! The byte layout hashed for every node is fixed by [`node`]: leaves commit to
//! `int8(0) || varint(1) || varint(version) || bytes(key) || bytes(hash(value))` and inner nodes
//! to `int8(height) || varint(size) || varint(version) || bytes(left) || bytes(right)`.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
mod rstd {
	pub use std::{boxed, fmt, string, vec};
}

#[cfg(not(feature = "std"))]
mod rstd {
	pub use alloc::{boxed, string, vec};
	pub use core::fmt;
}

pub mod codec;
pub mod node;
pub mod op;
pub mod path;
pub mod proof;

pub use self::{
	node::{ProofInnerNode, ProofLeafNode, Sibling},
	op::{
		decode_records, encode_records, run_ops, run_stack, OpError, Operator, Partition,
		ProofOpRecord, Round, Stack,
	},
	path::{build_path, build_successor_path, PathError, PathToLeaf},
	proof::{
		generate_proof, verify_absence, verify_batch, verify_proof, verify_records,
		verify_value_hash, AbsenceProof, GenerateError, Successor, ValueProof, VerifyError,
	},
};
pub use node_db::{Hasher, NodeDBRef, TreeNode};

/// Hash type for a tree layout.
pub type TreeHash<L> = <<L as TreeLayout>::Hash as Hasher>::Out;

/// Proof layout.
///
/// Selects the hashing algorithm and the shape of the operator chains emitted for a path.
/// Every layout verifies exactly the same digests; layouts only differ in how many operators a
/// proof carries.
pub trait TreeLayout {
	/// Emit all inner levels of a path as a single multi-round `HashChain` operator instead of
	/// one `LengthPrefix` + `HashChain` pair per level.
	const COLLAPSE_PATH: bool;

	/// Hasher to use for the tree.
	type Hash: Hasher;
}

/// Hex rendering of a byte slice for `Debug`/`Display` output.
pub(crate) struct ToHex<'a>(pub(crate) &'a [u8]);

#[cfg(feature = "std")]
impl<'a> rstd::fmt::Display for ToHex<'a> {
	fn fmt(&self, fmt: &mut rstd::fmt::Formatter) -> rstd::fmt::Result {
		let hex = rustc_hex::ToHexIter::new(self.0.iter());
		for b in hex {
			write!(fmt, "{}", b)?;
		}
		Ok(())
	}
}

#[cfg(not(feature = "std"))]
impl<'a> rstd::fmt::Display for ToHex<'a> {
	fn fmt(&self, fmt: &mut rstd::fmt::Formatter) -> rstd::fmt::Result {
		for b in self.0 {
			write!(fmt, "{:02x}", b)?;
		}
		Ok(())
	}
}

impl<'a> rstd::fmt::Debug for ToHex<'a> {
	fn fmt(&self, fmt: &mut rstd::fmt::Formatter) -> rstd::fmt::Result {
		rstd::fmt::Display::fmt(self, fmt)
	}
}
