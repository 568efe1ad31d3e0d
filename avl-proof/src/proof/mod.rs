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

//! Generation and verification of proofs for single keys.
//!
//! A value proof is the descriptor of the leaf holding the key, the path from the root to that
//! leaf and the root digest the proof claims to lead to. The verifier turns the descriptors into
//! operator chains, replays them over the value it was given and compares the outcome with the
//! root it trusts. An absence proof has the same shape, anchored at the leaf the search for the
//! missing key landed on.

pub use self::generate::{generate_proof, GenerateError};
pub use self::verify::{
	verify_absence, verify_batch, verify_proof, verify_records, verify_value_hash, VerifyError,
};

mod generate;
mod verify;

use crate::node::ProofLeafNode;
use crate::op::{Operator, ProofOpRecord};
use crate::path::PathToLeaf;
use crate::rstd::{vec, vec::Vec};
use crate::TreeLayout;

/// Proof that a key holds a value under a root.
#[derive(PartialEq, Eq, Clone)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct ValueProof<HO> {
	/// The leaf holding the key.
	pub leaf: ProofLeafNode<HO>,
	/// Inner nodes from the root to the leaf.
	pub path: PathToLeaf<HO>,
	/// Root digest the proof leads to.
	pub root: HO,
}

impl<HO: AsRef<[u8]>> ValueProof<HO> {
	/// The key this proof is about.
	pub fn key(&self) -> &[u8] {
		&self.leaf.key
	}

	/// Operator chains computing the root digest from the value: the leaf chain, then the path
	/// chain.
	pub fn proof_ops<L: TreeLayout>(&self) -> Vec<Vec<Operator>> {
		vec![self.leaf.proof_ops(), self.path.proof_ops::<L>()]
	}

	/// Wire form of the operators computing the root digest from the value.
	pub fn proof_records<L: TreeLayout>(&self) -> Vec<ProofOpRecord> {
		self.proof_ops::<L>().iter().flatten().map(Operator::encode).collect()
	}
}

/// Proof that a key is not in the tree, anchored at the leaf its search landed on.
///
/// A key greater than the anchor is only proven absent together with the leaf following the
/// anchor, unless the anchor is the greatest leaf.
#[derive(PartialEq, Eq, Clone)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct AbsenceProof<HO> {
	/// The missing key.
	pub key: Vec<u8>,
	/// The greatest leaf with a smaller key, or the least leaf if there is none.
	pub anchor: ProofLeafNode<HO>,
	/// Inner nodes from the root to the anchor.
	pub path: PathToLeaf<HO>,
	/// The leaf directly following the anchor, if the missing key sorts after the anchor.
	pub successor: Option<Successor<HO>>,
	/// Root digest the proof leads to.
	pub root: HO,
}

/// A leaf of an absence proof bounding the missing key from above.
#[derive(PartialEq, Eq, Clone)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct Successor<HO> {
	/// The leaf.
	pub leaf: ProofLeafNode<HO>,
	/// Inner nodes from the root to the leaf.
	pub path: PathToLeaf<HO>,
}
