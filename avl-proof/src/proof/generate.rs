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

//! Generation of proofs.

use super::{AbsenceProof, Successor, ValueProof};
use crate::node::ProofLeafNode;
use crate::path::{build_path, build_successor_path, PathError};
use crate::rstd::{boxed::Box, vec::Vec};
use crate::ToHex;
use log::debug;
use node_db::{Hasher, NodeDBRef, TreeNode};

/// Errors raised while generating a proof.
#[derive(PartialEq, Eq, Clone)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum GenerateError<HO> {
	/// The key is not in the tree. Carries the proof anchoring its absence.
	KeyNotFound(Box<AbsenceProof<HO>>),
	/// A child of the inner node with this digest could not be resolved.
	IncompleteDatabase(HO),
	/// The leaf with this key carries no value.
	MissingValue(Vec<u8>),
}

#[cfg(feature = "std")]
impl<HO: AsRef<[u8]>> std::fmt::Display for GenerateError<HO> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			GenerateError::KeyNotFound(proof) => write!(
				f,
				"Key {} does not exist, nearest leaf is {}",
				ToHex(&proof.key),
				ToHex(&proof.anchor.key),
			),
			GenerateError::IncompleteDatabase(hash) =>
				write!(f, "Database missing a child of node {}", ToHex(hash.as_ref())),
			GenerateError::MissingValue(key) =>
				write!(f, "Leaf {} has no value", ToHex(key)),
		}
	}
}

#[cfg(feature = "std")]
impl<HO: AsRef<[u8]> + std::fmt::Debug> std::error::Error for GenerateError<HO> {}

fn leaf_descriptor<H, N>(leaf: &N) -> Result<ProofLeafNode<H::Out>, GenerateError<H::Out>>
where
	H: Hasher,
	N: TreeNode<H::Out>,
{
	let value = leaf.value().ok_or_else(|| GenerateError::MissingValue(leaf.key().to_vec()))?;
	Ok(ProofLeafNode { key: leaf.key().to_vec(), value_hash: H::hash(value), version: leaf.version() })
}

/// Generate a proof that `key` holds its current value in the tree rooted at `root`.
///
/// A missing key is reported as `GenerateError::KeyNotFound`, carrying the proof of the leaf the
/// search landed on and, when the key sorts after that leaf, of the leaf following it.
pub fn generate_proof<H, D>(
	db: &D,
	root: &D::Node,
	key: &[u8],
) -> Result<ValueProof<H::Out>, GenerateError<H::Out>>
where
	H: Hasher,
	D: NodeDBRef<H>,
{
	match build_path::<H, D>(db, root, key) {
		Ok((path, leaf)) => {
			debug!(target: "avl-proof", "proof for {:?}: {} inner nodes", ToHex(key), path.len());
			Ok(ValueProof { leaf: leaf_descriptor::<H, _>(leaf)?, path, root: *root.hash() })
		},
		Err(PathError::KeyNotFound { leaf, path }) => {
			debug!(
				target: "avl-proof",
				"absence proof for {:?} anchored at {:?}",
				ToHex(key),
				ToHex(leaf.key()),
			);
			let successor = if key > leaf.key() && !path.is_rightmost() {
				match build_successor_path::<H, D>(db, root, key).map_err(GenerateError::IncompleteDatabase)? {
					Some((path, leaf)) => Some(Successor { leaf: leaf_descriptor::<H, _>(leaf)?, path }),
					None => None,
				}
			} else {
				None
			};
			Err(GenerateError::KeyNotFound(Box::new(AbsenceProof {
				key: key.to_vec(),
				anchor: leaf_descriptor::<H, _>(leaf)?,
				path,
				successor,
				root: *root.hash(),
			})))
		},
		Err(PathError::IncompleteDatabase(hash)) => Err(GenerateError::IncompleteDatabase(hash)),
	}
}
