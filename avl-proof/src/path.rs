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

//! Paths from a root to a leaf.

use crate::node::{ProofInnerNode, Sibling};
use crate::op::{Operator, Round};
use crate::rstd::{vec, vec::Vec};
use crate::{ToHex, TreeLayout};
use log::trace;
use node_db::{Hasher, NodeDBRef, TreeNode};

/// Inner nodes from the root down to the parent of a leaf.
///
/// Index 0 is the root. Digests are computed the other way round, so chains are emitted from
/// the last entry up to the first.
#[derive(PartialEq, Eq, Clone, Default)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct PathToLeaf<HO>(pub Vec<ProofInnerNode<HO>>);

impl<HO: AsRef<[u8]>> PathToLeaf<HO> {
	/// Number of inner nodes on the path.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Whether the leaf is the root itself.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Inner nodes, root first.
	pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ProofInnerNode<HO>> {
		self.0.iter()
	}

	/// Whether the path only ever descends left, i.e. it leads to the least leaf.
	pub fn is_leftmost(&self) -> bool {
		self.iter().all(|node| node.left().is_none())
	}

	/// Whether the path only ever descends right, i.e. it leads to the greatest leaf.
	pub fn is_rightmost(&self) -> bool {
		self.iter().all(|node| node.right().is_none())
	}

	/// Whether `next` leads to the leaf directly following the one this path leads to.
	///
	/// Both paths must be authentic paths of the same tree. They agree down to the node where
	/// this one turns left and `next` turns right; below it this path only turns right and
	/// `next` only turns left.
	pub fn precedes(&self, next: &Self) -> bool {
		let turns_left = |node: &ProofInnerNode<HO>| node.right().is_some();
		let split = match self.iter().zip(next.iter()).position(|(a, b)| turns_left(a) != turns_left(b)) {
			Some(split) => split,
			None => return false,
		};
		turns_left(&self.0[split])
			&& self.0[split + 1..].iter().all(|node| !turns_left(node))
			&& next.0[split + 1..].iter().all(turns_left)
	}

	/// Operators computing the root digest from the leaf digest.
	pub fn proof_ops<L: TreeLayout>(&self) -> Vec<Operator> {
		if L::COLLAPSE_PATH {
			if self.is_empty() {
				return Vec::new();
			}
			let rounds: Vec<Round> = self.iter()
				.rev()
				.map(|node| node.unprefixed_round(<L::Hash as Hasher>::LENGTH))
				.collect();
			vec![Operator::HashChain { key: None, rounds }]
		} else {
			self.iter().rev().flat_map(|node| node.proof_ops()).collect()
		}
	}
}

#[cfg(feature = "std")]
impl<HO: AsRef<[u8]>> std::fmt::Display for PathToLeaf<HO> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		writeln!(f, "PathToLeaf{{")?;
		for (i, node) in self.iter().enumerate() {
			writeln!(f, "  {}:{:#}", i, node)?;
		}
		write!(f, "}}")
	}
}

/// Errors raised while walking down to a leaf.
#[derive(PartialEq, Eq, Clone)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum PathError<N, HO> {
	/// The key is not in the tree. `leaf` is where the search landed: the greatest leaf with a
	/// smaller key, or the least leaf if every key is greater. `path` leads to it.
	KeyNotFound {
		/// Landing leaf.
		leaf: N,
		/// Path to the landing leaf.
		path: PathToLeaf<HO>,
	},
	/// A child of the inner node with this digest could not be resolved.
	IncompleteDatabase(HO),
}

#[cfg(feature = "std")]
impl<N, HO> std::fmt::Display for PathError<N, HO>
where
	N: TreeNode<HO>,
	HO: AsRef<[u8]>,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			PathError::KeyNotFound { leaf, .. } =>
				write!(f, "Key does not exist, search landed on leaf key={}", ToHex(leaf.key())),
			PathError::IncompleteDatabase(hash) =>
				write!(f, "Database missing a child of node {}", ToHex(hash.as_ref())),
		}
	}
}

#[cfg(feature = "std")]
impl<N, HO> std::error::Error for PathError<N, HO>
where
	N: TreeNode<HO> + std::fmt::Debug,
	HO: AsRef<[u8]> + std::fmt::Debug,
{
}

/// Walk from `root` to the leaf holding `key`, recording every inner node on the way together
/// with the digest of the child not taken.
///
/// Inner nodes route keys strictly smaller than their own key to the left and all others to
/// the right.
pub fn build_path<'a, H, D>(
	db: &'a D,
	root: &'a D::Node,
	key: &[u8],
) -> Result<(PathToLeaf<H::Out>, &'a D::Node), PathError<&'a D::Node, H::Out>>
where
	H: Hasher,
	D: NodeDBRef<H>,
{
	let mut path = Vec::new();
	match path_to_leaf::<H, D>(db, root, key, &mut path) {
		Ok(leaf) => Ok((PathToLeaf(path), leaf)),
		Err(Descent::Missing(leaf)) => Err(PathError::KeyNotFound { leaf, path: PathToLeaf(path) }),
		Err(Descent::Incomplete(hash)) => Err(PathError::IncompleteDatabase(hash)),
	}
}

/// Walk from `root` to the leaf directly following the one a search for `key` lands on.
///
/// Returns `None` if the search lands on the greatest leaf. Fails with the digest of an inner
/// node whose children could not be resolved.
pub fn build_successor_path<'a, H, D>(
	db: &'a D,
	root: &'a D::Node,
	key: &[u8],
) -> Result<Option<(PathToLeaf<H::Out>, &'a D::Node)>, H::Out>
where
	H: Hasher,
	D: NodeDBRef<H>,
{
	let mut path = Vec::new();
	// Deepest left turn: its depth, the digest of its left child and its right child.
	let mut turn = None;
	let mut node = root;
	while !node.is_leaf() {
		let (left, right) = children::<H, D>(db, node)?;
		if key < node.key() {
			turn = Some((path.len(), *left.hash(), right));
			path.push(inner_node(node, Sibling::Right(*right.hash())));
			node = left;
		} else {
			path.push(inner_node(node, Sibling::Left(*left.hash())));
			node = right;
		}
	}
	let (depth, left, mut node) = match turn {
		Some(turn) => turn,
		None => return Ok(None),
	};
	path.truncate(depth + 1);
	path[depth].sibling = Sibling::Left(left);
	while !node.is_leaf() {
		let (left, right) = children::<H, D>(db, node)?;
		path.push(inner_node(node, Sibling::Right(*right.hash())));
		node = left;
	}
	trace!(target: "avl-proof", "successor of {:?} is {:?}", ToHex(key), ToHex(node.key()));
	Ok(Some((PathToLeaf(path), node)))
}

fn children<'a, H, D>(db: &'a D, node: &'a D::Node) -> Result<(&'a D::Node, &'a D::Node), H::Out>
where
	H: Hasher,
	D: NodeDBRef<H>,
{
	match (db.left_child(node), db.right_child(node)) {
		(Some(left), Some(right)) => Ok((left, right)),
		_ => Err(*node.hash()),
	}
}

fn inner_node<HO, N: TreeNode<HO>>(node: &N, sibling: Sibling<HO>) -> ProofInnerNode<HO> {
	ProofInnerNode { height: node.height(), size: node.size(), version: node.version(), sibling }
}

enum Descent<'a, N, HO> {
	Missing(&'a N),
	Incomplete(HO),
}

fn path_to_leaf<'a, H, D>(
	db: &'a D,
	node: &'a D::Node,
	key: &[u8],
	path: &mut Vec<ProofInnerNode<H::Out>>,
) -> Result<&'a D::Node, Descent<'a, D::Node, H::Out>>
where
	H: Hasher,
	D: NodeDBRef<H>,
{
	if node.is_leaf() {
		return if node.key() == key {
			Ok(node)
		} else {
			trace!(target: "avl-proof", "key {:?} not found, landed on {:?}", ToHex(key), ToHex(node.key()));
			Err(Descent::Missing(node))
		};
	}

	let (left, right) = children::<H, D>(db, node).map_err(Descent::Incomplete)?;
	let (sibling, next) = if key < node.key() {
		(Sibling::Right(*right.hash()), left)
	} else {
		(Sibling::Left(*left.hash()), right)
	};
	trace!(
		target: "avl-proof",
		"descend {} at height {}",
		if let Sibling::Right(_) = sibling { "left" } else { "right" },
		node.height(),
	);
	path.push(inner_node(node, sibling));
	path_to_leaf::<H, D>(db, next, key, path)
}
