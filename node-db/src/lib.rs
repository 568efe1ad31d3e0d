// Copyright 2017, 2018 Parity Technologies
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

//! Hashing and read-only node access for versioned AVL trees.
//!
//! Proof construction never mutates a tree: it only needs to resolve the children of an inner
//! node and read the metadata every node commits to. This crate defines that narrow interface so
//! that the proof machinery stays independent of how (and where) nodes are stored.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
use std::fmt::Debug;
#[cfg(feature = "std")]
use std::hash;
#[cfg(not(feature = "std"))]
use core::hash;

#[cfg(feature = "std")]
pub trait MaybeDebug: Debug {}
#[cfg(feature = "std")]
impl<T: Debug> MaybeDebug for T {}
#[cfg(not(feature = "std"))]
pub trait MaybeDebug {}
#[cfg(not(feature = "std"))]
impl<T> MaybeDebug for T {}

/// Trait describing an object that can hash a slice of bytes. Used to abstract
/// other types over the hashing algorithm. Defines a single `hash` method and an
/// `Out` associated type with the necessary bounds.
pub trait Hasher: Sync + Send {
	/// The output type of the `Hasher`
	type Out: AsRef<[u8]> + AsMut<[u8]> + Default + MaybeDebug + PartialEq + Eq
		+ hash::Hash + Send + Sync + Clone + Copy;
	/// The length in bytes of the `Hasher` output.
	const LENGTH: usize;

	/// Compute the hash of the provided slice of bytes returning the `Out` type of the `Hasher`.
	fn hash(x: &[u8]) -> Self::Out;

	/// Interpret a byte slice as a digest, if it has the right length.
	fn out_from_slice(x: &[u8]) -> Option<Self::Out> {
		if x.len() != Self::LENGTH {
			return None;
		}
		let mut out = Self::Out::default();
		out.as_mut().copy_from_slice(x);
		Some(out)
	}
}

/// A node of a versioned AVL tree, as seen by proof construction.
///
/// Leaves have height 0 and carry the application key and value. Inner nodes carry the
/// separator key: the least key of their right subtree.
pub trait TreeNode<HO> {
	/// Application key of a leaf, or separator key of an inner node.
	fn key(&self) -> &[u8];
	/// Height of the subtree rooted at this node, 0 for leaves.
	fn height(&self) -> i8;
	/// Number of leaves in the subtree rooted at this node.
	fn size(&self) -> i64;
	/// Version at which this node was written.
	fn version(&self) -> i64;
	/// The node digest, as committed to by its parent.
	fn hash(&self) -> &HO;
	/// The raw value. Only leaves have one.
	fn value(&self) -> Option<&[u8]>;

	/// Whether this node is a leaf.
	fn is_leaf(&self) -> bool {
		self.height() == 0
	}
}

/// Read-only access to the children of inner nodes.
///
/// Implementations must guarantee that the contents of a node reachable from a given root never
/// change, so that concurrent readers can build proofs against the same snapshot.
pub trait NodeDBRef<H: Hasher> {
	/// Node handle type.
	type Node: TreeNode<H::Out>;

	/// Left child of an inner node, `None` if it cannot be resolved.
	fn left_child(&self, node: &Self::Node) -> Option<&Self::Node>;

	/// Right child of an inner node, `None` if it cannot be resolved.
	fn right_child(&self, node: &Self::Node) -> Option<&Self::Node>;
}

impl<'a, H: Hasher, D: NodeDBRef<H>> NodeDBRef<H> for &'a D {
	type Node = D::Node;

	fn left_child(&self, node: &Self::Node) -> Option<&Self::Node> { (**self).left_child(node) }
	fn right_child(&self, node: &Self::Node) -> Option<&Self::Node> { (**self).right_child(node) }
}

impl<'a, HO, N: TreeNode<HO>> TreeNode<HO> for &'a N {
	fn key(&self) -> &[u8] { (**self).key() }
	fn height(&self) -> i8 { (**self).height() }
	fn size(&self) -> i64 { (**self).size() }
	fn version(&self) -> i64 { (**self).version() }
	fn hash(&self) -> &HO { (**self).hash() }
	fn value(&self) -> Option<&[u8]> { (**self).value() }
}
