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

//! Memory-based `NodeDBRef` implementation.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

use foldhash::fast::FixedState;
use hashbrown::HashMap;
use node_db::{Hasher, NodeDBRef, TreeNode};

#[cfg(feature = "std")]
use std::{collections::BTreeMap, mem};

#[cfg(not(feature = "std"))]
use alloc::{collections::BTreeMap, vec::Vec};
#[cfg(not(feature = "std"))]
use core::mem;

/// A stored tree node. Children are referenced by digest.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct NodeData<HO> {
	/// Application key of a leaf, or least key of the right subtree of an inner node.
	pub key: Vec<u8>,
	/// Raw value, leaves only.
	pub value: Option<Vec<u8>>,
	pub height: i8,
	pub size: i64,
	pub version: i64,
	/// Digest of this node.
	pub hash: HO,
	pub left: Option<HO>,
	pub right: Option<HO>,
}

impl<HO> TreeNode<HO> for NodeData<HO> {
	fn key(&self) -> &[u8] {
		&self.key
	}

	fn height(&self) -> i8 {
		self.height
	}

	fn size(&self) -> i64 {
		self.size
	}

	fn version(&self) -> i64 {
		self.version
	}

	fn hash(&self) -> &HO {
		&self.hash
	}

	fn value(&self) -> Option<&[u8]> {
		self.value.as_deref()
	}
}

/// Memory-based node store keyed by node digest, with one root per version.
///
/// Nodes are shared between versions: inserting a node that is already present is a no-op.
///
/// # Example
/// ```rust
/// use memory_node_db::{MemoryNodeDB, NodeData};
/// use node_db::{Hasher, NodeDBRef};
/// use sha256_hasher::Sha256Hasher;
///
/// let mut db = MemoryNodeDB::<Sha256Hasher>::default();
/// let hash = Sha256Hasher::hash(b"leaf");
/// db.insert(NodeData {
///   key: b"a".to_vec(),
///   value: Some(b"1".to_vec()),
///   height: 0,
///   size: 1,
///   version: 1,
///   hash,
///   left: None,
///   right: None,
/// });
/// db.set_root(1, hash);
/// assert!(db.contains(&hash));
/// assert_eq!(db.root(1).map(|n| &n.key[..]), Some(&b"a"[..]));
/// ```
pub struct MemoryNodeDB<H: Hasher> {
	nodes: HashMap<H::Out, NodeData<H::Out>, FixedState>,
	roots: BTreeMap<i64, H::Out>,
}

impl<H: Hasher> Default for MemoryNodeDB<H> {
	fn default() -> Self {
		MemoryNodeDB { nodes: HashMap::with_hasher(FixedState::default()), roots: BTreeMap::new() }
	}
}

impl<H: Hasher> Clone for MemoryNodeDB<H> {
	fn clone(&self) -> Self {
		MemoryNodeDB { nodes: self.nodes.clone(), roots: self.roots.clone() }
	}
}

impl<H: Hasher> MemoryNodeDB<H> {
	/// Store `node` under its digest, returning the digest.
	pub fn insert(&mut self, node: NodeData<H::Out>) -> H::Out {
		let hash = node.hash;
		self.nodes.entry(hash).or_insert(node);
		hash
	}

	/// Remove the node with digest `hash`.
	pub fn remove(&mut self, hash: &H::Out) -> Option<NodeData<H::Out>> {
		self.nodes.remove(hash)
	}

	pub fn get(&self, hash: &H::Out) -> Option<&NodeData<H::Out>> {
		self.nodes.get(hash)
	}

	pub fn contains(&self, hash: &H::Out) -> bool {
		self.nodes.contains_key(hash)
	}

	/// Number of stored nodes.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Record `hash` as the root of `version`, returning the previous root of that version.
	pub fn set_root(&mut self, version: i64, hash: H::Out) -> Option<H::Out> {
		self.roots.insert(version, hash)
	}

	/// Root node of `version`, if the version exists and its root is stored.
	pub fn root(&self, version: i64) -> Option<&NodeData<H::Out>> {
		self.roots.get(&version).and_then(|hash| self.nodes.get(hash))
	}

	/// The latest version and its root digest.
	pub fn latest(&self) -> Option<(i64, H::Out)> {
		self.roots.iter().next_back().map(|(version, hash)| (*version, *hash))
	}

	/// Known versions, oldest first.
	pub fn versions(&self) -> impl Iterator<Item = i64> + '_ {
		self.roots.keys().copied()
	}

	/// Drop all nodes and roots.
	pub fn clear(&mut self) {
		self.nodes.clear();
		self.roots.clear();
	}

	/// Return the stored nodes, leaving the store empty.
	pub fn drain(&mut self) -> HashMap<H::Out, NodeData<H::Out>, FixedState> {
		self.roots.clear();
		mem::replace(&mut self.nodes, HashMap::with_hasher(FixedState::default()))
	}
}

impl<H: Hasher> NodeDBRef<H> for MemoryNodeDB<H> {
	type Node = NodeData<H::Out>;

	fn left_child(&self, node: &Self::Node) -> Option<&Self::Node> {
		node.left.as_ref().and_then(|hash| self.nodes.get(hash))
	}

	fn right_child(&self, node: &Self::Node) -> Option<&Self::Node> {
		node.right.as_ref().and_then(|hash| self.nodes.get(hash))
	}
}
