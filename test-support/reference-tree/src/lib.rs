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

//! Reference versioned AVL trees.
//!
//! Trees are rebuilt from the full key set at every version, perfectly balanced, and hashed
//! straight from the node encoding rather than through proof operators, so proofs can be checked
//! against digests computed independently.

use avl_proof::{
	codec::{encode_byte_slice, encode_int8, encode_varint},
	TreeLayout,
};
use log::debug;
use memory_node_db::{MemoryNodeDB, NodeData};
use node_db::{Hasher, TreeNode};
use std::collections::BTreeMap;

pub use keccak_hasher::KeccakHasher;
pub use sha256_hasher::Sha256Hasher;

/// Apply a test method on every test layout.
#[macro_export]
macro_rules! test_layouts {
	($test:ident, $test_internal:ident) => {
		#[test]
		fn $test() {
			eprintln!("Running with layout `Sha256Layout`");
			$test_internal::<$crate::Sha256Layout>();
			eprintln!("Running with layout `Sha256CollapsedLayout`");
			$test_internal::<$crate::Sha256CollapsedLayout>();
			eprintln!("Running with layout `KeccakLayout`");
			$test_internal::<$crate::KeccakLayout>();
		}
	};
}

/// SHA-256 digests, one operator pair per inner level.
#[derive(Default, Clone)]
pub struct Sha256Layout;

impl TreeLayout for Sha256Layout {
	const COLLAPSE_PATH: bool = false;
	type Hash = Sha256Hasher;
}

/// SHA-256 digests, the whole path as a single hash chain.
#[derive(Default, Clone)]
pub struct Sha256CollapsedLayout;

impl TreeLayout for Sha256CollapsedLayout {
	const COLLAPSE_PATH: bool = true;
	type Hash = Sha256Hasher;
}

/// Keccak-256 digests.
#[derive(Default, Clone)]
pub struct KeccakLayout;

impl TreeLayout for KeccakLayout {
	const COLLAPSE_PATH: bool = false;
	type Hash = KeccakHasher;
}

/// Digest of a leaf.
pub fn leaf_hash<H: Hasher>(key: &[u8], value: &[u8], version: i64) -> H::Out {
	let mut encoded = Vec::new();
	encode_int8(&mut encoded, 0);
	encode_varint(&mut encoded, 1);
	encode_varint(&mut encoded, version);
	encode_byte_slice(&mut encoded, key);
	encode_byte_slice(&mut encoded, H::hash(value).as_ref());
	H::hash(&encoded)
}

/// Digest of an inner node.
pub fn inner_hash<H: Hasher>(height: i8, size: i64, version: i64, left: &[u8], right: &[u8]) -> H::Out {
	let mut encoded = Vec::new();
	encode_int8(&mut encoded, height);
	encode_varint(&mut encoded, size);
	encode_varint(&mut encoded, version);
	encode_byte_slice(&mut encoded, left);
	encode_byte_slice(&mut encoded, right);
	H::hash(&encoded)
}

/// A versioned tree over a `MemoryNodeDB`.
///
/// Leaves keep the version at which their value last changed and inner nodes carry the highest
/// version below them, so unchanged subtrees hash the same and are shared between versions.
pub struct ReferenceTree<H: Hasher> {
	db: MemoryNodeDB<H>,
	leaves: BTreeMap<Vec<u8>, (Vec<u8>, i64)>,
}

impl<H: Hasher> Default for ReferenceTree<H> {
	fn default() -> Self {
		ReferenceTree { db: MemoryNodeDB::default(), leaves: BTreeMap::new() }
	}
}

impl<H: Hasher> ReferenceTree<H> {
	/// Build a tree holding `entries` at a single version.
	pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>, version: i64) -> Self
	where
		K: AsRef<[u8]>,
		V: AsRef<[u8]>,
	{
		let mut tree = Self::default();
		tree.commit(entries, version);
		tree
	}

	/// Commit the complete key set of `version`. Later duplicates of a key win.
	///
	/// Returns the root digest. An empty set has no root and is not committed: the tree stays at
	/// its latest version and `None` is returned.
	pub fn commit<K, V>(&mut self, entries: impl IntoIterator<Item = (K, V)>, version: i64) -> Option<H::Out>
	where
		K: AsRef<[u8]>,
		V: AsRef<[u8]>,
	{
		let mut leaves = BTreeMap::new();
		for (key, value) in entries {
			let (key, value) = (key.as_ref().to_vec(), value.as_ref().to_vec());
			let leaf_version = match self.leaves.get(&key) {
				Some((previous, previous_version)) if *previous == value => *previous_version,
				_ => version,
			};
			leaves.insert(key, (value, leaf_version));
		}
		if leaves.is_empty() {
			return None;
		}
		self.leaves = leaves;
		let sorted: Vec<_> = self.leaves.iter().collect();
		let root = build(&mut self.db, &sorted);
		self.db.set_root(version, root.hash);
		debug!(target: "reference-tree", "version {}: {} leaves, height {}", version, root.size, root.height);
		Some(root.hash)
	}

	pub fn db(&self) -> &MemoryNodeDB<H> {
		&self.db
	}

	/// Mutable access to the store, for tests corrupting it.
	pub fn db_mut(&mut self) -> &mut MemoryNodeDB<H> {
		&mut self.db
	}

	/// Root node of `version`.
	pub fn root(&self, version: i64) -> Option<&NodeData<H::Out>> {
		self.db.root(version)
	}

	/// Root node of the latest version.
	pub fn latest_root(&self) -> Option<&NodeData<H::Out>> {
		self.db.latest().and_then(|(version, _)| self.db.root(version))
	}

	/// Entries of the latest version, sorted by key.
	pub fn entries(&self) -> impl Iterator<Item = (&[u8], &[u8])> + '_ {
		self.leaves.iter().map(|(k, (v, _))| (&k[..], &v[..]))
	}
}

struct Built<HO> {
	hash: HO,
	key: Vec<u8>,
	height: i8,
	size: i64,
	version: i64,
}

fn build<H: Hasher>(db: &mut MemoryNodeDB<H>, leaves: &[(&Vec<u8>, &(Vec<u8>, i64))]) -> Built<H::Out> {
	if let [(key, (value, version))] = leaves {
		let hash = leaf_hash::<H>(key, value, *version);
		db.insert(NodeData {
			key: key.to_vec(),
			value: Some(value.clone()),
			height: 0,
			size: 1,
			version: *version,
			hash,
			left: None,
			right: None,
		});
		return Built { hash, key: key.to_vec(), height: 0, size: 1, version: *version };
	}

	let (left, right) = leaves.split_at(leaves.len() / 2);
	let left = build(db, left);
	let right = build(db, right);
	let height = left.height.max(right.height) + 1;
	let size = left.size + right.size;
	let version = left.version.max(right.version);
	let hash = inner_hash::<H>(height, size, version, left.hash.as_ref(), right.hash.as_ref());
	db.insert(NodeData {
		key: right.key.clone(),
		value: None,
		height,
		size,
		version,
		hash,
		left: Some(left.hash),
		right: Some(right.hash),
	});
	Built { hash, key: left.key, height, size, version }
}

/// Leaves of the subtree under `node`, in key order.
pub fn collect_leaves<'a, H: Hasher>(
	db: &'a MemoryNodeDB<H>,
	node: &'a NodeData<H::Out>,
) -> Vec<&'a NodeData<H::Out>> {
	let mut leaves = Vec::new();
	let mut stack = vec![node];
	while let Some(node) = stack.pop() {
		if node.is_leaf() {
			leaves.push(node);
			continue;
		}
		stack.extend(node.right.as_ref().and_then(|h| db.get(h)));
		stack.extend(node.left.as_ref().and_then(|h| db.get(h)));
	}
	leaves
}
