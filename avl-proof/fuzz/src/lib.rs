// Copyright 2017, 2020 Parity Technologies
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

use arbitrary::Arbitrary;
use avl_proof::{
	decode_records, encode_records, generate_proof, run_ops, verify_proof, verify_value_hash,
	Operator, Sibling, TreeLayout, ValueProof,
};
use node_db::Hasher;
use reference_tree::ReferenceTree;
use std::collections::BTreeMap;

/// Split fuzzer input into sorted, unique entries.
///
/// Input is `(min key len, max key len)` followed by `(key len, key, 2-byte value)` triples.
pub fn fuzz_to_data(input: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
	let mut result = BTreeMap::new();
	let (mut min_len, mut max_len) = match input {
		[a, b, ..] => ((*a & 31) as usize + 1, (*b & 31) as usize + 1),
		_ => return Vec::new(),
	};
	if max_len < min_len {
		std::mem::swap(&mut min_len, &mut max_len);
	}
	let mut ix = 2;
	while let Some(len) = input.get(ix) {
		let len = ((*len & 31) as usize + 1).max(min_len).min(max_len);
		ix += 1;
		if input.len() < ix + len + 2 {
			break;
		}
		let key = input[ix..ix + len].to_vec();
		ix += len;
		result.insert(key, input[ix..ix + 2].to_vec());
		ix += 2;
	}
	result.into_iter().collect()
}

/// Decoding arbitrary bytes as operator records must fail cleanly, and whatever decodes must
/// survive re-encoding and run without panicking.
pub fn fuzz_decode_records<H: Hasher>(input: &[u8]) {
	let records = match decode_records(input) {
		Ok(records) => records,
		Err(_) => return,
	};
	assert_eq!(decode_records(&encode_records(&records)).as_ref(), Ok(&records));
	let ops: Result<Vec<_>, _> = records.iter().map(Operator::decode).collect();
	if let Ok(ops) = ops {
		let reencoded: Vec<_> = ops.iter().map(Operator::encode).collect();
		let again: Vec<_> = reencoded.iter().filter_map(|r| Operator::decode(r).ok()).collect();
		assert_eq!(ops, again);
		let _ = run_ops::<H, _>(Some(input), &[&ops[..]]);
		let _ = run_ops::<H, _>(None, &[&ops[..]]);
	}
}

fn build<L: TreeLayout>(input: &[u8]) -> Option<(ReferenceTree<L::Hash>, Vec<(Vec<u8>, Vec<u8>)>)> {
	let data = fuzz_to_data(input);
	if data.is_empty() {
		return None;
	}
	let tree = ReferenceTree::from_entries(data.iter().cloned(), 1);
	Some((tree, data))
}

fn prove<L: TreeLayout>(
	tree: &ReferenceTree<L::Hash>,
	key: &[u8],
) -> ValueProof<<L::Hash as Hasher>::Out> {
	let root = tree.root(1).expect("tree is not empty");
	generate_proof::<L::Hash, _>(tree.db(), root, key).expect("key is in the tree")
}

/// Every key of a tree built from fuzzer input proves and verifies.
pub fn fuzz_that_verify_accepts_valid_proofs<L: TreeLayout>(input: &[u8]) {
	let (tree, data) = match build::<L>(input) {
		Some(built) => built,
		None => return,
	};
	let root = tree.root(1).expect("tree is not empty").hash;
	for (key, value) in data.iter() {
		let proof = prove::<L>(&tree, key);
		verify_proof::<L>(&root, value, &proof).expect("valid proof");
	}
}

/// A single change to a valid proof or to the value it is checked against.
#[derive(Debug, Clone, Arbitrary)]
pub enum Tamper {
	Value(Vec<u8>),
	SiblingByte { level: u8, byte: u8, mask: u8 },
	Height { level: u8, delta: i8 },
	Size { level: u8, delta: i64 },
	Version { level: u8, delta: i64 },
	LeafKey(Vec<u8>),
	LeafVersion(i64),
	ValueHashByte { byte: u8, mask: u8 },
	DropLevel(u8),
	FlipSide(u8),
}

/// No tampering with a valid proof ever verifies.
pub fn fuzz_that_verify_rejects_tampered_proofs<L: TreeLayout>(
	input: &[u8],
	pick: u16,
	tamper: Tamper,
) {
	let (tree, data) = match build::<L>(input) {
		Some(built) => built,
		None => return,
	};
	let root = tree.root(1).expect("tree is not empty").hash;
	let (key, value) = &data[pick as usize % data.len()];
	let mut proof = prove::<L>(&tree, key);
	let mut value = value.clone();
	let levels = proof.path.len();
	let level = |l: u8| if levels == 0 { None } else { Some(l as usize % levels) };

	let changed = match tamper {
		Tamper::Value(v) => {
			let changed = v != value;
			value = v;
			changed
		},
		Tamper::SiblingByte { level: l, byte, mask } => match level(l) {
			Some(l) if mask != 0 => {
				let hash = match &mut proof.path.0[l].sibling {
					Sibling::Left(hash) | Sibling::Right(hash) => hash,
				};
				let byte = byte as usize % <L::Hash as Hasher>::LENGTH;
				hash.as_mut()[byte] ^= mask;
				true
			},
			_ => false,
		},
		Tamper::Height { level: l, delta } => match level(l) {
			Some(l) if delta != 0 => {
				let node = &mut proof.path.0[l];
				node.height = node.height.wrapping_add(delta);
				true
			},
			_ => false,
		},
		Tamper::Size { level: l, delta } => match level(l) {
			Some(l) if delta != 0 => {
				let node = &mut proof.path.0[l];
				node.size = node.size.wrapping_add(delta);
				true
			},
			_ => false,
		},
		Tamper::Version { level: l, delta } => match level(l) {
			Some(l) if delta != 0 => {
				let node = &mut proof.path.0[l];
				node.version = node.version.wrapping_add(delta);
				true
			},
			_ => false,
		},
		Tamper::LeafKey(k) => {
			let changed = k != proof.leaf.key;
			proof.leaf.key = k;
			changed
		},
		Tamper::LeafVersion(v) => {
			let changed = v != proof.leaf.version;
			proof.leaf.version = v;
			changed
		},
		Tamper::ValueHashByte { byte, mask } => {
			// Only the value hash variant reads the hash recorded in the leaf.
			let byte = byte as usize % <L::Hash as Hasher>::LENGTH;
			proof.leaf.value_hash.as_mut()[byte] ^= mask;
			assert_eq!(verify_value_hash::<L>(&root, &proof).is_err(), mask != 0);
			return;
		},
		Tamper::DropLevel(l) => match level(l) {
			Some(l) => {
				proof.path.0.remove(l);
				true
			},
			None => false,
		},
		Tamper::FlipSide(l) => match level(l) {
			Some(l) => {
				let node = &mut proof.path.0[l];
				node.sibling = match node.sibling {
					Sibling::Left(hash) => Sibling::Right(hash),
					Sibling::Right(hash) => Sibling::Left(hash),
				};
				true
			},
			None => false,
		},
	};

	let result = verify_proof::<L>(&root, &value, &proof);
	if changed {
		assert!(result.is_err(), "tampered proof verified: {:?}", proof);
	} else {
		assert!(result.is_ok());
	}
}
