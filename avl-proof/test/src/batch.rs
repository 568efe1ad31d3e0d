// Copyright 2020 Parity Technologies
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

use avl_proof::{
	run_stack, verify_batch, Operator, Partition, Stack, TreeLayout, ValueProof, VerifyError,
};
use reference_tree::{test_layouts, Sha256Layout};

use crate::{build_tree, prove, root_hash, test_entries};

test_layouts!(batch_of_every_key_verifies, batch_of_every_key_verifies_internal);
fn batch_of_every_key_verifies_internal<L: TreeLayout>() {
	let tree = build_tree::<L>(&test_entries());
	let root = root_hash::<L>(&tree);
	let items: Vec<_> = test_entries()
		.into_iter()
		.map(|(key, value)| (value, prove::<L>(&tree, key).unwrap()))
		.collect();
	verify_batch::<L, _>(&root, &items).unwrap();
	verify_batch::<L, _>(&root, &items[2..4]).unwrap();
}

test_layouts!(batch_with_wrong_value_is_rejected, batch_with_wrong_value_is_rejected_internal);
fn batch_with_wrong_value_is_rejected_internal<L: TreeLayout>() {
	let tree = build_tree::<L>(&test_entries());
	let root = root_hash::<L>(&tree);
	let mut items: Vec<(Vec<u8>, _)> = test_entries()
		.into_iter()
		.map(|(key, value)| (value.to_vec(), prove::<L>(&tree, key).unwrap()))
		.collect();
	items[3].0 = b"kitten".to_vec();
	match verify_batch::<L, _>(&root, &items) {
		Err(VerifyError::InvalidProof(computed)) => assert_ne!(computed, root),
		result => panic!("unexpected result: {:?}", result),
	}
}

test_layouts!(batch_across_roots_is_rejected, batch_across_roots_is_rejected_internal);
fn batch_across_roots_is_rejected_internal<L: TreeLayout>() {
	let tree = build_tree::<L>(&test_entries());
	let other = build_tree::<L>(&test_entries()[..3]);
	let root = root_hash::<L>(&tree);
	let items = vec![
		(&b"verb"[..], prove::<L>(&tree, b"do").unwrap()),
		(&b"bravo"[..], prove::<L>(&other, b"bravo").unwrap()),
	];
	assert_eq!(
		verify_batch::<L, _>(&root, &items),
		Err(VerifyError::InvalidRoot(root_hash::<L>(&other))),
	);
}

#[test]
fn empty_batch_is_trivially_valid() {
	let tree = build_tree::<Sha256Layout>(&test_entries());
	let root = root_hash::<Sha256Layout>(&tree);
	let items: Vec<(&[u8], ValueProof<[u8; 32]>)> = Vec::new();
	verify_batch::<Sha256Layout, _>(&root, &items).unwrap();
}

#[test]
fn batch_apply_runs_partitions_in_order() {
	let tree = build_tree::<Sha256Layout>(&test_entries());
	let root = root_hash::<Sha256Layout>(&tree);
	let alfa = prove::<Sha256Layout>(&tree, b"alfa").unwrap();
	let house = prove::<Sha256Layout>(&tree, b"house").unwrap();
	let batch = Operator::BatchApply {
		partitions: vec![
			Partition { arity: 1, ops: alfa.proof_ops::<Sha256Layout>().concat() },
			Partition { arity: 1, ops: house.proof_ops::<Sha256Layout>().concat() },
		],
	};
	let stack: Stack = vec![vec![0; 32], b"building".to_vec()].into_iter().collect();
	let output = run_stack::<<Sha256Layout as TreeLayout>::Hash, _>(stack.clone(), &[vec![batch.clone()]]).unwrap();
	assert_eq!(output.len(), 2);
	assert_eq!(output[0], root.to_vec());
	assert_eq!(output[1], root.to_vec());

	// Swapped inputs reach other digests.
	let swapped: Stack = stack.into_iter().rev().collect();
	let output = run_stack::<<Sha256Layout as TreeLayout>::Hash, _>(swapped, &[vec![batch]]).unwrap();
	assert_ne!(output[0], root.to_vec());
	assert_ne!(output[1], root.to_vec());
}
