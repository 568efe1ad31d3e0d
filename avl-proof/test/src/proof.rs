// Copyright 2019, 2020 Parity Technologies
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
	codec, decode_records, encode_records, run_ops, verify_proof, verify_records, verify_value_hash,
	Hasher, OpError, Operator, Partition, Round, Sibling, TreeHash, TreeLayout, VerifyError,
};
use hex_literal::hex;
use reference_tree::{test_layouts, Sha256CollapsedLayout, Sha256Layout};

use crate::{build_tree, prove, root_hash, test_entries, Tree};

fn scenario<L: TreeLayout>() -> Tree<L> {
	build_tree::<L>(&[(b"alice", b"1"), (b"bob", b"2"), (b"carol", b"3")])
}

test_layouts!(every_key_verifies, every_key_verifies_internal);
fn every_key_verifies_internal<L: TreeLayout>() {
	let _ = env_logger::try_init();
	let tree = build_tree::<L>(&test_entries());
	let root = root_hash::<L>(&tree);
	for (key, value) in test_entries() {
		let proof = prove::<L>(&tree, key).unwrap();
		assert_eq!(proof.key(), key);
		assert_eq!(proof.root, root);
		verify_proof::<L>(&root, value, &proof).unwrap();
		let computed = run_ops::<L::Hash, _>(Some(value), proof.proof_ops::<L>()).unwrap();
		assert_eq!(computed, root.as_ref());
	}
}

test_layouts!(wrong_value_is_rejected, wrong_value_is_rejected_internal);
fn wrong_value_is_rejected_internal<L: TreeLayout>() {
	let tree = build_tree::<L>(&test_entries());
	let root = root_hash::<L>(&tree);
	let proof = prove::<L>(&tree, b"dog").unwrap();
	let values: [&[u8]; 4] = [b"puppies", b"verb", b"", &[0; 32]];
	for value in values.iter() {
		match verify_proof::<L>(&root, value, &proof) {
			Err(VerifyError::InvalidProof(computed)) => assert_ne!(computed, root),
			result => panic!("unexpected result: {:?}", result),
		}
	}
}

test_layouts!(other_tree_root_is_rejected, other_tree_root_is_rejected_internal);
fn other_tree_root_is_rejected_internal<L: TreeLayout>() {
	let tree = build_tree::<L>(&test_entries());
	let other = scenario::<L>();
	let other_root = root_hash::<L>(&other);
	let proof = prove::<L>(&tree, b"horse").unwrap();
	assert_eq!(
		verify_proof::<L>(&other_root, b"stallion", &proof),
		Err(VerifyError::InvalidRoot(proof.root)),
	);

	// A proof claiming the other root still has to reach it.
	let mut forged = proof.clone();
	forged.root = other_root;
	assert!(matches!(
		verify_proof::<L>(&other_root, b"stallion", &forged),
		Err(VerifyError::InvalidProof(_))
	));
}

test_layouts!(tampered_siblings_are_rejected, tampered_siblings_are_rejected_internal);
fn tampered_siblings_are_rejected_internal<L: TreeLayout>() {
	let tree = scenario::<L>();
	let root = root_hash::<L>(&tree);
	let proof = prove::<L>(&tree, b"bob").unwrap();
	verify_proof::<L>(&root, b"2", &proof).unwrap();
	assert_eq!(proof.path.len(), 2);

	for level in 0..proof.path.len() {
		for byte in 0..<L::Hash as Hasher>::LENGTH {
			let mut tampered = proof.clone();
			match &mut tampered.path.0[level].sibling {
				Sibling::Left(hash) | Sibling::Right(hash) => hash.as_mut()[byte] ^= 0x01,
			}
			assert!(matches!(
				verify_proof::<L>(&root, b"2", &tampered),
				Err(VerifyError::InvalidProof(_))
			));
		}
	}
}

test_layouts!(tampered_metadata_is_rejected, tampered_metadata_is_rejected_internal);
fn tampered_metadata_is_rejected_internal<L: TreeLayout>() {
	let tree = build_tree::<L>(&test_entries());
	let root = root_hash::<L>(&tree);
	let proof = prove::<L>(&tree, b"bravo").unwrap();

	let mut tampered = proof.clone();
	tampered.leaf.version += 1;
	assert!(verify_proof::<L>(&root, b"bravo", &tampered).is_err());

	let mut tampered = proof.clone();
	tampered.leaf.key = b"bravO".to_vec();
	assert!(verify_proof::<L>(&root, b"bravo", &tampered).is_err());

	let mut tampered = proof.clone();
	tampered.path.0[0].size += 1;
	assert!(verify_proof::<L>(&root, b"bravo", &tampered).is_err());

	let mut tampered = proof.clone();
	tampered.path.0.remove(0);
	assert!(verify_proof::<L>(&root, b"bravo", &tampered).is_err());

	let mut tampered = proof;
	tampered.path.0[0].height = 0;
	assert_eq!(
		verify_proof::<L>(&root, b"bravo", &tampered),
		Err(VerifyError::Operator(OpError::InvalidInputs("inner node height below 1"))),
	);
}

#[test]
fn scenario_root_is_stable() {
	let tree = scenario::<Sha256Layout>();
	let root = root_hash::<Sha256Layout>(&tree);
	assert_eq!(root, hex!("bca968c4567ae3729b28c179c80443689cad693cda95b88876a9f9d1c743f2f2"));

	let proof = prove::<Sha256Layout>(&tree, b"bob").unwrap();
	let computed = run_ops::<<Sha256Layout as TreeLayout>::Hash, _>(
		Some(&b"2"[..]),
		proof.proof_ops::<Sha256Layout>(),
	)
	.unwrap();
	assert_eq!(computed, root.to_vec());
}

#[test]
fn collapsed_and_expanded_paths_agree() {
	let tree = build_tree::<Sha256Layout>(&test_entries());
	let root = root_hash::<Sha256Layout>(&tree);
	for (key, value) in test_entries() {
		let proof = prove::<Sha256Layout>(&tree, key).unwrap();
		verify_proof::<Sha256CollapsedLayout>(&root, value, &proof).unwrap();
		let expanded = proof.proof_ops::<Sha256Layout>();
		let collapsed = proof.proof_ops::<Sha256CollapsedLayout>();
		assert_eq!(expanded[0], collapsed[0]);
		assert_eq!(expanded[1].len(), 2 * proof.path.len());
		assert_eq!(collapsed[1].len(), 1);
	}
}

test_layouts!(proof_generation_is_deterministic, proof_generation_is_deterministic_internal);
fn proof_generation_is_deterministic_internal<L: TreeLayout>() {
	let tree = build_tree::<L>(&test_entries());
	let first = prove::<L>(&tree, b"doge").unwrap();
	let second = prove::<L>(&tree, b"doge").unwrap();
	assert_eq!(first, second);
	assert_eq!(first.proof_records::<L>(), second.proof_records::<L>());
	assert_eq!(
		encode_records(&first.proof_records::<L>()),
		encode_records(&second.proof_records::<L>()),
	);
}

test_layouts!(value_hash_verifies, value_hash_verifies_internal);
fn value_hash_verifies_internal<L: TreeLayout>() {
	let tree = build_tree::<L>(&test_entries());
	let root = root_hash::<L>(&tree);
	for (key, value) in test_entries() {
		let proof = prove::<L>(&tree, key).unwrap();
		assert_eq!(proof.leaf.value_hash, L::Hash::hash(value));
		verify_value_hash::<L>(&root, &proof).unwrap();

		let mut tampered = proof.clone();
		tampered.leaf.value_hash = L::Hash::hash(b"other");
		assert!(matches!(verify_value_hash::<L>(&root, &tampered), Err(VerifyError::InvalidProof(_))));
	}
}

test_layouts!(wire_records_verify, wire_records_verify_internal);
fn wire_records_verify_internal<L: TreeLayout>() {
	let tree = build_tree::<L>(&test_entries());
	let root = root_hash::<L>(&tree);
	for (key, value) in test_entries() {
		let proof = prove::<L>(&tree, key).unwrap();
		let wire = encode_records(&proof.proof_records::<L>());
		let records = decode_records(&wire).unwrap();
		verify_records::<L::Hash>(&root, key, value, &records).unwrap();
		assert!(matches!(
			verify_records::<L::Hash>(&root, key, b"not the value", &records),
			Err(VerifyError::InvalidProof(_))
		));
		assert_eq!(
			verify_records::<L::Hash>(&root, b"other", value, &records),
			Err(VerifyError::Operator(OpError::InvalidInputs(
				"records do not start with the leaf chain of the key"
			))),
		);
		assert_eq!(records.iter().filter(|r| r.key.as_deref() == Some(key)).count(), 1);
	}
}

#[test]
fn unknown_wire_records_are_rejected() {
	let tree = build_tree::<Sha256Layout>(&test_entries());
	let root = root_hash::<Sha256Layout>(&tree);
	let proof = prove::<Sha256Layout>(&tree, b"do").unwrap();
	let mut records = proof.proof_records::<Sha256Layout>();
	records[0].op_type = "sha3".into();
	assert_eq!(
		verify_records::<<Sha256Layout as TreeLayout>::Hash>(&root, b"do", b"verb", &records),
		Err(VerifyError::Operator(OpError::InvalidInputs("unknown operator type"))),
	);
}

test_layouts!(forged_wire_records_are_rejected, forged_wire_records_are_rejected_internal);
fn forged_wire_records_are_rejected_internal<L: TreeLayout>() {
	let tree = build_tree::<L>(&test_entries());
	let root = root_hash::<L>(&tree);
	let not_leaf_chain: Result<(), VerifyError<TreeHash<L>>> = Err(VerifyError::Operator(
		OpError::InvalidInputs("records do not start with the leaf chain of the key"),
	));
	let not_path_chain: Result<(), VerifyError<TreeHash<L>>> = Err(VerifyError::Operator(
		OpError::InvalidInputs("records do not end with a path chain"),
	));

	// Sourcing the trusted root from the chain itself.
	let sourced = Operator::BatchApply {
		partitions: vec![
			Partition { arity: 0, ops: vec![Operator::AssertValues { values: vec![root.as_ref().to_vec()] }] },
			Partition { arity: 1, ops: vec![] },
		],
	};
	assert_eq!(run_ops::<L::Hash, _>(Some(&b"anything"[..]), &[vec![sourced.clone()]]), Ok(root.as_ref().to_vec()));
	let records = vec![sourced.encode()];
	assert_eq!(verify_records::<L::Hash>(&root, b"do", b"anything", &records), not_leaf_chain);

	let proof = prove::<L>(&tree, b"do").unwrap();
	let honest = proof.proof_records::<L>();

	// The same, behind an honest leaf chain.
	let mut records = honest[..3].to_vec();
	records.push(sourced.encode());
	assert_eq!(verify_records::<L::Hash>(&root, b"do", b"verb", &records), not_path_chain);

	// A trailing round outside any inner node.
	let mut records = honest.clone();
	records.push(Operator::HashChain { key: None, rounds: vec![Round::default()] }.encode());
	assert_eq!(verify_records::<L::Hash>(&root, b"do", b"verb", &records), not_path_chain);

	// An inner round claiming height 0, where leaf digests live.
	let leaf_like = Round { prefix: vec![0, 2, 2], suffix: codec::length_prefixed(root.as_ref()) };
	let mut records = honest[..3].to_vec();
	records.push(Operator::LengthPrefix.encode());
	records.push(Operator::HashChain { key: None, rounds: vec![leaf_like] }.encode());
	assert_eq!(verify_records::<L::Hash>(&root, b"do", b"verb", &records), not_path_chain);

	// A leaf chain sourcing the value hash instead of hashing the value.
	let mut records = honest.clone();
	records[0] = Operator::AssertValues { values: vec![L::Hash::hash(b"verb").as_ref().to_vec()] }.encode();
	assert_eq!(verify_records::<L::Hash>(&root, b"do", b"verb", &records), not_leaf_chain);

	verify_records::<L::Hash>(&root, b"do", b"verb", &honest).unwrap();
}

#[test]
fn single_leaf_tree() {
	let tree = build_tree::<Sha256Layout>(&[(b"only", b"one")]);
	let root = root_hash::<Sha256Layout>(&tree);
	let proof = prove::<Sha256Layout>(&tree, b"only").unwrap();
	assert!(proof.path.is_empty());
	verify_proof::<Sha256Layout>(&root, b"one", &proof).unwrap();
	verify_proof::<Sha256CollapsedLayout>(&root, b"one", &proof).unwrap();
	assert!(proof.proof_ops::<Sha256CollapsedLayout>()[1].is_empty());
}

#[test]
fn descriptors_render() {
	let tree = scenario::<Sha256Layout>();
	let proof = prove::<Sha256Layout>(&tree, b"bob").unwrap();
	let rendered = proof.path.to_string();
	assert!(rendered.starts_with("PathToLeaf{"));
	assert_eq!(rendered.matches("ProofInnerNode{").count(), 2);
	assert!(proof.leaf.to_string().contains("Key:       626f62"));
}
