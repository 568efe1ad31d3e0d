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

use avl_proof::{generate_proof, verify_absence, verify_proof, GenerateError, TreeLayout};
use rand::{rngs::SmallRng, Rng, RngCore, SeedableRng};
use reference_tree::{test_layouts, Sha256Layout};
use std::collections::BTreeMap;
use tree_standardmap::{Alphabet, Seed, StandardMap, ValueMode};

use crate::{root_hash, Tree};

fn random_entries(rng: &mut SmallRng, count: usize) -> BTreeMap<Vec<u8>, Vec<u8>> {
	let mut entries = BTreeMap::new();
	for _ in 0..count {
		let mut key = vec![0u8; rng.gen_range(1..8)];
		rng.fill_bytes(&mut key);
		let mut value = vec![0u8; rng.gen_range(0..48)];
		rng.fill_bytes(&mut value);
		entries.insert(key, value);
	}
	entries
}

test_layouts!(random_trees_prove_every_key, random_trees_prove_every_key_internal);
fn random_trees_prove_every_key_internal<L: TreeLayout>() {
	let mut rng = SmallRng::seed_from_u64(42);
	for round in 0..20 {
		let entries = random_entries(&mut rng, 1 + round * 7);
		let tree = Tree::<L>::from_entries(entries.iter(), 1);
		let root = root_hash::<L>(&tree);
		for (key, value) in &entries {
			let proof = crate::prove::<L>(&tree, key).unwrap();
			verify_proof::<L>(&root, value, &proof).unwrap();
		}
		for _ in 0..10 {
			let mut missing = vec![0u8; rng.gen_range(0..8)];
			rng.fill_bytes(&mut missing);
			if entries.contains_key(&missing) {
				continue;
			}
			match crate::prove::<L>(&tree, &missing) {
				Err(GenerateError::KeyNotFound(proof)) => {
					let expected = entries
						.range(..missing.clone())
						.next_back()
						.or_else(|| entries.iter().next())
						.map(|(k, _)| k.clone());
					assert_eq!(Some(proof.anchor.key.clone()), expected);
					if proof.anchor.key < missing {
						let next = entries.range(missing.clone()..).next().map(|(k, _)| k.clone());
						assert_eq!(proof.successor.as_ref().map(|s| s.leaf.key.clone()), next);
					}
					verify_absence::<L>(&root, &proof).unwrap();
				},
				result => panic!("unexpected result: {:?}", result),
			}
		}
	}
}

#[test]
fn older_versions_stay_provable() {
	let map = StandardMap {
		alphabet: Alphabet::Mid,
		min_key: 3,
		journal_key: 5,
		value_mode: ValueMode::Random,
		count: 100,
	};
	let mut seed = Seed::default();
	let mut versions = vec![map.make_with(&mut seed)];
	for _ in 0..3 {
		let next = map.next_version(versions.last().unwrap(), 4, 20, &mut seed);
		versions.push(next);
	}

	let mut tree = Tree::<Sha256Layout>::default();
	let mut roots = Vec::new();
	for (version, entries) in versions.iter().enumerate() {
		roots.push(tree.commit(entries.iter().cloned(), version as i64 + 1).unwrap());
	}
	for (version, entries) in versions.iter().enumerate() {
		let root = tree.root(version as i64 + 1).unwrap();
		assert_eq!(root.hash, roots[version]);
		for (key, value) in entries {
			let proof = generate_proof::<<Sha256Layout as TreeLayout>::Hash, _>(tree.db(), root, key).unwrap();
			assert!(proof.leaf.version <= version as i64 + 1);
			verify_proof::<Sha256Layout>(&roots[version], value, &proof).unwrap();
		}
	}
}

#[test]
fn proofs_from_concurrent_readers_agree() {
	let mut rng = SmallRng::seed_from_u64(7);
	let entries = random_entries(&mut rng, 300);
	let tree = Tree::<Sha256Layout>::from_entries(entries.iter(), 1);
	let root = root_hash::<Sha256Layout>(&tree);
	let keys: Vec<_> = entries.keys().collect();

	let proofs: Vec<Vec<_>> = std::thread::scope(|scope| {
		let handles: Vec<_> = keys
			.chunks(50)
			.map(|chunk| {
				let tree = &tree;
				scope.spawn(move || {
					chunk
						.iter()
						.map(|key| crate::prove::<Sha256Layout>(tree, key).unwrap())
						.collect::<Vec<_>>()
				})
			})
			.collect();
		handles.into_iter().map(|h| h.join().unwrap()).collect()
	});

	for (proof, (key, value)) in proofs.into_iter().flatten().zip(entries.iter()) {
		assert_eq!(proof.key(), &key[..]);
		verify_proof::<Sha256Layout>(&root, value, &proof).unwrap();
	}
}
