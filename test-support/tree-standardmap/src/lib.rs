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

//! Deterministic key/value sets for building test trees.

use node_db::Hasher;
use sha256_hasher::Sha256Hasher;
use std::collections::BTreeMap;

/// Seed of the generator, advanced by hashing.
pub type Seed = <Sha256Hasher as Hasher>::Out;

/// Alphabet to use when creating keys.
pub enum Alphabet {
	/// All values are allowed in each byte of the key.
	All,
	/// Only 6 values ('a' - 'f') are chosen to compose the key.
	Low,
	/// Around 32 values are chosen to compose the key.
	Mid,
	/// A set of bytes given is used to compose the key.
	Custom(Vec<u8>),
}

/// Means of determining the value.
pub enum ValueMode {
	/// Same as the key.
	Mirror,
	/// Randomly (50:50) 1 or 32 byte random string.
	Random,
	/// Little-endian index of the entry.
	Index,
}

/// Standard key set for test trees.
pub struct StandardMap {
	/// The alphabet to use for keys.
	pub alphabet: Alphabet,
	/// Minimum size of key.
	pub min_key: usize,
	/// Delta size of key.
	pub journal_key: usize,
	/// Mode of value generation.
	pub value_mode: ValueMode,
	/// Number of keys to draw. Duplicates are dropped, so the set may come out smaller.
	pub count: u32,
}

fn advance(seed: &mut Seed) {
	*seed = Sha256Hasher::hash(&seed[..]);
}

impl StandardMap {
	fn random_bytes(min_count: usize, journal_count: usize, seed: &mut Seed) -> Vec<u8> {
		assert!(min_count + journal_count <= 32);
		advance(seed);
		let r = min_count + (seed[31] as usize % (journal_count + 1));
		seed[0..r].to_vec()
	}

	fn random_value(seed: &mut Seed) -> Vec<u8> {
		advance(seed);
		match seed[0] % 2 {
			1 => vec![seed[31]; 1],
			_ => seed.to_vec(),
		}
	}

	fn random_word(alphabet: &[u8], min_count: usize, journal_count: usize, seed: &mut Seed) -> Vec<u8> {
		assert!(min_count + journal_count <= 32);
		advance(seed);
		let r = min_count + (seed[31] as usize % (journal_count + 1));
		seed[..r].iter().map(|b| alphabet[*b as usize % alphabet.len()]).collect()
	}

	fn key(&self, seed: &mut Seed) -> Vec<u8> {
		let low = b"abcdef";
		let mid = b"@QWERTYUIOPASDFGHJKLZXCVBNM[/]^_";
		match self.alphabet {
			Alphabet::All => Self::random_bytes(self.min_key, self.journal_key, seed),
			Alphabet::Low => Self::random_word(low, self.min_key, self.journal_key, seed),
			Alphabet::Mid => Self::random_word(mid, self.min_key, self.journal_key, seed),
			Alphabet::Custom(ref a) => Self::random_word(a, self.min_key, self.journal_key, seed),
		}
	}

	fn value(&self, key: &[u8], index: u32, seed: &mut Seed) -> Vec<u8> {
		match self.value_mode {
			ValueMode::Mirror => key.to_vec(),
			ValueMode::Random => Self::random_value(seed),
			ValueMode::Index => index.to_le_bytes().to_vec(),
		}
	}

	/// Create the key set, sorted by key and free of duplicates.
	pub fn make(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
		self.make_with(&mut Seed::default())
	}

	/// Create the key set using the given seed. The first draw of a key wins.
	pub fn make_with(&self, seed: &mut Seed) -> Vec<(Vec<u8>, Vec<u8>)> {
		let mut entries = BTreeMap::new();
		for index in 0..self.count {
			let k = self.key(seed);
			let v = self.value(&k, index, seed);
			entries.entry(k).or_insert(v);
		}
		entries.into_iter().collect()
	}

	/// Derive the next version of a key set: every entry is updated with probability
	/// `1 / update_ratio` and `inserts` fresh keys are drawn. The result stays sorted.
	pub fn next_version(
		&self,
		entries: &[(Vec<u8>, Vec<u8>)],
		update_ratio: u8,
		inserts: u32,
		seed: &mut Seed,
	) -> Vec<(Vec<u8>, Vec<u8>)> {
		let mut next: BTreeMap<_, _> = entries.iter().cloned().collect();
		for (index, value) in next.values_mut().enumerate() {
			advance(seed);
			if update_ratio != 0 && seed[0] % update_ratio == 0 {
				value.push(index as u8);
			}
		}
		for index in 0..inserts {
			let k = self.key(seed);
			let v = self.value(&k, index, seed);
			next.entry(k).or_insert(v);
		}
		next.into_iter().collect()
	}
}
