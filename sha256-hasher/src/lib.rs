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

//! Hasher implementation for the SHA-256 hash

#![cfg_attr(not(feature = "std"), no_std)]

use node_db::Hasher;
use sha2::{Digest, Sha256};

/// Concrete `Hasher` impl for the SHA-256 hash
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Sha256Hasher;

impl Hasher for Sha256Hasher {
	type Out = [u8; 32];

	const LENGTH: usize = 32;

	fn hash(x: &[u8]) -> Self::Out {
		Sha256::digest(x).into()
	}
}
