// Copyright 2019 Parity Technologies
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

//! Verification of proofs.

use super::{AbsenceProof, ValueProof};
use crate::codec::Reader;
use crate::node::{ProofInnerNode, ProofLeafNode, Sibling};
use crate::op::{run_ops, run_stack, OpError, Operator, Partition, ProofOpRecord, Round, Stack};
use crate::path::PathToLeaf;
use crate::rstd::{vec, vec::Vec};
use crate::{ToHex, TreeHash, TreeLayout};
use log::debug;
use node_db::Hasher;

/// Errors that may occur during proof verification.
#[derive(PartialEq, Eq, Clone)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum VerifyError<HO> {
	/// An operator of the proof failed.
	Operator(OpError),
	/// The root digest computed from the proof is not the trusted root.
	InvalidProof(HO),
	/// The proof declares a root other than the trusted one.
	InvalidRoot(HO),
	/// The key of an absence proof is in the tree.
	KeyPresent(Vec<u8>),
	/// The anchor of an absence proof does not border the missing key.
	InvalidAnchor(Vec<u8>),
}

impl<HO> From<OpError> for VerifyError<HO> {
	fn from(err: OpError) -> Self {
		VerifyError::Operator(err)
	}
}

#[cfg(feature = "std")]
impl<HO: AsRef<[u8]>> std::fmt::Display for VerifyError<HO> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			VerifyError::Operator(err) => write!(f, "Proof operator failed: {}", err),
			VerifyError::InvalidProof(computed) =>
				write!(f, "Computed incorrect root {} from proof", ToHex(computed.as_ref())),
			VerifyError::InvalidRoot(declared) =>
				write!(f, "Proof declares root {} instead of the trusted one", ToHex(declared.as_ref())),
			VerifyError::KeyPresent(key) =>
				write!(f, "Key {} is present in the tree", ToHex(key)),
			VerifyError::InvalidAnchor(key) =>
				write!(f, "Absence anchor {} does not border the missing key", ToHex(key)),
		}
	}
}

#[cfg(feature = "std")]
impl<HO: AsRef<[u8]> + std::fmt::Debug> std::error::Error for VerifyError<HO> {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			VerifyError::Operator(err) => Some(err),
			_ => None,
		}
	}
}

fn check_root<HO: PartialEq + Copy>(trusted: &HO, declared: &HO) -> Result<(), VerifyError<HO>> {
	if declared != trusted {
		return Err(VerifyError::InvalidRoot(*declared));
	}
	Ok(())
}

fn check_path<HO: AsRef<[u8]>>(path: &PathToLeaf<HO>) -> Result<(), OpError> {
	if path.iter().any(|node| node.height < 1) {
		return Err(OpError::InvalidInputs("inner node height below 1"));
	}
	Ok(())
}

fn to_hash<H: Hasher>(out: &[u8]) -> Result<H::Out, OpError> {
	H::out_from_slice(out).ok_or(OpError::InvalidInputs("digest length mismatch"))
}

fn check_computed<HO: PartialEq + Copy>(trusted: &HO, computed: HO) -> Result<(), VerifyError<HO>> {
	if computed != *trusted {
		return Err(VerifyError::InvalidProof(computed));
	}
	Ok(())
}

/// Verify that `value` is the value of the key of `proof` under the trusted `root`.
pub fn verify_proof<L: TreeLayout>(
	root: &TreeHash<L>,
	value: &[u8],
	proof: &ValueProof<TreeHash<L>>,
) -> Result<(), VerifyError<TreeHash<L>>> {
	check_root(root, &proof.root)?;
	check_path(&proof.path)?;
	let computed = to_hash::<L::Hash>(&run_ops::<L::Hash, _>(Some(value), proof.proof_ops::<L>())?)?;
	debug!(target: "avl-proof", "verify {:?}: computed root {:?}", ToHex(proof.key()), ToHex(computed.as_ref()));
	check_computed(root, computed)
}

/// Verify that the value hash recorded in the leaf descriptor of `proof` is committed to by the
/// trusted `root`, without knowing the value itself.
pub fn verify_value_hash<L: TreeLayout>(
	root: &TreeHash<L>,
	proof: &ValueProof<TreeHash<L>>,
) -> Result<(), VerifyError<TreeHash<L>>> {
	check_root(root, &proof.root)?;
	check_computed(root, range_root::<L>(&proof.leaf, &proof.path)?)
}

/// Digest of the tree `leaf` belongs to, computed from the value hash of its descriptor.
fn range_root<L: TreeLayout>(
	leaf: &ProofLeafNode<TreeHash<L>>,
	path: &PathToLeaf<TreeHash<L>>,
) -> Result<TreeHash<L>, VerifyError<TreeHash<L>>> {
	check_path(path)?;
	let chains = [leaf.proof_ops_range(), path.proof_ops::<L>()];
	Ok(to_hash::<L::Hash>(&run_ops::<L::Hash, _>(None, &chains)?)?)
}

/// Verify that the key of an absence proof is not in the tree with the trusted `root`.
///
/// The anchor must be a leaf of the tree bounding the missing key from below. A key smaller
/// than the anchor is only absent if the anchor is the least leaf. A key greater than the
/// anchor is only absent if the anchor is the greatest leaf, or if the proof carries the leaf
/// directly following the anchor and that leaf's key is greater than the missing key.
pub fn verify_absence<L: TreeLayout>(
	root: &TreeHash<L>,
	proof: &AbsenceProof<TreeHash<L>>,
) -> Result<(), VerifyError<TreeHash<L>>> {
	check_root(root, &proof.root)?;
	let key = &proof.key;
	let anchor = &proof.anchor;
	if anchor.key == *key {
		return Err(VerifyError::KeyPresent(key.clone()));
	}
	if *key < anchor.key {
		if !proof.path.is_leftmost() {
			return Err(VerifyError::InvalidAnchor(anchor.key.clone()));
		}
	} else if !proof.path.is_rightmost() {
		let successor = match &proof.successor {
			Some(successor) => successor,
			None => return Err(VerifyError::InvalidAnchor(anchor.key.clone())),
		};
		if successor.leaf.key == *key {
			return Err(VerifyError::KeyPresent(key.clone()));
		}
		if successor.leaf.key < *key || !proof.path.precedes(&successor.path) {
			return Err(VerifyError::InvalidAnchor(anchor.key.clone()));
		}
		check_computed(root, range_root::<L>(&successor.leaf, &successor.path)?)?;
	}
	let computed = range_root::<L>(anchor, &proof.path)?;
	debug!(
		target: "avl-proof",
		"verify absence of {:?}: computed root {:?}",
		ToHex(key),
		ToHex(computed.as_ref()),
	);
	check_computed(root, computed)
}

/// Verify several value proofs against the same trusted `root` in a single run.
///
/// Every value gets its own partition of a `BatchApply`, and the resulting digests must all be
/// accepted by an `AssertValues` holding only the root.
pub fn verify_batch<L, V>(
	root: &TreeHash<L>,
	items: &[(V, ValueProof<TreeHash<L>>)],
) -> Result<(), VerifyError<TreeHash<L>>>
where
	L: TreeLayout,
	V: AsRef<[u8]>,
{
	let mut partitions = Vec::with_capacity(items.len());
	let mut values = Stack::with_capacity(items.len());
	for (value, proof) in items {
		check_root(root, &proof.root)?;
		check_path(&proof.path)?;
		partitions.push(Partition { arity: 1, ops: proof.proof_ops::<L>().concat() });
		values.push(value.as_ref().to_vec());
	}
	if partitions.is_empty() {
		return Ok(());
	}
	let chain = vec![
		Operator::BatchApply { partitions },
		Operator::AssertValues { values: vec![root.as_ref().to_vec()] },
	];
	match run_stack::<L::Hash, _>(values, &[chain]) {
		Ok(_) => Ok(()),
		Err(OpError::Assertion(computed)) => Err(VerifyError::InvalidProof(to_hash::<L::Hash>(&computed)?)),
		Err(err) => Err(err.into()),
	}
}

/// Rebuild the leaf descriptor of a wire chain proving `key`, if the chain starts with one.
fn leaf_of<H: Hasher>(key: &[u8], ops: &[Operator]) -> Option<ProofLeafNode<H::Out>> {
	let round = match ops.get(2)? {
		Operator::HashChain { rounds, .. } if rounds.len() == 1 => &rounds[0],
		_ => return None,
	};
	let mut prefix = Reader::new(&round.prefix);
	if prefix.varint().ok()? != 0 || prefix.varint().ok()? != 1 {
		return None;
	}
	let version = prefix.varint().ok()?;
	let leaf = ProofLeafNode { key: key.to_vec(), value_hash: H::Out::default(), version };
	if leaf.proof_ops()[..] == ops[..3] {
		Some(leaf)
	} else {
		None
	}
}

/// Whether `round` is the hash round of an inner node, in the collapsed or expanded form.
fn is_inner_round<H: Hasher>(round: &Round, collapsed: bool) -> bool {
	let node = || -> Option<ProofInnerNode<H::Out>> {
		let mut prefix = Reader::new(&round.prefix);
		let height = prefix.varint().ok()?;
		let size = prefix.varint().ok()?;
		let version = prefix.varint().ok()?;
		if height < 1 || height > i8::MAX as i64 {
			return None;
		}
		let sibling = if round.suffix.is_empty() {
			Sibling::Left(H::out_from_slice(prefix.byte_slice().ok()?)?)
		} else {
			Sibling::Right(H::out_from_slice(Reader::new(&round.suffix).byte_slice().ok()?)?)
		};
		Some(ProofInnerNode { height: height as i8, size, version, sibling })
	};
	match node() {
		Some(node) if collapsed => node.unprefixed_round(H::LENGTH) == *round,
		Some(node) => node.round() == *round,
		None => false,
	}
}

/// Whether `ops` is a path chain: one `LengthPrefix` + `HashChain` pair per inner node, or a
/// single multi-round `HashChain`.
fn is_path_chain<H: Hasher>(ops: &[Operator]) -> bool {
	match ops {
		[] => true,
		[Operator::HashChain { key: None, rounds }] =>
			!rounds.is_empty() && rounds.iter().all(|round| is_inner_round::<H>(round, true)),
		_ => ops.chunks(2).all(|pair| match pair {
			[Operator::LengthPrefix, Operator::HashChain { key: None, rounds }] =>
				rounds.len() == 1 && is_inner_round::<H>(&rounds[0], false),
			_ => false,
		}),
	}
}

/// Verify a proof received in wire form: decode `records`, check that they are the chain of a
/// leaf holding `key` followed by the chain of its path, replay them over `value` and compare
/// the outcome with the trusted `root`.
pub fn verify_records<H: Hasher>(
	root: &H::Out,
	key: &[u8],
	value: &[u8],
	records: &[ProofOpRecord],
) -> Result<(), VerifyError<H::Out>> {
	let ops = records.iter().map(Operator::decode).collect::<Result<Vec<_>, _>>()?;
	if leaf_of::<H>(key, &ops).is_none() {
		return Err(OpError::InvalidInputs("records do not start with the leaf chain of the key").into());
	}
	if !is_path_chain::<H>(&ops[3..]) {
		return Err(OpError::InvalidInputs("records do not end with a path chain").into());
	}
	let computed = to_hash::<H>(&run_ops::<H, _>(Some(value), &[ops])?)?;
	check_computed(root, computed)
}
