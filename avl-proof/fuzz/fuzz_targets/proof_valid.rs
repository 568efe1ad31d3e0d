#![no_main]

use libfuzzer_sys::fuzz_target;
use avl_proof_fuzz::fuzz_that_verify_accepts_valid_proofs;

fuzz_target!(|data: &[u8]| {
	fuzz_that_verify_accepts_valid_proofs::<reference_tree::Sha256Layout>(data);
	fuzz_that_verify_accepts_valid_proofs::<reference_tree::Sha256CollapsedLayout>(data);
});
