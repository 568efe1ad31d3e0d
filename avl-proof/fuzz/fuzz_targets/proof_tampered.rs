#![no_main]

use libfuzzer_sys::fuzz_target;
use avl_proof_fuzz::{fuzz_that_verify_rejects_tampered_proofs, Tamper};

fuzz_target!(|input: (Vec<u8>, u16, Tamper)| {
	let (data, pick, tamper) = input;
	fuzz_that_verify_rejects_tampered_proofs::<reference_tree::Sha256Layout>(&data, pick, tamper);
});
