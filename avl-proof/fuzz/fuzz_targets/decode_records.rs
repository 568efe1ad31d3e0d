#![no_main]

use libfuzzer_sys::fuzz_target;
use avl_proof_fuzz::fuzz_decode_records;

fuzz_target!(|data: &[u8]| {
	fuzz_decode_records::<reference_tree::Sha256Hasher>(data);
});
