//! Cryptographic checks on DNSSEC data: RRSIG signatures over canonical signed data and DS
//! digests over DNSKEYs.
//!
//! Which algorithms are *trusted* is a policy decision left to the caller (see
//! [`crate::config::Config`]); this module only knows which ones it *can* check.

use ring::signature;

use crate::rr::*;
use crate::ser::{bytes_to_rsa_pk, write_name};

/// Signature algorithms which can be verified: RSASHA1 (5), RSASHA1-NSEC3-SHA1 (7), RSASHA256
/// (8), RSASHA512 (10), ECDSAP256SHA256 (13), ECDSAP384SHA384 (14) and ED25519 (15).
pub const SUPPORTED_ALGORITHMS: [u8; 7] = [5, 7, 8, 10, 13, 14, 15];

/// DS digest types which can be computed: SHA-1 (1), SHA-256 (2) and SHA-384 (4).
pub const SUPPORTED_DIGESTS: [u8; 3] = [1, 2, 4];

#[derive(Debug, PartialEq)]
/// An error when validating DNSSEC signatures or other data
pub enum ValidationError {
	/// An algorithm used in signing or digesting was not supported.
	UnsupportedAlgorithm,
	/// The provided data was invalid or signatures did not validate.
	Invalid,
}

/// Whether `dnskey` may be used to check signatures over zone data at all.
fn usable_for_zone(dnskey: &DnsKey) -> bool {
	// Protocol must be 3, otherwise its not DNSSEC
	if dnskey.protocol != 3 { return false; }
	// The ZONE flag must be set if we're going to validate RRs with this key.
	dnskey.is_zone_key()
}

/// Whether `dnskey` is the key `sig` claims to be signed with.
pub fn key_matches(sig: &RRSig, dnskey: &DnsKey) -> bool {
	dnskey.alg == sig.alg && dnskey.key_tag() == sig.key_tag &&
		dnskey.name.eq_ignore_case(&sig.key_name) && usable_for_zone(dnskey)
}

/// Checks that `sig` is a valid signature by `dnskey` over `signed_data`, which must be the
/// canonical signed data built by [`crate::canon::pack_signed_data`].
pub fn verify_signature(dnskey: &DnsKey, sig: &RRSig, signed_data: &[u8]) -> Result<(), ValidationError> {
	if !key_matches(sig, dnskey) { return Err(ValidationError::Invalid); }

	match sig.alg {
		5|7|8|10 => {
			let alg = match sig.alg {
				5|7 => &signature::RSA_PKCS1_1024_8192_SHA1_FOR_LEGACY_USE_ONLY,
				8 => &signature::RSA_PKCS1_1024_8192_SHA256_FOR_LEGACY_USE_ONLY,
				_ => &signature::RSA_PKCS1_1024_8192_SHA512_FOR_LEGACY_USE_ONLY,
			};
			bytes_to_rsa_pk(&dnskey.pubkey).map_err(|_| ValidationError::Invalid)?
				.verify(alg, signed_data, &sig.signature)
				.map_err(|_| ValidationError::Invalid)
		},
		13|14 => {
			let alg = if sig.alg == 13 {
				&signature::ECDSA_P256_SHA256_FIXED
			} else {
				&signature::ECDSA_P384_SHA384_FIXED
			};

			// Add 0x4 identifier to the ECDSA pubkey as expected by ring.
			let mut key = Vec::with_capacity(dnskey.pubkey.len() + 1);
			key.push(0x4);
			key.extend_from_slice(&dnskey.pubkey);

			signature::UnparsedPublicKey::new(alg, &key)
				.verify(signed_data, &sig.signature)
				.map_err(|_| ValidationError::Invalid)
		},
		15 => {
			signature::UnparsedPublicKey::new(&signature::ED25519, &dnskey.pubkey)
				.verify(signed_data, &sig.signature)
				.map_err(|_| ValidationError::Invalid)
		},
		_ => Err(ValidationError::UnsupportedAlgorithm),
	}
}

/// Computes the DS digest of `dnskey` with the given digest type: the hash of the lowercased
/// owner name followed by the DNSKEY RDATA.
pub fn dnskey_digest(dnskey: &DnsKey, digest_type: u8) -> Result<Vec<u8>, ValidationError> {
	let alg = match digest_type {
		1 => &ring::digest::SHA1_FOR_LEGACY_USE_ONLY,
		2 => &ring::digest::SHA256,
		4 => &ring::digest::SHA384,
		_ => return Err(ValidationError::UnsupportedAlgorithm),
	};
	let mut ctx = ring::digest::Context::new(alg);
	write_name(&mut ctx, &dnskey.name.to_lowercase());
	ctx.update(&dnskey.flags.to_be_bytes());
	ctx.update(&dnskey.protocol.to_be_bytes());
	ctx.update(&dnskey.alg.to_be_bytes());
	ctx.update(&dnskey.pubkey);
	Ok(ctx.finish().as_ref().to_vec())
}

/// Checks whether `ds` refers to `dnskey`.
///
/// Returns `Err(UnsupportedAlgorithm)` if the owner, algorithm and key tag line up but the digest
/// type cannot be computed.
pub fn ds_matches(ds: &DS, dnskey: &DnsKey) -> Result<bool, ValidationError> {
	if ds.alg != dnskey.alg || ds.key_tag != dnskey.key_tag() || !ds.name.eq_ignore_case(&dnskey.name) {
		return Ok(false);
	}
	if !usable_for_zone(dnskey) { return Ok(false); }
	Ok(dnskey_digest(dnskey, ds.digest_type)? == ds.digest)
}
