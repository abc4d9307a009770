//! Canonical encodings of RRsets (RFC 4034 section 6).
//!
//! Zones sign, and oracles hash, an RRset in one exact byte form: every record with the TTL the
//! signature claims, wildcard owners restored, names lowercased where the RFC says so, sorted by
//! record data and without duplicates. Any deviation makes an otherwise valid signature fail.

use sha3::{Digest, Keccak256};

use crate::error::ProofError;
use crate::rr::*;
use crate::ser::*;

/// Lowercases, serializes, sorts and deduplicates records whose owners are already final.
fn sorted_wires(rrs: Vec<RR>, ttl: u32) -> Result<Vec<Vec<u8>>, ProofError> {
	// (offset of the record data, encoded record)
	let mut wires: Vec<(usize, Vec<u8>)> = Vec::with_capacity(rrs.len());
	for mut rr in rrs {
		*rr.name_mut() = rr.name().to_lowercase();
		rr.lowercase_rdata_names();

		let mut wire = Vec::with_capacity(256);
		write_rr(&rr, ttl, &mut wire)
			.map_err(|()| ProofError::decode(rr.name(), rr.ty(), "record data too long"))?;
		// Skip the owner, type, class, TTL and RDLENGTH
		let rdata_offset = name_len(rr.name()) as usize + 10;
		wires.push((rdata_offset, wire));
	}
	wires.sort_unstable_by(|(a_off, a), (b_off, b)| a[*a_off..].cmp(&b[*b_off..]));
	wires.dedup_by(|(_, a), (_, b)| a == b);
	Ok(wires.into_iter().map(|(_, wire)| wire).collect())
}

/// The canonical wire encodings of each record of `rrs` as covered by `sig`, sorted and
/// deduplicated.
fn canonical_wires(rrs: &[RR], sig: &RRSig) -> Result<Vec<Vec<u8>>, ProofError> {
	let sig_labels = sig.labels as usize;
	let mut adjusted = Vec::with_capacity(rrs.len());
	for rr in rrs {
		let mut rr = rr.clone();
		let labels = rr.name().label_count();
		if labels < sig_labels {
			return Err(ProofError::NoSignature { name: rr.name().clone(), ty: DisplayType(sig.ty) });
		}
		if labels > sig_labels {
			let wildcard = rr.name().suffix(sig_labels)
				.and_then(|suffix| suffix.prepend_label("*").ok())
				.ok_or_else(|| ProofError::decode(rr.name(), sig.ty, "cannot rebuild wildcard owner"))?;
			*rr.name_mut() = wildcard;
		}
		adjusted.push(rr);
	}
	sorted_wires(adjusted, sig.orig_ttl)
}

/// Serializes unsigned records (such as locally configured trust anchors) in canonical order
/// with a fixed TTL.
pub(crate) fn pack_records(rrs: &[RR], ttl: u32) -> Result<Vec<u8>, ProofError> {
	Ok(sorted_wires(rrs.to_vec(), ttl)?.concat())
}

/// Serializes `rrs` in the canonical form covered by `sig`.
///
/// This is the value oracles hash and store, and the anchor proof handed along with the next
/// submission.
pub fn pack_rrset(rrs: &[RR], sig: &RRSig) -> Result<Vec<u8>, ProofError> {
	Ok(canonical_wires(rrs, sig)?.concat())
}

/// Writes the RRSIG RDATA fields which are signed over, excluding the signature itself.
fn write_sig_prefix(sig: &RRSig, out: &mut Vec<u8>) {
	out.extend_from_slice(&sig.ty.to_be_bytes());
	out.extend_from_slice(&sig.alg.to_be_bytes());
	out.extend_from_slice(&sig.labels.to_be_bytes());
	out.extend_from_slice(&sig.orig_ttl.to_be_bytes());
	out.extend_from_slice(&sig.expiration.to_be_bytes());
	out.extend_from_slice(&sig.inception.to_be_bytes());
	out.extend_from_slice(&sig.key_tag.to_be_bytes());
	write_name(out, &sig.key_name.to_lowercase());
}

/// Serializes the exact bytes `sig` was computed over: the RRSIG fields followed by the
/// canonical RRset.
pub fn pack_signed_data(rrs: &[RR], sig: &RRSig) -> Result<Vec<u8>, ProofError> {
	let mut out = Vec::with_capacity(1024);
	write_sig_prefix(sig, &mut out);
	for wire in canonical_wires(rrs, sig)? {
		out.extend_from_slice(&wire);
	}
	Ok(out)
}

/// The 20-byte hash an oracle stores for a packed RRset: the leading bytes of its Keccak-256.
pub fn rrset_hash(packed_rrset: &[u8]) -> [u8; 20] {
	let digest = Keccak256::digest(packed_rrset);
	let mut res = [0; 20];
	res.copy_from_slice(&digest[..20]);
	res
}

#[cfg(test)]
mod tests {
	use super::*;

	use hex_conservative::FromHex;
	use rand::seq::SliceRandom;

	fn name(s: &str) -> Name { s.try_into().unwrap() }

	fn sig_over(ty: u16, labels: u8, signer: &str) -> RRSig {
		RRSig {
			name: name("example."), ty, alg: 15, labels, orig_ttl: 3600,
			expiration: 1_700_086_400, inception: 1_700_000_000, key_tag: 1234,
			key_name: name(signer), signature: vec![0; 64],
		}
	}

	fn opaque(data: &[u8]) -> RR {
		Opaque { name: name("example."), ty: 65280, data: data.to_vec() }.into()
	}

	#[test]
	fn ttl_is_replaced() {
		let rrs = vec![RR::A(A { name: name("example."), address: [192, 0, 2, 1] })];
		let packed = pack_rrset(&rrs, &sig_over(A::TYPE, 1, "example.")).unwrap();
		assert_eq!(packed, <Vec<u8>>::from_hex(
			"076578616d706c65000001000100000e100004c0000201").unwrap());
	}

	#[test]
	fn sorted_by_rdata_not_length() {
		let sig = sig_over(65280, 1, "example.");
		let packed = pack_rrset(&[opaque(&[2]), opaque(&[1, 2, 3])], &sig).unwrap();
		let records = parse_rr_stream(&packed).unwrap();
		assert_eq!(records, vec![opaque(&[1, 2, 3]), opaque(&[2])]);
	}

	#[test]
	fn order_and_duplicates_do_not_matter() {
		let sig = sig_over(Txt::TYPE, 1, "example.");
		let mut rrs: Vec<RR> = (0..20u8)
			.map(|i| Txt { name: name("example."), strings: vec![vec![b'a' + i; i as usize]] }.into())
			.collect();
		let expected = pack_rrset(&rrs, &sig).unwrap();
		let dupes = rrs[..5].to_vec();
		rrs.extend(dupes);
		for _ in 0..10 {
			rrs.shuffle(&mut rand::rngs::OsRng);
			assert_eq!(pack_rrset(&rrs, &sig).unwrap(), expected);
		}
	}

	#[test]
	fn wildcard_owner_is_restored() {
		let rrs = vec![RR::Txt(Txt::from_bytes(name("Foo.Bar.example."), b"hi"))];
		let packed = pack_rrset(&rrs, &sig_over(Txt::TYPE, 1, "example.")).unwrap();
		let records = parse_rr_stream(&packed).unwrap();
		assert_eq!(records[0].name().as_str(), "*.example.");

		// A literal wildcard owner is signed with one label fewer than it has
		let rrs = vec![RR::Txt(Txt::from_bytes(name("*.example."), b"hi"))];
		let literal = pack_rrset(&rrs, &sig_over(Txt::TYPE, 1, "example.")).unwrap();
		assert_eq!(literal, packed);
	}

	#[test]
	fn too_few_labels_is_rejected() {
		let rrs = vec![RR::Txt(Txt::from_bytes(name("example."), b"hi"))];
		assert!(matches!(pack_rrset(&rrs, &sig_over(Txt::TYPE, 2, "example.")),
			Err(ProofError::NoSignature { .. })));
	}

	#[test]
	fn only_listed_rdata_names_are_lowercased() {
		let sig = sig_over(MX::TYPE, 1, "example.");
		let mx = MX { name: name("EXAMPLE."), preference: 10, exchange: name("Mail.EXAMPLE.") };
		let records = parse_rr_stream(&pack_rrset(&[mx.into()], &sig).unwrap()).unwrap();
		assert_eq!(records, vec![RR::MX(MX {
			name: name("example."), preference: 10, exchange: name("mail.example."),
		})]);

		let sig = sig_over(NSec::TYPE, 1, "example.");
		let nsec = NSec { name: name("Example."), next_name: name("A.Example."), type_bitmap: vec![0, 1, 0x40] };
		let records = parse_rr_stream(&pack_rrset(&[nsec.into()], &sig).unwrap()).unwrap();
		match &records[0] {
			RR::NSec(nsec) => {
				assert_eq!(nsec.name.as_str(), "example.");
				assert_eq!(nsec.next_name.as_str(), "A.Example.");
			},
			_ => panic!(),
		}

		let sig = sig_over(Txt::TYPE, 1, "example.");
		let txt = Txt::from_bytes(name("example."), b"MiXeD");
		let records = parse_rr_stream(&pack_rrset(&[txt.clone().into()], &sig).unwrap()).unwrap();
		assert_eq!(records, vec![RR::Txt(txt)]);
	}

	#[test]
	fn oversized_records_are_rejected() {
		// A bitmap which only fits its RDLENGTH while the next name is compressed
		let nsec = NSec {
			name: name("example."), next_name: name("a.example."), type_bitmap: vec![0; u16::MAX as usize - 2],
		};
		let sig = sig_over(NSec::TYPE, 1, "example.");
		assert!(matches!(pack_rrset(&[nsec.clone().into()], &sig), Err(ProofError::Decode { .. })));
		assert!(matches!(pack_signed_data(&[nsec.into()], &sig), Err(ProofError::Decode { .. })));
	}

	#[test]
	fn packing_is_idempotent() {
		let sig = sig_over(SOA::TYPE, 1, "Example.");
		let soa = SOA {
			name: name("Example."), mname: name("NS1.example."), rname: name("Hostmaster.Example."),
			serial: 2024020101, refresh: 7200, retry: 3600, expire: 1209600, minimum: 3600,
		};
		let packed = pack_rrset(&[soa.into()], &sig).unwrap();
		let reparsed = parse_rr_stream(&packed).unwrap();
		assert_eq!(pack_rrset(&reparsed, &sig).unwrap(), packed);
	}

	#[test]
	fn signed_data_prefix() {
		let sig = sig_over(A::TYPE, 1, "EXAMPLE.");
		let rrs = vec![RR::A(A { name: name("example."), address: [192, 0, 2, 1] })];
		let signed = pack_signed_data(&rrs, &sig).unwrap();
		let prefix = <Vec<u8>>::from_hex(
			&"0001 0f 01 00000e10 65554280 6553f100 04d2 076578616d706c6500".replace(' ', "")).unwrap();
		assert_eq!(&signed[..prefix.len()], &prefix[..]);
		assert_eq!(&signed[prefix.len()..], &pack_rrset(&rrs, &sig).unwrap()[..]);
	}

	#[test]
	fn hash_is_truncated_keccak() {
		// Keccak-256 of the empty string is c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470
		assert_eq!(rrset_hash(&[])[..], <Vec<u8>>::from_hex(
			"c5d2460186f7233c927e7db2dcc703c0e500b653").unwrap()[..]);
	}
}
