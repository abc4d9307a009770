//! The trust anchors which terminate every chain of trust.

use crate::canon::pack_records;
use crate::error::ProofError;
use crate::rr::*;
use crate::validation::ds_matches;

/// The TTL used when packing anchors, which carry none of their own.
const ANCHOR_TTL: u32 = 3600;

/// A fixed set of DS records trusted out-of-band.
///
/// A DNSKEY matching any of them (by owner, algorithm, key tag and digest) needs no further
/// proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustStore {
	anchors: Vec<DS>,
}

impl TrustStore {
	/// Builds a store trusting exactly `anchors`.
	pub fn new(anchors: Vec<DS>) -> Self {
		TrustStore { anchors }
	}

	/// The IANA root zone KSKs (KSK-2010 and KSK-2017).
	pub fn root() -> Self {
		TrustStore::new(vec![DS {
			name: Name::root(), key_tag: 19036, alg: 8, digest_type: 2,
			digest: hex_lit::hex!("49AAC11D7B6F6446702E54A1607371607A1A41855200FD2CE1CDDE32F24E8FB5").to_vec(),
		}, DS {
			name: Name::root(), key_tag: 20326, alg: 8, digest_type: 2,
			digest: hex_lit::hex!("E06D44B80B8F1D39A95C0B0D7C65D08458E880409BBC683457104237C7F8EC8D").to_vec(),
		}])
	}

	/// The anchors in this store.
	pub fn anchors(&self) -> &[DS] { &self.anchors }

	/// Whether `dnskey` is directly trusted by an anchor using one of the allowed `digests`.
	///
	/// Anchors with digest types outside `digests`, or which this crate cannot compute, are
	/// skipped.
	pub fn anchors_key(&self, dnskey: &DnsKey, digests: &[u8]) -> bool {
		self.anchors.iter()
			.filter(|ds| digests.contains(&ds.digest_type))
			.any(|ds| ds_matches(ds, dnskey).unwrap_or(false))
	}

	/// The anchors as a DS RRset in canonical wire form.
	pub fn pack(&self) -> Result<Vec<u8>, ProofError> {
		let rrs: Vec<RR> = self.anchors.iter().cloned().map(RR::DS).collect();
		pack_records(&rrs, ANCHOR_TTL)
	}
}

impl Default for TrustStore {
	fn default() -> Self { TrustStore::root() }
}

#[cfg(test)]
mod tests {
	use super::*;

	use crate::ser::parse_rr_stream;
	use crate::test::fixtures::*;

	#[test]
	fn root_ksk_is_anchored() {
		let (keys, _) = root_dnskey();
		let store = TrustStore::root();
		let anchored: Vec<u16> = keys.iter()
			.filter(|key| store.anchors_key(key, &[2]))
			.map(|key| key.key_tag())
			.collect();
		assert_eq!(anchored, vec![20326]);
		// SHA-256 anchors are ignored when only SHA-1 is allowed
		assert!(!keys.iter().any(|key| store.anchors_key(key, &[1])));
	}

	#[test]
	fn other_zones_are_not_anchored() {
		let (keys, _) = com_dnskey();
		let store = TrustStore::root();
		assert!(!keys.iter().any(|key| store.anchors_key(key, &[1, 2, 4])));

		let store = TrustStore::new(vec![com_ds().0]);
		assert!(keys.iter().any(|key| store.anchors_key(key, &[2])));
	}

	#[test]
	fn packed_anchors() {
		let store = TrustStore::root();
		let packed = store.pack().unwrap();
		let parsed = parse_rr_stream(&packed).unwrap();
		assert_eq!(parsed.len(), 2);
		assert!(parsed.iter().all(|rr| rr.ty() == DS::TYPE && rr.name().is_root()));

		// Order and duplicates in the store do not change the packed form
		let mut anchors = store.anchors().to_vec();
		anchors.reverse();
		anchors.push(anchors[0].clone());
		assert_eq!(TrustStore::new(anchors).pack().unwrap(), packed);
	}
}
