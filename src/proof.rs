//! Builds chains of trust from a trust anchor down to a record, or to the proof that it does not
//! exist.
//!
//! A chain is a list of [`SignedSet`]s, outermost first. Each entry is verified by keys proven
//! earlier in the chain, except self-signed apex DNSKEY sets, which are anchored by a DS proven
//! earlier in the chain or directly by the [`TrustStore`].

use std::ops::Deref;

use tracing::{debug, warn};

use crate::anchors::TrustStore;
use crate::canon::{pack_rrset, pack_signed_data, rrset_hash};
use crate::config::Config;
use crate::error::ProofError;
use crate::query::{Resolver, Transport};
use crate::rr::*;
use crate::validation::{ds_matches, key_matches, verify_signature, ValidationError, SUPPORTED_DIGESTS};

/// An RRset paired with the signature which vouches for it, and the name it was fetched for.
///
/// The canonical encodings are computed once, on construction. Sets are only handed out as
/// entries of a verified [`ProofChain`], so one cannot be built from unchecked records:
///
/// ```compile_fail
/// # use dnsprove::proof::SignedSet;
/// # use dnsprove::rr::{Name, RRSig, RR};
/// fn forge(sig: RRSig, rrs: Vec<RR>) -> SignedSet {
/// 	SignedSet::new(sig, rrs, Name::root()).unwrap()
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedSet {
	sig: RRSig,
	rrs: Vec<RR>,
	query_name: Name,
	signed_data: Vec<u8>,
	packed_rrset: Vec<u8>,
}

impl SignedSet {
	/// Pairs `rrs` with `sig`.
	///
	/// This does not check the signature; it fails only if `rrs` is empty, is not a single RRset
	/// of the type `sig` covers, or cannot be put in the canonical form `sig` describes.
	pub(crate) fn new(sig: RRSig, rrs: Vec<RR>, query_name: Name) -> Result<SignedSet, ProofError> {
		let owner = match rrs.first() {
			Some(rr) => rr.name().clone(),
			None => return Err(ProofError::decode(&query_name, sig.ty, "empty RRset")),
		};
		if rrs.iter().any(|rr| rr.ty() != sig.ty || !rr.name().eq_ignore_case(&owner)) {
			return Err(ProofError::decode(&owner, sig.ty, "records do not form the RRset the signature covers"));
		}
		let signed_data = pack_signed_data(&rrs, &sig)?;
		let packed_rrset = pack_rrset(&rrs, &sig)?;
		Ok(SignedSet { sig, rrs, query_name, signed_data, packed_rrset })
	}

	/// The covering signature.
	pub fn sig(&self) -> &RRSig { &self.sig }
	/// The records, as received.
	pub fn rrs(&self) -> &[RR] { &self.rrs }
	/// The name which was queried to find this RRset.
	pub fn query_name(&self) -> &Name { &self.query_name }
	/// The owner of the RRset.
	pub fn name(&self) -> &Name { self.rrs[0].name() }
	/// The type of the RRset.
	pub fn ty(&self) -> u16 { self.sig.ty }
	/// The exact bytes the signature was computed over.
	pub fn signed_data(&self) -> &[u8] { &self.signed_data }
	/// The canonical RRset, as stored by oracles.
	pub fn packed_rrset(&self) -> &[u8] { &self.packed_rrset }
	/// The hash an oracle stores for this RRset.
	pub fn rrset_hash(&self) -> [u8; 20] { rrset_hash(&self.packed_rrset) }

	fn dnskeys(&self) -> impl Iterator<Item = &DnsKey> {
		self.rrs.iter().filter_map(|rr| if let RR::DnsKey(key) = rr { Some(key) } else { None })
	}

	fn ds_records(&self) -> impl Iterator<Item = &DS> {
		self.rrs.iter().filter_map(|rr| if let RR::DS(ds) = rr { Some(ds) } else { None })
	}
}

/// A verified chain of [`SignedSet`]s, from the trust anchor outward to the proven record (or
/// NSEC record) last.
///
/// Only [`ChainBuilder::prove`] creates chains:
///
/// ```compile_fail
/// # use dnsprove::proof::ProofChain;
/// let chain = ProofChain(Vec::new());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofChain(pub(crate) Vec<SignedSet>);

impl ProofChain {
	/// The entries of this chain.
	pub fn into_inner(self) -> Vec<SignedSet> { self.0 }
}

impl Deref for ProofChain {
	type Target = [SignedSet];
	fn deref(&self) -> &[SignedSet] { &self.0 }
}

/// Signatures in `rrs` covering type `ty` at `owner`, in the order received.
fn sigs_for(rrs: &[RR], owner: &Name, ty: u16) -> Vec<RRSig> {
	rrs.iter().filter_map(|rr| match rr {
		RR::RRSig(sig) if sig.ty == ty && sig.name.eq_ignore_case(owner) => Some(sig.clone()),
		_ => None,
	}).collect()
}

/// Picks the error to report once every candidate failed: the common error if they all failed
/// the same way, otherwise [`ProofError::NoSignature`].
fn aggregate(mut failures: Vec<ProofError>, name: &Name, ty: u16) -> ProofError {
	if !failures.is_empty() && failures.iter().all(|e| e.same_kind(&failures[0])) {
		failures.swap_remove(0)
	} else {
		ProofError::NoSignature { name: name.clone(), ty: DisplayType(ty) }
	}
}

/// Builds [`ProofChain`]s by querying a [`Resolver`], checking every step as it goes.
///
/// Each recursive lookup (the DNSKEYs of a signer, the DS records of a zone) is one blocking
/// query, and nothing is cached between calls to [`ChainBuilder::prove`].
pub struct ChainBuilder<T: Transport> {
	resolver: Resolver<T>,
	anchors: TrustStore,
	algorithms: Vec<u8>,
	digests: Vec<u8>,
	max_depth: usize,
}

impl<T: Transport> ChainBuilder<T> {
	/// Builds chains ending at `anchors`, trusting only the algorithms and digest types
	/// `config` allows.
	pub fn new(resolver: Resolver<T>, anchors: TrustStore, config: &Config) -> Self {
		ChainBuilder {
			resolver,
			anchors,
			algorithms: config.algorithms.clone(),
			digests: config.digests.iter().copied().filter(|d| SUPPORTED_DIGESTS.contains(d)).collect(),
			max_depth: config.max_depth,
		}
	}

	/// The resolver queries are sent through.
	pub fn resolver(&self) -> &Resolver<T> { &self.resolver }

	/// Proves the RRset of type `qtype` at `name`, or its non-existence.
	///
	/// Returns the chain and whether the RRset exists. If it does not, the last entry of the
	/// chain is a signed NSEC record covering `name` (or, if `name` exists, showing it has no
	/// records of type `qtype`).
	pub fn prove(&self, qtype: u16, qclass: u16, name: &Name) -> Result<(ProofChain, bool), ProofError> {
		if qclass != CLASS_IN {
			return Err(ProofError::decode(name, qtype, format!("unsupported class {}", qclass)));
		}
		let mut chain = Vec::new();
		let existed = self.prove_at(qtype, name, 0, &mut chain)?;
		Ok((ProofChain(chain), existed))
	}

	fn prove_at(&self, qtype: u16, name: &Name, depth: usize, chain: &mut Vec<SignedSet>) -> Result<bool, ProofError> {
		if depth > self.max_depth {
			return Err(ProofError::RecursionLimit { name: name.clone(), ty: DisplayType(qtype), depth: self.max_depth });
		}
		let msg = self.resolver.query(qtype, CLASS_IN, name)?;

		let rrs: Vec<RR> = msg.answers.iter()
			.filter(|rr| rr.ty() == qtype && rr.name().eq_ignore_case(name))
			.cloned().collect();
		if !rrs.is_empty() {
			let sigs = sigs_for(&msg.answers, name, qtype);
			self.prove_rrset(name, rrs, sigs, depth, chain)?;
			return Ok(true);
		}

		let covering = msg.authorities.iter().filter_map(|rr| match rr {
			RR::NSec(nsec) if nsec.covers(name) => Some(nsec),
			_ => None,
		}).filter(|nsec| !nsec.name.eq_ignore_case(name) || !nsec.has_type(qtype));
		for nsec in covering {
			let mut sigs = sigs_for(&msg.authorities, &nsec.name, NSec::TYPE);
			// Only the parent zone can deny a DS, and its key is proven without this DS
			if qtype == DS::TYPE {
				sigs.retain(|sig| !sig.key_name.eq_ignore_case(name) && name.is_subdomain_of(&sig.key_name));
			}
			let mut candidate = Vec::new();
			match self.prove_rrset(name, vec![nsec.clone().into()], sigs, depth, &mut candidate) {
				Ok(()) => {
					debug!(name = %name, ty = %DisplayType(qtype), nsec = %nsec.name, "proved non-existence");
					chain.append(&mut candidate);
					return Ok(false);
				},
				Err(e) if e.is_candidate_failure() => {
					warn!(name = %name, ty = %DisplayType(qtype), nsec = %nsec.name, error = %e, "NSEC record could not be verified");
				},
				Err(e) => return Err(e),
			}
		}
		Err(ProofError::NotSecure { name: name.clone(), ty: DisplayType(qtype) })
	}

	/// Proves `rrs` with the first of `sigs` which verifies.
	fn prove_rrset(&self, query_name: &Name, rrs: Vec<RR>, sigs: Vec<RRSig>, depth: usize, chain: &mut Vec<SignedSet>)
	-> Result<(), ProofError> {
		let owner = rrs[0].name().clone();
		let ty = rrs[0].ty();
		let mut failures = Vec::new();
		let mut anchor_mismatch = None;
		for sig in sigs {
			let mut candidate = Vec::new();
			match self.verify_candidate(query_name, &rrs, &sig, depth, &mut candidate) {
				Ok(()) => {
					chain.append(&mut candidate);
					return Ok(());
				},
				Err(e) => {
					warn!(name = %owner, ty = %DisplayType(ty), signer = %sig.key_name, alg = sig.alg,
						key_tag = sig.key_tag, error = %e, "failed to verify RRset with signature");
					match e {
						ProofError::TrustAnchorMismatch { .. } => { anchor_mismatch.get_or_insert(e); },
						e if e.is_candidate_failure() => failures.push(e),
						e => return Err(e),
					}
				},
			}
		}
		// Keys which verified but could not be anchored are the more important failure
		if let Some(e) = anchor_mismatch { return Err(e); }
		Err(aggregate(failures, &owner, ty))
	}

	/// Verifies `rrs` against one candidate signature, pushing the chain which proves the signing
	/// key followed by the RRset itself.
	fn verify_candidate(&self, query_name: &Name, rrs: &[RR], sig: &RRSig, depth: usize, chain: &mut Vec<SignedSet>)
	-> Result<(), ProofError> {
		let owner = rrs[0].name();
		let ty = sig.ty;
		if !self.algorithms.contains(&sig.alg) {
			return Err(ProofError::UnsupportedAlgorithm { name: owner.clone(), ty: DisplayType(ty), alg: sig.alg });
		}
		let signed_by_owner = owner.eq_ignore_case(&sig.key_name);
		// The signer must be at or above the owner, and DS records come from the parent zone, so
		// every recursive lookup is for a strictly shorter name.
		if !owner.is_subdomain_of(&sig.key_name) || (ty == DS::TYPE && signed_by_owner) {
			return Err(ProofError::NoSignature { name: owner.clone(), ty: DisplayType(ty) });
		}
		let set = SignedSet::new(sig.clone(), rrs.to_vec(), query_name.clone())?;

		let self_signed = ty == DnsKey::TYPE && signed_by_owner;
		let mut key_chain = Vec::new();
		let keys: Vec<DnsKey> = if self_signed {
			set.dnskeys().cloned().collect()
		} else {
			if !self.prove_at(DnsKey::TYPE, &sig.key_name, depth + 1, &mut key_chain)? {
				return Err(ProofError::KeyNotFound {
					name: owner.clone(), ty: DisplayType(ty), signer: sig.key_name.clone(), key_tag: sig.key_tag,
				});
			}
			key_chain.last().map(|keys| keys.dnskeys().cloned().collect()).unwrap_or_default()
		};

		let mut anchor_failure = None;
		for key in keys.iter().filter(|key| key_matches(sig, key)) {
			match verify_signature(key, sig, set.signed_data()) {
				Ok(()) => {},
				Err(ValidationError::UnsupportedAlgorithm) => {
					return Err(ProofError::UnsupportedAlgorithm { name: owner.clone(), ty: DisplayType(ty), alg: sig.alg });
				},
				Err(ValidationError::Invalid) => continue,
			}
			if self_signed {
				match self.verify_with_ds(key, depth, &mut key_chain) {
					Ok(()) => {},
					Err(e) if e.is_candidate_failure() || matches!(e, ProofError::TrustAnchorMismatch { .. }) => {
						anchor_failure.get_or_insert(e);
						key_chain.clear();
						continue;
					},
					Err(e) => return Err(e),
				}
			}
			chain.append(&mut key_chain);
			chain.push(set);
			return Ok(());
		}
		if let Some(e) = anchor_failure { return Err(e); }
		Err(ProofError::KeyNotFound {
			name: owner.clone(), ty: DisplayType(ty), signer: sig.key_name.clone(), key_tag: sig.key_tag,
		})
	}

	/// Links the self-signed apex key `key` to a trust anchor or to a DS record proven in its
	/// parent zone, pushing the DS chain if one was needed.
	fn verify_with_ds(&self, key: &DnsKey, depth: usize, chain: &mut Vec<SignedSet>) -> Result<(), ProofError> {
		if self.anchors.anchors_key(key, &self.digests) {
			debug!(name = %key.name, key_tag = key.key_tag(), "key matches a trust anchor");
			return Ok(());
		}
		let mismatch = || ProofError::TrustAnchorMismatch { name: key.name.clone(), ty: DisplayType(DnsKey::TYPE) };
		// The root can only be anchored by the trust store
		if key.name.is_root() { return Err(mismatch()); }

		let mut ds_chain = Vec::new();
		if !self.prove_at(DS::TYPE, &key.name, depth + 1, &mut ds_chain)? {
			// The parent proved the zone is unsigned
			return Err(mismatch());
		}
		let ds_set = match ds_chain.last() {
			Some(set) => set,
			None => return Err(mismatch()),
		};
		let mut usable = 0;
		let mut unsupported = None;
		let mut matched = None;
		for ds in ds_set.ds_records() {
			if !self.digests.contains(&ds.digest_type) {
				unsupported.get_or_insert(ds.digest_type);
				continue;
			}
			usable += 1;
			if ds_matches(ds, key).unwrap_or(false) {
				matched = Some(ds.digest_type);
				break;
			}
		}
		if let Some(digest_type) = matched {
			debug!(name = %key.name, key_tag = key.key_tag(), digest_type, "key matches a DS record");
			chain.append(&mut ds_chain);
			return Ok(());
		}
		match unsupported {
			Some(digest_type) if usable == 0 => Err(ProofError::UnsupportedDigest {
				name: key.name.clone(), ty: DisplayType(DS::TYPE), digest_type,
			}),
			_ => Err(mismatch()),
		}
	}
}
