//! Plans the submissions which bring an on-chain DNSSEC oracle up to date with a [`ProofChain`].
//!
//! Only chains built (and so verified) by a [`ChainBuilder`] can be planned.
//!
//! The oracle only accepts an RRset if it is signed by a key it already holds (or by one of its
//! trust anchors), so a chain must be submitted in order, starting from the first entry the
//! oracle does not already have. Reading oracle state and submitting transactions are left to
//! the [`OracleLedger`] and [`Submitter`] implementations.
//!
//! [`ChainBuilder`]: crate::proof::ChainBuilder

use std::fmt;

use tracing::{debug, info};

use crate::error::ProofError;
use crate::proof::{ProofChain, SignedSet};
use crate::rr::*;

/// What an oracle stores for one (type, name).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OracleRecordView {
	/// The inception of the signature the stored RRset was accepted with, or 0 if absent.
	pub inception: u32,
	/// When the RRset was stored, in the ledger's own clock.
	pub inserted: u64,
	/// The leading 20 bytes of the Keccak-256 of the stored canonical RRset.
	pub hash: [u8; 20],
}

impl OracleRecordView {
	/// Whether this is the all-zero sentinel for an RRset the oracle does not hold.
	pub fn is_absent(&self) -> bool { self.inception == 0 }
}

/// Read-only access to an oracle's state.
pub trait OracleLedger {
	/// The error returned when the ledger cannot be read.
	type Error: fmt::Display;

	/// Reads what the oracle stores for the RRset of type `ty` at `name`, if anything.
	fn read_record(&self, ty: u16, name: &Name) -> Result<Option<OracleRecordView>, Self::Error>;

	/// Reads the oracle's trust anchors, as the canonical DS RRset which authenticates the first
	/// entry of every chain.
	fn read_trust_anchors(&self) -> Result<Vec<u8>, Self::Error>;
}

/// A single RRset submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
	/// The RRset owner.
	pub name: Name,
	/// The RRset type.
	pub ty: u16,
	/// The signed data: RRSIG fields followed by the canonical RRset.
	pub data: Vec<u8>,
	/// The raw signature over [`Self::data`].
	pub sig: Vec<u8>,
	/// The canonical RRset (of DNSKEYs or DS records) which authenticates this one.
	pub proof: Vec<u8>,
}

/// A request to delete an RRset the oracle holds but which no longer exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deletion {
	/// The type to delete.
	pub ty: u16,
	/// The name to delete.
	pub name: Name,
	/// The signed data of the NSEC RRset proving non-existence.
	pub nsec_data: Vec<u8>,
	/// The raw signature over [`Self::nsec_data`].
	pub nsec_sig: Vec<u8>,
	/// The canonical DNSKEY RRset which authenticates the NSEC RRset.
	pub proof: Vec<u8>,
}

/// One planned oracle transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedTx {
	/// Submit an RRset.
	Submit(Submission),
	/// Delete an RRset.
	Delete(Deletion),
}

/// Sends planned transactions to the oracle.
///
/// Transactions must be sent in the order given, as each one depends on the previous one being
/// accepted. Nonces, gas and confirmation are the implementation's concern.
pub trait Submitter {
	/// Identifies a sent transaction.
	type Handle;
	/// The error returned when a transaction cannot be sent.
	type Error: fmt::Display;

	/// Sends an RRset submission.
	fn submit(&mut self, submission: &Submission) -> Result<Self::Handle, Self::Error>;
	/// Sends a deletion.
	fn submit_delete(&mut self, deletion: &Deletion) -> Result<Self::Handle, Self::Error>;
}

/// Compares [`SignedSet`]s against what an oracle holds and plans the transactions to catch it up.
pub struct OracleSync<L: OracleLedger> {
	ledger: L,
}

impl<L: OracleLedger> OracleSync<L> {
	/// Plans against the state in `ledger`.
	pub fn new(ledger: L) -> Self { OracleSync { ledger } }

	/// The underlying ledger.
	pub fn ledger(&self) -> &L { &self.ledger }

	fn ledger_error(name: &Name, ty: u16, e: L::Error) -> ProofError {
		ProofError::Ledger { name: name.clone(), ty: DisplayType(ty), reason: e.to_string() }
	}

	/// Whether the oracle already holds `set`.
	///
	/// Fails with [`ProofError::StaleLocalProof`] if the oracle holds a version signed after
	/// `set` was. A version signed at the same time or earlier, but with different contents, is
	/// out of date and may be replaced.
	pub fn matches(&self, set: &SignedSet) -> Result<bool, ProofError> {
		let (name, ty) = (set.name(), set.ty());
		let record = self.ledger.read_record(ty, name)
			.map_err(|e| Self::ledger_error(name, ty, e))?;
		let record = match record {
			Some(record) if !record.is_absent() => record,
			_ => {
				info!(name = %name, ty = %DisplayType(ty), "RRset does not exist");
				return Ok(false);
			},
		};
		let inception = set.sig().inception;
		if record.inception > inception {
			return Err(ProofError::StaleLocalProof {
				name: name.clone(), ty: DisplayType(ty), on_chain: record.inception, local: inception,
			});
		}
		if record.hash != set.rrset_hash() {
			info!(name = %name, ty = %DisplayType(ty), current = record.inception, new = inception,
				"RRset exists but is out of date");
			return Ok(false);
		}
		info!(name = %name, ty = %DisplayType(ty), "RRset already exists");
		Ok(true)
	}

	/// Returns the index of the first entry of `chain` the oracle does not hold, or the length of
	/// `chain` if it holds them all.
	pub fn diff(&self, chain: &ProofChain) -> Result<usize, ProofError> {
		self.first_unknown(chain)
	}

	fn first_unknown(&self, chain: &[SignedSet]) -> Result<usize, ProofError> {
		for (idx, set) in chain.iter().enumerate() {
			if !self.matches(set)? { return Ok(idx); }
		}
		Ok(chain.len())
	}

	/// The proof which authenticates `chain[idx]`: the previous entry's canonical RRset, or the
	/// oracle's trust anchors for the first entry.
	fn anchor_proof(&self, chain: &[SignedSet], idx: usize) -> Result<Vec<u8>, ProofError> {
		match idx.checked_sub(1).and_then(|prev| chain.get(prev)) {
			Some(prev) => Ok(prev.packed_rrset().to_vec()),
			None => {
				let (name, ty) = chain.first().map(|set| (set.name().clone(), set.ty()))
					.unwrap_or((Name::root(), DnsKey::TYPE));
				self.ledger.read_trust_anchors().map_err(|e| Self::ledger_error(&name, ty, e))
			},
		}
	}

	/// Serializes `chain[from..]` for a single batched submission, returning the payload and the
	/// proof which authenticates its first entry.
	///
	/// The payload holds, for each entry, its signed data then its signature, each prefixed
	/// with a big-endian `u16` length.
	pub fn serialize_suffix(&self, chain: &ProofChain, from: usize) -> Result<(Vec<u8>, Vec<u8>), ProofError> {
		let mut payload = Vec::new();
		for set in chain.iter().skip(from) {
			for field in [set.signed_data(), &set.sig().signature[..]] {
				let len = u16::try_from(field.len())
					.map_err(|_| ProofError::decode(set.name(), set.ty(), "entry too long to serialize"))?;
				payload.extend_from_slice(&len.to_be_bytes());
				payload.extend_from_slice(field);
			}
		}
		let proof = self.anchor_proof(chain, from.min(chain.len()))?;
		Ok((payload, proof))
	}

	/// Plans one submission per entry of `chain` the oracle does not hold yet, in chain order.
	///
	/// Each submission carries the previous entry's canonical RRset as its proof.
	pub fn plan_submit(&self, chain: &ProofChain) -> Result<Vec<Submission>, ProofError> {
		self.plan_sets(chain)
	}

	fn plan_sets(&self, chain: &[SignedSet]) -> Result<Vec<Submission>, ProofError> {
		let first_unknown = self.first_unknown(chain)?;
		debug!(first_unknown, len = chain.len(), "compared chain against oracle");
		if first_unknown == chain.len() { return Ok(Vec::new()); }

		let mut proof = self.anchor_proof(chain, first_unknown)?;
		let mut res = Vec::with_capacity(chain.len() - first_unknown);
		for set in &chain[first_unknown..] {
			info!(name = %set.name(), ty = %DisplayType(set.ty()), "planning submission");
			res.push(Submission {
				name: set.name().clone(),
				ty: set.ty(),
				data: set.signed_data().to_vec(),
				sig: set.sig().signature.clone(),
				proof,
			});
			proof = set.packed_rrset().to_vec();
		}
		Ok(res)
	}

	/// Plans the removal of the RRset of type `ty` at `name` from the oracle, given a `chain`
	/// which proves it does not exist.
	///
	/// Any entries of the chain before the NSEC RRset which the oracle lacks are submitted first.
	/// Nothing is planned if the oracle does not hold the RRset.
	pub fn plan_delete(&self, ty: u16, name: &Name, chain: &ProofChain) -> Result<Vec<PlannedTx>, ProofError> {
		let (nsec, rest) = match chain.split_last() {
			Some((nsec, rest)) if nsec.ty() == NSec::TYPE => (nsec, rest),
			_ => return Err(ProofError::NotSecure { name: name.clone(), ty: DisplayType(ty) }),
		};
		let record = self.ledger.read_record(ty, name)
			.map_err(|e| Self::ledger_error(name, ty, e))?;
		match record {
			Some(record) if !record.is_absent() && record.hash != [0; 20] => {},
			_ => {
				info!(name = %name, ty = %DisplayType(ty), "RRset does not exist, nothing to delete");
				return Ok(Vec::new());
			},
		}

		let mut res: Vec<PlannedTx> = self.plan_sets(rest)?.into_iter().map(PlannedTx::Submit).collect();
		let proof = self.anchor_proof(chain, rest.len())?;
		info!(name = %name, ty = %DisplayType(ty), nsec = %nsec.name(), "planning deletion");
		res.push(PlannedTx::Delete(pack_delete(ty, name, nsec, proof)));
		Ok(res)
	}
}

/// Builds the deletion of the RRset of type `ty` at `name`, proven absent by the NSEC RRset in
/// `nsec` and authenticated by the canonical DNSKEY RRset `proof`.
pub fn pack_delete(ty: u16, name: &Name, nsec: &SignedSet, proof: Vec<u8>) -> Deletion {
	Deletion {
		ty,
		name: name.clone(),
		nsec_data: nsec.signed_data().to_vec(),
		nsec_sig: nsec.sig().signature.clone(),
		proof,
	}
}

/// Hands each transaction of `plan` to `submitter`, in order, stopping at the first failure.
pub fn execute<S: Submitter>(plan: &[PlannedTx], submitter: &mut S) -> Result<Vec<S::Handle>, ProofError> {
	let mut handles = Vec::with_capacity(plan.len());
	for tx in plan {
		let handle = match tx {
			PlannedTx::Submit(submission) => {
				info!(name = %submission.name, ty = %DisplayType(submission.ty), "submitting RRset");
				submitter.submit(submission).map_err(|e| ProofError::Submit {
					name: submission.name.clone(), ty: DisplayType(submission.ty), reason: e.to_string(),
				})?
			},
			PlannedTx::Delete(deletion) => {
				info!(name = %deletion.name, ty = %DisplayType(deletion.ty), "deleting RRset");
				submitter.submit_delete(deletion).map_err(|e| ProofError::Submit {
					name: deletion.name.clone(), ty: DisplayType(deletion.ty), reason: e.to_string(),
				})?
			},
		};
		handles.push(handle);
	}
	Ok(handles)
}

#[cfg(test)]
mod tests {
	use super::*;

	use std::cell::Cell;
	use std::collections::HashMap;

	use crate::ser::read_u16;
	use crate::test::subscribe;
	use crate::test::zone::*;

	fn name(s: &str) -> Name { s.try_into().unwrap() }

	#[derive(Default)]
	struct MemoryLedger {
		records: HashMap<(u16, Name), OracleRecordView>,
		anchors: Vec<u8>,
		fail: bool,
		reads: Cell<usize>,
	}

	impl MemoryLedger {
		fn store(&mut self, set: &SignedSet) {
			self.store_at(set, set.sig().inception, set.rrset_hash());
		}
		fn store_at(&mut self, set: &SignedSet, inception: u32, hash: [u8; 20]) {
			self.records.insert((set.ty(), set.name().to_lowercase()),
				OracleRecordView { inception, inserted: 1, hash });
		}
	}

	impl OracleLedger for MemoryLedger {
		type Error = &'static str;
		fn read_record(&self, ty: u16, name: &Name) -> Result<Option<OracleRecordView>, &'static str> {
			self.reads.set(self.reads.get() + 1);
			if self.fail { return Err("node unreachable"); }
			Ok(self.records.get(&(ty, name.to_lowercase())).copied())
		}
		fn read_trust_anchors(&self) -> Result<Vec<u8>, &'static str> {
			if self.fail { return Err("node unreachable"); }
			Ok(self.anchors.clone())
		}
	}

	#[derive(Default)]
	struct RecordingSubmitter {
		sent: Vec<PlannedTx>,
		fail_after: Option<usize>,
	}

	impl Submitter for RecordingSubmitter {
		type Handle = usize;
		type Error = String;
		fn submit(&mut self, submission: &Submission) -> Result<usize, String> {
			if self.fail_after == Some(self.sent.len()) { return Err("nonce too low".to_owned()); }
			self.sent.push(PlannedTx::Submit(submission.clone()));
			Ok(self.sent.len())
		}
		fn submit_delete(&mut self, deletion: &Deletion) -> Result<usize, String> {
			if self.fail_after == Some(self.sent.len()) { return Err("nonce too low".to_owned()); }
			self.sent.push(PlannedTx::Delete(deletion.clone()));
			Ok(self.sent.len())
		}
	}

	fn dnskey_chain(net: &TestNet) -> ProofChain {
		net.builder().prove(DnsKey::TYPE, CLASS_IN, &name("example.com.")).unwrap().0
	}

	fn ledger() -> MemoryLedger {
		MemoryLedger { anchors: b"anchors".to_vec(), ..MemoryLedger::default() }
	}

	#[test]
	fn empty_oracle_gets_everything() {
		subscribe();
		let net = TestNet::new();
		let chain = dnskey_chain(&net);
		assert_eq!(chain.len(), 5);
		let sync = OracleSync::new(ledger());
		assert_eq!(sync.diff(&chain).unwrap(), 0);
		let plan = sync.plan_submit(&chain).unwrap();
		assert_eq!(plan.len(), 5);
		assert_eq!(plan[0].proof, b"anchors");
		for (idx, submission) in plan.iter().enumerate().skip(1) {
			assert_eq!(submission.proof, chain[idx - 1].packed_rrset());
		}
		assert_eq!(plan[4].name.as_str(), "example.com.");
		assert_eq!(plan[4].ty, DnsKey::TYPE);
		assert_eq!(plan[4].data, chain[4].signed_data());
		assert_eq!(plan[4].sig, chain[4].sig().signature);
	}

	#[test]
	fn partial_suffix() {
		let net = TestNet::new();
		let chain = dnskey_chain(&net);
		let mut ledger = ledger();
		ledger.store(&chain[0]);
		ledger.store(&chain[1]);
		// Entries after the first unknown one are never read
		ledger.store_at(&chain[3], INCEPTION + 10, [1; 20]);
		let sync = OracleSync::new(ledger);
		assert_eq!(sync.diff(&chain).unwrap(), 2);
		assert_eq!(sync.ledger().reads.get(), 3);

		let plan = sync.plan_submit(&chain).unwrap();
		assert_eq!(plan.len(), 3);
		assert_eq!(plan[0].proof, chain[1].packed_rrset());
		assert_eq!(plan[1].proof, chain[2].packed_rrset());
		assert_eq!(plan[2].proof, chain[3].packed_rrset());
		assert_eq!(plan.iter().map(|s| s.ty).collect::<Vec<_>>(), vec![DnsKey::TYPE, DS::TYPE, DnsKey::TYPE]);
	}

	#[test]
	fn up_to_date_oracle() {
		let net = TestNet::new();
		let chain = dnskey_chain(&net);
		let mut ledger = ledger();
		for set in chain.iter() { ledger.store(set); }
		let sync = OracleSync::new(ledger);
		assert_eq!(sync.diff(&chain).unwrap(), chain.len());
		assert!(sync.plan_submit(&chain).unwrap().is_empty());
		assert!(sync.matches(chain.last().unwrap()).unwrap());
	}

	#[test]
	fn out_of_date_records() {
		let net = TestNet::new();
		let chain = dnskey_chain(&net);

		let mut ledger = ledger();
		ledger.store_at(&chain[0], INCEPTION - 1, [7; 20]);
		let sync = OracleSync::new(ledger);
		assert!(!sync.matches(&chain[0]).unwrap());
		assert_eq!(sync.diff(&chain).unwrap(), 0);

		// Equal inception with different contents is replaced rather than rejected
		let mut ledger = self::ledger();
		ledger.store_at(&chain[0], INCEPTION, [7; 20]);
		assert_eq!(OracleSync::new(ledger).diff(&chain).unwrap(), 0);

		// An older signature over the same contents is still current
		let mut ledger = self::ledger();
		ledger.store_at(&chain[0], INCEPTION - 1, chain[0].rrset_hash());
		assert!(OracleSync::new(ledger).matches(&chain[0]).unwrap());
	}

	#[test]
	fn newer_oracle_record_is_an_error() {
		let net = TestNet::new();
		let chain = dnskey_chain(&net);
		let mut ledger = ledger();
		ledger.store(&chain[0]);
		ledger.store_at(&chain[1], INCEPTION + 1, chain[1].rrset_hash());
		let sync = OracleSync::new(ledger);
		let err = sync.diff(&chain).unwrap_err();
		assert_eq!(err, ProofError::StaleLocalProof {
			name: name("com."), ty: DisplayType(DS::TYPE), on_chain: INCEPTION + 1, local: INCEPTION,
		});
		assert!(sync.plan_submit(&chain).is_err());
	}

	#[test]
	fn ledger_failures() {
		let net = TestNet::new();
		let chain = dnskey_chain(&net);
		let sync = OracleSync::new(MemoryLedger { fail: true, ..MemoryLedger::default() });
		let err = sync.diff(&chain).unwrap_err();
		assert_eq!(err.to_string(), "oracle read for . DNSKEY failed: node unreachable");
	}

	#[test]
	fn serialized_suffix() {
		let net = TestNet::new();
		let chain = dnskey_chain(&net);
		let sync = OracleSync::new(ledger());

		let (payload, proof) = sync.serialize_suffix(&chain, 3).unwrap();
		assert_eq!(proof, chain[2].packed_rrset());
		let mut read = &payload[..];
		for set in &chain[3..] {
			for field in [set.signed_data(), &set.sig().signature[..]] {
				let len = read_u16(&mut read).unwrap() as usize;
				assert_eq!(&read[..len], field);
				read = &read[len..];
			}
		}
		assert!(read.is_empty());

		let (_, proof) = sync.serialize_suffix(&chain, 0).unwrap();
		assert_eq!(proof, b"anchors");
		let (payload, proof) = sync.serialize_suffix(&chain, chain.len()).unwrap();
		assert!(payload.is_empty());
		assert_eq!(proof, chain[4].packed_rrset());
	}

	#[test]
	fn deletion() {
		subscribe();
		let net = TestNet::new();
		let target = name("_ens.example.com.");
		let (chain, existed) = net.builder().prove(Txt::TYPE, CLASS_IN, &target).unwrap();
		assert!(!existed);

		// Nothing to delete if the oracle has nothing
		let sync = OracleSync::new(ledger());
		assert!(sync.plan_delete(Txt::TYPE, &target, &chain).unwrap().is_empty());

		let mut ledger = ledger();
		ledger.records.insert((Txt::TYPE, target.clone()),
			OracleRecordView { inception: INCEPTION - 100, inserted: 5, hash: [9; 20] });
		for set in &chain[..3] { ledger.store(set); }
		let sync = OracleSync::new(ledger);
		let plan = sync.plan_delete(Txt::TYPE, &target, &chain).unwrap();
		assert_eq!(plan.len(), 3);
		assert!(matches!(&plan[0], PlannedTx::Submit(s) if s.ty == DS::TYPE && s.proof == chain[2].packed_rrset()));
		assert!(matches!(&plan[1], PlannedTx::Submit(s) if s.ty == DnsKey::TYPE));
		match &plan[2] {
			PlannedTx::Delete(deletion) => {
				assert_eq!(deletion.ty, Txt::TYPE);
				assert_eq!(deletion.name, target);
				assert_eq!(deletion.nsec_data, chain[5].signed_data());
				assert_eq!(deletion.nsec_sig, chain[5].sig().signature);
				// Authenticated by the example.com. DNSKEY RRset
				assert_eq!(deletion.proof, chain[4].packed_rrset());
			},
			_ => panic!(),
		}

		let mut submitter = RecordingSubmitter::default();
		assert_eq!(execute(&plan, &mut submitter).unwrap(), vec![1, 2, 3]);
		assert_eq!(submitter.sent, plan);
	}

	#[test]
	fn deletion_needs_nsec() {
		let net = TestNet::new();
		let chain = dnskey_chain(&net);
		let sync = OracleSync::new(ledger());
		assert!(matches!(sync.plan_delete(Txt::TYPE, &name("example.com."), &chain),
			Err(ProofError::NotSecure { .. })));
		assert!(matches!(sync.plan_delete(Txt::TYPE, &name("example.com."), &ProofChain(Vec::new())),
			Err(ProofError::NotSecure { .. })));
	}

	#[test]
	fn execution_stops_at_first_failure() {
		let net = TestNet::new();
		let chain = dnskey_chain(&net);
		let sync = OracleSync::new(ledger());
		let plan: Vec<PlannedTx> = sync.plan_submit(&chain).unwrap().into_iter().map(PlannedTx::Submit).collect();
		let mut submitter = RecordingSubmitter { fail_after: Some(2), ..RecordingSubmitter::default() };
		let err = execute(&plan, &mut submitter).unwrap_err();
		assert_eq!(err.to_string(), "submitting com. DNSKEY failed: nonce too low");
		assert_eq!(submitter.sent.len(), 2);
	}
}
