//! Error types for proof building, oracle syncing and configuration.

use thiserror::Error;

use crate::rr::{DisplayType, Name};

/// The ways building or submitting a proof can fail.
///
/// Every variant names the DNS name and record type it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ProofError {
	/// The upstream resolver could not be reached or did not answer successfully.
	#[error("transport failure querying {name} {ty}: {reason}")]
	Transport {
		/// The queried name
		name: Name,
		/// The queried type
		ty: DisplayType,
		/// What went wrong
		reason: String,
	},
	/// A response or record could not be parsed.
	#[error("malformed data for {name} {ty}: {reason}")]
	Decode {
		/// The name being decoded
		name: Name,
		/// The type being decoded
		ty: DisplayType,
		/// What was malformed
		reason: String,
	},
	/// A signature uses an algorithm outside the configured allow-list.
	#[error("unsupported signature algorithm {alg} for {name} {ty}")]
	UnsupportedAlgorithm {
		/// The owner of the signed RRset
		name: Name,
		/// The type of the signed RRset
		ty: DisplayType,
		/// The rejected algorithm
		alg: u8,
	},
	/// No DS record for a key uses a digest type in the configured allow-list.
	#[error("unsupported DS digest type {digest_type} for {name} {ty}")]
	UnsupportedDigest {
		/// The DS owner
		name: Name,
		/// The record type being anchored
		ty: DisplayType,
		/// The rejected digest type
		digest_type: u8,
	},
	/// No signature in the response verifies the RRset.
	#[error("no valid signature for {name} {ty}")]
	NoSignature {
		/// The owner of the RRset
		name: Name,
		/// The type of the RRset
		ty: DisplayType,
	},
	/// No key matching a signature's algorithm and key tag verifies it.
	#[error("no key {key_tag} at {signer} verifies {name} {ty}")]
	KeyNotFound {
		/// The owner of the signed RRset
		name: Name,
		/// The type of the signed RRset
		ty: DisplayType,
		/// The signer named by the signature
		signer: Name,
		/// The key tag named by the signature
		key_tag: u16,
	},
	/// The zone publishes neither the record nor a signed proof of its absence.
	#[error("{name} {ty} is not secure: no signed record or NSEC proof")]
	NotSecure {
		/// The queried name
		name: Name,
		/// The queried type
		ty: DisplayType,
	},
	/// A zone's keys could not be linked to a trust anchor or a parent DS.
	#[error("no trust anchor or DS matches the keys of {name} ({ty})")]
	TrustAnchorMismatch {
		/// The zone whose keys were not anchored
		name: Name,
		/// The record type whose proof needed the keys
		ty: DisplayType,
	},
	/// The oracle already holds a newer signature than the one proven locally.
	#[error("oracle holds a newer {name} {ty} (inception {on_chain}) than ours (inception {local})")]
	StaleLocalProof {
		/// The RRset owner
		name: Name,
		/// The RRset type
		ty: DisplayType,
		/// The inception stored by the oracle
		on_chain: u32,
		/// The inception of our signature
		local: u32,
	},
	/// Reading the oracle's state failed.
	#[error("oracle read for {name} {ty} failed: {reason}")]
	Ledger {
		/// The RRset owner
		name: Name,
		/// The RRset type
		ty: DisplayType,
		/// What went wrong
		reason: String,
	},
	/// Handing a planned transaction to the submitter failed.
	#[error("submitting {name} {ty} failed: {reason}")]
	Submit {
		/// The RRset owner
		name: Name,
		/// The RRset type
		ty: DisplayType,
		/// What went wrong
		reason: String,
	},
	/// The chain of trust is deeper than the configured limit.
	#[error("chain for {name} {ty} exceeds the maximum depth of {depth}")]
	RecursionLimit {
		/// The name being proven when the limit was hit
		name: Name,
		/// The type being proven when the limit was hit
		ty: DisplayType,
		/// The configured limit
		depth: usize,
	},
}

impl ProofError {
	/// Whether this failure only rules out one candidate signature or key, so the next candidate
	/// should be tried rather than failing the whole proof.
	pub fn is_candidate_failure(&self) -> bool {
		matches!(self,
			ProofError::NoSignature { .. } | ProofError::KeyNotFound { .. } |
			ProofError::UnsupportedAlgorithm { .. } | ProofError::UnsupportedDigest { .. })
	}

	pub(crate) fn decode(name: &Name, ty: u16, reason: impl Into<String>) -> ProofError {
		ProofError::Decode { name: name.clone(), ty: DisplayType(ty), reason: reason.into() }
	}

	pub(crate) fn transport(name: &Name, ty: u16, reason: impl ToString) -> ProofError {
		ProofError::Transport { name: name.clone(), ty: DisplayType(ty), reason: reason.to_string() }
	}

	// Whether two errors are the same kind of failure, ignoring their details.
	pub(crate) fn same_kind(&self, other: &ProofError) -> bool {
		std::mem::discriminant(self) == std::mem::discriminant(other)
	}
}

/// Invalid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
	/// An environment variable could not be parsed.
	#[error("invalid value {value:?} for {var}: {reason}")]
	InvalidVar {
		/// The variable
		var: &'static str,
		/// Its value
		value: String,
		/// Why it was rejected
		reason: String,
	},
	/// A signature algorithm this crate cannot verify was allowed.
	#[error("signature algorithm {0} is not supported")]
	UnsupportedAlgorithm(u8),
	/// A DS digest type this crate cannot compute was allowed.
	#[error("DS digest type {0} is not supported")]
	UnsupportedDigest(u8),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn messages_name_the_record() {
		let err = ProofError::NoSignature {
			name: "_ens.example.com.".try_into().unwrap(), ty: DisplayType(16),
		};
		assert_eq!(err.to_string(), "no valid signature for _ens.example.com. TXT");
		assert!(err.is_candidate_failure());

		let err = ProofError::transport(&Name::root(), 48, "connection refused");
		assert_eq!(err.to_string(), "transport failure querying . DNSKEY: connection refused");
		assert!(!err.is_candidate_failure());
	}

	#[test]
	fn kinds() {
		let a = ProofError::NoSignature { name: Name::root(), ty: DisplayType(48) };
		let b = ProofError::NoSignature { name: "com.".try_into().unwrap(), ty: DisplayType(43) };
		let c = ProofError::NotSecure { name: Name::root(), ty: DisplayType(48) };
		assert!(a.same_kind(&b));
		assert!(!a.same_kind(&c));
	}
}
