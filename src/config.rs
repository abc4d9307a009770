//! Runtime configuration: which resolver to ask, and which algorithms to trust.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::validation::{SUPPORTED_ALGORITHMS, SUPPORTED_DIGESTS};

const ALGORITHM_MNEMONICS: [(&str, u8); 7] = [
	("RSASHA1", 5), ("RSASHA1-NSEC3-SHA1", 7), ("RSASHA256", 8), ("RSASHA512", 10),
	("ECDSAP256SHA256", 13), ("ECDSAP384SHA384", 14), ("ED25519", 15),
];
const DIGEST_MNEMONICS: [(&str, u8); 3] = [("SHA1", 1), ("SHA256", 2), ("SHA384", 4)];

/// Settings for building and checking proofs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	/// The recursive resolver queries are sent to.
	pub resolver: SocketAddr,
	/// DNSSEC signature algorithms which are trusted. Signatures using any other algorithm are
	/// treated as if they were missing.
	pub algorithms: Vec<u8>,
	/// DS digest types which are trusted.
	pub digests: Vec<u8>,
	/// I/O timeout for each exchange with the resolver.
	pub timeout: Duration,
	/// The deepest chain of recursive DNSKEY/DS lookups a proof may need.
	pub max_depth: usize,
	/// The EDNS UDP payload size advertised in queries.
	pub udp_payload_size: u16,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			resolver: SocketAddr::from(([8, 8, 8, 8], 53)),
			algorithms: vec![8, 13],
			digests: vec![2],
			timeout: Duration::from_secs(10),
			max_depth: 16,
			udp_payload_size: 4096,
		}
	}
}

fn parse_list(var: &'static str, value: &str, mnemonics: &[(&str, u8)]) -> Result<Vec<u8>, ConfigError> {
	let mut res = Vec::new();
	for item in value.split(',').map(str::trim).filter(|item| !item.is_empty()) {
		let id = mnemonics.iter()
			.find(|(mnemonic, _)| mnemonic.eq_ignore_ascii_case(item))
			.map(|(_, id)| *id)
			.or_else(|| item.parse().ok())
			.ok_or_else(|| ConfigError::InvalidVar {
				var, value: value.to_owned(), reason: format!("unknown identifier {}", item),
			})?;
		if !res.contains(&id) { res.push(id); }
	}
	if res.is_empty() {
		return Err(ConfigError::InvalidVar { var, value: value.to_owned(), reason: "empty list".to_owned() });
	}
	Ok(res)
}

fn parse_num<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError>
where T::Err: std::fmt::Display {
	value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidVar {
		var, value: value.to_owned(), reason: e.to_string(),
	})
}

impl Config {
	/// Loads a configuration from `DNSPROVE_*` environment variables, keeping the default for
	/// any which are unset.
	///
	/// * `DNSPROVE_RESOLVER`: socket address of the resolver, e.g. `1.1.1.1:53`
	/// * `DNSPROVE_ALGORITHMS`: comma-separated algorithm mnemonics or numbers, e.g.
	///   `RSASHA256,ECDSAP256SHA256`
	/// * `DNSPROVE_DIGESTS`: comma-separated digest mnemonics or numbers, e.g. `SHA256`
	/// * `DNSPROVE_TIMEOUT_SECS`
	/// * `DNSPROVE_MAX_DEPTH`
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_vars(|var| std::env::var(var).ok())
	}

	/// As [`Config::from_env`], reading variables through `lookup` instead.
	pub fn from_vars<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
		let mut config = Config::default();
		if let Some(value) = lookup("DNSPROVE_RESOLVER") {
			config.resolver = parse_num("DNSPROVE_RESOLVER", &value)?;
		}
		if let Some(value) = lookup("DNSPROVE_ALGORITHMS") {
			config.algorithms = parse_list("DNSPROVE_ALGORITHMS", &value, &ALGORITHM_MNEMONICS)?;
		}
		if let Some(value) = lookup("DNSPROVE_DIGESTS") {
			config.digests = parse_list("DNSPROVE_DIGESTS", &value, &DIGEST_MNEMONICS)?;
		}
		if let Some(value) = lookup("DNSPROVE_TIMEOUT_SECS") {
			config.timeout = Duration::from_secs(parse_num("DNSPROVE_TIMEOUT_SECS", &value)?);
		}
		if let Some(value) = lookup("DNSPROVE_MAX_DEPTH") {
			config.max_depth = parse_num("DNSPROVE_MAX_DEPTH", &value)?;
		}
		config.validate()?;
		Ok(config)
	}

	/// Checks that every allowed algorithm and digest type can actually be checked.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if let Some(alg) = self.algorithms.iter().find(|alg| !SUPPORTED_ALGORITHMS.contains(alg)) {
			return Err(ConfigError::UnsupportedAlgorithm(*alg));
		}
		if let Some(digest) = self.digests.iter().find(|digest| !SUPPORTED_DIGESTS.contains(digest)) {
			return Err(ConfigError::UnsupportedDigest(*digest));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use std::collections::HashMap;

	fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
		let vars: HashMap<String, String> = vars.iter()
			.map(|(k, v)| (k.to_string(), v.to_string())).collect();
		Config::from_vars(|var| vars.get(var).cloned())
	}

	#[test]
	fn defaults() {
		let config = load(&[]).unwrap();
		assert_eq!(config, Config::default());
		assert_eq!(config.resolver.to_string(), "8.8.8.8:53");
		assert_eq!(config.algorithms, vec![8, 13]);
		assert_eq!(config.digests, vec![2]);
	}

	#[test]
	fn overrides() {
		let config = load(&[
			("DNSPROVE_RESOLVER", "1.1.1.1:5353"),
			("DNSPROVE_ALGORITHMS", "rsasha256, ED25519,13"),
			("DNSPROVE_DIGESTS", "SHA256,SHA384"),
			("DNSPROVE_TIMEOUT_SECS", "3"),
			("DNSPROVE_MAX_DEPTH", "8"),
		]).unwrap();
		assert_eq!(config.resolver, SocketAddr::from(([1, 1, 1, 1], 5353)));
		assert_eq!(config.algorithms, vec![8, 15, 13]);
		assert_eq!(config.digests, vec![2, 4]);
		assert_eq!(config.timeout, Duration::from_secs(3));
		assert_eq!(config.max_depth, 8);
	}

	#[test]
	fn rejects_bad_values() {
		assert!(matches!(load(&[("DNSPROVE_RESOLVER", "localhost")]),
			Err(ConfigError::InvalidVar { var: "DNSPROVE_RESOLVER", .. })));
		assert!(matches!(load(&[("DNSPROVE_ALGORITHMS", "GOST")]),
			Err(ConfigError::InvalidVar { var: "DNSPROVE_ALGORITHMS", .. })));
		assert!(matches!(load(&[("DNSPROVE_DIGESTS", " , ")]),
			Err(ConfigError::InvalidVar { var: "DNSPROVE_DIGESTS", .. })));
		assert_eq!(load(&[("DNSPROVE_ALGORITHMS", "12")]), Err(ConfigError::UnsupportedAlgorithm(12)));
		assert_eq!(load(&[("DNSPROVE_DIGESTS", "3")]), Err(ConfigError::UnsupportedDigest(3)));
	}
}
