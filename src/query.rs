//! This module exposes utilities for sending single DNSSEC-enabled queries to a recursive
//! resolver and parsing the responses.
//!
//! The [`Transport`] trait is the seam to the network: [`TcpTransport`] speaks DNS over TCP and,
//! with the `doh` feature, `DohTransport` speaks DNS-over-HTTPS.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use tracing::{debug, trace};

use crate::config::Config;
use crate::error::ProofError;
use crate::rr::*;
use crate::ser::*;

/// Exchanges a single DNS message with a resolver.
///
/// Implementations receive a complete query message and return the complete response message,
/// without any framing. They should fail rather than hang once their timeout passes.
pub trait Transport {
	/// Sends `query` and returns the raw response.
	fn send(&self, query: &[u8]) -> Result<Vec<u8>, io::Error>;
}

impl<T: Transport + ?Sized> Transport for &T {
	fn send(&self, query: &[u8]) -> Result<Vec<u8>, io::Error> { (**self).send(query) }
}

/// Sends queries over a fresh TCP connection each, with RFC 1035 two-byte length framing.
#[derive(Debug, Clone)]
pub struct TcpTransport {
	resolver: SocketAddr,
	timeout: Duration,
}

impl TcpTransport {
	/// Queries `resolver`, giving up on any connect, read or write after `timeout`.
	pub fn new(resolver: SocketAddr, timeout: Duration) -> Self {
		TcpTransport { resolver, timeout }
	}

	/// Uses the resolver and timeout from `config`.
	pub fn from_config(config: &Config) -> Self {
		TcpTransport::new(config.resolver, config.timeout)
	}
}

fn send_query(stream: &mut TcpStream, query: &[u8]) -> Result<(), io::Error> {
	let len = u16::try_from(query.len())
		.map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "query too long"))?;
	stream.write_all(&len.to_be_bytes())?;
	stream.write_all(query)?;
	Ok(())
}

fn read_response(stream: &mut TcpStream) -> Result<Vec<u8>, io::Error> {
	let mut len_bytes = [0; 2];
	stream.read_exact(&mut len_bytes)?;
	let mut buf = vec![0; u16::from_be_bytes(len_bytes) as usize];
	stream.read_exact(&mut buf)?;
	Ok(buf)
}

impl Transport for TcpTransport {
	fn send(&self, query: &[u8]) -> Result<Vec<u8>, io::Error> {
		let mut stream = TcpStream::connect_timeout(&self.resolver, self.timeout)?;
		stream.set_read_timeout(Some(self.timeout))?;
		stream.set_write_timeout(Some(self.timeout))?;
		send_query(&mut stream, query)?;
		read_response(&mut stream)
	}
}

/// Sends queries as RFC 8484 DNS-over-HTTPS GET requests.
///
/// Each query is encoded as base64url and sent to `url?dns=...` with an `Accept` header of
/// `application/dns-message`.
#[cfg(feature = "doh")]
#[derive(Debug, Clone)]
pub struct DohTransport {
	url: String,
	timeout: Duration,
}

#[cfg(feature = "doh")]
impl DohTransport {
	/// Queries the DoH endpoint at `url`, e.g. `https://dns.google/dns-query`.
	pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
		DohTransport { url: url.into(), timeout }
	}
}

#[cfg(feature = "doh")]
impl Transport for DohTransport {
	fn send(&self, query: &[u8]) -> Result<Vec<u8>, io::Error> {
		use base64::Engine;
		let encoded = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(query);
		let response = minreq::get(format!("{}?dns={}", self.url, encoded))
			.with_header("Accept", "application/dns-message")
			.with_timeout(self.timeout.as_secs().max(1))
			.send()
			.map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
		if !(200..300).contains(&response.status_code) {
			return Err(io::Error::new(io::ErrorKind::Other,
				format!("HTTP status {} {}", response.status_code, response.reason_phrase)));
		}
		Ok(response.into_bytes())
	}
}

// We don't care about transaction IDs as we're only going to accept signed data.
// Further, if we're querying over DoH, the RFC says we SHOULD use a transaction ID of 0 here.
const TXID: u16 = 0;

const FLAG_QR: u16 = 0x8000;
const FLAG_TC: u16 = 0x0200;
const RCODE_NOERROR: u8 = 0;
const RCODE_NXDOMAIN: u8 = 3;

pub(crate) fn build_query(domain: &Name, ty: u16, udp_payload_size: u16) -> Vec<u8> {
	let mut query = Vec::with_capacity(64);
	query.extend_from_slice(&TXID.to_be_bytes());
	query.extend_from_slice(&[0x01, 0x20]); // Flags: Recursive, Authenticated Data
	query.extend_from_slice(&[0, 1, 0, 0, 0, 0, 0, 1]); // One question, One additional
	write_name(&mut query, domain);
	query.extend_from_slice(&ty.to_be_bytes());
	query.extend_from_slice(&CLASS_IN.to_be_bytes());
	query.extend_from_slice(&[0, 0, 0x29]); // . OPT
	query.extend_from_slice(&udp_payload_size.to_be_bytes());
	query.extend_from_slice(&[0, 0]); // EDNS version 0
	query.extend_from_slice(&0x8000u16.to_be_bytes()); // Accept DNSSEC RRs
	query.extend_from_slice(&0u16.to_be_bytes()); // No additional data
	query
}

fn rcode_name(rcode: u8) -> String {
	match rcode {
		1 => "FORMERR".to_owned(),
		2 => "SERVFAIL".to_owned(),
		4 => "NOTIMP".to_owned(),
		5 => "REFUSED".to_owned(),
		_ => format!("RCODE{}", rcode),
	}
}

/// A parsed response to a single question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
	/// The response code, either NOERROR (0) or NXDOMAIN (3).
	pub rcode: u8,
	/// The answer section, in the order received.
	pub answers: Vec<RR>,
	/// The authority section, in the order received.
	pub authorities: Vec<RR>,
}

fn parse_response(resp: &[u8], name: &Name, ty: u16) -> Result<Message, ProofError> {
	let decode = |reason: &str| ProofError::decode(name, ty, reason);
	let truncated = |()| decode("truncated response");

	let mut read: &[u8] = resp;
	if read_u16(&mut read).map_err(truncated)? != TXID {
		return Err(decode("unexpected transaction id"));
	}
	let flags = read_u16(&mut read).map_err(truncated)?;
	if flags & FLAG_QR == 0 {
		return Err(ProofError::transport(name, ty, "response is not marked as a response"));
	}
	if flags & FLAG_TC != 0 {
		return Err(ProofError::transport(name, ty, "response was truncated"));
	}
	if (flags >> 11) & 0xf != 0 {
		return Err(decode("unexpected opcode"));
	}
	let rcode = (flags & 0xf) as u8;
	if rcode != RCODE_NOERROR && rcode != RCODE_NXDOMAIN {
		return Err(ProofError::transport(name, ty, format!("resolver returned {}", rcode_name(rcode))));
	}

	let questions = read_u16(&mut read).map_err(truncated)?;
	let answers = read_u16(&mut read).map_err(truncated)?;
	let authorities = read_u16(&mut read).map_err(truncated)?;
	let _additional = read_u16(&mut read).map_err(truncated)?;

	if questions != 1 { return Err(decode("expected exactly one question")); }
	let qname = read_wire_packet_name(&mut read, resp).map_err(|()| decode("malformed question"))?;
	let qtype = read_u16(&mut read).map_err(truncated)?;
	let qclass = read_u16(&mut read).map_err(truncated)?;
	if !qname.eq_ignore_case(name) || qtype != ty || qclass != CLASS_IN {
		return Err(decode("response is for a different question"));
	}

	// Only read the answers and authorities, skipping additional entirely.
	let mut read_section = |count: u16, section: &str| -> Result<Vec<RR>, ProofError> {
		let mut res = Vec::with_capacity(count as usize);
		for _ in 0..count {
			let rr = parse_wire_packet_rr(&mut read, resp)
				.map_err(|()| decode(&format!("malformed record in {} section", section)))?;
			res.push(rr);
		}
		Ok(res)
	};
	let answers = read_section(answers, "answer")?;
	let authorities = read_section(authorities, "authority")?;

	Ok(Message { rcode, answers, authorities })
}

#[cfg(fuzzing)]
/// Read some input and parse it as if it came from a server, for fuzzing.
pub fn fuzz_response(response: &[u8]) {
	if let Ok(name) = Name::try_from("example.com.") {
		let _ = parse_response(response, &name, Txt::TYPE);
	}
}

/// Sends DNSSEC-enabled queries through a [`Transport`].
///
/// Every query sets the DO bit and requests authenticated data, so signatures (and NSEC records
/// proving non-existence) are returned along with the records themselves. There is no caching
/// and no retrying here.
#[derive(Debug, Clone)]
pub struct Resolver<T: Transport> {
	transport: T,
	udp_payload_size: u16,
}

impl<T: Transport> Resolver<T> {
	/// Sends queries through `transport`, advertising the default UDP payload size of 4096.
	pub fn new(transport: T) -> Self {
		Resolver { transport, udp_payload_size: 4096 }
	}

	/// Sends queries through `transport` with the payload size from `config`.
	pub fn with_config(transport: T, config: &Config) -> Self {
		Resolver { transport, udp_payload_size: config.udp_payload_size }
	}

	/// The underlying transport.
	pub fn transport(&self) -> &T { &self.transport }

	/// Queries for the records of type `qtype` at `name`.
	///
	/// NXDOMAIN is not an error, as the response carries the proof of non-existence.
	pub fn query(&self, qtype: u16, qclass: u16, name: &Name) -> Result<Message, ProofError> {
		if qclass != CLASS_IN {
			return Err(ProofError::decode(name, qtype, format!("unsupported class {}", qclass)));
		}
		debug!(name = %name, ty = %DisplayType(qtype), "querying resolver");
		let query = build_query(name, qtype, self.udp_payload_size);
		let response = self.transport.send(&query)
			.map_err(|e| ProofError::transport(name, qtype, e))?;
		let msg = parse_response(&response, name, qtype)?;
		trace!(name = %name, ty = %DisplayType(qtype), rcode = msg.rcode,
			answers = msg.answers.len(), authorities = msg.authorities.len(), "got response");
		Ok(msg)
	}
}
