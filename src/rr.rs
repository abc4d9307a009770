//! Resource Records are the fundamental type in the DNS - individual records mapping a name to
//! some data.
//!
//! This module holds structs and utilities for the Resource Records supported by this crate.

use std::cmp::Ordering;
use std::fmt;

use crate::ser::*;

/// The INternet class, the only class this crate handles.
pub const CLASS_IN: u16 = 1;

/// A valid domain name.
///
/// It must end with a ".", be no longer than 255 bytes, consist of only printable ASCII
/// characters and each label may be no longer than 63 bytes.
///
/// The case of the name is kept as it was received. Use [`Name::canonical_cmp`],
/// [`Name::eq_ignore_case`] or [`Name::to_lowercase`] wherever DNS semantics (rather than exact
/// bytes) matter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(String);
impl Name {
	/// Gets the underlying human-readable domain name
	pub fn as_str(&self) -> &str { &self.0 }

	/// The root name, `.`.
	pub fn root() -> Name { Name(".".to_owned()) }

	/// Whether this is the root name.
	pub fn is_root(&self) -> bool { self.0 == "." }

	/// The labels of this name, leftmost first, not including the empty root label.
	pub fn labels(&self) -> impl DoubleEndedIterator<Item = &str> + Clone {
		let trimmed = if self.is_root() { "" } else { &self.0[..self.0.len() - 1] };
		trimmed.split('.').filter(|label| !label.is_empty())
	}

	/// The number of labels in this name, not including the root label.
	pub fn label_count(&self) -> usize { self.labels().count() }

	/// Returns the name consisting of only the rightmost `count` labels of this name.
	///
	/// Returns `None` if this name has fewer than `count` labels.
	pub fn suffix(&self, count: usize) -> Option<Name> {
		let total = self.label_count();
		if count > total { return None; }
		if count == 0 { return Some(Name::root()); }
		let mut res = String::with_capacity(self.0.len());
		for label in self.labels().skip(total - count) {
			res += label;
			res += ".";
		}
		Some(Name(res))
	}

	/// Prepends a single label to this name.
	pub fn prepend_label(&self, label: &str) -> Result<Name, ()> {
		if self.is_root() {
			Name::try_from(label.to_owned() + ".")
		} else {
			Name::try_from(label.to_owned() + "." + &self.0)
		}
	}

	/// The same name with all ASCII letters lowercased.
	pub fn to_lowercase(&self) -> Name { Name(self.0.to_ascii_lowercase()) }

	/// Compares two names ignoring ASCII case.
	pub fn eq_ignore_case(&self, other: &Name) -> bool { self.0.eq_ignore_ascii_case(&other.0) }

	/// Returns true if `self` is `ancestor` or any name below it (ignoring ASCII case).
	pub fn is_subdomain_of(&self, ancestor: &Name) -> bool {
		let mut ours = self.labels().rev();
		for theirs in ancestor.labels().rev() {
			match ours.next() {
				Some(label) if label.eq_ignore_ascii_case(theirs) => {},
				_ => return false,
			}
		}
		true
	}

	/// Orders names according to the canonical DNS name order of RFC 4034 section 6.1.
	///
	/// Labels are compared from the rightmost inward, each as a lowercased octet string, with a
	/// name that runs out of labels first sorting before the longer name.
	pub fn canonical_cmp(&self, other: &Name) -> Ordering {
		let mut ours = self.labels().rev();
		let mut theirs = other.labels().rev();
		loop {
			match (ours.next(), theirs.next()) {
				(Some(left), Some(right)) => {
					let ord = left.bytes().map(|b| b.to_ascii_lowercase())
						.cmp(right.bytes().map(|b| b.to_ascii_lowercase()));
					if ord != Ordering::Equal { return ord; }
				},
				(None, Some(_)) => return Ordering::Less,
				(Some(_), None) => return Ordering::Greater,
				(None, None) => return Ordering::Equal,
			}
		}
	}
}
impl std::ops::Deref for Name {
	type Target = str;
	fn deref(&self) -> &str { &self.0 }
}
impl fmt::Display for Name {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { f.write_str(&self.0) }
}
impl TryFrom<String> for Name {
	type Error = ();
	fn try_from(s: String) -> Result<Name, ()> {
		if s.is_empty() { return Err(()); }
		if *s.as_bytes().last().unwrap_or(&0) != b"."[0] { return Err(()); }
		if s.len() > 255 { return Err(()); }
		if s.chars().any(|c| !c.is_ascii_graphic()) { return Err(()); }
		if s != "." {
			for label in s[..s.len() - 1].split('.') {
				if label.is_empty() || label.len() > 63 { return Err(()); }
			}
		}

		Ok(Name(s))
	}
}
impl TryFrom<&str> for Name {
	type Error = ();
	fn try_from(s: &str) -> Result<Name, ()> {
		Self::try_from(s.to_owned())
	}
}

const TYPE_MNEMONICS: [(u16, &str); 23] = [
	(1, "A"), (2, "NS"), (5, "CNAME"), (6, "SOA"), (7, "MB"), (8, "MG"), (9, "MR"),
	(12, "PTR"), (14, "MINFO"), (15, "MX"), (16, "TXT"), (28, "AAAA"), (33, "SRV"),
	(35, "NAPTR"), (36, "KX"), (39, "DNAME"), (41, "OPT"), (43, "DS"), (46, "RRSIG"),
	(47, "NSEC"), (48, "DNSKEY"), (50, "NSEC3"), (52, "TLSA"),
];

/// Looks up a record type by its mnemonic (e.g. `TXT`) or RFC 3597 `TYPEnnn` form.
pub fn type_from_mnemonic(s: &str) -> Option<u16> {
	let upper = s.to_ascii_uppercase();
	if let Some((ty, _)) = TYPE_MNEMONICS.iter().find(|(_, m)| *m == upper) {
		return Some(*ty);
	}
	upper.strip_prefix("TYPE").and_then(|num| num.parse().ok())
}

/// Displays a record type as its mnemonic, falling back to the RFC 3597 `TYPEnnn` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayType(pub u16);
impl fmt::Display for DisplayType {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match TYPE_MNEMONICS.iter().find(|(ty, _)| *ty == self.0) {
			Some((_, mnemonic)) => f.write_str(mnemonic),
			None => write!(f, "TYPE{}", self.0),
		}
	}
}

macro_rules! for_each_rr {
	($rr: expr, $inner: ident => $body: expr) => {
		match $rr {
			RR::A($inner) => $body,
			RR::AAAA($inner) => $body,
			RR::NS($inner) => $body,
			RR::CName($inner) => $body,
			RR::SOA($inner) => $body,
			RR::MB($inner) => $body,
			RR::MG($inner) => $body,
			RR::MR($inner) => $body,
			RR::PTR($inner) => $body,
			RR::MInfo($inner) => $body,
			RR::MX($inner) => $body,
			RR::Txt($inner) => $body,
			RR::SRV($inner) => $body,
			RR::NAPTR($inner) => $body,
			RR::KX($inner) => $body,
			RR::DName($inner) => $body,
			RR::DS($inner) => $body,
			RR::RRSig($inner) => $body,
			RR::NSec($inner) => $body,
			RR::DnsKey($inner) => $body,
			RR::TLSA($inner) => $body,
			RR::Opaque($inner) => $body,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
/// A Resource Record
///
/// Record types which carry domain names in their data, as well as the DNSSEC types, are parsed
/// into their fields. Anything else is kept as an [`Opaque`] blob of record data.
pub enum RR {
	/// An IPv4 resource record
	A(A),
	/// An IPv6 resource record
	AAAA(AAAA),
	/// A name server resource record
	NS(NS),
	/// A Canonical Name record
	CName(CName),
	/// A Start of Authority record
	SOA(SOA),
	/// A mailbox domain name record (experimental)
	MB(MB),
	/// A mail group member record (experimental)
	MG(MG),
	/// A mail rename record (experimental)
	MR(MR),
	/// A domain name pointer record
	PTR(PTR),
	/// A mailbox or mail list information record
	MInfo(MInfo),
	/// A mail exchange record
	MX(MX),
	/// A text resource record
	Txt(Txt),
	/// A service location record
	SRV(SRV),
	/// A Naming Authority Pointer record
	NAPTR(NAPTR),
	/// A key exchanger record
	KX(KX),
	/// A Delegation Name record
	DName(DName),
	/// A Delegated Signer resource record
	DS(DS),
	/// A Resource Record Signature record
	RRSig(RRSig),
	/// A Next Secure record, proving the non-existence of names or types
	NSec(NSec),
	/// A DNS (Public) Key resource record
	DnsKey(DnsKey),
	/// A TLS Certificate Association resource record
	TLSA(TLSA),
	/// Any other record type, with its data left unparsed
	Opaque(Opaque),
}
impl RR {
	/// Gets the name this record refers to.
	pub fn name(&self) -> &Name {
		for_each_rr!(self, rr => &rr.name)
	}
	/// Gets the resource record type of this record.
	pub fn ty(&self) -> u16 {
		match self {
			RR::Opaque(rr) => rr.ty,
			_ => for_each_rr!(self, rr => Record::ty(rr)),
		}
	}
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
		for_each_rr!(self, rr => Record::write_u16_len_prefixed_data(rr, out))
	}
	pub(crate) fn name_mut(&mut self) -> &mut Name {
		for_each_rr!(self, rr => &mut rr.name)
	}
	/// Lowercases the domain names in the record data of types whose names are canonicalized by
	/// RFC 4034 section 6.2 (as amended by RFC 6840 section 5.1).
	pub(crate) fn lowercase_rdata_names(&mut self) {
		match self {
			RR::Opaque(_) => {},
			_ => for_each_rr!(self, rr => Record::lowercase_rdata_names(rr)),
		}
	}
}
impl From<A> for RR { fn from(a: A) -> RR { RR::A(a) } }
impl From<AAAA> for RR { fn from(aaaa: AAAA) -> RR { RR::AAAA(aaaa) } }
impl From<NS> for RR { fn from(ns: NS) -> RR { RR::NS(ns) } }
impl From<CName> for RR { fn from(cname: CName) -> RR { RR::CName(cname) } }
impl From<SOA> for RR { fn from(soa: SOA) -> RR { RR::SOA(soa) } }
impl From<MB> for RR { fn from(mb: MB) -> RR { RR::MB(mb) } }
impl From<MG> for RR { fn from(mg: MG) -> RR { RR::MG(mg) } }
impl From<MR> for RR { fn from(mr: MR) -> RR { RR::MR(mr) } }
impl From<PTR> for RR { fn from(ptr: PTR) -> RR { RR::PTR(ptr) } }
impl From<MInfo> for RR { fn from(minfo: MInfo) -> RR { RR::MInfo(minfo) } }
impl From<MX> for RR { fn from(mx: MX) -> RR { RR::MX(mx) } }
impl From<Txt> for RR { fn from(txt: Txt) -> RR { RR::Txt(txt) } }
impl From<SRV> for RR { fn from(srv: SRV) -> RR { RR::SRV(srv) } }
impl From<NAPTR> for RR { fn from(naptr: NAPTR) -> RR { RR::NAPTR(naptr) } }
impl From<KX> for RR { fn from(kx: KX) -> RR { RR::KX(kx) } }
impl From<DName> for RR { fn from(dname: DName) -> RR { RR::DName(dname) } }
impl From<DS> for RR { fn from(ds: DS) -> RR { RR::DS(ds) } }
impl From<RRSig> for RR { fn from(rrsig: RRSig) -> RR { RR::RRSig(rrsig) } }
impl From<NSec> for RR { fn from(nsec: NSec) -> RR { RR::NSec(nsec) } }
impl From<DnsKey> for RR { fn from(dnskey: DnsKey) -> RR { RR::DnsKey(dnskey) } }
impl From<TLSA> for RR { fn from(tlsa: TLSA) -> RR { RR::TLSA(tlsa) } }
impl From<Opaque> for RR { fn from(opaque: Opaque) -> RR { RR::Opaque(opaque) } }

pub(crate) trait StaticRecord : Ord + Sized {
	// http://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-4
	const TYPE: u16;
	fn name(&self) -> &Name;
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>);
	fn read_from_data(name: Name, data: &[u8], wire_packet: &[u8]) -> Result<Self, ()>;
	fn lowercase_rdata_names(&mut self) {}
}
/// A trait describing a resource record (including the [`RR`] enum).
pub trait Record : Ord {
	/// The resource record type, as maintained by IANA.
	///
	/// Current assignments can be found at
	/// <http://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-4>
	fn ty(&self) -> u16;
	/// The name this record is at.
	fn name(&self) -> &Name;
	/// Writes the data of this record, prefixed by a u16 length, to the given `Vec`.
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>);
	/// Lowercases any domain names in the record data which RFC 4034 canonical form lowercases.
	#[doc(hidden)]
	fn lowercase_rdata_names(&mut self) {}
}
impl<RR: StaticRecord> Record for RR {
	fn ty(&self) -> u16 { RR::TYPE }
	fn name(&self) -> &Name { RR::name(self) }
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
		RR::write_u16_len_prefixed_data(self, out)
	}
	fn lowercase_rdata_names(&mut self) { RR::lowercase_rdata_names(self) }
}
impl Record for RR {
	fn ty(&self) -> u16 { self.ty() }
	fn name(&self) -> &Name { self.name() }
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
		self.write_u16_len_prefixed_data(out)
	}
	fn lowercase_rdata_names(&mut self) { RR::lowercase_rdata_names(self) }
}
impl Record for Opaque {
	fn ty(&self) -> u16 { self.ty }
	fn name(&self) -> &Name { &self.name }
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
		out.extend_from_slice(&(self.data.len() as u16).to_be_bytes());
		out.extend_from_slice(&self.data);
	}
}

// Records whose data is exactly one (compressible) domain name. Every one of these is in the
// RFC 4034 list of types whose data names are lowercased in canonical form.
macro_rules! single_name_record {
	($(#[$meta: meta])* $ty: ident, $code: expr, $(#[$field_meta: meta])* $field: ident) => {
		$(#[$meta])*
		#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
		pub struct $ty {
			/// The name this record is at.
			pub name: Name,
			$(#[$field_meta])*
			pub $field: Name,
		}
		impl StaticRecord for $ty {
			const TYPE: u16 = $code;
			fn name(&self) -> &Name { &self.name }
			fn read_from_data(name: Name, mut data: &[u8], wire_packet: &[u8]) -> Result<Self, ()> {
				let $field = read_wire_packet_name(&mut data, wire_packet)?;
				if !data.is_empty() { return Err(()); }
				Ok($ty { name, $field })
			}
			fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
				out.extend_from_slice(&name_len(&self.$field).to_be_bytes());
				write_name(out, &self.$field);
			}
			fn lowercase_rdata_names(&mut self) { self.$field = self.$field.to_lowercase(); }
		}
	}
}

single_name_record!(
	/// A Name Server resource record, which indicates the server responsible for handling queries
	/// for a zone.
	NS, 2,
	/// The name of the server which is responsible for handling queries for the [`Self::name`]
	/// zone.
	name_server
);
single_name_record!(
	/// A Canonical Name resource record, referring all queries for this name to another name.
	CName, 5,
	/// The canonical name.
	///
	/// A resolver should use this name when looking up any further records for [`Self::name`].
	canonical_name
);
single_name_record!(
	/// A mailbox domain name record (RFC 1035, experimental).
	MB, 7,
	/// The host which has the specified mailbox.
	mailbox_host
);
single_name_record!(
	/// A mail group member record (RFC 1035, experimental).
	MG, 8,
	/// A mailbox which is a member of the mail group at [`Self::name`].
	member
);
single_name_record!(
	/// A mail rename record (RFC 1035, experimental).
	MR, 9,
	/// The mailbox which is the proper rename of [`Self::name`].
	new_name
);
single_name_record!(
	/// A domain name pointer, as used for reverse lookups.
	PTR, 12,
	/// The name pointed to.
	target
);
single_name_record!(
	/// A Delegation Name resource record, referring all queries for subdomains of this name to
	/// another subtree of the DNS.
	DName, 39,
	/// The delegation name.
	///
	/// A resolver should use this domain name tree when looking up any further records for
	/// subdomains of [`Self::name`].
	delegation_name
);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
/// A Start of Authority record, describing the zone rooted at its name.
pub struct SOA {
	/// The name this record is at.
	pub name: Name,
	/// The primary name server for the zone.
	pub mname: Name,
	/// The mailbox of the person responsible for the zone.
	pub rname: Name,
	/// The serial number of the zone.
	pub serial: u32,
	/// Seconds before the zone should be refreshed.
	pub refresh: u32,
	/// Seconds before a failed refresh should be retried.
	pub retry: u32,
	/// Seconds after which the zone is no longer authoritative.
	pub expire: u32,
	/// The negative-caching TTL.
	pub minimum: u32,
}
impl StaticRecord for SOA {
	const TYPE: u16 = 6;
	fn name(&self) -> &Name { &self.name }
	fn read_from_data(name: Name, mut data: &[u8], wire_packet: &[u8]) -> Result<Self, ()> {
		let res = SOA {
			name,
			mname: read_wire_packet_name(&mut data, wire_packet)?,
			rname: read_wire_packet_name(&mut data, wire_packet)?,
			serial: read_u32(&mut data)?, refresh: read_u32(&mut data)?,
			retry: read_u32(&mut data)?, expire: read_u32(&mut data)?,
			minimum: read_u32(&mut data)?,
		};
		if !data.is_empty() { return Err(()); }
		Ok(res)
	}
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
		let len = name_len(&self.mname) + name_len(&self.rname) + 4 * 5;
		out.extend_from_slice(&len.to_be_bytes());
		write_name(out, &self.mname);
		write_name(out, &self.rname);
		for field in [self.serial, self.refresh, self.retry, self.expire, self.minimum] {
			out.extend_from_slice(&field.to_be_bytes());
		}
	}
	fn lowercase_rdata_names(&mut self) {
		self.mname = self.mname.to_lowercase();
		self.rname = self.rname.to_lowercase();
	}
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
/// A mailbox or mail list information record.
pub struct MInfo {
	/// The name this record is at.
	pub name: Name,
	/// The mailbox responsible for the mailing list or mailbox.
	pub rmailbx: Name,
	/// The mailbox which should receive error messages.
	pub emailbx: Name,
}
impl StaticRecord for MInfo {
	const TYPE: u16 = 14;
	fn name(&self) -> &Name { &self.name }
	fn read_from_data(name: Name, mut data: &[u8], wire_packet: &[u8]) -> Result<Self, ()> {
		let rmailbx = read_wire_packet_name(&mut data, wire_packet)?;
		let emailbx = read_wire_packet_name(&mut data, wire_packet)?;
		if !data.is_empty() { return Err(()); }
		Ok(MInfo { name, rmailbx, emailbx })
	}
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
		let len = name_len(&self.rmailbx) + name_len(&self.emailbx);
		out.extend_from_slice(&len.to_be_bytes());
		write_name(out, &self.rmailbx);
		write_name(out, &self.emailbx);
	}
	fn lowercase_rdata_names(&mut self) {
		self.rmailbx = self.rmailbx.to_lowercase();
		self.emailbx = self.emailbx.to_lowercase();
	}
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
/// A mail exchange record, naming a host which accepts mail for [`Self::name`].
pub struct MX {
	/// The name this record is at.
	pub name: Name,
	/// The preference of this exchange among others at the same name (lower is preferred).
	pub preference: u16,
	/// The mail exchange host.
	pub exchange: Name,
}
impl StaticRecord for MX {
	const TYPE: u16 = 15;
	fn name(&self) -> &Name { &self.name }
	fn read_from_data(name: Name, mut data: &[u8], wire_packet: &[u8]) -> Result<Self, ()> {
		let preference = read_u16(&mut data)?;
		let exchange = read_wire_packet_name(&mut data, wire_packet)?;
		if !data.is_empty() { return Err(()); }
		Ok(MX { name, preference, exchange })
	}
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
		out.extend_from_slice(&(2 + name_len(&self.exchange)).to_be_bytes());
		out.extend_from_slice(&self.preference.to_be_bytes());
		write_name(out, &self.exchange);
	}
	fn lowercase_rdata_names(&mut self) { self.exchange = self.exchange.to_lowercase(); }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
/// A key exchanger record (RFC 2230).
pub struct KX {
	/// The name this record is at.
	pub name: Name,
	/// The preference of this exchanger among others at the same name (lower is preferred).
	pub preference: u16,
	/// The key exchanger host.
	pub exchanger: Name,
}
impl StaticRecord for KX {
	const TYPE: u16 = 36;
	fn name(&self) -> &Name { &self.name }
	fn read_from_data(name: Name, mut data: &[u8], wire_packet: &[u8]) -> Result<Self, ()> {
		let preference = read_u16(&mut data)?;
		let exchanger = read_wire_packet_name(&mut data, wire_packet)?;
		if !data.is_empty() { return Err(()); }
		Ok(KX { name, preference, exchanger })
	}
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
		out.extend_from_slice(&(2 + name_len(&self.exchanger)).to_be_bytes());
		out.extend_from_slice(&self.preference.to_be_bytes());
		write_name(out, &self.exchanger);
	}
	fn lowercase_rdata_names(&mut self) { self.exchanger = self.exchanger.to_lowercase(); }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
/// A text resource record, containing arbitrary text data
pub struct Txt {
	/// The name this record is at.
	pub name: Name,
	/// The character-strings making up the record, each at most 255 bytes.
	///
	/// While these are generally UTF-8-valid, there is no specific requirement that they be, and
	/// thus they are arbitrary series of bytes here. The boundaries between strings are part of
	/// the signed record and are kept exactly as received.
	pub strings: Vec<Vec<u8>>,
}
impl Txt {
	/// Builds a record from a single run of bytes, split into 255-byte character-strings.
	pub fn from_bytes(name: Name, data: &[u8]) -> Txt {
		let strings = if data.is_empty() { vec![Vec::new()] }
			else { data.chunks(255).map(|chunk| chunk.to_vec()).collect() };
		Txt { name, strings }
	}
	/// The concatenation of all character-strings in this record.
	pub fn data(&self) -> Vec<u8> { self.strings.concat() }
}
impl StaticRecord for Txt {
	const TYPE: u16 = 16;
	fn name(&self) -> &Name { &self.name }
	fn read_from_data(name: Name, mut data: &[u8], _wire_packet: &[u8]) -> Result<Self, ()> {
		let mut strings = Vec::new();
		while !data.is_empty() {
			strings.push(read_character_string(&mut data)?);
		}
		if strings.is_empty() { return Err(()); }
		Ok(Txt { name, strings })
	}
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
		let len: usize = self.strings.iter().map(|s| 1 + s.len()).sum();
		out.extend_from_slice(&(len as u16).to_be_bytes());
		for string in self.strings.iter() {
			write_character_string(out, string);
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
/// A service location record (RFC 2782).
pub struct SRV {
	/// The name this record is at.
	pub name: Name,
	/// The priority of the target host (lower is preferred).
	pub priority: u16,
	/// The relative weight among targets with the same priority.
	pub weight: u16,
	/// The port the service is running on.
	pub port: u16,
	/// The host providing the service.
	pub target: Name,
}
impl StaticRecord for SRV {
	const TYPE: u16 = 33;
	fn name(&self) -> &Name { &self.name }
	fn read_from_data(name: Name, mut data: &[u8], wire_packet: &[u8]) -> Result<Self, ()> {
		let res = SRV {
			name, priority: read_u16(&mut data)?, weight: read_u16(&mut data)?,
			port: read_u16(&mut data)?, target: read_wire_packet_name(&mut data, wire_packet)?,
		};
		if !data.is_empty() { return Err(()); }
		Ok(res)
	}
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
		out.extend_from_slice(&(6 + name_len(&self.target)).to_be_bytes());
		out.extend_from_slice(&self.priority.to_be_bytes());
		out.extend_from_slice(&self.weight.to_be_bytes());
		out.extend_from_slice(&self.port.to_be_bytes());
		write_name(out, &self.target);
	}
	fn lowercase_rdata_names(&mut self) { self.target = self.target.to_lowercase(); }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
/// A Naming Authority Pointer record (RFC 3403).
pub struct NAPTR {
	/// The name this record is at.
	pub name: Name,
	/// The order in which records must be processed.
	pub order: u16,
	/// The preference among records with equal [`Self::order`].
	pub preference: u16,
	/// Flags controlling rewriting and interpretation.
	pub flags: Vec<u8>,
	/// The services available down this rewrite path.
	pub services: Vec<u8>,
	/// The substitution expression applied to the original string.
	pub regexp: Vec<u8>,
	/// The next name to query, if [`Self::regexp`] is empty.
	pub replacement: Name,
}
impl StaticRecord for NAPTR {
	const TYPE: u16 = 35;
	fn name(&self) -> &Name { &self.name }
	fn read_from_data(name: Name, mut data: &[u8], wire_packet: &[u8]) -> Result<Self, ()> {
		let res = NAPTR {
			name, order: read_u16(&mut data)?, preference: read_u16(&mut data)?,
			flags: read_character_string(&mut data)?,
			services: read_character_string(&mut data)?,
			regexp: read_character_string(&mut data)?,
			replacement: read_wire_packet_name(&mut data, wire_packet)?,
		};
		if !data.is_empty() { return Err(()); }
		Ok(res)
	}
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
		let len = 4 + 3 + self.flags.len() + self.services.len() + self.regexp.len()
			+ name_len(&self.replacement) as usize;
		out.extend_from_slice(&(len as u16).to_be_bytes());
		out.extend_from_slice(&self.order.to_be_bytes());
		out.extend_from_slice(&self.preference.to_be_bytes());
		write_character_string(out, &self.flags);
		write_character_string(out, &self.services);
		write_character_string(out, &self.regexp);
		write_name(out, &self.replacement);
	}
	fn lowercase_rdata_names(&mut self) { self.replacement = self.replacement.to_lowercase(); }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
/// A TLS Certificate Association resource record containing information about the TLS certificate
/// which should be expected when communicating with the host at the given name.
///
/// See <https://en.wikipedia.org/wiki/DNS-based_Authentication_of_Named_Entities#TLSA_RR> for more
/// info.
pub struct TLSA {
	/// The name this record is at.
	pub name: Name,
	/// The type of constraint on the TLS certificate(s) used which should be enforced by this
	/// record.
	pub cert_usage: u8,
	/// Whether to match on the full certificate, or only the public key.
	pub selector: u8,
	/// The type of data included which is used to match the TLS certificate(s).
	pub data_ty: u8,
	/// The certificate data or hash of the certificate data itself.
	pub data: Vec<u8>,
}
impl StaticRecord for TLSA {
	const TYPE: u16 = 52;
	fn name(&self) -> &Name { &self.name }
	fn read_from_data(name: Name, mut data: &[u8], _wire_packet: &[u8]) -> Result<Self, ()> {
		Ok(TLSA {
			name, cert_usage: read_u8(&mut data)?, selector: read_u8(&mut data)?,
			data_ty: read_u8(&mut data)?, data: data.to_vec(),
		})
	}
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
		let len = 3 + self.data.len();
		out.extend_from_slice(&(len as u16).to_be_bytes());
		out.extend_from_slice(&[self.cert_usage, self.selector, self.data_ty]);
		out.extend_from_slice(&self.data);
	}
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
/// A public key resource record which can be used to validate [`RRSig`]s.
pub struct DnsKey {
	/// The name this record is at.
	pub name: Name,
	/// Flags which constrain the usage of this public key.
	pub flags: u16,
	/// The protocol this key is used for (protocol `3` is DNSSEC).
	pub protocol: u8,
	/// The algorithm which this public key uses to sign data.
	pub alg: u8,
	/// The public key itself.
	pub pubkey: Vec<u8>,
}
impl StaticRecord for DnsKey {
	const TYPE: u16 = 48;
	fn name(&self) -> &Name { &self.name }
	fn read_from_data(name: Name, mut data: &[u8], _wire_packet: &[u8]) -> Result<Self, ()> {
		Ok(DnsKey {
			name, flags: read_u16(&mut data)?, protocol: read_u8(&mut data)?,
			alg: read_u8(&mut data)?, pubkey: data.to_vec(),
		})
	}
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
		let len = 2 + 1 + 1 + self.pubkey.len();
		out.extend_from_slice(&(len as u16).to_be_bytes());
		out.extend_from_slice(&self.flags.to_be_bytes());
		out.extend_from_slice(&self.protocol.to_be_bytes());
		out.extend_from_slice(&self.alg.to_be_bytes());
		out.extend_from_slice(&self.pubkey);
	}
}
impl DnsKey {
	/// A short (non-cryptographic) digest which can be used to refer to this [`DnsKey`].
	pub fn key_tag(&self) -> u16 {
		let mut res = u32::from(self.flags);
		res += u32::from(self.protocol) << 8;
		res += u32::from(self.alg);
		for (idx, b) in self.pubkey.iter().enumerate() {
			if idx % 2 == 0 {
				res += u32::from(*b) << 8;
			} else {
				res += u32::from(*b);
			}
		}
		res += (res >> 16) & 0xffff;
		(res & 0xffff) as u16
	}

	/// Whether the ZONE flag is set, i.e. this key may be used to validate zone data.
	pub fn is_zone_key(&self) -> bool { self.flags & 0b1_0000_0000 != 0 }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
/// A Delegation Signer resource record which indicates that some alternative [`DnsKey`] can sign
/// for records in the zone which matches [`DS::name`].
pub struct DS {
	/// The name this record is at.
	///
	/// This is also the zone that a [`DnsKey`] which matches the [`Self::digest`] can sign for.
	pub name: Name,
	/// A short tag which describes the matching [`DnsKey`].
	///
	/// This matches the [`DnsKey::key_tag`] for the [`DnsKey`] which is referred to by this
	/// [`DS`].
	pub key_tag: u16,
	/// The algorithm which the [`DnsKey`] referred to by this [`DS`] uses.
	///
	/// This matches the [`DnsKey::alg`] field in the referred-to [`DnsKey`].
	pub alg: u8,
	/// The type of digest used to hash the referred-to [`DnsKey`].
	pub digest_type: u8,
	/// The digest itself.
	pub digest: Vec<u8>,
}
impl StaticRecord for DS {
	const TYPE: u16 = 43;
	fn name(&self) -> &Name { &self.name }
	fn read_from_data(name: Name, mut data: &[u8], _wire_packet: &[u8]) -> Result<Self, ()> {
		Ok(DS {
			name, key_tag: read_u16(&mut data)?, alg: read_u8(&mut data)?,
			digest_type: read_u8(&mut data)?, digest: data.to_vec(),
		})
	}
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
		let len = 2 + 1 + 1 + self.digest.len();
		out.extend_from_slice(&(len as u16).to_be_bytes());
		out.extend_from_slice(&self.key_tag.to_be_bytes());
		out.extend_from_slice(&self.alg.to_be_bytes());
		out.extend_from_slice(&self.digest_type.to_be_bytes());
		out.extend_from_slice(&self.digest);
	}
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
/// A Resource Record (set) Signature resource record. This contains a signature over all the
/// resources records of the given type at the given name.
pub struct RRSig {
	/// The name this record is at.
	///
	/// This is also the name of any records which this signature is covering (ignoring wildcards).
	pub name: Name,
	/// The resource record type which this [`RRSig`] is signing.
	///
	/// All resources records of this type at the same name as [`Self::name`] must be signed by
	/// this [`RRSig`].
	pub ty: u16,
	/// The algorithm which is being used to sign.
	///
	/// This must match the [`DnsKey::alg`] field in the [`DnsKey`] being used to sign.
	pub alg: u8,
	/// The number of labels in the owner name of the signed records, not counting the root label
	/// or a leading wildcard label.
	///
	/// If a covered record's name has more labels than this, the record was synthesized from a
	/// wildcard and was signed as `*.` followed by the rightmost `labels` labels of its name.
	pub labels: u8,
	/// The TTL of the records which this [`RRSig`] is signing.
	pub orig_ttl: u32,
	/// The expiration (as a UNIX timestamp) of this signature.
	pub expiration: u32,
	/// The time (as a UNIX timestamp) at which this signature becomes valid.
	pub inception: u32,
	/// A short tag which describes the matching [`DnsKey`].
	///
	/// This matches the [`DnsKey::key_tag`] for the [`DnsKey`] which created this signature.
	pub key_tag: u16,
	/// The [`DnsKey::name`] in the [`DnsKey`] which created this signature.
	///
	/// This must be a parent of the [`Self::name`].
	pub key_name: Name,
	/// The signature itself.
	pub signature: Vec<u8>,
}
impl StaticRecord for RRSig {
	const TYPE: u16 = 46;
	fn name(&self) -> &Name { &self.name }
	fn read_from_data(name: Name, mut data: &[u8], wire_packet: &[u8]) -> Result<Self, ()> {
		Ok(RRSig {
			name, ty: read_u16(&mut data)?, alg: read_u8(&mut data)?,
			labels: read_u8(&mut data)?, orig_ttl: read_u32(&mut data)?,
			expiration: read_u32(&mut data)?, inception: read_u32(&mut data)?,
			key_tag: read_u16(&mut data)?,
			key_name: read_wire_packet_name(&mut data, wire_packet)?,
			signature: data.to_vec(),
		})
	}
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
		let len = 2 + 1 + 1 + 4*3 + 2 + name_len(&self.key_name) as usize + self.signature.len();
		out.extend_from_slice(&(len as u16).to_be_bytes());
		out.extend_from_slice(&self.ty.to_be_bytes());
		out.extend_from_slice(&self.alg.to_be_bytes());
		out.extend_from_slice(&self.labels.to_be_bytes());
		out.extend_from_slice(&self.orig_ttl.to_be_bytes());
		out.extend_from_slice(&self.expiration.to_be_bytes());
		out.extend_from_slice(&self.inception.to_be_bytes());
		out.extend_from_slice(&self.key_tag.to_be_bytes());
		write_name(out, &self.key_name);
		out.extend_from_slice(&self.signature);
	}
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
/// A Next Secure record, which proves that no names exist between [`Self::name`] and
/// [`Self::next_name`] in canonical order, and that only the types listed in its bitmap exist at
/// [`Self::name`].
pub struct NSec {
	/// The name this record is at.
	pub name: Name,
	/// The next name in the zone which has records, in canonical order.
	///
	/// For the last name in a zone this wraps around to the zone apex.
	pub next_name: Name,
	/// The raw RFC 4034 type bitmap of the types which exist at [`Self::name`].
	pub type_bitmap: Vec<u8>,
}
impl StaticRecord for NSec {
	const TYPE: u16 = 47;
	fn name(&self) -> &Name { &self.name }
	fn read_from_data(name: Name, mut data: &[u8], wire_packet: &[u8]) -> Result<Self, ()> {
		let next_name = read_wire_packet_name(&mut data, wire_packet)?;
		Ok(NSec { name, next_name, type_bitmap: data.to_vec() })
	}
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
		let len = name_len(&self.next_name) as usize + self.type_bitmap.len();
		out.extend_from_slice(&(len as u16).to_be_bytes());
		write_name(out, &self.next_name);
		out.extend_from_slice(&self.type_bitmap);
	}
}
impl NSec {
	/// Builds the type bitmap listing the given record types.
	pub fn bitmap_for_types(types: &[u16]) -> Vec<u8> {
		let mut sorted = types.to_vec();
		sorted.sort_unstable();
		sorted.dedup();
		let mut res = Vec::new();
		let mut idx = 0;
		while idx < sorted.len() {
			let window = (sorted[idx] >> 8) as u8;
			let mut bitmap = [0u8; 32];
			let mut used = 0;
			while idx < sorted.len() && (sorted[idx] >> 8) as u8 == window {
				let low = (sorted[idx] & 0xff) as usize;
				bitmap[low / 8] |= 0x80 >> (low % 8);
				used = low / 8 + 1;
				idx += 1;
			}
			res.push(window);
			res.push(used as u8);
			res.extend_from_slice(&bitmap[..used]);
		}
		res
	}

	/// Whether the type bitmap lists `ty` as existing at [`Self::name`].
	///
	/// A malformed bitmap is treated as listing every type, so it can never be used to prove
	/// that a type does not exist.
	pub fn has_type(&self, ty: u16) -> bool {
		let mut bitmap = &self.type_bitmap[..];
		while !bitmap.is_empty() {
			let (window, len) = match (read_u8(&mut bitmap), read_u8(&mut bitmap)) {
				(Ok(window), Ok(len)) => (window, len as usize),
				_ => return true,
			};
			if len == 0 || len > 32 || bitmap.len() < len { return true; }
			if window == (ty >> 8) as u8 {
				let low = (ty & 0xff) as usize;
				return low / 8 < len && bitmap[low / 8] & (0x80 >> (low % 8)) != 0;
			}
			bitmap = &bitmap[len..];
		}
		false
	}

	/// Whether this record's range proves that `name` does not exist, in RFC 4034 canonical
	/// order.
	///
	/// The range starts at [`Self::name`] (inclusive) and ends just before [`Self::next_name`].
	/// If [`Self::next_name`] does not sort after [`Self::name`], this is the last record of its
	/// zone and the range wraps around, covering every name at or after [`Self::name`] as well as
	/// every name before [`Self::next_name`].
	///
	/// When `name` equals [`Self::name`], only the types missing from the bitmap are disproven;
	/// callers must check [`Self::has_type`] in that case.
	pub fn covers(&self, name: &Name) -> bool {
		let after_owner = self.name.canonical_cmp(name) != Ordering::Greater;
		let before_next = name.canonical_cmp(&self.next_name) == Ordering::Less;
		if self.next_name.canonical_cmp(&self.name) == Ordering::Greater {
			after_owner && before_next
		} else {
			after_owner || before_next
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
/// A record of a type this crate does not parse, kept as raw record data.
///
/// Per RFC 3597 the data of such types never uses name compression, so the bytes are exactly
/// what was signed.
pub struct Opaque {
	/// The name this record is at.
	pub name: Name,
	/// The resource record type.
	pub ty: u16,
	/// The raw record data.
	pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
/// An IPv4 Address resource record
pub struct A {
	/// The name this record is at.
	pub name: Name,
	/// The bytes of the IPv4 address.
	pub address: [u8; 4],
}
impl StaticRecord for A {
	const TYPE: u16 = 1;
	fn name(&self) -> &Name { &self.name }
	fn read_from_data(name: Name, data: &[u8], _wire_packet: &[u8]) -> Result<Self, ()> {
		if data.len() != 4 { return Err(()); }
		let mut address = [0; 4];
		address.copy_from_slice(data);
		Ok(A { name, address })
	}
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
		out.extend_from_slice(&4u16.to_be_bytes());
		out.extend_from_slice(&self.address);
	}
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
/// An IPv6 Address resource record
pub struct AAAA {
	/// The name this record is at.
	pub name: Name,
	/// The bytes of the IPv6 address.
	pub address: [u8; 16],
}
impl StaticRecord for AAAA {
	const TYPE: u16 = 28;
	fn name(&self) -> &Name { &self.name }
	fn read_from_data(name: Name, data: &[u8], _wire_packet: &[u8]) -> Result<Self, ()> {
		if data.len() != 16 { return Err(()); }
		let mut address = [0; 16];
		address.copy_from_slice(data);
		Ok(AAAA { name, address })
	}
	fn write_u16_len_prefixed_data(&self, out: &mut Vec<u8>) {
		out.extend_from_slice(&16u16.to_be_bytes());
		out.extend_from_slice(&self.address);
	}
}
