//! Serialization/Deserialization logic lives here

use ring::signature;

use crate::rr::*;

// Upper bound on compression pointers followed while reading a single name. Any legitimate
// message needs far fewer; a loop of pointers would otherwise never terminate.
const MAX_NAME_POINTERS: usize = 64;

pub(crate) fn read_u8(inp: &mut &[u8]) -> Result<u8, ()> {
	let res = *inp.first().ok_or(())?;
	*inp = &inp[1..];
	Ok(res)
}
pub(crate) fn read_u16(inp: &mut &[u8]) -> Result<u16, ()> {
	if inp.len() < 2 { return Err(()); }
	let mut bytes = [0; 2];
	bytes.copy_from_slice(&inp[..2]);
	*inp = &inp[2..];
	Ok(u16::from_be_bytes(bytes))
}
pub(crate) fn read_u32(inp: &mut &[u8]) -> Result<u32, ()> {
	if inp.len() < 4 { return Err(()); }
	let mut bytes = [0; 4];
	bytes.copy_from_slice(&inp[..4]);
	*inp = &inp[4..];
	Ok(u32::from_be_bytes(bytes))
}

pub(crate) fn read_character_string(inp: &mut &[u8]) -> Result<Vec<u8>, ()> {
	let len = read_u8(inp)? as usize;
	if inp.len() < len { return Err(()); }
	let res = inp[..len].to_vec();
	*inp = &inp[len..];
	Ok(res)
}
pub(crate) fn write_character_string(out: &mut Vec<u8>, s: &[u8]) {
	debug_assert!(s.len() <= 255);
	out.push(s.len() as u8);
	out.extend_from_slice(s);
}

fn push_label(name: &mut String, label: &[u8]) -> Result<(), ()> {
	if label.iter().any(|b| !b.is_ascii_graphic() || *b == b'.') { return Err(()); }
	*name += std::str::from_utf8(label).map_err(|_| ())?;
	*name += ".";
	Ok(())
}

/// Reads a name which may use RFC 1035 message compression, following pointers into
/// `wire_packet`. Pass an empty `wire_packet` to reject compression entirely.
pub(crate) fn read_wire_packet_name(inp: &mut &[u8], wire_packet: &[u8]) -> Result<Name, ()> {
	let mut name = String::with_capacity(255);
	let mut read: &[u8] = *inp;
	// Bytes of `inp` taken by the name, known once the first pointer is followed
	let mut consumed = None;
	let mut pointers_followed = 0;
	loop {
		let len = read_u8(&mut read)?;
		if len & 0xc0 == 0xc0 {
			let offset = (((len & 0x3f) as usize) << 8) | read_u8(&mut read)? as usize;
			if consumed.is_none() { consumed = Some(inp.len() - read.len()); }
			pointers_followed += 1;
			if pointers_followed > MAX_NAME_POINTERS || offset >= wire_packet.len() {
				return Err(());
			}
			read = &wire_packet[offset..];
			continue;
		}
		if len & 0xc0 != 0 { return Err(()); }
		if len == 0 { break; }
		let len = len as usize;
		if read.len() < len { return Err(()); }
		push_label(&mut name, &read[..len])?;
		read = &read[len..];
		if name.len() > 255 { return Err(()); }
	}
	let consumed = consumed.unwrap_or(inp.len() - read.len());
	*inp = &inp[consumed..];
	if name.is_empty() { name += "."; }
	name.try_into()
}

pub(crate) fn read_name(inp: &mut &[u8]) -> Result<Name, ()> {
	read_wire_packet_name(inp, &[])
}

pub(crate) trait Writer { fn write(&mut self, buf: &[u8]); }
impl Writer for Vec<u8> { fn write(&mut self, buf: &[u8]) { self.extend_from_slice(buf); } }
impl Writer for ring::digest::Context { fn write(&mut self, buf: &[u8]) { self.update(buf); } }
/// Writes a name in uncompressed wire form, exactly as cased. Callers wanting canonical form
/// lowercase first.
pub(crate) fn write_name<W: Writer>(out: &mut W, name: &str) {
	if name == "." {
		out.write(&[0]);
	} else {
		for label in name.split('.') {
			out.write(&(label.len() as u8).to_be_bytes());
			out.write(label.as_bytes());
		}
	}
}
pub(crate) fn name_len(name: &Name) -> u16 {
	if name.as_str() == "." {
		1
	} else {
		let mut res = 0;
		for label in name.split('.') {
			res += 1 + label.len();
		}
		res as u16
	}
}

fn parse_rr_data(ty: u16, name: Name, data: &[u8], wire_packet: &[u8]) -> Result<RR, ()> {
	Ok(match ty {
		A::TYPE => RR::A(A::read_from_data(name, data, wire_packet)?),
		AAAA::TYPE => RR::AAAA(AAAA::read_from_data(name, data, wire_packet)?),
		NS::TYPE => RR::NS(NS::read_from_data(name, data, wire_packet)?),
		CName::TYPE => RR::CName(CName::read_from_data(name, data, wire_packet)?),
		SOA::TYPE => RR::SOA(SOA::read_from_data(name, data, wire_packet)?),
		MB::TYPE => RR::MB(MB::read_from_data(name, data, wire_packet)?),
		MG::TYPE => RR::MG(MG::read_from_data(name, data, wire_packet)?),
		MR::TYPE => RR::MR(MR::read_from_data(name, data, wire_packet)?),
		PTR::TYPE => RR::PTR(PTR::read_from_data(name, data, wire_packet)?),
		MInfo::TYPE => RR::MInfo(MInfo::read_from_data(name, data, wire_packet)?),
		MX::TYPE => RR::MX(MX::read_from_data(name, data, wire_packet)?),
		Txt::TYPE => RR::Txt(Txt::read_from_data(name, data, wire_packet)?),
		SRV::TYPE => RR::SRV(SRV::read_from_data(name, data, wire_packet)?),
		NAPTR::TYPE => RR::NAPTR(NAPTR::read_from_data(name, data, wire_packet)?),
		KX::TYPE => RR::KX(KX::read_from_data(name, data, wire_packet)?),
		DName::TYPE => RR::DName(DName::read_from_data(name, data, wire_packet)?),
		DS::TYPE => RR::DS(DS::read_from_data(name, data, wire_packet)?),
		RRSig::TYPE => RR::RRSig(RRSig::read_from_data(name, data, wire_packet)?),
		NSec::TYPE => RR::NSec(NSec::read_from_data(name, data, wire_packet)?),
		DnsKey::TYPE => RR::DnsKey(DnsKey::read_from_data(name, data, wire_packet)?),
		TLSA::TYPE => RR::TLSA(TLSA::read_from_data(name, data, wire_packet)?),
		_ => RR::Opaque(Opaque { name, ty, data: data.to_vec() }),
	})
}

/// Parses a single record out of a DNS message. TTLs are not kept; canonical forms use the
/// signature's original TTL instead.
pub(crate) fn parse_wire_packet_rr(inp: &mut &[u8], wire_packet: &[u8]) -> Result<RR, ()> {
	let name = read_wire_packet_name(inp, wire_packet)?;
	let ty = read_u16(inp)?;
	let class = read_u16(inp)?;
	if class != CLASS_IN { return Err(()); } // We only support the INternet
	let _ttl = read_u32(inp)?;
	let data_len = read_u16(inp)? as usize;
	if inp.len() < data_len { return Err(()); }
	let data = &inp[..data_len];
	*inp = &inp[data_len..];
	parse_rr_data(ty, name, data, wire_packet)
}

pub(crate) fn parse_rr(inp: &mut &[u8]) -> Result<RR, ()> {
	parse_wire_packet_rr(inp, &[])
}

/// Parses a stream of uncompressed records, as produced by [`write_rr`], returning them in order.
pub fn parse_rr_stream(mut inp: &[u8]) -> Result<Vec<RR>, ()> {
	let mut res = Vec::with_capacity(32);
	while !inp.is_empty() {
		res.push(parse_rr(&mut inp)?);
	}
	Ok(res)
}

/// Writes the given resource record in its uncompressed wire format to the given `Vec`.
///
/// An [`RR`] has no TTL of its own, so one must be provided.
///
/// Fails, leaving `out` unchanged, if the uncompressed record data does not fit in a `u16`
/// length. Names which were compressed on the wire can grow past that limit.
pub fn write_rr<RR: Record>(rr: &RR, ttl: u32, out: &mut Vec<u8>) -> Result<(), ()> {
	let start = out.len();
	write_name(out, rr.name());
	out.extend_from_slice(&rr.ty().to_be_bytes());
	out.extend_from_slice(&CLASS_IN.to_be_bytes());
	out.extend_from_slice(&ttl.to_be_bytes());
	let rdata_start = out.len() + 2;
	rr.write_u16_len_prefixed_data(out);
	if out.len() - rdata_start > u16::MAX as usize {
		out.truncate(start);
		return Err(());
	}
	Ok(())
}

pub(crate) fn bytes_to_rsa_pk<'a>(pubkey: &'a [u8])
-> Result<signature::RsaPublicKeyComponents<&'a [u8]>, ()> {
	if pubkey.len() <= 3 { return Err(()); }

	let mut pos = 0;
	let exponent_length;
	if pubkey[0] == 0 {
		exponent_length = ((pubkey[1] as usize) << 8) | (pubkey[2] as usize);
		pos += 3;
	} else {
		exponent_length = pubkey[0] as usize;
		pos += 1;
	}

	if pubkey.len() <= pos + exponent_length { return Err(()); }
	Ok(signature::RsaPublicKeyComponents {
		n: &pubkey[pos + exponent_length..],
		e: &pubkey[pos..pos + exponent_length]
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn name(s: &str) -> Name { s.try_into().unwrap() }

	#[test]
	fn compressed_names() {
		// A message with "example.com." at offset 2 and a pointer to it at offset 15
		let mut packet = vec![0xff, 0xff];
		packet.extend_from_slice(b"\x07example\x03com\x00");
		packet.extend_from_slice(b"\x03www\xc0\x02");
		let mut inp = &packet[15..];
		assert_eq!(read_wire_packet_name(&mut inp, &packet).unwrap().as_str(), "www.example.com.");
		assert!(inp.is_empty());

		// Only the bytes up to and including the first pointer are consumed
		let mut tail = packet[15..].to_vec();
		tail.extend_from_slice(&[0xab, 0xcd]);
		let mut packet = packet[..15].to_vec();
		packet.extend_from_slice(&tail);
		let mut inp = &packet[15..];
		assert_eq!(read_wire_packet_name(&mut inp, &packet).unwrap().as_str(), "www.example.com.");
		assert_eq!(inp, &[0xab, 0xcd]);
		let mut inp = &packet[2..];
		assert_eq!(read_wire_packet_name(&mut inp, &packet).unwrap().as_str(), "example.com.");
		assert_eq!(inp, &packet[15..]);

		// Without the packet the pointer cannot be followed
		let mut inp = &packet[15..];
		assert!(read_name(&mut inp).is_err());
	}

	#[test]
	fn pointer_loops_are_rejected() {
		let packet = [0xc0, 0x00];
		let mut inp = &packet[..];
		assert!(read_wire_packet_name(&mut inp, &packet).is_err());
	}

	#[test]
	fn names_keep_case() {
		let mut out = Vec::new();
		write_name(&mut out, "WwW.Example.");
		assert_eq!(out, b"\x03WwW\x07Example\x00");
		assert_eq!(name_len(&name("WwW.Example.")) as usize, out.len());
		let mut inp = &out[..];
		assert_eq!(read_name(&mut inp).unwrap().as_str(), "WwW.Example.");
	}

	#[test]
	fn rr_stream() {
		let mut out = Vec::new();
		let txt = Txt { name: name("a.example."), strings: vec![b"hi".to_vec(), b"there".to_vec()] };
		let mx = MX { name: name("example."), preference: 10, exchange: name("Mail.example.") };
		let nsec = NSec {
			name: name("a.example."), next_name: name("B.example."),
			type_bitmap: NSec::bitmap_for_types(&[Txt::TYPE, RRSig::TYPE, NSec::TYPE]),
		};
		let opaque = Opaque { name: name("example."), ty: 65280, data: vec![1, 2, 3] };
		write_rr(&txt, 300, &mut out).unwrap();
		write_rr(&mx, 300, &mut out).unwrap();
		write_rr(&nsec, 300, &mut out).unwrap();
		write_rr(&opaque, 300, &mut out).unwrap();
		let parsed = parse_rr_stream(&out).unwrap();
		assert_eq!(parsed, vec![txt.into(), mx.into(), nsec.into(), opaque.into()]);
	}

	#[test]
	fn record_data_must_fit_its_length() {
		let mut sig = RRSig {
			name: name("example."), ty: Txt::TYPE, alg: 15, labels: 1, orig_ttl: 300,
			expiration: 2, inception: 1, key_tag: 1, key_name: Name::root(),
			signature: vec![0; u16::MAX as usize - 18 - 1],
		};
		let mut out = Vec::new();
		write_rr(&sig, 300, &mut out).unwrap();
		assert_eq!(parse_rr_stream(&out).unwrap(), vec![sig.clone().into()]);

		// A longer signer name no longer fits, and nothing is written
		sig.key_name = name("example.");
		let mut out = vec![1, 2, 3];
		assert!(write_rr(&sig, 300, &mut out).is_err());
		assert_eq!(out, [1, 2, 3]);

		let nsec = NSec {
			name: name("example."), next_name: name("a.example."), type_bitmap: vec![0; u16::MAX as usize],
		};
		assert!(write_rr(&nsec, 300, &mut out).is_err());
		assert_eq!(out, [1, 2, 3]);
	}

	#[test]
	fn truncated_records_fail() {
		let mut out = Vec::new();
		write_rr(&A { name: name("example."), address: [192, 0, 2, 1] }, 60, &mut out).unwrap();
		for len in 0..out.len() {
			assert!(parse_rr_stream(&out[..len]).is_err() || len == 0);
		}
		assert!(parse_rr_stream(&[]).unwrap().is_empty());
	}

	#[test]
	fn only_class_in() {
		let mut out = Vec::new();
		write_rr(&A { name: name("example."), address: [192, 0, 2, 1] }, 60, &mut out).unwrap();
		out[12] = 3; // CH
		assert!(parse_rr_stream(&out).is_err());
	}
}
