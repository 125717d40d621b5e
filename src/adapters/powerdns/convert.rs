//! Rdata content-string codec and type-name mapping (spec §4.4).
//!
//! Grounded in `pkg/adapters/powerdns/convert.go` (`NativeContentOf`,
//! `toRdataString`, `MakeDnsRR`) and `types.go`'s miekgdns-type ↔
//! PowerDNS-type table. Only the record types spec §3 requires be
//! representable (A, AAAA, CNAME, NS, PTR, SOA, TXT) get a concrete
//! codec; anything else is `UnsupportedType`, matching the source's
//! behavior for types outside its own table.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use hickory_proto::rr::rdata::{A, AAAA, CNAME, NS, PTR, SOA, TXT};
use hickory_proto::rr::{Name, RData, RecordType};

use crate::adapters::AdapterError;

const TXT_CHUNK_LEN: usize = 255;

/// Maps a supported `RecordType` to the string PowerDNS expects in an
/// rrset's `type` field. PowerDNS's vocabulary matches the IANA
/// mnemonic for every type we carry, so this is the identity function
/// today — kept as its own function because that won't remain true if
/// more types are added later.
pub fn type_to_pdns(rtype: RecordType) -> Result<String, AdapterError> {
    match rtype {
        RecordType::A
        | RecordType::AAAA
        | RecordType::CNAME
        | RecordType::NS
        | RecordType::PTR
        | RecordType::SOA
        | RecordType::TXT => Ok(rtype.to_string()),
        other => Err(AdapterError::UnsupportedType(other)),
    }
}

pub fn pdns_to_type(s: &str) -> Result<RecordType, AdapterError> {
    match s {
        "A" => Ok(RecordType::A),
        "AAAA" => Ok(RecordType::AAAA),
        "CNAME" => Ok(RecordType::CNAME),
        "NS" => Ok(RecordType::NS),
        "PTR" => Ok(RecordType::PTR),
        "SOA" => Ok(RecordType::SOA),
        "TXT" => Ok(RecordType::TXT),
        _ => Err(AdapterError::UnsupportedType(RecordType::Unknown(0))),
    }
}

/// Encodes an `RData` into the `content` string PowerDNS stores for
/// that record's type.
pub fn content_of(rdata: &RData) -> Result<String, AdapterError> {
    match rdata {
        RData::A(A(addr)) => Ok(addr.to_string()),
        RData::AAAA(AAAA(addr)) => Ok(addr.to_string()),
        RData::CNAME(CNAME(name)) => Ok(name.to_string()),
        RData::NS(NS(name)) => Ok(name.to_string()),
        RData::PTR(PTR(name)) => Ok(name.to_string()),
        RData::SOA(soa) => Ok(format!(
            "{} {} {} {} {} {} {}",
            soa.mname(),
            soa.rname(),
            soa.serial(),
            soa.refresh(),
            soa.retry(),
            soa.expire(),
            soa.minimum(),
        )),
        RData::TXT(txt) => {
            let strings: Vec<String> = txt.txt_data().iter().map(|b| String::from_utf8_lossy(b).to_string()).collect();
            Ok(txt_to_string(&strings))
        }
        other => Err(AdapterError::UnsupportedType(other.record_type())),
    }
}

/// Decodes a PowerDNS `content` string back into an `RData` of type
/// `rtype`. This is the reverse of `content_of` and is used when a
/// `GetAll`/`GetSet` reads back existing backend state.
pub fn rdata_of(rtype: RecordType, content: &str) -> Result<RData, AdapterError> {
    match rtype {
        RecordType::A => {
            let addr = Ipv4Addr::from_str(content).map_err(|e| AdapterError::Rdata(format!("invalid A content {content:?}: {e}")))?;
            Ok(RData::A(A(addr)))
        }
        RecordType::AAAA => {
            let addr = Ipv6Addr::from_str(content).map_err(|e| AdapterError::Rdata(format!("invalid AAAA content {content:?}: {e}")))?;
            Ok(RData::AAAA(AAAA(addr)))
        }
        RecordType::CNAME => Ok(RData::CNAME(CNAME(parse_name(content)?))),
        RecordType::NS => Ok(RData::NS(NS(parse_name(content)?))),
        RecordType::PTR => Ok(RData::PTR(PTR(parse_name(content)?))),
        RecordType::SOA => parse_soa(content),
        RecordType::TXT => {
            let strings = string_to_txt_strings(content)?;
            Ok(RData::TXT(TXT::new(strings)))
        }
        other => Err(AdapterError::UnsupportedType(other)),
    }
}

fn parse_name(s: &str) -> Result<Name, AdapterError> {
    Name::from_ascii(s).map_err(|e| AdapterError::Rdata(format!("invalid name {s:?}: {e}")))
}

fn parse_soa(content: &str) -> Result<RData, AdapterError> {
    let tokens: Vec<&str> = content.split_whitespace().collect();
    let [mname, rname, serial, refresh, retry, expire, minimum] = tokens.as_slice() else {
        return Err(AdapterError::Rdata(format!("SOA content must have exactly 7 fields, got {}: {content:?}", tokens.len())));
    };
    let parse_u32 = |field: &str, name: &str| -> Result<u32, AdapterError> {
        field.parse::<u32>().map_err(|e| AdapterError::Rdata(format!("SOA field {name} {field:?} is not a u32: {e}")))
    };
    Ok(RData::SOA(SOA::new(
        parse_name(mname)?,
        parse_name(rname)?,
        parse_u32(serial, "serial")?,
        parse_u32(refresh, "refresh")? as i32,
        parse_u32(retry, "retry")? as i32,
        parse_u32(expire, "expire")? as i32,
        parse_u32(minimum, "minimum")?,
    )))
}

/// Joins TXT sub-strings the way the backend stores wire-format TXT:
/// each sub-string quoted, groups separated by a single space. Strings
/// longer than 255 bytes are pre-split into ≤255-byte chunks by the
/// caller of `RData::TXT` construction upstream (see `chunk_txt`); this
/// function only handles quoting/joining of already-chunked pieces.
#[must_use]
pub fn txt_to_string(segments: &[String]) -> String {
    segments
        .iter()
        .flat_map(|s| chunk_txt(s))
        .map(|chunk| format!("\"{}\"", escape_txt(&chunk)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_txt(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn unescape_txt(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn chunk_txt(s: &str) -> Vec<String> {
    let bytes = s.as_bytes();
    if bytes.len() <= TXT_CHUNK_LEN {
        return vec![s.to_string()];
    }
    bytes
        .chunks(TXT_CHUNK_LEN)
        .map(|chunk| String::from_utf8_lossy(chunk).to_string())
        .collect()
}

/// Parses the backend's TXT content format back into sub-strings:
/// optional leading whitespace, then `"…"` groups separated by single
/// spaces, `\"` and `\\` kept escaped within a group. An unmatched
/// quote or missing leading quote is a parse error (spec §4.4).
pub fn string_to_txt_strings(content: &str) -> Result<Vec<String>, AdapterError> {
    let trimmed = content.trim_start();
    let mut strings = Vec::new();
    let chars: Vec<char> = trimmed.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '"' {
            return Err(AdapterError::Rdata(format!("TXT content missing leading quote at offset {i}: {content:?}")));
        }
        i += 1;
        let start = i;
        let mut closed = false;
        let mut raw = String::new();
        while i < chars.len() {
            match chars[i] {
                '\\' if i + 1 < chars.len() => {
                    raw.push(chars[i]);
                    raw.push(chars[i + 1]);
                    i += 2;
                }
                '"' => {
                    closed = true;
                    i += 1;
                    break;
                }
                c => {
                    raw.push(c);
                    i += 1;
                }
            }
        }
        if !closed {
            return Err(AdapterError::Rdata(format!("TXT content has unmatched quote starting at offset {start}: {content:?}")));
        }
        strings.push(unescape_txt(&raw));
        if i < chars.len() {
            if chars[i] != ' ' {
                return Err(AdapterError::Rdata(format!("TXT content groups must be space-separated: {content:?}")));
            }
            i += 1;
        }
    }
    Ok(strings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn txt_round_trip_simple() {
        let strings = vec!["hello".to_string(), "world".to_string()];
        let formatted = txt_to_string(&strings);
        assert_eq!(formatted, "\"hello\" \"world\"");
        assert_eq!(string_to_txt_strings(&formatted).unwrap(), strings);
    }

    #[test]
    fn txt_round_trip_with_escapes() {
        let strings = vec!["a\"b\\c".to_string()];
        let formatted = txt_to_string(&strings);
        assert_eq!(string_to_txt_strings(&formatted).unwrap(), strings);
    }

    #[test]
    fn txt_splits_over_255_bytes() {
        let long = "a".repeat(300);
        let formatted = txt_to_string(&[long.clone()]);
        let groups: Vec<&str> = formatted.split("\" \"").collect();
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn txt_rejects_missing_leading_quote() {
        assert!(string_to_txt_strings("hello").is_err());
    }

    #[test]
    fn txt_rejects_unmatched_quote() {
        assert!(string_to_txt_strings("\"hello").is_err());
    }

    #[test]
    fn soa_round_trip() {
        let content = "ns1.example.test. hostmaster.example.test. 2024010100 3600 900 1209600 300";
        let rdata = parse_soa(content).unwrap();
        assert_eq!(content_of(&rdata).unwrap(), content);
    }

    #[test]
    fn soa_rejects_wrong_field_count() {
        assert!(parse_soa("ns1.example.test. hostmaster.example.test. 1 2 3").is_err());
    }

    #[test]
    fn a_content_round_trip() {
        let rdata = rdata_of(RecordType::A, "192.0.2.10").unwrap();
        assert_eq!(content_of(&rdata).unwrap(), "192.0.2.10");
    }
}
