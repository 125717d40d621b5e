//! Extracts a TSIG pseudo-record from a decoded message and recovers
//! the "message bytes without the TSIG RR" the provider MACs over
//! (spec §4.1, §6).
//!
//! `hickory-proto` has no built-in TSIG RR decoder for this crate's
//! simplified (non-RFC-8945-variable) MAC, so the record's rdata is
//! read generically — it decodes as `RData::Unknown{code: 250, ..}`,
//! the same representation the teacher's own hand-rolled TSIG encoder
//! (`dns::tsig::create_signature`) produces on the way out. This
//! module is that path run in reverse.
//!
//! Simplification: rather than locating exact byte offsets in the
//! original datagram, the pre-TSIG message is reconstructed by
//! removing the TSIG record from the decoded `Message` and
//! re-emitting it. This is faithful for update traffic from
//! conforming clients (no name-compression quirks across the TSIG
//! boundary); a from-the-wire byte-exact implementation would instead
//! track `BinDecoder` offsets while parsing each section.

use hickory_proto::op::Message;
use hickory_proto::rr::{Name, RData, Record, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinDecoder, BinEncodable, BinEncoder};

pub const TSIG_RDATA_TYPE: u16 = 250;

pub struct ExtractedTsig {
    pub key_name: String,
    pub algorithm_name: String,
    pub mac_hex: String,
}

struct TsigFields {
    algorithm_name: Name,
    mac: Vec<u8>,
}

fn decode_tsig_rdata(bytes: &[u8]) -> Option<TsigFields> {
    let mut decoder = BinDecoder::new(bytes);
    let algorithm_name = Name::read(&mut decoder).ok()?;
    let _time_hi = decoder.read_u16().ok()?.unverified();
    let _time_lo = decoder.read_u32().ok()?.unverified();
    let _fudge = decoder.read_u16().ok()?.unverified();
    let mac_size = decoder.read_u16().ok()?.unverified() as usize;
    let mac = decoder.read_vec(mac_size).ok()?.unverified();
    let _original_id = decoder.read_u16().ok()?.unverified();
    let _error = decoder.read_u16().ok()?.unverified();
    let other_len = decoder.read_u16().ok()?.unverified() as usize;
    let _other_data = decoder.read_vec(other_len).ok()?.unverified();
    Some(TsigFields { algorithm_name, mac })
}

/// Pops the trailing TSIG record off `message`'s additional section
/// (if present) and returns both the extracted fields and the
/// re-encoded "message before TSIG" bytes to MAC over.
pub fn extract_and_strip(message: &mut Message) -> Option<(ExtractedTsig, Vec<u8>)> {
    let is_tsig = message.additionals().last().is_some_and(|r| matches!(r.record_type(), RecordType::Unknown(TSIG_RDATA_TYPE)));
    if !is_tsig {
        return None;
    }
    let record: Record = message.additionals_mut().pop()?;
    let key_name = record.name().to_utf8();
    let rdata_bytes = match record.data() {
        Some(RData::Unknown { rdata, .. }) => rdata.anything().to_vec(),
        _ => return None,
    };
    let fields = decode_tsig_rdata(&rdata_bytes)?;

    let mut buf = Vec::new();
    {
        let mut encoder = BinEncoder::new(&mut buf);
        encoder.set_canonical_names(false);
        if message.emit(&mut encoder).is_err() {
            return None;
        }
    }

    Some((
        ExtractedTsig { key_name, algorithm_name: fields.algorithm_name.to_utf8(), mac_hex: hex::encode(&fields.mac) },
        buf,
    ))
}
