//! The request handler: the staged pipeline of spec §4.7, expressed as
//! a sequence of guarded returns over a response builder (one of the
//! two faithful shapes spec §9 names for the source's goto-driven
//! `pkg/server/handler.go`).

use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{DNSClass, Name, RData, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinEncodable, BinEncoder};

use crate::dns::tsig_wire::extract_and_strip;
use crate::dns::zone::Zone;
use crate::dns::tsig;
use crate::server::ServerContext;
use crate::update::prerequisites::Prerequisite;
use crate::update::task::{Task, UpdateRR};
use crate::update::Authorization;

enum TsigOutcome {
    Absent,
    Valid { key_name: String, algorithm_name: String },
    Invalid,
}

fn classify_tsig(context: &ServerContext, message: &mut Message) -> TsigOutcome {
    match extract_and_strip(message) {
        None => TsigOutcome::Absent,
        Some((extracted, msg_bytes)) => match tsig::verify(&context.keyring, &extracted.key_name, &extracted.algorithm_name, &msg_bytes, &extracted.mac_hex) {
            Ok(()) => TsigOutcome::Valid { key_name: extracted.key_name, algorithm_name: extracted.algorithm_name },
            Err(e) => {
                log::debug!("tsig verification failed: {e}");
                TsigOutcome::Invalid
            }
        },
    }
}

fn is_subzone(name: &Name, zone_fqdn: &Name) -> bool {
    name == zone_fqdn || name.to_string().to_ascii_lowercase().ends_with(&zone_fqdn.to_string().to_ascii_lowercase())
}

fn reply(original: &Message, rcode: ResponseCode) -> Vec<u8> {
    let mut response = Message::new();
    response.set_id(original.id());
    response.set_message_type(MessageType::Response);
    response.set_op_code(OpCode::Update);
    response.set_response_code(rcode);
    for query in original.queries() {
        response.add_query(query.clone());
    }
    let mut buf = Vec::new();
    {
        let mut encoder = BinEncoder::new(&mut buf);
        // Best effort: an encode failure here means the request itself
        // was unrepresentable, which can't happen for a message we
        // just successfully decoded and only re-tagged.
        let _ = response.emit(&mut encoder);
    }
    buf
}

/// Handles one decoded request and returns the wire bytes to send
/// back, or `None` if the message fails the accept filter and must be
/// dropped silently (spec §7: "no response is ever produced for
/// messages that fail the accept filter").
pub async fn handle_request(context: &ServerContext, raw: &[u8]) -> Option<Vec<u8>> {
    let mut message = Message::from_bytes(raw).ok()?;

    if message.message_type() != MessageType::Query {
        return None; // responses are never valid inbound requests
    }

    if message.op_code() != OpCode::Update {
        return Some(reply(&message, ResponseCode::NotImp));
    }

    let tsig_outcome = classify_tsig(context, &mut message);
    if matches!(tsig_outcome, TsigOutcome::Invalid) {
        return Some(reply(&message, ResponseCode::Refused));
    }

    let queries: Vec<Query> = message.queries().to_vec();
    if queries.len() != 1 || queries[0].query_type() != RecordType::SOA {
        return Some(reply(&message, ResponseCode::FormErr));
    }
    let zone_fqdn = queries[0].name().clone();

    let Some(zone) = context.zones.lookup(&zone_fqdn) else {
        return Some(reply(&message, ResponseCode::NotAuth));
    };
    let zone: Zone = zone.clone();

    if matches!(tsig_outcome, TsigOutcome::Absent) && !zone.authentication_disabled() {
        return Some(reply(&message, ResponseCode::Refused));
    }

    let mut prerequisites: Vec<Prerequisite> = Vec::new();
    let mut rrset_equality_members: Vec<(Name, RecordType, RData)> = Vec::new();
    for rr in message.answers() {
        if rr.ttl() != 0 {
            return Some(reply(&message, ResponseCode::FormErr));
        }
        if !is_subzone(rr.name(), &zone_fqdn) {
            return Some(reply(&message, ResponseCode::NotZone));
        }
        let has_rdata = rr.data().is_some();
        match rr.dns_class() {
            DNSClass::ANY => {
                if has_rdata {
                    return Some(reply(&message, ResponseCode::FormErr));
                }
                if rr.record_type() == RecordType::ANY {
                    prerequisites.push(Prerequisite::name_exists(rr.name().clone()));
                } else {
                    prerequisites.push(Prerequisite::name_type_exists(rr.name().clone(), rr.record_type()));
                }
            }
            DNSClass::NONE => {
                if has_rdata {
                    return Some(reply(&message, ResponseCode::FormErr));
                }
                if rr.record_type() == RecordType::ANY {
                    prerequisites.push(Prerequisite::name_absent(rr.name().clone()));
                } else {
                    prerequisites.push(Prerequisite::name_type_absent(rr.name().clone(), rr.record_type()));
                }
            }
            DNSClass::IN => {
                if let Some(rdata) = rr.data() {
                    rrset_equality_members.push((rr.name().clone(), rr.record_type(), rdata.clone()));
                }
            }
            _ => return Some(reply(&message, ResponseCode::FormErr)),
        }
    }
    if !rrset_equality_members.is_empty() {
        prerequisites.push(Prerequisite::rrset_equality(rrset_equality_members));
    }

    let mut authorization = Authorization::new(zone.clone());
    match &tsig_outcome {
        TsigOutcome::Valid { key_name, algorithm_name } => {
            if authorization.mark_verified(key_name.clone(), algorithm_name.clone()).is_err() {
                return Some(reply(&message, ResponseCode::ServFail));
            }
        }
        TsigOutcome::Absent | TsigOutcome::Invalid => {}
    }

    let mut updates: Vec<UpdateRR> = Vec::new();
    for rr in message.name_servers() {
        if !is_subzone(rr.name(), &zone_fqdn) {
            return Some(reply(&message, ResponseCode::NotZone));
        }
        let rtype = rr.record_type();
        // AXFR=252, MAILB=253, MAILA=254 (RFC 1035 §3.2.3); ANY=255.
        let code = u16::from(rtype);
        let is_axfr_maila_mailb = code == 252 || code == 253 || code == 254;
        let is_meta = is_axfr_maila_mailb || rtype == RecordType::ANY;
        match rr.dns_class() {
            DNSClass::IN => {
                if is_meta {
                    return Some(reply(&message, ResponseCode::FormErr));
                }
            }
            DNSClass::ANY => {
                // class=ANY + type=ANY is the legitimate §3.4.2.3 "delete
                // all RRsets for a name" form, so ANY is deliberately
                // excluded here (unlike the IN and NONE arms below).
                if rr.ttl() != 0 || rr.data().is_some() || is_axfr_maila_mailb {
                    return Some(reply(&message, ResponseCode::FormErr));
                }
            }
            DNSClass::NONE => {
                if rr.ttl() != 0 || is_meta {
                    return Some(reply(&message, ResponseCode::FormErr));
                }
            }
            _ => return Some(reply(&message, ResponseCode::FormErr)),
        }
        updates.push(UpdateRR { name: rr.name().clone(), class: rr.dns_class(), rtype, ttl: rr.ttl(), rdata: rr.data().cloned() });
    }

    let Some(adapter) = context.handlers.get(&zone.handler) else {
        return Some(reply(&message, ResponseCode::ServFail));
    };

    let task = Task::new(authorization, prerequisites, DNSClass::IN, updates);
    match task.execute(adapter.as_ref()).await {
        Ok(()) => Some(reply(&message, ResponseCode::NoError)),
        Err(e) => {
            log::warn!("update task failed for zone {zone_fqdn}: {e}");
            Some(reply(&message, e.rcode))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::powerdns::{PowerDnsAdapter, PowerDnsConfig};
    use crate::dns::tsig::Keyring;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn context_with_zone(zone: Zone) -> ServerContext {
        let mut zones = crate::dns::zone::ZoneRegistry::new();
        zones.insert(zone);
        let mut handlers: HashMap<String, Arc<dyn crate::adapters::Adapter>> = HashMap::new();
        handlers.insert(
            "h1".to_string(),
            Arc::new(PowerDnsAdapter::new(PowerDnsConfig { url: "http://127.0.0.1:1".to_string(), server_id: "localhost".to_string(), api_key: "x".to_string() })),
        );
        ServerContext { keyring: Keyring::new(), zones, handlers }
    }

    fn update_request(zone_name: &str) -> Vec<u8> {
        let mut message = Message::new();
        message.set_message_type(MessageType::Query);
        message.set_op_code(OpCode::Update);
        let mut query = Query::new();
        query.set_name(Name::from_ascii(zone_name).unwrap());
        query.set_query_type(RecordType::SOA);
        message.add_query(query);
        let mut buf = Vec::new();
        let mut encoder = BinEncoder::new(&mut buf);
        message.emit(&mut encoder).unwrap();
        buf
    }

    fn response_code_of(raw: &[u8]) -> ResponseCode {
        Message::from_bytes(raw).unwrap().response_code()
    }

    #[tokio::test]
    async fn non_update_opcode_replies_notimp() {
        let context = context_with_zone(Zone::new("example.test.", "h1".to_string(), vec![], true).unwrap());
        let mut message = Message::new();
        message.set_message_type(MessageType::Query);
        message.set_op_code(OpCode::Query);
        let mut buf = Vec::new();
        message.emit(&mut BinEncoder::new(&mut buf)).unwrap();

        let response = handle_request(&context, &buf).await.unwrap();
        assert_eq!(response_code_of(&response), ResponseCode::NotImp);
    }

    #[tokio::test]
    async fn unknown_zone_replies_notauth() {
        let context = context_with_zone(Zone::new("other.test.", "h1".to_string(), vec![], true).unwrap());
        let request = update_request("example.test.");

        let response = handle_request(&context, &request).await.unwrap();
        assert_eq!(response_code_of(&response), ResponseCode::NotAuth);
    }

    #[tokio::test]
    async fn unauthenticated_request_to_secured_zone_replies_refused() {
        let context = context_with_zone(Zone::new("example.test.", "h1".to_string(), vec!["k1".to_string()], false).unwrap());
        let request = update_request("example.test.");

        let response = handle_request(&context, &request).await.unwrap();
        assert_eq!(response_code_of(&response), ResponseCode::Refused);
    }

    #[tokio::test]
    async fn wrong_question_count_replies_formerr() {
        let context = context_with_zone(Zone::new("example.test.", "h1".to_string(), vec![], true).unwrap());
        let mut message = Message::new();
        message.set_message_type(MessageType::Query);
        message.set_op_code(OpCode::Update);
        let mut query = Query::new();
        query.set_name(Name::from_ascii("example.test.").unwrap());
        query.set_query_type(RecordType::A); // not SOA
        message.add_query(query);
        let mut buf = Vec::new();
        message.emit(&mut BinEncoder::new(&mut buf)).unwrap();

        let response = handle_request(&context, &buf).await.unwrap();
        assert_eq!(response_code_of(&response), ResponseCode::FormErr);
    }

    // Regression test for the handler's §3.4.1 prescan: class=ANY +
    // type=ANY (ttl=0, no rdata) is the legitimate §3.4.2.3 "delete all
    // RRsets for a name" form and must reach `Task::execute`, not be
    // rejected as a meta-type by the prescan.
    #[tokio::test]
    async fn class_any_type_any_update_rr_passes_prescan() {
        let context = context_with_zone(Zone::new("example.test.", "h1".to_string(), vec![], true).unwrap());
        let mut message = Message::new();
        message.set_message_type(MessageType::Query);
        message.set_op_code(OpCode::Update);
        let mut query = Query::new();
        query.set_name(Name::from_ascii("example.test.").unwrap());
        query.set_query_type(RecordType::SOA);
        message.add_query(query);

        let mut delete_record = hickory_proto::rr::Record::new();
        delete_record.set_name(Name::from_ascii("host.example.test.").unwrap());
        delete_record.set_record_type(RecordType::ANY);
        delete_record.set_dns_class(DNSClass::ANY);
        delete_record.set_ttl(0);
        message.add_name_servers(vec![delete_record]);

        let mut buf = Vec::new();
        message.emit(&mut BinEncoder::new(&mut buf)).unwrap();

        // The backend URL is unreachable, so the task fails at the
        // transaction-open step, but it must get past the prescan (not
        // FORMERR) to reach it.
        let response = handle_request(&context, &buf).await.unwrap();
        assert_eq!(response_code_of(&response), ResponseCode::ServFail);
    }

    #[tokio::test]
    async fn unsecure_zone_update_with_no_prerequisites_reaches_task() {
        let context = context_with_zone(Zone::new("example.test.", "h1".to_string(), vec![], true).unwrap());
        let request = update_request("example.test.");

        // The backend URL is unreachable, so the task will fail at the
        // transaction-open step rather than succeeding, but it must get
        // past every gate before that (opcode, zone lookup, auth) to
        // prove the unsecure zone is accepted without TSIG.
        let response = handle_request(&context, &request).await.unwrap();
        assert_eq!(response_code_of(&response), ResponseCode::ServFail);
    }
}

