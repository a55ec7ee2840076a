use meter_domain::domain::{MeterType, Reading, ScmMessage};
use serde::{Deserialize, Deserializer};
use time::{format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime, PrimitiveDateTime};

/// Why a decoder output line did not yield a `Reading`.
#[derive(thiserror::Error, Debug)]
pub enum ParseFailure {
    #[error("empty line")]
    Empty,
    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Top-level record as emitted by `rtlamr -format=json`.
#[derive(Deserialize)]
struct IncomingReading {
    #[serde(rename = "Time", deserialize_with = "deserialize_time")]
    time: OffsetDateTime,
    #[serde(rename = "Offset")]
    offset: i64,
    // Kept loose: an odd or missing tag must not reject the record.
    #[serde(rename = "Type", default)]
    kind: Option<serde_json::Value>,
    #[serde(rename = "Message")]
    message: IncomingMessage,
}

/// RFC 3339 first; a timestamp without an offset is taken as UTC.
fn parse_time(s: &str) -> Result<OffsetDateTime, time::error::Parse> {
    match OffsetDateTime::parse(s, &Rfc3339) {
        Ok(t) => Ok(t),
        Err(e) => PrimitiveDateTime::parse(
            s,
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"),
        )
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|_| e),
    }
}

fn deserialize_time<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_time(&s).map_err(serde::de::Error::custom)
}

/// The two payload layouts, tried in declaration order.
#[derive(Deserialize)]
#[serde(untagged)]
enum IncomingMessage {
    Scm {
        #[serde(rename = "ID")]
        id: u64,
        #[serde(rename = "Type")]
        kind: u32,
        #[serde(rename = "Consumption")]
        consumption: u64,
    },
    ScmPlus {
        #[serde(rename = "EndpointID")]
        id: u64,
        #[serde(rename = "EndpointType")]
        kind: u32,
        #[serde(rename = "Consumption")]
        consumption: u64,
    },
}

impl From<IncomingMessage> for ScmMessage {
    fn from(m: IncomingMessage) -> Self {
        let (meter_id, protocol_type, consumption) = match m {
            IncomingMessage::Scm {
                id,
                kind,
                consumption,
            }
            | IncomingMessage::ScmPlus {
                id,
                kind,
                consumption,
            } => (id, kind, consumption),
        };

        ScmMessage {
            meter_id,
            protocol_type,
            consumption,
        }
    }
}

impl From<IncomingReading> for Reading {
    fn from(i: IncomingReading) -> Self {
        let meter_type = match i.kind {
            Some(serde_json::Value::String(tag)) => MeterType::from_tag(&tag),
            _ => MeterType::Unknown,
        };

        Reading {
            time: i.time,
            offset: i.offset,
            meter_type,
            message: i.message.into(),
        }
    }
}

/// Decodes one line of decoder output.
///
/// A single trailing `\r` is tolerated. Anything that is not a complete
/// record (including an empty line) is a `ParseFailure`.
pub fn decode_line(line: &[u8]) -> Result<Reading, ParseFailure> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.is_empty() {
        return Err(ParseFailure::Empty);
    }

    let incoming: IncomingReading = serde_json::from_slice(line)?;
    Ok(incoming.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const SCM_LINE: &str = r#"{"Time":"2025-12-05T16:44:45.730309536Z","Offset":0,"Length":40960,"Type":"SCM","Message":{"ID":44826100,"Type":12,"TamperPhy":1,"TamperEnc":0,"Consumption":548140,"ChecksumVal":47768}}"#;
    const SCM_PLUS_LINE: &str = r#"{"Time":"2025-12-05T16:45:31.269518166Z","Offset":0,"Length":229376,"Type":"SCM+","Message":{"FrameSync":5795,"ProtocolID":30,"EndpointType":156,"EndpointID":78043469,"Consumption":406934,"Tamper":1280,"PacketCRC":44066}}"#;

    #[test]
    fn decodes_scm_record() {
        let r = decode_line(SCM_LINE.as_bytes()).unwrap();
        assert_eq!(r.time, datetime!(2025-12-05 16:44:45.730309536 UTC));
        assert_eq!(r.offset, 0);
        assert_eq!(r.meter_type, MeterType::Scm);
        assert_eq!(
            r.message,
            ScmMessage {
                meter_id: 44826100,
                protocol_type: 12,
                consumption: 548140,
            }
        );
    }

    #[test]
    fn decodes_scm_plus_record() {
        let r = decode_line(SCM_PLUS_LINE.as_bytes()).unwrap();
        assert_eq!(r.time, datetime!(2025-12-05 16:45:31.269518166 UTC));
        assert_eq!(r.meter_type, MeterType::ScmPlus);
        assert_eq!(
            r.message,
            ScmMessage {
                meter_id: 78043469,
                protocol_type: 156,
                consumption: 406934,
            }
        );
    }

    #[test]
    fn both_layouts_normalise_to_the_same_message() {
        let a = r#"{"Time":"2025-12-05T16:44:45Z","Offset":7,"Message":{"ID":5,"Type":12,"Consumption":99}}"#;
        let b = r#"{"Time":"2025-12-05T16:44:45Z","Offset":7,"Message":{"EndpointID":5,"EndpointType":12,"Consumption":99}}"#;

        let ra = decode_line(a.as_bytes()).unwrap();
        let rb = decode_line(b.as_bytes()).unwrap();
        assert_eq!(ra.message, rb.message);
        assert_eq!(ra, rb);
    }

    #[test]
    fn missing_or_odd_type_tag_defaults_to_unknown() {
        let lines = [
            r#"{"Time":"2025-12-05T16:44:45Z","Offset":0,"Message":{"ID":1,"Type":12,"Consumption":1}}"#,
            r#"{"Time":"2025-12-05T16:44:45Z","Offset":0,"Type":null,"Message":{"ID":1,"Type":12,"Consumption":1}}"#,
            r#"{"Time":"2025-12-05T16:44:45Z","Offset":0,"Type":"IDM","Message":{"ID":1,"Type":12,"Consumption":1}}"#,
            r#"{"Time":"2025-12-05T16:44:45Z","Offset":0,"Type":42,"Message":{"ID":1,"Type":12,"Consumption":1}}"#,
        ];

        for line in lines {
            let r = decode_line(line.as_bytes()).unwrap();
            assert_eq!(r.meter_type, MeterType::Unknown, "line: {line}");
        }
    }

    #[test]
    fn accepts_numeric_offset_timezone_and_crlf() {
        let line = "{\"Time\":\"2025-12-05T11:44:45.5-05:00\",\"Offset\":-3,\"Type\":\"SCM\",\"Message\":{\"ID\":1,\"Type\":4,\"Consumption\":2}}\r";
        let r = decode_line(line.as_bytes()).unwrap();
        assert_eq!(r.time, datetime!(2025-12-05 16:44:45.5 UTC));
        assert_eq!(r.offset, -3);
    }

    #[test]
    fn timestamp_without_offset_is_utc() {
        let line = br#"{"Time":"2025-12-05T16:44:45.73","Offset":0,"Type":"SCM","Message":{"ID":1,"Type":12,"Consumption":1}}"#;
        let r = decode_line(line).unwrap();
        assert_eq!(r.time, datetime!(2025-12-05 16:44:45.73 UTC));

        let line = br#"{"Time":"2025-12-05T16:44:45","Offset":0,"Message":{"ID":1,"Type":12,"Consumption":1}}"#;
        let r = decode_line(line).unwrap();
        assert_eq!(r.time, datetime!(2025-12-05 16:44:45 UTC));
    }

    // Each layout is taken whole; fields are not mixed across the two.
    #[test]
    fn mixed_layout_and_float_payloads_are_rejected() {
        let lines: [&[u8]; 2] = [
            br#"{"Time":"2025-12-05T16:44:45Z","Offset":0,"Message":{"ID":1,"EndpointType":12,"Consumption":1}}"#,
            br#"{"Time":"2025-12-05T16:44:45Z","Offset":0,"Message":{"ID":1,"Type":12,"Consumption":1.0}}"#,
        ];

        for line in lines {
            assert!(matches!(decode_line(line), Err(ParseFailure::Malformed(_))));
        }
    }

    #[test]
    fn rejects_malformed_lines() {
        let lines: [&[u8]; 9] = [
            br#"{"Time":"2025-12-05T16:44:45Z","Offset":0,"Message":{"ID":1,"#,
            b"not json at all",
            br#"{"Time":"2025-12-05T16:44:45Z","Offset":0,"Message":{"Type":12,"Consumption":1}}"#,
            br#"{"Time":"2025-12-05T16:44:45Z","Offset":0,"Message":{"ID":1,"Type":12}}"#,
            br#"{"Time":"2025-12-05T16:44:45Z","Offset":0,"Message":{"ID":"1","Type":12,"Consumption":1}}"#,
            br#"{"Time":"2025-12-05T16:44:45Z","Offset":0,"Message":{"ID":-1,"Type":12,"Consumption":1}}"#,
            br#"{"Time":"yesterday","Offset":0,"Message":{"ID":1,"Type":12,"Consumption":1}}"#,
            br#"{"Time":"2025-12-05","Offset":0,"Message":{"ID":1,"Type":12,"Consumption":1}}"#,
            b"\xff\xfe{}",
        ];

        for line in lines {
            assert!(
                matches!(decode_line(line), Err(ParseFailure::Malformed(_))),
                "line should be rejected: {}",
                String::from_utf8_lossy(line)
            );
        }
    }

    #[test]
    fn rejects_empty_line() {
        assert!(matches!(decode_line(b""), Err(ParseFailure::Empty)));
        assert!(matches!(decode_line(b"\r"), Err(ParseFailure::Empty)));
    }
}
