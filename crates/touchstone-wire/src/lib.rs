// SPDX-License-Identifier: MIT OR Apache-2.0
//! Deterministic binary envelope codec for captured test results.
//!
//! ## Wire Format (Version 0x01)
//!
//! All integers are little-endian. `str` denotes `[Length: u32 LE][UTF-8
//! bytes]`.
//!
//! ```text
//! Messages envelope:
//!   [Version: u8 = 0x01]
//!   [Message Count: u32 LE]
//!   For each message:
//!     [Buffer Length: u32 LE]
//!     [Message buffer bytes]
//!
//! Message buffer:
//!   [Version: u8 = 0x01]
//!   Tagged tables, each framed as [Tag: u8][Length: u32 LE][Payload]:
//!     Tag 1: Metadata
//!     Tag 2: Results
//!     Tag 3: Metrics
//!
//! Metadata payload — tagged string fields, same [Tag][Length][Payload] frame:
//!   Tag 1: teamslug   Tag 2: testsuite   Tag 3: version
//!   Tag 4: testcase   Tag 5: built_at
//!
//! Results payload:
//!   [Entry Count: u32 LE]
//!   For each entry: [Key: str][Category: u8 (0 Check, 1 Assert)][TypeWrapper]
//!
//! Metrics payload:
//!   [Entry Count: u32 LE]
//!   For each entry: [Key: str][TypeWrapper — must carry a signed integer]
//!
//! TypeWrapper:
//!   [Kind: u8]  1 Bool   2 Int    3 UInt   4 Float
//!               5 Double 6 String 7 Array  8 Object
//!   Bool:   [u8 (0 or 1)]
//!   Int:    [i64 LE]        UInt:  [u64 LE]
//!   Float:  [f32 LE]        Double: [f64 LE]
//!   String: [str]
//!   Array:  [Count: u32 LE][TypeWrapper...]
//!   Object: [Tag: str][Count: u32 LE]([Name: str][TypeWrapper])...
//! ```
//!
//! The tag+length framing of tables and metadata fields is what carries the
//! schema-evolution tolerance: a reader skips frames whose tag it does not
//! recognize, and treats absent frames as empty. Readers refuse truncated
//! buffers, unknown value kinds, empty object member names, and metric
//! values that are not signed integers.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use touchstone_types::{DataPoint, ValueKind};

/// Current wire format version, written as the first byte of every envelope.
pub const WIRE_VERSION: u8 = 0x01;

const TABLE_METADATA: u8 = 1;
const TABLE_RESULTS: u8 = 2;
const TABLE_METRICS: u8 = 3;

const META_TEAM: u8 = 1;
const META_SUITE: u8 = 2;
const META_VERSION: u8 = 3;
const META_CASE: u8 = 4;
const META_BUILT_AT: u8 = 5;

const KIND_BOOL: u8 = 1;
const KIND_INT: u8 = 2;
const KIND_UINT: u8 = 3;
const KIND_FLOAT: u8 = 4;
const KIND_DOUBLE: u8 = 5;
const KIND_STRING: u8 = 6;
const KIND_ARRAY: u8 = 7;
const KIND_OBJECT: u8 = 8;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while decoding a binary artifact.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer ended before the structure was complete.
    #[error("unexpected end of buffer")]
    UnexpectedEof,

    /// The envelope carries a format version this reader does not speak.
    #[error("unsupported wire format version {0}")]
    UnsupportedVersion(u8),

    /// A value or category tag was not recognized.
    #[error("unknown tag {0}")]
    UnknownTag(u8),

    /// A length-prefixed string was not valid UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    /// An object member was encoded without a name.
    #[error("object member is missing its name")]
    MissingName,

    /// A metric value decoded to something other than a signed integer.
    #[error("metric \"{key}\" does not carry an integer duration")]
    MetricNotInteger {
        /// Key of the offending metric entry.
        key: String,
    },
}

impl From<std::io::Error> for DecodeError {
    fn from(_: std::io::Error) -> Self {
        DecodeError::UnexpectedEof
    }
}

// ---------------------------------------------------------------------------
// Message model
// ---------------------------------------------------------------------------

/// Category of a captured result entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCategory {
    /// Contributes to regression scoring.
    Check,
    /// Reported as an invariant assertion alongside the checks.
    Assert,
}

impl ResultCategory {
    fn to_wire(self) -> u8 {
        match self {
            Self::Check => 0,
            Self::Assert => 1,
        }
    }

    fn from_wire(byte: u8) -> Result<Self, DecodeError> {
        match byte {
            0 => Ok(Self::Check),
            1 => Ok(Self::Assert),
            other => Err(DecodeError::UnknownTag(other)),
        }
    }
}

/// Identity of the test case a message was captured for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Team slug.
    pub teamslug: String,
    /// Suite slug.
    pub testsuite: String,
    /// Version slug.
    pub version: String,
    /// Case slug.
    pub testcase: String,
    /// UTC ISO-8601 millisecond timestamp of case creation.
    pub built_at: String,
}

/// One captured result entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    /// Result key.
    pub key: String,
    /// Captured value.
    pub value: DataPoint,
    /// Check or Assert.
    pub category: ResultCategory,
}

/// One captured metric entry, as an integer-millisecond duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRecord {
    /// Metric key.
    pub key: String,
    /// Duration in milliseconds.
    pub duration_ms: i64,
}

/// The decoded form of one test-case artifact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    /// Case identity.
    pub metadata: Metadata,
    /// Captured results, in encoder order.
    pub results: Vec<ResultRecord>,
    /// Captured metrics, in encoder order.
    pub metrics: Vec<MetricRecord>,
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

fn write_str(out: &mut Vec<u8>, value: &str) {
    out.write_u32::<LittleEndian>(value.len() as u32).ok();
    out.extend_from_slice(value.as_bytes());
}

fn write_frame(out: &mut Vec<u8>, tag: u8, payload: &[u8]) {
    out.write_u8(tag).ok();
    out.write_u32::<LittleEndian>(payload.len() as u32).ok();
    out.extend_from_slice(payload);
}

/// Encode a single value node.
pub fn encode_value(out: &mut Vec<u8>, value: &DataPoint) {
    match value {
        DataPoint::Boolean(v) => {
            out.write_u8(KIND_BOOL).ok();
            out.write_u8(u8::from(*v)).ok();
        }
        DataPoint::Signed(v) => {
            out.write_u8(KIND_INT).ok();
            out.write_i64::<LittleEndian>(*v).ok();
        }
        DataPoint::Unsigned(v) => {
            out.write_u8(KIND_UINT).ok();
            out.write_u64::<LittleEndian>(*v).ok();
        }
        DataPoint::Float(v) => {
            out.write_u8(KIND_FLOAT).ok();
            out.write_f32::<LittleEndian>(*v).ok();
        }
        DataPoint::Double(v) => {
            out.write_u8(KIND_DOUBLE).ok();
            out.write_f64::<LittleEndian>(*v).ok();
        }
        DataPoint::Text(v) => {
            out.write_u8(KIND_STRING).ok();
            write_str(out, v);
        }
        DataPoint::Array(values) => {
            out.write_u8(KIND_ARRAY).ok();
            out.write_u32::<LittleEndian>(values.len() as u32).ok();
            for element in values {
                encode_value(out, element);
            }
        }
        DataPoint::Object { tag, members } => {
            out.write_u8(KIND_OBJECT).ok();
            write_str(out, tag);
            out.write_u32::<LittleEndian>(members.len() as u32).ok();
            for (name, member) in members {
                write_str(out, name);
                encode_value(out, member);
            }
        }
    }
}

fn encode_metadata(meta: &Metadata) -> Vec<u8> {
    let mut out = Vec::new();
    for (tag, value) in [
        (META_TEAM, &meta.teamslug),
        (META_SUITE, &meta.testsuite),
        (META_VERSION, &meta.version),
        (META_CASE, &meta.testcase),
        (META_BUILT_AT, &meta.built_at),
    ] {
        let mut payload = Vec::new();
        payload.extend_from_slice(value.as_bytes());
        write_frame(&mut out, tag, &payload);
    }
    out
}

fn encode_results(results: &[ResultRecord]) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u32::<LittleEndian>(results.len() as u32).ok();
    for entry in results {
        write_str(&mut out, &entry.key);
        out.write_u8(entry.category.to_wire()).ok();
        encode_value(&mut out, &entry.value);
    }
    out
}

fn encode_metrics(metrics: &[MetricRecord]) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u32::<LittleEndian>(metrics.len() as u32).ok();
    for entry in metrics {
        write_str(&mut out, &entry.key);
        encode_value(&mut out, &DataPoint::number_signed(entry.duration_ms));
    }
    out
}

/// Encode one message into a self-contained buffer.
pub fn encode_message(message: &Message) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u8(WIRE_VERSION).ok();
    write_frame(&mut out, TABLE_METADATA, &encode_metadata(&message.metadata));
    write_frame(&mut out, TABLE_RESULTS, &encode_results(&message.results));
    write_frame(&mut out, TABLE_METRICS, &encode_metrics(&message.metrics));
    out
}

/// Encode a batch of messages into a `Messages` envelope.
pub fn encode_batch(messages: &[Message]) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u8(WIRE_VERSION).ok();
    out.write_u32::<LittleEndian>(messages.len() as u32).ok();
    for message in messages {
        let buffer = encode_message(message);
        out.write_u32::<LittleEndian>(buffer.len() as u32).ok();
        out.extend_from_slice(&buffer);
    }
    out
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn read_exact(cursor: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>, DecodeError> {
    // Validate the length against the remaining input before allocating, so
    // a corrupt length prefix cannot request an absurd buffer.
    let remaining = cursor.get_ref().len().saturating_sub(cursor.position() as usize);
    if len > remaining {
        return Err(DecodeError::UnexpectedEof);
    }
    let mut bytes = vec![0u8; len];
    cursor.read_exact(&mut bytes)?;
    Ok(bytes)
}

fn read_str(cursor: &mut Cursor<&[u8]>) -> Result<String, DecodeError> {
    let len = cursor.read_u32::<LittleEndian>()? as usize;
    let bytes = read_exact(cursor, len)?;
    String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)
}

/// Decode a single value node.
pub fn decode_value(cursor: &mut Cursor<&[u8]>) -> Result<DataPoint, DecodeError> {
    let kind = cursor.read_u8()?;
    match kind {
        KIND_BOOL => Ok(DataPoint::boolean(cursor.read_u8()? != 0)),
        KIND_INT => Ok(DataPoint::number_signed(
            cursor.read_i64::<LittleEndian>()?,
        )),
        KIND_UINT => Ok(DataPoint::number_unsigned(
            cursor.read_u64::<LittleEndian>()?,
        )),
        KIND_FLOAT => Ok(DataPoint::number_float(cursor.read_f32::<LittleEndian>()?)),
        KIND_DOUBLE => Ok(DataPoint::number_double(
            cursor.read_f64::<LittleEndian>()?,
        )),
        KIND_STRING => Ok(DataPoint::string(read_str(cursor)?)),
        KIND_ARRAY => {
            let count = cursor.read_u32::<LittleEndian>()? as usize;
            let mut array = DataPoint::array();
            for _ in 0..count {
                let element = decode_value(cursor)?;
                array.push_back(element).expect("node is an array");
            }
            Ok(array)
        }
        KIND_OBJECT => {
            let tag = read_str(cursor)?;
            let count = cursor.read_u32::<LittleEndian>()? as usize;
            let mut object = DataPoint::object(tag);
            for _ in 0..count {
                let name = read_str(cursor)?;
                if name.is_empty() {
                    return Err(DecodeError::MissingName);
                }
                let member = decode_value(cursor)?;
                object.add_member(name, member).expect("node is an object");
            }
            Ok(object)
        }
        other => Err(DecodeError::UnknownTag(other)),
    }
}

fn decode_metadata(payload: &[u8]) -> Result<Metadata, DecodeError> {
    let mut cursor = Cursor::new(payload);
    let mut meta = Metadata::default();
    while (cursor.position() as usize) < payload.len() {
        let tag = cursor.read_u8()?;
        let len = cursor.read_u32::<LittleEndian>()? as usize;
        let bytes = read_exact(&mut cursor, len)?;
        let value = String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)?;
        match tag {
            META_TEAM => meta.teamslug = value,
            META_SUITE => meta.testsuite = value,
            META_VERSION => meta.version = value,
            META_CASE => meta.testcase = value,
            META_BUILT_AT => meta.built_at = value,
            // Fields added by a newer writer: skip.
            _ => {}
        }
    }
    Ok(meta)
}

fn decode_results(payload: &[u8]) -> Result<Vec<ResultRecord>, DecodeError> {
    let mut cursor = Cursor::new(payload);
    let count = cursor.read_u32::<LittleEndian>()? as usize;
    // Entry counts come from untrusted input; let the vector grow as
    // entries actually decode.
    let mut results = Vec::new();
    for _ in 0..count {
        let key = read_str(&mut cursor)?;
        let category = ResultCategory::from_wire(cursor.read_u8()?)?;
        let value = decode_value(&mut cursor)?;
        results.push(ResultRecord {
            key,
            value,
            category,
        });
    }
    Ok(results)
}

fn decode_metrics(payload: &[u8]) -> Result<Vec<MetricRecord>, DecodeError> {
    let mut cursor = Cursor::new(payload);
    let count = cursor.read_u32::<LittleEndian>()? as usize;
    let mut metrics = Vec::new();
    for _ in 0..count {
        let key = read_str(&mut cursor)?;
        let value = decode_value(&mut cursor)?;
        match value {
            DataPoint::Signed(duration_ms) => metrics.push(MetricRecord { key, duration_ms }),
            _ => return Err(DecodeError::MetricNotInteger { key }),
        }
    }
    Ok(metrics)
}

/// Decode one message buffer.
pub fn decode_message(buffer: &[u8]) -> Result<Message, DecodeError> {
    let mut cursor = Cursor::new(buffer);
    let version = cursor.read_u8()?;
    if version != WIRE_VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }
    let mut message = Message::default();
    while (cursor.position() as usize) < buffer.len() {
        let tag = cursor.read_u8()?;
        let len = cursor.read_u32::<LittleEndian>()? as usize;
        let payload = read_exact(&mut cursor, len)?;
        match tag {
            TABLE_METADATA => message.metadata = decode_metadata(&payload)?,
            TABLE_RESULTS => message.results = decode_results(&payload)?,
            TABLE_METRICS => message.metrics = decode_metrics(&payload)?,
            // Tables added by a newer writer: skip.
            _ => {}
        }
    }
    Ok(message)
}

/// Decode a `Messages` batch envelope.
pub fn decode_batch(buffer: &[u8]) -> Result<Vec<Message>, DecodeError> {
    let mut cursor = Cursor::new(buffer);
    let version = cursor.read_u8()?;
    if version != WIRE_VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }
    let count = cursor.read_u32::<LittleEndian>()? as usize;
    let mut messages = Vec::new();
    for _ in 0..count {
        let len = cursor.read_u32::<LittleEndian>()? as usize;
        let bytes = read_exact(&mut cursor, len)?;
        messages.push(decode_message(&bytes)?);
    }
    Ok(messages)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: DataPoint) -> DataPoint {
        let mut bytes = Vec::new();
        encode_value(&mut bytes, &value);
        decode_value(&mut Cursor::new(bytes.as_slice())).unwrap()
    }

    fn sample_message() -> Message {
        let mut array = DataPoint::array();
        array.push_back(DataPoint::string("leo-ferre")).unwrap();
        let mut object = DataPoint::object("Song");
        object
            .add_member("title", DataPoint::string("avec-le-temps"))
            .unwrap();
        object
            .add_member("year", DataPoint::number_signed(1971))
            .unwrap();
        Message {
            metadata: Metadata {
                teamslug: "acme".into(),
                testsuite: "songs".into(),
                version: "v1.0".into(),
                testcase: "case-1".into(),
                built_at: "2024-01-01T00:00:00.000Z".into(),
            },
            results: vec![
                ResultRecord {
                    key: "chanteur".into(),
                    value: array,
                    category: ResultCategory::Check,
                },
                ResultRecord {
                    key: "song".into(),
                    value: object,
                    category: ResultCategory::Assert,
                },
                ResultRecord {
                    key: "hits".into(),
                    value: DataPoint::number_unsigned(2),
                    category: ResultCategory::Check,
                },
            ],
            metrics: vec![MetricRecord {
                key: "runtime".into(),
                duration_ms: 42,
            }],
        }
    }

    #[test]
    fn value_roundtrip_preserves_numeric_variants() {
        assert_eq!(
            roundtrip(DataPoint::number_signed(-7)),
            DataPoint::number_signed(-7)
        );
        assert_eq!(
            roundtrip(DataPoint::number_unsigned(7)),
            DataPoint::number_unsigned(7)
        );
        assert_eq!(
            roundtrip(DataPoint::number_float(1.25)),
            DataPoint::number_float(1.25)
        );
        assert_eq!(
            roundtrip(DataPoint::number_double(-0.5)),
            DataPoint::number_double(-0.5)
        );
        // A signed 2 must never come back as an unsigned 2.
        assert_ne!(
            roundtrip(DataPoint::number_signed(2)),
            DataPoint::number_unsigned(2)
        );
    }

    #[test]
    fn value_roundtrip_containers() {
        let mut inner = DataPoint::array();
        inner.push_back(DataPoint::boolean(true)).unwrap();
        inner.push_back(DataPoint::string("x")).unwrap();
        let mut outer = DataPoint::object("Wrapper");
        outer.add_member("inner", inner).unwrap();
        outer
            .add_member("count", DataPoint::number_unsigned(3))
            .unwrap();
        assert_eq!(roundtrip(outer.clone()), outer);
    }

    #[test]
    fn message_roundtrip() {
        let message = sample_message();
        let decoded = decode_message(&encode_message(&message)).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn batch_roundtrip() {
        let batch = vec![sample_message(), Message::default()];
        let decoded = decode_batch(&encode_batch(&batch)).unwrap();
        assert_eq!(decoded, batch);
    }

    #[test]
    fn truncated_buffer_is_refused() {
        let bytes = encode_message(&sample_message());
        let err = decode_message(&bytes[..bytes.len() - 3]).unwrap_err();
        assert_eq!(err, DecodeError::UnexpectedEof);
    }

    #[test]
    fn unknown_value_kind_is_refused() {
        let mut bytes = Vec::new();
        bytes.write_u8(0x7f).unwrap();
        let err = decode_value(&mut Cursor::new(bytes.as_slice())).unwrap_err();
        assert_eq!(err, DecodeError::UnknownTag(0x7f));
    }

    #[test]
    fn unknown_table_is_skipped() {
        let mut bytes = encode_message(&sample_message());
        // Append a table from a hypothetical newer writer.
        bytes.write_u8(9).unwrap();
        bytes.write_u32::<LittleEndian>(4).unwrap();
        bytes.extend_from_slice(&[1, 2, 3, 4]);
        let decoded = decode_message(&bytes).unwrap();
        assert_eq!(decoded, sample_message());
    }

    #[test]
    fn absent_tables_decode_empty() {
        let mut bytes = Vec::new();
        bytes.write_u8(WIRE_VERSION).unwrap();
        let decoded = decode_message(&bytes).unwrap();
        assert_eq!(decoded, Message::default());
    }

    #[test]
    fn unsupported_version_is_refused() {
        let mut bytes = encode_message(&sample_message());
        bytes[0] = 0x02;
        let err = decode_message(&bytes).unwrap_err();
        assert_eq!(err, DecodeError::UnsupportedVersion(0x02));
    }

    #[test]
    fn empty_member_name_is_refused() {
        let mut bytes = Vec::new();
        bytes.write_u8(KIND_OBJECT).unwrap();
        // empty tag
        bytes.write_u32::<LittleEndian>(0).unwrap();
        // one member with an empty name
        bytes.write_u32::<LittleEndian>(1).unwrap();
        bytes.write_u32::<LittleEndian>(0).unwrap();
        bytes.write_u8(KIND_BOOL).unwrap();
        bytes.write_u8(1).unwrap();
        let err = decode_value(&mut Cursor::new(bytes.as_slice())).unwrap_err();
        assert_eq!(err, DecodeError::MissingName);
    }

    #[test]
    fn metric_must_carry_signed_integer() {
        let mut message = sample_message();
        let bytes = {
            // Hand-encode a metrics table whose value is a string.
            let mut payload = Vec::new();
            payload.write_u32::<LittleEndian>(1).unwrap();
            payload.write_u32::<LittleEndian>(3).unwrap();
            payload.extend_from_slice(b"bad");
            encode_value(&mut payload, &DataPoint::string("oops"));

            message.metrics.clear();
            let mut bytes = encode_message(&message);
            bytes.write_u8(TABLE_METRICS).unwrap();
            bytes.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
            bytes.extend_from_slice(&payload);
            bytes
        };
        let err = decode_message(&bytes).unwrap_err();
        assert_eq!(err, DecodeError::MetricNotInteger { key: "bad".into() });
    }

    #[test]
    fn invalid_utf8_is_refused() {
        let mut bytes = Vec::new();
        bytes.write_u8(KIND_STRING).unwrap();
        bytes.write_u32::<LittleEndian>(2).unwrap();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        let err = decode_value(&mut Cursor::new(bytes.as_slice())).unwrap_err();
        assert_eq!(err, DecodeError::InvalidUtf8);
    }
}
