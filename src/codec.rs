//! The codec abstraction: one logical type, two encodings
//!
//! A [`Codec<T>`] bundles the three operations every serializable data
//! type needs (binary write, binary read, and JSON read) over a single
//! in-memory representation, optionally paired with a JSON write for
//! types that must be dumped back out. Codecs are plain values: they are
//! constructed once at setup time, are immutable and cheap to clone
//! (internally a handful of shared function objects), and may be used
//! concurrently from any number of threads.
//!
//! The two encodings serve different masters. The binary form is the
//! compact machine-to-machine representation, read and written through
//! [`ByteReader`]/[`ByteSink`]; it must round-trip exactly. The JSON
//! form is the hand-authored representation, so its reader is lenient
//! where that is safe (unknown object keys are ignored by compounds) and
//! loud where it is not (every shape violation names the offending
//! field).
//!
//! This module also provides the primitive codecs ([`int`], [`boolean`],
//! [`float`], [`double`], [`string`], and [`identifier`]) from which
//! richer types are composed via the adapter constructors defined in
//! [`adapter`](crate::adapter), [`enums`](crate::enums),
//! [`registry`](crate::registry), and [`schema`](crate::schema).

use std::sync::Arc;

use serde_json::Value;

use crate::error::{DecodeResult, EncodeError, EncodeResult};
use crate::ident::{DecodeContext, Identifier};
use crate::json;
use crate::parse::{ByteReader, ParseError, ParseResult};
use crate::sink::ByteSink;

/// Practical ceiling, in bytes, on the wire form of a string payload.
pub const MAX_STRING_LEN: usize = 32767;

pub(crate) type BinWriter<T> = Arc<dyn Fn(&mut ByteSink, &T) -> EncodeResult<()> + Send + Sync>;
pub(crate) type BinReader<T> =
    Arc<dyn for<'a> Fn(&mut ByteReader<'a>) -> DecodeResult<T> + Send + Sync>;
pub(crate) type JsonReader<T> =
    Arc<dyn Fn(&Value, &DecodeContext) -> DecodeResult<T> + Send + Sync>;
pub(crate) type JsonWriter<T> = Arc<dyn Fn(&T) -> EncodeResult<Value> + Send + Sync>;

/// A self-contained bundle of transcoding operations for one logical
/// type.
///
/// The contract every codec upholds: a binary read of a binary write
/// yields the original value and consumes exactly the bytes that were
/// written, and the JSON reader accepts at least everything the JSON
/// writer (when present) produces.
pub struct Codec<T> {
    write_bin: BinWriter<T>,
    read_bin: BinReader<T>,
    read_json: JsonReader<T>,
    write_json: Option<JsonWriter<T>>,
}

impl<T> Clone for Codec<T> {
    fn clone(&self) -> Self {
        Self {
            write_bin: Arc::clone(&self.write_bin),
            read_bin: Arc::clone(&self.read_bin),
            read_json: Arc::clone(&self.read_json),
            write_json: self.write_json.as_ref().map(Arc::clone),
        }
    }
}

impl<T> Codec<T> {
    /// Assembles a codec from its three required operations.
    pub fn new<WB, RB, RJ>(write_bin: WB, read_bin: RB, read_json: RJ) -> Self
    where
        WB: Fn(&mut ByteSink, &T) -> EncodeResult<()> + Send + Sync + 'static,
        RB: for<'a> Fn(&mut ByteReader<'a>) -> DecodeResult<T> + Send + Sync + 'static,
        RJ: Fn(&Value, &DecodeContext) -> DecodeResult<T> + Send + Sync + 'static,
    {
        Self {
            write_bin: Arc::new(write_bin),
            read_bin: Arc::new(read_bin),
            read_json: Arc::new(read_json),
            write_json: None,
        }
    }

    /// Attaches the optional JSON write operation.
    #[must_use]
    pub fn with_json_writer<WJ>(mut self, write_json: WJ) -> Self
    where
        WJ: Fn(&T) -> EncodeResult<Value> + Send + Sync + 'static,
    {
        self.write_json = Some(Arc::new(write_json));
        self
    }

    /// Appends the binary form of `value` to `sink`.
    pub fn write_to(&self, sink: &mut ByteSink, value: &T) -> EncodeResult<()> {
        (self.write_bin)(sink, value)
    }

    /// Consumes one value's worth of bytes from `reader`.
    pub fn read_from(&self, reader: &mut ByteReader<'_>) -> DecodeResult<T> {
        (self.read_bin)(reader)
    }

    /// Interprets a JSON value, binding wildcard identifiers against
    /// `ctx`.
    pub fn from_json(&self, value: &Value, ctx: &DecodeContext) -> DecodeResult<T> {
        (self.read_json)(value, ctx)
    }

    /// Returns `true` if this codec carries a JSON write operation.
    #[must_use]
    pub fn writes_json(&self) -> bool {
        self.write_json.is_some()
    }

    /// Produces the JSON form of `value`.
    ///
    /// # Panics
    ///
    /// Panics if this codec carries no JSON writer. Callers for whom
    /// JSON output is conditional must consult
    /// [`writes_json`](Self::writes_json) first; invoking `to_json`
    /// regardless is a programming error, not a recoverable condition.
    pub fn to_json(&self, value: &T) -> EncodeResult<Value> {
        match &self.write_json {
            Some(write) => write(value),
            None => panic!("Codec::to_json called on a codec with no JSON writer"),
        }
    }

    pub(crate) fn json_writer(&self) -> Option<&JsonWriter<T>> {
        self.write_json.as_ref()
    }

    /// Encodes `value` into a fresh byte buffer.
    pub fn encode(&self, value: &T) -> EncodeResult<Vec<u8>> {
        let mut sink = ByteSink::new();
        self.write_to(&mut sink, value)?;
        Ok(sink.into_vec())
    }

    /// Decodes one value from `input`.
    ///
    /// When the `check_complete_parse` feature is enabled, any bytes
    /// left unconsumed after the read are reported as a format error.
    pub fn decode(&self, input: &[u8]) -> DecodeResult<T> {
        let mut reader = ByteReader::new(input);
        let ret = self.read_from(&mut reader)?;
        finish_decode(&reader)?;
        Ok(ret)
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "check_complete_parse")] {
        fn finish_decode(reader: &ByteReader<'_>) -> ParseResult<()> {
            if reader.is_exhausted() {
                Ok(())
            } else {
                Err(ParseError::TrailingBytes {
                    residual: reader.remainder(),
                })
            }
        }
    } else {
        fn finish_decode(_reader: &ByteReader<'_>) -> ParseResult<()> {
            Ok(())
        }
    }
}

pub(crate) fn write_string_bytes(sink: &mut ByteSink, s: &str) -> EncodeResult<()> {
    let bytes = s.as_bytes();
    if bytes.len() > MAX_STRING_LEN {
        return Err(EncodeError::Oversize {
            limit: MAX_STRING_LEN,
            actual: bytes.len(),
        });
    }
    sink.put_u16(bytes.len() as u16);
    sink.push_all(bytes);
    Ok(())
}

pub(crate) fn read_string_bytes(reader: &mut ByteReader<'_>) -> ParseResult<String> {
    let len = reader.take_u16()? as usize;
    let bytes = reader.take_bytes(len)?;
    Ok(String::from_utf8(bytes)?)
}

pub(crate) fn write_ident(sink: &mut ByteSink, ident: &Identifier) -> EncodeResult<()> {
    write_string_bytes(sink, &ident.to_string())
}

pub(crate) fn read_ident(reader: &mut ByteReader<'_>) -> DecodeResult<Identifier> {
    let raw = read_string_bytes(reader)?;
    Identifier::parse(&raw).map_err(|err| ParseError::InvalidIdentifier(err).into())
}

/// Codec for signed 32-bit integers (four bytes big-endian on the wire).
#[must_use]
pub fn int() -> Codec<i32> {
    Codec::new(
        |sink: &mut ByteSink, value: &i32| {
            sink.put_i32(*value);
            Ok(())
        },
        |reader: &mut ByteReader<'_>| Ok(reader.take_i32()?),
        |value: &Value, _ctx: &DecodeContext| Ok(json::expect_i32(value)?),
    )
    .with_json_writer(|value: &i32| Ok(Value::from(*value)))
}

/// Codec for booleans (one byte on the wire, `0xff`/`0x00`).
#[must_use]
pub fn boolean() -> Codec<bool> {
    Codec::new(
        |sink: &mut ByteSink, value: &bool| {
            sink.put_bool(*value);
            Ok(())
        },
        |reader: &mut ByteReader<'_>| Ok(reader.take_bool()?),
        |value: &Value, _ctx: &DecodeContext| Ok(json::expect_bool(value)?),
    )
    .with_json_writer(|value: &bool| Ok(Value::from(*value)))
}

fn float_to_json(value: f64) -> EncodeResult<Value> {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .ok_or(EncodeError::NonFinite(value))
}

/// Codec for single-precision floats (four bytes big-endian on the
/// wire).
#[must_use]
pub fn float() -> Codec<f32> {
    Codec::new(
        |sink: &mut ByteSink, value: &f32| {
            sink.put_f32(*value);
            Ok(())
        },
        |reader: &mut ByteReader<'_>| Ok(reader.take_f32()?),
        |value: &Value, _ctx: &DecodeContext| Ok(json::expect_f32(value)?),
    )
    .with_json_writer(|value: &f32| float_to_json(f64::from(*value)))
}

/// Codec for double-precision floats (eight bytes big-endian on the
/// wire).
#[must_use]
pub fn double() -> Codec<f64> {
    Codec::new(
        |sink: &mut ByteSink, value: &f64| {
            sink.put_f64(*value);
            Ok(())
        },
        |reader: &mut ByteReader<'_>| Ok(reader.take_f64()?),
        |value: &Value, _ctx: &DecodeContext| Ok(json::expect_f64(value)?),
    )
    .with_json_writer(|value: &f64| float_to_json(*value))
}

/// Codec for UTF-8 strings.
///
/// The wire form is a two-byte big-endian length prefix followed by the
/// UTF-8 bytes; payloads above [`MAX_STRING_LEN`] bytes are rejected at
/// encode time.
#[must_use]
pub fn string() -> Codec<String> {
    Codec::new(
        |sink: &mut ByteSink, value: &String| write_string_bytes(sink, value),
        |reader: &mut ByteReader<'_>| Ok(read_string_bytes(reader)?),
        |value: &Value, _ctx: &DecodeContext| Ok(json::expect_str(value)?.to_owned()),
    )
    .with_json_writer(|value: &String| Ok(Value::String(value.clone())))
}

/// Codec for namespaced identifiers.
///
/// The wire form is the canonical `namespace:path` string. The JSON
/// reader is the one place in the crate that performs wildcard
/// substitution: a `*` in the namespace or path segment is bound against
/// the [`DecodeContext`] in effect, and fails if the corresponding
/// context value is unset.
#[must_use]
pub fn identifier() -> Codec<Identifier> {
    Codec::new(
        |sink: &mut ByteSink, value: &Identifier| write_ident(sink, value),
        read_ident,
        |value: &Value, ctx: &DecodeContext| {
            let raw = json::expect_str(value)?;
            Ok(Identifier::resolve(raw, ctx)
                .map_err(crate::error::SchemaError::from)?)
        },
    )
    .with_json_writer(|value: &Identifier| Ok(Value::String(value.to_string())))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{DecodeError, SchemaErrorKind};
    use serde_json::json;

    pub(crate) fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    pub(crate) fn encode_decode<T, const N: usize>(codec: &Codec<T>, table: [(T, &'static str); N])
    where
        T: PartialEq + std::fmt::Debug,
    {
        for (value, enc) in table.iter() {
            assert_eq!(*enc, hex(&codec.encode(value).unwrap()));
            assert_eq!(codec.decode(&codec.encode(value).unwrap()).unwrap(), *value);
        }
    }

    #[test]
    fn int_encode_decode() {
        encode_decode(
            &int(),
            [
                (0, "00000000"),
                (42, "0000002a"),
                (-1, "ffffffff"),
                (i32::MIN, "80000000"),
            ],
        );
    }

    #[test]
    fn boolean_encode_decode() {
        encode_decode(&boolean(), [(true, "ff"), (false, "00")]);
    }

    #[test]
    fn double_encode_decode() {
        encode_decode(
            &double(),
            [
                (0.0, "0000000000000000"),
                (1.0, "3ff0000000000000"),
                (std::f64::consts::PI, "400921fb54442d18"),
            ],
        );
    }

    #[test]
    fn string_encode_decode() {
        encode_decode(
            &string(),
            [
                (String::new(), "0000"),
                ("hi".to_owned(), "00026869"),
            ],
        );
    }

    #[test]
    fn string_rejects_oversize_payload() {
        let long = "x".repeat(MAX_STRING_LEN + 1);
        assert_eq!(
            string().encode(&long),
            Err(EncodeError::Oversize {
                limit: MAX_STRING_LEN,
                actual: MAX_STRING_LEN + 1
            })
        );
    }

    #[test]
    fn primitive_json_reads() {
        let ctx = DecodeContext::new();
        assert_eq!(int().from_json(&json!(7), &ctx).unwrap(), 7);
        assert!(boolean().from_json(&json!(true), &ctx).unwrap());
        assert_eq!(double().from_json(&json!(2.5), &ctx).unwrap(), 2.5);
        assert_eq!(
            string().from_json(&json!("swift"), &ctx).unwrap(),
            "swift"
        );
    }

    #[test]
    fn json_read_rejects_wrong_shape() {
        let ctx = DecodeContext::new();
        let err = int().from_json(&json!("7"), &ctx).unwrap_err();
        match err {
            DecodeError::Schema(err) => assert!(matches!(
                err.kind(),
                SchemaErrorKind::WrongType {
                    expected: "number",
                    ..
                }
            )),
            other => panic!("unexpected error class: {:?}", other),
        }
    }

    #[test]
    fn identifier_round_trips_through_wire_form() {
        let codec = identifier();
        let id = Identifier::new("mods", "items/apple");
        let bytes = codec.encode(&id).unwrap();
        assert_eq!(hex(&bytes), format!("{:04x}{}", 16, hex(b"mods:items/apple")));
        assert_eq!(codec.decode(&bytes).unwrap(), id);
    }

    #[test]
    fn identifier_json_read_binds_wildcards() {
        let codec = identifier();
        let ctx = DecodeContext::new().with_namespace("ns");
        assert_eq!(
            codec.from_json(&json!("*:foo"), &ctx).unwrap(),
            Identifier::new("ns", "foo")
        );
        let bare = DecodeContext::new();
        assert!(codec.from_json(&json!("*:foo"), &bare).is_err());
        assert!(codec.from_json(&json!("a:b:c"), &ctx).is_err());
    }

    #[test]
    fn decode_surfaces_truncation() {
        let err = int().decode(&[0x00, 0x01]).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Format(ParseError::Overrun { .. })
        ));
    }
}
