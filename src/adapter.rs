//! Higher-order codec constructors
//!
//! These adapters build a new [`Codec`] out of existing ones:
//! [`Codec::list`] lifts an element codec over ordered sequences,
//! [`Codec::wrap`] carries a type that is a thin transform over an
//! already-codable base, and [`Codec::mapped`] names a fixed set of
//! values through a bijective string map. The enum and reference
//! adapters live with their value types, in [`enums`](crate::enums) and
//! [`registry`](crate::registry).

use std::sync::Arc;

use serde_json::Value;

use crate::codec::{read_string_bytes, write_string_bytes, Codec};
use crate::error::{DecodeResult, EncodeError, EncodeResult, SchemaError, SchemaErrorKind};
use crate::ident::DecodeContext;
use crate::json;
use crate::parse::{ByteReader, ParseError};
use crate::sink::ByteSink;

impl<T> Codec<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Codec carrying an ordered sequence of `elem` values.
    ///
    /// The wire form is an `i32` element count followed by the elements
    /// back-to-back; the JSON form is an array, each element decoded
    /// independently. Order is semantically significant and is preserved
    /// through both forms; an empty sequence is a valid value, not an
    /// error.
    #[must_use]
    pub fn list(elem: &Codec<T>) -> Codec<Vec<T>> {
        let wb = elem.clone();
        let rb = elem.clone();
        let rj = elem.clone();
        let write_json = elem.json_writer().cloned();
        let codec = Codec::new(
            move |sink: &mut ByteSink, values: &Vec<T>| {
                let count = i32::try_from(values.len()).map_err(|_| EncodeError::Oversize {
                    limit: i32::MAX as usize,
                    actual: values.len(),
                })?;
                sink.put_i32(count);
                for value in values {
                    wb.write_to(sink, value)?;
                }
                Ok(())
            },
            move |reader: &mut ByteReader<'_>| {
                let count = reader.take_i32()?;
                if count < 0 {
                    return Err(ParseError::NegativeLength(count).into());
                }
                let mut values = Vec::with_capacity(count.min(1024) as usize);
                for _ in 0..count {
                    values.push(rb.read_from(reader)?);
                }
                Ok(values)
            },
            move |value: &Value, ctx: &DecodeContext| {
                let elems = json::expect_array(value)?;
                elems
                    .iter()
                    .enumerate()
                    .map(|(ix, elem)| rj.from_json(elem, ctx).map_err(|err| err.at_index(ix)))
                    .collect()
            },
        );
        match write_json {
            Some(write) => codec.with_json_writer(move |values: &Vec<T>| {
                let elems = values.iter().map(|v| write(v)).collect::<Result<_, _>>()?;
                Ok(Value::Array(elems))
            }),
            None => codec,
        }
    }

    /// Codec carrying a `T` that is representable as a transform over an
    /// existing `base` codec.
    ///
    /// `to_base` projects a value onto the base representation for
    /// encoding; `from_base` reconstructs it after decoding and may
    /// fail, for types whose base form needs further interpretation
    /// (a parse on top of a string, say).
    #[must_use]
    pub fn wrap<B, W, F>(base: &Codec<B>, to_base: W, from_base: F) -> Codec<T>
    where
        B: 'static,
        W: Fn(&T) -> B + Send + Sync + 'static,
        F: Fn(B) -> DecodeResult<T> + Send + Sync + 'static,
    {
        let to_base = Arc::new(to_base);
        let from_base = Arc::new(from_base);
        let wb = base.clone();
        let rb = base.clone();
        let rj = base.clone();
        let write_json = base.json_writer().cloned();
        let codec = Codec::new(
            {
                let to_base = Arc::clone(&to_base);
                move |sink: &mut ByteSink, value: &T| wb.write_to(sink, &to_base(value))
            },
            {
                let from_base = Arc::clone(&from_base);
                move |reader: &mut ByteReader<'_>| from_base(rb.read_from(reader)?)
            },
            {
                let from_base = Arc::clone(&from_base);
                move |value: &Value, ctx: &DecodeContext| from_base(rj.from_json(value, ctx)?)
            },
        );
        match write_json {
            Some(write) => {
                codec.with_json_writer(move |value: &T| write(&to_base(value)))
            }
            None => codec,
        }
    }
}

impl<T> Codec<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Codec naming each value of a fixed set through a bijective string
    /// map.
    ///
    /// The JSON form is the string key, looked up forward on decode and
    /// in reverse on encode; a decode-side miss is a schema error and an
    /// encode-side miss an encode error. The wire form transmits the
    /// same key through the string encoding.
    #[must_use]
    pub fn mapped<I>(entries: I) -> Codec<T>
    where
        I: IntoIterator<Item = (String, T)>,
    {
        let entries: Arc<Vec<(String, T)>> = Arc::new(entries.into_iter().collect());

        fn forward<T: Clone>(
            entries: &[(String, T)],
            name: &str,
        ) -> Result<T, SchemaError> {
            entries
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
                .ok_or_else(|| {
                    SchemaError::new(SchemaErrorKind::UnknownVariant {
                        name: name.to_owned(),
                    })
                })
        }

        fn reverse<'a, T: PartialEq>(
            entries: &'a [(String, T)],
            value: &T,
        ) -> EncodeResult<&'a str> {
            entries
                .iter()
                .find(|(_, entry)| entry == value)
                .map(|(key, _)| key.as_str())
                .ok_or(EncodeError::Unmapped)
        }

        let wb = Arc::clone(&entries);
        let rb = Arc::clone(&entries);
        let rj = Arc::clone(&entries);
        let wj = Arc::clone(&entries);
        Codec::new(
            move |sink: &mut ByteSink, value: &T| {
                write_string_bytes(sink, reverse(&wb, value)?)
            },
            move |reader: &mut ByteReader<'_>| {
                let name = read_string_bytes(reader)?;
                Ok(forward(&rb, &name)?)
            },
            move |value: &Value, _ctx: &DecodeContext| {
                Ok(forward(&rj, json::expect_str(value)?)?)
            },
        )
        .with_json_writer(move |value: &T| {
            Ok(Value::String(reverse(&wj, value)?.to_owned()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{identifier, int, string};
    use crate::error::DecodeError;
    use crate::ident::Identifier;
    use serde_json::json;

    #[test]
    fn empty_list_is_a_value() {
        let codec = Codec::list(&int());
        let ctx = DecodeContext::new();
        assert_eq!(codec.from_json(&json!([]), &ctx).unwrap(), Vec::<i32>::new());
        assert_eq!(codec.decode(&codec.encode(&Vec::<i32>::new()).unwrap()).unwrap(), Vec::<i32>::new());
    }

    #[test]
    fn list_preserves_element_order() {
        let codec = Codec::list(&string());
        let values = vec!["c".to_owned(), "a".to_owned(), "b".to_owned()];
        let once = codec.decode(&codec.encode(&values).unwrap()).unwrap();
        let twice = codec.decode(&codec.encode(&once).unwrap()).unwrap();
        assert_eq!(twice, values);
    }

    #[test]
    fn list_errors_carry_the_element_index() {
        let codec = Codec::list(&int());
        let ctx = DecodeContext::new();
        let err = codec.from_json(&json!([1, "two", 3]), &ctx).unwrap_err();
        match err {
            DecodeError::Schema(err) => {
                assert_eq!(err.to_string(), "at [1]: expected number, found string")
            }
            other => panic!("unexpected error class: {:?}", other),
        }
    }

    #[test]
    fn list_rejects_negative_count() {
        let codec = Codec::list(&int());
        assert!(matches!(
            codec.decode(&[0xff, 0xff, 0xff, 0xff]),
            Err(DecodeError::Format(ParseError::NegativeLength(-1)))
        ));
    }

    #[derive(Debug, Clone, PartialEq)]
    struct ZoneKey(Identifier);

    #[test]
    fn wrap_carries_a_newtype_over_its_base() {
        let codec = Codec::wrap(
            &identifier(),
            |key: &ZoneKey| key.0.clone(),
            |ident| Ok(ZoneKey(ident)),
        );
        let key = ZoneKey(Identifier::new("world", "overworld"));
        assert_eq!(codec.decode(&codec.encode(&key).unwrap()).unwrap(), key);
        let ctx = DecodeContext::new();
        assert_eq!(
            codec.from_json(&json!("world:overworld"), &ctx).unwrap(),
            key
        );
        assert_eq!(codec.to_json(&key).unwrap(), json!("world:overworld"));
    }

    #[test]
    fn mapped_looks_up_both_directions() {
        let codec = Codec::mapped([
            ("common".to_owned(), 0),
            ("rare".to_owned(), 1),
            ("epic".to_owned(), 2),
        ]);
        let ctx = DecodeContext::new();
        assert_eq!(codec.from_json(&json!("rare"), &ctx).unwrap(), 1);
        assert_eq!(codec.to_json(&2).unwrap(), json!("epic"));
        assert_eq!(codec.decode(&codec.encode(&0).unwrap()).unwrap(), 0);
    }

    #[test]
    fn mapped_misses_are_reported_per_direction() {
        let codec = Codec::mapped([("common".to_owned(), 0)]);
        let ctx = DecodeContext::new();
        assert!(matches!(
            codec.from_json(&json!("mythic"), &ctx),
            Err(DecodeError::Schema(_))
        ));
        assert_eq!(codec.encode(&9), Err(EncodeError::Unmapped));
    }
}
