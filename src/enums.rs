//! Closed sets of named alternatives and their codecs
//!
//! Host enumerations participate in schemas through the [`Variants`]
//! trait, which exposes a type's full variant list and per-variant
//! names. The [`variants!`] macro generates both the enum and the trait
//! impl from one declaration, keeping the name table and the variant
//! list in sync by construction.
//!
//! Two codecs are built on top: [`Codec::enum_by_name`], which carries a
//! single variant (name in JSON, one-byte ordinal tag on the wire), and
//! [`Codec::enum_set`], which carries a [`VariantSet`] (array of names
//! in JSON, packed bits on the wire).

use std::marker::PhantomData;

use serde_json::Value;

use crate::codec::Codec;
use crate::error::{SchemaError, SchemaErrorKind};
use crate::ident::DecodeContext;
use crate::json;
use crate::parse::{ByteReader, ParseError};
use crate::sink::ByteSink;

/// A closed set of named alternatives.
///
/// Implementors list every variant, in a fixed order that defines each
/// variant's ordinal, and give each a unique name. Names are matched
/// case-sensitively.
pub trait Variants: Copy + Eq + 'static {
    /// Every variant of the type, in ordinal order.
    const ALL: &'static [Self];

    /// The name of this variant.
    fn name(&self) -> &'static str;

    /// The position of this variant in [`ALL`](Self::ALL).
    fn ordinal(&self) -> usize {
        Self::ALL
            .iter()
            .position(|v| v == self)
            .expect("Variants::ALL does not list every variant")
    }

    /// Looks a variant up by exact name.
    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().find(|v| v.name() == name).copied()
    }

    /// Looks a variant up by ordinal.
    fn from_ordinal(ordinal: usize) -> Option<Self> {
        Self::ALL.get(ordinal).copied()
    }
}

/// Declares an enum together with its [`Variants`] implementation.
///
/// ```
/// use datum::variants;
///
/// variants! {
///     pub enum Direction {
///         North => "NORTH",
///         South => "SOUTH",
///     }
/// }
/// ```
#[macro_export]
macro_rules! variants {
    ( $(#[$meta:meta])* $vis:vis enum $name:ident {
        $( $vname:ident => $vlit:literal ),+ $(,)?
    } ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        $vis enum $name {
            $( $vname ),+
        }

        impl $crate::enums::Variants for $name {
            const ALL: &'static [Self] = &[ $( $name::$vname ),+ ];

            fn name(&self) -> &'static str {
                match self {
                    $( $name::$vname => $vlit ),+
                }
            }
        }
    };
}

/// A set of variants of `E`, stored as a bitmask keyed by ordinal.
///
/// Insertion order is not observable: iteration always yields members
/// in ordinal order, and inserting a member twice is a no-op. The
/// representation caps the variant count at 64, which
/// [`Codec::enum_set`] asserts at construction.
pub struct VariantSet<E: Variants> {
    bits: u64,
    _marker: PhantomData<E>,
}

impl<E: Variants> VariantSet<E> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bits: 0,
            _marker: PhantomData,
        }
    }

    /// Adds a member, returning `true` if it was not already present.
    pub fn insert(&mut self, member: E) -> bool {
        let mask = 1u64 << member.ordinal();
        let fresh = self.bits & mask == 0;
        self.bits |= mask;
        fresh
    }

    /// Removes a member, returning `true` if it was present.
    pub fn remove(&mut self, member: E) -> bool {
        let mask = 1u64 << member.ordinal();
        let present = self.bits & mask != 0;
        self.bits &= !mask;
        present
    }

    /// Returns `true` if `member` is in the set.
    #[must_use]
    pub fn contains(&self, member: E) -> bool {
        self.bits & (1u64 << member.ordinal()) != 0
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Returns `true` if the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Iterates the members in ordinal order.
    pub fn iter(&self) -> impl Iterator<Item = E> + '_ {
        E::ALL.iter().copied().filter(|v| self.contains(*v))
    }

    pub(crate) fn bits(&self) -> u64 {
        self.bits
    }

    pub(crate) fn from_bits(bits: u64) -> Self {
        Self {
            bits,
            _marker: PhantomData,
        }
    }
}

impl<E: Variants> Default for VariantSet<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Variants> Clone for VariantSet<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: Variants> Copy for VariantSet<E> {}

impl<E: Variants> PartialEq for VariantSet<E> {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<E: Variants> Eq for VariantSet<E> {}

impl<E: Variants> std::fmt::Debug for VariantSet<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter().map(|v| v.name())).finish()
    }
}

impl<E: Variants> FromIterator<E> for VariantSet<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<E: Variants> Extend<E> for VariantSet<E> {
    fn extend<I: IntoIterator<Item = E>>(&mut self, iter: I) {
        for member in iter {
            self.insert(member);
        }
    }
}

#[cfg(feature = "serde_impls")]
impl<E: Variants> serde::Serialize for VariantSet<E> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.iter().map(|v| v.name()))
    }
}

impl<E> Codec<E>
where
    E: Variants + Send + Sync,
{
    /// Codec carrying one variant of `E` by name.
    ///
    /// The JSON form is the exact, case-sensitive variant name; an
    /// unrecognized name is a schema error. The wire form is the
    /// variant's ordinal as a one-byte tag; an out-of-range tag is a
    /// format error.
    ///
    /// # Panics
    ///
    /// Panics at construction if `E` has more than 256 variants.
    #[must_use]
    pub fn enum_by_name() -> Codec<E> {
        assert!(
            E::ALL.len() <= 256,
            "enum_by_name requires a variant count within one-byte tag range"
        );
        Codec::new(
            |sink: &mut ByteSink, value: &E| {
                sink.push_one(value.ordinal() as u8);
                Ok(())
            },
            |reader: &mut ByteReader<'_>| {
                let tag = reader.take_u8()?;
                E::from_ordinal(tag as usize).ok_or_else(|| {
                    ParseError::InvalidDiscriminant {
                        tag,
                        limit: E::ALL.len(),
                    }
                    .into()
                })
            },
            |value: &Value, _ctx: &DecodeContext| {
                let name = json::expect_str(value)?;
                E::from_name(name).ok_or_else(|| {
                    SchemaError::new(SchemaErrorKind::UnknownVariant {
                        name: name.to_owned(),
                    })
                    .into()
                })
            },
        )
        .with_json_writer(|value: &E| Ok(Value::String(value.name().to_owned())))
    }
}

impl<E> Codec<VariantSet<E>>
where
    E: Variants + Send + Sync,
{
    /// Codec carrying a set of variants of `E`.
    ///
    /// The JSON form is an array whose elements are read through
    /// `member`; duplicates collapse and order is irrelevant. The wire
    /// form packs one bit per possible variant, LSB-first within each
    /// byte, `ceil(N / 8)` bytes in total.
    ///
    /// # Panics
    ///
    /// Panics at construction if `E` has more than 64 variants.
    #[must_use]
    pub fn enum_set(member: &Codec<E>) -> Codec<VariantSet<E>> {
        assert!(
            E::ALL.len() <= 64,
            "enum_set requires a variant count within bitmask range"
        );
        let nbytes = (E::ALL.len() + 7) / 8;
        let read_member = member.clone();
        let write_member = member.json_writer().cloned();
        let codec = Codec::new(
            move |sink: &mut ByteSink, value: &VariantSet<E>| {
                let bits = value.bits();
                for ix in 0..nbytes {
                    sink.push_one((bits >> (8 * ix)) as u8);
                }
                Ok(())
            },
            move |reader: &mut ByteReader<'_>| {
                let mut bits = 0u64;
                for ix in 0..nbytes {
                    bits |= u64::from(reader.take_u8()?) << (8 * ix);
                }
                if E::ALL.len() < 64 && bits >> E::ALL.len() != 0 {
                    let stray = bits >> E::ALL.len();
                    let ordinal = E::ALL.len() + stray.trailing_zeros() as usize;
                    return Err(ParseError::InvalidDiscriminant {
                        tag: ordinal as u8,
                        limit: E::ALL.len(),
                    }
                    .into());
                }
                Ok(VariantSet::from_bits(bits))
            },
            move |value: &Value, ctx: &DecodeContext| {
                let elems = json::expect_array(value)?;
                let mut set = VariantSet::new();
                for (ix, elem) in elems.iter().enumerate() {
                    set.insert(
                        read_member
                            .from_json(elem, ctx)
                            .map_err(|err| err.at_index(ix))?,
                    );
                }
                Ok(set)
            },
        );
        match write_member {
            Some(write) => codec.with_json_writer(move |value: &VariantSet<E>| {
                let members = value
                    .iter()
                    .map(|member| write(&member))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(members))
            }),
            None => codec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tests::hex;
    use crate::error::DecodeError;
    use serde_json::json;

    variants! {
        pub enum Direction {
            North => "NORTH",
            South => "SOUTH",
            East => "EAST",
            West => "WEST",
        }
    }

    #[test]
    fn ordinals_follow_declaration_order() {
        assert_eq!(Direction::North.ordinal(), 0);
        assert_eq!(Direction::West.ordinal(), 3);
        assert_eq!(Direction::from_name("EAST"), Some(Direction::East));
        assert_eq!(Direction::from_name("east"), None);
    }

    #[test]
    fn enum_codec_round_trips() {
        let codec = Codec::<Direction>::enum_by_name();
        let bytes = codec.encode(&Direction::South).unwrap();
        assert_eq!(hex(&bytes), "01");
        assert_eq!(codec.decode(&bytes).unwrap(), Direction::South);
        let ctx = DecodeContext::new();
        assert_eq!(
            codec.from_json(&json!("WEST"), &ctx).unwrap(),
            Direction::West
        );
        assert_eq!(codec.to_json(&Direction::West).unwrap(), json!("WEST"));
    }

    #[test]
    fn enum_codec_rejects_unknown_name_and_tag() {
        let codec = Codec::<Direction>::enum_by_name();
        let ctx = DecodeContext::new();
        assert!(matches!(
            codec.from_json(&json!("NORTHWEST"), &ctx),
            Err(DecodeError::Schema(_))
        ));
        assert!(matches!(
            codec.decode(&[0x04]),
            Err(DecodeError::Format(ParseError::InvalidDiscriminant {
                tag: 4,
                limit: 4
            }))
        ));
    }

    #[test]
    fn set_collapses_duplicates() {
        let codec = Codec::<VariantSet<Direction>>::enum_set(&Codec::enum_by_name());
        let ctx = DecodeContext::new();
        let once = codec.from_json(&json!(["NORTH"]), &ctx).unwrap();
        let twice = codec.from_json(&json!(["NORTH", "NORTH"]), &ctx).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.len(), 1);
    }

    #[test]
    fn set_wire_form_packs_bits() {
        let codec = Codec::<VariantSet<Direction>>::enum_set(&Codec::enum_by_name());
        let set: VariantSet<Direction> =
            [Direction::North, Direction::West].into_iter().collect();
        let bytes = codec.encode(&set).unwrap();
        assert_eq!(hex(&bytes), "09");
        assert_eq!(codec.decode(&bytes).unwrap(), set);
    }

    #[test]
    fn set_round_trip_is_order_independent() {
        let codec = Codec::<VariantSet<Direction>>::enum_set(&Codec::enum_by_name());
        let ctx = DecodeContext::new();
        let fwd = codec.from_json(&json!(["EAST", "SOUTH"]), &ctx).unwrap();
        let rev = codec.from_json(&json!(["SOUTH", "EAST"]), &ctx).unwrap();
        assert_eq!(fwd, rev);
        assert_eq!(
            codec.decode(&codec.encode(&fwd).unwrap()).unwrap(),
            rev
        );
    }

    #[test]
    fn set_wire_form_rejects_stray_bits() {
        let codec = Codec::<VariantSet<Direction>>::enum_set(&Codec::enum_by_name());
        assert!(matches!(
            codec.decode(&[0xf0]),
            Err(DecodeError::Format(ParseError::InvalidDiscriminant { .. }))
        ));
    }
}
