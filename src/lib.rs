//! Schema-driven codecs for typed data across binary and JSON transports
//!
//! # Overview
//!
//! This library lets a host application describe each of its data types
//! once and obtain, for free, a binary wire encoding and decoding, a
//! JSON decoding (and, where meaningful, a JSON dump), and a builder for
//! compound record types whose fields may be optional or carry
//! defaults. It exists so that an application defining dozens of value
//! types (items, effects, attribute modifiers, recipes, tagged groups
//! of game objects) does not write bespoke (de)serialization code for
//! each one.
//!
//! The atomic unit is the [`Codec<T>`]: a self-contained bundle of a
//! binary writer, a binary reader, and a JSON reader over one in-memory
//! representation, optionally paired with a JSON writer. Codecs are
//! immutable values, constructed once at setup time and shared freely
//! across threads thereafter; every decode or encode call is a pure
//! function of its inputs and the external catalog snapshot.
//!
//! Richer codecs are composed rather than hand-written. The
//! [`Schema`] builder collects named field descriptors, each a codec
//! plus a required/optional/defaulted presence policy, and compiles
//! into a codec for a record-like value, pairing with assembly and
//! disassembly functions to carry concrete host types. The adapter
//! constructors lift existing codecs over sequences ([`Codec::list`]),
//! named enumerations ([`Codec::enum_by_name`], [`Codec::enum_set`]),
//! bijective name maps ([`Codec::mapped`]), thin isomorphisms
//! ([`Codec::wrap`]), and symbolic references into the host's catalogs
//! ([`Codec::registry`], [`Codec::tag`], [`Codec::ingredient_entry`]).
//!
//! Identifier-bearing codecs participate in wildcard substitution: a
//! hand-authored `*` in an identifier's namespace or path is bound
//! against the [`DecodeContext`] the caller threads through the decode,
//! so a bundle of definitions can refer to itself without naming itself.
//! The context is an explicit parameter precisely so that concurrent
//! decodes cannot observe one another's bindings.
//!
//! Failures are split by provenance: [`ParseError`] for malformed wire
//! bytes, [`SchemaError`] for hand-authored JSON that violates a schema
//! rule (always carrying the offending field path), [`ResolutionError`]
//! for symbolic references the catalogs cannot satisfy, and
//! [`EncodeError`] for values with no faithful encoded form. The first
//! error encountered propagates; nothing is retried or partially
//! recovered, leaving per-record policy to the enclosing loader.

pub mod adapter;
pub mod codec;
pub mod enums;
pub mod error;
pub mod ident;
pub mod json;
pub mod parse;
pub mod prelude;
pub mod registry;
pub mod schema;
pub mod sink;
pub mod types;

pub use crate::codec::{Codec, MAX_STRING_LEN};
pub use crate::enums::{VariantSet, Variants};
pub use crate::error::{
    DecodeError, DecodeResult, EncodeError, EncodeResult, RefKind, ResolutionError, SchemaError,
    SchemaErrorKind,
};
pub use crate::ident::{DecodeContext, IdentError, Identifier, DEFAULT_NAMESPACE};
pub use crate::parse::{ByteReader, ParseError, ParseResult};
pub use crate::registry::{Catalog, MemoryCatalog, Subset};
pub use crate::schema::{Instance, Schema};
pub use crate::sink::ByteSink;

pub use ::lazy_static::lazy_static;
