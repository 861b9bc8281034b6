//! Convenience re-exports of the names nearly every consumer touches

pub use crate::codec::Codec;
pub use crate::enums::{VariantSet, Variants};
pub use crate::error::{
    DecodeError, DecodeResult, EncodeError, EncodeResult, ResolutionError, SchemaError,
};
pub use crate::ident::{DecodeContext, Identifier};
pub use crate::parse::{ByteReader, ParseError, ParseResult};
pub use crate::registry::{Catalog, MemoryCatalog, Subset};
pub use crate::schema::{Instance, Schema};
pub use crate::sink::ByteSink;
