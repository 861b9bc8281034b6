//! Ready-made codec instances for the primitive data types
//!
//! Host code that declares schemas by hand mostly wants the same small
//! set of building blocks; this module keeps one shared instance of
//! each, constructed once on first use. Domain-specific codecs (the
//! host's items, effects, recipes) are composed out of these with the
//! adapter constructors and registered on the host's side.
//!
//! ```
//! use datum::{types, Schema};
//!
//! let schema = Schema::new()
//!     .required("name", &types::STRING)
//!     .with_default("fire", &types::BOOLEAN, false);
//! ```

use lazy_static::lazy_static;

use crate::codec::{self, Codec};
use crate::ident::Identifier;

lazy_static! {
    /// Shared [`codec::int`] instance.
    pub static ref INT: Codec<i32> = codec::int();

    /// Shared [`codec::boolean`] instance.
    pub static ref BOOLEAN: Codec<bool> = codec::boolean();

    /// Shared [`codec::float`] instance.
    pub static ref FLOAT: Codec<f32> = codec::float();

    /// Shared [`codec::double`] instance.
    pub static ref DOUBLE: Codec<f64> = codec::double();

    /// Shared [`codec::string`] instance.
    pub static ref STRING: Codec<String> = codec::string();

    /// Shared [`codec::identifier`] instance.
    pub static ref IDENTIFIER: Codec<Identifier> = codec::identifier();

    /// Shared list-of-identifiers instance.
    pub static ref IDENTIFIERS: Codec<Vec<Identifier>> = Codec::list(&IDENTIFIER);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::DecodeContext;
    use serde_json::json;

    #[test]
    fn facade_instances_are_usable_directly() {
        let ctx = DecodeContext::new();
        assert_eq!(INT.from_json(&json!(5), &ctx).unwrap(), 5);
        assert_eq!(
            IDENTIFIERS
                .from_json(&json!(["core:apple", "mods:pear"]), &ctx)
                .unwrap(),
            vec![
                Identifier::new("core", "apple"),
                Identifier::new("mods", "pear")
            ]
        );
    }
}
