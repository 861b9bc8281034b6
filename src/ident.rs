//! Namespaced textual identifiers and the per-call decode context
//!
//! An [`Identifier`] is the `namespace:path` name under which the host
//! application registers its objects. Identifiers appear both on the wire
//! (through their canonical string form) and in hand-authored JSON, where
//! they additionally support a `*` placeholder: an author writing a
//! bundle of definitions can refer to the bundle's own namespace or to
//! the definition currently being loaded without spelling either out.
//!
//! The placeholder is bound against a [`DecodeContext`], which the
//! enclosing loader constructs per top-level decode and threads through
//! every JSON read. Keeping the context an explicit parameter, rather
//! than process-wide state established around each call, makes
//! concurrent decoding safe without any locking discipline: two in-flight
//! decodes simply hold two contexts.
//!
//! Binary reads never consult the context; wire-borne identifiers are
//! always fully resolved.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[cfg(feature = "serde_impls")]
use serde::Serialize;

/// Namespace assumed when an identifier string carries no `:` separator.
pub const DEFAULT_NAMESPACE: &str = "core";

/// Error type representing all conditions of invalidity for an
/// identifier string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentError {
    /// More than one `:` separator was present.
    ExtraSeparator { raw: String, count: usize },
    /// The namespace segment held a `*` but no current namespace was
    /// bound in the decode context.
    UnboundNamespaceWildcard { raw: String },
    /// The path segment held a `*` but no current path was bound in the
    /// decode context.
    UnboundPathWildcard { raw: String },
    /// A segment held a character outside its permitted set.
    InvalidChar { raw: String, ch: char },
    /// The namespace or path segment was empty.
    EmptySegment { raw: String },
}

impl Display for IdentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentError::ExtraSeparator { raw, count } => {
                write!(f, "found {} `:` separators in identifier \"{}\"", count, raw)
            }
            IdentError::UnboundNamespaceWildcard { raw } => {
                write!(
                    f,
                    "identifier \"{}\" uses `*` in its namespace, but no current namespace is bound here",
                    raw
                )
            }
            IdentError::UnboundPathWildcard { raw } => {
                write!(
                    f,
                    "identifier \"{}\" uses `*` in its path, but no current path is bound here",
                    raw
                )
            }
            IdentError::InvalidChar { raw, ch } => {
                write!(f, "illegal character '{}' in identifier \"{}\"", ch, raw)
            }
            IdentError::EmptySegment { raw } => {
                write!(f, "empty segment in identifier \"{}\"", raw)
            }
        }
    }
}

impl Error for IdentError {}

/// A `namespace:path` name for a host-registered object.
///
/// Both segments are restricted to lowercase ASCII alphanumerics plus
/// `_`, `-` and `.`; the path additionally admits `/`. The canonical
/// textual form is `namespace:path`, which is also the identifier's
/// binary form (through the length-prefixed string encoding).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier {
    namespace: String,
    path: String,
}

fn valid_namespace_char(ch: char) -> bool {
    ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '-' | '.')
}

fn valid_path_char(ch: char) -> bool {
    valid_namespace_char(ch) || ch == '/'
}

fn check_segment(raw: &str, segment: &str, is_path: bool) -> Result<(), IdentError> {
    if segment.is_empty() {
        return Err(IdentError::EmptySegment { raw: raw.to_owned() });
    }
    let valid = if is_path { valid_path_char } else { valid_namespace_char };
    match segment.chars().find(|&ch| !valid(ch)) {
        Some(ch) => Err(IdentError::InvalidChar {
            raw: raw.to_owned(),
            ch,
        }),
        None => Ok(()),
    }
}

impl Identifier {
    /// Attempts to construct an identifier from explicit segments.
    pub fn try_new(
        namespace: impl Into<String>,
        path: impl Into<String>,
    ) -> Result<Self, IdentError> {
        let namespace = namespace.into();
        let path = path.into();
        let raw = format!("{}:{}", namespace, path);
        check_segment(&raw, &namespace, false)?;
        check_segment(&raw, &path, true)?;
        Ok(Self { namespace, path })
    }

    /// Constructs an identifier from explicit segments.
    ///
    /// # Panics
    ///
    /// Panics if either segment is empty or holds an illegal character.
    /// For a non-panicking variant, use [`try_new`](Self::try_new).
    #[must_use]
    pub fn new(namespace: impl Into<String>, path: impl Into<String>) -> Self {
        Self::try_new(namespace, path).unwrap_or_else(|err| {
            panic!("Identifier::new called on invalid segments: {}", err)
        })
    }

    /// Parses a fully-resolved identifier string.
    ///
    /// A string without a `:` is taken as a path under
    /// [`DEFAULT_NAMESPACE`]; a string with two or more separators is
    /// rejected. No wildcard substitution is performed; a literal `*`
    /// fails the character check. For the substituting entry point used
    /// on JSON reads, see [`resolve`](Self::resolve).
    pub fn parse(raw: &str) -> Result<Self, IdentError> {
        let count = raw.matches(':').count();
        if count > 1 {
            return Err(IdentError::ExtraSeparator {
                raw: raw.to_owned(),
                count,
            });
        }
        let (namespace, path) = match raw.split_once(':') {
            Some((ns, path)) => (ns.to_owned(), path.to_owned()),
            None => (DEFAULT_NAMESPACE.to_owned(), raw.to_owned()),
        };
        check_segment(raw, &namespace, false)?;
        check_segment(raw, &path, true)?;
        Ok(Self { namespace, path })
    }

    /// Parses an identifier string from hand-authored input, binding any
    /// `*` placeholder against `ctx`.
    ///
    /// A `*` in the namespace segment is replaced by the context's
    /// current namespace, and a `*` in the path segment by its current
    /// path; either substitution fails if the corresponding context
    /// value is unbound. Strings with two or more `:` separators are
    /// rejected outright.
    pub fn resolve(raw: &str, ctx: &DecodeContext) -> Result<Self, IdentError> {
        let count = raw.matches(':').count();
        if count > 1 {
            return Err(IdentError::ExtraSeparator {
                raw: raw.to_owned(),
                count,
            });
        }
        let (ns_raw, path_raw) = match raw.split_once(':') {
            Some((ns, path)) => (ns, path),
            None => (DEFAULT_NAMESPACE, raw),
        };
        let namespace = if ns_raw.contains('*') {
            match ctx.namespace() {
                Some(current) => ns_raw.replace('*', current),
                None => {
                    return Err(IdentError::UnboundNamespaceWildcard {
                        raw: raw.to_owned(),
                    })
                }
            }
        } else {
            ns_raw.to_owned()
        };
        let path = if path_raw.contains('*') {
            match ctx.path() {
                Some(current) => path_raw.replace('*', current),
                None => {
                    return Err(IdentError::UnboundPathWildcard {
                        raw: raw.to_owned(),
                    })
                }
            }
        } else {
            path_raw.to_owned()
        };
        check_segment(raw, &namespace, false)?;
        check_segment(raw, &path, true)?;
        Ok(Self { namespace, path })
    }

    /// Returns the namespace segment.
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the path segment.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl FromStr for Identifier {
    type Err = IdentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "serde_impls")]
impl Serialize for Identifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Per-call context for wildcard identifier substitution.
///
/// The enclosing load operation constructs one of these before each
/// top-level JSON decode, binding the namespace of the bundle being
/// loaded and, where applicable, the path of the definition currently
/// being read. The context is passed by reference through every JSON
/// decode; codecs other than the identifier-bearing ones ignore it.
#[derive(Debug, Clone, Default)]
pub struct DecodeContext {
    namespace: Option<String>,
    path: Option<String>,
}

impl DecodeContext {
    /// Creates a context with neither namespace nor path bound.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the current namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Binds the current path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Returns the bound namespace, if any.
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns the bound path, if any.
    #[inline]
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_on_single_separator() {
        let id = Identifier::parse("mod/a:items/apple").unwrap_err();
        assert!(matches!(id, IdentError::InvalidChar { ch: '/', .. }));
        let id = Identifier::parse("moda:items/apple").unwrap();
        assert_eq!(id.namespace(), "moda");
        assert_eq!(id.path(), "items/apple");
    }

    #[test]
    fn parse_defaults_namespace_without_separator() {
        let id = Identifier::parse("apple").unwrap();
        assert_eq!(id.namespace(), DEFAULT_NAMESPACE);
        assert_eq!(id.to_string(), "core:apple");
    }

    #[test]
    fn parse_rejects_second_separator() {
        assert_eq!(
            Identifier::parse("a:b:c"),
            Err(IdentError::ExtraSeparator {
                raw: "a:b:c".to_owned(),
                count: 2
            })
        );
    }

    #[test]
    fn resolve_substitutes_bound_namespace() {
        let ctx = DecodeContext::new().with_namespace("ns");
        let id = Identifier::resolve("*:foo", &ctx).unwrap();
        assert_eq!(id.to_string(), "ns:foo");
    }

    #[test]
    fn resolve_fails_on_unbound_namespace() {
        let ctx = DecodeContext::new();
        assert!(matches!(
            Identifier::resolve("*:foo", &ctx),
            Err(IdentError::UnboundNamespaceWildcard { .. })
        ));
    }

    #[test]
    fn resolve_substitutes_bound_path() {
        let ctx = DecodeContext::new().with_path("haste");
        let id = Identifier::resolve("buffs:*", &ctx).unwrap();
        assert_eq!(id.to_string(), "buffs:haste");
        let id = Identifier::resolve("*", &ctx).unwrap();
        assert_eq!(id.to_string(), "core:haste");
    }

    #[test]
    fn resolve_rejects_extra_separator_even_with_context() {
        let ctx = DecodeContext::new().with_namespace("ns").with_path("p");
        assert!(matches!(
            Identifier::resolve("a:b:c", &ctx),
            Err(IdentError::ExtraSeparator { count: 2, .. })
        ));
    }
}
