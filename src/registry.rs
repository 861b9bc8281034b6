//! Symbolic references into external catalogs
//!
//! The host application keeps its live objects in named catalogs
//! (registries of items, effects, sounds), and authored data refers to
//! them symbolically, by [`Identifier`]. The [`Catalog`] trait is the
//! resolver boundary this crate consumes: forward and reverse lookup in
//! the catalog's item namespace, plus the same pair over its *named
//! subsets* (the host's tagged groups), which form a second, distinct
//! namespace.
//!
//! Three codecs are built against that boundary. [`Codec::registry`]
//! carries one catalog item by identifier; [`Codec::tag`] carries a
//! whole named subset; and [`Codec::ingredient_entry`] carries a
//! collection that is authored as *either* a single item *or* a named
//! subset, and re-derives the subset name when encoding. Resolution
//! misses are their own error class ([`ResolutionError`]) because they
//! depend on catalog state rather than on the input's shape: the same
//! document can resolve today and fail tomorrow.
//!
//! Every lookup is a synchronous, in-memory call against a catalog
//! snapshot. [`MemoryCatalog`] is a reference implementation sufficient
//! for tests and small hosts.

use std::sync::Arc;

use serde_json::Value;

use crate::codec::{read_ident, write_ident, Codec};
use crate::error::{
    EncodeError, RefKind, ResolutionError, SchemaError, SchemaErrorKind,
};
use crate::ident::{DecodeContext, Identifier};
use crate::json;
use crate::parse::ByteReader;
use crate::schema::{Instance, Schema};
use crate::sink::ByteSink;

/// A named subset of a catalog's items.
///
/// The handle carries the member list itself; its canonical name, when
/// one is needed, is recovered through
/// [`Catalog::identify_subset`]. Member order follows the catalog's
/// declaration order and is preserved by the codecs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subset<T> {
    members: Vec<T>,
}

impl<T> Subset<T> {
    /// Wraps a member list as a subset handle.
    #[must_use]
    pub fn new(members: Vec<T>) -> Self {
        Self { members }
    }

    /// Returns the members in declaration order.
    #[must_use]
    pub fn members(&self) -> &[T] {
        &self.members
    }

    /// Destructs the handle into its member list.
    #[must_use]
    pub fn into_members(self) -> Vec<T> {
        self.members
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if the subset has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl<T: PartialEq> Subset<T> {
    /// Returns `true` if `item` is a member.
    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.members.contains(item)
    }

    /// Returns `true` if this subset and `items` hold the same members,
    /// disregarding order and multiplicity.
    #[must_use]
    pub fn matches_members(&self, items: &[T]) -> bool {
        self.members.iter().all(|member| items.contains(member))
            && items.iter().all(|item| self.members.contains(item))
    }
}

/// Resolver boundary onto one of the host's catalogs.
///
/// A catalog owns two namespaces: items, and named subsets of items.
/// All operations are infallible lookups returning `None` on a miss;
/// the codecs translate misses into [`ResolutionError`] (decoding) or
/// [`EncodeError`] (encoding) carrying the catalog key and identifier.
pub trait Catalog: Send + Sync {
    /// The live object type this catalog registers.
    type Item: Clone + PartialEq + Send + Sync + 'static;

    /// The key naming this catalog in error reports.
    fn key(&self) -> &str;

    /// Resolves an identifier to a registered item.
    fn resolve(&self, ident: &Identifier) -> Option<Self::Item>;

    /// Returns the canonical identifier of a registered item.
    fn identify(&self, item: &Self::Item) -> Option<Identifier>;

    /// Resolves an identifier in the subset namespace.
    fn resolve_subset(&self, ident: &Identifier) -> Option<Subset<Self::Item>>;

    /// Returns the identifiers of every named subset `item` belongs to.
    fn subsets_containing(&self, item: &Self::Item) -> Vec<Identifier>;

    /// Returns the canonical name of a subset handle, if the catalog
    /// can produce one.
    fn identify_subset(&self, subset: &Subset<Self::Item>) -> Option<Identifier>;
}

/// In-memory [`Catalog`], the reference implementation.
///
/// Hosts with richer registries implement [`Catalog`] directly; this
/// one is plenty for tests, tooling, and small embedders.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog<T> {
    key: String,
    items: Vec<(Identifier, T)>,
    subsets: Vec<(Identifier, Vec<Identifier>)>,
}

impl<T> MemoryCatalog<T> {
    /// Creates an empty catalog under `key`.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            items: Vec::new(),
            subsets: Vec::new(),
        }
    }

    /// Registers `item` under `ident`, replacing any previous entry.
    pub fn insert(&mut self, ident: Identifier, item: T) -> &mut Self {
        self.items.retain(|(existing, _)| *existing != ident);
        self.items.push((ident, item));
        self
    }

    /// Declares a named subset by its member identifiers, replacing any
    /// previous declaration.
    pub fn insert_subset(&mut self, ident: Identifier, members: Vec<Identifier>) -> &mut Self {
        self.subsets.retain(|(existing, _)| *existing != ident);
        self.subsets.push((ident, members));
        self
    }
}

impl<T> Catalog for MemoryCatalog<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    type Item = T;

    fn key(&self) -> &str {
        &self.key
    }

    fn resolve(&self, ident: &Identifier) -> Option<T> {
        self.items
            .iter()
            .find(|(existing, _)| existing == ident)
            .map(|(_, item)| item.clone())
    }

    fn identify(&self, item: &T) -> Option<Identifier> {
        self.items
            .iter()
            .find(|(_, existing)| existing == item)
            .map(|(ident, _)| ident.clone())
    }

    fn resolve_subset(&self, ident: &Identifier) -> Option<Subset<T>> {
        let (_, member_ids) = self.subsets.iter().find(|(existing, _)| existing == ident)?;
        let members = member_ids
            .iter()
            .map(|member| self.resolve(member))
            .collect::<Option<Vec<T>>>()?;
        Some(Subset::new(members))
    }

    fn subsets_containing(&self, item: &T) -> Vec<Identifier> {
        match self.identify(item) {
            Some(ident) => self
                .subsets
                .iter()
                .filter(|(_, members)| members.contains(&ident))
                .map(|(subset_ident, _)| subset_ident.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    fn identify_subset(&self, subset: &Subset<T>) -> Option<Identifier> {
        self.subsets.iter().find_map(|(ident, _)| {
            let resolved = self.resolve_subset(ident)?;
            resolved
                .matches_members(subset.members())
                .then(|| ident.clone())
        })
    }
}

impl<T> Codec<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Codec carrying one item of `catalog` by symbolic reference.
    ///
    /// Both forms transmit the item's canonical identifier; the JSON
    /// reader additionally binds wildcard placeholders against the
    /// decode context before consulting the catalog. An identifier the
    /// catalog cannot resolve is a [`ResolutionError`]; a value the
    /// catalog cannot name is an [`EncodeError`].
    #[must_use]
    pub fn registry<C>(catalog: Arc<C>) -> Codec<T>
    where
        C: Catalog<Item = T> + 'static,
    {
        let wb = Arc::clone(&catalog);
        let rb = Arc::clone(&catalog);
        let rj = Arc::clone(&catalog);
        let wj = catalog;
        Codec::new(
            move |sink: &mut ByteSink, value: &T| {
                let ident = wb.identify(value).ok_or_else(|| EncodeError::Unidentified {
                    catalog: wb.key().to_owned(),
                    kind: RefKind::Item,
                })?;
                write_ident(sink, &ident)
            },
            move |reader: &mut ByteReader<'_>| {
                let ident = read_ident(reader)?;
                rb.resolve(&ident).ok_or_else(|| {
                    ResolutionError::new(rb.key(), ident, RefKind::Item).into()
                })
            },
            move |value: &Value, ctx: &DecodeContext| {
                let raw = json::expect_str(value)?;
                let ident = Identifier::resolve(raw, ctx).map_err(SchemaError::from)?;
                rj.resolve(&ident).ok_or_else(|| {
                    ResolutionError::new(rj.key(), ident, RefKind::Item).into()
                })
            },
        )
        .with_json_writer(move |value: &T| {
            let ident = wj.identify(value).ok_or_else(|| EncodeError::Unidentified {
                catalog: wj.key().to_owned(),
                kind: RefKind::Item,
            })?;
            Ok(Value::String(ident.to_string()))
        })
    }
}

impl<T> Codec<Subset<T>>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Codec carrying one named subset of `catalog` by symbolic
    /// reference.
    ///
    /// References resolve in the catalog's subset namespace, which is
    /// distinct from its item namespace. Encoding reverse-looks-up the
    /// subset's canonical name and fails if the catalog cannot produce
    /// one.
    #[must_use]
    pub fn tag<C>(catalog: Arc<C>) -> Codec<Subset<T>>
    where
        C: Catalog<Item = T> + 'static,
    {
        let wb = Arc::clone(&catalog);
        let rb = Arc::clone(&catalog);
        let rj = Arc::clone(&catalog);
        let wj = catalog;
        Codec::new(
            move |sink: &mut ByteSink, value: &Subset<T>| {
                let ident = wb.identify_subset(value).ok_or_else(|| {
                    EncodeError::Unidentified {
                        catalog: wb.key().to_owned(),
                        kind: RefKind::Subset,
                    }
                })?;
                write_ident(sink, &ident)
            },
            move |reader: &mut ByteReader<'_>| {
                let ident = read_ident(reader)?;
                rb.resolve_subset(&ident).ok_or_else(|| {
                    ResolutionError::new(rb.key(), ident, RefKind::Subset).into()
                })
            },
            move |value: &Value, ctx: &DecodeContext| {
                let raw = json::expect_str(value)?;
                let ident = Identifier::resolve(raw, ctx).map_err(SchemaError::from)?;
                rj.resolve_subset(&ident).ok_or_else(|| {
                    ResolutionError::new(rj.key(), ident, RefKind::Subset).into()
                })
            },
        )
        .with_json_writer(move |value: &Subset<T>| {
            let ident = wj.identify_subset(value).ok_or_else(|| {
                EncodeError::Unidentified {
                    catalog: wj.key().to_owned(),
                    kind: RefKind::Subset,
                }
            })?;
            Ok(Value::String(ident.to_string()))
        })
    }
}

impl<T> Codec<Vec<T>>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Codec carrying a collection authored as a single `item` or a
    /// named `tag` subset, but never both.
    ///
    /// Decoding requires exactly one of the two keys: a lone `item`
    /// yields a one-element collection, a `tag` yields the subset's
    /// members. Encoding re-derives the authored form: a one-element
    /// collection re-emits `item`; a larger collection searches for the
    /// named subset whose membership matches it exactly, by
    /// intersecting each member's subset memberships, and fails with an
    /// [`EncodeError`] rather than encode lossily when no unique exact
    /// match exists.
    #[must_use]
    pub fn ingredient_entry<C>(catalog: Arc<C>) -> Codec<Vec<T>>
    where
        C: Catalog<Item = T> + 'static,
    {
        let item_codec = Codec::registry(Arc::clone(&catalog));
        let tag_codec = Codec::tag(Arc::clone(&catalog));
        Schema::new()
            .optional("item", &item_codec)
            .optional("tag", &tag_codec)
            .build(
                |_schema: &Schema, data: &Instance| {
                    let item_present = data.is_present("item");
                    let tag_present = data.is_present("tag");
                    if item_present == tag_present {
                        return Err(SchemaError::new(SchemaErrorKind::ExclusiveFields {
                            left: "item",
                            right: "tag",
                            both: item_present,
                        })
                        .into());
                    }
                    if tag_present {
                        Ok(data.get::<Subset<T>>("tag").into_members())
                    } else {
                        Ok(vec![data.get::<T>("item")])
                    }
                },
                move |items: &Vec<T>| {
                    let mut data = Instance::new();
                    match items.as_slice() {
                        [] => Err(EncodeError::EmptyCollection),
                        [only] => {
                            data.set("item", only.clone());
                            Ok(data)
                        }
                        [first, rest @ ..] => {
                            let mut candidates = catalog.subsets_containing(first);
                            for item in rest {
                                let memberships = catalog.subsets_containing(item);
                                candidates.retain(|ident| memberships.contains(ident));
                            }
                            if candidates.len() != 1 {
                                return Err(EncodeError::NoUniqueSubset {
                                    catalog: catalog.key().to_owned(),
                                    survivors: candidates.len(),
                                });
                            }
                            let ident = candidates.remove(0);
                            let subset =
                                catalog.resolve_subset(&ident).ok_or_else(|| {
                                    EncodeError::NoUniqueSubset {
                                        catalog: catalog.key().to_owned(),
                                        survivors: 0,
                                    }
                                })?;
                            if !subset.matches_members(items) {
                                return Err(EncodeError::InexactSubset {
                                    catalog: catalog.key().to_owned(),
                                    ident,
                                });
                            }
                            data.set("tag", subset);
                            Ok(data)
                        }
                    }
                },
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use serde_json::json;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Item(&'static str);

    fn ident(path: &str) -> Identifier {
        Identifier::new("core", path)
    }

    fn pantry() -> Arc<MemoryCatalog<Item>> {
        let mut catalog = MemoryCatalog::new("items");
        catalog
            .insert(ident("apple"), Item("apple"))
            .insert(ident("carrot"), Item("carrot"))
            .insert(ident("potato"), Item("potato"));
        catalog
            .insert_subset(ident("fruit"), vec![ident("apple")])
            .insert_subset(ident("veg"), vec![ident("carrot"), ident("potato")]);
        Arc::new(catalog)
    }

    #[test]
    fn memory_catalog_resolves_both_namespaces() {
        let catalog = pantry();
        assert_eq!(catalog.resolve(&ident("apple")), Some(Item("apple")));
        assert_eq!(catalog.identify(&Item("carrot")), Some(ident("carrot")));
        let veg = catalog.resolve_subset(&ident("veg")).unwrap();
        assert_eq!(veg.members(), &[Item("carrot"), Item("potato")]);
        assert_eq!(catalog.identify_subset(&veg), Some(ident("veg")));
        assert_eq!(
            catalog.subsets_containing(&Item("potato")),
            vec![ident("veg")]
        );
    }

    #[test]
    fn registry_codec_round_trips() {
        let codec = Codec::registry(pantry());
        let bytes = codec.encode(&Item("apple")).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), Item("apple"));
        let ctx = DecodeContext::new();
        assert_eq!(
            codec.from_json(&json!("core:carrot"), &ctx).unwrap(),
            Item("carrot")
        );
        assert_eq!(codec.to_json(&Item("carrot")).unwrap(), json!("core:carrot"));
    }

    #[test]
    fn registry_codec_binds_wildcards_before_resolving() {
        let codec = Codec::registry(pantry());
        let ctx = DecodeContext::new().with_namespace("core");
        assert_eq!(
            codec.from_json(&json!("*:apple"), &ctx).unwrap(),
            Item("apple")
        );
    }

    #[test]
    fn registry_miss_reports_catalog_and_identifier() {
        let codec = Codec::registry(pantry());
        let ctx = DecodeContext::new();
        match codec.from_json(&json!("core:durian"), &ctx).unwrap_err() {
            DecodeError::Resolution(err) => {
                assert_eq!(err.catalog(), "items");
                assert_eq!(*err.ident(), ident("durian"));
                assert_eq!(err.kind(), RefKind::Item);
            }
            other => panic!("unexpected error class: {:?}", other),
        }
    }

    #[test]
    fn tag_codec_round_trips_in_the_subset_namespace() {
        let codec = Codec::tag(pantry());
        let ctx = DecodeContext::new();
        let veg: Subset<Item> = codec.from_json(&json!("core:veg"), &ctx).unwrap();
        assert_eq!(veg.members(), &[Item("carrot"), Item("potato")]);
        let bytes = codec.encode(&veg).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), veg);
        // "fruit" names a subset, not an item, so the item namespace
        // stays oblivious to it
        assert!(matches!(
            Codec::registry(pantry())
                .from_json(&json!("core:fruit"), &ctx)
                .unwrap_err(),
            DecodeError::Resolution(_)
        ));
    }

    #[test]
    fn ingredient_decodes_exactly_one_of_item_or_tag() {
        let codec = Codec::ingredient_entry(pantry());
        let ctx = DecodeContext::new();
        assert_eq!(
            codec.from_json(&json!({"item": "core:apple"}), &ctx).unwrap(),
            vec![Item("apple")]
        );
        assert_eq!(
            codec.from_json(&json!({"tag": "core:veg"}), &ctx).unwrap(),
            vec![Item("carrot"), Item("potato")]
        );
        assert!(matches!(
            codec.from_json(&json!({"item": "core:apple", "tag": "core:veg"}), &ctx),
            Err(DecodeError::Schema(_))
        ));
        assert!(matches!(
            codec.from_json(&json!({}), &ctx),
            Err(DecodeError::Schema(_))
        ));
    }

    #[test]
    fn ingredient_encodes_singletons_as_items() {
        let codec = Codec::ingredient_entry(pantry());
        assert_eq!(
            codec.to_json(&vec![Item("apple")]).unwrap(),
            json!({"item": "core:apple"})
        );
    }

    #[test]
    fn ingredient_encodes_collections_through_their_subset() {
        let codec = Codec::ingredient_entry(pantry());
        let collection = vec![Item("carrot"), Item("potato")];
        assert_eq!(
            codec.to_json(&collection).unwrap(),
            json!({"tag": "core:veg"})
        );
        let bytes = codec.encode(&collection).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), collection);
    }

    #[test]
    fn ingredient_encode_fails_without_a_unique_subset() {
        let codec = Codec::ingredient_entry(pantry());
        // apple and carrot share no subset
        assert_eq!(
            codec.encode(&vec![Item("apple"), Item("carrot")]),
            Err(EncodeError::NoUniqueSubset {
                catalog: "items".to_owned(),
                survivors: 0
            })
        );
        assert_eq!(
            codec.encode(&Vec::new()),
            Err(EncodeError::EmptyCollection)
        );
    }

    #[test]
    fn ingredient_encode_fails_on_ambiguous_subsets() {
        let mut catalog = MemoryCatalog::new("items");
        catalog
            .insert(ident("carrot"), Item("carrot"))
            .insert(ident("potato"), Item("potato"));
        catalog
            .insert_subset(ident("veg"), vec![ident("carrot"), ident("potato")])
            .insert_subset(ident("greens"), vec![ident("carrot"), ident("potato")]);
        let codec = Codec::ingredient_entry(Arc::new(catalog));
        assert_eq!(
            codec.encode(&vec![Item("carrot"), Item("potato")]),
            Err(EncodeError::NoUniqueSubset {
                catalog: "items".to_owned(),
                survivors: 2
            })
        );
    }

    #[test]
    fn ingredient_encode_fails_on_inexact_survivor() {
        let mut catalog = MemoryCatalog::new("items");
        catalog
            .insert(ident("apple"), Item("apple"))
            .insert(ident("carrot"), Item("carrot"))
            .insert(ident("potato"), Item("potato"));
        catalog.insert_subset(
            ident("all"),
            vec![ident("apple"), ident("carrot"), ident("potato")],
        );
        let codec = Codec::ingredient_entry(Arc::new(catalog));
        // the only shared subset also holds potato, so it is not an
        // exact match for the collection
        assert_eq!(
            codec.encode(&vec![Item("apple"), Item("carrot")]),
            Err(EncodeError::InexactSubset {
                catalog: "items".to_owned(),
                ident: ident("all")
            })
        );
    }
}
