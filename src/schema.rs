//! Compound schemas and their field instances
//!
//! A [`Schema`] is an ordered collection of named field descriptors,
//! each pairing a codec with a presence policy: required, optional, or
//! optional with a declared default. Compiling a schema yields a
//! [`Codec`] for a record-like value: either `Codec<Instance>` via
//! [`Schema::into_codec`], or `Codec<T>` for a concrete host type via
//! [`Schema::build`], which additionally takes an assembly function
//! (instance to value) and its inverse.
//!
//! Field order carries no meaning in JSON, where a compound is an object
//! keyed by field name, but fixes the write order of the binary form:
//! required fields are written back-to-back in declaration order, and
//! each optional field is preceded by a one-byte presence flag. The
//! binary form has no notion of a default, only present or absent, so
//! an instance decoded from bytes leaves defaulted-but-absent fields
//! empty, and assembly applies the declared default through
//! [`Instance::get_or_default`], matching what the JSON reader stored.
//!
//! An [`Instance`] is a free-standing name-to-value map scoped to a
//! single decode or encode pass. It carries no reference back to the
//! schema that shaped it; validation happens at consumption time, which
//! is why the assembly function receives the schema alongside the
//! instance. Values are stored type-erased, and the typed accessors
//! recover them through checked downcasts: asking for an absent field,
//! or for a present field at the wrong type, is a programming error and
//! panics rather than surfacing as a recoverable decode failure.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::codec::Codec;
use crate::error::{
    DecodeResult, EncodeError, EncodeResult, SchemaError, SchemaErrorKind,
};
use crate::ident::{DecodeContext, Identifier};
use crate::json;
use crate::parse::ByteReader;
use crate::sink::ByteSink;

/// Object-safe view of a decoded field value: any clonable, thread-safe
/// type.
trait AnyValue: Any + Send + Sync {
    fn clone_boxed(&self) -> Box<dyn AnyValue>;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Clone + Send + Sync> AnyValue for T {
    fn clone_boxed(&self) -> Box<dyn AnyValue> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

type ErasedBinWriter = Arc<dyn Fn(&mut ByteSink, &dyn AnyValue) -> EncodeResult<()> + Send + Sync>;
type ErasedBinReader =
    Arc<dyn for<'a> Fn(&mut ByteReader<'a>) -> DecodeResult<Box<dyn AnyValue>> + Send + Sync>;
type ErasedJsonReader =
    Arc<dyn Fn(&Value, &DecodeContext) -> DecodeResult<Box<dyn AnyValue>> + Send + Sync>;
type ErasedJsonWriter = Arc<dyn Fn(&dyn AnyValue) -> EncodeResult<Value> + Send + Sync>;

/// A `Codec<T>` with its value type erased behind [`AnyValue`], so that
/// descriptors of differently-typed fields can share one schema.
struct ErasedCodec {
    write_bin: ErasedBinWriter,
    read_bin: ErasedBinReader,
    read_json: ErasedJsonReader,
    write_json: Option<ErasedJsonWriter>,
}

fn downcast<T: Any>(value: &dyn AnyValue) -> &T {
    value.as_any().downcast_ref::<T>().unwrap_or_else(|| {
        panic!(
            "field value does not hold the codec's type {}",
            std::any::type_name::<T>()
        )
    })
}

impl ErasedCodec {
    fn erase<T: Clone + Send + Sync + 'static>(codec: &Codec<T>) -> Self {
        let wb = codec.clone();
        let rb = codec.clone();
        let rj = codec.clone();
        let write_json = codec.json_writer().cloned().map(|write| {
            Arc::new(move |value: &dyn AnyValue| write(downcast::<T>(value))) as ErasedJsonWriter
        });
        Self {
            write_bin: Arc::new(move |sink: &mut ByteSink, value: &dyn AnyValue| {
                wb.write_to(sink, downcast::<T>(value))
            }),
            read_bin: Arc::new(move |reader: &mut ByteReader<'_>| {
                Ok(Box::new(rb.read_from(reader)?) as Box<dyn AnyValue>)
            }),
            read_json: Arc::new(move |value: &Value, ctx: &DecodeContext| {
                Ok(Box::new(rj.from_json(value, ctx)?) as Box<dyn AnyValue>)
            }),
            write_json,
        }
    }
}

enum Presence {
    Required,
    Optional,
    Defaulted(Box<dyn AnyValue>),
}

struct FieldDescriptor {
    name: String,
    codec: ErasedCodec,
    presence: Presence,
}

/// Ordered, uniquely-named field descriptors for one compound type.
///
/// Built by chaining [`required`](Self::required),
/// [`optional`](Self::optional), and
/// [`with_default`](Self::with_default); effectively immutable once
/// compiled into a codec, and reusable across any number of
/// decode/encode calls.
#[derive(Default)]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
}

impl Schema {
    /// Creates a schema with no fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push<T: Clone + Send + Sync + 'static>(
        mut self,
        name: &str,
        codec: &Codec<T>,
        presence: Presence,
    ) -> Self {
        assert!(
            !self.fields.iter().any(|fd| fd.name == name),
            "duplicate field \"{}\" in schema",
            name
        );
        self.fields.push(FieldDescriptor {
            name: name.to_owned(),
            codec: ErasedCodec::erase(codec),
            presence,
        });
        self
    }

    /// Adds a field that must be present in every JSON object and is
    /// written unconditionally to the binary form.
    #[must_use]
    pub fn required<T: Clone + Send + Sync + 'static>(
        self,
        name: &str,
        codec: &Codec<T>,
    ) -> Self {
        self.push(name, codec, Presence::Required)
    }

    /// Adds a field that may be absent; absence is recorded as such.
    #[must_use]
    pub fn optional<T: Clone + Send + Sync + 'static>(
        self,
        name: &str,
        codec: &Codec<T>,
    ) -> Self {
        self.push(name, codec, Presence::Optional)
    }

    /// Adds a field that may be absent from JSON, in which case the
    /// instance stores `default` instead.
    ///
    /// The default must already be a valid decoded value of `codec`.
    #[must_use]
    pub fn with_default<T: Clone + Send + Sync + 'static>(
        self,
        name: &str,
        codec: &Codec<T>,
        default: T,
    ) -> Self {
        self.push(name, codec, Presence::Defaulted(Box::new(default)))
    }

    /// Returns `true` if the schema declares a field called `name`.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|fd| fd.name == name)
    }

    /// Returns the number of declared fields.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Iterates the declared field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|fd| fd.name.as_str())
    }

    /// Returns the declared default of field `name`, if it has one.
    ///
    /// # Panics
    ///
    /// Panics if the schema has no such field, or if the default is
    /// requested at a type other than the one it was declared with.
    #[must_use]
    pub fn default_of<T: Any + Clone>(&self, name: &str) -> Option<T> {
        let fd = self
            .fields
            .iter()
            .find(|fd| fd.name == name)
            .unwrap_or_else(|| panic!("schema has no field \"{}\"", name));
        match &fd.presence {
            Presence::Defaulted(value) => Some(downcast::<T>(value.as_ref()).clone()),
            _ => None,
        }
    }

    fn writes_json(&self) -> bool {
        self.fields.iter().all(|fd| fd.codec.write_json.is_some())
    }

    /// Compiles the schema into a codec for raw field instances.
    ///
    /// The compiled codec carries a JSON writer exactly when every field
    /// codec does.
    #[must_use]
    pub fn into_codec(self) -> Codec<Instance> {
        let writes_json = self.writes_json();
        let schema = Arc::new(self);
        let wb = Arc::clone(&schema);
        let rb = Arc::clone(&schema);
        let rj = Arc::clone(&schema);
        let codec = Codec::new(
            move |sink: &mut ByteSink, data: &Instance| write_instance_bin(&wb, sink, data),
            move |reader: &mut ByteReader<'_>| read_instance_bin(&rb, reader),
            move |value: &Value, ctx: &DecodeContext| read_instance_json(&rj, value, ctx),
        );
        if writes_json {
            codec.with_json_writer(move |data: &Instance| write_instance_json(&schema, data))
        } else {
            codec
        }
    }

    /// Compiles the schema into a codec for a concrete host type.
    ///
    /// `assemble` turns a decoded instance into the value, receiving the
    /// schema alongside it so that declared defaults can be applied (see
    /// [`Instance::get_or_default`]); `disassemble` is its inverse,
    /// populating a fresh instance from a value. The compiled codec
    /// carries a JSON writer exactly when every field codec does.
    #[must_use]
    pub fn build<T, A, D>(self, assemble: A, disassemble: D) -> Codec<T>
    where
        A: Fn(&Schema, &Instance) -> DecodeResult<T> + Send + Sync + 'static,
        D: Fn(&T) -> EncodeResult<Instance> + Send + Sync + 'static,
    {
        let writes_json = self.writes_json();
        let schema = Arc::new(self);
        let assemble = Arc::new(assemble);
        let disassemble = Arc::new(disassemble);
        let codec = Codec::new(
            {
                let schema = Arc::clone(&schema);
                let disassemble = Arc::clone(&disassemble);
                move |sink: &mut ByteSink, value: &T| {
                    let data = disassemble(value)?;
                    write_instance_bin(&schema, sink, &data)
                }
            },
            {
                let schema = Arc::clone(&schema);
                let assemble = Arc::clone(&assemble);
                move |reader: &mut ByteReader<'_>| {
                    let data = read_instance_bin(&schema, reader)?;
                    assemble(&schema, &data)
                }
            },
            {
                let schema = Arc::clone(&schema);
                let assemble = Arc::clone(&assemble);
                move |value: &Value, ctx: &DecodeContext| {
                    let data = read_instance_json(&schema, value, ctx)?;
                    assemble(&schema, &data)
                }
            },
        );
        if writes_json {
            codec.with_json_writer(move |value: &T| {
                let data = disassemble(value)?;
                write_instance_json(&schema, &data)
            })
        } else {
            codec
        }
    }
}

fn write_instance_bin(
    schema: &Schema,
    sink: &mut ByteSink,
    data: &Instance,
) -> EncodeResult<()> {
    for fd in &schema.fields {
        match &fd.presence {
            Presence::Required => {
                let value = data.values.get(&fd.name).ok_or_else(|| {
                    EncodeError::MissingField {
                        name: fd.name.clone(),
                    }
                })?;
                (fd.codec.write_bin)(sink, value.as_ref())?;
            }
            _ => match data.values.get(&fd.name) {
                Some(value) => {
                    sink.put_bool(true);
                    (fd.codec.write_bin)(sink, value.as_ref())?;
                }
                None => sink.put_bool(false),
            },
        }
    }
    Ok(())
}

fn read_instance_bin(schema: &Schema, reader: &mut ByteReader<'_>) -> DecodeResult<Instance> {
    let mut data = Instance::new();
    for fd in &schema.fields {
        let present = match fd.presence {
            Presence::Required => true,
            _ => reader.take_bool()?,
        };
        if present {
            data.values
                .insert(fd.name.clone(), (fd.codec.read_bin)(reader)?);
        }
    }
    Ok(data)
}

fn read_instance_json(
    schema: &Schema,
    value: &Value,
    ctx: &DecodeContext,
) -> DecodeResult<Instance> {
    let object = json::expect_object(value)?;
    let mut data = Instance::new();
    // keys the schema does not declare are ignored
    for fd in &schema.fields {
        match object.get(&fd.name) {
            Some(elem) => {
                let decoded =
                    (fd.codec.read_json)(elem, ctx).map_err(|err| err.at_field(&fd.name))?;
                data.values.insert(fd.name.clone(), decoded);
            }
            None => match &fd.presence {
                Presence::Required => {
                    return Err(SchemaError::new(SchemaErrorKind::MissingField {
                        name: fd.name.clone(),
                    })
                    .into())
                }
                Presence::Defaulted(default) => {
                    data.values.insert(fd.name.clone(), (**default).clone_boxed());
                }
                Presence::Optional => {}
            },
        }
    }
    Ok(data)
}

fn write_instance_json(schema: &Schema, data: &Instance) -> EncodeResult<Value> {
    let mut object = serde_json::Map::new();
    for fd in &schema.fields {
        match data.values.get(&fd.name) {
            Some(value) => {
                let write = fd
                    .codec
                    .write_json
                    .as_ref()
                    .expect("schema compiled with a JSON writer despite a writerless field");
                object.insert(fd.name.clone(), write(value.as_ref())?);
            }
            None => {
                if matches!(fd.presence, Presence::Required) {
                    return Err(EncodeError::MissingField {
                        name: fd.name.clone(),
                    });
                }
            }
        }
    }
    Ok(Value::Object(object))
}

/// A transient mapping from field name to decoded value.
///
/// Produced by a compound codec during one decode pass, or populated by
/// hand (via [`set`](Self::set)) to drive one encode pass. Absent
/// optional fields simply have no entry; absence is distinct from any
/// in-band null.
#[derive(Default)]
pub struct Instance {
    values: BTreeMap<String, Box<dyn AnyValue>>,
}

impl Instance {
    /// Creates an instance with no field values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value for field `name`, replacing any previous one.
    pub fn set<T: Clone + Send + Sync + 'static>(&mut self, name: &str, value: T) -> &mut Self {
        self.values.insert(name.to_owned(), Box::new(value));
        self
    }

    /// Returns `true` if field `name` holds a value.
    #[must_use]
    pub fn is_present(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Returns the number of fields holding a value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no field holds a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns a clone of field `name`.
    ///
    /// # Panics
    ///
    /// Panics if the field is absent or does not hold a `T`; both are
    /// programming errors on the caller's side, not recoverable decode
    /// failures.
    #[must_use]
    pub fn get<T: Any + Clone>(&self, name: &str) -> T {
        match self.values.get(name) {
            Some(value) => downcast::<T>(value.as_ref()).clone(),
            None => panic!("instance holds no value for field \"{}\"", name),
        }
    }

    /// Returns a clone of field `name`, or `None` if it is absent.
    ///
    /// # Panics
    ///
    /// Panics if a present value does not hold a `T`.
    #[must_use]
    pub fn opt<T: Any + Clone>(&self, name: &str) -> Option<T> {
        self.values
            .get(name)
            .map(|value| downcast::<T>(value.as_ref()).clone())
    }

    /// Runs `consume` on the value of field `name` if it is present.
    pub fn if_present<T: Any + Clone, F: FnOnce(T)>(&self, name: &str, consume: F) {
        if let Some(value) = self.opt::<T>(name) {
            consume(value)
        }
    }

    /// Returns field `name`, falling back to the schema's declared
    /// default when the field is absent.
    ///
    /// This is how assembly functions give a binary-decoded instance
    /// (where absent optional fields stay absent) the same defaults the
    /// JSON reader stores.
    ///
    /// # Panics
    ///
    /// Panics if the field is absent and declares no default.
    #[must_use]
    pub fn get_or_default<T: Any + Clone>(&self, schema: &Schema, name: &str) -> T {
        self.opt::<T>(name).unwrap_or_else(|| {
            schema.default_of::<T>(name).unwrap_or_else(|| {
                panic!(
                    "field \"{}\" is absent and its schema declares no default",
                    name
                )
            })
        })
    }

    /// Convenience accessor for an `i32` field.
    #[must_use]
    pub fn get_int(&self, name: &str) -> i32 {
        self.get(name)
    }

    /// Convenience accessor for a `bool` field.
    #[must_use]
    pub fn get_bool(&self, name: &str) -> bool {
        self.get(name)
    }

    /// Convenience accessor for an `f32` field.
    #[must_use]
    pub fn get_float(&self, name: &str) -> f32 {
        self.get(name)
    }

    /// Convenience accessor for an `f64` field.
    #[must_use]
    pub fn get_double(&self, name: &str) -> f64 {
        self.get(name)
    }

    /// Convenience accessor for a `String` field.
    #[must_use]
    pub fn get_string(&self, name: &str) -> String {
        self.get(name)
    }

    /// Convenience accessor for an [`Identifier`] field.
    #[must_use]
    pub fn get_ident(&self, name: &str) -> Identifier {
        self.get(name)
    }
}

impl Clone for Instance {
    fn clone(&self) -> Self {
        Self {
            values: self
                .values
                .iter()
                .map(|(name, value)| (name.clone(), (**value).clone_boxed()))
                .collect(),
        }
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}
