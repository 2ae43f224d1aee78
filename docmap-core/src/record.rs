//! Record types and their static field schema.
//!
//! A record is a plain struct whose named fields are mapped one-to-one onto document
//! fields. At most one field is the identifier, which is stored under the store's
//! primary key (`_id`) and never written as part of a field payload.
//!
//! The [`Record`] trait is normally derived:
//!
//! ```ignore
//! use docmap::{Record, bson::oid::ObjectId};
//!
//! #[derive(Debug, Default, Record)]
//! pub struct Article {
//!     pub id: Option<ObjectId>,
//!     pub title: String,
//!     #[record(rename = "tagList")]
//!     pub tags: Vec<String>,
//!     #[record(skip)]
//!     pub dirty: bool,
//! }
//! ```

use bson::Bson;

use crate::error::DocmapResult;

/// Describes one declared, non-identifier field of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: &'static str,
    type_name: &'static str,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, type_name: &'static str) -> Self {
        Self { name, type_name }
    }

    /// The document field name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The Rust type of the field as written in the struct definition.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Static description of a record type: its name, its declared fields in declaration
/// order, and the name of its identifier field if it has one.
///
/// The schema is consulted when building field payloads, when projecting reads and
/// when reconstructing records from stored documents.
#[derive(Debug, Clone, Copy)]
pub struct RecordSchema {
    name: &'static str,
    fields: &'static [FieldDescriptor],
    id_field: Option<&'static str>,
}

impl RecordSchema {
    pub const fn new(
        name: &'static str,
        fields: &'static [FieldDescriptor],
        id_field: Option<&'static str>,
    ) -> Self {
        Self { name, fields, id_field }
    }

    /// The record type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared non-identifier fields, in declaration order.
    pub fn fields(&self) -> &'static [FieldDescriptor] {
        self.fields
    }

    /// Iterates over the declared field names.
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> {
        self.fields.iter().map(FieldDescriptor::name)
    }

    /// Returns `true` if `field` is a declared non-identifier field.
    pub fn declares(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.name == field)
    }

    /// The Rust name of the identifier field, if the record has one.
    pub fn id_field(&self) -> Option<&'static str> {
        self.id_field
    }

    pub fn has_identifier(&self) -> bool {
        self.id_field.is_some()
    }
}

/// A struct that can be mapped to and from a stored document.
///
/// Implementations expose a static [`RecordSchema`], a blank constructor through
/// [`Default`], and by-name field access with values converted to and from BSON.
/// Records without an identifier field keep the default identifier methods.
///
/// Use `#[derive(Record)]` rather than implementing this by hand.
pub trait Record: Default + Send + Sync + 'static {
    /// Returns the static schema for this record type.
    fn schema() -> &'static RecordSchema;

    /// Reads a declared field as BSON.
    ///
    /// Returns `Ok(None)` if `field` is not declared by this record type.
    fn get_field(&self, field: &str) -> DocmapResult<Option<Bson>>;

    /// Assigns a declared field from a BSON value.
    ///
    /// Returns `Ok(false)` and leaves the record untouched if `field` is not declared.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if `value` cannot be converted into the field's type.
    fn set_field(&mut self, field: &str, value: Bson) -> DocmapResult<bool>;

    /// Returns the identifier value, or `None` if the record has no identifier field
    /// or the identifier is unset.
    fn identifier(&self) -> DocmapResult<Option<Bson>> {
        Ok(None)
    }

    /// Assigns the identifier value.
    ///
    /// Returns `Ok(false)` if the record has no identifier field.
    fn set_identifier(&mut self, _id: Bson) -> DocmapResult<bool> {
        Ok(false)
    }
}
