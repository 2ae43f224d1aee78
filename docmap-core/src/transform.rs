//! The identifier transform shared by every adaptor operation.
//!
//! Records and stored documents disagree about exactly one thing: the identifier. On the
//! write path the identifier is stripped from the field payload and only ever used as a
//! match key. On the read path the store's primary key is remapped onto the record's
//! identifier field and undeclared fields are dropped.

use bson::{Bson, Document, doc};

use crate::{
    error::{DocmapError, DocmapResult},
    record::Record,
};

/// The store's primary-key field.
pub const ID_KEY: &str = "_id";

/// Builds the field payload for a write: every declared field except the identifier.
pub fn strip_identifier<R: Record>(record: &R) -> DocmapResult<Document> {
    let mut document = Document::new();

    for name in R::schema().field_names().filter(|name| *name != ID_KEY) {
        if let Some(value) = record.get_field(name)? {
            document.insert(name, value);
        }
    }

    Ok(document)
}

/// Builds the default match key `{ _id: <record identifier> }`.
///
/// # Errors
///
/// Returns [`DocmapError::MissingIdentifier`] if the record type has no identifier
/// field or the identifier is unset.
pub fn identifier_filter<R: Record>(record: &R) -> DocmapResult<Document> {
    match record.identifier()? {
        Some(Bson::Null) | None => Err(DocmapError::MissingIdentifier(R::schema().name())),
        Some(id) => Ok(doc! { ID_KEY: id }),
    }
}

/// Builds the read projection: every declared field plus the primary key.
pub fn projection<R: Record>() -> Document {
    let mut projection = Document::new();

    for name in R::schema().field_names() {
        projection.insert(name, 1);
    }
    projection.insert(ID_KEY, 1);

    projection
}

/// Reconstructs a record from a stored document.
///
/// The primary key is assigned to the record's identifier field when it has one.
/// Fields the record type does not declare are silently dropped.
pub fn build_record<R: Record>(mut document: Document) -> DocmapResult<R> {
    let schema = R::schema();
    let mut record = R::default();

    if let Some(id) = document.remove(ID_KEY) {
        if schema.has_identifier() {
            record.set_identifier(id)?;
        }
    }

    for (field, value) in document {
        if schema.declares(&field) {
            record.set_field(&field, value)?;
        }
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use bson::{doc, oid::ObjectId};
    use docmap_macros::Record;

    use super::*;

    #[derive(Debug, Default, PartialEq, Record)]
    #[record(crate = "crate")]
    struct Model {
        id: Option<ObjectId>,
        name: String,
        other: Option<String>,
    }

    #[derive(Debug, Default, PartialEq, Record)]
    #[record(crate = "crate")]
    struct Anonymous {
        name: String,
    }

    #[test]
    fn strip_removes_the_identifier_only() {
        let model = Model {
            id: Some(ObjectId::new()),
            name: "Test Model".into(),
            other: Some("Some Data".into()),
        };

        assert_eq!(
            strip_identifier(&model).unwrap(),
            doc! { "name": "Test Model", "other": "Some Data" }
        );
    }

    #[test]
    fn strip_keeps_unset_fields_as_null() {
        let model = Model { id: None, name: "x".into(), other: None };

        assert_eq!(strip_identifier(&model).unwrap(), doc! { "name": "x", "other": Bson::Null });
    }

    #[test]
    fn identifier_filter_requires_an_identifier() {
        let id = ObjectId::new();
        let model = Model { id: Some(id), ..Default::default() };

        assert_eq!(identifier_filter(&model).unwrap(), doc! { "_id": id });
        assert!(matches!(
            identifier_filter(&Model::default()),
            Err(DocmapError::MissingIdentifier("Model"))
        ));
        assert!(matches!(
            identifier_filter(&Anonymous::default()),
            Err(DocmapError::MissingIdentifier("Anonymous"))
        ));
    }

    #[test]
    fn projection_lists_declared_fields_and_primary_key() {
        assert_eq!(projection::<Model>(), doc! { "name": 1, "other": 1, "_id": 1 });
        assert_eq!(projection::<Anonymous>(), doc! { "name": 1, "_id": 1 });
    }

    #[test]
    fn build_remaps_identifier_and_drops_unknown_fields() {
        let id = ObjectId::new();
        let model: Model = build_record(doc! {
            "_id": id,
            "name": "Test Model",
            "unknown": 42,
        })
        .unwrap();

        assert_eq!(model, Model { id: Some(id), name: "Test Model".into(), other: None });
    }

    #[test]
    fn build_ignores_primary_key_without_identifier_field() {
        let record: Anonymous = build_record(doc! { "_id": ObjectId::new(), "name": "n" }).unwrap();

        assert_eq!(record, Anonymous { name: "n".into() });
    }

    #[test]
    fn build_reports_mistyped_fields() {
        let result: DocmapResult<Model> = build_record(doc! { "name": 12.5 });

        assert!(matches!(result, Err(DocmapError::Serialization(_))));
    }
}
