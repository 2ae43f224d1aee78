//! Update operators applied to in-memory documents.
//!
//! Supported operators: `$set`, `$setOnInsert`, `$unset`, `$rename`, `$inc`, `$mul`,
//! `$min`, `$max`, `$push`, `$addToSet`, `$pop` and `$pull`. `$push` and `$addToSet`
//! accept an `{ "$each": [...] }` modifier, and `$pull` accepts either a value or a
//! condition document. `$setOnInsert` only applies when an upsert creates the document.

use std::cmp::Ordering;
use bson::{Bson, Document};

use docmap_core::{
    error::{DocmapError, DocmapResult},
    transform::ID_KEY,
};

use crate::evaluator::{Comparable, DocumentEvaluator, is_operator_document, lookup, matches_condition, values_equal};


/// Applies an update document to `document` in place. `inserting` is set when an upsert
/// is creating `document`.
///
/// # Errors
///
/// Returns an invalid-document error when `update` is not made of operators, and a
/// write error when an operator cannot be applied to the stored value or the update
/// would change the primary key.
pub(crate) fn apply_update(document: &mut Document, update: &Document, inserting: bool) -> DocmapResult<()> {
    validate(update)?;

    let original_id = document.get(ID_KEY).cloned();

    for (op, fields) in update {
        let Bson::Document(fields) = fields else {
            return Err(DocmapError::InvalidDocument(format!("{op} expects a document of fields")));
        };

        for (path, argument) in fields {
            match op.as_str() {
                "$set" => set_path(document, path, argument.clone())?,
                "$setOnInsert" if inserting => set_path(document, path, argument.clone())?,
                "$setOnInsert" => {}
                "$unset" => {
                    unset_path(document, path);
                }
                "$rename" => rename(document, path, argument)?,
                "$inc" => arithmetic(document, path, argument, Arithmetic::Add)?,
                "$mul" => arithmetic(document, path, argument, Arithmetic::Multiply)?,
                "$min" => keep_extreme(document, path, argument, Ordering::Less)?,
                "$max" => keep_extreme(document, path, argument, Ordering::Greater)?,
                "$push" => push(document, path, argument, false)?,
                "$addToSet" => push(document, path, argument, true)?,
                "$pop" => pop(document, path, argument)?,
                "$pull" => pull(document, path, argument)?,
                _ => return Err(DocmapError::InvalidDocument(format!("unknown update operator: {op}"))),
            }
        }
    }

    match (original_id, document.get(ID_KEY)) {
        (Some(before), Some(after)) if !values_equal(&before, after) => Err(immutable_id()),
        (Some(_), None) => Err(immutable_id()),
        _ => Ok(()),
    }
}

/// Builds the seed of an upserted document from the equality conditions of `filter`.
pub(crate) fn seed_from_filter(filter: &Document) -> DocmapResult<Document> {
    let mut seed = Document::new();

    for (key, condition) in filter {
        if key.starts_with('$') {
            continue;
        }

        match condition {
            Bson::Document(operators) if is_operator_document(condition) => {
                if let Some(value) = operators.get("$eq") {
                    set_path(&mut seed, key, value.clone())?;
                }
            }
            value => set_path(&mut seed, key, value.clone())?,
        }
    }

    Ok(seed)
}

fn validate(update: &Document) -> DocmapResult<()> {
    if update.is_empty() {
        return Err(DocmapError::InvalidDocument("update document must not be empty".into()));
    }

    for op in update.keys() {
        match op.as_str() {
            "$set" | "$setOnInsert" | "$unset" | "$rename" | "$inc" | "$mul" | "$min" | "$max"
            | "$push" | "$addToSet" | "$pop" | "$pull" => {}
            op if op.starts_with('$') => {
                return Err(DocmapError::InvalidDocument(format!("unknown update operator: {op}")));
            }
            field => {
                return Err(DocmapError::InvalidDocument(format!(
                    "update document requires atomic operators, found field: {field}"
                )));
            }
        }
    }

    Ok(())
}

fn immutable_id() -> DocmapError {
    DocmapError::Write(format!("performing an update on the path '{ID_KEY}' would modify the immutable field '{ID_KEY}'"))
}

fn set_path(document: &mut Document, path: &str, value: Bson) -> DocmapResult<()> {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
            Ok(())
        }
        Some((head, rest)) => {
            let child = document
                .entry(head.to_string())
                .or_insert_with(|| Bson::Document(Document::new()));

            match child {
                Bson::Document(child) => set_path(child, rest, value),
                _ => Err(DocmapError::Write(format!("cannot create field '{rest}' in non-document field '{head}'"))),
            }
        }
    }
}

fn unset_path(document: &mut Document, path: &str) -> Option<Bson> {
    match path.split_once('.') {
        None => document.remove(path),
        Some((head, rest)) => match document.get_mut(head) {
            Some(Bson::Document(child)) => unset_path(child, rest),
            _ => None,
        },
    }
}

fn rename(document: &mut Document, path: &str, target: &Bson) -> DocmapResult<()> {
    let Bson::String(target) = target else {
        return Err(DocmapError::InvalidDocument(format!("$rename target for '{path}' must be a string")));
    };
    if target == path {
        return Err(DocmapError::InvalidDocument(format!("$rename source and target are both '{path}'")));
    }

    match unset_path(document, path) {
        Some(value) => set_path(document, target, value),
        None => Ok(()),
    }
}

#[derive(Clone, Copy)]
enum Arithmetic {
    Add,
    Multiply,
}

impl Arithmetic {
    fn name(self) -> &'static str {
        match self {
            Arithmetic::Add => "$inc",
            Arithmetic::Multiply => "$mul",
        }
    }

    fn ints(self, a: i64, b: i64) -> Option<i64> {
        match self {
            Arithmetic::Add => a.checked_add(b),
            Arithmetic::Multiply => a.checked_mul(b),
        }
    }

    fn floats(self, a: f64, b: f64) -> f64 {
        match self {
            Arithmetic::Add => a + b,
            Arithmetic::Multiply => a * b,
        }
    }
}

fn arithmetic(document: &mut Document, path: &str, operand: &Bson, op: Arithmetic) -> DocmapResult<()> {
    let updated = match lookup(document, path) {
        None => match (op, operand) {
            (Arithmetic::Add, _) => combine(path, &Bson::Int32(0), operand, op)?,
            // Multiplying a missing field stores a zero of the operand's type.
            (Arithmetic::Multiply, Bson::Double(_)) => Bson::Double(0.0),
            (Arithmetic::Multiply, Bson::Int64(_)) => Bson::Int64(0),
            (Arithmetic::Multiply, _) => combine(path, &Bson::Int32(0), operand, op)?,
        },
        Some(current) => combine(path, current, operand, op)?,
    };

    set_path(document, path, updated)
}

fn combine(path: &str, current: &Bson, operand: &Bson, op: Arithmetic) -> DocmapResult<Bson> {
    let overflow = || DocmapError::Write(format!("{} on field '{path}' would overflow", op.name()));

    Ok(match (current, operand) {
        (Bson::Int32(a), Bson::Int32(b)) => {
            let result = op.ints(*a as i64, *b as i64).ok_or_else(overflow)?;
            i32::try_from(result)
                .map(Bson::Int32)
                .unwrap_or(Bson::Int64(result))
        }
        (Bson::Int32(a), Bson::Int64(b)) => Bson::Int64(op.ints(*a as i64, *b).ok_or_else(overflow)?),
        (Bson::Int64(a), Bson::Int32(b)) => Bson::Int64(op.ints(*a, *b as i64).ok_or_else(overflow)?),
        (Bson::Int64(a), Bson::Int64(b)) => Bson::Int64(op.ints(*a, *b).ok_or_else(overflow)?),
        (Bson::Double(a), Bson::Double(b)) => Bson::Double(op.floats(*a, *b)),
        (Bson::Double(a), Bson::Int32(b)) => Bson::Double(op.floats(*a, *b as f64)),
        (Bson::Double(a), Bson::Int64(b)) => Bson::Double(op.floats(*a, *b as f64)),
        (Bson::Int32(a), Bson::Double(b)) => Bson::Double(op.floats(*a as f64, *b)),
        (Bson::Int64(a), Bson::Double(b)) => Bson::Double(op.floats(*a as f64, *b)),
        (_, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) => {
            return Err(DocmapError::Write(format!("cannot apply {} to non-numeric field '{path}'", op.name())));
        }
        _ => {
            return Err(DocmapError::InvalidDocument(format!("{} on '{path}' needs a numeric operand", op.name())));
        }
    })
}

fn keep_extreme(document: &mut Document, path: &str, candidate: &Bson, wanted: Ordering) -> DocmapResult<()> {
    let replace = match lookup(document, path) {
        None => true,
        Some(current) => Comparable::from(candidate).sort_cmp(&Comparable::from(current)) == wanted,
    };

    match replace {
        true => set_path(document, path, candidate.clone()),
        false => Ok(()),
    }
}

fn push(document: &mut Document, path: &str, argument: &Bson, distinct: bool) -> DocmapResult<()> {
    let values = match argument {
        Bson::Document(modifiers) if modifiers.contains_key("$each") => modifiers
            .get_array("$each")
            .map_err(|_| DocmapError::InvalidDocument("$each expects an array".into()))?
            .clone(),
        value => vec![value.clone()],
    };

    let mut items = match lookup(document, path) {
        None => Vec::new(),
        Some(Bson::Array(items)) => items.clone(),
        Some(_) => return Err(DocmapError::Write(format!("field '{path}' is not an array"))),
    };

    for value in values {
        if distinct && items.iter().any(|item| values_equal(item, &value)) {
            continue;
        }
        items.push(value);
    }

    set_path(document, path, Bson::Array(items))
}

fn pop(document: &mut Document, path: &str, end: &Bson) -> DocmapResult<()> {
    let from_front = match end {
        Bson::Int32(-1) | Bson::Int64(-1) => true,
        Bson::Int32(1) | Bson::Int64(1) => false,
        Bson::Double(n) if *n == -1.0 => true,
        Bson::Double(n) if *n == 1.0 => false,
        _ => return Err(DocmapError::InvalidDocument(format!("$pop on '{path}' expects 1 or -1"))),
    };

    let mut items = match lookup(document, path) {
        None => return Ok(()),
        Some(Bson::Array(items)) => items.clone(),
        Some(_) => return Err(DocmapError::Write(format!("cannot apply $pop to non-array field '{path}'"))),
    };

    if !from_front {
        items.pop();
    } else if !items.is_empty() {
        items.remove(0);
    }

    set_path(document, path, Bson::Array(items))
}

fn pull(document: &mut Document, path: &str, condition: &Bson) -> DocmapResult<()> {
    let Some(current) = lookup(document, path) else {
        return Ok(());
    };
    let Bson::Array(items) = current else {
        return Err(DocmapError::Write(format!("cannot apply $pull to non-array field '{path}'")));
    };

    let mut kept = Vec::with_capacity(items.len());
    for item in items {
        let remove = match (condition, item) {
            (Bson::Document(query), Bson::Document(element)) if !is_operator_document(condition) => {
                DocumentEvaluator::new(element).evaluate(query)?
            }
            _ => matches_condition(Some(item), condition)?,
        };

        if !remove {
            kept.push(item.clone());
        }
    }

    set_path(document, path, Bson::Array(kept))
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    #[test]
    fn set_unset_and_inc() {
        let mut document = doc! { "_id": 1, "a": 1, "b": "x", "nested": { "c": 1 } };

        apply_update(&mut document, &doc! {
            "$set": { "b": "y", "nested.d": 2 },
            "$unset": { "a": "" },
            "$inc": { "count": 2, "nested.c": 1.5 },
        }, false)
        .unwrap();

        assert_eq!(document, doc! {
            "_id": 1,
            "b": "y",
            "nested": { "c": 2.5, "d": 2 },
            "count": 2,
        });
    }

    #[test]
    fn push_add_to_set_and_pull() {
        let mut document = doc! { "tags": ["a"], "scores": [1, 5, 9] };

        apply_update(&mut document, &doc! {
            "$push": { "tags": { "$each": ["b", "a"] }, "fresh": 1 },
            "$addToSet": { "tags": "b" },
            "$pull": { "scores": { "$gte": 5 } },
        }, false)
        .unwrap();

        assert_eq!(document, doc! {
            "tags": ["a", "b", "a"],
            "scores": [1],
            "fresh": [1],
        });
    }

    #[test]
    fn pull_matches_subdocuments_by_query() {
        let mut document = doc! { "items": [{ "k": 1 }, { "k": 2 }] };

        apply_update(&mut document, &doc! { "$pull": { "items": { "k": 2 } } }, false).unwrap();

        assert_eq!(document, doc! { "items": [{ "k": 1 }] });
    }

    #[test]
    fn rejects_replacement_style_and_unknown_operators() {
        let mut document = doc! { "a": 1 };

        assert!(matches!(
            apply_update(&mut document, &doc! { "a": 2 }, false),
            Err(DocmapError::InvalidDocument(_))
        ));
        assert!(matches!(
            apply_update(&mut document, &doc! { "$currentDate": { "a": true } }, false),
            Err(DocmapError::InvalidDocument(_))
        ));
        assert!(apply_update(&mut document, &doc! {}, false).is_err());
    }

    #[test]
    fn type_mismatches_are_write_errors() {
        let mut document = doc! { "_id": 1, "name": "x", "tags": "solo" };

        assert!(matches!(
            apply_update(&mut document, &doc! { "$inc": { "name": 1 } }, false),
            Err(DocmapError::Write(_))
        ));
        assert!(matches!(
            apply_update(&mut document, &doc! { "$push": { "tags": "t" } }, false),
            Err(DocmapError::Write(_))
        ));
        assert!(matches!(
            apply_update(&mut document, &doc! { "$set": { "_id": 2 } }, false),
            Err(DocmapError::Write(_))
        ));
    }

    #[test]
    fn seeds_equality_fields_only() {
        let seed = seed_from_filter(&doc! {
            "name": "Ann",
            "age": { "$gt": 3 },
            "city": { "$eq": "Oslo" },
            "address.zip": "0150",
            "$or": [{ "x": 1 }],
        })
        .unwrap();

        assert_eq!(seed, doc! { "name": "Ann", "city": "Oslo", "address": { "zip": "0150" } });
    }

    #[test]
    fn integer_overflow_is_a_write_error() {
        let mut document = doc! { "_id": 1, "n": i64::MAX, "small": i32::MAX };

        assert!(matches!(
            apply_update(&mut document, &doc! { "$inc": { "n": 1_i64 } }, false),
            Err(DocmapError::Write(_))
        ));
        assert!(matches!(
            apply_update(&mut document, &doc! { "$mul": { "n": 2 } }, false),
            Err(DocmapError::Write(_))
        ));
        assert_eq!(document.get_i64("n").unwrap(), i64::MAX);

        // 32-bit counters widen instead of failing.
        apply_update(&mut document, &doc! { "$inc": { "small": 1 } }, false).unwrap();
        assert_eq!(document.get_i64("small").unwrap(), i32::MAX as i64 + 1);
    }

    #[test]
    fn arithmetic_and_bounds_operators() {
        let mut document = doc! { "price": 10, "low": 5, "high": 5, "old": "x" };

        apply_update(&mut document, &doc! {
            "$mul": { "price": 1.5, "missing": 3 },
            "$min": { "low": 2 },
            "$max": { "high": 9, "fresh": 1 },
            "$rename": { "old": "new" },
        }, false)
        .unwrap();

        assert_eq!(document, doc! {
            "price": 15.0,
            "low": 2,
            "high": 9,
            "missing": 0,
            "fresh": 1,
            "new": "x",
        });
    }

    #[test]
    fn pop_removes_from_either_end() {
        let mut document = doc! { "queue": [1, 2, 3] };

        apply_update(&mut document, &doc! { "$pop": { "queue": -1 } }, false).unwrap();
        assert_eq!(document, doc! { "queue": [2, 3] });

        apply_update(&mut document, &doc! { "$pop": { "queue": 1 } }, false).unwrap();
        assert_eq!(document, doc! { "queue": [2] });

        assert!(apply_update(&mut document, &doc! { "$pop": { "queue": 2 } }, false).is_err());
    }

    #[test]
    fn set_on_insert_only_applies_when_inserting() {
        let update = doc! { "$set": { "seen": true }, "$setOnInsert": { "created": 1 } };

        let mut existing = doc! { "_id": 1 };
        apply_update(&mut existing, &update, false).unwrap();
        assert_eq!(existing, doc! { "_id": 1, "seen": true });

        let mut created = doc! {};
        apply_update(&mut created, &update, true).unwrap();
        assert_eq!(created, doc! { "seen": true, "created": 1 });
    }
}
