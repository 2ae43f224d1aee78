//! Filter evaluation for in-memory documents.
//!
//! This module matches stored documents against store-native filter documents, covering
//! the subset of the MongoDB filter language the adaptor and its callers rely on:
//!
//! - implicit equality, including array membership and dotted paths
//! - comparison operators: `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`, `$nin`
//! - element operators: `$exists`
//! - logical operators: `$and`, `$or`, `$nor` at the top level and `$not` on a field

use std::{cmp::Ordering, collections::HashMap};
use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};

use docmap_core::error::{DocmapError, DocmapResult};


/// Type-erased, comparable representation of BSON values.
///
/// Numbers are normalized to `f64`. Values of different kinds never compare equal;
/// ordering across kinds follows the store's type order via [`Comparable::rank`].
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    /// Null value
    Null,
    /// Numeric value (all integers and floats normalized to f64)
    Number(f64),
    /// String value
    String(&'a str),
    /// Map/Object of comparable values
    Map(HashMap<&'a str, Comparable<'a>>),
    /// Array of comparable values
    Array(Vec<Comparable<'a>>),
    /// ObjectId value
    ObjectId(ObjectId),
    /// Boolean value
    Bool(bool),
    /// DateTime value
    DateTime(DateTime),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            _ => Comparable::Null, // Other types are not comparable
        }
    }
}

impl<'a> Comparable<'a> {
    /// Position of this value's kind in the store's cross-type sort order.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Number(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::ObjectId(_) => 5,
            Comparable::Bool(_) => 6,
            Comparable::DateTime(_) => 7,
        }
    }

    /// Total order used for sorting: kinds by rank, then values within a kind.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.partial_cmp(other).unwrap_or(Ordering::Equal))
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.bytes().partial_cmp(&b.bytes()),
            _ => None,
        }
    }
}

/// Returns `true` if two BSON values are equal under the store's comparison rules.
pub(crate) fn values_equal(left: &Bson, right: &Bson) -> bool {
    Comparable::from(left) == Comparable::from(right)
}

/// Looks up a possibly dotted field path in a document.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }

    Some(current)
}

/// Returns `true` if `condition` is an operator document such as `{ "$gt": 5 }`.
pub(crate) fn is_operator_document(condition: &Bson) -> bool {
    match condition {
        Bson::Document(doc) => !doc.is_empty() && doc.keys().all(|k| k.starts_with('$')),
        _ => false,
    }
}


pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Evaluates a filter document against this evaluator's document.
    ///
    /// # Errors
    ///
    /// Returns an invalid-document error for unknown or malformed operators.
    pub fn evaluate(&self, filter: &Document) -> DocmapResult<bool> {
        for (key, condition) in filter {
            let matched = match key.as_str() {
                "$and" => self.all(logical_operands(key, condition)?)?,
                "$or" => self.any(logical_operands(key, condition)?)?,
                "$nor" => !self.any(logical_operands(key, condition)?)?,
                op if op.starts_with('$') => {
                    return Err(DocmapError::InvalidDocument(format!("unknown top level operator: {op}")));
                }
                field => matches_condition(lookup(self.document, field), condition)?,
            };

            if !matched {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Returns the documents matching `filter`, preserving their order.
    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Document>,
        filter: &Document,
    ) -> DocmapResult<Vec<&'a Document>> {
        let mut matched = Vec::new();

        for document in documents {
            if DocumentEvaluator::new(document).evaluate(filter)? {
                matched.push(document);
            }
        }

        Ok(matched)
    }

    fn all(&self, filters: Vec<&Document>) -> DocmapResult<bool> {
        for filter in filters {
            if !self.evaluate(filter)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn any(&self, filters: Vec<&Document>) -> DocmapResult<bool> {
        for filter in filters {
            if self.evaluate(filter)? {
                return Ok(true);
            }
        }

        Ok(false)
    }
}

fn logical_operands<'b>(op: &str, condition: &'b Bson) -> DocmapResult<Vec<&'b Document>> {
    let operands = condition
        .as_array()
        .filter(|arr| !arr.is_empty())
        .ok_or_else(|| DocmapError::InvalidDocument(format!("{op} requires a non-empty array")))?;

    operands
        .iter()
        .map(|operand| {
            operand
                .as_document()
                .ok_or_else(|| DocmapError::InvalidDocument(format!("{op} entries must be documents")))
        })
        .collect()
}

/// Matches a single field value (absent when `None`) against a condition.
pub(crate) fn matches_condition(value: Option<&Bson>, condition: &Bson) -> DocmapResult<bool> {
    if !is_operator_document(condition) {
        return Ok(matches_eq(value, condition));
    }

    let Bson::Document(operators) = condition else {
        return Ok(false);
    };

    for (op, operand) in operators {
        if !apply_operator(value, op, operand)? {
            return Ok(false);
        }
    }

    Ok(true)
}

fn matches_eq(value: Option<&Bson>, target: &Bson) -> bool {
    match value {
        None => matches!(target, Bson::Null),
        Some(value) if values_equal(value, target) => true,
        Some(Bson::Array(items)) => items.iter().any(|item| values_equal(item, target)),
        Some(_) => false,
    }
}

fn matches_ordering(value: Option<&Bson>, target: &Bson, accept: fn(Ordering) -> bool) -> bool {
    let compare = |candidate: &Bson| {
        let left = Comparable::from(candidate);
        let right = Comparable::from(target);

        left.rank() == right.rank()
            && left
                .partial_cmp(&right)
                .map(accept)
                .unwrap_or(false)
    };

    match value {
        None => false,
        Some(value) if compare(value) => true,
        Some(Bson::Array(items)) => items.iter().any(compare),
        Some(_) => false,
    }
}

fn apply_operator(value: Option<&Bson>, op: &str, operand: &Bson) -> DocmapResult<bool> {
    Ok(match op {
        "$eq" => matches_eq(value, operand),
        "$ne" => !matches_eq(value, operand),
        "$gt" => matches_ordering(value, operand, |o| o == Ordering::Greater),
        "$gte" => matches_ordering(value, operand, |o| o != Ordering::Less),
        "$lt" => matches_ordering(value, operand, |o| o == Ordering::Less),
        "$lte" => matches_ordering(value, operand, |o| o != Ordering::Greater),
        "$in" => in_list(op, operand)?
            .iter()
            .any(|candidate| matches_eq(value, candidate)),
        "$nin" => !in_list(op, operand)?
            .iter()
            .any(|candidate| matches_eq(value, candidate)),
        "$exists" => value.is_some() == truthy(operand),
        "$not" => !matches_condition(value, operand)?,
        _ => return Err(DocmapError::InvalidDocument(format!("unknown operator: {op}"))),
    })
}

fn in_list<'b>(op: &str, operand: &'b Bson) -> DocmapResult<&'b Vec<Bson>> {
    operand
        .as_array()
        .ok_or_else(|| DocmapError::InvalidDocument(format!("{op} needs an array")))
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        Bson::Null => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    fn matches(document: &Document, filter: Document) -> bool {
        DocumentEvaluator::new(document).evaluate(&filter).unwrap()
    }

    #[test]
    fn implicit_equality_covers_arrays_and_paths() {
        let document = doc! {
            "name": "Ann",
            "tags": ["a", "b"],
            "address": { "city": "Oslo" },
            "score": 3,
        };

        assert!(matches(&document, doc! { "name": "Ann" }));
        assert!(matches(&document, doc! { "tags": "b" }));
        assert!(matches(&document, doc! { "tags": ["a", "b"] }));
        assert!(matches(&document, doc! { "address.city": "Oslo" }));
        assert!(matches(&document, doc! { "score": 3.0 }));
        assert!(matches(&document, doc! { "missing": null }));
        assert!(!matches(&document, doc! { "name": "Bob" }));
        assert!(!matches(&document, doc! { "tags": "c" }));
    }

    #[test]
    fn comparison_operators_stay_within_a_type() {
        let document = doc! { "age": 30, "name": "Ann" };

        assert!(matches(&document, doc! { "age": { "$gt": 18, "$lte": 30 } }));
        assert!(!matches(&document, doc! { "age": { "$lt": 30 } }));
        assert!(!matches(&document, doc! { "age": { "$gt": "1" } }));
        assert!(matches(&document, doc! { "name": { "$gte": "A" } }));
        assert!(matches(&document, doc! { "age": { "$in": [1, 30] } }));
        assert!(matches(&document, doc! { "age": { "$nin": [1, 2] } }));
        assert!(matches(&document, doc! { "age": { "$ne": 31 } }));
        assert!(matches(&document, doc! { "missing": { "$ne": 1 } }));
        assert!(matches(&document, doc! { "age": { "$not": { "$gt": 40 } } }));
    }

    #[test]
    fn exists_and_logical_operators() {
        let document = doc! { "a": 1, "b": null };

        assert!(matches(&document, doc! { "b": { "$exists": true } }));
        assert!(matches(&document, doc! { "c": { "$exists": false } }));
        assert!(matches(&document, doc! { "$or": [{ "a": 2 }, { "a": 1 }] }));
        assert!(!matches(&document, doc! { "$and": [{ "a": 1 }, { "c": 1 }] }));
        assert!(matches(&document, doc! { "$nor": [{ "a": 2 }] }));
    }

    #[test]
    fn malformed_filters_are_rejected() {
        let document = doc! { "a": 1 };
        let evaluator = DocumentEvaluator::new(&document);

        assert!(matches!(
            evaluator.evaluate(&doc! { "a": { "$regex": "x" } }),
            Err(DocmapError::InvalidDocument(_))
        ));
        assert!(evaluator.evaluate(&doc! { "$or": [] }).is_err());
        assert!(evaluator.evaluate(&doc! { "$where": "1" }).is_err());
    }

    #[test]
    fn sort_order_ranks_types() {
        let null = Bson::Null;
        let number = Bson::Int32(5);
        let text = Bson::String("a".into());

        assert_eq!(Comparable::from(&null).sort_cmp(&Comparable::from(&number)), Ordering::Less);
        assert_eq!(Comparable::from(&text).sort_cmp(&Comparable::from(&number)), Ordering::Greater);
    }
}
