//! Raw filter evaluation for in-memory document filtering.
//!
//! Filters are MongoDB-style documents. The evaluator understands the subset callers
//! reach for in practice: implicit equality, dotted field paths, the comparison operators
//! `$eq $ne $gt $gte $lt $lte $in $nin $exists $not`, and the logical operators
//! `$and $or $nor`. An array field matches an equality (or range) condition when any of
//! its elements does. Anything else is rejected the way a real store would reject it.

use std::{cmp::Ordering, collections::HashMap};

use bson::{Bson, datetime::DateTime, oid::ObjectId};

use kule_core::{
    document::RawDocument,
    error::{DocumentStoreError, DocumentStoreResult},
    query::RawFilter,
};

/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to f64 so `1`, `1i64` and `1.0` compare equal.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Numeric value (all integers and floats normalized to f64)
    Number(f64),
    /// DateTime value
    DateTime(DateTime),
    /// ObjectId value
    ObjectId(ObjectId),
    /// String value
    String(&'a str),
    /// Array of comparable values
    Array(Vec<Comparable<'a>>),
    /// Map/Object of comparable values
    Map(HashMap<&'a str, Comparable<'a>>),
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
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::String(value) => Comparable::String(value),
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

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a RawDocument,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a RawDocument) -> Self {
        Self { document }
    }

    /// Returns `true` if the document satisfies every clause of `filter`.
    pub fn evaluate(&self, filter: &RawDocument) -> DocumentStoreResult<bool> {
        for (key, condition) in filter {
            let matched = match key.as_str() {
                "$and" => self.all(clauses(key, condition)?)?,
                "$or" => self.any(clauses(key, condition)?)?,
                "$nor" => !self.any(clauses(key, condition)?)?,
                op if op.starts_with('$') => return Err(unknown_operator(op)),
                path => self.visit_field(lookup(self.document, path), condition)?,
            };

            if !matched {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Returns the documents matching `filter`, preserving their order.
    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a RawDocument>,
        filter: &RawFilter,
    ) -> DocumentStoreResult<Vec<&'a RawDocument>> {
        let mut matched = Vec::new();

        for document in documents {
            if DocumentEvaluator::new(document).evaluate(filter.as_document())? {
                matched.push(document);
            }
        }

        Ok(matched)
    }

    fn all(&self, filters: Vec<&RawDocument>) -> DocumentStoreResult<bool> {
        for filter in filters {
            if !self.evaluate(filter)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn any(&self, filters: Vec<&RawDocument>) -> DocumentStoreResult<bool> {
        for filter in filters {
            if self.evaluate(filter)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_field(&self, field: Option<&Bson>, condition: &Bson) -> DocumentStoreResult<bool> {
        match condition {
            Bson::Document(ops) if is_operator_document(ops) => {
                for (op, value) in ops {
                    if !self.visit_operator(field, op, value)? {
                        return Ok(false);
                    }
                }

                Ok(true)
            }
            value => Ok(equals(field, value)),
        }
    }

    fn visit_operator(&self, field: Option<&Bson>, op: &str, value: &Bson) -> DocumentStoreResult<bool> {
        match op {
            "$eq" => Ok(equals(field, value)),
            "$ne" => Ok(!equals(field, value)),
            "$gt" => Ok(compares(field, value, |o| o == Ordering::Greater)),
            "$gte" => Ok(compares(field, value, |o| o != Ordering::Less)),
            "$lt" => Ok(compares(field, value, |o| o == Ordering::Less)),
            "$lte" => Ok(compares(field, value, |o| o != Ordering::Greater)),
            "$in" => Ok(in_values(field, values(op, value)?)),
            "$nin" => Ok(!in_values(field, values(op, value)?)),
            "$exists" => Ok(field.is_some() == truthy(value)),
            "$not" => match value {
                Bson::Document(_) => Ok(!self.visit_field(field, value)?),
                _ => Err(DocumentStoreError::Backend("$not needs a document".to_string())),
            },
            other => Err(unknown_operator(other)),
        }
    }
}

fn lookup<'b>(document: &'b RawDocument, path: &str) -> Option<&'b Bson> {
    let mut current = document;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        let value = current.get(segment)?;

        if segments.peek().is_none() {
            return Some(value);
        }

        match value {
            Bson::Document(inner) => current = inner,
            _ => return None,
        }
    }

    None
}

fn is_operator_document(document: &RawDocument) -> bool {
    document
        .keys()
        .next()
        .is_some_and(|key| key.starts_with('$'))
}

fn equals(field: Option<&Bson>, value: &Bson) -> bool {
    let expected = Comparable::from(value);

    match field {
        None => expected == Comparable::Null,
        Some(actual @ Bson::Array(items)) => {
            Comparable::from(actual) == expected
                || items.iter().any(|item| Comparable::from(item) == expected)
        }
        Some(actual) => Comparable::from(actual) == expected,
    }
}

fn compares(field: Option<&Bson>, value: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    let bound = Comparable::from(value);
    let check = |item: &Bson| {
        Comparable::from(item)
            .partial_cmp(&bound)
            .is_some_and(&accept)
    };

    match field {
        None => false,
        Some(Bson::Array(items)) => items.iter().any(check),
        Some(actual) => check(actual),
    }
}

fn in_values(field: Option<&Bson>, candidates: &[Bson]) -> bool {
    candidates
        .iter()
        .any(|candidate| equals(field, candidate))
}

fn values<'b>(op: &str, value: &'b Bson) -> DocumentStoreResult<&'b [Bson]> {
    match value {
        Bson::Array(items) => Ok(items.as_slice()),
        _ => Err(DocumentStoreError::Backend(format!("{op} needs an array"))),
    }
}

fn clauses<'b>(op: &str, value: &'b Bson) -> DocumentStoreResult<Vec<&'b RawDocument>> {
    let Bson::Array(items) = value else {
        return Err(DocumentStoreError::Backend(format!("{op} must be an array")));
    };

    items
        .iter()
        .map(|item| match item {
            Bson::Document(document) => Ok(document),
            _ => Err(DocumentStoreError::Backend(format!("{op} entries must be documents"))),
        })
        .collect()
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Int32(i) => *i != 0,
        Bson::Int64(i) => *i != 0,
        Bson::Double(f) => *f != 0.0,
        Bson::Null => false,
        _ => true,
    }
}

fn unknown_operator(op: &str) -> DocumentStoreError {
    DocumentStoreError::Backend(format!("unknown operator: {op}"))
}
