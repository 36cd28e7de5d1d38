//! Filter evaluation, ordering and field paths for in-memory documents.
//!
//! Semantics follow what a MongoDB server does for the same filter wherever that is
//! cheap to reproduce: array fields match when any element matches, negative operators
//! match documents that lack the field, and mixed-type sorting follows BSON type order.

use bson::{Bson, Document, oid::ObjectId};
use std::{cmp::Ordering, collections::HashMap};

use doclink_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, QueryVisitor, Sort, SortDirection},
};

/// Comparable view over a BSON value.
///
/// Integers and floats are normalized to `f64` so `Int32(1) == Double(1.0)`.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(bson::DateTime),
    String(&'a str),
    ObjectId(ObjectId),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    /// Binary data, regexes and other types compared by identity only.
    Opaque(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Array(items) => Comparable::Array(items.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
            other => Comparable::Opaque(other),
        }
    }
}

impl Comparable<'_> {
    /// Position in BSON cross-type sort order.
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 1,
            Comparable::Number(_) => 2,
            Comparable::String(_) => 3,
            Comparable::Map(_) => 4,
            Comparable::Array(_) => 5,
            Comparable::Opaque(_) => 6,
            Comparable::ObjectId(_) => 7,
            Comparable::Bool(_) => 8,
            Comparable::DateTime(_) => 9,
        }
    }

    /// Total order used for sorting. Values of different types order by type rank.
    ///
    /// NaN sorts below every other number and equal to itself.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        if let (Comparable::Number(a), Comparable::Number(b)) = (self, other) {
            return match (a.is_nan(), b.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            };
        }
        self.partial_cmp(other)
            .unwrap_or_else(|| self.rank().cmp(&other.rank()))
    }
}

impl PartialEq for Comparable<'_> {
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
            (Comparable::Opaque(a), Comparable::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
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

/// Resolves a dotted path such as `"address.city"` or `"tags.0"` inside `document`.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            Bson::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Orders two documents by a list of sort keys, earlier keys first.
///
/// Missing fields order like `null`.
pub(crate) fn compare_documents(a: &Document, b: &Document, sort: &[Sort]) -> Ordering {
    for key in sort {
        let left = lookup(a, &key.field).map(Comparable::from).unwrap_or(Comparable::Null);
        let right = lookup(b, &key.field).map(Comparable::from).unwrap_or(Comparable::Null);

        let ordering = match key.direction {
            SortDirection::Asc => left.sort_cmp(&right),
            SortDirection::Desc => right.sort_cmp(&left),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Evaluates a filter expression against one document.
pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// `None` matches every document.
    pub fn matches(document: &'a Document, filter: Option<&Expr>) -> DocumentStoreResult<bool> {
        match filter {
            Some(expr) => DocumentEvaluator::new(document).visit_expr(expr),
            None => Ok(true),
        }
    }
}

fn expect_string<'v>(op: &FieldOp, value: &'v Bson) -> DocumentStoreResult<&'v str> {
    value.as_str().ok_or_else(|| {
        DocumentStoreError::InvalidFilter(format!("{op:?} requires a string operand, found {value}"))
    })
}

fn any_element<'a>(field: &Comparable<'a>, pred: impl Fn(&Comparable<'a>) -> bool) -> bool {
    match field {
        Comparable::Array(items) => pred(field) || items.iter().any(&pred),
        scalar => pred(scalar),
    }
}

fn candidates<'v>(values: &'v Bson) -> Vec<Comparable<'v>> {
    match values {
        Bson::Array(items) => items.iter().map(Comparable::from).collect(),
        single => vec![Comparable::from(single)],
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(lookup(self.document, field).is_some() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let Some(found) = lookup(self.document, field) else {
            return Ok(matches!(op, FieldOp::Ne | FieldOp::NotContains | FieldOp::NoneOf));
        };
        let left = Comparable::from(found);

        Ok(match op {
            FieldOp::Eq => {
                let right = Comparable::from(value);
                any_element(&left, |item| item == &right)
            }
            FieldOp::Ne => {
                let right = Comparable::from(value);
                !any_element(&left, |item| item == &right)
            }
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                let right = Comparable::from(value);
                any_element(&left, |item| match item.partial_cmp(&right) {
                    Some(ordering) => match op {
                        FieldOp::Gt => ordering.is_gt(),
                        FieldOp::Gte => ordering.is_ge(),
                        FieldOp::Lt => ordering.is_lt(),
                        _ => ordering.is_le(),
                    },
                    None => false,
                })
            }
            FieldOp::Contains | FieldOp::NotContains => {
                let hit = match value {
                    Bson::String(needle) => any_element(&left, |item| {
                        matches!(item, Comparable::String(s) if s.contains(needle.as_str()))
                    }),
                    Bson::Array(wanted) => {
                        !wanted.is_empty()
                            && wanted
                                .iter()
                                .map(Comparable::from)
                                .all(|w| any_element(&left, |item| item == &w))
                    }
                    scalar => {
                        let right = Comparable::from(scalar);
                        any_element(&left, |item| item == &right)
                    }
                };
                hit == matches!(op, FieldOp::Contains)
            }
            FieldOp::StartsWith => {
                let prefix = expect_string(op, value)?;
                any_element(&left, |item| matches!(item, Comparable::String(s) if s.starts_with(prefix)))
            }
            FieldOp::EndsWith => {
                let suffix = expect_string(op, value)?;
                any_element(&left, |item| matches!(item, Comparable::String(s) if s.ends_with(suffix)))
            }
            FieldOp::AnyOf | FieldOp::NoneOf => {
                let wanted = candidates(value);
                let hit = any_element(&left, |item| wanted.iter().any(|w| w == item));
                hit == matches!(op, FieldOp::AnyOf)
            }
        })
    }
}
