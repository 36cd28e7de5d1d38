//! Translation of filter expressions and find options into MongoDB syntax.
//!
//! String operators become anchored, regex-escaped `$regex` patterns so that user input
//! is always matched literally. Matching is case-sensitive, like the in-memory driver.

use bson::{Bson, Document, doc};
use regex::escape;

use doclink_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, Projection, QueryVisitor, Sort, SortDirection},
};

/// Translates filter expressions into MongoDB query documents.
pub(crate) struct MongoQueryTranslator;

/// Renders an optional filter; `None` becomes the match-all `{}`.
pub fn translate_filter(filter: Option<&Expr>) -> DocumentStoreResult<Document> {
    match filter {
        Some(expr) => MongoQueryTranslator.visit_expr(expr),
        None => Ok(Document::new()),
    }
}

/// Renders sort keys as `{ field: 1 | -1 }`, keeping their order.
pub fn translate_sort(sort: &[Sort]) -> Option<Document> {
    if sort.is_empty() {
        return None;
    }

    Some(
        sort.iter()
            .map(|key| {
                let direction = match key.direction {
                    SortDirection::Asc => 1,
                    SortDirection::Desc => -1,
                };
                (key.field.clone(), Bson::Int32(direction))
            })
            .collect(),
    )
}

pub fn translate_projection(projection: Option<&Projection>) -> Option<Document> {
    projection.map(Projection::to_document)
}

fn string_operand<'v>(op: &FieldOp, value: &'v Bson) -> DocumentStoreResult<&'v str> {
    match value {
        Bson::String(s) => Ok(s),
        other => Err(DocumentStoreError::InvalidFilter(format!(
            "{op:?} operator requires a string value, found {other}"
        ))),
    }
}

fn as_list(value: &Bson) -> Bson {
    match value {
        Bson::Array(_) => value.clone(),
        single => Bson::Array(vec![single.clone()]),
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            return Ok(Document::new());
        }
        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            return Ok(doc! { "$nor": [{}] });
        }
        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        // `$not` is only valid on a field; a whole sub-expression is negated with `$nor`.
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let condition = match op {
            FieldOp::Eq => doc! { "$eq": value },
            FieldOp::Ne => doc! { "$ne": value },
            FieldOp::Gt => doc! { "$gt": value },
            FieldOp::Gte => doc! { "$gte": value },
            FieldOp::Lt => doc! { "$lt": value },
            FieldOp::Lte => doc! { "$lte": value },
            FieldOp::Contains => match value {
                Bson::String(s) => doc! { "$regex": escape(s) },
                Bson::Array(items) => doc! { "$all": items },
                other => doc! { "$eq": other },
            },
            FieldOp::NotContains => match value {
                Bson::String(s) => doc! { "$not": { "$regex": escape(s) } },
                Bson::Array(items) => doc! { "$not": { "$all": items } },
                other => doc! { "$ne": other },
            },
            FieldOp::StartsWith => {
                doc! { "$regex": format!("^{}", escape(string_operand(op, value)?)) }
            }
            FieldOp::EndsWith => {
                doc! { "$regex": format!("{}$", escape(string_operand(op, value)?)) }
            }
            FieldOp::AnyOf => doc! { "$in": as_list(value) },
            FieldOp::NoneOf => doc! { "$nin": as_list(value) },
        };

        Ok(doc! { field: condition })
    }
}
