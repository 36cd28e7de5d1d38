//! Filter expressions and find options.
//!
//! Filters are built as a small expression tree ([`Expr`]) that every driver translates
//! into its native form through the [`QueryVisitor`] trait. [`FindOptions`] carries the
//! limit, skip, sort and projection of a multi-document find.
//!
//! # Example
//!
//! ```ignore
//! use doclink::query::{Filter, FindOptions, Projection, SortDirection};
//!
//! let filter = Filter::eq("status", "active").and(Filter::gte("age", 18));
//! let options = FindOptions::builder()
//!     .sort("created_at", SortDirection::Desc)
//!     .skip(20)
//!     .limit(10)
//!     .projection(Projection::include(["name", "email"]))
//!     .build();
//! ```
//!
//! # Filter helpers
//!
//! - Comparison: `eq`, `ne`, `gt`, `gte`, `lt`, `lte`
//! - String: `starts_with`, `ends_with`, `contains`, `not_contains`
//! - Existence: `exists`, `not_exists`
//! - Membership: `any_of`, `none_of`
//! - Logical: `and`, `or`, plus [`Expr::not`]
//!
//! Field names may use dotted paths (`"address.city"`) to reach into nested documents.

use bson::{Bson, Document};

use crate::error::DocumentStoreError;

/// Sort direction for find results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One sort key: a field and its direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

/// Field comparison operators.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Substring match on strings, element match on arrays.
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    /// Field (or any element of an array field) equals one of the given values.
    AnyOf,
    /// Field (and every element of an array field) equals none of the given values.
    NoneOf,
}

/// A filter expression tree.
///
/// Build leaves with [`Filter`] and combine them with [`Expr::and`], [`Expr::or`] and
/// [`Expr::not`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Every sub-expression must match.
    And(Vec<Expr>),
    /// At least one sub-expression must match.
    Or(Vec<Expr>),
    Not(Box<Expr>),
    /// The field is present (`true`) or absent (`false`).
    Exists(String, bool),
    Field {
        field: String,
        op: FieldOp,
        value: Bson,
    },
}

impl Expr {
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Conjunction with `other`, flattening into an existing `And`.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Disjunction with `other`, flattening into an existing `Or`.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }
}

/// Constructors for filter leaves.
///
/// Field names accept anything `Into<String>`, values anything `Into<Bson>`, including
/// [`DocumentId`](crate::id::DocumentId).
pub struct Filter;

impl Filter {
    /// Matches every document.
    ///
    /// An empty conjunction, so it composes with [`Expr::and`] and [`Expr::or`] like any
    /// other leaf. Drivers treat it the same as passing `None` as the filter.
    pub fn all() -> Expr {
        Expr::And(Vec::new())
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Ne, value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gt, value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gte, value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lt, value.into())
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lte, value.into())
    }

    pub fn starts_with(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::StartsWith, value.into())
    }

    pub fn ends_with(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::EndsWith, value.into())
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Contains, value.into())
    }

    pub fn not_contains(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::NotContains, value.into())
    }

    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), true)
    }

    pub fn not_exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), false)
    }

    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }

    pub fn any_of(field: impl Into<String>, values: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::AnyOf, values.into())
    }

    pub fn none_of(field: impl Into<String>, values: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::NoneOf, values.into())
    }
}

/// Field selection applied to find results.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Return only these fields (plus `_id`).
    Include(Vec<String>),
    /// Return every field except these.
    Exclude(Vec<String>),
}

impl Projection {
    pub fn include<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Projection::Include(fields.into_iter().map(Into::into).collect())
    }

    pub fn exclude<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Projection::Exclude(fields.into_iter().map(Into::into).collect())
    }

    /// Renders the projection in the `{ field: 1 | 0 }` form document stores expect.
    pub fn to_document(&self) -> Document {
        match self {
            Projection::Include(fields) => fields.iter().map(|f| (f.clone(), Bson::Int32(1))).collect(),
            Projection::Exclude(fields) => fields.iter().map(|f| (f.clone(), Bson::Int32(0))).collect(),
        }
    }
}

/// Options for a multi-document find.
///
/// Sort keys apply in the order they were added.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Maximum number of documents returned. `None` and `Some(0)` both mean no limit.
    pub limit: Option<usize>,
    pub skip: Option<usize>,
    pub sort: Vec<Sort>,
    pub projection: Option<Projection>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> FindOptionsBuilder {
        FindOptionsBuilder::default()
    }
}

/// Fluent builder for [`FindOptions`].
#[derive(Debug, Clone, Default)]
pub struct FindOptionsBuilder {
    options: FindOptions,
}

impl FindOptionsBuilder {
    /// Caps the number of documents returned. A limit of zero clears the cap.
    pub fn limit(mut self, limit: usize) -> Self {
        self.options.limit = (limit > 0).then_some(limit);
        self
    }

    /// Skips the first `skip` matching documents.
    pub fn skip(mut self, skip: usize) -> Self {
        self.options.skip = Some(skip);
        self
    }

    /// Appends a sort key. Earlier keys take precedence.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.options.sort.push(Sort { field: field.into(), direction });
        self
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.options.projection = Some(projection);
        self
    }

    pub fn build(self) -> FindOptions {
        self.options
    }
}

/// Walks an [`Expr`] tree, producing a driver-specific output per node.
pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_and_flattens() {
        let expr = Filter::eq("a", 1).and(Filter::eq("b", 2)).and(Filter::eq("c", 3));
        match expr {
            Expr::And(list) => assert_eq!(list.len(), 3),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn test_or_wraps_non_or() {
        let expr = Filter::and([Filter::eq("a", 1)]).or(Filter::eq("b", 2));
        match expr {
            Expr::Or(list) => {
                assert_eq!(list.len(), 2);
                assert!(matches!(list[0], Expr::And(_)));
            }
            other => panic!("expected Or, got {other:?}"),
        }
    }

    #[test]
    fn test_builder_keeps_sort_order() {
        let options = FindOptions::builder()
            .sort("last", SortDirection::Asc)
            .sort("first", SortDirection::Desc)
            .limit(5)
            .skip(10)
            .build();

        assert_eq!(options.limit, Some(5));
        assert_eq!(options.skip, Some(10));
        assert_eq!(
            options.sort.iter().map(|s| s.field.as_str()).collect::<Vec<_>>(),
            vec!["last", "first"]
        );
        assert_eq!(options.sort[1].direction, SortDirection::Desc);
        assert!(options.projection.is_none());
    }

    #[test]
    fn test_zero_limit_clears_cap() {
        assert_eq!(FindOptions::builder().limit(0).build().limit, None);
        assert_eq!(FindOptions::builder().limit(3).limit(0).build().limit, None);
    }

    #[test]
    fn test_projection_document() {
        assert_eq!(Projection::include(["name", "age"]).to_document(), doc! { "name": 1, "age": 1 });
        assert_eq!(Projection::exclude(["secret"]).to_document(), doc! { "secret": 0 });
    }

    #[test]
    fn test_filter_all_composes() {
        assert_eq!(Filter::all(), Expr::And(Vec::new()));

        match Filter::all().and(Filter::eq("a", 1)) {
            Expr::And(list) => assert_eq!(list, vec![Filter::eq("a", 1)]),
            other => panic!("expected And, got {other:?}"),
        }

        let filter: Option<Expr> = Filter::all().into();
        assert!(filter.is_some());
    }
}
