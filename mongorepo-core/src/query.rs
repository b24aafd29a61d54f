//! Filter expressions and queries for finding records.
//!
//! Filters are a small backend-neutral AST. The MongoDB backend translates it into a
//! query document; the in-memory backend evaluates it directly. Both go through
//! [`QueryVisitor`].
//!
//! ```ignore
//! use mongorepo::query::{Filter, Query, SortDirection};
//!
//! let adults = Filter::gte("age", 18).and(Filter::eq("active", true));
//!
//! let query = Query::builder()
//!     .filter(adults)
//!     .sort("name", SortDirection::Asc)
//!     .limit(20)
//!     .build();
//! ```

use bson::{Bson, oid::ObjectId};

use crate::{
    error::{RecordStoreError, RecordStoreResult},
    id::{ID_FIELD, RecordId, parse_object_id},
};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Sort specification: which field, which direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

/// Field comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Field equals one of the values in an array.
    AnyOf,
    /// Field equals none of the values in an array.
    NoneOf,
}

/// A filter expression selecting zero or more documents.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// All expressions must match.
    And(Vec<Expr>),
    /// At least one expression must match.
    Or(Vec<Expr>),
    /// Inverts the inner expression.
    Not(Box<Expr>),
    /// The field is present (`true`) or absent (`false`).
    Exists(String, bool),
    /// Compare a field against a value.
    Field {
        field: String,
        op: FieldOp,
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// An existing AND list is extended rather than nested.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    ///
    /// An existing OR list is extended rather than nested.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    /// Negates this expression.
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }
}

/// A filter plus result shaping: limit, offset and sort.
///
/// Any [`Expr`] converts into a `Query` with no limit, so repository methods accept
/// either.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Option<Expr>,
    /// Maximum number of results; `Some(0)` means no limit, as in MongoDB.
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub sort: Option<Sort>,
}

impl Query {
    /// A query matching every document in a collection.
    pub fn all() -> Self {
        Query::default()
    }

    /// Creates a new query builder.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }
}

impl From<Expr> for Query {
    fn from(filter: Expr) -> Self {
        Query {
            filter: Some(filter),
            ..Query::default()
        }
    }
}

/// Constructors for filter expressions.
pub struct Filter;

impl Filter {
    /// Matches the document whose `_id` is the given ObjectId.
    pub fn id(id: ObjectId) -> Expr {
        Expr::field(ID_FIELD.to_string(), FieldOp::Eq, Bson::ObjectId(id))
    }

    /// Matches the document whose `_id` equals the given hex string.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::InvalidArgument`] if `hex` is not a valid ObjectId.
    pub fn id_hex(hex: &str) -> RecordStoreResult<Expr> {
        Ok(Filter::id(parse_object_id(hex)?))
    }

    /// Matches the document stored under a record's identifier.
    ///
    /// # Errors
    ///
    /// Fails when the identifier is unassigned or malformed.
    pub fn record_id<I: RecordId>(id: &I) -> Result<Expr, RecordStoreError> {
        Ok(Filter::id(id.to_object_id()?))
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

    /// Matches documents whose field equals any of `values`.
    pub fn any_of(
        field: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<Bson>>,
    ) -> Expr {
        Expr::field(
            field.into(),
            FieldOp::AnyOf,
            Bson::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Matches documents whose field equals none of `values`.
    pub fn none_of(
        field: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<Bson>>,
    ) -> Expr {
        Expr::field(
            field.into(),
            FieldOp::NoneOf,
            Bson::Array(values.into_iter().map(Into::into).collect()),
        )
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
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    pub fn filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(filter);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.query.offset = Some(offset);
        self
    }

    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort = Some(Sort { field: field.into(), direction });
        self
    }

    pub fn build(self) -> Query {
        self.query
    }
}

/// Walks an [`Expr`] tree; implemented by each backend.
pub trait QueryVisitor {
    type Output;
    type Error: Into<RecordStoreError>;

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
    use crate::id::HexId;

    #[test]
    fn and_flattens_chained_calls() {
        let expr = Filter::eq("a", 1).and(Filter::eq("b", 2)).and(Filter::eq("c", 3));

        match expr {
            Expr::And(list) => assert_eq!(list.len(), 3),
            other => panic!("expected AND, got {other:?}"),
        }
    }

    #[test]
    fn id_filters_agree() {
        let oid = ObjectId::new();

        assert_eq!(Filter::id_hex(&oid.to_hex()).unwrap(), Filter::id(oid));
        assert_eq!(Filter::record_id(&HexId::from(oid)).unwrap(), Filter::id(oid));
        assert!(matches!(
            Filter::id_hex("nope"),
            Err(RecordStoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn expressions_convert_into_unbounded_queries() {
        let query: Query = Filter::exists("name").into();

        assert_eq!(query.filter, Some(Expr::Exists("name".into(), true)));
        assert_eq!(query.limit, None);
        assert_eq!(Query::all().filter, None);
    }

    #[test]
    fn builder_sets_every_part() {
        let query = Query::builder()
            .filter(Filter::any_of("tag", ["a", "b"]))
            .limit(5)
            .offset(10)
            .sort("tag", SortDirection::Desc)
            .build();

        assert_eq!(query.limit, Some(5));
        assert_eq!(query.offset, Some(10));
        assert_eq!(
            query.sort,
            Some(Sort { field: "tag".into(), direction: SortDirection::Desc })
        );
        assert!(matches!(
            query.filter,
            Some(Expr::Field {
                op: FieldOp::AnyOf,
                value: Bson::Array(ref values),
                ..
            }) if values.len() == 2
        ));
    }
}
