//! Filter evaluation for in-memory documents.
//!
//! Follows the MongoDB matching rules the repository layer relies on: equality
//! also matches array elements, `Ne`/`NoneOf` match documents missing the field,
//! range operators never match across types, and sorting uses the BSON type order.

use bson::{Bson, DateTime, Document, oid::ObjectId};
use std::{cmp::Ordering, collections::HashMap};

use mongorepo_core::{
    error::RecordStoreError,
    query::{Expr, FieldOp, QueryVisitor},
};

/// Comparable view over a BSON value.
///
/// Integers and doubles are normalized to `f64`.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Number(f64),
    String(&'a str),
    Map(HashMap<&'a str, Comparable<'a>>),
    Array(Vec<Comparable<'a>>),
    ObjectId(ObjectId),
    Bool(bool),
    DateTime(DateTime),
    /// Types the evaluator does not compare (binary, regex, ...).
    Opaque,
}

impl<'a> Comparable<'a> {
    /// Position in the BSON cross-type sort order.
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Number(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::ObjectId(_) => 5,
            Comparable::Bool(_) => 6,
            Comparable::DateTime(_) => 7,
            Comparable::Opaque => 8,
        }
    }

    /// Total order used for sorting: type rank first, then value.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.partial_cmp(other).unwrap_or(Ordering::Equal))
    }
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
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
            _ => Comparable::Opaque,
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

/// Resolves a dotted path (`"address.city"`) inside a document.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }

    Some(current)
}

/// Equality with array-element matching: `{ tags: "a" }` matches `tags: ["a", "b"]`.
fn matches_eq(field_value: &Bson, value: &Bson) -> bool {
    let field = Comparable::from(field_value);
    let value = Comparable::from(value);

    if field == value {
        return true;
    }

    match field {
        Comparable::Array(items) => items.iter().any(|item| item == &value),
        _ => false,
    }
}

fn candidates(value: &Bson) -> &[Bson] {
    match value {
        Bson::Array(values) => values.as_slice(),
        other => std::slice::from_ref(other),
    }
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<bool, RecordStoreError> {
        self.visit_expr(expr)
    }

    pub fn matches(document: &Document, expr: &Expr) -> Result<bool, RecordStoreError> {
        DocumentEvaluator::new(document).evaluate(expr)
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = RecordStoreError;

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

    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error> {
        Ok(lookup(self.document, field).is_some() == should_exist)
    }

    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        if matches!(op, FieldOp::AnyOf | FieldOp::NoneOf) && !matches!(value, Bson::Array(_)) {
            return Err(RecordStoreError::InvalidArgument(format!(
                "{op:?} on {field:?} needs an array of values"
            )));
        }

        let Some(field_value) = lookup(self.document, field) else {
            // Missing fields only satisfy negative operators and equality with null.
            return Ok(match op {
                FieldOp::Ne | FieldOp::NoneOf => true,
                FieldOp::Eq => matches!(value, Bson::Null),
                _ => false,
            });
        };

        Ok(match op {
            FieldOp::Eq => matches_eq(field_value, value),
            FieldOp::Ne => !matches_eq(field_value, value),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                match Comparable::from(field_value).partial_cmp(&Comparable::from(value)) {
                    Some(ordering) => match op {
                        FieldOp::Gt => ordering == Ordering::Greater,
                        FieldOp::Gte => ordering != Ordering::Less,
                        FieldOp::Lt => ordering == Ordering::Less,
                        _ => ordering != Ordering::Greater,
                    },
                    None => false,
                }
            }
            FieldOp::AnyOf => candidates(value)
                .iter()
                .any(|candidate| matches_eq(field_value, candidate)),
            FieldOp::NoneOf => !candidates(value)
                .iter()
                .any(|candidate| matches_eq(field_value, candidate)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use mongorepo_core::query::Filter;

    fn person() -> Document {
        doc! {
            "_id": ObjectId::parse_str("6553f1c2a1b2c3d4e5f60718").unwrap(),
            "name": "Alice",
            "age": 31,
            "tags": ["admin", "ops"],
            "address": { "city": "Oslo" },
        }
    }

    fn check(expr: Expr) -> bool {
        DocumentEvaluator::matches(&person(), &expr).unwrap()
    }

    #[test]
    fn object_id_equality() {
        let oid = ObjectId::parse_str("6553f1c2a1b2c3d4e5f60718").unwrap();

        assert!(check(Filter::id(oid)));
        assert!(!check(Filter::id(ObjectId::new())));
        assert!(!check(Filter::eq("_id", oid.to_hex())));
    }

    #[test]
    fn numbers_compare_across_widths() {
        assert!(check(Filter::eq("age", 31i64)));
        assert!(check(Filter::gte("age", 31.0)));
        assert!(!check(Filter::gt("age", 31)));
        assert!(!check(Filter::lt("age", "40")));
    }

    #[test]
    fn arrays_match_by_element() {
        assert!(check(Filter::eq("tags", "ops")));
        assert!(check(Filter::any_of("tags", ["dev", "admin"])));
        assert!(check(Filter::none_of("name", ["Bob", "Carol"])));
        assert!(!check(Filter::ne("tags", "admin")));
    }

    #[test]
    fn missing_fields() {
        assert!(check(Filter::ne("nickname", "Al")));
        assert!(check(Filter::eq("nickname", Bson::Null)));
        assert!(!check(Filter::gt("nickname", 1)));
        assert!(check(Filter::not_exists("nickname")));
    }

    #[test]
    fn dotted_paths_and_logic() {
        assert!(check(Filter::eq("address.city", "Oslo")));
        assert!(check(Filter::exists("address.city").and(Filter::eq("name", "Alice"))));
        assert!(check(Filter::eq("name", "Bob").or(Filter::eq("age", 31))));
        assert!(!check(Filter::eq("name", "Alice").not()));
    }

    #[test]
    fn set_operators_need_arrays() {
        let expr = Expr::field("name".into(), FieldOp::AnyOf, Bson::String("Alice".into()));

        assert!(matches!(
            DocumentEvaluator::matches(&person(), &expr),
            Err(RecordStoreError::InvalidArgument(_))
        ));
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
