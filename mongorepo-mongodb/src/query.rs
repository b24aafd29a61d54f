//! Translation of filter expressions into MongoDB query documents.

use bson::{Bson, Document, doc};
use mongodb::options::FindOptions;

use mongorepo_core::{
    error::RecordStoreError,
    query::{Expr, FieldOp, Query, QueryVisitor, SortDirection},
};

/// Converts filter expressions into MongoDB's native query syntax.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// The filter document for a query; an absent filter matches everything.
    pub fn filter(query: &Query) -> Result<Document, RecordStoreError> {
        match &query.filter {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }

    /// Sort, skip and limit for a query.
    pub fn options(query: &Query) -> FindOptions {
        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if let Some(skip) = query.offset {
            options.skip = Some(skip as u64);
        }
        if let Some(sort) = &query.sort {
            options.sort = Some(doc! {
                sort.field.clone(): match sort.direction {
                    SortDirection::Asc => 1,
                    SortDirection::Desc => -1,
                }
            });
        }

        options
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = RecordStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    // `$not` only applies to a single field's operator; `$nor` negates a whole expression.
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
    }

    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        let condition = match op {
            FieldOp::Eq => doc! { "$eq": value.clone() },
            FieldOp::Ne => doc! { "$ne": value.clone() },
            FieldOp::Gt => doc! { "$gt": value.clone() },
            FieldOp::Gte => doc! { "$gte": value.clone() },
            FieldOp::Lt => doc! { "$lt": value.clone() },
            FieldOp::Lte => doc! { "$lte": value.clone() },
            FieldOp::AnyOf | FieldOp::NoneOf => {
                let Bson::Array(values) = value else {
                    return Err(RecordStoreError::InvalidArgument(format!(
                        "{op:?} on {field:?} needs an array of values"
                    )));
                };

                match op {
                    FieldOp::AnyOf => doc! { "$in": values.clone() },
                    _ => doc! { "$nin": values.clone() },
                }
            }
        };

        Ok(doc! { field: condition })
    }
}
