//! PostGIS rendering of compiled predicates.
//!
//! Produces parameterised SQL with `$n` placeholders. Identifiers are always
//! quoted and qualified with the schema and table.

use georest_proto::Value;

use super::evaluator::LIKE_CAST_LENGTH;
use super::params::{Paging, SortSpec};
use super::predicate::{Predicate, SpatialPredicate};
use crate::catalog::SchemaDescriptor;

/// SQL text with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    /// SQL text.
    pub sql: String,
    /// Values bound to `$1`, `$2`, ...
    pub params: Vec<Value>,
}

/// Renders predicates and selects for one table.
pub struct SqlRenderer<'a> {
    descriptor: &'a SchemaDescriptor,
}

impl<'a> SqlRenderer<'a> {
    /// Create a renderer for a table.
    pub fn new(descriptor: &'a SchemaDescriptor) -> Self {
        Self { descriptor }
    }

    /// Render a predicate as a `WHERE` condition.
    pub fn render(&self, predicate: &Predicate) -> SqlFragment {
        let mut params = Vec::new();
        let sql = self.render_node(predicate, &mut params);
        SqlFragment { sql, params }
    }

    /// Render a complete `SELECT` over the table.
    pub fn select(
        &self,
        predicate: Option<&Predicate>,
        sort: Option<&SortSpec>,
        paging: Option<Paging>,
    ) -> SqlFragment {
        let mut params = Vec::new();
        let mut sql = format!("SELECT * FROM {}", self.table());

        if let Some(predicate) = predicate {
            sql.push_str(" WHERE ");
            sql.push_str(&self.render_node(predicate, &mut params));
        }
        if let Some(sort) = sort {
            sql.push_str(&format!(
                " ORDER BY {} {}",
                self.column(&sort.column),
                sort.direction.as_sql()
            ));
        }
        if let Some(paging) = paging {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", paging.limit, paging.offset));
        }

        SqlFragment { sql, params }
    }

    /// Render a `SELECT count(*)` over the table.
    pub fn count(&self, predicate: Option<&Predicate>) -> SqlFragment {
        let mut params = Vec::new();
        let mut sql = format!("SELECT count(*) FROM {}", self.table());
        if let Some(predicate) = predicate {
            sql.push_str(" WHERE ");
            sql.push_str(&self.render_node(predicate, &mut params));
        }
        SqlFragment { sql, params }
    }

    fn render_node(&self, predicate: &Predicate, params: &mut Vec<Value>) -> String {
        match predicate {
            Predicate::And(children) => self.render_junction(children, " AND ", params),
            Predicate::Or(children) => self.render_junction(children, " OR ", params),
            Predicate::Compare { column, op, value } => {
                let placeholder = bind(params, value.clone());
                format!("{} {} {}", self.column(column), op.as_sql(), placeholder)
            }
            Predicate::Like { column, pattern } => {
                let placeholder = bind(params, Value::String(pattern.clone()));
                format!(
                    "CAST({} AS VARCHAR({})) LIKE {}",
                    self.column(column),
                    LIKE_CAST_LENGTH,
                    placeholder
                )
            }
            Predicate::In { column, values } => {
                let placeholders: Vec<String> =
                    values.iter().map(|v| bind(params, v.clone())).collect();
                format!("{} IN ({})", self.column(column), placeholders.join(", "))
            }
            Predicate::IsNull { column } => format!("{} IS NULL", self.column(column)),
            Predicate::IsNotNull { column } => format!("{} IS NOT NULL", self.column(column)),
            Predicate::Spatial(spatial) => self.render_spatial(spatial, params),
        }
    }

    fn render_junction(&self, children: &[Predicate], separator: &str, params: &mut Vec<Value>) -> String {
        let parts: Vec<String> = children
            .iter()
            .map(|child| self.render_node(child, params))
            .collect();
        format!("({})", parts.join(separator))
    }

    fn render_spatial(&self, spatial: &SpatialPredicate, params: &mut Vec<Value>) -> String {
        let mut stored = self.column(&spatial.column);
        if let Some(dimension) = spatial.stored_part {
            stored = format!("ST_CollectionExtract({}, {})", stored, dimension.code());
        }

        let placeholder = bind(params, Value::String(spatial.wkt.clone()));
        let mut supplied = format!("ST_GeomFromText({}, {})", placeholder, spatial.srid);
        if let Some(dimension) = spatial.value_part {
            supplied = format!("ST_CollectionExtract({}, {})", supplied, dimension.code());
        }

        format!("{}({}, {})", spatial.op.sql_function(), stored, supplied)
    }

    fn table(&self) -> String {
        format!(
            "{}.{}",
            quote(self.descriptor.schema_name()),
            quote(self.descriptor.table_name())
        )
    }

    fn column(&self, name: &str) -> String {
        format!("{}.{}", self.table(), quote(name))
    }
}

fn bind(params: &mut Vec<Value>, value: Value) -> String {
    params.push(value);
    format!("${}", params.len())
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}
