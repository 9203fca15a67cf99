//! Query executor.
//!
//! Runs a [`ReadQuery`] against a table scanned through a store session:
//! filter, then sort, then page.

use std::cmp::Ordering;

use georest_proto::Value;
use tracing::{debug, error, instrument};

use super::evaluator::{compare_values, values_equal, PredicateEvaluator};
use super::params::{OrderDirection, Paging, SortSpec};
use super::predicate::Predicate;
use super::value_codec::coerce_text;
use crate::catalog::SchemaDescriptor;
use crate::error::Error;
use crate::geometry::GeometryProvider;
use crate::storage::{Record, Session};

/// A read request against one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadQuery {
    /// Records must satisfy this predicate.
    pub predicate: Option<Predicate>,
    /// Sort key.
    pub sort: Option<SortSpec>,
    /// Offset and limit.
    pub paging: Option<Paging>,
}

impl ReadQuery {
    /// Read the whole table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter records.
    pub fn with_predicate(mut self, predicate: Option<Predicate>) -> Self {
        self.predicate = predicate;
        self
    }

    /// Sort records.
    pub fn with_sort(mut self, sort: Option<SortSpec>) -> Self {
        self.sort = sort;
        self
    }

    /// Page records.
    pub fn with_paging(mut self, paging: Option<Paging>) -> Self {
        self.paging = paging;
        self
    }
}

/// Executes read queries.
pub struct QueryExecutor<'a> {
    evaluator: PredicateEvaluator<'a>,
}

impl<'a> QueryExecutor<'a> {
    /// Create an executor using `provider` for spatial predicates.
    pub fn new(provider: &'a dyn GeometryProvider) -> Self {
        Self {
            evaluator: PredicateEvaluator::new(provider),
        }
    }

    /// Run a query and materialize the matching records.
    #[instrument(skip_all, fields(table = %descriptor.qualified_name()))]
    pub fn execute(
        &self,
        session: &dyn Session,
        descriptor: &SchemaDescriptor,
        query: &ReadQuery,
    ) -> Result<Vec<Record>, Error> {
        if let Some(sort) = &query.sort {
            if descriptor.column(&sort.column).is_none() {
                return Err(Error::UnknownSortColumn(sort.column.clone()));
            }
        }

        let scanned = session.scan(descriptor)?;
        let total = scanned.len();
        let mut rows = self.filter(descriptor, scanned, query.predicate.as_ref())?;

        if let Some(sort) = &query.sort {
            sort_rows(&mut rows, sort);
        }
        if let Some(paging) = &query.paging {
            paging.apply(&mut rows);
        }

        debug!(scanned = total, returned = rows.len(), "executed read");
        Ok(rows)
    }

    /// Count the records matching an optional predicate.
    #[instrument(skip_all, fields(table = %descriptor.qualified_name()))]
    pub fn count(
        &self,
        session: &dyn Session,
        descriptor: &SchemaDescriptor,
        predicate: Option<&Predicate>,
    ) -> Result<usize, Error> {
        let scanned = session.scan(descriptor)?;
        let matched = match predicate {
            None => scanned.len(),
            Some(predicate) => {
                let mut matched = 0;
                for record in &scanned {
                    if self.matches(descriptor, predicate, record)? {
                        matched += 1;
                    }
                }
                matched
            }
        };
        Ok(matched)
    }

    /// Fetch the single record whose primary key equals `keys`.
    ///
    /// `keys` are text values in the order of the sorted primary key column
    /// names.
    #[instrument(skip_all, fields(table = %descriptor.qualified_name()))]
    pub fn find_by_primary_keys(
        &self,
        session: &dyn Session,
        descriptor: &SchemaDescriptor,
        keys: &[String],
    ) -> Result<Record, Error> {
        let names = descriptor.primary_key_column_names();
        if names.is_empty() || names.len() != keys.len() {
            return Err(Error::PrimaryKeyArity {
                expected: names.len(),
                actual: keys.len(),
            });
        }

        let mut wanted = Vec::with_capacity(keys.len());
        for (name, key) in names.iter().zip(keys) {
            let column = descriptor.column(name).ok_or_else(|| Error::UnknownColumn {
                table: descriptor.qualified_name(),
                column: name.clone(),
            })?;
            let value = coerce_text(column, key).map_err(|reason| Error::InvalidValue {
                column: name.clone(),
                value: key.clone(),
                reason,
            })?;
            wanted.push((name.as_str(), value));
        }

        let mut found: Vec<Record> = session
            .scan(descriptor)?
            .into_iter()
            .filter(|record| {
                wanted
                    .iter()
                    .all(|(name, value)| values_equal(record.get_field(name), value))
            })
            .collect();

        match found.len() {
            0 => Err(Error::NotFound(format!(
                "{} with key {}",
                descriptor.qualified_name(),
                keys.join("/")
            ))),
            1 => Ok(found.remove(0)),
            count => {
                error!(
                    table = %descriptor.qualified_name(),
                    key = %keys.join("/"),
                    count,
                    "primary key lookup matched several records"
                );
                Err(Error::MultipleResults {
                    table: descriptor.qualified_name(),
                    count,
                })
            }
        }
    }

    fn filter(
        &self,
        descriptor: &SchemaDescriptor,
        rows: Vec<Record>,
        predicate: Option<&Predicate>,
    ) -> Result<Vec<Record>, Error> {
        let Some(predicate) = predicate else {
            return Ok(rows);
        };

        let mut matched = Vec::with_capacity(rows.len());
        for record in rows {
            if self.matches(descriptor, predicate, &record)? {
                matched.push(record);
            }
        }
        Ok(matched)
    }

    fn matches(
        &self,
        descriptor: &SchemaDescriptor,
        predicate: &Predicate,
        record: &Record,
    ) -> Result<bool, Error> {
        self.evaluator
            .evaluate(predicate, record)
            .map_err(|e| e.with_record(record.key_text(descriptor)))
    }
}

/// Stable sort on one column; nulls first.
fn sort_rows(rows: &mut [Record], sort: &SortSpec) {
    rows.sort_by(|a, b| {
        let cmp = compare_for_sort(a.get_field(&sort.column), b.get_field(&sort.column));
        match sort.direction {
            OrderDirection::Asc => cmp,
            OrderDirection::Desc => cmp.reverse(),
        }
    });
}

fn compare_for_sort(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => compare_values(a, b).unwrap_or(Ordering::Equal),
    }
}
