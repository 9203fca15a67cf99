//! Core error types.

use thiserror::Error;

/// Errors raised while reading or serving a table.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed wire input.
    #[error("protocol error: {0}")]
    Protocol(#[from] georest_proto::Error),

    /// A clause whose operator needs an operand carried none.
    #[error("somewhere in the filter the value is missing (column {column}, operator {operator})")]
    MissingValue { column: String, operator: String },

    /// A clause or lookup named a column the table does not have.
    #[error("the column {column} does not exist on {table}")]
    UnknownColumn { table: String, column: String },

    /// Operator not in the dispatch table for the column kind.
    #[error("the operator {operator} is not implemented for column {column}")]
    UnsupportedOperator { operator: String, column: String },

    /// Block mode other than AND / OR.
    #[error("the mode {0} is not implemented")]
    UnsupportedMode(String),

    /// Clause value cannot be read as the column's type.
    #[error("invalid value {value} for column {column}: {reason}")]
    InvalidValue {
        column: String,
        value: String,
        reason: String,
    },

    /// Supplied WKT could not be parsed.
    #[error("invalid geometry for column {column}: {reason}")]
    InvalidGeometry { column: String, reason: String },

    /// Supplied geometry declares a CRS other than the column's.
    #[error("geometry for column {column} uses SRID {actual}, the column uses SRID {expected}")]
    SridMismatch {
        column: String,
        expected: i32,
        actual: i32,
    },

    /// Geometry comparison that fits none of the collection cases.
    #[error("geometry comparison on column {column} could not be classified")]
    UnclassifiedGeometryComparison { column: String },

    /// Sort direction outside the accepted vocabulary.
    #[error("the direction {0} is not supported, use asc or desc")]
    InvalidDirection(String),

    /// A direction was given without a column to sort on.
    #[error("direction was given without order_by")]
    DirectionWithoutOrder,

    /// Sort column not present in the table.
    #[error("cannot order by {0}: no such column")]
    UnknownSortColumn(String),

    /// Offset or limit that is not a non-negative integer.
    #[error("{param} must be a non-negative integer, got {value}")]
    InvalidPaging { param: &'static str, value: String },

    /// Number of primary key values differs from the table's key.
    #[error("the table has {expected} primary key column(s), got {actual} value(s)")]
    PrimaryKeyArity { expected: usize, actual: usize },

    /// Table not registered.
    #[error("table {schema}.{table} is not known")]
    UnknownTable { schema: String, table: String },

    /// Record not found.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Table metadata could not be described.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Geometry subtype the serializer has no encoding for.
    #[error("column {column}{} holds an unsupported geometry type {subtype}", of_record(.record))]
    UnsupportedGeometryType {
        column: String,
        subtype: String,
        record: Option<String>,
    },

    /// More than one record matched a unique key.
    #[error("{count} records found in {table} for a unique key lookup")]
    MultipleResults { table: String, count: usize },

    /// The geometry provider failed on a spatial test.
    #[error("{operator} on column {column}{} failed: {reason}", of_record(.record))]
    Geometry {
        operator: String,
        column: String,
        record: Option<String>,
        reason: String,
    },

    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Writing the response body failed.
    #[error("write error: {0}")]
    Write(#[from] std::io::Error),

    /// The caller went away before the work finished.
    #[error("request cancelled")]
    Cancelled,
}

/// Which side of the request an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request was malformed or asked for something unsupported.
    Client,
    /// The addressed table or record does not exist.
    NotFound,
    /// The service failed.
    Server,
}

impl Error {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Protocol(_)
            | Error::MissingValue { .. }
            | Error::UnknownColumn { .. }
            | Error::UnsupportedOperator { .. }
            | Error::UnsupportedMode(_)
            | Error::InvalidValue { .. }
            | Error::InvalidGeometry { .. }
            | Error::SridMismatch { .. }
            | Error::UnclassifiedGeometryComparison { .. }
            | Error::InvalidDirection(_)
            | Error::DirectionWithoutOrder
            | Error::UnknownSortColumn(_)
            | Error::InvalidPaging { .. }
            | Error::PrimaryKeyArity { .. } => ErrorKind::Client,
            Error::UnknownTable { .. } | Error::NotFound(_) => ErrorKind::NotFound,
            Error::Schema(_)
            | Error::UnsupportedGeometryType { .. }
            | Error::MultipleResults { .. }
            | Error::Geometry { .. }
            | Error::Storage(_)
            | Error::Serialization(_)
            | Error::Deserialization(_)
            | Error::Write(_)
            | Error::Cancelled => ErrorKind::Server,
        }
    }

    /// Check if the error is attributed to the client.
    pub fn is_client_error(&self) -> bool {
        self.kind() == ErrorKind::Client
    }

    /// Name the record a per-record failure happened on.
    ///
    /// Only errors that carry a record are changed, and a record already
    /// named is kept.
    pub fn with_record(mut self, key: Option<String>) -> Self {
        match &mut self {
            Error::UnsupportedGeometryType { record, .. } | Error::Geometry { record, .. } => {
                if record.is_none() {
                    *record = key;
                }
            }
            _ => {}
        }
        self
    }
}

fn of_record(record: &Option<String>) -> String {
    match record {
        Some(key) => format!(" of record [{}]", key),
        None => String::new(),
    }
}

/// Errors raised while describing a table.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A foreign key reference lacks the parts needed for a path.
    #[error("column {table}.{column} references {reference}, which cannot be resolved")]
    UnresolvedForeignKey {
        table: String,
        column: String,
        reference: String,
    },

    /// A geometry column declares no coordinate reference system.
    #[error("geometry column {table}.{column} has no SRID")]
    MissingSrid { table: String, column: String },

    /// Two columns share a name.
    #[error("column {column} is declared twice on {table}")]
    DuplicateColumn { table: String, column: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::UnsupportedMode("XOR".into()).kind(), ErrorKind::Client);
        assert_eq!(Error::NotFound("1".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::MultipleResults {
                table: "t".into(),
                count: 2
            }
            .kind(),
            ErrorKind::Server
        );
        assert!(Error::Protocol(georest_proto::Error::MissingField { field: "operator" })
            .is_client_error());
    }

    #[test]
    fn test_messages_name_the_offender() {
        let err = Error::UnsupportedOperator {
            operator: "~".into(),
            column: "name".into(),
        };
        assert_eq!(
            err.to_string(),
            "the operator ~ is not implemented for column name"
        );

        let err = Error::InvalidPaging {
            param: "limit",
            value: "ten".into(),
        };
        assert_eq!(err.to_string(), "limit must be a non-negative integer, got ten");
    }
}
