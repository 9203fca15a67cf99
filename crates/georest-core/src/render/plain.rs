//! Plain record encoding: a JSON array of objects keyed by column name.

use std::io::Write;

use georest_proto::Value;
use serde_json::Value as Json;

use super::formatter::FormattedRow;
use super::{for_each_record, CancelToken};
use crate::catalog::SchemaDescriptor;
use crate::error::Error;
use crate::query::value_codec::coerce;
use crate::storage::Record;

/// Write records as a JSON array.
pub(crate) fn write<W: Write>(
    writer: &mut W,
    records: &[Record],
    descriptor: &SchemaDescriptor,
    cancel: &CancelToken,
) -> Result<(), Error> {
    writer.write_all(b"[")?;
    for_each_record(records, cancel, |index, record| {
        if index > 0 {
            writer.write_all(b",")?;
        }
        let row = FormattedRow::new(record, descriptor, |_| true)?;
        serde_json::to_writer(&mut *writer, &row).map_err(|e| Error::Serialization(e.to_string()))
    })?;
    writer.write_all(b"]")?;
    Ok(())
}

/// Read plain-encoded records back.
///
/// Scalar columns are decoded to the column's type. Geometry and
/// relationship columns are left out.
pub fn decode_records(bytes: &[u8], descriptor: &SchemaDescriptor) -> Result<Vec<Record>, Error> {
    let rows: Vec<serde_json::Map<String, Json>> =
        serde_json::from_slice(bytes).map_err(|e| Error::Deserialization(e.to_string()))?;

    rows.iter()
        .map(|row| {
            let mut record = Record::new();
            for column in descriptor.columns() {
                if column.is_geometry() || column.is_collection_valued {
                    continue;
                }
                let value = match row.get(&column.name) {
                    Some(json) => coerce(column, json).map_err(|reason| {
                        Error::Deserialization(format!("{}: {}", column.name, reason))
                    })?,
                    None => Value::Null,
                };
                record.set(column.name.clone(), value);
            }
            Ok(record)
        })
        .collect()
}
