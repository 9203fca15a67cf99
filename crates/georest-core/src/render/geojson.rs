//! Feature encoding: a GeoJSON `FeatureCollection`.
//!
//! Each record becomes one feature. The first geometry column is the
//! feature geometry; the other geometry columns are not exposed.

use std::io::Write;

use serde::Serialize;
use serde_json::Value as Json;

use super::formatter::{geometry_object, FormattedRow};
use super::{for_each_record, CancelToken};
use crate::catalog::SchemaDescriptor;
use crate::error::Error;
use crate::storage::Record;

#[derive(Serialize)]
struct Feature<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    geometry: Json,
    properties: FormattedRow<'a>,
}

/// Write records as a feature collection.
pub(crate) fn write<W: Write>(
    writer: &mut W,
    records: &[Record],
    descriptor: &SchemaDescriptor,
    cancel: &CancelToken,
) -> Result<(), Error> {
    let geometry_column = descriptor.first_geometry_column();

    writer.write_all(br#"{"type":"FeatureCollection","features":["#)?;
    for_each_record(records, cancel, |index, record| {
        if index > 0 {
            writer.write_all(b",")?;
        }

        let geometry = match geometry_column {
            Some(column) => geometry_object(record.get_field(&column.name), &column.name)
                .map_err(|e| e.with_record(record.key_text(descriptor)))?,
            None => Json::Null,
        };
        let feature = Feature {
            kind: "Feature",
            geometry,
            properties: FormattedRow::new(record, descriptor, |c| !c.is_geometry())?,
        };
        serde_json::to_writer(&mut *writer, &feature)
            .map_err(|e| Error::Serialization(e.to_string()))
    })?;
    writer.write_all(b"]}")?;
    Ok(())
}
