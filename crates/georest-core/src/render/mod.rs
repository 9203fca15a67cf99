//! Record serializer.
//!
//! Writes record sequences in one of the wire [`Format`]s. Output is
//! produced record by record into any [`Write`]; a [`CancelToken`] checked
//! between records lets the caller abandon the work.

mod formatter;
mod geojson;
mod plain;
mod xml;

pub use formatter::{format_value, geometry_coordinates, geometry_object, FormattedRow};
pub use plain::decode_records;

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use georest_proto::Format;
use tracing::{debug, instrument};

use crate::catalog::SchemaDescriptor;
use crate::error::Error;
use crate::storage::Record;

/// Shared flag telling long-running work to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Serialize records into a buffer.
pub fn serialize(
    records: &[Record],
    descriptor: &SchemaDescriptor,
    format: Format,
) -> Result<Bytes, Error> {
    let mut buffer = Vec::new();
    serialize_to(&mut buffer, records, descriptor, format, &CancelToken::new())?;
    Ok(Bytes::from(buffer))
}

/// Serialize records into `writer`, one record at a time.
#[instrument(skip_all, fields(table = %descriptor.qualified_name(), format = %format, records = records.len()))]
pub fn serialize_to<W: Write>(
    writer: &mut W,
    records: &[Record],
    descriptor: &SchemaDescriptor,
    format: Format,
    cancel: &CancelToken,
) -> Result<(), Error> {
    match format {
        Format::Json => plain::write(writer, records, descriptor, cancel)?,
        Format::GeoJson => geojson::write(writer, records, descriptor, cancel)?,
        Format::Xml => xml::write(writer, records, descriptor, cancel)?,
    }
    writer.flush()?;
    debug!("serialized records");
    Ok(())
}

/// Serialize a table's descriptor document.
///
/// Only `json` and `xml` are defined for descriptors.
pub fn serialize_model(descriptor: &SchemaDescriptor, format: Format) -> Result<Bytes, Error> {
    match format {
        Format::Json => serde_json::to_vec(descriptor)
            .map(Bytes::from)
            .map_err(|e| Error::Serialization(e.to_string())),
        Format::Xml => {
            let document =
                serde_json::to_value(descriptor).map_err(|e| Error::Serialization(e.to_string()))?;
            let mut buffer = Vec::new();
            xml::write_document(&mut buffer, &document)?;
            Ok(Bytes::from(buffer))
        }
        other => Err(georest_proto::Error::UnsupportedFormat(other.to_string()).into()),
    }
}

/// Serialize a record count as `{"count": n}`.
pub fn serialize_count(count: usize) -> Result<Bytes, Error> {
    serde_json::to_vec(&serde_json::json!({ "count": count }))
        .map(Bytes::from)
        .map_err(|e| Error::Serialization(e.to_string()))
}

fn for_each_record<F>(records: &[Record], cancel: &CancelToken, mut write: F) -> Result<(), Error>
where
    F: FnMut(usize, &Record) -> Result<(), Error>,
{
    for (index, record) in records.iter().enumerate() {
        if cancel.is_cancelled() {
            debug!(written = index, "serialization cancelled");
            return Err(Error::Cancelled);
        }
        write(index, record)?;
    }
    Ok(())
}
