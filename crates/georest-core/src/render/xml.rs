//! XML encoding of the plain format.
//!
//! `<root>` holds one `<item>` per record with one element per column. List
//! members are `<item>` elements as well.

use std::io::Write;

use serde_json::Value as Json;

use super::formatter::FormattedRow;
use super::{for_each_record, CancelToken};
use crate::catalog::SchemaDescriptor;
use crate::error::Error;
use crate::storage::Record;

const DECLARATION: &[u8] = br#"<?xml version="1.0" encoding="UTF-8" ?>"#;

/// Write records as an XML document.
pub(crate) fn write<W: Write>(
    writer: &mut W,
    records: &[Record],
    descriptor: &SchemaDescriptor,
    cancel: &CancelToken,
) -> Result<(), Error> {
    writer.write_all(DECLARATION)?;
    writer.write_all(b"<root>")?;
    for_each_record(records, cancel, |_, record| {
        let row = FormattedRow::new(record, descriptor, |_| true)?;
        writer.write_all(b"<item>")?;
        for (name, value) in row.fields() {
            write_element(writer, name, value)?;
        }
        writer.write_all(b"</item>")?;
        Ok(())
    })?;
    writer.write_all(b"</root>")?;
    Ok(())
}

/// Write a JSON document as XML under `<root>`.
pub(crate) fn write_document<W: Write>(writer: &mut W, document: &Json) -> Result<(), Error> {
    writer.write_all(DECLARATION)?;
    write_element(writer, "root", document)
}

fn write_element<W: Write>(writer: &mut W, name: &str, value: &Json) -> Result<(), Error> {
    let name = element_name(name);
    write!(writer, "<{}>", name)?;
    write_content(writer, value)?;
    write!(writer, "</{}>", name)?;
    Ok(())
}

fn write_content<W: Write>(writer: &mut W, value: &Json) -> Result<(), Error> {
    match value {
        Json::Null => {}
        Json::Bool(b) => write!(writer, "{}", b)?,
        Json::Number(n) => write!(writer, "{}", n)?,
        Json::String(s) => writer.write_all(escape(s).as_bytes())?,
        Json::Array(items) => {
            for item in items {
                write_element(writer, "item", item)?;
            }
        }
        Json::Object(fields) => {
            for (key, item) in fields {
                write_element(writer, key, item)?;
            }
        }
    }
    Ok(())
}

/// Escape character data.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Turn a column name into a valid element name.
fn element_name(name: &str) -> String {
    let mut element: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let starts_ok = element
        .chars()
        .next()
        .map(|c| c.is_alphabetic() || c == '_')
        .unwrap_or(false);
    if !starts_ok {
        element.insert(0, '_');
    }
    element
}
