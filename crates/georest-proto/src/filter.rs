//! Nested filter requests.
//!
//! A filter request is a tree whose leaves are [`Clause`]s and whose inner
//! nodes are [`Block`]s. On the wire both appear in the same `clauses` array
//! and are told apart by the presence of a `mode` key:
//!
//! ```json
//! { "mode": "AND",
//!   "clauses": [
//!     { "column_name": "status", "operator": "=", "value": "A" },
//!     { "mode": "OR", "clauses": [] }
//!   ] }
//! ```

use serde::Serialize;
use serde_json::Value as Json;

use crate::error::Error;

/// A node of the filter tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterNode {
    /// A single leaf condition.
    Clause(Clause),
    /// Child nodes combined under a mode.
    Block(Block),
}

/// A leaf condition on one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Clause {
    /// Column the condition applies to.
    pub column_name: String,
    /// Operator text as sent by the client.
    pub operator: String,
    /// Operand. Absent for operators that take none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Json>,
}

/// Child filter nodes combined with a mode (`AND` / `OR`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    /// Mode text as sent by the client.
    pub mode: String,
    /// Child nodes.
    #[serde(rename = "clauses")]
    pub children: Vec<FilterNode>,
}

impl FilterNode {
    /// Parse a filter node from its JSON form.
    ///
    /// Walked by hand rather than derived so each absent key surfaces as
    /// its own [`Error::MissingField`].
    pub fn from_json(json: &Json) -> Result<Self, Error> {
        let obj = json
            .as_object()
            .ok_or_else(|| Error::InvalidFilter(format!("expected an object, got {}", json)))?;

        if let Some(mode) = obj.get("mode") {
            let mode = mode
                .as_str()
                .ok_or_else(|| Error::InvalidFilter("mode must be a string".to_string()))?;
            let clauses = obj
                .get("clauses")
                .ok_or(Error::MissingField { field: "clauses" })?
                .as_array()
                .ok_or_else(|| Error::InvalidFilter("clauses must be an array".to_string()))?;
            let children = clauses
                .iter()
                .map(FilterNode::from_json)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(FilterNode::Block(Block {
                mode: mode.to_string(),
                children,
            }));
        }

        let column_name = required_str(obj, "column_name")?;
        let operator = required_str(obj, "operator")?;
        let value = obj.get("value").filter(|v| !v.is_null()).cloned();

        Ok(FilterNode::Clause(Clause {
            column_name,
            operator,
            value,
        }))
    }

    /// Extract the filter tree from a request body.
    ///
    /// Accepts the bare tree, `{"filter": <tree>}` and
    /// `{"filter": {"definition": <tree>}}`. An empty body or a `null`
    /// filter means no filter.
    pub fn from_request_body(body: &[u8]) -> Result<Option<Self>, Error> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let json: Json = serde_json::from_slice(body)?;

        let mut node = &json;
        if let Some(filter) = node.get("filter") {
            node = filter;
        }
        if let Some(definition) = node.get("definition") {
            node = definition;
        }
        if node.is_null() {
            return Ok(None);
        }
        Self::from_json(node).map(Some)
    }

    /// Check if this node is a block.
    pub fn is_block(&self) -> bool {
        matches!(self, FilterNode::Block(_))
    }
}

impl Clause {
    /// Create a clause.
    pub fn new(column_name: impl Into<String>, operator: impl Into<String>, value: Json) -> Self {
        Self {
            column_name: column_name.into(),
            operator: operator.into(),
            value: Some(value),
        }
    }
}

impl Block {
    /// Create a block with the given mode and children.
    pub fn new(mode: impl Into<String>, children: Vec<FilterNode>) -> Self {
        Self {
            mode: mode.into(),
            children,
        }
    }
}

impl From<Clause> for FilterNode {
    fn from(clause: Clause) -> Self {
        FilterNode::Clause(clause)
    }
}

impl From<Block> for FilterNode {
    fn from(block: Block) -> Self {
        FilterNode::Block(block)
    }
}

fn required_str(obj: &serde_json::Map<String, Json>, field: &'static str) -> Result<String, Error> {
    match obj.get(field) {
        None | Some(Json::Null) => Err(Error::MissingField { field }),
        Some(Json::String(s)) if s.is_empty() => Err(Error::MissingField { field }),
        Some(Json::String(s)) => Ok(s.clone()),
        Some(other) => Err(Error::InvalidFilter(format!(
            "{} must be a string, got {}",
            field, other
        ))),
    }
}
