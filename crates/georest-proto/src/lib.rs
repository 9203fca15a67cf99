//! georest wire types.
//!
//! This crate defines the values and requests that cross the HTTP boundary
//! of a georest service. It has no knowledge of any store.
//!
//! # Modules
//!
//! - [`value`] - Runtime values read from records and supplied in filters
//! - [`filter`] - The nested filter request (`Clause` / `Block` tree)
//! - [`format`] - Response format selection
//! - [`error`] - Protocol error types
//!
//! # Filter requests
//!
//! ```
//! use georest_proto::FilterNode;
//!
//! let body = serde_json::json!({
//!     "mode": "AND",
//!     "clauses": [{"column_name": "status", "operator": "=", "value": "A"}]
//! });
//! let node = FilterNode::from_json(&body).unwrap();
//! assert!(node.is_block());
//! ```

pub mod error;
pub mod filter;
pub mod format;
pub mod value;

pub use error::Error;
pub use filter::{Block, Clause, FilterNode};
pub use format::Format;
pub use value::Value;
