//! Sort and paging parameters.

use std::fmt;

use crate::catalog::SchemaDescriptor;
use crate::error::Error;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    /// Parse a direction, case-insensitively.
    ///
    /// Accepts `asc`/`ascending` and `desc`/`descending`.
    pub fn parse(text: &str) -> Result<Self, Error> {
        match text.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(OrderDirection::Asc),
            "desc" | "descending" => Ok(OrderDirection::Desc),
            _ => Err(Error::InvalidDirection(text.to_string())),
        }
    }

    /// SQL keyword.
    pub fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    /// Column to sort on.
    pub column: String,
    /// Direction.
    pub direction: OrderDirection,
}

impl SortSpec {
    /// Create a sort key.
    pub fn new(column: impl Into<String>, direction: OrderDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    /// Build a sort key from `order_by` and `direction` parameters.
    ///
    /// Empty parameters count as absent. The column must exist and hold
    /// scalar values.
    pub fn from_params(
        descriptor: &SchemaDescriptor,
        order_by: Option<&str>,
        direction: Option<&str>,
    ) -> Result<Option<Self>, Error> {
        let order_by = order_by.filter(|s| !s.is_empty());
        let direction = direction.filter(|s| !s.is_empty());

        let column = match (order_by, direction) {
            (None, None) => return Ok(None),
            (None, Some(_)) => return Err(Error::DirectionWithoutOrder),
            (Some(column), _) => column,
        };

        match descriptor.column(column) {
            Some(c) if !c.is_collection_valued => {}
            _ => return Err(Error::UnknownSortColumn(column.to_string())),
        }

        let direction = direction
            .map(OrderDirection::parse)
            .transpose()?
            .unwrap_or_default();
        Ok(Some(Self::new(column, direction)))
    }
}

/// Offset and limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    /// Records to skip.
    pub offset: u64,
    /// Maximum records to return.
    pub limit: u64,
}

impl Paging {
    /// Create paging.
    pub fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// Build paging from `offset` and `limit` parameters.
    ///
    /// Each given parameter must be a non-negative integer. Paging applies
    /// only when both are given.
    pub fn from_params(offset: Option<&str>, limit: Option<&str>) -> Result<Option<Self>, Error> {
        let offset = parse_param("offset", offset)?;
        let limit = parse_param("limit", limit)?;
        Ok(match (offset, limit) {
            (Some(offset), Some(limit)) => Some(Self::new(offset, limit)),
            _ => None,
        })
    }

    /// Apply to a vector of rows.
    pub fn apply<T>(&self, rows: &mut Vec<T>) {
        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);

        if offset >= rows.len() {
            rows.clear();
            return;
        }
        rows.drain(0..offset);
        rows.truncate(limit);
    }
}

fn parse_param(param: &'static str, value: Option<&str>) -> Result<Option<u64>, Error> {
    match value.filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(text) => text
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| Error::InvalidPaging {
                param,
                value: text.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{describe, Cardinality, RawColumn, RawRelationship, TableMetadata};

    fn descriptor() -> SchemaDescriptor {
        describe(
            &TableMetadata::new("public", "t")
                .with_column(RawColumn::new("id", "INTEGER").primary_key())
                .with_relationship(RawRelationship::new("items", "item", Cardinality::OneToMany)),
        )
        .unwrap()
    }

    #[test]
    fn test_direction_vocabulary() {
        assert_eq!(OrderDirection::parse("ASC").unwrap(), OrderDirection::Asc);
        assert_eq!(OrderDirection::parse("ascending").unwrap(), OrderDirection::Asc);
        assert_eq!(OrderDirection::parse("Desc").unwrap(), OrderDirection::Desc);
        assert_eq!(OrderDirection::parse("DESCENDING").unwrap(), OrderDirection::Desc);
        assert!(matches!(
            OrderDirection::parse("up"),
            Err(Error::InvalidDirection(d)) if d == "up"
        ));
    }

    #[test]
    fn test_sort_from_params() {
        let descriptor = descriptor();

        assert_eq!(SortSpec::from_params(&descriptor, None, None).unwrap(), None);
        assert_eq!(
            SortSpec::from_params(&descriptor, Some("id"), None).unwrap(),
            Some(SortSpec::new("id", OrderDirection::Asc))
        );
        assert_eq!(
            SortSpec::from_params(&descriptor, Some("id"), Some("desc")).unwrap(),
            Some(SortSpec::new("id", OrderDirection::Desc))
        );
        assert!(matches!(
            SortSpec::from_params(&descriptor, None, Some("desc")),
            Err(Error::DirectionWithoutOrder)
        ));
        assert!(matches!(
            SortSpec::from_params(&descriptor, Some("nope"), None),
            Err(Error::UnknownSortColumn(_))
        ));
        assert!(matches!(
            SortSpec::from_params(&descriptor, Some("items"), None),
            Err(Error::UnknownSortColumn(_))
        ));
        assert!(matches!(
            SortSpec::from_params(&descriptor, Some("id"), Some("sideways")),
            Err(Error::InvalidDirection(_))
        ));
    }

    #[test]
    fn test_paging_from_params() {
        assert_eq!(
            Paging::from_params(Some("10"), Some("5")).unwrap(),
            Some(Paging::new(10, 5))
        );
        assert_eq!(Paging::from_params(Some("10"), None).unwrap(), None);
        assert_eq!(Paging::from_params(None, Some("5")).unwrap(), None);
        assert!(matches!(
            Paging::from_params(Some("-1"), Some("5")),
            Err(Error::InvalidPaging { param: "offset", .. })
        ));
        assert!(matches!(
            Paging::from_params(None, Some("ten")),
            Err(Error::InvalidPaging { param: "limit", .. })
        ));
    }

    #[test]
    fn test_paging_apply() {
        let mut rows: Vec<u32> = (0..10).collect();
        Paging::new(2, 3).apply(&mut rows);
        assert_eq!(rows, vec![2, 3, 4]);

        let mut rows: Vec<u32> = (0..3).collect();
        Paging::new(5, 3).apply(&mut rows);
        assert!(rows.is_empty());

        let mut rows: Vec<u32> = (0..3).collect();
        Paging::new(1, 0).apply(&mut rows);
        assert!(rows.is_empty());
    }
}
