//! Canonical in-memory representation of query output.
//!
//! Every query backend hands results to the protocol layer in this one
//! shape; the wire encoders in [`protocol`](crate::protocol) are all
//! projections of it. Column order and row order are significant, and a
//! cell is either a UTF-8 string or SQL NULL.

/// Tabular query output: ordered column names plus ordered rows of
/// nullable string cells.
///
/// Constructed fresh for each request and dropped once the response has
/// been written; nothing here outlives a single exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabularResult {
    /// Column names, in select order. Uniqueness is not required.
    pub columns: Vec<String>,
    /// Row-major cell values; `None` is SQL NULL.
    pub rows: Vec<Vec<Option<String>>>,
}

impl TabularResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { columns, rows }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_reflect_shape() {
        let result = TabularResult::new(
            vec!["id".to_string(), "name".to_string()],
            vec![
                vec![Some("1".to_string()), None],
                vec![Some("2".to_string()), Some("two".to_string())],
            ],
        );

        assert_eq!(result.column_count(), 2);
        assert_eq!(result.row_count(), 2);
    }

    #[test]
    fn default_is_empty() {
        let result = TabularResult::default();
        assert_eq!(result.column_count(), 0);
        assert_eq!(result.row_count(), 0);
    }
}
