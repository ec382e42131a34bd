use std::fmt;

use crate::core::Value;

pub type Row = Vec<Value>;

/// Column names plus rows of dynamically typed values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Cell `column` of row `row`, by column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.columns.is_empty() {
            return write!(f, "Empty result set");
        }

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.len()).collect();
        for row in &self.rows {
            for (i, value) in row.iter().enumerate().take(widths.len()) {
                widths[i] = widths[i].max(value.to_string().len());
            }
        }

        let header: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{:width$}", col, width = widths[i]))
            .collect();
        writeln!(f, "{}", header.join(" | "))?;

        let separator: String = widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-");
        writeln!(f, "{}", separator)?;

        for row in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .take(widths.len())
                .map(|(i, val)| format!("{:width$}", val.to_string(), width = widths[i]))
                .collect();
            writeln!(f, "{}", cells.join(" | "))?;
        }

        write!(f, "\n{} row(s)", self.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes() -> QueryResult {
        QueryResult::new(
            vec!["table_name".into(), "total_bytes".into()],
            vec![
                vec![Value::from("orders"), Value::Integer(16384)],
                vec![Value::from("shop_10"), Value::Integer(8192)],
            ],
        )
    }

    #[test]
    fn test_get_by_column_name() {
        let result = sizes();
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.get(1, "TOTAL_BYTES"), Some(&Value::Integer(8192)));
        assert_eq!(result.get(0, "missing"), None);
        assert_eq!(result.get(5, "table_name"), None);
    }

    #[test]
    fn test_render_table() {
        let rendered = sizes().to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "table_name | total_bytes");
        assert_eq!(lines[1], "-----------+------------");
        assert_eq!(lines[2], "orders     | 16384      ");
        assert!(rendered.ends_with("2 row(s)"));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(QueryResult::empty().to_string(), "Empty result set");
    }
}
