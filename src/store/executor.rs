use log::{debug, warn};
use rusqlite::Batch;

use crate::storage::table::Table;

use super::context::Store;
use super::conversion::statement_to_table;
use super::error::{Result, StoreError};

/// Outcome of running a SQL statement against the store.
///
/// A failed statement and one that matched nothing are both `Empty`.
#[derive(Debug, Clone)]
pub enum QueryResult {
    Rows(Table),
    Empty,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        matches!(self, QueryResult::Empty)
    }

    pub fn table(&self) -> Option<&Table> {
        match self {
            QueryResult::Rows(table) => Some(table),
            QueryResult::Empty => None,
        }
    }

    pub fn into_table(self) -> Option<Table> {
        match self {
            QueryResult::Rows(table) => Some(table),
            QueryResult::Empty => None,
        }
    }

    pub fn row_count(&self) -> usize {
        self.table().map(Table::row_count).unwrap_or(0)
    }
}

/// Runs `sql` against the store. Never fails: errors are logged and reported
/// as [`QueryResult::Empty`].
pub fn execute(store: &Store, sql: &str) -> QueryResult {
    match run(store, sql) {
        Ok(table) if table.row_count() > 0 => {
            debug!("Query returned {} row(s)", table.row_count());
            QueryResult::Rows(table)
        }
        Ok(_) => {
            debug!("Query returned no rows");
            QueryResult::Empty
        }
        Err(e) => {
            warn!("Query failed: {}", e);
            QueryResult::Empty
        }
    }
}

fn run(store: &Store, sql: &str) -> Result<Table> {
    // Blank tails (a trailing `;`, comments) yield no statement.
    let mut batch = Batch::new(store.connection(), sql);
    let mut stmt = batch
        .next()?
        .ok_or_else(|| StoreError::RejectedStatement("no statement given".to_string()))?;
    if batch.next()?.is_some() {
        return Err(StoreError::RejectedStatement(
            "only one statement may run at a time".to_string(),
        ));
    }

    // Only queries run; uploaded tables are never modified from here.
    if !stmt.readonly() {
        return Err(StoreError::RejectedStatement(
            "statement would modify the store".to_string(),
        ));
    }
    if stmt.column_count() == 0 {
        return Err(StoreError::RejectedStatement(
            "statement returns no columns".to_string(),
        ));
    }

    statement_to_table("result", &mut stmt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::table::Value;
    use crate::store::UploadedFile;

    fn sales_store() -> Store {
        let mut store = Store::new().unwrap();
        store
            .load_batch(&[UploadedFile::new(
                "sales.csv",
                b"Region,Amount\nWest,10\nEast,20\n".to_vec(),
            )])
            .unwrap();
        store
    }

    #[test]
    fn test_filtered_query() {
        let store = sales_store();
        let result = execute(&store, "SELECT * FROM sales WHERE Amount > 15");

        let table = result.table().unwrap();
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.schema.column_names(), vec!["Region", "Amount"]);
        assert_eq!(table.value(0, "Region"), Some(&Value::String("East".to_string())));
        assert_eq!(table.value(0, "Amount"), Some(&Value::Integer(20)));
    }

    #[test]
    fn test_multiple_statements_are_not_run() {
        let store = sales_store();

        assert!(execute(&store, "SELECT * FROM sales; DROP TABLE sales").is_empty());
        assert!(execute(&store, "SELECT 1; SELECT 2;").is_empty());
        assert_eq!(store.table_names().unwrap(), vec!["sales"]);
        assert_eq!(execute(&store, "SELECT * FROM sales").row_count(), 2);
    }

    #[test]
    fn test_blank_input() {
        let store = sales_store();
        assert!(execute(&store, "  ;  ").is_empty());
        assert!(execute(&store, "").is_empty());
    }

    #[test]
    fn test_trailing_comment_is_allowed() {
        let store = sales_store();
        let result = execute(&store, "SELECT * FROM sales; -- all rows\n");
        assert_eq!(result.row_count(), 2);
    }

    #[test]
    fn test_trailing_semicolon() {
        let store = sales_store();
        let result = execute(&store, "SELECT SUM(Amount) AS total FROM sales;");
        assert_eq!(result.table().unwrap().value(0, "total"), Some(&Value::Integer(30)));
    }

    #[test]
    fn test_error_looks_like_no_rows() {
        let store = sales_store();
        let invalid = execute(&store, "SELEC * FRM sales");
        let missing = execute(&store, "SELECT * FROM nowhere");
        let no_rows = execute(&store, "SELECT * FROM sales WHERE Amount > 1000");

        assert!(invalid.is_empty());
        assert!(missing.is_empty());
        assert!(no_rows.is_empty());
        assert_eq!(invalid.row_count(), no_rows.row_count());
    }

    #[test]
    fn test_modifying_statements_are_not_run() {
        let store = sales_store();

        assert!(execute(&store, "DROP TABLE sales").is_empty());
        assert!(execute(&store, "DELETE FROM sales").is_empty());
        assert_eq!(store.table_names().unwrap(), vec!["sales"]);
        assert_eq!(store.table("sales").unwrap().row_count(), 2);
    }
}
