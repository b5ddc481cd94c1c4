use log::{debug, info};
use rusqlite::{params_from_iter, Connection};

use crate::storage::csv::{table_name_for, CsvReader};
use crate::storage::table::{Table, Value};

use super::conversion::{quote_identifier, statement_to_table, value_from_sql};
use super::error::{Result, StoreError};
use super::loader::UploadedFile;

const LIST_TABLES_SQL: &str =
    "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY rowid";

/// A column as the store declares it.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
}

/// In-memory SQLite database holding the most recently uploaded batch of
/// tables.
pub struct Store {
    conn: Connection,
    reader: CsvReader,
}

impl Store {
    pub fn new() -> Result<Self> {
        Self::with_reader(CsvReader::new())
    }

    pub fn with_reader(reader: CsvReader) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn, reader })
    }

    /// Replaces the store's contents with one table per uploaded file.
    ///
    /// Every existing table is dropped first. Files that map to the same
    /// table name overwrite each other in upload order. Parse errors abort
    /// the batch and are returned unchanged.
    pub fn load_batch(&mut self, files: &[UploadedFile]) -> Result<Vec<String>> {
        self.drop_all_tables()?;

        for file in files {
            let table_name = table_name_for(&file.name);
            if table_name.is_empty() {
                return Err(StoreError::InvalidTableName(file.name.clone()));
            }

            debug!("Parsing {} ({} bytes)", file.name, file.content.len());
            let table = self.reader.read_from_reader(file.content.as_slice(), table_name)?;
            self.create_table(&table)?;
        }

        let tables = self.table_names()?;
        info!("Loaded {} table(s) from {} file(s)", tables.len(), files.len());
        Ok(tables)
    }

    /// Creates (or recreates) a table and inserts all of its rows.
    pub fn create_table(&mut self, table: &Table) -> Result<()> {
        let name = quote_identifier(&table.name);
        let columns: Vec<String> = table
            .schema
            .columns
            .iter()
            .map(|c| format!("{} {}", quote_identifier(&c.name), c.data_type.declared_type()))
            .collect();
        let placeholders = vec!["?"; columns.len()].join(", ");

        let tx = self.conn.transaction()?;
        tx.execute(&format!("DROP TABLE IF EXISTS {}", name), [])?;
        tx.execute(&format!("CREATE TABLE {} ({})", name, columns.join(", ")), [])?;
        {
            let mut stmt = tx.prepare(&format!("INSERT INTO {} VALUES ({})", name, placeholders))?;
            for row in &table.rows {
                stmt.execute(params_from_iter(row.values.iter()))?;
            }
        }
        tx.commit()?;

        debug!(
            "Created table {} with {} column(s) and {} row(s)",
            table.name,
            table.column_count(),
            table.row_count()
        );
        Ok(())
    }

    pub fn drop_all_tables(&mut self) -> Result<()> {
        let tables = self.table_names()?;
        for table in &tables {
            self.conn
                .execute(&format!("DROP TABLE IF EXISTS {}", quote_identifier(table)), [])?;
        }
        if !tables.is_empty() {
            debug!("Dropped {} table(s)", tables.len());
        }
        Ok(())
    }

    /// Table names in creation order.
    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(LIST_TABLES_SQL)?;
        let tables = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(tables)
    }

    pub fn table_count(&self) -> Result<usize> {
        Ok(self.table_names()?.len())
    }

    pub fn columns(&self, table_name: &str) -> Result<Vec<ColumnInfo>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote_identifier(table_name)))?;

        let columns = stmt
            .query_map([], |row| {
                Ok(ColumnInfo {
                    name: row.get(1)?,
                    declared_type: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Err(StoreError::InvalidTableName(table_name.to_string()));
        }
        Ok(columns)
    }

    /// All values of the table's first row, or `None` when it has no rows.
    pub fn first_row(&self, table_name: &str) -> Result<Option<Vec<Value>>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {} LIMIT 1", quote_identifier(table_name)))?;
        let column_count = stmt.column_count();

        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => {
                let mut values = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    values.push(value_from_sql(row.get_ref(i)?));
                }
                Ok(Some(values))
            }
            None => Ok(None),
        }
    }

    /// Snapshot of a whole table, for viewing what was uploaded.
    pub fn table(&self, table_name: &str) -> Result<Table> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {}", quote_identifier(table_name)))?;
        statement_to_table(table_name, &mut stmt)
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}
