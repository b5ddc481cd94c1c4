use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    Integer,
    Float,
    /// Short string column, kept in the schema description.
    String,
    /// Long free-text column, left out of the schema description.
    Text,
    Boolean,
    Null,
}

impl DataType {
    /// Column type used in the store's `CREATE TABLE` statement.
    pub fn declared_type(&self) -> &'static str {
        match self {
            DataType::Integer | DataType::Boolean => "INTEGER",
            DataType::Float | DataType::Null => "REAL",
            DataType::String => "VARCHAR",
            DataType::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Integer(_) => DataType::Integer,
            Value::Float(_) => DataType::Float,
            Value::String(_) => DataType::String,
            Value::Boolean(_) => DataType::Boolean,
            Value::Null => DataType::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => write!(f, "NULL"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Schema {
    pub columns: Vec<Column>,
    column_index: HashMap<String, usize>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        let column_index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.to_lowercase(), i))
            .collect();
        Self {
            columns,
            column_index,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_index.get(&name.to_lowercase()).copied()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct Row {
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

/// A named, typed table: one uploaded CSV file, or the rows a query returned.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub schema: Schema,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(name: impl Into<String>, schema: Schema, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            schema,
            rows,
        }
    }

    pub fn add_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.schema.column_count()
    }

    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.schema.column_index(name)
    }

    /// Value at `(row, column name)`, case-insensitive on the column.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.get_column_index(column)?;
        self.rows.get(row)?.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_types() {
        assert_eq!(DataType::Integer.declared_type(), "INTEGER");
        assert_eq!(DataType::Boolean.declared_type(), "INTEGER");
        assert_eq!(DataType::Float.declared_type(), "REAL");
        assert_eq!(DataType::String.declared_type(), "VARCHAR");
        assert_eq!(DataType::Text.declared_type(), "TEXT");
    }

    #[test]
    fn test_schema_column_index() {
        let schema = Schema::new(vec![
            Column::new("id", DataType::Integer),
            Column::new("name", DataType::String),
        ]);
        assert_eq!(schema.column_index("id"), Some(0));
        assert_eq!(schema.column_index("name"), Some(1));
        assert_eq!(schema.column_index("ID"), Some(0)); // case insensitive
        assert_eq!(schema.column_index("unknown"), None);
    }

    #[test]
    fn test_table_operations() {
        let schema = Schema::new(vec![
            Column::new("id", DataType::Integer),
            Column::new("value", DataType::String),
        ]);
        let mut table = Table::new("test", schema);

        table.add_row(Row::new(vec![
            Value::Integer(1),
            Value::String("one".to_string()),
        ]));
        table.add_row(Row::new(vec![
            Value::Integer(2),
            Value::String("two".to_string()),
        ]));

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.value(1, "VALUE"), Some(&Value::String("two".to_string())));
        assert_eq!(table.value(2, "value"), None);
    }
}
