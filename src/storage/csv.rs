use std::collections::HashSet;
use std::io::Read;

use super::table::{Column, DataType, Row, Schema, Table, Value};
use thiserror::Error;

/// String columns with a value longer than this are stored as `TEXT`.
pub const LONG_TEXT_THRESHOLD: usize = 255;

const NULL_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NULL", "null", "NaN", "nan", "-NaN", "-nan", "None", "<NA>", "#N/A",
];

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Parse error at line {line}: {message}")]
    Parse { line: u64, message: String },
    #[error("Delimiter must be a single ASCII character, got {0:?}")]
    InvalidDelimiter(char),
    #[error("Empty CSV file")]
    EmptyFile,
}

/// Table name for an uploaded file: everything before the first `.`.
pub fn table_name_for(file_name: &str) -> &str {
    file_name.split('.').next().unwrap_or("")
}

/// Replaces spaces in a column name with underscores.
pub fn normalize_column_name(name: &str) -> String {
    name.replace(' ', "_")
}

#[derive(Debug, Clone)]
pub struct CsvReader {
    delimiter: char,
}

impl Default for CsvReader {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvReader {
    pub fn new() -> Self {
        Self { delimiter: ',' }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn read_from_reader<R: Read>(&self, reader: R, table_name: &str) -> Result<Table, CsvError> {
        if !self.delimiter.is_ascii() {
            return Err(CsvError::InvalidDelimiter(self.delimiter));
        }

        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter as u8)
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        let mut records = csv_reader.records();

        let header = records.next().ok_or(CsvError::EmptyFile)??;
        let headers = normalize_headers(header.iter());

        let mut raw_rows: Vec<Vec<String>> = Vec::new();
        for record in records {
            let record = record?;
            if record.len() == 1 && record[0].trim().is_empty() {
                continue;
            }
            if record.len() > headers.len() {
                return Err(CsvError::Parse {
                    line: record.position().map(|p| p.line()).unwrap_or(0),
                    message: format!(
                        "expected {} fields, saw {}",
                        headers.len(),
                        record.len()
                    ),
                });
            }

            let mut row: Vec<String> = record.iter().map(|f| f.trim().to_string()).collect();
            row.resize(headers.len(), String::new());
            raw_rows.push(row);
        }

        let types = infer_types(&raw_rows, headers.len());

        let columns: Vec<Column> = headers
            .iter()
            .zip(types.iter())
            .map(|(name, dtype)| Column::new(name.clone(), dtype.clone()))
            .collect();
        let schema = Schema::new(columns);

        let rows: Vec<Row> = raw_rows
            .iter()
            .map(|raw_row| {
                let values: Vec<Value> = raw_row
                    .iter()
                    .zip(types.iter())
                    .map(|(s, dtype)| parse_value(s, dtype))
                    .collect();
                Row::new(values)
            })
            .collect();

        Ok(Table::with_rows(table_name, schema, rows))
    }
}

/// Fills blank header cells, replaces spaces, and suffixes repeated names
/// (`a`, `a.1`, `a.2`). Uniqueness is case-insensitive, matching SQLite.
fn normalize_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut headers = Vec::new();

    for (i, name) in raw.enumerate() {
        let name = name.trim_start_matches('\u{feff}').trim();
        let base = if name.is_empty() {
            normalize_column_name(&format!("Unnamed: {}", i))
        } else {
            normalize_column_name(name)
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while taken.contains(&candidate.to_lowercase()) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }

        taken.insert(candidate.to_lowercase());
        headers.push(candidate);
    }

    headers
}

fn is_null_token(value: &str) -> bool {
    NULL_TOKENS.contains(&value)
}

fn infer_types(rows: &[Vec<String>], num_columns: usize) -> Vec<DataType> {
    // Header-only files have nothing to infer from.
    if rows.is_empty() {
        return vec![DataType::String; num_columns];
    }

    let mut types = vec![DataType::Null; num_columns];
    let mut has_nulls = vec![false; num_columns];
    let mut widest = vec![0usize; num_columns];

    for row in rows {
        for (i, value) in row.iter().enumerate().take(num_columns) {
            let inferred = infer_single_type(value);
            if inferred == DataType::Null {
                has_nulls[i] = true;
            }
            widest[i] = widest[i].max(value.chars().count());
            types[i] = merge_types(&types[i], &inferred);
        }
    }

    types
        .into_iter()
        .zip(has_nulls)
        .zip(widest)
        .map(|((dtype, nulls), width)| match dtype {
            // Integer columns with gaps and all-null columns load as REAL.
            DataType::Null => DataType::Float,
            DataType::Integer if nulls => DataType::Float,
            DataType::String if width > LONG_TEXT_THRESHOLD => DataType::Text,
            other => other,
        })
        .collect()
}

fn infer_single_type(value: &str) -> DataType {
    if is_null_token(value) {
        return DataType::Null;
    }

    if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
        return DataType::Boolean;
    }

    if value.parse::<i64>().is_ok() {
        return DataType::Integer;
    }

    if value.parse::<f64>().is_ok() {
        return DataType::Float;
    }

    DataType::String
}

fn merge_types(current: &DataType, new: &DataType) -> DataType {
    match (current, new) {
        (DataType::Null, other) | (other, DataType::Null) => other.clone(),
        (DataType::Integer, DataType::Float) | (DataType::Float, DataType::Integer) => DataType::Float,
        (a, b) if a == b => a.clone(),
        _ => DataType::String,
    }
}

fn parse_value(value: &str, dtype: &DataType) -> Value {
    if is_null_token(value) {
        return Value::Null;
    }

    match dtype {
        DataType::Integer => value.parse::<i64>().map(Value::Integer).unwrap_or(Value::Null),
        DataType::Float => value.parse::<f64>().map(Value::Float).unwrap_or(Value::Null),
        DataType::Boolean => {
            if value.eq_ignore_ascii_case("true") {
                Value::Boolean(true)
            } else if value.eq_ignore_ascii_case("false") {
                Value::Boolean(false)
            } else {
                Value::Null
            }
        }
        DataType::String | DataType::Text => Value::String(value.to_string()),
        DataType::Null => Value::Null,
    }
}
