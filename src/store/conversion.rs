use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::Statement;

use crate::storage::table::{Column, DataType, Row, Schema, Table, Value};

use super::error::Result;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Integer(i) => ToSqlOutput::from(*i),
            Value::Float(f) => ToSqlOutput::from(*f),
            Value::String(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Boolean(b) => ToSqlOutput::from(i64::from(*b)),
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
        })
    }
}

pub(crate) fn value_from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(_) => Value::String("[BLOB]".to_string()),
    }
}

/// Wraps an identifier in double quotes so file-derived names with spaces,
/// dashes or keywords stay valid SQL.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Runs a prepared query and collects every row into a [`Table`].
///
/// Column types come from the first non-null value in each column.
pub(crate) fn statement_to_table(name: &str, stmt: &mut Statement<'_>) -> Result<Table> {
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = Vec::new();
    let mut query = stmt.query([])?;
    while let Some(row) = query.next()? {
        let mut values = Vec::with_capacity(names.len());
        for i in 0..names.len() {
            values.push(value_from_sql(row.get_ref(i)?));
        }
        rows.push(Row::new(values));
    }

    let columns = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let data_type = rows
                .iter()
                .filter_map(|row| row.get(i))
                .find(|value| !value.is_null())
                .map(Value::data_type)
                .unwrap_or(DataType::Null);
            Column::new(name, data_type)
        })
        .collect();

    Ok(Table::with_rows(name, Schema::new(columns), rows))
}

/// Renders a value the way a Python REPL prints it inside a tuple.
pub fn python_literal(value: &Value) -> String {
    match value {
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => python_float(*f),
        Value::String(s) => python_str(s),
        Value::Boolean(true) => "True".to_string(),
        Value::Boolean(false) => "False".to_string(),
        Value::Null => "None".to_string(),
    }
}

/// `('West', 10)`, `('x',)`, `()`.
pub fn python_tuple(values: &[Value]) -> String {
    let items: Vec<String> = values.iter().map(python_literal).collect();
    match items.len() {
        1 => format!("({},)", items[0]),
        _ => format!("({})", items.join(", ")),
    }
}

fn python_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        let repr = format!("{:?}", f);
        match repr.split_once('e') {
            // Python writes exponents signed and at least two digits wide.
            Some((mantissa, exponent)) => {
                let (sign, digits) = match exponent.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exponent),
                };
                format!("{}e{}{:0>2}", mantissa, sign, digits)
            }
            None => repr,
        }
    }
}

fn python_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}
