//! Renderers for query results in non-interactive mode.

use serde_json::{json, Number, Value as JsonValue};

use crate::storage::table::{Table, Value};

pub fn format_table(table: &Table) -> String {
    if table.row_count() == 0 {
        return "(0 rows)\n".to_string();
    }

    let widths: Vec<usize> = table
        .schema
        .columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            let header_width = col.name.chars().count();
            let max_value_width = table
                .rows
                .iter()
                .map(|row| row.values.get(i).map(|v| v.to_string().chars().count()).unwrap_or(0))
                .max()
                .unwrap_or(0);
            header_width.max(max_value_width)
        })
        .collect();

    let mut out = String::new();

    let header: Vec<String> = table
        .schema
        .columns
        .iter()
        .enumerate()
        .map(|(i, col)| format!("{:width$}", col.name, width = widths[i]))
        .collect();
    out.push_str(header.join(" | ").trim_end());
    out.push('\n');

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    out.push_str(&sep.join("-+-"));
    out.push('\n');

    for row in &table.rows {
        let values: Vec<String> = row
            .values
            .iter()
            .enumerate()
            .map(|(i, v)| format!("{:width$}", v.to_string(), width = widths[i]))
            .collect();
        out.push_str(values.join(" | ").trim_end());
        out.push('\n');
    }

    out.push_str(&format!("({} rows)\n", table.row_count()));
    out
}

pub fn format_csv(table: &Table) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(table.schema.column_names())?;
    for row in &table.rows {
        writer.write_record(row.values.iter().map(|v| match v {
            Value::Null => String::new(),
            other => other.to_string(),
        }))?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// `{"columns": [...], "rows": [[...], ...]}`, keeping column order and
/// repeated column names.
pub fn format_json(table: &Table) -> String {
    let columns: Vec<JsonValue> = table
        .schema
        .columns
        .iter()
        .map(|col| JsonValue::from(col.name.as_str()))
        .collect();
    let rows: Vec<JsonValue> = table
        .rows
        .iter()
        .map(|row| JsonValue::Array(row.values.iter().map(value_to_json).collect()))
        .collect();

    json!({ "columns": columns, "rows": rows }).to_string()
}

fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(b) => JsonValue::Bool(*b),
        Value::Integer(n) => JsonValue::from(*n),
        Value::Float(n) => Number::from_f64(*n).map(JsonValue::Number).unwrap_or(JsonValue::Null),
        Value::String(s) => JsonValue::String(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::table::{Column, DataType, Row, Schema};

    fn sample() -> Table {
        let schema = Schema::new(vec![
            Column::new("Region", DataType::String),
            Column::new("Amount", DataType::Integer),
        ]);
        Table::with_rows(
            "result",
            schema,
            vec![
                Row::new(vec![Value::String("East".into()), Value::Integer(20)]),
                Row::new(vec![Value::String("North, upper".into()), Value::Null]),
            ],
        )
    }

    #[test]
    fn test_format_table() {
        assert_eq!(
            format_table(&sample()),
            "Region       | Amount\n-------------+-------\nEast         | 20\nNorth, upper | NULL\n(2 rows)\n"
        );
    }

    #[test]
    fn test_format_csv() {
        assert_eq!(
            format_csv(&sample()).unwrap(),
            "Region,Amount\nEast,20\n\"North, upper\",\n"
        );
    }

    #[test]
    fn test_format_json_keeps_repeated_columns() {
        let schema = Schema::new(vec![
            Column::new("a", DataType::Integer),
            Column::new("a", DataType::Integer),
        ]);
        let table = Table::with_rows(
            "result",
            schema,
            vec![Row::new(vec![Value::Integer(1), Value::Integer(2)])],
        );

        assert_eq!(format_json(&table), r#"{"columns":["a","a"],"rows":[[1,2]]}"#);
    }

    #[test]
    fn test_format_json() {
        assert_eq!(
            format_json(&sample()),
            r#"{"columns":["Region","Amount"],"rows":[["East",20],["North, upper",null]]}"#
        );
    }
}
