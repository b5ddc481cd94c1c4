//! Schema description handed to the translator as a prompt fragment.
//!
//! Each table becomes a `CREATE TABLE`-style block listing its non-text
//! columns, followed by its first row in full:
//!
//! ```text
//! CREATE TABLE sales (
//!     Region VARCHAR,
//!     Amount INTEGER
//! );
//!
//! First Row Data: ('West', 10)
//! ```

use log::debug;

use crate::storage::csv::normalize_column_name;

use super::context::Store;
use super::conversion::python_tuple;
use super::error::Result;

pub fn describe(store: &Store) -> Result<String> {
    let mut description = String::new();
    for table_name in store.table_names()? {
        description.push_str(&describe_table(store, &table_name)?);
    }

    debug!("Schema description is {} bytes", description.len());
    Ok(description)
}

fn describe_table(store: &Store, table_name: &str) -> Result<String> {
    let mut block = format!("CREATE TABLE {} (\n", table_name);

    for column in store.columns(table_name)? {
        // Long free text stays out of the structure; the sample row keeps it.
        if column.declared_type.to_lowercase().contains("text") {
            continue;
        }
        block.push_str(&format!(
            "    {} {},\n",
            normalize_column_name(&column.name),
            column.declared_type
        ));
    }

    let mut block = block.trim_end_matches(&[',', '\n'][..]).to_string();
    block.push_str("\n);\n\n");

    let first_row = match store.first_row(table_name)? {
        Some(values) => python_tuple(&values),
        None => "None".to_string(),
    };
    block.push_str(&format!("First Row Data: {}\n\n", first_row));

    Ok(block)
}
