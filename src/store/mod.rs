mod context;
mod conversion;
mod error;
pub mod executor;
mod loader;
pub mod summary;

pub use context::{ColumnInfo, Store};
pub use conversion::{python_literal, python_tuple};
pub use error::{Result, StoreError};
pub use executor::{execute, QueryResult};
pub use loader::{collect_csv_files, UploadedFile};
pub use summary::describe;
