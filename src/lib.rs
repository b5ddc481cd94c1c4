pub mod assistant;
pub mod cli;
pub mod output;
pub mod storage;
pub mod store;
pub mod tui;

pub use assistant::{AskOutcome, Session, SessionError, Step, Translator, UploadOutcome};
pub use storage::table::{Column, DataType, Schema, Table, Value};
pub use store::{describe, execute, QueryResult, Store, StoreError, UploadedFile};
