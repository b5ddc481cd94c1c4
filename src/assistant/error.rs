use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("No CSV files have been uploaded")]
    NoData,
}

pub type Result<T> = std::result::Result<T, SessionError>;
