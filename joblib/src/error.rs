use crate::store::StoreError;
use std::result;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("No such job exists")]
    NotFound,
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for JobError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => JobError::NotFound,
            err => JobError::Store(err),
        }
    }
}

pub type Result<T> = result::Result<T, JobError>;
