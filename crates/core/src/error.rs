use thiserror::Error;

use crate::document::DocumentError;
use crate::model::ParseIdError;

/// Any error raised by the core crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Id(#[from] ParseIdError),
    #[error(transparent)]
    Document(#[from] DocumentError),
}
