use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("reading {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("writing {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("reading catalog {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parsing catalog document")]
    Parse(#[from] serde_json::Error),
    #[error("catalog fetch cancelled")]
    Cancelled,
}

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("unknown item code {0:?}")]
    UnknownItem(String),
    #[error("no selected item at position {0}")]
    NoSuchPosition(usize),
    #[error("invalid amount {0}")]
    InvalidAmount(f64),
}
