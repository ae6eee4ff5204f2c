#![warn(missing_docs)]
//! Cassegrain specific error structures
use std::{error::Error, fmt::Display};

/// Application specific Result type
pub type CsgResult<T> = std::result::Result<T, CassegrainError>;

/// Errors that can be returned by various functions of this crate.
///
/// **Note**: Ray tracing and position optimization never return errors. A missed surface is a normal outcome
/// and an unoptimizable system yields an empty result. Errors only arise while constructing objects from
/// invalid parameters or during file / console io.
#[derive(Debug, PartialEq, Eq)]
pub enum CassegrainError {
    /// invalid geometric parameters of a surface (mirror or sensor)
    Surface(String),
    /// error while setting up an `OpticalSystem`
    System(String),
    /// invalid parameters of a position search
    Optimizer(String),
    /// invalid design parameters of an `OpticalConfiguration` or of evaluator settings
    Configuration(String),
    /// errors while reading or writing files
    Io(String),
    /// errors console io
    Console(String),
    /// errors not falling in one of the categories above
    Other(String),
}

impl Display for CassegrainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Surface(m) => {
                write!(f, "Surface:{m}")
            }
            Self::System(m) => {
                write!(f, "System:{m}")
            }
            Self::Optimizer(m) => {
                write!(f, "Optimizer:{m}")
            }
            Self::Configuration(m) => {
                write!(f, "Configuration:{m}")
            }
            Self::Io(m) => {
                write!(f, "Io:{m}")
            }
            Self::Console(m) => {
                write!(f, "Console:{m}")
            }
            Self::Other(m) => write!(f, "Cassegrain Error:Other:{m}"),
        }
    }
}
impl Error for CassegrainError {}

impl std::convert::From<String> for CassegrainError {
    fn from(msg: String) -> Self {
        Self::Other(msg)
    }
}
impl std::convert::From<std::io::Error> for CassegrainError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
impl std::convert::From<csv::Error> for CassegrainError {
    fn from(err: csv::Error) -> Self {
        Self::Io(format!("csv: {err}"))
    }
}
