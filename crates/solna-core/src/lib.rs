#![forbid(unsafe_code)]

//! Core types for the Solna XML Encryption library: the error type,
//! algorithm URIs and namespace constants.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, ErrorKind, Failure, Result};
