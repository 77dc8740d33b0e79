//! Where query results go.

use std::io::Write;

use bytes::Bytes;

use qrun_athena::ExecError;
use qrun_storage::{Location, ObjectAccessor, StorageError};

/// Destination selected by `--out`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// `-`: results are not fetched at all.
    Discard,
    /// Empty: each result is written to stdout as soon as it arrives.
    Stdout,
    /// Anything else: results are collected and stored once at the end.
    Location(String),
}

impl OutputTarget {
    pub fn parse(out: &str) -> Result<Self, StorageError> {
        match out {
            "-" => Ok(OutputTarget::Discard),
            "" => Ok(OutputTarget::Stdout),
            location => {
                Location::parse(location)?;
                Ok(OutputTarget::Location(location.to_string()))
            }
        }
    }

    pub fn fetches(&self) -> bool {
        !matches!(self, OutputTarget::Discard)
    }
}

/// Collects result bytes for one batch according to an [`OutputTarget`].
pub struct ResultSink<W> {
    target: OutputTarget,
    writer: W,
    buffer: Vec<u8>,
}

impl<W: Write> ResultSink<W> {
    pub fn new(target: OutputTarget, writer: W) -> Self {
        Self {
            target,
            writer,
            buffer: Vec::new(),
        }
    }

    /// Accept the result of one query.
    pub fn accept(&mut self, data: Bytes) -> Result<(), ExecError> {
        match self.target {
            OutputTarget::Discard => Ok(()),
            OutputTarget::Stdout => self
                .writer
                .write_all(&data)
                .and_then(|_| self.writer.flush())
                .map_err(|e| ExecError::store("stdout", e)),
            OutputTarget::Location(_) => {
                self.buffer.extend_from_slice(&data);
                Ok(())
            }
        }
    }

    /// Store buffered results once every query succeeded. Returns the number
    /// of bytes written to the location, if any.
    pub async fn finish<A: ObjectAccessor>(self, accessor: &A) -> Result<Option<usize>, ExecError> {
        let OutputTarget::Location(location) = self.target else {
            return Ok(None);
        };
        let len = self.buffer.len();
        accessor
            .store(Bytes::from(self.buffer), &location)
            .await
            .map_err(|e| ExecError::store(location.as_str(), e))?;
        Ok(Some(len))
    }
}
