use crate::core::parse::parse_literal;
use crate::domain::value::Value;
use crate::utils::error::{PrepError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Read};
use std::path::Path;

/// Streams a record file one line at a time, yielding one parsed [`Value`]
/// per line.
///
/// The reader stops at the first failing line: the error it yields names the
/// line, every later call returns `None`, and the underlying handle is
/// dropped right away.
#[derive(Debug)]
pub struct RecordReader<R: Read> {
    lines: Option<Lines<BufReader<R>>>,
    line: usize,
}

impl RecordReader<File> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "opening record file");
        let file = File::open(path)?;
        Ok(Self::from_reader(file))
    }
}

impl<R: Read> RecordReader<R> {
    pub fn from_reader(reader: R) -> Self {
        RecordReader {
            lines: Some(BufReader::new(reader).lines()),
            line: 0,
        }
    }

    /// Number of lines consumed so far.
    pub fn line(&self) -> usize {
        self.line
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        let next_line = self.lines.as_mut()?.next();
        let raw = match next_line {
            None => {
                self.lines = None;
                return None;
            }
            Some(Ok(raw)) => raw,
            Some(Err(err)) => {
                self.lines = None;
                return Some(Err(PrepError::IoError(err)));
            }
        };
        self.line += 1;

        match parse_literal(&raw) {
            Ok(value) => Some(Ok(value)),
            Err(PrepError::ParseError { message, .. }) => {
                self.lines = None;
                Some(Err(PrepError::ParseError {
                    line: self.line,
                    message,
                }))
            }
            Err(other) => {
                self.lines = None;
                Some(Err(other))
            }
        }
    }
}
