use std::io::BufRead;
use lazy_static::lazy_static;
use regex::Regex;
use crate::error::{MalformedReason, SimulationError};

lazy_static! {
    // " L 7ff000388,8" - the size is optional as the simulator doesn't use it
    static ref ACCESS_PATTERN: Regex =
        Regex::new(r"^ (?P<op>\S) (?P<address>[0-9a-fA-F]+)(?:,(?P<size>\d+))?\s*$").unwrap();
}

/// The kind of a data access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Load,
    Store,
    /// A load followed by a store to the same address
    Modify,
}

impl TryFrom<char> for Operation {
    type Error = MalformedReason;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        match value {
            'L' => Ok(Operation::Load),
            'S' => Ok(Operation::Store),
            'M' => Ok(Operation::Modify),
            other => Err(MalformedReason::UnknownOperation(other)),
        }
    }
}

/// One decoded data access from a trace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRecord {
    pub operation: Operation,
    pub address: u64,
    pub size: Option<u32>,
}

/// Parses a single trace line, without its line ending
///
/// Data accesses start with a space, then the operation, the hex address and the size:
/// `" M 0421c7f0,4"`. Instruction fetches start with `I` and, like blank lines, are skipped by
/// returning `None`.
///
/// # Examples
///
/// ```
/// use csimlib::trace::{parse_line, Operation};
/// let record = parse_line(" S 7ff0005c8,8").unwrap().unwrap();
/// assert_eq!(record.operation, Operation::Store);
/// assert_eq!(record.address, 0x7ff0005c8);
/// assert_eq!(parse_line("I  0400d7d4,8"), Ok(None));
/// ```
pub fn parse_line(line: &str) -> Result<Option<AccessRecord>, MalformedReason> {
    if line.trim().is_empty() || line.starts_with('I') {
        return Ok(None);
    }
    if !line.starts_with(' ') {
        return Err(MalformedReason::Unrecognised);
    }
    let tokens = ACCESS_PATTERN.captures(line).ok_or(MalformedReason::Unrecognised)?;
    let operation = Operation::try_from(tokens["op"].chars().next().ok_or(MalformedReason::Unrecognised)?)?;
    let address = u64::from_str_radix(&tokens["address"], 16).map_err(|_| MalformedReason::AddressOverflow)?;
    let size = match tokens.name("size") {
        Some(size) => Some(size.as_str().parse().map_err(|_| MalformedReason::SizeOverflow)?),
        None => None,
    };
    Ok(Some(AccessRecord { operation, address, size }))
}

/// Reads data accesses from a trace one line at a time, reusing a single line buffer
pub struct TraceReader<R> {
    reader: R,
    buffer: String,
    line_number: usize,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: String::with_capacity(64),
            line_number: 0,
        }
    }

    /// The line number of the last line read, starting from 1
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Returns the next data access, along with its text as it appeared in the trace minus the
    /// leading space, or None at the end of the trace
    ///
    /// Instruction fetches and blank lines are skipped. Anything else that isn't a data access
    /// is an error, and the trace shouldn't be read any further
    pub fn next_access(&mut self) -> Result<Option<(&str, AccessRecord)>, SimulationError> {
        let record = loop {
            self.buffer.clear();
            let bytes = self.reader.read_line(&mut self.buffer).map_err(SimulationError::TraceRead)?;
            if bytes == 0 {
                return Ok(None);
            }
            self.line_number += 1;
            let line = trim_line_ending(&self.buffer);
            let parsed = parse_line(line).map_err(|reason| SimulationError::MalformedRecord {
                line: self.line_number,
                text: line.to_string(),
                reason,
            })?;
            if let Some(record) = parsed {
                break record;
            }
        };
        // Data accesses always start with a single space
        Ok(Some((&trim_line_ending(&self.buffer)[1..], record)))
    }
}

fn trim_line_ending(line: &str) -> &str {
    line.trim_end_matches(|c| c == '\n' || c == '\r')
}
