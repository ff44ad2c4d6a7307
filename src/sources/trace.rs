//! Recorded sample traces
//!
//! A trace is a plain-text capture of sensor readings, one row per line:
//!
//! ```text
//! # t_ms  pad0  pad1
//! 0       2000  1870
//! 50      2010  1875
//! ```
//!
//! Columns may be separated by whitespace or commas. Lines starting with
//! `#` and blank lines are ignored.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::str::FromStr;

use thiserror::Error;

use super::SampleSource;

/// Errors raised while loading a trace
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to read trace: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: invalid number '{token}'")]
    Number { line: usize, token: String },

    #[error("line {line}: expected a timestamp followed by at least one sample")]
    MissingSamples { line: usize },

    #[error("line {line}: expected {expected} sample columns, got {got}")]
    Columns {
        line: usize,
        expected: usize,
        got: usize,
    },

    #[error("line {line}: timestamp {t_ms} is earlier than the previous row ({previous})")]
    Timestamp { line: usize, t_ms: u64, previous: u64 },

    #[error("trace contains no samples")]
    Empty,
}

/// One timestamped row of readings
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRow {
    pub t_ms: u64,
    pub values: Vec<u32>,
}

/// A parsed trace
#[derive(Debug, Clone)]
pub struct Trace {
    rows: Vec<TraceRow>,
    columns: usize,
}

impl Trace {
    pub fn rows(&self) -> &[TraceRow] {
        &self.rows
    }

    /// Number of sample columns per row
    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Time span from first to last row
    pub fn duration_ms(&self) -> u64 {
        match (self.rows.first(), self.rows.last()) {
            (Some(first), Some(last)) => last.t_ms - first.t_ms,
            _ => 0,
        }
    }

    /// Engine ticks every `tick_ms` from the first row to the last, each
    /// paired with the latest row at or before it
    ///
    /// The last row always gets its own tick.
    pub fn ticks(&self, tick_ms: u64) -> TraceTicks<'_> {
        TraceTicks {
            rows: &self.rows,
            tick_ms: tick_ms.max(1),
            next_ms: self.rows.first().map(|row| row.t_ms),
            index: 0,
        }
    }
}

/// Iterator returned by [`Trace::ticks`]
#[derive(Debug, Clone)]
pub struct TraceTicks<'a> {
    rows: &'a [TraceRow],
    tick_ms: u64,
    next_ms: Option<u64>,
    index: usize,
}

impl<'a> Iterator for TraceTicks<'a> {
    type Item = (u64, &'a TraceRow);

    fn next(&mut self) -> Option<Self::Item> {
        let now = self.next_ms?;
        let last = self.rows.last()?;

        while self.index + 1 < self.rows.len() && self.rows[self.index + 1].t_ms <= now {
            self.index += 1;
        }

        self.next_ms = if now >= last.t_ms {
            None
        } else {
            Some(now.saturating_add(self.tick_ms).min(last.t_ms))
        };
        Some((now, &self.rows[self.index]))
    }
}

fn parse_number<T: FromStr>(token: &str, line: usize) -> Result<T, TraceError> {
    token.parse().map_err(|_| TraceError::Number {
        line,
        token: token.to_string(),
    })
}

impl FromStr for Trace {
    type Err = TraceError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut rows: Vec<TraceRow> = Vec::new();
        let mut columns = 0;

        for (index, raw_line) in text.lines().enumerate() {
            let line = index + 1;
            let content = raw_line.trim();
            if content.is_empty() || content.starts_with('#') {
                continue;
            }

            let mut tokens = content
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|t| !t.is_empty());

            let t_ms: u64 = match tokens.next() {
                Some(token) => parse_number(token, line)?,
                None => continue,
            };
            let values = tokens
                .map(|token| parse_number(token, line))
                .collect::<Result<Vec<u32>, _>>()?;

            if values.is_empty() {
                return Err(TraceError::MissingSamples { line });
            }
            if rows.is_empty() {
                columns = values.len();
            } else if values.len() != columns {
                return Err(TraceError::Columns {
                    line,
                    expected: columns,
                    got: values.len(),
                });
            }
            if let Some(previous) = rows.last() {
                if t_ms < previous.t_ms {
                    return Err(TraceError::Timestamp {
                        line,
                        t_ms,
                        previous: previous.t_ms,
                    });
                }
            }

            rows.push(TraceRow { t_ms, values });
        }

        if rows.is_empty() {
            return Err(TraceError::Empty);
        }
        Ok(Trace { rows, columns })
    }
}

/// Load a trace from a file
pub fn load_trace(path: &Path) -> Result<Trace, TraceError> {
    let contents = std::fs::read_to_string(path)?;
    contents.parse()
}

/// The row currently being replayed, shared by every column source
#[derive(Debug, Clone, Default)]
pub struct TraceCursor {
    row: Rc<RefCell<Vec<u32>>>,
}

impl TraceCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `row` the current readings
    pub fn set_row(&self, row: &TraceRow) {
        let mut current = self.row.borrow_mut();
        current.clear();
        current.extend_from_slice(&row.values);
    }

    /// A source reading one column of the current row
    pub fn source(&self, column: usize) -> ReplaySource {
        ReplaySource {
            cursor: self.clone(),
            column,
        }
    }
}

/// Reads one column of a [`TraceCursor`]
#[derive(Debug, Clone)]
pub struct ReplaySource {
    cursor: TraceCursor,
    column: usize,
}

impl SampleSource for ReplaySource {
    fn read(&mut self) -> u32 {
        self.cursor
            .row
            .borrow()
            .get(self.column)
            .copied()
            .unwrap_or(0)
    }
}
