use std::fmt::Write as _;
use std::io::Write;

/// Placeholder printed for a live monitor that missed the per-tick bound.
pub const TIMEOUT_SENTINEL: &str = "timeout";
/// Default placeholder printed for a closed monitor.
pub const DEFAULT_CLOSED_SENTINEL: &str = "ended";

/// Content of one column in one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field {
    /// CPU usage in percent of one core.
    Usage(f64),
    /// The monitor is closed.
    Closed,
    /// The monitor is live but did not answer in time.
    Timeout,
}

/// One output row: the tick's elapsed time and one field per discovered container.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub tick: u64,
    pub elapsed_secs: u64,
    pub fields: Vec<Field>,
}

/// Writes the header and rows as space-separated lines.
///
/// Each line is assembled first and written with a single call, then flushed.
#[derive(Debug)]
pub struct RowWriter<W> {
    out: W,
    closed_sentinel: String,
    line: String,
}

impl<W: Write> RowWriter<W> {
    pub fn new(out: W, closed_sentinel: impl Into<String>) -> Self {
        Self {
            out,
            closed_sentinel: closed_sentinel.into(),
            line: String::with_capacity(256),
        }
    }

    /// Writes `time` followed by one label per container.
    pub fn write_header<'a>(&mut self, labels: impl IntoIterator<Item = &'a str>) -> std::io::Result<()> {
        self.line.clear();
        self.line.push_str("time");
        for label in labels {
            self.line.push(' ');
            self.line.push_str(label);
        }
        self.flush_line()
    }

    pub fn write_row(&mut self, row: &Row) -> std::io::Result<()> {
        self.line.clear();
        let _ = write!(self.line, "{}", row.elapsed_secs);
        for field in &row.fields {
            self.line.push(' ');
            match field {
                Field::Usage(percentage) => {
                    let _ = write!(self.line, "{percentage:.2}%");
                }
                Field::Closed => self.line.push_str(&self.closed_sentinel),
                Field::Timeout => self.line.push_str(TIMEOUT_SENTINEL),
            }
        }
        self.flush_line()
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn flush_line(&mut self) -> std::io::Result<()> {
        self.line.push('\n');
        self.out.write_all(self.line.as_bytes())?;
        self.out.flush()
    }
}
