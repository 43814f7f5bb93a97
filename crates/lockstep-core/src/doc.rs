//! Live-document oracles consumed by the layout engine
//!
//! The engine never owns document content. The host supplies line counts,
//! line lengths and wrap expansion through these narrow traits; tests and
//! the hunk source adapter back them with plain strings.

/// Line count and line length of a live document
pub trait DocumentMetrics {
    fn line_count(&self) -> u32;

    /// Length in characters of `line` (1-based); 0 for out-of-range lines
    fn line_length(&self, line: u32) -> u32;

    /// Last valid column on `line` (columns are 1-based, so this is
    /// `line_length + 1`)
    fn last_column(&self, line: u32) -> u32 {
        self.line_length(line) + 1
    }
}

/// Visual-line expansion per logical line (word wrap)
pub trait WrapQuery {
    /// Number of visual lines `line` occupies; 1 when unwrapped
    fn visual_lines(&self, line: u32) -> u32;
}

/// No wrapping: every logical line is one visual line
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWrap;

impl WrapQuery for NoWrap {
    fn visual_lines(&self, _line: u32) -> u32 {
        1
    }
}

/// String-backed metrics, used by the hunk source adapter and by tests
#[derive(Debug, Clone)]
pub struct TextMetrics {
    lines: Vec<String>,
}

impl TextMetrics {
    pub fn new(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_owned).collect(),
        }
    }

    pub fn line(&self, line: u32) -> Option<&str> {
        self.lines.get(line as usize - 1).map(String::as_str)
    }
}

impl DocumentMetrics for TextMetrics {
    fn line_count(&self) -> u32 {
        self.lines.len() as u32
    }

    fn line_length(&self, line: u32) -> u32 {
        self.lines
            .get(line as usize - 1)
            .map(|l| l.chars().count() as u32)
            .unwrap_or(0)
    }
}
