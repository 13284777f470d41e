/// Source location of an IR node: byte offsets plus the 1-based line the
/// generated code reports when an exception escapes from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32) -> Self {
        Self { start, end, line }
    }

    /// A span that only knows its line. Most synthesized nodes use this.
    pub fn at_line(line: u32) -> Self {
        Self { start: 0, end: 0, line }
    }

    pub fn dummy() -> Self {
        Self { start: 0, end: 0, line: 0 }
    }
}
