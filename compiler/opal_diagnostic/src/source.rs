//! Source file management and offset → line/column translation.
//!
//! All loaded files share one u32 offset space: each file occupies a
//! contiguous range starting at its `base`, so an 8-byte span pins down
//! both the file and the position. Offset 0 is reserved so dummy spans
//! never resolve to a location.

use opal_ir::Span;

/// Pre-computed byte offsets of line starts for one file, giving
/// O(log L) line lookup.
#[derive(Clone, Debug, Default)]
pub struct LineOffsetTable {
    /// Byte offset (file-local) of each line start; `offsets[0] == 0`.
    offsets: Vec<u32>,
}

impl LineOffsetTable {
    /// Scan the source once, recording every line start.
    pub fn build(text: &str) -> Self {
        let mut offsets = vec![0u32];
        for (i, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                offsets.push(u32::try_from(i + 1).unwrap_or(u32::MAX));
            }
        }
        LineOffsetTable { offsets }
    }

    /// 1-based line containing the file-local byte offset.
    pub fn line_of(&self, offset: u32) -> u32 {
        let idx = match self.offsets.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert) => insert.saturating_sub(1),
        };
        u32::try_from(idx).unwrap_or(u32::MAX - 1) + 1
    }

    /// 1-based (line, column). Tabs advance the column by `tab_width`.
    pub fn line_col(&self, text: &str, offset: u32, tab_width: u32) -> (u32, u32) {
        let line = self.line_of(offset);
        let start = self.offsets[(line - 1) as usize] as usize;
        let end = (offset as usize).min(text.len());
        let mut col = 1u32;
        for b in text[start..end].bytes() {
            col += if b == b'\t' { tab_width } else { 1 };
        }
        (line, col)
    }
}

/// One loaded source file.
#[derive(Debug)]
pub struct SourceFile {
    pub name: String,
    /// First offset of this file in the global space.
    pub base: u32,
    pub text: String,
    lines: LineOffsetTable,
}

impl SourceFile {
    /// End of this file's offset range (exclusive).
    pub fn end(&self) -> u32 {
        self.base + u32::try_from(self.text.len()).unwrap_or(u32::MAX)
    }
}

/// All source files of a compilation, sharing one offset space.
#[derive(Debug)]
pub struct SourceMap {
    files: Vec<SourceFile>,
    next_base: u32,
    tab_width: u32,
}

impl SourceMap {
    pub fn new() -> Self {
        SourceMap {
            files: Vec::new(),
            // Offset 0 is reserved for Span::DUMMY.
            next_base: 1,
            tab_width: 4,
        }
    }

    pub fn with_tab_width(tab_width: u32) -> Self {
        SourceMap {
            tab_width,
            ..SourceMap::new()
        }
    }

    /// Register a file and return its base offset. Token spans produced
    /// from this file must be shifted by the base.
    pub fn add_file(&mut self, name: impl Into<String>, text: String) -> u32 {
        let base = self.next_base;
        let len = u32::try_from(text.len()).expect("source file exceeds u32 bytes");
        // +1 so a zero-length file still owns a distinct range.
        self.next_base = base + len + 1;
        self.files.push(SourceFile {
            name: name.into(),
            base,
            lines: LineOffsetTable::build(&text),
            text,
        });
        base
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// File containing a global offset.
    pub fn file_of(&self, offset: u32) -> Option<&SourceFile> {
        if offset == 0 {
            return None;
        }
        let idx = match self
            .files
            .binary_search_by(|f| f.base.cmp(&offset))
        {
            Ok(exact) => exact,
            Err(0) => return None,
            Err(insert) => insert - 1,
        };
        let file = &self.files[idx];
        (offset <= file.end()).then_some(file)
    }

    /// Translate a global offset to `(file name, line, column)`.
    pub fn locate(&self, offset: u32) -> Option<(&str, u32, u32)> {
        let file = self.file_of(offset)?;
        let (line, col) = file
            .lines
            .line_col(&file.text, offset - file.base, self.tab_width);
        Some((&file.name, line, col))
    }

    /// Source text under a span, for diagnostics quoting the input.
    pub fn snippet(&self, span: Span) -> Option<&str> {
        let file = self.file_of(span.start)?;
        let start = (span.start - file.base) as usize;
        let end = ((span.end.min(file.end())) - file.base) as usize;
        file.text.get(start..end)
    }
}

impl Default for SourceMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_table_finds_lines() {
        let text = "one\ntwo\nthree";
        let table = LineOffsetTable::build(text);
        assert_eq!(table.line_col(text, 0, 4), (1, 1));
        assert_eq!(table.line_col(text, 4, 4), (2, 1));
        assert_eq!(table.line_col(text, 9, 4), (3, 2));
    }

    #[test]
    fn tabs_advance_by_tab_width() {
        let text = "\tx";
        let table = LineOffsetTable::build(text);
        assert_eq!(table.line_col(text, 1, 4), (1, 5));
    }

    #[test]
    fn multiple_files_share_offset_space() {
        let mut map = SourceMap::new();
        let a = map.add_file("a.opal", "aaaa\n".to_string());
        let b = map.add_file("b.opal", "bb\nbb".to_string());
        assert!(a < b);

        let (name, line, col) = map.locate(b + 3).unwrap();
        assert_eq!((name, line, col), ("b.opal", 2, 1));

        let (name, ..) = map.locate(a).unwrap();
        assert_eq!(name, "a.opal");
    }

    #[test]
    fn offset_zero_never_locates() {
        let mut map = SourceMap::new();
        map.add_file("a.opal", "text".to_string());
        assert!(map.locate(0).is_none());
    }
}
