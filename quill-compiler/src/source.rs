use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub u32);

/// A unit of source text handed to the compiler by its host.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: SourceId,
    pub path: PathBuf,
    pub contents: String,
}

impl SourceFile {
    pub fn new(id: SourceId, path: PathBuf, contents: String) -> Self {
        Self { id, path, contents }
    }

    /// Wraps inline text (a CLI argument, an editor cell) under a synthetic path.
    pub fn inline(contents: impl Into<String>) -> Self {
        Self::new(SourceId(0), PathBuf::from("<inline>"), contents.into())
    }

    pub fn name(&self) -> String {
        self.path.display().to_string()
    }

    /// One-based line and column of a byte offset. Offsets past the end clamp
    /// to the final position.
    pub fn location(&self, offset: usize) -> (usize, usize) {
        let mut line = 1;
        let mut column = 1;
        for (index, ch) in self.contents.char_indices() {
            if index >= offset {
                break;
            }
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        (line, column)
    }
}
