/// File extensions considered source code worth analyzing.
pub const VALID_EXTENSIONS: &[&str] = &[
    ".java", ".go", ".py", ".c", ".cpp", ".cs", ".js", ".ts", ".php", ".rb",
    ".groovy", ".rs", ".in", ".jelly", ".inc", ".rh", ".bat",
];

/// Source files only; anything with "test" in its path is skipped.
pub fn is_valid_source_file(filename: &str) -> bool {
    VALID_EXTENSIONS.iter().any(|ext| filename.ends_with(ext))
        && !filename.to_lowercase().contains("test")
}

/// One file's change within one commit, the unit handed to the models.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffUnit {
    pub filename: String,
    pub patch: String,
    /// URL recorded against any consensus for this unit.
    pub commit_url: String,
    /// Lines shown above the diff (commit metadata or origin URL).
    pub header: String,
}

impl DiffUnit {
    pub fn new(filename: impl Into<String>, patch: impl Into<String>, commit_url: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            patch: patch.into(),
            commit_url: commit_url.into(),
            header: String::new(),
        }
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn has_patch(&self) -> bool {
        !self.patch.trim().is_empty()
    }

    /// Prompt rendering of the change.
    pub fn formatted_code(&self) -> String {
        format!(
            "{}\n\n**File:** `{}`\n```diff\n{}\n```",
            self.header.trim_end(),
            self.filename,
            self.patch
        )
    }
}
