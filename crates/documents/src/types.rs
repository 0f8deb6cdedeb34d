use std::path::Path;

use serde::{Deserialize, Serialize};

/// Broad role of a file, derived from its path and extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    Source,
    Header,
    Test,
    Config,
    Doc,
    Other,
}

impl FileKind {
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let lower = path.to_ascii_lowercase();
        let stem = Path::new(&lower)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        if stem.starts_with("test") || stem.ends_with("_test") || lower.contains("/tests/") {
            return Self::Test;
        }
        match Path::new(&lower).extension().and_then(|e| e.to_str()) {
            Some("h" | "hpp" | "hh" | "hxx") => Self::Header,
            Some("toml" | "yaml" | "yml" | "json" | "ini" | "cfg") => Self::Config,
            Some("md" | "rst" | "txt" | "adoc") => Self::Doc,
            Some(
                "rs" | "c" | "cpp" | "cc" | "cxx" | "py" | "js" | "ts" | "jsx" | "tsx" | "go"
                | "java" | "kt" | "rb" | "cs" | "swift" | "php",
            ) => Self::Source,
            _ => Self::Other,
        }
    }
}

/// Dominant construct of a document's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeType {
    Function,
    Class,
    Namespace,
    Comment,
    Variable,
    Other,
}

impl CodeType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Namespace => "namespace",
            Self::Comment => "comment",
            Self::Variable => "variable",
            Self::Other => "other",
        }
    }
}

/// Retrieval weight of a document, ordered `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DocImportance {
    Low,
    Medium,
    High,
    Critical,
}

/// Classification attached to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextInfo {
    pub file_kind: FileKind,
    pub code_type: CodeType,
    /// 1..=10, rough structural complexity of the content.
    pub complexity_score: u8,
    pub importance: DocImportance,
}

/// Embedding-ready unit derived from one chunk.
///
/// `content_hash` is the change-detection key; `content` is carried so
/// the embedding layer has the text without re-reading the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document identity, equal to the originating chunk id.
    pub id: String,
    pub chunk_id: String,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub start_offset: usize,
    pub end_offset: usize,
    /// Lowercase file extension, empty when the path has none.
    pub file_type: String,
    pub content: String,
    pub content_hash: String,
    pub last_modified_ms: u64,
    pub namespace: Option<String>,
    pub function_name: Option<String>,
    pub class_name: Option<String>,
    pub token_count: usize,
    pub context: ContextInfo,
}

impl Document {
    #[must_use]
    pub fn primary_symbol(&self) -> Option<&str> {
        self.function_name
            .as_deref()
            .or(self.class_name.as_deref())
            .or(self.namespace.as_deref())
    }
}
