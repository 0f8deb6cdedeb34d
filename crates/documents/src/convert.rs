use std::path::Path;

use chunkdex_chunker::{parse_chunk_id, BoundaryAnalyzer, BoundaryKind, Chunk};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ConvertError, Result};
use crate::hash::content_hash;
use crate::types::{CodeType, ContextInfo, DocImportance, Document, FileKind};

static COMPLEXITY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Control flow.
        r"\b(if|else|for|while|switch|match|loop)\b",
        // Exceptions.
        r"\b(try|catch|throw|except|raise|finally)\b",
        // Templates and generics.
        r"\btemplate\s*<|<[A-Z]\w*(?:,\s*[A-Z]\w*)*>",
        // Operator overloads.
        r"\boperator\s*[+\-*/=<>!\[\]]+",
        // Inheritance.
        r"\bextends\b|\bimpl\s+\w+\s+for\b|:\s*(public|protected|private)\s+\w+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static TYPED_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:pub\s+)?(?:let|var|const|static|int|long|float|double|char|bool|auto|unsigned|[A-Z]\w*)\b(?:\s+[\w:<>\*&]+)*\s+\w+\s*[=;:]",
    )
    .unwrap()
});

/// Outcome of a batch conversion: one bad chunk never fails the rest.
#[derive(Debug, Default)]
pub struct BatchConversion {
    pub documents: Vec<Document>,
    pub errors: Vec<ConvertError>,
}

impl BatchConversion {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Enriches chunks into documents.
///
/// Classification is heuristic and cheap: symbols come from the same
/// lexical boundary pass the chunker uses, complexity from pattern counts.
pub struct DocumentConverter {
    analyzer: BoundaryAnalyzer,
}

impl Default for DocumentConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentConverter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            analyzer: BoundaryAnalyzer::default(),
        }
    }

    /// Convert one chunk. Pure apart from hashing; never touches the
    /// filesystem.
    pub fn to_document(&self, chunk: &Chunk, last_modified_ms: u64) -> Result<Document> {
        if chunk.id.is_empty() {
            return Err(ConvertError::malformed("<unset>", "empty chunk id"));
        }
        if chunk.start_offset > chunk.end_offset {
            return Err(ConvertError::malformed(
                &chunk.id,
                format!(
                    "start offset {} past end offset {}",
                    chunk.start_offset, chunk.end_offset
                ),
            ));
        }
        if chunk.start_line > chunk.end_line {
            return Err(ConvertError::malformed(
                &chunk.id,
                format!("start line {} past end line {}", chunk.start_line, chunk.end_line),
            ));
        }

        let boundaries = self.analyzer.find_boundaries(&chunk.content);
        let pick = |kind: BoundaryKind| {
            boundaries
                .iter()
                .find(|b| b.kind == kind && !b.label.is_empty())
                .map(|b| b.label.clone())
        };
        let function_name = pick(BoundaryKind::Function);
        let class_name = pick(BoundaryKind::Class);
        let namespace = pick(BoundaryKind::Namespace);

        let comment_lines: usize = boundaries
            .iter()
            .filter(|b| b.kind == BoundaryKind::Comment)
            .map(|b| b.end_line - b.start_line + 1)
            .sum();
        let total_lines = chunk.content.lines().count().max(1);

        let code_type = if function_name.is_some() {
            CodeType::Function
        } else if class_name.is_some() {
            CodeType::Class
        } else if namespace.is_some() {
            CodeType::Namespace
        } else if comment_lines * 2 > total_lines {
            CodeType::Comment
        } else if chunk.content.lines().any(|l| TYPED_DECL.is_match(l.trim_start())) {
            CodeType::Variable
        } else {
            CodeType::Other
        };

        let complexity_score = complexity(&chunk.content);
        let importance = importance(
            code_type,
            function_name.as_deref(),
            complexity_score,
            chunk.token_count,
        );

        let file_type = Path::new(&chunk.source_file_path)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        Ok(Document {
            id: chunk.id.clone(),
            chunk_id: chunk.id.clone(),
            file_path: chunk.source_file_path.clone(),
            start_line: chunk.start_line,
            end_line: chunk.end_line,
            start_offset: chunk.start_offset,
            end_offset: chunk.end_offset,
            file_type,
            content: chunk.content.clone(),
            content_hash: content_hash(&chunk.content),
            last_modified_ms,
            namespace,
            function_name,
            class_name,
            token_count: chunk.token_count,
            context: ContextInfo {
                file_kind: FileKind::from_path(&chunk.source_file_path),
                code_type,
                complexity_score,
                importance,
            },
        })
    }

    /// Reconstruct the originating chunk from a document.
    ///
    /// Exact inverse of [`to_document`](Self::to_document) over the shared
    /// fields; overlap token counts are not carried by a document and come
    /// back as zero.
    #[must_use]
    pub fn to_chunk(&self, document: &Document) -> Chunk {
        let chunk_index = parse_chunk_id(&document.chunk_id).map_or(0, |(_, idx)| idx);
        Chunk {
            id: document.chunk_id.clone(),
            source_file_path: document.file_path.clone(),
            content: document.content.clone(),
            token_count: document.token_count,
            start_line: document.start_line,
            end_line: document.end_line,
            start_offset: document.start_offset,
            end_offset: document.end_offset,
            chunk_index,
            overlap_prefix_tokens: 0,
            overlap_suffix_tokens: 0,
        }
    }

    /// Convert a batch, collecting failures instead of aborting.
    #[must_use]
    pub fn to_documents(&self, chunks: &[Chunk], last_modified_ms: u64) -> BatchConversion {
        let mut batch = BatchConversion::default();
        for chunk in chunks {
            match self.to_document(chunk, last_modified_ms) {
                Ok(doc) => batch.documents.push(doc),
                Err(err) => {
                    warn!("skipping chunk: {err}");
                    batch.errors.push(err);
                }
            }
        }
        batch
    }
}

/// 1..=10; one point per structural pattern occurrence.
fn complexity(content: &str) -> u8 {
    let mut score: usize = 1;
    for pattern in COMPLEXITY_PATTERNS.iter() {
        score += pattern.find_iter(content).count();
        if score >= 10 {
            return 10;
        }
    }
    score.min(10) as u8
}

fn importance(
    code_type: CodeType,
    function_name: Option<&str>,
    complexity_score: u8,
    token_count: usize,
) -> DocImportance {
    if let Some(name) = function_name {
        let lower = name.to_ascii_lowercase();
        if lower == "main" || lower.starts_with("init") {
            return DocImportance::Critical;
        }
        if lower.starts_with("test") || lower.starts_with("debug") {
            return DocImportance::Low;
        }
    }
    if code_type == CodeType::Comment {
        return DocImportance::Low;
    }
    let nontrivial = complexity_score >= 2 || token_count >= 100;
    if matches!(code_type, CodeType::Function | CodeType::Class) && nontrivial {
        return DocImportance::High;
    }
    DocImportance::Medium
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkdex_chunker::stable_chunk_id;
    use pretty_assertions::assert_eq;

    fn chunk_of(path: &str, index: usize, content: &str) -> Chunk {
        Chunk {
            id: stable_chunk_id(path, index, content),
            source_file_path: path.to_string(),
            content: content.to_string(),
            token_count: content.split_whitespace().count(),
            start_line: 1,
            end_line: content.lines().count().max(1),
            start_offset: 0,
            end_offset: content.len(),
            chunk_index: index,
            overlap_prefix_tokens: 0,
            overlap_suffix_tokens: 0,
        }
    }

    #[test]
    fn c_style_init_is_a_critical_function() {
        let converter = DocumentConverter::new();
        let chunk = chunk_of("src/boot.c", 0, "void init() { setup(); }\n");
        let doc = converter.to_document(&chunk, 1000).unwrap();
        assert_eq!(doc.context.code_type, CodeType::Function);
        assert_eq!(doc.function_name.as_deref(), Some("init"));
        assert_eq!(doc.context.importance, DocImportance::Critical);
    }

    #[test]
    fn main_outranks_everything() {
        let converter = DocumentConverter::new();
        let chunk = chunk_of("src/main.rs", 0, "fn main() { run(); }\n");
        let doc = converter.to_document(&chunk, 0).unwrap();
        assert_eq!(doc.context.importance, DocImportance::Critical);
    }

    #[test]
    fn test_functions_rank_low() {
        let converter = DocumentConverter::new();
        let chunk = chunk_of(
            "src/parse.rs",
            0,
            "fn test_roundtrip() { if a { b(); } else { c(); } }\n",
        );
        let doc = converter.to_document(&chunk, 0).unwrap();
        assert_eq!(doc.context.importance, DocImportance::Low);
    }

    #[test]
    fn function_outranks_class_in_classification() {
        let converter = DocumentConverter::new();
        let content = "class Widget {\n  void draw() {}\n};\n";
        let doc = converter.to_document(&chunk_of("w.cpp", 0, content), 0).unwrap();
        assert_eq!(doc.context.code_type, CodeType::Function);
        assert_eq!(doc.class_name.as_deref(), Some("Widget"));
    }

    #[test]
    fn comment_dominated_content_is_comment_typed() {
        let converter = DocumentConverter::new();
        let content = "// overview\n// of the\n// module\nx\n";
        let doc = converter.to_document(&chunk_of("notes.c", 0, content), 0).unwrap();
        assert_eq!(doc.context.code_type, CodeType::Comment);
        assert_eq!(doc.context.importance, DocImportance::Low);
    }

    #[test]
    fn typed_declaration_is_variable() {
        let converter = DocumentConverter::new();
        let content = "static int retry_limit = 3;\n";
        let doc = converter.to_document(&chunk_of("cfg.c", 0, content), 0).unwrap();
        assert_eq!(doc.context.code_type, CodeType::Variable);
    }

    #[test]
    fn complexity_counts_patterns_and_caps() {
        assert_eq!(complexity("plain words only"), 1);
        assert_eq!(complexity("if (a) { } else { }"), 3);
        let busy = "if for while match try catch throw if for while match try".repeat(2);
        assert_eq!(complexity(&busy), 10);
    }

    #[test]
    fn nontrivial_function_ranks_high() {
        let converter = DocumentConverter::new();
        let content = "fn resolve(x: u32) -> u32 { if x > 1 { x } else { 0 } }\n";
        let doc = converter.to_document(&chunk_of("r.rs", 0, content), 0).unwrap();
        assert!(doc.context.complexity_score >= 2);
        assert_eq!(doc.context.importance, DocImportance::High);
    }

    #[test]
    fn round_trip_preserves_shared_fields() {
        let converter = DocumentConverter::new();
        let chunk = chunk_of("src/lib.rs", 3, "fn alpha() {}\nfn beta() {}\n");
        let doc = converter.to_document(&chunk, 42).unwrap();
        let back = converter.to_chunk(&doc);
        assert_eq!(back.id, chunk.id);
        assert_eq!(back.source_file_path, chunk.source_file_path);
        assert_eq!(back.content, chunk.content);
        assert_eq!(back.token_count, chunk.token_count);
        assert_eq!(back.start_line, chunk.start_line);
        assert_eq!(back.end_line, chunk.end_line);
        assert_eq!(back.start_offset, chunk.start_offset);
        assert_eq!(back.end_offset, chunk.end_offset);
        assert_eq!(back.chunk_index, chunk.chunk_index);
        assert_eq!(back.overlap_prefix_tokens, 0);
        assert_eq!(back.overlap_suffix_tokens, 0);
    }

    #[test]
    fn hash_tracks_content() {
        let converter = DocumentConverter::new();
        let a = converter.to_document(&chunk_of("f.rs", 0, "fn a() {}"), 0).unwrap();
        let b = converter.to_document(&chunk_of("f.rs", 0, "fn a() {}"), 9).unwrap();
        let c = converter.to_document(&chunk_of("f.rs", 0, "fn b() {}"), 0).unwrap();
        assert_eq!(a.content_hash, b.content_hash);
        assert_ne!(a.content_hash, c.content_hash);
    }

    #[test]
    fn batch_conversion_survives_a_bad_chunk() {
        let converter = DocumentConverter::new();
        let good = chunk_of("a.rs", 0, "fn a() {}");
        let mut bad = chunk_of("b.rs", 0, "fn b() {}");
        bad.start_offset = 10;
        bad.end_offset = 5;
        let batch = converter.to_documents(&[good.clone(), bad, good], 0);
        assert_eq!(batch.documents.len(), 2);
        assert_eq!(batch.errors.len(), 1);
        assert!(!batch.is_complete());
    }

    #[test]
    fn file_type_is_the_lowercase_extension() {
        let converter = DocumentConverter::new();
        let doc = converter.to_document(&chunk_of("Makefile", 0, "all: build"), 0).unwrap();
        assert_eq!(doc.file_type, "");
        let doc = converter.to_document(&chunk_of("a.RS", 0, "fn x() {}"), 0).unwrap();
        assert_eq!(doc.file_type, "rs");
    }
}
