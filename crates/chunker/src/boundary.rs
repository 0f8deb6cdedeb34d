use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Kind of structural marker detected in the text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundaryKind {
    Function,
    Class,
    Namespace,
    Comment,
    Preprocessor,
}

impl BoundaryKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Namespace => "namespace",
            Self::Comment => "comment",
            Self::Preprocessor => "preprocessor",
        }
    }
}

/// Importance rank of a boundary candidate, ordered `Low < Medium < High < Critical`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Importance {
    Low,
    Medium,
    High,
    Critical,
}

impl Importance {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// A detected structural marker with its extent and rank.
///
/// Lifetime is one chunking pass; offsets are byte positions, lines are
/// 1-indexed and inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryCandidate {
    pub kind: BoundaryKind,
    pub start_line: usize,
    pub end_line: usize,
    pub start_offset: usize,
    pub end_offset: usize,
    pub importance: Importance,
    pub label: String,
}

// Declaration extents are bounded so a missing close brace in degenerate
// input cannot swallow the rest of the file.
const MAX_EXTENT_LINES: usize = 400;

static RUST_FN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?fn\s+([A-Za-z_]\w*)").unwrap()
});
static PY_FN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:async\s+)?def\s+([A-Za-z_]\w*)\s*\(").unwrap());
static JS_FN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$]\w*)")
        .unwrap()
});
static C_FN: Lazy<Regex> = Lazy::new(|| {
    // C-style signature: one or more type words, then the name, then an
    // argument list opening on the same line.
    Regex::new(r"^(?:[A-Za-z_][\w:<>,&\*\s]*?[\s\*&])([A-Za-z_~]\w*)\s*\(").unwrap()
});
static CLASS_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:pub(?:\([^)]*\))?\s+)?(?:export\s+)?(?:abstract\s+)?(?:final\s+)?(class|struct|enum|trait|interface)\s+([A-Za-z_]\w*)").unwrap()
});
static NAMESPACE_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:pub(?:\([^)]*\))?\s+)?(namespace|mod|module|package)\s+([A-Za-z_][\w:\.]*)")
        .unwrap()
});
static PREPROCESSOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#\s*(include|define|if|ifdef|ifndef|elif|else|endif|pragma|undef|error)\b")
        .unwrap()
});
static CONTROL_KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "switch", "match", "return", "do", "catch", "loop",
];

/// Scans text for lexical markers of function/class/namespace/comment/
/// preprocessor boundaries.
///
/// Detection is pattern matching plus brace balancing, not a grammar; a
/// missed boundary degrades overlap quality but never corrupts chunk
/// content.
#[derive(Debug, Clone, Copy)]
pub struct BoundaryAnalyzer {
    report_declarations: bool,
    report_comments: bool,
}

impl Default for BoundaryAnalyzer {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl BoundaryAnalyzer {
    #[must_use]
    pub const fn new(report_declarations: bool, report_comments: bool) -> Self {
        Self {
            report_declarations,
            report_comments,
        }
    }

    /// Find boundary candidates, ordered by start offset.
    #[must_use]
    pub fn find_boundaries(&self, text: &str) -> Vec<BoundaryCandidate> {
        let lines = line_table(text);
        let mut out = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let (offset, raw) = lines[i];
            let trimmed = raw.trim_start();
            let indent = raw.len() - trimmed.len();

            if trimmed.is_empty() {
                i += 1;
                continue;
            }

            // Block comments span until their terminator.
            if trimmed.starts_with("/*") {
                let end = find_block_comment_end(&lines, i);
                if self.report_comments {
                    out.push(candidate_from_lines(
                        &lines,
                        text,
                        i,
                        end,
                        BoundaryKind::Comment,
                        Importance::Medium,
                        String::new(),
                        offset + indent,
                    ));
                }
                i = end + 1;
                continue;
            }

            // Preprocessor directives outrank plain `#` comments.
            if PREPROCESSOR.is_match(trimmed) {
                out.push(candidate_from_lines(
                    &lines,
                    text,
                    i,
                    i,
                    BoundaryKind::Preprocessor,
                    Importance::High,
                    trimmed.split_whitespace().next().unwrap_or("#").to_string(),
                    offset + indent,
                ));
                i += 1;
                continue;
            }

            // Consecutive line comments form one candidate.
            if is_line_comment(trimmed) {
                let mut end = i;
                while end + 1 < lines.len() && is_line_comment(lines[end + 1].1.trim_start()) {
                    end += 1;
                }
                if self.report_comments {
                    out.push(candidate_from_lines(
                        &lines,
                        text,
                        i,
                        end,
                        BoundaryKind::Comment,
                        Importance::Medium,
                        String::new(),
                        offset + indent,
                    ));
                }
                i = end + 1;
                continue;
            }

            if self.report_declarations {
                if let Some((kind, importance, label)) = classify_declaration(trimmed) {
                    let end = declaration_extent(&lines, i, indent);
                    out.push(candidate_from_lines(
                        &lines,
                        text,
                        i,
                        end,
                        kind,
                        importance,
                        label,
                        offset + indent,
                    ));
                    i += 1;
                    continue;
                }
            }

            i += 1;
        }

        out
    }
}

fn classify_declaration(line: &str) -> Option<(BoundaryKind, Importance, String)> {
    if let Some(caps) = CLASS_DECL.captures(line) {
        return Some((
            BoundaryKind::Class,
            Importance::High,
            caps[2].to_string(),
        ));
    }

    if let Some(caps) = NAMESPACE_DECL.captures(line) {
        return Some((
            BoundaryKind::Namespace,
            Importance::High,
            caps[2].to_string(),
        ));
    }

    for pattern in [&*RUST_FN, &*PY_FN, &*JS_FN] {
        if let Some(caps) = pattern.captures(line) {
            return Some((
                BoundaryKind::Function,
                Importance::Critical,
                caps[1].to_string(),
            ));
        }
    }

    // Prototypes and plain statements end in a semicolon.
    if !line.trim_end().ends_with(';') {
        if let Some(caps) = C_FN.captures(line) {
            let name = caps[1].to_string();
            let first_word = line.split(|c: char| !c.is_alphanumeric() && c != '_').next();
            let is_control = CONTROL_KEYWORDS.contains(&name.as_str())
                || first_word.is_some_and(|w| CONTROL_KEYWORDS.contains(&w));
            if !is_control {
                return Some((BoundaryKind::Function, Importance::Critical, name));
            }
        }
    }

    None
}

/// Extent of a declaration starting at `start`: brace-balanced when braces
/// appear near the signature, indentation-based otherwise (Python), single
/// line as the fallback.
fn declaration_extent(lines: &[(usize, &str)], start: usize, indent: usize) -> usize {
    let cap = (start + MAX_EXTENT_LINES).min(lines.len() - 1);

    let mut depth: i64 = 0;
    let mut saw_open = false;
    for (idx, (_, line)) in lines.iter().enumerate().take(cap + 1).skip(start) {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    saw_open = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        if saw_open && depth <= 0 {
            return idx;
        }
        // No brace within a few lines of the signature: not a braced body.
        if !saw_open && idx >= start + 3 {
            break;
        }
    }

    if lines[start].1.trim_end().ends_with(':') {
        // Indentation-scoped body.
        let mut end = start;
        for (idx, (_, line)) in lines.iter().enumerate().take(cap + 1).skip(start + 1) {
            let trimmed = line.trim_start();
            if trimmed.is_empty() {
                continue;
            }
            if line.len() - trimmed.len() <= indent {
                break;
            }
            end = idx;
        }
        return end;
    }

    start
}

fn is_line_comment(trimmed: &str) -> bool {
    trimmed.starts_with("//") || (trimmed.starts_with('#') && !PREPROCESSOR.is_match(trimmed))
}

fn find_block_comment_end(lines: &[(usize, &str)], start: usize) -> usize {
    let cap = (start + MAX_EXTENT_LINES).min(lines.len() - 1);
    for (idx, (_, line)) in lines.iter().enumerate().take(cap + 1).skip(start) {
        let search_from = if idx == start {
            line.find("/*").map_or(0, |p| p + 2)
        } else {
            0
        };
        if line[search_from..].contains("*/") {
            return idx;
        }
    }
    cap
}

#[allow(clippy::too_many_arguments)]
fn candidate_from_lines(
    lines: &[(usize, &str)],
    text: &str,
    start_idx: usize,
    end_idx: usize,
    kind: BoundaryKind,
    importance: Importance,
    label: String,
    start_offset: usize,
) -> BoundaryCandidate {
    let (end_line_offset, end_line_text) = lines[end_idx];
    let end_offset = (end_line_offset + end_line_text.len()).min(text.len());
    BoundaryCandidate {
        kind,
        start_line: start_idx + 1,
        end_line: end_idx + 1,
        start_offset,
        end_offset,
        importance,
        label,
    }
}

/// Byte offset and content of each line, newline excluded.
fn line_table(text: &str) -> Vec<(usize, &str)> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let content = line.strip_suffix('\n').unwrap_or(line);
        let content = content.strip_suffix('\r').unwrap_or(content);
        lines.push((offset, content));
        offset += line.len();
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn detects_rust_function() {
        let analyzer = BoundaryAnalyzer::default();
        let text = "pub async fn fetch_data(url: &str) -> Result<String> {\n    todo!()\n}\n";
        let found = analyzer.find_boundaries(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, BoundaryKind::Function);
        assert_eq!(found[0].importance, Importance::Critical);
        assert_eq!(found[0].label, "fetch_data");
        assert_eq!(found[0].start_line, 1);
        assert_eq!(found[0].end_line, 3);
    }

    #[test]
    fn detects_c_style_signature() {
        let analyzer = BoundaryAnalyzer::default();
        let found = analyzer.find_boundaries("void init() { setup(); }\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, BoundaryKind::Function);
        assert_eq!(found[0].label, "init");
    }

    #[test]
    fn control_flow_is_not_a_function() {
        let analyzer = BoundaryAnalyzer::default();
        let text = "    if (ready) {\n        go();\n    }\n";
        assert!(analyzer.find_boundaries(text).is_empty());
    }

    #[test]
    fn detects_class_and_namespace() {
        let analyzer = BoundaryAnalyzer::default();
        let text = "namespace core {\nclass Parser {\n  int depth;\n};\n}\n";
        let found = analyzer.find_boundaries(text);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].kind, BoundaryKind::Namespace);
        assert_eq!(found[0].label, "core");
        assert_eq!(found[1].kind, BoundaryKind::Class);
        assert_eq!(found[1].label, "Parser");
        assert_eq!(found[1].importance, Importance::High);
    }

    #[test]
    fn detects_python_def_with_indented_body() {
        let analyzer = BoundaryAnalyzer::default();
        let text = "def handler(request):\n    body = request.read()\n    return body\n\nx = 1\n";
        let found = analyzer.find_boundaries(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, BoundaryKind::Function);
        assert_eq!(found[0].label, "handler");
        assert_eq!(found[0].end_line, 3);
    }

    #[test]
    fn groups_consecutive_line_comments() {
        let analyzer = BoundaryAnalyzer::default();
        let text = "// first\n// second\n// third\nlet x = 1;\n";
        let found = analyzer.find_boundaries(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, BoundaryKind::Comment);
        assert_eq!(found[0].importance, Importance::Medium);
        assert_eq!(found[0].end_line, 3);
    }

    #[test]
    fn block_comment_spans_to_terminator() {
        let analyzer = BoundaryAnalyzer::default();
        let text = "/* copyright\n   notice\n*/\nint x;\n";
        let found = analyzer.find_boundaries(text);
        assert_eq!(found[0].kind, BoundaryKind::Comment);
        assert_eq!(found[0].end_line, 3);
    }

    #[test]
    fn preprocessor_outranks_hash_comment() {
        let analyzer = BoundaryAnalyzer::default();
        let text = "#include <stdio.h>\n# just a comment\n#define MAX 10\n";
        let found = analyzer.find_boundaries(text);
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].kind, BoundaryKind::Preprocessor);
        assert_eq!(found[0].importance, Importance::High);
        assert_eq!(found[1].kind, BoundaryKind::Comment);
        assert_eq!(found[2].kind, BoundaryKind::Preprocessor);
    }

    #[test]
    fn candidates_are_ordered_by_offset() {
        let analyzer = BoundaryAnalyzer::default();
        let text = "#include <a.h>\n\nvoid first() {}\n\n// note\n\nvoid second() {}\n";
        let found = analyzer.find_boundaries(text);
        assert!(found.windows(2).all(|w| w[0].start_offset <= w[1].start_offset));
    }

    #[test]
    fn comment_reporting_can_be_disabled() {
        let analyzer = BoundaryAnalyzer::new(true, false);
        let text = "// hidden\nfn shown() {}\n";
        let found = analyzer.find_boundaries(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, BoundaryKind::Function);
    }

    #[test]
    fn unterminated_block_comment_is_capped() {
        let analyzer = BoundaryAnalyzer::default();
        let text = "/* never closed\nmore\n";
        let found = analyzer.find_boundaries(text);
        assert_eq!(found.len(), 1);
        assert!(found[0].end_offset <= text.len());
    }
}
