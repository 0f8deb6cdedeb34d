use std::path::Path;

use log::{debug, trace};

use crate::boundary::{BoundaryAnalyzer, Importance};
use crate::config::ChunkerConfig;
use crate::error::Result;
use crate::overlap::OverlapManager;
use crate::tokenizer::{TokenSpan, Tokenizer};
use crate::types::{stable_chunk_id, Chunk};

/// Splits text into token-bounded chunks with boundary-aware cut points.
///
/// Cuts are chosen inside `[min_tokens, max_tokens]` of the running chunk,
/// preferring positions where a high-importance boundary starts; when no
/// boundary falls in the window the cut lands exactly at `target_tokens`.
/// Adjacent chunks tile the file byte-for-byte; overlap is materialized
/// into `content` afterwards and never shifts the base ranges.
pub struct Chunker {
    config: ChunkerConfig,
    tokenizer: Tokenizer,
    analyzer: BoundaryAnalyzer,
    overlap: OverlapManager,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        let analyzer = BoundaryAnalyzer::new(config.preserve_functions, config.preserve_comments);
        let overlap = OverlapManager::new(config.min_overlap, config.max_overlap);
        Ok(Self {
            config,
            tokenizer: Tokenizer::new(),
            analyzer,
            overlap,
        })
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        // Default config always validates.
        Self::new(ChunkerConfig::default()).unwrap_or_else(|_| unreachable!())
    }

    #[must_use]
    pub const fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Read `path` and chunk its contents.
    pub fn chunk_file(&self, path: &Path) -> Result<Vec<Chunk>> {
        let text = std::fs::read_to_string(path)?;
        self.chunk_text(&path.to_string_lossy(), &text)
    }

    /// Chunk `text`, attributing every chunk to `source_path`.
    ///
    /// Empty and whitespace-only input yields no chunks. Otherwise the
    /// chunks' base ranges tile `[0, text.len())` without gaps.
    pub fn chunk_text(&self, source_path: &str, text: &str) -> Result<Vec<Chunk>> {
        let tokens = self.tokenizer.tokenize(text);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let boundaries = self.analyzer.find_boundaries(text);
        trace!(
            "chunking {source_path}: {} tokens, {} boundaries",
            tokens.len(),
            boundaries.len()
        );

        let ranges = self.cut_points(&tokens, &boundaries);
        let line_starts = line_start_table(text);

        let mut chunks = Vec::with_capacity(ranges.len());
        for (chunk_index, &(tok_start, tok_end)) in ranges.iter().enumerate() {
            let start_offset = if chunk_index == 0 {
                0
            } else {
                tokens[tok_start].start
            };
            let end_offset = if chunk_index == ranges.len() - 1 {
                text.len()
            } else {
                tokens[tok_end].start
            };

            let base = &text[start_offset..end_offset];
            chunks.push(Chunk {
                id: stable_chunk_id(source_path, chunk_index, base),
                source_file_path: source_path.to_string(),
                content: base.to_string(),
                token_count: tok_end - tok_start,
                start_line: line_of(&line_starts, start_offset),
                end_line: line_of(&line_starts, end_offset.saturating_sub(1)),
                start_offset,
                end_offset,
                chunk_index,
                overlap_prefix_tokens: 0,
                overlap_suffix_tokens: 0,
            });
        }

        let regions = self.overlap.apply(
            text,
            &tokens,
            &ranges,
            &boundaries,
            &mut chunks,
            self.config.max_tokens,
        );

        let retention = crate::overlap::boundary_retention(&boundaries, &regions);
        debug!(
            "{source_path}: {} chunks, boundary retention {retention:.2}",
            chunks.len()
        );
        Ok(chunks)
    }

    /// Token index ranges `[start, end)` of each chunk.
    fn cut_points(
        &self,
        tokens: &[TokenSpan],
        boundaries: &[crate::boundary::BoundaryCandidate],
    ) -> Vec<(usize, usize)> {
        let total = tokens.len();
        let cut_offsets: Vec<(usize, Importance)> = boundaries
            .iter()
            .filter(|b| b.importance >= Importance::High)
            .map(|b| (b.start_offset, b.importance))
            .collect();

        let mut ranges = Vec::new();
        let mut start = 0;
        while start < total {
            if total - start <= self.config.max_tokens {
                ranges.push((start, total));
                break;
            }

            let target = start + self.config.target_tokens.max(1);
            let lo = (start + self.config.min_tokens).max(start + 1);
            let hi = (start + self.config.max_tokens).min(total - 1);

            let mut best: Option<(usize, Importance)> = None;
            for cut in lo..=hi {
                let tok_off = tokens[cut].start;
                let Some(&(_, importance)) =
                    cut_offsets.iter().find(|&&(off, _)| off == tok_off)
                else {
                    continue;
                };
                let dist = cut.abs_diff(target);
                let better = match best {
                    None => true,
                    Some((prev_cut, prev_imp)) => {
                        let prev_dist = prev_cut.abs_diff(target);
                        dist < prev_dist
                            || (dist == prev_dist && importance > prev_imp)
                            || (dist == prev_dist && importance == prev_imp && cut < prev_cut)
                    }
                };
                if better {
                    best = Some((cut, importance));
                }
            }

            let cut = best.map_or_else(|| target.min(hi), |(c, _)| c);
            ranges.push((start, cut));
            start = cut;
        }
        ranges
    }
}

/// Byte offsets at which each line begins.
fn line_start_table(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (idx, byte) in text.bytes().enumerate() {
        if byte == b'\n' {
            starts.push(idx + 1);
        }
    }
    starts
}

/// 1-indexed line containing `offset`.
fn line_of(line_starts: &[usize], offset: usize) -> usize {
    line_starts.partition_point(|&start| start <= offset)
}
