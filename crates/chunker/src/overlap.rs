use crate::boundary::{BoundaryCandidate, Importance};
use crate::tokenizer::TokenSpan;
use crate::types::Chunk;

/// Byte span of a chunk's materialized content, overlap included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapRegion {
    pub content_start: usize,
    pub content_end: usize,
    pub prefix_tokens: usize,
    pub suffix_tokens: usize,
}

/// Materializes overlap around chunk cuts.
///
/// Each side of a cut gets a width in `[min_overlap, max_overlap]` tokens,
/// extended adaptively so the overlap edge lands on a boundary start where
/// one is in reach. Widths are then capped so overlap never exceeds the
/// neighbouring chunk's own tokens and a chunk's total stays within
/// `max_tokens`.
#[derive(Debug, Clone, Copy)]
pub struct OverlapManager {
    min_overlap: usize,
    max_overlap: usize,
}

impl OverlapManager {
    #[must_use]
    pub const fn new(min_overlap: usize, max_overlap: usize) -> Self {
        Self {
            min_overlap,
            max_overlap,
        }
    }

    /// Rewrite `chunks` in place with overlap prefixes/suffixes and return
    /// each chunk's resulting content span. `ranges` holds each chunk's
    /// token index range `[start, end)` into `tokens`.
    pub fn apply(
        &self,
        text: &str,
        tokens: &[TokenSpan],
        ranges: &[(usize, usize)],
        boundaries: &[BoundaryCandidate],
        chunks: &mut [Chunk],
        max_tokens: usize,
    ) -> Vec<OverlapRegion> {
        debug_assert_eq!(ranges.len(), chunks.len());
        if chunks.len() < 2 || self.max_overlap == 0 {
            return chunks
                .iter()
                .map(|c| OverlapRegion {
                    content_start: c.start_offset,
                    content_end: c.end_offset,
                    prefix_tokens: 0,
                    suffix_tokens: 0,
                })
                .collect();
        }

        let boundary_starts: Vec<usize> = boundaries.iter().map(|b| b.start_offset).collect();

        // Per-cut widths: suffix of the left chunk, prefix of the right.
        let cuts = chunks.len() - 1;
        let mut suffix_at = vec![0usize; chunks.len()];
        let mut prefix_at = vec![0usize; chunks.len()];
        for j in 0..cuts {
            let cut = ranges[j].1;
            let left_base = ranges[j].1 - ranges[j].0;
            let right_base = ranges[j + 1].1 - ranges[j + 1].0;

            prefix_at[j + 1] = self
                .backward_width(tokens, &boundary_starts, cut)
                .min(left_base);
            suffix_at[j] = self
                .forward_width(tokens, &boundary_starts, cut)
                .min(right_base);
        }

        let mut regions = Vec::with_capacity(chunks.len());
        for (idx, chunk) in chunks.iter_mut().enumerate() {
            let (tok_start, tok_end) = ranges[idx];
            let base = tok_end - tok_start;
            let mut prefix = prefix_at[idx];
            let mut suffix = suffix_at[idx];

            // Suffix gives way first when the combined budget is exceeded.
            trim_to_budget(&mut prefix, &mut suffix, self.max_overlap);
            trim_to_budget(&mut prefix, &mut suffix, max_tokens.saturating_sub(base));

            let content_start = if prefix > 0 {
                tokens[tok_start - prefix].start
            } else {
                chunk.start_offset
            };
            let content_end = if suffix > 0 {
                tokens[tok_end + suffix - 1].end
            } else {
                chunk.end_offset
            };

            chunk.content = text[content_start..content_end].to_string();
            chunk.token_count = base + prefix + suffix;
            chunk.overlap_prefix_tokens = prefix;
            chunk.overlap_suffix_tokens = suffix;
            regions.push(OverlapRegion {
                content_start,
                content_end,
                prefix_tokens: prefix,
                suffix_tokens: suffix,
            });
        }
        regions
    }

    /// Smallest width in `[min_overlap, max_overlap]` whose first token
    /// starts a boundary, falling back to `min_overlap`.
    fn backward_width(&self, tokens: &[TokenSpan], boundary_starts: &[usize], cut: usize) -> usize {
        for width in self.min_overlap..=self.max_overlap {
            if width > cut {
                break;
            }
            if boundary_starts.binary_search(&tokens[cut - width].start).is_ok() {
                return width;
            }
        }
        self.min_overlap.min(cut)
    }

    /// Smallest width in `[min_overlap, max_overlap]` that ends just before
    /// the next boundary start, falling back to `min_overlap`.
    fn forward_width(&self, tokens: &[TokenSpan], boundary_starts: &[usize], cut: usize) -> usize {
        let avail = tokens.len() - cut;
        for width in self.min_overlap..=self.max_overlap.min(avail.saturating_sub(1)) {
            if boundary_starts.binary_search(&tokens[cut + width].start).is_ok() {
                return width;
            }
        }
        self.min_overlap.min(avail)
    }
}

fn trim_to_budget(prefix: &mut usize, suffix: &mut usize, budget: usize) {
    if *prefix + *suffix <= budget {
        return;
    }
    let over = *prefix + *suffix - budget;
    let from_suffix = over.min(*suffix);
    *suffix -= from_suffix;
    *prefix -= over - from_suffix;
}

/// Fraction of high-importance boundaries fully contained in at least one
/// chunk's content span. 1.0 when there are none.
#[must_use]
pub fn boundary_retention(boundaries: &[BoundaryCandidate], regions: &[OverlapRegion]) -> f64 {
    let important: Vec<_> = boundaries
        .iter()
        .filter(|b| b.importance >= Importance::High)
        .collect();
    if important.is_empty() {
        return 1.0;
    }
    let kept = important
        .iter()
        .filter(|b| {
            regions
                .iter()
                .any(|r| r.content_start <= b.start_offset && b.end_offset <= r.content_end)
        })
        .count();
    kept as f64 / important.len() as f64
}
