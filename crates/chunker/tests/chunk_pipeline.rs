use chunkdex_chunker::{Chunker, ChunkerConfig};
use pretty_assertions::assert_eq;

fn plain_words(n: usize) -> String {
    (0..n)
        .map(|i| format!("token{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn large_plain_file_splits_near_target() {
    let chunker = Chunker::with_defaults();
    let text = plain_words(1200);
    let chunks = chunker.chunk_text("notes.txt", &text).unwrap();

    assert_eq!(chunks.len(), 3);
    for chunk in &chunks[..2] {
        assert!(
            chunk.token_count >= 500 && chunk.token_count <= 600,
            "interior chunk carries {} tokens",
            chunk.token_count
        );
    }
    assert!(chunks[2].token_count <= 500);
}

#[test]
fn chunks_cover_the_whole_file() {
    let chunker = Chunker::with_defaults();
    let text = plain_words(1200);
    let chunks = chunker.chunk_text("notes.txt", &text).unwrap();

    assert_eq!(chunks[0].start_offset, 0);
    assert_eq!(chunks.last().unwrap().end_offset, text.len());
    for pair in chunks.windows(2) {
        assert_eq!(pair[0].end_offset, pair[1].start_offset, "gap between chunks");
    }
    let total_base: usize = chunks.iter().map(chunkdex_chunker::Chunk::byte_len).sum();
    assert_eq!(total_base, text.len());
}

#[test]
fn adjacent_chunks_share_overlap() {
    let chunker = Chunker::with_defaults();
    let text = plain_words(1200);
    let chunks = chunker.chunk_text("notes.txt", &text).unwrap();

    for pair in chunks.windows(2) {
        assert!(pair[0].overlap_suffix_tokens >= 25);
        assert!(pair[1].overlap_prefix_tokens >= 25);
        // The left chunk's content runs past the cut into the right chunk.
        let lead_in = &text[pair[1].start_offset..(pair[1].start_offset + 6).min(text.len())];
        assert!(pair[0].content.contains(lead_in));
    }
}

#[test]
fn source_code_cuts_respect_function_starts() {
    let functions: String = (0..120)
        .map(|i| {
            format!(
                "fn handler_{i}(input: &str) -> usize {{\n    let trimmed = input.trim();\n    trimmed.len() + {i}\n}}\n\n"
            )
        })
        .collect();

    let chunker = Chunker::with_defaults();
    let chunks = chunker.chunk_text("handlers.rs", &functions).unwrap();
    assert!(chunks.len() > 1);

    // Every interior cut should land on a function signature.
    for chunk in &chunks[1..] {
        let head = &functions[chunk.start_offset..];
        assert!(
            head.starts_with("fn handler_"),
            "chunk {} starts mid-function: {:?}",
            chunk.chunk_index,
            &head[..head.len().min(30)]
        );
    }
}

#[test]
fn chunk_ids_are_stable_across_runs() {
    let chunker = Chunker::with_defaults();
    let text = plain_words(1200);
    let first: Vec<String> = chunker
        .chunk_text("notes.txt", &text)
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    let second: Vec<String> = chunker
        .chunk_text("notes.txt", &text)
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(first, second);
}

#[test]
fn custom_bounds_are_honored() {
    let config = ChunkerConfig {
        target_tokens: 50,
        min_tokens: 40,
        max_tokens: 60,
        min_overlap: 5,
        max_overlap: 10,
        ..ChunkerConfig::default()
    };
    let chunker = Chunker::new(config).unwrap();
    let chunks = chunker.chunk_text("notes.txt", &plain_words(300)).unwrap();
    for chunk in &chunks {
        assert!(chunk.token_count <= 60);
    }
    for chunk in &chunks[..chunks.len() - 1] {
        assert!(chunk.base_token_count() >= 40);
    }
}
