//! Turns ranked sources into one attributed context block for a generation prompt.

use rag_core::domain::Source;

/// Line placed between two source blocks. Chosen so it does not occur in ordinary prose or
/// markdown (a plain `---` would collide with horizontal rules).
pub const SOURCE_SEPARATOR: &str = "\n\n=====[ end of source ]=====\n\n";

/// Attribution header for the `index`-th (1-based) source.
pub fn source_header(index: usize, source: &Source) -> String {
    format!("[Source {index}: {}]", source.document_path)
}

fn source_block(index: usize, source: &Source) -> String {
    format!("{}\n{}", source_header(index, source), source.chunk.text)
}

/// Join the first `max_sources` sources, in the order given, into one block. Each block is
/// a header naming the document followed by that source's chunk text and nothing else.
pub fn assemble(sources: &[Source], max_sources: usize) -> String {
    sources
        .iter()
        .take(max_sources)
        .enumerate()
        .map(|(i, s)| source_block(i + 1, s))
        .collect::<Vec<_>>()
        .join(SOURCE_SEPARATOR)
}

/// Like [`assemble`], but stops before the first block that would take the result past
/// `max_chars` characters (Unicode scalar values, not bytes). Blocks are never cut; the
/// first block is always included.
pub fn assemble_within(sources: &[Source], max_sources: usize, max_chars: usize) -> String {
    let separator_chars = SOURCE_SEPARATOR.chars().count();
    let mut out = String::new();
    let mut used = 0usize;
    for (i, s) in sources.iter().take(max_sources).enumerate() {
        let block = source_block(i + 1, s);
        let block_chars = block.chars().count();
        if i > 0 {
            if used + separator_chars + block_chars > max_chars {
                tracing::debug!(kept = i, max_chars, "context budget reached");
                break;
            }
            out.push_str(SOURCE_SEPARATOR);
            used += separator_chars;
        }
        out.push_str(&block);
        used += block_chars;
    }
    out
}
