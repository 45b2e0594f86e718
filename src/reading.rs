use crate::post::ContentBlock;

/// Fixed reading speed used for the estimate. Advisory UI metadata only:
/// deterministic and monotone with content length is what matters.
const WORDS_PER_MINUTE: u64 = 200;

/// Total words across every section heading and body paragraph, in document
/// order. Splitting is on single spaces, with empty fragments discarded so
/// runs of spaces do not inflate the count.
pub fn word_count(content: &[ContentBlock]) -> u64 {
    content
        .iter()
        .map(|block| {
            let body_words: u64 = block.body.iter().map(|p| words(&p.text)).sum();
            words(&block.heading) + body_words
        })
        .sum()
}

/// Estimated minutes to read, rounded up. Empty content reads in 0 minutes.
pub fn estimate_minutes(content: &[ContentBlock]) -> u64 {
    word_count(content).div_ceil(WORDS_PER_MINUTE)
}

fn words(text: &str) -> u64 {
    text.split(' ').filter(|w| !w.is_empty()).count() as u64
}
