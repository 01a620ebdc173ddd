//! Sentence-aware chunking with overlap, per the source store's contract.

use std::sync::LazyLock;

use paperloom_core::config::ChunkingConfig;
use regex::Regex;

#[allow(clippy::expect_used)]
static SENTENCE_TERMINATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?。!?]+\s*").expect("valid sentence-terminator regex"));

/// Locale-neutral end-of-sentence split: on `. ! ?` (ASCII or fullwidth)
/// followed by whitespace, or end of input.
#[must_use]
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut last_end = 0usize;

    for mat in SENTENCE_TERMINATOR.find_iter(text) {
        let sentence = text.get(last_end..mat.end()).unwrap_or("").trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        last_end = mat.end();
    }

    let tail = text.get(last_end..).unwrap_or("").trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }

    sentences
}

/// Walk `sentences`, at each position prepending any immediately-preceding
/// sentences whose cumulative length fits `overlap_size`, then appending
/// forward sentences while the running length fits `chunk_size`. Advances
/// to the first sentence not included forward.
#[must_use]
pub fn chunk_sentences(sentences: &[String], chunk_size: usize, overlap_size: usize) -> Vec<String> {
    if sentences.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut i = 0usize;

    while i < sentences.len() {
        let mut prefix: Vec<&str> = Vec::new();
        let mut prefix_len = 0usize;
        let mut back = i;
        while back > 0 {
            let candidate = sentences.get(back.saturating_sub(1)).map_or("", |s| s.as_str());
            let candidate_len = candidate.chars().count();
            if prefix_len.saturating_add(candidate_len) > overlap_size {
                break;
            }
            prefix_len = prefix_len.saturating_add(candidate_len);
            prefix.insert(0, candidate);
            back = back.saturating_sub(1);
        }

        let mut forward: Vec<&str> = Vec::new();
        let mut running_len = prefix_len;
        let mut next = i;
        while next < sentences.len() {
            let candidate = sentences.get(next).map_or("", |s| s.as_str());
            let candidate_len = candidate.chars().count();
            if !forward.is_empty() && running_len.saturating_add(candidate_len) > chunk_size {
                break;
            }
            running_len = running_len.saturating_add(candidate_len);
            forward.push(candidate);
            next = next.saturating_add(1);
        }

        if forward.is_empty() {
            if let Some(candidate) = sentences.get(i) {
                forward.push(candidate.as_str());
            }
            next = i.saturating_add(1);
        }

        let mut parts = prefix;
        parts.extend(forward);
        chunks.push(parts.join(" "));

        i = next;
    }

    chunks
}

/// Split then chunk using the given config.
#[must_use]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let sentences = split_sentences(text);
    chunk_sentences(&sentences, config.chunk_size, config.overlap_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_terminal_punctuation() {
        let sentences = split_sentences("One. Two! Three?");
        assert_eq!(sentences, vec!["One.".to_string(), "Two!".to_string(), "Three?".to_string()]);
    }

    #[test]
    fn splits_on_fullwidth_punctuation() {
        let sentences = split_sentences("第一句。第二句！");
        assert_eq!(sentences, vec!["第一句。".to_string(), "第二句！".to_string()]);
    }

    #[test]
    fn empty_text_yields_no_sentences() {
        assert!(split_sentences("   ").is_empty());
    }

    #[test]
    fn chunks_overlap_by_prefix_sentences() {
        let sentences: Vec<String> = (0..6).map(|n| format!("Sentence number {n} is here.")).collect();
        let chunks = chunk_sentences(&sentences, 40, 20);
        assert!(chunks.len() >= 2);
        // every chunk after the first reuses at least the trailing words of its predecessor
        for pair in chunks.windows(2) {
            let prev = pair.first().map_or("", |s| s.as_str());
            let next = pair.get(1).map_or("", |s| s.as_str());
            let prev_tail: Vec<&str> = prev.split_whitespace().rev().take(2).collect();
            assert!(prev_tail.iter().all(|w| next.contains(w)));
        }
    }

    #[test]
    fn oversized_single_sentence_still_emits_one_chunk() {
        let sentences = vec!["x".repeat(1000)];
        let chunks = chunk_sentences(&sentences, 10, 5);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn reconstructs_full_sentence_order_without_overlap() {
        let sentences: Vec<String> = vec!["a.".to_string(), "b.".to_string(), "c.".to_string()];
        let chunks = chunk_sentences(&sentences, 2, 0);
        let joined = chunks.join(" ");
        assert!(joined.contains("a."));
        assert!(joined.contains("b."));
        assert!(joined.contains("c."));
    }
}
