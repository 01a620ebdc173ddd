//! Step 4 — Context Builder: assemble one structured context string per
//! generated section from steps 1–3's outputs.

use paperloom_core::domain::{context_requirements, section_aspects, Section};

use crate::types::{ContextMap, InsightMap, RetrievalMap, SourceTextMap};

const SUMMARY_TRUNCATE: usize = 500;
const SOURCE_TRUNCATE: usize = 300;
const MAX_SUMMARIES_PER_ASPECT: usize = 3;
const MAX_TRENDS: usize = 3;
const MAX_PATTERNS: usize = 3;
const MAX_SOURCE_CHUNKS_PER_PAPER: usize = 2;

fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(max_len).collect();
        out.push_str("...");
        out
    }
}

fn build_summary_context(section: Section, retrieval: &RetrievalMap) -> Option<String> {
    let mut block = String::new();
    for aspect in section_aspects(section) {
        let Some(hits) = retrieval.get(&aspect.lower_key()) else {
            continue;
        };
        for hit in hits.iter().take(MAX_SUMMARIES_PER_ASPECT) {
            block.push_str(&format!("- [{}] {}\n", hit.paper_id, truncate(&hit.summary_text, SUMMARY_TRUNCATE)));
        }
    }
    (!block.is_empty()).then_some(block)
}

fn build_trends_context(section: Section, insights: &InsightMap) -> Option<String> {
    let mut block = String::new();
    for aspect in section_aspects(section) {
        let Some(insight) = insights.get(&aspect.lower_key()) else {
            continue;
        };
        for trend in insight.trends.iter().take(MAX_TRENDS) {
            block.push_str(&format!("- trend: {trend}\n"));
        }
        for pattern in insight.patterns.iter().take(MAX_PATTERNS) {
            block.push_str(&format!("- pattern: {pattern}\n"));
        }
    }
    (!block.is_empty()).then_some(block)
}

fn build_source_text_context(section: Section, source_text: &SourceTextMap) -> Option<String> {
    if !matches!(section, Section::Method | Section::Experiments) {
        return None;
    }

    let mut block = String::new();
    for (paper_id, sections) in source_text {
        let Some(chunks) = sections.get(&section) else {
            continue;
        };
        for chunk in chunks.iter().take(MAX_SOURCE_CHUNKS_PER_PAPER) {
            block.push_str(&format!("- [{paper_id}] {}\n", truncate(chunk, SOURCE_TRUNCATE)));
        }
    }
    (!block.is_empty()).then_some(block)
}

/// Builds the per-section structured context block consumed by step 5.
pub struct ContextBuilder;

impl ContextBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Build one context string per `Sections5` entry, concatenating
    /// summary, trends, and source sub-contexts in order; any sub-context
    /// with nothing to contribute is omitted entirely.
    #[must_use]
    pub fn build(&self, retrieval: &RetrievalMap, insights: &InsightMap, source_text: &SourceTextMap) -> ContextMap {
        let mut contexts = ContextMap::new();

        for section in Section::ALL {
            let reqs = context_requirements(section);
            let mut parts = Vec::new();

            if reqs.need_summaries {
                if let Some(summary) = build_summary_context(section, retrieval) {
                    parts.push(format!("## Related summaries\n{summary}"));
                }
            }
            if reqs.need_trends {
                if let Some(trends) = build_trends_context(section, insights) {
                    parts.push(format!("## Trends and patterns\n{trends}"));
                }
            }
            if reqs.need_source {
                if let Some(source) = build_source_text_context(section, source_text) {
                    parts.push(format!("## Source excerpts\n{source}"));
                }
            }

            contexts.insert(section, parts.join("\n"));
        }

        contexts
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CrossPaperInsight, SummaryHit};
    use std::collections::BTreeMap;

    fn hit(paper_id: &str) -> SummaryHit {
        SummaryHit {
            paper_id: paper_id.to_string(),
            summary_text: "a".repeat(600),
            source_sections: vec![],
            topics: vec![],
            score: 0.1,
            summary_type: "background".to_string(),
        }
    }

    #[test]
    fn only_method_and_experiments_get_source_context() {
        let mut source_text: SourceTextMap = BTreeMap::new();
        source_text.entry("p1".to_string()).or_default().insert(Section::Method, vec!["method text".to_string()]);

        let builder = ContextBuilder::new();
        let contexts = builder.build(&RetrievalMap::new(), &InsightMap::new(), &source_text);

        assert!(contexts.get(&Section::Method).is_some_and(|c| c.contains("Source excerpts")));
        assert!(!contexts.get(&Section::Introduction).is_some_and(|c| c.contains("Source excerpts")));
    }

    #[test]
    fn summary_context_truncates_long_text() {
        let mut retrieval = RetrievalMap::new();
        retrieval.insert("background".to_string(), vec![hit("p1")]);

        let context = build_summary_context(Section::Introduction, &retrieval).expect("context");
        assert!(context.contains("..."));
    }

    #[test]
    fn trends_context_is_none_when_no_insight_present() {
        assert!(build_trends_context(Section::Introduction, &InsightMap::new()).is_none());
    }
}
