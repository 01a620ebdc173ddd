//! Step 2 — Cross-paper Analysis: pattern/trend/approach mining over the
//! five analyzable aspects' step-1 hits.

use std::collections::BTreeMap;

use crate::types::{CrossPaperInsight, InsightMap, RetrievalMap, SummaryHit};

/// Aspects the analyzer runs over, in the fixed order of the five per-aspect
/// keyword lists below.
const ANALYZED_ASPECTS: [&str; 5] = ["methodology", "innovations", "challenges", "expedesign", "metric"];

fn trend_keywords(aspect: &str) -> &'static [&'static str] {
    match aspect {
        "methodology" => &["deep-learning", "end-to-end", "attention", "Transformer", "multimodal", "self-supervised"],
        "innovations" => &["attention", "residual", "batch-norm", "dropout", "regularization", "optimization"],
        "challenges" => &["data-scarcity", "compute-cost", "generalization", "overfitting", "labeling-cost", "real-time"],
        "expedesign" => &["dataset", "benchmark", "metric", "setup", "comparison", "ablation"],
        "metric" => &["accuracy", "recall", "F1", "AUC", "BLEU", "ROUGE"],
        _ => &[],
    }
}

fn approach_keywords(aspect: &str) -> &'static [&'static str] {
    match aspect {
        "methodology" => &["DL-based", "end-to-end-training", "attention", "MLP", "CNN"],
        "innovations" => &["multi-head attention", "residual", "batch-norm", "skip-connection", "feature-fusion"],
        "expedesign" => &["random-split", "cross-validation", "grid-search", "early-stopping", "data-augmentation"],
        _ => &[],
    }
}

fn compute_patterns(hits: &[SummaryHit]) -> (Vec<String>, BTreeMap<String, Vec<String>>) {
    let mut counts: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for hit in hits {
        for topic in &hit.topics {
            counts.entry(topic.clone()).or_default().push(hit.paper_id.clone());
        }
    }

    let n = hits.len();
    let mut patterns = Vec::new();
    for (topic, papers) in &counts {
        let k = papers.len();
        if k >= 2 {
            let pct = if n == 0 { 0 } else { k.saturating_mul(100).checked_div(n).unwrap_or(0) };
            patterns.push(format!("{topic} in {k}/{n} papers ({pct}%)"));
        }
    }
    (patterns, counts)
}

fn compute_trends(aspect: &str, hits: &[SummaryHit]) -> Vec<String> {
    let corpus: String = hits.iter().map(|h| h.summary_text.as_str()).collect::<Vec<_>>().join(" ");
    trend_keywords(aspect)
        .iter()
        .filter_map(|keyword| {
            let count = corpus.matches(keyword).count();
            (count >= 2).then(|| format!("{keyword} widely adopted"))
        })
        .collect()
}

fn compute_common_approaches(aspect: &str, hits: &[SummaryHit]) -> Vec<String> {
    approach_keywords(aspect)
        .iter()
        .filter_map(|keyword| {
            let hit_count = hits.iter().filter(|h| h.summary_text.contains(keyword)).count();
            (hit_count >= 2).then(|| (*keyword).to_string())
        })
        .collect()
}

fn analysis_summary(aspect: &str, hits: &[SummaryHit], patterns: &[String], trends: &[String]) -> String {
    format!(
        "{aspect}: {} papers analyzed, {} recurring pattern(s), {} adopted trend(s)",
        hits.len(),
        patterns.len(),
        trends.len()
    )
}

/// Mines patterns, trends, and common approaches over the five analyzable
/// aspects of a step-1 retrieval map.
pub struct CrossPaperAnalyzer;

impl CrossPaperAnalyzer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Analyze every aspect in [`ANALYZED_ASPECTS`] that has at least two
    /// hits in `retrieval`. Aspects below that threshold are omitted.
    #[must_use]
    pub fn analyze(&self, retrieval: &RetrievalMap) -> InsightMap {
        let mut insights = InsightMap::new();

        for aspect in ANALYZED_ASPECTS {
            let Some(hits) = retrieval.get(aspect) else {
                continue;
            };
            if hits.len() < 2 {
                continue;
            }

            let (patterns, topic_clusters) = compute_patterns(hits);
            let trends = compute_trends(aspect, hits);
            let common_approaches = compute_common_approaches(aspect, hits);
            let summary = analysis_summary(aspect, hits, &patterns, &trends);

            insights.insert(
                aspect.to_string(),
                CrossPaperInsight {
                    summaries: hits.clone(),
                    patterns,
                    trends,
                    common_approaches,
                    topic_clusters,
                    analysis_summary: summary,
                },
            );
        }

        insights
    }
}

impl Default for CrossPaperAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(paper_id: &str, summary_text: &str, topics: &[&str]) -> SummaryHit {
        SummaryHit {
            paper_id: paper_id.to_string(),
            summary_text: summary_text.to_string(),
            source_sections: vec![],
            topics: topics.iter().map(|t| (*t).to_string()).collect(),
            score: 0.5,
            summary_type: "methodology".to_string(),
        }
    }

    #[test]
    fn aspects_with_fewer_than_two_hits_are_omitted() {
        let mut retrieval = RetrievalMap::new();
        retrieval.insert("methodology".to_string(), vec![hit("p1", "attention attention", &["A"])]);
        let insights = CrossPaperAnalyzer::new().analyze(&retrieval);
        assert!(insights.is_empty());
    }

    #[test]
    fn trend_keyword_counted_at_least_twice_is_reported() {
        let mut retrieval = RetrievalMap::new();
        retrieval.insert(
            "methodology".to_string(),
            vec![
                hit("p1", "uses attention and attention again", &["A"]),
                hit("p2", "no relevant keywords here", &["A"]),
            ],
        );
        let insights = CrossPaperAnalyzer::new().analyze(&retrieval);
        let insight = insights.get("methodology").expect("methodology insight");
        assert!(insight.trends.contains(&"attention widely adopted".to_string()));
        assert!(insight.patterns.iter().any(|p| p.starts_with("A in 2/2 papers")));
    }

    #[test]
    fn expedesign_has_an_approach_list_but_metric_does_not() {
        assert!(!approach_keywords("expedesign").is_empty());
        assert!(approach_keywords("metric").is_empty());
    }
}
