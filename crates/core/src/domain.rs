//! Shared data-model types for the paper knowledge pipeline.
//!
//! `Topic`, the canonical section/aspect enumerations, and the constant
//! matrices that tie sections to aspects are process-wide read state:
//! every stage opens the stores fresh rather than sharing a live handle.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A topic keyword and its bookkeeping fields.
///
/// Invariants: ids are unique within a store; `merged ⇒ merged_to ≠ id`;
/// the redirect graph (`merged_to` edges) is acyclic; `aliases` never
/// contains the canonical `name_zh`/`name_en`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub name_zh: String,
    pub name_en: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub merged_to: Option<String>,
}

impl Topic {
    #[must_use]
    pub fn new(id: impl Into<String>, name_zh: impl Into<String>, name_en: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name_zh: name_zh.into(),
            name_en: name_en.into(),
            aliases: Vec::new(),
            parent_id: None,
            created_at: chrono::Utc::now().to_rfc3339(),
            merged: false,
            merged_to: None,
        }
    }

    /// The `"zh (en)"` display string used to tag chunks and summaries.
    #[must_use]
    pub fn display(&self) -> String {
        format!("{} ({})", self.name_zh, self.name_en)
    }

    /// Append a name/alias to `aliases`, deduplicated and order-preserving,
    /// skipping anything equal to the canonical `name_zh`/`name_en`.
    pub fn push_alias(&mut self, candidate: &str) {
        if candidate.is_empty() {
            return;
        }
        if candidate == self.name_zh || candidate == self.name_en {
            return;
        }
        if !self.aliases.iter().any(|a| a == candidate) {
            self.aliases.push(candidate.to_string());
        }
    }
}

/// The canonical set of five paper sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Section {
    Introduction,
    RelatedWork,
    Method,
    Experiments,
    Conclusion,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Introduction,
        Section::RelatedWork,
        Section::Method,
        Section::Experiments,
        Section::Conclusion,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Section::Introduction => "Introduction",
            Section::RelatedWork => "RelatedWork",
            Section::Method => "Method",
            Section::Experiments => "Experiments",
            Section::Conclusion => "Conclusion",
        }
    }

    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|sec| sec.as_str() == s)
    }

    /// The name of the section collection in the vector store.
    #[must_use]
    pub fn collection_name(self) -> String {
        match self {
            Section::Method => "paper_methodology".to_string(),
            other => format!("paper_{}", other.as_str().to_lowercase_snake()),
        }
    }
}

trait ToLowercaseSnake {
    fn to_lowercase_snake(&self) -> String;
}

impl ToLowercaseSnake for &str {
    fn to_lowercase_snake(&self) -> String {
        // "RelatedWork" -> "related_work", "Introduction" -> "introduction"
        let mut out = String::new();
        for (i, ch) in self.chars().enumerate() {
            if ch.is_uppercase() && i > 0 {
                out.push('_');
            }
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
        }
        out
    }
}

/// The fixed ten analytical aspects used by the concluder and summary store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Aspect {
    Background,
    RelatedWork,
    Challenges,
    Innovations,
    Methodology,
    ExpeDesign,
    Baseline,
    Metric,
    ResultAnalysis,
    Conclusion,
}

impl Aspect {
    pub const ALL: [Aspect; 10] = [
        Aspect::Background,
        Aspect::RelatedWork,
        Aspect::Challenges,
        Aspect::Innovations,
        Aspect::Methodology,
        Aspect::ExpeDesign,
        Aspect::Baseline,
        Aspect::Metric,
        Aspect::ResultAnalysis,
        Aspect::Conclusion,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Aspect::Background => "Background",
            Aspect::RelatedWork => "RelatedWork",
            Aspect::Challenges => "Challenges",
            Aspect::Innovations => "Innovations",
            Aspect::Methodology => "Methodology",
            Aspect::ExpeDesign => "ExpeDesign",
            Aspect::Baseline => "Baseline",
            Aspect::Metric => "Metric",
            Aspect::ResultAnalysis => "ResultAnalysis",
            Aspect::Conclusion => "Conclusion",
        }
    }

    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str().eq_ignore_ascii_case(s))
    }

    /// The lowercase key used in the retrieval pipeline (`summary_{lower}`,
    /// cross-paper analysis keys, keyword-list lookups).
    #[must_use]
    pub fn lower_key(self) -> String {
        self.as_str().to_lowercase()
    }

    /// The summary collection name in the vector store.
    #[must_use]
    pub fn collection_name(self) -> String {
        format!("summary_{}", self.lower_key())
    }

    /// The `Sections5` subset this aspect's concluder prompt draws from.
    #[must_use]
    pub fn required_sections(self) -> &'static [Section] {
        use Section::{Conclusion, Experiments, Introduction, Method, RelatedWork};
        match self {
            Aspect::Background => &[Introduction],
            Aspect::RelatedWork => &[RelatedWork],
            Aspect::Challenges => &[Introduction, RelatedWork],
            Aspect::Innovations => &[Introduction, Method],
            Aspect::Methodology => &[Method],
            Aspect::ExpeDesign => &[Experiments],
            Aspect::Baseline => &[Experiments],
            Aspect::Metric => &[Experiments],
            Aspect::ResultAnalysis => &[Experiments, Conclusion],
            Aspect::Conclusion => &[Conclusion],
        }
    }
}

/// The fixed generated-section -> feeding-aspects matrix (§3).
#[must_use]
pub fn section_aspects(section: Section) -> &'static [Aspect] {
    match section {
        Section::Introduction => &[Aspect::Background, Aspect::Challenges, Aspect::Innovations],
        Section::RelatedWork => &[Aspect::RelatedWork, Aspect::Challenges],
        Section::Method => &[Aspect::Methodology],
        Section::Experiments => &[
            Aspect::ExpeDesign,
            Aspect::Baseline,
            Aspect::Metric,
            Aspect::ResultAnalysis,
        ],
        Section::Conclusion => &[Aspect::Conclusion, Aspect::ResultAnalysis, Aspect::Innovations],
    }
}

/// Per-generated-section context requirement flags (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextRequirements {
    pub need_summaries: bool,
    pub need_trends: bool,
    pub need_source: bool,
}

#[must_use]
pub const fn context_requirements(section: Section) -> ContextRequirements {
    let need_source = matches!(section, Section::Method | Section::Experiments);
    ContextRequirements {
        need_summaries: true,
        need_trends: true,
        need_source,
    }
}

/// Fixed generation order for step 5 and its dependency declarations (§4.6).
#[must_use]
pub fn generation_order() -> &'static [(Section, &'static [Section])] {
    use Section::{Conclusion, Experiments, Introduction, Method, RelatedWork};
    &[
        (Introduction, &[]),
        (RelatedWork, &[Introduction]),
        (Method, &[Introduction, RelatedWork]),
        (Experiments, &[Method]),
        (Conclusion, &[Introduction, RelatedWork, Method, Experiments]),
    ]
}

/// Per-paper section-title classification produced by the matcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionMapping {
    pub paper_path: String,
    pub section_mapping: std::collections::BTreeMap<String, Section>,
    pub standard_sections: BTreeSet<Section>,
    pub total_sections: usize,
}

/// One chunk of a paper's canonical section, ready for the source store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperSectionRecord {
    pub paper_id: String,
    pub section: Section,
    pub text: String,
    pub topics: Vec<String>,
    pub embedding: Vec<f32>,
}

/// One aspect summary of a paper, ready for the summary store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperSummaryRecord {
    pub paper_id: String,
    pub summary_text: String,
    pub source_sections: Vec<Section>,
    pub topics: Vec<String>,
    pub embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_round_trips_through_str() {
        for section in Section::ALL {
            assert_eq!(Section::from_str_opt(section.as_str()), Some(section));
        }
    }

    #[test]
    fn aspect_round_trips_through_str() {
        for aspect in Aspect::ALL {
            assert_eq!(Aspect::from_str_opt(aspect.as_str()), Some(aspect));
        }
    }

    #[test]
    fn collection_names_match_spec_naming() {
        assert_eq!(Section::RelatedWork.collection_name(), "paper_related_work");
        assert_eq!(Section::Method.collection_name(), "paper_methodology");
        assert_eq!(Aspect::ExpeDesign.collection_name(), "summary_expedesign");
        assert_eq!(Aspect::ResultAnalysis.collection_name(), "summary_resultanalysis");
    }

    #[test]
    fn only_method_and_experiments_need_source() {
        for section in Section::ALL {
            let reqs = context_requirements(section);
            assert_eq!(
                reqs.need_source,
                matches!(section, Section::Method | Section::Experiments)
            );
            assert!(reqs.need_summaries && reqs.need_trends);
        }
    }

    #[test]
    fn generation_order_matches_spec_table() {
        let order: Vec<Section> = generation_order().iter().map(|(s, _)| *s).collect();
        assert_eq!(
            order,
            vec![
                Section::Introduction,
                Section::RelatedWork,
                Section::Method,
                Section::Experiments,
                Section::Conclusion,
            ]
        );
    }

    #[test]
    fn topic_push_alias_skips_canonical_name() {
        let mut topic = Topic::new("1", "高性能计算", "High Performance Computing");
        topic.push_alias("高性能计算");
        topic.push_alias("异构计算");
        topic.push_alias("异构计算");
        assert_eq!(topic.aliases, vec!["异构计算".to_string()]);
    }
}
