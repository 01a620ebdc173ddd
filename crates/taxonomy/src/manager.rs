//! `TopicManager`: proposal parsing, deterministic merge application, and
//! renumbering-into-target. The LLM only ever suggests; every state change
//! it proposes is re-derived and applied here in code.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, LazyLock};

use paperloom_core::domain::Topic;
use paperloom_llm::LlmClient;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::store::TopicStore;

/// How merged keyword parentage transfers during an `apply` pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeKind {
    /// `合并 A -> B`: fold A's names into B's aliases; A redirects to B.
    Absorb,
    /// `更新并合并 A -> B`: swap B's payload for A's, then A redirects to B.
    SwapThenAbsorb,
}

/// One parsed merge-suggestion line, in the textual order it appeared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSuggestion {
    pub source: String,
    pub target: String,
    pub kind: MergeKind,
}

#[allow(clippy::expect_used)]
static SWAP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"更新并合并\s*(\d+)\s*-+>\s*(\d+)").expect("valid swap-merge regex"));

#[allow(clippy::expect_used)]
static ABSORB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"合并\s*(\d+)\s*-+>\s*(\d+)").expect("valid absorb-merge regex"));

#[allow(clippy::expect_used)]
static NEW_TOPIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^()（）;；]+)[\(（]([^()（）]+)[\)）]").expect("valid new-topic regex"));

fn capture_str<'a>(caps: &regex::Captures<'a>, idx: usize) -> &'a str {
    caps.get(idx).map_or("", |m| m.as_str())
}

/// Parse a merge-suggestion response, restricted to exactly the two
/// contract forms. Everything else — headers, rationale text, stray
/// `X -> Y` without the `合并` marker — is ignored. A suggestion with
/// `A == B` is dropped.
#[must_use]
pub fn parse_merge_suggestions(response: &str) -> Vec<MergeSuggestion> {
    if response.contains("无需合并") {
        return Vec::new();
    }

    let mut spans: Vec<(usize, usize, MergeSuggestion)> = Vec::new();

    for caps in SWAP_RE.captures_iter(response) {
        let Some(whole) = caps.get(0) else { continue };
        let source = capture_str(&caps, 1).to_string();
        let target = capture_str(&caps, 2).to_string();
        if source.is_empty() || target.is_empty() || source == target {
            continue;
        }
        spans.push((
            whole.start(),
            whole.end(),
            MergeSuggestion {
                source,
                target,
                kind: MergeKind::SwapThenAbsorb,
            },
        ));
    }

    for caps in ABSORB_RE.captures_iter(response) {
        let Some(whole) = caps.get(0) else { continue };
        let nested_in_swap = spans
            .iter()
            .any(|(start, end, s)| s.kind == MergeKind::SwapThenAbsorb && whole.start() >= *start && whole.end() <= *end);
        if nested_in_swap {
            continue;
        }
        let source = capture_str(&caps, 1).to_string();
        let target = capture_str(&caps, 2).to_string();
        if source.is_empty() || target.is_empty() || source == target {
            continue;
        }
        spans.push((
            whole.start(),
            whole.end(),
            MergeSuggestion {
                source,
                target,
                kind: MergeKind::Absorb,
            },
        ));
    }

    spans.sort_by_key(|(start, _, _)| *start);
    spans.into_iter().map(|(_, _, s)| s).collect()
}

/// Outcome of a `propose` call: existing ids the abstract matched, and
/// brand-new `(name_zh, name_en)` pairs to seed into `gen_topic`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposeOutcome {
    pub matched_existing_ids: Vec<String>,
    pub new_topic_names: Vec<(String, String)>,
}

/// Render a store's topics as `"id. name_zh（name_en）"` lines, one per
/// topic. Used to build the propose/merge prompts, and exposed so a caller
/// persisting §6's `merge_ori` artifact can record the exact pre-merge list
/// a round was run against.
#[must_use]
pub fn topic_list_text(store: &TopicStore) -> String {
    store
        .topics
        .values()
        .map(|t| format!("{}. {}（{}）", t.id, t.name_zh, t.name_en))
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_propose_prompt(store: &TopicStore, paper_abstract: &str) -> String {
    format!(
        "Existing topics:\n{}\n\nAbstract:\n{}\n\nReply with a line starting with \"匹配:\" listing matched topic ids, and a line starting with \"新增:\" listing newly proposed topics as \"zh（en）\" pairs separated by \";\".",
        topic_list_text(store),
        paper_abstract
    )
}

/// Parse a `propose` response: known ids on the "匹配" line (unknown ids
/// dropped), new `zh（en）` pairs on the "新增" line.
#[must_use]
pub fn parse_propose_response(response: &str, store: &TopicStore) -> ProposeOutcome {
    let mut matched_existing_ids = Vec::new();
    let mut new_topic_names = Vec::new();

    for line in response.lines() {
        if let Some(rest) = line.split_once("匹配").map(|(_, r)| r.trim_start_matches([':', '：']).trim()) {
            for token in rest.split(|c: char| c == ',' || c == '，' || c.is_whitespace()) {
                let token = token.trim();
                if !token.is_empty() && store.get(token).is_some() {
                    matched_existing_ids.push(token.to_string());
                }
            }
        } else if let Some(rest) = line.split_once("新增").map(|(_, r)| r.trim_start_matches([':', '：']).trim()) {
            for entry in rest.split([';', '；']) {
                if let Some(caps) = NEW_TOPIC_RE.captures(entry.trim()) {
                    let name_zh = capture_str(&caps, 1).trim().to_string();
                    let name_en = capture_str(&caps, 2).trim().to_string();
                    if !name_zh.is_empty() && !name_en.is_empty() {
                        new_topic_names.push((name_zh, name_en));
                    }
                }
            }
        }
    }

    ProposeOutcome {
        matched_existing_ids,
        new_topic_names,
    }
}

fn apply_suggestion(topics: &mut BTreeMap<String, Topic>, suggestion: &MergeSuggestion) {
    let Some(source_snapshot) = topics.get(&suggestion.source).cloned() else {
        return;
    };
    if !topics.contains_key(&suggestion.target) {
        return;
    }

    match suggestion.kind {
        MergeKind::Absorb => {
            if let Some(target_topic) = topics.get_mut(&suggestion.target) {
                target_topic.push_alias(&source_snapshot.name_zh);
                target_topic.push_alias(&source_snapshot.name_en);
                for alias in &source_snapshot.aliases {
                    target_topic.push_alias(alias);
                }
            }
            if let Some(source_topic) = topics.get_mut(&suggestion.source) {
                source_topic.merged = true;
                source_topic.merged_to = Some(suggestion.target.clone());
            }
        }
        MergeKind::SwapThenAbsorb => {
            let Some(target_snapshot) = topics.get(&suggestion.target).cloned() else {
                return;
            };
            if let Some(target_topic) = topics.get_mut(&suggestion.target) {
                target_topic.name_zh = source_snapshot.name_zh.clone();
                target_topic.name_en = source_snapshot.name_en.clone();
                target_topic.aliases = source_snapshot.aliases.clone();
            }
            if let Some(source_topic) = topics.get_mut(&suggestion.source) {
                source_topic.name_zh = target_snapshot.name_zh;
                source_topic.name_en = target_snapshot.name_en;
                source_topic.aliases = target_snapshot.aliases;
                source_topic.merged = true;
                source_topic.merged_to = Some(suggestion.target.clone());
            }
        }
    }
}

/// Walk surviving (non-merged) topics in ascending numeric id order and
/// assign a contiguous `1, 2, 3, …` id sequence, dropping `merged`/
/// `merged_to`.
fn renumber(topics: &BTreeMap<String, Topic>) -> TopicStore {
    let mut ordered: Vec<&Topic> = topics.values().filter(|t| !t.merged).collect();
    ordered.sort_by_key(|t| t.id.parse::<u64>().unwrap_or(u64::MAX));

    let mut store = TopicStore::new();
    for (index, topic) in ordered.into_iter().enumerate() {
        let new_id = index.saturating_add(1).to_string();
        store.insert(Topic {
            id: new_id,
            name_zh: topic.name_zh.clone(),
            name_en: topic.name_en.clone(),
            aliases: topic.aliases.clone(),
            parent_id: topic.parent_id.clone(),
            created_at: topic.created_at.clone(),
            merged: false,
            merged_to: None,
        });
    }
    store
}

/// Append a `propose` outcome's new topic names into `gen`, assigning each
/// a fresh monotonically increasing id starting one greater than the
/// highest numeric id seen in either `stable` or `gen`. Returns the full
/// id list (matched existing ids followed by the freshly assigned ones)
/// for the caller to persist as this paper's topic labels.
pub fn apply_propose_outcome(gen: &mut TopicStore, stable: &TopicStore, outcome: &ProposeOutcome) -> Vec<String> {
    let mut next_id = stable.max_numeric_id().max(gen.max_numeric_id()).saturating_add(1);
    let mut ids = outcome.matched_existing_ids.clone();

    for (name_zh, name_en) in &outcome.new_topic_names {
        let topic = Topic::new(next_id.to_string(), name_zh.clone(), name_en.clone());
        ids.push(topic.id.clone());
        gen.insert(topic);
        next_id = next_id.saturating_add(1);
    }

    ids
}

/// Apply suggestions in textual order, returning the pre-renumber working
/// store (source and target ids unchanged, `merged`/`merged_to` set on
/// absorbed topics). Exposed so callers that need to synchronize display
/// names elsewhere (the vector-store synchronizer) can resolve both the
/// old and new name of each `(source, target)` pair before the ids get
/// collapsed by renumbering.
#[must_use]
pub fn apply_suggestions(source: &TopicStore, suggestions: &[MergeSuggestion]) -> TopicStore {
    let mut working: BTreeMap<String, Topic> = source.topics.clone();
    for suggestion in suggestions {
        apply_suggestion(&mut working, suggestion);
    }
    TopicStore { topics: working }
}

/// Apply suggestions in textual order, then renumber into a fresh store.
/// Exposed standalone so `merge_round` and tests share one code path.
#[must_use]
pub fn apply_and_renumber(source: &TopicStore, suggestions: &[MergeSuggestion]) -> TopicStore {
    renumber(&apply_suggestions(source, suggestions).topics)
}

/// Follow `merged_to` redirects to their terminal id, aborting on a
/// revisit or after `max_hops` steps (whichever comes first).
#[must_use]
pub fn effective_id(store: &TopicStore, id: &str, max_hops: usize) -> String {
    let mut current = id.to_string();
    let mut visited = HashSet::new();

    for _ in 0..max_hops {
        let Some(topic) = store.get(&current) else {
            break;
        };
        if !topic.merged {
            break;
        }
        let Some(next) = topic.merged_to.clone() else {
            break;
        };
        if visited.contains(&current) {
            warn!(id, "cycle detected while resolving effective topic id");
            break;
        }
        visited.insert(current.clone());
        current = next;
    }

    current
}

/// Default bound on redirect-chain length before `effective_id` gives up.
pub const DEFAULT_MAX_HOPS: usize = 64;

/// Everything one `merge_round` pass produced, for a caller that needs more
/// than the renumbered result: the pre-renumber working store (for the
/// vector-store synchronizer), the parsed suggestions in textual order, and
/// the raw LLM response they were parsed from (persisted verbatim as §6's
/// `merge_LLM_result` artifact; `None` when the round LLM call failed and
/// ran as a no-op).
#[derive(Debug, Clone, Default)]
pub struct MergeRoundOutcome {
    pub renumbered: TopicStore,
    pub working: TopicStore,
    pub suggestions: Vec<MergeSuggestion>,
    pub raw_response: Option<String>,
}

/// Orchestrates proposal and merge-round stabilization against an LLM.
pub struct TopicManager {
    llm: Arc<dyn LlmClient>,
}

impl TopicManager {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Propose matched/new topics for one paper abstract against the
    /// current stable store.
    pub async fn propose(&self, stable: &TopicStore, paper_abstract: &str) -> Result<ProposeOutcome> {
        let prompt = build_propose_prompt(stable, paper_abstract);
        let response = self.llm.complete(&prompt).await?;
        Ok(match response {
            Some(text) => parse_propose_response(&text, stable),
            None => {
                warn!("propose: no LLM response, returning empty outcome");
                ProposeOutcome::default()
            }
        })
    }

    /// `propose`, then immediately fold the outcome's new names into `gen`
    /// with fresh ids. Used by the `extract` stage, which accumulates
    /// proposals from every paper abstract into one working `gen_topic`.
    pub async fn propose_into_gen(&self, gen: &mut TopicStore, stable: &TopicStore, paper_abstract: &str) -> Result<Vec<String>> {
        let outcome = self.propose(stable, paper_abstract).await?;
        Ok(apply_propose_outcome(gen, stable, &outcome))
    }

    /// Generate suggestions, apply them deterministically, and renumber
    /// into a fresh store. An LLM failure during generation is treated as
    /// a no-op round: the source is renumbered into the target unchanged.
    pub async fn merge_round(&self, source: &TopicStore) -> TopicStore {
        self.merge_round_with_changes(source).await.renumbered
    }

    /// `merge_round`, additionally returning the pre-renumber working store,
    /// the `(source, target)` merge pairs applied this round, and the raw
    /// LLM response, so a caller can synchronize display-name changes
    /// elsewhere (the vector-store synchronizer) before the ids get
    /// collapsed, and persist §6's merge artifacts.
    pub async fn merge_round_with_changes(&self, source: &TopicStore) -> MergeRoundOutcome {
        if source.is_empty() {
            return MergeRoundOutcome::default();
        }

        let prompt = build_merge_prompt(source);
        let response = match self.llm.complete(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "merge round LLM call failed, skipping as no-op");
                None
            }
        };

        let suggestions = match &response {
            Some(text) => parse_merge_suggestions(text),
            None => Vec::new(),
        };

        info!(count = suggestions.len(), "applying merge suggestions");
        let working = apply_suggestions(source, &suggestions);
        let renumbered = renumber(&working.topics);
        MergeRoundOutcome {
            renumbered,
            working,
            suggestions,
            raw_response: response,
        }
    }
}

fn build_merge_prompt(store: &TopicStore) -> String {
    format!(
        "The following topic keywords may overlap. Reply with lines of the form \"合并 A -> B\" to absorb A into B, or \"更新并合并 A -> B\" to additionally prefer A's naming. Reply \"无需合并\" if none overlap.\n\n{}",
        topic_list_text(store)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(id: &str, name_zh: &str, name_en: &str) -> Topic {
        let mut t = Topic::new(id, name_zh, name_en);
        t.created_at = "2026-01-01T00:00:00Z".to_string();
        t
    }

    #[test]
    fn parses_absorb_and_swap_forms_in_textual_order() {
        let response = "建议如下：\n合并 3 -> 1\n更新并合并 5 -> 2\n";
        let suggestions = parse_merge_suggestions(response);
        assert_eq!(
            suggestions,
            vec![
                MergeSuggestion {
                    source: "3".to_string(),
                    target: "1".to_string(),
                    kind: MergeKind::Absorb
                },
                MergeSuggestion {
                    source: "5".to_string(),
                    target: "2".to_string(),
                    kind: MergeKind::SwapThenAbsorb
                },
            ]
        );
    }

    #[test]
    fn swap_prefix_does_not_double_count_as_absorb() {
        let response = "更新并合并 5 -> 2";
        let suggestions = parse_merge_suggestions(response);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions.first().map(|s| s.kind), Some(MergeKind::SwapThenAbsorb));
    }

    #[test]
    fn drops_self_merge_and_explicit_no_merge_marker() {
        assert!(parse_merge_suggestions("合并 4 -> 4").is_empty());
        assert!(parse_merge_suggestions("无需合并，所有主题均不同").is_empty());
    }

    #[test]
    fn bare_arrow_without_marker_is_ignored() {
        assert!(parse_merge_suggestions("3 -> 1").is_empty());
    }

    #[test]
    fn absorb_appends_names_and_aliases_then_marks_merged() {
        let mut store = TopicStore::new();
        store.insert(topic("1", "计算", "Computing"));
        store.insert(topic("2", "高性能计算", "High Performance Computing"));

        let result = apply_and_renumber(
            &store,
            &[MergeSuggestion {
                source: "1".to_string(),
                target: "2".to_string(),
                kind: MergeKind::Absorb,
            }],
        );

        assert_eq!(result.len(), 1);
        let surviving = result.get("1").expect("survivor renumbered to 1");
        assert_eq!(surviving.name_zh, "高性能计算");
        assert!(surviving.aliases.contains(&"计算".to_string()));
        assert!(surviving.aliases.contains(&"Computing".to_string()));
        assert!(!surviving.merged);
    }

    #[test]
    fn swap_then_absorb_preserves_newer_name_under_older_id() {
        let mut store = TopicStore::new();
        store.insert(topic("1", "旧名", "Old Name"));
        store.insert(topic("2", "新名", "New Name"));

        let result = apply_and_renumber(
            &store,
            &[MergeSuggestion {
                source: "2".to_string(),
                target: "1".to_string(),
                kind: MergeKind::SwapThenAbsorb,
            }],
        );

        assert_eq!(result.len(), 1);
        let surviving = result.get("1").expect("survivor renumbered to 1");
        assert_eq!(surviving.name_zh, "新名");
    }

    #[test]
    fn renumbering_yields_contiguous_ids_skipping_merged() {
        let mut store = TopicStore::new();
        store.insert(topic("3", "a", "A"));
        store.insert(topic("7", "b", "B"));
        store.insert(topic("12", "c", "C"));

        let result = apply_and_renumber(
            &store,
            &[MergeSuggestion {
                source: "7".to_string(),
                target: "3".to_string(),
                kind: MergeKind::Absorb,
            }],
        );

        let mut ids: Vec<String> = result.topics.keys().cloned().collect();
        ids.sort();
        assert_eq!(ids, vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn effective_id_follows_redirect_chain() {
        let mut store = TopicStore::new();
        let mut a = topic("1", "a", "A");
        a.merged = true;
        a.merged_to = Some("2".to_string());
        let mut b = topic("2", "b", "B");
        b.merged = true;
        b.merged_to = Some("3".to_string());
        store.insert(a);
        store.insert(b);
        store.insert(topic("3", "c", "C"));

        assert_eq!(effective_id(&store, "1", DEFAULT_MAX_HOPS), "3");
    }

    #[test]
    fn effective_id_aborts_on_cycle() {
        let mut store = TopicStore::new();
        let mut a = topic("1", "a", "A");
        a.merged = true;
        a.merged_to = Some("2".to_string());
        let mut b = topic("2", "b", "B");
        b.merged = true;
        b.merged_to = Some("1".to_string());
        store.insert(a);
        store.insert(b);

        let result = effective_id(&store, "1", DEFAULT_MAX_HOPS);
        assert!(result == "1" || result == "2");
    }

    #[test]
    fn propose_outcome_assigns_fresh_ids_past_max_of_stable_and_gen() {
        let mut stable = TopicStore::new();
        stable.insert(topic("1", "高性能计算", "High Performance Computing"));
        let mut gen = TopicStore::new();

        let outcome = ProposeOutcome {
            matched_existing_ids: vec![],
            new_topic_names: vec![("异构计算".to_string(), "Heterogeneous Computing".to_string())],
        };

        let ids = apply_propose_outcome(&mut gen, &stable, &outcome);
        assert_eq!(ids, vec!["2".to_string()]);
        assert_eq!(gen.len(), 1);
        let new_topic = gen.get("2").expect("fresh topic inserted at id 2");
        assert_eq!(new_topic.name_zh, "异构计算");
    }

    #[test]
    fn propose_outcome_continues_past_highest_id_already_in_gen() {
        let stable = TopicStore::new();
        let mut gen = TopicStore::new();
        gen.insert(topic("5", "a", "A"));

        let outcome = ProposeOutcome {
            matched_existing_ids: vec!["5".to_string()],
            new_topic_names: vec![("b".to_string(), "B".to_string())],
        };

        let ids = apply_propose_outcome(&mut gen, &stable, &outcome);
        assert_eq!(ids, vec!["5".to_string(), "6".to_string()]);
    }

    #[test]
    fn propose_response_drops_unknown_matched_ids() {
        let mut store = TopicStore::new();
        store.insert(topic("1", "计算", "Computing"));

        let outcome = parse_propose_response("匹配: 1, 99\n新增: 边缘智能（Edge Intelligence）", &store);
        assert_eq!(outcome.matched_existing_ids, vec!["1".to_string()]);
        assert_eq!(
            outcome.new_topic_names,
            vec![("边缘智能".to_string(), "Edge Intelligence".to_string())]
        );
    }
}
