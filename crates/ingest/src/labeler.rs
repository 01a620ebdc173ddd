//! §4.9 Per-paper Labeler: resolve a paper's abstract against the stable
//! topic list and persist the raw LLM response for later topic-id lookup.

use std::path::Path;
use std::sync::Arc;

use paperloom_llm::LlmClient;
use paperloom_taxonomy::TopicStore;
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

use crate::error::{Error, Result};

fn exact_phrase_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"故?该论文的主题关键词总结为\[([^\]]*)\]。?").expect("static regex is valid")
    })
}

fn loose_phrase_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"关键词总结为\[([^\]]*)\]").expect("static regex is valid")
    })
}

fn any_bracket_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"\[([^\]]*)\]").expect("static regex is valid")
    })
}

/// Render the stable topic store as `"id. zh (en)"` lines, one per topic,
/// in ascending numeric-id order.
#[must_use]
pub fn render_topic_list(store: &TopicStore) -> String {
    let mut entries: Vec<(u64, String)> = store
        .topics
        .iter()
        .filter_map(|(id, topic)| id.parse::<u64>().ok().map(|n| (n, format!("{id}. {}", topic.display()))))
        .collect();
    entries.sort_by_key(|(n, _)| *n);
    entries.into_iter().map(|(_, line)| line).collect::<Vec<_>>().join("\n")
}

fn bracket_content(response: &str) -> Option<&str> {
    exact_phrase_re()
        .captures(response)
        .or_else(|| loose_phrase_re().captures(response))
        .or_else(|| any_bracket_re().captures(response))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Extract the topic id list from a raw LLM response, with a three-tier
/// bracket-pattern fallback and a final fallback to scanning the entire
/// response text for integers. Tokens that don't parse as integers are
/// dropped.
#[must_use]
pub fn parse_topic_ids(response: &str) -> Vec<String> {
    let source = bracket_content(response).unwrap_or(response);
    source
        .split(|c: char| c == ',' || c == '，' || c.is_whitespace())
        .map(str::trim)
        .filter(|tok| !tok.is_empty())
        .filter(|tok| tok.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .collect()
}

/// Resolves a paper's topic ids by asking the LLM, once, against the
/// current stable topic list.
pub struct PaperLabeler {
    llm: Arc<dyn LlmClient>,
    prompt_template: String,
}

impl PaperLabeler {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>, prompt_template: String) -> Self {
        Self { llm, prompt_template }
    }

    fn label_path(label_dir: &Path, paper_name: &str) -> std::path::PathBuf {
        label_dir.join(format!("{paper_name}.txt"))
    }

    /// Label one paper, reusing a persisted response if present.
    pub async fn label_paper(
        &self,
        paper_name: &str,
        abstract_text: &str,
        topics: &TopicStore,
        label_dir: &Path,
    ) -> Result<Vec<String>> {
        let path = Self::label_path(label_dir, paper_name);

        if let Some(existing) = Self::load_if_present(&path)? {
            return Ok(parse_topic_ids(&existing));
        }

        let prompt = self
            .prompt_template
            .replace("{topic_list}", &render_topic_list(topics))
            .replace("{abstract}", abstract_text);

        let response = self.llm.complete(&prompt).await?;
        let Some(response) = response else {
            warn!(paper_name, "labeler: no LLM response, paper gets no topic ids");
            return Ok(Vec::new());
        };

        std::fs::create_dir_all(label_dir).map_err(|e| Error::write_failed(label_dir.display().to_string(), e))?;
        let content = format!("{paper_name}:\n{response}");
        std::fs::write(&path, &content).map_err(|e| Error::write_failed(path.display().to_string(), e))?;

        Ok(parse_topic_ids(&response))
    }

    fn load_if_present(path: &Path) -> Result<Option<String>> {
        if !path.exists() {
            return Ok(None);
        }
        std::fs::read_to_string(path).map(Some).map_err(|e| Error::read_failed(path.display().to_string(), e))
    }

    /// Read a previously persisted label file and resolve its topic ids,
    /// trying `{paper_name}.txt` under `label_dir` first, matching the
    /// naming convention `label_paper` writes.
    pub fn resolve_persisted(label_dir: &Path, paper_name: &str) -> Result<Vec<String>> {
        let path = Self::label_path(label_dir, paper_name);
        match Self::load_if_present(&path)? {
            Some(content) => Ok(parse_topic_ids(&content)),
            None => {
                warn!(paper_name, "labeler: no persisted label file found, topics = []");
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exact_phrase() {
        let ids = parse_topic_ids("故该论文的主题关键词总结为[3,7,12]。");
        assert_eq!(ids, vec!["3", "7", "12"]);
    }

    #[test]
    fn parses_loose_phrase_without_prefix() {
        let ids = parse_topic_ids("总之，关键词总结为[4, 9]");
        assert_eq!(ids, vec!["4", "9"]);
    }

    #[test]
    fn parses_any_bracket_group_as_last_resort() {
        let ids = parse_topic_ids("ids: [1, 2, 3]");
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn falls_back_to_raw_text_when_no_brackets() {
        let ids = parse_topic_ids("5, 6");
        assert_eq!(ids, vec!["5", "6"]);
    }

    #[test]
    fn drops_non_integer_tokens() {
        let ids = parse_topic_ids("[1, abc, 2]");
        assert_eq!(ids, vec!["1", "2"]);
    }
}
