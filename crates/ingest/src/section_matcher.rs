//! §4.2 Section Matcher: classify a paper's raw section titles into
//! `Sections5`, defaulting anything unmapped or out-of-set to `Method`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use paperloom_core::domain::{Section, SectionMapping};
use paperloom_llm::LlmClient;
use tracing::{info, warn};

use crate::error::{Error, Result};

fn build_prompt(section_titles: &[String]) -> String {
    let canonical = Section::ALL.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ");
    let titles = section_titles.join("\n");
    format!(
        "Classify each raw paper section title below into exactly one of these canonical sections: {canonical}.\n\
         Reply with one line per title, formatted as \"raw -> canonical\".\n\nTitles:\n{titles}"
    )
}

/// Parse a `raw -> canonical` response. A target outside `Sections5`
/// defaults to `Method` with a warning; titles missing from the response
/// are filled as `Method`.
#[must_use]
pub fn parse_match_response(response: &str, section_titles: &[String]) -> BTreeMap<String, Section> {
    let mut mapping = BTreeMap::new();

    for line in response.lines() {
        let line = line.trim();
        let Some((raw, canonical)) = line.split_once("->") else {
            continue;
        };
        let raw = raw.trim();
        let canonical = canonical.trim();
        if raw.is_empty() {
            continue;
        }

        let section = Section::from_str_opt(canonical).unwrap_or_else(|| {
            warn!(raw, canonical, "unknown canonical section, defaulting to Method");
            Section::Method
        });
        mapping.insert(raw.to_string(), section);
    }

    for title in section_titles {
        mapping.entry(title.clone()).or_insert(Section::Method);
    }

    mapping
}

/// Classifies raw section titles into `Sections5` via an LLM call.
pub struct SectionMatcher {
    llm: Arc<dyn LlmClient>,
}

impl SectionMatcher {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Match one paper's raw section titles.
    pub async fn match_sections(&self, paper_path: &str, section_titles: &[String]) -> Result<SectionMapping> {
        if section_titles.is_empty() {
            return Ok(SectionMapping {
                paper_path: paper_path.to_string(),
                section_mapping: BTreeMap::new(),
                standard_sections: Section::ALL.into_iter().collect(),
                total_sections: 0,
            });
        }

        let prompt = build_prompt(section_titles);
        let response = self.llm.complete(&prompt).await?;

        let mapping = match response {
            Some(text) => parse_match_response(&text, section_titles),
            None => {
                warn!(paper_path, "section match: no LLM response, defaulting all titles to Method");
                section_titles.iter().cloned().map(|t| (t, Section::Method)).collect()
            }
        };

        info!(paper_path, matched = mapping.len(), "section mapping complete");

        Ok(SectionMapping {
            paper_path: paper_path.to_string(),
            total_sections: mapping.len(),
            section_mapping: mapping,
            standard_sections: Section::ALL.into_iter().collect(),
        })
    }

    /// Load a previously persisted mapping, reusing it unless `force` asks
    /// for regeneration.
    pub fn load_if_present(path: &Path, force: bool) -> Result<Option<SectionMapping>> {
        if force || !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|e| Error::read_failed(path.display().to_string(), e))?;
        let mapping =
            serde_json::from_str(&content).map_err(|e| Error::json_failed(path.display().to_string(), e))?;
        Ok(Some(mapping))
    }

    /// Persist a mapping as `section_mapping.json` under `output_dir`.
    pub fn save(mapping: &SectionMapping, output_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(output_dir)
            .map_err(|e| Error::write_failed(output_dir.display().to_string(), e))?;
        let path = output_dir.join("section_mapping.json");
        let content =
            serde_json::to_string_pretty(mapping).map_err(|e| Error::json_failed(path.display().to_string(), e))?;
        std::fs::write(&path, content).map_err(|e| Error::write_failed(path.display().to_string(), e))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mapping_lines_and_fills_missing_as_method() {
        let titles = vec!["1 Intro".to_string(), "2 Related".to_string(), "3 Setup".to_string()];
        let response = "1 Intro -> Introduction\n2 Related -> RelatedWork\n";
        let mapping = parse_match_response(response, &titles);

        assert_eq!(mapping.get("1 Intro"), Some(&Section::Introduction));
        assert_eq!(mapping.get("2 Related"), Some(&Section::RelatedWork));
        assert_eq!(mapping.get("3 Setup"), Some(&Section::Method));
    }

    #[test]
    fn out_of_set_canonical_defaults_to_method() {
        let titles = vec!["Appendix".to_string()];
        let mapping = parse_match_response("Appendix -> Discussion", &titles);
        assert_eq!(mapping.get("Appendix"), Some(&Section::Method));
    }

    #[test]
    fn every_title_in_invariant_holds() {
        let titles = vec!["A".to_string(), "B".to_string()];
        let mapping = parse_match_response("A -> Method", &titles);
        for title in &titles {
            assert!(mapping.contains_key(title));
        }
        for section in mapping.values() {
            assert!(Section::ALL.contains(section));
        }
    }
}
