//! §4.3 Section Concluder: one summary text per aspect in `AspectSet`,
//! gated by whichever of `required_sections[aspect]` the paper actually has.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use paperloom_core::domain::{Aspect, Section, SectionMapping};
use paperloom_llm::LlmClient;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};

/// `{conclude_result}/.../summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryManifest {
    pub paper_path: String,
    pub aspects_completed: usize,
    pub total_aspects: usize,
    pub completed_aspects: Vec<String>,
    pub missing_aspects: Vec<String>,
}

/// Load raw section files for a paper, keyed by canonical section, with
/// same-canonical raw sections concatenated in discovery order.
pub fn load_canonical_sections(paper_dir: &Path, mapping: &SectionMapping) -> Result<BTreeMap<Section, String>> {
    let mut sections: BTreeMap<Section, Vec<String>> = BTreeMap::new();

    for (raw_title, canonical) in &mapping.section_mapping {
        let path = paper_dir.join(format!("{raw_title}.txt"));
        let content = std::fs::read_to_string(&path).map_err(|e| Error::read_failed(path.display().to_string(), e))?;
        sections.entry(*canonical).or_default().push(content);
    }

    Ok(sections.into_iter().map(|(sec, parts)| (sec, parts.join("\n\n"))).collect())
}

fn build_aspect_prompt(template: &str, aspect: Aspect, sections: &BTreeMap<Section, String>) -> String {
    let mut prompt = template.replace("{aspect}", aspect.as_str());
    prompt.push_str("\n\n## Paper Content\n");
    for section in aspect.required_sections() {
        if let Some(text) = sections.get(section) {
            prompt.push_str(&format!("### {}\n{}\n\n", section.as_str(), text));
        }
    }
    prompt
}

/// Produces per-aspect summaries for one paper at a time.
pub struct SectionConcluder {
    llm: Arc<dyn LlmClient>,
    prompt_template: String,
}

impl SectionConcluder {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>, prompt_template: String) -> Self {
        Self { llm, prompt_template }
    }

    /// Summarize every aspect whose `required_sections` are covered; write
    /// `{aspect}.txt` files and a `summary.json` manifest under
    /// `output_dir`. Per-aspect LLM failure is logged and the aspect is
    /// omitted, not fatal to the paper.
    pub async fn conclude_paper(
        &self,
        paper_path: &str,
        sections: &BTreeMap<Section, String>,
        output_dir: &Path,
    ) -> Result<SummaryManifest> {
        std::fs::create_dir_all(output_dir).map_err(|e| Error::write_failed(output_dir.display().to_string(), e))?;

        let mut completed = Vec::new();
        let mut missing = Vec::new();

        for aspect in Aspect::ALL {
            let has_input = aspect.required_sections().iter().any(|s| {
                sections.get(s).is_some_and(|text| !text.trim().is_empty())
            });
            if !has_input {
                missing.push(aspect);
                continue;
            }

            let prompt = build_aspect_prompt(&self.prompt_template, aspect, sections);
            let response = match self.llm.complete(&prompt).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(paper_path, aspect = aspect.as_str(), error = %e, "aspect summary call failed");
                    None
                }
            };

            match response {
                Some(text) => {
                    let path = output_dir.join(format!("{}.txt", aspect.as_str()));
                    std::fs::write(&path, &text).map_err(|e| Error::write_failed(path.display().to_string(), e))?;
                    completed.push(aspect);
                }
                None => {
                    warn!(paper_path, aspect = aspect.as_str(), "no aspect summary produced");
                    missing.push(aspect);
                }
            }
        }

        info!(
            paper_path,
            completed = completed.len(),
            total = Aspect::ALL.len(),
            "concluder finished"
        );

        let manifest = SummaryManifest {
            paper_path: paper_path.to_string(),
            aspects_completed: completed.len(),
            total_aspects: Aspect::ALL.len(),
            completed_aspects: completed.iter().map(|a| a.as_str().to_string()).collect(),
            missing_aspects: missing.iter().map(|a| a.as_str().to_string()).collect(),
        };

        let manifest_path = output_dir.join("summary.json");
        let content = serde_json::to_string_pretty(&manifest)
            .map_err(|e| Error::json_failed(manifest_path.display().to_string(), e))?;
        std::fs::write(&manifest_path, content)
            .map_err(|e| Error::write_failed(manifest_path.display().to_string(), e))?;

        Ok(manifest)
    }

    /// Whether this paper was already concluded (a `summary.json` exists).
    #[must_use]
    pub fn already_concluded(output_dir: &Path) -> bool {
        output_dir.join("summary.json").exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_aspects_with_no_required_section_present() {
        let mut sections = BTreeMap::new();
        sections.insert(Section::Introduction, "intro text".to_string());

        for aspect in Aspect::ALL {
            let has_input = aspect
                .required_sections()
                .iter()
                .any(|s| sections.get(s).is_some_and(|t| !t.trim().is_empty()));
            assert_eq!(has_input, aspect.required_sections().contains(&Section::Introduction));
        }
    }

    #[test]
    fn build_aspect_prompt_includes_only_required_sections() {
        let mut sections = BTreeMap::new();
        sections.insert(Section::Introduction, "intro text".to_string());
        sections.insert(Section::Method, "method text".to_string());

        let prompt = build_aspect_prompt("Summarize {aspect}.", Aspect::Methodology, &sections);
        assert!(prompt.contains("Summarize Methodology."));
        assert!(prompt.contains("method text"));
        assert!(!prompt.contains("intro text"));
    }
}
