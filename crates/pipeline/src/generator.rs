//! Step 5 — Paper Generator: sequential section drafting with condensed-
//! summary dependency propagation, followed by a whole-paper polish pass
//! with per-section fallback (Testable Property 11).

use std::collections::BTreeMap;
use std::sync::Arc;

use paperloom_core::domain::{generation_order, Section};
use paperloom_llm::LlmClient;
use tracing::{info, warn};

use crate::error::Result;
use crate::types::GeneratedPaper;

const CONDENSE_TARGET_LEN: usize = 150;
const WRITING_RULES: &str = "\n\nWriting rules: maintain coherence with prior sections, avoid repetition, \
use an academic tone, target 800-1200 Chinese characters, and follow standard academic section formatting.";

fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        text.chars().take(max_len).collect()
    }
}

/// Per-section and cross-cutting prompt templates, loaded from the prompt
/// directory at stage init.
#[derive(Debug, Clone, Default)]
pub struct GeneratorTemplates {
    pub section_templates: BTreeMap<Section, String>,
    pub condense_template: String,
    pub polish_template: String,
}

fn build_dependency_block(deps: &[Section], condensed: &BTreeMap<Section, String>) -> String {
    deps.iter()
        .filter_map(|dep| condensed.get(dep).map(|summary| format!("- {}: {summary}", dep.as_str())))
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_section_prompt(template: &str, requirement: &str, dep_block: &str, context: &str) -> String {
    let mut prompt = template.to_string();
    prompt.push_str("\n\n## User requirement\n");
    prompt.push_str(requirement);
    if !dep_block.is_empty() {
        prompt.push_str("\n\n## Prior section summaries\n");
        prompt.push_str(dep_block);
    }
    if !context.is_empty() {
        prompt.push_str("\n\n## Retrieved context\n");
        prompt.push_str(context);
    }
    prompt.push_str(WRITING_RULES);
    prompt
}

/// Split a whole-paper polish response on `## {section}` markers into
/// per-section text. Lines before the first marker, and markers whose name
/// doesn't resolve to a `Sections5` member, are dropped.
fn parse_polished_sections(response: &str) -> BTreeMap<Section, String> {
    let mut sections = BTreeMap::new();
    let mut current: Option<Section> = None;
    let mut buf = String::new();

    for line in response.lines() {
        if let Some(name) = line.strip_prefix("## ") {
            if let Some(section) = current.take() {
                sections.insert(section, buf.trim().to_string());
                buf.clear();
            }
            current = Section::from_str_opt(name.trim());
        } else if current.is_some() {
            buf.push_str(line);
            buf.push('\n');
        }
    }
    if let Some(section) = current {
        sections.insert(section, buf.trim().to_string());
    }

    sections
}

/// Drafts the five canonical sections in fixed dependency order, then
/// attempts one whole-paper polish pass.
pub struct PaperGenerator {
    llm: Arc<dyn LlmClient>,
    templates: GeneratorTemplates,
}

impl PaperGenerator {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>, templates: GeneratorTemplates) -> Self {
        Self { llm, templates }
    }

    async fn condense(&self, draft: &str) -> Result<String> {
        let prompt = self.templates.condense_template.replace("{draft}", draft);
        match self.llm.complete(&prompt).await? {
            Some(summary) if !summary.trim().is_empty() => Ok(summary),
            _ => {
                warn!("condense call produced no output, truncating draft as a fallback summary");
                Ok(truncate(draft, CONDENSE_TARGET_LEN))
            }
        }
    }

    async fn polish(&self, drafts: &GeneratedPaper) -> Result<BTreeMap<Section, String>> {
        let mut body = String::new();
        for section in Section::ALL {
            if let Some(draft) = drafts.get(&section) {
                body.push_str(&format!("## {}\n{draft}\n\n", section.as_str()));
            }
        }

        let prompt = self.templates.polish_template.replace("{papers}", &body);
        match self.llm.complete(&prompt).await? {
            Some(response) => Ok(parse_polished_sections(&response)),
            None => {
                warn!("whole-paper polish produced no output, all sections fall back to pre-polish drafts");
                Ok(BTreeMap::new())
            }
        }
    }

    /// Draft and polish the full paper. Each generated section is the
    /// polished text if the polish pass produced one, else the pre-polish
    /// draft — never an empty section.
    pub async fn generate(&self, requirement: &str, contexts: &BTreeMap<Section, String>) -> Result<GeneratedPaper> {
        let mut condensed: BTreeMap<Section, String> = BTreeMap::new();
        let mut drafts: GeneratedPaper = BTreeMap::new();

        for (section, deps) in generation_order() {
            let section = *section;
            let template = self.templates.section_templates.get(&section).cloned().unwrap_or_default();
            let dep_block = build_dependency_block(deps, &condensed);
            let context = contexts.get(&section).cloned().unwrap_or_default();
            let prompt = build_section_prompt(&template, requirement, &dep_block, &context);

            let draft = self.llm.complete(&prompt).await?.unwrap_or_default();
            info!(section = section.as_str(), len = draft.chars().count(), "section drafted");
            drafts.insert(section, draft.clone());

            let summary = self.condense(&draft).await?;
            condensed.insert(section, summary);
        }

        let polished = self.polish(&drafts).await?;

        let mut final_paper = GeneratedPaper::new();
        for section in Section::ALL {
            let text = polished.get(&section).cloned().unwrap_or_else(|| drafts.get(&section).cloned().unwrap_or_default());
            final_paper.insert(section, text);
        }

        Ok(final_paper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_polished_sections_splits_on_markers() {
        let response = "## Introduction\nintro text\n\n## Method\nmethod text\n";
        let sections = parse_polished_sections(response);
        assert_eq!(sections.get(&Section::Introduction).map(String::as_str), Some("intro text"));
        assert_eq!(sections.get(&Section::Method).map(String::as_str), Some("method text"));
    }

    #[test]
    fn parse_polished_sections_ignores_unrecognized_markers() {
        let response = "## NotASection\njunk\n## Conclusion\nconclusion text\n";
        let sections = parse_polished_sections(response);
        assert!(!sections.contains_key(&Section::Conclusion) || sections.len() == 1);
    }

    #[test]
    fn dependency_block_is_empty_for_introduction() {
        let condensed = BTreeMap::new();
        assert_eq!(build_dependency_block(&[], &condensed), String::new());
    }

    #[test]
    fn dependency_block_lists_each_declared_dependency() {
        let mut condensed = BTreeMap::new();
        condensed.insert(Section::Introduction, "intro summary".to_string());
        condensed.insert(Section::RelatedWork, "related summary".to_string());
        let block = build_dependency_block(&[Section::Introduction, Section::RelatedWork], &condensed);
        assert!(block.contains("intro summary"));
        assert!(block.contains("related summary"));
    }
}
