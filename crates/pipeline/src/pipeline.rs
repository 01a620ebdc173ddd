//! Run-directory bookkeeping and the top-level orchestrator tying together
//! steps 1–5 (§4.6).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use paperloom_core::domain::Section;
use paperloom_llm::LlmClient;
use paperloom_vectorstore::VectorStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::analyzer::CrossPaperAnalyzer;
use crate::context_builder::ContextBuilder;
use crate::error::{Error, Result};
use crate::generator::{GeneratorTemplates, PaperGenerator};
use crate::retriever::{standardize_requirement, SummaryRetriever};
use crate::source_retriever::SourceTextRetriever;
use crate::types::{ContextMap, GeneratedPaper, InsightMap, RetrievalMap, SourceTextMap};

/// One generation invocation's artifact scope, `run_{YYYYMMDD_HHMMSS}` under
/// `rag_data_base`.
pub struct RunDir {
    rag_data_base: PathBuf,
    run_id: String,
}

impl RunDir {
    #[must_use]
    pub fn new(rag_data_base: impl Into<PathBuf>, timestamp: &str) -> Self {
        Self {
            rag_data_base: rag_data_base.into(),
            run_id: format!("run_{timestamp}"),
        }
    }

    #[must_use]
    pub fn step_dir(&self, step: usize, name: &str) -> PathBuf {
        self.rag_data_base.join(&self.run_id).join(format!("step{step}_{name}"))
    }

    fn artifact_path(&self, step: usize, name: &str) -> PathBuf {
        self.step_dir(step, name).join("result.json")
    }

    /// Scan sibling run directories under `rag_data_base` for the most
    /// recently modified `step{k}_{name}/result.json`, used when the
    /// current run skips ahead to a later step via `--step`.
    fn most_recent_sibling_artifact(&self, step: usize, name: &str) -> Option<PathBuf> {
        let entries = std::fs::read_dir(&self.rag_data_base).ok()?;
        let mut best: Option<(std::time::SystemTime, PathBuf)> = None;

        for entry in entries.flatten() {
            let candidate = entry.path().join(format!("step{step}_{name}")).join("result.json");
            if !candidate.exists() {
                continue;
            }
            let Ok(metadata) = std::fs::metadata(&candidate) else {
                continue;
            };
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            if best.as_ref().is_none_or(|(best_time, _)| modified > *best_time) {
                best = Some((modified, candidate));
            }
        }

        best.map(|(_, path)| path)
    }
}

/// Builds the five canonical sections from a user requirement, persisting
/// each step's output under a fresh run directory.
pub struct GenerationPipeline {
    llm: Arc<dyn LlmClient>,
    retriever: SummaryRetriever,
    analyzer: CrossPaperAnalyzer,
    source_retriever: SourceTextRetriever,
    context_builder: ContextBuilder,
    generator: PaperGenerator,
    rag_data_base: PathBuf,
    paper_gen_dir: PathBuf,
}

impl GenerationPipeline {
    #[must_use]
    pub fn new(
        llm: Arc<dyn LlmClient>,
        store: Arc<dyn VectorStore>,
        templates: GeneratorTemplates,
        top_k_per_aspect: usize,
        fanout_workers: usize,
        rag_data_base: PathBuf,
        paper_gen_dir: PathBuf,
    ) -> Self {
        Self {
            retriever: SummaryRetriever::new(Arc::clone(&store), Arc::clone(&llm), top_k_per_aspect, fanout_workers),
            analyzer: CrossPaperAnalyzer::new(),
            source_retriever: SourceTextRetriever::new(Arc::clone(&store)),
            context_builder: ContextBuilder::new(),
            generator: PaperGenerator::new(Arc::clone(&llm), templates),
            llm,
            rag_data_base,
            paper_gen_dir,
        }
    }

    fn persist_step<T: Serialize>(&self, run_dir: &RunDir, step: usize, name: &str, data: &T) -> Result<()> {
        let dir = run_dir.step_dir(step, name);
        std::fs::create_dir_all(&dir).map_err(|e| Error::write_failed(dir.display().to_string(), e))?;

        let json_path = dir.join("result.json");
        let content = serde_json::to_string_pretty(data).map_err(|e| Error::json_failed(json_path.display().to_string(), e))?;
        std::fs::write(&json_path, &content).map_err(|e| Error::write_failed(json_path.display().to_string(), e))?;

        let txt_path = dir.join("result.txt");
        std::fs::write(&txt_path, &content).map_err(|e| Error::write_failed(txt_path.display().to_string(), e))?;

        Ok(())
    }

    /// Load this run's own artifact if present; otherwise fall back to the
    /// most recently modified sibling run's artifact for the same step. A
    /// step that has never produced an artifact anywhere yields `T::default()`.
    fn load_step<T: DeserializeOwned + Default>(&self, run_dir: &RunDir, step: usize, name: &str) -> Result<T> {
        let current = run_dir.artifact_path(step, name);
        let path = if current.exists() {
            current
        } else if let Some(sibling) = run_dir.most_recent_sibling_artifact(step, name) {
            warn!(step, name, path = %sibling.display(), "using most recent prior artifact, current run has none");
            sibling
        } else {
            return Ok(T::default());
        };

        let content = std::fs::read_to_string(&path).map_err(|e| Error::read_failed(path.display().to_string(), e))?;
        serde_json::from_str(&content).map_err(|e| Error::json_failed(path.display().to_string(), e))
    }

    /// Run the full pipeline (or resume from `start_step`, 1-indexed) and
    /// write the final markdown to `output_path` (defaulting to
    /// `{paper_gen_dir}/generated_paper_{timestamp}.md`). Returns the
    /// per-section generated text.
    pub async fn run(&self, requirement: &str, start_step: usize, timestamp: &str, output_path: Option<&Path>) -> Result<GeneratedPaper> {
        let run_dir = RunDir::new(self.rag_data_base.clone(), timestamp);
        let start_step = start_step.max(1);

        let standardized = standardize_requirement(self.llm.as_ref(), requirement).await?;

        let retrieval: RetrievalMap = if start_step <= 1 {
            let retrieval = self.retriever.retrieve(&standardized).await?;
            self.persist_step(&run_dir, 1, "retrieval", &retrieval)?;
            retrieval
        } else {
            self.load_step(&run_dir, 1, "retrieval")?
        };

        if retrieval.is_empty() {
            return Err(Error::NoRetrievalHits);
        }

        let insights: InsightMap = if start_step <= 2 {
            let insights = self.analyzer.analyze(&retrieval);
            self.persist_step(&run_dir, 2, "analysis", &insights)?;
            insights
        } else {
            self.load_step(&run_dir, 2, "analysis")?
        };

        let source_text: SourceTextMap = if start_step <= 3 {
            let source_text = self.source_retriever.select(&retrieval).await?;
            self.persist_step(&run_dir, 3, "source_text", &source_text)?;
            source_text
        } else {
            self.load_step(&run_dir, 3, "source_text")?
        };

        let contexts: ContextMap = if start_step <= 4 {
            let contexts = self.context_builder.build(&retrieval, &insights, &source_text);
            self.persist_step(&run_dir, 4, "context", &contexts)?;
            contexts
        } else {
            self.load_step(&run_dir, 4, "context")?
        };

        let paper: GeneratedPaper = if start_step <= 5 {
            let paper = self.generator.generate(&standardized, &contexts).await?;
            self.persist_step(&run_dir, 5, "paper", &paper)?;
            paper
        } else {
            self.load_step(&run_dir, 5, "paper")?
        };

        let markdown = render_markdown(&standardized, &paper);
        let output_path = match output_path {
            Some(path) => path.to_path_buf(),
            None => self.paper_gen_dir.join(format!("generated_paper_{timestamp}.md")),
        };
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::write_failed(parent.display().to_string(), e))?;
        }
        std::fs::write(&output_path, &markdown).map_err(|e| Error::write_failed(output_path.display().to_string(), e))?;

        info!(output = %output_path.display(), "paper generated");
        Ok(paper)
    }
}

/// Render the final paper: top-matter, `## {section}` blocks in fixed
/// order, and a character-count statistics tail.
#[must_use]
pub fn render_markdown(requirement: &str, paper: &GeneratedPaper) -> String {
    let mut markdown = format!("# Generated Paper\n\n**Requirement:** {requirement}\n\n");

    for section in Section::ALL {
        let body = paper.get(&section).map(String::as_str).unwrap_or_default();
        markdown.push_str(&format!("## {}\n\n{body}\n\n", section.as_str()));
    }

    markdown.push_str("---\n\n**Statistics**\n\n");
    for section in Section::ALL {
        let len = paper.get(&section).map(|s| s.chars().count()).unwrap_or(0);
        markdown.push_str(&format!("- {}: {len} characters\n", section.as_str()));
    }

    markdown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_markdown_lists_sections_in_fixed_order() {
        let mut paper = GeneratedPaper::new();
        paper.insert(Section::Conclusion, "concl".to_string());
        paper.insert(Section::Introduction, "intro".to_string());

        let markdown = render_markdown("build a survey", &paper);
        let intro_pos = markdown.find("## Introduction").expect("intro heading");
        let concl_pos = markdown.find("## Conclusion").expect("conclusion heading");
        assert!(intro_pos < concl_pos);
    }

    #[test]
    fn run_dir_step_path_follows_naming_convention() {
        let run_dir = RunDir::new("/data/rag_runs", "20260727_120000");
        let path = run_dir.step_dir(1, "retrieval");
        assert_eq!(path, PathBuf::from("/data/rag_runs/run_20260727_120000/step1_retrieval"));
    }
}
