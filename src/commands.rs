//! Command dispatch: loads configuration, wires the LLM client and vector
//! store, and drives the taxonomy/ingest/pipeline crates for each subcommand.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{info, warn};

use paperloom_core::config::AppConfig;
use paperloom_core::domain::Section;
use paperloom_ingest::{
    discover_papers, load_canonical_sections, raw_section_titles, resolve_topic_names, PaperLabeler, SectionConcluder,
    SectionMatcher, SourceIngestor, SummaryIngestor, SummaryManifest,
};
use paperloom_llm::{LlmClient, LlmClientConfig, LlmHttpClient};
use paperloom_pipeline::{GenerationPipeline, GeneratorTemplates, TopicSynchronizer};
use paperloom_taxonomy::{TopicManager, TopicStore};
use paperloom_vectorstore::{StoreConfig, SurrealVectorStore, VectorStore};

use crate::cli::{Cli, Commands, GenTopicsAction};

const DEFAULT_ASPECT_PROMPT: &str =
    "Summarize the {aspect} aspect of this paper from the sections provided below.";
const DEFAULT_LABEL_PROMPT: &str = "Existing topics:\n{topic_list}\n\nAbstract:\n{abstract}\n\n\
Reply with a single line: 故该论文的主题关键词总结为[comma-separated topic ids]。";
const DEFAULT_CONDENSE_PROMPT: &str = "Condense the following section draft into a short summary (about 150 characters):\n\n{draft}";
const DEFAULT_POLISH_PROMPT: &str =
    "Polish the following drafted paper sections for coherence and flow, keeping each section under its own \"## {Section}\" marker:\n\n{papers}";

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path).with_context(|| format!("loading config from {}", path.display()))?,
        None if Path::new("paperloom.json").exists() => AppConfig::from_file("paperloom.json")?,
        None => AppConfig::default(),
    };
    Ok(config.with_env_overrides())
}

async fn build_llm(config: &AppConfig) -> Result<Arc<dyn LlmClient>> {
    let client = LlmHttpClient::new(LlmClientConfig::from(&config.llm)).context("constructing LLM client")?;
    Ok(Arc::new(client))
}

async fn build_store(config: &AppConfig) -> Result<Arc<dyn VectorStore>> {
    let store = SurrealVectorStore::connect(StoreConfig::from(&config.vector_db))
        .await
        .context("connecting to vector store")?;
    Ok(Arc::new(store))
}

fn load_prompt_or(prompt_dir: &Path, filename: &str, default: &str) -> String {
    let path = prompt_dir.join(filename);
    match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => {
            info!(path = %path.display(), "prompt template not found, using built-in default");
            default.to_string()
        }
    }
}

fn load_generator_templates(prompt_dir: &Path) -> GeneratorTemplates {
    let mut section_templates = BTreeMap::new();
    for section in Section::ALL {
        let filename = format!("generate_{}.txt", section.as_str().to_lowercase());
        let default = format!("Draft the {} section of a research paper.", section.as_str());
        section_templates.insert(section, load_prompt_or(prompt_dir, &filename, &default));
    }

    GeneratorTemplates {
        section_templates,
        condense_template: load_prompt_or(prompt_dir, "condense.txt", DEFAULT_CONDENSE_PROMPT),
        polish_template: load_prompt_or(prompt_dir, "polish.txt", DEFAULT_POLISH_PROMPT),
    }
}

/// Recursively collect every `.txt` file under `root`, returning
/// `(paper_id, path)` pairs where `paper_id` is the file's path relative to
/// `root` (forward-slash separated, extension stripped) — the same
/// `{conf}/{year}/{base}` identity `paper_walk` uses for section
/// directories, applied here to the one-file-per-paper abstract layout.
fn discover_abstract_files(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut out = Vec::new();
    if !root.exists() {
        return Ok(out);
    }
    walk_abstracts(root, root, &mut out)?;
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}

fn walk_abstracts(root: &Path, dir: &Path, out: &mut Vec<(String, PathBuf)>) -> Result<()> {
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk_abstracts(root, &path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "txt") {
            let rel = path
                .with_extension("")
                .strip_prefix(root)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            out.push((rel, path));
        }
    }
    Ok(())
}

fn changes_map(suggestions: &[paperloom_taxonomy::MergeSuggestion]) -> BTreeMap<String, String> {
    suggestions.iter().map(|s| (s.source.clone(), s.target.clone())).collect()
}

fn print_topic_list(store: &TopicStore) {
    let mut topics: Vec<_> = store.topics.values().collect();
    topics.sort_by_key(|t| t.id.parse::<u64>().unwrap_or(u64::MAX));
    for topic in topics {
        println!("{}. {}", topic.id, topic.display());
    }
}

pub async fn execute_command(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::GenTopics { action } => run_gen_topics(&config, action).await,
        Commands::LabelPapersWithStableTopics => run_label_papers(&config).await,
        Commands::ConcludePapers {
            only_section_match,
            skip_section_match,
            force,
        } => run_conclude_papers(&config, only_section_match, skip_section_match, force).await,
        Commands::LoadPapers { component_dir, label_dir } => run_load_papers(&config, component_dir, label_dir).await,
        Commands::LoadConclusion { conclude_dir } => run_load_conclusion(&config, conclude_dir).await,
        Commands::GenPaper { requirement, step, output } => run_gen_paper(&config, &requirement, step, output).await,
    }
}

async fn run_gen_topics(config: &AppConfig, action: GenTopicsAction) -> Result<()> {
    let topic_dir = config.resolve(&config.data_paths.topic_dir);
    let merge_dir = config.resolve(&config.data_paths.merge_dir);
    let ori_path = topic_dir.join("topic_ori.json");
    let stable_path = topic_dir.join("topic.json");
    let gen_path = topic_dir.join("gen_topic.json");
    let middle_path = topic_dir.join("middle_topic.json");

    match action {
        GenTopicsAction::List => {
            let stable = TopicStore::load(&stable_path)?;
            print_topic_list(&stable);
        }
        GenTopicsAction::Extract => {
            let llm = build_llm(config).await?;
            extract_topics(config, &llm, &stable_path, &gen_path).await?;
        }
        GenTopicsAction::GenerateMerge => {
            let llm = build_llm(config).await?;
            let store = build_store(config).await?;
            generate_merge(&llm, &store, &merge_dir, &gen_path, &middle_path).await?;
        }
        GenTopicsAction::UpdateTopics => {
            let llm = build_llm(config).await?;
            let store = build_store(config).await?;
            update_topics(&llm, &store, &merge_dir, &middle_path, &stable_path).await?;
        }
        GenTopicsAction::Full { no_reset } => {
            let llm = build_llm(config).await?;
            let store = build_store(config).await?;

            if !no_reset {
                info!("resetting topic and gen_topic from the topic_ori seed for a fresh taxonomy bootstrap");
                let ori = TopicStore::load(&ori_path)?;
                ori.save(&stable_path)?;
                ori.save(&gen_path)?;
            }

            extract_topics(config, &llm, &stable_path, &gen_path).await?;
            generate_merge(&llm, &store, &merge_dir, &gen_path, &middle_path).await?;
            update_topics(&llm, &store, &merge_dir, &middle_path, &stable_path).await?;
        }
    }

    Ok(())
}

async fn extract_topics(config: &AppConfig, llm: &Arc<dyn LlmClient>, stable_path: &Path, gen_path: &Path) -> Result<()> {
    let stable = TopicStore::load(stable_path)?;
    let mut gen = TopicStore::load(gen_path)?;
    let manager = TopicManager::new(Arc::clone(llm));

    let abstract_root = config.resolve(&config.data_paths.abstract_extract);
    let abstracts = discover_abstract_files(&abstract_root)?;
    info!(count = abstracts.len(), "proposing topics for discovered abstracts");

    for (paper_id, path) in &abstracts {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading abstract {}", path.display()))?;
        match manager.propose_into_gen(&mut gen, &stable, &text).await {
            Ok(ids) => info!(paper_id, topic_ids = ?ids, "proposed topics"),
            Err(e) => warn!(paper_id, error = %e, "proposal failed for this paper, skipping"),
        }
    }

    gen.save(gen_path)?;
    Ok(())
}

/// Persist §6's merge artifacts for one round under `merge_dir/{round_name}`:
/// `merge_opinion.json` (the parsed suggestions), `output/merge_ori` (the
/// pre-merge topic list the round was run against), and
/// `output/merge_LLM_result` (the raw LLM response, or empty if the round's
/// LLM call failed and ran as a no-op). Each round gets its own
/// sub-directory so `gen_topics full`'s three rounds don't overwrite one
/// another.
fn persist_merge_artifacts(merge_dir: &Path, round_name: &str, source: &TopicStore, outcome: &paperloom_taxonomy::MergeRoundOutcome) -> Result<()> {
    let round_dir = merge_dir.join(round_name);
    let output_dir = round_dir.join("output");
    std::fs::create_dir_all(&output_dir).with_context(|| format!("creating merge artifact directory {}", output_dir.display()))?;

    let opinion_path = round_dir.join("merge_opinion.json");
    let opinion = serde_json::to_string_pretty(&outcome.suggestions).context("serializing merge suggestions")?;
    std::fs::write(&opinion_path, opinion).with_context(|| format!("writing {}", opinion_path.display()))?;

    let ori_path = output_dir.join("merge_ori");
    std::fs::write(&ori_path, paperloom_taxonomy::topic_list_text(source)).with_context(|| format!("writing {}", ori_path.display()))?;

    let result_path = output_dir.join("merge_LLM_result");
    std::fs::write(&result_path, outcome.raw_response.clone().unwrap_or_default())
        .with_context(|| format!("writing {}", result_path.display()))?;

    Ok(())
}

async fn generate_merge(
    llm: &Arc<dyn LlmClient>,
    store: &Arc<dyn VectorStore>,
    merge_dir: &Path,
    gen_path: &Path,
    middle_path: &Path,
) -> Result<()> {
    let gen = TopicStore::load(gen_path)?;
    let manager = TopicManager::new(Arc::clone(llm));

    let outcome = manager.merge_round_with_changes(&gen).await;
    persist_merge_artifacts(merge_dir, "round1_gen_to_middle", &gen, &outcome)?;
    sync_changes(store, &outcome.working, &outcome.suggestions).await;

    outcome.renumbered.save(middle_path)?;
    Ok(())
}

async fn update_topics(
    llm: &Arc<dyn LlmClient>,
    store: &Arc<dyn VectorStore>,
    merge_dir: &Path,
    middle_path: &Path,
    stable_path: &Path,
) -> Result<()> {
    let manager = TopicManager::new(Arc::clone(llm));

    let middle = TopicStore::load(middle_path)?;
    let outcome2 = manager.merge_round_with_changes(&middle).await;
    persist_merge_artifacts(merge_dir, "round2_middle_to_middle", &middle, &outcome2)?;
    sync_changes(store, &outcome2.working, &outcome2.suggestions).await;
    outcome2.renumbered.save(middle_path)?;

    let outcome3 = manager.merge_round_with_changes(&outcome2.renumbered).await;
    persist_merge_artifacts(merge_dir, "round3_middle_to_topic", &outcome2.renumbered, &outcome3)?;
    sync_changes(store, &outcome3.working, &outcome3.suggestions).await;
    outcome3.renumbered.save(stable_path)?;

    Ok(())
}

async fn sync_changes(store: &Arc<dyn VectorStore>, working: &TopicStore, suggestions: &[paperloom_taxonomy::MergeSuggestion]) {
    if suggestions.is_empty() {
        return;
    }
    let synchronizer = TopicSynchronizer::new(Arc::clone(store));
    let changes = changes_map(suggestions);
    match synchronizer.synchronize(&changes, working).await {
        Ok(count) => info!(rows_updated = count, "synchronized topic name changes"),
        Err(e) => warn!(error = %e, "topic synchronization failed, continuing with stale names in the store"),
    }
}

async fn run_label_papers(config: &AppConfig) -> Result<()> {
    let llm = build_llm(config).await?;
    let stable_path = config.resolve(&config.data_paths.topic_dir).join("topic.json");
    let stable = TopicStore::load(&stable_path)?;

    let prompt_dir = config.resolve(&config.data_paths.prompt_dir);
    let prompt_template = load_prompt_or(&prompt_dir, "label.txt", DEFAULT_LABEL_PROMPT);
    let labeler = PaperLabeler::new(Arc::clone(&llm), prompt_template);

    let component_root = config.resolve(&config.data_paths.component_extract);
    let abstract_root = config.resolve(&config.data_paths.abstract_extract);
    let label_dir = config.resolve(&config.data_paths.label_dir);

    let papers = discover_papers(&component_root)?;
    info!(count = papers.len(), "labeling discovered papers");

    for paper in &papers {
        let abstract_path = abstract_root.join(format!("{}.txt", paper.rel_path));
        let Ok(abstract_text) = std::fs::read_to_string(&abstract_path) else {
            warn!(paper = paper.rel_path, path = %abstract_path.display(), "no abstract found, skipping labeling");
            continue;
        };

        match labeler.label_paper(&paper.rel_path, &abstract_text, &stable, &label_dir).await {
            Ok(ids) => info!(paper = paper.rel_path, topic_ids = ?ids, "labeled"),
            Err(e) => warn!(paper = paper.rel_path, error = %e, "labeling failed"),
        }
    }

    Ok(())
}

async fn run_conclude_papers(config: &AppConfig, only_section_match: bool, skip_section_match: bool, force: bool) -> Result<()> {
    let llm = build_llm(config).await?;
    let component_root = config.resolve(&config.data_paths.component_extract);
    let section_match_root = config.resolve(&config.data_paths.section_match);
    let conclude_root = config.resolve(&config.data_paths.conclude_result);

    let matcher = SectionMatcher::new(Arc::clone(&llm));
    let prompt_dir = config.resolve(&config.data_paths.prompt_dir);
    let concluder = SectionConcluder::new(Arc::clone(&llm), load_prompt_or(&prompt_dir, "aspect.txt", DEFAULT_ASPECT_PROMPT));

    let papers = discover_papers(&component_root)?;
    info!(count = papers.len(), only_section_match, skip_section_match, force, "concluding discovered papers");

    for paper in &papers {
        let mapping_dir = section_match_root.join(&paper.rel_path);

        let mapping = if skip_section_match {
            match SectionMatcher::load_if_present(&mapping_dir.join("section_mapping.json"), false)? {
                Some(mapping) => mapping,
                None => {
                    warn!(paper = paper.rel_path, "--skip-section-match set but no persisted mapping exists, skipping paper");
                    continue;
                }
            }
        } else {
            match SectionMatcher::load_if_present(&mapping_dir.join("section_mapping.json"), force)? {
                Some(mapping) => mapping,
                None => {
                    let titles = raw_section_titles(&paper.dir)?;
                    let mapping = matcher.match_sections(&paper.rel_path, &titles).await?;
                    SectionMatcher::save(&mapping, &mapping_dir)?;
                    mapping
                }
            }
        };

        if only_section_match {
            continue;
        }

        let output_dir = conclude_root.join(&paper.rel_path);
        if !force && SectionConcluder::already_concluded(&output_dir) {
            info!(paper = paper.rel_path, "already concluded, skipping");
            continue;
        }

        let sections = load_canonical_sections(&paper.dir, &mapping)?;
        match concluder.conclude_paper(&paper.rel_path, &sections, &output_dir).await {
            Ok(manifest) => info!(paper = paper.rel_path, completed = manifest.aspects_completed, "concluded"),
            Err(e) => warn!(paper = paper.rel_path, error = %e, "summarization failed"),
        }
    }

    Ok(())
}

async fn run_load_papers(config: &AppConfig, component_dir: Option<PathBuf>, label_dir: Option<PathBuf>) -> Result<()> {
    let llm = build_llm(config).await?;
    let store = build_store(config).await?;

    let component_root = component_dir.unwrap_or_else(|| config.resolve(&config.data_paths.component_extract));
    let label_dir = label_dir.unwrap_or_else(|| config.resolve(&config.data_paths.label_dir));
    let section_match_root = config.resolve(&config.data_paths.section_match);
    let stable_path = config.resolve(&config.data_paths.topic_dir).join("topic.json");
    let stable = TopicStore::load(&stable_path)?;

    let ingestor = SourceIngestor::new(Arc::clone(&store), Arc::clone(&llm), config.vector_db.embedding_dim);
    ingestor.ensure_collections().await?;

    let papers = discover_papers(&component_root)?;
    info!(count = papers.len(), "loading papers into the source vector store");

    for paper in &papers {
        let mapping_path = section_match_root.join(&paper.rel_path).join("section_mapping.json");
        let Some(mapping) = SectionMatcher::load_if_present(&mapping_path, false)? else {
            warn!(paper = paper.rel_path, "no section mapping yet, run conclude-papers first; skipping");
            continue;
        };

        let sections = load_canonical_sections(&paper.dir, &mapping)?;
        let topic_ids = PaperLabeler::resolve_persisted(&label_dir, &paper.rel_path)?;
        let topic_names = resolve_topic_names(&topic_ids, &stable);

        match ingestor.ingest_paper(&paper.rel_path, &sections, &topic_names, &config.chunking).await {
            Ok(chunks) => info!(paper = paper.rel_path, chunks, "ingested source text"),
            Err(e) => warn!(paper = paper.rel_path, error = %e, "source ingestion failed"),
        }
    }

    Ok(())
}

async fn run_load_conclusion(config: &AppConfig, conclude_dir: Option<PathBuf>) -> Result<()> {
    let llm = build_llm(config).await?;
    let store = build_store(config).await?;

    let conclude_root = conclude_dir.unwrap_or_else(|| config.resolve(&config.data_paths.conclude_result));
    let label_dir = config.resolve(&config.data_paths.label_dir);
    let stable_path = config.resolve(&config.data_paths.topic_dir).join("topic.json");
    let stable = TopicStore::load(&stable_path)?;

    let ingestor = SummaryIngestor::new(Arc::clone(&store), Arc::clone(&llm), config.vector_db.embedding_dim);
    ingestor.ensure_collections().await?;

    let papers = discover_papers(&conclude_root)?;
    info!(count = papers.len(), "loading summaries into the aspect vector store");

    for paper in &papers {
        let manifest_path = conclude_root.join(&paper.rel_path).join("summary.json");
        let Ok(content) = std::fs::read_to_string(&manifest_path) else {
            warn!(paper = paper.rel_path, "no summary.json found, skipping");
            continue;
        };
        let manifest: SummaryManifest =
            serde_json::from_str(&content).with_context(|| format!("parsing {}", manifest_path.display()))?;

        let topic_ids = PaperLabeler::resolve_persisted(&label_dir, &paper.rel_path)?;
        let topic_names = resolve_topic_names(&topic_ids, &stable);
        let output_dir = conclude_root.join(&paper.rel_path);

        match ingestor.ingest_paper(&paper.rel_path, &manifest, &output_dir, &topic_names).await {
            Ok(inserted) => info!(paper = paper.rel_path, inserted, "ingested summaries"),
            Err(e) => warn!(paper = paper.rel_path, error = %e, "summary ingestion failed"),
        }
    }

    Ok(())
}

async fn run_gen_paper(config: &AppConfig, requirement: &str, step: Option<usize>, output: Option<PathBuf>) -> Result<()> {
    let llm = build_llm(config).await?;
    let store = build_store(config).await?;

    let prompt_dir = config.resolve(&config.data_paths.prompt_dir);
    let templates = load_generator_templates(&prompt_dir);

    let rag_data_base = config.resolve(&config.data_paths.rag_data_base);
    let paper_gen_dir = config.resolve(&config.data_paths.paper_gen_dir);

    let pipeline = GenerationPipeline::new(
        llm,
        store,
        templates,
        config.retrieval.top_k_per_aspect,
        config.retrieval.fanout_workers,
        rag_data_base,
        paper_gen_dir,
    );

    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let start_step = step.unwrap_or(1);
    let paper = pipeline.run(requirement, start_step, &timestamp, output.as_deref()).await?;

    println!("Generated {} sections for run {timestamp}", paper.len());
    Ok(())
}
