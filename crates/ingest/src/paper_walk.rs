//! Recursive paper-directory discovery shared by the matcher, concluder,
//! and labeler: a directory that directly contains `.txt` files is a paper
//! directory; anything else is an intermediate directory to recurse into.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// One discovered paper directory, identified by its path relative to the
/// walked root (e.g. `"ICS/2023/3577193.3593712"`).
#[derive(Debug, Clone)]
pub struct PaperRef {
    /// `{conf}/{year}/{base}`, using `/` regardless of platform.
    pub rel_path: String,
    pub dir: PathBuf,
}

impl PaperRef {
    /// The trailing path component, used as the paper's `{base}` in
    /// `paper_id = "{conf}/{year}/{base}_{i}"`.
    #[must_use]
    pub fn base(&self) -> &str {
        self.rel_path.rsplit('/').next().unwrap_or(&self.rel_path)
    }
}

fn rel_path_of(root: &Path, dir: &Path) -> String {
    dir.strip_prefix(root)
        .unwrap_or(dir)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn has_txt_file(dir: &Path) -> Result<bool> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::read_failed(dir.display().to_string(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::read_failed(dir.display().to_string(), e))?;
        if entry.path().extension().is_some_and(|ext| ext == "txt") {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Walk `root` and return every paper directory found, recursing through
/// intermediate directories (conference/year/...) of arbitrary depth.
pub fn discover_papers(root: &Path) -> Result<Vec<PaperRef>> {
    let mut papers = Vec::new();
    if !root.exists() {
        return Ok(papers);
    }
    walk(root, root, &mut papers)?;
    papers.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(papers)
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<PaperRef>) -> Result<()> {
    if has_txt_file(dir)? {
        out.push(PaperRef {
            rel_path: rel_path_of(root, dir),
            dir: dir.to_path_buf(),
        });
        return Ok(());
    }

    let entries = std::fs::read_dir(dir).map_err(|e| Error::read_failed(dir.display().to_string(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::read_failed(dir.display().to_string(), e))?;
        let path = entry.path();
        if path.is_dir() {
            walk(root, &path, out)?;
        }
    }
    Ok(())
}

/// List raw section titles for a paper directory: every `.txt` filename,
/// stem only, in directory-read (discovery) order.
pub fn raw_section_titles(paper_dir: &Path) -> Result<Vec<String>> {
    let mut titles = Vec::new();
    let entries =
        std::fs::read_dir(paper_dir).map_err(|e| Error::read_failed(paper_dir.display().to_string(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::read_failed(paper_dir.display().to_string(), e))?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "txt") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                titles.push(stem.to_string());
            }
        }
    }
    titles.sort();
    Ok(titles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovers_nested_paper_directories() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let paper_dir = tmp.path().join("ICS").join("2023").join("paper1");
        std::fs::create_dir_all(&paper_dir)?;
        std::fs::write(paper_dir.join("Introduction.txt"), "text")?;

        let papers = discover_papers(tmp.path())?;
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].rel_path, "ICS/2023/paper1");
        assert_eq!(papers[0].base(), "paper1");
        Ok(())
    }

    #[test]
    fn missing_root_yields_no_papers() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let papers = discover_papers(Path::new("/nonexistent/root"))?;
        assert!(papers.is_empty());
        Ok(())
    }

    #[test]
    fn raw_section_titles_strips_txt_extension() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        std::fs::write(tmp.path().join("Method.txt"), "x")?;
        std::fs::write(tmp.path().join("notes.md"), "y")?;

        let titles = raw_section_titles(tmp.path())?;
        assert_eq!(titles, vec!["Method".to_string()]);
        Ok(())
    }
}
