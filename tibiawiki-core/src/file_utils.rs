//! File utility functions.

use crate::article::Article;
use crate::error::{Result, TibiaWikiError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recursively find files with given extension in a directory, sorted by path.
pub fn find_files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(TibiaWikiError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Directory not found: {}", dir.display()),
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file() {
            if let Some(ext) = entry.path().extension() {
                if ext == extension {
                    files.push(entry.path().to_path_buf());
                }
            }
        }
    }
    files.sort();
    Ok(files)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ArticleDump {
    Many(Vec<Article>),
    One(Article),
}

/// Read a JSON dump holding either one article or an array of them.
pub fn read_articles(path: &Path) -> Result<Vec<Article>> {
    let text = std::fs::read_to_string(path)?;
    let dump: ArticleDump = serde_json::from_str(&text)?;
    Ok(match dump {
        ArticleDump::Many(articles) => articles,
        ArticleDump::One(article) => vec![article],
    })
}

/// Read every `.json` dump under `dir`.
///
/// Files that cannot be read are logged and skipped.
pub fn load_articles(dir: &Path) -> Result<Vec<Article>> {
    let files = find_files_with_extension(dir, "json")?;
    tracing::info!("Found {} article files in {}", files.len(), dir.display());

    let mut articles = Vec::new();
    for path in files {
        match read_articles(&path) {
            Ok(mut read) => articles.append(&mut read),
            Err(e) => tracing::warn!("Failed to read {}: {}", path.display(), e),
        }
    }
    Ok(articles)
}
