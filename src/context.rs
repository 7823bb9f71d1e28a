//! Project context scanning for agent prompts.
//!
//! A shallow walk of the workspace producing an opaque markdown summary:
//! detected languages by source-file count and the top-level layout. The
//! pipeline core never looks inside it.

use std::collections::BTreeMap;
use std::path::Path;

use walkdir::WalkDir;

use crate::store::STORE_DIR;

const SCAN_DEPTH: usize = 4;
const SKIP_DIRS: [&str; 5] = [STORE_DIR, ".git", "target", "node_modules", "dist"];

/// Summary of a workspace's tree and tech stack.
#[derive(Debug, Clone, Default)]
pub struct ProjectContext {
    /// Language label → source file count, descending by count on render.
    pub languages: BTreeMap<&'static str, usize>,
    /// Top-level entries, directories suffixed with `/`.
    pub top_level: Vec<String>,
    pub file_count: usize,
}

/// Walk the workspace and summarize it.
pub fn scan(workspace: &Path) -> ProjectContext {
    let mut context = ProjectContext::default();

    for entry in WalkDir::new(workspace)
        .min_depth(1)
        .max_depth(SCAN_DEPTH)
        .into_iter()
        .filter_entry(|e| {
            e.file_name()
                .to_str()
                .is_none_or(|name| !SKIP_DIRS.contains(&name))
        })
        .filter_map(|e| e.ok())
    {
        if entry.depth() == 1 {
            if let Some(name) = entry.file_name().to_str() {
                if entry.file_type().is_dir() {
                    context.top_level.push(format!("{}/", name));
                } else {
                    context.top_level.push(name.to_string());
                }
            }
        }

        if entry.file_type().is_file() {
            context.file_count += 1;
            if let Some(language) = entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(language_for_extension)
            {
                *context.languages.entry(language).or_insert(0) += 1;
            }
        }
    }

    context.top_level.sort();
    context
}

fn language_for_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "rs" => Some("Rust"),
        "ts" | "tsx" => Some("TypeScript"),
        "js" | "jsx" | "mjs" => Some("JavaScript"),
        "py" => Some("Python"),
        "go" => Some("Go"),
        "java" => Some("Java"),
        "rb" => Some("Ruby"),
        "c" | "h" => Some("C"),
        "cpp" | "cc" | "hpp" => Some("C++"),
        "cs" => Some("C#"),
        "swift" => Some("Swift"),
        "kt" => Some("Kotlin"),
        _ => None,
    }
}

impl ProjectContext {
    /// Render the summary as markdown.
    pub fn render(&self) -> String {
        let mut out = String::from("# Project context\n\n");

        if self.languages.is_empty() {
            out.push_str("No recognized source files found.\n");
        } else {
            let mut languages: Vec<_> = self.languages.iter().collect();
            languages.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

            out.push_str("## Languages\n\n");
            for (language, count) in languages {
                out.push_str(&format!("- {} ({} files)\n", language, count));
            }
            out.push('\n');
        }

        if !self.top_level.is_empty() {
            out.push_str("## Top-level layout\n\n");
            for entry in &self.top_level {
                out.push_str(&format!("- {}\n", entry));
            }
        }

        out
    }
}
