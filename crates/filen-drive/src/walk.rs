//! Traversals: find, search, and tree.
//!
//! The service has no server-side search (it cannot read names), so all of
//! these are client-side walks over decrypted listings. `find` matches
//! file names against a case-insensitive glob; folders are traversed, not
//! matched. A max depth of -1 means unbounded.

use std::future::Future;
use std::pin::Pin;

use glob::{MatchOptions, Pattern};

use filen_core::{paths, FileHandle, Result};

use crate::Drive;

/// One `find` hit: the file and its full remote path.
#[derive(Debug, Clone)]
pub struct FoundFile {
    pub path: String,
    pub file: FileHandle,
}

const CASE_INSENSITIVE: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

impl Drive {
    /// Iterative depth-first find seeded at `start`. Files whose names
    /// match `pattern` (case-insensitive glob) are yielded with their full
    /// paths. `max_depth` counts levels below `start`: 1 lists only the
    /// start folder's own files, -1 is unbounded.
    pub async fn find(&self, start: &str, pattern: &str, max_depth: i32) -> Result<Vec<FoundFile>> {
        let matcher = Pattern::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid pattern {pattern:?}: {e}"))?;
        let root = self.resolve_folder(start).await?;
        let root_path = paths::normalize(start);

        let mut results = Vec::new();
        if max_depth == 0 {
            return Ok(results);
        }

        // Stack of (folder uuid, folder path, depth of its contents).
        let mut stack = vec![(root.uuid, root_path, 1i32)];
        while let Some((uuid, path, depth)) = stack.pop() {
            let mut files = self.files_under(&uuid).await?;
            files.sort_by(|a, b| a.name.cmp(&b.name));
            for file in files {
                if matcher.matches_with(&file.name, CASE_INSENSITIVE) {
                    results.push(FoundFile {
                        path: paths::join(&path, &file.name),
                        file,
                    });
                }
            }

            if max_depth < 0 || depth < max_depth {
                let mut folders = self.folders_under(&uuid).await?;
                folders.sort_by(|a, b| a.name.cmp(&b.name));
                // LIFO stack: push in reverse so traversal stays name-ordered.
                for folder in folders.into_iter().rev() {
                    let child_path = paths::join(&path, &folder.name);
                    stack.push((folder.uuid, child_path, depth + 1));
                }
            }
        }
        Ok(results)
    }

    /// Emulated drive-wide search: a find from the root for `*query*`.
    pub async fn search(&self, query: &str, max_depth: i32) -> Result<Vec<FoundFile>> {
        let escaped = Pattern::escape(query);
        self.find("/", &format!("*{escaped}*"), max_depth).await
    }

    /// Render a folder subtree with ASCII box-drawing, recursing while the
    /// current depth is below `max_depth` (-1 = unbounded).
    pub async fn tree(&self, start: &str, max_depth: i32) -> Result<String> {
        let root = self.resolve_folder(start).await?;
        let normalized = paths::normalize(start);
        let mut out = String::new();
        out.push_str(if normalized == "/" { "/" } else { &root.name });
        out.push('\n');
        out.push_str(
            &self
                .tree_level(root.uuid, String::new(), 1, max_depth)
                .await?,
        );
        Ok(out)
    }

    fn tree_level(
        &self,
        uuid: String,
        prefix: String,
        depth: i32,
        max_depth: i32,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + '_>> {
        Box::pin(async move {
            let mut out = String::new();
            if max_depth >= 0 && depth > max_depth {
                return Ok(out);
            }
            let mut folders = self.folders_under(&uuid).await?;
            let mut files = self.files_under(&uuid).await?;
            folders.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
            files.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

            let total = folders.len() + files.len();
            for (i, folder) in folders.iter().enumerate() {
                let last = i + 1 == total;
                out.push_str(&prefix);
                out.push_str(if last { "└── " } else { "├── " });
                out.push_str(&folder.name);
                out.push_str("/\n");

                let child_prefix = format!("{prefix}{}", if last { "    " } else { "│   " });
                let subtree = self
                    .tree_level(folder.uuid.clone(), child_prefix, depth + 1, max_depth)
                    .await?;
                out.push_str(&subtree);
            }
            for (j, file) in files.iter().enumerate() {
                let last = folders.len() + j + 1 == total;
                out.push_str(&prefix);
                out.push_str(if last { "└── " } else { "├── " });
                out.push_str(&file.name);
                out.push('\n');
            }
            Ok(out)
        })
    }
}
