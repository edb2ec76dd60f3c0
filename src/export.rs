//! One-shot URL export: walk a site tree, write the sorted unique URL set.
//!
//! The export collaborator of the capture view. Given a site-tree root and a
//! destination file it writes one URL per line, lexicographically sorted and
//! de-duplicated; targets with an `.htm`/`.html` extension get each entry
//! wrapped in an anchor tag instead. Nodes flagged as temporary are skipped.
//! The destination is overwritten. A failed write is reported as a single
//! warning naming the destination, never a panic.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One node of the hierarchical site map produced by the crawler.
#[derive(Clone, Debug, Default)]
pub struct SiteNode {
    /// URL represented by this node; the synthetic root carries none.
    pub url: Option<String>,
    /// Temporary nodes are bookkeeping artifacts and are excluded from
    /// exports.
    pub temporary: bool,
    pub children: Vec<SiteNode>,
}

impl SiteNode {
    /// Synthetic root with no URL of its own.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            temporary: false,
            children: Vec::new(),
        }
    }

    pub fn temporary(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            temporary: true,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: SiteNode) -> Self {
        self.children.push(child);
        self
    }
}

/// Collects the exportable URLs under `root` in preorder.
///
/// The root itself and temporary nodes contribute nothing, but their
/// children are still visited. The set is sorted and de-duplicated by
/// construction.
pub fn collect_urls(root: &SiteNode) -> BTreeSet<String> {
    let mut urls = BTreeSet::new();
    collect_into(root, true, &mut urls);
    urls
}

fn collect_into(node: &SiteNode, is_root: bool, urls: &mut BTreeSet<String>) {
    if !is_root && !node.temporary {
        if let Some(url) = &node.url {
            urls.insert(url.clone());
        }
    }
    for child in &node.children {
        collect_into(child, false, urls);
    }
}

/// Writes the URL set to `path`, one entry per line, overwriting any
/// existing file. Entries are anchor-wrapped when the target extension is
/// an HTML variant.
pub fn write_urls(path: &Path, urls: &BTreeSet<String>) -> Result<(), String> {
    let html = is_html_target(path);

    let file = File::create(path)
        .map_err(|e| format!("failed to open {}: {}", path.display(), e))?;
    let mut writer = BufWriter::new(file);

    for url in urls {
        let line = if html { wrap_html(url) } else { url.clone() };
        writeln!(writer, "{}", line)
            .map_err(|e| format!("failed to write {}: {}", path.display(), e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("failed to flush {}: {}", path.display(), e))
}

/// Collects and writes in one step.
///
/// Returns the number of exported URLs. A failed write is abandoned and
/// surfaced as one warning identifying the destination; the error is also
/// returned for callers that want it.
pub fn export_urls(root: &SiteNode, path: &Path) -> Result<usize, String> {
    let urls = collect_urls(root);
    match write_urls(path, &urls) {
        Ok(()) => {
            log::info!("exported {} URLs to {}", urls.len(), path.display());
            Ok(urls.len())
        }
        Err(e) => {
            log::warn!("could not save URL export to {}: {}", path.display(), e);
            Err(e)
        }
    }
}

fn is_html_target(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            ext == "htm" || ext == "html"
        })
        .unwrap_or(false)
}

fn wrap_html(url: &str) -> String {
    format!("<a href=\"{}\">{}</a><br>", url, url)
}
