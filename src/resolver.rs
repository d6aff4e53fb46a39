//! The include resolver: discovers host elements, fetches their fragments,
//! injects markup, and chains script activation in source order.

use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::constants::failure_comment;
use crate::dom::{Document, NodeId};
use crate::error::IncludeError;
use crate::fetch::FragmentFetcher;
use crate::models::{HostOutcome, ResolveReport, ResolverConfig};
use crate::script::{ScriptDescriptor, ScriptRuntime, ScriptSource};

/// The live document, shared across per-host tasks. Locks are held only for
/// synchronous mutation scopes, never across awaits.
pub type SharedDocument = Arc<Mutex<Document>>;

pub struct IncludeResolver {
    config: ResolverConfig,
    fetcher: Arc<dyn FragmentFetcher>,
    scripts: Arc<dyn ScriptRuntime>,
}

impl IncludeResolver {
    pub fn new(
        config: ResolverConfig,
        fetcher: Arc<dyn FragmentFetcher>,
        scripts: Arc<dyn ScriptRuntime>,
    ) -> Self {
        Self {
            config,
            fetcher,
            scripts,
        }
    }

    /// One-shot expansion pass. The host set is fixed at entry: elements
    /// injected during the run are not picked up. Per-host tasks run
    /// concurrently with no ordering across hosts; failures never escape a
    /// host's own task.
    pub async fn resolve_document(&self, doc: &SharedDocument, base: &Url) -> ResolveReport {
        let hosts: Vec<(NodeId, String)> = {
            let locked = doc.lock().await;
            locked
                .elements_with_attribute(&self.config.attribute)
                .into_iter()
                .map(|id| {
                    let path = locked
                        .attribute(id, &self.config.attribute)
                        .unwrap_or_default()
                        .to_string();
                    (id, path)
                })
                .collect()
        };

        let tasks = hosts
            .into_iter()
            .map(|(host, path)| self.resolve_element(doc, base, host, path));
        let outcomes = join_all(tasks).await;
        ResolveReport { outcomes }
    }

    async fn resolve_element(
        &self,
        doc: &SharedDocument,
        base: &Url,
        host: NodeId,
        path: String,
    ) -> HostOutcome {
        if path.is_empty() {
            return HostOutcome::Skipped;
        }

        for candidate in candidate_paths(&path, self.config.case_fallback) {
            match self.attempt(doc, base, host, &candidate).await {
                Ok(()) => {
                    debug!(path = %path, candidate = %candidate, "include resolved");
                    return HostOutcome::Resolved { path, candidate };
                }
                Err(error) => {
                    warn!(candidate = %candidate, error = %error, "failed to load include");
                }
            }
        }

        let mut locked = doc.lock().await;
        locked.clear_children(host);
        let comment = locked.create_comment(failure_comment(&path));
        locked.append_child(host, comment);
        HostOutcome::Failed { path }
    }

    /// One candidate-path attempt: fetch, parse, inject content, then chain
    /// the scripts. Content already injected when a later script fails stays
    /// in place.
    async fn attempt(
        &self,
        doc: &SharedDocument,
        base: &Url,
        host: NodeId,
        candidate: &str,
    ) -> Result<(), IncludeError> {
        let url = base
            .join(candidate)
            .map_err(|source| IncludeError::PathResolve {
                path: candidate.to_string(),
                base: base.clone(),
                source,
            })?;
        let text = self.fetcher.fetch(&url).await?;
        let fragment = Document::parse_fragment(&text);
        let (content, scripts) = partition_fragment(&fragment);

        {
            let mut locked = doc.lock().await;
            for node in content {
                locked.graft(&fragment, node, host);
            }
        }

        for script in scripts {
            self.run_script(doc, &fragment, script, host, base).await?;
        }
        Ok(())
    }

    /// Rebuilds one script node on the host and awaits its completion signal
    /// before returning, so callers iterating a script list get strict
    /// left-to-right activation.
    async fn run_script(
        &self,
        doc: &SharedDocument,
        fragment: &Document,
        script: NodeId,
        host: NodeId,
        base: &Url,
    ) -> Result<(), IncludeError> {
        let descriptor = ScriptDescriptor::from_node(fragment, script, base)?;

        {
            let mut locked = doc.lock().await;
            let element = locked.create_element("script", descriptor.attributes.clone());
            if let ScriptSource::Inline(text) = &descriptor.source {
                let text_node = locked.create_text(text.clone());
                locked.append_child(element, text_node);
            }
            locked.append_child(host, element);
        }

        self.scripts.script_attached(&descriptor).await?;
        Ok(())
    }
}

/// Splits a fragment into injectable content and runnable scripts: top-level
/// non-script nodes in order, plus every script element in the fragment in
/// document order. Scripts nested inside content ride along as inert copies;
/// only the rebuilt ones are activated, appended to the host.
fn partition_fragment(fragment: &Document) -> (Vec<NodeId>, Vec<NodeId>) {
    let root = fragment.root();
    let content = fragment
        .children(root)
        .iter()
        .copied()
        .filter(|&id| !fragment.is_script(id))
        .collect();
    let scripts = fragment
        .descendants(root)
        .into_iter()
        .filter(|&id| fragment.is_script(id))
        .collect();
    (content, scripts)
}

/// Primary candidate is the literal attribute value. In case-fallback mode a
/// path starting with an ASCII letter gains one alternate with that letter's
/// case flipped, tried only after the primary fails.
pub fn candidate_paths(path: &str, case_fallback: bool) -> Vec<String> {
    let mut candidates = vec![path.to_string()];
    if case_fallback {
        if let Some(first) = path.chars().next() {
            if first.is_ascii_alphabetic() {
                let flipped = if first.is_ascii_lowercase() {
                    first.to_ascii_uppercase()
                } else {
                    first.to_ascii_lowercase()
                };
                let alt: String = std::iter::once(flipped).chain(path.chars().skip(1)).collect();
                if alt != path {
                    candidates.push(alt);
                }
            }
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_path_is_the_only_candidate_without_fallback() {
        assert_eq!(candidate_paths("Foo.html", false), vec!["Foo.html"]);
    }

    #[test]
    fn fallback_flips_first_letter_case() {
        assert_eq!(
            candidate_paths("Foo.html", true),
            vec!["Foo.html", "foo.html"]
        );
        assert_eq!(
            candidate_paths("nav.html", true),
            vec!["nav.html", "Nav.html"]
        );
    }

    #[test]
    fn fallback_skips_non_alphabetic_prefixes() {
        assert_eq!(candidate_paths("_nav.html", true), vec!["_nav.html"]);
        assert_eq!(candidate_paths("1col.html", true), vec!["1col.html"]);
        assert_eq!(candidate_paths("", true), vec![""]);
    }

    #[test]
    fn partition_separates_scripts_from_content() {
        let fragment = Document::parse_fragment(
            "<p>a</p><script>one()</script><div><script>nested()</script></div>",
        );
        let (content, scripts) = partition_fragment(&fragment);
        assert_eq!(content.len(), 2);
        assert_eq!(scripts.len(), 2);
        assert_eq!(fragment.text_content(scripts[0]), "one()");
        assert_eq!(fragment.text_content(scripts[1]), "nested()");
    }
}
