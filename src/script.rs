//! Script activation for injected fragments.
//!
//! A fragment's script nodes are never attached as-is; the resolver builds a
//! fresh script element per node and notifies a [`ScriptRuntime`] once it is
//! attached, mirroring environments where insertion is what triggers
//! execution. The runtime's completion signal is what the resolver awaits
//! before moving to the next script.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::dom::{Document, NodeId};
use crate::error::ScriptError;
use crate::fetch::FragmentFetcher;

#[derive(Debug, Clone)]
pub enum ScriptSource {
    Inline(String),
    /// A non-empty `src` attribute wins over inline text.
    External { raw: String, resolved: Url },
}

/// Everything needed to rebuild an executable equivalent of a fragment's
/// script node: its full attribute set and its body.
#[derive(Debug, Clone)]
pub struct ScriptDescriptor {
    pub attributes: Vec<(String, String)>,
    pub source: ScriptSource,
}

impl ScriptDescriptor {
    /// Reads a script node out of a fragment document. External sources are
    /// resolved against the including document's base URL, the way a browser
    /// resolves a `src` property.
    pub fn from_node(fragment: &Document, id: NodeId, base: &Url) -> Result<Self, ScriptError> {
        let Some(element) = fragment.element(id) else {
            return Err(ScriptError::Execution {
                reason: "script node is not an element".to_string(),
            });
        };
        let attributes = clone_attributes(&element.attrs, &[]);
        let source = match element.attr("src").filter(|src| !src.is_empty()) {
            Some(src) => ScriptSource::External {
                raw: src.to_string(),
                resolved: base.join(src).map_err(|source| ScriptError::BadSource {
                    src: src.to_string(),
                    base: base.clone(),
                    source,
                })?,
            },
            None => ScriptSource::Inline(fragment.text_content(id)),
        };
        Ok(Self { attributes, source })
    }

    pub fn is_external(&self) -> bool {
        matches!(self.source, ScriptSource::External { .. })
    }
}

/// Copies attribute pairs verbatim, minus any name on the deny list. The
/// resolver copies everything (`deny = &[]`); execution is re-triggered by
/// insertion alone, never by attribute mutation.
pub fn clone_attributes(attrs: &[(String, String)], deny: &[&str]) -> Vec<(String, String)> {
    attrs
        .iter()
        .filter(|(name, _)| !deny.contains(&name.as_str()))
        .cloned()
        .collect()
}

/// Completion signal for an attached script. Implementations decide what
/// "loaded" means: nothing at all, a probe fetch, or real evaluation in an
/// embedding with a script engine.
#[async_trait]
pub trait ScriptRuntime: Send + Sync {
    /// Called after the rebuilt script element is attached to its host.
    /// Must not return until the script counts as loaded; an `Err` aborts
    /// the remaining scripts of the fragment attempt.
    async fn script_attached(&self, script: &ScriptDescriptor) -> Result<(), ScriptError>;
}

/// Treats every script as instantly loaded. Inline scripts complete on
/// insertion anyway; external ones are logged and assumed fine.
pub struct InertScriptRuntime;

#[async_trait]
impl ScriptRuntime for InertScriptRuntime {
    async fn script_attached(&self, script: &ScriptDescriptor) -> Result<(), ScriptError> {
        if let ScriptSource::External { resolved, .. } = &script.source {
            debug!(src = %resolved, "external script attached without loading");
        }
        Ok(())
    }
}

/// Loads external script sources on insertion, so an unreachable `src` fails
/// the fragment attempt just like a browser's error event would.
pub struct FetchScriptRuntime {
    fetcher: Arc<dyn FragmentFetcher>,
}

impl FetchScriptRuntime {
    pub fn new(fetcher: Arc<dyn FragmentFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl ScriptRuntime for FetchScriptRuntime {
    async fn script_attached(&self, script: &ScriptDescriptor) -> Result<(), ScriptError> {
        match &script.source {
            ScriptSource::Inline(_) => Ok(()),
            ScriptSource::External { resolved, .. } => {
                self.fetcher
                    .fetch(resolved)
                    .await
                    .map_err(|source| ScriptError::Load {
                        src: resolved.clone(),
                        source,
                    })?;
                debug!(src = %resolved, "external script loaded");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/pages/index.html").unwrap()
    }

    #[test]
    fn inline_descriptor_carries_text_and_attributes() {
        let fragment =
            Document::parse_fragment("<script type=\"module\">window.loaded = true;</script>");
        let script = fragment.children(fragment.root())[0];
        let descriptor = ScriptDescriptor::from_node(&fragment, script, &base()).unwrap();
        assert!(!descriptor.is_external());
        assert_eq!(descriptor.attributes, vec![("type".to_string(), "module".to_string())]);
        match descriptor.source {
            ScriptSource::Inline(text) => assert_eq!(text, "window.loaded = true;"),
            ScriptSource::External { .. } => panic!("expected inline source"),
        }
    }

    #[test]
    fn external_source_wins_and_resolves_against_base() {
        let fragment = Document::parse_fragment("<script src=\"../js/app.js\">ignored</script>");
        let script = fragment.children(fragment.root())[0];
        let descriptor = ScriptDescriptor::from_node(&fragment, script, &base()).unwrap();
        match descriptor.source {
            ScriptSource::External { raw, resolved } => {
                assert_eq!(raw, "../js/app.js");
                assert_eq!(resolved.as_str(), "https://example.com/js/app.js");
            }
            ScriptSource::Inline(_) => panic!("expected external source"),
        }
    }

    #[test]
    fn empty_src_counts_as_inline() {
        let fragment = Document::parse_fragment("<script src=\"\">let a = 1;</script>");
        let script = fragment.children(fragment.root())[0];
        let descriptor = ScriptDescriptor::from_node(&fragment, script, &base()).unwrap();
        assert!(!descriptor.is_external());
    }

    #[test]
    fn clone_attributes_honors_deny_list() {
        let attrs = vec![
            ("type".to_string(), "text/javascript".to_string()),
            ("src".to_string(), "app.js".to_string()),
        ];
        let copied = clone_attributes(&attrs, &["src"]);
        assert_eq!(copied, vec![("type".to_string(), "text/javascript".to_string())]);
        let all = clone_attributes(&attrs, &[]);
        assert_eq!(all, attrs);
    }
}
