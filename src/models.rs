use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_INCLUDE_ATTRIBUTE;

/// Resolver settings. The case fallback is the one knob that changes
/// behavior: a failed path is retried with its first letter's case flipped,
/// which papers over case-sensitive-filesystem mismatches during debugging.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Attribute that marks include hosts.
    pub attribute: String,
    /// Retry a failed path with the first character's case flipped.
    pub case_fallback: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            attribute: DEFAULT_INCLUDE_ATTRIBUTE.to_string(),
            case_fallback: false,
        }
    }
}

/// Terminal state of one host element after a resolver run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HostOutcome {
    /// The fragment at `candidate` was injected. `candidate` differs from
    /// `path` only when the case fallback kicked in.
    Resolved { path: String, candidate: String },
    /// The include attribute was missing or empty.
    Skipped,
    /// Every candidate failed; the host holds a placeholder comment.
    Failed { path: String },
}

/// Per-host outcomes of one `resolve_document` call, in discovery order.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveReport {
    pub outcomes: Vec<HostOutcome>,
}

impl ResolveReport {
    pub fn hosts(&self) -> usize {
        self.outcomes.len()
    }

    pub fn resolved(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, HostOutcome::Resolved { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, HostOutcome::Skipped))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, HostOutcome::Failed { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_data_include() {
        let config = ResolverConfig::default();
        assert_eq!(config.attribute, "data-include");
        assert!(!config.case_fallback);
    }

    #[test]
    fn report_counts_by_outcome() {
        let report = ResolveReport {
            outcomes: vec![
                HostOutcome::Resolved {
                    path: "a.html".into(),
                    candidate: "a.html".into(),
                },
                HostOutcome::Skipped,
                HostOutcome::Failed {
                    path: "b.html".into(),
                },
            ],
        };
        assert_eq!(report.hosts(), 3);
        assert_eq!(report.resolved(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = HostOutcome::Failed {
            path: "nav.html".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["path"], "nav.html");
    }
}
