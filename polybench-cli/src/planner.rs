//! Run Planner
//!
//! Resolves the configured test names against the test tree and builds the
//! (test × variant) matrix the coordinator executes.
//!
//! Layout: `<tests_root>/<category>/<test>/<test><extension>`, with an
//! optional `input.json` next to the sources. Well-known categories are
//! searched first, then any other directory under the root.
//!
//! Filtering options:
//! - Regex pattern matching on test name
//! - Explicit test and variant lists
//!
//! Ordering: tests and variants are sorted by name for deterministic execution.

use crate::config::BenchConfig;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Categories searched before any other directory
pub const KNOWN_CATEGORIES: &[&str] = &[
    "algorithms",
    "data_structures",
    "mathematical",
    "io_operations",
    "network_operations",
    "compression_tests",
    "system_tests",
];

/// Optional per-test input, passed to programs as a path
pub const INPUT_FILE_NAME: &str = "input.json";

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Unknown variant '{0}'")]
    UnknownVariant(String),

    #[error("No variants selected")]
    NoVariants,

    #[error("No test files found under {0}")]
    NoTests(PathBuf),
}

/// One test with the sources found for it
#[derive(Debug, Clone)]
pub struct PlannedTest {
    pub name: String,
    /// Directory the sources were found in
    pub dir: PathBuf,
    /// Input file, if the test has one
    pub input: Option<PathBuf>,
    pub iterations: u32,
    pub requires_network: bool,
    /// Source per variant; variants without a source are absent
    pub sources: BTreeMap<String, PathBuf>,
    /// Timeout per variant
    pub timeouts: BTreeMap<String, Duration>,
}

/// Execution plan for a run
#[derive(Debug, Clone, Default)]
pub struct RunPlan {
    /// Ordered list of tests to run
    pub tests: Vec<PlannedTest>,
    /// Variants taking part, in order
    pub variants: Vec<String>,
}

impl RunPlan {
    /// Number of iterations the plan will execute
    pub fn total_executions(&self) -> usize {
        self.tests
            .iter()
            .map(|t| t.sources.len() * t.iterations as usize)
            .sum()
    }

    /// Whether any planned test needs network access
    pub fn requires_network(&self) -> bool {
        self.tests.iter().any(|t| t.requires_network)
    }
}

/// Selection applied on top of the configuration
#[derive(Debug, Clone, Default)]
pub struct PlanFilter {
    /// Only tests whose name matches
    pub pattern: Option<Regex>,
    /// Only these tests (when non-empty)
    pub tests: Vec<String>,
    /// Only these variants (when non-empty)
    pub variants: Vec<String>,
    /// Overrides every iteration count
    pub iterations: Option<u32>,
}

/// Find the directory holding `test`
pub fn find_test_dir(tests_root: &Path, test: &str) -> Option<PathBuf> {
    let known = KNOWN_CATEGORIES.iter().map(|c| tests_root.join(c));

    let mut others: Vec<PathBuf> = std::fs::read_dir(tests_root)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| !KNOWN_CATEGORIES.contains(&n))
                })
                .collect()
        })
        .unwrap_or_default();
    others.sort();

    known
        .chain(others)
        .map(|category| category.join(test))
        .find(|dir| dir.is_dir())
}

/// Build the plan from configuration, test tree and filter
pub fn build_plan(config: &BenchConfig, filter: &PlanFilter) -> Result<RunPlan, PlanError> {
    for name in &filter.variants {
        if !config.variants.contains_key(name) {
            return Err(PlanError::UnknownVariant(name.clone()));
        }
    }
    let variants: Vec<String> = config
        .variants
        .keys()
        .filter(|name| filter.variants.is_empty() || filter.variants.contains(name))
        .cloned()
        .collect();
    if variants.is_empty() {
        return Err(PlanError::NoVariants);
    }

    let mut names: Vec<String> = if filter.tests.is_empty() {
        config.enabled_tests()
    } else {
        filter.tests.clone()
    };
    if let Some(re) = &filter.pattern {
        names.retain(|name| re.is_match(name));
    }
    names.sort();
    names.dedup();

    let tests_root = &config.system.tests_root;
    let mut tests = Vec::new();
    for name in names {
        let Some(dir) = find_test_dir(tests_root, &name) else {
            warn!("Test '{}' not found under {}", name, tests_root.display());
            continue;
        };

        let mut sources = BTreeMap::new();
        let mut timeouts = BTreeMap::new();
        for variant in &variants {
            let Some(variant_config) = config.variants.get(variant) else {
                continue;
            };
            let source = dir.join(format!("{}{}", name, variant_config.file_extension));
            if source.is_file() {
                timeouts.insert(variant.clone(), config.timeout_for(&name, variant));
                sources.insert(variant.clone(), source);
            } else {
                warn!("Test file not found: {}", source.display());
            }
        }
        if sources.is_empty() {
            continue;
        }

        let input = Some(dir.join(INPUT_FILE_NAME)).filter(|p| p.is_file());
        let suite = config.suite_for(&name);
        tests.push(PlannedTest {
            iterations: filter
                .iterations
                .unwrap_or_else(|| config.iterations_for(&name))
                .max(1),
            requires_network: suite.is_some_and(|s| s.requires_network),
            name,
            dir,
            input,
            sources,
            timeouts,
        });
    }

    if tests.is_empty() {
        return Err(PlanError::NoTests(tests_root.clone()));
    }

    Ok(RunPlan { tests, variants })
}
