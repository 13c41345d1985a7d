//! Configuration loading from polybench.toml
//!
//! Variants, test suites and run settings are declared in a `polybench.toml`
//! file, discovered by walking up from the current directory. Every field
//! has a default so partial files are valid.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the configuration file looked up by [`BenchConfig::discover_path`]
pub const CONFIG_FILE_NAME: &str = "polybench.toml";

/// Polybench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BenchConfig {
    /// Language variants keyed by name
    #[serde(default)]
    pub variants: BTreeMap<String, VariantConfig>,
    /// Test suites keyed by name
    #[serde(default)]
    pub test_suites: BTreeMap<String, TestSuiteConfig>,
    /// Measurement settings
    #[serde(default)]
    pub performance: PerformanceConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
    /// Filesystem and monitoring settings
    #[serde(default)]
    pub system: SystemConfig,
}

/// How a variant turns a source file into something runnable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantKind {
    /// Source is handed straight to an interpreter
    Interpreted,
    /// Source is built ahead of time into a binary or script artifact
    Compiled,
}

impl std::fmt::Display for VariantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VariantKind::Interpreted => write!(f, "interpreted"),
            VariantKind::Compiled => write!(f, "compiled"),
        }
    }
}

/// One language variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantConfig {
    /// Interpreter or runtime to launch (for compiled variants, the tool
    /// checked by validation and used to launch script artifacts)
    pub executable: String,
    /// Argument that makes `executable` print its version
    #[serde(default = "default_version_check")]
    pub version_check: String,
    /// Per-iteration execution timeout (e.g., "60s")
    #[serde(default = "default_variant_timeout")]
    pub timeout: String,
    /// Source file extension including the dot (e.g., ".rs")
    pub file_extension: String,
    /// Whether sources must be built before running
    #[serde(default)]
    pub compile_required: bool,
    /// Build command; its first word selects the build toolchain
    #[serde(default)]
    pub compile_cmd: Option<String>,
    /// Extra arguments placed before the program path
    #[serde(default)]
    pub runtime_args: Vec<String>,
}

impl VariantConfig {
    /// Interpreted or compiled, fixed by `compile_required`
    pub fn kind(&self) -> VariantKind {
        if self.compile_required {
            VariantKind::Compiled
        } else {
            VariantKind::Interpreted
        }
    }

    /// Parsed execution timeout
    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.timeout)
    }
}

fn default_version_check() -> String {
    "--version".to_string()
}
fn default_variant_timeout() -> String {
    "60s".to_string()
}

/// A named group of tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteConfig {
    /// Disabled suites contribute no tests
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Timeout override for tests of this suite
    #[serde(default)]
    pub timeout: Option<String>,
    /// Iteration override for tests of this suite
    #[serde(default)]
    pub iterations: Option<u32>,
    /// Member test names
    #[serde(default)]
    pub tests: Vec<String>,
    /// Whether tests need outbound network access
    #[serde(default)]
    pub requires_network: bool,
}

impl Default for TestSuiteConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            timeout: None,
            iterations: None,
            tests: Vec::new(),
            requires_network: false,
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Measurement settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Iterations per (test, variant) pair
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Timeout used when neither suite nor variant sets one
    #[serde(default = "default_timeout_per_test")]
    pub timeout_per_test: String,
    /// Interval between resource samples (e.g., "100ms")
    #[serde(default = "default_sampling_interval")]
    pub sampling_interval: String,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            timeout_per_test: default_timeout_per_test(),
            sampling_interval: default_sampling_interval(),
        }
    }
}

fn default_iterations() -> u32 {
    10
}
fn default_timeout_per_test() -> String {
    "120s".to_string()
}
fn default_sampling_interval() -> String {
    "100ms".to_string()
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format: "human" or "json"
    #[serde(default = "default_format")]
    pub format: String,
    /// Directory the JSON summary is written to
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Write a JSON summary into `directory` after every run
    #[serde(default)]
    pub save_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            directory: default_output_dir(),
            save_json: false,
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}
fn default_output_dir() -> String {
    "./results".to_string()
}

/// Filesystem layout and monitoring switches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Sample CPU and memory while programs run
    #[serde(default = "default_monitor_resources")]
    pub monitor_resources: bool,
    /// Remove the binaries directory after the run
    #[serde(default)]
    pub cleanup_binaries: bool,
    /// Root of the test tree
    #[serde(default = "default_tests_root")]
    pub tests_root: PathBuf,
    /// Where built artifacts are kept
    #[serde(default = "default_binaries_dir")]
    pub binaries_dir: PathBuf,
    /// Parent of per-build scratch directories (system temp dir if unset)
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            monitor_resources: default_monitor_resources(),
            cleanup_binaries: false,
            tests_root: default_tests_root(),
            binaries_dir: default_binaries_dir(),
            scratch_dir: None,
        }
    }
}

fn default_monitor_resources() -> bool {
    true
}
fn default_tests_root() -> PathBuf {
    PathBuf::from("tests")
}
fn default_binaries_dir() -> PathBuf {
    PathBuf::from("binaries")
}

/// Configuration problems found by [`BenchConfig::validate`] or while parsing
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No variants configured")]
    NoVariants,

    #[error("Variant '{0}' has no executable")]
    MissingExecutable(String),

    #[error("Variant '{0}' requires compilation but has no compile_cmd")]
    MissingCompileCommand(String),

    #[error("No test suite is enabled")]
    NoEnabledSuites,

    #[error("Invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl BenchConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find `polybench.toml` by walking up from the current directory
    pub fn discover_path() -> Option<PathBuf> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Check the structural rules a runnable configuration must satisfy
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.variants.is_empty() {
            return Err(ConfigError::NoVariants);
        }

        for (name, variant) in &self.variants {
            if variant.executable.trim().is_empty() {
                return Err(ConfigError::MissingExecutable(name.clone()));
            }
            let has_compile_cmd = variant
                .compile_cmd
                .as_deref()
                .is_some_and(|cmd| !cmd.trim().is_empty());
            if variant.compile_required && !has_compile_cmd {
                return Err(ConfigError::MissingCompileCommand(name.clone()));
            }
            variant.timeout()?;
        }

        if !self.test_suites.values().any(|suite| suite.enabled) {
            return Err(ConfigError::NoEnabledSuites);
        }

        for suite in self.test_suites.values() {
            if let Some(timeout) = &suite.timeout {
                parse_duration(timeout)?;
            }
        }
        parse_duration(&self.performance.timeout_per_test)?;
        parse_duration(&self.performance.sampling_interval)?;

        Ok(())
    }

    /// Enabled suites in name order
    pub fn enabled_suites(&self) -> impl Iterator<Item = (&String, &TestSuiteConfig)> {
        self.test_suites.iter().filter(|(_, suite)| suite.enabled)
    }

    /// Test names of all enabled suites, sorted and deduplicated
    pub fn enabled_tests(&self) -> Vec<String> {
        let mut tests: Vec<String> = self
            .enabled_suites()
            .flat_map(|(_, suite)| suite.tests.iter().cloned())
            .collect();
        tests.sort();
        tests.dedup();
        tests
    }

    /// First enabled suite listing `test`
    pub fn suite_for(&self, test: &str) -> Option<&TestSuiteConfig> {
        self.enabled_suites()
            .map(|(_, suite)| suite)
            .find(|suite| suite.tests.iter().any(|t| t == test))
    }

    /// Timeout for one (test, variant) pair: suite override, then variant,
    /// then the global per-test timeout
    pub fn timeout_for(&self, test: &str, variant: &str) -> Duration {
        let suite_timeout = self
            .suite_for(test)
            .and_then(|suite| suite.timeout.as_deref())
            .and_then(|t| parse_duration(t).ok());
        let variant_timeout = self
            .variants
            .get(variant)
            .and_then(|v| v.timeout().ok());

        suite_timeout
            .or(variant_timeout)
            .or_else(|| parse_duration(&self.performance.timeout_per_test).ok())
            .unwrap_or(Duration::from_secs(120))
    }

    /// Iteration count for `test`: suite override, then the global count
    pub fn iterations_for(&self, test: &str) -> u32 {
        self.suite_for(test)
            .and_then(|suite| suite.iterations)
            .unwrap_or(self.performance.iterations)
            .max(1)
    }

    /// Parsed resource sampling interval
    pub fn sampling_interval(&self) -> Duration {
        parse_duration(&self.performance.sampling_interval).unwrap_or(Duration::from_millis(100))
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# Polybench Configuration

[variants.python]
executable = "python3"
version_check = "--version"
timeout = "60s"
file_extension = ".py"

[variants.rust]
executable = "rustc"
timeout = "60s"
file_extension = ".rs"
compile_required = true
compile_cmd = "cargo build --release"

[variants.go]
executable = "go"
version_check = "version"
timeout = "60s"
file_extension = ".go"
compile_required = true
compile_cmd = "go build"

[variants.typescript]
executable = "node"
timeout = "60s"
file_extension = ".ts"
compile_required = true
compile_cmd = "tsc"

[test_suites.algorithms]
enabled = true
tests = ["quicksort", "binary_search"]

[test_suites.network_operations]
# Network tests are skipped unless enabled
enabled = false
requires_network = true
tests = ["http_request"]

[performance]
# Iterations per test and variant
iterations = 10
# Timeout when neither suite nor variant sets one
timeout_per_test = "120s"
# Interval between CPU/memory samples
sampling_interval = "100ms"

[output]
# Default output format: human or json
format = "human"
# Directory for JSON summaries
directory = "./results"
save_json = false

[system]
monitor_resources = true
cleanup_binaries = false
tests_root = "tests"
binaries_dir = "binaries"
# Parent directory for build scratch space (uncomment to override)
# scratch_dir = "/tmp"
"#
        .to_string()
    }
}

/// Parse duration string (e.g., "3s", "500ms", "2m")
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidDuration {
        value: s.to_string(),
        reason,
    };

    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty duration string".to_string()));
    }

    let (num_part, unit_part) = trimmed
        .char_indices()
        .find(|(_, c)| c.is_alphabetic() || *c == 'µ')
        .map(|(i, _)| trimmed.split_at(i))
        .unwrap_or((trimmed, "s"));

    let value: f64 = num_part
        .trim()
        .parse()
        .map_err(|_| invalid(format!("invalid number '{}'", num_part)))?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid("duration must be a non-negative number".to_string()));
    }

    let multiplier: f64 = match unit_part.trim().to_lowercase().as_str() {
        "ns" => 1.0,
        "us" | "µs" => 1_000.0,
        "ms" => 1_000_000.0,
        "s" | "" => 1_000_000_000.0,
        "m" | "min" => 60_000_000_000.0,
        other => return Err(invalid(format!("unknown unit '{}'", other))),
    };

    Ok(Duration::from_nanos((value * multiplier) as u64))
}
