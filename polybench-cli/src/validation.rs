//! Environment validation
//!
//! Checks that every variant's runtime and build tool can be found before
//! anything is executed, and that the runtime answers its version-check
//! argument with exit status 0. The first line of that answer is kept as the
//! variant's version for run metadata. Results
//! are cached on the validator instance, so a run that asks about the same
//! variant many times pays for the lookup once.

use crate::config::{VariantConfig, VariantKind};
use crate::scaffold::Toolchain;
use crate::supervisor::ResourceMonitor;
use std::collections::{BTreeMap, HashMap};
use std::net::{SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Upper bound on a version probe
pub const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Address used for the reachability check of network suites
const NETWORK_PROBE_ADDR: ([u8; 4], u16) = ([8, 8, 8, 8], 53);

/// Why a variant cannot run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("Unknown variant '{0}'")]
    UnknownVariant(String),

    #[error("{variant}: executable '{executable}' not found on PATH")]
    ExecutableNotFound { variant: String, executable: String },

    #[error("{variant}: build tool '{tool}' not found on PATH")]
    ToolchainNotFound { variant: String, tool: String },

    #[error("{variant}: '{executable} {args}' did not exit successfully")]
    VersionCheckFailed {
        variant: String,
        executable: String,
        args: String,
    },
}

/// Availability of one variant
#[derive(Debug, Clone)]
pub struct VariantStatus {
    pub name: String,
    pub kind: VariantKind,
    pub version: Option<String>,
    pub issue: Option<ValidationIssue>,
}

impl VariantStatus {
    pub fn is_available(&self) -> bool {
        self.issue.is_none()
    }
}

/// Locate `tool` the way a shell would: as a path if it has separators,
/// otherwise by searching `PATH`
pub fn find_executable(tool: &str) -> Option<PathBuf> {
    let tool_path = Path::new(tool);
    if tool_path.components().count() > 1 {
        return is_executable(tool_path).then(|| tool_path.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| resolve_in_dir(&dir, tool))
}

fn resolve_in_dir(dir: &Path, tool: &str) -> Option<PathBuf> {
    #[cfg(windows)]
    {
        let candidate = dir.join(tool);
        if is_executable(&candidate) {
            return Some(candidate);
        }
        let pathext = std::env::var_os("PATHEXT").unwrap_or_else(|| ".COM;.EXE;.BAT;.CMD".into());
        for ext in std::env::split_paths(&pathext) {
            let ext = ext.to_string_lossy();
            let suffix = ext.trim_matches('.');
            if suffix.is_empty() {
                continue;
            }
            let candidate = dir.join(format!("{tool}.{suffix}"));
            if is_executable(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    #[cfg(not(windows))]
    {
        let candidate = dir.join(tool);
        is_executable(&candidate).then_some(candidate)
    }
}

/// Whether `path` is a regular file the current user may execute
pub fn is_executable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;
        std::fs::metadata(path)
            .ok()
            .is_some_and(|metadata| metadata.permissions().mode() & 0o111 != 0)
    }

    #[cfg(not(unix))]
    {
        true
    }
}

/// Whether an outbound TCP connection can be opened within `timeout`
pub fn check_network(timeout: Duration) -> bool {
    let (ip, port) = NETWORK_PROBE_ADDR;
    let addr = SocketAddr::from((ip, port));
    match TcpStream::connect_timeout(&addr, timeout) {
        Ok(_) => true,
        Err(e) => {
            debug!("Network probe to {} failed: {}", addr, e);
            false
        }
    }
}

/// Validates variants and caches the answers
#[derive(Debug)]
pub struct EnvironmentValidator {
    variants: BTreeMap<String, VariantConfig>,
    validation_cache: HashMap<String, Result<(), ValidationIssue>>,
    version_cache: HashMap<String, Option<String>>,
    monitor: ResourceMonitor,
}

impl EnvironmentValidator {
    pub fn new(variants: BTreeMap<String, VariantConfig>) -> Self {
        Self {
            variants,
            validation_cache: HashMap::new(),
            version_cache: HashMap::new(),
            monitor: ResourceMonitor::unsampled(),
        }
    }

    /// Check that `name` can run: runtime and build tool on PATH, and the
    /// runtime answering its version-check argument with exit status 0
    pub fn validate_variant(&mut self, name: &str) -> Result<(), ValidationIssue> {
        if let Some(cached) = self.validation_cache.get(name) {
            return cached.clone();
        }
        let result = self.check_variant(name).map(|version| {
            self.version_cache.insert(name.to_string(), version);
        });
        if let Err(issue) = &result {
            warn!("{}", issue);
        }
        self.validation_cache.insert(name.to_string(), result.clone());
        result
    }

    fn check_variant(&self, name: &str) -> Result<Option<String>, ValidationIssue> {
        let variant = self
            .variants
            .get(name)
            .ok_or_else(|| ValidationIssue::UnknownVariant(name.to_string()))?;

        if find_executable(&variant.executable).is_none() {
            return Err(ValidationIssue::ExecutableNotFound {
                variant: name.to_string(),
                executable: variant.executable.clone(),
            });
        }

        if let (VariantKind::Compiled, Some(cmd)) = (variant.kind(), variant.compile_cmd.as_deref()) {
            let toolchain = Toolchain::from_compile_cmd(cmd);
            let tool = toolchain.program();
            if tool.is_empty() || find_executable(tool).is_none() {
                return Err(ValidationIssue::ToolchainNotFound {
                    variant: name.to_string(),
                    tool: tool.to_string(),
                });
            }
        }

        self.probe_version(name, variant)
    }

    fn probe_version(
        &self,
        name: &str,
        variant: &VariantConfig,
    ) -> Result<Option<String>, ValidationIssue> {
        let failed = || ValidationIssue::VersionCheckFailed {
            variant: name.to_string(),
            executable: variant.executable.clone(),
            args: variant.version_check.clone(),
        };

        let mut command = Command::new(&variant.executable);
        command.args(variant.version_check.split_whitespace());

        let result = self
            .monitor
            .execute(command, VERSION_PROBE_TIMEOUT)
            .map_err(|e| {
                debug!("{}: version probe failed: {}", name, e);
                failed()
            })?;
        if !result.succeeded() {
            debug!("{}: version probe exited unsuccessfully", name);
            return Err(failed());
        }
        Ok(first_line(&result.combined_output()))
    }

    /// Version string reported by the variant's executable, if it validates
    pub fn variant_version(&mut self, name: &str) -> Option<String> {
        if self.validate_variant(name).is_err() {
            return None;
        }
        self.version_cache.get(name).cloned().flatten()
    }

    /// Validate every variant and collect versions for the available ones
    pub fn validation_report(&mut self) -> Vec<VariantStatus> {
        let names: Vec<String> = self.variants.keys().cloned().collect();
        names
            .into_iter()
            .map(|name| {
                let issue = self.validate_variant(&name).err();
                let version = if issue.is_none() {
                    self.variant_version(&name)
                } else {
                    None
                };
                let kind = self
                    .variants
                    .get(&name)
                    .map(VariantConfig::kind)
                    .unwrap_or(VariantKind::Interpreted);
                VariantStatus {
                    name,
                    kind,
                    version,
                    issue,
                }
            })
            .collect()
    }

    /// Versions of every available variant, for run metadata
    pub fn tool_versions(&mut self) -> BTreeMap<String, String> {
        self.validation_report()
            .into_iter()
            .filter_map(|status| status.version.map(|v| (status.name, v)))
            .collect()
    }
}

fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}
