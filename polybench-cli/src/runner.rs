//! Variant Runners
//!
//! A runner turns a test source into something executable (`prepare`) and
//! executes it once per iteration (`run`). Interpreted variants hand the
//! source to their runtime; compiled variants build it through the
//! [`BuildScaffolder`] once and reuse the artifact for every iteration.
//!
//! `run` never fails: spawn errors, missing binaries, non-zero exits and
//! timeouts all come back as failed [`RawSample`]s.

use crate::config::{VariantConfig, VariantKind};
use crate::scaffold::{BuildArtifact, BuildScaffolder, ScaffoldError, Toolchain};
use crate::supervisor::ResourceMonitor;
use crate::validation::is_executable;
use polybench_core::{FailureKind, RawSample, SampleOutcome};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Why a source could not be made runnable
#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("Source file not found: {0}")]
    SourceMissing(PathBuf),

    #[error(transparent)]
    Build(#[from] ScaffoldError),
}

impl PrepareError {
    /// Failure recorded for the iterations this error prevents
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            PrepareError::SourceMissing(_) => FailureKind::MissingExecutable,
            PrepareError::Build(ScaffoldError::ToolchainUnavailable(_)) => {
                FailureKind::ToolchainUnavailable
            }
            PrepareError::Build(_) => FailureKind::BuildFailed,
        }
    }

    /// Text stored on failed samples; build diagnostics are kept verbatim
    pub fn diagnostic(&self) -> String {
        match self {
            PrepareError::Build(ScaffoldError::BuildFailed { diagnostic })
                if !diagnostic.trim().is_empty() =>
            {
                diagnostic.clone()
            }
            other => other.to_string(),
        }
    }
}

/// Handle returned by `prepare`, consumed by `run`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreparedProgram {
    /// Source handed to the variant's interpreter
    Source(PathBuf),
    /// Native binary executed directly
    Binary(PathBuf),
    /// Build output launched through the variant's runtime
    Script(PathBuf),
}

impl PreparedProgram {
    pub fn path(&self) -> &Path {
        match self {
            PreparedProgram::Source(p) | PreparedProgram::Binary(p) | PreparedProgram::Script(p) => p,
        }
    }
}

/// Runs sources directly through an interpreter
#[derive(Debug, Clone)]
pub struct InterpretedRunner {
    name: String,
    executable: String,
    runtime_args: Vec<String>,
}

impl InterpretedRunner {
    pub fn new(name: impl Into<String>, executable: impl Into<String>, runtime_args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            executable: executable.into(),
            runtime_args,
        }
    }

    fn prepare(&self, source: &Path) -> Result<PreparedProgram, PrepareError> {
        if source.is_file() {
            Ok(PreparedProgram::Source(source.to_path_buf()))
        } else {
            Err(PrepareError::SourceMissing(source.to_path_buf()))
        }
    }
}

/// Builds sources ahead of time and runs the artifacts
#[derive(Debug)]
pub struct CompiledRunner {
    name: String,
    executable: String,
    runtime_args: Vec<String>,
    scaffolder: BuildScaffolder,
    built: HashMap<PathBuf, BuildArtifact>,
}

impl CompiledRunner {
    pub fn new(
        name: impl Into<String>,
        executable: impl Into<String>,
        runtime_args: Vec<String>,
        scaffolder: BuildScaffolder,
    ) -> Self {
        Self {
            name: name.into(),
            executable: executable.into(),
            runtime_args,
            scaffolder,
            built: HashMap::new(),
        }
    }

    fn prepare(&mut self, source: &Path) -> Result<PreparedProgram, PrepareError> {
        let artifact = match self.built.get(source) {
            Some(artifact) => artifact.clone(),
            None => {
                let artifact = self.scaffolder.build(source)?;
                self.built.insert(source.to_path_buf(), artifact.clone());
                artifact
            }
        };
        Ok(if artifact.is_script {
            PreparedProgram::Script(artifact.path)
        } else {
            PreparedProgram::Binary(artifact.path)
        })
    }
}

/// Interpreted or compiled execution strategy for one variant
#[derive(Debug)]
pub enum VariantRunner {
    Interpreted(InterpretedRunner),
    Compiled(CompiledRunner),
}

impl VariantRunner {
    /// Runner for `config`; compiled variants build under `scratch_root` and
    /// keep artifacts in `binaries_dir`
    pub fn from_config(
        name: &str,
        config: &VariantConfig,
        scratch_root: &Path,
        binaries_dir: &Path,
    ) -> Self {
        match config.kind() {
            VariantKind::Interpreted => VariantRunner::Interpreted(InterpretedRunner::new(
                name,
                config.executable.clone(),
                config.runtime_args.clone(),
            )),
            VariantKind::Compiled => {
                let toolchain = Toolchain::from_compile_cmd(config.compile_cmd.as_deref().unwrap_or(""));
                let scaffolder = BuildScaffolder::new(name, toolchain, scratch_root, binaries_dir);
                VariantRunner::Compiled(CompiledRunner::new(
                    name,
                    config.executable.clone(),
                    config.runtime_args.clone(),
                    scaffolder,
                ))
            }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            VariantRunner::Interpreted(r) => &r.name,
            VariantRunner::Compiled(r) => &r.name,
        }
    }

    pub fn kind(&self) -> VariantKind {
        match self {
            VariantRunner::Interpreted(_) => VariantKind::Interpreted,
            VariantRunner::Compiled(_) => VariantKind::Compiled,
        }
    }

    /// Make `source` runnable
    pub fn prepare(&mut self, source: &Path) -> Result<PreparedProgram, PrepareError> {
        match self {
            VariantRunner::Interpreted(r) => r.prepare(source),
            VariantRunner::Compiled(r) => r.prepare(source),
        }
    }

    /// Execute one iteration of `prepared`, passing `input` as a path argument
    pub fn run(
        &self,
        prepared: &PreparedProgram,
        input: Option<&Path>,
        test: &str,
        iteration: u32,
        timeout: Duration,
        monitor: &ResourceMonitor,
    ) -> RawSample {
        let name = self.name();
        let mut command = match self.command_for(prepared) {
            Ok(command) => command,
            Err(error) => {
                return RawSample::failed(
                    test,
                    name,
                    iteration,
                    FailureKind::MissingExecutable,
                    error,
                    SampleOutcome::default(),
                )
            }
        };
        if let Some(input) = input {
            command.arg(input);
        }

        match monitor.execute(command, timeout) {
            Ok(result) => result.into_sample(test, name, iteration),
            Err(e) => {
                debug!("{}: {} iteration {} could not start: {}", name, test, iteration, e);
                RawSample::failed(
                    test,
                    name,
                    iteration,
                    FailureKind::SpawnFailed,
                    e.to_string(),
                    SampleOutcome::default(),
                )
            }
        }
    }

    fn command_for(&self, prepared: &PreparedProgram) -> Result<Command, String> {
        let (executable, runtime_args) = match self {
            VariantRunner::Interpreted(r) => (&r.executable, &r.runtime_args),
            VariantRunner::Compiled(r) => (&r.executable, &r.runtime_args),
        };
        match prepared {
            PreparedProgram::Source(path) | PreparedProgram::Script(path) => {
                let mut command = Command::new(executable);
                command.args(runtime_args).arg(path);
                Ok(command)
            }
            PreparedProgram::Binary(path) => {
                if !path.exists() {
                    return Err(format!("Executable not found: {}", path.display()));
                }
                if !is_executable(path) {
                    return Err(format!("Binary not executable: {}", path.display()));
                }
                Ok(Command::new(path))
            }
        }
    }
}
