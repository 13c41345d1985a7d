//! Build Scaffolder
//!
//! Compiles a single source file in a throwaway project:
//!
//! 1. infer external dependencies from the source text (heuristic, see below)
//! 2. create a fresh scratch directory and write a minimal manifest
//! 3. copy the source to the entry point the toolchain expects
//! 4. run the build tool with a bounded timeout
//! 5. copy the artifact to `<binaries_dir>/<stem>_<variant>`
//!
//! The scratch directory is a [`tempfile::TempDir`] and is removed when the
//! build returns, successful or not.
//!
//! Dependency inference is a best-effort text scan. It misses dependencies
//! pulled in through macros or re-exports and may pick up names inside
//! comments or strings; unknown imports are dropped, never fatal.

use crate::supervisor::{Completion, MonitorError, ResourceMonitor};
use crate::validation::find_executable;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Package name used in generated manifests
pub const SCAFFOLD_PACKAGE: &str = "benchmark_test";

const CARGO_BUILD_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_BUILD_TIMEOUT: Duration = Duration::from_secs(60);

/// Crates recognised in Rust sources, with the declaration written for each
const KNOWN_CRATES: &[(&str, &str)] = &[
    ("rand", r#"rand = "0.8""#),
    ("serde", r#"serde = { version = "1.0", features = ["derive"] }"#),
    ("serde_json", r#"serde_json = "1.0""#),
    ("regex", r#"regex = "1.0""#),
    ("reqwest", r#"reqwest = { version = "0.11", features = ["blocking", "json"] }"#),
    ("clap", r#"clap = { version = "4.0", features = ["derive"] }"#),
    ("flate2", r#"flate2 = "1.0""#),
    ("tokio", r#"tokio = { version = "1.0", features = ["full"] }"#),
    ("tempfile", r#"tempfile = "3.0""#),
];

#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error("Source file not found: {0}")]
    SourceMissing(PathBuf),

    #[error("Build tool '{0}' not found on PATH")]
    ToolchainUnavailable(String),

    #[error("Failed to write {path}: {source}")]
    ManifestWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Build failed:\n{diagnostic}")]
    BuildFailed { diagnostic: String },

    #[error("Build timed out after {0:?}")]
    BuildTimeout(Duration),

    #[error("Build reported success but produced no artifact at {0}")]
    ArtifactMissing(PathBuf),

    #[error("Failed to launch build tool: {0}")]
    Launch(#[from] MonitorError),

    #[error("Scaffold I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Project-local TypeScript compiler installed by npm
const LOCAL_TSC: &str = "node_modules/.bin/tsc";

/// Launcher for a bare `tsc` compile command: a global `tsc`, else `npx tsc`,
/// else `local_tsc`. Falls back to `tsc` so a missing compiler is still
/// reported under that name.
fn typescript_launcher(local_tsc: &Path, available: impl Fn(&Path) -> bool) -> Vec<String> {
    if available(Path::new("tsc")) {
        vec!["tsc".to_string()]
    } else if available(Path::new("npx")) {
        vec!["npx".to_string(), "tsc".to_string()]
    } else if available(local_tsc) {
        vec![local_tsc.to_string_lossy().into_owned()]
    } else {
        vec!["tsc".to_string()]
    }
}

/// Build tool family, chosen from the first word of a variant's compile command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toolchain {
    /// `cargo build --release` in a generated crate
    Cargo,
    /// `go build` in a generated module
    Go,
    /// TypeScript compiler emitting a CommonJS script; `launcher` is `tsc` or `npx tsc`
    TypeScript { launcher: Vec<String> },
    /// Any other command; `{source}` and `{output}` are substituted
    Command { template: Vec<String> },
}

impl Toolchain {
    /// Select the toolchain for `compile_cmd`
    pub fn from_compile_cmd(compile_cmd: &str) -> Self {
        let words: Vec<String> = compile_cmd.split_whitespace().map(str::to_string).collect();
        match words.first().map(String::as_str) {
            Some("cargo") | Some("rustc") => Toolchain::Cargo,
            Some("go") => Toolchain::Go,
            Some("tsc") => Toolchain::TypeScript {
                launcher: typescript_launcher(
                    &std::env::current_dir().unwrap_or_default().join(LOCAL_TSC),
                    |tool| find_executable(&tool.to_string_lossy()).is_some(),
                ),
            },
            Some("npx") if words.get(1).map(String::as_str) == Some("tsc") => {
                Toolchain::TypeScript {
                    launcher: vec!["npx".to_string(), "tsc".to_string()],
                }
            }
            _ => Toolchain::Command { template: words },
        }
    }

    /// Program that must be on PATH for builds to work
    pub fn program(&self) -> &str {
        match self {
            Toolchain::Cargo => "cargo",
            Toolchain::Go => "go",
            Toolchain::TypeScript { launcher } => launcher.first().map(String::as_str).unwrap_or("tsc"),
            Toolchain::Command { template } => template.first().map(String::as_str).unwrap_or(""),
        }
    }

    /// Upper bound on a single build
    pub fn build_timeout(&self) -> Duration {
        match self {
            Toolchain::Cargo => CARGO_BUILD_TIMEOUT,
            _ => DEFAULT_BUILD_TIMEOUT,
        }
    }

    /// Whether artifacts are scripts that need the variant's runtime to launch
    pub fn emits_script(&self) -> bool {
        matches!(self, Toolchain::TypeScript { .. })
    }
}

/// One inferred external dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Crate or module path
    pub name: String,
    /// Manifest line declaring it, if the toolchain takes one
    pub declaration: Option<String>,
}

/// Scan `source` for imports the toolchain can resolve
pub fn infer_dependencies(toolchain: &Toolchain, source: &str) -> Vec<Dependency> {
    match toolchain {
        Toolchain::Cargo => infer_cargo_dependencies(source),
        Toolchain::Go => infer_go_imports(source)
            .into_iter()
            .map(|name| Dependency {
                name,
                declaration: None,
            })
            .collect(),
        Toolchain::TypeScript { .. } | Toolchain::Command { .. } => Vec::new(),
    }
}

fn infer_cargo_dependencies(source: &str) -> Vec<Dependency> {
    KNOWN_CRATES
        .iter()
        .filter(|(name, _)| mentions_crate(source, name))
        .map(|(name, declaration)| Dependency {
            name: name.to_string(),
            declaration: Some(declaration.to_string()),
        })
        .collect()
}

fn mentions_crate(source: &str, name: &str) -> bool {
    let pattern = format!(r"\b{name}::|\bextern\s+crate\s+{name}\b|\buse\s+{name}\s*;");
    Regex::new(&pattern).is_ok_and(|re| re.is_match(source))
}

/// Non-standard-library imports of a Go source (first path element contains a dot)
pub fn infer_go_imports(source: &str) -> Vec<String> {
    static BLOCK: OnceLock<Option<Regex>> = OnceLock::new();
    static SINGLE: OnceLock<Option<Regex>> = OnceLock::new();
    static QUOTED: OnceLock<Option<Regex>> = OnceLock::new();

    let block = BLOCK.get_or_init(|| Regex::new(r"(?s)import\s*\((.*?)\)").ok());
    let single = SINGLE.get_or_init(|| Regex::new(r#"import\s+(?:[\w.]+\s+)?"([^"]+)""#).ok());
    let quoted = QUOTED.get_or_init(|| Regex::new(r#""([^"]+)""#).ok());

    let mut imports = Vec::new();
    if let (Some(block), Some(quoted)) = (block, quoted) {
        for caps in block.captures_iter(source) {
            for quoted_caps in quoted.captures_iter(&caps[1]) {
                imports.push(quoted_caps[1].to_string());
            }
        }
    }
    if let Some(single) = single {
        for caps in single.captures_iter(source) {
            imports.push(caps[1].to_string());
        }
    }

    let mut external: Vec<String> = imports
        .into_iter()
        .filter(|path| path.split('/').next().is_some_and(|first| first.contains('.')))
        .collect();
    external.sort();
    external.dedup();
    external
}

/// Render the Cargo manifest for a scaffold crate
pub fn render_cargo_manifest(dependencies: &[Dependency]) -> String {
    let mut manifest = format!(
        "[package]\nname = \"{}\"\nversion = \"0.1.0\"\nedition = \"2021\"\n\n[dependencies]\n",
        SCAFFOLD_PACKAGE
    );
    for declaration in dependencies.iter().filter_map(|d| d.declaration.as_deref()) {
        manifest.push_str(declaration);
        manifest.push('\n');
    }
    manifest.push_str(
        "\n[profile.release]\nopt-level = 3\nlto = true\ncodegen-units = 1\npanic = \"abort\"\ndebug = false\n",
    );
    manifest
}

/// Render the `go.mod` for a scaffold module
pub fn render_go_module() -> String {
    format!("module {}\n\ngo 1.19\n", SCAFFOLD_PACKAGE)
}

/// A built program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    /// Stable location under the binaries directory
    pub path: PathBuf,
    /// Whether the artifact is a script launched through the variant runtime
    pub is_script: bool,
    /// Dependencies written into the manifest or recorded for the build
    pub dependencies: Vec<Dependency>,
}

/// Builds sources for one compiled variant
#[derive(Debug, Clone)]
pub struct BuildScaffolder {
    variant: String,
    toolchain: Toolchain,
    scratch_root: PathBuf,
    binaries_dir: PathBuf,
    monitor: ResourceMonitor,
}

impl BuildScaffolder {
    /// Scaffolder writing scratch projects under `scratch_root` and artifacts to `binaries_dir`
    pub fn new(
        variant: impl Into<String>,
        toolchain: Toolchain,
        scratch_root: impl Into<PathBuf>,
        binaries_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            variant: variant.into(),
            toolchain,
            scratch_root: scratch_root.into(),
            binaries_dir: binaries_dir.into(),
            monitor: ResourceMonitor::unsampled(),
        }
    }

    /// Toolchain in use
    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    /// Where the artifact for `source` ends up
    pub fn artifact_path(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "program".to_string());
        let mut name = format!("{}_{}", stem, self.variant);
        if self.toolchain.emits_script() {
            name.push_str(".js");
        } else if cfg!(windows) {
            name.push_str(".exe");
        }
        self.binaries_dir.join(name)
    }

    /// Build `source` and return the relocated artifact
    pub fn build(&self, source: &Path) -> Result<BuildArtifact, ScaffoldError> {
        if !source.is_file() {
            return Err(ScaffoldError::SourceMissing(source.to_path_buf()));
        }
        let program = self.toolchain.program();
        if program.is_empty() || find_executable(program).is_none() {
            return Err(ScaffoldError::ToolchainUnavailable(program.to_string()));
        }

        let text = std::fs::read_to_string(source)?;
        let dependencies = infer_dependencies(&self.toolchain, &text);
        if !dependencies.is_empty() {
            debug!(
                "{}: inferred dependencies {:?}",
                self.variant,
                dependencies.iter().map(|d| d.name.as_str()).collect::<Vec<_>>()
            );
        }

        std::fs::create_dir_all(&self.scratch_root)?;
        let scratch = tempfile::Builder::new()
            .prefix(&format!("polybench_{}_", self.variant))
            .tempdir_in(&self.scratch_root)?;

        let built = match &self.toolchain {
            Toolchain::Cargo => self.build_cargo(scratch.path(), source, &dependencies)?,
            Toolchain::Go => self.build_go(scratch.path(), source, &dependencies)?,
            Toolchain::TypeScript { launcher } => {
                self.build_typescript(scratch.path(), source, launcher)?
            }
            Toolchain::Command { template } => {
                self.build_command(scratch.path(), source, template)?
            }
        };

        if !built.is_file() {
            return Err(ScaffoldError::ArtifactMissing(built));
        }

        std::fs::create_dir_all(&self.binaries_dir)?;
        let path = self.artifact_path(source);
        std::fs::copy(&built, &path)?;
        info!("{}: built {}", self.variant, path.display());

        Ok(BuildArtifact {
            path,
            is_script: self.toolchain.emits_script(),
            dependencies,
        })
        // `scratch` is dropped here and the directory removed
    }

    fn build_cargo(
        &self,
        scratch: &Path,
        source: &Path,
        dependencies: &[Dependency],
    ) -> Result<PathBuf, ScaffoldError> {
        write_file(&scratch.join("Cargo.toml"), &render_cargo_manifest(dependencies))?;
        let src_dir = scratch.join("src");
        std::fs::create_dir_all(&src_dir)?;
        copy_source(source, &src_dir.join("main.rs"))?;

        let mut command = Command::new("cargo");
        command
            .args(["build", "--release", "--quiet"])
            .current_dir(scratch)
            .env("CARGO_TARGET_DIR", scratch.join("target"));
        self.run_build(command)?;

        let mut binary = scratch.join("target").join("release").join(SCAFFOLD_PACKAGE);
        if cfg!(windows) {
            binary.set_extension("exe");
        }
        Ok(binary)
    }

    fn build_go(
        &self,
        scratch: &Path,
        source: &Path,
        dependencies: &[Dependency],
    ) -> Result<PathBuf, ScaffoldError> {
        write_file(&scratch.join("go.mod"), &render_go_module())?;

        // `go build` refuses files ending in _test.go
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().replace("_test.go", "_benchmark.go"))
            .unwrap_or_else(|| "main.go".to_string());
        copy_source(source, &scratch.join(&file_name))?;

        if !dependencies.is_empty() {
            let mut tidy = Command::new("go");
            tidy.args(["mod", "tidy"]).current_dir(scratch);
            match self.monitor.execute(tidy, DEFAULT_BUILD_TIMEOUT) {
                Ok(result) if result.succeeded() => {}
                Ok(result) => warn!(
                    "{}: go mod tidy failed, building anyway: {}",
                    self.variant,
                    result.combined_output().trim()
                ),
                Err(e) => warn!("{}: go mod tidy could not run: {}", self.variant, e),
            }
        }

        let output = scratch.join(SCAFFOLD_PACKAGE);
        let mut command = Command::new("go");
        command
            .args(["build", "-ldflags", "-s -w", "-o"])
            .arg(&output)
            .arg(&file_name)
            .current_dir(scratch);
        self.run_build(command)?;

        Ok(if cfg!(windows) {
            output.with_extension("exe")
        } else {
            output
        })
    }

    fn build_typescript(
        &self,
        scratch: &Path,
        source: &Path,
        launcher: &[String],
    ) -> Result<PathBuf, ScaffoldError> {
        let file_name = source
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "main.ts".into());
        let entry = scratch.join(&file_name);
        copy_source(source, &entry)?;
        let out_dir = scratch.join("out");

        let (program, rest) = launcher
            .split_first()
            .ok_or_else(|| ScaffoldError::ToolchainUnavailable("tsc".to_string()))?;
        let mut command = Command::new(program);
        command
            .args(rest)
            .arg(&entry)
            .arg("--outDir")
            .arg(&out_dir)
            .args([
                "--target",
                "ES2020",
                "--module",
                "commonjs",
                "--strict",
                "--noEmitOnError",
                "--moduleResolution",
                "node",
            ])
            .current_dir(scratch);
        self.run_build(command)?;

        Ok(out_dir.join(Path::new(&file_name).with_extension("js")))
    }

    fn build_command(
        &self,
        scratch: &Path,
        source: &Path,
        template: &[String],
    ) -> Result<PathBuf, ScaffoldError> {
        let file_name = source
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "main".into());
        let entry = scratch.join(&file_name);
        copy_source(source, &entry)?;
        let output = scratch.join(SCAFFOLD_PACKAGE);

        let entry_str = entry.to_string_lossy().into_owned();
        let output_str = output.to_string_lossy().into_owned();
        let mut args: Vec<String> = template
            .iter()
            .skip(1)
            .map(|arg| arg.replace("{source}", &entry_str).replace("{output}", &output_str))
            .collect();
        if !template.iter().any(|arg| arg.contains("{source}")) {
            args.push(entry_str);
        }
        if !template.iter().any(|arg| arg.contains("{output}")) {
            args.push("-o".to_string());
            args.push(output_str);
        }

        let mut command = Command::new(self.toolchain.program());
        command.args(args).current_dir(scratch);
        self.run_build(command)?;
        Ok(output)
    }

    fn run_build(&self, command: Command) -> Result<(), ScaffoldError> {
        let timeout = self.toolchain.build_timeout();
        let result = self.monitor.execute(command, timeout)?;
        match result.completion {
            Completion::TimedOut => Err(ScaffoldError::BuildTimeout(timeout)),
            Completion::Exited(status) if status.success() => Ok(()),
            Completion::Exited(_) => Err(ScaffoldError::BuildFailed {
                diagnostic: result.combined_output(),
            }),
        }
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), ScaffoldError> {
    std::fs::write(path, contents).map_err(|source| ScaffoldError::ManifestWrite {
        path: path.to_path_buf(),
        source,
    })
}

fn copy_source(from: &Path, to: &Path) -> Result<(), ScaffoldError> {
    std::fs::copy(from, to)
        .map(|_| ())
        .map_err(|source| ScaffoldError::ManifestWrite {
            path: to.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_toolchain_selection() {
        assert_eq!(Toolchain::from_compile_cmd("cargo build --release"), Toolchain::Cargo);
        assert_eq!(Toolchain::from_compile_cmd("rustc -O"), Toolchain::Cargo);
        assert_eq!(Toolchain::from_compile_cmd("go build"), Toolchain::Go);
        assert_eq!(
            Toolchain::from_compile_cmd("npx tsc"),
            Toolchain::TypeScript {
                launcher: vec!["npx".to_string(), "tsc".to_string()]
            }
        );
        let gcc = Toolchain::from_compile_cmd("gcc -O2 {source} -o {output}");
        assert_eq!(gcc.program(), "gcc");
        assert_eq!(gcc.build_timeout(), Duration::from_secs(60));
        assert_eq!(Toolchain::Cargo.build_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_typescript_launcher_fallbacks() {
        let local = Path::new("/work/node_modules/.bin/tsc");
        let only = |name: &'static str| move |tool: &Path| tool == Path::new(name);

        assert_eq!(typescript_launcher(local, |_| true), vec!["tsc"]);
        assert_eq!(typescript_launcher(local, only("npx")), vec!["npx", "tsc"]);
        assert_eq!(
            typescript_launcher(local, |tool| tool == Path::new("npx") || tool == local),
            vec!["npx", "tsc"]
        );
        assert_eq!(
            typescript_launcher(local, only("/work/node_modules/.bin/tsc")),
            vec!["/work/node_modules/.bin/tsc"]
        );
        assert_eq!(typescript_launcher(local, |_| false), vec!["tsc"]);
    }

    #[test]
    fn test_recognised_dependency_declared_unknown_omitted() {
        let source = r#"
            use regex::Regex;
            use mystery_crate::Thing;

            fn main() {
                let re = Regex::new("a+").unwrap();
                println!("{}", re.is_match("aaa"));
            }
        "#;
        let deps = infer_dependencies(&Toolchain::Cargo, source);
        let names: Vec<&str> = deps.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["regex"]);

        let manifest = render_cargo_manifest(&deps);
        assert!(manifest.contains("regex = \"1.0\""));
        assert!(!manifest.contains("mystery_crate"));
        assert!(manifest.contains("name = \"benchmark_test\""));
        assert!(manifest.contains("lto = true"));
        assert!(manifest.contains("panic = \"abort\""));
    }

    #[test]
    fn test_crate_names_match_on_word_boundaries() {
        let source = "fn f() { let x = operand::value(); serde_json::to_string(&x); }";
        let names: Vec<String> = infer_dependencies(&Toolchain::Cargo, source)
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["serde_json".to_string()]);
    }

    #[test]
    fn test_go_imports() {
        let source = r#"
package main

import (
    "fmt"
    "math/rand"
    "github.com/klauspost/compress/zstd"
)

import yaml "gopkg.in/yaml.v3"
import "os"
"#;
        assert_eq!(
            infer_go_imports(source),
            vec![
                "github.com/klauspost/compress/zstd".to_string(),
                "gopkg.in/yaml.v3".to_string()
            ]
        );
        assert!(render_go_module().starts_with("module benchmark_test"));
    }

    #[test]
    fn test_artifact_path_is_named_by_stem_and_variant() {
        let scaffolder = BuildScaffolder::new("rust", Toolchain::Cargo, "/tmp", "binaries");
        let path = scaffolder.artifact_path(Path::new("tests/algorithms/quicksort/quicksort.rs"));
        let expected = if cfg!(windows) { "quicksort_rust.exe" } else { "quicksort_rust" };
        assert_eq!(path, Path::new("binaries").join(expected));

        let ts = BuildScaffolder::new(
            "typescript",
            Toolchain::from_compile_cmd("tsc"),
            "/tmp",
            "binaries",
        );
        assert_eq!(
            ts.artifact_path(Path::new("sort.ts")),
            Path::new("binaries").join("sort_typescript.js")
        );
    }

    #[test]
    fn test_missing_source() {
        let dir = TempDir::new().unwrap();
        let scaffolder = BuildScaffolder::new("rust", Toolchain::Cargo, dir.path(), dir.path());
        let err = scaffolder.build(&dir.path().join("absent.rs")).unwrap_err();
        assert!(matches!(err, ScaffoldError::SourceMissing(_)));
    }

    #[test]
    fn test_missing_toolchain() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("prog.c");
        std::fs::write(&source, "int main(void) { return 0; }").unwrap();
        let scaffolder = BuildScaffolder::new(
            "c",
            Toolchain::from_compile_cmd("polybench-no-such-compiler {source}"),
            dir.path(),
            dir.path().join("bin"),
        );
        let err = scaffolder.build(&source).unwrap_err();
        assert!(matches!(err, ScaffoldError::ToolchainUnavailable(ref p) if p == "polybench-no-such-compiler"));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_toolchain_builds_and_cleans_scratch() {
        let dir = TempDir::new().unwrap();
        let scratch_root = dir.path().join("scratch");
        let binaries = dir.path().join("bin");
        let source = dir.path().join("hello.sh");
        std::fs::write(&source, "#!/bin/sh\necho hello\n").unwrap();

        // "compiler" that copies the source and marks it executable
        let script = dir.path().join("fakecc.sh");
        std::fs::write(&script, "#!/bin/sh\ncp \"$1\" \"$2\" && chmod +x \"$2\"\n").unwrap();
        let template = format!("sh {} {{source}} {{output}}", script.display());
        let scaffolder =
            BuildScaffolder::new("shell", Toolchain::from_compile_cmd(&template), &scratch_root, &binaries);

        let artifact = scaffolder.build(&source).unwrap();
        assert_eq!(artifact.path, binaries.join("hello_shell"));
        assert!(artifact.path.is_file());
        assert!(!artifact.is_script);

        let leftovers = std::fs::read_dir(&scratch_root).unwrap().count();
        assert_eq!(leftovers, 0, "scratch directory must be removed");
    }

    #[cfg(unix)]
    #[test]
    fn test_build_failure_surfaces_diagnostic_and_cleans_scratch() {
        let dir = TempDir::new().unwrap();
        let scratch_root = dir.path().join("scratch");
        let source = dir.path().join("broken.src");
        std::fs::write(&source, "garbage").unwrap();
        let script = dir.path().join("failcc.sh");
        std::fs::write(&script, "#!/bin/sh\necho \"error: unexpected token in $1\" >&2\nexit 1\n").unwrap();

        let template = format!("sh {} {{source}} {{output}}", script.display());
        let scaffolder = BuildScaffolder::new(
            "broken",
            Toolchain::from_compile_cmd(&template),
            &scratch_root,
            dir.path().join("bin"),
        );

        match scaffolder.build(&source) {
            Err(ScaffoldError::BuildFailed { diagnostic }) => {
                assert!(diagnostic.starts_with("error: unexpected token in "));
                assert!(diagnostic.contains("broken.src"));
            }
            other => panic!("expected build failure, got {:?}", other),
        }
        assert_eq!(std::fs::read_dir(&scratch_root).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_artifact_despite_success() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("noop.src");
        std::fs::write(&source, "").unwrap();

        let scaffolder = BuildScaffolder::new(
            "noop",
            Toolchain::from_compile_cmd("true {source} {output}"),
            dir.path().join("scratch"),
            dir.path().join("bin"),
        );
        let err = scaffolder.build(&source).unwrap_err();
        assert!(matches!(err, ScaffoldError::ArtifactMissing(_)));
    }
}
