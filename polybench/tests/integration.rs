//! Integration tests for Polybench
//!
//! These tests drive whole runs against throwaway test trees, using the
//! system shell as both interpreter and "compiler".

#![cfg(unix)]

use polybench::{generate_json_report, run_suite, BenchConfig, PlanFilter};
use polybench_cli::{infer_dependencies, render_cargo_manifest, Toolchain};
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// Test tree with one algorithm test, sources for the shell variants and an input file
fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    write(
        &root.join("tests/algorithms/checksum/checksum.sh"),
        "#!/bin/sh\nwc -c < \"$1\"\n",
    );
    write(&root.join("tests/algorithms/checksum/input.json"), "[1, 2, 3, 4]\n");
    write(
        &root.join("tests/system_tests/sleeper/sleeper.sh"),
        "#!/bin/sh\nsleep 5\n",
    );
    write(
        &root.join("fakecc.sh"),
        "#!/bin/sh\ncp \"$1\" \"$2\" && chmod +x \"$2\"\n",
    );
    dir
}

fn config(root: &Path, extra: &str) -> BenchConfig {
    let text = format!(
        r#"
        [variants.shell]
        executable = "sh"
        version_check = "-c true"
        file_extension = ".sh"
        timeout = "10s"

        [variants.shell_compiled]
        executable = "sh"
        version_check = "-c true"
        file_extension = ".sh"
        timeout = "10s"
        compile_required = true
        compile_cmd = "sh {fakecc} {{source}} {{output}}"

        [variants.ghost]
        executable = "polybench-missing-interpreter"
        file_extension = ".sh"

        [test_suites.algorithms]
        tests = ["checksum"]

        [performance]
        iterations = 3
        sampling_interval = "10ms"

        [system]
        tests_root = "{root}/tests"
        binaries_dir = "{root}/binaries"
        scratch_dir = "{root}/scratch"
        cleanup_binaries = true

        {extra}
        "#,
        fakecc = root.join("fakecc.sh").display(),
        root = root.display(),
        extra = extra,
    );
    let config: BenchConfig = toml::from_str(&text).unwrap();
    config.validate().unwrap();
    config
}

#[test]
fn test_end_to_end_run() {
    let dir = workspace();
    let root = dir.path();
    let config = config(root, "");

    let summary = run_suite(&config, &PlanFilter::default(), false).unwrap();

    assert_eq!(summary.meta.total_tests, 1);
    assert_eq!(summary.meta.total_variants, 3);
    assert_eq!(summary.meta.total_executions, 9);
    assert!(summary.meta.benchmark_id.starts_with("bench_"));

    let checksum = &summary.tests["checksum"];
    for name in ["shell", "shell_compiled"] {
        let perf = &checksum.variants[name];
        assert_eq!(perf.successful_iterations, 3, "{}", name);
        assert!(perf.avg_time_secs > 0.0);
        assert!(perf.performance_score > 0.0);
    }

    let ghost = &checksum.variants["ghost"];
    assert_eq!(ghost.total_iterations, 3);
    assert_eq!(ghost.successful_iterations, 0);
    assert_eq!(ghost.failed_iterations, 3);
    assert_eq!(ghost.performance_score, 0.0);

    assert!(matches!(
        checksum.fastest.as_deref(),
        Some("shell") | Some("shell_compiled")
    ));
    assert_eq!(checksum.most_reliable.as_deref(), Some("shell"));
    assert_eq!(checksum.performance_ranking.len(), 2);
    assert!(summary
        .overall
        .by_overall
        .iter()
        .all(|r| r.variant != "ghost"));

    assert_eq!(summary.totals.total_successful, 6);
    assert_eq!(summary.totals.total_failed, 3);

    // Build scratch space is gone and binaries were cleaned up
    let scratch = root.join("scratch");
    assert!(!scratch.exists() || std::fs::read_dir(&scratch).unwrap().count() == 0);
    assert!(!root.join("binaries").exists());

    let json = generate_json_report(&summary).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["tests"]["checksum"]["variants"]["shell"]["successful_iterations"], 3);
    assert_eq!(value["totals"]["total_failed"], 3);
}

#[test]
fn test_hung_program_times_out_per_iteration() {
    let dir = workspace();
    let root = dir.path();
    let config = config(
        root,
        r#"
        [test_suites.system]
        tests = ["sleeper"]
        timeout = "300ms"
        iterations = 2
        "#,
    );
    let filter = PlanFilter {
        tests: vec!["sleeper".to_string()],
        variants: vec!["shell".to_string()],
        ..Default::default()
    };

    let started = Instant::now();
    let summary = run_suite(&config, &filter, false).unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));

    let sleeper = &summary.tests["sleeper"].variants["shell"];
    assert_eq!(sleeper.total_iterations, 2);
    assert_eq!(sleeper.failed_iterations, 2);
    assert!(summary.tests["sleeper"].fastest.is_none());
    assert_eq!(summary.totals.total_failed, 2);
}

#[test]
fn test_scaffold_manifest_keeps_known_dependencies_only() {
    let source = r#"
        use rand::Rng;
        use internal_helpers::shuffle;

        fn main() {
            let mut rng = rand::thread_rng();
            println!("{}", rng.gen_range(0..10));
        }
    "#;
    let deps = infer_dependencies(&Toolchain::Cargo, source);
    let manifest = render_cargo_manifest(&deps);

    assert!(manifest.contains("rand = \"0.8\""));
    assert!(!manifest.contains("internal_helpers"));
    assert!(manifest.contains("[profile.release]"));
    assert!(manifest.contains("opt-level = 3"));
}
