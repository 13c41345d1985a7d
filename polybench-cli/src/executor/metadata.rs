//! System Metadata Collection
//!
//! Collects run metadata for the summary:
//!
//! - **Identifier**: `bench_YYYYMMDD_HHMMSS` from the local start time
//! - **OS**: Operating system name and architecture
//! - **CPU**: Model name and core count
//! - **Memory**: Total system RAM in GB

use crate::planner::RunPlan;
use chrono::{DateTime, Local, Utc};
use polybench_report::{RunMeta, SystemInfo};
use std::collections::BTreeMap;
use std::time::Duration;
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Identifier for a run started at `started`
pub fn benchmark_id(started: DateTime<Local>) -> String {
    started.format("bench_%Y%m%d_%H%M%S").to_string()
}

/// Metadata for a finished run
pub fn build_run_meta(
    benchmark_id: String,
    plan: &RunPlan,
    total_duration: Duration,
    tool_versions: BTreeMap<String, String>,
) -> RunMeta {
    RunMeta {
        benchmark_id,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        total_duration_secs: total_duration.as_secs_f64(),
        total_tests: plan.tests.len(),
        total_variants: plan.variants.len(),
        total_executions: plan.total_executions(),
        tool_versions,
        system: system_info(),
    }
}

/// Host description
///
/// CPU brand and total memory come from `sysinfo`; either falls back to
/// "Unknown" or 0 where the platform does not report it.
pub fn system_info() -> SystemInfo {
    let system = System::new_with_specifics(
        RefreshKind::nothing()
            .with_memory(MemoryRefreshKind::nothing().with_ram())
            .with_cpu(CpuRefreshKind::nothing()),
    );

    let cpu = system
        .cpus()
        .iter()
        .map(|cpu| cpu.brand().trim())
        .find(|brand| !brand.is_empty())
        .map_or_else(|| "Unknown".to_string(), str::to_string);
    let cores = std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1);

    SystemInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        cpu,
        cpu_cores: cores,
        memory_gb: system.total_memory() as f64 / BYTES_PER_GB,
    }
}
