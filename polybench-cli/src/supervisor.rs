//! Resource Monitor
//!
//! Runs one external program under a deadline while a sampling thread reads
//! its resident memory and CPU utilisation at a fixed interval.
//!
//! ```text
//!  spawn ──► child ───────────────── exit | deadline ──┐
//!    │                                                 ├──► join ──► Supervised
//!    └──► sampler: refresh, sleep(interval), ... stop ─┘
//! ```
//!
//! Standard output and error are redirected into anonymous temporary files
//! so a chatty program can never block on a full pipe. The wall-clock
//! duration runs from spawn to the first observed exit and does not depend
//! on the sampling interval. On timeout the process group receives SIGTERM,
//! then SIGKILL after a short grace period, and the duration is pinned to
//! the deadline.

use polybench_core::{Deadline, FailureKind, RawSample, SampleOutcome, Timer};
use std::io::{Read, Seek, SeekFrom};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// How often the supervising thread checks for process exit
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Time a timed-out process gets between SIGTERM and SIGKILL
const TERMINATION_GRACE: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        source: std::io::Error,
    },

    #[error("Failed to capture process output: {0}")]
    Capture(#[source] std::io::Error),

    #[error("Failed to wait for process: {0}")]
    WaitFailed(#[source] std::io::Error),
}

/// How supervision ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The process exited on its own
    Exited(ExitStatus),
    /// The deadline elapsed and the process was terminated
    TimedOut,
}

/// Result of one supervised execution
#[derive(Debug)]
pub struct Supervised {
    /// How the process ended
    pub completion: Completion,
    /// Timing, resource usage and captured output
    pub outcome: SampleOutcome,
    /// The deadline the process ran under
    pub timeout: Duration,
}

impl Supervised {
    /// Whether the process exited with status zero
    pub fn succeeded(&self) -> bool {
        matches!(self.completion, Completion::Exited(status) if status.success())
    }

    /// Captured stdout followed by stderr, as build tools report diagnostics on either
    pub fn combined_output(&self) -> String {
        let mut text = self.outcome.stdout.clone();
        if !text.is_empty() && !self.outcome.stderr.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&self.outcome.stderr);
        text
    }

    /// Label this execution as iteration `iteration` of `variant` on `test`
    pub fn into_sample(self, test: &str, variant: &str, iteration: u32) -> RawSample {
        match self.completion {
            Completion::Exited(status) if status.success() => {
                RawSample::succeeded(test, variant, iteration, self.outcome)
            }
            Completion::Exited(status) => {
                let code = status.code();
                let error = if self.outcome.stderr.trim().is_empty() {
                    match code {
                        Some(code) => format!("Process exited with code {}", code),
                        None => "Process terminated by signal".to_string(),
                    }
                } else {
                    self.outcome.stderr.clone()
                };
                RawSample::failed(
                    test,
                    variant,
                    iteration,
                    FailureKind::NonZeroExit { code },
                    error,
                    self.outcome,
                )
            }
            Completion::TimedOut => {
                let error = format!("Timeout after {}s", self.timeout.as_secs_f64());
                RawSample::failed(
                    test,
                    variant,
                    iteration,
                    FailureKind::Timeout,
                    error,
                    self.outcome,
                )
            }
        }
    }
}

/// Launches programs under a deadline and samples their resource usage
#[derive(Debug, Clone)]
pub struct ResourceMonitor {
    sampling_interval: Duration,
    sample_resources: bool,
}

impl ResourceMonitor {
    /// Monitor sampling every `sampling_interval` when `sample_resources` is set
    pub fn new(sampling_interval: Duration, sample_resources: bool) -> Self {
        Self {
            sampling_interval: sampling_interval.max(Duration::from_millis(1)),
            sample_resources,
        }
    }

    /// Monitor that only enforces the deadline (used for builds and probes)
    pub fn unsampled() -> Self {
        Self::new(Duration::from_millis(100), false)
    }

    /// Run `command` to completion or until `timeout` elapses
    pub fn execute(&self, mut command: Command, timeout: Duration) -> Result<Supervised, MonitorError> {
        let program = command.get_program().to_string_lossy().into_owned();

        let mut stdout_file = tempfile::tempfile().map_err(MonitorError::Capture)?;
        let mut stderr_file = tempfile::tempfile().map_err(MonitorError::Capture)?;
        command
            .stdin(Stdio::null())
            .stdout(Stdio::from(
                stdout_file.try_clone().map_err(MonitorError::Capture)?,
            ))
            .stderr(Stdio::from(
                stderr_file.try_clone().map_err(MonitorError::Capture)?,
            ));

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own process group so a timeout also reaches grandchildren
            command.process_group(0);
        }

        debug!("spawning {}", describe_command(&command));
        let timer = Timer::start();
        let mut child = command
            .spawn()
            .map_err(|source| MonitorError::SpawnFailed { program, source })?;
        let deadline = Deadline::after(&timer, timeout);

        let sampler = if self.sample_resources {
            Sampler::start(child.id(), self.sampling_interval)
        } else {
            None
        };

        let waited = wait_until(&mut child, &deadline);
        let elapsed = timer.elapsed();

        let completion = match waited {
            Ok(Some(status)) => Completion::Exited(status),
            Ok(None) => {
                debug!("process {} exceeded {:?}, terminating", child.id(), timeout);
                terminate(&mut child);
                Completion::TimedOut
            }
            Err(e) => {
                terminate(&mut child);
                if let Some(sampler) = sampler {
                    sampler.finish();
                }
                return Err(MonitorError::WaitFailed(e));
            }
        };

        // The sampler is always stopped and joined before the outcome is built
        let usage = sampler.map(Sampler::finish).unwrap_or_default();

        let duration = match completion {
            Completion::TimedOut => timeout,
            Completion::Exited(_) => elapsed,
        };

        let outcome = SampleOutcome {
            duration,
            peak_memory_bytes: usage.peak_memory_bytes,
            avg_cpu_percent: usage.average_cpu(),
            stdout: read_captured(&mut stdout_file),
            stderr: read_captured(&mut stderr_file),
        };

        trace!(
            "completed in {:?} (peak {} bytes, {} cpu readings)",
            duration,
            usage.peak_memory_bytes,
            usage.cpu_readings.len()
        );

        Ok(Supervised {
            completion,
            outcome,
            timeout,
        })
    }
}

impl Default for ResourceMonitor {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), true)
    }
}

/// Render a command line for logs
pub fn describe_command(command: &Command) -> String {
    let mut parts = vec![command.get_program().to_string_lossy().into_owned()];
    parts.extend(command.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

/// Poll for exit until the deadline; `Ok(None)` means the deadline won
fn wait_until(child: &mut Child, deadline: &Deadline) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let remaining = deadline.remaining();
        if remaining.is_zero() {
            return Ok(None);
        }
        std::thread::sleep(remaining.min(EXIT_POLL_INTERVAL));
    }
}

/// Terminate the child and its process group: SIGTERM, grace period, SIGKILL
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        let pgid = child.id();
        let _ = signal_group(pgid, libc::SIGTERM);

        let grace_end = Instant::now() + TERMINATION_GRACE;
        while Instant::now() < grace_end {
            if matches!(child.try_wait(), Ok(Some(_))) {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }

        let _ = signal_group(pgid, libc::SIGKILL);
    }

    let _ = child.kill();
    let _ = child.wait();
}

/// Send `signal` to every process in group `pgid`
#[cfg(unix)]
fn signal_group(pgid: u32, signal: libc::c_int) -> Result<(), std::io::Error> {
    let ret = unsafe { libc::kill(-(pgid as libc::pid_t), signal) };
    if ret == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn read_captured(file: &mut std::fs::File) -> String {
    let mut bytes = Vec::new();
    if let Err(e) = file
        .seek(SeekFrom::Start(0))
        .and_then(|_| file.read_to_end(&mut bytes))
    {
        warn!("failed to read captured output: {}", e);
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Readings accumulated by the sampling thread
#[derive(Debug, Default)]
struct ResourceUsage {
    peak_memory_bytes: u64,
    cpu_readings: Vec<f64>,
}

impl ResourceUsage {
    fn average_cpu(&self) -> f64 {
        if self.cpu_readings.is_empty() {
            0.0
        } else {
            self.cpu_readings.iter().sum::<f64>() / self.cpu_readings.len() as f64
        }
    }
}

/// Background sampling loop bound to one process
struct Sampler {
    stop: Sender<()>,
    handle: JoinHandle<ResourceUsage>,
}

impl Sampler {
    fn start(pid: u32, interval: Duration) -> Option<Self> {
        let (stop, stop_rx) = mpsc::channel();
        match std::thread::Builder::new()
            .name("polybench-sampler".to_string())
            .spawn(move || sample_loop(pid, interval, stop_rx))
        {
            Ok(handle) => Some(Self { stop, handle }),
            Err(e) => {
                warn!("resource sampling disabled for pid {}: {}", pid, e);
                None
            }
        }
    }

    /// Signal the loop to stop and wait for it
    fn finish(self) -> ResourceUsage {
        let _ = self.stop.send(());
        self.handle.join().unwrap_or_default()
    }
}

fn sample_loop(pid: u32, interval: Duration, stop: Receiver<()>) -> ResourceUsage {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    let refresh = ProcessRefreshKind::nothing().with_memory().with_cpu();
    let mut usage = ResourceUsage::default();

    loop {
        system.refresh_processes_specifics(ProcessesToUpdate::Some(&[pid]), true, refresh);
        match system.process(pid) {
            Some(process) => {
                usage.peak_memory_bytes = usage.peak_memory_bytes.max(process.memory());
                // The first refresh has no CPU baseline and reports 0
                let cpu = f64::from(process.cpu_usage());
                if cpu > 0.0 {
                    usage.cpu_readings.push(cpu);
                }
            }
            None => trace!("pid {} not readable this tick", pid),
        }

        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    usage
}
