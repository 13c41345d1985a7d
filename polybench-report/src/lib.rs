#![warn(missing_docs)]
//! Polybench Report - Run Aggregates
//!
//! Plain data handed to downstream renderers:
//! - Per-variant performance and per-test analysis
//! - Cross-test overall rankings
//! - Run metadata and totals
//!
//! JSON is the only machine format emitted here; richer renderings are built
//! from the same structures elsewhere.

mod json;
mod report;

pub use json::generate_json_report;
pub use report::{
    OverallRanking, RankedVariant, RunMeta, RunSummary, RunTotals, SystemInfo, TestAnalysis,
    VariantPerformance,
};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed JSON of the whole run summary
    Json,
    /// Human-readable terminal output
    Human,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

/// Format seconds with an adaptive unit
pub fn format_secs(secs: f64) -> String {
    if secs <= 0.0 {
        "0".to_string()
    } else if secs < 1e-3 {
        format!("{:.2} µs", secs * 1e6)
    } else if secs < 1.0 {
        format!("{:.2} ms", secs * 1e3)
    } else {
        format!("{:.3} s", secs)
    }
}

/// Format a byte count in binary units
pub fn format_bytes(bytes: f64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;
    if bytes >= GIB {
        format!("{:.2} GiB", bytes / GIB)
    } else if bytes >= MIB {
        format!("{:.2} MiB", bytes / MIB)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes / KIB)
    } else {
        format!("{:.0} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("text".parse::<OutputFormat>(), Ok(OutputFormat::Human));
        assert!("html".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_format_secs() {
        assert_eq!(format_secs(0.0), "0");
        assert_eq!(format_secs(0.0000015), "1.50 µs");
        assert_eq!(format_secs(0.0125), "12.50 ms");
        assert_eq!(format_secs(2.5), "2.500 s");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512.0), "512 B");
        assert_eq!(format_bytes(2048.0), "2.0 KiB");
        assert_eq!(format_bytes(3.0 * 1024.0 * 1024.0), "3.00 MiB");
    }
}
