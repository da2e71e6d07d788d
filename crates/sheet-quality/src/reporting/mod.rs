//! Scan reports.
//!
//! A [`ScanReport`] is the serializable summary of one scan, used for:
//! - JSON output to stdout (`--json` CLI flag)
//! - JSON file output (`--report` CLI flag)
//! - Programmatic access in library mode
//!
//! # Example
//!
//! ```rust,ignore
//! use sheet_quality::reporting::{ReportGenerator, ScanReport};
//!
//! let report = ScanReport::from_scan(&scan, Some("data/orders.csv"));
//! println!("{}", serde_json::to_string_pretty(&report)?);
//!
//! let generator = ReportGenerator::new(PathBuf::from("output"));
//! generator.write_report_to_file(&report, "orders")?;
//! ```

mod generator;

pub use generator::{KindCount, ReportGenerator, ScanReport};
