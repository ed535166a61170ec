#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ronda/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod export;
pub mod report;
pub mod summary;

pub use export::{
    CostSensitivityExport, ExportError, ExportFormat, Exporter, HoldingExport, LoadingExport,
    LookbackExport, MonthlyRecordExport, RegressionRow, SeriesExport, SeriesPoint,
};
pub use report::{Report, ReportBuilder, ReportError};
pub use summary::{PerformanceRow, RegressionTable, SummaryTable};
