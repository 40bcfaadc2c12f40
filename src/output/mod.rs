//! Result records and writers.

mod csv;
pub mod progress;
mod report;
mod types;

pub use csv::{write_batch_csv, write_batch_csv_to};
pub use report::{
    ImageMetadata, QcStatus, ReportRecord, format_bbox_list, round_report_value, write_report,
    write_report_to,
};
pub use types::{
    BatchOutcome, BatchRecord, BatchResponse, ErrorRecord, ErrorResponse, InferenceResult,
};
