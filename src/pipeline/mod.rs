//! Query, batch and report pipelines.

mod batch;
mod input;
mod orchestrator;
mod report;

pub use batch::{run_batch, run_item};
pub use input::{
    BatchLocation, CsvInputError, parse_csv_locations, parse_json_locations, read_batch_locations,
};
pub use orchestrator::{
    InferenceOrchestrator, QueryContext, QueryOutput, QueryStage, build_result,
};
pub use report::{
    ReportOptions, ReportSummary, build_report_record, collect_images, parse_stem_coordinate,
    run_report,
};
