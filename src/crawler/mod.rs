//! Blog scraping
//!
//! Search listing, browser-driven detail extraction and the pipeline that ties
//! them together under pause/stop control.

pub mod browser;
pub mod detail;
pub mod gate;
pub mod headers;
pub mod pipeline;
pub mod search;
pub mod selectors;

pub use detail::DetailFetcher;
pub use gate::{Checkpoint, ControlGate};
pub use pipeline::{PipelineEvent, ScrapePipeline};
pub use search::SearchClient;
pub use selectors::SelectorSet;
