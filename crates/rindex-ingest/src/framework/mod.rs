//! Shared ingestion machinery: the connector trait, transport helpers,
//! document readers, the load pipeline and the connector registry

pub mod access_tool;
pub mod decompression;
pub mod ftp;
pub mod http;
pub mod pipeline;
pub mod rdf;
pub mod registry;
pub mod window;
pub mod xml;

pub use access_tool::{ElementCollector, FetchContext, ResourceAccessTool};
pub use http::HttpClient;
pub use pipeline::{PipelineOptions, PipelineStats, ResourcePipeline};
pub use window::{DateWindow, WindowStack};
