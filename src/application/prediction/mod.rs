pub mod cache;
pub mod pipeline;
pub mod service;
pub mod session;

pub use cache::{CacheEntry, PredictionCache};
pub use pipeline::{PipelineSettings, PredictionPipeline};
pub use service::{Capabilities, PredictionService};
pub use session::{Reply, Session};
