pub mod debounce;
pub mod marshal;
pub mod pipeline;

pub use debounce::Debouncer;
pub use marshal::MarshallerAdapter;
pub use pipeline::{EventPipeline, PipelineOutput};
