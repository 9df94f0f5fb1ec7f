pub mod assembly;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod refinement;
pub mod retrieval;
pub mod steps;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use orchestrator::{Orchestrator, ResearchOptions};
pub use pipeline::{DeepResearch, ResearchRequest, ResearchRun};
pub use refinement::{RefinementOutcome, Refiner};
pub use retrieval::{RetryPolicy, Retriever};
pub use traits::{GenerationRequest, GenerationTask, SearchOptions, StructuredGenerator, WebSearcher};
