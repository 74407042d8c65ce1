pub mod coordinator;
pub mod provider;
pub mod ranking;
pub mod recognition;
pub mod rest_client;
pub mod types;

pub use coordinator::MemoryCoordinator;
pub use provider::MemoryProvider;
pub use ranking::{apply_context_aware_ranking, RankableDocument, RankingContext};
pub use recognition::{UserRecognitionService, UserRecognitionSnapshot};
pub use rest_client::RestMemoryClient;
pub use types::{
    AddMemoryOutcome, AddMemoryRequest, MemoryRecord, MemorySource, ScoredMemory, SearchRequest,
    SearchResponse, UpdateMemoryRequest,
};
