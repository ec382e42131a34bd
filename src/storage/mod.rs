pub mod memory;
pub mod persistence;
pub mod records;
pub mod repository;

pub use memory::MemoryStore;
pub use persistence::FileStore;
pub use records::{
    AnalysisKind, AnalysisRecord, AnalysisReport, PermutationRecord, RawMetricRecord, RecordId,
    SchemaRecord,
};
pub use repository::{AnalysisRepository, MetadataStore, PermutationRepository, SchemaRepository};
