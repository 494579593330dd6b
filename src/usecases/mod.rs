//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement the
//! fetcher's workflows.
//!
//! Use cases:
//! - `IngestionPipeline`: One pass over the registry (primary, quotes, premium, sink)
//! - `Supervisor`: Single-shot or drift-free periodic scheduling with defect containment

pub mod ingestion;
pub mod scheduler;

pub use ingestion::{CycleRunner, IngestionPipeline};
pub use scheduler::Supervisor;
