pub mod normalize;
pub mod rules;
pub mod extraction;
pub mod reconcile;
pub mod validation;
pub mod confidence;
pub mod duplicate;
pub mod ingest;
pub mod processor;
pub mod worker;
