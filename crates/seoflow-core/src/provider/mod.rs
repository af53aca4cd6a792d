//! External capabilities consumed by the pipeline.
//!
//! Each capability is a single-operation trait so that tests can substitute
//! deterministic fakes. The search and generation capabilities are wrapped in
//! services that add structured logging and timing around every call.

mod generation;
mod search;
mod store;

use std::fmt;
use std::sync::Arc;

pub use generation::{
    GenerationConstraints, GenerationPurpose, GenerationService, GenerativeCapability, Prompt,
};
pub use search::{SearchService, SearchSource};
pub use store::{ReferenceStore, StyleStore};

/// The full set of capabilities a pipeline runs against.
#[derive(Clone)]
pub struct Capabilities {
    /// Search and ranking source.
    pub search: SearchService,
    /// Generative text capability.
    pub generation: GenerationService,
    /// Client style profiles.
    pub styles: Arc<dyn StyleStore>,
    /// Client reference documents.
    pub references: Arc<dyn ReferenceStore>,
}

impl Capabilities {
    /// Bundles the four capabilities.
    pub fn new<S, G, P, R>(search: S, generation: G, styles: P, references: R) -> Self
    where
        S: SearchSource + 'static,
        G: GenerativeCapability + 'static,
        P: StyleStore + 'static,
        R: ReferenceStore + 'static,
    {
        Self {
            search: SearchService::from_source(search),
            generation: GenerationService::from_capability(generation),
            styles: Arc::new(styles),
            references: Arc::new(references),
        }
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("search", &self.search)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
