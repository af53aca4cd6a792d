//! The five pipeline stages.
//!
//! Each stage is usable on its own: the orchestrator only adds caching,
//! coalescing, retries and persistence around them. Landscape analysis,
//! drafting and style adaptation call external capabilities; competitor
//! synthesis and optimization are pure.

mod brief;
mod competitor;
mod draft;
mod landscape;
mod optimizer;
mod prompt;
mod style;

pub use brief::DraftBrief;
pub use competitor::CompetitorSynthesizer;
pub use draft::{DraftGenerator, DraftParams};
pub use landscape::LandscapeAnalyzer;
pub use optimizer::SeoOptimizer;
pub use style::{AdaptParams, StyleAdapter};
