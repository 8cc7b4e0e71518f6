//! Domain types for inquiry analysis.

pub mod analysis;
pub mod attachment;
pub mod company;

pub use analysis::{AnalysisResult, Language, Rating};
pub use attachment::FileAttachment;
