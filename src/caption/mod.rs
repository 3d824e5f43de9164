// Caption candidate pipeline: analysis, generation, reranking, refinement.

pub mod fallback;
pub mod generator;
pub mod preferences;
pub mod refine;
pub mod rerank;
pub mod sanitize;
pub mod vibe;

pub use fallback::FallbackPicker;
pub use preferences::{
    CaptionLength, ContentMode, GenderStyle, Language, PreferencesPatch, Tone, UserPreferences,
};
pub use refine::RefineDirection;
pub use vibe::{Safety, VibeAnalysis};
