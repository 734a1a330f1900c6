// Ordered feature layout shared by every model
pub mod feature_registry;

// Model identities and per-model flags
pub mod model_kind;

pub use feature_registry::{FEATURE_NAMES, FeatureRow, N_FEATURES};
pub use model_kind::{ModelFlags, ModelKind};
