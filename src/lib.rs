pub mod catalog;
pub mod core;
pub mod normalize;
pub mod oracle;
pub mod pipeline;
pub mod sources;

// --- Primary core exports ---
pub use self::core::types;
pub use self::core::types::*;
pub use self::core::AppState;

pub use pipeline::{resolve_bulk, Resolver};
