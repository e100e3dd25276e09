pub mod resolution;
pub mod service;
pub mod validation;

pub use resolution::{Resolution, decide, ensure_resolvable};
pub use service::{BursarService, generate_reference_code};
