mod registry;

pub use registry::{ModelRegistry, ModelRole, ModelSelection, ModelSpec};
