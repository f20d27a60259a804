//! Generated message and token identifiers.

use uuid::Uuid;

/// Default base for generated identifiers
pub const DEFAULT_ID_BASE: &str = "https://w3id.org/idsa/autogen";

/// Produces `{base}/{path}/{uuid}` identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdGenerator {
    base: String,
}

impl IdGenerator {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// Fresh identifier under `path`, e.g. `rejectionMessage`.
    pub fn generate(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base,
            path.trim_matches('/'),
            Uuid::new_v4()
        )
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_ID_BASE)
    }
}
