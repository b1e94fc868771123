use serde::{Deserialize, Serialize};

/// Knobs for [`Indexer`](crate::Indexer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Keep annotations from `RuntimeInvisible*` attributes.
    pub invisible_annotations: bool,
    /// Record which classes mention a class in their constant pool.
    pub track_users: bool,
    /// Add the enum and record members a compiler may leave out of the
    /// class file.
    pub synthesize_implicit_members: bool,
    /// On [`Indexer::complete`](crate::Indexer::complete), resolve type
    /// variables declared by an enclosing class or method.
    pub resolve_enclosing_type_variables: bool,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            invisible_annotations: true,
            track_users: true,
            synthesize_implicit_members: true,
            resolve_enclosing_type_variables: true,
        }
    }
}
