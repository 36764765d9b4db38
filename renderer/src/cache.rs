use std::sync::Arc;

use dashmap::DashMap;
use folio::parser::ParseError;
use tracing::debug;

use crate::evaluator::CompiledExpr;

/// Append-only map from expression source to its compiled form.
///
/// Entries are never evicted or replaced. Two threads compiling the same
/// source at once both succeed and one result is kept; the results are
/// identical. Share between renderers with `Arc<ExpressionCache>`.
#[derive(Debug, Default)]
pub struct ExpressionCache {
    entries: DashMap<String, Arc<CompiledExpr>>,
}

impl ExpressionCache {
    pub fn new() -> Self {
        ExpressionCache::default()
    }

    /// Look up `source`, compiling and inserting it on a miss.
    /// Sources that fail to compile are not stored.
    pub fn get_or_compile(&self, source: &str) -> Result<Arc<CompiledExpr>, ParseError> {
        if let Some(entry) = self.entries.get(source) {
            return Ok(Arc::clone(entry.value()));
        }

        // Compile outside the shard lock
        let compiled = Arc::new(CompiledExpr::compile(source)?);
        debug!(expression = %source, "compiled expression");

        let entry = self
            .entries
            .entry(source.to_string())
            .or_insert(compiled);
        Ok(Arc::clone(entry.value()))
    }

    pub fn contains(&self, source: &str) -> bool {
        self.entries.contains_key(source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
