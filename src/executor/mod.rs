//! Language execution capability.
//!
//! The node itself never touches a compiler: source is handed to an
//! `Executor` looked up by language tag. Unrecognized languages fall back
//! to a generic engine rather than failing, so no language name can reject
//! a connection.

mod engines;

pub use engines::{CppEngine, GenericEngine, RustEngine};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Result of one execution request. Immutable after creation; exactly one
/// is produced per parseable request.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    /// The language tag the request declared.
    pub language: String,
    /// Captured output text.
    pub stdout_text: String,
    /// Process-style exit code.
    pub exit_code: i32,
    /// Wall-clock time spent inside the engine call.
    pub duration_ms: u64,
}

/// An execution engine for one language family.
///
/// Implementations may take a language-dependent amount of wall-clock time;
/// the node measures elapsed duration but places no deadline on the call.
#[async_trait::async_trait]
pub trait Executor: Send + Sync {
    /// Engine label used in logs, e.g. "cpp-native".
    fn name(&self) -> &str;

    /// Run the decoded source, returning captured output and an exit code.
    async fn execute(&self, source: &[u8]) -> (String, i32);
}

/// Registry mapping language identifiers to engines.
///
/// Lookup never fails: identifiers without a registered engine resolve to
/// the fallback, which acknowledges the request generically.
pub struct EngineRegistry {
    engines: HashMap<String, Arc<dyn Executor>>,
    fallback: Arc<dyn Executor>,
}

impl EngineRegistry {
    /// Create a registry with the given fallback engine.
    pub fn new(fallback: Arc<dyn Executor>) -> Self {
        EngineRegistry {
            engines: HashMap::new(),
            fallback,
        }
    }

    /// Create a registry with the stock native engines registered.
    pub fn with_default_engines() -> Self {
        let mut registry = EngineRegistry::new(Arc::new(GenericEngine));
        registry.register("cpp", Arc::new(CppEngine));
        registry.register("rust", Arc::new(RustEngine));
        registry
    }

    /// Register an engine for a language identifier.
    pub fn register(&mut self, language: &str, engine: Arc<dyn Executor>) {
        self.engines.insert(language.to_string(), engine);
    }

    /// Resolve the engine for a language, falling back for unknown tags.
    pub fn lookup(&self, language: &str) -> &Arc<dyn Executor> {
        self.engines.get(language).unwrap_or(&self.fallback)
    }

    /// Execute source through the engine for `language`, measuring the
    /// elapsed wall-clock duration around the call.
    pub async fn run(&self, language: &str, source: &[u8]) -> ExecutionOutcome {
        let engine = self.lookup(language);
        debug!(language, engine = engine.name(), source_bytes = source.len(), "Dispatching");

        let start = Instant::now();
        let (stdout_text, exit_code) = engine.execute(source).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        ExecutionOutcome {
            language: language.to_string(),
            stdout_text,
            exit_code,
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_registered_engine() {
        let registry = EngineRegistry::with_default_engines();
        assert_eq!(registry.lookup("cpp").name(), "cpp-native");
        assert_eq!(registry.lookup("rust").name(), "rust-native");
    }

    #[test]
    fn test_lookup_falls_back_for_unknown_language() {
        let registry = EngineRegistry::with_default_engines();
        assert_eq!(registry.lookup("unknown_lang").name(), "generic");
        assert_eq!(registry.lookup("").name(), "generic");
    }

    #[tokio::test]
    async fn test_run_unknown_language_still_succeeds() {
        let registry = EngineRegistry::with_default_engines();
        let outcome = registry.run("unknown_lang", b"whatever").await;

        assert_eq!(outcome.language, "unknown_lang");
        assert_eq!(outcome.exit_code, 0);
        assert!(!outcome.stdout_text.is_empty());
    }

    #[tokio::test]
    async fn test_run_measures_duration() {
        let registry = EngineRegistry::with_default_engines();
        let outcome = registry.run("cpp", b"int main() {}").await;

        // The stub engines simulate a 150ms execution window.
        assert!(outcome.duration_ms >= 100);
        assert!(outcome.duration_ms < 5_000);
    }
}
