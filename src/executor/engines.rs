//! Stub execution engines.
//!
//! In deployment the toolchain integration lives behind these types; here
//! each engine returns a canned transcript after a simulated execution
//! window so timing behaves like the real thing.

use super::Executor;
use std::time::Duration;

/// Simulated execution window for the stub engines.
const SIMULATED_EXEC_MS: u64 = 150;

/// Native C++ engine (gcc toolchain in deployment).
pub struct CppEngine;

#[async_trait::async_trait]
impl Executor for CppEngine {
    fn name(&self) -> &str {
        "cpp-native"
    }

    async fn execute(&self, _source: &[u8]) -> (String, i32) {
        tokio::time::sleep(Duration::from_millis(SIMULATED_EXEC_MS)).await;
        (
            "Build: g++ -O3 -std=c++20 main.cpp -o app\nOutput: Hello from the native C++ engine!"
                .to_string(),
            0,
        )
    }
}

/// Native Rust engine (cargo toolchain in deployment).
pub struct RustEngine;

#[async_trait::async_trait]
impl Executor for RustEngine {
    fn name(&self) -> &str {
        "rust-native"
    }

    async fn execute(&self, _source: &[u8]) -> (String, i32) {
        tokio::time::sleep(Duration::from_millis(SIMULATED_EXEC_MS)).await;
        (
            "Compiling sandbox v0.1.0\nFinished dev [unoptimized + debuginfo] target(s) in 0.2s\nOutput: Hello from the Rust engine!"
                .to_string(),
            0,
        )
    }
}

/// Fallback engine for unrecognized language tags.
///
/// Acknowledges the request generically instead of rejecting it; unknown
/// languages degrade gracefully rather than dropping the connection.
pub struct GenericEngine;

#[async_trait::async_trait]
impl Executor for GenericEngine {
    fn name(&self) -> &str {
        "generic"
    }

    async fn execute(&self, _source: &[u8]) -> (String, i32) {
        tokio::time::sleep(Duration::from_millis(SIMULATED_EXEC_MS)).await;
        ("Execution successful.".to_string(), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cpp_engine_output() {
        let (stdout, exit_code) = CppEngine.execute(b"int main() {}").await;
        assert!(stdout.contains("g++"));
        assert_eq!(exit_code, 0);
    }

    #[tokio::test]
    async fn test_generic_engine_acknowledges() {
        let (stdout, exit_code) = GenericEngine.execute(b"").await;
        assert_eq!(stdout, "Execution successful.");
        assert_eq!(exit_code, 0);
    }
}
