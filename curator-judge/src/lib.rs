//! Curator Judge
//!
//! LLM-backed article triage:
//! - **Backends**: OpenAI-compatible (OpenAI, OpenRouter) and Anthropic
//! - **Judge**: concurrent per-article judgments with retry on malformed
//!   output and fallback judgments on failure

pub mod backend;
pub mod judge;

pub use backend::*;
pub use judge::*;
