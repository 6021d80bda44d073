//! Rollcall Reasoning Library
//!
//! Clients for the external text-inference services the link reconstructor
//! relies on. Each provider implements [`ReasoningService`]; callers treat the
//! returned text as untrusted and validate it themselves.

#[cfg(feature = "provider-anthropic")]
pub mod anthropic;
pub mod factory;
#[cfg(feature = "provider-gemini")]
pub mod gemini;
pub mod service;

#[cfg(feature = "provider-anthropic")]
pub use anthropic::AnthropicClient;
pub use factory::create_reasoning_service;
#[cfg(feature = "provider-gemini")]
pub use gemini::GeminiClient;
pub use service::ReasoningService;
