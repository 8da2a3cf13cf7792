//! Provider orchestration for the lamla AI gateway.
//!
//! The crate is layered bottom-up:
//!
//! - **Connection**: one lazily built, pooled HTTP client with tiered timeouts
//! - **Providers**: one adapter per upstream API, translating a prompt into
//!   that provider's wire format and classifying the raw outcome
//! - **Normalizer**: per-provider unwrap rules plus JSON recovery from prose
//! - **Orchestrator**: first-success-wins fallback across the provider order,
//!   with a full attempt log on failure

pub mod config;
pub mod connection;
pub mod error;
pub mod normalize;
pub mod orchestrator;
pub mod outcome;
pub mod provider;
pub mod registry;

pub use config::{
    AzureSettings, DeepSeekSettings, GeminiSettings, HuggingFaceSettings, OrchestratorConfig,
    PoolConfig, ProviderSettings,
};
pub use connection::{ConnectionManager, HttpReply, PooledClient};
pub use error::{ConnectionError, GenerateError};
pub use normalize::{NormalizedResult, Normalizer, UnwrapRule, extract_json_substring, parse_text};
pub use orchestrator::{Generation, GenerationRequest, Orchestrator};
pub use outcome::{AttemptRecord, AttemptStatus, Payload, RawOutcome};
pub use provider::{AzureOpenAi, DeepSeek, Gemini, HuggingFace, ProviderAdapter};
pub use registry::ProviderRegistry;
