//! Hosted model integration for captioning and caption refinement.
//!
//! Provides provider abstractions over Replicate and OpenAI-compatible chat
//! APIs (OpenAI, Mistral), the captioning client, and the refinement client
//! with its retry policy.

pub(crate) mod captioner;
pub(crate) mod mistral;
pub(crate) mod openai;
pub(crate) mod provider;
pub(crate) mod refiner;
pub(crate) mod replicate;
pub(crate) mod retry;

pub use captioner::{CaptionOptions, Captioner};
pub use provider::{
    CaptionProvider, CaptionRequest, ChatProvider, ChatRequest, ImageInput, LlmResponse,
    ProviderFactory,
};
pub use refiner::{RefineOptions, RefineOutcome, Refiner, StyleDirective};
pub use retry::RetryPolicy;
