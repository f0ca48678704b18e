//! Client library for the slide-deck generation provider.
//!
//! [`provider::GenerationProvider`] is the seam the job pipeline talks to;
//! [`api::GammaApi`] implements it over HTTP and
//! [`scripted::ScriptedProvider`] replays canned responses for tests.

pub mod api;
pub mod provider;
pub mod scripted;

pub use api::{GammaApi, GammaConfig};
pub use provider::{
    GammaError, GenerationMode, GenerationProvider, GenerationRequest, GenerationSnapshot,
};
pub use scripted::{ScriptedProvider, ScriptedStatus};
