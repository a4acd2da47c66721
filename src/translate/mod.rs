//! Translation between the caller-facing OpenAI shapes and the GLM API.
//!
//! All translation functions are pure (no I/O).

pub mod glm_types;
pub mod openai_types;
pub mod request;
pub mod response;

pub use request::to_upstream;
pub use response::{passthrough, rebuild};
