//! Image generation backend implementations
//!
//! - OpenAI Images API backend (HTTP)
//! - Mock backend (deterministic inline images, used by tests)

pub mod mock;
pub mod openai;
#[cfg(test)]
pub(crate) mod test_utils;

pub use self::mock::MockBackend;
pub use self::openai::OpenAiBackend;
