//! External AI collaborator: the backend trait, an OpenAI-compatible HTTP
//! implementation, and the retrying transport wrapped around it.

pub mod http_client;
pub mod openai;
pub mod reliable;
pub mod scrub;
pub mod traits;

pub use openai::{BackendSettings, OpenAiBackend};
pub use reliable::{RetryPolicy, RetryingTransport};
pub use scrub::{sanitize_api_error, scrub_secret_patterns};
pub use traits::{AiBackend, AudioClip, BackendFuture};
