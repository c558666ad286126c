mod openai;
mod registry;

pub use openai::{
    OpenAICompatibleBackend, DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL,
    DEFAULT_SAMBANOVA_BASE_URL, DEFAULT_SAMBANOVA_MODEL,
};
pub use registry::{create_backend, BackendKind, BackendSettings, BACKEND_ENV};
