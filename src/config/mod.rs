pub mod evaluation;

pub use evaluation::{AppConfig, EvaluationConfig, ServerConfig};
