pub mod claude;
pub mod ollama;
