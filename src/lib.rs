pub mod error;
pub mod gemini;
pub mod narration;
pub mod playback;
pub mod prompt;
pub mod settings;
pub mod stream;
pub mod summarizer;
pub mod transcript;
pub mod video;

pub use error::Error;
