/// Errors raised by the front end.
///
/// The `Display` strings of the request-time variants are the status messages
/// shown to the user.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to acquire {name}: {reason}")]
    AssetAcquisition { name: String, reason: String },
    #[error("Error initializing Kokoro TTS: {0}")]
    EngineInit(String),
    #[error("Please enter some text to generate speech.")]
    EmptyInput,
    #[error("Error generating speech: {0}")]
    Synthesis(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
}
