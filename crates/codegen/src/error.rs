/// Errors that abort artifact generation. Locator misses are not among
/// them: those become warning markers in the emitted text.
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// A qualified subject points at a file missing from the parsed sources.
    #[error("subject '{subject}' refers to unknown source file '{file}'")]
    MissingSource { subject: String, file: String },
}
