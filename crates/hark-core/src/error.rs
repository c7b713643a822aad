use thiserror::Error;

/// Errors raised by record property lookup and interpretation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("utterance \"{rel_wav_path}\" has no property \"{name}\"")]
    MissingProperty { rel_wav_path: String, name: String },

    #[error("utterance \"{rel_wav_path}\" has non-numeric word distance \"{value}\"")]
    BadWordDist { rel_wav_path: String, value: String },
}
