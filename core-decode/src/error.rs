//! # Decoder Error Types
//!
//! Error types for the streaming decode engine. Codec library error codes never
//! cross the public surface: adapters translate them into these variants, and
//! the state machine collapses mid-stream failures into its `Failed` state.

use thiserror::Error;

/// Errors that can occur while opening, seeking or driving a decoder.
#[derive(Error, Debug)]
pub enum DecoderError {
    // ========================================================================
    // Open Errors
    // ========================================================================
    /// The calling thread never ran [`init_current_thread`](crate::init_current_thread).
    #[error("Decoder runtime not initialized on this thread")]
    NotInitialized,

    /// The bound stream is not open, readable or seekable.
    #[error("Stream unusable: {0}")]
    StreamUnusable(String),

    /// The container could not be recognized or parsed.
    #[error("Unsupported or invalid container: {0}")]
    InvalidFormat(String),

    /// No track in the container carries a supported codec.
    #[error("No supported audio track")]
    NoSupportedTrack,

    /// The codec context could not be created.
    #[error("Failed to open codec: {0}")]
    CodecOpen(String),

    /// The sample format converter could not be set up.
    #[error("Failed to initialize sample converter: {0}")]
    ConverterInit(String),

    // ========================================================================
    // Misuse Errors
    // ========================================================================
    /// Operation requires an open decoder.
    #[error("Decoder is not open")]
    NotOpen,

    /// Requested sample offset is outside `0..total`.
    #[error("Sample offset {offset} out of range (total {total})")]
    PositionOutOfRange { offset: u64, total: u64 },

    // ========================================================================
    // Stream Errors
    // ========================================================================
    /// The container could not be repositioned.
    #[error("Seek failed: {0}")]
    SeekFailed(String),

    /// Demuxing or decoding failed mid-stream.
    #[error("Decoding failed: {0}")]
    DecodeFailed(String),

    /// Sample format conversion failed mid-stream.
    #[error("Sample conversion failed: {0}")]
    ConversionFailed(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Invalid decoder configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Runtime infrastructure error.
    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),
}

impl DecoderError {
    /// Returns `true` if this error was raised by `open()`.
    pub fn is_open_failure(&self) -> bool {
        matches!(
            self,
            DecoderError::NotInitialized
                | DecoderError::StreamUnusable(_)
                | DecoderError::InvalidFormat(_)
                | DecoderError::NoSupportedTrack
                | DecoderError::CodecOpen(_)
                | DecoderError::ConverterInit(_)
        )
    }

    /// Returns `true` if this error reports caller misuse rather than a
    /// problem with the stream. Misuse never changes decoder state.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            DecoderError::NotOpen | DecoderError::PositionOutOfRange { .. }
        )
    }
}

/// Result type for decoder operations.
pub type Result<T> = std::result::Result<T, DecoderError>;
