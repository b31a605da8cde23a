//! # Streaming Decode Engine
//!
//! Decodes compressed or raw audio from a seekable byte stream into 16-bit
//! signed little-endian interleaved PCM, on demand and in caller-sized chunks.
//!
//! ## Overview
//!
//! This crate handles:
//! - Binding a seekable [`AudioStream`] and probing its container
//! - Selecting the first audio track with a supported codec
//! - Resumable decoding into buffers of any size
//! - Rewinding and sample-accurate repositioning
//! - Converting non-16-bit codec output to 16-bit PCM
//!
//! Before the first decoder opens on a thread, call [`init_current_thread`].

pub mod config;
pub mod decoder;
pub mod error;
pub mod runtime;
pub mod stream;

pub use config::DecoderConfig;
pub use decoder::{
    available_codecs, DecodeState, FormatDetector, SampleConverter, SourceCodec, StreamDecoder,
};
pub use error::{DecoderError, Result};
pub use runtime::{init_current_thread, is_thread_initialized};
pub use stream::{shared, AudioStream, FileStream, MemoryStream, SeekOrigin, SharedStream};
