//! # Audio Decoder Module
//!
//! Pull-based streaming decoder built on the Symphonia library.
//!
//! ## Supported Formats
//!
//! | Container | Codec | Feature Flag |
//! |-----------|-------|--------------|
//! | WAV | PCM 16-bit signed LE | always |
//! | WAV | PCM 8-bit unsigned | always |
//! | WAV | IMA-ADPCM | `decoder-adpcm` |
//! | MP3 | MPEG-1/2 Audio Layer III | `decoder-mp3` |
//!
//! ## Architecture
//!
//! ```text
//! AudioStream → StreamSource → FormatReader → Decoder → SampleConverter → caller buffer
//! ```
//!
//! 1. **StreamSource**: adapts a shared [`AudioStream`](crate::stream::AudioStream)
//!    to Symphonia's `MediaSource`
//! 2. **SymphoniaContainer**: demuxes the selected track and feeds its codec
//! 3. **Session**: the resumable decode state machine
//! 4. **StreamDecoder**: the public facade
//!
//! Output is always interleaved 16-bit little-endian PCM at the source sample
//! rate and channel count.
//!
//! ## Threading Model
//!
//! A decoder is `Send` and may move between threads between calls, but the
//! thread that opens it must have run
//! [`init_current_thread`](crate::runtime::init_current_thread).

mod format_detector;
mod machine;
mod sample_converter;
mod stream_decoder;
mod symphonia;

pub use format_detector::{available_codecs, FormatDetector, SourceCodec};
pub use machine::DecodeState;
pub use sample_converter::{interleave_s16le, SampleConverter, OUTPUT_BYTES_PER_SAMPLE};
pub use stream_decoder::StreamDecoder;
