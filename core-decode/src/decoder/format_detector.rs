//! # Format Detection Module
//!
//! Maps codec library codec identifiers onto the supported source codec set
//! and describes each codec's native decoded sample format.

use serde::{Deserialize, Serialize};
use symphonia::core::codecs::{
    CodecType, CODEC_TYPE_ADPCM_IMA_WAV, CODEC_TYPE_MP3, CODEC_TYPE_PCM_S16LE, CODEC_TYPE_PCM_U8,
};
use symphonia::core::sample::SampleFormat;
use tracing::{debug, trace};

/// Source codecs the decoder accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCodec {
    /// PCM, 16-bit signed little-endian
    Pcm16,
    /// PCM, 8-bit unsigned
    Pcm8,
    /// IMA-ADPCM, WAV block layout
    ImaAdpcm,
    /// MPEG-1/2 Audio Layer III
    Mp3,
}

impl SourceCodec {
    /// Returns `true` for either PCM variant.
    pub fn is_pcm(&self) -> bool {
        matches!(self, SourceCodec::Pcm16 | SourceCodec::Pcm8)
    }

    /// Whether this build carries a decoder for the codec.
    ///
    /// PCM is always built in; the compressed codecs follow the
    /// `decoder-adpcm` and `decoder-mp3` features.
    pub fn is_available(&self) -> bool {
        match self {
            SourceCodec::Pcm16 | SourceCodec::Pcm8 => true,
            SourceCodec::ImaAdpcm => cfg!(feature = "decoder-adpcm"),
            SourceCodec::Mp3 => cfg!(feature = "decoder-mp3"),
        }
    }

    /// Sample format the codec produces when decoding.
    pub fn native_sample_format(&self) -> SampleFormat {
        match self {
            SourceCodec::Pcm16 | SourceCodec::ImaAdpcm => SampleFormat::S16,
            SourceCodec::Pcm8 => SampleFormat::U8,
            SourceCodec::Mp3 => SampleFormat::F32,
        }
    }
}

/// Every source codec this build can decode.
pub fn available_codecs() -> Vec<SourceCodec> {
    [
        SourceCodec::Pcm16,
        SourceCodec::Pcm8,
        SourceCodec::ImaAdpcm,
        SourceCodec::Mp3,
    ]
    .into_iter()
    .filter(SourceCodec::is_available)
    .collect()
}

/// Format detector for container tracks.
pub struct FormatDetector;

impl FormatDetector {
    /// Detect a supported codec from a codec library codec type.
    ///
    /// Returns `None` for any codec outside the supported set or compiled
    /// out of this build; such tracks are skipped during track selection.
    pub fn detect_codec(codec_type: CodecType) -> Option<SourceCodec> {
        let codec = if codec_type == CODEC_TYPE_PCM_S16LE {
            Some(SourceCodec::Pcm16)
        } else if codec_type == CODEC_TYPE_PCM_U8 {
            Some(SourceCodec::Pcm8)
        } else if codec_type == CODEC_TYPE_ADPCM_IMA_WAV {
            Some(SourceCodec::ImaAdpcm)
        } else if codec_type == CODEC_TYPE_MP3 {
            Some(SourceCodec::Mp3)
        } else {
            None
        };

        match codec {
            Some(codec) if codec.is_available() => {
                trace!("Codec {:?} maps to {:?}", codec_type, codec);
                Some(codec)
            }
            Some(codec) => {
                debug!("{:?} decoder is not built in, track will be skipped", codec);
                None
            }
            None => {
                debug!("Codec {:?} is not supported, track will be skipped", codec_type);
                None
            }
        }
    }

    /// Whether decoded frames of `codec` need conversion to 16-bit output.
    ///
    /// The track's declared sample format wins over the codec default when
    /// the container reports one.
    pub fn needs_conversion(codec: SourceCodec, declared: Option<SampleFormat>) -> bool {
        let source = declared.unwrap_or_else(|| codec.native_sample_format());
        !matches!(source, SampleFormat::S16)
    }
}
