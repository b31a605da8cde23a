//! Workspace facade crate.
//!
//! This crate exposes feature flags that map onto the individual workspace
//! crates (`core-runtime`, `core-decode`). Host engines can depend on
//! `sound-core-workspace` and enable the documented features without wiring
//! each crate individually.
//!
//! - `decode`: PCM decoding through `core-decode`
//! - `decode-mp3`: adds the MP3 decoder
//! - `decode-adpcm`: adds the IMA-ADPCM decoder

pub use core_runtime as runtime;

#[cfg(feature = "decode")]
pub use core_decode as decode;
