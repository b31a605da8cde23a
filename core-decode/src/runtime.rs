//! # Decoder Runtime Initialization
//!
//! The codec library needs its container and codec registries built, and its
//! log output routed, before any decoder opens. [`init_current_thread`] does
//! both and marks the calling thread as ready. There is no lazy fallback:
//! opening a decoder on a thread that skipped initialization fails.

use crate::error::{DecoderError, Result};
use core_runtime::logging::{init_logging, LoggingConfig};
use std::cell::Cell;
use std::sync::OnceLock;
use symphonia::core::codecs::CodecRegistry;
use symphonia::core::probe::Probe;
use tracing::{debug, info};

/// Container and codec registries shared by every decoder in the process.
pub(crate) struct Registries {
    pub(crate) probe: Probe,
    pub(crate) codecs: CodecRegistry,
}

static REGISTRIES: OnceLock<Registries> = OnceLock::new();

thread_local! {
    static THREAD_READY: Cell<bool> = const { Cell::new(false) };
}

fn build_registries() -> Registries {
    let mut probe = Probe::default();
    probe.register_all::<symphonia::default::formats::WavReader>();
    #[cfg(feature = "decoder-mp3")]
    probe.register_all::<symphonia::default::formats::MpaReader>();

    let mut codecs = CodecRegistry::new();
    codecs.register_all::<symphonia::default::codecs::PcmDecoder>();
    #[cfg(feature = "decoder-adpcm")]
    codecs.register_all::<symphonia::default::codecs::AdpcmDecoder>();
    #[cfg(feature = "decoder-mp3")]
    codecs.register_all::<symphonia::default::codecs::MpaDecoder>();

    info!("Registered decoder containers and codecs");
    Registries { probe, codecs }
}

/// Prepare the calling thread for decoding.
///
/// Installs logging with the codec library verbosity from `logging` (an
/// already installed subscriber is kept), builds the process-wide registries
/// on first use, and marks this thread as initialized. Calling it again on the
/// same thread is harmless.
///
/// # Errors
///
/// Returns an error if the logging filter in `logging` is invalid.
pub fn init_current_thread(logging: &LoggingConfig) -> Result<()> {
    match init_logging(logging.clone()) {
        Ok(()) => {}
        Err(core_runtime::Error::AlreadyInitialized(reason)) => {
            debug!("Logging already installed: {}", reason);
        }
        Err(e) => return Err(DecoderError::from(e)),
    }

    REGISTRIES.get_or_init(build_registries);
    THREAD_READY.with(|ready| ready.set(true));

    debug!("Decoder runtime initialized for current thread");
    Ok(())
}

/// Whether [`init_current_thread`] has run on the calling thread.
pub fn is_thread_initialized() -> bool {
    THREAD_READY.with(|ready| ready.get())
}

/// Registries for the calling thread, if it has been initialized.
pub(crate) fn registries() -> Result<&'static Registries> {
    if !is_thread_initialized() {
        return Err(DecoderError::NotInitialized);
    }

    REGISTRIES.get().ok_or(DecoderError::NotInitialized)
}
