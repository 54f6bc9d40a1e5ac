//! Runtime state - one record per physical control
//!
//! Runtime state is created from a resolved `ButtonConfig` at boot or reload
//! and is discarded wholesale on the next reload. Nothing here is shared
//! between buttons.

mod button;

pub use button::{ButtonRuntimeState, FLASH_TICKS};
