//! Delimited gaze-recording input
//!
//! This module turns raw file text into field-keyed records. It knows nothing
//! about gaze semantics; the normalizer decides what a record means.

mod decoder;
mod raw_record;

pub use decoder::*;
pub use raw_record::*;
