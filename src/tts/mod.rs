//! Text-to-speech module backed by Google Cloud Text-to-Speech.
//!
//! Provides the synthesis gateway, its service-account token source and the REST backend.

mod credentials;
mod gateway;
mod google;

pub use credentials::{ServiceAccount, ServiceAccountKey};
pub use gateway::{Gateway, Synthesize};
pub use google::GoogleTts;
