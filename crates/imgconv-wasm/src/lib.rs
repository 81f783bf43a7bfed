//! Imgconv WASM - WebAssembly bindings for the batch converter
//!
//! This crate exposes imgconv-core to JavaScript/TypeScript applications.
//!
//! # Module Structure
//!
//! - `converter` - The `BatchConverter` class: submit, convert, download
//! - `object_url` - Blob object URLs tracked so they are always revoked
//! - `types` - JavaScript-facing views of artifacts and outcomes
//!
//! # Usage
//!
//! ```typescript
//! import init, { BatchConverter, format_file_size } from '@imgconv/wasm';
//!
//! await init();
//!
//! const converter = new BatchConverter({ max_decoded_pixels: 50_000_000 });
//! converter.submit_sources(names, types, contents);
//! const summary = converter.convert();
//! const saved = summary.totalOriginalBytes - summary.totalConvertedBytes;
//! console.log(`Saved ${format_file_size(saved)}`);
//! ```

use wasm_bindgen::prelude::*;

mod converter;
mod object_url;
mod types;

pub use converter::BatchConverter;
pub use types::JsArtifact;

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    log::debug!("imgconv-wasm {} loaded", env!("CARGO_PKG_VERSION"));
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Formats accepted by `BatchConverter.set_settings`, canonical names only.
#[wasm_bindgen]
pub fn supported_formats() -> Vec<String> {
    imgconv_core::Format::ALL
        .iter()
        .map(|format| format.name().to_string())
        .collect()
}

/// Human-readable byte size, e.g. `1.5 KB`.
#[wasm_bindgen]
pub fn format_file_size(bytes: f64) -> String {
    imgconv_core::format_file_size(bytes.max(0.0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_supported_formats() {
        assert_eq!(supported_formats(), vec!["jpeg", "png", "webp", "gif"]);
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(1536.0), "1.5 KB");
        assert_eq!(format_file_size(-3.0), "0 Bytes");
    }
}
