//! WebAssembly bindings for jp2-bridge.
//!
//! Exposes the codec-independent parts (signature detection and encoder planning)
//! to JavaScript via wasm-bindgen.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Container name for `data` ("jp2" or "j2k"), or an empty string when unrecognized.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn detect_format(data: &[u8]) -> String {
    crate::signature::classify(data)
        .container_kind()
        .map(|kind| kind.format_name().to_string())
        .unwrap_or_default()
}

/// The ten layer rates an encoder would use at `quality` (1..=100).
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn compression_rates(quality: i32) -> Vec<f64> {
    let quality = crate::quality::Quality::new(quality);
    crate::quality::CompressionRateLadder::from_quality(quality)
        .rates()
        .to_vec()
}

/// Resolution levels an encoder would use for a `width` x `height` image.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn resolution_levels(width: u32, height: u32) -> Result<u32, JsValue> {
    if width == 0 || height == 0 {
        return Err(JsValue::from_str(
            &crate::error::Jp2Error::InvalidDimensions { width, height }.to_string(),
        ));
    }
    Ok(crate::quality::resolution_levels(width.max(height)))
}
