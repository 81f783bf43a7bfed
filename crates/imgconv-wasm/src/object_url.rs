//! Blob object URLs as tracked resources.
//!
//! Every URL handed to JavaScript is registered in a [`ResourceRegistry`], so
//! clearing the converter or dropping it revokes whatever is still live.

use imgconv_core::Resource;
use js_sys::{Array, Uint8Array};
use wasm_bindgen::prelude::*;
use web_sys::{Blob, BlobPropertyBag, Url};

/// A `blob:` URL created with `URL.createObjectURL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectUrl {
    url: String,
}

impl ObjectUrl {
    /// Wrap `bytes` in a typed `Blob` and create a URL for it.
    pub fn create(bytes: &[u8], mime_type: &str) -> Result<Self, JsValue> {
        let parts = Array::new();
        parts.push(&Uint8Array::from(bytes));

        let options = BlobPropertyBag::new();
        options.set_type(mime_type);

        let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;
        let url = Url::create_object_url_with_blob(&blob)?;
        Ok(Self { url })
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl Resource for ObjectUrl {
    fn release(self) {
        #[cfg(target_arch = "wasm32")]
        {
            if let Err(err) = Url::revoke_object_url(&self.url) {
                log::warn!("failed to revoke {}: {:?}", self.url, err);
                return;
            }
        }
        log::trace!("revoked {}", self.url);
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use imgconv_core::{ReleaseStatus, ResourceRegistry};
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_create_blob_url() {
        let url = ObjectUrl::create(&[0xFF, 0xD8, 0xFF, 0xD9], "image/jpeg").unwrap();
        assert!(url.as_str().starts_with("blob:"));
        url.release();
    }

    #[wasm_bindgen_test]
    fn test_registry_revokes_once() {
        let registry = ResourceRegistry::new();
        let handle = registry.register(ObjectUrl::create(b"GIF89a", "image/gif").unwrap());

        assert_eq!(registry.release(handle), ReleaseStatus::Released);
        assert_eq!(registry.release(handle), ReleaseStatus::NotRegistered);
        assert_eq!(registry.released_count(), 1);
    }
}
