//! Image encoding: `UploadedImage` → base64 `EncodedImagePart`.
//!
//! Gemini accepts images inline as `{mimeType, data}` where `data` is bare
//! base64, without the `data:<mime>;base64,` header a data URI would carry.
//! The bytes are forwarded untouched; no re-compression or resizing happens.
//! A data-URI header is removed when the input is resolved
//! ([`crate::pipeline::input::split_data_uri`]), so this stage never sees one.

use crate::error::SolverError;
use crate::pipeline::input::UploadedImage;
use crate::progress::ProgressCallback;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Transport representation of one image. Serialises as Gemini `inlineData`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedImagePart {
    pub mime_type: String,
    /// Bare base64 payload.
    pub data: String,
}

/// Encode one image.
///
/// Fails with [`SolverError::ReadFailed`] when the image carries no bytes:
/// an empty payload can never produce a usable part.
pub fn encode_image(image: &UploadedImage) -> Result<EncodedImagePart, SolverError> {
    if image.bytes.is_empty() {
        return Err(SolverError::ReadFailed {
            name: image.name.clone(),
            reason: "image contains no data".into(),
        });
    }

    let data = STANDARD.encode(&image.bytes);
    debug!(
        "Encoded {} ({}) → {} bytes base64",
        image.name,
        image.media_type,
        data.len()
    );

    Ok(EncodedImagePart {
        mime_type: image.media_type.clone(),
        data,
    })
}

/// Encode every image concurrently on the blocking pool.
///
/// All encodings run independently; the call returns once every one has
/// finished. The output order matches `images`, which keeps the page order
/// the model sees identical to the user's selection.
pub async fn encode_all(
    images: Vec<UploadedImage>,
    progress: Option<&ProgressCallback>,
) -> Result<Vec<EncodedImagePart>, SolverError> {
    let total = images.len();
    let tasks = images.into_iter().enumerate().map(|(index, image)| {
        let progress = progress.cloned();
        async move {
            let part = tokio::task::spawn_blocking(move || encode_image(&image))
                .await
                .map_err(|e| SolverError::Internal(format!("Encode task panicked: {e}")))??;
            if let Some(cb) = progress {
                cb.on_image_encoded(index, total, part.data.len());
            }
            Ok::<_, SolverError>(part)
        }
    });
    try_join_all(tasks).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([255, 0, 0, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .expect("png encode");
        buf
    }

    #[test]
    fn encode_small_image() {
        let bytes = png_bytes(10, 10);
        let img = UploadedImage::new("page.png", "image/png", bytes.clone());
        let part = encode_image(&img).expect("encode should succeed");
        assert_eq!(part.mime_type, "image/png");
        assert!(!part.data.is_empty());
        assert!(!part.data.starts_with("data:"));
        let decoded = STANDARD.decode(&part.data).expect("valid base64");
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn declared_type_is_kept_verbatim() {
        let img = UploadedImage::new("scan", "image/heic", vec![1, 2, 3]);
        assert_eq!(encode_image(&img).unwrap().mime_type, "image/heic");
    }

    #[test]
    fn empty_image_fails_instead_of_yielding_empty_part() {
        let img = UploadedImage::new("blank.png", "image/png", Vec::new());
        let err = encode_image(&img).unwrap_err();
        assert!(matches!(err, SolverError::ReadFailed { ref name, .. } if name == "blank.png"));
    }

    #[test]
    fn payload_is_bare_base64_of_bytes() {
        let img = UploadedImage::new("abc.bin", "application/octet-stream", b"ABC".to_vec());
        assert_eq!(encode_image(&img).unwrap().data, "QUJD");
    }

    #[test]
    fn inline_data_wire_shape() {
        let part = EncodedImagePart {
            mime_type: "image/jpeg".into(),
            data: "QUJD".into(),
        };
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json, serde_json::json!({"mimeType": "image/jpeg", "data": "QUJD"}));
    }

    #[tokio::test]
    async fn encode_all_preserves_selection_order() {
        let images = vec![
            UploadedImage::new("big.png", "image/png", png_bytes(200, 200)),
            UploadedImage::new("one.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF]),
            UploadedImage::new("small.png", "image/png", png_bytes(2, 2)),
        ];
        let expected: Vec<String> = images.iter().map(|i| STANDARD.encode(&i.bytes)).collect();

        let parts = encode_all(images, None).await.unwrap();
        assert_eq!(parts.len(), 3);
        let types: Vec<&str> = parts.iter().map(|p| p.mime_type.as_str()).collect();
        assert_eq!(types, vec!["image/png", "image/jpeg", "image/png"]);
        for (part, want) in parts.iter().zip(&expected) {
            assert_eq!(&part.data, want);
        }
    }

    #[tokio::test]
    async fn encode_all_fails_on_any_empty_image() {
        let images = vec![
            UploadedImage::new("ok.png", "image/png", png_bytes(2, 2)),
            UploadedImage::new("empty.png", "image/png", Vec::new()),
        ];
        let err = encode_all(images, None).await.unwrap_err();
        assert!(matches!(err, SolverError::ReadFailed { .. }));
    }
}
