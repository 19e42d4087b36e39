use anyhow::Result;
use serde::Serialize;

use crate::cache::{LocalFileStorage, ResultSetMetadata, compute_hash};
use crate::models::{GenerationMode, GenerationResult, RasterImage};

/// Download name for the `index`-th (0-based) image of a result of `total`.
pub fn output_file_name(mode: GenerationMode, index: usize, total: usize) -> String {
    let stem = match mode {
        GenerationMode::Generate => "generated",
        GenerationMode::Transform => "transformed",
        GenerationMode::Inpaint => "inpainted",
        GenerationMode::Upscale => "upscaled",
    };
    if mode == GenerationMode::Generate || total > 1 {
        format!("{stem}_{}.png", index + 1)
    } else {
        format!("{stem}.png")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishedImage {
    pub url: String,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// PNG bytes and download name of every image in a result.
pub fn encode_result(result: &GenerationResult) -> Result<Vec<(String, Vec<u8>)>> {
    let total = result.images.len();
    result
        .images
        .iter()
        .enumerate()
        .map(|(index, image)| {
            let file_name = output_file_name(result.mode, index, total);
            Ok((file_name, image.to_png()?))
        })
        .collect()
}

/// Stores the PNGs of a result under `results/<hash>/` and returns their URLs.
pub async fn publish_result(
    storage: &LocalFileStorage,
    result: &GenerationResult,
) -> Result<Vec<PublishedImage>> {
    let hash_source = format!(
        "{}:{}:{}",
        result.mode,
        result.created_at.timestamp_nanos_opt().unwrap_or_default(),
        result.enhanced_prompt
    );
    let prefix = LocalFileStorage::get_result_prefix(&compute_hash(&hash_source));

    let encoded = encode_result(result)?;
    let mut published = Vec::with_capacity(encoded.len());
    for ((file_name, png), image) in encoded.into_iter().zip(&result.images) {
        let key = format!("{prefix}/{file_name}");
        storage.put(&key, &png).await?;
        published.push(published_image(storage.get_public_url(&key), file_name, image));
    }

    let metadata = ResultSetMetadata {
        mode: result.mode.to_string(),
        prompt: result.request.prompt.clone(),
        enhanced_prompt: result.enhanced_prompt.clone(),
        style: result.request.style.clone(),
        files: published.iter().map(|image| image.file_name.clone()).collect(),
        failed_variants: result.failures.iter().map(|failure| failure.index).collect(),
        created_at: result.created_at.to_rfc3339(),
    };
    let meta_json = serde_json::to_vec_pretty(&metadata)?;
    storage
        .put(&LocalFileStorage::get_meta_key(&prefix), &meta_json)
        .await?;

    tracing::debug!(%prefix, count = published.len(), "published result set");
    Ok(published)
}

fn published_image(url: String, file_name: String, image: &RasterImage) -> PublishedImage {
    let (width, height) = image.dimensions();
    PublishedImage {
        url,
        file_name,
        width,
        height,
        seed: image.seed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use image::{DynamicImage, Rgb, RgbImage};

    use crate::models::GenerationRequest;

    fn result_with(mode: GenerationMode, count: usize) -> GenerationResult {
        let images = (0..count)
            .map(|n| {
                RasterImage::new(DynamicImage::ImageRgb8(RgbImage::from_pixel(
                    n as u32 + 1,
                    2,
                    Rgb([200, 10, 10]),
                )))
            })
            .collect();
        GenerationResult {
            mode,
            images,
            request: GenerationRequest::builder("a red fox").build().unwrap(),
            enhanced_prompt: "a red fox, high quality".to_string(),
            failures: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn file_names_follow_mode() {
        assert_eq!(output_file_name(GenerationMode::Generate, 0, 1), "generated_1.png");
        assert_eq!(output_file_name(GenerationMode::Generate, 2, 4), "generated_3.png");
        assert_eq!(output_file_name(GenerationMode::Transform, 0, 1), "transformed.png");
        assert_eq!(output_file_name(GenerationMode::Transform, 1, 2), "transformed_2.png");
        assert_eq!(output_file_name(GenerationMode::Inpaint, 0, 1), "inpainted.png");
        assert_eq!(output_file_name(GenerationMode::Upscale, 0, 1), "upscaled.png");
    }

    #[test]
    fn encoded_images_are_png() {
        let encoded = encode_result(&result_with(GenerationMode::Generate, 2)).unwrap();
        assert_eq!(encoded.len(), 2);
        assert!(encoded
            .iter()
            .all(|(_, png)| png.starts_with(&[0x89, b'P', b'N', b'G'])));
    }

    #[tokio::test]
    async fn publish_writes_images_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let storage =
            LocalFileStorage::new(dir.path().to_path_buf(), "http://localhost:3000/cache".into());
        let published = publish_result(&storage, &result_with(GenerationMode::Generate, 2))
            .await
            .unwrap();

        assert_eq!(published.len(), 2);
        assert_eq!(published[1].file_name, "generated_2.png");
        assert_eq!((published[1].width, published[1].height), (2, 2));
        assert!(published[0].url.starts_with("http://localhost:3000/cache/results/"));

        let key = published[0]
            .url
            .trim_start_matches("http://localhost:3000/cache/")
            .to_string();
        let meta_key = key.replace("generated_1.png", "meta.json");
        let meta = storage.get(&meta_key).await.unwrap().unwrap();
        let metadata: ResultSetMetadata = serde_json::from_slice(&meta).unwrap();
        assert_eq!(metadata.files, vec!["generated_1.png", "generated_2.png"]);
        assert_eq!(metadata.mode, "generate");
    }
}
