mod common;

use common::{artifacts, body_text, client_for, png, solid_image};
use image_gen_rmcp::{GenerationMode, GenerationRequest, Studio, models::UpscaleTarget};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RED_FOX_ENHANCED: &str = "a red fox, ultra-realistic, high-definition, professional photography, sharp details, high quality, detailed, professional, sharp focus";

#[tokio::test]
async fn photorealistic_fox_end_to_end() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2beta/stable-image/generate/core"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(png(4, 4), "image/png"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let studio = Studio::new(client_for(&mock_server));
    let request = GenerationRequest::builder("a red fox")
        .style("Photorealistic")
        .sample_count(1)
        .build()
        .unwrap();
    let result = studio.generate(request).await.unwrap();

    assert_eq!(result.enhanced_prompt, RED_FOX_ENHANCED);
    assert_eq!(result.images.len(), 1);
    assert_eq!(result.mode, GenerationMode::Generate);

    let received = mock_server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(body_text(&received[0]).contains(RED_FOX_ENHANCED));

    let snapshot = studio.snapshot().await;
    assert_eq!(snapshot.history.len(), 1);
    assert_eq!(snapshot.history[0].prompt, "a red fox");
    assert_eq!(snapshot.history[0].style, "Photorealistic");
    assert_eq!(snapshot.history[0].image_count, 1);
    assert!((snapshot.total_cost - 0.04).abs() < 1e-9);
}

#[tokio::test]
async fn rate_limited_call_leaves_history_untouched() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&mock_server)
        .await;

    let studio = Studio::new(client_for(&mock_server));
    let request = GenerationRequest::builder("a red fox")
        .style("Photorealistic")
        .build()
        .unwrap();
    let err = studio.generate(request).await.unwrap_err();

    assert!(err.to_string().contains("rate limited"));
    let snapshot = studio.snapshot().await;
    assert!(snapshot.history.is_empty());
    assert_eq!(snapshot.total_cost, 0.0);
}

#[tokio::test]
async fn partial_batch_records_only_successful_images() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(artifacts(&[2])))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&mock_server)
        .await;

    let client = image_gen_rmcp::StabilityClient::new(
        common::config_for(&mock_server).with_max_concurrency(1),
    )
    .unwrap();
    let studio = Studio::new(client);
    let request = GenerationRequest::builder("a fox")
        .size(512, 512)
        .sample_count(3)
        .build()
        .unwrap();
    let result = studio.generate(request).await.unwrap();

    assert_eq!(result.images.len(), 2);
    assert_eq!(result.failures.len(), 1);
    let snapshot = studio.snapshot().await;
    assert_eq!(snapshot.history[0].image_count, 2);
    assert!((snapshot.total_cost - 0.08).abs() < 1e-9);
}

#[tokio::test]
async fn every_mode_lands_in_history_newest_first() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/generation/stable-diffusion-xl-1024-v1-0/image-to-image"))
        .respond_with(ResponseTemplate::new(200).set_body_json(artifacts(&[3])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/generation/esrgan-v1-x2plus/image-to-image/upscale"))
        .respond_with(ResponseTemplate::new(200).set_body_json(artifacts(&[9])))
        .mount(&mock_server)
        .await;

    let studio = Studio::new(client_for(&mock_server));
    let source = solid_image(8, 8);

    let transform = GenerationRequest::builder("make it autumn")
        .strength(0.5)
        .quality_boost(false)
        .build()
        .unwrap();
    let transformed = studio.transform(transform, &source).await.unwrap();
    assert_eq!(transformed.enhanced_prompt, "make it autumn");

    let upscaled = studio.upscale(&source, UpscaleTarget::Native).await.unwrap();
    assert_eq!(upscaled.images.len(), 1);
    assert_eq!(upscaled.mode, GenerationMode::Upscale);

    let snapshot = studio.snapshot().await;
    let modes: Vec<GenerationMode> = snapshot.history.iter().map(|entry| entry.mode).collect();
    assert_eq!(modes, vec![GenerationMode::Upscale, GenerationMode::Transform]);
}
