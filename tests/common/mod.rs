#![allow(dead_code)]

use base64::Engine;
use image::{DynamicImage, Rgb, RgbImage};
use image_gen_rmcp::{DecodePolicy, StabilityClient, StabilityConfig, image_processing};
use serde_json::{Value, json};
use wiremock::MockServer;

pub const API_KEY: &str = "test-key";

pub fn solid_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([30, 60, 90])))
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    image_processing::encode_png(&solid_image(width, height)).unwrap()
}

pub fn artifacts(widths: &[u32]) -> Value {
    let artifacts: Vec<Value> = widths
        .iter()
        .map(|&width| {
            json!({
                "base64": base64::engine::general_purpose::STANDARD.encode(png(width, 1)),
                "seed": width,
                "finishReason": "SUCCESS",
            })
        })
        .collect();
    json!({ "artifacts": artifacts })
}

pub fn config_for(server: &MockServer) -> StabilityConfig {
    StabilityConfig::default()
        .with_api_key(API_KEY)
        .with_api_host(server.uri())
        .with_decode_policy(DecodePolicy::Lenient)
        .with_max_concurrency(4)
}

pub fn client_for(server: &MockServer) -> StabilityClient {
    StabilityClient::new(config_for(server)).unwrap()
}

pub fn body_text(request: &wiremock::Request) -> String {
    String::from_utf8_lossy(&request.body).to_string()
}
