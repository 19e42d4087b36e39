pub mod hash;
pub mod metadata;
pub mod storage;

pub use hash::compute_hash;
pub use metadata::ResultSetMetadata;
pub use storage::LocalFileStorage;

pub fn get_extension_from_mime_type(mime_type: &str) -> &str {
    match mime_type.to_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        _ => "bin",
    }
}
