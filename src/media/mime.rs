//! Content type sniffing for product images.

/// Sent for anything not recognised; the media host decides whether to accept it.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// `(offset, magic, content type)` for the formats the media host accepts.
const SIGNATURES: &[(usize, &[u8], &str)] = &[
    (0, b"\xFF\xD8\xFF", "image/jpeg"),
    (0, b"\x89PNG\r\n\x1A\n", "image/png"),
    (0, b"GIF87a", "image/gif"),
    (0, b"GIF89a", "image/gif"),
    (8, b"WEBP", "image/webp"),
    (0, b"BM", "image/bmp"),
];

fn matches(bytes: &[u8], offset: usize, magic: &[u8]) -> bool {
    bytes.get(offset..offset + magic.len()) == Some(magic)
}

/// Content type of a product image, judged by its leading bytes.
pub fn detect_image_mime(bytes: &[u8]) -> &'static str {
    let found = SIGNATURES
        .iter()
        .find(|(offset, magic, _)| {
            matches(bytes, *offset, magic) && (*offset == 0 || matches(bytes, 0, b"RIFF"))
        })
        .map(|(_, _, content_type)| *content_type);

    found.unwrap_or_else(|| {
        tracing::debug!(
            "Could not identify product image type from {} bytes, sending as {}",
            bytes.len(),
            OCTET_STREAM
        );
        OCTET_STREAM
    })
}
