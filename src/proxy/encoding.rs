//! Content-Encoding decoding for upstream response bodies

use std::io::Read;

/// Decompress response body based on Content-Encoding header
pub fn decompress_body(body_bytes: &[u8], content_encoding: Option<&str>) -> Result<Vec<u8>, String> {
    let encoding = match content_encoding {
        Some(enc) => enc.trim(),
        None => return Ok(body_bytes.to_vec()),
    };

    match encoding.to_lowercase().as_str() {
        "" | "identity" => Ok(body_bytes.to_vec()),
        "gzip" | "x-gzip" => {
            use flate2::read::GzDecoder;
            let mut decoder = GzDecoder::new(body_bytes);
            let mut decompressed = Vec::new();
            decoder
                .read_to_end(&mut decompressed)
                .map_err(|e| format!("gzip decompression failed: {}", e))?;
            tracing::debug!(
                original_size = body_bytes.len(),
                decompressed_size = decompressed.len(),
                "Decompressed gzip response"
            );
            Ok(decompressed)
        }
        "deflate" => {
            use flate2::read::ZlibDecoder;
            let mut decoder = ZlibDecoder::new(body_bytes);
            let mut decompressed = Vec::new();
            decoder
                .read_to_end(&mut decompressed)
                .map_err(|e| format!("deflate decompression failed: {}", e))?;
            Ok(decompressed)
        }
        "br" => {
            let mut decompressed = Vec::new();
            brotli::BrotliDecompress(&mut std::io::Cursor::new(body_bytes), &mut decompressed)
                .map_err(|e| format!("brotli decompression failed: {}", e))?;
            Ok(decompressed)
        }
        "zstd" => zstd::decode_all(body_bytes).map_err(|e| format!("zstd decompression failed: {}", e)),
        other => {
            tracing::warn!(
                encoding = other,
                "Unsupported Content-Encoding, returning original body"
            );
            Ok(body_bytes.to_vec())
        }
    }
}
