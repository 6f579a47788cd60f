pub mod command;
pub mod connection;
pub mod packet;
pub mod primitive;
pub mod response;

/// Decode client text as UTF-8, silently dropping invalid byte sequences
pub fn decode_text(bytes: &[u8]) -> String {
    if let Ok(text) = simdutf8::basic::from_utf8(bytes) {
        return text.to_string();
    }
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}
