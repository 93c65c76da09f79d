use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;

use shared_models::AttachedFile;

use crate::models::AppointmentError;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Inlines `bytes` as a `data:` URI. The id is the upload time in
/// milliseconds plus a random fraction.
pub fn attach_file(name: &str, mime_type: &str, bytes: &[u8]) -> AttachedFile {
    let mime_type = match mime_type.trim() {
        "" => FALLBACK_MIME,
        given => given,
    };

    AttachedFile {
        name: name.to_string(),
        mime_type: mime_type.to_string(),
        data: format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes)),
        id: Utc::now().timestamp_millis() as f64 + rand::random::<f64>(),
    }
}

pub fn decode_file(file: &AttachedFile) -> Result<Vec<u8>, AppointmentError> {
    let rest = file
        .data
        .strip_prefix("data:")
        .ok_or_else(|| AppointmentError::InvalidAttachment(format!("{} is not a data URI", file.name)))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| AppointmentError::InvalidAttachment(format!("{} has no payload", file.name)))?;

    if !header.ends_with(";base64") {
        return Err(AppointmentError::InvalidAttachment(format!(
            "{} is not base64 encoded",
            file.name
        )));
    }

    STANDARD
        .decode(payload)
        .map_err(|e| AppointmentError::InvalidAttachment(format!("{}: {}", file.name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_file_builds_data_uri() {
        let file = attach_file("scan.png", "image/png", b"\x89PNG");

        assert!(file.data.starts_with("data:image/png;base64,"));
        assert!(file.is_image());
        assert!(file.id > 1.0e12);
        assert_eq!(decode_file(&file).unwrap(), b"\x89PNG");
    }

    #[test]
    fn test_missing_mime_falls_back_to_octet_stream() {
        let file = attach_file("notes.bin", " ", b"abc");
        assert_eq!(file.mime_type, "application/octet-stream");
        assert!(!file.is_image());
    }

    #[test]
    fn test_decode_rejects_plain_text() {
        let mut file = attach_file("a.txt", "text/plain", b"hi");
        file.data = "hi".to_string();
        assert!(matches!(decode_file(&file), Err(AppointmentError::InvalidAttachment(_))));
    }
}
