//! Attachment path convention.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Build a unique object path: `{entity_id}/{subfolder}/{millis}-{random}.{ext}`.
///
/// The extension is taken from `filename` and lowercased; files without one
/// get `bin`.
pub fn attachment_path(
    entity_id: Uuid,
    subfolder: &str,
    filename: &str,
    now: DateTime<Utc>,
) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{entity_id}/{}/{}-{}.{}",
        subfolder.trim_matches('/'),
        now.timestamp_millis(),
        &random[..8],
        extension(filename)
    )
}

fn extension(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext.to_lowercase(),
        _ => "bin".to_string(),
    }
}

/// Guess a MIME type from a path extension.
pub fn content_type(path: &str) -> Option<&'static str> {
    let ext = path.rsplit('.').next()?.to_lowercase();
    let mime = match ext.as_str() {
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "dwg" => "application/acad",
        _ => return None,
    };
    Some(mime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_layout() {
        let entity = Uuid::new_v4();
        let now = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let path = attachment_path(entity, "photos/", "Site Photo.JPG", now);

        let parts: Vec<&str> = path.split('/').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], entity.to_string());
        assert_eq!(parts[1], "photos");
        let (stamp, rest) = parts[2].split_once('-').unwrap();
        assert_eq!(stamp, now.timestamp_millis().to_string());
        assert!(rest.ends_with(".jpg"));
        assert_eq!(rest.len(), "abcdefgh.jpg".len());
    }

    #[test]
    fn test_paths_are_unique() {
        let entity = Uuid::new_v4();
        let now = Utc::now();
        assert_ne!(
            attachment_path(entity, "docs", "a.pdf", now),
            attachment_path(entity, "docs", "a.pdf", now)
        );
    }

    #[test]
    fn test_missing_extension_and_mime() {
        assert_eq!(extension("README"), "bin");
        assert_eq!(extension(".hidden"), "bin");
        assert_eq!(content_type("x/y/1-ab.pdf"), Some("application/pdf"));
        assert_eq!(content_type("x/y/1-ab.bin"), None);
    }
}
