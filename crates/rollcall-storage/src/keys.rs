//! Shared key and filename generation for storage backends.
//!
//! Key format: `{kind}/{filename}` where kind is `qr` or `screenshot`.

use chrono::{DateTime, Local};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

/// Category of stored artifact. Determines the key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Qr,
    Screenshot,
}

impl ArtifactKind {
    pub fn prefix(self) -> &'static str {
        match self {
            ArtifactKind::Qr => "qr",
            ArtifactKind::Screenshot => "screenshot",
        }
    }
}

impl Display for ArtifactKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.prefix())
    }
}

impl FromStr for ArtifactKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qr" => Ok(ArtifactKind::Qr),
            "screenshot" | "screenshots" => Ok(ArtifactKind::Screenshot),
            _ => Err(StorageError::InvalidKey(format!(
                "unknown artifact kind: {}",
                s
            ))),
        }
    }
}

/// Reject filenames that could escape their kind directory.
pub fn validate_filename(filename: &str) -> StorageResult<()> {
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
    {
        return Err(StorageError::InvalidKey(format!(
            "invalid artifact filename: {}",
            filename
        )));
    }
    Ok(())
}

/// Generate the storage key for an artifact. All backends must use this format.
pub fn artifact_key(kind: ArtifactKind, filename: &str) -> StorageResult<String> {
    validate_filename(filename)?;
    Ok(format!("{}/{}", kind.prefix(), filename))
}

fn stamped(prefix: &str, at: DateTime<Local>) -> String {
    let short_id = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}.png",
        prefix,
        at.format("%Y%m%d_%H%M%S"),
        &short_id[..8]
    )
}

/// `qr_code_<YYYYmmdd>_<HHMMSS>_<id>.png`
pub fn qr_filename(at: DateTime<Local>) -> String {
    stamped("qr_code", at)
}

/// `confirmation_<YYYYmmdd>_<HHMMSS>_<id>.png`
pub fn confirmation_filename(at: DateTime<Local>) -> String {
    stamped("confirmation", at)
}

/// `error_<YYYYmmdd>_<HHMMSS>_<id>.png`
pub fn error_filename(at: DateTime<Local>) -> String {
    stamped("error", at)
}

/// Content type inferred from the filename extension.
pub fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_artifact_key_layout() {
        assert_eq!(
            artifact_key(ArtifactKind::Qr, "qr_code_1.png").unwrap(),
            "qr/qr_code_1.png"
        );
        assert_eq!(
            artifact_key(ArtifactKind::Screenshot, "error_1.png").unwrap(),
            "screenshot/error_1.png"
        );
    }

    #[test]
    fn test_traversal_filenames_rejected() {
        for bad in ["", "../secret.png", "a/b.png", "a\\b.png", ".."] {
            assert!(
                matches!(
                    artifact_key(ArtifactKind::Qr, bad),
                    Err(StorageError::InvalidKey(_))
                ),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_generated_filenames() {
        let at = Local.with_ymd_and_hms(2026, 3, 2, 8, 1, 2).unwrap();

        let qr = qr_filename(at);
        assert!(qr.starts_with("qr_code_20260302_080102_"));
        assert!(qr.ends_with(".png"));
        assert!(confirmation_filename(at).starts_with("confirmation_20260302_080102_"));
        assert!(error_filename(at).starts_with("error_20260302_080102_"));

        // Same second, distinct names.
        assert_ne!(qr_filename(at), qr_filename(at));
    }

    #[test]
    fn test_artifact_kind_parsing() {
        assert_eq!("qr".parse::<ArtifactKind>().unwrap(), ArtifactKind::Qr);
        assert_eq!(
            "screenshots".parse::<ArtifactKind>().unwrap(),
            ArtifactKind::Screenshot
        );
        assert!("media".parse::<ArtifactKind>().is_err());
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("qr_code.png"), "image/png");
        assert_eq!(content_type_for("shot.JPG"), "image/jpeg");
        assert_eq!(content_type_for("notes"), "application/octet-stream");
    }
}
