//! Attendance link codec.
//!
//! Portal links carry a single `id` query parameter made of two parts,
//! `<session_id>_<suffix>`. The codec is the only way to obtain an
//! [`AttendanceLink`], so the stored `raw` form always matches its parts.

use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;

/// Attendance page of the university portal.
pub const DEFAULT_PORTAL_BASE_URL: &str = "https://students.nsbm.ac.lk/attendence/index.php";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("link is empty")]
    Empty,

    #[error("link has no id parameter")]
    MissingIdentifier,

    #[error("id parameter '{0}' is not of the form <session>_<suffix>")]
    MissingSeparator(String),

    #[error("session id '{0}' must be a non-empty run of digits")]
    InvalidSessionId(String),

    #[error("suffix '{0}' is not a non-negative integer")]
    InvalidSuffix(String),
}

/// A parsed, canonical attendance link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, ToSchema)]
pub struct AttendanceLink {
    session_id: String,
    suffix: u64,
    raw: String,
}

impl AttendanceLink {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn suffix(&self) -> u64 {
        self.suffix
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The `<session_id>_<suffix>` identifier carried by the link.
    pub fn identifier(&self) -> String {
        format!("{}_{}", self.session_id, self.suffix)
    }
}

impl Display for AttendanceLink {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.raw)
    }
}

/// Parses and formats portal links against a fixed base URL.
#[derive(Debug, Clone)]
pub struct LinkCodec {
    base_url: String,
}

impl Default for LinkCodec {
    fn default() -> Self {
        Self::new(DEFAULT_PORTAL_BASE_URL)
    }
}

impl LinkCodec {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('?').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Parse any string carrying an `id=<session>_<suffix>` query pair.
    ///
    /// Host and path are not checked; the result is normalised onto this
    /// codec's base URL.
    pub fn parse(&self, raw: &str) -> Result<AttendanceLink, FormatError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(FormatError::Empty);
        }

        let (_, query) = raw.split_once('?').ok_or(FormatError::MissingIdentifier)?;
        let query = query.split('#').next().unwrap_or_default();
        let id = query
            .split('&')
            .find_map(|pair| pair.strip_prefix("id="))
            .ok_or(FormatError::MissingIdentifier)?;

        let (session_id, suffix) = id
            .split_once('_')
            .ok_or_else(|| FormatError::MissingSeparator(id.to_string()))?;

        self.link(session_id, suffix)
    }

    /// Build a link from its two parts, validating both.
    pub fn link(&self, session_id: &str, suffix: &str) -> Result<AttendanceLink, FormatError> {
        if session_id.is_empty() || !session_id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FormatError::InvalidSessionId(session_id.to_string()));
        }
        // u64::from_str accepts a leading '+', so digits are checked first.
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FormatError::InvalidSuffix(suffix.to_string()));
        }
        let suffix: u64 = suffix
            .parse()
            .map_err(|_| FormatError::InvalidSuffix(suffix.to_string()))?;

        Ok(self.from_parts(session_id.to_string(), suffix))
    }

    /// Canonical raw form of a link.
    pub fn format(&self, link: &AttendanceLink) -> String {
        self.render(&link.session_id, link.suffix)
    }

    fn from_parts(&self, session_id: String, suffix: u64) -> AttendanceLink {
        let raw = self.render(&session_id, suffix);
        AttendanceLink {
            session_id,
            suffix,
            raw,
        }
    }

    fn render(&self, session_id: &str, suffix: u64) -> String {
        format!("{}?id={}_{}", self.base_url, session_id, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_abbreviated_link() {
        let codec = LinkCodec::default();
        let link = codec.parse(".../index.php?id=52202002751_84783").unwrap();

        assert_eq!(link.session_id(), "52202002751");
        assert_eq!(link.suffix(), 84783);
        assert_eq!(
            link.raw(),
            "https://students.nsbm.ac.lk/attendence/index.php?id=52202002751_84783"
        );
    }

    #[test]
    fn test_parse_full_link_with_extra_params() {
        let codec = LinkCodec::default();
        let link = codec
            .parse("https://students.nsbm.ac.lk/attendence/login.php?lang=en&id=123_0#top")
            .unwrap();

        assert_eq!(link.session_id(), "123");
        assert_eq!(link.suffix(), 0);
    }

    #[test]
    fn test_format_then_parse_is_identity() {
        let codec = LinkCodec::default();
        for (session, suffix) in [("1", "0"), ("52202002751", "84783"), ("007", "18446744073709551615")] {
            let link = codec.link(session, suffix).unwrap();
            assert_eq!(codec.parse(&codec.format(&link)).unwrap(), link);
        }
    }

    #[test]
    fn test_custom_base_url() {
        let codec = LinkCodec::new("http://portal.test/index.php?");
        let link = codec.parse("anything?id=9_8").unwrap();
        assert_eq!(link.raw(), "http://portal.test/index.php?id=9_8");
        assert_eq!(link.identifier(), "9_8");
    }

    #[test]
    fn test_parse_rejects_malformed_links() {
        let codec = LinkCodec::default();

        assert_eq!(codec.parse("   "), Err(FormatError::Empty));
        assert_eq!(
            codec.parse("https://students.nsbm.ac.lk/attendence/index.php"),
            Err(FormatError::MissingIdentifier)
        );
        assert_eq!(
            codec.parse("index.php?session=1_2"),
            Err(FormatError::MissingIdentifier)
        );
        assert_eq!(
            codec.parse("index.php?id=52202002751"),
            Err(FormatError::MissingSeparator("52202002751".to_string()))
        );
        assert_eq!(
            codec.parse("index.php?id=_84783"),
            Err(FormatError::InvalidSessionId(String::new()))
        );
        assert_eq!(
            codec.parse("index.php?id=abc_84783"),
            Err(FormatError::InvalidSessionId("abc".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_bad_suffixes() {
        let codec = LinkCodec::default();

        for bad in ["-1", "+5", "12a", "", "1_2", "99999999999999999999"] {
            let raw = format!("index.php?id=123_{}", bad);
            assert!(
                matches!(codec.parse(&raw), Err(FormatError::InvalidSuffix(_))),
                "suffix {:?} should be rejected",
                bad
            );
        }
    }
}
