use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;

use super::link::AttendanceLink;

/// What the reconstructor is asked to produce from the original link.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "text", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ConversionMode {
    /// Same session, live suffix.
    ExpiredConversion,
    /// Sibling evening-session link for the same student.
    EveningDerivation,
}

impl Display for ConversionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ConversionMode::ExpiredConversion => write!(f, "expired_conversion"),
            ConversionMode::EveningDerivation => write!(f, "evening_derivation"),
        }
    }
}

impl FromStr for ConversionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "expired_conversion" => Ok(ConversionMode::ExpiredConversion),
            "evening_derivation" => Ok(ConversionMode::EveningDerivation),
            _ => Err(anyhow::anyhow!("Invalid conversion mode: {}", s)),
        }
    }
}

/// Portal login credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.is_empty()
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// An accepted conversion request. Owned by the coordinator once submitted.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub module_name: String,
    pub original_link: AttendanceLink,
    pub mode: ConversionMode,
    pub credentials: Credentials,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_mode_round_trips_through_strings() {
        for mode in [
            ConversionMode::ExpiredConversion,
            ConversionMode::EveningDerivation,
        ] {
            assert_eq!(mode.to_string().parse::<ConversionMode>().unwrap(), mode);
        }
        assert!("morning".parse::<ConversionMode>().is_err());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("student42", "hunter2");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("student42"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_credentials_completeness() {
        assert!(Credentials::new("a", "b").is_complete());
        assert!(!Credentials::new("  ", "b").is_complete());
        assert!(!Credentials::new("a", "").is_complete());
    }
}
