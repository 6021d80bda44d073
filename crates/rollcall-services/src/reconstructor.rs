//! Link reconstruction through the reasoning service.
//!
//! The reasoning service is treated as an untrusted source: every answer is
//! scanned for an `id=` token, parsed through the [`LinkCodec`] and checked
//! against the requested mode before it is accepted. A rejected answer earns
//! exactly one retry with a stricter prompt.

use anyhow::Context;
use regex::Regex;
use rollcall_core::models::ConversionMode;
use rollcall_core::{AttendanceLink, FormatError, LinkCodec};
use rollcall_reasoning::ReasoningService;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const MAX_ATTEMPTS: u32 = 2;

/// Why a reasoning answer was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectionCause {
    #[error("reasoning service failed: {0}")]
    Service(String),

    #[error("reasoning service did not answer within {0:?}")]
    Timeout(Duration),

    #[error("answer contained no id parameter")]
    NoLink,

    #[error("answer is not a valid attendance link: {0}")]
    Malformed(FormatError),

    #[error("answer changed the session id from {expected} to {actual}")]
    SessionMismatch { expected: String, actual: String },

    #[error("answer repeated the original link")]
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("link reconstruction failed after {attempts} attempt(s): {cause}")]
pub struct ReconstructionError {
    pub attempts: u32,
    pub cause: RejectionCause,
}

pub struct LinkReconstructor {
    reasoning: Arc<dyn ReasoningService>,
    codec: LinkCodec,
    call_timeout: Duration,
    evening_offset: u64,
    id_pattern: Regex,
}

impl LinkReconstructor {
    pub fn new(
        reasoning: Arc<dyn ReasoningService>,
        codec: LinkCodec,
        call_timeout: Duration,
        evening_offset: u64,
    ) -> anyhow::Result<Self> {
        let id_pattern = Regex::new(r#"\bid=[^\s&#"'<>()\[\]`*]+"#)
            .context("Failed to compile link pattern")?;

        Ok(Self {
            reasoning,
            codec,
            call_timeout,
            evening_offset,
            id_pattern,
        })
    }

    pub fn codec(&self) -> &LinkCodec {
        &self.codec
    }

    pub fn provider_name(&self) -> &str {
        self.reasoning.name()
    }

    /// Derive the live (or evening) link for `original`.
    #[tracing::instrument(skip(self, original), fields(link = %original, mode = %mode, provider = self.reasoning.name()))]
    pub async fn reconstruct(
        &self,
        original: &AttendanceLink,
        mode: ConversionMode,
    ) -> Result<AttendanceLink, ReconstructionError> {
        let mut prompt = self.prompt(original, mode);
        let mut attempts = 0;

        loop {
            attempts += 1;
            let cause = match self.attempt(&prompt, original, mode).await {
                Ok(link) => {
                    tracing::info!(
                        attempts,
                        converted = %link,
                        "Link reconstructed"
                    );
                    return Ok(link);
                }
                Err(cause) => cause,
            };

            tracing::warn!(attempts, cause = %cause, "Reasoning answer rejected");
            if attempts >= MAX_ATTEMPTS {
                return Err(ReconstructionError { attempts, cause });
            }
            prompt = self.stricter_prompt(original, mode, &cause);
        }
    }

    async fn attempt(
        &self,
        prompt: &str,
        original: &AttendanceLink,
        mode: ConversionMode,
    ) -> Result<AttendanceLink, RejectionCause> {
        let answer = match tokio::time::timeout(self.call_timeout, self.reasoning.infer(prompt)).await
        {
            Err(_) => return Err(RejectionCause::Timeout(self.call_timeout)),
            Ok(Err(e)) => return Err(RejectionCause::Service(format!("{:#}", e))),
            Ok(Ok(answer)) => answer,
        };

        self.accept(&answer, original, mode)
    }

    /// First `id=` token in `answer` that passes validation. When none does,
    /// the rejection of the first token is reported.
    fn accept(
        &self,
        answer: &str,
        original: &AttendanceLink,
        mode: ConversionMode,
    ) -> Result<AttendanceLink, RejectionCause> {
        let mut first_rejection = None;

        for token in self.id_pattern.find_iter(answer) {
            let token = token.as_str().trim_end_matches(['.', ',', ';', ':', '!']);
            let verdict = self
                .codec
                .parse(&format!("?{}", token))
                .map_err(RejectionCause::Malformed)
                .and_then(|candidate| check_candidate(candidate, original, mode));

            match verdict {
                Ok(link) => return Ok(link),
                Err(cause) => {
                    first_rejection.get_or_insert(cause);
                }
            }
        }

        Err(first_rejection.unwrap_or(RejectionCause::NoLink))
    }

    fn prompt(&self, original: &AttendanceLink, mode: ConversionMode) -> String {
        let format_hint = format!(
            "Respond with the complete URL only, in the form {}?id=<session_id>_<suffix>.",
            self.codec.base_url()
        );

        match mode {
            ConversionMode::ExpiredConversion => format!(
                "The following university attendance link has expired:\n{raw}\n\n\
                 Its id parameter has the form <session_id>_<suffix>. Produce the currently \
                 valid link for the same session: keep the session id {session} exactly and \
                 replace the suffix {suffix} with the live value.\n{format_hint}",
                raw = original.raw(),
                session = original.session_id(),
                suffix = original.suffix(),
            ),
            ConversionMode::EveningDerivation => {
                let hint = match self.evening_session_hint(original.session_id()) {
                    Some(evening) => format!(
                        "The evening session id is normally the morning id plus {}, which gives {}.",
                        self.evening_offset, evening
                    ),
                    None => format!(
                        "The evening session id is normally the morning id plus {}.",
                        self.evening_offset
                    ),
                };
                format!(
                    "The following university attendance link is for a morning session:\n{raw}\n\n\
                     Its id parameter has the form <session_id>_<suffix>. Produce the link for \
                     the matching evening session of the same student. {hint}\n{format_hint}",
                    raw = original.raw(),
                )
            }
        }
    }

    fn stricter_prompt(
        &self,
        original: &AttendanceLink,
        mode: ConversionMode,
        cause: &RejectionCause,
    ) -> String {
        let mut prompt = self.prompt(original, mode);
        prompt.push_str(&format!(
            "\n\nYour previous answer was rejected: {}. Answer with exactly one line containing \
             only the URL, with no explanation and no formatting.",
            cause
        ));
        if mode == ConversionMode::ExpiredConversion {
            prompt.push_str(&format!(
                " The session id must remain {}.",
                original.session_id()
            ));
        }
        prompt
    }

    fn evening_session_hint(&self, session_id: &str) -> Option<String> {
        let session: u128 = session_id.parse().ok()?;
        session
            .checked_add(u128::from(self.evening_offset))
            .map(|v| v.to_string())
    }
}

fn check_candidate(
    candidate: AttendanceLink,
    original: &AttendanceLink,
    mode: ConversionMode,
) -> Result<AttendanceLink, RejectionCause> {
    if candidate.session_id() == original.session_id() && candidate.suffix() == original.suffix() {
        return Err(RejectionCause::Unchanged);
    }
    if mode == ConversionMode::ExpiredConversion && candidate.session_id() != original.session_id()
    {
        return Err(RejectionCause::SessionMismatch {
            expected: original.session_id().to_string(),
            actual: candidate.session_id().to_string(),
        });
    }
    Ok(candidate)
}
