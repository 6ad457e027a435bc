use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

const MAX_JOB_ID_LEN: usize = 128;

/// Provider-assigned transcription job identifier.
///
/// Ids arriving from webhooks or poll URLs end up inside storage keys, so only
/// ASCII alphanumerics, `-` and `_` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct JobId(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid job id {0:?}")]
pub struct InvalidJobId(pub String);

impl JobId {
    pub fn parse(raw: &str) -> Result<Self, InvalidJobId> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_JOB_ID_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');

        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(InvalidJobId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Output flavour requested from the provider and published to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    #[default]
    Srt,
    Vtt,
    Text,
}

impl ArtifactFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactFormat::Srt => "srt",
            ArtifactFormat::Vtt => "vtt",
            ArtifactFormat::Text => "txt",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ArtifactFormat::Srt => "application/x-subrip",
            ArtifactFormat::Vtt => "text/vtt",
            ArtifactFormat::Text => "text/plain; charset=utf-8",
        }
    }
}

impl FromStr for ArtifactFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "srt" => Ok(ArtifactFormat::Srt),
            "vtt" => Ok(ArtifactFormat::Vtt),
            "text" | "txt" => Ok(ArtifactFormat::Text),
            other => Err(format!("unsupported artifact format: {}", other)),
        }
    }
}

/// Status of a job as reported by either completion signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportedStatus {
    Queued,
    Processing,
    Completed,
    Error(String),
}

impl ReportedStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportedStatus::Completed | ReportedStatus::Error(_))
    }
}

/// Locally tracked lifecycle of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Submitted,
    Processing,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// Applies an observed status. Terminal states absorb every later observation
    /// and a queued report never moves a job backwards.
    pub fn advance(self, reported: &ReportedStatus) -> JobState {
        if self.is_terminal() {
            return self;
        }

        match reported {
            ReportedStatus::Queued => self,
            ReportedStatus::Processing => JobState::Processing,
            ReportedStatus::Completed => JobState::Completed,
            ReportedStatus::Error(_) => JobState::Failed,
        }
    }
}

impl From<&ReportedStatus> for JobState {
    fn from(status: &ReportedStatus) -> Self {
        JobState::Submitted.advance(status)
    }
}

/// How uploaded media reaches the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceDelivery {
    /// Keep the media in the artifact store and hand the provider its public URL.
    #[default]
    Store,
    /// Push the bytes to the provider's own upload endpoint.
    ProviderUpload,
}

impl FromStr for SourceDelivery {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "store" => Ok(SourceDelivery::Store),
            "provider_upload" | "upload" => Ok(SourceDelivery::ProviderUpload),
            other => Err(format!("unsupported source delivery: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    pub job_id: JobId,
    /// `None` when the media went straight to the provider.
    pub source_key: Option<String>,
    pub artifact_key: String,
    pub format: ArtifactFormat,
    pub state: JobState,
}

/// Normalized completion signal shared by the webhook and poll paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEvent {
    pub job_id: JobId,
    pub status: ReportedStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Ready(String),
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_rejects_path_characters() {
        assert!(JobId::parse("5551722-f677-48a6").is_ok());
        assert!(JobId::parse("abc_DEF").is_ok());
        assert!(JobId::parse("").is_err());
        assert!(JobId::parse("../etc/passwd").is_err());
        assert!(JobId::parse("a/b").is_err());
        assert!(JobId::parse("abc.srt").is_err());
        assert!(JobId::parse(&"x".repeat(129)).is_err());
    }

    #[test]
    fn artifact_format_parses_aliases() {
        assert_eq!("SRT".parse::<ArtifactFormat>(), Ok(ArtifactFormat::Srt));
        assert_eq!("vtt".parse::<ArtifactFormat>(), Ok(ArtifactFormat::Vtt));
        assert_eq!("txt".parse::<ArtifactFormat>(), Ok(ArtifactFormat::Text));
        assert!("docx".parse::<ArtifactFormat>().is_err());
    }

    #[test]
    fn source_delivery_parses_spellings() {
        assert_eq!("store".parse::<SourceDelivery>(), Ok(SourceDelivery::Store));
        assert_eq!(
            "provider_upload".parse::<SourceDelivery>(),
            Ok(SourceDelivery::ProviderUpload)
        );
        assert_eq!(
            "Provider-Upload".parse::<SourceDelivery>(),
            Ok(SourceDelivery::ProviderUpload)
        );
        assert!("ftp".parse::<SourceDelivery>().is_err());
    }

    #[test]
    fn terminal_states_absorb_later_signals() {
        let completed = JobState::Completed;
        assert_eq!(completed.advance(&ReportedStatus::Processing), JobState::Completed);
        assert_eq!(
            completed.advance(&ReportedStatus::Error("late".into())),
            JobState::Completed
        );

        let failed = JobState::Failed;
        assert_eq!(failed.advance(&ReportedStatus::Completed), JobState::Failed);
    }

    #[test]
    fn processing_self_loop_and_no_regression() {
        let state = JobState::Submitted.advance(&ReportedStatus::Processing);
        assert_eq!(state, JobState::Processing);
        assert_eq!(state.advance(&ReportedStatus::Processing), JobState::Processing);
        assert_eq!(state.advance(&ReportedStatus::Queued), JobState::Processing);
        assert_eq!(JobState::Submitted.advance(&ReportedStatus::Queued), JobState::Submitted);
    }
}
