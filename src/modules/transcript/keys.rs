//! Storage key addressing for uploaded sources and published artifacts.
//!
//! Artifact keys are a pure function of the job id and format, so a caller can be
//! pointed at the artifact URL before the job finishes, and both completion paths
//! converge on the same key without coordinating.

use super::model::{ArtifactFormat, Job, JobId};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default)]
pub struct KeyAddressing;

impl KeyAddressing {
    pub fn new() -> Self {
        Self
    }

    /// `<uuid>.<ext>` for `clip.mp3`, bare `<uuid>` when the name has no extension.
    pub fn mint_source_key(&self, original_filename: &str) -> String {
        let token = Uuid::new_v4();
        match file_extension(original_filename) {
            Some(ext) => format!("{}.{}", token, ext),
            None => token.to_string(),
        }
    }

    pub fn derive_artifact_key(&self, job_id: &JobId, format: ArtifactFormat) -> String {
        format!("{}.{}", job_id, format.extension())
    }

    pub fn artifact_path(&self, key: &str) -> String {
        format!("/artifact/{}", key)
    }

    pub fn job_path(&self, job_id: &JobId) -> String {
        format!("/job/{}", job_id)
    }

    /// Where the uploader is sent right after submission.
    ///
    /// With webhook delivery the artifact appears on its own, so the eventual
    /// artifact URL is returned. In poll-only mode nothing publishes the artifact
    /// unless someone polls, so the poll URL is returned instead.
    pub fn submission_location(&self, job: &Job, webhook_enabled: bool) -> String {
        if webhook_enabled {
            self.artifact_path(&job.artifact_key)
        } else {
            self.job_path(&job.job_id)
        }
    }

    /// Where a caller is sent once the artifact is published.
    pub fn completion_location(&self, artifact_key: &str) -> String {
        self.artifact_path(artifact_key)
    }
}

/// Substring after the last `.` of the base name, if any.
///
/// Names like `.bashrc` or `name.` have no extension. Extensions that are not
/// plain ASCII alphanumerics are dropped rather than copied into a storage key.
fn file_extension(original_filename: &str) -> Option<&str> {
    let base = original_filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_filename);

    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }

    ext.bytes().all(|b| b.is_ascii_alphanumeric()).then_some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::transcript::model::JobState;

    fn assert_uuid_with_ext(key: &str, ext: Option<&str>) {
        let (token, rest) = match key.split_once('.') {
            Some((token, rest)) => (token, Some(rest)),
            None => (key, None),
        };
        assert!(Uuid::parse_str(token).is_ok(), "{} is not a uuid", token);
        assert_eq!(rest, ext);
    }

    fn sample_job() -> Job {
        let keys = KeyAddressing::new();
        let job_id = JobId::parse("abc").unwrap();
        Job {
            artifact_key: keys.derive_artifact_key(&job_id, ArtifactFormat::Srt),
            job_id,
            source_key: Some("source.mp3".to_string()),
            format: ArtifactFormat::Srt,
            state: JobState::Submitted,
        }
    }

    #[test]
    fn mint_source_key_keeps_extension() {
        let key = KeyAddressing::new().mint_source_key("clip.mp3");
        assert_uuid_with_ext(&key, Some("mp3"));
    }

    #[test]
    fn mint_source_key_without_extension_has_no_trailing_dot() {
        let key = KeyAddressing::new().mint_source_key("recording");
        assert!(!key.ends_with('.'));
        assert_uuid_with_ext(&key, None);
    }

    #[test]
    fn mint_source_key_is_unique_per_call() {
        let keys = KeyAddressing::new();
        assert_ne!(keys.mint_source_key("a.wav"), keys.mint_source_key("a.wav"));
    }

    #[test]
    fn extension_edge_cases() {
        assert_eq!(file_extension("archive.tar.gz"), Some("gz"));
        assert_eq!(file_extension(".bashrc"), None);
        assert_eq!(file_extension("name."), None);
        assert_eq!(file_extension("C:\\media\\talk.M4A"), Some("M4A"));
        assert_eq!(file_extension("dir.v2/recording"), None);
        assert_eq!(file_extension("weird.m p3"), None);
    }

    #[test]
    fn derive_artifact_key_is_stable() {
        let keys = KeyAddressing::new();
        let job_id = JobId::parse("abc").unwrap();
        let first = keys.derive_artifact_key(&job_id, ArtifactFormat::Srt);
        for _ in 0..10 {
            assert_eq!(keys.derive_artifact_key(&job_id, ArtifactFormat::Srt), first);
        }
        assert_eq!(first, "abc.srt");
        assert_eq!(keys.derive_artifact_key(&job_id, ArtifactFormat::Vtt), "abc.vtt");
        assert_eq!(keys.derive_artifact_key(&job_id, ArtifactFormat::Text), "abc.txt");
    }

    #[test]
    fn submission_location_depends_on_delivery_mode() {
        let keys = KeyAddressing::new();
        let job = sample_job();
        assert_eq!(keys.submission_location(&job, true), "/artifact/abc.srt");
        assert_eq!(keys.submission_location(&job, false), "/job/abc");
        assert_eq!(keys.completion_location(&job.artifact_key), "/artifact/abc.srt");
    }
}
