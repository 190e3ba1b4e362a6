use std::path::PathBuf;

/// Crate-wide result alias.
pub type CutResult<T> = Result<T, CutError>;

/// Classified pipeline failure.
///
/// The orchestrator is the only layer that decides what a failure means for a
/// run: [`CutError::ClipUnavailable`] drops the affected clip and continues,
/// [`CutError::EmptyTimeline`] fails the run cleanly, everything else is
/// terminal for the run and surfaced through [`CutError::user_message`].
#[derive(thiserror::Error, Debug)]
pub enum CutError {
    /// A caller-supplied value or settings combination is invalid.
    #[error("validation error: {0}")]
    Validation(String),

    /// Probing or decoding a media source failed.
    #[error("media error: {0}")]
    Media(String),

    /// Audio extraction, crossfading or mixing failed.
    #[error("audio error: {0}")]
    Audio(String),

    /// Writing or finalizing the output container failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// The clip's backing file is missing or unreadable.
    ///
    /// Recoverable per clip: the run continues without it.
    #[error("clip unavailable: '{}'", .0.display())]
    ClipUnavailable(PathBuf),

    /// Every clip was dropped before rendering could start.
    #[error("no readable clips remain to export")]
    EmptyTimeline,

    /// Unclassified failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CutError {
    /// Construct a [`CutError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Construct a [`CutError::Media`].
    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media(msg.into())
    }

    /// Construct a [`CutError::Audio`].
    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio(msg.into())
    }

    /// Construct a [`CutError::Encode`].
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Return `true` when the error only affects a single clip and the run
    /// can continue without that clip.
    pub fn is_clip_recoverable(&self) -> bool {
        matches!(self, Self::ClipUnavailable(_))
    }

    /// The single user-facing message for this failure.
    ///
    /// Known pipeline errors keep their own wording; unclassified errors
    /// collapse into a generic message, with the detail left to logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::EmptyTimeline => {
                "None of the selected clips could be read, so there is nothing to export".to_string()
            }
            Self::ClipUnavailable(path) => {
                format!("The clip '{}' could not be read", path.display())
            }
            Self::Media(_) | Self::Audio(_) | Self::Encode(_) => self.to_string(),
            Self::Other(_) => "An error occurred while exporting the video".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            CutError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(CutError::media("x").to_string().contains("media error:"));
        assert!(CutError::audio("x").to_string().contains("audio error:"));
        assert!(CutError::encode("x").to_string().contains("encode error:"));
    }

    #[test]
    fn clip_unavailable_is_the_only_per_clip_recoverable() {
        assert!(CutError::ClipUnavailable(PathBuf::from("a.mp4")).is_clip_recoverable());
        assert!(!CutError::EmptyTimeline.is_clip_recoverable());
        assert!(!CutError::media("x").is_clip_recoverable());
    }

    #[test]
    fn unknown_errors_collapse_to_generic_user_message() {
        let base = std::io::Error::other("boom");
        let err = CutError::Other(anyhow::Error::new(base));
        assert!(!err.user_message().contains("boom"));
        assert!(err.to_string().contains("boom"));
    }
}
