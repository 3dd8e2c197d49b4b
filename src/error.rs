use thiserror::Error;

/// Broad failure category, used by callers to decide how to report a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any codec work began.
    Configuration,
    /// The byte source carries no recognized signature.
    FormatDetection,
    /// Bitmap/component-plane conversion failed.
    Conversion,
    /// The external codec reported a failure.
    Codec,
    /// The underlying byte handle failed.
    Io,
}

#[derive(Error, Debug)]
pub enum Jp2Error {
    // Configuration errors
    #[error("Unsupported output format: {0:?}")]
    UnsupportedOutputFormat(String),
    #[error("No byte handle supplied")]
    MissingHandle,
    #[error("Invalid bitmap: {0}")]
    InvalidBitmap(String),

    // Format detection errors
    #[error("Unknown or unmatched stream signature")]
    UnknownFormat,

    // Conversion errors
    #[error("Unsupported component count: {0}")]
    UnsupportedComponentCount(usize),
    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Component plane {0} does not match the image geometry")]
    PlaneMismatch(usize),
    #[error("Component plane allocation failed")]
    AllocationFailed,

    // Codec errors
    #[error("Codec setup failed: {0}")]
    CodecSetup(String),
    #[error("Failed to read codestream header: {0}")]
    HeaderRead(String),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to compress image: {0}")]
    Compress(String),

    // Logic errors
    #[error("Invalid operation in session state {0:?}")]
    InvalidState(crate::session::SessionState),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Jp2Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedOutputFormat(_)
            | Self::MissingHandle
            | Self::InvalidBitmap(_)
            | Self::InvalidState(_) => ErrorKind::Configuration,
            Self::UnknownFormat => ErrorKind::FormatDetection,
            Self::UnsupportedComponentCount(_)
            | Self::InvalidDimensions { .. }
            | Self::PlaneMismatch(_)
            | Self::AllocationFailed => ErrorKind::Conversion,
            Self::CodecSetup(_) | Self::HeaderRead(_) | Self::Decode(_) | Self::Compress(_) => {
                ErrorKind::Codec
            }
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, Jp2Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_follow_taxonomy() {
        assert_eq!(
            Jp2Error::UnsupportedOutputFormat("png".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(Jp2Error::UnknownFormat.kind(), ErrorKind::FormatDetection);
        assert_eq!(
            Jp2Error::UnsupportedComponentCount(5).kind(),
            ErrorKind::Conversion
        );
        assert_eq!(Jp2Error::Decode("eof".into()).kind(), ErrorKind::Codec);
    }

    #[test]
    fn test_messages_carry_reason() {
        let err = Jp2Error::Compress("rate allocation".into());
        assert_eq!(err.to_string(), "Failed to compress image: rate allocation");
    }
}
