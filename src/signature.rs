//! Container/codestream signature detection.

use crate::constants::{
    J2K_CODESTREAM_SIGNATURE, JP2_SHORT_SIGNATURE, JP2_SIGNATURE, SIGNATURE_PEEK_LENGTH,
};
use crate::error::Jp2Error;
use crate::stream::ByteHandle;

/// What a byte source holds, decided once from its first bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatTag {
    /// JP2 box-structured container.
    BoxedContainer,
    /// Bare J2K codestream.
    RawCodestream,
    Unknown,
}

/// The two output kinds the codec can be asked to produce or consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Jp2,
    J2k,
}

impl FormatTag {
    pub fn container_kind(self) -> Option<ContainerKind> {
        match self {
            Self::BoxedContainer => Some(ContainerKind::Jp2),
            Self::RawCodestream => Some(ContainerKind::J2k),
            Self::Unknown => None,
        }
    }
}

impl ContainerKind {
    /// Maps an output format name (`"jp2"` or `"j2k"`, any ASCII case) to a container kind.
    pub fn from_format_name(name: &str) -> Result<Self, Jp2Error> {
        if name.eq_ignore_ascii_case("jp2") {
            Ok(Self::Jp2)
        } else if name.eq_ignore_ascii_case("j2k") {
            Ok(Self::J2k)
        } else {
            Err(Jp2Error::UnsupportedOutputFormat(name.to_string()))
        }
    }

    pub fn format_name(self) -> &'static str {
        match self {
            Self::Jp2 => "jp2",
            Self::J2k => "j2k",
        }
    }
}

/// Classifies the first bytes of a stream.
///
/// Fewer than 12 bytes always classify as [`FormatTag::Unknown`].
pub fn classify(header: &[u8]) -> FormatTag {
    if header.len() < SIGNATURE_PEEK_LENGTH {
        return FormatTag::Unknown;
    }
    if header.starts_with(&JP2_SIGNATURE) || header.starts_with(&JP2_SHORT_SIGNATURE) {
        FormatTag::BoxedContainer
    } else if header.starts_with(&J2K_CODESTREAM_SIGNATURE) {
        FormatTag::RawCodestream
    } else {
        FormatTag::Unknown
    }
}

/// Peeks the signature of `handle` without moving its read position.
pub fn detect(handle: &mut dyn ByteHandle) -> FormatTag {
    let mut header = [0u8; SIGNATURE_PEEK_LENGTH];
    match handle.peek(&mut header) {
        Ok(n) if n == SIGNATURE_PEEK_LENGTH => classify(&header),
        Ok(n) => {
            log::debug!("only {n} signature bytes available");
            FormatTag::Unknown
        }
        Err(e) => {
            log::debug!("signature peek failed: {e}");
            FormatTag::Unknown
        }
    }
}
