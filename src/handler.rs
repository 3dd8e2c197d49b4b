//! Image I/O handler facade: a byte handle, a format name and a quality option.

use crate::bitmap::Bitmap;
use crate::codec::Codec;
use crate::error::Jp2Error;
use crate::quality::Quality;
use crate::session::CodecSession;
use crate::signature::{self, ContainerKind, FormatTag};
use crate::stream::ByteHandle;

/// Format names this handler reads and writes.
pub const FORMAT_NAMES: [&str; 2] = ["jp2", "j2k"];

/// Options a caller may try to set on a handler. Only quality is honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOption {
    Quality,
    CompressionRatio,
    Gamma,
    Description,
    ScaledSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub can_read: bool,
    pub can_write: bool,
}

/// What can be done with `handle` given a requested `format_name`.
///
/// A known name grants both directions; any other non-empty name grants nothing.
/// An empty name probes the handle itself.
pub fn capabilities(format_name: &str, handle: Option<&mut dyn ByteHandle>) -> Capabilities {
    if FORMAT_NAMES
        .iter()
        .any(|name| name.eq_ignore_ascii_case(format_name))
    {
        return Capabilities {
            can_read: true,
            can_write: true,
        };
    }
    if !format_name.is_empty() {
        return Capabilities::default();
    }
    let Some(handle) = handle else {
        return Capabilities::default();
    };
    Capabilities {
        can_read: handle.is_readable() && signature::detect(handle) != FormatTag::Unknown,
        can_write: handle.is_writable(),
    }
}

pub struct Jp2Handler<'h, C: Codec> {
    codec: C,
    device: Option<&'h mut dyn ByteHandle>,
    format: String,
    quality: Quality,
}

impl<'h, C: Codec> Jp2Handler<'h, C> {
    /// Handler without a device; writes `jp2` at quality 100 until told otherwise.
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            device: None,
            format: String::new(),
            quality: Quality::default(),
        }
    }

    pub fn with_device(codec: C, device: &'h mut dyn ByteHandle) -> Self {
        let mut handler = Self::new(codec);
        handler.device = Some(device);
        handler
    }

    pub fn set_device(&mut self, device: &'h mut dyn ByteHandle) {
        self.device = Some(device);
    }

    pub fn take_device(&mut self) -> Option<&'h mut dyn ByteHandle> {
        self.device.take()
    }

    /// Sets the output format name. An empty name means `jp2`.
    pub fn set_format(&mut self, name: impl Into<String>) {
        self.format = name.into();
    }

    pub fn format(&self) -> &str {
        if self.format.is_empty() {
            ContainerKind::Jp2.format_name()
        } else {
            &self.format
        }
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn set_quality(&mut self, quality: Quality) {
        self.quality = quality;
    }

    /// Applies `value` for `option`; options other than quality are ignored.
    pub fn set_option(&mut self, option: ImageOption, value: i32) {
        if option == ImageOption::Quality {
            self.quality = Quality::new(value);
        }
    }

    pub fn supports_option(&self, option: ImageOption) -> bool {
        option == ImageOption::Quality
    }

    /// Non-destructive signature probe of the current device.
    pub fn can_read(&mut self) -> bool {
        self.device
            .as_deref_mut()
            .is_some_and(|device| signature::detect(device) != FormatTag::Unknown)
    }

    pub fn read(&mut self) -> Result<Bitmap, Jp2Error> {
        let device = self.device.as_deref_mut().ok_or(Jp2Error::MissingHandle)?;
        CodecSession::new(&self.codec).decode(device)
    }

    pub fn write(&mut self, bitmap: &Bitmap) -> Result<(), Jp2Error> {
        let format = if self.format.is_empty() {
            ContainerKind::Jp2.format_name()
        } else {
            self.format.as_str()
        };
        let device = self.device.as_deref_mut().ok_or(Jp2Error::MissingHandle)?;
        CodecSession::new(&self.codec).encode(bitmap, format, self.quality, device)
    }
}
