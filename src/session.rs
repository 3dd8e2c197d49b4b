//! One encode or decode call, sequenced end to end.
//!
//! Decode: `Idle -> HeaderRead -> Decoding -> Done`.
//! Encode: `Idle -> EncoderConfigured -> Encoding -> Done`.
//! Any failure moves the session to `Failed`; codec stages are dropped on the way
//! out, which releases their native resources.

use crate::bitmap::Bitmap;
use crate::codec::Codec;
use crate::error::Jp2Error;
use crate::plane_mapper;
use crate::quality::{EncodeParameters, Quality};
use crate::signature::{self, ContainerKind};
use crate::stream::{ByteHandle, StreamAdapter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    HeaderRead,
    Decoding,
    EncoderConfigured,
    Encoding,
    Done,
    Failed,
}

/// Single-use driver for one operation against a [`Codec`].
pub struct CodecSession<'c, C: Codec + ?Sized> {
    codec: &'c C,
    state: SessionState,
}

impl<'c, C: Codec + ?Sized> CodecSession<'c, C> {
    pub fn new(codec: &'c C) -> Self {
        Self {
            codec,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        log::debug!("session {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn begin(&self) -> Result<(), Jp2Error> {
        if self.state != SessionState::Idle {
            return Err(Jp2Error::InvalidState(self.state));
        }
        Ok(())
    }

    fn complete<T>(&mut self, result: Result<T, Jp2Error>) -> Result<T, Jp2Error> {
        match &result {
            Ok(_) => self.transition(SessionState::Done),
            Err(e) => {
                log::warn!("session failed in state {:?}: {e}", self.state);
                self.transition(SessionState::Failed);
            }
        }
        result
    }

    /// Detects the container, decodes it and converts the planes into a bitmap.
    pub fn decode(&mut self, handle: &mut dyn ByteHandle) -> Result<Bitmap, Jp2Error> {
        self.begin()?;
        let result = self.run_decode(handle);
        self.complete(result)
    }

    fn run_decode(&mut self, handle: &mut dyn ByteHandle) -> Result<Bitmap, Jp2Error> {
        let kind = signature::detect(handle).container_kind().ok_or_else(|| {
            log::warn!("stream carries no JP2 or J2K signature");
            Jp2Error::UnknownFormat
        })?;

        let mut decompressor = self.codec.decompressor(kind, StreamAdapter::input(handle))?;
        let header = decompressor.read_header()?;
        self.transition(SessionState::HeaderRead);
        log::debug!(
            "{} header: {}x{}, {} components, {:?}",
            kind.format_name(),
            header.width,
            header.height,
            header.component_count,
            header.color_space
        );

        self.transition(SessionState::Decoding);
        decompressor.decode()?;
        let image = decompressor.finish()?;
        plane_mapper::from_component_planes(&image)
    }

    /// Encodes `bitmap` into the container named by `format_name` (`"jp2"` or `"j2k"`).
    pub fn encode(
        &mut self,
        bitmap: &Bitmap,
        format_name: &str,
        quality: Quality,
        handle: &mut dyn ByteHandle,
    ) -> Result<(), Jp2Error> {
        self.begin()?;
        let result = self.run_encode(bitmap, format_name, quality, handle);
        self.complete(result)
    }

    fn run_encode(
        &mut self,
        bitmap: &Bitmap,
        format_name: &str,
        quality: Quality,
        handle: &mut dyn ByteHandle,
    ) -> Result<(), Jp2Error> {
        let kind = ContainerKind::from_format_name(format_name)?;
        let image = plane_mapper::to_component_planes(bitmap)?;
        let parameters = EncodeParameters::derive(quality, &image);
        log::debug!(
            "encoding {} at quality {}: rates {:?}, {} resolutions, {}",
            kind.format_name(),
            quality.value(),
            parameters.rates.rates(),
            parameters.resolution_levels,
            if parameters.irreversible {
                "irreversible"
            } else {
                "reversible"
            }
        );

        let mut compressor =
            self.codec
                .compressor(kind, &image, &parameters, StreamAdapter::output(handle))?;
        self.transition(SessionState::EncoderConfigured);
        compressor.start()?;
        self.transition(SessionState::Encoding);
        compressor.encode()?;
        compressor.finish()
    }
}
