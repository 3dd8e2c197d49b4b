//! Contract with the external JPEG 2000 codec.
//!
//! The codec consumes [`PlaneImage`]s and [`EncodeParameters`] and drives all I/O
//! through a [`StreamAdapter`]. Each stage object owns whatever native resources it
//! created; dropping it at any point, including after a failed stage, releases them.

use crate::error::Jp2Error;
use crate::plane_image::{ImageHeader, PlaneImage};
use crate::quality::EncodeParameters;
use crate::signature::ContainerKind;
use crate::stream::StreamAdapter;

/// Factory for decompression and compression stages.
pub trait Codec {
    /// Creates a decompressor reading `kind` data from `stream`.
    fn decompressor<'s>(
        &self,
        kind: ContainerKind,
        stream: StreamAdapter<'s>,
    ) -> Result<Box<dyn Decompress + 's>, Jp2Error>;

    /// Creates a compressor configured for `image` and `parameters`, writing to `stream`.
    fn compressor<'s>(
        &self,
        kind: ContainerKind,
        image: &PlaneImage,
        parameters: &EncodeParameters,
        stream: StreamAdapter<'s>,
    ) -> Result<Box<dyn Compress + 's>, Jp2Error>;
}

impl<C: Codec + ?Sized> Codec for &C {
    fn decompressor<'s>(
        &self,
        kind: ContainerKind,
        stream: StreamAdapter<'s>,
    ) -> Result<Box<dyn Decompress + 's>, Jp2Error> {
        (**self).decompressor(kind, stream)
    }

    fn compressor<'s>(
        &self,
        kind: ContainerKind,
        image: &PlaneImage,
        parameters: &EncodeParameters,
        stream: StreamAdapter<'s>,
    ) -> Result<Box<dyn Compress + 's>, Jp2Error> {
        (**self).compressor(kind, image, parameters, stream)
    }
}

pub trait Decompress {
    fn read_header(&mut self) -> Result<ImageHeader, Jp2Error>;
    fn decode(&mut self) -> Result<(), Jp2Error>;
    /// Finalizes decompression and hands over the decoded planes.
    fn finish(self: Box<Self>) -> Result<PlaneImage, Jp2Error>;
}

pub trait Compress {
    fn start(&mut self) -> Result<(), Jp2Error>;
    fn encode(&mut self) -> Result<(), Jp2Error>;
    /// Flushes the codestream to the stream.
    fn finish(self: Box<Self>) -> Result<(), Jp2Error>;
}
