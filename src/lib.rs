//! # jp2-bridge
//!
//! Reads and writes JPEG 2000 images (JP2 containers and bare J2K codestreams)
//! through an external codec, converting between caller bitmaps and the codec's
//! per-component planes.
//!
//! The codec is a trait ([`codec::Codec`]). Enabling the `openjpeg` feature adds an
//! implementation backed by the OpenJPEG C library.

pub mod bitmap;
pub mod codec;
pub mod constants;
pub mod error;
pub mod handler;
#[cfg(feature = "openjpeg")]
pub mod openjpeg;
pub mod plane_image;
pub mod plane_mapper;
pub mod quality;
pub mod session;
pub mod signature;
pub mod stream;
pub mod wasm;

pub use bitmap::{Bitmap, PixelFormat};
pub use codec::{Codec, Compress, Decompress};
pub use error::{ErrorKind, Jp2Error};
pub use handler::{Capabilities, ImageOption, Jp2Handler, capabilities};
#[cfg(feature = "openjpeg")]
pub use openjpeg::OpenJpeg;
pub use plane_image::{ColorSpace, ComponentPlane, ImageHeader, PlaneImage};
pub use quality::{CompressionRateLadder, EncodeParameters, ProgressionOrder, Quality};
pub use session::{CodecSession, SessionState};
pub use signature::{ContainerKind, FormatTag};
pub use stream::{
    ByteHandle, MemoryHandle, SeekableHandle, SequentialReader, SequentialWriter, StreamAdapter,
};
