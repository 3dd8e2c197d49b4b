//! OpenJPEG compressor and decompressor stages.

use super::image::NativeImage;
use super::stream::NativeStream;
use super::sys;
use crate::codec::{Codec, Compress, Decompress};
use crate::error::Jp2Error;
use crate::plane_image::{ImageHeader, PlaneImage};
use crate::quality::EncodeParameters;
use crate::signature::ContainerKind;
use crate::stream::StreamAdapter;
use std::ffi::{CStr, CString, c_char, c_void};
use std::mem;
use std::ptr::{self, NonNull};

/// The OpenJPEG library as a [`Codec`].
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenJpeg;

impl Codec for OpenJpeg {
    fn decompressor<'s>(
        &self,
        kind: ContainerKind,
        stream: StreamAdapter<'s>,
    ) -> Result<Box<dyn Decompress + 's>, Jp2Error> {
        Ok(Box::new(Decompressor::new(kind, stream)?))
    }

    fn compressor<'s>(
        &self,
        kind: ContainerKind,
        image: &PlaneImage,
        parameters: &EncodeParameters,
        stream: StreamAdapter<'s>,
    ) -> Result<Box<dyn Compress + 's>, Jp2Error> {
        Ok(Box::new(Compressor::new(kind, image, parameters, stream)?))
    }
}

/// Receives OpenJPEG's diagnostics and remembers the last error.
#[derive(Default)]
struct MessageSink {
    last_error: Option<String>,
}

struct Messages(NonNull<MessageSink>);

impl Messages {
    fn new() -> Self {
        Self(NonNull::from(Box::leak(Box::<MessageSink>::default())))
    }

    /// The last error OpenJPEG reported, or `fallback`.
    fn reason(&self, fallback: &str) -> String {
        unsafe { (*self.0.as_ptr()).last_error.take() }.unwrap_or_else(|| fallback.to_string())
    }
}

impl Drop for Messages {
    fn drop(&mut self) {
        drop(unsafe { Box::from_raw(self.0.as_ptr()) });
    }
}

unsafe fn message_text(msg: *const c_char) -> String {
    if msg.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(msg) }
        .to_string_lossy()
        .trim_end()
        .to_string()
}

unsafe extern "C" fn error_handler(msg: *const c_char, user: *mut c_void) {
    let text = unsafe { message_text(msg) };
    log::error!("openjpeg: {text}");
    if let Some(sink) = unsafe { user.cast::<MessageSink>().as_mut() } {
        sink.last_error = Some(text);
    }
}

unsafe extern "C" fn warning_handler(msg: *const c_char, _user: *mut c_void) {
    log::warn!("openjpeg: {}", unsafe { message_text(msg) });
}

unsafe extern "C" fn info_handler(msg: *const c_char, _user: *mut c_void) {
    log::info!("openjpeg: {}", unsafe { message_text(msg) });
}

struct CodecHandle(NonNull<sys::opj_codec_t>);

impl CodecHandle {
    fn decompress(kind: ContainerKind, messages: &Messages) -> Result<Self, Jp2Error> {
        let raw = unsafe { sys::opj_create_decompress(kind.into()) };
        Self::wrap(raw, messages, "can't create decompressor")
    }

    fn compress(kind: ContainerKind, messages: &Messages) -> Result<Self, Jp2Error> {
        let raw = unsafe { sys::opj_create_compress(kind.into()) };
        Self::wrap(raw, messages, "can't create compressor")
    }

    fn wrap(
        raw: *mut sys::opj_codec_t,
        messages: &Messages,
        failure: &str,
    ) -> Result<Self, Jp2Error> {
        let handle = NonNull::new(raw)
            .map(Self)
            .ok_or_else(|| Jp2Error::CodecSetup(failure.to_string()))?;
        let user = messages.0.as_ptr().cast::<c_void>();
        unsafe {
            sys::opj_set_error_handler(handle.as_ptr(), Some(error_handler), user);
            sys::opj_set_warning_handler(handle.as_ptr(), Some(warning_handler), user);
            sys::opj_set_info_handler(handle.as_ptr(), Some(info_handler), user);
        }
        Ok(handle)
    }

    fn as_ptr(&self) -> *mut sys::opj_codec_t {
        self.0.as_ptr()
    }
}

impl Drop for CodecHandle {
    fn drop(&mut self) {
        unsafe { sys::opj_destroy_codec(self.0.as_ptr()) };
    }
}

// Fields drop in declaration order: image, codec, then the stream and its
// adapter, and the message sink last since the codec points at it.
struct Decompressor<'s> {
    image: Option<NativeImage>,
    codec: CodecHandle,
    stream: NativeStream<'s>,
    messages: Messages,
}

impl<'s> Decompressor<'s> {
    fn new(kind: ContainerKind, adapter: StreamAdapter<'s>) -> Result<Self, Jp2Error> {
        let messages = Messages::new();
        let codec = CodecHandle::decompress(kind, &messages)?;

        let mut parameters: sys::opj_dparameters_t = unsafe { mem::zeroed() };
        unsafe { sys::opj_set_default_decoder_parameters(&mut parameters) };
        if unsafe { sys::opj_setup_decoder(codec.as_ptr(), &mut parameters) } == 0 {
            return Err(Jp2Error::CodecSetup(
                messages.reason("decoder rejected its parameters"),
            ));
        }

        let stream = NativeStream::new(adapter)?;
        Ok(Self {
            image: None,
            codec,
            stream,
            messages,
        })
    }
}

impl Decompress for Decompressor<'_> {
    fn read_header(&mut self) -> Result<ImageHeader, Jp2Error> {
        let mut raw: *mut sys::opj_image_t = ptr::null_mut();
        let ok = unsafe { sys::opj_read_header(self.stream.as_ptr(), self.codec.as_ptr(), &mut raw) };
        // The image may exist even when the header was rejected.
        let image = unsafe { NativeImage::from_raw(raw) };
        if ok == 0 {
            return Err(Jp2Error::HeaderRead(self.messages.reason("can't read header")));
        }
        let image =
            image.ok_or_else(|| Jp2Error::HeaderRead("codec returned no image".to_string()))?;
        let header = image.header();
        self.image = Some(image);
        Ok(header)
    }

    fn decode(&mut self) -> Result<(), Jp2Error> {
        let image = self
            .image
            .as_ref()
            .ok_or_else(|| Jp2Error::Decode("header has not been read".to_string()))?;
        let ok = unsafe {
            sys::opj_decode(self.codec.as_ptr(), self.stream.as_ptr(), image.as_ptr())
        };
        if ok == 0 {
            return Err(Jp2Error::Decode(self.messages.reason("can't decode image")));
        }
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<PlaneImage, Jp2Error> {
        let ok = unsafe { sys::opj_end_decompress(self.codec.as_ptr(), self.stream.as_ptr()) };
        if ok == 0 {
            return Err(Jp2Error::Decode(
                self.messages.reason("can't finish decompression"),
            ));
        }
        let image = self
            .image
            .take()
            .ok_or_else(|| Jp2Error::Decode("header has not been read".to_string()))?;
        image.to_planes()
    }
}

struct Compressor<'s> {
    image: NativeImage,
    codec: CodecHandle,
    stream: NativeStream<'s>,
    messages: Messages,
    // Referenced by the codec parameters until the codec is destroyed.
    _comment: CString,
}

impl<'s> Compressor<'s> {
    fn new(
        kind: ContainerKind,
        image: &PlaneImage,
        parameters: &EncodeParameters,
        adapter: StreamAdapter<'s>,
    ) -> Result<Self, Jp2Error> {
        let messages = Messages::new();
        let codec = CodecHandle::compress(kind, &messages)?;
        let native = NativeImage::from_planes(image)?;
        let comment = CString::new(parameters.comment.as_str())
            .map_err(|_| Jp2Error::CodecSetup("comment contains a NUL byte".to_string()))?;

        let mut cparameters: sys::opj_cparameters_t = unsafe { mem::zeroed() };
        unsafe { sys::opj_set_default_encoder_parameters(&mut cparameters) };
        let rates = parameters.rates.rates();
        let layers = parameters
            .layer_count
            .min(rates.len())
            .min(cparameters.tcp_rates.len());
        for (slot, rate) in cparameters.tcp_rates.iter_mut().zip(rates).take(layers) {
            *slot = *rate as f32;
        }
        cparameters.tcp_numlayers = layers as _;
        cparameters.cp_disto_alloc = 1;
        cparameters.irreversible = parameters.irreversible as _;
        cparameters.tcp_mct = parameters.multi_component_transform as _;
        cparameters.numresolution = parameters.resolution_levels as _;
        cparameters.prog_order = parameters.progression_order.into();
        cparameters.cblockw_init = parameters.code_block_width as _;
        cparameters.cblockh_init = parameters.code_block_height as _;
        cparameters.cp_comment = comment.as_ptr().cast_mut();

        let ok = unsafe {
            sys::opj_setup_encoder(codec.as_ptr(), &mut cparameters, native.as_ptr())
        };
        if ok == 0 {
            return Err(Jp2Error::CodecSetup(
                messages.reason("encoder rejected its parameters"),
            ));
        }

        let stream = NativeStream::new(adapter)?;
        Ok(Self {
            image: native,
            codec,
            stream,
            messages,
            _comment: comment,
        })
    }
}

impl Compress for Compressor<'_> {
    fn start(&mut self) -> Result<(), Jp2Error> {
        let ok = unsafe {
            sys::opj_start_compress(
                self.codec.as_ptr(),
                self.image.as_ptr(),
                self.stream.as_ptr(),
            )
        };
        if ok == 0 {
            return Err(Jp2Error::Compress(
                self.messages.reason("can't start compression"),
            ));
        }
        Ok(())
    }

    fn encode(&mut self) -> Result<(), Jp2Error> {
        if unsafe { sys::opj_encode(self.codec.as_ptr(), self.stream.as_ptr()) } == 0 {
            return Err(Jp2Error::Compress(self.messages.reason("can't encode image")));
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<(), Jp2Error> {
        if unsafe { sys::opj_end_compress(self.codec.as_ptr(), self.stream.as_ptr()) } == 0 {
            return Err(Jp2Error::Compress(
                self.messages.reason("can't finish compression"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryHandle;

    #[test]
    fn test_error_handler_records_reason() {
        let messages = Messages::new();
        let text = CString::new("Stream too short\n").unwrap();
        unsafe { error_handler(text.as_ptr(), messages.0.as_ptr().cast()) };
        assert_eq!(messages.reason("fallback"), "Stream too short");
        assert_eq!(messages.reason("fallback"), "fallback");
    }

    #[test]
    fn test_garbage_header_is_rejected() {
        let mut data = crate::constants::J2K_CODESTREAM_SIGNATURE.to_vec();
        data.extend_from_slice(&[0u8; 16]);
        let mut handle = MemoryHandle::from_bytes(data);
        let mut decompressor = OpenJpeg
            .decompressor(ContainerKind::J2k, StreamAdapter::input(&mut handle))
            .unwrap();
        assert!(matches!(
            decompressor.read_header(),
            Err(Jp2Error::HeaderRead(_))
        ));
    }
}
