//! `opj_stream_t` backed by a [`StreamAdapter`].
//!
//! The adapter is boxed and its address handed to OpenJPEG as user data. Only the
//! callbacks the adapter's capabilities allow are registered; OpenJPEG's defaults
//! for the rest report failure.

use super::sys;
use crate::error::Jp2Error;
use crate::stream::{StreamAdapter, StreamDirection};
use std::ffi::c_void;
use std::ptr::NonNull;
use std::slice;

/// Internal buffer size OpenJPEG uses between callback invocations.
const STREAM_BUFFER_SIZE: usize = 1 << 20;

/// Input length reported when the handle cannot tell. OpenJPEG asserts on a
/// zero length once it reads past the first box, so it must never be left unset.
const UNKNOWN_INPUT_LENGTH: u64 = u64::MAX / 2;

/// Length to report to OpenJPEG for an input whose advisory estimate is `remaining`.
fn input_length(remaining: u64) -> u64 {
    if remaining == 0 {
        UNKNOWN_INPUT_LENGTH
    } else {
        remaining
    }
}

pub(crate) struct NativeStream<'s> {
    stream: NonNull<sys::opj_stream_t>,
    adapter: *mut StreamAdapter<'s>,
}

impl<'s> NativeStream<'s> {
    pub(crate) fn new(adapter: StreamAdapter<'s>) -> Result<Self, Jp2Error> {
        let is_input = adapter.direction() == StreamDirection::Input;
        let capabilities = adapter.capabilities();
        let remaining = adapter.remaining_estimate();

        let raw = unsafe { sys::opj_stream_create(STREAM_BUFFER_SIZE as _, is_input as _) };
        let stream = NonNull::new(raw)
            .ok_or_else(|| Jp2Error::CodecSetup("can't create codec stream".to_string()))?;
        let native = Self {
            stream,
            adapter: Box::into_raw(Box::new(adapter)),
        };

        let s = native.as_ptr();
        unsafe {
            if capabilities.read {
                sys::opj_stream_set_read_function(s, Some(read_callback));
            }
            if capabilities.write {
                sys::opj_stream_set_write_function(s, Some(write_callback));
            }
            if capabilities.skip {
                sys::opj_stream_set_skip_function(s, Some(skip_callback));
            }
            if capabilities.seek {
                sys::opj_stream_set_seek_function(s, Some(seek_callback));
            }
            sys::opj_stream_set_user_data(s, native.adapter.cast(), Some(release_callback));
            if is_input {
                sys::opj_stream_set_user_data_length(s, input_length(remaining));
            }
        }
        Ok(native)
    }

    pub(crate) fn as_ptr(&self) -> *mut sys::opj_stream_t {
        self.stream.as_ptr()
    }
}

impl Drop for NativeStream<'_> {
    fn drop(&mut self) {
        unsafe {
            sys::opj_stream_destroy(self.stream.as_ptr());
            drop(Box::from_raw(self.adapter));
        }
    }
}

/// # Safety
/// `user` must be the adapter registered by [`NativeStream::new`].
unsafe fn adapter<'a>(user: *mut c_void) -> &'a mut StreamAdapter<'a> {
    unsafe { &mut *user.cast::<StreamAdapter<'a>>() }
}

unsafe extern "C" fn read_callback(
    buffer: *mut c_void,
    count: sys::OPJ_SIZE_T,
    user: *mut c_void,
) -> sys::OPJ_SIZE_T {
    let adapter = unsafe { adapter(user) };
    let buf = unsafe { slice::from_raw_parts_mut(buffer.cast::<u8>(), count as usize) };
    match adapter.read(buf) {
        Some(n) => n as sys::OPJ_SIZE_T,
        None => sys::OPJ_SIZE_T::MAX,
    }
}

unsafe extern "C" fn write_callback(
    buffer: *mut c_void,
    count: sys::OPJ_SIZE_T,
    user: *mut c_void,
) -> sys::OPJ_SIZE_T {
    let adapter = unsafe { adapter(user) };
    let buf = unsafe { slice::from_raw_parts(buffer.cast::<u8>(), count as usize) };
    match adapter.write(buf) {
        // OpenJPEG retries a zero-length write forever; report it as its error value.
        0 if count > 0 => sys::OPJ_SIZE_T::MAX,
        n => n as sys::OPJ_SIZE_T,
    }
}

unsafe extern "C" fn skip_callback(count: sys::OPJ_OFF_T, user: *mut c_void) -> sys::OPJ_OFF_T {
    let adapter = unsafe { adapter(user) };
    adapter.skip(count).unwrap_or(-1)
}

unsafe extern "C" fn seek_callback(position: sys::OPJ_OFF_T, user: *mut c_void) -> sys::OPJ_BOOL {
    let adapter = unsafe { adapter(user) };
    (position >= 0 && adapter.seek(position as u64)) as sys::OPJ_BOOL
}

// The adapter is owned by `NativeStream`, never by OpenJPEG.
unsafe extern "C" fn release_callback(_user: *mut c_void) {}
