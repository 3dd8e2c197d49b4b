//! Owned `opj_image_t` and its conversion to and from [`PlaneImage`].

use super::sys;
use crate::error::Jp2Error;
use crate::plane_image::{ColorSpace, ComponentPlane, ImageHeader, PlaneImage};
use std::mem;
use std::ptr::NonNull;
use std::slice;

impl From<ColorSpace> for sys::COLOR_SPACE {
    fn from(color_space: ColorSpace) -> Self {
        match color_space {
            ColorSpace::Unknown => sys::COLOR_SPACE::OPJ_CLRSPC_UNKNOWN,
            ColorSpace::Unspecified => sys::COLOR_SPACE::OPJ_CLRSPC_UNSPECIFIED,
            ColorSpace::Srgb => sys::COLOR_SPACE::OPJ_CLRSPC_SRGB,
            ColorSpace::Gray => sys::COLOR_SPACE::OPJ_CLRSPC_GRAY,
            ColorSpace::Sycc => sys::COLOR_SPACE::OPJ_CLRSPC_SYCC,
            ColorSpace::Eycc => sys::COLOR_SPACE::OPJ_CLRSPC_EYCC,
            ColorSpace::Cmyk => sys::COLOR_SPACE::OPJ_CLRSPC_CMYK,
        }
    }
}

impl From<sys::COLOR_SPACE> for ColorSpace {
    fn from(color_space: sys::COLOR_SPACE) -> Self {
        match color_space {
            sys::COLOR_SPACE::OPJ_CLRSPC_UNKNOWN => ColorSpace::Unknown,
            sys::COLOR_SPACE::OPJ_CLRSPC_UNSPECIFIED => ColorSpace::Unspecified,
            sys::COLOR_SPACE::OPJ_CLRSPC_SRGB => ColorSpace::Srgb,
            sys::COLOR_SPACE::OPJ_CLRSPC_GRAY => ColorSpace::Gray,
            sys::COLOR_SPACE::OPJ_CLRSPC_SYCC => ColorSpace::Sycc,
            sys::COLOR_SPACE::OPJ_CLRSPC_EYCC => ColorSpace::Eycc,
            sys::COLOR_SPACE::OPJ_CLRSPC_CMYK => ColorSpace::Cmyk,
        }
    }
}

/// Native image, destroyed on drop.
pub(crate) struct NativeImage(NonNull<sys::opj_image_t>);

impl NativeImage {
    /// Takes ownership of an image allocated by OpenJPEG. Null yields `None`.
    ///
    /// # Safety
    /// `raw` must be null or an image nobody else will destroy.
    pub(crate) unsafe fn from_raw(raw: *mut sys::opj_image_t) -> Option<Self> {
        NonNull::new(raw).map(Self)
    }

    /// Allocates a native image and copies every plane's samples into it.
    pub(crate) fn from_planes(image: &PlaneImage) -> Result<Self, Jp2Error> {
        image.validate()?;
        let (width, height) = image.dimensions();

        let mut parameters: Vec<sys::opj_image_cmptparm_t> = image
            .planes
            .iter()
            .map(|plane| {
                // Plain C struct; all-zero is a valid starting point.
                let mut p: sys::opj_image_cmptparm_t = unsafe { mem::zeroed() };
                p.dx = plane.dx;
                p.dy = plane.dy;
                p.w = plane.width;
                p.h = plane.height;
                p.prec = plane.precision;
                p.sgnd = plane.signed as _;
                p
            })
            .collect();

        let raw = unsafe {
            sys::opj_image_create(
                parameters.len() as _,
                parameters.as_mut_ptr(),
                image.color_space.into(),
            )
        };
        let native = unsafe { Self::from_raw(raw) }.ok_or_else(|| {
            log::warn!("OpenJPEG could not allocate a {width}x{height} image");
            Jp2Error::AllocationFailed
        })?;

        unsafe {
            let img = native.0.as_ptr();
            (*img).x0 = 0;
            (*img).y0 = 0;
            (*img).x1 = width;
            (*img).y1 = height;
            let comps = slice::from_raw_parts_mut((*img).comps, image.component_count());
            for (comp, plane) in comps.iter_mut().zip(&image.planes) {
                if comp.data.is_null() {
                    return Err(Jp2Error::AllocationFailed);
                }
                comp.alpha = plane.is_alpha as _;
                slice::from_raw_parts_mut(comp.data, plane.samples.len())
                    .copy_from_slice(&plane.samples);
            }
        }
        Ok(native)
    }

    pub(crate) fn as_ptr(&self) -> *mut sys::opj_image_t {
        self.0.as_ptr()
    }

    fn components(&self) -> &[sys::opj_image_comp_t] {
        let img = unsafe { self.0.as_ref() };
        if img.comps.is_null() {
            return &[];
        }
        unsafe { slice::from_raw_parts(img.comps, img.numcomps as usize) }
    }

    pub(crate) fn header(&self) -> ImageHeader {
        let img = unsafe { self.0.as_ref() };
        ImageHeader {
            width: img.x1.saturating_sub(img.x0),
            height: img.y1.saturating_sub(img.y0),
            component_count: img.numcomps as usize,
            color_space: img.color_space.into(),
        }
    }

    /// Copies the decoded samples out into owned planes.
    pub(crate) fn to_planes(&self) -> Result<PlaneImage, Jp2Error> {
        let color_space = unsafe { self.0.as_ref() }.color_space.into();
        let mut planes = Vec::new();
        for (index, comp) in self.components().iter().enumerate() {
            if comp.data.is_null() {
                return Err(Jp2Error::Decode(format!("component {index} carries no samples")));
            }
            let count = comp.w as usize * comp.h as usize;
            let source = unsafe { slice::from_raw_parts(comp.data, count) };
            let mut samples = Vec::new();
            samples
                .try_reserve_exact(count)
                .map_err(|_| Jp2Error::AllocationFailed)?;
            samples.extend_from_slice(source);
            planes.push(ComponentPlane {
                precision: comp.prec,
                signed: comp.sgnd != 0,
                dx: comp.dx,
                dy: comp.dy,
                width: comp.w,
                height: comp.h,
                is_alpha: comp.alpha != 0,
                samples,
            });
        }
        Ok(PlaneImage {
            color_space,
            planes,
        })
    }
}

impl Drop for NativeImage {
    fn drop(&mut self) {
        unsafe { sys::opj_image_destroy(self.0.as_ptr()) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_space_mapping_is_symmetric() {
        for cs in [
            ColorSpace::Unknown,
            ColorSpace::Unspecified,
            ColorSpace::Srgb,
            ColorSpace::Gray,
            ColorSpace::Sycc,
            ColorSpace::Eycc,
            ColorSpace::Cmyk,
        ] {
            assert_eq!(ColorSpace::from(sys::COLOR_SPACE::from(cs)), cs);
        }
    }

    #[test]
    fn test_native_image_copies_samples_both_ways() {
        let mut gray = ComponentPlane::new(3, 2, 8).unwrap();
        gray.samples = vec![0, 10, 20, 30, 40, 255];
        let mut alpha = gray.clone();
        alpha.is_alpha = true;
        let image = PlaneImage {
            color_space: ColorSpace::Gray,
            planes: vec![gray, alpha],
        };

        let native = NativeImage::from_planes(&image).unwrap();
        let header = native.header();
        assert_eq!((header.width, header.height), (3, 2));
        assert_eq!(header.component_count, 2);
        assert_eq!(header.color_space, ColorSpace::Gray);
        assert_eq!(native.to_planes().unwrap(), image);
    }

    #[test]
    fn test_null_image_is_not_owned() {
        assert!(unsafe { NativeImage::from_raw(std::ptr::null_mut()) }.is_none());
    }
}
