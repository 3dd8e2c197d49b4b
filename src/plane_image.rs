//! The codec-side image model: one flat sample array per component.

use crate::error::Jp2Error;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Image color space, numbered as in the OpenJPEG image model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum ColorSpace {
    Unknown = -1,
    Unspecified = 0,
    Srgb = 1,
    Gray = 2,
    Sycc = 3,
    Eycc = 4,
    Cmyk = 5,
}

impl Default for ColorSpace {
    fn default() -> Self {
        Self::Unspecified
    }
}

/// A single component plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentPlane {
    /// Sample precision in bits.
    pub precision: u32,
    pub signed: bool,
    /// Horizontal subsampling factor.
    pub dx: u32,
    /// Vertical subsampling factor.
    pub dy: u32,
    pub width: u32,
    pub height: u32,
    /// True for the opacity channel.
    pub is_alpha: bool,
    /// `width * height` samples in row-major order.
    pub samples: Vec<i32>,
}

impl ComponentPlane {
    /// Zero-filled unsigned plane with 1x1 sampling.
    ///
    /// Reports [`Jp2Error::AllocationFailed`] instead of aborting when the sample
    /// buffer cannot be reserved.
    pub fn new(width: u32, height: u32, precision: u32) -> Result<Self, Jp2Error> {
        let count = (width as usize)
            .checked_mul(height as usize)
            .ok_or(Jp2Error::InvalidDimensions { width, height })?;
        let mut samples = Vec::new();
        samples
            .try_reserve_exact(count)
            .map_err(|_| Jp2Error::AllocationFailed)?;
        samples.resize(count, 0);
        Ok(Self {
            precision,
            signed: false,
            dx: 1,
            dy: 1,
            width,
            height,
            is_alpha: false,
            samples,
        })
    }

    pub fn sample_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// An ordered set of component planes sharing one geometry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlaneImage {
    pub color_space: ColorSpace,
    pub planes: Vec<ComponentPlane>,
}

impl PlaneImage {
    pub fn component_count(&self) -> usize {
        self.planes.len()
    }

    /// Geometry of the first plane; `(0, 0)` for an empty image.
    pub fn dimensions(&self) -> (u32, u32) {
        self.planes
            .first()
            .map(|p| (p.width, p.height))
            .unwrap_or((0, 0))
    }

    pub fn has_alpha(&self) -> bool {
        self.planes.iter().any(|p| p.is_alpha)
    }

    /// Checks that every plane matches the first plane's geometry and sample count.
    pub fn validate(&self) -> Result<(), Jp2Error> {
        let (width, height) = self.dimensions();
        if width == 0 || height == 0 {
            return Err(Jp2Error::InvalidDimensions { width, height });
        }
        for (index, plane) in self.planes.iter().enumerate() {
            if plane.width != width
                || plane.height != height
                || plane.samples.len() != plane.sample_count()
            {
                return Err(Jp2Error::PlaneMismatch(index));
            }
        }
        Ok(())
    }
}

/// Header facts reported by the codec before the samples are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub width: u32,
    pub height: u32,
    pub component_count: usize,
    pub color_space: ColorSpace,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_space_numbering() {
        assert_eq!(i32::from(ColorSpace::Gray), 2);
        assert_eq!(ColorSpace::try_from(1).unwrap(), ColorSpace::Srgb);
        assert!(ColorSpace::try_from(9).is_err());
    }

    #[test]
    fn test_validate_geometry() {
        let plane = ComponentPlane::new(3, 2, 8).unwrap();
        assert_eq!(plane.samples.len(), 6);
        assert_eq!((plane.dx, plane.dy, plane.signed), (1, 1, false));

        let mut image = PlaneImage {
            color_space: ColorSpace::Srgb,
            planes: vec![plane.clone(), plane.clone(), plane],
        };
        assert!(image.validate().is_ok());

        image.planes[2].samples.pop();
        assert!(matches!(image.validate(), Err(Jp2Error::PlaneMismatch(2))));

        let empty = PlaneImage::default();
        assert!(matches!(
            empty.validate(),
            Err(Jp2Error::InvalidDimensions { .. })
        ));
    }
}
