//! Conversion between [`Bitmap`] pixels and codec component planes.
//!
//! Encoding splits each pixel into 8-bit unsigned planes (gray, or red/green/blue
//! with an optional alpha plane). Decoding reassembles 1, 3 or 4 planes into an
//! indexed grayscale, opaque RGB or RGB-with-alpha bitmap.
//!
//! Gray+alpha input has no 2-component output: indexed gray bitmaps keep one plane
//! and lose their alpha, while packed gray+alpha pixels are written as 4 planes.

use crate::bitmap::{Bitmap, PixelFormat, alpha, blue, green, red};
use crate::constants::SAMPLE_PRECISION;
use crate::error::Jp2Error;
use crate::plane_image::{ColorSpace, ComponentPlane, PlaneImage};

/// Number of planes a bitmap is split into.
pub fn component_count_for(bitmap: &Bitmap) -> usize {
    let count = match bitmap.format() {
        PixelFormat::Mono | PixelFormat::Gray8 => 1,
        PixelFormat::Indexed8 if bitmap.is_grayscale() => 1,
        PixelFormat::Indexed8 | PixelFormat::Rgb32 | PixelFormat::Argb32 => 3,
    };
    if !bitmap.has_alpha_channel() {
        return count;
    }
    if count == 1 {
        log::warn!("alpha channel of a grayscale bitmap is not preserved");
        count
    } else {
        4
    }
}

/// Splits `bitmap` into component planes for encoding.
pub fn to_component_planes(bitmap: &Bitmap) -> Result<PlaneImage, Jp2Error> {
    let count = component_count_for(bitmap);
    let width = bitmap.width();
    let height = bitmap.height();

    let mut planes = Vec::new();
    planes
        .try_reserve_exact(count)
        .map_err(|_| Jp2Error::AllocationFailed)?;
    for index in 0..count {
        let mut plane = ComponentPlane::new(width, height, SAMPLE_PRECISION).inspect_err(|e| {
            log::warn!("can't create {width}x{height} component plane: {e}");
        })?;
        plane.is_alpha = index == 3;
        planes.push(plane);
    }

    let w = width as usize;
    for y in 0..height {
        let row = y as usize * w;
        for x in 0..width {
            let i = row + x as usize;
            if count == 1 {
                planes[0].samples[i] = bitmap.gray_at(x, y) as i32;
                continue;
            }
            let pixel = bitmap.pixel(x, y);
            planes[0].samples[i] = red(pixel) as i32;
            planes[1].samples[i] = green(pixel) as i32;
            planes[2].samples[i] = blue(pixel) as i32;
            if count == 4 {
                planes[3].samples[i] = alpha(pixel) as i32;
            }
        }
    }

    Ok(PlaneImage {
        color_space: if count <= 2 {
            ColorSpace::Gray
        } else {
            ColorSpace::Srgb
        },
        planes,
    })
}

/// Maps one plane's samples into 0..=255.
#[derive(Debug, Clone, Copy)]
struct SampleScale {
    offset: i64,
    precision: u32,
}

impl SampleScale {
    fn for_plane(plane: &ComponentPlane) -> Self {
        let precision = plane.precision.clamp(1, 31);
        Self {
            offset: if plane.signed { 1 << (precision - 1) } else { 0 },
            precision,
        }
    }

    #[inline]
    fn apply(self, sample: i32) -> u8 {
        let value = sample as i64 + self.offset;
        let scaled = match self.precision {
            8 => value,
            p if p > 8 => value >> (p - 8),
            p => value * 255 / ((1 << p) - 1),
        };
        scaled.clamp(0, 255) as u8
    }
}

/// Reassembles decoded planes into a bitmap.
pub fn from_component_planes(image: &PlaneImage) -> Result<Bitmap, Jp2Error> {
    let count = image.component_count();
    if !matches!(count, 1 | 3 | 4) {
        log::warn!("unsupported component count {count}");
        return Err(Jp2Error::UnsupportedComponentCount(count));
    }
    image.validate()?;

    let (width, height) = image.dimensions();
    let format = match count {
        1 => PixelFormat::Indexed8,
        3 => PixelFormat::Rgb32,
        _ => PixelFormat::Argb32,
    };
    // Indexed bitmaps come with the identity grayscale table installed.
    let mut bitmap = Bitmap::new(width, height, format)?;

    let scales: Vec<SampleScale> = image.planes.iter().map(SampleScale::for_plane).collect();
    let w = width as usize;
    for y in 0..height {
        let row = y as usize * w;
        let line = bitmap.scan_line_mut(y);
        if count == 1 {
            let gray = &image.planes[0].samples[row..row + w];
            for (dst, &sample) in line.iter_mut().zip(gray) {
                *dst = scales[0].apply(sample);
            }
            continue;
        }
        for (x, px) in line.chunks_exact_mut(4).enumerate() {
            let i = row + x;
            // Packed pixels are stored B, G, R, A.
            px[0] = scales[2].apply(image.planes[2].samples[i]);
            px[1] = scales[1].apply(image.planes[1].samples[i]);
            px[2] = scales[0].apply(image.planes[0].samples[i]);
            px[3] = if count == 4 {
                scales[3].apply(image.planes[3].samples[i])
            } else {
                0xFF
            };
        }
    }
    Ok(bitmap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::{argb, grayscale_color_table, rgb};

    fn rgb_2x2() -> Bitmap {
        // B, G, R, A per pixel.
        let data = vec![
            3, 2, 1, 0xFF, 6, 5, 4, 0xFF, //
            9, 8, 7, 0xFF, 12, 11, 10, 0xFF,
        ];
        Bitmap::from_raw(2, 2, PixelFormat::Rgb32, data).unwrap()
    }

    #[test]
    fn test_rgb_splits_into_three_planes() {
        let image = to_component_planes(&rgb_2x2()).unwrap();
        assert_eq!(image.component_count(), 3);
        assert_eq!(image.color_space, ColorSpace::Srgb);
        assert_eq!(image.planes[0].samples, vec![1, 4, 7, 10]);
        assert_eq!(image.planes[1].samples, vec![2, 5, 8, 11]);
        assert_eq!(image.planes[2].samples, vec![3, 6, 9, 12]);
        for plane in &image.planes {
            assert_eq!((plane.width, plane.height), (2, 2));
            assert_eq!(plane.precision, 8);
            assert_eq!((plane.dx, plane.dy), (1, 1));
            assert!(!plane.signed);
            assert!(!plane.is_alpha);
        }
    }

    #[test]
    fn test_alpha_adds_fourth_plane() {
        let data = vec![
            3, 2, 1, 10, 6, 5, 4, 20, //
            9, 8, 7, 30, 12, 11, 10, 40,
        ];
        let bitmap = Bitmap::from_raw(2, 2, PixelFormat::Argb32, data).unwrap();
        let image = to_component_planes(&bitmap).unwrap();
        assert_eq!(image.component_count(), 4);
        assert!(image.planes[3].is_alpha);
        assert!(!image.planes[0].is_alpha);
        assert_eq!(image.planes[3].samples, vec![10, 20, 30, 40]);
        assert_eq!(image.planes[0].samples, vec![1, 4, 7, 10]);
    }

    #[test]
    fn test_gray_formats_use_one_plane() {
        let gray = Bitmap::from_raw(2, 1, PixelFormat::Gray8, vec![17, 250]).unwrap();
        let image = to_component_planes(&gray).unwrap();
        assert_eq!(image.component_count(), 1);
        assert_eq!(image.color_space, ColorSpace::Gray);
        assert_eq!(image.planes[0].samples, vec![17, 250]);

        let mono = Bitmap::from_raw(3, 1, PixelFormat::Mono, vec![0b0100_0000]).unwrap();
        assert_eq!(
            to_component_planes(&mono).unwrap().planes[0].samples,
            vec![0, 255, 0]
        );

        let indexed = Bitmap::from_raw(2, 1, PixelFormat::Indexed8, vec![5, 200]).unwrap();
        assert_eq!(
            to_component_planes(&indexed).unwrap().planes[0].samples,
            vec![5, 200]
        );
    }

    #[test]
    fn test_indexed_color_uses_three_planes() {
        let bitmap = Bitmap::from_raw(2, 1, PixelFormat::Indexed8, vec![1, 0])
            .unwrap()
            .with_color_table(vec![rgb(10, 20, 30), rgb(40, 50, 60)])
            .unwrap();
        let image = to_component_planes(&bitmap).unwrap();
        assert_eq!(image.component_count(), 3);
        assert_eq!(image.planes[0].samples, vec![40, 10]);
        assert_eq!(image.planes[2].samples, vec![60, 30]);
    }

    #[test]
    fn test_indexed_gray_with_alpha_drops_alpha() {
        let mut table = grayscale_color_table();
        table[0] = argb(0, 0, 0, 0);
        let bitmap = Bitmap::from_raw(1, 1, PixelFormat::Indexed8, vec![0])
            .unwrap()
            .with_color_table(table)
            .unwrap();
        assert_eq!(component_count_for(&bitmap), 1);
    }

    #[test]
    fn test_indexed_color_with_alpha_uses_four_planes() {
        let bitmap = Bitmap::from_raw(1, 1, PixelFormat::Indexed8, vec![0])
            .unwrap()
            .with_color_table(vec![argb(7, 200, 0, 0)])
            .unwrap();
        let image = to_component_planes(&bitmap).unwrap();
        assert_eq!(image.component_count(), 4);
        assert_eq!(image.planes[3].samples, vec![7]);
    }

    #[test]
    fn test_decode_rejects_unsupported_counts() {
        let plane = ComponentPlane::new(2, 2, 8).unwrap();
        for count in [0usize, 2, 5] {
            let image = PlaneImage {
                color_space: ColorSpace::Srgb,
                planes: vec![plane.clone(); count],
            };
            assert!(matches!(
                from_component_planes(&image),
                Err(Jp2Error::UnsupportedComponentCount(n)) if n == count
            ));
        }
    }

    #[test]
    fn test_decode_rejects_empty_geometry() {
        let image = PlaneImage {
            color_space: ColorSpace::Gray,
            planes: vec![ComponentPlane::new(0, 4, 8).unwrap()],
        };
        assert!(matches!(
            from_component_planes(&image),
            Err(Jp2Error::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_decode_single_plane_to_indexed_gray() {
        let mut plane = ComponentPlane::new(2, 1, 8).unwrap();
        plane.samples = vec![3, 254];
        let image = PlaneImage {
            color_space: ColorSpace::Gray,
            planes: vec![plane],
        };
        let bitmap = from_component_planes(&image).unwrap();
        assert_eq!(bitmap.format(), PixelFormat::Indexed8);
        assert_eq!(bitmap.data(), &[3, 254]);
        assert_eq!(bitmap.color_table(), grayscale_color_table().as_slice());
    }

    #[test]
    fn test_planes_round_trip() {
        let source = rgb_2x2();
        let bitmap = from_component_planes(&to_component_planes(&source).unwrap()).unwrap();
        assert_eq!(bitmap.format(), PixelFormat::Rgb32);
        for y in 0..2 {
            for x in 0..2 {
                assert_eq!(bitmap.pixel(x, y), source.pixel(x, y));
            }
        }
    }

    #[test]
    fn test_decode_normalizes_precision() {
        let mut wide = ComponentPlane::new(2, 1, 12).unwrap();
        wide.samples = vec![4095, 16];
        let image = PlaneImage {
            color_space: ColorSpace::Gray,
            planes: vec![wide],
        };
        assert_eq!(from_component_planes(&image).unwrap().data(), &[255, 1]);

        let mut signed = ComponentPlane::new(2, 1, 8).unwrap();
        signed.signed = true;
        signed.samples = vec![-128, 127];
        let image = PlaneImage {
            color_space: ColorSpace::Gray,
            planes: vec![signed],
        };
        assert_eq!(from_component_planes(&image).unwrap().data(), &[0, 255]);

        let mut bilevel = ComponentPlane::new(2, 1, 1).unwrap();
        bilevel.samples = vec![0, 1];
        let image = PlaneImage {
            color_space: ColorSpace::Gray,
            planes: vec![bilevel],
        };
        assert_eq!(from_component_planes(&image).unwrap().data(), &[0, 255]);
    }
}
