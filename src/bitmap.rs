//! In-memory raster bitmap, the caller-side image representation.
//!
//! Packed 32-bit formats store each pixel as a native `0xAARRGGBB` word in
//! little-endian byte order, i.e. bytes `B, G, R, A` in memory. Indexed and
//! monochrome formats look their samples up in an `0xAARRGGBB` color table.

use crate::error::Jp2Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 1 bit per pixel, most significant bit first, two-entry color table.
    Mono,
    /// 8-bit index into a color table of up to 256 entries.
    Indexed8,
    /// 8-bit gray level.
    Gray8,
    /// Opaque 32-bit RGB; the alpha byte is ignored and reads back as 0xFF.
    Rgb32,
    /// 32-bit RGB with straight (non-premultiplied) alpha.
    Argb32,
}

impl PixelFormat {
    pub fn bytes_per_line(self, width: u32) -> usize {
        let width = width as usize;
        match self {
            Self::Mono => width.div_ceil(8),
            Self::Indexed8 | Self::Gray8 => width,
            Self::Rgb32 | Self::Argb32 => width * 4,
        }
    }
}

#[inline]
pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

#[inline]
pub const fn rgb(r: u8, g: u8, b: u8) -> u32 {
    argb(0xFF, r, g, b)
}

#[inline]
pub const fn alpha(pixel: u32) -> u8 {
    (pixel >> 24) as u8
}

#[inline]
pub const fn red(pixel: u32) -> u8 {
    (pixel >> 16) as u8
}

#[inline]
pub const fn green(pixel: u32) -> u8 {
    (pixel >> 8) as u8
}

#[inline]
pub const fn blue(pixel: u32) -> u8 {
    pixel as u8
}

/// Luminance with integer weights 11/16/5 over 32.
#[inline]
pub const fn gray(pixel: u32) -> u8 {
    ((red(pixel) as u32 * 11 + green(pixel) as u32 * 16 + blue(pixel) as u32 * 5) / 32) as u8
}

/// Identity grayscale table: entry `i` is opaque `(i, i, i)`.
pub fn grayscale_color_table() -> Vec<u32> {
    (0..=255u8).map(|v| rgb(v, v, v)).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    format: PixelFormat,
    bytes_per_line: usize,
    data: Vec<u8>,
    color_table: Vec<u32>,
}

impl Bitmap {
    /// Zero-filled bitmap. Indexed and mono bitmaps start with a grayscale table.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Self, Jp2Error> {
        if width == 0 || height == 0 {
            return Err(Jp2Error::InvalidDimensions { width, height });
        }
        let bytes_per_line = format.bytes_per_line(width);
        let size = bytes_per_line
            .checked_mul(height as usize)
            .ok_or(Jp2Error::InvalidDimensions { width, height })?;
        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|_| Jp2Error::AllocationFailed)?;
        data.resize(size, 0);

        let color_table = match format {
            PixelFormat::Mono => vec![rgb(0, 0, 0), rgb(255, 255, 255)],
            PixelFormat::Indexed8 => grayscale_color_table(),
            _ => Vec::new(),
        };
        Ok(Self {
            width,
            height,
            format,
            bytes_per_line,
            data,
            color_table,
        })
    }

    /// Wraps tightly packed rows of `format`.
    pub fn from_raw(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self, Jp2Error> {
        let mut bitmap = Self::new(width, height, format)?;
        if data.len() != bitmap.data.len() {
            return Err(Jp2Error::InvalidBitmap(format!(
                "{}x{} {:?} needs {} bytes, got {}",
                width,
                height,
                format,
                bitmap.data.len(),
                data.len()
            )));
        }
        bitmap.data = data;
        Ok(bitmap)
    }

    pub fn with_color_table(mut self, color_table: Vec<u32>) -> Result<Self, Jp2Error> {
        let limit = match self.format {
            PixelFormat::Mono => 2,
            PixelFormat::Indexed8 => 256,
            _ => {
                return Err(Jp2Error::InvalidBitmap(format!(
                    "{:?} bitmaps carry no color table",
                    self.format
                )));
            }
        };
        if color_table.is_empty() || color_table.len() > limit {
            return Err(Jp2Error::InvalidBitmap(format!(
                "color table of {} entries for {:?}",
                color_table.len(),
                self.format
            )));
        }
        self.color_table = color_table;
        Ok(self)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn bytes_per_line(&self) -> usize {
        self.bytes_per_line
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn color_table(&self) -> &[u32] {
        &self.color_table
    }

    /// Row `y` as stored, `bytes_per_line` bytes long.
    ///
    /// # Panics
    /// Panics if `y >= height`.
    pub fn scan_line(&self, y: u32) -> &[u8] {
        let start = y as usize * self.bytes_per_line;
        &self.data[start..start + self.bytes_per_line]
    }

    /// # Panics
    /// Panics if `y >= height`.
    pub fn scan_line_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.bytes_per_line;
        &mut self.data[start..start + self.bytes_per_line]
    }

    /// True when every pixel is a shade of gray.
    pub fn is_grayscale(&self) -> bool {
        match self.format {
            PixelFormat::Gray8 => true,
            PixelFormat::Mono | PixelFormat::Indexed8 => self
                .color_table
                .iter()
                .all(|&c| red(c) == green(c) && green(c) == blue(c)),
            PixelFormat::Rgb32 | PixelFormat::Argb32 => false,
        }
    }

    pub fn has_alpha_channel(&self) -> bool {
        match self.format {
            PixelFormat::Argb32 => true,
            PixelFormat::Mono | PixelFormat::Indexed8 => {
                self.color_table.iter().any(|&c| alpha(c) != 0xFF)
            }
            PixelFormat::Gray8 | PixelFormat::Rgb32 => false,
        }
    }

    fn color_at(&self, index: usize) -> u32 {
        // Indices past the table read as opaque black.
        self.color_table.get(index).copied().unwrap_or(rgb(0, 0, 0))
    }

    /// The pixel at `(x, y)` as `0xAARRGGBB`.
    ///
    /// # Panics
    /// Panics if `x >= width` or `y >= height`.
    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        let line = self.scan_line(y);
        let x = x as usize;
        match self.format {
            PixelFormat::Mono => {
                let bit = (line[x / 8] >> (7 - (x % 8))) & 1;
                self.color_at(bit as usize)
            }
            PixelFormat::Indexed8 => self.color_at(line[x] as usize),
            PixelFormat::Gray8 => rgb(line[x], line[x], line[x]),
            PixelFormat::Rgb32 => {
                let p = &line[x * 4..x * 4 + 4];
                rgb(p[2], p[1], p[0])
            }
            PixelFormat::Argb32 => {
                let p = &line[x * 4..x * 4 + 4];
                argb(p[3], p[2], p[1], p[0])
            }
        }
    }

    /// Gray level at `(x, y)`; exact for gray formats.
    ///
    /// # Panics
    /// Panics if `x >= width` or `y >= height`.
    pub fn gray_at(&self, x: u32, y: u32) -> u8 {
        match self.format {
            PixelFormat::Gray8 => self.scan_line(y)[x as usize],
            _ => gray(self.pixel(x, y)),
        }
    }
}
