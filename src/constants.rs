// JP2 signature box (ISO/IEC 15444-1, I.5.1): length 12, type 'jP  ', contents <CR><LF><0x87><LF>.
pub const JP2_SIGNATURE: [u8; 12] = [
    0x00, 0x00, 0x00, 0x0C, 0x6A, 0x50, 0x20, 0x20, 0x0D, 0x0A, 0x87, 0x0A,
];

// Signature box contents alone, as written by producers that drop the box header.
pub const JP2_SHORT_SIGNATURE: [u8; 4] = [0x0D, 0x0A, 0x87, 0x0A];

// SOC marker followed by SIZ marker (ISO/IEC 15444-1, A.4.1 and A.5.1).
pub const J2K_CODESTREAM_SIGNATURE: [u8; 4] = [0xFF, 0x4F, 0xFF, 0x51];

pub const SIGNATURE_PEEK_LENGTH: usize = 12;

// The following encoder limits are defined by ANSI/NIST-ITL 1-2007 for JPEG 2000 profiles.
pub const COMPRESSION_RATE_COUNT: usize = 10;
pub const PREVIEW_COMPRESSION_RATE_MULTIPLIER: f64 = 10.0;
pub const MINIMUM_RESOLUTION_TILE_SIZE: u32 = 64;
pub const MINIMUM_RESOLUTION_LEVELS: u32 = 6;
pub const CODE_BLOCK_SIZE: u32 = 32;

pub const SAMPLE_PRECISION: u32 = 8;
pub const DEFAULT_QUALITY: u8 = 100;
pub const MINIMUM_QUALITY: u8 = 1;
pub const MAXIMUM_QUALITY: u8 = 100;

pub const CODESTREAM_COMMENT: &str = "jp2-bridge/OpenJPEG";

// Largest chunk read and dropped at once when skipping on a sequential handle.
pub const SKIP_CHUNK_SIZE: usize = 4096;
