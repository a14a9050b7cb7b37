//! Error types returned by the codec operations in this crate.

use thiserror::Error;

/// The result type returned by fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding or encoding a ROM, NARC, or LZ10
/// stream.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A [`Header`](crate::header::Header) was constructed from a buffer that
    /// was not exactly `0x4000` bytes long.
    #[error("header data is of incorrect length (expected 0x4000 bytes, found {found:#X})")]
    HeaderLength {
        /// The length of the buffer that was passed in.
        found: usize,
    },

    /// A container's magic number did not match what was expected.
    #[error("bad magic: expected {expected:#X}, found {found:#X}")]
    BadMagic {
        /// The expected magic value.
        expected: u32,
        /// The magic value that was found.
        found: u32,
    },

    /// A container's byte-order-mark did not match what was expected.
    #[error("bad byte order mark: expected {expected:#X}, found {found:#X}")]
    BadBom {
        /// The expected BOM value.
        expected: u16,
        /// The BOM value that was found.
        found: u16,
    },

    /// A container's version field did not match what was expected.
    #[error("bad version: expected {expected:#X}, found {found:#X}")]
    BadVersion {
        /// The expected version value.
        expected: u16,
        /// The version value that was found.
        found: u16,
    },

    /// A container's declared total size did not match the buffer's actual
    /// length.
    #[error("bad size: header declares {declared:#X}, buffer is {actual:#X}")]
    BadSize {
        /// The size declared in the container header.
        declared: u32,
        /// The actual length of the buffer.
        actual: usize,
    },

    /// A sub-section's 4-byte ASCII magic did not match what was expected.
    #[error("section magic mismatch: expected {expected:?}, found {found:?}")]
    SectionMagic {
        /// The expected 4-byte ASCII magic.
        expected: [u8; 4],
        /// The magic bytes that were found.
        found: [u8; 4],
    },

    /// A banner's version field did not correspond to a known banner size.
    #[error("unknown banner version {0:#X}")]
    BannerVersionUnknown(u16),

    /// An LZ10 stream was too short, or its header byte was not `0x10`.
    #[error("invalid lz10 header")]
    Lz10Header,

    /// An LZ10 stream ran out of input before the declared output length was
    /// reached.
    #[error("lz10 stream truncated before declared length was reached")]
    Lz10Truncated,

    /// An LZ10 back-reference pointed before the start of the output buffer.
    #[error("lz10 back-reference distance {distance} exceeds {written} bytes written")]
    Lz10BadReference {
        /// The distance encoded by the back-reference.
        distance: usize,
        /// The number of bytes written to the output so far.
        written: usize,
    },

    /// [`lz10::compress`](crate::lz10::compress) was given zero bytes of
    /// input, which cannot be represented (the format has no empty stream).
    #[error("cannot compress zero bytes")]
    Lz10EmptyInput,

    /// A [`BTreeMap`](crate::btree::BTreeMap) lookup found no entry for the
    /// given key.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Forced-ID FNT synthesis was given a directory whose file IDs were not
    /// consecutive.
    #[error("cannot build FNT: nonconsecutive file ids within directory entry {0:?}")]
    FntNonConsecutive(String),

    /// No capacity shift satisfies the ROM's size constraint.
    #[error("rom size {size:#X} is too big for storage type (max shift {max_shift})")]
    RomTooBig {
        /// The computed ROM body size.
        size: usize,
        /// The maximum capacity shift allowed for the storage type.
        max_shift: u32,
    },
}
