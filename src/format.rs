//! Information and structures for Yaz0 and Yay0 files.
//!
//! Both containers wrap an arbitrary payload with the same LZSS token
//! scheme and differ only in how the tokens are laid out on disk.
//!
//! ## Headers
//! Every block starts with a sixteen byte, big-endian header:
//!
//! | Byte Num | Yaz0 | Yay0 |
//! | :------: | ---- | ---- |
//! | 0..4     | magic bytes (`"Yaz0"`) | magic bytes (`"Yay0"`) |
//! | 4..8     | size of decompressed data | size of decompressed data |
//! | 8..12    | reserved (zero) | link table offset |
//! | 12..16   | reserved (zero) | chunk table offset |
//!
//! The two Yay0 offsets are absolute from the start of the block.
//!
//! ## Token encoding
//! A token is either a literal byte or a copy-back instruction. Copy-backs
//! are packed into a 16-bit big-endian value:
//!
//! ```text
//! nnnn dddd dddd dddd
//! ```
//!
//! where `distance = d + 1` (1..=4096 bytes behind the write position) and
//! the nibble `n` selects the length encoding: `n != 0` means
//! `length = n + 2` (3..=17), while `n == 0` means one extra byte `e`
//! follows with `length = e + 18` (18..=273). A copy may overlap its own
//! source (`distance < length`), which replays a run.
//!
//! ## Yaz0 body
//! After the header, the body is a sequence of groups. Each group is one
//! control byte followed by the bytes of up to eight tokens. The control
//! bits are consumed MSB first: a `1` bit means the next body byte is a
//! literal, a `0` bit means the next two (or three) body bytes are a
//! copy-back. Decoding stops the moment the declared size is reached, even
//! in the middle of a control byte; leftover bits are written as zero.
//!
//! ## Yay0 body
//! Yay0 splits the same three kinds of data into three flat regions:
//!
//! 1. **Mask words** at byte 16: consecutive 32-bit big-endian words,
//!    consumed one bit at a time MSB first, same bit meaning as Yaz0.
//! 2. **Link table** at `link_offset`: one 16-bit packed value per
//!    copy-back bit, in encounter order.
//! 3. **Chunk table** at `chunk_offset`: single bytes consumed by one
//!    cursor in encounter order, serving both literal values and the
//!    extended-length byte of nibble-zero copy-backs.

use byteorder::{BigEndian, ByteOrder};
use std::convert::TryInto;
use std::fmt;

use crate::errors::CodecError;

/// Magic bytes of a Yaz0 block.
pub const YAZ0_MAGIC: &[u8; 4] = b"Yaz0";
/// Magic bytes of a Yay0 block.
pub const YAY0_MAGIC: &[u8; 4] = b"Yay0";
/// Size in bytes of either container's header.
pub const HEADER_SIZE: usize = 16;

/// Check if `bytes` starts with the Yaz0 magic.
#[inline]
pub fn is_yaz0(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && &bytes[0..4] == YAZ0_MAGIC
}

/// Check if `bytes` starts with the Yay0 magic.
#[inline]
pub fn is_yay0(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && &bytes[0..4] == YAY0_MAGIC
}

/// The two sibling container layouts.
///
/// `Yaz0` interleaves control bytes with token bytes, while `Yay0` splits
/// the mask bits, the copy-back links, and the literal/length chunks into
/// three separate tables.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Format {
    Yaz0,
    Yay0,
}

impl Format {
    /// Identify the container framing `bytes`, if any.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if is_yaz0(bytes) {
            Some(Self::Yaz0)
        } else if is_yay0(bytes) {
            Some(Self::Yay0)
        } else {
            None
        }
    }

    pub const fn magic(self) -> &'static [u8; 4] {
        match self {
            Self::Yaz0 => YAZ0_MAGIC,
            Self::Yay0 => YAY0_MAGIC,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Yaz0 => write!(f, "Yaz0 (interleaved)"),
            Self::Yay0 => write!(f, "Yay0 (split-table)"),
        }
    }
}

/// The information stored at the start of any compressed block, regardless
/// of container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub format: Format,
    /// size of decompressed data
    pub decompressed_size: u32,
}

impl BlockInfo {
    /// Parse the common header fields from the front of a block.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let format = match Format::detect(bytes) {
            Some(f) => f,
            None => {
                let mut magic = [0u8; 4];
                let n = bytes.len().min(4);
                magic[..n].copy_from_slice(&bytes[..n]);
                return Err(CodecError::InvalidMagic(magic));
            }
        };
        if bytes.len() < HEADER_SIZE {
            return Err(CodecError::Truncated(bytes.len()));
        }
        let decompressed_size = BigEndian::read_u32(&bytes[4..8]);

        Ok(Self {
            format,
            decompressed_size,
        })
    }
}

/// Header of a Yaz0 block. The two reserved words are always written as
/// zero and never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Yaz0Header {
    /// size of decompressed data
    pub size: u32,
}

impl Yaz0Header {
    /// Parse a Yaz0 header from the front of a block.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let arr: &[u8; HEADER_SIZE] = bytes
            .get(..HEADER_SIZE)
            .and_then(|s| s.try_into().ok())
            .ok_or(CodecError::Truncated(bytes.len()))?;
        if &arr[0..4] != YAZ0_MAGIC {
            return Err(CodecError::InvalidMagic(arr[0..4].try_into().unwrap()));
        }
        let size = BigEndian::read_u32(&arr[4..8]);

        Ok(Self { size })
    }

    /// Append `self` to `out` in the on-disk layout.
    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        let mut word = [0u8; 4];
        out.extend_from_slice(YAZ0_MAGIC); // 0..4
        BigEndian::write_u32(&mut word, self.size);
        out.extend_from_slice(&word); // 4..8
        out.extend_from_slice(&[0u8; 8]); // 8..16, reserved
    }
}

/// Header of a Yay0 block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Yay0Header {
    /// size of decompressed data
    pub size: u32,
    /// absolute offset of the 16-bit copy-back link table
    pub link_offset: u32,
    /// absolute offset of the literal/extended-length chunk table
    pub chunk_offset: u32,
}

impl Yay0Header {
    /// Parse a Yay0 header from the front of a block and check that both
    /// table offsets land inside it, in order.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let arr: &[u8; HEADER_SIZE] = bytes
            .get(..HEADER_SIZE)
            .and_then(|s| s.try_into().ok())
            .ok_or(CodecError::Truncated(bytes.len()))?;
        if &arr[0..4] != YAY0_MAGIC {
            return Err(CodecError::InvalidMagic(arr[0..4].try_into().unwrap()));
        }
        let size = BigEndian::read_u32(&arr[4..8]);
        let link_offset = BigEndian::read_u32(&arr[8..12]);
        let chunk_offset = BigEndian::read_u32(&arr[12..16]);

        let link = link_offset as usize;
        let chunk = chunk_offset as usize;
        if link < HEADER_SIZE || chunk < link || chunk > bytes.len() {
            return Err(CodecError::BadTableOffsets {
                link: link_offset,
                chunk: chunk_offset,
            });
        }

        Ok(Self {
            size,
            link_offset,
            chunk_offset,
        })
    }

    /// Append `self` to `out` in the on-disk layout.
    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        let mut word = [0u8; 4];
        out.extend_from_slice(YAY0_MAGIC); // 0..4
        BigEndian::write_u32(&mut word, self.size);
        out.extend_from_slice(&word); // 4..8
        BigEndian::write_u32(&mut word, self.link_offset);
        out.extend_from_slice(&word); // 8..12
        BigEndian::write_u32(&mut word, self.chunk_offset);
        out.extend_from_slice(&word); // 12..16
    }
}
