use std::io;

use thiserror::Error;

/// Possible errors that arise from attempting to decompress a Yaz0 or Yay0
/// binary into its original data, or vice-versa.
///
/// Encoding on an in-memory slice never fails; every variant except [`Io`]
/// comes from validating a compressed block during decode.
///
/// [`Io`]: CodecError::Io
#[derive(Debug, Error)]
pub enum CodecError {
    /// The first four bytes of the block were neither `"Yaz0"` nor `"Yay0"`.
    #[error("unrecognized magic bytes {0:02x?}")]
    InvalidMagic([u8; 4]),

    /// A header, table, or token read ran past the end of the block.
    #[error("compressed block ended early at offset {0:#06x}")]
    Truncated(usize),

    /// A Yay0 header's table offsets don't fit inside the block.
    #[error("bad Yay0 table offsets (link {link:#06x}, chunk {chunk:#06x})")]
    BadTableOffsets { link: u32, chunk: u32 },

    /// A back-reference reached further back than the output produced so far.
    #[error("look-back of {0} byte(s) with only {1} byte(s) of output")]
    BadLookBack(usize, usize),

    /// A copy-back would produce more output than the header declared.
    #[error("copy of {length} byte(s) overruns declared size by {overrun} byte(s)")]
    CopyOverrun { length: usize, overrun: usize },

    #[error(transparent)]
    Io(#[from] io::Error),
}
