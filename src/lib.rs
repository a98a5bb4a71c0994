//! Encode and decode Nintendo's Yaz0 and Yay0 compressed containers.
//!
//! The two formats share one LZSS token scheme (literal bytes and
//! overlap-capable copy-backs of up to 273 bytes from a 4096 byte window)
//! and differ only in framing: Yaz0 interleaves control bytes with token
//! bytes, Yay0 splits masks, links, and chunks into three tables. See the
//! [`format`] module for the byte-level layouts.
//!
//! The simplest entry points are [`decompress`], [`compress_yaz0`], and
//! [`compress_yay0`]; the [`Decoder`] and [`Encoder`] builders add header
//! peeking, format selection, and diagnostic logging.
//!
//! ```
//! let data = b"neither rhyme nor reason, neither rhyme nor reason";
//! let block = nlzss::compress_yay0(data);
//! assert_eq!(nlzss::decompress(&block).unwrap(), data);
//! ```

mod decode;
mod encode;
mod errors;
pub mod format;

pub use decode::{decode, decompress, Decoder};
pub use encode::{compress_yaz0, compress_yay0, Encoder};
pub use errors::CodecError;
pub use format::{is_yay0, is_yaz0, BlockInfo, Format};
