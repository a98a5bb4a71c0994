use crate::errors::CodecError;
use crate::format::{Format, Yay0Header, Yaz0Header, HEADER_SIZE};
use byteorder::{BigEndian, ByteOrder};
use smallvec::SmallVec;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

pub(crate) mod lzss;

use self::lzss::{Token, TokenStream};

pub(crate) type LogWtr<'a> = &'a mut dyn Write;

/// Staged token bytes for one Yaz0 group: eight tokens of at most three
/// bytes each, kept on the stack.
type GroupBuf = SmallVec<[u8; 24]>;

/// Specify the encoding settings, such as container format and logging.
///
/// To create a new `Encoder`, use [`for_bytes()`]. Then pick the container
/// with [`format()`], [`yaz0()`], or [`yay0()`]. Finally, encode the input
/// data with [`encode_to_vec()`], [`encode_to_writer()`], or
/// [`encode_to_file()`].
/// ```
/// # use nlzss::{Encoder, Format};
/// let input = b"ABBACABBCADFEGABA";
/// let compressed = Encoder::for_bytes(input)
///     .format(Format::Yay0)
///     .encode_to_vec();
/// assert!(nlzss::is_yay0(&compressed));
/// ```
/// Both containers share the same token pass; choosing a format only
/// changes how the tokens are laid out on disk. Encoding an in-memory
/// slice cannot fail, so [`encode_to_vec()`] returns the block directly.
///
/// [`for_bytes()`]: Encoder::for_bytes
/// [`format()`]: Encoder::format
/// [`yaz0()`]: Encoder::yaz0
/// [`yay0()`]: Encoder::yay0
/// [`encode_to_vec()`]: Encoder::encode_to_vec
/// [`encode_to_writer()`]: Encoder::encode_to_writer
/// [`encode_to_file()`]: Encoder::encode_to_file
pub struct Encoder<'a> {
    input: &'a [u8],
    format: Format,
    log: Option<LogWtr<'a>>,
}

impl<'a> Encoder<'a> {
    /// Create a new `Encoder` for the data in `input`, framing as Yaz0
    /// unless another format is selected.
    #[inline]
    pub fn for_bytes(input: &'a [u8]) -> Self {
        Self {
            input,
            format: Format::Yaz0,
            log: None,
        }
    }

    /// Set the container that the tokens will be framed into.
    #[inline]
    pub fn format(&mut self, format: Format) -> &mut Self {
        self.format = format;
        self
    }

    /// Convenience method to select Yaz0 framing without importing [`Format`].
    #[inline]
    pub fn yaz0(&mut self) -> &mut Self {
        self.format = Format::Yaz0;
        self
    }

    /// Convenience method to select Yay0 framing without importing [`Format`].
    #[inline]
    pub fn yay0(&mut self) -> &mut Self {
        self.format = Format::Yay0;
        self
    }

    /// Write debugging and diagnostic information to `log` while the input
    /// is being encoded.
    #[inline]
    pub fn with_logging<L: Write>(&mut self, log: &'a mut L) -> &mut Self {
        self.log = Some(log as LogWtr);
        self
    }

    /// Start the encoding and return the framed block in a `Vec<u8>`.
    pub fn encode_to_vec(&mut self) -> Vec<u8> {
        let tokens = lzss::tokenize(self.input, &mut self.log);
        match self.format {
            Format::Yaz0 => write_yaz0(&tokens),
            Format::Yay0 => write_yay0(&tokens),
        }
    }

    /// Start the encoding and write the framed block out to `wtr`.
    #[inline]
    pub fn encode_to_writer<W: Write>(&mut self, mut wtr: W) -> Result<(), CodecError> {
        wtr.write_all(&self.encode_to_vec()).map_err(Into::into)
    }

    /// Start the encoding and write the framed block out to the newly
    /// created `File` `f`.
    #[inline]
    pub fn encode_to_file<P: AsRef<Path>>(&mut self, f: P) -> Result<(), CodecError> {
        let mut wtr = BufWriter::new(File::create(f)?);
        self.encode_to_writer(&mut wtr)?;
        wtr.flush().map_err(Into::into)
    }
}

/// Compress data into a Yaz0 `Vec<u8>`
///
/// This is a convenience function to encode a byte slice without having to
/// import and set up an [`Encoder`].
pub fn compress_yaz0(input: &[u8]) -> Vec<u8> {
    Encoder::for_bytes(input).yaz0().encode_to_vec()
}

/// Compress data into a Yay0 `Vec<u8>`
///
/// This is a convenience function to encode a byte slice without having to
/// import and set up an [`Encoder`].
pub fn compress_yay0(input: &[u8]) -> Vec<u8> {
    Encoder::for_bytes(input).yay0().encode_to_vec()
}

/// Pack one copy-back token into its 16-bit link value, plus the extended
/// length byte for lengths past the nibble range.
fn pack_link(distance: u16, length: u16) -> (u16, Option<u8>) {
    debug_assert!((1..=lzss::WINDOW_SIZE as u16).contains(&distance));
    if length >= 18 {
        ((distance - 1) & 0x0FFF, Some((length - 18) as u8))
    } else {
        ((length - 2) << 12 | (distance - 1) & 0x0FFF, None)
    }
}

/// Assemble a Yaz0 block: header, then groups of one control byte and the
/// bytes of up to eight tokens. Control bits run MSB first; absent tokens
/// in the final group leave their bits zero.
fn write_yaz0(tokens: &TokenStream) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE + tokens.tokens.len() * 2);
    Yaz0Header {
        size: tokens.decoded_len as u32,
    }
    .write(&mut out);

    for group in tokens.tokens.chunks(8) {
        let mut control = 0u8;
        let mut staged = GroupBuf::new();

        for (bit, token) in (0..8).rev().zip(group) {
            match *token {
                Token::Literal(byte) => {
                    control |= 1 << bit;
                    staged.push(byte);
                }
                Token::Match { distance, length } => {
                    let (packed, ext) = pack_link(distance, length);
                    let mut link = [0u8; 2];
                    BigEndian::write_u16(&mut link, packed);
                    staged.extend_from_slice(&link);
                    if let Some(ext) = ext {
                        staged.push(ext);
                    }
                }
            }
        }

        out.push(control);
        out.extend_from_slice(&staged);
    }

    out
}

/// Packs mask bits MSB first into consecutive 32-bit big-endian words.
/// A trailing partial word is flushed with its unused low bits zero.
struct MaskWriter {
    words: Vec<u8>,
    acc: u32,
    nbits: u32,
}

impl MaskWriter {
    fn new() -> Self {
        Self {
            words: Vec::new(),
            acc: 0,
            nbits: 0,
        }
    }

    fn push_bit(&mut self, set: bool) {
        self.acc = (self.acc << 1) | u32::from(set);
        self.nbits += 1;
        if self.nbits == 32 {
            self.flush();
        }
    }

    fn flush(&mut self) {
        let mut word = [0u8; 4];
        BigEndian::write_u32(&mut word, self.acc << (32 - self.nbits));
        self.words.extend_from_slice(&word);
        self.acc = 0;
        self.nbits = 0;
    }

    fn finish(mut self) -> Vec<u8> {
        if self.nbits > 0 {
            self.flush();
        }
        self.words
    }
}

/// Assemble a Yay0 block: header, mask words, link table, chunk table.
/// Literal bytes and extended-length bytes land in the chunk table in
/// token order, the order the decoder's single chunk cursor expects.
fn write_yay0(tokens: &TokenStream) -> Vec<u8> {
    let mut masks = MaskWriter::new();
    let mut links: Vec<u8> = Vec::new();
    let mut chunks: Vec<u8> = Vec::new();

    for token in &tokens.tokens {
        match *token {
            Token::Literal(byte) => {
                masks.push_bit(true);
                chunks.push(byte);
            }
            Token::Match { distance, length } => {
                masks.push_bit(false);
                let (packed, ext) = pack_link(distance, length);
                let mut link = [0u8; 2];
                BigEndian::write_u16(&mut link, packed);
                links.extend_from_slice(&link);
                if let Some(ext) = ext {
                    chunks.push(ext);
                }
            }
        }
    }

    let masks = masks.finish();
    let link_offset = (HEADER_SIZE + masks.len()) as u32;
    let chunk_offset = link_offset + links.len() as u32;

    let mut out = Vec::with_capacity(chunk_offset as usize + chunks.len());
    Yay0Header {
        size: tokens.decoded_len as u32,
        link_offset,
        chunk_offset,
    }
    .write(&mut out);
    out.extend_from_slice(&masks);
    out.extend_from_slice(&links);
    out.extend_from_slice(&chunks);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Yay0Header;

    #[test]
    fn empty_input_is_header_only() {
        let yaz = compress_yaz0(b"");
        assert_eq!(yaz.len(), HEADER_SIZE);
        assert_eq!(&yaz[4..8], &[0, 0, 0, 0]);

        let yay = compress_yay0(b"");
        assert_eq!(yay.len(), HEADER_SIZE);
        let hdr = Yay0Header::from_bytes(&yay).unwrap();
        assert_eq!(hdr.size, 0);
        assert_eq!(hdr.link_offset, HEADER_SIZE as u32);
        assert_eq!(hdr.chunk_offset, HEADER_SIZE as u32);
    }

    #[test]
    fn run_compresses_to_overlapping_copy() {
        // literal 'A', then a distance-1 copy of the remaining nine bytes
        let block = compress_yaz0(b"AAAAAAAAAA");
        assert_eq!(
            block[HEADER_SIZE..],
            [0x80, b'A', 0x70, 0x00]
        );
    }

    #[test]
    fn yay0_mask_region_is_word_aligned() {
        let block = compress_yay0(b"spam spam spam spam spam");
        let hdr = Yay0Header::from_bytes(&block).unwrap();
        let mask_len = hdr.link_offset as usize - HEADER_SIZE;
        assert!(mask_len > 0 && mask_len % 4 == 0);
        assert!(hdr.chunk_offset as usize <= block.len());
    }

    #[test]
    fn pack_link_splits_lengths_at_eighteen() {
        assert_eq!(pack_link(1, 3), (0x1000, None));
        assert_eq!(pack_link(4096, 17), (0xFFFF, None));
        assert_eq!(pack_link(1, 18), (0x0000, Some(0)));
        assert_eq!(pack_link(16, 273), (0x000F, Some(0xFF)));
    }
}
