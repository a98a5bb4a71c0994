use crate::errors::CodecError;
use crate::format::{BlockInfo, Format, Yay0Header, Yaz0Header, HEADER_SIZE};
use bitstream_io::{BigEndian, BitReader};
use byteorder::{BigEndian as BE, ByteOrder};
use std::io::{Cursor, Read, Write};

type LogWtr<'a> = &'a mut dyn Write;

/// Specify the decoding settings, such as logging and input.
///
/// To create a new `Decoder`, use [`for_bytes()`]. Then, change any of the
/// decoder settings. Finally, decode the input data with [`decode()`].
/// ```
/// # use nlzss::{Encoder, Decoder};
/// let original = b"ABBACABBACD";
/// let compressed = Encoder::for_bytes(original).yaz0().encode_to_vec();
/// let decompressed = Decoder::for_bytes(&compressed).decode().unwrap();
/// assert_eq!(&original[..], decompressed);
/// ```
/// You can use a `Decoder` to peek at the [`BlockInfo`] with [`header()`]
/// without paying for a full decode:
/// ```
/// # use nlzss::{Encoder, Decoder};
/// # let original = b"ABBACABBACD";
/// # let compressed = Encoder::for_bytes(original).yay0().encode_to_vec();
/// let decoder = Decoder::for_bytes(&compressed);
/// let size = decoder.header().unwrap().decompressed_size as usize;
/// assert_eq!(size, original.len());
/// ```
/// [`for_bytes()`]: Decoder::for_bytes
/// [`decode()`]: Decoder::decode
/// [`header()`]: Decoder::header
pub struct Decoder<'a> {
    src: &'a [u8],
    log: Option<LogWtr<'a>>,
}

impl<'a> Decoder<'a> {
    #[inline]
    pub fn for_bytes(src: &'a [u8]) -> Self {
        Self { src, log: None }
    }

    /// Write debugging and diagnostic information to `wtr` while the input
    /// is being decoded.
    #[inline]
    pub fn with_logging<W: Write>(&mut self, wtr: &'a mut W) -> &mut Self {
        self.log = Some(wtr as LogWtr);
        self
    }

    /// Which container frames the input, if its magic is recognized.
    #[inline]
    pub fn format(&self) -> Option<Format> {
        Format::detect(self.src)
    }

    /// Parse the common header fields without decoding the payload.
    #[inline]
    pub fn header(&self) -> Result<BlockInfo, CodecError> {
        BlockInfo::from_bytes(self.src)
    }

    /// Decode the full payload of the block.
    pub fn decode(&mut self) -> Result<Vec<u8>, CodecError> {
        let info = self.header()?;
        if let Some(wtr) = self.log.as_mut() {
            writeln!(wtr, "# Header\n{:?}", &info)?;
        }
        match info.format {
            Format::Yaz0 => decode_yaz0(self.src, &mut self.log),
            Format::Yay0 => decode_yay0(self.src, &mut self.log),
        }
    }
}

/// Decompress a Yaz0 or Yay0 block into a `Vec<u8>`.
///
/// The container is picked from the magic bytes; data that starts with
/// neither magic is a [`CodecError::InvalidMagic`] error, never silently
/// passed through. Callers that want pass-through semantics for
/// already-uncompressed data should test [`is_yaz0`]/[`is_yay0`] first.
///
/// [`is_yaz0`]: crate::is_yaz0
/// [`is_yay0`]: crate::is_yay0
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
    Decoder::for_bytes(bytes).decode()
}

/// Decompress a block from a `Read`er.
///
/// This is a convenience function that materializes the reader and hands
/// it to [`decompress`]; both containers need random access for their
/// header and table offsets, so there is no true streaming decode.
pub fn decode<R: Read>(mut rdr: R) -> Result<Vec<u8>, CodecError> {
    let mut bytes = Vec::new();
    rdr.read_to_end(&mut bytes)?;
    decompress(&bytes)
}

/// Read one body byte, failing with `Truncated` past the end of the block.
#[inline]
fn take_byte(src: &[u8], pos: &mut usize) -> Result<u8, CodecError> {
    let byte = src
        .get(*pos)
        .copied()
        .ok_or(CodecError::Truncated(*pos))?;
    *pos += 1;
    Ok(byte)
}

/// Read one big-endian 16-bit packed copy-back link.
#[inline]
fn take_link(src: &[u8], pos: &mut usize) -> Result<u16, CodecError> {
    let bytes = src
        .get(*pos..*pos + 2)
        .ok_or(CodecError::Truncated(*pos))?;
    *pos += 2;
    Ok(BE::read_u16(bytes))
}

/// Resolve a packed link into `(distance, length)`, pulling the extended
/// length byte from `ext` when the nibble is zero.
#[inline]
fn unpack_link(
    packed: u16,
    ext: impl FnOnce() -> Result<u8, CodecError>,
) -> Result<(usize, usize), CodecError> {
    let distance = (packed & 0x0FFF) as usize + 1;
    let nibble = (packed >> 12) & 0xF;
    let length = if nibble == 0 {
        ext()? as usize + 18
    } else {
        nibble as usize + 2
    };
    Ok((distance, length))
}

/// Copy `length` bytes from `distance` behind the write position, byte by
/// byte so the copy may overlap its own source.
fn copy_back(
    output: &mut Vec<u8>,
    distance: usize,
    length: usize,
    declared: usize,
) -> Result<(), CodecError> {
    if distance > output.len() {
        return Err(CodecError::BadLookBack(distance, output.len()));
    }
    if output.len() + length > declared {
        return Err(CodecError::CopyOverrun {
            length,
            overrun: output.len() + length - declared,
        });
    }

    let start = output.len() - distance;
    for i in start..start + length {
        let byte = output[i];
        output.push(byte);
    }
    Ok(())
}

/// Replay a Yaz0 body: control byte, then the bytes of up to eight tokens,
/// repeating until the declared size is reached.
fn decode_yaz0(src: &[u8], log: &mut Option<LogWtr>) -> Result<Vec<u8>, CodecError> {
    let header = Yaz0Header::from_bytes(src)?;
    let output_size = header.size as usize;
    let mut output: Vec<u8> = Vec::with_capacity(output_size);
    let mut pos = HEADER_SIZE;

    while output.len() < output_size {
        let control = take_byte(src, &mut pos)?;

        for bit in (0..8).rev() {
            // the final control byte may govern fewer than eight tokens
            if output.len() == output_size {
                break;
            }

            if (control >> bit) & 1 == 1 {
                let byte = take_byte(src, &mut pos)?;
                output.push(byte);

                if let Some(wtr) = log {
                    writeln!(wtr, "{:04x} - Uncoded: {:02x}", output.len() - 1, byte)?;
                }
            } else {
                let packed = take_link(src, &mut pos)?;
                let (distance, length) =
                    unpack_link(packed, || take_byte(src, &mut pos))?;

                if let Some(wtr) = log {
                    writeln!(
                        wtr,
                        "{:04x} - Copyback: size: {} mb: {}",
                        output.len(),
                        length,
                        distance
                    )?;
                }

                copy_back(&mut output, distance, length, output_size)?;
            }
        }
    }

    Ok(output)
}

/// Replay a Yay0 body with its three cursors: mask bits from the word
/// region behind a `BitReader`, copy-back links from the link table, and
/// literal/extended-length bytes from the chunk table.
fn decode_yay0(src: &[u8], log: &mut Option<LogWtr>) -> Result<Vec<u8>, CodecError> {
    let header = Yay0Header::from_bytes(src)?;
    let output_size = header.size as usize;
    let mut output: Vec<u8> = Vec::with_capacity(output_size);

    let mask_region = &src[HEADER_SIZE..header.link_offset as usize];
    let mut masks = BitReader::endian(Cursor::new(mask_region), BigEndian);
    let mut link_pos = header.link_offset as usize;
    let mut chunk_pos = header.chunk_offset as usize;

    while output.len() < output_size {
        let literal = masks
            .read_bit()
            .map_err(|_| CodecError::Truncated(header.link_offset as usize))?;

        if literal {
            let byte = take_byte(src, &mut chunk_pos)?;
            output.push(byte);

            if let Some(wtr) = log {
                writeln!(wtr, "{:04x} - Uncoded: {:02x}", output.len() - 1, byte)?;
            }
        } else {
            let packed = take_link(src, &mut link_pos)?;
            let (distance, length) =
                unpack_link(packed, || take_byte(src, &mut chunk_pos))?;

            if let Some(wtr) = log {
                writeln!(
                    wtr,
                    "{:04x} - Copyback: size: {} mb: {}",
                    output.len(),
                    length,
                    distance
                )?;
            }

            copy_back(&mut output, distance, length, output_size)?;
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    // "Yaz0", size 10, reserved, then: control 1000_0000, literal 'A',
    // copy-back of distance 1 / length 9 (nibble 7 => 9, link 0x7000)
    const RUN_YAZ0: &[u8] = &[
        0x59, 0x61, 0x7A, 0x30, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x80, 0x41, 0x70, 0x00,
    ];

    // the same payload as a Yay0 block: one mask word 1000_0000…,
    // link table [0x7000] at 20, chunk table ['A'] at 22
    const RUN_YAY0: &[u8] = &[
        0x59, 0x61, 0x79, 0x30, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00, 0x14, 0x00, 0x00, 0x00,
        0x16, 0x80, 0x00, 0x00, 0x00, 0x70, 0x00, 0x41,
    ];

    #[test]
    fn yaz0_run_block_decodes() {
        assert_eq!(decompress(RUN_YAZ0).unwrap(), b"AAAAAAAAAA");
    }

    #[test]
    fn yay0_run_block_decodes() {
        assert_eq!(decompress(RUN_YAY0).unwrap(), b"AAAAAAAAAA");
    }

    #[test]
    fn yaz0_extended_length_decodes() {
        // literal 'B', then nibble-zero copy-back with ext 0x00 => 18 bytes
        let mut block = vec![
            0x59, 0x61, 0x7A, 0x30, 0x00, 0x00, 0x00, 0x13, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00,
        ];
        block.extend_from_slice(&[0x80, 0x42, 0x00, 0x00, 0x00]);
        assert_eq!(decompress(&block).unwrap(), vec![b'B'; 19]);
    }

    #[test]
    fn bad_lookback_is_rejected() {
        // copy-back with distance 2 before any output exists
        let block = [
            0x59, 0x61, 0x7A, 0x30, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x70, 0x01,
        ];
        assert!(matches!(
            decompress(&block),
            Err(CodecError::BadLookBack(2, 0))
        ));
    }

    #[test]
    fn overrun_copy_is_rejected() {
        // declared size 4, but the copy-back would produce 1 + 9 bytes
        let block = [
            0x59, 0x61, 0x7A, 0x30, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x80, 0x41, 0x70, 0x00,
        ];
        assert!(matches!(
            decompress(&block),
            Err(CodecError::CopyOverrun { .. })
        ));
    }

    #[test]
    fn truncated_body_is_rejected() {
        let block = &RUN_YAZ0[..18];
        assert!(matches!(
            decompress(block),
            Err(CodecError::Truncated(_))
        ));
    }

    #[test]
    fn truncated_yay0_masks_are_rejected() {
        // claims 10 bytes of payload but carries an empty mask region
        let block = [
            0x59, 0x61, 0x79, 0x30, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00,
            0x00, 0x10,
        ];
        assert!(matches!(
            decompress(&block),
            Err(CodecError::Truncated(_))
        ));
    }

    #[test]
    fn trailing_padding_is_ignored() {
        let mut block = RUN_YAZ0.to_vec();
        block.extend_from_slice(&[0xEE; 13]);
        assert_eq!(decompress(&block).unwrap(), b"AAAAAAAAAA");
    }
}
