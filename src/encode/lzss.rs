//! The LZSS pass shared by both framers.
//!
//! Both containers agree on what a token *is* — a literal byte or a
//! `(distance, length)` copy-back — and only disagree on how the tokens are
//! laid out on disk. This module produces the format-independent
//! [`TokenStream`] that `encode.rs` then assembles into either layout.

use std::io::Write;

use super::LogWtr;

/// Number of bytes of already-processed output reachable by a copy-back.
/// A packed link stores `distance - 1` in twelve bits.
pub(crate) const WINDOW_SIZE: usize = 0x1000;
/// Shortest copy-back worth emitting; anything smaller is left literal.
pub(crate) const MIN_MATCH: usize = 3;
/// Longest encodable copy-back: an extended-length byte of 0xFF plus the
/// implicit 18.
pub(crate) const MAX_MATCH: usize = 0xFF + 18;

/// A single unit of the intermediate representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token {
    Literal(u8),
    Match { distance: u16, length: u16 },
}

/// The ordered token sequence for one block, plus the number of payload
/// bytes the tokens decode back into.
#[derive(Debug)]
pub(crate) struct TokenStream {
    pub tokens: Vec<Token>,
    pub decoded_len: usize,
}

impl TokenStream {
    fn with_capacity(cap: usize) -> Self {
        Self {
            tokens: Vec::with_capacity(cap),
            decoded_len: 0,
        }
    }

    fn add_literal(&mut self, byte: u8) {
        self.tokens.push(Token::Literal(byte));
        self.decoded_len += 1;
    }

    fn add_match(&mut self, distance: usize, length: usize) {
        debug_assert!((1..=WINDOW_SIZE).contains(&distance));
        debug_assert!((MIN_MATCH..=MAX_MATCH).contains(&length));
        self.tokens.push(Token::Match {
            distance: distance as u16,
            length: length as u16,
        });
        self.decoded_len += length;
    }
}

/// Compress `input` into a stream of literal and copy-back tokens with a
/// single greedy left-to-right pass. Diagnostic information is written to
/// `log` if present.
pub(crate) fn tokenize(input: &[u8], log: &mut Option<LogWtr>) -> TokenStream {
    let mut stream = TokenStream::with_capacity(input.len() / 2);
    let mut pos = 0;

    while pos < input.len() {
        match find_match(input, pos) {
            Some((distance, length)) => {
                if let Some(wtr) = log.as_mut() {
                    let _ = writeln!(
                        wtr,
                        "{:04x} - Copyback: size: {} mb: {}",
                        pos, length, distance
                    );
                }
                stream.add_match(distance, length);
                pos += length;
            }
            None => {
                if let Some(wtr) = log.as_mut() {
                    let _ = writeln!(wtr, "{:04x} - Uncoded: {:02x}", pos, input[pos]);
                }
                stream.add_literal(input[pos]);
                pos += 1;
            }
        }
    }

    stream
}

/// Find the longest copy-back for the bytes at `pos`, searching the window
/// of up to [`WINDOW_SIZE`] already-processed bytes behind it.
///
/// A candidate is extended with the slice starting at the candidate itself,
/// not just the window, so a match may run past `pos` into the bytes it is
/// in the middle of encoding. That is what turns `AAAA…` into a single
/// `distance: 1` copy-back (the decoder replays it byte-by-byte).
///
/// Of equal-length candidates the closest one wins, which keeps encoded
/// distances small; any tie-break decodes identically.
// TODO: index window positions by first byte so runs of non-matching
// candidates are skipped instead of compared.
fn find_match(input: &[u8], pos: usize) -> Option<(usize, usize)> {
    let window_start = pos.saturating_sub(WINDOW_SIZE);
    let ahead = &input[pos..];
    let longest = ahead.len().min(MAX_MATCH);

    (window_start..pos)
        .filter_map(|candidate| {
            let length = input[candidate..]
                .iter()
                .zip(ahead)
                .take_while(|(s, d)| s == d)
                .count()
                .min(longest);

            if length >= MIN_MATCH {
                Some((pos - candidate, length))
            } else {
                None
            }
        })
        .fold(None, |best: Option<(usize, usize)>, cur| {
            best.filter(|b| b.1 > cur.1 || (b.1 == cur.1 && b.0 < cur.0))
                .or(Some(cur))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(stream: &TokenStream) -> Vec<(u16, u16)> {
        stream
            .tokens
            .iter()
            .filter_map(|t| match t {
                Token::Match { distance, length } => Some((*distance, *length)),
                Token::Literal(_) => None,
            })
            .collect()
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        let stream = tokenize(b"", &mut None);
        assert!(stream.tokens.is_empty());
        assert_eq!(stream.decoded_len, 0);
    }

    #[test]
    fn run_becomes_overlapping_self_match() {
        let stream = tokenize(b"AAAAAAAAAA", &mut None);
        assert_eq!(
            stream.tokens,
            vec![
                Token::Literal(b'A'),
                Token::Match {
                    distance: 1,
                    length: 9
                }
            ]
        );
        assert_eq!(stream.decoded_len, 10);
    }

    #[test]
    fn repeated_phrase_is_matched() {
        let stream = tokenize(b"abcdXabcd", &mut None);
        assert_eq!(stream.decoded_len, 9);
        assert_eq!(matches(&stream), vec![(5, 4)]);
    }

    #[test]
    fn no_match_shorter_than_minimum() {
        // "ab" recurs but is below MIN_MATCH, so everything stays literal
        let stream = tokenize(b"abXab", &mut None);
        assert!(matches(&stream).is_empty());
        assert_eq!(stream.tokens.len(), 5);
    }

    #[test]
    fn closest_candidate_wins_ties() {
        let stream = tokenize(b"abcZabcZabc", &mut None);
        // the second "abc" copy should point at the nearer occurrence
        let found = matches(&stream);
        assert!(found.iter().all(|&(d, _)| d <= 4), "{:?}", found);
    }

    #[test]
    fn match_length_is_capped() {
        let input = vec![0x5Au8; MAX_MATCH * 3];
        let stream = tokenize(&input, &mut None);
        assert_eq!(stream.decoded_len, input.len());
        for (_, length) in matches(&stream) {
            assert!(length as usize <= MAX_MATCH);
        }
    }

    #[test]
    fn distances_never_exceed_window() {
        let mut input = Vec::new();
        for i in 0u32..3000 {
            input.extend_from_slice(&(i.wrapping_mul(2654435761)).to_be_bytes());
        }
        let stream = tokenize(&input, &mut None);
        assert_eq!(stream.decoded_len, input.len());
        for (distance, length) in matches(&stream) {
            assert!(distance as usize <= WINDOW_SIZE);
            assert!((MIN_MATCH..=MAX_MATCH).contains(&(length as usize)));
        }
    }
}
