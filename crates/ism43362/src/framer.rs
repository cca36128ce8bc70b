//! SPI word framing.
//!
//! The module's SPI port runs with 16-bit frames. Every transfer moves one
//! word, which carries two bytes of the command or response stream with the
//! first byte in the low half:
//!
//! ```text
//! command bytes:  c0 c1 c2 c3 ... c(n-2) c(n-1)
//! words:          [c0 c1] [c2 c3] ...  ['\n' c(n-1)]   (n odd)
//! ```
//!
//! An odd-length command is padded with a final word holding `'\n'` in the
//! first half and the command's last byte in the second half. The module
//! ignores the `'\n'` filler.

/// Bytes carried by one SPI word.
pub const WORD_SIZE: usize = 2;

/// Filler byte placed in the first half of the padding word.
pub const PAD_BYTE: u8 = b'\n';

/// Filler byte the module sends to complete an odd-length response.
pub const RESPONSE_FILL_BYTE: u8 = 0x15;

/// Pack two stream bytes into one bus word.
pub fn word_from_bytes(bytes: [u8; WORD_SIZE]) -> u16 {
    u16::from_le_bytes(bytes)
}

/// Unpack one bus word into its two stream bytes.
pub fn bytes_from_word(word: u16) -> [u8; WORD_SIZE] {
    word.to_le_bytes()
}

/// Words covering the even-length prefix of a command.
pub fn body_words(command: &[u8]) -> impl Iterator<Item = u16> + '_ {
    command
        .chunks_exact(WORD_SIZE)
        .map(|pair| word_from_bytes([pair[0], pair[1]]))
}

/// Padding word for an odd-length command, `None` for even lengths.
pub fn padding_word(command: &[u8]) -> Option<u16> {
    if command.len() % WORD_SIZE == 1 {
        command.last().map(|&last| word_from_bytes([PAD_BYTE, last]))
    } else {
        None
    }
}

/// Number of words a command occupies on the bus.
pub fn word_count(command: &[u8]) -> usize {
    command.len().div_ceil(WORD_SIZE)
}

/// Every word sent for a command, padding included.
pub fn frame_words(command: &[u8]) -> impl Iterator<Item = u16> + '_ {
    body_words(command).chain(padding_word(command))
}
