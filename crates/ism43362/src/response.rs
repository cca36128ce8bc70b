//! Fixed-capacity response buffer.

use crate::framer::WORD_SIZE;

/// Marker the module appends to every successful response.
pub const OK_TERMINATOR: &[u8] = b"\r\nOK\r\n";

/// Response bytes captured during one transaction.
///
/// `N` is the total storage, including one slot reserved for the trailing
/// NUL written after every transaction, so at most `N - 1` response bytes
/// are kept.
#[derive(Clone)]
pub struct CommandResponse<const N: usize> {
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> CommandResponse<N> {
    const HOLDS_ONE_WORD: () = assert!(N > WORD_SIZE, "response buffer must hold a word");

    /// Create an empty response buffer.
    pub fn new() -> Self {
        let () = Self::HOLDS_ONE_WORD;
        CommandResponse { buf: [0; N], len: 0 }
    }

    /// Captured bytes, without the trailing NUL.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Captured bytes including the trailing NUL.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.buf[..=self.len]
    }

    /// Captured bytes as text, if they are valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(self.as_bytes()).ok()
    }

    /// Number of bytes captured.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of response bytes this buffer keeps.
    pub fn capacity(&self) -> usize {
        N - 1
    }

    /// Whether the success terminator appears anywhere in the capture.
    pub fn contains_ok(&self) -> bool {
        contains(self.as_bytes(), OK_TERMINATOR)
    }

    /// Whether `needle` appears anywhere in the capture.
    pub fn contains(&self, needle: &[u8]) -> bool {
        contains(self.as_bytes(), needle)
    }

    /// Forget the previous capture.
    pub fn clear(&mut self) {
        self.len = 0;
        self.buf[0] = 0;
    }

    /// Whether another word fits while keeping the terminator slot free.
    pub(crate) fn has_room_for_word(&self) -> bool {
        self.len + WORD_SIZE < N
    }

    pub(crate) fn push_word(&mut self, bytes: [u8; WORD_SIZE]) {
        self.buf[self.len..self.len + WORD_SIZE].copy_from_slice(&bytes);
        self.len += WORD_SIZE;
    }

    pub(crate) fn terminate(&mut self) {
        self.buf[self.len] = 0;
    }
}

impl<const N: usize> Default for CommandResponse<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> AsRef<[u8]> for CommandResponse<N> {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl<const N: usize> core::fmt::Debug for CommandResponse<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommandResponse")
            .field("len", &self.len)
            .field("capacity", &(N - 1))
            .field("data", &format_args!("{}", self.as_bytes().escape_ascii()))
            .finish()
    }
}

/// Substring search over raw bytes.
pub(crate) fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}

/// Position of the first occurrence of `needle` in `haystack`.
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
