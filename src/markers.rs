//! Reserved bytes and fixed-width types shared by every file format.

/// Terminates the dictionary file.
pub const ENDOFDICT: u8 = 0x00;

/// Terminates every phrase in a dictionary file.
pub const ENDOFWORD: u8 = 0x01;

/// Document-boundary marker placed at the start of the text.
pub const DOLLAR: u8 = 0x02;

/// Document-boundary marker separating samples.
pub const DOLLAR_PRIME: u8 = 0x05;

/// Fixed-width integer stored in parse and occurrence files.
#[cfg(feature = "long-refs")]
pub type RefWord = u64;

/// Fixed-width integer stored in parse and occurrence files.
#[cfg(not(feature = "long-refs"))]
pub type RefWord = u32;

/// Width in bytes of a parse reference.
pub const REF_BYTES: usize = std::mem::size_of::<RefWord>();

/// Dictionary phrase identifier. Stored in the parse as `id + 1`.
pub type PhraseId = u64;

/// Returns true if the window starts with a document-boundary marker.
#[inline]
pub fn is_marker(window: &[u8]) -> bool {
    matches!(window.first(), Some(&DOLLAR) | Some(&DOLLAR_PRIME))
}

/// First `w` bytes of a phrase.
#[inline]
pub(crate) fn head(phrase: &[u8], w: usize) -> &[u8] {
    &phrase[..w]
}

/// Last `w` bytes of a phrase.
#[inline]
pub(crate) fn tail(phrase: &[u8], w: usize) -> &[u8] {
    &phrase[phrase.len() - w..]
}
