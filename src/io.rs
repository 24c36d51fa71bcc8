//! Readers and writers for dictionary, parse and occurrence files.
//!
//! ## Formats
//!
//! **Dictionary** (`.dict`, `.ndict`):
//! ```text
//! phrase ENDOFWORD phrase ENDOFWORD ... ENDOFDICT
//! ```
//!
//! **Parse / occurrences** (`.parse`, `.nparse`, `.nocc`): flat array of
//! little-endian [`RefWord`]s, no header.
//!
//! **Compressed dictionary** (`.ndicz` + `.ndicz.len`): every phrase without
//! its trailing window, concatenated; lengths as little-endian `u32`.
//!
//! **Removed trigger strings**: same layout as a dictionary.

use crate::error::{AuPairError, Result};
use crate::markers::{RefWord, ENDOFDICT, ENDOFWORD};
use crate::parse::Parse;
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

fn open_input(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => AuPairError::MissingInput {
            path: path.to_path_buf(),
        },
        _ => AuPairError::Io(e),
    })
}

/// Reads every phrase of a dictionary file, in id order.
pub fn read_dictionary(path: &Path) -> Result<Vec<Vec<u8>>> {
    read_dictionary_from(BufReader::new(open_input(path)?))
}

/// Reads phrases up to the end-of-dictionary marker.
pub fn read_dictionary_from<R: BufRead>(mut reader: R) -> Result<Vec<Vec<u8>>> {
    let mut phrases = Vec::new();
    loop {
        let mut buf = Vec::new();
        let n = reader.read_until(ENDOFWORD, &mut buf)?;
        if n == 0 {
            return Err(AuPairError::CorruptDictionary(
                "missing end-of-dictionary marker".to_string(),
            ));
        }
        if let Some(end) = buf.iter().position(|&b| b == ENDOFDICT) {
            if end != 0 {
                return Err(AuPairError::CorruptDictionary(format!(
                    "unterminated phrase {} before end-of-dictionary marker",
                    phrases.len()
                )));
            }
            return Ok(phrases);
        }
        if buf.pop() != Some(ENDOFWORD) {
            return Err(AuPairError::CorruptDictionary(format!(
                "phrase {} is not terminated",
                phrases.len()
            )));
        }
        phrases.push(buf);
    }
}

/// Loads the input parse through a read-only memory map.
pub fn read_parse(path: &Path) -> Result<Parse> {
    let file = open_input(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(Parse::default());
    }
    let mmap = unsafe { Mmap::map(&file)? };
    Parse::from_le_bytes(&mmap)
}

/// Writes phrases in dictionary layout, returning the bytes written.
pub fn write_dictionary<'a, I>(path: &Path, phrases: I) -> Result<u64>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut out = BufWriter::new(File::create(path)?);
    let mut written = 0u64;
    for phrase in phrases {
        out.write_all(phrase)?;
        out.write_all(&[ENDOFWORD])?;
        written += phrase.len() as u64 + 1;
    }
    out.write_all(&[ENDOFDICT])?;
    out.flush()?;
    Ok(written + 1)
}

/// Writes fixed-width words, returning the bytes written.
pub fn write_words(path: &Path, words: &[RefWord]) -> Result<u64> {
    let mut out = BufWriter::new(File::create(path)?);
    for word in words {
        out.write_all(&word.to_le_bytes())?;
    }
    out.flush()?;
    Ok(std::mem::size_of_val(words) as u64)
}

/// Writes the compressed dictionary pair, returning the bytes written.
///
/// Each phrase loses its trailing `window` bytes, which the next phrase in
/// the text repeats.
pub fn write_compressed_dictionary<'a, I>(
    dicz_path: &Path,
    len_path: &Path,
    phrases: I,
    window: usize,
) -> Result<u64>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut dicz = BufWriter::new(File::create(dicz_path)?);
    let mut lens = BufWriter::new(File::create(len_path)?);
    let mut written = 0u64;
    for phrase in phrases {
        let body = &phrase[..phrase.len().saturating_sub(window)];
        let len = u32::try_from(body.len()).map_err(|_| {
            AuPairError::CorruptDictionary(format!("phrase of {} bytes too long", body.len()))
        })?;
        dicz.write_all(body)?;
        lens.write_all(&len.to_le_bytes())?;
        written += body.len() as u64 + 4;
    }
    dicz.flush()?;
    lens.flush()?;
    Ok(written)
}
