//! Engine configuration and file naming.

use crate::error::{AuPairError, Result};
use std::path::{Path, PathBuf};

/// Input dictionary extension.
pub const EXT_DICT: &str = "dict";
/// Input parse extension.
pub const EXT_PARSE: &str = "parse";
/// Output dictionary extension.
pub const EXT_NDICT: &str = "ndict";
/// Output parse extension.
pub const EXT_NPARSE: &str = "nparse";
/// Output occurrence counts extension.
pub const EXT_NOCC: &str = "nocc";
/// Output compressed dictionary extension.
pub const EXT_NDICZ: &str = "ndicz";
/// Output compressed dictionary lengths extension.
pub const EXT_NDICZ_LEN: &str = "ndicz.len";
/// Default removed trigger strings extension.
pub const EXT_DELETED_TS: &str = "deleted_ts";

/// Configuration for an [`AuPair`](crate::AuPair) run.
///
/// # Example
///
/// ```
/// use aupair_rs::AuPairConfig;
///
/// let config = AuPairConfig::new("data/chr20", 10)
///     .unwrap()
///     .with_threshold(25)
///     .with_compress_dictionary(true);
/// assert_eq!(config.dict_path().to_str(), Some("data/chr20.dict"));
/// assert_eq!(config.threshold, 25);
/// ```
#[derive(Debug, Clone)]
pub struct AuPairConfig {
    /// Prefix shared by all input and output files
    pub input_prefix: PathBuf,
    /// Length of trigger strings and phrase overlaps
    pub window_length: usize,
    /// Minimum cost a trigger string must exceed to be removed; 0 means auto
    pub threshold: i64,
    /// Also write the compressed dictionary files
    pub compress_dictionary: bool,
    /// Run the bookkeeping-only pass before the greedy loop
    pub simple_pass: bool,
}

impl AuPairConfig {
    /// Creates a configuration with default threshold and flags.
    pub fn new(input_prefix: impl Into<PathBuf>, window_length: usize) -> Result<Self> {
        if window_length == 0 {
            return Err(AuPairError::InvalidWindow(window_length));
        }
        Ok(Self {
            input_prefix: input_prefix.into(),
            window_length,
            threshold: 0,
            compress_dictionary: false,
            simple_pass: true,
        })
    }

    pub fn with_threshold(mut self, threshold: i64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_compress_dictionary(mut self, compress: bool) -> Self {
        self.compress_dictionary = compress;
        self
    }

    pub fn with_simple_pass(mut self, simple_pass: bool) -> Self {
        self.simple_pass = simple_pass;
        self
    }

    /// Appends `.ext` to the prefix without touching any existing extension.
    pub fn path_with(&self, ext: &str) -> PathBuf {
        with_extension(&self.input_prefix, ext)
    }

    pub fn dict_path(&self) -> PathBuf {
        self.path_with(EXT_DICT)
    }

    pub fn parse_path(&self) -> PathBuf {
        self.path_with(EXT_PARSE)
    }

    pub fn ndict_path(&self) -> PathBuf {
        self.path_with(EXT_NDICT)
    }

    pub fn nparse_path(&self) -> PathBuf {
        self.path_with(EXT_NPARSE)
    }

    pub fn nocc_path(&self) -> PathBuf {
        self.path_with(EXT_NOCC)
    }

    pub fn ndicz_path(&self) -> PathBuf {
        self.path_with(EXT_NDICZ)
    }

    pub fn ndicz_len_path(&self) -> PathBuf {
        self.path_with(EXT_NDICZ_LEN)
    }

    /// Where the removed trigger strings go when no output file is given.
    pub fn default_removed_path(&self) -> PathBuf {
        self.path_with(EXT_DELETED_TS)
    }
}

fn with_extension(prefix: &Path, ext: &str) -> PathBuf {
    let mut raw = prefix.as_os_str().to_owned();
    raw.push(".");
    raw.push(ext);
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_window_rejected() {
        assert!(matches!(
            AuPairConfig::new("x", 0),
            Err(AuPairError::InvalidWindow(0))
        ));
    }

    #[test]
    fn test_paths_keep_dotted_prefix() {
        let config = AuPairConfig::new("/tmp/sample.fa", 10).unwrap();
        assert_eq!(config.parse_path(), PathBuf::from("/tmp/sample.fa.parse"));
        assert_eq!(config.ndicz_len_path(), PathBuf::from("/tmp/sample.fa.ndicz.len"));
        assert_eq!(
            config.default_removed_path(),
            PathBuf::from("/tmp/sample.fa.deleted_ts")
        );
    }

    #[test]
    fn test_defaults() {
        let config = AuPairConfig::new("p", 4).unwrap();
        assert_eq!(config.threshold, 0);
        assert!(!config.compress_dictionary);
        assert!(config.simple_pass);
    }
}
