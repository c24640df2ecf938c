//! Error types returned by the loader and the realtime fetcher.
//!
//! Query operations never fail: missing data degrades to empty results.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while fetching or decoding a GTFS-RT snapshot.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid feed URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("feed request timed out")]
    Timeout,

    #[error("feed request failed: {0}")]
    Transport(reqwest::Error),

    #[error("feed returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("feed is not a valid GTFS-RT FeedMessage: {0}")]
    Decode(#[from] prost::DecodeError),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Transport(e)
        }
    }
}

/// Failure while reading a single static GTFS table.
///
/// The loader turns these into an absent table; they are only exposed so the
/// caller can log why a table is missing.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to open '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read header of '{}': {source}", path.display())]
    Csv { path: PathBuf, source: csv::Error },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message_includes_code() {
        let err = FetchError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_string(), "feed returned HTTP 503 Service Unavailable");
    }

    #[test]
    fn test_decode_error_converts() {
        use prost::Message;

        let decode = crate::gtfs_rt::FeedMessage::decode(&[0xFF, 0xFE, 0x00, 0x01][..]).unwrap_err();
        let err: FetchError = decode.into();
        assert!(matches!(err, FetchError::Decode(_)));
    }
}
