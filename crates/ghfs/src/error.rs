// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

pub type Result<T> = std::result::Result<T, Error>;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Broad classification of an [`Error`], independent of how deeply it was
/// wrapped on the way out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidPath,
    NotExist,
    RemoteFetch,
    UnsupportedFormat,
    Closed,
}

/// Represents errors that can occur in filesystem operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    #[error("{0}: file does not exist")]
    NotExist(String),

    #[error("remote fetch failed: {message}")]
    Remote {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("{op} {name}: file already closed")]
    Closed { op: &'static str, name: String },

    #[error("can't fetch directory {path:?}")]
    Fetch {
        path: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{op} {path}: {source}")]
    Op {
        op: &'static str,
        path: String,
        #[source]
        source: Box<Error>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_path<S: AsRef<str>>(path: S) -> Self {
        Error::InvalidPath(path.as_ref().to_string())
    }

    pub fn not_exist<S: AsRef<str>>(what: S) -> Self {
        Error::NotExist(what.as_ref().to_string())
    }

    pub fn remote<S: Into<String>>(message: S) -> Self {
        Error::Remote {
            message: message.into(),
            source: None,
        }
    }

    pub fn remote_with<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<BoxError>,
    {
        Error::Remote {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn unsupported<S: Into<String>>(what: S) -> Self {
        Error::UnsupportedFormat(what.into())
    }

    pub fn closed<S: AsRef<str>>(op: &'static str, name: S) -> Self {
        Error::Closed {
            op,
            name: name.as_ref().to_string(),
        }
    }

    pub fn fetch<S: AsRef<str>>(path: S, source: Error) -> Self {
        Error::Fetch {
            path: path.as_ref().to_string(),
            source: Box::new(source),
        }
    }

    /// Names the operation and path an error occurred under.
    pub fn op<S: AsRef<str>>(op: &'static str, path: S, source: Error) -> Self {
        Error::Op {
            op,
            path: path.as_ref().to_string(),
            source: Box::new(source),
        }
    }

    /// Classifies the root cause, looking through wrappers.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidPath(_) => ErrorKind::InvalidPath,
            Error::NotExist(_) => ErrorKind::NotExist,
            Error::Remote { .. } | Error::Io(_) => ErrorKind::RemoteFetch,
            Error::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Error::Closed { .. } => ErrorKind::Closed,
            Error::Fetch { source, .. } | Error::Op { source, .. } => source.kind(),
        }
    }

    #[must_use]
    pub fn is_not_exist(&self) -> bool {
        self.kind() == ErrorKind::NotExist
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.kind() == ErrorKind::Closed
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Error {
        let message = match err.url() {
            Some(url) => format!("request to {url} failed"),
            None => "request failed".to_string(),
        };
        Error::remote_with(message, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::remote_with("malformed response payload", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_through_fetch() {
        let err = Error::fetch("a/b", Error::unsupported("mode 0o123"));
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);

        let nested = Error::fetch("a", Error::fetch("a/b", Error::not_exist("c")));
        assert!(nested.is_not_exist());

        let op = Error::op("open", "a/b/c", nested);
        assert!(op.is_not_exist());
        assert!(op.to_string().starts_with("open a/b/c: "));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::closed("read", "README.md").to_string(),
            "read README.md: file already closed"
        );
        assert_eq!(
            Error::not_exist("missing").to_string(),
            "missing: file does not exist"
        );
        assert_eq!(
            Error::invalid_path("/a").to_string(),
            "invalid path: \"/a\""
        );
    }

    #[test]
    fn test_io_is_remote() {
        let err: Error = std::io::Error::other("truncated").into();
        assert_eq!(err.kind(), ErrorKind::RemoteFetch);
    }
}
