//! Error taxonomy shared by the catalog, transfer, and install layers.

use std::fmt;

/// What: Classified failure surfaced by catalog loading and install jobs.
///
/// Inputs: Produced by the remote source, storage, installer, and fetcher code paths.
///
/// Output: Implements `Display`/`Error` so it can be shown in notices or propagated with `?`.
///
/// Details:
/// - Catalog errors are terminal per attempt and shown as a full-screen state.
/// - Download/install errors are scoped to one package's job and shown as a transient notice.
/// - Stale-cache and bundled-fallback usage are never errors; see `catalog::Provenance`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The host could not be reached (DNS, refused connection, no route).
    NetworkUnavailable(String),
    /// The request exceeded its time bound.
    Timeout,
    /// The server answered with a non-success status.
    HttpStatus {
        /// HTTP status code returned by the server.
        code: u16,
    },
    /// Reading or writing local storage failed.
    Storage(String),
    /// The system installer could not be invoked.
    InstallerHandoff(String),
    /// The catalog body could not be decoded.
    MalformedCatalog(String),
    /// Every catalog tier failed; `cause` describes the remote failure.
    CatalogUnavailable {
        /// Human-readable description of the last remote failure.
        cause: String,
    },
}

impl StoreError {
    /// What: Short, stable label for log fields and notice titles.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NetworkUnavailable(_) => "network_unavailable",
            Self::Timeout => "timeout",
            Self::HttpStatus { .. } => "http_status",
            Self::Storage(_) => "storage",
            Self::InstallerHandoff(_) => "installer_handoff",
            Self::MalformedCatalog(_) => "malformed_catalog",
            Self::CatalogUnavailable { .. } => "catalog_unavailable",
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkUnavailable(detail) => write!(f, "Network unavailable: {detail}"),
            Self::Timeout => write!(f, "Operation timed out"),
            Self::HttpStatus { code } => write!(f, "Server answered with HTTP {code}"),
            Self::Storage(detail) => write!(f, "Storage error: {detail}"),
            Self::InstallerHandoff(detail) => {
                write!(f, "Could not start the system installer: {detail}")
            }
            Self::MalformedCatalog(detail) => write!(f, "Catalog document is invalid: {detail}"),
            Self::CatalogUnavailable { cause } => {
                write!(f, "Catalog unavailable ({cause}) and no local copy exists")
            }
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            Self::Timeout
        } else if let Some(status) = value.status() {
            Self::HttpStatus {
                code: status.as_u16(),
            }
        } else if value.is_decode() {
            Self::MalformedCatalog(value.to_string())
        } else {
            Self::NetworkUnavailable(value.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::MalformedCatalog(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::StoreError;

    #[test]
    /// What: Display strings carry the classified detail.
    ///
    /// Inputs:
    /// - One value per taxonomy variant.
    ///
    /// Output:
    /// - Messages mention the status code or detail text.
    fn display_includes_detail() {
        assert_eq!(
            StoreError::HttpStatus { code: 500 }.to_string(),
            "Server answered with HTTP 500"
        );
        assert!(
            StoreError::NetworkUnavailable("dns".into())
                .to_string()
                .contains("dns")
        );
        assert!(
            StoreError::CatalogUnavailable {
                cause: "Operation timed out".into()
            }
            .to_string()
            .contains("timed out")
        );
        assert_eq!(StoreError::Timeout.kind(), "timeout");
    }

    #[test]
    /// What: I/O errors classify as storage failures.
    fn io_error_maps_to_storage() {
        let err: StoreError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(err, StoreError::Storage(ref m) if m.contains("denied")));
    }
}
