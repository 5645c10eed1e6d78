//! Helpers shared by the HTTP-speaking destinations.

use logdest_core::{DeliveryOutcome, FailureKind, OptionSet};
use std::error::Error as _;
use std::io;
use tracing::Span;
use url::Url;

/// Parses a destination endpoint and insists on an HTTP(S) URL.
pub(crate) fn parse_http_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim()).map_err(|e| format!("malformed url {raw:?}: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(format!("unsupported url scheme {scheme:?} in {raw:?}")),
    }
}

/// Warns about configured keys the destination does not understand.
pub(crate) fn warn_unknown_options(span: &Span, options: &OptionSet) {
    for key in options.unknown_keys() {
        tracing::warn!(parent: span, option = %key, "ignoring unknown option");
    }
}

/// Maps an error returned while issuing a request to a failed delivery.
///
/// Failing to write the outgoing record is a local I/O failure and logged at
/// error level. Everything else (connect, timeout, protocol) is a transport
/// failure, logged at debug.
pub(crate) fn classify_request_error(span: &Span, err: &reqwest::Error) -> DeliveryOutcome {
    if is_write_failure(err) {
        tracing::error!(parent: span, error = %err, "error in writing message");
        DeliveryOutcome::Failed(FailureKind::LocalIo)
    } else {
        tracing::debug!(parent: span, error = %err, "error in sending message");
        DeliveryOutcome::Failed(FailureKind::Transport)
    }
}

/// The request was built and connected, and then the peer went away while the
/// body was still being written, before any response status arrived.
fn is_write_failure(err: &reqwest::Error) -> bool {
    if err.is_builder() || err.is_body() {
        return true;
    }
    if err.is_connect() || err.is_timeout() || err.status().is_some() {
        return false;
    }
    io_cause(err).is_some_and(|cause| is_write_error_kind(cause.kind()))
}

fn io_cause(err: &reqwest::Error) -> Option<&io::Error> {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return Some(io_err);
        }
        source = cause.source();
    }
    None
}

fn is_write_error_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::WriteZero
    )
}
