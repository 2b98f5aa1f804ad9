//! Classify HTTP status, curl errors and transfer errors into retry policy error kinds.

use super::error::TransferError;
use super::policy::ErrorKind;

/// Classify a non-2xx HTTP status code for retry decisions.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 => ErrorKind::Throttled,
        _ => ErrorKind::Http(code.min(u16::MAX as u32) as u16),
    }
}

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

/// Classify a transfer error into an ErrorKind.
pub fn classify(e: &TransferError) -> ErrorKind {
    match e {
        TransferError::Invalid(_) | TransferError::AlreadyPresent(_) => ErrorKind::Skip,
        TransferError::RateLimited => ErrorKind::Throttled,
        TransferError::Http(code) => classify_http_status(*code),
        TransferError::Transport { kind, .. } => *kind,
        TransferError::Storage(_) => ErrorKind::Storage,
        TransferError::NoAttempts => ErrorKind::Other,
    }
}
