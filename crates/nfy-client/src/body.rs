//! Response body handling.
//!
//! Every response body is read to the end before the response is dropped so
//! the connection goes back to the pool instead of being torn down.

use reqwest::Response;
use tracing::debug;

/// Read and discard the rest of the body.
pub(crate) async fn drain(mut resp: Response) {
    loop {
        match resp.chunk().await {
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "failed to drain response body");
                break;
            }
        }
    }
}

/// Keep at most `cap` bytes of the body, discarding the rest as it streams
/// in. Best effort: a read failure ends the read with what was collected.
pub(crate) async fn read_capped(mut resp: Response, cap: usize) -> Vec<u8> {
    let mut buf = Vec::new();
    loop {
        match resp.chunk().await {
            Ok(Some(chunk)) => {
                let room = cap.saturating_sub(buf.len());
                buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
            }
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, read = buf.len(), "failed to read error response body");
                break;
            }
        }
    }
    buf
}

/// Read the whole body if it fits in `limit` bytes.
///
/// `Ok(None)` as soon as the body is known to exceed `limit`; the remainder is
/// left unread and the connection is not reused.
pub(crate) async fn read_limited(
    mut resp: Response,
    limit: usize,
) -> Result<Option<Vec<u8>>, reqwest::Error> {
    if resp.content_length().is_some_and(|n| n > limit as u64) {
        return Ok(None);
    }
    let mut buf = Vec::new();
    while let Some(chunk) = resp.chunk().await? {
        if buf.len() + chunk.len() > limit {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(Some(buf))
}

/// Printable, trimmed excerpt of a (possibly truncated) body.
pub(crate) fn excerpt(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).trim().to_string()
}
