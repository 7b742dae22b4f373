//! Maps `Box<dyn Error>` from the `Link` trait boundary to typed
//! `PipelineError`.
//!
//! `voltlog_traits::Link` uses `Box<dyn Error + Send + Sync>` for maximum
//! flexibility; this module converts those to our typed error enum, with an
//! optional feature-gated path for `voltlog_hardware::LinkError`
//! downcasting.

use crate::error::PipelineError;

/// Map a trait-boundary error to a typed `PipelineError`.
///
/// Attempts to downcast known transport error types first, then falls back
/// to string-based heuristics.
pub fn map_link_error(e: &(dyn std::error::Error + 'static)) -> PipelineError {
    // Feature-gated: try to downcast to LinkError for precise mapping
    #[cfg(feature = "link-errors")]
    {
        if let Some(le) = e.downcast_ref::<voltlog_hardware::error::LinkError>() {
            return match le {
                voltlog_hardware::error::LinkError::Disconnected => PipelineError::LinkLost,
                voltlog_hardware::error::LinkError::Timeout => PipelineError::Timeout,
                other => PipelineError::Link(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("disconnect") {
        PipelineError::LinkLost
    } else if lower.contains("timeout") || lower.contains("timed out") {
        PipelineError::Timeout
    } else {
        PipelineError::Link(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_heuristics_classify_disconnects_and_timeouts() {
        let lost = std::io::Error::other("link disconnected");
        assert!(matches!(map_link_error(&lost), PipelineError::LinkLost));

        let slow = std::io::Error::other("read timed out");
        assert!(matches!(map_link_error(&slow), PipelineError::Timeout));

        let odd = std::io::Error::other("framing desync");
        assert!(matches!(map_link_error(&odd), PipelineError::Link(_)));
    }

    #[cfg(feature = "link-errors")]
    #[test]
    fn typed_link_errors_map_precisely() {
        use voltlog_hardware::error::LinkError;
        assert!(matches!(
            map_link_error(&LinkError::Disconnected),
            PipelineError::LinkLost
        ));
        assert!(matches!(
            map_link_error(&LinkError::Timeout),
            PipelineError::Timeout
        ));
    }
}
