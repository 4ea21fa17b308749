//! Redirect state machine shared by JSON fetches and file downloads.
//!
//! Each response moves the request through one transition:
//! `Requesting -> Redirected -> Requesting ...` until it either succeeds on a
//! 2xx or fails on anything else. The hop bound guarantees termination even
//! against a server that redirects forever.

/// Maximum number of redirects followed for a single request.
pub const MAX_REDIRECTS: usize = 10;

/// Outcome of inspecting one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Re-request the given (possibly relative) location
    Follow(String),
    /// 2xx response, the body can be consumed
    Succeeded,
    /// Terminal failure; the response status becomes the error
    Failed,
}

/// Decide what to do with a response.
///
/// `hops` is the number of redirects already followed for this request.
pub fn next_step(status: u16, location: Option<&str>, hops: usize, max_hops: usize) -> Step {
    if (200..300).contains(&status) {
        return Step::Succeeded;
    }

    if (300..400).contains(&status) {
        match location {
            Some(location) if !location.is_empty() && hops < max_hops => {
                return Step::Follow(location.to_string());
            }
            _ => {}
        }
    }

    Step::Failed
}
