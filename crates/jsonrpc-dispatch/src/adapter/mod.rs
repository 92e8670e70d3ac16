//! Bridges between the dispatcher's callback completion and callers that
//! need one response per inbound call.
//!
//! - [`BlockingAdapter`] parks the calling thread on a [`PendingCall`].
//! - [`DirectWriteAdapter`] writes the response into an [`OutboundChannel`]
//!   from whichever context the handler completes on.
//! - `AsyncAdapter` (feature `async`) awaits the response on a tokio oneshot.

#[cfg(feature = "async")]
mod awaiting;
mod blocking;
mod direct;
mod pending;

#[cfg(feature = "async")]
pub use awaiting::AsyncAdapter;
pub use blocking::BlockingAdapter;
pub use direct::{DirectWriteAdapter, OutboundChannel, WriteChannel};
pub use pending::PendingCall;

use std::io::{self, Read};

/// Request bytes for one call: the `content` field when the transport
/// supplied one, otherwise the whole input stream.
pub fn read_inbound<R: Read>(content: Option<&str>, mut input: R) -> io::Result<Vec<u8>> {
    if let Some(content) = content {
        return Ok(content.as_bytes().to_vec());
    }
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    Ok(bytes)
}
