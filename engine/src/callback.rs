use crate::buffer::{InputBuffer, OutputBuffer};
use crate::error::Result;
use crate::params::StreamState;
use tokio::sync::mpsc::Sender;
use tracing::warn;

/// Called once per block on the worker thread with the captured frames and
/// the playback frames to fill. Returns how many frames it produced; fewer
/// than requested ends the stream.
pub type DataCallback =
    Box<dyn FnMut(Option<InputBuffer<'_>>, Option<OutputBuffer<'_>>, usize) -> Result<usize> + Send>;

pub type StateCallback = Box<dyn FnMut(StreamState) + Send>;

pub fn data_callback<F>(f: F) -> DataCallback
where
    F: FnMut(Option<InputBuffer<'_>>, Option<OutputBuffer<'_>>, usize) -> Result<usize>
        + Send
        + 'static,
{
    Box::new(f)
}

pub fn state_callback<F>(f: F) -> StateCallback
where
    F: FnMut(StreamState) + Send + 'static,
{
    Box::new(f)
}

/// Forwards every notification into a tokio channel. The worker never blocks
/// on a full channel; dropped states are logged.
pub fn forward_state(tx: Sender<StreamState>) -> StateCallback {
    Box::new(move |state| {
        if let Err(e) = tx.try_send(state) {
            warn!("OSS stream state {:?} not delivered: {}", state, e);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_states_arrive_in_order() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        let mut cb = forward_state(tx);
        cb(StreamState::Started);
        cb(StreamState::Drained);
        assert_eq!(rx.try_recv().ok(), Some(StreamState::Started));
        assert_eq!(rx.try_recv().ok(), Some(StreamState::Drained));
    }

    #[test]
    fn full_channel_does_not_block() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(1);
        let mut cb = forward_state(tx);
        cb(StreamState::Started);
        cb(StreamState::Stopped);
        assert_eq!(rx.try_recv().ok(), Some(StreamState::Started));
        assert!(rx.try_recv().is_err());
    }
}
