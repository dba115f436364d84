//! Wait-for-completion over chunked output streams.
//!
//! Both the exec runner and the log pump consume streams that emit data
//! chunks and then a terminal end. This module provides the single wait
//! primitive shared by them: drain the stream, surface every chunk in
//! order, and resolve exactly once — on end, on the first stream error, or
//! when an optional deadline elapses.

use futures::{Stream, StreamExt};
use std::pin::pin;
use std::time::Duration;
use tokio::time::timeout;

/// Why [`await_end`] resolved without reaching the stream's end.
#[derive(Debug)]
pub enum WaitError<E> {
    /// The stream errored before its end.
    Stream(E),
    /// The configured deadline elapsed first.
    DeadlineExceeded(Duration),
}

/// Consumes `stream` until it ends, feeding every chunk to `on_chunk` in
/// emission order. No chunk is surfaced after resolution.
///
/// The caller hands over the stream returned by the producing call, so end
/// and error arrive through this one return channel and neither can be
/// missed or observed twice.
pub async fn await_end<S, T, E, F>(
    stream: S,
    mut on_chunk: F,
    deadline: Option<Duration>,
) -> Result<(), WaitError<E>>
where
    S: Stream<Item = std::result::Result<T, E>>,
    F: FnMut(T),
{
    let drain = async {
        let mut stream = pin!(stream);
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => on_chunk(chunk),
                Err(e) => return Err(WaitError::Stream(e)),
            }
        }
        Ok(())
    };

    match deadline {
        Some(limit) => match timeout(limit, drain).await {
            Ok(result) => result,
            Err(_) => Err(WaitError::DeadlineExceeded(limit)),
        },
        None => drain.await,
    }
}
