//! Live views: a collection re-read in full whenever a matching change lands.

use std::future::Future;

use anyhow::Result;
use futures::stream::{self, Stream};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::Receiver;

use crate::domain::change::{ChangeEvent, ChangeFilter};

/// Yields `fetch()` once immediately, then again after every change that
/// `filter` matches. The stream ends when the change feed closes.
///
/// Changes that pile up while a fetch is running are folded into a single
/// follow-up fetch. A receiver that lags behind the feed refetches rather
/// than trying to work out what it missed.
pub fn watch<T, F, Fut>(
    receiver: Receiver<ChangeEvent>,
    filter: ChangeFilter,
    fetch: F,
) -> impl Stream<Item = Result<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    stream::unfold(
        (receiver, fetch, true),
        move |(mut receiver, mut fetch, first)| async move {
            if !first && !next_match(&mut receiver, filter).await {
                return None;
            }
            let snapshot = fetch().await;
            Some((snapshot, (receiver, fetch, false)))
        },
    )
}

/// Waits for a matching change, then drains whatever else is already queued.
/// Returns false once the feed is closed.
async fn next_match(receiver: &mut Receiver<ChangeEvent>, filter: ChangeFilter) -> bool {
    loop {
        match receiver.recv().await {
            Ok(event) if filter.matches(&event) => break,
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, filter = ?filter, "live view lagged behind change feed");
                break;
            }
            Err(RecvError::Closed) => return false,
        }
    }

    loop {
        match receiver.try_recv() {
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return true,
        }
    }
}
