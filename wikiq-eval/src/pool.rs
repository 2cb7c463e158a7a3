//! Bounded-concurrency fan-out that preserves input order.

use futures_util::stream::{self, StreamExt};
use std::future::Future;

/// Run `f` over `items` with at most `concurrency` futures in flight.
///
/// Results come back in input order regardless of completion order: each
/// completion is written into the slot of its submission index. The first
/// error stops the fan-out; futures still in flight are dropped.
pub async fn try_map_ordered<T, R, E, F, Fut>(
    items: Vec<T>,
    concurrency: usize,
    f: F,
) -> Result<Vec<R>, E>
where
    F: Fn(usize, T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(items.len()).collect();

    let mut completions = stream::iter(items.into_iter().enumerate())
        .map(|(index, item)| {
            let fut = f(index, item);
            async move { (index, fut.await) }
        })
        .buffer_unordered(concurrency.max(1));

    while let Some((index, result)) = completions.next().await {
        slots[index] = Some(result?);
    }

    Ok(slots.into_iter().flatten().collect())
}
