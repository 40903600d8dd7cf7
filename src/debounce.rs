use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::channel::oneshot;
use futures_timer::Delay;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

pub type BoxedDebounceFuture<R> = Pin<Box<dyn Future<Output = R> + Send + 'static>>;

type DebouncedFn<A, R> = Arc<dyn Fn(A) -> BoxedDebounceFuture<R> + Send + Sync>;

/// Collapses rapid calls into a single trailing invocation of the wrapped
/// async function.
///
/// Each call starts (or restarts) the collapse window. Only the last call
/// within a window invokes the wrapped function, with its own arguments;
/// calls superseded inside the window settle with the trailing run's
/// broadcast result instead of one of their own.
pub struct Debounced<A, R> {
    wait: Duration,
    generation: AtomicU64,
    waiters: Mutex<Vec<(u64, oneshot::Sender<R>)>>,
    func: DebouncedFn<A, R>,
}

impl<A, R> Debounced<A, R>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    pub fn new<F, Fut>(wait: Duration, func: F) -> Arc<Self>
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        Arc::new(Self {
            wait,
            generation: AtomicU64::new(0),
            waiters: Mutex::new(Vec::new()),
            func: Arc::new(move |args| Box::pin(func(args))),
        })
    }

    /// Wraps `func` with the stock [`DEFAULT_DEBOUNCE`] window.
    pub fn with_default_wait<F, Fut>(func: F) -> Arc<Self>
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        Self::new(DEFAULT_DEBOUNCE, func)
    }

    /// Schedules the wrapped function. The generation bump and waiter
    /// registration happen synchronously, so issuing several calls before
    /// polling any of their futures still collapses them into one window.
    pub fn call(self: &Arc<Self>, args: A) -> BoxedDebounceFuture<R> {
        let this = Arc::clone(self);
        let generation = this.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (sender, receiver) = oneshot::channel();
        {
            let mut waiters = match this.waiters.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            waiters.push((generation, sender));
        }

        Box::pin(async move {
            Delay::new(this.wait).await;
            if this.generation.load(Ordering::SeqCst) != generation {
                // Superseded inside the window; share the trailing outcome.
                return match receiver.await {
                    Ok(result) => result,
                    // Trailing run dropped before settling; stay pending,
                    // like a cleared timer.
                    Err(oneshot::Canceled) => futures::future::pending().await,
                };
            }

            let result = (this.func)(args).await;
            let settled = {
                let mut waiters = match this.waiters.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                let mut settled = Vec::new();
                let mut pending = Vec::new();
                for (waiter_generation, sender) in waiters.drain(..) {
                    if waiter_generation <= generation {
                        settled.push(sender);
                    } else {
                        // Belongs to a window opened after this run began.
                        pending.push((waiter_generation, sender));
                    }
                }
                *waiters = pending;
                settled
            };
            for sender in settled {
                let _ = sender.send(result.clone());
            }
            result
        })
    }
}
