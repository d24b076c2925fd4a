//! Replay-latest publish/subscribe value.
//!
//! A new subscriber sees the current value first, then every later
//! change. Intermediate values may be skipped if a subscriber falls
//! behind; the latest one is never lost.

use futures::stream::{self, Stream, StreamExt};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

#[derive(Debug)]
pub struct Observable<T> {
    tx: watch::Sender<T>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Publish `value` to every live subscriber.
    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Publish only if the value differs from the current one.
    pub fn set_if_changed(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        self.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }

    /// Modify in place; subscribers are notified only if `f` returns true.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut T) -> bool,
    {
        self.tx.send_if_modified(f)
    }

    pub fn subscribe(&self) -> Subscription<T> {
        let mut rx = self.tx.subscribe();
        rx.mark_changed();
        Subscription { rx: Some(rx) }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[derive(Debug)]
pub struct Subscription<T> {
    rx: Option<watch::Receiver<T>>,
}

impl<T: Clone + Send + Sync + 'static> Subscription<T> {
    /// Wait for the next value. The first call returns the value current
    /// at subscription time. `None` once cancelled or the publisher is gone.
    pub async fn next(&mut self) -> Option<T> {
        let rx = self.rx.as_mut()?;
        match rx.changed().await {
            Ok(()) => Some(rx.borrow_and_update().clone()),
            Err(_) => {
                self.rx = None;
                None
            }
        }
    }

    pub fn latest(&self) -> Option<T> {
        self.rx.as_ref().map(|rx| rx.borrow().clone())
    }

    pub fn cancel(&mut self) {
        self.rx = None;
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.is_none()
    }

    /// Latest value first, then every change, until the publisher is gone.
    pub fn into_stream(self) -> impl Stream<Item = T> {
        stream::iter(self.rx).flat_map(WatchStream::new)
    }
}
