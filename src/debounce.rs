use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

pub const DEFAULT_REVEAL_DELAY: Duration = Duration::from_millis(300);

/// Single-slot timer: arming cancels whatever was pending, so only the last
/// edit inside the window ever fires.
///
/// Every arm gets a fresh generation number. The fired message carries it, and
/// the receiver checks `is_current` to drop a message that was already queued
/// when a newer arm happened.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            pending: None,
        }
    }

    /// Cancels the pending timer and arms a new one that sends `make(generation)`.
    pub fn arm<T, F>(&mut self, tx: UnboundedSender<T>, make: F) -> u64
    where
        T: Send + 'static,
        F: FnOnce(u64) -> T + Send + 'static,
    {
        self.cancel();
        let generation = self.generation;
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(make(generation));
        }));
        generation
    }

    /// Drops the pending timer, if any. A message already in flight is
    /// invalidated through the generation bump.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.generation += 1;
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation && self.pending.is_some()
    }

    /// Marks a fired generation as consumed.
    pub fn settle(&mut self) {
        self.pending = None;
        self.generation += 1;
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_the_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(DEFAULT_REVEAL_DELAY);

        let generation = debouncer.arm(tx, |g| g);
        tokio::time::sleep(Duration::from_millis(299)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2)).await;
        let fired = rx.recv().await.expect("fired");
        assert_eq!(fired, generation);
        assert!(debouncer.is_current(fired));
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_inside_the_window_keeps_only_the_last() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(DEFAULT_REVEAL_DELAY);

        debouncer.arm(tx.clone(), |g| g);
        tokio::time::sleep(Duration::from_millis(200)).await;
        debouncer.arm(tx.clone(), |g| g);
        tokio::time::sleep(Duration::from_millis(200)).await;
        let last = debouncer.arm(tx, |g| g);

        tokio::time::sleep(Duration::from_millis(301)).await;
        let fired = rx.recv().await.expect("fired");
        assert_eq!(fired, last);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_firing_sends_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel::<u64>();
        let mut debouncer = Debouncer::new(DEFAULT_REVEAL_DELAY);

        debouncer.arm(tx, |g| g);
        debouncer.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_generation_is_rejected() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(Duration::from_millis(10));

        let first = debouncer.arm(tx.clone(), |g| g);
        tokio::time::sleep(Duration::from_millis(20)).await;
        let queued = rx.recv().await.expect("fired");
        assert_eq!(queued, first);

        // A newer edit arrives before the queued message is handled.
        debouncer.arm(tx, |g| g);
        assert!(!debouncer.is_current(queued));
    }

    #[tokio::test(start_paused = true)]
    async fn settled_generation_is_not_current_anymore() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(Duration::from_millis(10));

        debouncer.arm(tx, |g| g);
        tokio::time::sleep(Duration::from_millis(20)).await;
        let fired = rx.recv().await.expect("fired");
        assert!(debouncer.is_current(fired));
        debouncer.settle();
        assert!(!debouncer.is_current(fired));
    }
}
