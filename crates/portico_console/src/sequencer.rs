//! Per-instance operation ordering.
//!
//! Every operation on an instance takes a [`Ticket`] at the moment it is
//! issued. Tickets are served strictly in issue order; a ticket dropped
//! before its turn is skipped, so a cancelled operation never stalls the ones
//! queued behind it.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;

#[derive(Debug, Default)]
struct Serving {
    current: u64,
    abandoned: BTreeSet<u64>,
}

/// A FIFO ticket queue.
#[derive(Debug)]
pub struct Sequencer {
    next: AtomicU64,
    serving: Mutex<Serving>,
    turn: watch::Sender<u64>,
}

impl Sequencer {
    /// An idle sequencer.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next: AtomicU64::new(0),
            serving: Mutex::new(Serving::default()),
            turn: watch::Sender::new(0),
        })
    }

    /// Takes the next place in line.
    #[must_use]
    pub fn ticket(self: &Arc<Self>) -> Ticket {
        let number = self.next.fetch_add(1, Ordering::SeqCst);
        Ticket {
            sequencer: Arc::clone(self),
            number,
        }
    }

    /// Returns true if no ticket is outstanding.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.serving.lock().current == self.next.load(Ordering::SeqCst)
    }

    /// Number of tickets issued and not yet finished.
    #[must_use]
    pub fn pending(&self) -> u64 {
        let serving = self.serving.lock();
        let issued = self.next.load(Ordering::SeqCst);
        issued
            .saturating_sub(serving.current)
            .saturating_sub(serving.abandoned.len() as u64)
    }

    fn finish(&self, number: u64) {
        let mut serving = self.serving.lock();
        if number != serving.current {
            serving.abandoned.insert(number);
            return;
        }
        serving.current += 1;
        loop {
            let current = serving.current;
            if !serving.abandoned.remove(&current) {
                break;
            }
            serving.current += 1;
        }
        self.turn.send_replace(serving.current);
    }
}

/// A place in a [`Sequencer`]'s line.
///
/// Dropping the ticket, or the [`Turn`] it becomes, lets the next one go.
#[derive(Debug)]
pub struct Ticket {
    sequencer: Arc<Sequencer>,
    number: u64,
}

impl Ticket {
    /// Position in issue order.
    #[must_use]
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Waits until every earlier ticket is finished.
    pub async fn wait(self) -> Turn {
        let mut turn = self.sequencer.turn.subscribe();
        let number = self.number;
        // The sender lives as long as the sequencer we hold, so this cannot fail.
        let _ = turn.wait_for(|current| *current >= number).await;
        Turn { _ticket: self }
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        self.sequencer.finish(self.number);
    }
}

/// Exclusive access to an instance until dropped.
#[derive(Debug)]
pub struct Turn {
    _ticket: Ticket,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn turns_follow_issue_order() {
        let sequencer = Sequencer::new();
        let first = sequencer.ticket();
        let second = sequencer.ticket();
        let log = Arc::new(Mutex::new(Vec::new()));

        let waiter = {
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                let _turn = second.wait().await;
                log.lock().push(2);
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(log.lock().is_empty());

        let turn = first.wait().await;
        log.lock().push(1);
        drop(turn);

        waiter.await.unwrap();
        assert_eq!(*log.lock(), vec![1, 2]);
        assert!(sequencer.is_idle());
    }

    #[tokio::test]
    async fn abandoned_tickets_are_skipped() {
        let sequencer = Sequencer::new();
        let first = sequencer.ticket();
        let abandoned = sequencer.ticket();
        let third = sequencer.ticket();
        assert_eq!(sequencer.pending(), 3);

        drop(abandoned);
        assert_eq!(sequencer.pending(), 2);
        drop(first.wait().await);

        let _turn = tokio::time::timeout(Duration::from_secs(1), third.wait())
            .await
            .expect("third ticket should be served");
        assert_eq!(sequencer.pending(), 1);
    }

    #[tokio::test]
    async fn cancelled_wait_releases_its_place() {
        let sequencer = Sequencer::new();
        let first = sequencer.ticket();
        let second = sequencer.ticket();
        let third = sequencer.ticket();

        let cancelled = tokio::spawn(second.wait());
        cancelled.abort();
        let _ = cancelled.await;

        drop(first);
        let _turn = tokio::time::timeout(Duration::from_secs(1), third.wait())
            .await
            .expect("third ticket should be served");
    }
}
