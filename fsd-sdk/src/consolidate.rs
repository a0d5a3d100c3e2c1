//! Text consolidation.
//!
//! Servers relay long transmissions as bursts of `#TM` fragments. Rather
//! than delivering N events per burst, fragments for one (sender, address)
//! pair are accumulated while the window keeps being refreshed, and handed
//! to the consumer as a single ordered batch once the sender goes quiet —
//! or immediately, unmodified, when a fragment for a different pair
//! arrives. Radio (frequency-addressed) and private (callsign-addressed)
//! text use the same mechanism; only the key differs.
//!
//! The buffer holds no timer of its own: it exposes the next flush deadline
//! and the run loop's `select!` sleeps on it, so a new fragment cancels the
//! pending flush simply by moving the deadline. `clear()` is the teardown
//! path — pending fragments are discarded, never delivered.

use std::time::Duration;

use tokio::time::Instant;

use fsd_protocol::message::TextTarget;

/// Consolidation key: one batch per sender/address pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchKey {
    pub from: String,
    pub to: TextTarget,
}

/// One delivered burst: ordered message bodies from a single sender to a
/// single address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBatch {
    pub from: String,
    pub to: TextTarget,
    pub messages: Vec<String>,
}

#[derive(Debug)]
struct OpenBatch {
    key: BatchKey,
    messages: Vec<String>,
    deadline: Instant,
}

impl OpenBatch {
    fn into_batch(self) -> TextBatch {
        TextBatch {
            from: self.key.from,
            to: self.key.to,
            messages: self.messages,
        }
    }
}

/// At most one batch is open at a time: a fragment for a new key flushes
/// the old batch before opening its own.
#[derive(Debug)]
pub struct ConsolidationBuffer {
    window: Duration,
    open: Option<OpenBatch>,
}

impl ConsolidationBuffer {
    pub fn new(window: Duration) -> Self {
        ConsolidationBuffer { window, open: None }
    }

    /// Add a fragment. Returns the previously open batch when `key` differs
    /// from it (flush-on-key-change); otherwise the fragment joins the open
    /// batch and its window restarts.
    pub fn push(&mut self, key: BatchKey, text: String, now: Instant) -> Option<TextBatch> {
        let deadline = now + self.window;
        match &mut self.open {
            Some(open) if open.key == key => {
                open.messages.push(text);
                open.deadline = deadline;
                None
            }
            _ => {
                let flushed = self.open.take().map(OpenBatch::into_batch);
                self.open = Some(OpenBatch {
                    key,
                    messages: vec![text],
                    deadline,
                });
                flushed
            }
        }
    }

    /// Deadline the run loop should sleep until, if a batch is open.
    pub fn deadline(&self) -> Option<Instant> {
        self.open.as_ref().map(|open| open.deadline)
    }

    /// Flush the open batch if its window has elapsed.
    pub fn take_due(&mut self, now: Instant) -> Option<TextBatch> {
        if self.open.as_ref().is_some_and(|open| open.deadline <= now) {
            self.open.take().map(OpenBatch::into_batch)
        } else {
            None
        }
    }

    /// Discard the open batch without delivering it.
    pub fn clear(&mut self) {
        self.open = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(from: &str, to: &str) -> BatchKey {
        BatchKey {
            from: from.to_string(),
            to: TextTarget::Callsign(to.to_string()),
        }
    }

    #[test]
    fn same_key_accumulates_in_arrival_order() {
        let mut buf = ConsolidationBuffer::new(Duration::from_secs(1));
        let t0 = Instant::now();
        assert!(buf.push(key("EGLL_TWR", "BAW123"), "line one".into(), t0).is_none());
        assert!(
            buf.push(
                key("EGLL_TWR", "BAW123"),
                "line two".into(),
                t0 + Duration::from_millis(300),
            )
            .is_none()
        );

        // Window restarted by the second fragment: not due at t0 + 1s.
        assert!(buf.take_due(t0 + Duration::from_secs(1)).is_none());

        let batch = buf
            .take_due(t0 + Duration::from_millis(1300))
            .expect("window elapsed");
        assert_eq!(batch.messages, vec!["line one", "line two"]);
        assert_eq!(batch.from, "EGLL_TWR");
        assert!(buf.deadline().is_none());
    }

    #[test]
    fn different_key_flushes_previous_batch_unmodified() {
        let mut buf = ConsolidationBuffer::new(Duration::from_secs(1));
        let t0 = Instant::now();
        buf.push(key("EGLL_TWR", "BAW123"), "for baw".into(), t0);
        let flushed = buf
            .push(key("EGLL_TWR", "EZY45"), "for ezy".into(), t0)
            .expect("old key flushed");
        assert_eq!(flushed.messages, vec!["for baw"]);

        let next = buf.take_due(t0 + Duration::from_secs(2)).expect("new batch due");
        assert_eq!(next.messages, vec!["for ezy"]);
    }

    #[test]
    fn radio_and_private_addresses_are_distinct_keys() {
        let mut buf = ConsolidationBuffer::new(Duration::from_secs(1));
        let t0 = Instant::now();
        let radio = BatchKey {
            from: "EGLL_TWR".to_string(),
            to: TextTarget::Radio(118_500),
        };
        buf.push(radio, "on frequency".into(), t0);
        let flushed = buf.push(key("EGLL_TWR", "BAW123"), "privately".into(), t0);
        assert_eq!(flushed.unwrap().to, TextTarget::Radio(118_500));
    }

    #[test]
    fn clear_discards_without_delivery() {
        let mut buf = ConsolidationBuffer::new(Duration::from_secs(1));
        let t0 = Instant::now();
        buf.push(key("EGLL_TWR", "BAW123"), "doomed".into(), t0);
        buf.clear();
        assert!(buf.deadline().is_none());
        assert!(buf.take_due(t0 + Duration::from_secs(5)).is_none());
    }
}
