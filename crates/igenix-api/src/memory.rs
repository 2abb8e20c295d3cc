// ── In-memory device link ──
//
// A scriptable stand-in for a real device. Stores written values and
// echoes them back in later snapshots, counts every round trip, and can
// be told to fail, hang, or panic on the next N calls of a given kind.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::Error;
use crate::identity::Location;
use crate::link::DeviceLink;
use crate::property::{DpsKey, PropertyValue, Snapshot, WriteAck};

/// The three kinds of round trip a link performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkOp {
    Resolve,
    Fetch,
    Write,
}

#[derive(Debug, Default)]
struct Script {
    fail: usize,
    stall: usize,
    panic: usize,
}

#[derive(Debug, Default)]
struct MemoryState {
    values: Snapshot,
    calls: HashMap<LinkOp, usize>,
    scripts: HashMap<LinkOp, Script>,
    writes: Vec<(DpsKey, PropertyValue)>,
    locations_used: Vec<Location>,
}

enum Outcome {
    Proceed,
    Fail,
    Stall,
    Panic,
}

/// A [`DeviceLink`] backed by a map.
#[derive(Debug)]
pub struct MemoryLink {
    location: Location,
    latency: Duration,
    state: Mutex<MemoryState>,
    writes_in_flight: AtomicUsize,
    overlapped: AtomicBool,
}

impl MemoryLink {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            latency: Duration::ZERO,
            state: Mutex::new(MemoryState::default()),
            writes_in_flight: AtomicUsize::new(0),
            overlapped: AtomicBool::new(false),
        }
    }

    /// Seed the device's current state.
    pub fn with_values<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = (u16, V)>,
        V: Into<PropertyValue>,
    {
        {
            let mut state = self.state();
            for (key, value) in values {
                state.values.insert(DpsKey::new(key), value.into());
            }
        }
        self
    }

    /// Make every round trip take `latency` before completing.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail the next `count` calls of `op`.
    pub fn fail_next(&self, op: LinkOp, count: usize) {
        self.state().scripts.entry(op).or_default().fail += count;
    }

    /// Never complete the next `count` calls of `op`.
    pub fn stall_next(&self, op: LinkOp, count: usize) {
        self.state().scripts.entry(op).or_default().stall += count;
    }

    /// Panic inside the next `count` calls of `op`, as a buggy link would.
    pub fn panic_next(&self, op: LinkOp, count: usize) {
        self.state().scripts.entry(op).or_default().panic += count;
    }

    /// Change a value as if the device had been operated by hand.
    pub fn set_value(&self, key: u16, value: impl Into<PropertyValue>) {
        self.state().values.insert(DpsKey::new(key), value.into());
    }

    pub fn value(&self, key: u16) -> Option<PropertyValue> {
        self.state().values.get(DpsKey::new(key)).cloned()
    }

    /// How many times `op` has been invoked, including failed and stalled calls.
    pub fn calls(&self, op: LinkOp) -> usize {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    /// Every write in the order it reached the link.
    pub fn writes(&self) -> Vec<(DpsKey, PropertyValue)> {
        self.state().writes.clone()
    }

    /// Locations passed to fetch and write calls, in call order.
    pub fn locations_used(&self) -> Vec<Location> {
        self.state().locations_used.clone()
    }

    /// `true` if two writes were ever in flight at the same time.
    pub fn saw_overlapping_writes(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, op: LinkOp, location: Option<&Location>) -> Outcome {
        let mut state = self.state();
        *state.calls.entry(op).or_insert(0) += 1;
        if let Some(location) = location {
            state.locations_used.push(location.clone());
        }
        let script = state.scripts.entry(op).or_default();
        if script.panic > 0 {
            script.panic -= 1;
            Outcome::Panic
        } else if script.stall > 0 {
            script.stall -= 1;
            Outcome::Stall
        } else if script.fail > 0 {
            script.fail -= 1;
            Outcome::Fail
        } else {
            Outcome::Proceed
        }
    }

    async fn settle(&self, outcome: Outcome, op: LinkOp) -> Result<(), Error> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match outcome {
            Outcome::Proceed => Ok(()),
            Outcome::Stall => std::future::pending().await,
            Outcome::Panic => panic!("scripted {op:?} panic"),
            Outcome::Fail => Err(match op {
                LinkOp::Resolve => Error::Discovery {
                    device_id: "memory".into(),
                },
                LinkOp::Fetch => Error::Disconnected,
                LinkOp::Write => Error::Rejected {
                    message: "scripted write failure".into(),
                },
            }),
        }
    }
}

/// Tracks one write in flight; flags overlap on entry, releases on drop
/// so a write abandoned by a timeout still counts as finished.
struct WriteGuard<'a> {
    link: &'a MemoryLink,
}

impl<'a> WriteGuard<'a> {
    fn enter(link: &'a MemoryLink) -> Self {
        if link.writes_in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            link.overlapped.store(true, Ordering::SeqCst);
        }
        Self { link }
    }
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.link.writes_in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl DeviceLink for MemoryLink {
    async fn resolve_location(&self) -> Result<Location, Error> {
        let outcome = self.begin(LinkOp::Resolve, None);
        self.settle(outcome, LinkOp::Resolve).await?;
        Ok(self.location.clone())
    }

    async fn fetch_snapshot(&self, location: &Location) -> Result<Snapshot, Error> {
        let outcome = self.begin(LinkOp::Fetch, Some(location));
        self.settle(outcome, LinkOp::Fetch).await?;
        Ok(self.state().values.clone())
    }

    async fn write_value(
        &self,
        location: &Location,
        key: DpsKey,
        value: PropertyValue,
    ) -> Result<WriteAck, Error> {
        let _guard = WriteGuard::enter(self);
        let outcome = self.begin(LinkOp::Write, Some(location));
        self.state().writes.push((key, value.clone()));
        self.settle(outcome, LinkOp::Write).await?;

        let mut state = self.state();
        state.values.insert(key, value.clone());
        Ok(WriteAck::new([(key, value)].into_iter().collect()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn link() -> MemoryLink {
        MemoryLink::new(Location::new([10, 0, 0, 7].into(), "3.3")).with_values([(1, true)])
    }

    #[tokio::test]
    async fn echoes_written_values() {
        let link = link();
        let location = link.resolve_location().await.unwrap();

        let ack = link
            .write_value(&location, DpsKey::new(2), PropertyValue::Integer(21))
            .await
            .unwrap();
        assert_eq!(ack.reported.get(DpsKey::new(2)), Some(&PropertyValue::Integer(21)));

        let snapshot = link.fetch_snapshot(&location).await.unwrap();
        assert_eq!(snapshot.get(DpsKey::new(2)), Some(&PropertyValue::Integer(21)));
        assert_eq!(snapshot.get(DpsKey::new(1)), Some(&PropertyValue::Bool(true)));
        assert_eq!(link.calls(LinkOp::Write), 1);
        assert_eq!(link.calls(LinkOp::Fetch), 1);
    }

    #[tokio::test]
    async fn scripted_failures_are_consumed() {
        let link = link();
        link.fail_next(LinkOp::Resolve, 1);

        assert!(matches!(
            link.resolve_location().await,
            Err(Error::Discovery { .. })
        ));
        assert!(link.resolve_location().await.is_ok());
        assert_eq!(link.calls(LinkOp::Resolve), 2);
    }

    #[tokio::test]
    async fn failed_write_leaves_value_unchanged() {
        let link = link();
        let location = link.resolve_location().await.unwrap();
        link.fail_next(LinkOp::Write, 1);

        let result = link
            .write_value(&location, DpsKey::new(1), PropertyValue::Bool(false))
            .await;

        assert!(matches!(result, Err(Error::Rejected { .. })));
        assert_eq!(link.value(1), Some(PropertyValue::Bool(true)));
        assert_eq!(link.writes().len(), 1);
    }
}
