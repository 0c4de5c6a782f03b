//! Multi-server poll scheduler
//!
//! A [`Manager`] owns a set of [`Client`]s, one per [`ClientEndpoint`], and
//! keeps querying each of them from a background task. After every query the
//! client is re-armed for the window it reported; a client whose server
//! denied access stays dormant until it is removed and added again.
//!
//! The offsets of all clients in a good state are combined into
//! [`Manager::system_clock_offset`].
use core::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::{Id, JoinError, JoinSet};
use tokio::time::Instant;

use crate::client::{Client, ClientEndpoint};
use crate::config::{ManagerConfig, MIN_POLL_INTERVAL, WELL_KNOWN_SERVERS};
use crate::log::{debug, trace, warn};
use crate::socket::NtpUdpSocket;
use crate::time::{seconds_to_datetime, TimeSource};
use crate::types::{Error, QueryOutcome, RequestWindow};
use crate::NtpContext;

/// Per-client bookkeeping of a [`Manager`]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ManagerEntry {
    /// Completed queries
    pub number_of_requests: u64,
    /// Send time of the last completed query
    pub last_request_date: Option<f64>,
    pub next_request_window: RequestWindow,
    /// Error of the last query, cleared by a successful one
    pub error: Option<Error>,
    /// Offset measured by the last successful query
    pub offset: Option<f64>,
    pub in_flight: bool,
}

impl ManagerEntry {
    fn new(now: f64) -> Self {
        ManagerEntry {
            number_of_requests: 0,
            last_request_date: None,
            next_request_window: RequestWindow::At(now),
            error: None,
            offset: None,
            in_flight: false,
        }
    }

    /// Offset usable for aggregation
    fn valid_offset(&self) -> Option<f64> {
        match self.error {
            None => self.offset,
            Some(_) => None,
        }
    }

    fn record(&mut self, outcome: &QueryOutcome) {
        self.number_of_requests += 1;
        self.last_request_date = Some(outcome.request_date);
        self.next_request_window = outcome.next_request_window;
        self.in_flight = false;

        match outcome.result {
            Ok(result) => {
                self.error = None;
                self.offset = Some(result.offset);
            }
            Err(err) => self.error = Some(err),
        }
    }
}

struct Slot<S> {
    client: Arc<Client<S>>,
    entry: ManagerEntry,
    /// Distinguishes a re-added endpoint from its removed predecessor
    generation: u64,
}

type Slots<S> = BTreeMap<ClientEndpoint, Slot<S>>;

struct Shared<S> {
    slots: Mutex<Slots<S>>,
    clock: Arc<dyn TimeSource>,
}

impl<S> Shared<S> {
    fn slots(&self) -> MutexGuard<'_, Slots<S>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

enum Command {
    /// Query a newly added client right away
    Arm {
        endpoint: ClientEndpoint,
        generation: u64,
    },
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Scheduled {
    due: Instant,
    seq: u64,
    endpoint: ClientEndpoint,
    generation: u64,
}

/// Keeps a set of clients polling and aggregates their offsets.
///
/// Dropping the manager stops all scheduling; queries still in flight are
/// cancelled.
pub struct Manager<S> {
    context: NtpContext<S>,
    config: ManagerConfig,
    shared: Arc<Shared<S>>,
    commands: mpsc::UnboundedSender<Command>,
    next_generation: AtomicU64,
}

impl<S: NtpUdpSocket + 'static> Manager<S> {
    /// Creates a manager without clients.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime, since the scheduling
    /// task is spawned right away.
    pub fn new(context: NtpContext<S>) -> Self {
        Manager::with_config(context, ManagerConfig::default())
    }

    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn with_config(context: NtpContext<S>, config: ManagerConfig) -> Self {
        let shared = Arc::new(Shared {
            slots: Mutex::new(BTreeMap::new()),
            clock: Arc::clone(&context.clock),
        });
        let (commands, rx) = mpsc::unbounded_channel();

        tokio::spawn(Scheduler::new(Arc::clone(&shared), rx).run());

        Manager {
            context,
            config,
            shared,
            commands,
            next_generation: AtomicU64::new(0),
        }
    }

    /// Adds a client for `endpoint` and schedules its first query.
    /// Returns `false` if the endpoint is already managed.
    pub fn add_client(&self, endpoint: ClientEndpoint) -> bool {
        let mut slots = self.shared.slots();

        if slots.contains_key(&endpoint) {
            return false;
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let client = Client::with_config(
            endpoint.clone(),
            self.context.clone(),
            self.config.client_config(),
        );

        debug!("Adding client {}", endpoint);

        slots.insert(
            endpoint.clone(),
            Slot {
                client: Arc::new(client),
                entry: ManagerEntry::new(self.shared.clock.now()),
                generation,
            },
        );
        drop(slots);

        // the scheduler only stops once the manager is dropped
        let _ = self.commands.send(Command::Arm {
            endpoint,
            generation,
        });

        true
    }

    /// Removes the client of `endpoint`. A query in flight for it completes
    /// unobserved.
    pub fn remove_client(&self, endpoint: &ClientEndpoint) -> bool {
        let removed = self.shared.slots().remove(endpoint).is_some();

        if removed {
            debug!("Removed client {}", endpoint);
        }

        removed
    }

    pub fn remove_all_clients(&self) {
        self.shared.slots().clear();
    }

    /// Replaces the managed set. Endpoints present before and after keep
    /// their client and entry.
    pub fn set_clients<I>(&self, endpoints: I)
    where
        I: IntoIterator<Item = ClientEndpoint>,
    {
        let wanted: Vec<ClientEndpoint> = endpoints.into_iter().collect();

        self.shared
            .slots()
            .retain(|endpoint, _| wanted.contains(endpoint));

        for endpoint in wanted {
            self.add_client(endpoint);
        }
    }

    /// Adds the public Apple time servers. Returns the number of servers
    /// that were not managed yet.
    pub fn add_well_known_servers(&self) -> usize {
        WELL_KNOWN_SERVERS
            .iter()
            .filter(|host| self.add_client(ClientEndpoint::new(**host, self.config.port)))
            .count()
    }
}

impl<S> Manager<S> {
    /// Managed endpoints in order
    #[must_use]
    pub fn endpoints(&self) -> Vec<ClientEndpoint> {
        self.shared.slots().keys().cloned().collect()
    }

    #[must_use]
    pub fn clients(&self) -> Vec<Arc<Client<S>>> {
        self.shared
            .slots()
            .values()
            .map(|slot| Arc::clone(&slot.client))
            .collect()
    }

    #[must_use]
    pub fn client(&self, endpoint: &ClientEndpoint) -> Option<Arc<Client<S>>> {
        self.shared
            .slots()
            .get(endpoint)
            .map(|slot| Arc::clone(&slot.client))
    }

    #[must_use]
    pub fn entry(&self, endpoint: &ClientEndpoint) -> Option<ManagerEntry> {
        self.shared.slots().get(endpoint).map(|slot| slot.entry)
    }

    #[must_use]
    pub fn entries(&self) -> Vec<(ClientEndpoint, ManagerEntry)> {
        self.shared
            .slots()
            .iter()
            .map(|(endpoint, slot)| (endpoint.clone(), slot.entry))
            .collect()
    }

    /// Combined offset of all clients whose last query succeeded, 0 when
    /// there are none
    #[must_use]
    pub fn system_clock_offset(&self) -> f64 {
        let offsets = self
            .shared
            .slots()
            .values()
            .filter_map(|slot| slot.entry.valid_offset())
            .collect();

        aggregate_offset(offsets)
    }

    /// Local time corrected by [`Manager::system_clock_offset`], seconds
    /// since the NTP epoch
    #[must_use]
    pub fn now(&self) -> f64 {
        self.shared.clock.now() + self.system_clock_offset()
    }

    #[must_use]
    pub fn now_datetime(&self) -> Option<DateTime<Utc>> {
        seconds_to_datetime(self.now())
    }

    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }
}

/// Combines client offsets: the only one, the one closer to zero of two,
/// otherwise the median.
pub(crate) fn aggregate_offset(mut offsets: Vec<f64>) -> f64 {
    match offsets.as_slice() {
        [] => 0.0,
        [offset] => *offset,
        [a, b] => {
            if a.abs() <= b.abs() {
                *a
            } else {
                *b
            }
        }
        _ => {
            offsets.sort_by(f64::total_cmp);
            let mid = offsets.len() / 2;

            if offsets.len() % 2 == 0 {
                (offsets[mid - 1] + offsets[mid]) / 2.0
            } else {
                offsets[mid]
            }
        }
    }
}

/// Background task of a manager. Sole writer of the scheduling fields of
/// every entry.
struct Scheduler<S> {
    shared: Arc<Shared<S>>,
    commands: mpsc::UnboundedReceiver<Command>,
    queue: BinaryHeap<Reverse<Scheduled>>,
    queries: JoinSet<QueryOutcome>,
    /// Client and generation of every query task in `queries`
    tasks: HashMap<Id, (ClientEndpoint, u64)>,
    seq: u64,
}

impl<S: NtpUdpSocket + 'static> Scheduler<S> {
    fn new(shared: Arc<Shared<S>>, commands: mpsc::UnboundedReceiver<Command>) -> Self {
        Scheduler {
            shared,
            commands,
            queue: BinaryHeap::new(),
            queries: JoinSet::new(),
            tasks: HashMap::new(),
            seq: 0,
        }
    }

    async fn run(mut self) {
        loop {
            let next_due = self.queue.peek().map(|Reverse(scheduled)| scheduled.due);
            let wait = async move {
                match next_due {
                    Some(due) => tokio::time::sleep_until(due).await,
                    None => core::future::pending().await,
                }
            };

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Arm { endpoint, generation }) => {
                        self.schedule(endpoint, generation, Instant::now());
                    }
                    None => break,
                },
                Some(joined) = self.queries.join_next_with_id() => match joined {
                    Ok((id, outcome)) => {
                        if let Some((endpoint, generation)) = self.tasks.remove(&id) {
                            self.complete(endpoint, generation, &outcome);
                        }
                    }
                    Err(err) => self.fail(&err),
                },
                () = wait => self.start_due(),
            }
        }

        trace!("Manager dropped, scheduler stopped");
    }

    fn schedule(&mut self, endpoint: ClientEndpoint, generation: u64, due: Instant) {
        self.seq += 1;
        self.queue.push(Reverse(Scheduled {
            due,
            seq: self.seq,
            endpoint,
            generation,
        }));
    }

    fn start_due(&mut self) {
        let now = Instant::now();

        while let Some(Reverse(scheduled)) = self.queue.peek() {
            if scheduled.due > now {
                break;
            }

            let Some(Reverse(scheduled)) = self.queue.pop() else {
                break;
            };
            self.start(scheduled.endpoint, scheduled.generation);
        }
    }

    fn start(&mut self, endpoint: ClientEndpoint, generation: u64) {
        let client = {
            let mut slots = self.shared.slots();
            let Some(slot) = slots
                .get_mut(&endpoint)
                .filter(|slot| slot.generation == generation && !slot.entry.in_flight)
            else {
                trace!("Skipping stale schedule for {}", endpoint);
                return;
            };

            slot.entry.in_flight = true;
            Arc::clone(&slot.client)
        };

        debug!("Querying {}", endpoint);

        let task = self.queries.spawn(async move { client.query_time().await });
        self.tasks.insert(task.id(), (endpoint, generation));
    }

    /// A query task died without an outcome. The client is retried after
    /// the minimum poll interval.
    fn fail(&mut self, err: &JoinError) {
        let Some((endpoint, generation)) = self.tasks.remove(&err.id()) else {
            return;
        };

        warn!("Query to {} failed: {}", endpoint, err);

        let now = self.shared.clock.now();
        let outcome = QueryOutcome {
            result: Err(Error::Network),
            next_request_window: RequestWindow::At(now + MIN_POLL_INTERVAL),
            request_date: now,
        };
        self.complete(endpoint, generation, &outcome);
    }

    fn complete(&mut self, endpoint: ClientEndpoint, generation: u64, outcome: &QueryOutcome) {
        let window = {
            let mut slots = self.shared.slots();
            let Some(slot) = slots
                .get_mut(&endpoint)
                .filter(|slot| slot.generation == generation)
            else {
                trace!("Discarding result for removed client {}", endpoint);
                return;
            };

            slot.entry.record(outcome);
            slot.entry.next_request_window
        };

        match window {
            RequestWindow::At(at) => {
                let delay = (at - self.shared.clock.now()).max(0.0);
                let delay = Duration::try_from_secs_f64(delay).unwrap_or(Duration::ZERO);

                debug!("Next query to {} in {:.3} s", endpoint, delay.as_secs_f64());
                self.schedule(endpoint, generation, Instant::now() + delay);
            }
            RequestWindow::DistantFuture => {
                debug!("Client {} is dormant", endpoint);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_offset() {
        assert_eq!(aggregate_offset(vec![]), 0.0);
        assert_eq!(aggregate_offset(vec![-3.5]), -3.5);
        assert_eq!(aggregate_offset(vec![2.0, -1.0]), -1.0);
        assert_eq!(aggregate_offset(vec![-1.0, 1.0]), -1.0);
        assert_eq!(aggregate_offset(vec![9.0, 1.0, 2.0]), 2.0);
        assert_eq!(aggregate_offset(vec![4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(aggregate_offset(vec![0.1, -100.0, 0.2, 0.3, 100.0]), 0.2);
    }

    #[test]
    fn test_entry_record() {
        let mut entry = ManagerEntry::new(10.0);
        entry.in_flight = true;

        let outcome = QueryOutcome {
            result: Err(Error::Timeout),
            next_request_window: RequestWindow::At(25.0),
            request_date: 10.0,
        };
        entry.record(&outcome);

        assert_eq!(entry.number_of_requests, 1);
        assert_eq!(entry.last_request_date, Some(10.0));
        assert_eq!(entry.next_request_window, RequestWindow::At(25.0));
        assert_eq!(entry.error, Some(Error::Timeout));
        assert_eq!(entry.valid_offset(), None);
        assert!(!entry.in_flight);
    }
}
