// Copyright 2026 roster Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{fmt::Debug, hash::Hash, sync::Arc};

use futures_util::future::BoxFuture;
use hashbrown::HashMap;
use parking_lot::Mutex;
use roster_common::{
    error::{Error, ErrorKind, Result},
    spawn::Spawner,
};
use tokio::sync::oneshot;

/// The external call a flight runs.
pub type FetchFuture<T> = BoxFuture<'static, Result<T>>;
/// Sends the outcome of a flight to one waiter.
pub type Notifier<T> = oneshot::Sender<Result<T>>;
/// Receives the outcome of a flight.
pub type Waiter<T> = oneshot::Receiver<Result<T>>;
/// A continuation run once with the outcome of a flight.
pub type Callback<T> = Box<dyn FnOnce(&Result<T>) + Send + 'static>;

enum FlightState<T> {
    Idle(FetchFuture<T>),
    Running {
        notifiers: Vec<Notifier<T>>,
        callbacks: Vec<Callback<T>>,
    },
    Done(Result<T>),
}

impl<T> Debug for FlightState<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle(_) => f.debug_struct("Idle").finish(),
            Self::Running { notifiers, callbacks } => f
                .debug_struct("Running")
                .field("notifiers", &notifiers.len())
                .field("callbacks", &callbacks.len())
                .finish(),
            Self::Done(res) => f.debug_tuple("Done").field(res).finish(),
        }
    }
}

/// A single external call shared by every party interested in its outcome.
///
/// The call starts on the first [`Flight::wait`] or [`Flight::on_complete`] and then runs to completion on
/// the spawner even if every waiter goes away. Later parties observe the same outcome: they either join
/// the running call or read the stored result.
pub struct Flight<T> {
    kind: &'static str,
    state: Mutex<FlightState<T>>,
    spawner: Spawner,
}

impl<T> Debug for Flight<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flight")
            .field("kind", &self.kind)
            .field("state", &*self.state.lock())
            .finish()
    }
}

enum Join<T> {
    Joined,
    Start(FetchFuture<T>),
    Ready(Result<T>),
}

impl<T> Flight<T>
where
    T: Clone + Send + 'static,
{
    /// A flight that will run `fetch` once triggered.
    pub fn new(kind: &'static str, fetch: FetchFuture<T>, spawner: Spawner) -> Arc<Self> {
        Arc::new(Self {
            kind,
            state: Mutex::new(FlightState::Idle(fetch)),
            spawner,
        })
    }

    /// A flight that already finished with `res`.
    pub fn ready(kind: &'static str, res: Result<T>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            state: Mutex::new(FlightState::Done(res)),
            spawner: Spawner::Current,
        })
    }

    /// Entity kind the flight resolves.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Whether the outcome is known.
    pub fn is_done(&self) -> bool {
        matches!(&*self.state.lock(), FlightState::Done(_))
    }

    /// Whether the external call has been started.
    pub fn is_started(&self) -> bool {
        !matches!(&*self.state.lock(), FlightState::Idle(_))
    }

    /// The outcome, if known.
    pub fn peek(&self) -> Option<Result<T>> {
        match &*self.state.lock() {
            FlightState::Done(res) => Some(res.clone()),
            _ => None,
        }
    }

    /// Join the flight, starting it if needed.
    ///
    /// Returns the outcome directly if it is already known.
    pub fn wait(self: &Arc<Self>) -> std::result::Result<Result<T>, Waiter<T>> {
        let (tx, rx) = oneshot::channel();
        match self.join(Some(tx), None) {
            Join::Ready(res) => Ok(res),
            Join::Joined => Err(rx),
            Join::Start(fetch) => {
                self.launch(fetch);
                Err(rx)
            }
        }
    }

    /// Run `callback` with the outcome, starting the flight if needed.
    ///
    /// If the outcome is already known the callback runs before this returns.
    pub fn on_complete(self: &Arc<Self>, callback: Callback<T>) {
        match self.join(None, Some(callback)) {
            Join::Start(fetch) => self.launch(fetch),
            Join::Joined | Join::Ready(_) => {}
        }
    }

    fn join(&self, notifier: Option<Notifier<T>>, callback: Option<Callback<T>>) -> Join<T> {
        let mut state = self.state.lock();
        let res = match &mut *state {
            FlightState::Done(res) => res.clone(),
            FlightState::Running { notifiers, callbacks } => {
                notifiers.extend(notifier);
                callbacks.extend(callback);
                return Join::Joined;
            }
            FlightState::Idle(_) => {
                let running = FlightState::Running {
                    notifiers: notifier.into_iter().collect(),
                    callbacks: callback.into_iter().collect(),
                };
                return match std::mem::replace(&mut *state, running) {
                    FlightState::Idle(fetch) => Join::Start(fetch),
                    _ => Join::Joined,
                };
            }
        };
        drop(state);

        match callback {
            Some(callback) => {
                callback(&res);
                Join::Joined
            }
            None => Join::Ready(res),
        }
    }

    #[cfg_attr(feature = "tracing", fastrace::trace(name = "roster::memory::flight::launch"))]
    fn launch(self: &Arc<Self>, fetch: FetchFuture<T>) {
        tracing::debug!(kind = self.kind, "[flight]: start resolution");

        let guard = CompletionGuard {
            flight: Some(self.clone()),
        };
        let spawned = self.spawner.spawn(async move {
            let mut guard = guard;
            let res = fetch.await;
            if let Some(flight) = guard.flight.take() {
                flight.complete(res);
            }
        });

        // The future and its guard were dropped with the failed spawn, which already completed the flight.
        if let Err(e) = spawned {
            tracing::warn!(kind = self.kind, ?e, "[flight]: cannot spawn resolution");
        }
    }

    fn complete(&self, res: Result<T>) {
        let prev = std::mem::replace(&mut *self.state.lock(), FlightState::Done(res.clone()));
        if let Err(e) = &res {
            tracing::debug!(kind = self.kind, %e, "[flight]: resolution failed");
        }
        if let FlightState::Running { notifiers, callbacks } = prev {
            for notifier in notifiers {
                // The waiter may be gone.
                let _ = notifier.send(res.clone());
            }
            for callback in callbacks {
                callback(&res);
            }
        }
    }
}

/// Completes the flight with a [`ErrorKind::Closed`] error if the driving task is dropped early.
struct CompletionGuard<T>
where
    T: Clone + Send + 'static,
{
    flight: Option<Arc<Flight<T>>>,
}

impl<T> Drop for CompletionGuard<T>
where
    T: Clone + Send + 'static,
{
    fn drop(&mut self) {
        if let Some(flight) = self.flight.take() {
            flight.complete(Err(Error::new(
                ErrorKind::Closed,
                "resolution dropped before completion",
            )
            .with_context("kind", flight.kind)));
        }
    }
}

/// Deduplicates concurrent flights for the same key.
///
/// Finished flights are pruned lazily, so a key whose flight completed starts a fresh one next time.
pub struct InflightMap<K, T> {
    inflights: Mutex<HashMap<K, Arc<Flight<T>>>>,
}

impl<K, T> Debug for InflightMap<K, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InflightMap")
            .field("inflights", &self.inflights.lock().len())
            .finish()
    }
}

impl<K, T> Default for InflightMap<K, T> {
    fn default() -> Self {
        Self {
            inflights: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, T> InflightMap<K, T>
where
    K: Hash + Eq,
    T: Clone + Send + 'static,
{
    /// Join the unfinished flight of `key`, or register the one built by `make`.
    pub fn get_or_insert_with<F>(&self, key: K, make: F) -> Arc<Flight<T>>
    where
        F: FnOnce() -> Arc<Flight<T>>,
    {
        let mut inflights = self.inflights.lock();
        inflights.retain(|_, flight| !flight.is_done());
        inflights.entry(key).or_insert_with(make).clone()
    }

    /// Number of unfinished flights.
    pub fn len(&self) -> usize {
        let mut inflights = self.inflights.lock();
        inflights.retain(|_, flight| !flight.is_done());
        inflights.len()
    }

    /// Whether no flight is unfinished.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
