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

use std::{
    fmt::Debug,
    future::{Future, IntoFuture},
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use pin_project::pin_project;
use roster_common::error::{Error, ErrorKind, Result};

use crate::inflight::{Callback, Flight, Waiter};

/// Stand-in for an entity that is not cached, resolving it from the external source on demand.
///
/// The external call is made at most once: the first await or [`Placeholder::on_resolved`] starts it and
/// every other await or continuation, including those on clones and on other placeholders for the same key,
/// observes the same outcome. Awaiting after completion answers immediately with the stored outcome.
///
/// The resolved entity is not inserted into the cache.
pub struct Placeholder<K, T> {
    key: K,
    flight: Arc<Flight<T>>,
}

impl<K, T> Clone for Placeholder<K, T>
where
    K: Clone,
{
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            flight: self.flight.clone(),
        }
    }
}

impl<K, T> Debug for Placeholder<K, T>
where
    K: Debug,
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Placeholder")
            .field("key", &self.key)
            .field("flight", &self.flight)
            .finish()
    }
}

impl<K, T> Placeholder<K, T>
where
    T: Clone + Send + 'static,
{
    /// Wrap a flight resolving the entity of `key`.
    pub fn new(key: K, flight: Arc<Flight<T>>) -> Self {
        Self { key, flight }
    }

    /// The key of the missing entity.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The entity kind this placeholder resolves.
    pub fn kind(&self) -> &'static str {
        self.flight.kind()
    }

    /// Whether the outcome is known.
    pub fn is_resolved(&self) -> bool {
        self.flight.is_done()
    }

    /// The outcome, if known. Never starts the resolution.
    pub fn peek(&self) -> Option<Result<T>> {
        self.flight.peek()
    }

    /// Start the resolution if needed and wait for its outcome.
    pub fn resolve(&self) -> Resolve<T> {
        match self.flight.wait() {
            Ok(res) => Resolve::Ready(Some(res)),
            Err(waiter) => Resolve::Wait(waiter),
        }
    }

    /// Run `callback` with the outcome, starting the resolution if needed.
    ///
    /// The callback runs on the task driving the resolution, or in place if the outcome is already known.
    pub fn on_resolved<F>(&self, callback: F)
    where
        F: FnOnce(&Result<T>) + Send + 'static,
    {
        self.flight.on_complete(Box::new(callback) as Callback<T>);
    }
}

impl<K, T> IntoFuture for Placeholder<K, T>
where
    T: Clone + Send + 'static,
{
    type Output = Result<T>;
    type IntoFuture = Resolve<T>;

    fn into_future(self) -> Self::IntoFuture {
        self.resolve()
    }
}

impl<K, T> IntoFuture for &Placeholder<K, T>
where
    T: Clone + Send + 'static,
{
    type Output = Result<T>;
    type IntoFuture = Resolve<T>;

    fn into_future(self) -> Self::IntoFuture {
        self.resolve()
    }
}

/// Future of a resolution outcome.
#[must_use]
#[pin_project(project = ResolveProj)]
pub enum Resolve<T> {
    /// The outcome was known when the future was created.
    Ready(Option<Result<T>>),
    /// Waiting for the running resolution.
    Wait(#[pin] Waiter<T>),
}

impl<T> Debug for Resolve<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(_) => f.debug_tuple("Ready").finish(),
            Self::Wait(_) => f.debug_tuple("Wait").finish(),
        }
    }
}

impl<T> Future for Resolve<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            ResolveProj::Ready(res) => match res.take() {
                Some(res) => Poll::Ready(res),
                None => Poll::Ready(Err(Error::new(ErrorKind::Closed, "resolution already taken"))),
            },
            ResolveProj::Wait(waiter) => waiter.poll(cx).map(|r| match r {
                Ok(res) => res,
                Err(e) => Err(Error::new(ErrorKind::Closed, "waiter channel closed").with_source(e)),
            }),
        }
    }
}

/// The answer of a mandatory lookup: the cached entity, or a placeholder resolving it.
#[derive(Debug, Clone)]
pub enum Mandatory<K, T> {
    /// The entity was cached.
    Cached(T),
    /// The entity was not cached.
    Placeholder(Placeholder<K, T>),
}

impl<K, T> Mandatory<K, T>
where
    T: Clone + Send + 'static,
{
    /// Whether the lookup hit the cache.
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached(_))
    }

    /// The cached entity, if any.
    pub fn cached(&self) -> Option<&T> {
        match self {
            Self::Cached(v) => Some(v),
            Self::Placeholder(_) => None,
        }
    }

    /// The placeholder, if the lookup missed.
    pub fn placeholder(&self) -> Option<&Placeholder<K, T>> {
        match self {
            Self::Cached(_) => None,
            Self::Placeholder(p) => Some(p),
        }
    }

    /// Run `callback` with the entity. A cached entity is passed in place.
    pub fn on_resolved<F>(&self, callback: F)
    where
        F: FnOnce(&Result<T>) + Send + 'static,
    {
        match self {
            Self::Cached(v) => callback(&Ok(v.clone())),
            Self::Placeholder(p) => p.on_resolved(callback),
        }
    }
}

impl<K, T> IntoFuture for Mandatory<K, T>
where
    T: Clone + Send + 'static,
{
    type Output = Result<T>;
    type IntoFuture = Resolve<T>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Self::Cached(v) => Resolve::Ready(Some(Ok(v))),
            Self::Placeholder(p) => p.resolve(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures_util::FutureExt;
    use roster_common::spawn::Spawner;

    use super::*;
    use crate::inflight::InflightMap;

    #[test_log::test(tokio::test)]
    async fn test_placeholder_await_twice() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let flight = Flight::new(
            "user",
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok("alice".to_string())
            }
            .boxed(),
            Spawner::Current,
        );
        let placeholder = Placeholder::new(42u64, flight);
        assert!(!placeholder.is_resolved());
        assert_eq!(placeholder.key(), &42);
        assert_eq!(placeholder.kind(), "user");

        assert_eq!((&placeholder).await.unwrap(), "alice");
        assert!(placeholder.is_resolved());
        assert_eq!(placeholder.clone().await.unwrap(), "alice");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
    async fn test_concurrent_placeholders_share_one_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let inflights = InflightMap::<u64, u64>::default();

        let make = |calls: Arc<AtomicUsize>| {
            move || {
                Flight::new(
                    "user",
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        Ok(9)
                    }
                    .boxed(),
                    Spawner::Current,
                )
            }
        };

        let a = Placeholder::new(1, inflights.get_or_insert_with(1, make(calls.clone())));
        let b = Placeholder::new(1, inflights.get_or_insert_with(1, make(calls.clone())));

        let (ra, rb) = tokio::join!(a.resolve(), b.resolve());
        assert_eq!(ra.unwrap(), 9);
        assert_eq!(rb.unwrap(), 9);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_on_resolved_starts_abandoned_flight() {
        let flight = Flight::new("channel", async { Ok(5u64) }.boxed(), Spawner::Current);
        let placeholder = Placeholder::new(3u64, flight);

        let (tx, rx) = tokio::sync::oneshot::channel();
        placeholder.on_resolved(move |res| {
            let _ = tx.send(*res.as_ref().unwrap());
        });
        drop(placeholder);

        assert_eq!(rx.await.unwrap(), 5);
    }

    #[test]
    fn test_mandatory_cached() {
        let mandatory: Mandatory<u64, &str> = Mandatory::Cached("general");
        assert!(mandatory.is_cached());
        assert_eq!(mandatory.cached(), Some(&"general"));
        assert!(mandatory.placeholder().is_none());

        let seen = Arc::new(AtomicUsize::new(0));
        let s = seen.clone();
        mandatory.on_resolved(move |res| s.store(res.as_ref().unwrap().len(), Ordering::SeqCst));
        assert_eq!(seen.load(Ordering::SeqCst), 7);

        assert_eq!(mandatory.into_future().now_or_never().unwrap().unwrap(), "general");
    }
}
