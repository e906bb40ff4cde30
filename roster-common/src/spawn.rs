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

use std::future::Future;

use tokio::{runtime::Handle, task::JoinHandle};

use crate::error::{Error, ErrorKind, Result};

/// Where background resolutions are driven.
#[derive(Debug, Clone, Default)]
pub enum Spawner {
    /// The runtime of whichever task triggers the spawn.
    #[default]
    Current,
    /// A fixed runtime handle.
    Handle(Handle),
}

impl From<Handle> for Spawner {
    fn from(handle: Handle) -> Self {
        Self::Handle(handle)
    }
}

impl Spawner {
    /// Wrapper for [`Handle::spawn`].
    ///
    /// Fails with [`ErrorKind::Closed`] if the spawner is [`Spawner::Current`] and there is no runtime in the
    /// calling context.
    pub fn spawn<F>(&self, future: F) -> Result<JoinHandle<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        match self {
            Spawner::Handle(handle) => Ok(handle.spawn(future)),
            Spawner::Current => Handle::try_current()
                .map(|handle| handle.spawn(future))
                .map_err(|e| Error::new(ErrorKind::Closed, "no async runtime in the calling context").with_source(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_without_runtime() {
        let err = Spawner::Current.spawn(async {}).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Closed);
    }

    #[tokio::test]
    async fn test_current_with_runtime() {
        let v = Spawner::Current.spawn(async { 42 }).unwrap().await.unwrap();
        assert_eq!(v, 42);
    }

    #[test]
    fn test_handle() {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let spawner = Spawner::from(rt.handle().clone());
        let join = spawner.spawn(async { 7 }).unwrap();
        assert_eq!(rt.block_on(join).unwrap(), 7);
    }
}
