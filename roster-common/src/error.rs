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
    backtrace::Backtrace,
    fmt::{Debug, Display},
    sync::Arc,
};

/// ErrorKind is all kinds of Error of roster.
///
/// A plain cache miss is not an error: lookups return `None` for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid configuration.
    Config,
    /// The external fetcher failed. The source carries the fetcher's own error.
    External,
    /// No fetch strategy exists for the requested entity kind.
    NotResolvable,
    /// The fetcher answered, but the requested entity was not part of the answer.
    NotFound,
    /// The resolution was dropped before it produced a value.
    Closed,
}

impl ErrorKind {
    /// Convert self into static str.
    pub fn into_static(self) -> &'static str {
        self.into()
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.into_static())
    }
}

impl From<ErrorKind> for &'static str {
    fn from(v: ErrorKind) -> &'static str {
        match v {
            ErrorKind::Config => "Config error",
            ErrorKind::External => "External error",
            ErrorKind::NotResolvable => "Not resolvable",
            ErrorKind::NotFound => "Not found",
            ErrorKind::Closed => "Closed",
        }
    }
}

/// Error is the error struct returned by all roster functions.
///
/// `Display` renders a single line:
///
/// ```shell
/// Not found, context: { guild: 1, role: 2 } => role is not in the guild role list
/// ```
///
/// `Debug` renders the context, source and captured backtrace on separate lines. Use `{:#?}` for
/// the struct-style representation.
///
/// Errors are cheap to clone: the source and backtrace are shared. A single failed resolution is
/// delivered to every waiter as a clone of the same error.
pub struct Error {
    kind: ErrorKind,
    message: String,

    context: Vec<(&'static str, String)>,

    source: Option<Arc<anyhow::Error>>,
    backtrace: Option<Arc<Backtrace>>,
}

impl Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if f.alternate() {
            return f
                .debug_struct("Error")
                .field("kind", &self.kind)
                .field("message", &self.message)
                .field("context", &self.context)
                .field("source", &self.source)
                .field("backtrace", &self.backtrace)
                .finish();
        }

        write!(f, "{}", self.kind)?;
        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }
        writeln!(f)?;

        if !self.context.is_empty() {
            writeln!(f, "\nContext:")?;
            for (k, v) in self.context.iter() {
                writeln!(f, "  {k}: {v}")?;
            }
        }

        if let Some(source) = &self.source {
            writeln!(f, "\nSource:\n  {source:#}")?;
        }

        if let Some(backtrace) = &self.backtrace {
            writeln!(f, "\nBacktrace:\n{backtrace}")?;
        }

        Ok(())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;

        if !self.context.is_empty() {
            let pairs = self
                .context
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, ", context: {{ {pairs} }}")?;
        }

        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }

        if let Some(source) = &self.source {
            write!(f, ", source: {source}")?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|v| v.as_ref().as_ref())
    }
}

impl Clone for Error {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            context: self.context.clone(),
            source: self.source.clone(),
            backtrace: self.backtrace.clone(),
        }
    }
}

impl Error {
    /// Create a new error.
    ///
    /// ```rust
    /// # use roster_common::error::{Error, ErrorKind};
    /// let err = Error::new(ErrorKind::Config, "message capacity must be positive").with_context("capacity", 0);
    /// assert_eq!(err.kind(), ErrorKind::Config);
    /// ```
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: Vec::new(),
            source: None,
            backtrace: Some(Arc::new(Backtrace::capture())),
        }
    }

    /// Add more context in error.
    pub fn with_context(mut self, key: &'static str, value: impl ToString) -> Self {
        self.context.push((key, value.to_string()));
        self
    }

    /// Set source for error.
    ///
    /// # Notes
    ///
    /// Setting the source twice is a bug and panics in debug builds.
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "the source error has been set");
        self.source = Some(Arc::new(source.into()));
        self
    }

    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the error context.
    pub fn context(&self) -> &[(&'static str, String)] {
        &self.context
    }

    /// Get the error backtrace.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        self.backtrace.as_deref()
    }

    /// Get the error source.
    pub fn source(&self) -> Option<&anyhow::Error> {
        self.source.as_deref()
    }

    /// Downcast the reference of the source error to a specific error type reference.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source.as_deref().and_then(|e| e.downcast_ref::<E>())
    }
}

/// Helper constructors for the error kinds roster raises itself.
impl Error {
    /// A fetcher failure, preserving the fetcher's error as the source.
    pub fn external(source: impl Into<anyhow::Error>) -> Self {
        Error::new(ErrorKind::External, "fetch failed").with_source(source)
    }

    /// An invalid configuration value.
    pub fn config(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Config, message)
    }

    /// No fetch strategy for the entity kind.
    pub fn not_resolvable(kind: &'static str, id: impl ToString) -> Self {
        Error::new(ErrorKind::NotResolvable, "no fetch strategy for entity kind")
            .with_context("kind", kind)
            .with_context("id", id)
    }
}

/// Result type for roster.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn is_send_sync_static<T: Send + Sync + 'static>() {}

    #[test]
    fn test_send_sync_static() {
        is_send_sync_static::<Error>();
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct GatewayError(String);

    impl std::fmt::Display for GatewayError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "GatewayError: {}", self.0)
        }
    }

    impl std::error::Error for GatewayError {}

    #[test]
    fn test_error_display() {
        let err = Error::new(ErrorKind::NotFound, "role is not in the guild role list")
            .with_context("guild", 1)
            .with_context("role", 2);

        assert_eq!(
            "Not found, context: { guild: 1, role: 2 } => role is not in the guild role list",
            err.to_string()
        );
    }

    #[test]
    fn test_error_external_downcast() {
        let inner = GatewayError("unknown channel".to_string());
        let err = Error::external(inner.clone());

        assert_eq!(err.kind(), ErrorKind::External);
        assert_eq!(err.downcast_ref::<GatewayError>(), Some(&inner));
        assert_eq!(
            "External error => fetch failed, source: GatewayError: unknown channel",
            err.to_string()
        );
    }

    #[test]
    fn test_error_clone_shares_source() {
        let err = Error::external(GatewayError("boom".into()));
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
        assert!(cloned.downcast_ref::<GatewayError>().is_some());
    }

    #[test]
    fn test_not_resolvable_context() {
        let err = Error::not_resolvable("message", 42);
        assert_eq!(err.kind(), ErrorKind::NotResolvable);
        assert_eq!(err.context(), &[("kind", "message".to_string()), ("id", "42".to_string())]);
    }
}
