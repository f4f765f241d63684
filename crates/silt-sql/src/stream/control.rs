//! Control operators: on-conflict recovery and the discarding sink.

use std::fmt;

use crate::environment::Environment;
use crate::error::Result;
use crate::stream::{EmitFn, Operator, Stream, Upstream};

/// Recovers uniqueness errors raised by the writer that follows it.
///
/// This is a label operator: rows pass through untouched, but the
/// downstream continuation runs under a handler. When it fails with a
/// constraint violation, the row is either dropped (`DO NOTHING`) or
/// piped through the recovery stream (`DO REPLACE`); every other error
/// propagates.
pub struct OnConflict {
    alt: Option<Stream>,
}

impl OnConflict {
    /// `ON CONFLICT DO NOTHING`: conflicts are swallowed.
    pub fn do_nothing() -> Self {
        Self { alt: None }
    }

    /// Conflicting rows run through `stream` instead (e.g. a replace).
    pub fn with_stream(stream: Stream) -> Self {
        Self { alt: Some(stream) }
    }
}

impl Operator for OnConflict {
    fn iterate(
        &self,
        env: &Environment<'_>,
        upstream: Upstream<'_>,
        emit: EmitFn<'_>,
    ) -> Result<()> {
        let mut forward = |e: &Environment<'_>| -> Result<()> {
            match emit(e) {
                Err(err) if err.is_constraint_violation() => match &self.alt {
                    None => Ok(()),
                    // The recovery stream consumes the conflicting row;
                    // its own output is not forwarded downstream.
                    Some(stream) => stream.iterate(e, |_| Ok(())),
                },
                other => other,
            }
        };
        upstream.iterate(env, &mut forward)
    }
}

impl fmt::Display for OnConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alt {
            None => write!(f, "on_conflict(do_nothing)"),
            Some(stream) => write!(f, "on_conflict({stream})"),
        }
    }
}

/// Consumes every row silently. The sink of statements that return
/// nothing.
pub struct Discard;

impl Operator for Discard {
    fn iterate(
        &self,
        env: &Environment<'_>,
        upstream: Upstream<'_>,
        _emit: EmitFn<'_>,
    ) -> Result<()> {
        upstream.iterate(env, &mut |_| Ok(()))
    }
}

impl fmt::Display for Discard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "discard()")
    }
}
