//! The logging capability observables report misuse through.
//!
//! Diagnostics are injected per observable rather than looked up globally, so tests (and hosts
//! with their own log sinks) can observe exactly what a given observable reports.

use std::fmt;

/// Trait for handles that let observables report non-fatal misuse.
///
/// # Logic
///
/// Implementations **should not** panic. Reports are made from inside delivery passes,
/// between two callback invocations.
pub trait DiagnosticsRef: Clone {
	/// Reports a recoverable programming mistake.
	fn warn(&self, message: fmt::Arguments<'_>);
}

/// The default [`DiagnosticsRef`], which forwards to [`tracing::warn!`] with target `stolon`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TracingDiagnostics;

impl DiagnosticsRef for TracingDiagnostics {
	fn warn(&self, message: fmt::Arguments<'_>) {
		tracing::warn!(target: "stolon", "{message}");
	}
}
