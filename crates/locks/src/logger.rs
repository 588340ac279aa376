// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 Shahzad A. Bhatti <bhatti@plexobject.com>
//
// This file is part of Arbiter.
//
// Arbiter is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// Arbiter is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with Arbiter. If not, see <https://www.gnu.org/licenses/>.

//! Pluggable logging for lock lifecycle events.
//!
//! The lock engine reports acquire attempts, acquisitions, timeouts, releases
//! and watchdog start/stop/failure through a [`Logger`]. Logging never affects
//! control flow: swapping in [`NoopLogger`] changes nothing but output.

use arbiter_common::OpContext;
use std::fmt;

/// Four-level logger receiving the caller's context with every message.
///
/// Messages arrive pre-formatted as [`fmt::Arguments`], so implementations
/// only pay for formatting when they actually emit.
pub trait Logger: Send + Sync {
    /// Log a debug message.
    fn debug(&self, ctx: &OpContext, args: fmt::Arguments<'_>);
    /// Log an info message.
    fn info(&self, ctx: &OpContext, args: fmt::Arguments<'_>);
    /// Log a warning message.
    fn warn(&self, ctx: &OpContext, args: fmt::Arguments<'_>);
    /// Log an error message.
    fn error(&self, ctx: &OpContext, args: fmt::Arguments<'_>);
}

/// Default logger: forwards to `tracing` with the request id attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, ctx: &OpContext, args: fmt::Arguments<'_>) {
        tracing::debug!(request_id = %ctx.request_id(), "{}", args);
    }

    fn info(&self, ctx: &OpContext, args: fmt::Arguments<'_>) {
        tracing::info!(request_id = %ctx.request_id(), "{}", args);
    }

    fn warn(&self, ctx: &OpContext, args: fmt::Arguments<'_>) {
        tracing::warn!(request_id = %ctx.request_id(), "{}", args);
    }

    fn error(&self, ctx: &OpContext, args: fmt::Arguments<'_>) {
        tracing::error!(request_id = %ctx.request_id(), "{}", args);
    }
}

/// Logger that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn debug(&self, _ctx: &OpContext, _args: fmt::Arguments<'_>) {}
    fn info(&self, _ctx: &OpContext, _args: fmt::Arguments<'_>) {}
    fn warn(&self, _ctx: &OpContext, _args: fmt::Arguments<'_>) {}
    fn error(&self, _ctx: &OpContext, _args: fmt::Arguments<'_>) {}
}
