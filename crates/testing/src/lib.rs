// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! In-memory collaborators for testing the invocation bridge: a host catalog
//! and execution context, a small type system and a scriptable guest runtime,
//! all sharing one object heap.

pub mod catalog;
pub mod fixture;
pub mod guest;
pub mod heap;
pub mod host;
pub mod logging;
pub mod types;

pub use catalog::{MockCatalog, procedure};
pub use fixture::{Fixture, int};
pub use guest::{Invocation, MockGuest, Outcome, RoutineScript, Script};
pub use heap::{HandleKind, Heap, Object, SharedHeap};
pub use host::MockHost;
pub use logging::init_tracing;
pub use types::{Direction, MockTypes, oid};
