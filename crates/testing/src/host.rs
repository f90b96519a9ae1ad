// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::cell::{Cell, RefCell};

use callbridge::{HostContext, MemoryContextId, Result};

pub const CALL_CONTEXT: MemoryContextId = MemoryContextId(1);
pub const UPPER_CONTEXT: MemoryContextId = MemoryContextId(2);

/// Execution context that records what the bridge asked of it
pub struct MockHost {
	connected: Cell<bool>,
	connects: Cell<usize>,
	disconnects: Cell<usize>,
	current: Cell<MemoryContextId>,
	switches: RefCell<Vec<MemoryContextId>>,
}

impl Default for MockHost {
	fn default() -> Self {
		Self {
			connected: Cell::new(false),
			connects: Cell::new(0),
			disconnects: Cell::new(0),
			current: Cell::new(CALL_CONTEXT),
			switches: RefCell::new(Vec::new()),
		}
	}
}

impl MockHost {
	pub fn is_connected(&self) -> bool {
		self.connected.get()
	}

	/// Simulate a connection made during resolution or by the guest
	pub fn connect(&self) {
		self.connected.set(true);
	}

	pub fn connects(&self) -> usize {
		self.connects.get()
	}

	pub fn disconnects(&self) -> usize {
		self.disconnects.get()
	}

	pub fn current_context(&self) -> MemoryContextId {
		self.current.get()
	}

	/// Every context made current, in order
	pub fn switches(&self) -> Vec<MemoryContextId> {
		self.switches.borrow().clone()
	}
}

impl HostContext for MockHost {
	fn assert_connect(&self) -> Result<()> {
		if !self.connected.replace(true) {
			self.connects.set(self.connects.get() + 1);
		}
		Ok(())
	}

	fn assert_disconnect(&self) {
		if self.connected.replace(false) {
			self.disconnects.set(self.disconnects.get() + 1);
		}
	}

	fn upper_memory_context(&self) -> MemoryContextId {
		UPPER_CONTEXT
	}

	fn switch_memory_context(&self, context: MemoryContextId) -> MemoryContextId {
		self.switches.borrow_mut().push(context);
		self.current.replace(context)
	}
}
