// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{collections::HashMap, mem, rc::Rc};

use crate::{descriptor::Descriptor, value::ProcedureId};

/// Resolved descriptors by procedure identity
pub(crate) struct Registry {
	functions: HashMap<ProcedureId, Rc<Descriptor>>,
	capacity: usize,
}

impl Registry {
	pub(crate) fn new(capacity: usize) -> Self {
		Self {
			functions: HashMap::with_capacity(capacity),
			capacity,
		}
	}

	pub(crate) fn get(&self, id: ProcedureId) -> Option<Rc<Descriptor>> {
		self.functions.get(&id).cloned()
	}

	pub(crate) fn insert(&mut self, descriptor: Rc<Descriptor>) -> Option<Rc<Descriptor>> {
		self.functions.insert(descriptor.id(), descriptor)
	}

	pub(crate) fn len(&self) -> usize {
		self.functions.len()
	}

	/// Swap in a fresh map, carrying over the descriptors `in_use` accepts
	///
	/// Returns the descriptors dropped from the registry; they are released
	/// once the caller lets go of them.
	pub(crate) fn invalidate(&mut self, in_use: impl Fn(&Rc<Descriptor>) -> bool) -> Vec<Rc<Descriptor>> {
		let old = mem::replace(&mut self.functions, HashMap::with_capacity(self.capacity));
		let mut released = Vec::new();
		for (id, descriptor) in old {
			if in_use(&descriptor) {
				self.functions.insert(id, descriptor);
			} else {
				released.push(descriptor);
			}
		}
		released
	}
}
