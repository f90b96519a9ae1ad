// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Object heap of the mock guest runtime.
//!
//! Handles are either local or global. Both resolve to an object; deleting a
//! handle never frees the object, so tests can inspect what was passed.

use std::{
	cell::RefCell,
	collections::{HashMap, VecDeque},
	rc::Rc,
};

use callbridge::{Datum, ObjectRef, ProcedureId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
	Class(String),
	Target(ProcedureId),
	TypeMap,
	Loader(String),
	/// A boxed host value
	Value(Datum),
	/// Writer filled by an out-parameter callee
	Writer(Option<Datum>),
	Provider {
		rows: VecDeque<Option<Datum>>,
		closed: bool,
	},
	Trigger {
		context: u64,
		result: Option<Datum>,
	},
	Udt(Datum),
	UdtHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
	Local,
	Global,
}

#[derive(Debug, Default)]
pub struct Heap {
	next: u64,
	objects: Vec<Object>,
	handles: HashMap<u64, (HandleKind, usize)>,
}

pub type SharedHeap = Rc<RefCell<Heap>>;

impl Heap {
	pub fn shared() -> SharedHeap {
		Rc::new(RefCell::new(Heap::default()))
	}

	fn handle(&mut self, kind: HandleKind, object: usize) -> ObjectRef {
		self.next += 1;
		self.handles.insert(self.next, (kind, object));
		ObjectRef::new(self.next).expect("handles start at 1")
	}

	/// Allocate an object and return a local handle to it
	pub fn alloc(&mut self, object: Object) -> ObjectRef {
		self.objects.push(object);
		let index = self.objects.len() - 1;
		self.handle(HandleKind::Local, index)
	}

	pub fn new_global(&mut self, local: ObjectRef) -> ObjectRef {
		let (_, object) = self.handles[&local.raw()];
		self.handle(HandleKind::Global, object)
	}

	pub fn delete(&mut self, handle: ObjectRef, kind: HandleKind) {
		if let Some(&(found, _)) = self.handles.get(&handle.raw())
			&& found == kind
		{
			self.handles.remove(&handle.raw());
		}
	}

	pub fn get(&self, handle: ObjectRef) -> Option<&Object> {
		let (_, object) = self.handles.get(&handle.raw())?;
		self.objects.get(*object)
	}

	pub fn get_mut(&mut self, handle: ObjectRef) -> Option<&mut Object> {
		let (_, object) = self.handles.get(&handle.raw())?;
		self.objects.get_mut(*object)
	}

	pub fn is_live(&self, handle: ObjectRef) -> bool {
		self.handles.contains_key(&handle.raw())
	}

	pub fn live(&self, kind: HandleKind) -> usize {
		self.handles.values().filter(|(found, _)| *found == kind).count()
	}

	/// Boxed host value behind a handle
	pub fn value(&self, handle: ObjectRef) -> Option<Datum> {
		match self.get(handle)? {
			Object::Value(datum) | Object::Udt(datum) => Some(*datum),
			_ => None,
		}
	}
}
