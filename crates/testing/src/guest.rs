// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Scriptable guest runtime.
//!
//! Each procedure gets a [`Script`] deciding how `create` populates the
//! placeholder and what its body does with the arguments it takes from the
//! marshaling area.

use std::{
	cell::{Cell, RefCell},
	collections::{HashMap, VecDeque},
	rc::Rc,
};

use callbridge::{
	Arguments, CreateRequest, Datum, DescriptorStore, Error, GuestRuntime, LoaderKey, NextRow, ObjectRef,
	ParameterArea, ProcedureDef, ProcedureId, Result, RoutineSpec, Slot, TriggerData, TypeId, UdtSpec,
};
use tracing::trace;

use crate::heap::{HandleKind, Object, SharedHeap};

/// What a procedure body produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
	Void,
	/// Written to the return slot of the area
	Primitive(Slot),
	/// A boxed value, `None` for null; fills the writer of an out-parameter
	/// call or the result row of a trigger
	Value(Option<Datum>),
	/// Row provider of a set-returning procedure
	Rows(Vec<Option<Datum>>),
	Raise(String),
	/// Return normally but leave an exception pending
	Pending,
}

pub type Body = Rc<dyn Fn(&Arguments) -> Outcome>;

#[derive(Clone)]
pub struct RoutineScript {
	pub param_guest_types: Option<Vec<Option<String>>>,
	pub return_guest_type: Option<String>,
	pub multi_call: bool,
	pub read_only: bool,
	pub loader: Option<LoaderKey>,
	pub reconcile: Vec<(i32, Vec<String>)>,
	pub body: Body,
}

impl RoutineScript {
	pub fn new(body: impl Fn(&Arguments) -> Outcome + 'static) -> Self {
		Self {
			param_guest_types: None,
			return_guest_type: None,
			multi_call: false,
			read_only: false,
			loader: None,
			reconcile: Vec::new(),
			body: Rc::new(body),
		}
	}

	pub fn multi_call(mut self) -> Self {
		self.multi_call = true;
		self
	}

	pub fn read_only(mut self) -> Self {
		self.read_only = true;
		self
	}

	pub fn loader(mut self, key: LoaderKey) -> Self {
		self.loader = Some(key);
		self
	}

	pub fn return_guest_type(mut self, name: &str) -> Self {
		self.return_guest_type = Some(name.to_string());
		self
	}

	pub fn param_guest_types(mut self, names: &[Option<&str>]) -> Self {
		self.param_guest_types = Some(names.iter().map(|name| name.map(str::to_string)).collect());
		self
	}

	/// Reconcile `index` against the explicit names after storing
	pub fn reconcile(mut self, index: i32, explicit: &[&str]) -> Self {
		self.reconcile.push((index, explicit.iter().map(|name| name.to_string()).collect()));
		self
	}
}

#[derive(Clone)]
pub enum Script {
	Routine(RoutineScript),
	/// A UDT I/O function with the given tag letter
	Udt {
		type_id: TypeId,
		tag: u8,
	},
	/// Resolution stores nothing and returns no target
	Incomplete,
	/// Store a signature, then fail
	Fail(String),
}

/// One call as the guest saw it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
	pub procedure: ProcedureId,
	pub header: u16,
	pub args: Arguments,
}

pub struct MockGuest {
	heap: SharedHeap,
	area: RefCell<Option<ParameterArea>>,
	scripts: RefCell<HashMap<ProcedureId, Script>>,
	resolved: RefCell<HashMap<ProcedureId, Vec<String>>>,
	invocations: RefCell<Vec<Invocation>>,
	udt_classes: RefCell<HashMap<ProcedureId, String>>,
	loaders: RefCell<HashMap<LoaderKey, ObjectRef>>,
	creates: Cell<usize>,
	pushes: Cell<usize>,
	pops: Cell<usize>,
	closes: Cell<usize>,
	udt_handles: Cell<usize>,
	pending: Cell<bool>,
}

impl MockGuest {
	pub fn new(heap: SharedHeap) -> Self {
		Self {
			heap,
			area: RefCell::new(None),
			scripts: RefCell::default(),
			resolved: RefCell::default(),
			invocations: RefCell::default(),
			udt_classes: RefCell::default(),
			loaders: RefCell::default(),
			creates: Cell::new(0),
			pushes: Cell::new(0),
			pops: Cell::new(0),
			closes: Cell::new(0),
			udt_handles: Cell::new(0),
			pending: Cell::new(false),
		}
	}

	pub fn script(&self, procedure: ProcedureId, script: Script) {
		self.scripts.borrow_mut().insert(procedure, script);
	}

	/// Report `class` as the implementation of the UDT whose input function
	/// is `procedure`
	pub fn udt_class(&self, procedure: ProcedureId, class: &str) {
		self.udt_classes.borrow_mut().insert(procedure, class.to_string());
	}

	pub fn add_loader(&self, key: LoaderKey, name: &str) -> ObjectRef {
		let local = self.heap.borrow_mut().alloc(Object::Loader(name.to_string()));
		self.loaders.borrow_mut().insert(key, local);
		local
	}

	pub fn remove_loader(&self, key: LoaderKey) {
		self.loaders.borrow_mut().remove(&key);
	}

	/// The area attached by the bridge
	pub fn area(&self) -> Option<ParameterArea> {
		self.area.borrow().clone()
	}

	/// Guest type names `create` got back for a procedure, return type last
	pub fn resolved(&self, procedure: ProcedureId) -> Option<Vec<String>> {
		self.resolved.borrow().get(&procedure).cloned()
	}

	pub fn invocations(&self) -> Vec<Invocation> {
		self.invocations.borrow().clone()
	}

	pub fn last_invocation(&self) -> Option<Invocation> {
		self.invocations.borrow().last().cloned()
	}

	pub fn creates(&self) -> usize {
		self.creates.get()
	}

	/// Frames pushed and popped
	pub fn frames(&self) -> (usize, usize) {
		(self.pushes.get(), self.pops.get())
	}

	pub fn closed_providers(&self) -> usize {
		self.closes.get()
	}

	/// Parse and read handles the bridge asked for
	pub fn udt_handles(&self) -> usize {
		self.udt_handles.get()
	}

	pub fn live_globals(&self) -> usize {
		self.heap.borrow().live(HandleKind::Global)
	}

	pub fn object(&self, handle: ObjectRef) -> Option<Object> {
		self.heap.borrow().get(handle).cloned()
	}

	fn alloc(&self, object: Object) -> ObjectRef {
		self.heap.borrow_mut().alloc(object)
	}

	fn body(&self, target: ObjectRef) -> Result<(ProcedureId, Body)> {
		let procedure = match self.heap.borrow().get(target) {
			Some(Object::Target(procedure)) => *procedure,
			_ => return Err(Error::Guest(format!("object {target} is not a call target"))),
		};
		match self.scripts.borrow().get(&procedure) {
			Some(Script::Routine(routine)) => Ok((procedure, routine.body.clone())),
			_ => Err(Error::Guest(format!("no body for {procedure}"))),
		}
	}

	/// Consume the arguments in flight and run the body on them
	fn run(&self, target: ObjectRef) -> Result<(Outcome, Arguments)> {
		let (procedure, body) = self.body(target)?;
		let area = self.area().ok_or_else(|| Error::Guest("no parameter area attached".to_string()))?;
		let (header, args) = {
			let mut area = area.borrow_mut();
			let header = area.header();
			(header, area.take_arguments())
		};

		self.pending.set(false);
		let outcome = body(&args);
		trace!(%procedure, ?outcome, "guest body ran");
		self.invocations.borrow_mut().push(Invocation {
			procedure,
			header,
			args: args.clone(),
		});

		match &outcome {
			Outcome::Raise(message) => Err(Error::Guest(message.clone())),
			Outcome::Pending => {
				self.pending.set(true);
				Ok((outcome, args))
			}
			_ => Ok((outcome, args)),
		}
	}

	fn store_routine(
		&self,
		store: &dyn DescriptorStore,
		request: &CreateRequest<'_>,
		routine: &RoutineScript,
	) -> Result<Vec<String>> {
		let class = self.alloc(Object::Class(request.procedure.source.clone()));
		let type_map = self.alloc(Object::TypeMap);
		let param_guest_types: Option<Vec<Option<&str>>> =
			routine.param_guest_types.as_ref().map(|names| names.iter().map(Option::as_deref).collect());

		let stored = store.store_to_non_udt(
			request.token,
			&RoutineSpec {
				schema_loader: routine.loader,
				class,
				read_only: routine.read_only,
				multi_call: routine.multi_call,
				type_map: Some(type_map),
				return_type: request.procedure.return_type,
				return_guest_type: routine.return_guest_type.as_deref(),
				param_types: &request.procedure.arg_types,
				param_guest_types: param_guest_types.as_deref(),
			},
		)?;

		let mut resolved = stored.guest_types;
		for (index, explicit) in &routine.reconcile {
			let explicit: Vec<&str> = explicit.iter().map(String::as_str).collect();
			let reconciled = store.reconcile_types(request.token, &explicit, resolved.len(), *index)?;
			resolved[reconciled.position] = reconciled.guest_type;
		}
		Ok(resolved)
	}
}

impl GuestRuntime for MockGuest {
	fn attach_parameter_area(&self, area: ParameterArea) {
		*self.area.borrow_mut() = Some(area);
	}

	fn create(&self, store: &dyn DescriptorStore, request: &CreateRequest<'_>) -> Result<Option<ObjectRef>> {
		self.creates.set(self.creates.get() + 1);
		let id = request.procedure.id;
		let script = self.scripts.borrow().get(&id).cloned();

		match script {
			Some(Script::Routine(routine)) => {
				let resolved = self.store_routine(store, request, &routine)?;
				self.resolved.borrow_mut().insert(id, resolved);
				Ok(Some(self.alloc(Object::Target(id))))
			}
			Some(Script::Udt {
				type_id,
				tag,
			}) => {
				let class = self.alloc(Object::Class(request.procedure.source.clone()));
				store.store_to_udt(
					request.token,
					&UdtSpec {
						schema_loader: None,
						class,
						read_only: true,
						function: tag,
						type_id,
						parse: None,
						read: None,
					},
				)?;
				Ok(None)
			}
			Some(Script::Incomplete) => Ok(None),
			Some(Script::Fail(message)) => {
				let routine = RoutineScript::new(|_| Outcome::Void);
				self.store_routine(store, request, &routine)?;
				Err(Error::Guest(message))
			}
			None => Err(Error::Guest(format!("no script for {id}"))),
		}
	}

	fn class_if_udt(&self, procedure: &ProcedureDef, _schema: &str) -> Result<Option<ObjectRef>> {
		let class = self.udt_classes.borrow().get(&procedure.id).cloned();
		Ok(class.map(|class| self.alloc(Object::Class(class))))
	}

	fn invoke(&self, target: ObjectRef) -> Result<()> {
		let (outcome, args) = self.run(target)?;
		match outcome {
			Outcome::Primitive(slot) => {
				if let Some(area) = self.area() {
					area.borrow_mut().set_return(slot);
				}
			}
			Outcome::Value(value) => {
				let mut heap = self.heap.borrow_mut();
				let last = args.references.last().copied().flatten();
				let first = args.references.first().copied().flatten();
				if let Some(Object::Writer(row)) = last.and_then(|writer| heap.get_mut(writer)) {
					*row = value;
				} else if let Some(Object::Trigger {
					result,
					..
				}) = first.and_then(|data| heap.get_mut(data))
				{
					*result = value;
				}
			}
			_ => {}
		}
		Ok(())
	}

	fn ref_invoke(&self, target: ObjectRef) -> Result<Option<ObjectRef>> {
		let (outcome, _) = self.run(target)?;
		Ok(match outcome {
			Outcome::Value(Some(datum)) => Some(self.alloc(Object::Value(datum))),
			Outcome::Rows(rows) => Some(self.alloc(Object::Provider {
				rows: VecDeque::from(rows),
				closed: false,
			})),
			_ => None,
		})
	}

	fn next_row(&self, provider: ObjectRef) -> Result<NextRow> {
		let row = match self.heap.borrow_mut().get_mut(provider) {
			Some(Object::Provider {
				rows,
				..
			}) => rows.pop_front(),
			_ => return Err(Error::Guest(format!("object {provider} is not a row provider"))),
		};
		Ok(match row {
			Some(Some(datum)) => NextRow::Row(Some(self.alloc(Object::Value(datum)))),
			Some(None) => NextRow::Row(None),
			None => NextRow::Done,
		})
	}

	fn close_provider(&self, provider: ObjectRef) -> Result<()> {
		if let Some(Object::Provider {
			closed,
			..
		}) = self.heap.borrow_mut().get_mut(provider)
		{
			*closed = true;
		}
		self.closes.set(self.closes.get() + 1);
		Ok(())
	}

	fn create_trigger_data(&self, trigger: TriggerData) -> Result<Option<ObjectRef>> {
		Ok(Some(self.alloc(Object::Trigger {
			context: trigger.0,
			result: None,
		})))
	}

	fn trigger_return_tuple(&self, data: ObjectRef) -> Result<Option<Datum>> {
		match self.heap.borrow().get(data) {
			Some(Object::Trigger {
				result,
				..
			}) => Ok(*result),
			_ => Err(Error::Guest(format!("object {data} is not trigger data"))),
		}
	}

	fn udt_parse_handle(&self, _class: ObjectRef) -> Result<ObjectRef> {
		self.udt_handles.set(self.udt_handles.get() + 1);
		Ok(self.alloc(Object::UdtHandle))
	}

	fn udt_read_handle(&self, _class: ObjectRef) -> Result<ObjectRef> {
		self.udt_handles.set(self.udt_handles.get() + 1);
		Ok(self.alloc(Object::UdtHandle))
	}

	fn udt_parse_invoke(&self, _parse: ObjectRef, text: &str, type_name: &str) -> Result<Option<ObjectRef>> {
		if text == "null" {
			return Ok(None);
		}
		let value = text.parse::<u64>().map_err(|err| Error::Guest(format!("bad {type_name} literal {text:?}: {err}")))?;
		Ok(Some(self.alloc(Object::Udt(Datum(value)))))
	}

	fn udt_read_invoke(&self, _read: ObjectRef, bytes: &[u8], type_name: &str) -> Result<Option<ObjectRef>> {
		let raw: [u8; 8] =
			bytes.try_into().map_err(|_| Error::Guest(format!("{type_name} needs 8 bytes, got {}", bytes.len())))?;
		Ok(Some(self.alloc(Object::Udt(Datum(u64::from_le_bytes(raw))))))
	}

	fn udt_to_string_invoke(&self, value: ObjectRef) -> Result<String> {
		let datum = self.heap.borrow().value(value).ok_or_else(|| Error::Guest(format!("object {value} has no value")))?;
		Ok(datum.0.to_string())
	}

	fn udt_write_invoke(&self, value: ObjectRef) -> Result<Vec<u8>> {
		let datum = self.heap.borrow().value(value).ok_or_else(|| Error::Guest(format!("object {value} has no value")))?;
		Ok(datum.0.to_le_bytes().to_vec())
	}

	fn push_frame(&self) {
		self.pushes.set(self.pushes.get() + 1);
	}

	fn pop_frame(&self) {
		self.pops.set(self.pops.get() + 1);
	}

	fn new_global_ref(&self, local: ObjectRef) -> ObjectRef {
		self.heap.borrow_mut().new_global(local)
	}

	fn delete_global_ref(&self, global: ObjectRef) {
		self.heap.borrow_mut().delete(global, HandleKind::Global);
	}

	fn delete_local_ref(&self, local: ObjectRef) {
		self.heap.borrow_mut().delete(local, HandleKind::Local);
	}

	fn resolve_loader(&self, key: LoaderKey) -> Option<ObjectRef> {
		self.loaders.borrow().get(&key).copied()
	}

	fn exception_pending(&self) -> bool {
		self.pending.get()
	}
}
