// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Contract of the embedded guest runtime.

use std::{
	fmt::{self, Debug, Formatter},
	rc::Rc,
};

use crate::{
	area::ParameterArea,
	descriptor::{DescriptorStore, DescriptorToken},
	error::Result,
	host::ProcedureDef,
	value::{Datum, LoaderKey, ObjectRef},
};

/// Resolution request for one procedure
#[derive(Debug, Clone, Copy)]
pub struct CreateRequest<'a> {
	/// Placeholder the guest populates through the [`DescriptorStore`]
	pub token: DescriptorToken,
	pub procedure: &'a ProcedureDef,
	pub schema: &'a str,
	pub language: &'a str,
	pub for_trigger: bool,
	pub for_validator: bool,
	pub check_body: bool,
}

/// Outcome of asking a set-returning provider for its next row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextRow {
	/// A row, `None` for a null element
	Row(Option<ObjectRef>),
	Done,
}

/// Opaque host trigger context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerData(pub u64);

/// Entry points of the guest runtime consumed by the bridge
pub trait GuestRuntime {
	/// Receive the shared marshaling area; called once when the bridge is built
	fn attach_parameter_area(&self, area: ParameterArea);

	/// Resolve a procedure, populating the placeholder named by
	/// `request.token` through `store`
	///
	/// Returns the call target of an ordinary procedure, `None` for UDT
	/// functions and for incomplete resolution.
	fn create(&self, store: &dyn DescriptorStore, request: &CreateRequest<'_>) -> Result<Option<ObjectRef>>;

	/// Class implementing the UDT whose I/O procedure is `procedure`, if any
	fn class_if_udt(&self, procedure: &ProcedureDef, schema: &str) -> Result<Option<ObjectRef>>;

	/// Generic void entry point
	fn invoke(&self, target: ObjectRef) -> Result<()>;

	/// Generic reference-returning entry point
	fn ref_invoke(&self, target: ObjectRef) -> Result<Option<ObjectRef>>;

	fn next_row(&self, provider: ObjectRef) -> Result<NextRow>;

	fn close_provider(&self, provider: ObjectRef) -> Result<()>;

	/// Wrap host trigger data into a guest-visible object
	fn create_trigger_data(&self, trigger: TriggerData) -> Result<Option<ObjectRef>>;

	/// Row returned by a trigger, `None` for no row
	fn trigger_return_tuple(&self, data: ObjectRef) -> Result<Option<Datum>>;

	fn udt_parse_handle(&self, class: ObjectRef) -> Result<ObjectRef>;

	fn udt_read_handle(&self, class: ObjectRef) -> Result<ObjectRef>;

	fn udt_parse_invoke(&self, parse: ObjectRef, text: &str, type_name: &str) -> Result<Option<ObjectRef>>;

	fn udt_read_invoke(&self, read: ObjectRef, bytes: &[u8], type_name: &str) -> Result<Option<ObjectRef>>;

	fn udt_to_string_invoke(&self, value: ObjectRef) -> Result<String>;

	fn udt_write_invoke(&self, value: ObjectRef) -> Result<Vec<u8>>;

	/// Save the guest's view of the marshaling area before a reentrant call
	/// overwrites it
	fn push_frame(&self) {}

	/// Restore what the matching [`GuestRuntime::push_frame`] saved
	fn pop_frame(&self) {}

	fn new_global_ref(&self, local: ObjectRef) -> ObjectRef;

	fn delete_global_ref(&self, global: ObjectRef);

	fn delete_local_ref(&self, local: ObjectRef) {
		let _ = local;
	}

	/// Local handle of a loader, `None` once the loader is gone
	fn resolve_loader(&self, key: LoaderKey) -> Option<ObjectRef>;

	/// True if the last entry point left an exception pending
	fn exception_pending(&self) -> bool {
		false
	}
}

/// Owned global reference; deleted in the guest when dropped
pub struct GlobalRef {
	handle: ObjectRef,
	guest: Rc<dyn GuestRuntime>,
}

impl GlobalRef {
	pub fn new(guest: &Rc<dyn GuestRuntime>, local: ObjectRef) -> Self {
		Self {
			handle: guest.new_global_ref(local),
			guest: guest.clone(),
		}
	}

	pub fn handle(&self) -> ObjectRef {
		self.handle
	}
}

impl Drop for GlobalRef {
	fn drop(&mut self) {
		self.guest.delete_global_ref(self.handle);
	}
}

impl Debug for GlobalRef {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("GlobalRef").field(&self.handle).finish()
	}
}
