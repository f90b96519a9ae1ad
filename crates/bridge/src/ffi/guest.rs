// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{cell::RefCell, ffi::c_void};

use callbridge_abi::{
	BufferFFI, CREATE_CHECK_BODY, CREATE_FOR_TRIGGER, CREATE_FOR_VALIDATOR, CreateRequestFFI, FFI_END_OF_ITERATION,
	FFI_NOT_FOUND, FFI_OK, GuestVTableFFI,
};
use tracing::{error, instrument};

use super::callbacks::StoreContext;
use crate::{
	area::ParameterArea,
	descriptor::DescriptorStore,
	error::{Error, Result},
	guest::{CreateRequest, GuestRuntime, NextRow, TriggerData},
	host::ProcedureDef,
	value::{Datum, LoaderKey, ObjectRef},
};

/// A guest runtime reached through its C ABI vtable
pub struct FfiGuest {
	vtable: GuestVTableFFI,
	instance: *mut c_void,
	area: RefCell<Option<ParameterArea>>,
}

impl FfiGuest {
	/// Wrap a guest instance; it is destroyed through the vtable on drop
	///
	/// # Safety
	///
	/// `instance` must be valid for every entry point of `vtable` until the
	/// returned value is dropped.
	pub unsafe fn new(vtable: GuestVTableFFI, instance: *mut c_void) -> Self {
		Self {
			vtable,
			instance,
			area: RefCell::new(None),
		}
	}

	fn check(&self, operation: &str, code: i32) -> Result<i32> {
		if code >= 0 {
			return Ok(code);
		}
		let message = self.last_error().unwrap_or_else(|| format!("{operation} failed with code {code}"));
		Err(Error::Guest(message))
	}

	fn last_error(&self) -> Option<String> {
		let mut buffer = BufferFFI::empty();
		if (self.vtable.last_error)(self.instance, &mut buffer) != FFI_OK || buffer.ptr.is_null() {
			return None;
		}
		Some(String::from_utf8_lossy(&self.take_buffer(buffer)).into_owned())
	}

	/// Copy a guest-allocated buffer and hand it back to the guest
	fn take_buffer(&self, buffer: BufferFFI) -> Vec<u8> {
		if buffer.ptr.is_null() {
			return Vec::new();
		}
		let bytes = unsafe { buffer.as_slice() }.to_vec();
		(self.vtable.free_buffer)(self.instance, buffer);
		bytes
	}

	fn handle_out(&self, operation: &str, call: impl FnOnce(*mut u64) -> i32) -> Result<Option<ObjectRef>> {
		let mut out = 0u64;
		self.check(operation, call(&mut out))?;
		Ok(ObjectRef::new(out))
	}
}

fn request_ffi(
	token: u64,
	procedure: &ProcedureDef,
	schema: &str,
	language: &str,
	arg_types: &[u32],
	flags: u8,
) -> CreateRequestFFI {
	CreateRequestFFI {
		token,
		procedure: procedure.id.0,
		name: BufferFFI::from_str(&procedure.name),
		schema: BufferFFI::from_str(schema),
		language: BufferFFI::from_str(language),
		source: BufferFFI::from_str(&procedure.source),
		arg_types: arg_types.as_ptr(),
		arg_count: arg_types.len(),
		return_type: procedure.return_type.0,
		returns_set: u8::from(procedure.returns_set),
		read_only: u8::from(procedure.read_only),
		flags,
	}
}

fn arg_type_ids(procedure: &ProcedureDef) -> Vec<u32> {
	procedure.arg_types.iter().map(|id| id.0).collect()
}

impl GuestRuntime for FfiGuest {
	fn attach_parameter_area(&self, area: ParameterArea) {
		let view = area.borrow_mut().as_ffi();
		(self.vtable.attach_parameter_area)(self.instance, view);
		// keeps the slot arrays behind `view` alive
		*self.area.borrow_mut() = Some(area);
	}

	#[instrument(name = "bridge::ffi::create", level = "trace", skip_all, fields(procedure = %request.procedure.id))]
	fn create(&self, store: &dyn DescriptorStore, request: &CreateRequest<'_>) -> Result<Option<ObjectRef>> {
		let context = StoreContext::new(store);
		let callbacks = context.callbacks();

		let mut flags = 0;
		if request.for_trigger {
			flags |= CREATE_FOR_TRIGGER;
		}
		if request.for_validator {
			flags |= CREATE_FOR_VALIDATOR;
		}
		if request.check_body {
			flags |= CREATE_CHECK_BODY;
		}

		let arg_types = arg_type_ids(request.procedure);
		let ffi = request_ffi(
			request.token.to_raw(),
			request.procedure,
			request.schema,
			request.language,
			&arg_types,
			flags,
		);

		let mut target = 0u64;
		let code = (self.vtable.create)(self.instance, &callbacks, &ffi, &mut target);
		if code < 0
			&& let Some(err) = context.take_error()
		{
			return Err(err);
		}
		self.check("create", code)?;
		Ok(ObjectRef::new(target))
	}

	fn class_if_udt(&self, procedure: &ProcedureDef, schema: &str) -> Result<Option<ObjectRef>> {
		let arg_types = arg_type_ids(procedure);
		let ffi = request_ffi(0, procedure, schema, "", &arg_types, 0);
		self.handle_out("class_if_udt", |out| (self.vtable.class_if_udt)(self.instance, &ffi, out))
	}

	fn invoke(&self, target: ObjectRef) -> Result<()> {
		self.check("invoke", (self.vtable.invoke)(self.instance, target.raw()))?;
		Ok(())
	}

	fn ref_invoke(&self, target: ObjectRef) -> Result<Option<ObjectRef>> {
		self.handle_out("ref_invoke", |out| (self.vtable.ref_invoke)(self.instance, target.raw(), out))
	}

	fn next_row(&self, provider: ObjectRef) -> Result<NextRow> {
		let mut row = 0u64;
		let code = self.check("next_row", (self.vtable.next_row)(self.instance, provider.raw(), &mut row))?;
		if code == FFI_END_OF_ITERATION {
			return Ok(NextRow::Done);
		}
		Ok(NextRow::Row(ObjectRef::new(row)))
	}

	fn close_provider(&self, provider: ObjectRef) -> Result<()> {
		self.check("close_provider", (self.vtable.close_provider)(self.instance, provider.raw()))?;
		Ok(())
	}

	fn create_trigger_data(&self, trigger: TriggerData) -> Result<Option<ObjectRef>> {
		self.handle_out("create_trigger_data", |out| (self.vtable.create_trigger_data)(self.instance, trigger.0, out))
	}

	fn trigger_return_tuple(&self, data: ObjectRef) -> Result<Option<Datum>> {
		let mut tuple = 0u64;
		let code =
			self.check("trigger_return_tuple", (self.vtable.trigger_return_tuple)(self.instance, data.raw(), &mut tuple))?;
		Ok((code != FFI_NOT_FOUND).then_some(Datum(tuple)))
	}

	fn udt_parse_handle(&self, class: ObjectRef) -> Result<ObjectRef> {
		self.handle_out("udt_parse_handle", |out| (self.vtable.udt_parse_handle)(self.instance, class.raw(), out))?
			.ok_or_else(|| Error::Guest(format!("no parse handle for class {class}")))
	}

	fn udt_read_handle(&self, class: ObjectRef) -> Result<ObjectRef> {
		self.handle_out("udt_read_handle", |out| (self.vtable.udt_read_handle)(self.instance, class.raw(), out))?
			.ok_or_else(|| Error::Guest(format!("no read handle for class {class}")))
	}

	fn udt_parse_invoke(&self, parse: ObjectRef, text: &str, type_name: &str) -> Result<Option<ObjectRef>> {
		self.handle_out("udt_parse_invoke", |out| {
			(self.vtable.udt_parse_invoke)(
				self.instance,
				parse.raw(),
				BufferFFI::from_str(text),
				BufferFFI::from_str(type_name),
				out,
			)
		})
	}

	fn udt_read_invoke(&self, read: ObjectRef, bytes: &[u8], type_name: &str) -> Result<Option<ObjectRef>> {
		self.handle_out("udt_read_invoke", |out| {
			(self.vtable.udt_read_invoke)(
				self.instance,
				read.raw(),
				BufferFFI::from_slice(bytes),
				BufferFFI::from_str(type_name),
				out,
			)
		})
	}

	fn udt_to_string_invoke(&self, value: ObjectRef) -> Result<String> {
		let mut text = BufferFFI::empty();
		self.check("udt_to_string_invoke", (self.vtable.udt_to_string_invoke)(self.instance, value.raw(), &mut text))?;
		String::from_utf8(self.take_buffer(text)).map_err(|err| Error::Guest(format!("UDT text is not UTF-8: {err}")))
	}

	fn udt_write_invoke(&self, value: ObjectRef) -> Result<Vec<u8>> {
		let mut bytes = BufferFFI::empty();
		self.check("udt_write_invoke", (self.vtable.udt_write_invoke)(self.instance, value.raw(), &mut bytes))?;
		Ok(self.take_buffer(bytes))
	}

	fn push_frame(&self) {
		(self.vtable.frame_push)(self.instance);
	}

	fn pop_frame(&self) {
		(self.vtable.frame_pop)(self.instance);
	}

	fn new_global_ref(&self, local: ObjectRef) -> ObjectRef {
		let raw = (self.vtable.new_global_ref)(self.instance, local.raw());
		ObjectRef::new(raw).unwrap_or_else(|| {
			error!(%local, "guest could not create a global reference, keeping the local one");
			local
		})
	}

	fn delete_global_ref(&self, global: ObjectRef) {
		(self.vtable.delete_global_ref)(self.instance, global.raw());
	}

	fn delete_local_ref(&self, local: ObjectRef) {
		(self.vtable.delete_local_ref)(self.instance, local.raw());
	}

	fn resolve_loader(&self, key: LoaderKey) -> Option<ObjectRef> {
		let mut loader = 0u64;
		if (self.vtable.resolve_loader)(self.instance, key.into(), &mut loader) != FFI_OK {
			return None;
		}
		ObjectRef::new(loader)
	}

	fn exception_pending(&self) -> bool {
		(self.vtable.exception_pending)(self.instance) != 0
	}
}

impl Drop for FfiGuest {
	fn drop(&mut self) {
		if !self.instance.is_null() {
			(self.vtable.destroy)(self.instance);
		}
	}
}
