// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Descriptor store callbacks exported to a guest behind the C ABI.
//!
//! Return codes:
//! - `0`: success
//! - `1`: nothing to report (`last_error` only)
//! - `< 0`: failure; the error is kept in the callback context and surfaces
//!   from the `create` call that installed it

use std::{
	cell::RefCell,
	ffi::c_void,
	panic::{AssertUnwindSafe, catch_unwind},
	slice,
};

use callbridge_abi::{
	BufferFFI, FFI_ERROR_BRIDGE, FFI_ERROR_NULL_PTR, FFI_ERROR_PANIC, FFI_NOT_FOUND, FFI_OK, NameSinkFFI,
	RoutineSpecFFI, StoreCallbacksFFI, UdtSpecFFI,
};
use tracing::error;

use crate::{
	descriptor::{DescriptorStore, DescriptorToken, RoutineSpec, UdtSpec},
	error::{Error, Result},
	value::{LoaderKey, ObjectRef, TypeId},
};

/// State behind the `ctx` pointer of [`StoreCallbacksFFI`]
pub(crate) struct StoreContext<'a> {
	store: &'a dyn DescriptorStore,
	error: RefCell<Option<Error>>,
	message: RefCell<String>,
}

impl<'a> StoreContext<'a> {
	pub(crate) fn new(store: &'a dyn DescriptorStore) -> Self {
		Self {
			store,
			error: RefCell::new(None),
			message: RefCell::new(String::new()),
		}
	}

	/// Callback table pointing at this context; valid while `self` is
	pub(crate) fn callbacks(&self) -> StoreCallbacksFFI {
		StoreCallbacksFFI {
			ctx: self as *const Self as *const c_void,
			store_to_non_udt: ffi_store_to_non_udt,
			store_to_udt: ffi_store_to_udt,
			reconcile_types: ffi_reconcile_types,
			last_error: ffi_last_error,
		}
	}

	/// First error a callback failed with
	pub(crate) fn take_error(&self) -> Option<Error> {
		self.error.borrow_mut().take()
	}

	fn fail(&self, err: Error) {
		*self.message.borrow_mut() = err.to_string();
		let mut slot = self.error.borrow_mut();
		if slot.is_none() {
			*slot = Some(err);
		}
	}
}

fn guarded(ctx: *const c_void, operation: &'static str, body: impl FnOnce(&StoreContext<'_>) -> Result<i32>) -> i32 {
	if ctx.is_null() {
		error!(operation, "null store context");
		return FFI_ERROR_NULL_PTR;
	}
	let context = unsafe { &*(ctx as *const StoreContext<'_>) };

	match catch_unwind(AssertUnwindSafe(|| body(context))) {
		Ok(Ok(code)) => code,
		Ok(Err(err)) => {
			error!(operation, %err, "store callback failed");
			context.fail(err);
			FFI_ERROR_BRIDGE
		}
		Err(panic) => {
			error!(operation, ?panic, "panic in store callback");
			context.fail(Error::internal(format!("panic in {operation}")));
			FFI_ERROR_PANIC
		}
	}
}

unsafe fn raw_slice<'a, T>(ptr: *const T, len: usize) -> &'a [T] {
	if ptr.is_null() || len == 0 {
		&[]
	} else {
		unsafe { slice::from_raw_parts(ptr, len) }
	}
}

unsafe fn optional_str<'a>(buffer: &BufferFFI) -> Result<Option<&'a str>> {
	if buffer.ptr.is_null() {
		return Ok(None);
	}
	unsafe { buffer.as_str() }.map(Some).map_err(|err| Error::Guest(format!("type name is not UTF-8: {err}")))
}

fn loader(key: callbridge_abi::LoaderKeyFFI, present: u8) -> Option<LoaderKey> {
	(present != 0).then(|| key.into())
}

fn emit_names<'n>(names: NameSinkFFI, values: impl IntoIterator<Item = &'n str>) {
	for (index, name) in values.into_iter().enumerate() {
		(names.accept)(names.ctx, index, BufferFFI::from_str(name));
	}
}

extern "C" fn ffi_store_to_non_udt(
	ctx: *const c_void,
	token: u64,
	spec: *const RoutineSpecFFI,
	names: NameSinkFFI,
	out_parameter: *mut u8,
) -> i32 {
	guarded(ctx, "store_to_non_udt", |context| {
		let spec = unsafe { spec.as_ref() }.ok_or_else(|| Error::internal("null routine spec"))?;
		let class = ObjectRef::new(spec.class).ok_or_else(|| Error::internal("routine spec without a class"))?;

		let param_types: Vec<TypeId> =
			unsafe { raw_slice(spec.param_types, spec.param_count) }.iter().map(|&id| TypeId(id)).collect();
		let param_guest_types = if spec.param_guest_types.is_null() {
			None
		} else {
			Some(
				unsafe { raw_slice(spec.param_guest_types, spec.param_count) }
					.iter()
					.map(|buffer| unsafe { optional_str(buffer) })
					.collect::<Result<Vec<_>>>()?,
			)
		};

		let stored = context.store.store_to_non_udt(
			DescriptorToken::from_raw(token),
			&RoutineSpec {
				schema_loader: loader(spec.loader, spec.has_loader),
				class,
				read_only: spec.read_only != 0,
				multi_call: spec.multi_call != 0,
				type_map: ObjectRef::new(spec.type_map),
				return_type: TypeId(spec.return_type),
				return_guest_type: unsafe { optional_str(&spec.return_guest_type) }?,
				param_types: &param_types,
				param_guest_types: param_guest_types.as_deref(),
			},
		)?;

		emit_names(names, stored.guest_types.iter().map(String::as_str));
		if !out_parameter.is_null() {
			unsafe { *out_parameter = u8::from(stored.return_is_out_parameter) };
		}
		Ok(FFI_OK)
	})
}

extern "C" fn ffi_store_to_udt(ctx: *const c_void, token: u64, spec: *const UdtSpecFFI) -> i32 {
	guarded(ctx, "store_to_udt", |context| {
		let spec = unsafe { spec.as_ref() }.ok_or_else(|| Error::internal("null UDT spec"))?;
		let class = ObjectRef::new(spec.class).ok_or_else(|| Error::internal("UDT spec without a class"))?;

		context.store.store_to_udt(
			DescriptorToken::from_raw(token),
			&UdtSpec {
				schema_loader: loader(spec.loader, spec.has_loader),
				class,
				read_only: spec.read_only != 0,
				function: spec.function,
				type_id: TypeId(spec.type_id),
				parse: ObjectRef::new(spec.parse),
				read: ObjectRef::new(spec.read),
			},
		)?;
		Ok(FFI_OK)
	})
}

extern "C" fn ffi_reconcile_types(
	ctx: *const c_void,
	token: u64,
	explicit: *const BufferFFI,
	explicit_len: usize,
	resolved_len: usize,
	index: i32,
	names: NameSinkFFI,
) -> i32 {
	guarded(ctx, "reconcile_types", |context| {
		let explicit = unsafe { raw_slice(explicit, explicit_len) }
			.iter()
			.map(|buffer| unsafe { optional_str(buffer) }.map(Option::unwrap_or_default))
			.collect::<Result<Vec<&str>>>()?;

		let reconciled =
			context.store.reconcile_types(DescriptorToken::from_raw(token), &explicit, resolved_len, index)?;

		(names.accept)(names.ctx, reconciled.position, BufferFFI::from_str(&reconciled.guest_type));
		Ok(FFI_OK)
	})
}

extern "C" fn ffi_last_error(ctx: *const c_void, message_out: *mut BufferFFI) -> i32 {
	guarded(ctx, "last_error", |context| {
		if message_out.is_null() {
			return Ok(FFI_ERROR_NULL_PTR);
		}
		let message = context.message.borrow();
		if message.is_empty() {
			return Ok(FFI_NOT_FOUND);
		}
		// points into the context; valid until the next failing callback
		unsafe { *message_out = BufferFFI::from_str(&message) };
		Ok(FFI_OK)
	})
}
