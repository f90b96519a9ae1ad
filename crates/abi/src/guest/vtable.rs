// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

use core::ffi::c_void;

use crate::{
	callbacks::StoreCallbacksFFI,
	data::{BufferFFI, ParameterAreaFFI},
	guest::request::{CreateRequestFFI, LoaderKeyFFI},
};

/// Virtual function table of a guest runtime
///
/// Every entry point receives the guest `instance` pointer first. Object
/// handles are `u64` with `0` meaning null. Unless stated otherwise entry
/// points return `FFI_OK` on success and a negative code on failure, in which
/// case `last_error` yields the message. All function pointers must be valid
/// (non-null).
#[repr(C)]
#[derive(Clone, Copy)]
pub struct GuestVTableFFI {
	/// Hand the shared parameter area to the guest; called once
	pub attach_parameter_area: extern "C" fn(instance: *mut c_void, area: ParameterAreaFFI),

	/// Resolve a procedure
	///
	/// The guest populates the placeholder through `store` and writes the
	/// resolved call target to `target_out` (0 for UDT functions or when
	/// resolution is incomplete).
	pub create: extern "C" fn(
		instance: *mut c_void,
		store: *const StoreCallbacksFFI,
		request: *const CreateRequestFFI,
		target_out: *mut u64,
	) -> i32,

	/// Probe whether a type's I/O procedure belongs to a UDT class
	///
	/// # Returns
	/// - `FFI_OK` with the class in `class_out`, `FFI_NOT_FOUND` if not a UDT
	pub class_if_udt: extern "C" fn(
		instance: *mut c_void,
		request: *const CreateRequestFFI,
		class_out: *mut u64,
	) -> i32,

	/// Invoke a call target through the void entry point
	pub invoke: extern "C" fn(instance: *mut c_void, target: u64) -> i32,

	/// Invoke a call target through the reference-returning entry point
	pub ref_invoke: extern "C" fn(instance: *mut c_void, target: u64, result_out: *mut u64) -> i32,

	/// Fetch the next row of a set-returning provider
	///
	/// # Returns
	/// - `FFI_OK` with the row (possibly 0) in `row_out`, `FFI_END_OF_ITERATION` when exhausted
	pub next_row: extern "C" fn(instance: *mut c_void, provider: u64, row_out: *mut u64) -> i32,

	/// Close an exhausted set-returning provider
	pub close_provider: extern "C" fn(instance: *mut c_void, provider: u64) -> i32,

	/// Wrap host trigger data into a guest object
	///
	/// # Returns
	/// - `FFI_OK` with the object, `FFI_NOT_FOUND` if no object could be created
	pub create_trigger_data: extern "C" fn(instance: *mut c_void, trigger: u64, data_out: *mut u64) -> i32,

	/// Extract the row a trigger returned
	///
	/// # Returns
	/// - `FFI_OK` with the row datum, `FFI_NOT_FOUND` if the trigger returned no row
	pub trigger_return_tuple: extern "C" fn(instance: *mut c_void, data: u64, tuple_out: *mut u64) -> i32,

	/// Resolve the parse handle of a UDT class
	pub udt_parse_handle: extern "C" fn(instance: *mut c_void, class: u64, handle_out: *mut u64) -> i32,

	/// Resolve the read handle of a UDT class
	pub udt_read_handle: extern "C" fn(instance: *mut c_void, class: u64, handle_out: *mut u64) -> i32,

	/// UDT entry point: parse a value from text
	pub udt_parse_invoke: extern "C" fn(
		instance: *mut c_void,
		parse: u64,
		text: BufferFFI,
		type_name: BufferFFI,
		value_out: *mut u64,
	) -> i32,

	/// UDT entry point: read a value from its binary form
	pub udt_read_invoke: extern "C" fn(
		instance: *mut c_void,
		read: u64,
		bytes: BufferFFI,
		type_name: BufferFFI,
		value_out: *mut u64,
	) -> i32,

	/// UDT entry point: render a value to text (guest-owned buffer)
	pub udt_to_string_invoke: extern "C" fn(instance: *mut c_void, value: u64, text_out: *mut BufferFFI) -> i32,

	/// UDT entry point: write a value to its binary form (guest-owned buffer)
	pub udt_write_invoke: extern "C" fn(instance: *mut c_void, value: u64, bytes_out: *mut BufferFFI) -> i32,

	/// Release a buffer returned by the guest
	pub free_buffer: extern "C" fn(instance: *mut c_void, buffer: BufferFFI),

	/// Save the guest's view of the parameter area
	pub frame_push: extern "C" fn(instance: *mut c_void),

	/// Restore the guest's view of the parameter area
	pub frame_pop: extern "C" fn(instance: *mut c_void),

	/// Promote a local handle to a global one
	pub new_global_ref: extern "C" fn(instance: *mut c_void, local: u64) -> u64,

	pub delete_global_ref: extern "C" fn(instance: *mut c_void, global: u64),

	pub delete_local_ref: extern "C" fn(instance: *mut c_void, local: u64),

	/// Resolve a loader key to a local handle
	///
	/// # Returns
	/// - `FFI_OK` with the loader, `FFI_NOT_FOUND` if the loader is gone
	pub resolve_loader: extern "C" fn(instance: *mut c_void, key: LoaderKeyFFI, loader_out: *mut u64) -> i32,

	/// 1 if the guest has a pending exception, 0 otherwise
	pub exception_pending: extern "C" fn(instance: *mut c_void) -> u8,

	/// Message of the last failure (guest-owned buffer)
	pub last_error: extern "C" fn(instance: *mut c_void, message_out: *mut BufferFFI) -> i32,

	/// Destroy the guest instance
	///
	/// # Safety
	/// - Must be called exactly once; the instance must not be used afterwards
	pub destroy: extern "C" fn(instance: *mut c_void),
}
