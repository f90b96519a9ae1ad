// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

use core::ffi::c_void;

use crate::{
	data::BufferFFI,
	guest::request::{RoutineSpecFFI, UdtSpecFFI},
};

/// Receives type names produced by the bridge
///
/// `name` is only valid for the duration of the call.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct NameSinkFFI {
	pub ctx: *mut c_void,
	pub accept: extern "C" fn(ctx: *mut c_void, index: usize, name: BufferFFI),
}

/// Descriptor store callbacks the guest calls while resolving a procedure
///
/// Only valid during the `GuestVTableFFI::create` call they were passed to.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct StoreCallbacksFFI {
	/// Bridge context, passed back as the first argument of each callback
	pub ctx: *const c_void,

	/// Store a non-UDT routine into the placeholder
	///
	/// # Parameters
	/// - `token`: Placeholder token from the create request
	/// - `spec`: Routine metadata
	/// - `names`: Receives the resolved guest type name of every parameter,
	///   the return type's name last (index `param_count`)
	/// - `out_parameter`: Set to 1 if the return type is an out parameter
	///
	/// # Returns
	/// - `FFI_OK` on success, negative error code on failure
	pub store_to_non_udt: extern "C" fn(
		ctx: *const c_void,
		token: u64,
		spec: *const RoutineSpecFFI,
		names: NameSinkFFI,
		out_parameter: *mut u8,
	) -> i32,

	/// Store a UDT function into the placeholder
	///
	/// # Returns
	/// - `FFI_OK` on success (also when the type is still a shell and the
	///   placeholder was left incomplete), negative error code on failure
	pub store_to_udt: extern "C" fn(ctx: *const c_void, token: u64, spec: *const UdtSpecFFI) -> i32,

	/// Replace an inferred parameter or return type by an explicit one
	///
	/// # Parameters
	/// - `explicit`: Explicit guest type names
	/// - `explicit_len`: Number of explicit names
	/// - `resolved_len`: Length of the guest's resolved-names array
	/// - `index`: Parameter index, `RECONCILE_RETURN` or `RECONCILE_RETURN_OUT`
	/// - `names`: Receives the single updated resolved name and its index
	pub reconcile_types: extern "C" fn(
		ctx: *const c_void,
		token: u64,
		explicit: *const BufferFFI,
		explicit_len: usize,
		resolved_len: usize,
		index: i32,
		names: NameSinkFFI,
	) -> i32,

	/// Message of the last failed callback
	pub last_error: extern "C" fn(ctx: *const c_void, message_out: *mut BufferFFI) -> i32,
}
