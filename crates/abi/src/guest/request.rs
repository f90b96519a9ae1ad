// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

use crate::data::BufferFFI;

/// Generation-checked key of a class loader owned by the guest
///
/// The bridge never treats this as a reference: it is only resolved back
/// through `GuestVTableFFI::resolve_loader`, which fails once the loader is gone.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderKeyFFI {
	pub index: u32,
	pub generation: u32,
}

/// Resolution request for one procedure, passed to `GuestVTableFFI::create`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CreateRequestFFI {
	/// Placeholder token the store callbacks must be called with
	pub token: u64,
	pub procedure: u32,
	pub name: BufferFFI,
	pub schema: BufferFFI,
	pub language: BufferFFI,
	/// Declared source text of the procedure (class/method reference)
	pub source: BufferFFI,
	/// Declared argument type ids
	pub arg_types: *const u32,
	pub arg_count: usize,
	pub return_type: u32,
	pub returns_set: u8,
	pub read_only: u8,
	/// `CREATE_*` flags
	pub flags: u8,
}

/// Payload of `StoreCallbacksFFI::store_to_non_udt`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RoutineSpecFFI {
	/// Schema class loader; `has_loader == 0` if the procedure has none
	pub loader: LoaderKeyFFI,
	pub has_loader: u8,
	pub class: u64,
	pub read_only: u8,
	pub multi_call: u8,
	/// Type map object, 0 if none
	pub type_map: u64,
	pub return_type: u32,
	/// Explicit guest return type name; empty for none
	pub return_guest_type: BufferFFI,
	pub param_types: *const u32,
	/// Explicit guest parameter type names (may be null; empty entries mean none)
	pub param_guest_types: *const BufferFFI,
	pub param_count: usize,
}

/// Payload of `StoreCallbacksFFI::store_to_udt`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct UdtSpecFFI {
	pub loader: LoaderKeyFFI,
	pub has_loader: u8,
	pub class: u64,
	pub read_only: u8,
	/// One of `UDT_INPUT`, `UDT_OUTPUT`, `UDT_RECEIVE`, `UDT_SEND`
	pub function: u8,
	pub type_id: u32,
	/// Parse handle for input functions, 0 otherwise
	pub parse: u64,
	/// Read handle for receive functions, 0 otherwise
	pub read: u64,
}
