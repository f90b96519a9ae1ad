// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

/// Maximum number of positional arguments a host procedure can declare
pub const MAX_PARAMETERS: usize = 255;

/// Primitive slots in the parameter area: one per possible primitive
/// parameter plus one reserved for a primitive return value
pub const PRIMITIVE_SLOTS: usize = 1 + MAX_PARAMETERS;

/// Reference slots in the parameter area
pub const REFERENCE_SLOTS: usize = MAX_PARAMETERS;

/// Null guest object handle
pub const NULL_OBJECT: u64 = 0;

// Return codes shared by every entry point and callback.
//
// - `0`: success
// - `> 0`: success with a qualified outcome (no value, end of iteration)
// - `< 0`: failure; the failing side keeps a message retrievable through
//   `GuestVTableFFI::last_error`

/// Success
pub const FFI_OK: i32 = 0;
/// Success, but the requested value does not exist (null result)
pub const FFI_NOT_FOUND: i32 = 1;
/// Success, a row provider has no more rows
pub const FFI_END_OF_ITERATION: i32 = 2;
/// A required pointer argument was null
pub const FFI_ERROR_NULL_PTR: i32 = -1;
/// The guest runtime raised an exception
pub const FFI_ERROR_GUEST: i32 = -2;
/// The bridge rejected a callback
pub const FFI_ERROR_BRIDGE: i32 = -3;
/// A string argument was not valid UTF-8
pub const FFI_ERROR_UTF8: i32 = -4;
/// A panic was caught at the boundary
pub const FFI_ERROR_PANIC: i32 = -99;

// Flags of `CreateRequestFFI::flags`

pub const CREATE_FOR_TRIGGER: u8 = 0b001;
pub const CREATE_FOR_VALIDATOR: u8 = 0b010;
pub const CREATE_CHECK_BODY: u8 = 0b100;

// UDT operation tags passed to `StoreCallbacksFFI::store_to_udt`

/// Parse a value from its external text form
pub const UDT_INPUT: u8 = b'i';
/// Render a value to its external text form
pub const UDT_OUTPUT: u8 = b'o';
/// Parse a value from its binary form
pub const UDT_RECEIVE: u8 = b'r';
/// Render a value to its binary form
pub const UDT_SEND: u8 = b's';

/// Reconcile the return type like a parameter (input coercion)
pub const RECONCILE_RETURN: i32 = -1;
/// Reconcile the return type as an output adapter; the explicit type is the
/// only element of the explicit-types array
pub const RECONCILE_RETURN_OUT: i32 = -2;
