// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! The bridge driving a guest through its C ABI vtable.

use std::{
	cell::{Cell, RefCell},
	ffi::c_void,
	ptr::null,
	rc::Rc,
	slice,
};

use callbridge::{
	Bridge, BridgeConfig, Error, FunctionCall, GuestRuntime, ObjectRef, ProcedureId, Result, ffi::FfiGuest,
};
use callbridge_abi::{
	BufferFFI, CreateRequestFFI, FFI_END_OF_ITERATION, FFI_ERROR_GUEST, FFI_NOT_FOUND, FFI_OK, GuestVTableFFI,
	LoaderKeyFFI, NameSinkFFI, ParameterAreaFFI, RoutineSpecFFI, StoreCallbacksFFI, unpack_param_counts,
};
use callbridge_testing::{Fixture, int, oid, procedure};

const MISSING: u32 = 404;
const CLASS: u64 = 11;
const TARGET: u64 = 77;

#[derive(Default)]
struct State {
	globals: Cell<i64>,
	destroyed: Cell<bool>,
	names: RefCell<Vec<String>>,
	invocations: Cell<usize>,
}

struct TestGuest {
	area: Cell<Option<ParameterAreaFFI>>,
	state: Rc<State>,
}

fn guest<'a>(instance: *mut c_void) -> &'a TestGuest {
	unsafe { &*(instance as *const TestGuest) }
}

extern "C" fn collect_name(ctx: *mut c_void, index: usize, name: BufferFFI) {
	let names = unsafe { &mut *(ctx as *mut Vec<String>) };
	if names.len() <= index {
		names.resize(index + 1, String::new());
	}
	names[index] = unsafe { name.as_str() }.unwrap_or_default().to_string();
}

extern "C" fn attach_parameter_area(instance: *mut c_void, area: ParameterAreaFFI) {
	guest(instance).area.set(Some(area));
}

extern "C" fn create(
	instance: *mut c_void,
	store: *const StoreCallbacksFFI,
	request: *const CreateRequestFFI,
	target_out: *mut u64,
) -> i32 {
	let (store, request) = unsafe { (&*store, &*request) };
	if request.procedure == MISSING {
		return FFI_ERROR_GUEST;
	}

	let spec = RoutineSpecFFI {
		loader: LoaderKeyFFI {
			index: 0,
			generation: 0,
		},
		has_loader: 0,
		class: CLASS,
		read_only: request.read_only,
		multi_call: 0,
		type_map: 0,
		return_type: request.return_type,
		return_guest_type: BufferFFI::empty(),
		param_types: request.arg_types,
		param_guest_types: null(),
		param_count: request.arg_count,
	};

	let mut names: Vec<String> = Vec::new();
	let sink = NameSinkFFI {
		ctx: &mut names as *mut Vec<String> as *mut c_void,
		accept: collect_name,
	};
	let mut out_parameter = 0u8;
	let code = (store.store_to_non_udt)(store.ctx, request.token, &spec, sink, &mut out_parameter);
	if code < 0 {
		return code;
	}

	*guest(instance).state.names.borrow_mut() = names;
	unsafe { *target_out = TARGET };
	FFI_OK
}

extern "C" fn class_if_udt(_: *mut c_void, _: *const CreateRequestFFI, class_out: *mut u64) -> i32 {
	unsafe { *class_out = 0 };
	FFI_OK
}

/// Sums the primitive arguments into the return slot
extern "C" fn invoke(instance: *mut c_void, _target: u64) -> i32 {
	let guest = guest(instance);
	let Some(area) = guest.area.get() else {
		return FFI_ERROR_GUEST;
	};
	let (_, primitives) = unpack_param_counts(unsafe { *area.header });
	let slots = unsafe { slice::from_raw_parts_mut(area.primitives, area.primitive_count) };
	let sum: i32 = slots[..primitives as usize].iter().map(|&slot| slot as u32 as i32).sum();
	slots[0] = sum as u32 as u64;
	unsafe { *area.header = 0 };
	guest.state.invocations.set(guest.state.invocations.get() + 1);
	FFI_OK
}

extern "C" fn handle_none(_: *mut c_void, _: u64, out: *mut u64) -> i32 {
	unsafe { *out = 0 };
	FFI_OK
}

extern "C" fn next_row(_: *mut c_void, _: u64, _: *mut u64) -> i32 {
	FFI_END_OF_ITERATION
}

extern "C" fn status_ok(_: *mut c_void, _: u64) -> i32 {
	FFI_OK
}

extern "C" fn trigger_return_tuple(_: *mut c_void, _: u64, _: *mut u64) -> i32 {
	FFI_NOT_FOUND
}

extern "C" fn unsupported_handle(_: *mut c_void, _: u64, _: *mut u64) -> i32 {
	FFI_ERROR_GUEST
}

extern "C" fn unsupported_invoke(_: *mut c_void, _: u64, _: BufferFFI, _: BufferFFI, _: *mut u64) -> i32 {
	FFI_ERROR_GUEST
}

extern "C" fn unsupported_render(_: *mut c_void, _: u64, _: *mut BufferFFI) -> i32 {
	FFI_ERROR_GUEST
}

extern "C" fn free_buffer(_: *mut c_void, _: BufferFFI) {}

extern "C" fn frame(_: *mut c_void) {}

extern "C" fn new_global_ref(instance: *mut c_void, local: u64) -> u64 {
	let state = &guest(instance).state;
	state.globals.set(state.globals.get() + 1);
	local + 1000
}

extern "C" fn delete_global_ref(instance: *mut c_void, _: u64) {
	let state = &guest(instance).state;
	state.globals.set(state.globals.get() - 1);
}

extern "C" fn delete_local_ref(_: *mut c_void, _: u64) {}

extern "C" fn resolve_loader(_: *mut c_void, _: LoaderKeyFFI, _: *mut u64) -> i32 {
	FFI_NOT_FOUND
}

extern "C" fn exception_pending(_: *mut c_void) -> u8 {
	0
}

extern "C" fn last_error(_: *mut c_void, message_out: *mut BufferFFI) -> i32 {
	unsafe { *message_out = BufferFFI::from_str("no such procedure") };
	FFI_OK
}

extern "C" fn destroy(instance: *mut c_void) {
	let guest = unsafe { Box::from_raw(instance as *mut TestGuest) };
	guest.state.destroyed.set(true);
}

fn vtable() -> GuestVTableFFI {
	GuestVTableFFI {
		attach_parameter_area,
		create,
		class_if_udt,
		invoke,
		ref_invoke: handle_none,
		next_row,
		close_provider: status_ok,
		create_trigger_data: handle_none,
		trigger_return_tuple,
		udt_parse_handle: unsupported_handle,
		udt_read_handle: unsupported_handle,
		udt_parse_invoke: unsupported_invoke,
		udt_read_invoke: unsupported_invoke,
		udt_to_string_invoke: unsupported_render,
		udt_write_invoke: unsupported_render,
		free_buffer,
		frame_push: frame,
		frame_pop: frame,
		new_global_ref,
		delete_global_ref,
		delete_local_ref,
		resolve_loader,
		exception_pending,
		last_error,
		destroy,
	}
}

fn ffi_bridge(fixture: &Fixture, config: BridgeConfig) -> Result<(Bridge, Rc<State>)> {
	let state = Rc::new(State::default());
	let instance = Box::into_raw(Box::new(TestGuest {
		area: Cell::new(None),
		state: state.clone(),
	}));
	let guest = unsafe { FfiGuest::new(vtable(), instance as *mut c_void) };

	let bridge = Bridge::builder()
		.config(config)
		.catalog(fixture.catalog.clone())
		.host(fixture.host.clone())
		.types(fixture.types.clone())
		.guest(Rc::new(guest))
		.build()?;
	Ok((bridge, state))
}

#[test]
fn test_call_through_vtable() -> Result<()> {
	let fixture = Fixture::new();
	fixture.catalog.add_procedure(procedure(1, "add", &[oid::INT4, oid::INT4], oid::INT4));
	let (bridge, state) = ffi_bridge(&fixture, BridgeConfig::default())?;

	let mut call = FunctionCall::new(ProcedureId(1)).arg(int(2), oid::INT4).arg(int(3), oid::INT4);
	assert_eq!(bridge.call(&mut call)?, int(5));
	assert_eq!(bridge.call(&mut FunctionCall::new(ProcedureId(1)).arg(int(-4), oid::INT4).arg(int(1), oid::INT4))?, int(-3));

	assert_eq!(state.invocations.get(), 2);
	assert_eq!(*state.names.borrow(), vec!["int".to_string(), "int".to_string(), "int".to_string()]);
	assert_eq!(state.globals.get(), 2, "class and call target");

	let descriptor = bridge.cached(ProcedureId(1)).expect("cached");
	assert_eq!(descriptor.class().raw(), CLASS + 1000);

	drop(descriptor);
	drop(bridge);
	assert_eq!(state.globals.get(), 0);
	assert!(state.destroyed.get());
	Ok(())
}

#[test]
fn test_guest_error_message() -> Result<()> {
	let fixture = Fixture::new();
	fixture.catalog.add_procedure(procedure(MISSING, "missing", &[], oid::INT4));
	let (bridge, _state) = ffi_bridge(&fixture, BridgeConfig::default())?;

	let err = bridge.call(&mut FunctionCall::new(ProcedureId(MISSING))).unwrap_err();
	assert!(matches!(err, Error::Guest(ref message) if message == "no such procedure"));
	assert_eq!(bridge.pending_placeholders(), 0);
	Ok(())
}

#[test]
fn test_store_callback_error_is_structured() -> Result<()> {
	let fixture = Fixture::new();
	fixture.catalog.add_procedure(procedure(1, "add", &[oid::INT4, oid::INT4], oid::INT4));
	let (bridge, state) = ffi_bridge(&fixture, BridgeConfig::new().max_parameters(1))?;

	let err = bridge.call(&mut FunctionCall::new(ProcedureId(1)).arg(int(1), oid::INT4).arg(int(1), oid::INT4)).unwrap_err();
	assert!(matches!(
		err,
		Error::TooManyParameters {
			count: 2,
			max: 1
		}
	));
	assert_eq!(state.globals.get(), 0);
	assert_eq!(state.invocations.get(), 0);
	Ok(())
}

#[test]
fn test_failure_code_reports_last_error() {
	let state = Rc::new(State::default());
	let instance = Box::into_raw(Box::new(TestGuest {
		area: Cell::new(None),
		state: state.clone(),
	}));
	{
		let guest = unsafe { FfiGuest::new(vtable(), instance as *mut c_void) };
		let target = ObjectRef::new(TARGET).expect("non-zero handle");
		let err = guest.invoke(target).unwrap_err();
		assert!(matches!(err, Error::Guest(ref message) if message == "no such procedure"));
	}
	assert!(state.destroyed.get());
}
