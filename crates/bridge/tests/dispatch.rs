// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use callbridge::{Datum, Error, FunctionCall, ObjectRef, ParamCounts, Result, Slot};
use callbridge_testing::{Fixture, Object, Outcome, RoutineScript, int, oid};

#[test]
fn test_primitive_returns() -> Result<()> {
	let fixture = Fixture::new();
	let flag = fixture.routine(100, "flag", &[], oid::BOOL, RoutineScript::new(|_| Outcome::Primitive(Slot::from_bool(true))));
	let negative =
		fixture.routine(101, "negative", &[], oid::INT4, RoutineScript::new(|_| Outcome::Primitive(Slot::from_i32(-3))));
	let big = fixture.routine(
		102,
		"big",
		&[],
		oid::INT8,
		RoutineScript::new(|_| Outcome::Primitive(Slot::from_i64(1 << 40))),
	);
	let ratio =
		fixture.routine(103, "ratio", &[], oid::FLOAT8, RoutineScript::new(|_| Outcome::Primitive(Slot::from_f64(2.5))));
	let bridge = fixture.bridge();

	assert_eq!(bridge.call(&mut FunctionCall::new(flag))?, Datum(1));
	assert_eq!(bridge.call(&mut FunctionCall::new(negative))?, int(-3));
	assert_eq!(bridge.call(&mut FunctionCall::new(big))?, Datum(1 << 40));
	assert_eq!(bridge.call(&mut FunctionCall::new(ratio))?, Datum(2.5f64.to_bits()));
	Ok(())
}

#[test]
fn test_void_return() -> Result<()> {
	let fixture = Fixture::new();
	let id = fixture.routine(100, "log", &[oid::INT4], oid::VOID, RoutineScript::new(|_| Outcome::Void));
	let bridge = fixture.bridge();

	let mut call = FunctionCall::new(id).arg(int(1), oid::INT4);
	assert_eq!(bridge.call(&mut call)?, Datum::ZERO);
	assert!(!call.is_null);
	Ok(())
}

#[test]
fn test_reference_return() -> Result<()> {
	let fixture = Fixture::new();
	let greeting = fixture.types.text("hello");
	let id = fixture.routine(100, "greet", &[], oid::TEXT, RoutineScript::new(move |_| Outcome::Value(Some(greeting))));
	let bridge = fixture.bridge();

	let mut call = FunctionCall::new(id);
	let result = bridge.call(&mut call)?;
	assert!(!call.is_null);
	assert_eq!(fixture.types.text_value(result).as_deref(), Some("hello"));
	Ok(())
}

#[test]
fn test_null_reference_return() -> Result<()> {
	let fixture = Fixture::new();
	let id = fixture.routine(100, "nothing", &[], oid::TEXT, RoutineScript::new(|_| Outcome::Value(None)));
	let bridge = fixture.bridge();

	let mut call = FunctionCall::new(id);
	assert_eq!(bridge.call(&mut call)?, Datum::ZERO);
	assert!(call.is_null);
	Ok(())
}

#[test]
fn test_dynamic_return_resolves_against_call_type() -> Result<()> {
	let fixture = Fixture::new();
	let id = fixture.routine(
		100,
		"echo",
		&[oid::ANY],
		oid::ANY,
		RoutineScript::new(|_| Outcome::Value(Some(int(8)))),
	);
	let bridge = fixture.bridge();

	let mut call = FunctionCall::new(id).arg(int(8), oid::INT4).returns(oid::INT4);
	assert_eq!(bridge.call(&mut call)?, int(8));
	assert!(!call.is_null);
	Ok(())
}

#[test]
fn test_out_parameter_return() -> Result<()> {
	let fixture = Fixture::new();
	let id = fixture.routine(
		100,
		"row_of",
		&[oid::INT4],
		oid::RECORD,
		RoutineScript::new(|_| Outcome::Value(Some(Datum(77)))),
	);
	let bridge = fixture.bridge();

	let mut call = FunctionCall::new(id).arg(int(4), oid::INT4);
	assert_eq!(bridge.call(&mut call)?, Datum(77));
	assert!(!call.is_null);

	let invocation = fixture.guest.last_invocation().expect("invoked");
	assert_eq!(invocation.header, ParamCounts::new(1, 1).pack());
	assert_eq!(invocation.args.primitives, vec![Slot::from_i32(4)]);

	let writer = invocation.args.references[0].expect("writer in the last reference slot");
	assert_eq!(fixture.guest.object(writer), None, "writer reference released after the call");

	let descriptor = bridge.cached(id).expect("cached");
	let routine = descriptor.routine().expect("ordinary procedure");
	assert!(routine.has_out_parameter());
	assert_eq!(routine.reference_slots(), 1);
	assert_eq!(fixture.guest.resolved(id), Some(vec!["int".to_string(), "java.sql.ResultSet".to_string()]));
	Ok(())
}

#[test]
fn test_out_parameter_without_row_is_null() -> Result<()> {
	let fixture = Fixture::new();
	let id = fixture.routine(100, "no_row", &[], oid::RECORD, RoutineScript::new(|_| Outcome::Value(None)));
	let bridge = fixture.bridge();

	let mut call = FunctionCall::new(id);
	assert_eq!(bridge.call(&mut call)?, Datum::ZERO);
	assert!(call.is_null);
	Ok(())
}

#[test]
fn test_set_parameter_only_supports_last_reference() -> Result<()> {
	let fixture = Fixture::new();
	let plain = fixture.routine(100, "plain", &[oid::INT4], oid::INT4, RoutineScript::new(|_| Outcome::Void));
	let rows = fixture.routine(101, "rows", &[oid::TEXT], oid::RECORD, RoutineScript::new(|_| Outcome::Void));
	let bridge = fixture.bridge();

	let plain = bridge.get_function(plain, false, false, false)?.expect("resolved");
	assert!(matches!(bridge.set_parameter(&plain, -1, None), Err(Error::UnsupportedParameterIndex(-1))));

	let rows = bridge.get_function(rows, false, false, false)?.expect("resolved");
	assert!(matches!(bridge.set_parameter(&rows, 0, None), Err(Error::UnsupportedParameterIndex(0))));

	let value = ObjectRef::new(0x55);
	bridge.set_parameter(&rows, -1, value)?;
	assert_eq!(bridge.parameter_area().borrow().reference(1), value);
	Ok(())
}

#[test]
fn test_guest_failure_propagates() {
	let fixture = Fixture::new();
	let id = fixture.routine(
		100,
		"fail",
		&[oid::TEXT],
		oid::INT4,
		RoutineScript::new(|_| Outcome::Raise("division by zero".to_string())),
	);
	let bridge = fixture.bridge();
	let text = fixture.types.text("x");

	let err = bridge.call(&mut FunctionCall::new(id).arg(text, oid::TEXT)).unwrap_err();
	assert!(matches!(err, Error::Guest(ref message) if message == "division by zero"));
	assert_eq!(bridge.invocation_depth(), 0);
	assert!(!bridge.parameter_area().borrow().in_flight());
}

#[test]
fn test_passed_object_is_boxed_value() -> Result<()> {
	let fixture = Fixture::new();
	let id = fixture.routine(100, "length", &[oid::TEXT], oid::INT4, RoutineScript::new(|_| Outcome::Primitive(Slot::from_i32(3))));
	let bridge = fixture.bridge();
	let text = fixture.types.text("abc");

	assert_eq!(bridge.call(&mut FunctionCall::new(id).arg(text, oid::TEXT))?, int(3));
	let object = fixture.guest.last_invocation().and_then(|invocation| invocation.args.references[0]);
	assert!(matches!(object.and_then(|object| fixture.guest.object(object)), Some(Object::Value(datum)) if datum == text));
	Ok(())
}
