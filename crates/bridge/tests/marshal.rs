// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use callbridge::{BridgeConfig, Error, FunctionCall, ParamCounts, Result, Slot, TypeId};
use callbridge_testing::{Fixture, Object, Outcome, RoutineScript, init_tracing, int, oid};

fn sum(args: &callbridge::Arguments) -> Outcome {
	Outcome::Primitive(Slot::from_i32(args.primitives.iter().map(|slot| slot.as_i32()).sum()))
}

#[test]
fn test_primitives_and_references_fill_separately() -> Result<()> {
	init_tracing();
	let fixture = Fixture::new();
	let id = fixture.routine(100, "mixed", &[oid::INT4, oid::TEXT, oid::INT4], oid::INT4, RoutineScript::new(sum));
	let bridge = fixture.bridge();
	let name = fixture.types.text("ada");

	let mut call = FunctionCall::new(id).arg(int(5), oid::INT4).arg(name, oid::TEXT).arg(int(7), oid::INT4);
	assert_eq!(bridge.call(&mut call)?, int(12));
	assert!(!call.is_null);

	let invocation = fixture.guest.last_invocation().expect("invoked");
	assert_eq!(invocation.header, ParamCounts::new(1, 2).pack());
	assert_eq!(invocation.args.primitives, vec![Slot::from_i32(5), Slot::from_i32(7)]);

	let text = invocation.args.references[0].expect("text passed as object");
	assert_eq!(fixture.guest.object(text), Some(Object::Value(name)));
	Ok(())
}

#[test]
fn test_null_primitive_is_zero() -> Result<()> {
	let fixture = Fixture::new();
	let id = fixture.routine(100, "add", &[oid::INT4, oid::INT4], oid::INT4, RoutineScript::new(sum));
	let bridge = fixture.bridge();

	let mut call = FunctionCall::new(id).arg(int(9), oid::INT4).null_arg(oid::INT4);
	assert_eq!(bridge.call(&mut call)?, int(9));

	let invocation = fixture.guest.last_invocation().expect("invoked");
	assert_eq!(invocation.args.primitives, vec![Slot::from_i32(9), Slot::ZERO]);
	Ok(())
}

#[test]
fn test_null_reference_keeps_positions() -> Result<()> {
	let fixture = Fixture::new();
	let id = fixture.routine(100, "concat", &[oid::TEXT, oid::TEXT], oid::VOID, RoutineScript::new(|_| Outcome::Void));
	let bridge = fixture.bridge();
	let second = fixture.types.text("second");

	let mut call = FunctionCall::new(id).null_arg(oid::TEXT).arg(second, oid::TEXT);
	bridge.call(&mut call)?;

	let invocation = fixture.guest.last_invocation().expect("invoked");
	assert_eq!(invocation.header, ParamCounts::new(2, 0).pack());
	assert_eq!(invocation.args.references[0], None);
	let object = invocation.args.references[1].expect("second argument passed");
	assert_eq!(fixture.guest.object(object), Some(Object::Value(second)));
	Ok(())
}

#[test]
fn test_array_of_primitives_is_a_reference() -> Result<()> {
	let fixture = Fixture::new();
	let id = fixture.routine(100, "total", &[oid::INT4_ARRAY], oid::VOID, RoutineScript::new(|_| Outcome::Void));
	let bridge = fixture.bridge();

	bridge.call(&mut FunctionCall::new(id).arg(callbridge::Datum(3), oid::INT4_ARRAY))?;

	let invocation = fixture.guest.last_invocation().expect("invoked");
	assert_eq!(invocation.header, ParamCounts::new(1, 0).pack());
	assert!(invocation.args.primitives.is_empty());
	Ok(())
}

#[test]
fn test_dynamic_parameter_resolves_against_actual_type() -> Result<()> {
	let fixture = Fixture::new();
	let id = fixture.routine(100, "identity", &[oid::ANY], oid::VOID, RoutineScript::new(|_| Outcome::Void));
	let bridge = fixture.bridge();

	bridge.call(&mut FunctionCall::new(id).arg(int(31), oid::INT4))?;

	let invocation = fixture.guest.last_invocation().expect("invoked");
	assert_eq!(invocation.header, ParamCounts::new(1, 0).pack());
	let object = invocation.args.references[0].expect("boxed argument");
	assert_eq!(fixture.guest.object(object), Some(Object::Value(int(31))));
	Ok(())
}

#[test]
fn test_argument_count_mismatch() {
	let fixture = Fixture::new();
	let id = fixture.routine(100, "add", &[oid::INT4, oid::INT4], oid::INT4, RoutineScript::new(sum));
	let bridge = fixture.bridge();

	let err = bridge.call(&mut FunctionCall::new(id).arg(int(1), oid::INT4)).unwrap_err();
	assert!(matches!(
		err,
		Error::ArgumentCountMismatch {
			passed: 1,
			declared: 2
		}
	));
	assert!(fixture.guest.invocations().is_empty());
}

#[test]
fn test_failed_call_leaves_area_idle() -> Result<()> {
	let fixture = Fixture::new();
	let id = fixture.routine(100, "add", &[oid::INT4, oid::INT4], oid::INT4, RoutineScript::new(sum));
	let bridge = fixture.bridge();
	let area = bridge.parameter_area();

	assert!(bridge.call(&mut FunctionCall::new(id).arg(int(1), oid::INT4)).is_err());
	assert!(!area.borrow().in_flight());

	let mut call = FunctionCall::new(id).arg(int(2), oid::INT4).arg(int(3), oid::INT4);
	assert_eq!(bridge.call(&mut call)?, int(5));
	assert!(!area.borrow().in_flight());
	assert_eq!(fixture.guest.frames(), (0, 0), "an unrelated call is not reentrant");
	Ok(())
}

#[test]
fn test_too_many_parameters() {
	let fixture = Fixture::new();
	let id = fixture.routine(
		100,
		"wide",
		&[oid::INT4, oid::INT4, oid::INT4],
		oid::INT4,
		RoutineScript::new(sum),
	);
	let bridge = fixture.bridge_with(BridgeConfig::new().max_parameters(2));

	let err = bridge.get_function(id, false, false, false).unwrap_err();
	assert!(matches!(
		err,
		Error::TooManyParameters {
			count: 3,
			max: 2
		}
	));
	assert_eq!(bridge.pending_placeholders(), 0);
}

#[test]
fn test_out_parameter_counts_against_limit() {
	let fixture = Fixture::new();
	let id = fixture.routine(100, "rows", &[oid::TEXT, oid::TEXT], oid::RECORD, RoutineScript::new(|_| Outcome::Void));
	let bridge = fixture.bridge_with(BridgeConfig::new().max_parameters(2));

	let err = bridge.get_function(id, false, false, false).unwrap_err();
	assert!(matches!(
		err,
		Error::TooManyParameters {
			count: 3,
			max: 2
		}
	));
}

const REENTRANT_INT: TypeId = TypeId(90001);

#[test]
fn test_reentrant_call_preserves_area() -> Result<()> {
	init_tracing();
	let fixture = Fixture::new();
	let inner = fixture.routine(
		200,
		"double",
		&[oid::INT4],
		oid::INT4,
		RoutineScript::new(|args| Outcome::Primitive(Slot::from_i32(args.primitives[0].as_i32() * 2))),
	);
	fixture.types.add_reentrant(REENTRANT_INT, inner);
	let outer =
		fixture.routine(201, "outer", &[oid::INT4, REENTRANT_INT, oid::INT4], oid::INT4, RoutineScript::new(sum));
	let bridge = fixture.bridge();

	let mut call =
		FunctionCall::new(outer).arg(int(1), oid::INT4).arg(int(10), REENTRANT_INT).arg(int(3), oid::INT4);
	assert_eq!(bridge.call(&mut call)?, int(24));

	let probe = fixture.types.probe();
	let before = probe.before.borrow().clone().expect("nested call happened");
	let after = probe.after.borrow().clone().expect("nested call returned");
	assert_eq!(before, after, "nested call leaves the outer arguments intact");
	assert_eq!(before.header(), ParamCounts::new(0, 3).pack());
	assert_eq!(before.primitive(0), Some(Slot::from_i32(1)));

	assert_eq!(fixture.guest.frames(), (1, 1));
	let invocations = fixture.guest.invocations();
	assert_eq!(invocations.len(), 2);
	assert_eq!(invocations[0].procedure, inner);
	assert_eq!(invocations[0].args.primitives, vec![Slot::from_i32(10)]);
	assert_eq!(invocations[1].procedure, outer);
	assert_eq!(invocations[1].args.primitives, vec![Slot::from_i32(1), Slot::from_i32(20), Slot::from_i32(3)]);
	assert_eq!(bridge.invocation_depth(), 0);
	Ok(())
}

#[test]
fn test_failed_reentrant_call_unwinds_frames() {
	let fixture = Fixture::new();
	let inner = fixture.routine(
		200,
		"explode",
		&[oid::INT4],
		oid::INT4,
		RoutineScript::new(|_| Outcome::Raise("inner failed".to_string())),
	);
	fixture.types.add_reentrant(REENTRANT_INT, inner);
	let outer = fixture.routine(201, "outer", &[oid::INT4, REENTRANT_INT], oid::INT4, RoutineScript::new(sum));
	let plain = fixture.routine(202, "plain", &[oid::INT4], oid::INT4, RoutineScript::new(sum));
	let bridge = fixture.bridge();

	let mut call = FunctionCall::new(outer).arg(int(1), oid::INT4).arg(int(10), REENTRANT_INT);
	let err = bridge.call(&mut call).unwrap_err();

	assert!(matches!(err, Error::Guest(ref message) if message == "inner failed"));
	assert_eq!(fixture.guest.frames(), (1, 1));
	assert_eq!(bridge.invocation_depth(), 0);
	assert_eq!(fixture.guest.invocations().len(), 1, "outer body never ran");
	assert!(!bridge.parameter_area().borrow().in_flight(), "outer arguments dropped");

	let mut call = FunctionCall::new(plain).arg(int(4), oid::INT4);
	assert_eq!(bridge.call(&mut call).unwrap(), int(4));
	assert_eq!(fixture.guest.frames(), (1, 1));
}
