// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{cell::Cell, rc::Rc};

use callbridge::{Datum, Error, FunctionCall, ParamCounts, Result, Slot, TriggerData, TypeId};
use callbridge_testing::{
	Fixture, Object, Outcome, RoutineScript,
	host::{CALL_CONTEXT, UPPER_CONTEXT},
	int, oid,
};

const TRIGGERED_INT: TypeId = TypeId(90002);

#[test]
fn test_trigger_returns_row() -> Result<()> {
	let fixture = Fixture::new();
	let id = fixture.routine(100, "audit", &[], oid::VOID, RoutineScript::new(|_| Outcome::Value(Some(Datum(555)))));
	let bridge = fixture.bridge();

	let mut call = FunctionCall::trigger(id, TriggerData(9));
	assert_eq!(bridge.call(&mut call)?, Datum(555));
	assert!(!call.is_null);

	let invocation = fixture.guest.last_invocation().expect("invoked");
	assert_eq!(invocation.header, ParamCounts::new(1, 0).pack());
	let data = invocation.args.references[0].expect("trigger data passed");
	assert_eq!(fixture.guest.object(data), None, "trigger data released");

	assert_eq!(fixture.host.connects(), 1);
	assert_eq!(fixture.host.switches(), vec![UPPER_CONTEXT, CALL_CONTEXT]);
	assert_eq!(fixture.host.current_context(), CALL_CONTEXT);
	Ok(())
}

#[test]
fn test_trigger_data_carries_context() -> Result<()> {
	let fixture = Fixture::new();
	let seen = Rc::new(Cell::new(None));
	let id = {
		let (seen, heap) = (seen.clone(), fixture.heap.clone());
		fixture.routine(
			100,
			"inspect",
			&[],
			oid::VOID,
			RoutineScript::new(move |args| {
				let context = args.references[0].and_then(|data| match heap.borrow().get(data) {
					Some(Object::Trigger {
						context,
						..
					}) => Some(*context),
					_ => None,
				});
				seen.set(context);
				Outcome::Void
			}),
		)
	};
	let bridge = fixture.bridge();

	bridge.call(&mut FunctionCall::trigger(id, TriggerData(42)))?;
	assert_eq!(seen.get(), Some(42));
	Ok(())
}

#[test]
fn test_no_row_is_not_null() -> Result<()> {
	let fixture = Fixture::new();
	let id = fixture.routine(100, "skip", &[], oid::VOID, RoutineScript::new(|_| Outcome::Value(None)));
	let bridge = fixture.bridge();

	let mut call = FunctionCall::trigger(id, TriggerData(1));
	assert_eq!(bridge.call(&mut call)?, Datum::ZERO);
	assert!(!call.is_null);
	Ok(())
}

#[test]
fn test_pending_exception_skips_result() -> Result<()> {
	let fixture = Fixture::new();
	let id = fixture.routine(100, "pending", &[], oid::VOID, RoutineScript::new(|_| Outcome::Pending));
	let bridge = fixture.bridge();

	let mut call = FunctionCall::trigger(id, TriggerData(1));
	assert_eq!(bridge.call(&mut call)?, Datum::ZERO);
	assert_eq!(fixture.host.connects(), 0);
	assert!(fixture.host.switches().is_empty());
	Ok(())
}

#[test]
fn test_pending_exception_is_per_call() -> Result<()> {
	let fixture = Fixture::new();
	let calls = Rc::new(Cell::new(0));
	let id = {
		let calls = calls.clone();
		fixture.routine(
			100,
			"flaky",
			&[],
			oid::VOID,
			RoutineScript::new(move |_| {
				calls.set(calls.get() + 1);
				match calls.get() {
					1 => Outcome::Pending,
					_ => Outcome::Value(Some(Datum(8))),
				}
			}),
		)
	};
	let bridge = fixture.bridge();

	assert_eq!(bridge.call(&mut FunctionCall::trigger(id, TriggerData(1)))?, Datum::ZERO);
	assert_eq!(bridge.call(&mut FunctionCall::trigger(id, TriggerData(2)))?, Datum(8));
	assert_eq!(fixture.host.connects(), 1);
	Ok(())
}

#[test]
fn test_nested_trigger_preserves_area() -> Result<()> {
	let fixture = Fixture::new();
	let trigger = fixture.routine(100, "stamp", &[], oid::VOID, RoutineScript::new(|_| Outcome::Value(Some(Datum(40)))));
	fixture.types.add_reentrant_trigger(TRIGGERED_INT, trigger);
	let outer = fixture.routine(
		101,
		"outer",
		&[oid::INT4, TRIGGERED_INT, oid::INT4],
		oid::INT4,
		RoutineScript::new(|args| {
			Outcome::Primitive(Slot::from_i32(args.primitives.iter().map(|slot| slot.as_i32()).sum()))
		}),
	);
	let bridge = fixture.bridge();

	let mut call = FunctionCall::new(outer).arg(int(1), oid::INT4).arg(int(7), TRIGGERED_INT).arg(int(3), oid::INT4);
	assert_eq!(bridge.call(&mut call)?, int(44));

	let probe = fixture.types.probe();
	let before = probe.before.borrow().clone().expect("trigger fired during marshaling");
	let after = probe.after.borrow().clone().expect("trigger returned");
	assert_eq!(before, after);
	assert_eq!(before.header(), ParamCounts::new(0, 3).pack());

	let invocations = fixture.guest.invocations();
	assert_eq!(invocations[0].procedure, trigger);
	assert_eq!(invocations[0].header, ParamCounts::new(1, 0).pack());
	assert_eq!(fixture.guest.frames(), (1, 1));
	assert!(!bridge.parameter_area().borrow().in_flight());
	Ok(())
}

#[test]
fn test_trigger_failure_releases_data() {
	let fixture = Fixture::new();
	let seen = Rc::new(Cell::new(None));
	let id = {
		let seen = seen.clone();
		fixture.routine(
			100,
			"reject",
			&[],
			oid::VOID,
			RoutineScript::new(move |args| {
				seen.set(args.references[0]);
				Outcome::Raise("row rejected".to_string())
			}),
		)
	};
	let bridge = fixture.bridge();

	let err = bridge.call(&mut FunctionCall::trigger(id, TriggerData(1))).unwrap_err();
	assert!(matches!(err, Error::Guest(ref message) if message == "row rejected"));

	let data = seen.get().expect("trigger data passed");
	assert!(!fixture.heap.borrow().is_live(data));
	assert_eq!(fixture.host.connects(), 0);
}
