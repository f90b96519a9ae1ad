// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use callbridge::{Datum, FunctionCall, Result, Slot};
use callbridge_testing::{Fixture, Outcome, RoutineScript, Script, int, oid, procedure};

#[test]
fn test_rows_until_done() -> Result<()> {
	let fixture = Fixture::new();
	let (a, b) = (fixture.types.text("a"), fixture.types.text("b"));
	let mut def = procedure(100, "letters", &[oid::INT4], oid::TEXT);
	def.returns_set = true;
	let id = fixture.declare(
		def,
		Script::Routine(RoutineScript::new(move |_| Outcome::Rows(vec![Some(a), None, Some(b)])).multi_call()),
	);
	let bridge = fixture.bridge();
	let area = bridge.parameter_area();

	fixture.host.connect();
	let mut call = FunctionCall::new(id).arg(int(3), oid::INT4);

	let first = bridge.call(&mut call)?;
	assert!(!call.is_null);
	assert_eq!(fixture.types.text_value(first).as_deref(), Some("a"));
	assert_eq!(fixture.host.disconnects(), 1, "first call runs disconnected");
	assert_eq!(call.set_returning.calls(), 1);

	fixture.host.connect();
	assert_eq!(bridge.call(&mut call)?, Datum::ZERO);
	assert!(call.is_null, "null row");
	assert!(!area.borrow().in_flight(), "arguments are marshaled only once");

	let third = bridge.call(&mut call)?;
	assert!(!call.is_null);
	assert_eq!(fixture.types.text_value(third).as_deref(), Some("b"));

	bridge.call(&mut call)?;
	assert!(call.is_null);
	assert!(call.set_returning.is_done());
	assert_eq!(fixture.guest.closed_providers(), 1);

	bridge.call(&mut call)?;
	assert!(call.is_null);
	assert_eq!(fixture.guest.closed_providers(), 1, "a finished set is not asked again");

	assert_eq!(fixture.host.disconnects(), 1, "later calls keep the connection");
	let invocations = fixture.guest.invocations();
	assert_eq!(invocations.len(), 1);
	assert_eq!(invocations[0].args.primitives, vec![Slot::from_i32(3)]);
	Ok(())
}

#[test]
fn test_provider_reference_released_when_done() -> Result<()> {
	let fixture = Fixture::new();
	let id = fixture.routine(
		100,
		"one",
		&[],
		oid::INT4,
		RoutineScript::new(|_| Outcome::Rows(vec![Some(int(1))])).multi_call(),
	);
	let bridge = fixture.bridge();

	let mut call = FunctionCall::new(id);
	assert_eq!(bridge.call(&mut call)?, int(1));
	let during = fixture.guest.live_globals();

	bridge.call(&mut call)?;
	assert!(call.set_returning.is_done());
	assert_eq!(fixture.guest.live_globals(), during - 1);
	Ok(())
}

#[test]
fn test_empty_provider() -> Result<()> {
	let fixture = Fixture::new();
	let id = fixture.routine(100, "none", &[], oid::TEXT, RoutineScript::new(|_| Outcome::Rows(Vec::new())).multi_call());
	let bridge = fixture.bridge();

	let mut call = FunctionCall::new(id);
	assert_eq!(bridge.call(&mut call)?, Datum::ZERO);
	assert!(call.is_null);
	assert!(call.set_returning.is_done());
	assert_eq!(call.set_returning.calls(), 0);
	assert_eq!(fixture.guest.closed_providers(), 1);
	Ok(())
}

#[test]
fn test_call_after_empty_set_does_not_start_again() -> Result<()> {
	let fixture = Fixture::new();
	let id = fixture.routine(
		100,
		"none",
		&[oid::INT4],
		oid::TEXT,
		RoutineScript::new(|_| Outcome::Rows(Vec::new())).multi_call(),
	);
	let bridge = fixture.bridge();

	fixture.host.connect();
	let mut call = FunctionCall::new(id).arg(int(1), oid::INT4);
	bridge.call(&mut call)?;
	assert!(call.set_returning.is_done());
	assert!(!call.set_returning.is_first_call());

	fixture.host.connect();
	assert_eq!(bridge.call(&mut call)?, Datum::ZERO);
	assert!(call.is_null);
	assert_eq!(fixture.host.disconnects(), 1);
	assert_eq!(fixture.guest.invocations().len(), 1);
	assert_eq!(fixture.guest.closed_providers(), 1);
	Ok(())
}

#[test]
fn test_missing_provider_ends_set() -> Result<()> {
	let fixture = Fixture::new();
	let id = fixture.routine(100, "nil", &[], oid::TEXT, RoutineScript::new(|_| Outcome::Value(None)).multi_call());
	let bridge = fixture.bridge();

	let mut call = FunctionCall::new(id);
	assert_eq!(bridge.call(&mut call)?, Datum::ZERO);
	assert!(call.is_null);
	assert!(call.set_returning.is_done());
	assert_eq!(fixture.guest.closed_providers(), 0);
	Ok(())
}

#[test]
fn test_set_returning_rows_are_not_out_parameters() -> Result<()> {
	let fixture = Fixture::new();
	let id = fixture.routine(
		100,
		"records",
		&[],
		oid::RECORD,
		RoutineScript::new(|_| Outcome::Rows(vec![Some(Datum(5))])).multi_call(),
	);
	let bridge = fixture.bridge();

	let mut call = FunctionCall::new(id);
	assert_eq!(bridge.call(&mut call)?, Datum(5));

	let descriptor = bridge.cached(id).expect("cached");
	let routine = descriptor.routine().expect("ordinary procedure");
	assert!(routine.is_multi_call());
	assert!(!routine.has_out_parameter());
	assert_eq!(routine.reference_slots(), 0);
	Ok(())
}
