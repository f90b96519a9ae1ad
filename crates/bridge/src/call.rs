// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Host side of one procedure call.

use crate::{
	guest::{GlobalRef, TriggerData},
	value::{Datum, ObjectRef, ProcedureId, TypeId},
};

/// One actual argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argument {
	pub datum: Datum,
	pub is_null: bool,
	/// Type of the argument expression, used to resolve dynamic parameters
	pub actual_type: TypeId,
}

impl Argument {
	pub fn value(datum: Datum, actual_type: TypeId) -> Self {
		Self {
			datum,
			is_null: false,
			actual_type,
		}
	}

	pub fn null(actual_type: TypeId) -> Self {
		Self {
			datum: Datum::ZERO,
			is_null: true,
			actual_type,
		}
	}
}

/// Value-per-call state of a set-returning call, kept by the host across the
/// calls producing one result set
#[derive(Debug, Default)]
pub struct SetReturning {
	started: bool,
	calls: u64,
	provider: Option<GlobalRef>,
	done: bool,
}

impl SetReturning {
	/// True until the first call has run, whether or not it produced a row
	pub fn is_first_call(&self) -> bool {
		!self.started
	}

	/// Number of completed calls
	pub fn calls(&self) -> u64 {
		self.calls
	}

	pub fn is_done(&self) -> bool {
		self.done
	}

	pub(crate) fn provider(&self) -> Option<ObjectRef> {
		self.provider.as_ref().map(GlobalRef::handle)
	}

	pub(crate) fn start(&mut self, provider: GlobalRef) {
		self.started = true;
		self.provider = Some(provider);
	}

	pub(crate) fn advance(&mut self) {
		self.calls += 1;
	}

	pub(crate) fn finish(&mut self) {
		self.started = true;
		self.provider = None;
		self.done = true;
	}
}

/// A host call into a procedure
#[derive(Debug)]
pub struct FunctionCall {
	pub procedure: ProcedureId,
	pub args: Vec<Argument>,
	/// Type of the call expression, used to resolve a dynamic return type
	pub result_type: TypeId,
	/// Set by the bridge when the result is null
	pub is_null: bool,
	pub trigger: Option<TriggerData>,
	pub set_returning: SetReturning,
}

impl FunctionCall {
	pub fn new(procedure: ProcedureId) -> Self {
		Self {
			procedure,
			args: Vec::new(),
			result_type: TypeId::INVALID,
			is_null: false,
			trigger: None,
			set_returning: SetReturning::default(),
		}
	}

	pub fn trigger(procedure: ProcedureId, trigger: TriggerData) -> Self {
		let mut call = Self::new(procedure);
		call.trigger = Some(trigger);
		call
	}

	pub fn arg(mut self, datum: Datum, actual_type: TypeId) -> Self {
		self.args.push(Argument::value(datum, actual_type));
		self
	}

	pub fn null_arg(mut self, actual_type: TypeId) -> Self {
		self.args.push(Argument::null(actual_type));
		self
	}

	pub fn returns(mut self, result_type: TypeId) -> Self {
		self.result_type = result_type;
		self
	}
}
