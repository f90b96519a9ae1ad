// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Invocation of an ordinary procedure.

use std::rc::Rc;

use tracing::instrument;

use crate::{
	bridge::Bridge,
	call::FunctionCall,
	descriptor::{Descriptor, DescriptorKind, Routine},
	error::{Error, Result},
	types::{Type, pass_as_primitive},
	value::{Datum, ObjectRef},
};

impl Bridge {
	#[instrument(name = "bridge::dispatch::invoke", level = "trace", skip_all, fields(procedure = %descriptor.id()))]
	pub(crate) fn invoke(&self, descriptor: &Descriptor, call: &mut FunctionCall) -> Result<Datum> {
		call.is_null = false;

		let routine = match descriptor.kind() {
			DescriptorKind::Udt(binding) => return self.invoke_udt(&binding.udt, binding.function, call),
			DescriptorKind::Routine(routine) => routine,
		};

		if routine.multi_call && call.set_returning.is_done() {
			call.is_null = true;
			return Ok(Datum::ZERO);
		}

		// arguments only matter on the first call of a set
		let marshal = if routine.multi_call {
			let first = call.set_returning.is_first_call();
			if first {
				self.host.assert_disconnect();
			}
			first
		} else {
			true
		};

		let _claim = if marshal {
			self.check_arguments(routine, call)?;
			let claim = self.begin_call(routine.counts())?;
			self.marshal_parameters(routine, call)?;
			Some(claim)
		} else {
			None
		};

		let return_type = if routine.return_type.is_dynamic() {
			routine.return_type.real_type(call.result_type, routine.type_map())?
		} else {
			routine.return_type.clone()
		};

		if routine.multi_call {
			self.invoke_set_returning(routine, &return_type, call)
		} else {
			self.invoke_single(routine, &return_type, call)
		}
	}

	fn invoke_single(&self, routine: &Routine, return_type: &Rc<dyn Type>, call: &mut FunctionCall) -> Result<Datum> {
		let target = routine.target();

		if routine.out_parameter {
			let writer = return_type.create_out_parameter()?;
			let result = self
				.set_routine_parameter(routine, -1, Some(writer))
				.and_then(|()| self.guest.invoke(target))
				.and_then(|()| return_type.take_out_parameter(writer));
			self.guest.delete_local_ref(writer);
			return Ok(nullable(call, result?));
		}

		if return_type.is_void() {
			self.guest.invoke(target)?;
			return Ok(Datum::ZERO);
		}

		if pass_as_primitive(return_type.as_ref()) {
			self.guest.invoke(target)?;
			let slot = self.area.borrow().return_slot();
			return return_type.datum_from_slot(slot);
		}

		let object = self.guest.ref_invoke(target)?;
		let datum = self.coerce_result(return_type, object)?;
		Ok(nullable(call, datum))
	}

	/// Host value of a guest result, releasing the local reference
	pub(crate) fn coerce_result(&self, ty: &Rc<dyn Type>, object: Option<ObjectRef>) -> Result<Option<Datum>> {
		let Some(object) = object else {
			return Ok(None);
		};
		let datum = ty.coerce_object(object);
		self.guest.delete_local_ref(object);
		datum.map(Some)
	}

	/// Set a single parameter slot of a call in progress
	///
	/// Only index `-1`, the last reference slot, is supported.
	pub fn set_parameter(&self, descriptor: &Descriptor, index: i32, value: Option<ObjectRef>) -> Result<()> {
		let routine = descriptor.routine().ok_or(Error::UnsupportedParameterIndex(index))?;
		self.set_routine_parameter(routine, index, value)
	}

	fn set_routine_parameter(&self, routine: &Routine, index: i32, value: Option<ObjectRef>) -> Result<()> {
		let slots = routine.reference_slots();
		if index != -1 || slots < 1 {
			return Err(Error::UnsupportedParameterIndex(index));
		}
		self.area.borrow_mut().set_reference(usize::from(slots - 1), value)
	}
}

/// Unwrap a nullable result, flagging null on the call
pub(crate) fn nullable(call: &mut FunctionCall, datum: Option<Datum>) -> Datum {
	match datum {
		Some(datum) => datum,
		None => {
			call.is_null = true;
			Datum::ZERO
		}
	}
}
