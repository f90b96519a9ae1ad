// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use tracing::instrument;

use crate::{
	area::ParamCounts,
	bridge::Bridge,
	call::FunctionCall,
	descriptor::{Descriptor, Routine},
	error::{Error, Result},
	guest::TriggerData,
	host::UpperContext,
	value::{Datum, ObjectRef},
};

impl Bridge {
	/// Run a trigger procedure
	///
	/// The trigger context is passed as the only, reference, parameter. The
	/// result is a row or nothing, never a null.
	#[instrument(name = "bridge::trigger::invoke", level = "trace", skip_all, fields(procedure = %descriptor.id()))]
	pub(crate) fn invoke_trigger(
		&self,
		descriptor: &Descriptor,
		trigger: TriggerData,
		call: &mut FunctionCall,
	) -> Result<Datum> {
		let routine = descriptor
			.routine()
			.ok_or_else(|| Error::internal(format!("trigger {} resolved to a UDT function", descriptor.id())))?;

		let Some(data) = self.guest.create_trigger_data(trigger)? else {
			return Ok(Datum::ZERO);
		};

		let result = self.run_trigger(routine, data, call);
		self.guest.delete_local_ref(data);
		result
	}

	fn run_trigger(&self, routine: &Routine, data: ObjectRef, call: &mut FunctionCall) -> Result<Datum> {
		let _claim = self.begin_call(ParamCounts::new(1, 0))?;
		self.area.borrow_mut().set_reference(0, Some(data))?;

		self.guest.invoke(routine.target())?;
		call.is_null = false;

		if self.guest.exception_pending() {
			return Ok(Datum::ZERO);
		}

		// the guest may not have connected itself
		self.host.assert_connect()?;
		let tuple = {
			let _upper = UpperContext::enter(self.host.as_ref());
			self.guest.trigger_return_tuple(data)?
		};

		call.is_null = false;
		Ok(tuple.unwrap_or(Datum::ZERO))
	}
}
