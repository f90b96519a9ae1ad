// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Writing call arguments into the shared marshaling area.

use tracing::{debug, error};

use crate::{
	area::ParamCounts,
	bridge::Bridge,
	call::FunctionCall,
	descriptor::Routine,
	error::{Error, Result},
	types::pass_as_primitive,
	value::{GuestValue, Slot},
};

impl Bridge {
	/// Claim the area for a call with `counts`
	///
	/// If another call's arguments are still in flight this call is reentrant:
	/// the area is saved into the innermost invocation frame, to be restored
	/// when that frame is popped. Otherwise the returned claim marks the area
	/// idle again when dropped, whether or not the guest consumed the arguments.
	pub(crate) fn begin_call(&self, counts: ParamCounts) -> Result<AreaClaim<'_>> {
		let saved = {
			let area = self.area.borrow();
			area.in_flight().then(|| area.snapshot())
		};
		let reentrant = saved.is_some();

		if let Some(saved) = saved {
			if !self.invocations.borrow_mut().save_area(saved) {
				return Err(Error::internal("reentrant call outside of an invocation frame"));
			}
			self.guest.push_frame();
			debug!(depth = self.invocation_depth(), "saved marshaling area");
		}

		self.area.borrow_mut().begin(counts);
		Ok(AreaClaim {
			bridge: self,
			reentrant,
		})
	}

	/// Fail unless `call` passes exactly the declared number of arguments
	pub(crate) fn check_arguments(&self, routine: &Routine, call: &FunctionCall) -> Result<()> {
		if call.args.len() != routine.param_count() {
			return Err(Error::ArgumentCountMismatch {
				passed: call.args.len(),
				declared: routine.param_count(),
			});
		}
		Ok(())
	}

	/// Coerce and write every argument of `call`
	///
	/// Primitive and reference slots are filled independently, each in
	/// declaration order. A null primitive is written as zero; a null
	/// reference only advances the reference index.
	pub(crate) fn marshal_parameters(&self, routine: &Routine, call: &FunctionCall) -> Result<()> {
		let mut primitive_index = 0;
		let mut reference_index = 0;

		for (position, (arg, declared)) in call.args.iter().zip(routine.param_types.iter()).enumerate() {
			let primitive = pass_as_primitive(declared.as_ref());

			if arg.is_null {
				if primitive {
					self.area.borrow_mut().set_primitive(primitive_index, Slot::ZERO)?;
					primitive_index += 1;
				} else {
					reference_index += 1;
				}
				continue;
			}

			let resolved;
			let ty = if declared.is_dynamic() {
				resolved = declared.real_type(arg.actual_type, routine.type_map())?;
				&resolved
			} else {
				declared
			};

			match (primitive, ty.coerce_datum(self, arg.datum)?) {
				(true, GuestValue::Primitive(slot)) => {
					self.area.borrow_mut().set_primitive(primitive_index, slot)?;
					primitive_index += 1;
				}
				(false, GuestValue::Reference(object)) => {
					self.area.borrow_mut().set_reference(reference_index, object)?;
					reference_index += 1;
				}
				_ => {
					return Err(Error::internal(format!(
						"parameter {position} of type {} coerced to the wrong value class",
						ty.guest_type_name()
					)));
				}
			}
		}

		Ok(())
	}
}

/// The area held by one call
///
/// A reentrant claim leaves restoring to the invocation frame holding the
/// saved area.
pub(crate) struct AreaClaim<'a> {
	bridge: &'a Bridge,
	reentrant: bool,
}

impl Drop for AreaClaim<'_> {
	fn drop(&mut self) {
		if self.reentrant {
			return;
		}
		match self.bridge.area.try_borrow_mut() {
			Ok(mut area) => area.release(),
			Err(_) => error!("marshaling area busy, left in flight"),
		}
	}
}
