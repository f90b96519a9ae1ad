// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Callbacks the guest runtime uses to populate a placeholder during
//! [`GuestRuntime::create`](crate::GuestRuntime::create).

use std::mem;

use callbridge_abi::{RECONCILE_RETURN, RECONCILE_RETURN_OUT};
use tracing::{debug, instrument};

use super::{Draft, DraftPayload, ParamTypes, RoutineDraft, UdtBinding, placeholder::DescriptorToken};
use crate::{
	bridge::Bridge,
	error::{Error, Result},
	guest::GlobalRef,
	types::pass_as_primitive,
	udt::UdtFunction,
	value::{LoaderKey, ObjectRef, TypeId},
};

/// Signature of an ordinary procedure as resolved by the guest
#[derive(Debug, Clone, Copy)]
pub struct RoutineSpec<'a> {
	pub schema_loader: Option<LoaderKey>,
	pub class: ObjectRef,
	pub read_only: bool,
	pub multi_call: bool,
	pub type_map: Option<ObjectRef>,
	pub return_type: TypeId,
	/// Explicit guest type of the result, if declared
	pub return_guest_type: Option<&'a str>,
	pub param_types: &'a [TypeId],
	/// Explicit guest types of the parameters, if any were declared
	pub param_guest_types: Option<&'a [Option<&'a str>]>,
}

/// What the guest needs to bind its method handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSignature {
	/// Guest type name per parameter, return type last
	pub guest_types: Vec<String>,
	/// True if the return type is written through a writer object
	pub return_is_out_parameter: bool,
}

/// A UDT I/O function as resolved by the guest
#[derive(Debug, Clone, Copy)]
pub struct UdtSpec {
	pub schema_loader: Option<LoaderKey>,
	pub class: ObjectRef,
	pub read_only: bool,
	/// One of `i`, `o`, `r`, `s`
	pub function: u8,
	pub type_id: TypeId,
	pub parse: Option<ObjectRef>,
	pub read: Option<ObjectRef>,
}

/// Outcome of a type reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
	/// Position in the resolved type list; the return type is last
	pub position: usize,
	pub guest_type: String,
}

pub trait DescriptorStore {
	/// Populate the placeholder as an ordinary procedure
	fn store_to_non_udt(&self, token: DescriptorToken, spec: &RoutineSpec<'_>) -> Result<StoredSignature>;

	/// Populate the placeholder as a UDT I/O function
	///
	/// Leaves it untouched if the type is still a shell.
	fn store_to_udt(&self, token: DescriptorToken, spec: &UdtSpec) -> Result<()>;

	/// Replace an inferred parameter or return type by an explicit one
	///
	/// `index` is a parameter position, [`RECONCILE_RETURN`] for the return
	/// type coerced like a parameter or [`RECONCILE_RETURN_OUT`] for the
	/// return type coerced as output with the explicit name at position 0.
	fn reconcile_types(
		&self,
		token: DescriptorToken,
		explicit: &[&str],
		resolved_len: usize,
		index: i32,
	) -> Result<Reconciled>;
}

impl DescriptorStore for Bridge {
	#[instrument(name = "bridge::descriptor::store_to_non_udt", level = "trace", skip(self, spec), fields(token = %token))]
	fn store_to_non_udt(&self, token: DescriptorToken, spec: &RoutineSpec<'_>) -> Result<StoredSignature> {
		let count = spec.param_types.len();
		let max = self.config.max_parameters;
		if count > max {
			return Err(Error::TooManyParameters {
				count,
				max,
			});
		}

		let return_type = match spec.return_guest_type {
			Some(name) => self.types.from_guest_type(spec.return_type, name)?,
			None => self.types.from_type_id(spec.return_type, spec.type_map)?,
		};

		let mut param_types = ParamTypes::with_capacity(count);
		for (i, &id) in spec.param_types.iter().enumerate() {
			let explicit = spec.param_guest_types.and_then(|names| names.get(i).copied().flatten());
			param_types.push(match explicit {
				Some(name) => self.types.from_guest_type(id, name)?,
				None => self.types.from_type_id(id, spec.type_map)?,
			});
		}

		let num_prim_params = param_types.iter().filter(|ty| pass_as_primitive(ty.as_ref())).count();
		let num_ref_params = count - num_prim_params;
		let return_is_out_parameter = return_type.is_out_parameter();
		let out_parameter = return_is_out_parameter && !spec.multi_call;

		if num_ref_params + usize::from(out_parameter) > max {
			return Err(Error::TooManyParameters {
				count: count + 1,
				max,
			});
		}

		let guest_types = param_types
			.iter()
			.chain(std::iter::once(&return_type))
			.map(|ty| ty.guest_type_name().to_string())
			.collect();

		let stored = Draft {
			read_only: spec.read_only,
			class: Some(GlobalRef::new(&self.guest, spec.class)),
			schema_loader: spec.schema_loader,
			payload: Some(DraftPayload::Routine(RoutineDraft {
				multi_call: spec.multi_call,
				param_types,
				return_type,
				type_map: spec.type_map.map(|map| GlobalRef::new(&self.guest, map)),
				num_ref_params: num_ref_params as u16,
				num_prim_params: num_prim_params as u16,
				out_parameter,
			})),
		};

		let replaced = {
			let mut placeholders = self.placeholders.borrow_mut();
			mem::replace(placeholders.draft_mut(token)?, stored)
		};
		drop(replaced);

		debug!(num_ref_params, num_prim_params, out_parameter, "stored routine signature");
		Ok(StoredSignature {
			guest_types,
			return_is_out_parameter,
		})
	}

	#[instrument(name = "bridge::descriptor::store_to_udt", level = "trace", skip(self, spec), fields(token = %token, type_id = %spec.type_id))]
	fn store_to_udt(&self, token: DescriptorToken, spec: &UdtSpec) -> Result<()> {
		let def = self.catalog.get_type(spec.type_id)?;
		if !def.is_defined {
			debug!(type_name = %def.name, "type is a shell, leaving descriptor incomplete");
			return Ok(());
		}

		let function = UdtFunction::from_tag(spec.function)?;
		let udt = self.register_udt(spec.class, spec.type_id, &def.name, spec.parse, spec.read)?;

		let stored = Draft {
			read_only: spec.read_only,
			class: Some(GlobalRef::new(&self.guest, spec.class)),
			schema_loader: spec.schema_loader,
			payload: Some(DraftPayload::Udt(UdtBinding {
				udt,
				function,
			})),
		};

		let replaced = {
			let mut placeholders = self.placeholders.borrow_mut();
			mem::replace(placeholders.draft_mut(token)?, stored)
		};
		drop(replaced);
		Ok(())
	}

	#[instrument(name = "bridge::descriptor::reconcile_types", level = "trace", skip(self, explicit), fields(token = %token))]
	fn reconcile_types(
		&self,
		token: DescriptorToken,
		explicit: &[&str],
		resolved_len: usize,
		index: i32,
	) -> Result<Reconciled> {
		let on_return = index == RECONCILE_RETURN || index == RECONCILE_RETURN_OUT;
		let coerce_out = index == RECONCILE_RETURN_OUT;

		let (original, type_id, position) = {
			let mut placeholders = self.placeholders.borrow_mut();
			let routine = placeholders
				.draft_mut(token)?
				.routine_mut()
				.ok_or_else(|| Error::internal(format!("reconcile on {token} before its signature was stored")))?;

			if on_return {
				let position = resolved_len.checked_sub(1).ok_or(Error::UnsupportedParameterIndex(index))?;
				(routine.return_type.clone(), TypeId::INVALID, position)
			} else {
				let position = usize::try_from(index).map_err(|_| Error::UnsupportedParameterIndex(index))?;
				let ty = routine.param_types.get(position).cloned().ok_or(Error::UnsupportedParameterIndex(index))?;
				let type_id = ty.type_id();
				(ty, type_id, position)
			}
		};

		let name = *explicit.get(if coerce_out { 0 } else { position }).ok_or(Error::UnsupportedParameterIndex(index))?;

		let mut replacement = self.types.from_guest_type(type_id, name)?;
		if !replacement.can_replace(original.as_ref()) {
			replacement = if coerce_out {
				self.types.coerce_out(replacement, original.clone())?
			} else {
				self.types.coerce_in(replacement, original.clone())?
			};
		}

		let replaced = {
			let mut placeholders = self.placeholders.borrow_mut();
			let routine = placeholders
				.draft_mut(token)?
				.routine_mut()
				.ok_or_else(|| Error::internal(format!("descriptor {token} changed kind during reconcile")))?;

			if on_return {
				mem::replace(&mut routine.return_type, replacement)
			} else {
				let was_primitive = pass_as_primitive(original.as_ref());
				let is_primitive = pass_as_primitive(replacement.as_ref());
				if was_primitive != is_primitive {
					if is_primitive {
						routine.num_ref_params -= 1;
						routine.num_prim_params += 1;
					} else {
						routine.num_ref_params += 1;
						routine.num_prim_params -= 1;
					}
				}
				mem::replace(&mut routine.param_types[position], replacement)
			}
		};
		drop(replaced);

		debug!(position, guest_type = name, "reconciled type");
		Ok(Reconciled {
			position,
			guest_type: name.to_string(),
		})
	}
}
