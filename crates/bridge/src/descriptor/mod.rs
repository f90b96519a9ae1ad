// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Resolved, cached representation of one callable procedure or UDT operation.

use std::{
	fmt::{self, Debug, Formatter},
	rc::Rc,
};

use smallvec::SmallVec;

mod placeholder;
mod store;

pub use placeholder::DescriptorToken;
pub(crate) use placeholder::{Draft, DraftPayload, Placeholder, Placeholders, RoutineDraft};
pub use store::{DescriptorStore, Reconciled, RoutineSpec, StoredSignature, UdtSpec};

use crate::{
	area::ParamCounts,
	guest::GlobalRef,
	types::Type,
	udt::{Udt, UdtFunction},
	value::{LoaderKey, ObjectRef, ProcedureId},
};

/// Parameter types of a routine; most procedures take few parameters
pub(crate) type ParamTypes = SmallVec<[Rc<dyn Type>; 8]>;

pub struct Descriptor {
	pub(crate) id: ProcedureId,
	pub(crate) read_only: bool,
	pub(crate) class: GlobalRef,
	pub(crate) schema_loader: Option<LoaderKey>,
	pub(crate) kind: DescriptorKind,
}

pub enum DescriptorKind {
	Routine(Routine),
	Udt(UdtBinding),
}

impl Descriptor {
	pub fn id(&self) -> ProcedureId {
		self.id
	}

	pub fn is_read_only(&self) -> bool {
		self.read_only
	}

	pub fn class(&self) -> ObjectRef {
		self.class.handle()
	}

	pub fn schema_loader(&self) -> Option<LoaderKey> {
		self.schema_loader
	}

	pub fn kind(&self) -> &DescriptorKind {
		&self.kind
	}

	pub fn is_udt(&self) -> bool {
		matches!(self.kind, DescriptorKind::Udt(_))
	}

	pub fn routine(&self) -> Option<&Routine> {
		match &self.kind {
			DescriptorKind::Routine(routine) => Some(routine),
			DescriptorKind::Udt(_) => None,
		}
	}
}

impl Debug for Descriptor {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let kind = match &self.kind {
			DescriptorKind::Routine(_) => "routine",
			DescriptorKind::Udt(_) => "udt",
		};
		f.debug_struct("Descriptor")
			.field("id", &self.id)
			.field("kind", &kind)
			.field("read_only", &self.read_only)
			.field("class", &self.class)
			.finish()
	}
}

/// Payload of an ordinary procedure
pub struct Routine {
	pub(crate) multi_call: bool,
	pub(crate) param_types: ParamTypes,
	pub(crate) return_type: Rc<dyn Type>,
	pub(crate) type_map: Option<GlobalRef>,
	pub(crate) target: GlobalRef,
	pub(crate) num_ref_params: u16,
	pub(crate) num_prim_params: u16,
	/// Results come back through a writer in one extra trailing reference slot
	pub(crate) out_parameter: bool,
}

impl Routine {
	pub fn is_multi_call(&self) -> bool {
		self.multi_call
	}

	pub fn param_count(&self) -> usize {
		self.param_types.len()
	}

	pub fn param_type(&self, index: usize) -> Option<&Rc<dyn Type>> {
		self.param_types.get(index)
	}

	pub fn return_type(&self) -> &Rc<dyn Type> {
		&self.return_type
	}

	pub fn type_map(&self) -> Option<ObjectRef> {
		self.type_map.as_ref().map(GlobalRef::handle)
	}

	pub fn target(&self) -> ObjectRef {
		self.target.handle()
	}

	pub fn num_ref_params(&self) -> u16 {
		self.num_ref_params
	}

	pub fn num_prim_params(&self) -> u16 {
		self.num_prim_params
	}

	pub fn has_out_parameter(&self) -> bool {
		self.out_parameter
	}

	/// Reference slots a call occupies, including the out-parameter writer
	pub fn reference_slots(&self) -> u16 {
		self.num_ref_params + u16::from(self.out_parameter)
	}

	/// Header value of a call to this routine
	pub fn counts(&self) -> ParamCounts {
		ParamCounts::new(self.reference_slots() as u8, self.num_prim_params as u8)
	}
}

/// Payload of a UDT I/O function
pub struct UdtBinding {
	pub(crate) udt: Rc<Udt>,
	pub(crate) function: UdtFunction,
}

impl UdtBinding {
	pub fn udt(&self) -> &Rc<Udt> {
		&self.udt
	}

	pub fn function(&self) -> UdtFunction {
		self.function
	}
}
