// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Shared marshaling area.
//!
//! One primitive-slot array and one reference-slot array, allocated once and
//! reused for every call. The header packs the reference and primitive counts
//! of the call whose arguments are in flight; zero means nothing is in flight.
//! A guest consumes the arguments with [`MarshalArea::take_arguments`], which
//! clears the header and the consumed reference slots.

use std::{cell::RefCell, rc::Rc};

use callbridge_abi::{ParameterAreaFFI, pack_param_counts, unpack_param_counts};

use crate::{
	error::{Error, Result},
	value::{ObjectRef, Slot},
};

/// The area as shared between the bridge and the guest runtime
pub type ParameterArea = Rc<RefCell<MarshalArea>>;

/// Reference and primitive parameter counts of one call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParamCounts {
	pub references: u8,
	pub primitives: u8,
}

impl ParamCounts {
	pub fn new(references: u8, primitives: u8) -> Self {
		Self {
			references,
			primitives,
		}
	}

	pub fn pack(self) -> u16 {
		pack_param_counts(self.references, self.primitives)
	}

	pub fn unpack(header: u16) -> Self {
		let (references, primitives) = unpack_param_counts(header);
		Self::new(references, primitives)
	}
}

/// Arguments of one call, copied out of the area by the guest
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Arguments {
	pub primitives: Vec<Slot>,
	pub references: Vec<Option<ObjectRef>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarshalArea {
	header: u16,
	primitives: Box<[Slot]>,
	references: Box<[Option<ObjectRef>]>,
}

impl MarshalArea {
	/// Allocate an area for procedures of up to `max_parameters` parameters
	pub fn new(max_parameters: usize) -> Self {
		Self {
			header: 0,
			primitives: vec![Slot::ZERO; 1 + max_parameters].into_boxed_slice(),
			references: vec![None; max_parameters].into_boxed_slice(),
		}
	}

	pub fn header(&self) -> u16 {
		self.header
	}

	pub fn counts(&self) -> ParamCounts {
		ParamCounts::unpack(self.header)
	}

	/// True while a call's arguments are written but not yet consumed
	pub fn in_flight(&self) -> bool {
		self.header != 0
	}

	pub fn primitive(&self, index: usize) -> Option<Slot> {
		self.primitives.get(index).copied()
	}

	pub fn reference(&self, index: usize) -> Option<ObjectRef> {
		self.references.get(index).copied().flatten()
	}

	pub fn primitives(&self) -> &[Slot] {
		&self.primitives
	}

	pub fn references(&self) -> &[Option<ObjectRef>] {
		&self.references
	}

	/// Primitive return value of the last call
	pub fn return_slot(&self) -> Slot {
		self.primitives[0]
	}

	/// Store a primitive return value
	pub fn set_return(&mut self, value: Slot) {
		self.primitives[0] = value;
	}

	/// Copy out the in-flight arguments and mark the area free
	pub fn take_arguments(&mut self) -> Arguments {
		let counts = self.counts();
		let primitives = self.primitives[..counts.primitives as usize].to_vec();
		let references = self.references[..counts.references as usize].iter_mut().map(Option::take).collect();
		self.header = 0;
		Arguments {
			primitives,
			references,
		}
	}

	pub(crate) fn begin(&mut self, counts: ParamCounts) {
		self.header = counts.pack();
	}

	/// Mark the area idle, dropping arguments no guest consumed
	pub(crate) fn release(&mut self) {
		let references = self.counts().references as usize;
		self.references[..references].fill(None);
		self.header = 0;
	}

	pub(crate) fn set_primitive(&mut self, index: usize, value: Slot) -> Result<()> {
		let slot = self.primitives.get_mut(index).ok_or(Error::SlotOutOfRange {
			area: "primitive",
			index,
		})?;
		*slot = value;
		Ok(())
	}

	pub(crate) fn set_reference(&mut self, index: usize, value: Option<ObjectRef>) -> Result<()> {
		let slot = self.references.get_mut(index).ok_or(Error::SlotOutOfRange {
			area: "reference",
			index,
		})?;
		*slot = value;
		Ok(())
	}

	pub(crate) fn snapshot(&self) -> Box<MarshalArea> {
		Box::new(self.clone())
	}

	pub(crate) fn restore(&mut self, saved: Box<MarshalArea>) {
		self.header = saved.header;
		self.primitives.copy_from_slice(&saved.primitives);
		self.references.copy_from_slice(&saved.references);
	}

	/// Raw view for a guest behind the C ABI
	///
	/// The pointers stay valid as long as the area is alive: the slot arrays
	/// are allocated once and never reallocated, and `restore` copies into them.
	pub(crate) fn as_ffi(&mut self) -> ParameterAreaFFI {
		ParameterAreaFFI {
			header: &mut self.header,
			primitives: self.primitives.as_mut_ptr() as *mut u64,
			primitive_count: self.primitives.len(),
			references: self.references.as_mut_ptr() as *mut u64,
			reference_count: self.references.len(),
		}
	}
}
