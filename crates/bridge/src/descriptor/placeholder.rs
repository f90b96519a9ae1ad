// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Arena of descriptors under construction.
//!
//! The guest runtime populates a placeholder through callbacks carrying its
//! token. Tokens are generation checked, so a token kept past the release of
//! its slot resolves to nothing instead of to a later placeholder.

use std::{
	cell::RefCell,
	fmt::{self, Display, Formatter},
	rc::Rc,
};

use tracing::{error, trace};

use super::{Descriptor, DescriptorKind, ParamTypes, Routine, UdtBinding};
use crate::{
	error::{Error, Result},
	guest::{GlobalRef, GuestRuntime},
	types::Type,
	value::{LoaderKey, ObjectRef, ProcedureId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorToken {
	index: u32,
	generation: u32,
}

impl DescriptorToken {
	pub fn to_raw(self) -> u64 {
		(u64::from(self.generation) << 32) | u64::from(self.index)
	}

	pub fn from_raw(raw: u64) -> Self {
		Self {
			index: raw as u32,
			generation: (raw >> 32) as u32,
		}
	}
}

impl Display for DescriptorToken {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "{:#x}", self.to_raw())
	}
}

/// Routine payload stored before the call target is known
pub(crate) struct RoutineDraft {
	pub(crate) multi_call: bool,
	pub(crate) param_types: ParamTypes,
	pub(crate) return_type: Rc<dyn Type>,
	pub(crate) type_map: Option<GlobalRef>,
	pub(crate) num_ref_params: u16,
	pub(crate) num_prim_params: u16,
	pub(crate) out_parameter: bool,
}

impl RoutineDraft {
	fn finish(self, target: GlobalRef) -> Routine {
		Routine {
			multi_call: self.multi_call,
			param_types: self.param_types,
			return_type: self.return_type,
			type_map: self.type_map,
			target,
			num_ref_params: self.num_ref_params,
			num_prim_params: self.num_prim_params,
			out_parameter: self.out_parameter,
		}
	}
}

pub(crate) enum DraftPayload {
	Routine(RoutineDraft),
	Udt(UdtBinding),
}

/// A zeroed descriptor; every field starts absent
#[derive(Default)]
pub(crate) struct Draft {
	pub(crate) read_only: bool,
	pub(crate) class: Option<GlobalRef>,
	pub(crate) schema_loader: Option<LoaderKey>,
	pub(crate) payload: Option<DraftPayload>,
}

impl Draft {
	pub(crate) fn routine_mut(&mut self) -> Option<&mut RoutineDraft> {
		match &mut self.payload {
			Some(DraftPayload::Routine(routine)) => Some(routine),
			_ => None,
		}
	}

	/// Turn the draft into a descriptor given the target `create` returned
	///
	/// `Ok(None)` means construction is incomplete.
	pub(crate) fn complete(
		self,
		id: ProcedureId,
		target: Option<ObjectRef>,
		guest: &Rc<dyn GuestRuntime>,
	) -> Result<Option<Descriptor>> {
		let Draft {
			read_only,
			class,
			schema_loader,
			payload,
		} = self;

		let kind = match (target, payload) {
			(Some(target), Some(DraftPayload::Routine(routine))) => {
				DescriptorKind::Routine(routine.finish(GlobalRef::new(guest, target)))
			}
			(Some(_), _) => {
				return Err(Error::internal(format!(
					"guest returned a call target for {id} without storing its signature"
				)));
			}
			(None, Some(DraftPayload::Udt(binding))) => DescriptorKind::Udt(binding),
			(None, _) => return Ok(None),
		};

		let class = class.ok_or_else(|| Error::internal(format!("descriptor for {id} has no class")))?;

		Ok(Some(Descriptor {
			id,
			read_only,
			class,
			schema_loader,
			kind,
		}))
	}
}

struct Entry {
	generation: u32,
	draft: Option<Draft>,
}

#[derive(Default)]
pub(crate) struct Placeholders {
	entries: Vec<Entry>,
	free: Vec<u32>,
}

impl Placeholders {
	pub(crate) fn allocate(&mut self) -> DescriptorToken {
		if let Some(index) = self.free.pop() {
			let entry = &mut self.entries[index as usize];
			entry.draft = Some(Draft::default());
			return DescriptorToken {
				index,
				generation: entry.generation,
			};
		}

		let index = self.entries.len() as u32;
		self.entries.push(Entry {
			generation: 0,
			draft: Some(Draft::default()),
		});
		DescriptorToken {
			index,
			generation: 0,
		}
	}

	pub(crate) fn draft_mut(&mut self, token: DescriptorToken) -> Result<&mut Draft> {
		self.entries
			.get_mut(token.index as usize)
			.filter(|entry| entry.generation == token.generation)
			.and_then(|entry| entry.draft.as_mut())
			.ok_or(Error::UnknownPlaceholder(token.to_raw()))
	}

	pub(crate) fn release(&mut self, token: DescriptorToken) -> Option<Draft> {
		let entry = self.entries.get_mut(token.index as usize)?;
		if entry.generation != token.generation {
			return None;
		}
		let draft = entry.draft.take()?;
		entry.generation = entry.generation.wrapping_add(1);
		self.free.push(token.index);
		Some(draft)
	}

	/// Number of placeholders not yet released
	pub(crate) fn live(&self) -> usize {
		self.entries.iter().filter(|entry| entry.draft.is_some()).count()
	}
}

/// A placeholder that is released when dropped unless taken
pub(crate) struct Placeholder<'a> {
	table: &'a RefCell<Placeholders>,
	token: DescriptorToken,
	taken: bool,
}

impl<'a> Placeholder<'a> {
	pub(crate) fn allocate(table: &'a RefCell<Placeholders>) -> Self {
		let token = table.borrow_mut().allocate();
		trace!(%token, "placeholder allocated");
		Self {
			table,
			token,
			taken: false,
		}
	}

	pub(crate) fn token(&self) -> DescriptorToken {
		self.token
	}

	/// Release the slot and hand out what the guest stored in it
	pub(crate) fn take(mut self) -> Result<Draft> {
		self.taken = true;
		self.table.borrow_mut().release(self.token).ok_or(Error::UnknownPlaceholder(self.token.to_raw()))
	}
}

impl Drop for Placeholder<'_> {
	fn drop(&mut self) {
		if self.taken {
			return;
		}
		let draft = match self.table.try_borrow_mut() {
			Ok(mut table) => table.release(self.token),
			Err(_) => {
				error!(token = %self.token, "placeholder table busy, leaking placeholder");
				return;
			}
		};
		trace!(token = %self.token, "placeholder released");
		// references held by the draft are deleted after the table borrow ends
		drop(draft);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_token_raw_round_trip() {
		let token = DescriptorToken {
			index: 7,
			generation: 3,
		};
		assert_eq!(DescriptorToken::from_raw(token.to_raw()), token);
		assert_eq!(token.to_raw(), (3 << 32) | 7);
	}

	#[test]
	fn test_released_token_is_stale() {
		let mut table = Placeholders::default();
		let token = table.allocate();
		assert!(table.draft_mut(token).is_ok());
		assert!(table.release(token).is_some());
		assert!(matches!(table.draft_mut(token), Err(Error::UnknownPlaceholder(_))));
		assert!(table.release(token).is_none());
	}

	#[test]
	fn test_slot_reuse_bumps_generation() {
		let mut table = Placeholders::default();
		let first = table.allocate();
		table.release(first);
		let second = table.allocate();
		assert_ne!(first, second);
		assert_eq!(first.to_raw() as u32, second.to_raw() as u32);
		assert!(table.draft_mut(first).is_err());
		assert!(table.draft_mut(second).is_ok());
	}

	#[test]
	fn test_guard_releases_on_drop() {
		let table = RefCell::new(Placeholders::default());
		{
			let placeholder = Placeholder::allocate(&table);
			assert_eq!(table.borrow().live(), 1);
			let _ = placeholder.token();
		}
		assert_eq!(table.borrow().live(), 0);
	}

	#[test]
	fn test_take_releases_slot() {
		let table = RefCell::new(Placeholders::default());
		let placeholder = Placeholder::allocate(&table);
		let token = placeholder.token();
		let draft = placeholder.take().unwrap();
		assert!(draft.payload.is_none());
		assert_eq!(table.borrow().live(), 0);
		assert!(table.borrow_mut().draft_mut(token).is_err());
	}
}
