// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Identities and values crossing the bridge.

use std::{
	fmt::{self, Display, Formatter},
	num::NonZeroU64,
};

use callbridge_abi::{LoaderKeyFFI, NULL_OBJECT};

macro_rules! object_id {
	($(#[$meta:meta])* $name:ident) => {
		$(#[$meta])*
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
		pub struct $name(pub u32);

		impl Display for $name {
			fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
				Display::fmt(&self.0, f)
			}
		}

		impl From<u32> for $name {
			fn from(value: u32) -> Self {
				Self(value)
			}
		}
	};
}

object_id!(
	/// Stable host identity of a procedure
	ProcedureId
);
object_id!(
	/// Host identity of a value type
	TypeId
);
object_id!(NamespaceId);
object_id!(LanguageId);

impl TypeId {
	/// No type; used when a replacement type is built for the return value
	pub const INVALID: TypeId = TypeId(0);

	pub fn is_valid(&self) -> bool {
		self.0 != 0
	}
}

/// Host-native value word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Datum(pub u64);

impl Datum {
	pub const ZERO: Datum = Datum(0);
}

/// Handle of a guest-runtime object; null handles are `Option::None`
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef(NonZeroU64);

impl ObjectRef {
	pub fn new(raw: u64) -> Option<Self> {
		NonZeroU64::new(raw).map(Self)
	}

	pub fn raw(self) -> u64 {
		self.0.get()
	}

	pub fn into_raw(handle: Option<ObjectRef>) -> u64 {
		handle.map_or(NULL_OBJECT, ObjectRef::raw)
	}
}

impl Display for ObjectRef {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "@{:x}", self.0)
	}
}

/// One primitive slot of the marshaling area (the width of the largest guest
/// primitive)
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Slot(pub u64);

impl Slot {
	pub const ZERO: Slot = Slot(0);

	pub fn from_bool(v: bool) -> Self {
		Slot(v as u64)
	}

	pub fn from_i8(v: i8) -> Self {
		Slot(v as u8 as u64)
	}

	pub fn from_i16(v: i16) -> Self {
		Slot(v as u16 as u64)
	}

	pub fn from_char(v: u16) -> Self {
		Slot(v as u64)
	}

	pub fn from_i32(v: i32) -> Self {
		Slot(v as u32 as u64)
	}

	pub fn from_i64(v: i64) -> Self {
		Slot(v as u64)
	}

	pub fn from_f32(v: f32) -> Self {
		Slot(v.to_bits() as u64)
	}

	pub fn from_f64(v: f64) -> Self {
		Slot(v.to_bits())
	}

	pub fn as_bool(self) -> bool {
		self.0 as u8 != 0
	}

	pub fn as_i8(self) -> i8 {
		self.0 as u8 as i8
	}

	pub fn as_i16(self) -> i16 {
		self.0 as u16 as i16
	}

	pub fn as_char(self) -> u16 {
		self.0 as u16
	}

	pub fn as_i32(self) -> i32 {
		self.0 as u32 as i32
	}

	pub fn as_i64(self) -> i64 {
		self.0 as i64
	}

	pub fn as_f32(self) -> f32 {
		f32::from_bits(self.0 as u32)
	}

	pub fn as_f64(self) -> f64 {
		f64::from_bits(self.0)
	}
}

/// Primitive representations of the guest runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
	Boolean,
	Byte,
	Short,
	Char,
	Int,
	Long,
	Float,
	Double,
}

/// A host value coerced to its guest representation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestValue {
	Primitive(Slot),
	Reference(Option<ObjectRef>),
}

/// Generation-checked, non-owning key of a guest class loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoaderKey {
	pub index: u32,
	pub generation: u32,
}

impl From<LoaderKeyFFI> for LoaderKey {
	fn from(key: LoaderKeyFFI) -> Self {
		Self {
			index: key.index,
			generation: key.generation,
		}
	}
}

impl From<LoaderKey> for LoaderKeyFFI {
	fn from(key: LoaderKey) -> Self {
		Self {
			index: key.index,
			generation: key.generation,
		}
	}
}

/// Host memory arena identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryContextId(pub u64);

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_slot_sign_round_trip() {
		assert_eq!(Slot::from_i32(-5).as_i32(), -5);
		assert_eq!(Slot::from_i32(-5).0, 0xffff_fffb);
		assert_eq!(Slot::from_i16(-1).as_i16(), -1);
		assert_eq!(Slot::from_f64(1.5).as_f64(), 1.5);
	}

	#[test]
	fn test_null_object_is_none() {
		assert_eq!(ObjectRef::new(0), None);
		assert_eq!(ObjectRef::into_raw(None), 0);
		assert_eq!(ObjectRef::new(7).map(ObjectRef::raw), Some(7));
	}
}
