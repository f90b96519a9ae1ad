// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Contract of the type-coercion engine.
//!
//! The engine mapping host value types to guest representations lives outside
//! the bridge; the bridge only decides when coercion happens.

use std::rc::Rc;

use crate::{
	bridge::Bridge,
	error::{Error, Result},
	value::{Datum, GuestValue, ObjectRef, Slot, TypeId},
};

/// One resolved host/guest type pairing
pub trait Type {
	fn type_id(&self) -> TypeId;

	/// Name of the guest type values are passed as
	fn guest_type_name(&self) -> &str;

	/// True for guest primitives and for arrays of them
	fn is_primitive(&self) -> bool;

	/// Element type if this is an array type
	fn element_type(&self) -> Option<Rc<dyn Type>>;

	/// True for polymorphic types that must be resolved per call
	fn is_dynamic(&self) -> bool {
		false
	}

	/// Resolve a dynamic type against the actual type of a call
	fn real_type(&self, actual: TypeId, type_map: Option<ObjectRef>) -> Result<Rc<dyn Type>> {
		let _ = (actual, type_map);
		Err(Error::internal(format!("type {} is not dynamic", self.guest_type_name())))
	}

	fn is_void(&self) -> bool {
		false
	}

	/// True if results are written by the callee into a writer object passed
	/// as an extra trailing reference parameter
	fn is_out_parameter(&self) -> bool {
		false
	}

	/// True if values of this type can be used where `other` is expected
	fn can_replace(&self, other: &dyn Type) -> bool;

	/// Convert a host value to its guest representation. Coercion may call
	/// back into the bridge (UDT conversions invoking nested procedures).
	fn coerce_datum(&self, bridge: &Bridge, datum: Datum) -> Result<GuestValue>;

	/// Convert a guest object back to a host value
	fn coerce_object(&self, object: ObjectRef) -> Result<Datum>;

	/// Convert a primitive return slot to a host value
	fn datum_from_slot(&self, slot: Slot) -> Result<Datum> {
		let _ = slot;
		Err(Error::internal(format!("type {} has no primitive representation", self.guest_type_name())))
	}

	/// Create the writer object an out-parameter callee fills
	fn create_out_parameter(&self) -> Result<ObjectRef> {
		Err(Error::internal(format!("type {} is not an out parameter", self.guest_type_name())))
	}

	/// Read the result back from a filled writer; `None` for a null result
	fn take_out_parameter(&self, writer: ObjectRef) -> Result<Option<Datum>> {
		let _ = writer;
		Err(Error::internal(format!("type {} is not an out parameter", self.guest_type_name())))
	}
}

/// True if values of `ty` travel through a primitive slot
///
/// Arrays of primitives report `is_primitive` but are guest objects.
pub fn pass_as_primitive(ty: &dyn Type) -> bool {
	ty.is_primitive() && ty.element_type().is_none()
}

/// Type lookup and adapter construction of the coercion engine
pub trait TypeSystem {
	/// Type for a host type id, using the procedure's type map for
	/// guest-specific mappings
	fn from_type_id(&self, id: TypeId, type_map: Option<ObjectRef>) -> Result<Rc<dyn Type>>;

	/// Type for a host type id passed as an explicitly named guest type
	fn from_guest_type(&self, id: TypeId, guest_type: &str) -> Result<Rc<dyn Type>>;

	/// Adapter feeding `original` values into `replacement`; fails with
	/// [`Error::TypeIncompatible`] if none applies
	fn coerce_in(&self, replacement: Rc<dyn Type>, original: Rc<dyn Type>) -> Result<Rc<dyn Type>>;

	/// Adapter producing `original` values from `replacement` results
	fn coerce_out(&self, replacement: Rc<dyn Type>, original: Rc<dyn Type>) -> Result<Rc<dyn Type>>;

	/// Coercion type of the UDT implemented by `class`
	fn udt_type(&self, type_id: TypeId, type_name: &str, class: ObjectRef) -> Result<Rc<dyn Type>>;

	/// External text of a host value (UDT input argument)
	fn text_of(&self, datum: Datum) -> Result<String>;

	/// Host value holding text (UDT output result)
	fn text_datum(&self, text: &str) -> Result<Datum>;

	/// Binary form of a host value (UDT receive argument)
	fn bytes_of(&self, datum: Datum) -> Result<Vec<u8>>;

	/// Host value holding bytes (UDT send result)
	fn bytes_datum(&self, bytes: &[u8]) -> Result<Datum>;
}
