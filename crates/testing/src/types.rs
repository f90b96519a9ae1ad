// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! A small type system over the mock heap.
//!
//! Scalars travel as raw bits: an `int4` datum holds its value in the low
//! bits. Text and byte datums index into stores kept by [`MockTypes`].

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use callbridge::{
	Bridge, Datum, Error, FunctionCall, GuestValue, MarshalArea, MetadataKind, ObjectRef, PrimitiveKind, ProcedureId,
	Result, Slot, TriggerData, Type, TypeId, TypeSystem,
};

use crate::heap::{Object, SharedHeap};

pub mod oid {
	use callbridge::TypeId;

	pub const BOOL: TypeId = TypeId(16);
	pub const BYTEA: TypeId = TypeId(17);
	pub const INT8: TypeId = TypeId(20);
	pub const INT4: TypeId = TypeId(23);
	pub const TEXT: TypeId = TypeId(25);
	pub const FLOAT8: TypeId = TypeId(701);
	pub const INT4_ARRAY: TypeId = TypeId(1007);
	pub const RECORD: TypeId = TypeId(2249);
	pub const ANY: TypeId = TypeId(2276);
	pub const VOID: TypeId = TypeId(2278);
}

fn object_value(heap: &SharedHeap, object: ObjectRef, ty: &str) -> Result<Datum> {
	heap.borrow().value(object).ok_or_else(|| Error::Guest(format!("object {object} is not a {ty}")))
}

struct Scalar {
	id: TypeId,
	name: &'static str,
	kind: PrimitiveKind,
}

impl Type for Scalar {
	fn type_id(&self) -> TypeId {
		self.id
	}

	fn guest_type_name(&self) -> &str {
		self.name
	}

	fn is_primitive(&self) -> bool {
		true
	}

	fn element_type(&self) -> Option<Rc<dyn Type>> {
		None
	}

	fn can_replace(&self, other: &dyn Type) -> bool {
		other.guest_type_name() == self.name
	}

	fn coerce_datum(&self, _bridge: &Bridge, datum: Datum) -> Result<GuestValue> {
		let slot = match self.kind {
			PrimitiveKind::Boolean => Slot::from_bool(datum.0 != 0),
			PrimitiveKind::Int => Slot::from_i32(datum.0 as i32),
			_ => Slot(datum.0),
		};
		Ok(GuestValue::Primitive(slot))
	}

	fn coerce_object(&self, object: ObjectRef) -> Result<Datum> {
		Err(Error::Guest(format!("{} is primitive, got object {object}", self.name)))
	}

	fn datum_from_slot(&self, slot: Slot) -> Result<Datum> {
		Ok(match self.kind {
			PrimitiveKind::Boolean => Datum(u64::from(slot.as_bool())),
			PrimitiveKind::Int => Datum(slot.as_i32() as u32 as u64),
			_ => Datum(slot.0),
		})
	}
}

/// Any value passed as a guest object
struct Boxed {
	id: TypeId,
	name: String,
	element: Option<Rc<dyn Type>>,
	heap: SharedHeap,
}

impl Type for Boxed {
	fn type_id(&self) -> TypeId {
		self.id
	}

	fn guest_type_name(&self) -> &str {
		&self.name
	}

	fn is_primitive(&self) -> bool {
		self.element.as_ref().is_some_and(|element| element.is_primitive())
	}

	fn element_type(&self) -> Option<Rc<dyn Type>> {
		self.element.clone()
	}

	fn can_replace(&self, other: &dyn Type) -> bool {
		other.guest_type_name() == self.name
	}

	fn coerce_datum(&self, _bridge: &Bridge, datum: Datum) -> Result<GuestValue> {
		Ok(GuestValue::Reference(Some(self.heap.borrow_mut().alloc(Object::Value(datum)))))
	}

	fn coerce_object(&self, object: ObjectRef) -> Result<Datum> {
		object_value(&self.heap, object, &self.name)
	}
}

/// Composite rows, written by the callee into a writer
struct Row {
	heap: SharedHeap,
}

impl Type for Row {
	fn type_id(&self) -> TypeId {
		oid::RECORD
	}

	fn guest_type_name(&self) -> &str {
		"java.sql.ResultSet"
	}

	fn is_primitive(&self) -> bool {
		false
	}

	fn element_type(&self) -> Option<Rc<dyn Type>> {
		None
	}

	fn is_out_parameter(&self) -> bool {
		true
	}

	fn can_replace(&self, other: &dyn Type) -> bool {
		other.guest_type_name() == self.guest_type_name()
	}

	fn coerce_datum(&self, _bridge: &Bridge, datum: Datum) -> Result<GuestValue> {
		Ok(GuestValue::Reference(Some(self.heap.borrow_mut().alloc(Object::Value(datum)))))
	}

	fn coerce_object(&self, object: ObjectRef) -> Result<Datum> {
		object_value(&self.heap, object, "row")
	}

	fn create_out_parameter(&self) -> Result<ObjectRef> {
		Ok(self.heap.borrow_mut().alloc(Object::Writer(None)))
	}

	fn take_out_parameter(&self, writer: ObjectRef) -> Result<Option<Datum>> {
		match self.heap.borrow().get(writer) {
			Some(Object::Writer(row)) => Ok(*row),
			_ => Err(Error::Guest(format!("object {writer} is not a row writer"))),
		}
	}
}

struct Void;

impl Type for Void {
	fn type_id(&self) -> TypeId {
		oid::VOID
	}

	fn guest_type_name(&self) -> &str {
		"void"
	}

	fn is_primitive(&self) -> bool {
		false
	}

	fn element_type(&self) -> Option<Rc<dyn Type>> {
		None
	}

	fn is_void(&self) -> bool {
		true
	}

	fn can_replace(&self, other: &dyn Type) -> bool {
		other.is_void()
	}

	fn coerce_datum(&self, _bridge: &Bridge, _datum: Datum) -> Result<GuestValue> {
		Ok(GuestValue::Reference(None))
	}

	fn coerce_object(&self, _object: ObjectRef) -> Result<Datum> {
		Ok(Datum::ZERO)
	}
}

/// Polymorphic type resolved against the actual argument type
struct Any {
	heap: SharedHeap,
}

impl Type for Any {
	fn type_id(&self) -> TypeId {
		oid::ANY
	}

	fn guest_type_name(&self) -> &str {
		"java.lang.Object"
	}

	fn is_primitive(&self) -> bool {
		false
	}

	fn element_type(&self) -> Option<Rc<dyn Type>> {
		None
	}

	fn is_dynamic(&self) -> bool {
		true
	}

	fn real_type(&self, actual: TypeId, _type_map: Option<ObjectRef>) -> Result<Rc<dyn Type>> {
		let resolved = builtin(actual, &self.heap).ok_or(Error::not_found(MetadataKind::Type, actual.0))?;
		if resolved.is_primitive() && resolved.element_type().is_none() {
			// polymorphic parameters are objects; box the scalar
			return Ok(Rc::new(Boxed {
				id: actual,
				name: format!("boxed {}", resolved.guest_type_name()),
				element: None,
				heap: self.heap.clone(),
			}));
		}
		Ok(resolved)
	}

	fn can_replace(&self, _other: &dyn Type) -> bool {
		true
	}

	fn coerce_datum(&self, _bridge: &Bridge, _datum: Datum) -> Result<GuestValue> {
		Err(Error::internal("polymorphic type coerced without resolution"))
	}

	fn coerce_object(&self, object: ObjectRef) -> Result<Datum> {
		object_value(&self.heap, object, "value")
	}
}

/// Value of a registered UDT
struct UdtValue {
	id: TypeId,
	name: String,
	heap: SharedHeap,
}

impl Type for UdtValue {
	fn type_id(&self) -> TypeId {
		self.id
	}

	fn guest_type_name(&self) -> &str {
		&self.name
	}

	fn is_primitive(&self) -> bool {
		false
	}

	fn element_type(&self) -> Option<Rc<dyn Type>> {
		None
	}

	fn can_replace(&self, other: &dyn Type) -> bool {
		other.type_id() == self.id
	}

	fn coerce_datum(&self, _bridge: &Bridge, datum: Datum) -> Result<GuestValue> {
		Ok(GuestValue::Reference(Some(self.heap.borrow_mut().alloc(Object::Udt(datum)))))
	}

	fn coerce_object(&self, object: ObjectRef) -> Result<Datum> {
		object_value(&self.heap, object, &self.name)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	In,
	Out,
}

/// A replacement type wrapped to stand in for the original one
struct Coerced {
	replacement: Rc<dyn Type>,
	original: Rc<dyn Type>,
}

impl Type for Coerced {
	fn type_id(&self) -> TypeId {
		self.original.type_id()
	}

	fn guest_type_name(&self) -> &str {
		self.replacement.guest_type_name()
	}

	fn is_primitive(&self) -> bool {
		self.replacement.is_primitive()
	}

	fn element_type(&self) -> Option<Rc<dyn Type>> {
		self.replacement.element_type()
	}

	fn can_replace(&self, other: &dyn Type) -> bool {
		self.replacement.can_replace(other)
	}

	fn coerce_datum(&self, bridge: &Bridge, datum: Datum) -> Result<GuestValue> {
		self.replacement.coerce_datum(bridge, datum)
	}

	fn coerce_object(&self, object: ObjectRef) -> Result<Datum> {
		self.replacement.coerce_object(object)
	}

	fn datum_from_slot(&self, slot: Slot) -> Result<Datum> {
		self.replacement.datum_from_slot(slot)
	}
}

/// Snapshots of the marshaling area around a nested call
#[derive(Debug, Default)]
pub struct ReentryProbe {
	pub before: RefCell<Option<MarshalArea>>,
	pub after: RefCell<Option<MarshalArea>>,
}

/// How a reentrant coercion calls back into the bridge
#[derive(Debug, Clone, Copy)]
enum Reentry {
	/// Ordinary call with the value as its only argument
	Call(ProcedureId),
	/// Trigger call with the value as the trigger context
	Trigger(ProcedureId),
}

/// An `int4` whose coercion calls a procedure on the value and passes its
/// result instead
struct Reentrant {
	id: TypeId,
	reentry: Reentry,
	probe: Rc<ReentryProbe>,
}

impl Type for Reentrant {
	fn type_id(&self) -> TypeId {
		self.id
	}

	fn guest_type_name(&self) -> &str {
		"int"
	}

	fn is_primitive(&self) -> bool {
		true
	}

	fn element_type(&self) -> Option<Rc<dyn Type>> {
		None
	}

	fn can_replace(&self, other: &dyn Type) -> bool {
		other.guest_type_name() == "int"
	}

	fn coerce_datum(&self, bridge: &Bridge, datum: Datum) -> Result<GuestValue> {
		let area = bridge.parameter_area();
		*self.probe.before.borrow_mut() = Some(area.borrow().clone());

		let mut call = match self.reentry {
			Reentry::Call(procedure) => FunctionCall::new(procedure).arg(datum, oid::INT4).returns(oid::INT4),
			Reentry::Trigger(procedure) => FunctionCall::trigger(procedure, TriggerData(datum.0)),
		};
		let result = bridge.call(&mut call)?;

		*self.probe.after.borrow_mut() = Some(area.borrow().clone());
		Ok(GuestValue::Primitive(Slot::from_i32(result.0 as i32)))
	}

	fn coerce_object(&self, object: ObjectRef) -> Result<Datum> {
		Err(Error::Guest(format!("int is primitive, got object {object}")))
	}

	fn datum_from_slot(&self, slot: Slot) -> Result<Datum> {
		Ok(Datum(slot.as_i32() as u32 as u64))
	}
}

fn builtin(id: TypeId, heap: &SharedHeap) -> Option<Rc<dyn Type>> {
	let scalar = |name, kind| -> Rc<dyn Type> {
		Rc::new(Scalar {
			id,
			name,
			kind,
		})
	};
	let boxed = |name: &str, element| -> Rc<dyn Type> {
		Rc::new(Boxed {
			id,
			name: name.to_string(),
			element,
			heap: heap.clone(),
		})
	};

	Some(match id {
		oid::BOOL => scalar("boolean", PrimitiveKind::Boolean),
		oid::INT4 => scalar("int", PrimitiveKind::Int),
		oid::INT8 => scalar("long", PrimitiveKind::Long),
		oid::FLOAT8 => scalar("double", PrimitiveKind::Double),
		oid::TEXT => boxed("java.lang.String", None),
		oid::BYTEA => boxed("byte[]", None),
		oid::INT4_ARRAY => boxed("int[]", Some(scalar("int", PrimitiveKind::Int))),
		oid::RECORD => Rc::new(Row {
			heap: heap.clone(),
		}),
		oid::ANY => Rc::new(Any {
			heap: heap.clone(),
		}),
		oid::VOID => Rc::new(Void),
		_ => return None,
	})
}

/// Type system over the mock heap
pub struct MockTypes {
	heap: SharedHeap,
	texts: RefCell<Vec<String>>,
	blobs: RefCell<Vec<Vec<u8>>>,
	reentrant: RefCell<HashMap<TypeId, Reentry>>,
	probe: Rc<ReentryProbe>,
	coercions: RefCell<Vec<(String, String, Direction)>>,
}

impl MockTypes {
	pub fn new(heap: SharedHeap) -> Self {
		Self {
			heap,
			texts: RefCell::default(),
			blobs: RefCell::default(),
			reentrant: RefCell::default(),
			probe: Rc::default(),
			coercions: RefCell::default(),
		}
	}

	/// Make `id` an `int4` whose coercion reenters the bridge through
	/// `procedure`
	pub fn add_reentrant(&self, id: TypeId, procedure: ProcedureId) {
		self.reentrant.borrow_mut().insert(id, Reentry::Call(procedure));
	}

	/// Like [`MockTypes::add_reentrant`], but `procedure` runs as a trigger
	/// with the value as its context and the returned row as the result
	pub fn add_reentrant_trigger(&self, id: TypeId, procedure: ProcedureId) {
		self.reentrant.borrow_mut().insert(id, Reentry::Trigger(procedure));
	}

	pub fn probe(&self) -> &ReentryProbe {
		&self.probe
	}

	/// Coercion adapters built so far: replacement, original, direction
	pub fn coercions(&self) -> Vec<(String, String, Direction)> {
		self.coercions.borrow().clone()
	}

	pub fn text(&self, text: &str) -> Datum {
		let mut texts = self.texts.borrow_mut();
		texts.push(text.to_string());
		Datum((texts.len() - 1) as u64)
	}

	pub fn text_value(&self, datum: Datum) -> Option<String> {
		self.texts.borrow().get(datum.0 as usize).cloned()
	}

	pub fn bytes(&self, bytes: &[u8]) -> Datum {
		let mut blobs = self.blobs.borrow_mut();
		blobs.push(bytes.to_vec());
		Datum((blobs.len() - 1) as u64)
	}

	pub fn bytes_value(&self, datum: Datum) -> Option<Vec<u8>> {
		self.blobs.borrow().get(datum.0 as usize).cloned()
	}

	fn coerce(&self, replacement: Rc<dyn Type>, original: Rc<dyn Type>, direction: Direction) -> Result<Rc<dyn Type>> {
		if replacement.is_void() || original.is_void() {
			return Err(Error::incompatible(replacement.guest_type_name(), original.guest_type_name()));
		}
		self.coercions.borrow_mut().push((
			replacement.guest_type_name().to_string(),
			original.guest_type_name().to_string(),
			direction,
		));
		Ok(Rc::new(Coerced {
			replacement,
			original,
		}))
	}
}

impl TypeSystem for MockTypes {
	fn from_type_id(&self, id: TypeId, _type_map: Option<ObjectRef>) -> Result<Rc<dyn Type>> {
		if let Some(&reentry) = self.reentrant.borrow().get(&id) {
			return Ok(Rc::new(Reentrant {
				id,
				reentry,
				probe: self.probe.clone(),
			}));
		}
		builtin(id, &self.heap).ok_or(Error::not_found(MetadataKind::Type, id.0))
	}

	fn from_guest_type(&self, id: TypeId, guest_type: &str) -> Result<Rc<dyn Type>> {
		let natural = match guest_type {
			"boolean" => oid::BOOL,
			"int" => oid::INT4,
			"long" => oid::INT8,
			"double" => oid::FLOAT8,
			"java.lang.String" => oid::TEXT,
			"int[]" => oid::INT4_ARRAY,
			"java.sql.ResultSet" => oid::RECORD,
			"java.lang.Object" => oid::ANY,
			"void" => oid::VOID,
			"java.lang.Integer" | "java.lang.Long" => {
				return Ok(Rc::new(Boxed {
					id: if id.is_valid() { id } else { oid::INT4 },
					name: guest_type.to_string(),
					element: None,
					heap: self.heap.clone(),
				}));
			}
			other => return Err(Error::incompatible(other, id)),
		};
		builtin(natural, &self.heap).ok_or(Error::not_found(MetadataKind::Type, natural.0))
	}

	fn coerce_in(&self, replacement: Rc<dyn Type>, original: Rc<dyn Type>) -> Result<Rc<dyn Type>> {
		self.coerce(replacement, original, Direction::In)
	}

	fn coerce_out(&self, replacement: Rc<dyn Type>, original: Rc<dyn Type>) -> Result<Rc<dyn Type>> {
		self.coerce(replacement, original, Direction::Out)
	}

	fn udt_type(&self, type_id: TypeId, type_name: &str, _class: ObjectRef) -> Result<Rc<dyn Type>> {
		Ok(Rc::new(UdtValue {
			id: type_id,
			name: type_name.to_string(),
			heap: self.heap.clone(),
		}))
	}

	fn text_of(&self, datum: Datum) -> Result<String> {
		self.text_value(datum).ok_or_else(|| Error::internal(format!("no text datum {}", datum.0)))
	}

	fn text_datum(&self, text: &str) -> Result<Datum> {
		Ok(self.text(text))
	}

	fn bytes_of(&self, datum: Datum) -> Result<Vec<u8>> {
		self.bytes_value(datum).ok_or_else(|| Error::internal(format!("no bytes datum {}", datum.0)))
	}

	fn bytes_datum(&self, bytes: &[u8]) -> Result<Datum> {
		Ok(self.bytes(bytes))
	}
}
