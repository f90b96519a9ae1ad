// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! User-defined types implemented by guest classes and the dispatch of their
//! four I/O functions.

use std::{
	cell::OnceCell,
	fmt::{self, Debug, Display, Formatter},
	rc::Rc,
};

use callbridge_abi::{UDT_INPUT, UDT_OUTPUT, UDT_RECEIVE, UDT_SEND};
use tracing::{debug, instrument};

use crate::{
	bridge::Bridge,
	call::FunctionCall,
	error::{Error, Result},
	guest::{GlobalRef, GuestRuntime},
	types::Type,
	value::{Datum, GuestValue, ObjectRef, TypeId},
};

/// A registered UDT
pub struct Udt {
	type_id: TypeId,
	type_name: String,
	class: GlobalRef,
	parse: OnceCell<GlobalRef>,
	read: OnceCell<GlobalRef>,
	value_type: Rc<dyn Type>,
}

impl Udt {
	pub fn type_id(&self) -> TypeId {
		self.type_id
	}

	pub fn type_name(&self) -> &str {
		&self.type_name
	}

	pub fn class(&self) -> ObjectRef {
		self.class.handle()
	}

	/// Coercion type of values of this UDT
	pub fn value_type(&self) -> &Rc<dyn Type> {
		&self.value_type
	}

	fn parse_handle(&self, guest: &Rc<dyn GuestRuntime>) -> Result<ObjectRef> {
		if let Some(parse) = self.parse.get() {
			return Ok(parse.handle());
		}
		let local = guest.udt_parse_handle(self.class.handle())?;
		let global = GlobalRef::new(guest, local);
		guest.delete_local_ref(local);
		Ok(self.parse.get_or_init(|| global).handle())
	}

	fn read_handle(&self, guest: &Rc<dyn GuestRuntime>) -> Result<ObjectRef> {
		if let Some(read) = self.read.get() {
			return Ok(read.handle());
		}
		let local = guest.udt_read_handle(self.class.handle())?;
		let global = GlobalRef::new(guest, local);
		guest.delete_local_ref(local);
		Ok(self.read.get_or_init(|| global).handle())
	}
}

impl Debug for Udt {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Udt").field("type_id", &self.type_id).field("type_name", &self.type_name).finish()
	}
}

fn global_cell(guest: &Rc<dyn GuestRuntime>, handle: Option<ObjectRef>) -> OnceCell<GlobalRef> {
	match handle {
		Some(local) => OnceCell::from(GlobalRef::new(guest, local)),
		None => OnceCell::new(),
	}
}

type Handler = fn(&Bridge, &Udt, &mut FunctionCall) -> Result<Datum>;

/// One of the four I/O functions of a UDT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UdtFunction {
	/// Parse from external text
	Input,
	/// Render to text
	Output,
	/// Parse from binary
	Receive,
	/// Render to binary
	Send,
}

impl UdtFunction {
	const HANDLERS: [Handler; 4] = [input, output, receive, send];

	pub fn from_tag(tag: u8) -> Result<Self> {
		match tag {
			UDT_INPUT => Ok(UdtFunction::Input),
			UDT_OUTPUT => Ok(UdtFunction::Output),
			UDT_RECEIVE => Ok(UdtFunction::Receive),
			UDT_SEND => Ok(UdtFunction::Send),
			other => Err(Error::DispatchTagInvalid(other)),
		}
	}

	pub fn tag(self) -> u8 {
		match self {
			UdtFunction::Input => UDT_INPUT,
			UdtFunction::Output => UDT_OUTPUT,
			UdtFunction::Receive => UDT_RECEIVE,
			UdtFunction::Send => UDT_SEND,
		}
	}

	fn handler(self) -> Handler {
		Self::HANDLERS[self as usize]
	}
}

impl Display for UdtFunction {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			UdtFunction::Input => f.write_str("input"),
			UdtFunction::Output => f.write_str("output"),
			UdtFunction::Receive => f.write_str("receive"),
			UdtFunction::Send => f.write_str("send"),
		}
	}
}

/// The single argument of an I/O function, `None` if it is null
fn single_argument(call: &FunctionCall) -> Result<Option<Datum>> {
	let arg = call.args.first().ok_or(Error::ArgumentCountMismatch {
		passed: 0,
		declared: 1,
	})?;
	Ok((!arg.is_null).then_some(arg.datum))
}

fn null_result(call: &mut FunctionCall) -> Result<Datum> {
	call.is_null = true;
	Ok(Datum::ZERO)
}

/// Host value of a guest object produced by a parse or read
fn object_result(bridge: &Bridge, udt: &Udt, call: &mut FunctionCall, object: Option<ObjectRef>) -> Result<Datum> {
	let Some(object) = object else {
		return null_result(call);
	};
	let result = udt.value_type.coerce_object(object);
	bridge.guest.delete_local_ref(object);
	result
}

/// Guest object of a host value about to be rendered
fn value_object(bridge: &Bridge, udt: &Udt, datum: Datum) -> Result<Option<ObjectRef>> {
	match udt.value_type.coerce_datum(bridge, datum)? {
		GuestValue::Reference(object) => Ok(object),
		GuestValue::Primitive(_) => {
			Err(Error::internal(format!("UDT {} coerced to a primitive value", udt.type_name)))
		}
	}
}

fn input(bridge: &Bridge, udt: &Udt, call: &mut FunctionCall) -> Result<Datum> {
	let Some(datum) = single_argument(call)? else {
		return null_result(call);
	};
	let text = bridge.types.text_of(datum)?;
	let parse = udt.parse_handle(&bridge.guest)?;
	let object = bridge.guest.udt_parse_invoke(parse, &text, &udt.type_name)?;
	object_result(bridge, udt, call, object)
}

fn output(bridge: &Bridge, udt: &Udt, call: &mut FunctionCall) -> Result<Datum> {
	let Some(datum) = single_argument(call)? else {
		return null_result(call);
	};
	let Some(object) = value_object(bridge, udt, datum)? else {
		return null_result(call);
	};
	let text = bridge.guest.udt_to_string_invoke(object);
	bridge.guest.delete_local_ref(object);
	bridge.types.text_datum(&text?)
}

fn receive(bridge: &Bridge, udt: &Udt, call: &mut FunctionCall) -> Result<Datum> {
	let Some(datum) = single_argument(call)? else {
		return null_result(call);
	};
	let bytes = bridge.types.bytes_of(datum)?;
	let read = udt.read_handle(&bridge.guest)?;
	let object = bridge.guest.udt_read_invoke(read, &bytes, &udt.type_name)?;
	object_result(bridge, udt, call, object)
}

fn send(bridge: &Bridge, udt: &Udt, call: &mut FunctionCall) -> Result<Datum> {
	let Some(datum) = single_argument(call)? else {
		return null_result(call);
	};
	let Some(object) = value_object(bridge, udt, datum)? else {
		return null_result(call);
	};
	let bytes = bridge.guest.udt_write_invoke(object);
	bridge.guest.delete_local_ref(object);
	bridge.types.bytes_datum(&bytes?)
}

impl Bridge {
	/// Register the UDT implemented by `class`, or return the one already
	/// registered for `type_id`
	pub(crate) fn register_udt(
		&self,
		class: ObjectRef,
		type_id: TypeId,
		type_name: &str,
		parse: Option<ObjectRef>,
		read: Option<ObjectRef>,
	) -> Result<Rc<Udt>> {
		if let Some(udt) = self.udts.borrow().get(&type_id) {
			return Ok(udt.clone());
		}

		let value_type = self.types.udt_type(type_id, type_name, class)?;
		let udt = Rc::new(Udt {
			type_id,
			type_name: type_name.to_string(),
			class: GlobalRef::new(&self.guest, class),
			parse: global_cell(&self.guest, parse),
			read: global_cell(&self.guest, read),
			value_type,
		});

		debug!(%type_id, type_name, "registered UDT");
		Ok(self.udts.borrow_mut().entry(type_id).or_insert(udt).clone())
	}

	/// Registered UDT of `type_id`, if any
	pub fn find_udt(&self, type_id: TypeId) -> Option<Rc<Udt>> {
		self.udts.borrow().get(&type_id).cloned()
	}

	/// Detect whether a type is a UDT implemented in the guest and return its
	/// coercion type
	///
	/// A type qualifies when all four of its I/O procedures are guest
	/// procedures and the guest recognises the implementing class.
	#[instrument(name = "bridge::udt::check_type_udt", level = "debug", skip(self))]
	pub fn check_type_udt(&self, type_id: TypeId) -> Result<Option<Rc<dyn Type>>> {
		let def = self.catalog.get_type(type_id)?;
		for procedure in [def.input, def.output, def.receive, def.send] {
			if !self.catalog.is_guest_procedure(procedure)? {
				return Ok(None);
			}
		}

		let procedure = self.catalog.get_procedure(def.input)?;
		let schema = self.catalog.get_namespace(procedure.namespace)?.name;
		let Some(class) = self.guest.class_if_udt(&procedure, &schema)? else {
			return Ok(None);
		};

		let udt = self.register_udt(class, type_id, &def.name, None, None);
		self.guest.delete_local_ref(class);
		Ok(Some(udt?.value_type.clone()))
	}

	#[instrument(name = "bridge::udt::invoke", level = "trace", skip_all, fields(function = %function))]
	pub(crate) fn invoke_udt(
		&self,
		udt: &Udt,
		function: UdtFunction,
		call: &mut FunctionCall,
	) -> Result<Datum> {
		function.handler()(self, udt, call)
	}
}
