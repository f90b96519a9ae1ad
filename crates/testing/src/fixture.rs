// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::rc::Rc;

use callbridge::{Bridge, BridgeConfig, Datum, ProcedureDef, ProcedureId, TypeDef, TypeId};

use crate::{
	catalog::{MockCatalog, PUBLIC, procedure},
	guest::{MockGuest, RoutineScript, Script},
	heap::{Heap, SharedHeap},
	host::MockHost,
	types::MockTypes,
};

/// Mock collaborators sharing one heap
pub struct Fixture {
	pub heap: SharedHeap,
	pub catalog: Rc<MockCatalog>,
	pub host: Rc<MockHost>,
	pub types: Rc<MockTypes>,
	pub guest: Rc<MockGuest>,
}

impl Default for Fixture {
	fn default() -> Self {
		Self::new()
	}
}

impl Fixture {
	pub fn new() -> Self {
		let heap = Heap::shared();
		Self {
			catalog: Rc::new(MockCatalog::default()),
			host: Rc::new(MockHost::default()),
			types: Rc::new(MockTypes::new(heap.clone())),
			guest: Rc::new(MockGuest::new(heap.clone())),
			heap,
		}
	}

	pub fn bridge(&self) -> Bridge {
		self.bridge_with(BridgeConfig::default())
	}

	pub fn bridge_with(&self, config: BridgeConfig) -> Bridge {
		Bridge::builder()
			.config(config)
			.catalog(self.catalog.clone())
			.host(self.host.clone())
			.types(self.types.clone())
			.guest(self.guest.clone())
			.build()
			.expect("mock collaborators build a bridge")
	}

	/// Declare a guest procedure and script its resolution
	pub fn routine(
		&self,
		id: u32,
		name: &str,
		arg_types: &[TypeId],
		return_type: TypeId,
		script: RoutineScript,
	) -> ProcedureId {
		self.declare(procedure(id, name, arg_types, return_type), Script::Routine(script))
	}

	pub fn declare(&self, procedure: ProcedureDef, script: Script) -> ProcedureId {
		let id = procedure.id;
		self.catalog.add_procedure(procedure);
		self.guest.script(id, script);
		id
	}

	/// Declare a UDT whose four I/O procedures are `first_io..first_io + 4`,
	/// each scripted as the matching UDT function
	pub fn udt(&self, type_id: TypeId, name: &str, first_io: u32, defined: bool) -> [ProcedureId; 4] {
		let ids = [0, 1, 2, 3].map(|offset| ProcedureId(first_io + offset));
		for (id, (suffix, tag)) in ids.iter().zip([("in", b'i'), ("out", b'o'), ("recv", b'r'), ("send", b's')]) {
			self.declare(
				procedure(id.0, &format!("{name}_{suffix}"), &[type_id], type_id),
				Script::Udt {
					type_id,
					tag,
				},
			);
		}
		self.catalog.add_type(TypeDef {
			id: type_id,
			name: name.to_string(),
			namespace: PUBLIC,
			is_defined: defined,
			input: ids[0],
			output: ids[1],
			receive: ids[2],
			send: ids[3],
		});
		ids
	}
}

/// Host datum of an `int4`
pub fn int(value: i32) -> Datum {
	Datum(value as u32 as u64)
}
