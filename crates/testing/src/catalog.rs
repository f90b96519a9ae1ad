// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	cell::{Cell, RefCell},
	collections::{HashMap, HashSet},
};

use callbridge::{
	Catalog, LanguageDef, LanguageId, NamespaceDef, NamespaceId, ProcedureDef, ProcedureId, Result, TypeDef, TypeId,
};

pub const PUBLIC: NamespaceId = NamespaceId(2200);
pub const GUEST_LANGUAGE: LanguageId = LanguageId(16384);

/// Host metadata held in memory
pub struct MockCatalog {
	procedures: RefCell<HashMap<ProcedureId, ProcedureDef>>,
	namespaces: RefCell<HashMap<NamespaceId, NamespaceDef>>,
	languages: RefCell<HashMap<LanguageId, LanguageDef>>,
	types: RefCell<HashMap<TypeId, TypeDef>>,
	guest_procedures: RefCell<HashSet<ProcedureId>>,
	procedure_lookups: Cell<usize>,
}

impl Default for MockCatalog {
	fn default() -> Self {
		let catalog = Self {
			procedures: RefCell::default(),
			namespaces: RefCell::default(),
			languages: RefCell::default(),
			types: RefCell::default(),
			guest_procedures: RefCell::default(),
			procedure_lookups: Cell::new(0),
		};
		catalog.add_namespace(NamespaceDef {
			id: PUBLIC,
			name: "public".to_string(),
		});
		catalog.add_language(LanguageDef {
			id: GUEST_LANGUAGE,
			name: "java".to_string(),
		});
		catalog
	}
}

impl MockCatalog {
	pub fn add_namespace(&self, namespace: NamespaceDef) {
		self.namespaces.borrow_mut().insert(namespace.id, namespace);
	}

	pub fn add_language(&self, language: LanguageDef) {
		self.languages.borrow_mut().insert(language.id, language);
	}

	pub fn add_type(&self, def: TypeDef) {
		self.types.borrow_mut().insert(def.id, def);
	}

	/// Register a procedure implemented in the guest
	pub fn add_procedure(&self, procedure: ProcedureDef) {
		self.guest_procedures.borrow_mut().insert(procedure.id);
		self.procedures.borrow_mut().insert(procedure.id, procedure);
	}

	/// Register a procedure implemented natively by the host
	pub fn add_native_procedure(&self, procedure: ProcedureDef) {
		self.procedures.borrow_mut().insert(procedure.id, procedure);
	}

	/// Number of procedure lookups served, i.e. descriptor constructions
	pub fn procedure_lookups(&self) -> usize {
		self.procedure_lookups.get()
	}
}

/// Procedure in the public namespace, implemented in the guest language
pub fn procedure(id: u32, name: &str, arg_types: &[TypeId], return_type: TypeId) -> ProcedureDef {
	ProcedureDef {
		id: ProcedureId(id),
		name: name.to_string(),
		namespace: PUBLIC,
		language: GUEST_LANGUAGE,
		source: format!("org.example.Functions.{name}"),
		arg_types: arg_types.to_vec(),
		return_type,
		returns_set: false,
		read_only: false,
	}
}

impl Catalog for MockCatalog {
	fn find_procedure(&self, id: ProcedureId) -> Result<Option<ProcedureDef>> {
		self.procedure_lookups.set(self.procedure_lookups.get() + 1);
		Ok(self.procedures.borrow().get(&id).cloned())
	}

	fn find_namespace(&self, id: NamespaceId) -> Result<Option<NamespaceDef>> {
		Ok(self.namespaces.borrow().get(&id).cloned())
	}

	fn find_language(&self, id: LanguageId) -> Result<Option<LanguageDef>> {
		Ok(self.languages.borrow().get(&id).cloned())
	}

	fn find_type(&self, id: TypeId) -> Result<Option<TypeDef>> {
		Ok(self.types.borrow().get(&id).cloned())
	}

	fn is_guest_procedure(&self, id: ProcedureId) -> Result<bool> {
		Ok(self.guest_procedures.borrow().contains(&id))
	}
}
