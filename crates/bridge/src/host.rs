// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Contracts of the host engine: metadata lookup and the per-call execution
//! context (memory arenas, execution connection).

use crate::{
	error::{Error, MetadataKind, Result},
	value::{LanguageId, MemoryContextId, NamespaceId, ProcedureId, TypeId},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureDef {
	pub id: ProcedureId,
	pub name: String,
	pub namespace: NamespaceId,
	pub language: LanguageId,
	/// Declared body, e.g. the guest class and method reference
	pub source: String,
	pub arg_types: Vec<TypeId>,
	pub return_type: TypeId,
	pub returns_set: bool,
	/// Not volatile: the procedure may not have side effects
	pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDef {
	pub id: NamespaceId,
	pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageDef {
	pub id: LanguageId,
	pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
	pub id: TypeId,
	pub name: String,
	pub namespace: NamespaceId,
	/// False while the type is only a shell
	pub is_defined: bool,
	pub input: ProcedureId,
	pub output: ProcedureId,
	pub receive: ProcedureId,
	pub send: ProcedureId,
}

/// Host metadata lookup
pub trait Catalog {
	fn find_procedure(&self, id: ProcedureId) -> Result<Option<ProcedureDef>>;

	fn find_namespace(&self, id: NamespaceId) -> Result<Option<NamespaceDef>>;

	fn find_language(&self, id: LanguageId) -> Result<Option<LanguageDef>>;

	fn find_type(&self, id: TypeId) -> Result<Option<TypeDef>>;

	/// True if the procedure is implemented in the guest runtime
	fn is_guest_procedure(&self, id: ProcedureId) -> Result<bool>;

	fn get_procedure(&self, id: ProcedureId) -> Result<ProcedureDef> {
		self.find_procedure(id)?.ok_or(Error::not_found(MetadataKind::Function, id.0))
	}

	fn get_namespace(&self, id: NamespaceId) -> Result<NamespaceDef> {
		self.find_namespace(id)?.ok_or(Error::not_found(MetadataKind::Namespace, id.0))
	}

	fn get_language(&self, id: LanguageId) -> Result<LanguageDef> {
		self.find_language(id)?.ok_or(Error::not_found(MetadataKind::Language, id.0))
	}

	fn get_type(&self, id: TypeId) -> Result<TypeDef> {
		self.find_type(id)?.ok_or(Error::not_found(MetadataKind::Type, id.0))
	}
}

/// Per-call execution state of the host
pub trait HostContext {
	/// Connect an execution context unless one is connected already
	fn assert_connect(&self) -> Result<()>;

	/// Drop a connected execution context, if any
	fn assert_disconnect(&self);

	/// Arena of the caller, outliving the current call
	fn upper_memory_context(&self) -> MemoryContextId;

	/// Make `context` current, returning the previously current one
	fn switch_memory_context(&self, context: MemoryContextId) -> MemoryContextId;
}

/// Keeps the caller's arena current until dropped
pub(crate) struct UpperContext<'a> {
	host: &'a dyn HostContext,
	previous: MemoryContextId,
}

impl<'a> UpperContext<'a> {
	pub(crate) fn enter(host: &'a dyn HostContext) -> Self {
		let previous = host.switch_memory_context(host.upper_memory_context());
		Self {
			host,
			previous,
		}
	}
}

impl Drop for UpperContext<'_> {
	fn drop(&mut self) {
		self.host.switch_memory_context(self.previous);
	}
}
