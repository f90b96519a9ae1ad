// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use tracing::{debug, instrument, warn};

use crate::{
	area::{MarshalArea, ParameterArea},
	call::FunctionCall,
	config::BridgeConfig,
	descriptor::{Descriptor, Placeholder, Placeholders},
	error::{Error, Result},
	guest::{CreateRequest, GuestRuntime},
	host::{Catalog, HostContext},
	invocation::{InvocationGuard, InvocationStack},
	registry::Registry,
	types::TypeSystem,
	udt::Udt,
	value::{Datum, ObjectRef, ProcedureId, TypeId},
};

/// Invokes guest procedures on behalf of the host
///
/// All state is process-lifetime and single threaded. Every operation takes
/// `&self` so that a coercion running in the middle of a call can reenter the
/// bridge; no internal borrow is held across a call into a collaborator.
pub struct Bridge {
	pub(crate) config: BridgeConfig,
	pub(crate) catalog: Rc<dyn Catalog>,
	pub(crate) host: Rc<dyn HostContext>,
	pub(crate) types: Rc<dyn TypeSystem>,
	pub(crate) guest: Rc<dyn GuestRuntime>,
	pub(crate) area: ParameterArea,
	pub(crate) registry: RefCell<Registry>,
	pub(crate) placeholders: RefCell<Placeholders>,
	pub(crate) invocations: RefCell<InvocationStack>,
	pub(crate) udts: RefCell<HashMap<TypeId, Rc<Udt>>>,
}

impl Bridge {
	pub fn builder() -> BridgeBuilder {
		BridgeBuilder::new()
	}

	pub fn config(&self) -> &BridgeConfig {
		&self.config
	}

	/// The marshaling area shared with the guest
	pub fn parameter_area(&self) -> ParameterArea {
		self.area.clone()
	}

	/// Cached descriptor of `id`, without resolving it
	pub fn cached(&self, id: ProcedureId) -> Option<Rc<Descriptor>> {
		self.registry.borrow().get(id)
	}

	pub fn cached_count(&self) -> usize {
		self.registry.borrow().len()
	}

	/// Number of calls currently executing
	pub fn invocation_depth(&self) -> usize {
		self.invocations.borrow().depth()
	}

	/// Number of descriptors under construction
	pub fn pending_placeholders(&self) -> usize {
		self.placeholders.borrow().live()
	}

	/// Look up the descriptor of `id`, resolving it on a cache miss
	///
	/// A validator lookup bypasses the cache and stores the result only if
	/// construction completed; it returns `None` for an incomplete procedure.
	/// The descriptor found becomes the current one of the innermost
	/// invocation.
	#[instrument(name = "bridge::registry::get_function", level = "debug", skip(self))]
	pub fn get_function(
		&self,
		id: ProcedureId,
		for_trigger: bool,
		for_validator: bool,
		check_body: bool,
	) -> Result<Option<Rc<Descriptor>>> {
		let cached = if for_validator { None } else { self.registry.borrow().get(id) };
		let descriptor = match cached {
			Some(descriptor) => descriptor,
			None => {
				if !for_validator {
					debug!(%id, "function cache miss");
				}
				let Some(created) = self.create_descriptor(id, for_trigger, for_validator, check_body)? else {
					return Ok(None);
				};
				let descriptor = Rc::new(created);
				let replaced = self.registry.borrow_mut().insert(descriptor.clone());
				drop(replaced);
				descriptor
			}
		};

		self.invocations.borrow_mut().set_current(descriptor.clone());
		Ok(Some(descriptor))
	}

	#[instrument(name = "bridge::registry::create_descriptor", level = "debug", skip(self))]
	fn create_descriptor(
		&self,
		id: ProcedureId,
		for_trigger: bool,
		for_validator: bool,
		check_body: bool,
	) -> Result<Option<Descriptor>> {
		let procedure = self.catalog.get_procedure(id)?;
		let schema = self.catalog.get_namespace(procedure.namespace)?.name;
		let language = self.catalog.get_language(procedure.language)?.name;

		let placeholder = Placeholder::allocate(&self.placeholders);
		let request = CreateRequest {
			token: placeholder.token(),
			procedure: &procedure,
			schema: &schema,
			language: &language,
			for_trigger,
			for_validator,
			check_body,
		};

		let target = self.guest.create(self, &request)?;
		let descriptor = placeholder.take().and_then(|draft| draft.complete(id, target, &self.guest));
		if let Some(target) = target {
			self.guest.delete_local_ref(target);
		}

		match descriptor? {
			Some(descriptor) => {
				debug!(%id, udt = descriptor.is_udt(), "created function descriptor");
				Ok(Some(descriptor))
			}
			None if for_validator => {
				warn!(%id, name = %procedure.name, "validation left function incomplete");
				Ok(None)
			}
			None => Err(Error::ConstructionIncomplete(id)),
		}
	}

	/// Handle one host call: resolve the procedure and run the ordinary or
	/// trigger path inside a fresh invocation frame
	#[instrument(name = "bridge::call", level = "debug", skip_all, fields(procedure = %call.procedure))]
	pub fn call(&self, call: &mut FunctionCall) -> Result<Datum> {
		let _invocation = InvocationGuard::enter(self);
		let descriptor = self
			.get_function(call.procedure, call.trigger.is_some(), false, false)?
			.ok_or(Error::ConstructionIncomplete(call.procedure))?;

		match call.trigger {
			Some(trigger) => self.invoke_trigger(&descriptor, trigger, call),
			None => self.invoke(&descriptor, call),
		}
	}

	/// Resolve a procedure the way the host's validator does
	#[instrument(name = "bridge::validate", level = "debug", skip(self))]
	pub fn validate(&self, id: ProcedureId, for_trigger: bool, check_body: bool) -> Result<Option<Rc<Descriptor>>> {
		let _invocation = InvocationGuard::enter(self);
		self.get_function(id, for_trigger, true, check_body)
	}

	/// Drop every cached descriptor not used by an executing call
	#[instrument(name = "bridge::registry::clear_function_cache", level = "debug", skip(self))]
	pub fn clear_function_cache(&self) {
		let released = {
			let invocations = self.invocations.borrow();
			self.registry.borrow_mut().invalidate(|descriptor| invocations.in_use(descriptor))
		};
		debug!(kept = self.cached_count(), released = released.len(), "function cache invalidated");
	}

	/// True unless the current procedure may have side effects
	///
	/// While a procedure is being resolved there is no current descriptor and
	/// no updates are allowed.
	pub fn is_current_read_only(&self) -> bool {
		self.invocations.borrow().current().is_none_or(|descriptor| descriptor.is_read_only())
	}

	/// Schema loader of the current procedure, if it is still alive
	pub fn current_loader(&self) -> Option<ObjectRef> {
		let key = self.invocations.borrow().current().and_then(|descriptor| descriptor.schema_loader())?;
		self.guest.resolve_loader(key)
	}
}

/// Assembles a [`Bridge`] from its collaborators
#[derive(Default)]
pub struct BridgeBuilder {
	config: BridgeConfig,
	catalog: Option<Rc<dyn Catalog>>,
	host: Option<Rc<dyn HostContext>>,
	types: Option<Rc<dyn TypeSystem>>,
	guest: Option<Rc<dyn GuestRuntime>>,
}

impl BridgeBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn config(mut self, config: BridgeConfig) -> Self {
		self.config = config;
		self
	}

	pub fn catalog(mut self, catalog: Rc<dyn Catalog>) -> Self {
		self.catalog = Some(catalog);
		self
	}

	pub fn host(mut self, host: Rc<dyn HostContext>) -> Self {
		self.host = Some(host);
		self
	}

	pub fn types(mut self, types: Rc<dyn TypeSystem>) -> Self {
		self.types = Some(types);
		self
	}

	pub fn guest(mut self, guest: Rc<dyn GuestRuntime>) -> Self {
		self.guest = Some(guest);
		self
	}

	pub fn build(self) -> Result<Bridge> {
		self.config.validate()?;
		let catalog = self.catalog.ok_or(missing("catalog"))?;
		let host = self.host.ok_or(missing("host context"))?;
		let types = self.types.ok_or(missing("type system"))?;
		let guest = self.guest.ok_or(missing("guest runtime"))?;

		let area: ParameterArea = Rc::new(RefCell::new(MarshalArea::new(self.config.max_parameters)));
		guest.attach_parameter_area(area.clone());

		debug!(max_parameters = self.config.max_parameters, "bridge initialised");
		Ok(Bridge {
			registry: RefCell::new(Registry::new(self.config.registry_capacity)),
			config: self.config,
			catalog,
			host,
			types,
			guest,
			area,
			placeholders: RefCell::new(Placeholders::default()),
			invocations: RefCell::new(InvocationStack::default()),
			udts: RefCell::new(HashMap::new()),
		})
	}
}

fn missing(collaborator: &str) -> Error {
	Error::Configuration(format!("no {collaborator} configured"))
}
