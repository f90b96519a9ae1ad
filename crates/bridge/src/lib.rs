// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Cross-runtime function invocation bridge.
//!
//! Lets a host engine call procedures implemented in an embedded guest
//! runtime. The bridge resolves and caches a [`Descriptor`] per procedure,
//! marshals arguments into a [`MarshalArea`] shared with the guest, runs the
//! ordinary, set-returning, trigger and UDT call paths, and keeps the area
//! intact across reentrant calls.
//!
//! Catalog lookup, the host execution context, type coercion and the guest
//! runtime itself are collaborators behind the [`Catalog`], [`HostContext`],
//! [`TypeSystem`] and [`GuestRuntime`] traits.

// #![cfg_attr(not(debug_assertions), deny(warnings))]

pub mod area;
mod bridge;
pub mod call;
pub mod config;
pub mod descriptor;
mod dispatch;
pub mod error;
pub mod ffi;
pub mod guest;
pub mod host;
mod invocation;
mod marshal;
mod multicall;
mod registry;
mod trigger;
pub mod types;
pub mod udt;
pub mod value;

pub use area::{Arguments, MarshalArea, ParamCounts, ParameterArea};
pub use bridge::{Bridge, BridgeBuilder};
pub use call::{Argument, FunctionCall, SetReturning};
pub use config::BridgeConfig;
pub use descriptor::{
	Descriptor, DescriptorKind, DescriptorStore, DescriptorToken, Reconciled, Routine, RoutineSpec, StoredSignature,
	UdtBinding, UdtSpec,
};
pub use error::{Error, MetadataKind, Result};
pub use guest::{CreateRequest, GlobalRef, GuestRuntime, NextRow, TriggerData};
pub use host::{Catalog, HostContext, LanguageDef, NamespaceDef, ProcedureDef, TypeDef};
pub use types::{Type, TypeSystem, pass_as_primitive};
pub use udt::{Udt, UdtFunction};
pub use value::{
	Datum, GuestValue, LanguageId, LoaderKey, MemoryContextId, NamespaceId, ObjectRef, PrimitiveKind, ProcedureId,
	Slot, TypeId,
};
