// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::{self, Display, Formatter};

use crate::value::ProcedureId;

pub type Result<T> = std::result::Result<T, Error>;

/// Kind of host metadata object a lookup failed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKind {
	Function,
	Language,
	Namespace,
	Type,
}

impl Display for MetadataKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			MetadataKind::Function => f.write_str("function"),
			MetadataKind::Language => f.write_str("language"),
			MetadataKind::Namespace => f.write_str("namespace"),
			MetadataKind::Type => f.write_str("type"),
		}
	}
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("cache lookup failed for {kind} {id}")]
	MetadataNotFound {
		kind: MetadataKind,
		id: u32,
	},

	#[error("failed to create a guest function (oid {0}) and not validating")]
	ConstructionIncomplete(ProcedureId),

	#[error("type {replacement} cannot stand in for {original} and no coercion applies")]
	TypeIncompatible {
		replacement: String,
		original: String,
	},

	#[error("guest/native code mismatch: unexpected UDT function tag {0:#04x}")]
	DispatchTagInvalid(u8),

	#[error("unsupported parameter index {0}")]
	UnsupportedParameterIndex(i32),

	#[error("procedure declares {count} parameters, the maximum is {max}")]
	TooManyParameters {
		count: usize,
		max: usize,
	},

	#[error("call passes {passed} arguments to a procedure declaring {declared}")]
	ArgumentCountMismatch {
		passed: usize,
		declared: usize,
	},

	#[error("{area} slot {index} out of range")]
	SlotOutOfRange {
		area: &'static str,
		index: usize,
	},

	#[error("unknown or released descriptor token {0:#x}")]
	UnknownPlaceholder(u64),

	#[error("guest runtime error: {0}")]
	Guest(String),

	#[error("invalid bridge configuration: {0}")]
	Configuration(String),

	#[error("internal error: {0}")]
	Internal(String),
}

impl Error {
	pub fn not_found(kind: MetadataKind, id: u32) -> Self {
		Error::MetadataNotFound {
			kind,
			id,
		}
	}

	pub fn incompatible(replacement: impl Display, original: impl Display) -> Self {
		Error::TypeIncompatible {
			replacement: replacement.to_string(),
			original: original.to_string(),
		}
	}

	pub fn internal(message: impl Into<String>) -> Self {
		Error::Internal(message.into())
	}
}
