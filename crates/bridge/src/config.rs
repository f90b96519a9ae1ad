// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use callbridge_abi::MAX_PARAMETERS;

use crate::error::{Error, Result};

/// Configuration of a [`Bridge`](crate::Bridge).
#[derive(Debug, Clone)]
pub struct BridgeConfig {
	/// Largest number of parameters a procedure may declare. Sizes the shared
	/// marshaling area.
	///
	/// Default: 255 (the ABI maximum)
	pub max_parameters: usize,

	/// Initial capacity of the function registry.
	///
	/// Default: 59
	pub registry_capacity: usize,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			max_parameters: MAX_PARAMETERS,
			registry_capacity: 59,
		}
	}
}

impl BridgeConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn max_parameters(mut self, max: usize) -> Self {
		self.max_parameters = max;
		self
	}

	pub fn registry_capacity(mut self, capacity: usize) -> Self {
		self.registry_capacity = capacity;
		self
	}

	pub fn validate(&self) -> Result<()> {
		if self.max_parameters == 0 || self.max_parameters > MAX_PARAMETERS {
			return Err(Error::Configuration(format!(
				"max_parameters must be within 1..={MAX_PARAMETERS}, got {}",
				self.max_parameters
			)));
		}
		Ok(())
	}
}
