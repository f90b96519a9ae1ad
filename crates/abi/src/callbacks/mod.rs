// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

pub mod store;

pub use store::{NameSinkFFI, StoreCallbacksFFI};
