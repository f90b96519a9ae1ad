// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

//! C ABI definitions for the invocation bridge
//!
//! This crate provides the stable C ABI shared between the native bridge and a
//! guest runtime loaded behind it. It defines the layout of the shared parameter
//! area, the guest entry-point vtable and the callback table the guest uses to
//! populate function descriptors while they are being resolved.

// #![cfg_attr(not(debug_assertions), deny(warnings))]

pub mod callbacks;
pub mod constants;
pub mod data;
pub mod guest;

pub use callbacks::{NameSinkFFI, StoreCallbacksFFI};
pub use constants::*;
pub use data::{BufferFFI, ParameterAreaFFI, pack_param_counts, unpack_param_counts};
pub use guest::{CreateRequestFFI, GuestVTableFFI, LoaderKeyFFI, RoutineSpecFFI, UdtSpecFFI};
