// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Guest runtimes behind the C ABI.
//!
//! [`FfiGuest`] adapts a [`GuestVTableFFI`](callbridge_abi::GuestVTableFFI)
//! to [`GuestRuntime`](crate::GuestRuntime). While the guest resolves a
//! procedure it reaches the bridge's descriptor store through the
//! `extern "C"` callbacks in [`callbacks`], which carry the placeholder token
//! as a `u64`.

mod callbacks;
mod guest;

pub use guest::FfiGuest;
