// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

pub mod request;
pub mod vtable;

pub use request::{CreateRequestFFI, LoaderKeyFFI, RoutineSpecFFI, UdtSpecFFI};
pub use vtable::GuestVTableFFI;
