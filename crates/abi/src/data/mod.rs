// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

pub mod area;
pub mod buffer;

pub use area::{ParameterAreaFFI, pack_param_counts, unpack_param_counts};
pub use buffer::BufferFFI;
