// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

use core::{ptr::null, slice, str};

/// FFI-safe byte buffer
///
/// Buffers passed into a call are borrowed for the duration of that call only.
/// Buffers returned by the guest (`udt_to_string`, `udt_write`, `last_error`)
/// are owned by the guest and must be handed back through
/// `GuestVTableFFI::free_buffer`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct BufferFFI {
	/// Pointer to the first byte
	pub ptr: *const u8,
	/// Length in bytes
	pub len: usize,
	/// Capacity of the owning allocation (0 for borrowed buffers)
	pub cap: usize,
}

impl BufferFFI {
	/// Create an empty buffer
	pub const fn empty() -> Self {
		Self {
			ptr: null(),
			len: 0,
			cap: 0,
		}
	}

	/// Borrow a byte slice
	pub fn from_slice(bytes: &[u8]) -> Self {
		Self {
			ptr: bytes.as_ptr(),
			len: bytes.len(),
			cap: 0,
		}
	}

	/// Borrow a string
	pub fn from_str(s: &str) -> Self {
		Self::from_slice(s.as_bytes())
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0 || self.ptr.is_null()
	}

	/// View the buffer as a byte slice
	///
	/// # Safety
	/// `ptr` must be valid for `len` bytes for the lifetime `'a`.
	pub unsafe fn as_slice<'a>(&self) -> &'a [u8] {
		if self.is_empty() {
			return &[];
		}
		// SAFETY: caller guarantees ptr/len describe live memory
		unsafe { slice::from_raw_parts(self.ptr, self.len) }
	}

	/// View the buffer as UTF-8 text
	///
	/// # Safety
	/// Same as [`BufferFFI::as_slice`].
	pub unsafe fn as_str<'a>(&self) -> Result<&'a str, str::Utf8Error> {
		str::from_utf8(unsafe { self.as_slice() })
	}
}

impl Default for BufferFFI {
	fn default() -> Self {
		Self::empty()
	}
}
