// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

/// Raw view of the shared parameter area handed to the guest once at startup
///
/// The memory stays valid and at the same address for the lifetime of the
/// bridge. The guest reads the header, consumes `references`/`primitives`
/// parameters, clears the header and writes a primitive return value into
/// `primitives[0]`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ParameterAreaFFI {
	/// Packed parameter counts, see [`pack_param_counts`]; zero when no call
	/// is in flight
	pub header: *mut u16,
	/// Primitive slots (64-bit each)
	pub primitives: *mut u64,
	pub primitive_count: usize,
	/// Reference slots (guest object handles, 0 = null)
	pub references: *mut u64,
	pub reference_count: usize,
}

/// Pack reference and primitive parameter counts into the area header
pub const fn pack_param_counts(references: u8, primitives: u8) -> u16 {
	((references as u16) << 8) | primitives as u16
}

/// Split an area header into `(references, primitives)`
pub const fn unpack_param_counts(header: u16) -> (u8, u8) {
	((header >> 8) as u8, (header & 0xff) as u8)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_pack_places_references_in_high_byte() {
		assert_eq!(pack_param_counts(1, 2), 0x0102);
		assert_eq!(pack_param_counts(0, 0), 0);
		assert_eq!(pack_param_counts(255, 255), 0xffff);
	}

	#[test]
	fn test_unpack_inverts_pack() {
		assert_eq!(unpack_param_counts(pack_param_counts(3, 7)), (3, 7));
		assert_eq!(unpack_param_counts(0x0100), (1, 0));
	}
}
