// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Stack of currently executing calls.
//!
//! Each frame records the descriptor being executed and, for a reentrant
//! call, the snapshot of the marshaling area it overwrote. Frames are pushed
//! and popped strictly LIFO through [`InvocationGuard`].

use std::rc::Rc;

use tracing::{debug, error};

use crate::{area::MarshalArea, bridge::Bridge, descriptor::Descriptor};

#[derive(Default)]
pub(crate) struct InvocationFrame {
	descriptor: Option<Rc<Descriptor>>,
	saved_area: Option<Box<MarshalArea>>,
}

#[derive(Default)]
pub(crate) struct InvocationStack {
	frames: Vec<InvocationFrame>,
}

impl InvocationStack {
	fn push(&mut self) {
		self.frames.push(InvocationFrame::default());
	}

	fn pop(&mut self) -> Option<InvocationFrame> {
		self.frames.pop()
	}

	pub(crate) fn set_current(&mut self, descriptor: Rc<Descriptor>) {
		if let Some(frame) = self.frames.last_mut() {
			frame.descriptor = Some(descriptor);
		}
	}

	pub(crate) fn current(&self) -> Option<&Rc<Descriptor>> {
		self.frames.last().and_then(|frame| frame.descriptor.as_ref())
	}

	/// Keep `saved` in the innermost frame; false if there is no frame
	pub(crate) fn save_area(&mut self, saved: Box<MarshalArea>) -> bool {
		match self.frames.last_mut() {
			Some(frame) if frame.saved_area.is_none() => {
				frame.saved_area = Some(saved);
				true
			}
			_ => false,
		}
	}

	pub(crate) fn in_use(&self, descriptor: &Rc<Descriptor>) -> bool {
		self.frames.iter().rev().any(|frame| frame.descriptor.as_ref().is_some_and(|d| Rc::ptr_eq(d, descriptor)))
	}

	pub(crate) fn depth(&self) -> usize {
		self.frames.len()
	}
}

/// An active call; pops its frame and restores any saved area when dropped
pub(crate) struct InvocationGuard<'a> {
	bridge: &'a Bridge,
}

impl<'a> InvocationGuard<'a> {
	pub(crate) fn enter(bridge: &'a Bridge) -> Self {
		bridge.invocations.borrow_mut().push();
		Self {
			bridge,
		}
	}
}

impl Drop for InvocationGuard<'_> {
	fn drop(&mut self) {
		let frame = match self.bridge.invocations.try_borrow_mut() {
			Ok(mut stack) => stack.pop(),
			Err(_) => {
				error!("invocation stack busy, frame not popped");
				return;
			}
		};

		let Some(saved) = frame.and_then(|frame| frame.saved_area) else {
			return;
		};
		match self.bridge.area.try_borrow_mut() {
			Ok(mut area) => area.restore(saved),
			Err(_) => {
				error!("marshaling area busy, saved frame lost");
				return;
			}
		}
		self.bridge.guest.pop_frame();
		debug!("restored marshaling area");
	}
}
