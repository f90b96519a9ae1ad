// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Value-per-call protocol of set-returning procedures.
//!
//! The first call obtains a row provider from the guest; each call, the first
//! included, asks it for one row. When the provider is exhausted it is closed
//! and the set is marked done.

use std::rc::Rc;

use tracing::{debug, instrument};

use crate::{
	bridge::Bridge,
	call::FunctionCall,
	descriptor::Routine,
	dispatch::nullable,
	error::{Error, Result},
	guest::{GlobalRef, NextRow},
	types::Type,
	value::Datum,
};

impl Bridge {
	#[instrument(name = "bridge::multicall::invoke", level = "trace", skip_all, fields(call = call.set_returning.calls()))]
	pub(crate) fn invoke_set_returning(
		&self,
		routine: &Routine,
		return_type: &Rc<dyn Type>,
		call: &mut FunctionCall,
	) -> Result<Datum> {
		if call.set_returning.is_first_call() {
			let Some(provider) = self.guest.ref_invoke(routine.target())? else {
				call.set_returning.finish();
				call.is_null = true;
				return Ok(Datum::ZERO);
			};
			call.set_returning.start(GlobalRef::new(&self.guest, provider));
			self.guest.delete_local_ref(provider);
		}

		let provider =
			call.set_returning.provider().ok_or_else(|| Error::internal("set-returning call without a row provider"))?;

		match self.guest.next_row(provider)? {
			NextRow::Row(row) => {
				call.set_returning.advance();
				let datum = self.coerce_result(return_type, row)?;
				Ok(nullable(call, datum))
			}
			NextRow::Done => {
				let closed = self.guest.close_provider(provider);
				call.set_returning.finish();
				call.is_null = true;
				debug!(rows = call.set_returning.calls(), "result set done");
				closed.map(|()| Datum::ZERO)
			}
		}
	}
}
