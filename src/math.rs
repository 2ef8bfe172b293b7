/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Checked amount arithmetic. Overflow is an error, never a wrap.

use crate::{executor::TxError, types::ids::Amount};

pub(crate) fn add(a: Amount, b: Amount) -> Result<Amount, TxError> {
    a.checked_add(b).ok_or(TxError::Overflow)
}

pub(crate) fn sub(a: Amount, b: Amount) -> Result<Amount, TxError> {
    a.checked_sub(b).ok_or(TxError::Overflow)
}

pub(crate) fn sum<I: IntoIterator<Item = Amount>>(amounts: I) -> Result<Amount, TxError> {
    amounts.into_iter().try_fold(0, add)
}
