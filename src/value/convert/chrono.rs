// Copyright (c) 2021 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! This module implements conversion from `Value` for `chrono` types.

use ::chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::{
    binlog::time::{Temporal, TemporalKind},
    value::Value,
};

use super::FromValueError;

fn naive_date(t: &Temporal) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(t.year as i32, t.month, t.day)
}

fn naive_time(t: &Temporal) -> Option<NaiveTime> {
    NaiveTime::from_hms_micro_opt(t.hour, t.minute, t.second, t.microsecond)
}

impl TryFrom<Value> for NaiveDateTime {
    type Error = FromValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Temporal(ref t) if t.kind != TemporalKind::Time => naive_date(t)
                .zip(naive_time(t))
                .map(|(date, time)| NaiveDateTime::new(date, time))
                .ok_or_else(|| FromValueError(value.clone())),
            v => Err(FromValueError(v)),
        }
    }
}

impl TryFrom<Value> for NaiveDate {
    type Error = FromValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Temporal(ref t) if t.kind != TemporalKind::Time => {
                naive_date(t).ok_or_else(|| FromValueError(value.clone()))
            }
            v => Err(FromValueError(v)),
        }
    }
}

/// Only non-negative TIME values below 24 hours convert to `NaiveTime`.
impl TryFrom<Value> for NaiveTime {
    type Error = FromValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Temporal(ref t) if t.kind == TemporalKind::Time && !t.negative => {
                naive_time(t).ok_or_else(|| FromValueError(value.clone()))
            }
            v => Err(FromValueError(v)),
        }
    }
}
