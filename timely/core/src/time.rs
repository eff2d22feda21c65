//! Sample time normalisation.
//!
//! Every path that sends a time to the store goes through [`coerce_to_id`]:
//! wall-clock inputs become milliseconds since the epoch, rounded to the
//! nearest millisecond; numbers are truncated to an integer.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, TimeZone};
use timely_proto::prelude::Ele;

pub trait SampleTime {
    fn sample_time(&self) -> i64;
}

pub fn coerce_to_id<T: SampleTime + ?Sized>(value: &T) -> i64 {
    value.sample_time()
}

// Round half away from zero.
fn nanos_to_millis(nanos: i128) -> i64 {
    let millis = nanos / 1_000_000;
    let rest = nanos % 1_000_000;
    let millis = if rest.abs() >= 500_000 {
        millis + rest.signum()
    } else {
        millis
    };
    i64::try_from(millis).unwrap_or(if millis < 0 { i64::MIN } else { i64::MAX })
}

impl<Tz: TimeZone> SampleTime for DateTime<Tz> {
    fn sample_time(&self) -> i64 {
        let nanos =
            self.timestamp() as i128 * 1_000_000_000 + self.timestamp_subsec_nanos() as i128;
        nanos_to_millis(nanos)
    }
}

impl SampleTime for SystemTime {
    fn sample_time(&self) -> i64 {
        match self.duration_since(UNIX_EPOCH) {
            Ok(after) => nanos_to_millis(after.as_nanos() as i128),
            Err(before) => nanos_to_millis(-(before.duration().as_nanos() as i128)),
        }
    }
}

macro_rules! impl_sample_time_for_int {
    ($($ty:ty),*) => {
        $(
            impl SampleTime for $ty {
                fn sample_time(&self) -> i64 {
                    i64::try_from(*self).unwrap_or(i64::MAX)
                }
            }
        )*
    };
}

impl_sample_time_for_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl SampleTime for f64 {
    fn sample_time(&self) -> i64 {
        self.trunc() as i64
    }
}

impl SampleTime for f32 {
    fn sample_time(&self) -> i64 {
        self.trunc() as i64
    }
}

impl SampleTime for str {
    fn sample_time(&self) -> i64 {
        leading_integer(self)
    }
}

impl SampleTime for String {
    fn sample_time(&self) -> i64 {
        leading_integer(self)
    }
}

impl SampleTime for Ele {
    fn sample_time(&self) -> i64 {
        match self {
            Ele::Int(x) => *x,
            Ele::Text(s) => leading_integer(s),
            Ele::Nil => 0,
        }
    }
}

impl<T: SampleTime + ?Sized> SampleTime for &T {
    fn sample_time(&self) -> i64 {
        (**self).sample_time()
    }
}

/// Integer prefix of `s` (`"1000ms"` is 1000, `"-5.9"` is -5); 0 when there is none.
fn leading_integer(s: &str) -> i64 {
    let s = s.trim_start();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end]
        .parse::<i64>()
        .map(|x| sign * x)
        .unwrap_or(0)
}
