use chrono::{Local, NaiveDateTime, Timelike};

/// A source of sample timestamps.
pub trait Clock {
    // local civil time, whole seconds
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        let now = Local::now().naive_local();
        now.with_nanosecond(0).unwrap_or(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_has_second_precision() {
        assert_eq!(SystemClock.now().nanosecond(), 0);
    }
}
