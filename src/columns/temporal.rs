use std::sync::Arc;

use chrono::{DateTime, NaiveTime, TimeZone, Utc};

use crate::columns::{fill_positions, AnyValue};

/// Sentinel marking a missing temporal value in the dense backing stores.
pub(crate) const MISSING_INSTANT: i64 = i64::MIN;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Column of instants, stored as seconds since the epoch plus subsecond nanoseconds. Instants
/// are object readable and sortable, but expose no numeric view.
#[derive(Debug, Clone)]
pub struct DateTimeColumn {
    seconds: Vec<i64>,
    nanos: Vec<u32>,
}

impl DateTimeColumn {
    pub(crate) fn new(seconds: Vec<i64>, nanos: Vec<u32>) -> Self {
        debug_assert_eq!(seconds.len(), nanos.len());
        DateTimeColumn { seconds, nanos }
    }

    pub fn len(&self) -> usize {
        self.seconds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seconds.is_empty()
    }

    /// Instant stored at `row`, `None` if missing.
    pub fn get(&self, row: usize) -> Option<DateTime<Utc>> {
        if self.seconds[row] == MISSING_INSTANT {
            None
        } else {
            Utc.timestamp_opt(self.seconds[row], self.nanos[row]).single()
        }
    }

    pub(crate) fn fill_objects(
        &self,
        dst: &mut [Option<AnyValue>],
        start_row: usize,
        offset: usize,
        stride: usize,
    ) {
        for (target, row) in fill_positions(dst.len(), self.len(), start_row, offset, stride) {
            dst[target] = self.get(row).map(|instant| Arc::new(instant) as AnyValue);
        }
    }
}

/// Column of times of day, stored as nanoseconds since midnight. Times expose their
/// nanosecond value as numeric view, so they take part in numeric transformations.
#[derive(Debug, Clone)]
pub struct TimeColumn {
    nanos: Vec<i64>,
}

impl TimeColumn {
    pub(crate) fn new(nanos: Vec<i64>) -> Self {
        TimeColumn { nanos }
    }

    pub fn len(&self) -> usize {
        self.nanos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nanos.is_empty()
    }

    /// Time of day stored at `row`, `None` if missing.
    pub fn get(&self, row: usize) -> Option<NaiveTime> {
        nanos_to_time(self.nanos[row])
    }

    /// Nanoseconds since midnight stored at `row`, `None` if missing.
    pub fn nanos_at(&self, row: usize) -> Option<i64> {
        if self.nanos[row] == MISSING_INSTANT {
            None
        } else {
            Some(self.nanos[row])
        }
    }

    pub(crate) fn fill_numeric(
        &self,
        dst: &mut [f64],
        start_row: usize,
        offset: usize,
        stride: usize,
    ) {
        for (target, row) in fill_positions(dst.len(), self.len(), start_row, offset, stride) {
            let nanos = self.nanos[row];
            dst[target] = if nanos == MISSING_INSTANT {
                f64::NAN
            } else {
                nanos as f64
            };
        }
    }

    pub(crate) fn fill_objects(
        &self,
        dst: &mut [Option<AnyValue>],
        start_row: usize,
        offset: usize,
        stride: usize,
    ) {
        for (target, row) in fill_positions(dst.len(), self.len(), start_row, offset, stride) {
            dst[target] = nanos_to_time(self.nanos[row]).map(|time| Arc::new(time) as AnyValue);
        }
    }
}

pub(crate) fn time_to_nanos(time: NaiveTime) -> i64 {
    use chrono::Timelike;
    time.num_seconds_from_midnight() as i64 * NANOS_PER_SECOND + time.nanosecond() as i64
}

pub(crate) fn nanos_to_time(nanos: i64) -> Option<NaiveTime> {
    if nanos == MISSING_INSTANT {
        return None;
    }
    NaiveTime::from_num_seconds_from_midnight_opt(
        (nanos / NANOS_PER_SECOND) as u32,
        (nanos % NANOS_PER_SECOND) as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_round_trips_through_nanos() {
        let time = NaiveTime::from_hms_nano_opt(13, 37, 11, 500).unwrap();
        assert_eq!(Some(time), nanos_to_time(time_to_nanos(time)));
    }

    #[test]
    fn missing_time_reads_as_nan() {
        let column = TimeColumn::new(vec![MISSING_INSTANT, 42]);
        let mut dst = [0.0; 2];
        column.fill_numeric(&mut dst, 0, 0, 1);
        assert!(dst[0].is_nan());
        assert_eq!(42.0, dst[1]);
    }

    #[test]
    fn instants_resolve_to_chrono_values() {
        let column = DateTimeColumn::new(vec![1_700_000_000, MISSING_INSTANT], vec![500, 0]);
        let instant = column.get(0).unwrap();
        assert_eq!(1_700_000_000, instant.timestamp());
        assert_eq!(500, instant.timestamp_subsec_nanos());
        assert!(column.get(1).is_none());
    }
}
