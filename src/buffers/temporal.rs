use std::fmt;

use chrono::{DateTime, NaiveTime, Utc};

use crate::{
    buffers::{fmt_buffer, FROZEN_BUFFER},
    columns::{
        nanos_to_time, time_to_nanos, Column, ColumnType, DateTimeColumn, TimeColumn,
        MISSING_INSTANT,
    },
    Error,
};

/// Buffer of times of day, stored as nanoseconds since midnight. Freshly created buffers hold
/// only missing values.
#[derive(Debug)]
pub struct TimeBuffer {
    nanos: Vec<i64>,
    frozen: bool,
}

impl TimeBuffer {
    pub fn new(len: usize) -> Self {
        TimeBuffer {
            nanos: vec![MISSING_INSTANT; len],
            frozen: false,
        }
    }

    pub fn len(&self) -> usize {
        self.nanos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nanos.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<NaiveTime> {
        nanos_to_time(self.nanos[row])
    }

    /// Writes `value` to `row`, `None` marking the row missing.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is frozen or `row` is out of range.
    pub fn set(&mut self, row: usize, value: Option<NaiveTime>) {
        assert!(!self.frozen, "{FROZEN_BUFFER}");
        self.nanos[row] = value.map_or(MISSING_INSTANT, time_to_nanos);
    }

    /// Renders the buffer inert. Idempotent; every mutation afterwards panics.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Seals the buffer into a time column. The requested type must be `Time`.
    pub fn to_column(self, column_type: ColumnType) -> Result<Column, Error> {
        if column_type != ColumnType::Time {
            return Err(Error::TypeMismatch {
                flavor: "Time",
                requested: column_type.name(),
            });
        }
        Ok(Column::Time(TimeColumn::new(self.nanos)))
    }
}

impl fmt::Display for TimeBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_buffer(f, "Time", self.nanos.len(), |row| match self.get(row) {
            Some(time) => time.to_string(),
            None => "?".to_string(),
        })
    }
}

/// Buffer of instants, stored as epoch seconds plus subsecond nanoseconds. Freshly created
/// buffers hold only missing values.
#[derive(Debug)]
pub struct DateTimeBuffer {
    seconds: Vec<i64>,
    nanos: Vec<u32>,
    frozen: bool,
}

impl DateTimeBuffer {
    pub fn new(len: usize) -> Self {
        DateTimeBuffer {
            seconds: vec![MISSING_INSTANT; len],
            nanos: vec![0; len],
            frozen: false,
        }
    }

    pub fn len(&self) -> usize {
        self.seconds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seconds.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<DateTime<Utc>> {
        if self.seconds[row] == MISSING_INSTANT {
            None
        } else {
            DateTime::from_timestamp(self.seconds[row], self.nanos[row])
        }
    }

    /// Writes `value` to `row`, `None` marking the row missing.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is frozen or `row` is out of range.
    pub fn set(&mut self, row: usize, value: Option<DateTime<Utc>>) {
        assert!(!self.frozen, "{FROZEN_BUFFER}");
        match value {
            Some(instant) => {
                self.seconds[row] = instant.timestamp();
                self.nanos[row] = instant.timestamp_subsec_nanos();
            }
            None => {
                self.seconds[row] = MISSING_INSTANT;
                self.nanos[row] = 0;
            }
        }
    }

    /// Renders the buffer inert. Idempotent; every mutation afterwards panics.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Seals the buffer into a date-time column. The requested type must be `DateTime`.
    pub fn to_column(self, column_type: ColumnType) -> Result<Column, Error> {
        if column_type != ColumnType::DateTime {
            return Err(Error::TypeMismatch {
                flavor: "Date-Time",
                requested: column_type.name(),
            });
        }
        Ok(Column::DateTime(DateTimeColumn::new(
            self.seconds,
            self.nanos,
        )))
    }
}

impl fmt::Display for DateTimeBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_buffer(f, "Date-Time", self.seconds.len(), |row| match self.get(row) {
            Some(instant) => instant.to_rfc3339(),
            None => "?".to_string(),
        })
    }
}
