//! Bitemporal series of a single feature.
//!
//! Every point records the logical `time` it describes and the
//! `created_time` at which it was written. Several points may share a
//! `time`; [`Series::as_of`] collapses that history to one value per time.

use std::collections::BTreeMap;

use bytehub_core::DBDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BackendError, Result};
use crate::frame::{Frame, VALUE_COLUMN};
use crate::frequency::Frequency;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub time: DBDateTime,
    pub created_time: DBDateTime,
    pub value: Value,
}

/// Points ordered by `(time, created_time)`; ties keep write order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    points: Vec<Point>,
}

impl Series {
    pub fn new(mut points: Vec<Point>) -> Self {
        points.sort_by(|a, b| {
            a.time
                .cmp(&b.time)
                .then_with(|| a.created_time.cmp(&b.created_time))
        });
        Self { points }
    }

    /// Extract points from a single-value-column frame.
    ///
    /// Rows without a `created_time` are stamped with `now`.
    pub fn from_frame(frame: &Frame, now: DBDateTime) -> Result<Self> {
        let values = match frame.columns() {
            [column] => &column.values,
            columns => {
                return Err(BackendError::InvalidFrame(format!(
                    "expected exactly one value column, got {}",
                    columns.len()
                )))
            }
        };

        let points = frame
            .time()
            .iter()
            .enumerate()
            .map(|(row, time)| {
                let created_time = match frame.created_time() {
                    Some(c) => *c.get(row).ok_or_else(|| short_column("created_time"))?,
                    None => now,
                };
                let value = values.get(row).ok_or_else(|| short_column("value"))?;
                Ok(Point {
                    time: *time,
                    created_time,
                    value: value.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(points))
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Point> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// One point per `time`: the latest recorded at or before `time_travel`,
    /// or the latest overall when no time travel is requested.
    pub fn as_of(self, time_travel: Option<DBDateTime>) -> Series {
        let mut latest: Vec<Point> = Vec::with_capacity(self.points.len());
        for point in self.points {
            if time_travel.is_some_and(|tt| point.created_time > tt) {
                continue;
            }
            match latest.last_mut() {
                Some(prev) if prev.time == point.time => *prev = point,
                _ => latest.push(point),
            }
        }
        Series { points: latest }
    }

    /// Keep points with `from <= time <= to`
    pub fn between(self, from: Option<DBDateTime>, to: Option<DBDateTime>) -> Series {
        let points = self
            .points
            .into_iter()
            .filter(|p| from.map_or(true, |f| p.time >= f) && to.map_or(true, |t| p.time <= t))
            .collect();
        Series { points }
    }

    /// Downsample onto `freq` buckets.
    ///
    /// Expects a collapsed series (see [`Series::as_of`]). Each bucket takes
    /// the last non-null value that falls in it and is labelled with the
    /// bucket start. Buckets between the first and last observation that
    /// hold no value are emitted as `null`.
    pub fn resample(self, freq: Frequency) -> Series {
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return self;
        };
        let first_bucket = freq.bucket_start(first.time);
        let last_bucket = freq.bucket_start(last.time);

        let mut buckets: BTreeMap<DBDateTime, Point> = BTreeMap::new();
        let mut bucket = first_bucket;
        while bucket <= last_bucket {
            buckets.insert(
                bucket,
                Point {
                    time: bucket,
                    created_time: bucket,
                    value: Value::Null,
                },
            );
            match bucket.checked_add_signed(freq.step()) {
                Some(next) => bucket = next,
                None => break,
            }
        }

        for point in self.points.into_iter().filter(|p| !p.value.is_null()) {
            let start = freq.bucket_start(point.time);
            buckets.insert(
                start,
                Point {
                    time: start,
                    ..point
                },
            );
        }

        Series {
            points: buckets.into_values().collect(),
        }
    }

    /// Value of the most recent point, `None` when empty or `null`
    pub fn last_value(&self) -> Option<Value> {
        self.points
            .last()
            .map(|p| p.value.clone())
            .filter(|v| !v.is_null())
    }

    /// Time index plus a single `value` column
    pub fn to_frame(&self) -> Frame {
        let time = self.points.iter().map(|p| p.time).collect();
        let values = self.points.iter().map(|p| p.value.clone()).collect();
        Frame::new(time)
            .with_column(VALUE_COLUMN, values)
            .unwrap_or_default()
    }
}

fn short_column(name: &str) -> BackendError {
    BackendError::InvalidFrame(format!("column {} is shorter than the time index", name))
}
