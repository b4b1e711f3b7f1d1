//! Calendar bucketing
//!
//! This module groups irregular timestamped samples into calendar-aligned buckets.
//! - Bucket membership uses the sample's local date in the given timezone
//! - Cumulative quantities are summed, point quantities are averaged
//! - Buckets without samples are omitted

use crate::types::{Aggregation, BucketedSeries, Granularity, Sample};
use chrono::{Datelike, Days, NaiveDate, TimeZone, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Calendar rules used to align buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    /// Weekday that starts a week bucket
    pub first_weekday: Weekday,
}

impl Default for Calendar {
    fn default() -> Self {
        Self {
            first_weekday: Weekday::Mon,
        }
    }
}

impl Calendar {
    pub fn new(first_weekday: Weekday) -> Self {
        Self { first_weekday }
    }

    /// The first day of the week containing `date`.
    ///
    /// Saturates at `NaiveDate::MIN` for the partial first week of the calendar.
    pub fn start_of_week(&self, date: NaiveDate) -> NaiveDate {
        let offset = (date.weekday().num_days_from_monday() + 7
            - self.first_weekday.num_days_from_monday())
            % 7;
        date.checked_sub_days(Days::new(offset as u64)).unwrap_or(NaiveDate::MIN)
    }

    /// Key of the bucket containing `date`
    pub fn bucket_key(&self, date: NaiveDate, granularity: Granularity) -> NaiveDate {
        match granularity {
            Granularity::Day => date,
            Granularity::Week => self.start_of_week(date),
        }
    }
}

/// Groups samples into a sparse bucketed series
pub struct Bucketer;

impl Bucketer {
    /// Bucket samples by local calendar date in `tz`.
    ///
    /// Non-finite sample values are ignored.
    pub fn bucket<Tz: TimeZone>(
        samples: &[Sample],
        granularity: Granularity,
        aggregation: Aggregation,
        calendar: &Calendar,
        tz: &Tz,
    ) -> BucketedSeries {
        // (sum, count) per bucket key
        let mut accumulators: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();

        for sample in samples.iter().filter(|s| s.value.is_finite()) {
            let local_date = sample.timestamp.with_timezone(tz).date_naive();
            let key = calendar.bucket_key(local_date, granularity);
            let entry = accumulators.entry(key).or_insert((0.0, 0));
            entry.0 += sample.value;
            entry.1 += 1;
        }

        let mut series = BucketedSeries::new(granularity, aggregation);
        for (key, (sum, count)) in accumulators {
            let value = match aggregation {
                Aggregation::Sum => sum,
                Aggregation::Mean => sum / count as f64,
            };
            series.insert(key, value);
        }
        series
    }

    /// Daily totals of a cumulative quantity
    pub fn daily_sum<Tz: TimeZone>(samples: &[Sample], tz: &Tz) -> BucketedSeries {
        Self::bucket(
            samples,
            Granularity::Day,
            Aggregation::Sum,
            &Calendar::default(),
            tz,
        )
    }

    /// Daily averages of a point quantity
    pub fn daily_mean<Tz: TimeZone>(samples: &[Sample], tz: &Tz) -> BucketedSeries {
        Self::bucket(
            samples,
            Granularity::Day,
            Aggregation::Mean,
            &Calendar::default(),
            tz,
        )
    }
}
