//! Aggregate statistics over student return records.
//!
//! A single pass over the filtered records fills fixed-size tallies indexed
//! by enum position; the tallies are then shaped into a [`DashboardBundle`].
//! Fixed-domain tables are total (every bucket present, zero-filled); the
//! per-major tables list only majors that occur in the filtered set.

use super::bundle::{
    ClassMajorRateMatrix, CountSeries, DashboardBundle, GenderCounts, GenderStatusTable,
    MethodClassMatrix, RateSeries, StatusCounts, StatusSeries,
};
use crate::filter::ReportFilter;
use crate::models::{
    ClassYear, Gender, LabelStyle, Labeled, Major, ReturnMethod, ReturnStatus, StudentRecord,
    DATE_FORMAT,
};
use chrono::{Duration, NaiveDate, Timelike};
use std::collections::BTreeMap;

/// Days in the daily trend window, ending today.
pub const DAILY_WINDOW_DAYS: usize = 7;

/// Width of a time-of-day bucket in hours.
pub const HOURS_PER_WINDOW: u32 = 4;

/// Time-of-day bucket labels. Bucket `i` covers hours `[4i, 4i + 4)`.
pub const TIME_WINDOWS: [&str; 6] = [
    "00:00-04:00",
    "04:00-08:00",
    "08:00-12:00",
    "12:00-16:00",
    "16:00-20:00",
    "20:00-24:00",
];

const STATUSES: usize = 3;
const CLASSES: usize = 4;
const METHODS: usize = 5;
const GENDERS: usize = 2;

/// Inputs that are not records.
#[derive(Debug, Clone, Copy)]
pub struct AggregateOptions {
    /// Last day of the daily trend window.
    pub today: NaiveDate,
    /// Which string to use for table labels.
    pub label_style: LabelStyle,
}

/// Filter `records` and compute the full bundle.
pub fn aggregate(
    records: &[StudentRecord],
    filter: &ReportFilter,
    options: AggregateOptions,
) -> DashboardBundle {
    summarize(filter.apply(records), options)
}

/// Compute the bundle over records that already passed a filter.
pub fn summarize<'a, I>(records: I, options: AggregateOptions) -> DashboardBundle
where
    I: IntoIterator<Item = &'a StudentRecord>,
{
    let mut tally = Tally::new(options.today);
    for record in records {
        tally.add(record);
    }
    tally.into_bundle(options)
}

/// `part / whole * 100`, rounded to 2 decimals; 0 when `whole` is 0.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 / whole as f64 * 100.0)
}

/// Ties go to the even last digit: 3.125 -> 3.12.
fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Time-of-day bucket for an hour, half-open `[h0, h1)`.
pub fn time_window(hour: u32) -> usize {
    ((hour / HOURS_PER_WINDOW) as usize).min(TIME_WINDOWS.len() - 1)
}

/// The calendar days of the trend window, oldest first.
pub fn daily_window(today: NaiveDate) -> Vec<NaiveDate> {
    (0..DAILY_WINDOW_DAYS as i64)
        .rev()
        .map(|back| today - Duration::days(back))
        .collect()
}

struct Tally {
    window_start: NaiveDate,
    total: usize,
    status: [usize; STATUSES],
    class_status: [[usize; STATUSES]; CLASSES],
    major_status: BTreeMap<Major, [usize; STATUSES]>,
    method: [usize; METHODS],
    daily: [usize; DAILY_WINDOW_DAYS],
    gender: [usize; GENDERS],
    gender_status: [[usize; STATUSES]; GENDERS],
    hours: [usize; TIME_WINDOWS.len()],
    /// (total, returned) per class year, per major.
    class_major: BTreeMap<Major, [(usize, usize); CLASSES]>,
    method_class: [[usize; CLASSES]; METHODS],
}

impl Tally {
    fn new(today: NaiveDate) -> Self {
        Self {
            window_start: today - Duration::days(DAILY_WINDOW_DAYS as i64 - 1),
            total: 0,
            status: [0; STATUSES],
            class_status: [[0; STATUSES]; CLASSES],
            major_status: BTreeMap::new(),
            method: [0; METHODS],
            daily: [0; DAILY_WINDOW_DAYS],
            gender: [0; GENDERS],
            gender_status: [[0; STATUSES]; GENDERS],
            hours: [0; TIME_WINDOWS.len()],
            class_major: BTreeMap::new(),
            method_class: [[0; CLASSES]; METHODS],
        }
    }

    fn add(&mut self, record: &StudentRecord) {
        let s = record.return_status.index();
        let c = record.class_year.index();
        let g = record.gender.index();
        let returned = record.is_returned();

        self.total += 1;
        self.status[s] += 1;
        self.class_status[c][s] += 1;
        self.major_status.entry(record.major.clone()).or_default()[s] += 1;
        self.gender[g] += 1;
        self.gender_status[g][s] += 1;

        let cell = &mut self
            .class_major
            .entry(record.major.clone())
            .or_insert([(0, 0); CLASSES])[c];
        cell.0 += 1;
        if returned {
            cell.1 += 1;
        }

        if !returned {
            return;
        }

        if let Some(method) = record.return_method {
            self.method[method.index()] += 1;
            self.method_class[method.index()][c] += 1;
        }

        if let Some(time) = record.return_time {
            self.hours[time_window(time.hour())] += 1;

            let offset = (time.date() - self.window_start).num_days();
            if (0..DAILY_WINDOW_DAYS as i64).contains(&offset) {
                self.daily[offset as usize] += 1;
            }
        }
    }

    fn into_bundle(self, options: AggregateOptions) -> DashboardBundle {
        let style = options.label_style;
        let total = self.total;
        let status = StatusCounts::from_array(self.status);

        let class_labels: Vec<String> = ClassYear::ALL.iter().map(|c| c.text(style)).collect();
        let method_labels: Vec<String> =
            ReturnMethod::ALL.iter().map(|m| m.text(style)).collect();

        let mut class_status_data = StatusSeries::default();
        let mut class_return_rate_data = RateSeries::default();
        for class in ClassYear::ALL {
            let counts = StatusCounts::from_array(self.class_status[class.index()]);
            class_status_data.push(class.text(style), counts);
            push_rate(&mut class_return_rate_data, class.text(style), counts);
        }

        let mut major_data = StatusSeries::default();
        let mut major_rates = Vec::with_capacity(self.major_status.len());
        for (major, counts) in &self.major_status {
            let counts = StatusCounts::from_array(*counts);
            major_data.push(major.text(style), counts);
            major_rates.push((major.text(style), counts));
        }

        // Stable: equal rates keep the per-major order above.
        major_rates.sort_by(|a, b| {
            rate_of(&b.1)
                .partial_cmp(&rate_of(&a.1))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut major_return_rate_data = RateSeries::default();
        for (label, counts) in major_rates {
            push_rate(&mut major_return_rate_data, label, counts);
        }

        let daily_return_data = CountSeries {
            labels: daily_window(options.today)
                .iter()
                .map(|d| d.format(DATE_FORMAT).to_string())
                .collect(),
            data: self.daily.to_vec(),
        };

        let gender_status = |g: Gender| StatusCounts::from_array(self.gender_status[g.index()]);

        let mut matrix_majors: Vec<Major> = Major::KNOWN.to_vec();
        matrix_majors.extend(
            self.class_major
                .keys()
                .filter(|m| m.known_index().is_none())
                .cloned(),
        );
        let class_major_return_rate_data = ClassMajorRateMatrix {
            class_labels: class_labels.clone(),
            major_labels: matrix_majors.iter().map(|m| m.text(style)).collect(),
            data: matrix_majors
                .iter()
                .map(|major| match self.class_major.get(major) {
                    Some(cells) => cells
                        .iter()
                        .map(|(total, returned)| percentage(*returned, *total))
                        .collect(),
                    None => vec![0.0; CLASSES],
                })
                .collect(),
        };

        DashboardBundle {
            total_students: total,
            return_status_data: status,
            class_status_data,
            major_data,
            return_method_data: CountSeries {
                labels: method_labels.clone(),
                data: self.method.to_vec(),
            },
            daily_return_data,
            gender_data: GenderCounts {
                male: self.gender[Gender::Male.index()],
                female: self.gender[Gender::Female.index()],
            },
            return_rate: percentage(status.returned, total),
            not_return_rate: percentage(status.not_returned, total),
            delayed_rate: percentage(status.delayed, total),
            major_return_rate_data,
            class_return_rate_data,
            gender_return_status_data: GenderStatusTable {
                male: gender_status(Gender::Male),
                female: gender_status(Gender::Female),
            },
            return_time_distribution_data: CountSeries {
                labels: TIME_WINDOWS.iter().map(|w| w.to_string()).collect(),
                data: self.hours.to_vec(),
            },
            class_major_return_rate_data,
            method_class_data: MethodClassMatrix {
                class_labels,
                method_labels,
                data: self.method_class.iter().map(|row| row.to_vec()).collect(),
            },
        }
    }
}

fn rate_of(counts: &StatusCounts) -> f64 {
    percentage(counts.get(ReturnStatus::Returned), counts.total())
}

fn push_rate(series: &mut RateSeries, label: String, counts: StatusCounts) {
    series.labels.push(label);
    series.rates.push(rate_of(&counts));
    series.total.push(counts.total());
    series.returned.push(counts.returned);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::RawFilter;
    use crate::models::parse_return_time;
    use crate::models::tests::record;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 20).unwrap()
    }

    fn options() -> AggregateOptions {
        AggregateOptions {
            today: today(),
            label_style: LabelStyle::Code,
        }
    }

    fn returned_at(id: &str, class_year: ClassYear, at: &str, method: ReturnMethod) -> StudentRecord {
        let mut r = record(id, class_year, Major::Computer, ReturnStatus::Returned);
        r.return_time = Some(parse_return_time(at).unwrap());
        r.return_method = Some(method);
        r
    }

    fn run(records: &[StudentRecord]) -> DashboardBundle {
        aggregate(records, &ReportFilter::default(), options())
    }

    #[test]
    fn test_rates_for_six_three_one() {
        let mut records = Vec::new();
        for i in 0..6 {
            records.push(record(&i.to_string(), ClassYear::Junior, Major::Civil, ReturnStatus::Returned));
        }
        for i in 6..9 {
            records.push(record(&i.to_string(), ClassYear::Junior, Major::Civil, ReturnStatus::NotReturned));
        }
        records.push(record("9", ClassYear::Junior, Major::Civil, ReturnStatus::Delayed));

        let bundle = run(&records);
        assert_eq!(bundle.total_students, 10);
        assert_eq!(bundle.return_rate, 60.0);
        assert_eq!(bundle.not_return_rate, 30.0);
        assert_eq!(bundle.delayed_rate, 10.0);
        assert_eq!(bundle.return_status_data.total(), bundle.total_students);
    }

    #[test]
    fn test_empty_input_is_zero_filled() {
        let bundle = run(&[]);
        assert_eq!(bundle.total_students, 0);
        assert_eq!(bundle.return_status_data, StatusCounts::default());
        assert_eq!(bundle.return_rate, 0.0);
        assert_eq!(bundle.not_return_rate, 0.0);
        assert_eq!(bundle.delayed_rate, 0.0);

        assert_eq!(bundle.class_status_data.labels.len(), 4);
        assert_eq!(bundle.class_status_data.returned, vec![0; 4]);
        assert_eq!(bundle.class_status_data.total, vec![0; 4]);
        assert_eq!(bundle.class_return_rate_data.rates, vec![0.0; 4]);
        assert_eq!(bundle.return_method_data.data, vec![0; 5]);
        assert_eq!(bundle.daily_return_data.data, vec![0; 7]);
        assert_eq!(bundle.return_time_distribution_data.data, vec![0; 6]);
        assert_eq!(bundle.class_major_return_rate_data.data, vec![vec![0.0; 4]; 6]);
        assert_eq!(bundle.method_class_data.data, vec![vec![0; 4]; 5]);
        assert!(bundle.major_data.labels.is_empty());
        assert!(bundle.major_return_rate_data.labels.is_empty());
    }

    #[test]
    fn test_major_rates_sorted_descending() {
        let mut records = Vec::new();
        for (i, status) in [
            ReturnStatus::Returned,
            ReturnStatus::Returned,
            ReturnStatus::Delayed,
            ReturnStatus::NotReturned,
        ]
        .into_iter()
        .enumerate()
        {
            records.push(record(&format!("a{}", i), ClassYear::Senior, Major::Computer, status));
        }
        for i in 0..5 {
            let status = if i < 4 {
                ReturnStatus::Returned
            } else {
                ReturnStatus::NotReturned
            };
            records.push(record(&format!("b{}", i), ClassYear::Senior, Major::Business, status));
        }

        let bundle = run(&records);
        let rates = &bundle.major_return_rate_data;
        assert_eq!(rates.labels, vec!["business", "computer"]);
        assert_eq!(rates.rates, vec![80.0, 50.0]);
        assert_eq!(rates.total, vec![5, 4]);
        assert_eq!(rates.returned, vec![4, 2]);

        // The breakdown itself stays in enum order.
        assert_eq!(bundle.major_data.labels, vec!["computer", "business"]);
        assert_eq!(bundle.major_data.total, vec![4, 5]);
        assert_eq!(bundle.major_data.returned, vec![2, 4]);
    }

    #[test]
    fn test_major_rate_ties_keep_enum_order() {
        let records = vec![
            record("1", ClassYear::Senior, Major::Medicine, ReturnStatus::Returned),
            record("2", ClassYear::Senior, Major::Electronics, ReturnStatus::Returned),
            record("3", ClassYear::Senior, Major::Civil, ReturnStatus::Delayed),
        ];
        let bundle = run(&records);
        assert_eq!(
            bundle.major_return_rate_data.labels,
            vec!["electronics", "medicine", "civil"]
        );
    }

    #[test]
    fn test_class_rates_keep_fixed_order() {
        let records = vec![
            record("1", ClassYear::Senior, Major::Civil, ReturnStatus::Returned),
            record("2", ClassYear::Freshman, Major::Civil, ReturnStatus::Delayed),
            record("3", ClassYear::Freshman, Major::Civil, ReturnStatus::Returned),
            record("4", ClassYear::Freshman, Major::Civil, ReturnStatus::Returned),
        ];
        let bundle = run(&records);
        let classes = &bundle.class_return_rate_data;
        assert_eq!(classes.labels, vec!["freshman", "sophomore", "junior", "senior"]);
        assert_eq!(classes.rates, vec![66.67, 0.0, 0.0, 100.0]);
        assert_eq!(classes.total, vec![3, 0, 0, 1]);
        assert_eq!(bundle.class_status_data.delayed, vec![1, 0, 0, 0]);
    }

    #[test]
    fn test_daily_window_has_seven_contiguous_days() {
        let records = vec![
            returned_at("1", ClassYear::Junior, "2024-02-20 09:00:00", ReturnMethod::Train),
            returned_at("2", ClassYear::Junior, "2024-02-14 23:59:59", ReturnMethod::Train),
            returned_at("3", ClassYear::Junior, "2024-02-13 12:00:00", ReturnMethod::Train),
            returned_at("4", ClassYear::Junior, "2024-02-21 12:00:00", ReturnMethod::Train),
        ];
        let bundle = run(&records);
        let daily = &bundle.daily_return_data;
        assert_eq!(daily.labels.len(), 7);
        assert_eq!(daily.labels[0], "2024-02-14");
        assert_eq!(daily.labels[6], "2024-02-20");
        assert_eq!(daily.data, vec![1, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_time_windows_are_half_open() {
        assert_eq!(time_window(0), 0);
        assert_eq!(time_window(3), 0);
        assert_eq!(time_window(4), 1);
        assert_eq!(time_window(8), 2);
        assert_eq!(time_window(16), 4);
        assert_eq!(time_window(20), 5);
        assert_eq!(time_window(23), 5);

        let records = vec![
            returned_at("1", ClassYear::Junior, "2024-02-20 04:00:00", ReturnMethod::Bus),
            returned_at("2", ClassYear::Junior, "2024-02-20 03:59:59", ReturnMethod::Bus),
            returned_at("3", ClassYear::Junior, "2024-02-20 23:10:00", ReturnMethod::Bus),
        ];
        let bundle = run(&records);
        assert_eq!(bundle.return_time_distribution_data.data, vec![1, 1, 0, 0, 0, 1]);
    }

    #[test]
    fn test_method_tables_only_count_returned() {
        let mut stale = record("x", ClassYear::Freshman, Major::Civil, ReturnStatus::NotReturned);
        stale.return_method = Some(ReturnMethod::Plane);
        let mut no_method = record("y", ClassYear::Freshman, Major::Civil, ReturnStatus::Returned);
        no_method.return_method = None;

        let records = vec![
            returned_at("1", ClassYear::Sophomore, "2024-02-19 10:00:00", ReturnMethod::Plane),
            returned_at("2", ClassYear::Senior, "2024-02-19 10:00:00", ReturnMethod::PrivateCar),
            stale,
            no_method,
        ];
        let bundle = run(&records);
        assert_eq!(bundle.return_method_data.data, vec![0, 1, 0, 1, 0]);
        assert_eq!(bundle.method_class_data.data[1], vec![0, 1, 0, 0]);
        assert_eq!(bundle.method_class_data.data[3], vec![0, 0, 0, 1]);
        // The returned record without a time contributes to no time table.
        assert_eq!(bundle.return_time_distribution_data.total(), 2);
    }

    #[test]
    fn test_gender_tables() {
        let mut f = record("1", ClassYear::Junior, Major::Civil, ReturnStatus::Delayed);
        f.gender = Gender::Female;
        let records = vec![
            f,
            record("2", ClassYear::Junior, Major::Civil, ReturnStatus::Returned),
            record("3", ClassYear::Junior, Major::Civil, ReturnStatus::Returned),
        ];
        let bundle = run(&records);
        assert_eq!(bundle.gender_data, GenderCounts { male: 2, female: 1 });
        assert_eq!(bundle.gender_return_status_data.male.returned, 2);
        assert_eq!(bundle.gender_return_status_data.female.delayed, 1);
        assert_eq!(bundle.gender_return_status_data.female.returned, 0);
    }

    #[test]
    fn test_class_major_matrix_includes_unknown_majors() {
        let astro = Major::Other("astronomy".to_string());
        let records = vec![
            record("1", ClassYear::Freshman, Major::Computer, ReturnStatus::Returned),
            record("2", ClassYear::Freshman, Major::Computer, ReturnStatus::Delayed),
            record("3", ClassYear::Freshman, Major::Computer, ReturnStatus::Delayed),
            record("4", ClassYear::Junior, astro.clone(), ReturnStatus::Returned),
        ];
        let bundle = run(&records);
        let matrix = &bundle.class_major_return_rate_data;
        assert_eq!(matrix.major_labels.len(), 7);
        assert_eq!(matrix.major_labels[6], "astronomy");
        assert_eq!(matrix.data[0], vec![33.33, 0.0, 0.0, 0.0]);
        assert_eq!(matrix.data[6], vec![0.0, 0.0, 100.0, 0.0]);
        assert_eq!(bundle.major_data.labels, vec!["computer", "astronomy"]);
    }

    #[test]
    fn test_display_labels() {
        let records = vec![record("1", ClassYear::Freshman, Major::Medicine, ReturnStatus::Returned)];
        let bundle = aggregate(
            &records,
            &ReportFilter::default(),
            AggregateOptions {
                today: today(),
                label_style: LabelStyle::Display,
            },
        );
        assert_eq!(bundle.class_status_data.labels[0], "大一");
        assert_eq!(bundle.return_method_data.labels[3], "私家车");
        assert_eq!(bundle.major_data.labels, vec!["临床医学"]);
    }

    #[test]
    fn test_filter_is_applied_before_counting() {
        let records = vec![
            returned_at("1", ClassYear::Junior, "2024-02-18 10:00:00", ReturnMethod::Bus),
            returned_at("2", ClassYear::Senior, "2024-02-18 10:00:00", ReturnMethod::Bus),
            record("3", ClassYear::Junior, Major::Civil, ReturnStatus::Delayed),
        ];
        let filter = ReportFilter::parse(&RawFilter {
            class_status: vec!["junior".into()],
            ..RawFilter::default()
        })
        .unwrap();
        let bundle = aggregate(&records, &filter, options());
        assert_eq!(bundle.total_students, 2);
        assert_eq!(bundle.return_rate, 50.0);
        assert_eq!(bundle.class_status_data.grand_total(), 2);
        assert_eq!(bundle.major_data.grand_total(), 2);
        assert_eq!(bundle.gender_data.male + bundle.gender_data.female, 2);
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(5, 5), 100.0);
        // Exact halves.
        assert_eq!(percentage(1, 32), 3.12);
        assert_eq!(percentage(5, 32), 15.62);
        assert_eq!(percentage(3, 32), 9.38);
    }
}
