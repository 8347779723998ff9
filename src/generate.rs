//! Random test data.
//!
//! Produces a plausible student population: mostly 2021 cohort ids, uniform
//! categorical choices, and for returned students a return time within the
//! last seven days and a transport method.

use crate::models::{ClassYear, Gender, Major, ReturnMethod, ReturnStatus, StudentRecord};
use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Knobs for [`generate`].
#[derive(Debug, Clone, Copy)]
pub struct GenerateOptions {
    pub count: usize,
    /// Fixed seed for reproducible output.
    pub seed: Option<u64>,
    /// Reference time; return times are drawn from the week before it.
    pub now: NaiveDateTime,
}

/// Generate `options.count` records.
pub fn generate(options: GenerateOptions) -> Vec<StudentRecord> {
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    (0..options.count)
        .map(|i| random_record(&mut rng, i, options.now))
        .collect()
}

fn random_record<R: Rng>(rng: &mut R, i: usize, now: NaiveDateTime) -> StudentRecord {
    let cohort = if rng.gen::<f64>() > 0.25 { 2021 } else { 2022 };
    let return_status = pick(rng, ReturnStatus::ALL);

    let (return_time, return_method) = if return_status == ReturnStatus::Returned {
        let back = Duration::days(rng.gen_range(0..=6))
            + Duration::hours(rng.gen_range(0..=23))
            + Duration::minutes(rng.gen_range(0..=59));
        (Some(now - back), Some(pick(rng, ReturnMethod::ALL)))
    } else {
        (None, None)
    };

    StudentRecord {
        student_id: format!("{}{:05}", cohort, i),
        name: format!("学生{}", i + 1),
        gender: pick(rng, Gender::ALL),
        class_year: pick(rng, ClassYear::ALL),
        major: pick(rng, &Major::KNOWN),
        return_status,
        return_time,
        return_method,
        contact: format!("138{}", rng.gen_range(10_000_000..=99_999_999)),
        remarks: String::new(),
    }
}

fn pick<R: Rng, T: Clone>(rng: &mut R, values: &[T]) -> T {
    // `values` is one of the non-empty enum tables.
    values
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| values[0].clone())
}
