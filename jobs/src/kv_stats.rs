//! Key-value aggregation over the employee RDD.
//!
//! Averages are computed combine-then-divide: each record becomes a
//! `(key, (salary, 1))` pair, pairs are summed per key, and only the final
//! sums are divided.

use crate::employee::Employee;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tally_common::Result;
use tally_core::{PairRdd, Rdd};
use tracing::info;

/// Salaries strictly above this count as high.
pub const HIGH_SALARY_THRESHOLD: i64 = 50_000;

/// Row count and mean salary of one group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupAverage {
    pub count: u64,
    pub avg_salary: f64,
}

pub fn department_salary(employee: Employee) -> (String, i64) {
    (employee.department, employee.salary)
}

pub fn age_group_salary(employee: Employee) -> (String, i64) {
    (employee.age_group().as_str().to_string(), employee.salary)
}

pub fn sum_pairs(a: (i64, u64), b: (i64, u64)) -> (i64, u64) {
    (a.0 + b.0, a.1 + b.1)
}

/// Per-key `(salary sum, row count)`.
fn salary_totals(pairs: Rdd<(String, i64)>) -> Rdd<(String, (i64, u64))> {
    let num_partitions = pairs.num_partitions();
    pairs
        .map_values(|salary| (salary, 1u64))
        .reduce_by_key(sum_pairs, num_partitions)
}

/// Number of employees earning more than [`HIGH_SALARY_THRESHOLD`].
pub fn high_salary_count(records: &Rdd<Employee>) -> Result<usize> {
    Ok(records
        .filter(|e| e.salary > HIGH_SALARY_THRESHOLD)
        .count()?)
}

pub fn average_salary_by_department(records: &Rdd<Employee>) -> Result<BTreeMap<String, f64>> {
    let averages = salary_totals(records.map(department_salary))
        .map_values(|(sum, count)| sum as f64 / count as f64)
        .collect()?;
    Ok(averages.into_iter().collect())
}

pub fn age_group_stats(records: &Rdd<Employee>) -> Result<BTreeMap<String, GroupAverage>> {
    let stats = salary_totals(records.map(age_group_salary))
        .map_values(|(sum, count)| GroupAverage {
            count,
            avg_salary: sum as f64 / count as f64,
        })
        .collect()?;
    Ok(stats.into_iter().collect())
}

/// Everything the key-value path produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyValueStats {
    pub high_salary_count: usize,
    pub department_avg_salary: BTreeMap<String, f64>,
    pub age_group_stats: BTreeMap<String, GroupAverage>,
}

impl KeyValueStats {
    pub fn compute(records: &Rdd<Employee>) -> Result<Self> {
        let high_salary_count = high_salary_count(records)?;
        info!("High salary employees (>50k): {}", high_salary_count);

        let department_avg_salary = average_salary_by_department(records)?;
        info!("Calculated average salary by department:");
        for (department, avg_salary) in &department_avg_salary {
            info!("  {}: ${:.2}", department, avg_salary);
        }

        let age_group_stats = age_group_stats(records)?;
        info!("Age group statistics:");
        for (age_group, stats) in &age_group_stats {
            info!(
                "  {}: {} employees, avg salary: ${:.2}",
                age_group, stats.count, stats.avg_salary
            );
        }

        Ok(Self {
            high_salary_count,
            department_avg_salary,
            age_group_stats,
        })
    }
}
