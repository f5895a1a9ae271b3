//! The employee record and the labels derived from it.

use arrow::array::ArrayRef;
use arrow::datatypes::{Field, Schema, SchemaRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tally_core::{ToArrowArray, ToRecordBatch};

pub const DEPARTMENTS: [&str; 5] = ["Engineering", "Sales", "Marketing", "HR", "Finance"];
pub const NAMES: [&str; 8] = [
    "Alice", "Bob", "Charlie", "Diana", "Eve", "Frank", "Grace", "Henry",
];

pub const ID_RANGE: RangeInclusive<i64> = 1..=10_000;
pub const AGE_RANGE: RangeInclusive<i64> = 22..=65;
pub const SALARY_RANGE: RangeInclusive<i64> = 30_000..=150_000;

/// Ages below this are `Young`.
pub const YOUNG_AGE_LIMIT: i64 = 30;
/// Ages below this (and not young) are `Middle`.
pub const MIDDLE_AGE_LIMIT: i64 = 50;
/// Salaries below this are `Low`.
pub const LOW_SALARY_LIMIT: i64 = 50_000;
/// Salaries below this (and not low) are `Medium`.
pub const MEDIUM_SALARY_LIMIT: i64 = 100_000;

/// One synthetic employee. Ids are not unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub age: i64,
    pub salary: i64,
    pub department: String,
}

impl Employee {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        age: i64,
        salary: i64,
        department: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            age,
            salary,
            department: department.into(),
        }
    }

    pub fn age_group(&self) -> AgeGroup {
        AgeGroup::from_age(self.age)
    }

    pub fn salary_category(&self) -> SalaryCategory {
        SalaryCategory::from_salary(self.salary)
    }
}

/// Age band of an employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgeGroup {
    Young,
    Middle,
    Senior,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 3] = [AgeGroup::Young, AgeGroup::Middle, AgeGroup::Senior];

    pub fn from_age(age: i64) -> Self {
        if age < YOUNG_AGE_LIMIT {
            AgeGroup::Young
        } else if age < MIDDLE_AGE_LIMIT {
            AgeGroup::Middle
        } else {
            AgeGroup::Senior
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::Young => "Young",
            AgeGroup::Middle => "Middle",
            AgeGroup::Senior => "Senior",
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SalaryCategory {
    Low,
    Medium,
    High,
}

impl SalaryCategory {
    pub const ALL: [SalaryCategory; 3] = [
        SalaryCategory::Low,
        SalaryCategory::Medium,
        SalaryCategory::High,
    ];

    pub fn from_salary(salary: i64) -> Self {
        if salary < LOW_SALARY_LIMIT {
            SalaryCategory::Low
        } else if salary < MEDIUM_SALARY_LIMIT {
            SalaryCategory::Medium
        } else {
            SalaryCategory::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SalaryCategory::Low => "Low",
            SalaryCategory::Medium => "Medium",
            SalaryCategory::High => "High",
        }
    }
}

impl fmt::Display for SalaryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToRecordBatch for Employee {
    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("id", i64::data_type(), false),
            Field::new("name", String::data_type(), false),
            Field::new("age", i64::data_type(), false),
            Field::new("salary", i64::data_type(), false),
            Field::new("department", String::data_type(), false),
        ]))
    }

    fn columns(rows: &[Self]) -> Vec<ArrayRef> {
        vec![
            i64::to_array(rows, |e| e.id),
            String::to_array(rows, |e| e.name.clone()),
            i64::to_array(rows, |e| e.age),
            i64::to_array(rows, |e| e.salary),
            String::to_array(rows, |e| e.department.clone()),
        ]
    }
}
