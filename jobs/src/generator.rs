//! Synthetic employee records.

use crate::employee::{AGE_RANGE, DEPARTMENTS, Employee, ID_RANGE, NAMES, SALARY_RANGE};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tally_common::{CommonError, Result};
use tracing::{debug, info};

/// Draws independent, uniformly distributed employees.
///
/// Every field is sampled on its own from the fixed domains in
/// [`crate::employee`]; ids may repeat.
#[derive(Debug, Clone)]
pub struct EmployeeGenerator {
    rng: StdRng,
    seed: Option<u64>,
}

impl EmployeeGenerator {
    /// A generator seeded with `seed`, or from the operating system when `None`.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { rng, seed }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(Some(seed))
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn next_employee(&mut self) -> Employee {
        let id = self.rng.random_range(ID_RANGE);
        let name = NAMES[self.rng.random_range(0..NAMES.len())];
        let age = self.rng.random_range(AGE_RANGE);
        let salary = self.rng.random_range(SALARY_RANGE);
        let department = DEPARTMENTS[self.rng.random_range(0..DEPARTMENTS.len())];
        Employee::new(id, name, age, salary, department)
    }

    /// Generates `count` employees. Zero is a configuration error.
    pub fn generate(&mut self, count: usize) -> Result<Vec<Employee>> {
        if count == 0 {
            return Err(CommonError::configuration_error(
                "number of records to generate must be at least 1",
            ));
        }

        info!(count, seed = ?self.seed, "Creating sample records");
        let records: Vec<Employee> = self.by_ref().take(count).collect();
        debug!(first = ?records.first(), "generated records");
        Ok(records)
    }
}

impl Iterator for EmployeeGenerator {
    type Item = Employee;

    fn next(&mut self) -> Option<Employee> {
        Some(self.next_employee())
    }
}
