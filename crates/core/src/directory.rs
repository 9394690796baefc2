//! Employee directory snapshot
//!
//! A read-only, in-memory index over the employee directory, built once per
//! reconciliation run and shared across all records in the run. Avoids a
//! directory lookup per license.

use std::collections::HashMap;

use seatsync_domain::Employee;

/// In-memory directory index for one run
#[derive(Debug, Default)]
pub struct DirectorySnapshot {
    employees: Vec<Employee>,
    email_index: HashMap<String, usize>,
    local_part_index: HashMap<String, Vec<usize>>,
}

impl DirectorySnapshot {
    /// Build the index from directory rows.
    ///
    /// Emails are case-folded; on duplicate emails the first row wins (the
    /// directory sync enforces uniqueness upstream).
    pub fn new(employees: Vec<Employee>) -> Self {
        let mut email_index = HashMap::with_capacity(employees.len());
        let mut local_part_index: HashMap<String, Vec<usize>> = HashMap::new();

        for (idx, employee) in employees.iter().enumerate() {
            let email = employee.email_key();
            if let Some(local_part) = email.split('@').next() {
                if !local_part.is_empty() {
                    local_part_index.entry(local_part.to_string()).or_default().push(idx);
                }
            }
            email_index.entry(email).or_insert(idx);
        }

        Self { employees, email_index, local_part_index }
    }

    /// Exact lookup by case-folded email.
    pub fn by_email(&self, email: &str) -> Option<&Employee> {
        let key = email.trim().to_lowercase();
        self.email_index.get(&key).map(|&idx| &self.employees[idx])
    }

    /// All employees whose email local-part equals the given one.
    pub fn by_local_part(&self, local_part: &str) -> Vec<&Employee> {
        let key = local_part.trim().to_lowercase();
        self.local_part_index
            .get(&key)
            .map(|indices| indices.iter().map(|&idx| &self.employees[idx]).collect())
            .unwrap_or_default()
    }

    /// Active employees, for fuzzy name scanning.
    pub fn active(&self) -> impl Iterator<Item = &Employee> {
        self.employees.iter().filter(|employee| employee.is_active())
    }

    pub fn len(&self) -> usize {
        self.employees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.employees.is_empty()
    }
}
