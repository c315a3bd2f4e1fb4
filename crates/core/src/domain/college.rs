use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::actor::ActorId;

/// A college is owned by exactly one principal and lists its departments by name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct College {
    pub name: String,
    pub address: String,
    pub city: String,
    pub zip_code: String,
    pub principal_id: ActorId,
    pub departments: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl College {
    pub fn has_department(&self, department: &str) -> bool {
        let wanted = department.trim();
        self.departments.iter().any(|name| name.eq_ignore_ascii_case(wanted))
    }

    /// Canonical spelling of a department name as registered on this college.
    pub fn canonical_department(&self, department: &str) -> Option<&str> {
        let wanted = department.trim();
        self.departments.iter().find(|name| name.eq_ignore_ascii_case(wanted)).map(String::as_str)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollegeRegistration {
    pub name: String,
    pub address: String,
    pub city: String,
    pub zip_code: String,
    pub departments: Vec<String>,
}

/// Editable college details. The name keys actors and requests, so it stays fixed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollegeUpdate {
    pub address: String,
    pub city: String,
    pub zip_code: String,
    pub departments: Vec<String>,
}
