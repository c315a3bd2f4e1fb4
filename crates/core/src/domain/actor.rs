use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn generate() -> Self {
        Self(format!("ACT-{}", Uuid::new_v4().simple()))
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Hod,
    VicePrincipal,
    Principal,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Hod => "hod",
            Self::VicePrincipal => "vice_principal",
            Self::Principal => "principal",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Self::Student),
            "hod" => Some(Self::Hod),
            "vice_principal" => Some(Self::VicePrincipal),
            "principal" => Some(Self::Principal),
            _ => None,
        }
    }

    /// Roles that can hold a step in an approval chain.
    pub fn is_approver(&self) -> bool {
        !matches!(self, Self::Student)
    }

    /// HOD authority is department-scoped; the other approver roles cover the whole college.
    pub fn is_department_scoped(&self) -> bool {
        matches!(self, Self::Hod | Self::Student)
    }

    /// The role whose membership requests this role reviews.
    pub fn reviews(&self) -> Option<Role> {
        match self {
            Self::Principal => Some(Self::VicePrincipal),
            Self::VicePrincipal => Some(Self::Hod),
            Self::Hod => Some(Self::Student),
            Self::Student => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessStatus {
    Pending,
    Approved,
    Rejected,
}

impl AccessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// The organizational position an actor's authority is restricted to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub college: String,
    pub department: Option<String>,
}

/// A single-holder position: the HOD of a department or the VP of a college.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Seat {
    pub role: Role,
    pub college: String,
    pub department: Option<String>,
}

impl std::fmt::Display for Seat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.department {
            Some(department) => write!(f, "{} of {} / {department}", self.role, self.college),
            None => write!(f, "{} of {}", self.role, self.college),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub college: Option<String>,
    pub department: Option<String>,
    pub access_status: AccessStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Actor {
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: ActorId::generate(),
            name: name.into(),
            email: email.into(),
            role,
            college: None,
            department: None,
            access_status: AccessStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.access_status == AccessStatus::Approved
    }

    pub fn scope(&self) -> Option<Scope> {
        self.college
            .as_ref()
            .map(|college| Scope { college: college.clone(), department: self.department.clone() })
    }

    /// The seat this actor occupies once approved, if the role has one.
    pub fn seat(&self) -> Option<Seat> {
        let college = self.college.clone()?;
        match self.role {
            Role::Hod => {
                Some(Seat { role: Role::Hod, college, department: self.department.clone() })
            }
            Role::VicePrincipal => {
                Some(Seat { role: Role::VicePrincipal, college, department: None })
            }
            Role::Student | Role::Principal => None,
        }
    }

    pub fn belongs_to_college(&self, college: &str) -> bool {
        self.college.as_deref() == Some(college)
    }

    pub fn belongs_to_department(&self, department: Option<&str>) -> bool {
        department.is_some() && self.department.as_deref() == department
    }
}
