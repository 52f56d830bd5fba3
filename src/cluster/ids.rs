use std::fmt;
use uuid::Uuid;

/// MemberId identifies one member of the cluster, stable across restarts.
#[derive(Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct MemberId(Uuid);

impl MemberId {
    pub fn new(id: Uuid) -> Self {
        MemberId(id)
    }

    pub fn random() -> Self {
        MemberId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Debug for MemberId {
    // Full uuids make log lines unreadable; the first 8 hex chars are plenty
    // to tell members apart.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemberId{{{}}}", &self.0.as_simple().to_string()[..8])
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ClusterId identifies the cluster a message belongs to, so a member that
/// wandered into the wrong cluster can be told apart from a corrupt stream.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct ClusterId(Uuid);

impl ClusterId {
    pub fn new(id: Uuid) -> Self {
        ClusterId(id)
    }

    pub fn random() -> Self {
        ClusterId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}
