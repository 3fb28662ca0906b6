use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HcpId(pub i64);

impl std::fmt::Display for HcpId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Healthcare provider contact. Read-only from the agent's point of view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hcp {
    pub id: HcpId,
    pub name: String,
    pub specialty: Option<String>,
    pub organization: Option<String>,
}

impl Hcp {
    pub fn display_name(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHcp {
    pub name: String,
    pub specialty: Option<String>,
    pub organization: Option<String>,
}
