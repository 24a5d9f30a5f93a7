//! Pool membership: typed members, set diffing and per-call batching.

use std::collections::HashSet;
use std::fmt;

use pve_client::PoolMemberInfo;
use thiserror::Error;

pub const QEMU: &str = "qemu";
pub const STORAGE: &str = "storage";

/// Member types accepted in configuration.
pub const MEMBER_TYPES: [&str; 2] = [QEMU, STORAGE];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemberError {
    #[error("'{0}' is not a valid VM id; qemu members need a non-negative integer id")]
    InvalidVmId(String),

    #[error("unknown member type '{0}', expected qemu or storage")]
    UnknownType(String),
}

/// A VM id as written by the user.
///
/// Equality is on the original text, so `"100"` and `"0100"` are distinct
/// members even though both address VM 100.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VmId {
    raw: String,
    vmid: u32,
}

impl VmId {
    pub fn parse(raw: &str) -> Result<Self, MemberError> {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MemberError::InvalidVmId(raw.to_string()));
        }
        let vmid = raw
            .parse()
            .map_err(|_| MemberError::InvalidVmId(raw.to_string()))?;
        Ok(Self {
            raw: raw.to_string(),
            vmid,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn get(&self) -> u32 {
        self.vmid
    }
}

impl From<u32> for VmId {
    fn from(vmid: u32) -> Self {
        Self {
            raw: vmid.to_string(),
            vmid,
        }
    }
}

/// A reference from a pool to a VM or a storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PoolMember {
    Qemu(VmId),
    Storage(String),
}

impl PoolMember {
    pub fn parse(id: &str, kind: &str) -> Result<Self, MemberError> {
        match kind {
            QEMU => Ok(PoolMember::Qemu(VmId::parse(id)?)),
            STORAGE => Ok(PoolMember::Storage(id.to_string())),
            other => Err(MemberError::UnknownType(other.to_string())),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            PoolMember::Qemu(vmid) => vmid.as_str(),
            PoolMember::Storage(id) => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PoolMember::Qemu(_) => QEMU,
            PoolMember::Storage(_) => STORAGE,
        }
    }

    /// Map a remote member entry. Container (`lxc`) and other member types
    /// are not managed and yield `None`.
    pub fn from_remote(info: &PoolMemberInfo) -> Option<Self> {
        match info.kind.as_str() {
            QEMU => {
                let vmid = info.vmid.or_else(|| {
                    info.id
                        .rsplit('/')
                        .next()
                        .and_then(|tail| tail.parse().ok())
                })?;
                Some(PoolMember::Qemu(VmId::from(vmid)))
            }
            STORAGE => {
                let name = info
                    .storage
                    .clone()
                    .or_else(|| info.id.rsplit('/').next().map(str::to_string))?;
                Some(PoolMember::Storage(name))
            }
            _ => None,
        }
    }
}

impl fmt::Display for PoolMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind(), self.id())
    }
}

/// Map remote entries to members, collapsing the per-node storage entries.
pub fn from_remote(entries: &[PoolMemberInfo]) -> Vec<PoolMember> {
    let mut members: Vec<PoolMember> = Vec::new();
    for member in entries.iter().filter_map(PoolMember::from_remote) {
        if !members.contains(&member) {
            members.push(member);
        }
    }
    members
}

/// Members to add and to remove to get from one member set to another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberDiff {
    pub additions: Vec<PoolMember>,
    pub removals: Vec<PoolMember>,
}

impl MemberDiff {
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }
}

/// Set difference in both directions. Order of the inputs is irrelevant;
/// additions keep `planned` order and removals keep `prior` order.
pub fn diff(prior: &[PoolMember], planned: &[PoolMember]) -> MemberDiff {
    let prior_set: HashSet<&PoolMember> = prior.iter().collect();
    let planned_set: HashSet<&PoolMember> = planned.iter().collect();

    let mut seen = HashSet::new();
    let additions = planned
        .iter()
        .filter(|m| !prior_set.contains(m) && seen.insert(*m))
        .cloned()
        .collect();

    let mut seen = HashSet::new();
    let removals = prior
        .iter()
        .filter(|m| !planned_set.contains(m) && seen.insert(*m))
        .cloned()
        .collect();

    MemberDiff {
        additions,
        removals,
    }
}

/// Members split into the two lists one `UpdatePool` call takes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberBatch {
    pub vms: Vec<u32>,
    pub storage: Vec<String>,
}

impl MemberBatch {
    pub fn is_empty(&self) -> bool {
        self.vms.is_empty() && self.storage.is_empty()
    }
}

pub fn partition(members: &[PoolMember]) -> MemberBatch {
    let mut batch = MemberBatch::default();
    for member in members {
        match member {
            PoolMember::Qemu(vmid) => batch.vms.push(vmid.get()),
            PoolMember::Storage(id) => batch.storage.push(id.clone()),
        }
    }
    batch
}
