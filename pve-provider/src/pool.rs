//! `proxmox_resource_pool`: pool lifecycle and member reconciliation.
//!
//! A pool references its members but does not own them. Removing a member
//! or deleting the pool only disassociates VMs and storage.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use pve_client::{CreatePoolRequest, PoolInfo, ProxmoxApi, UpdatePoolRequest};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, Result};
use crate::members::{self, MEMBER_TYPES, MemberBatch, PoolMember};
use crate::resource::{Context, Resource};
use crate::schema::{Attribute, AttributeType, Schema, Validator};
use crate::value::{Value, known_list, reorder_like};

pub const TYPE_NAME: &str = "proxmox_resource_pool";

/// A member as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberModel {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<&PoolMember> for MemberModel {
    fn from(member: &PoolMember) -> Self {
        Self {
            id: member.id().to_string(),
            kind: member.kind().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolModel {
    pub id: String,
    #[serde(default)]
    pub comment: Value<String>,
    #[serde(default)]
    pub members: Value<Vec<MemberModel>>,
}

impl PoolModel {
    /// Parse members into typed variants, rejecting unparseable VM ids,
    /// unknown types and duplicates.
    pub fn typed_members(&self) -> Result<Vec<PoolMember>> {
        let Some(models) = self.members.as_option() else {
            return Ok(Vec::new());
        };

        let mut seen = HashSet::new();
        let mut typed = Vec::with_capacity(models.len());
        for (i, model) in models.iter().enumerate() {
            let member = PoolMember::parse(&model.id, &model.kind)
                .map_err(|e| ProviderError::invalid(format!("members[{}]", i), e.to_string()))?;
            if !seen.insert(member.clone()) {
                return Err(ProviderError::invalid(
                    format!("members[{}]", i),
                    format!("duplicate member {}", member),
                ));
            }
            typed.push(member);
        }
        Ok(typed)
    }

    /// The comment as the server keeps it: empty means none.
    fn comment(&self) -> Option<&str> {
        self.comment.optional_str().filter(|c| !c.is_empty())
    }

    /// State as persisted after a write: unknowns settle to null, and so
    /// does an empty comment.
    fn settled(self) -> Self {
        let comment = match self.comment {
            Value::Known(c) if c.is_empty() => Value::Null,
            other => other.settled(),
        };
        Self {
            id: self.id,
            comment,
            members: self.members.settled(),
        }
    }
}

pub fn schema() -> Schema {
    Schema::new(TYPE_NAME, "A Proxmox resource pool grouping VMs and storage")
        .attribute(
            Attribute::required("id", AttributeType::String)
                .describe("Pool identifier")
                .replace()
                .validate(Validator::Identifier),
        )
        .attribute(
            Attribute::optional("comment", AttributeType::String).describe("Free-text comment"),
        )
        .attribute(
            Attribute::optional(
                "members",
                AttributeType::Block(vec![
                    Attribute::required("id", AttributeType::String)
                        .describe("VM id for qemu members, storage id for storage members"),
                    Attribute::required("type", AttributeType::String)
                        .describe("Member type")
                        .validate(Validator::one_of(MEMBER_TYPES)),
                ]),
            )
            .describe("VMs and storage in the pool"),
        )
}

/// Reconciler for resource pools.
pub struct PoolResource {
    api: Arc<dyn ProxmoxApi>,
}

impl PoolResource {
    pub fn new(api: Arc<dyn ProxmoxApi>) -> Self {
        Self { api }
    }

    async fn update_members(
        &self,
        ctx: &Context,
        id: &str,
        batch: MemberBatch,
        delete: bool,
        comment: Option<String>,
        summary: &str,
    ) -> Result<()> {
        info!(
            pool = %id,
            vms = ?batch.vms,
            storage = ?batch.storage,
            delete,
            "Updating pool members"
        );
        ctx.call(self.api.update_pool(
            id,
            UpdatePoolRequest {
                comment,
                delete,
                vms: batch.vms,
                storage: batch.storage,
            },
        ))
        .await
        .map_err(ProviderError::remote(summary))
    }

    fn state_from_remote(info: PoolInfo, prior: Option<&PoolModel>) -> PoolModel {
        let prior_members = prior
            .and_then(|p| p.typed_members().ok())
            .unwrap_or_default();

        // The server reports canonical VM ids; keep the spelling from state.
        let remote = members::from_remote(&info.members)
            .into_iter()
            .map(|member| {
                let PoolMember::Qemu(vmid) = &member else {
                    return member;
                };
                let vmid = vmid.get();
                prior_members
                    .iter()
                    .find(|p| matches!(p, PoolMember::Qemu(v) if v.get() == vmid))
                    .cloned()
                    .unwrap_or(member)
            })
            .collect();
        let ordered = reorder_like(&prior_members, remote);

        // An unset member list stays unset while the pool is empty.
        let members = if ordered.is_empty()
            && prior.is_some_and(|p| !p.members.is_known())
        {
            Value::Null
        } else {
            known_list(ordered.iter().map(MemberModel::from))
        };

        PoolModel {
            id: info.id,
            comment: info.comment.into(),
            members,
        }
    }
}

#[async_trait]
impl Resource for PoolResource {
    type Model = PoolModel;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        schema()
    }

    async fn create(&self, ctx: &Context, plan: PoolModel) -> Result<PoolModel> {
        let members = plan.typed_members()?;
        let summary = "Error creating resource pool";

        info!(pool = %plan.id, "Creating resource pool");
        ctx.call(self.api.create_pool(CreatePoolRequest {
            id: plan.id.clone(),
            comment: plan.comment().map(str::to_string),
        }))
        .await
        .map_err(ProviderError::remote(summary))?;

        let batch = members::partition(&members);
        if !batch.is_empty() {
            self.update_members(ctx, &plan.id, batch, false, None, summary)
                .await?;
        }

        // Members are echoed from the plan; a read would only reorder them.
        Ok(plan.settled())
    }

    async fn read(&self, ctx: &Context, state: PoolModel) -> Result<Option<PoolModel>> {
        debug!(pool = %state.id, "Reading resource pool");
        let info = ctx
            .call(self.api.get_pool(&state.id))
            .await
            .map_err(ProviderError::remote("Error reading resource pool"))?;

        match info {
            Some(info) => Ok(Some(Self::state_from_remote(info, Some(&state)))),
            None => {
                info!(pool = %state.id, "Resource pool no longer exists, removing from state");
                Ok(None)
            }
        }
    }

    async fn update(&self, ctx: &Context, plan: PoolModel, state: PoolModel) -> Result<PoolModel> {
        let planned = plan.typed_members()?;
        let prior = state.typed_members()?;
        let summary = "Error updating resource pool";

        let diff = members::diff(&prior, &planned);
        let mut comment = (plan.comment() != state.comment())
            .then(|| plan.comment().unwrap_or_default().to_string());

        let additions = members::partition(&diff.additions);
        if !additions.is_empty() {
            self.update_members(ctx, &plan.id, additions, false, comment.take(), summary)
                .await?;
        }

        if let Some(comment) = comment {
            info!(pool = %plan.id, "Updating resource pool comment");
            ctx.call(self.api.update_pool(
                &plan.id,
                UpdatePoolRequest {
                    comment: Some(comment),
                    ..UpdatePoolRequest::default()
                },
            ))
            .await
            .map_err(ProviderError::remote(summary))?;
        }

        let removals = members::partition(&diff.removals);
        if !removals.is_empty() {
            self.update_members(ctx, &plan.id, removals, true, None, summary)
                .await?;
        }

        Ok(plan.settled())
    }

    async fn delete(&self, ctx: &Context, state: PoolModel) -> Result<()> {
        let members = state.typed_members()?;

        let batch = members::partition(&members);
        if !batch.is_empty() {
            self.update_members(
                ctx,
                &state.id,
                batch,
                true,
                None,
                "Error removing members from resource pool",
            )
            .await?;
        }

        info!(pool = %state.id, "Deleting resource pool");
        ctx.call(self.api.delete_pool(&state.id))
            .await
            .map_err(ProviderError::remote("Error deleting resource pool"))
    }

    async fn import(&self, ctx: &Context, id: &str) -> Result<PoolModel> {
        let info = ctx
            .call(self.api.get_pool(id))
            .await
            .map_err(ProviderError::remote("Error importing resource pool"))?
            .ok_or_else(|| ProviderError::NotFound {
                what: "resource pool".to_string(),
                id: id.to_string(),
            })?;

        Ok(Self::state_from_remote(info, None))
    }
}
