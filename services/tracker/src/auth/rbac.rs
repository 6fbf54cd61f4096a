//! Store-scoped role-based access control.
//!
//! # Purpose
//! Maps membership roles onto tracker actions with a Casbin RBAC model. Roles
//! inherit upwards: staff < manager < owner < franchise admin, so each grant is
//! listed once at the lowest role that holds it.
//!
//! # Key invariants
//! - The enforcer is built once at startup and only read afterwards.
//! - Subjects are role names, never user ids; the store scope comes from the
//!   caller's membership lookup.
use casbin::{CoreApi, DefaultModel, Enforcer, MemoryAdapter, MgmtApi};
use larder_compliance::model::Role;
use std::sync::Arc;

// Embed the Casbin model so deployments don't need a separate config file.
pub const MODEL_CONF: &str = include_str!("rbac/model.conf");

pub const ACTION_READING_RECORD: &str = "reading.record";
pub const ACTION_STATS_VIEW: &str = "stats.view";
pub const ACTION_ACTIONS_COMPLETE: &str = "actions.complete";
pub const ACTION_EQUIPMENT_MANAGE: &str = "equipment.manage";
pub const ACTION_RECORDS_REVIEW: &str = "records.review";
pub const ACTION_AUDIT_VIEW: &str = "audit.view";
pub const ACTION_MEMBERS_MANAGE: &str = "members.manage";

const GRANTS: &[(Role, &str)] = &[
    (Role::Staff, ACTION_READING_RECORD),
    (Role::Staff, ACTION_STATS_VIEW),
    (Role::Staff, ACTION_ACTIONS_COMPLETE),
    (Role::Manager, ACTION_EQUIPMENT_MANAGE),
    (Role::Manager, ACTION_RECORDS_REVIEW),
    (Role::Manager, ACTION_AUDIT_VIEW),
    (Role::Owner, ACTION_MEMBERS_MANAGE),
];

// (senior, junior): the senior role inherits every grant of the junior one.
const INHERITANCE: &[(Role, Role)] = &[
    (Role::Manager, Role::Staff),
    (Role::Owner, Role::Manager),
    (Role::FranchiseAdmin, Role::Owner),
];

pub fn role_subject(role: Role) -> &'static str {
    match role {
        Role::Staff => "staff",
        Role::Manager => "manager",
        Role::Owner => "owner",
        Role::FranchiseAdmin => "franchise_admin",
    }
}

/// Position in the inheritance chain; a member may only grant roles at or below
/// their own rank.
pub fn role_rank(role: Role) -> u8 {
    match role {
        Role::Staff => 0,
        Role::Manager => 1,
        Role::Owner => 2,
        Role::FranchiseAdmin => 3,
    }
}

#[derive(Clone)]
pub struct Authorizer {
    enforcer: Arc<Enforcer>,
}

impl Authorizer {
    pub async fn build() -> casbin::Result<Self> {
        let model = DefaultModel::from_str(MODEL_CONF).await?;
        let adapter = MemoryAdapter::default();
        let mut enforcer = Enforcer::new(model, adapter).await?;

        for (role, action) in GRANTS {
            enforcer
                .add_policy(vec![role_subject(*role).to_string(), action.to_string()])
                .await?;
        }
        for (senior, junior) in INHERITANCE {
            enforcer
                .add_grouping_policy(vec![
                    role_subject(*senior).to_string(),
                    role_subject(*junior).to_string(),
                ])
                .await?;
        }

        enforcer.build_role_links()?;
        Ok(Self {
            enforcer: Arc::new(enforcer),
        })
    }

    pub fn allows(&self, role: Role, action: &str) -> bool {
        match self.enforcer.enforce((role_subject(role), action)) {
            Ok(allowed) => allowed,
            Err(err) => {
                tracing::error!(error = ?err, action, "rbac enforcement failed");
                false
            }
        }
    }
}
