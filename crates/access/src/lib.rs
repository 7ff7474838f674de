//! `gatekeeper-access`: the use cases of group-based access control.
//!
//! Each service validates its inputs, enforces ownership/root rules in a fixed
//! order and delegates persistence to an [`AccessStore`].

use std::sync::Arc;

use gatekeeper_auth::RootIdentity;
use gatekeeper_infra::AccessStore;

pub mod agents;
pub mod bids;
pub mod groups;
mod lookup;
pub mod privileges;
pub mod resolver;
pub mod users;

pub use agents::AgentService;
pub use bids::BidService;
pub use groups::GroupService;
pub use privileges::PrivilegeService;
pub use resolver::AccessResolver;
pub use users::UserService;

/// All services over one shared store.
#[derive(Clone)]
pub struct AccessServices {
    pub users: UserService,
    pub groups: GroupService,
    pub bids: BidService,
    pub agents: AgentService,
    pub privileges: PrivilegeService,
    pub resolver: AccessResolver,
}

impl AccessServices {
    pub fn new(store: Arc<dyn AccessStore>, root: RootIdentity) -> Self {
        Self {
            users: UserService::new(store.clone(), root.clone()),
            groups: GroupService::new(store.clone(), root.clone()),
            bids: BidService::new(store.clone(), root.clone()),
            agents: AgentService::new(store.clone(), root.clone()),
            privileges: PrivilegeService::new(store.clone(), root.clone()),
            resolver: AccessResolver::new(store, root),
        }
    }
}
