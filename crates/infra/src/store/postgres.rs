//! Postgres-backed access store.
//!
//! Uniqueness rules live in the schema as named constraints, so concurrent
//! writers are stopped by the database. Violations are translated back into
//! the same messages the services use:
//!
//! | Constraint | StoreError |
//! |------------|------------|
//! | `app_user_email_key` / `app_user_username_key` | `UniqueViolation` |
//! | `app_group_name_key` | `UniqueViolation` |
//! | `bid_pending_group_name_key` (partial, `in_progress` only) | `UniqueViolation` |
//! | edge primary keys | `UniqueViolation` |
//! | anything else | `Backend` |

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use gatekeeper_core::error::msg;
use gatekeeper_core::{Agent, AgentId, Bid, BidId, BidStatus, Group, GroupId, User, UserId};

use super::r#trait::{
    AgentStore, BidStore, GroupRegistry, PrivilegeStore, StoreError, StoreResult, UserDirectory,
};

const SCHEMA: &str = include_str!("schema.sql");

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect and make sure the schema exists.
    #[instrument(skip(url), err)]
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn begin(&self) -> StoreResult<Transaction<'_, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }

    async fn fetch_groups(&self, operation: &str, sql: &str, ids: &[Uuid]) -> StoreResult<Vec<Group>> {
        let mut query = sqlx::query(sql);
        for id in ids {
            query = query.bind(*id);
        }
        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        rows.iter().map(group_from_row).collect()
    }

    async fn fetch_agents(&self, operation: &str, sql: &str, id: Option<Uuid>) -> StoreResult<Vec<Agent>> {
        let mut query = sqlx::query(sql);
        if let Some(id) = id {
            query = query.bind(id);
        }
        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        rows.iter().map(agent_from_row).collect()
    }

    async fn edge_exists(&self, operation: &str, sql: &str, a: Uuid, b: Uuid) -> StoreResult<bool> {
        let row = sqlx::query(sql)
            .bind(a)
            .bind(b)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        row.try_get::<bool, _>(0)
            .map_err(|e| map_sqlx_error(operation, e))
    }

    async fn execute_edge(&self, operation: &str, sql: &str, a: Uuid, b: Uuid) -> StoreResult<()> {
        sqlx::query(sql)
            .bind(a)
            .bind(b)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        Ok(())
    }
}

async fn insert_group_tx(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: UserId,
    name: &str,
    members: &[UserId],
) -> StoreResult<Group> {
    let group = Group {
        id: GroupId::new(),
        name: name.to_owned(),
        owner_id,
    };
    sqlx::query("INSERT INTO app_group (id, name, owner_id) VALUES ($1, $2, $3)")
        .bind(group.id.as_uuid())
        .bind(&group.name)
        .bind(owner_id.as_uuid())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_group", e))?;

    for member in members {
        sqlx::query(
            "INSERT INTO participation (user_id, group_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(member.as_uuid())
        .bind(group.id.as_uuid())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_participation", e))?;
    }
    Ok(group)
}

#[async_trait]
impl UserDirectory for PostgresStore {
    #[instrument(skip(self), err)]
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        sqlx::query("SELECT id, email, username FROM app_user WHERE email = $1")
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user_by_email", e))?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    #[instrument(skip(self), err)]
    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        sqlx::query("SELECT id, email, username FROM app_user WHERE username = $1")
            .bind(username)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user_by_username", e))?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    #[instrument(skip(self), err)]
    async fn create_user(&self, email: &str, username: &str) -> StoreResult<User> {
        let user = User {
            id: UserId::new(),
            email: email.to_owned(),
            username: username.to_owned(),
        };
        sqlx::query("INSERT INTO app_user (id, email, username) VALUES ($1, $2, $3)")
            .bind(user.id.as_uuid())
            .bind(&user.email)
            .bind(&user.username)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_user", e))?;
        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn delete_user(&self, user_id: UserId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM app_user WHERE id = $1")
            .bind(user_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {user_id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl GroupRegistry for PostgresStore {
    #[instrument(skip(self), err)]
    async fn get_group(&self, name: &str) -> StoreResult<Option<Group>> {
        sqlx::query("SELECT id, name, owner_id FROM app_group WHERE name = $1")
            .bind(name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_group", e))?
            .as_ref()
            .map(group_from_row)
            .transpose()
    }

    #[instrument(skip(self, members), fields(owner_id = %owner_id, members = members.len()), err)]
    async fn create_group(
        &self,
        owner_id: UserId,
        name: &str,
        members: &[UserId],
    ) -> StoreResult<Group> {
        let mut tx = self.begin().await?;
        let group = insert_group_tx(&mut tx, owner_id, name, members).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(group)
    }

    #[instrument(skip(self), fields(user_id = %user_id, group_id = %group_id), err)]
    async fn is_participant(&self, user_id: UserId, group_id: GroupId) -> StoreResult<bool> {
        self.edge_exists(
            "is_participant",
            "SELECT EXISTS (SELECT 1 FROM participation WHERE user_id = $1 AND group_id = $2)",
            *user_id.as_uuid(),
            *group_id.as_uuid(),
        )
        .await
    }

    #[instrument(skip(self), fields(user_id = %user_id, group_id = %group_id), err)]
    async fn add_member(&self, user_id: UserId, group_id: GroupId) -> StoreResult<()> {
        self.execute_edge(
            "add_member",
            "INSERT INTO participation (user_id, group_id) VALUES ($1, $2)",
            *user_id.as_uuid(),
            *group_id.as_uuid(),
        )
        .await
    }

    #[instrument(skip(self), fields(user_id = %user_id, group_id = %group_id), err)]
    async fn remove_member(&self, user_id: UserId, group_id: GroupId) -> StoreResult<()> {
        self.execute_edge(
            "remove_member",
            "DELETE FROM participation WHERE user_id = $1 AND group_id = $2",
            *user_id.as_uuid(),
            *group_id.as_uuid(),
        )
        .await
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn list_user_groups(&self, user_id: UserId) -> StoreResult<Vec<Group>> {
        self.fetch_groups(
            "list_user_groups",
            r#"
            SELECT g.id, g.name, g.owner_id
            FROM app_group g
            JOIN participation p ON p.group_id = g.id
            WHERE p.user_id = $1
            ORDER BY g.name
            "#,
            &[*user_id.as_uuid()],
        )
        .await
    }

    #[instrument(skip(self), fields(a = %a, b = %b), err)]
    async fn list_common_groups(&self, a: UserId, b: UserId) -> StoreResult<Vec<Group>> {
        self.fetch_groups(
            "list_common_groups",
            r#"
            SELECT g.id, g.name, g.owner_id
            FROM app_group g
            JOIN participation pa ON pa.group_id = g.id AND pa.user_id = $1
            JOIN participation pb ON pb.group_id = g.id AND pb.user_id = $2
            ORDER BY g.name
            "#,
            &[*a.as_uuid(), *b.as_uuid()],
        )
        .await
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn list_owned_groups(&self, user_id: UserId) -> StoreResult<Vec<Group>> {
        self.fetch_groups(
            "list_owned_groups",
            "SELECT id, name, owner_id FROM app_group WHERE owner_id = $1 ORDER BY name",
            &[*user_id.as_uuid()],
        )
        .await
    }

    #[instrument(skip(self), fields(group_id = %group_id, new_owner = %new_owner), err)]
    async fn transfer_ownership(&self, group_id: GroupId, new_owner: UserId) -> StoreResult<Group> {
        let mut tx = self.begin().await?;

        let row = sqlx::query(
            "UPDATE app_group SET owner_id = $2 WHERE id = $1 RETURNING id, name, owner_id",
        )
        .bind(group_id.as_uuid())
        .bind(new_owner.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("transfer_ownership", e))?
        .ok_or_else(|| StoreError::NotFound(format!("group {group_id}")))?;
        let group = group_from_row(&row)?;

        sqlx::query(
            "INSERT INTO participation (user_id, group_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(new_owner.as_uuid())
        .bind(group_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_participation", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(group)
    }
}

#[async_trait]
impl BidStore for PostgresStore {
    #[instrument(skip(self), err)]
    async fn find_pending_bid(&self, group_name: &str) -> StoreResult<Option<Bid>> {
        sqlx::query(
            "SELECT id, user_id, group_name, status FROM bid \
             WHERE group_name = $1 AND status = 'in_progress'",
        )
        .bind(group_name)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_pending_bid", e))?
        .as_ref()
        .map(bid_from_row)
        .transpose()
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn find_user_pending_bid(
        &self,
        user_id: UserId,
        group_name: &str,
    ) -> StoreResult<Option<Bid>> {
        sqlx::query(
            "SELECT id, user_id, group_name, status FROM bid \
             WHERE user_id = $1 AND group_name = $2 AND status = 'in_progress'",
        )
        .bind(user_id.as_uuid())
        .bind(group_name)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_user_pending_bid", e))?
        .as_ref()
        .map(bid_from_row)
        .transpose()
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn create_bid(&self, user_id: UserId, group_name: &str) -> StoreResult<Bid> {
        let bid = Bid::open(user_id, group_name);
        sqlx::query("INSERT INTO bid (id, user_id, group_name, status) VALUES ($1, $2, $3, $4)")
            .bind(bid.id.as_uuid())
            .bind(user_id.as_uuid())
            .bind(&bid.group_name)
            .bind(bid.status.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_bid", e))?;
        Ok(bid)
    }

    #[instrument(skip(self), fields(bid_id = %bid_id), err)]
    async fn reject_bid(&self, bid_id: BidId) -> StoreResult<Bid> {
        let row = sqlx::query(
            r#"
            UPDATE bid SET status = 'rejected', updated_at = NOW()
            WHERE id = $1 AND status = 'in_progress'
            RETURNING id, user_id, group_name, status
            "#,
        )
        .bind(bid_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("reject_bid", e))?
        .ok_or_else(|| StoreError::NotFound(msg::BID_NOT_EXIST.into()))?;
        bid_from_row(&row)
    }

    #[instrument(skip(self, members), fields(bid_id = %bid_id), err)]
    async fn approve_bid(&self, bid_id: BidId, members: &[UserId]) -> StoreResult<Group> {
        let mut tx = self.begin().await?;

        // Row lock on the bid; a concurrent decision waits and then sees it decided.
        let row = sqlx::query(
            r#"
            UPDATE bid SET status = 'approved', updated_at = NOW()
            WHERE id = $1 AND status = 'in_progress'
            RETURNING id, user_id, group_name, status
            "#,
        )
        .bind(bid_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("approve_bid", e))?
        .ok_or_else(|| StoreError::NotFound(msg::BID_NOT_EXIST.into()))?;
        let bid = bid_from_row(&row)?;

        let group = insert_group_tx(&mut tx, bid.user_id, &bid.group_name, members).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(group)
    }
}

#[async_trait]
impl AgentStore for PostgresStore {
    #[instrument(skip(self), err)]
    async fn get_agent(&self, name: &str) -> StoreResult<Option<Agent>> {
        sqlx::query("SELECT id, name FROM agent WHERE name = $1")
            .bind(name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_agent", e))?
            .as_ref()
            .map(agent_from_row)
            .transpose()
    }

    #[instrument(skip(self), err)]
    async fn create_agent(&self, name: &str) -> StoreResult<Agent> {
        let agent = Agent {
            id: AgentId::new(),
            name: name.to_owned(),
        };
        sqlx::query("INSERT INTO agent (id, name) VALUES ($1, $2)")
            .bind(agent.id.as_uuid())
            .bind(&agent.name)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_agent", e))?;
        Ok(agent)
    }

    #[instrument(skip(self), fields(agent_id = %agent_id), err)]
    async fn delete_agent(&self, agent_id: AgentId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM agent WHERE id = $1")
            .bind(agent_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_agent", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("agent {agent_id}")));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_agents(&self) -> StoreResult<Vec<Agent>> {
        self.fetch_agents("list_agents", "SELECT id, name FROM agent ORDER BY name", None)
            .await
    }
}

#[async_trait]
impl PrivilegeStore for PostgresStore {
    #[instrument(skip(self), fields(group_id = %group_id, agent_id = %agent_id), err)]
    async fn grant_to_group(&self, group_id: GroupId, agent_id: AgentId) -> StoreResult<()> {
        self.execute_edge(
            "grant_to_group",
            "INSERT INTO group_privilege (group_id, agent_id) VALUES ($1, $2)",
            *group_id.as_uuid(),
            *agent_id.as_uuid(),
        )
        .await
    }

    #[instrument(skip(self), fields(group_id = %group_id, agent_id = %agent_id), err)]
    async fn revoke_from_group(&self, group_id: GroupId, agent_id: AgentId) -> StoreResult<()> {
        self.execute_edge(
            "revoke_from_group",
            "DELETE FROM group_privilege WHERE group_id = $1 AND agent_id = $2",
            *group_id.as_uuid(),
            *agent_id.as_uuid(),
        )
        .await
    }

    #[instrument(skip(self), fields(group_id = %group_id, agent_id = %agent_id), err)]
    async fn is_group_agent(&self, group_id: GroupId, agent_id: AgentId) -> StoreResult<bool> {
        self.edge_exists(
            "is_group_agent",
            "SELECT EXISTS (SELECT 1 FROM group_privilege WHERE group_id = $1 AND agent_id = $2)",
            *group_id.as_uuid(),
            *agent_id.as_uuid(),
        )
        .await
    }

    #[instrument(skip(self), fields(group_id = %group_id), err)]
    async fn list_group_agents(&self, group_id: GroupId) -> StoreResult<Vec<Agent>> {
        self.fetch_agents(
            "list_group_agents",
            r#"
            SELECT a.id, a.name
            FROM agent a
            JOIN group_privilege gp ON gp.agent_id = a.id
            WHERE gp.group_id = $1
            ORDER BY a.name
            "#,
            Some(*group_id.as_uuid()),
        )
        .await
    }

    #[instrument(skip(self), fields(user_id = %user_id, agent_id = %agent_id), err)]
    async fn grant_to_user(&self, user_id: UserId, agent_id: AgentId) -> StoreResult<()> {
        self.execute_edge(
            "grant_to_user",
            "INSERT INTO user_privilege (user_id, agent_id) VALUES ($1, $2)",
            *user_id.as_uuid(),
            *agent_id.as_uuid(),
        )
        .await
    }

    #[instrument(skip(self), fields(user_id = %user_id, agent_id = %agent_id), err)]
    async fn revoke_from_user(&self, user_id: UserId, agent_id: AgentId) -> StoreResult<()> {
        self.execute_edge(
            "revoke_from_user",
            "DELETE FROM user_privilege WHERE user_id = $1 AND agent_id = $2",
            *user_id.as_uuid(),
            *agent_id.as_uuid(),
        )
        .await
    }

    #[instrument(skip(self), fields(user_id = %user_id, agent_id = %agent_id), err)]
    async fn is_user_agent(&self, user_id: UserId, agent_id: AgentId) -> StoreResult<bool> {
        self.edge_exists(
            "is_user_agent",
            "SELECT EXISTS (SELECT 1 FROM user_privilege WHERE user_id = $1 AND agent_id = $2)",
            *user_id.as_uuid(),
            *agent_id.as_uuid(),
        )
        .await
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn list_user_agents(&self, user_id: UserId) -> StoreResult<Vec<Agent>> {
        self.fetch_agents(
            "list_user_agents",
            r#"
            SELECT a.id, a.name
            FROM agent a
            JOIN user_privilege up ON up.agent_id = a.id
            WHERE up.user_id = $1
            ORDER BY a.name
            "#,
            Some(*user_id.as_uuid()),
        )
        .await
    }
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    let decode = |e| map_sqlx_error("decode_user", e);
    Ok(User {
        id: UserId::from_uuid(row.try_get("id").map_err(decode)?),
        email: row.try_get("email").map_err(decode)?,
        username: row.try_get("username").map_err(decode)?,
    })
}

fn group_from_row(row: &PgRow) -> StoreResult<Group> {
    let decode = |e| map_sqlx_error("decode_group", e);
    Ok(Group {
        id: GroupId::from_uuid(row.try_get("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        owner_id: UserId::from_uuid(row.try_get("owner_id").map_err(decode)?),
    })
}

fn agent_from_row(row: &PgRow) -> StoreResult<Agent> {
    let decode = |e| map_sqlx_error("decode_agent", e);
    Ok(Agent {
        id: AgentId::from_uuid(row.try_get("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
    })
}

fn bid_from_row(row: &PgRow) -> StoreResult<Bid> {
    let decode = |e| map_sqlx_error("decode_bid", e);
    let status: String = row.try_get("status").map_err(decode)?;
    Ok(Bid {
        id: BidId::from_uuid(row.try_get("id").map_err(decode)?),
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(decode)?),
        group_name: row.try_get("group_name").map_err(decode)?,
        status: status
            .parse::<BidStatus>()
            .map_err(|e| StoreError::Backend(format!("decode_bid: {e}")))?,
    })
}

/// Message for a violated uniqueness constraint, by constraint name.
fn unique_violation_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("app_user_email_key") => msg::USER_EMAIL_EXIST,
        Some("app_user_username_key") => msg::USERNAME_EXIST,
        Some("app_group_name_key") => msg::GROUP_EXIST,
        Some("agent_name_key") => msg::AGENT_EXIST,
        Some("bid_pending_group_name_key") => msg::BID_EXIST,
        Some("participation_pkey") => msg::USER_ALREADY_IN_GROUP,
        Some("group_privilege_pkey") => msg::AGENT_ALREADY_IN_GROUP,
        Some("user_privilege_pkey") => msg::AGENT_ALREADY_IN_USER,
        _ => "record already exists",
    }
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                StoreError::UniqueViolation(unique_violation_message(db_err.constraint()).into())
            } else {
                StoreError::Backend(format!("database error in {operation}: {}", db_err.message()))
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}
