use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand_core::{OsRng, RngCore};
use serde::Serialize;
use sqlx::{PgPool, Row};
use tracing::{debug, warn};
use uuid::Uuid;

/// Stored invitation status. Transitions are one-way: `pending` may move to
/// `accepted` or `expired`; both targets are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Expired => "expired",
        }
    }
}

impl FromStr for InvitationStatus {
    type Err = StoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(InvitationStatus::Pending),
            "accepted" => Ok(InvitationStatus::Accepted),
            "expired" => Ok(InvitationStatus::Expired),
            other => Err(StoreError::Query(format!(
                "unexpected invitation status '{other}' in store"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Invitation {
    /// Opaque high-entropy lookup key. Not a signed token; carries no claims.
    pub token: String,
    pub leader_id: Uuid,
    pub member_name: String,
    pub member_phone: String,
    pub member_email: Option<String>,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Invitation {
    /// Status as of `now`, computing expiry lazily: a stored `pending` row
    /// past its deadline reads as `expired` without any write.
    pub fn effective_status(&self, now: DateTime<Utc>) -> InvitationStatus {
        match self.status {
            InvitationStatus::Pending if now > self.expires_at => InvitationStatus::Expired,
            status => status,
        }
    }
}

/// An invitation joined with its issuing leader's display name, as served by
/// the redemption endpoint.
#[derive(Debug, Clone)]
pub struct InvitationDetail {
    pub invitation: Invitation,
    pub leader_name: String,
}

#[derive(Debug, Clone)]
pub struct MemberDetails {
    pub member_name: String,
    pub member_phone: String,
    pub member_email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    Accepted,
    AlreadyAccepted,
    Expired,
    NotFound,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invitation token collided with an existing row")]
    DuplicateToken,
    #[error("invitation store query failed: {0}")]
    Query(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(value: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &value {
            // 23505: unique_violation
            if db.code().as_deref() == Some("23505") {
                return StoreError::DuplicateToken;
            }
        }
        StoreError::Query(value.to_string())
    }
}

/// Persistence seam for invitations. The store, not the application, is the
/// arbiter of the accept race: `try_accept` must be a single conditional
/// write so that it holds across multiple service instances.
#[async_trait]
pub trait InvitationStore: Send + Sync {
    async fn insert(&self, invitation: &Invitation) -> Result<(), StoreError>;

    async fn find(&self, token: &str) -> Result<Option<InvitationDetail>, StoreError>;

    async fn list_for_leader(&self, leader_id: Uuid) -> Result<Vec<Invitation>, StoreError>;

    /// Conditional update: set `accepted` where the row is still `pending`
    /// and unexpired at `now`. Returns true only for the call that won.
    async fn try_accept(&self, token: &str, now: DateTime<Utc>) -> Result<bool, StoreError>;

    async fn status_of(
        &self,
        token: &str,
    ) -> Result<Option<(InvitationStatus, DateTime<Utc>)>, StoreError>;

    /// Best-effort persistence of the lazy `pending -> expired` transition.
    /// Conditional on the row still being `pending`, so it can never clobber
    /// an acceptance that slipped in between.
    async fn mark_expired(&self, token: &str, now: DateTime<Utc>) -> Result<(), StoreError>;
}

/// Postgres-backed store.
pub struct PgInvitationStore {
    pool: PgPool,
}

impl PgInvitationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn invitation_from_row(row: &sqlx::postgres::PgRow) -> Result<Invitation, StoreError> {
        let status: String = row.try_get("status").map_err(StoreError::from)?;
        Ok(Invitation {
            token: row.try_get("token").map_err(StoreError::from)?,
            leader_id: row.try_get("leader_id").map_err(StoreError::from)?,
            member_name: row.try_get("member_name").map_err(StoreError::from)?,
            member_phone: row.try_get("member_phone").map_err(StoreError::from)?,
            member_email: row.try_get("member_email").map_err(StoreError::from)?,
            status: status.parse()?,
            created_at: row.try_get("created_at").map_err(StoreError::from)?,
            expires_at: row.try_get("expires_at").map_err(StoreError::from)?,
        })
    }
}

#[async_trait]
impl InvitationStore for PgInvitationStore {
    async fn insert(&self, invitation: &Invitation) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO invitations \
               (token, leader_id, member_name, member_phone, member_email, status, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&invitation.token)
        .bind(invitation.leader_id)
        .bind(&invitation.member_name)
        .bind(&invitation.member_phone)
        .bind(&invitation.member_email)
        .bind(invitation.status.as_str())
        .bind(invitation.created_at)
        .bind(invitation.expires_at)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(StoreError::from)
    }

    async fn find(&self, token: &str) -> Result<Option<InvitationDetail>, StoreError> {
        let row = sqlx::query(
            "SELECT i.token, i.leader_id, i.member_name, i.member_phone, i.member_email, \
                    i.status, i.created_at, i.expires_at, u.name AS leader_name \
             FROM invitations i \
             JOIN users u ON u.id = i.leader_id \
             WHERE i.token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;

        match row {
            Some(row) => {
                let leader_name: String = row.try_get("leader_name").map_err(StoreError::from)?;
                Ok(Some(InvitationDetail {
                    invitation: Self::invitation_from_row(&row)?,
                    leader_name,
                }))
            }
            None => Ok(None),
        }
    }

    async fn list_for_leader(&self, leader_id: Uuid) -> Result<Vec<Invitation>, StoreError> {
        let rows = sqlx::query(
            "SELECT token, leader_id, member_name, member_phone, member_email, \
                    status, created_at, expires_at \
             FROM invitations WHERE leader_id = $1 ORDER BY created_at DESC",
        )
        .bind(leader_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)?;

        rows.iter().map(Self::invitation_from_row).collect()
    }

    async fn try_accept(&self, token: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE invitations SET status = 'accepted' \
             WHERE token = $1 AND status = 'pending' AND expires_at >= $2",
        )
        .bind(token)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(result.rows_affected() == 1)
    }

    async fn status_of(
        &self,
        token: &str,
    ) -> Result<Option<(InvitationStatus, DateTime<Utc>)>, StoreError> {
        let row = sqlx::query("SELECT status, expires_at FROM invitations WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        match row {
            Some(row) => {
                let status: String = row.try_get("status").map_err(StoreError::from)?;
                let expires_at: DateTime<Utc> =
                    row.try_get("expires_at").map_err(StoreError::from)?;
                Ok(Some((status.parse()?, expires_at)))
            }
            None => Ok(None),
        }
    }

    async fn mark_expired(&self, token: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE invitations SET status = 'expired' \
             WHERE token = $1 AND status = 'pending' AND expires_at < $2",
        )
        .bind(token)
        .bind(now)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(StoreError::from)
    }
}

/// Invitation lifecycle: create, redemption lookup, and the single mutating
/// accept transition.
pub struct InvitationService {
    store: Arc<dyn InvitationStore>,
}

impl InvitationService {
    pub fn new(store: Arc<dyn InvitationStore>) -> Self {
        Self { store }
    }

    /// Create a pending invitation valid for `ttl` from now. The opaque
    /// token is generated here; a store-level collision (unique constraint)
    /// surfaces as an error rather than silently overwriting.
    pub async fn create(
        &self,
        leader_id: Uuid,
        member: MemberDetails,
        ttl: Duration,
    ) -> Result<Invitation, StoreError> {
        let now = Utc::now();
        let invitation = Invitation {
            token: generate_invite_token(),
            leader_id,
            member_name: member.member_name,
            member_phone: member.member_phone,
            member_email: member.member_email,
            status: InvitationStatus::Pending,
            created_at: now,
            expires_at: now + ttl,
        };
        self.store.insert(&invitation).await?;
        debug!(leader_id = %leader_id, expires_at = %invitation.expires_at, "invitation created");
        Ok(invitation)
    }

    /// Read-only lookup. Reports lazy expiry without mutating the row.
    pub async fn lookup(&self, token: &str) -> Result<Option<InvitationDetail>, StoreError> {
        let detail = self.store.find(token).await?;
        Ok(detail.map(|mut detail| {
            detail.invitation.status = detail.invitation.effective_status(Utc::now());
            detail
        }))
    }

    pub async fn list_for_leader(&self, leader_id: Uuid) -> Result<Vec<Invitation>, StoreError> {
        let now = Utc::now();
        let mut invitations = self.store.list_for_leader(leader_id).await?;
        for invitation in &mut invitations {
            invitation.status = invitation.effective_status(now);
        }
        Ok(invitations)
    }

    /// The one state-mutating operation. The winning path is a single
    /// conditional update; of two concurrent calls exactly one observes
    /// `Accepted` and the other classifies against the row it lost to.
    pub async fn accept(&self, token: &str) -> Result<AcceptOutcome, StoreError> {
        let now = Utc::now();
        if self.store.try_accept(token, now).await? {
            return Ok(AcceptOutcome::Accepted);
        }

        match self.store.status_of(token).await? {
            None => Ok(AcceptOutcome::NotFound),
            Some((InvitationStatus::Accepted, _)) => Ok(AcceptOutcome::AlreadyAccepted),
            Some((InvitationStatus::Expired, _)) => Ok(AcceptOutcome::Expired),
            Some((InvitationStatus::Pending, _)) => {
                // The conditional update only skips a pending row when the
                // deadline has passed. Persist the transition since we are
                // already here; correctness does not depend on it landing.
                if let Err(err) = self.store.mark_expired(token, now).await {
                    warn!(error = %err, "failed to persist expired transition");
                }
                Ok(AcceptOutcome::Expired)
            }
        }
    }
}

/// 256 bits from the OS RNG, URL-safe base64. Used purely as a lookup key.
fn generate_invite_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Deep link consumed by the mobile client to trigger the accept flow.
pub fn invite_link(scheme: &str, token: &str) -> String {
    format!("{scheme}?token={token}")
}

#[cfg(test)]
pub(crate) mod memory {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// In-memory stand-in for the Postgres store. The whole conditional
    /// update runs under one lock, mirroring the atomicity the database
    /// gives the real store.
    #[derive(Default)]
    pub struct MemoryInvitationStore {
        rows: Mutex<HashMap<String, Invitation>>,
        leaders: Mutex<HashMap<Uuid, String>>,
    }

    impl MemoryInvitationStore {
        pub fn with_leader(leader_id: Uuid, name: &str) -> Self {
            let store = Self::default();
            store
                .leaders
                .lock()
                .unwrap()
                .insert(leader_id, name.to_string());
            store
        }

        pub fn stored_status(&self, token: &str) -> Option<InvitationStatus> {
            self.rows
                .lock()
                .unwrap()
                .get(token)
                .map(|invitation| invitation.status)
        }

        /// Force a row's deadline into the past while leaving it `pending`,
        /// simulating an invitation that was never swept.
        pub fn backdate(&self, token: &str, expires_at: DateTime<Utc>) {
            let mut rows = self.rows.lock().unwrap();
            if let Some(invitation) = rows.get_mut(token) {
                invitation.expires_at = expires_at;
            }
        }
    }

    #[async_trait]
    impl InvitationStore for MemoryInvitationStore {
        async fn insert(&self, invitation: &Invitation) -> Result<(), StoreError> {
            let mut rows = self.rows.lock().unwrap();
            if rows.contains_key(&invitation.token) {
                return Err(StoreError::DuplicateToken);
            }
            rows.insert(invitation.token.clone(), invitation.clone());
            Ok(())
        }

        async fn find(&self, token: &str) -> Result<Option<InvitationDetail>, StoreError> {
            let rows = self.rows.lock().unwrap();
            let leaders = self.leaders.lock().unwrap();
            Ok(rows.get(token).map(|invitation| InvitationDetail {
                invitation: invitation.clone(),
                leader_name: leaders
                    .get(&invitation.leader_id)
                    .cloned()
                    .unwrap_or_default(),
            }))
        }

        async fn list_for_leader(&self, leader_id: Uuid) -> Result<Vec<Invitation>, StoreError> {
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .values()
                .filter(|invitation| invitation.leader_id == leader_id)
                .cloned()
                .collect())
        }

        async fn try_accept(&self, token: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
            let mut rows = self.rows.lock().unwrap();
            match rows.get_mut(token) {
                Some(invitation)
                    if invitation.status == InvitationStatus::Pending
                        && invitation.expires_at >= now =>
                {
                    invitation.status = InvitationStatus::Accepted;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn status_of(
            &self,
            token: &str,
        ) -> Result<Option<(InvitationStatus, DateTime<Utc>)>, StoreError> {
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .get(token)
                .map(|invitation| (invitation.status, invitation.expires_at)))
        }

        async fn mark_expired(&self, token: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
            let mut rows = self.rows.lock().unwrap();
            if let Some(invitation) = rows.get_mut(token) {
                if invitation.status == InvitationStatus::Pending && invitation.expires_at < now {
                    invitation.status = InvitationStatus::Expired;
                }
            }
            Ok(())
        }
    }
}
