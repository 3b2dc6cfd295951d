use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use common_auth::{
    Principal, RequireAdmin, RequireModerator, Role, ShopDirectoryError, ShopPrincipal,
    UserPrincipal, VerificationError,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::invitations::{
    invite_link, AcceptOutcome, Invitation, InvitationDetail, InvitationStatus, MemberDetails,
    StoreError,
};
use crate::AppState;

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", "No such invitation")
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        error!(error = %value, "invitation store failure");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "SERVER_ERROR",
            "Invitation store unavailable",
        )
    }
}

impl From<ShopDirectoryError> for ApiError {
    fn from(value: ShopDirectoryError) -> Self {
        error!(error = %value, "shop directory failure");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "SERVER_ERROR",
            "Shop directory unavailable",
        )
    }
}

impl From<VerificationError> for ApiError {
    fn from(value: VerificationError) -> Self {
        error!(error = %value, "token signing failure");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "SERVER_ERROR",
            "Could not issue token",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Redemption-endpoint status string: a still-redeemable invitation reads
/// `valid`, not `pending`.
fn redemption_status(status: InvitationStatus) -> &'static str {
    match status {
        InvitationStatus::Pending => "valid",
        InvitationStatus::Accepted => "accepted",
        InvitationStatus::Expired => "expired",
    }
}

#[derive(Debug, Deserialize)]
pub struct NewInvitationRequest {
    pub member_name: String,
    pub member_phone: String,
    #[serde(default)]
    pub member_email: Option<String>,
    /// Overrides the configured default (7 days) when supplied.
    #[serde(default)]
    pub ttl_days: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedInvitation {
    pub token: String,
    pub invite_link: String,
    pub status: &'static str,
    pub member_name: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub async fn create_invitation(
    State(state): State<AppState>,
    leader: UserPrincipal,
    Json(request): Json<NewInvitationRequest>,
) -> Result<(StatusCode, Json<CreatedInvitation>), ApiError> {
    if request.member_name.trim().is_empty() || request.member_phone.trim().is_empty() {
        return Err(ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "INVALID_MEMBER",
            "memberName and memberPhone are required",
        ));
    }

    let ttl = match request.ttl_days {
        Some(days) if days > 0 => Duration::days(days),
        Some(_) => {
            return Err(ApiError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_TTL",
                "ttlDays must be positive",
            ))
        }
        None => state.config.invitation_ttl,
    };

    let member = MemberDetails {
        member_name: request.member_name.trim().to_string(),
        member_phone: request.member_phone.trim().to_string(),
        member_email: request.member_email.as_deref().map(str::trim).and_then(|email| {
            if email.is_empty() {
                None
            } else {
                Some(email.to_string())
            }
        }),
    };

    let invitation = state.invitations.create(leader.id, member, ttl).await?;
    let link = invite_link(&state.config.invite_link_scheme, &invitation.token);

    Ok((
        StatusCode::CREATED,
        Json(CreatedInvitation {
            invite_link: link,
            status: redemption_status(invitation.status),
            member_name: invitation.member_name,
            created_at: invitation.created_at,
            expires_at: invitation.expires_at,
            token: invitation.token,
        }),
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderInvitation {
    pub token: String,
    pub status: &'static str,
    pub member_name: String,
    pub member_phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<Invitation> for LeaderInvitation {
    fn from(invitation: Invitation) -> Self {
        Self {
            status: redemption_status(invitation.status),
            member_name: invitation.member_name,
            member_phone: invitation.member_phone,
            member_email: invitation.member_email,
            created_at: invitation.created_at,
            expires_at: invitation.expires_at,
            token: invitation.token,
        }
    }
}

pub async fn list_invitations(
    State(state): State<AppState>,
    leader: UserPrincipal,
) -> Result<Json<Vec<LeaderInvitation>>, ApiError> {
    let invitations = state.invitations.list_for_leader(leader.id).await?;
    Ok(Json(
        invitations.into_iter().map(LeaderInvitation::from).collect(),
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionView {
    pub status: &'static str,
    pub leader_name: String,
    pub member_name: String,
    pub member_phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<InvitationDetail> for RedemptionView {
    fn from(detail: InvitationDetail) -> Self {
        Self {
            status: redemption_status(detail.invitation.status),
            leader_name: detail.leader_name,
            member_name: detail.invitation.member_name,
            member_phone: detail.invitation.member_phone,
            member_email: detail.invitation.member_email,
            created_at: detail.invitation.created_at,
            expires_at: detail.invitation.expires_at,
        }
    }
}

/// Public lookup used by the invite landing page. Side-effect free, so an
/// invitee can open the link any number of times.
pub async fn lookup_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<RedemptionView>, ApiError> {
    let detail = state
        .invitations
        .lookup(&token)
        .await?
        .ok_or_else(ApiError::not_found)?;
    Ok(Json(detail.into()))
}

#[derive(Debug, Serialize)]
struct AcceptResponse {
    status: &'static str,
}

/// Accept transition, triggered by the mobile client via the deep link.
/// Safe to retry: a second call reports the terminal state it finds.
pub async fn accept_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    match state.invitations.accept(&token).await? {
        AcceptOutcome::Accepted => {
            Ok((StatusCode::OK, Json(AcceptResponse { status: "accepted" })).into_response())
        }
        AcceptOutcome::AlreadyAccepted => Err(ApiError::new(
            StatusCode::CONFLICT,
            "ALREADY_ACCEPTED",
            "This invitation has already been accepted",
        )),
        AcceptOutcome::Expired => Err(ApiError::new(
            StatusCode::GONE,
            "EXPIRED",
            "This invitation has expired",
        )),
        AcceptOutcome::NotFound => Err(ApiError::not_found()),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "kind")]
pub enum WhoAmI {
    User {
        id: String,
        email: String,
        role: &'static str,
    },
    Shop {
        shop_id: String,
        shop_name: String,
    },
}

impl From<Principal> for WhoAmI {
    fn from(principal: Principal) -> Self {
        match principal {
            Principal::User(user) => WhoAmI::User {
                id: user.id.to_string(),
                email: user.email,
                role: user.role.as_str(),
            },
            Principal::Shop(shop) => WhoAmI::Shop {
                shop_id: shop.shop_id.to_string(),
                shop_name: shop.shop_name,
            },
        }
    }
}

pub async fn me(principal: UserPrincipal) -> Json<WhoAmI> {
    Json(Principal::User(principal).into())
}

pub async fn shop_me(principal: ShopPrincipal) -> Json<WhoAmI> {
    Json(Principal::Shop(principal).into())
}

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub ok: bool,
}

pub async fn admin_ping(RequireAdmin(_principal): RequireAdmin) -> Json<PingResponse> {
    Json(PingResponse { ok: true })
}

pub async fn moderation_ping(RequireModerator(_principal): RequireModerator) -> Json<PingResponse> {
    Json(PingResponse { ok: true })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueUserTokenRequest {
    pub user_id: Uuid,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

/// Admin-only credential provisioning for platform users. Lifetime comes
/// from the configured user-token TTL.
pub async fn issue_user_token(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(request): Json<IssueUserTokenRequest>,
) -> Result<Json<IssuedToken>, ApiError> {
    if request.email.trim().is_empty() {
        return Err(ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "INVALID_EMAIL",
            "email is required",
        ));
    }

    let ttl = state.config.tokens.user_ttl;
    let token = state
        .codec
        .sign_user(request.user_id, request.email.trim(), request.role, ttl)?;
    Ok(Json(IssuedToken {
        token,
        token_type: "Bearer",
        expires_in: ttl.num_seconds(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueShopTokenRequest {
    pub shop_id: Uuid,
}

/// Admin-only credential provisioning for tenant shops. The shop must exist
/// right now; its name is taken from the live record, not the request.
pub async fn issue_shop_token(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(request): Json<IssueShopTokenRequest>,
) -> Result<Json<IssuedToken>, ApiError> {
    let shop = state
        .shops
        .find_shop(request.shop_id)
        .await?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "NO_SUCH_SHOP", "No such shop"))?;

    let ttl = state.config.tokens.shop_ttl;
    let token = state.codec.sign_shop(shop.id, shop.name, ttl)?;
    Ok(Json(IssuedToken {
        token,
        token_type: "Bearer",
        expires_in: ttl.num_seconds(),
    }))
}
