//! HTTP Handlers

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use std::sync::Arc;

use kernel::error::app_error::AppError;
use platform::client::{ClientInfo, extract_client_info};

use crate::application::{
    ChangePasswordUseCase, IdentityConfig, LoginInput, LoginOutcome, LoginUseCase,
    MfaDisableInput, MfaSetupUseCase, RefreshUseCase, RegisterInput, RegisterUseCase,
    VerifyMfaLoginInput, VerifyMfaLoginUseCase,
};
use crate::domain::repository::{AuditSink, PrincipalRepository};
use crate::domain::service::{AssertionVerifier, TokenService};
use crate::error::{IdentityError, IdentityResult};
use crate::presentation::dto::{
    AccessTokenResponse, ChangePasswordRequest, FederatedLoginRequest, LoginRequest,
    MeResponse, MfaChallengeResponse, MfaDisableRequest, MfaSetupResponse,
    MfaVerifySetupRequest, OkResponse, RefreshRequest, RegisterRequest, RegisterResponse,
    TokenPairResponse, TokenResponse, VerifyMfaLoginRequest,
};
use crate::presentation::middleware::authenticate_bearer;

/// Shared state for identity handlers
#[derive(Clone)]
pub struct IdentityAppState<R>
where
    R: PrincipalRepository + AuditSink + Clone + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub config: Arc<IdentityConfig>,
    pub tokens: Arc<TokenService>,
    /// Present only when federated login is configured
    pub assertion_verifier: Option<Arc<dyn AssertionVerifier>>,
}

fn client_info(headers: &HeaderMap, addr: Option<std::net::SocketAddr>) -> ClientInfo {
    extract_client_info(headers, addr.map(|a| a.ip()))
}

// ============================================================================
// Register
// ============================================================================

/// POST /api/auth/register
pub async fn register<R>(
    State(state): State<IdentityAppState<R>>,
    Json(req): Json<RegisterRequest>,
) -> IdentityResult<Json<RegisterResponse>>
where
    R: PrincipalRepository + AuditSink + Clone + Send + Sync + 'static,
{
    let use_case = RegisterUseCase::new(state.repo.clone(), state.config.clone());

    let output = use_case
        .execute(RegisterInput {
            email: req.email,
            username: req.username,
            password: req.password,
            phone: req.phone,
        })
        .await?;

    Ok(Json(RegisterResponse {
        id: output.principal_id,
    }))
}

// ============================================================================
// Login (step one)
// ============================================================================

/// POST /api/auth/login
pub async fn login<R>(
    State(state): State<IdentityAppState<R>>,
    headers: HeaderMap,
    axum::extract::ConnectInfo(addr): axum::extract::ConnectInfo<std::net::SocketAddr>,
    Json(req): Json<LoginRequest>,
) -> IdentityResult<impl IntoResponse>
where
    R: PrincipalRepository + AuditSink + Clone + Send + Sync + 'static,
{
    let client = client_info(&headers, Some(addr));

    let use_case = LoginUseCase::new(
        state.repo.clone(),
        state.tokens.clone(),
        state.config.clone(),
    );

    let outcome = use_case
        .execute(
            LoginInput {
                identifier: req.identifier,
                password: req.password,
            },
            &client,
        )
        .await?;

    Ok(login_outcome_response(outcome))
}

/// POST /api/auth/federated
///
/// Same contract as /login; the body carries the provider-signed identity
/// assertion instead of a credential pair.
pub async fn federated_login<R>(
    State(state): State<IdentityAppState<R>>,
    headers: HeaderMap,
    axum::extract::ConnectInfo(addr): axum::extract::ConnectInfo<std::net::SocketAddr>,
    Json(req): Json<FederatedLoginRequest>,
) -> IdentityResult<impl IntoResponse>
where
    R: PrincipalRepository + AuditSink + Clone + Send + Sync + 'static,
{
    let Some(verifier) = &state.assertion_verifier else {
        return Err(IdentityError::Validation(AppError::not_found(
            "Federated login is not configured",
        )));
    };

    let identity = verifier
        .verify(&req.assertion)
        .ok_or(IdentityError::InvalidCredential)?;

    let client = client_info(&headers, Some(addr));

    let use_case = LoginUseCase::new(
        state.repo.clone(),
        state.tokens.clone(),
        state.config.clone(),
    );

    let outcome = use_case.execute_federated(identity, &client).await?;

    Ok(login_outcome_response(outcome))
}

/// Render the two login outcome shapes
///
/// Legacy clients depend on the bare `{token}` shape when MFA is off; the
/// challenge shape must never contain an access or refresh token.
fn login_outcome_response(outcome: LoginOutcome) -> axum::response::Response {
    match outcome {
        LoginOutcome::Authenticated { access_token } => Json(TokenResponse {
            token: access_token,
        })
        .into_response(),
        LoginOutcome::ChallengeRequired {
            mfa_token,
            expires_in_seconds,
        } => Json(MfaChallengeResponse {
            mfa_required: true,
            mfa_token,
            expires_in_seconds,
        })
        .into_response(),
    }
}

// ============================================================================
// Login (step two)
// ============================================================================

/// POST /api/auth/mfa/verify-login
pub async fn verify_mfa_login<R>(
    State(state): State<IdentityAppState<R>>,
    headers: HeaderMap,
    axum::extract::ConnectInfo(addr): axum::extract::ConnectInfo<std::net::SocketAddr>,
    Json(req): Json<VerifyMfaLoginRequest>,
) -> IdentityResult<Json<TokenPairResponse>>
where
    R: PrincipalRepository + AuditSink + Clone + Send + Sync + 'static,
{
    let client = client_info(&headers, Some(addr));

    let use_case = VerifyMfaLoginUseCase::new(state.repo.clone(), state.tokens.clone());

    let pair = use_case
        .execute(
            VerifyMfaLoginInput {
                mfa_token: req.mfa_token,
                code: req.code,
            },
            &client,
        )
        .await?;

    Ok(Json(TokenPairResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

// ============================================================================
// Refresh
// ============================================================================

/// POST /api/auth/refresh
pub async fn refresh<R>(
    State(state): State<IdentityAppState<R>>,
    Json(req): Json<RefreshRequest>,
) -> IdentityResult<Json<AccessTokenResponse>>
where
    R: PrincipalRepository + AuditSink + Clone + Send + Sync + 'static,
{
    let use_case = RefreshUseCase::new(state.repo.clone(), state.tokens.clone());
    let access_token = use_case.execute(&req.refresh_token).await?;

    Ok(Json(AccessTokenResponse { access_token }))
}

// ============================================================================
// Current principal
// ============================================================================

/// GET /api/auth/me
pub async fn me<R>(
    State(state): State<IdentityAppState<R>>,
    headers: HeaderMap,
) -> IdentityResult<Json<MeResponse>>
where
    R: PrincipalRepository + AuditSink + Clone + Send + Sync + 'static,
{
    let caller = authenticate_bearer(state.repo.as_ref(), &state.tokens, &headers).await?;

    let principal = state
        .repo
        .find_by_id(&caller.principal_id)
        .await?
        .ok_or(IdentityError::PrincipalNotFound)?;

    Ok(Json(MeResponse {
        id: principal.principal_id.to_string(),
        email: principal.email.to_string(),
        username: principal.username.to_string(),
        role: principal.role.code().to_string(),
        mfa_enabled: principal.mfa_enabled,
    }))
}

/// POST /api/auth/password
pub async fn change_password<R>(
    State(state): State<IdentityAppState<R>>,
    headers: HeaderMap,
    Json(req): Json<ChangePasswordRequest>,
) -> IdentityResult<Json<OkResponse>>
where
    R: PrincipalRepository + AuditSink + Clone + Send + Sync + 'static,
{
    let caller = authenticate_bearer(state.repo.as_ref(), &state.tokens, &headers).await?;

    let use_case = ChangePasswordUseCase::new(state.repo.clone(), state.config.clone());
    use_case
        .execute(&caller.principal_id, req.current_password, req.new_password)
        .await?;

    Ok(Json(OkResponse { ok: true }))
}

// ============================================================================
// MFA setup (requires authentication)
// ============================================================================

/// POST /api/auth/mfa/setup
pub async fn mfa_setup<R>(
    State(state): State<IdentityAppState<R>>,
    headers: HeaderMap,
) -> IdentityResult<Json<MfaSetupResponse>>
where
    R: PrincipalRepository + AuditSink + Clone + Send + Sync + 'static,
{
    let caller = authenticate_bearer(state.repo.as_ref(), &state.tokens, &headers).await?;

    let use_case = MfaSetupUseCase::new(state.repo.clone(), state.config.clone());
    let output = use_case.setup(&caller.principal_id).await?;

    Ok(Json(MfaSetupResponse {
        secret: output.secret,
        otpauth: output.otpauth_url,
        qr: output.qr_png_base64,
        recovery_codes: output.recovery_codes,
    }))
}

/// POST /api/auth/mfa/verify-setup
pub async fn mfa_verify_setup<R>(
    State(state): State<IdentityAppState<R>>,
    headers: HeaderMap,
    Json(req): Json<MfaVerifySetupRequest>,
) -> IdentityResult<Json<OkResponse>>
where
    R: PrincipalRepository + AuditSink + Clone + Send + Sync + 'static,
{
    let caller = authenticate_bearer(state.repo.as_ref(), &state.tokens, &headers).await?;

    let use_case = MfaSetupUseCase::new(state.repo.clone(), state.config.clone());
    use_case.verify(&caller.principal_id, &req.code).await?;

    Ok(Json(OkResponse { ok: true }))
}

/// POST /api/auth/mfa/disable
pub async fn mfa_disable<R>(
    State(state): State<IdentityAppState<R>>,
    headers: HeaderMap,
    Json(req): Json<MfaDisableRequest>,
) -> IdentityResult<Json<OkResponse>>
where
    R: PrincipalRepository + AuditSink + Clone + Send + Sync + 'static,
{
    let caller = authenticate_bearer(state.repo.as_ref(), &state.tokens, &headers).await?;

    let use_case = MfaSetupUseCase::new(state.repo.clone(), state.config.clone());
    use_case
        .disable(
            &caller.principal_id,
            MfaDisableInput {
                password: req.password,
                code: req.code,
                recovery: req.recovery,
            },
        )
        .await?;

    Ok(Json(OkResponse { ok: true }))
}
