//! Use-case level tests for the identity crate
//!
//! Exercise the login state machine, MFA lifecycle and token contract over
//! the in-memory store.

use std::sync::Arc;

use chrono::Utc;
use platform::client::ClientInfo;

use crate::application::{
    ChangePasswordUseCase, IdentityConfig, LoginInput, LoginOutcome, LoginUseCase,
    MfaDisableInput, MfaSetupUseCase, RefreshUseCase, RegisterInput, RegisterUseCase,
    VerifyMfaLoginInput, VerifyMfaLoginUseCase,
};
use crate::domain::entity::AuditEventKind;
use crate::domain::service::federation::FederatedIdentity;
use crate::domain::service::token::{Claims, TokenKind, TokenService};
use crate::domain::value_object::{PrincipalId, Role, TotpSecret};
use crate::error::IdentityError;
use crate::infra::memory::InMemoryIdentityRepository;
use crate::presentation::middleware::authenticate_bearer;

const PASSWORD: &str = "TestPassword123!";

struct TestEnv {
    repo: Arc<InMemoryIdentityRepository>,
    config: Arc<IdentityConfig>,
    tokens: Arc<TokenService>,
}

fn env() -> TestEnv {
    let config = Arc::new(IdentityConfig::with_random_secret());
    let tokens = Arc::new(config.token_service());
    TestEnv {
        repo: Arc::new(InMemoryIdentityRepository::new()),
        config,
        tokens,
    }
}

fn client() -> ClientInfo {
    ClientInfo::default()
}

impl TestEnv {
    fn login_uc(&self) -> LoginUseCase<InMemoryIdentityRepository> {
        LoginUseCase::new(self.repo.clone(), self.tokens.clone(), self.config.clone())
    }

    fn verify_uc(&self) -> VerifyMfaLoginUseCase<InMemoryIdentityRepository> {
        VerifyMfaLoginUseCase::new(self.repo.clone(), self.tokens.clone())
    }

    fn mfa_uc(&self) -> MfaSetupUseCase<InMemoryIdentityRepository> {
        MfaSetupUseCase::new(self.repo.clone(), self.config.clone())
    }

    async fn register(&self, email: &str, username: &str) -> PrincipalId {
        let use_case = RegisterUseCase::new(self.repo.clone(), self.config.clone());
        let output = use_case
            .execute(RegisterInput {
                email: email.to_string(),
                username: username.to_string(),
                password: PASSWORD.to_string(),
                phone: None,
            })
            .await
            .expect("registration succeeds");
        PrincipalId::parse_str(&output.principal_id).unwrap()
    }

    /// Full enrollment: setup, then activate with a freshly generated code
    async fn enable_mfa(&self, id: &PrincipalId) -> (String, Vec<String>) {
        let output = self.mfa_uc().setup(id).await.expect("setup succeeds");

        let code = self.current_code(id);
        self.mfa_uc().verify(id, &code).await.expect("first code activates");

        (output.secret, output.recovery_codes)
    }

    /// Generate the currently valid TOTP code from the stored enrollment
    fn current_code(&self, id: &PrincipalId) -> String {
        let principal = self.repo.stored(id).expect("principal exists");
        let enrollment = principal.mfa_enrollment.expect("enrolled");
        enrollment
            .totp_secret
            .current_code(principal.email.as_str())
            .unwrap()
    }
}

// ============================================================================
// Password login
// ============================================================================

mod login_flow_tests {
    use super::*;

    #[tokio::test]
    async fn test_login_without_mfa_returns_access_token() {
        let env = env();
        let id = env.register("mori@example.com", "mori").await;

        let outcome = env
            .login_uc()
            .execute(
                LoginInput {
                    identifier: "mori@example.com".to_string(),
                    password: PASSWORD.to_string(),
                },
                &client(),
            )
            .await
            .unwrap();

        let LoginOutcome::Authenticated { access_token } = outcome else {
            panic!("expected direct authentication");
        };

        let claims = env.tokens.verify(&access_token).unwrap();
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.sub, id.to_string());
        assert_eq!(claims.email.as_deref(), Some("mori@example.com"));
    }

    #[tokio::test]
    async fn test_login_by_username() {
        let env = env();
        env.register("mori@example.com", "Mori").await;

        // canonical lookup: different casing still resolves
        let outcome = env
            .login_uc()
            .execute(
                LoginInput {
                    identifier: "mori".to_string(),
                    password: PASSWORD.to_string(),
                },
                &client(),
            )
            .await;

        assert!(matches!(
            outcome,
            Ok(LoginOutcome::Authenticated { .. })
        ));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_are_indistinguishable() {
        let env = env();
        env.register("mori@example.com", "mori").await;

        let wrong_password = env
            .login_uc()
            .execute(
                LoginInput {
                    identifier: "mori@example.com".to_string(),
                    password: "WrongPassword123!".to_string(),
                },
                &client(),
            )
            .await
            .unwrap_err();

        let unknown_user = env
            .login_uc()
            .execute(
                LoginInput {
                    identifier: "nobody@example.com".to_string(),
                    password: PASSWORD.to_string(),
                },
                &client(),
            )
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, IdentityError::InvalidCredential));
        assert!(matches!(unknown_user, IdentityError::InvalidCredential));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn test_failed_logins_are_audited() {
        let env = env();
        env.register("mori@example.com", "mori").await;

        let _ = env
            .login_uc()
            .execute(
                LoginInput {
                    identifier: "mori@example.com".to_string(),
                    password: "WrongPassword123!".to_string(),
                },
                &client(),
            )
            .await;

        let events = env.repo.recorded_events();
        assert!(events
            .iter()
            .any(|e| e.kind == AuditEventKind::LoginFailed));
    }
}

// ============================================================================
// MFA login protocol
// ============================================================================

mod mfa_login_tests {
    use super::*;

    #[tokio::test]
    async fn test_mfa_login_returns_challenge_and_nothing_else() {
        let env = env();
        let id = env.register("aoki@example.com", "aoki").await;
        env.enable_mfa(&id).await;

        let outcome = env
            .login_uc()
            .execute(
                LoginInput {
                    identifier: "aoki@example.com".to_string(),
                    password: PASSWORD.to_string(),
                },
                &client(),
            )
            .await
            .unwrap();

        let LoginOutcome::ChallengeRequired {
            mfa_token,
            expires_in_seconds,
        } = outcome
        else {
            panic!("expected a challenge");
        };

        assert_eq!(expires_in_seconds, 120);
        // the challenge resolves to the principal, and is NOT an access token
        assert_eq!(env.tokens.resolve_mfa_challenge(&mfa_token), Some(id));
        let claims = env.tokens.verify(&mfa_token).unwrap();
        assert_eq!(claims.kind, TokenKind::Mfa);
    }

    #[tokio::test]
    async fn test_full_mfa_round_trip() {
        let env = env();
        let id = env.register("aoki@example.com", "aoki").await;
        env.enable_mfa(&id).await;

        let LoginOutcome::ChallengeRequired { mfa_token, .. } = env
            .login_uc()
            .execute(
                LoginInput {
                    identifier: "aoki".to_string(),
                    password: PASSWORD.to_string(),
                },
                &client(),
            )
            .await
            .unwrap()
        else {
            panic!("expected a challenge");
        };

        let pair = env
            .verify_uc()
            .execute(
                VerifyMfaLoginInput {
                    mfa_token,
                    code: env.current_code(&id),
                },
                &client(),
            )
            .await
            .unwrap();

        let access = env.tokens.verify(&pair.access_token).unwrap();
        assert_eq!(access.kind, TokenKind::Access);
        assert_eq!(access.sub, id.to_string());

        let refresh = env.tokens.verify(&pair.refresh_token).unwrap();
        assert_eq!(refresh.kind, TokenKind::Refresh);
        assert!(refresh.email.is_none());
        assert!(refresh.role.is_none());
    }

    #[tokio::test]
    async fn test_wrong_code_is_rejected() {
        let env = env();
        let id = env.register("aoki@example.com", "aoki").await;
        env.enable_mfa(&id).await;

        let mfa_token = env.tokens.issue_mfa_challenge(id).unwrap();

        let err = env
            .verify_uc()
            .execute(
                VerifyMfaLoginInput {
                    mfa_token,
                    code: "000000".to_string(),
                },
                &client(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, IdentityError::InvalidOtp));
    }

    #[tokio::test]
    async fn test_expired_challenge_is_rejected() {
        let env = env();
        let id = env.register("aoki@example.com", "aoki").await;
        env.enable_mfa(&id).await;

        // a challenge whose TTL window has fully elapsed
        let now = Utc::now().timestamp();
        let stale = env
            .tokens
            .encode_claims(&Claims {
                iss: env.config.issuer.clone(),
                aud: env.config.audience.clone(),
                sub: id.to_string(),
                iat: now - 300,
                exp: now - 120,
                kind: TokenKind::Mfa,
                scope: Some("MFA".to_string()),
                email: None,
                username: None,
                role: None,
            })
            .unwrap();

        let err = env
            .verify_uc()
            .execute(
                VerifyMfaLoginInput {
                    mfa_token: stale,
                    code: env.current_code(&id),
                },
                &client(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, IdentityError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn test_access_token_cannot_serve_as_challenge() {
        let env = env();
        let id = env.register("aoki@example.com", "aoki").await;
        env.enable_mfa(&id).await;

        let principal = env.repo.stored(&id).unwrap();
        let access = env.tokens.issue_access_token(&principal).unwrap();

        let err = env
            .verify_uc()
            .execute(
                VerifyMfaLoginInput {
                    mfa_token: access,
                    code: env.current_code(&id),
                },
                &client(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, IdentityError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn test_challenge_for_account_without_mfa() {
        let env = env();
        let id = env.register("aoki@example.com", "aoki").await;

        // crafted challenge for a principal that never enabled MFA
        let mfa_token = env.tokens.issue_mfa_challenge(id).unwrap();

        let err = env
            .verify_uc()
            .execute(
                VerifyMfaLoginInput {
                    mfa_token,
                    code: "123456".to_string(),
                },
                &client(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, IdentityError::MfaNotEnabled));
    }
}

// ============================================================================
// MFA enrollment lifecycle
// ============================================================================

mod mfa_setup_tests {
    use super::*;

    #[tokio::test]
    async fn test_setup_persists_enrollment_but_does_not_enable() {
        let env = env();
        let id = env.register("doi@example.com", "doi").await;

        let output = env.mfa_uc().setup(&id).await.unwrap();
        assert!(!output.secret.is_empty());
        assert!(output.otpauth_url.starts_with("otpauth://"));
        assert_eq!(output.recovery_codes.len(), 10);

        let stored = env.repo.stored(&id).unwrap();
        assert!(stored.mfa_enrollment.is_some());
        assert!(!stored.mfa_enabled);

        // login during the pending window must not demand a second factor
        let outcome = env
            .login_uc()
            .execute(
                LoginInput {
                    identifier: "doi".to_string(),
                    password: PASSWORD.to_string(),
                },
                &client(),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, LoginOutcome::Authenticated { .. }));
    }

    #[tokio::test]
    async fn test_verify_setup_flips_enabled() {
        let env = env();
        let id = env.register("doi@example.com", "doi").await;
        env.mfa_uc().setup(&id).await.unwrap();

        let code = env.current_code(&id);
        env.mfa_uc().verify(&id, &code).await.unwrap();

        assert!(env.repo.stored(&id).unwrap().mfa_enabled);
    }

    #[tokio::test]
    async fn test_verify_setup_with_wrong_code() {
        let env = env();
        let id = env.register("doi@example.com", "doi").await;
        env.mfa_uc().setup(&id).await.unwrap();

        let err = env.mfa_uc().verify(&id, "000000").await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidOtp));
        assert!(!env.repo.stored(&id).unwrap().mfa_enabled);
    }

    #[tokio::test]
    async fn test_verify_setup_before_setup() {
        let env = env();
        let id = env.register("doi@example.com", "doi").await;

        let err = env.mfa_uc().verify(&id, "123456").await.unwrap_err();
        assert!(matches!(err, IdentityError::MfaNotEnrolled));
    }

    #[tokio::test]
    async fn test_re_setup_replaces_secret_and_codes() {
        let env = env();
        let id = env.register("doi@example.com", "doi").await;

        let first = env.mfa_uc().setup(&id).await.unwrap();
        let second = env.mfa_uc().setup(&id).await.unwrap();

        assert_ne!(first.secret, second.secret);

        // codes from the first batch no longer match anything
        let mut stored = env.repo.stored(&id).unwrap();
        assert!(!stored.consume_recovery_code(&first.recovery_codes[0]));
        assert!(stored.consume_recovery_code(&second.recovery_codes[0]));
    }

    #[tokio::test]
    async fn test_disable_with_otp() {
        let env = env();
        let id = env.register("doi@example.com", "doi").await;
        env.enable_mfa(&id).await;

        env.mfa_uc()
            .disable(
                &id,
                MfaDisableInput {
                    password: PASSWORD.to_string(),
                    code: Some(env.current_code(&id)),
                    recovery: None,
                },
            )
            .await
            .unwrap();

        let stored = env.repo.stored(&id).unwrap();
        assert!(!stored.mfa_enabled);
        assert!(stored.mfa_enrollment.is_none());
    }

    #[tokio::test]
    async fn test_disable_with_recovery_code() {
        let env = env();
        let id = env.register("doi@example.com", "doi").await;
        let (_, codes) = env.enable_mfa(&id).await;

        env.mfa_uc()
            .disable(
                &id,
                MfaDisableInput {
                    password: PASSWORD.to_string(),
                    code: None,
                    recovery: Some(codes[0].clone()),
                },
            )
            .await
            .unwrap();

        assert!(!env.repo.stored(&id).unwrap().mfa_enabled);
    }

    #[tokio::test]
    async fn test_disable_requires_correct_password() {
        let env = env();
        let id = env.register("doi@example.com", "doi").await;
        env.enable_mfa(&id).await;

        let err = env
            .mfa_uc()
            .disable(
                &id,
                MfaDisableInput {
                    password: "WrongPassword123!".to_string(),
                    code: Some(env.current_code(&id)),
                    recovery: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, IdentityError::InvalidCredential));
        assert!(env.repo.stored(&id).unwrap().mfa_enabled);
    }

    #[tokio::test]
    async fn test_disable_requires_a_second_factor() {
        let env = env();
        let id = env.register("doi@example.com", "doi").await;
        env.enable_mfa(&id).await;

        let err = env
            .mfa_uc()
            .disable(
                &id,
                MfaDisableInput {
                    password: PASSWORD.to_string(),
                    code: None,
                    recovery: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, IdentityError::Validation(_)));
    }

    #[tokio::test]
    async fn test_disable_with_bad_recovery_code() {
        let env = env();
        let id = env.register("doi@example.com", "doi").await;
        env.enable_mfa(&id).await;

        let err = env
            .mfa_uc()
            .disable(
                &id,
                MfaDisableInput {
                    password: PASSWORD.to_string(),
                    code: None,
                    recovery: Some("99999-99999".to_string()),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, IdentityError::InvalidRecoveryCode));
    }

    #[tokio::test]
    async fn test_disable_without_mfa() {
        let env = env();
        let id = env.register("doi@example.com", "doi").await;

        let err = env
            .mfa_uc()
            .disable(
                &id,
                MfaDisableInput {
                    password: PASSWORD.to_string(),
                    code: None,
                    recovery: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, IdentityError::MfaNotEnabled));
    }
}

// ============================================================================
// Federated login
// ============================================================================

mod federated_tests {
    use super::*;

    fn identity(email: &str) -> FederatedIdentity {
        FederatedIdentity {
            email: email.to_string(),
            subject: format!("idp|{email}"),
            display_name: None,
        }
    }

    #[tokio::test]
    async fn test_first_federated_login_provisions_principal() {
        let env = env();

        let outcome = env
            .login_uc()
            .execute_federated(identity("new@example.com"), &client())
            .await
            .unwrap();

        let LoginOutcome::Authenticated { access_token } = outcome else {
            panic!("expected direct authentication");
        };

        let claims = env.tokens.verify(&access_token).unwrap();
        let id = claims.principal_id().unwrap();
        let stored = env.repo.stored(&id).unwrap();

        assert_eq!(stored.email.as_str(), "new@example.com");
        assert_eq!(stored.role, Role::PetOwner);
        assert_eq!(stored.federated_subject.as_deref(), Some("idp|new@example.com"));
        // structurally valid password hash that nobody knows
        assert!(stored.password_hash.is_some());

        let events = env.repo.recorded_events();
        assert!(events
            .iter()
            .any(|e| e.kind == AuditEventKind::FederatedPrincipalProvisioned));
    }

    #[tokio::test]
    async fn test_second_federated_login_reuses_principal() {
        let env = env();

        let first = env
            .login_uc()
            .execute_federated(identity("new@example.com"), &client())
            .await
            .unwrap();
        let second = env
            .login_uc()
            .execute_federated(identity("new@example.com"), &client())
            .await
            .unwrap();

        let sub = |outcome: LoginOutcome| match outcome {
            LoginOutcome::Authenticated { access_token } => {
                env.tokens.verify(&access_token).unwrap().sub
            }
            _ => panic!("expected direct authentication"),
        };

        assert_eq!(sub(first), sub(second));
    }

    #[tokio::test]
    async fn test_federated_login_links_existing_local_account() {
        let env = env();
        let id = env.register("mori@example.com", "mori").await;

        let outcome = env
            .login_uc()
            .execute_federated(identity("mori@example.com"), &client())
            .await
            .unwrap();

        let LoginOutcome::Authenticated { access_token } = outcome else {
            panic!("expected direct authentication");
        };
        assert_eq!(
            env.tokens.verify(&access_token).unwrap().sub,
            id.to_string()
        );
    }

    #[tokio::test]
    async fn test_federated_login_cannot_bypass_mfa() {
        let env = env();
        let id = env.register("mori@example.com", "mori").await;
        env.enable_mfa(&id).await;

        // entering through the federated path converges on the same
        // decision point: still a challenge, still no tokens
        let outcome = env
            .login_uc()
            .execute_federated(identity("mori@example.com"), &client())
            .await
            .unwrap();

        assert!(matches!(outcome, LoginOutcome::ChallengeRequired { .. }));
    }

    #[tokio::test]
    async fn test_provisioned_usernames_do_not_collide() {
        let env = env();
        env.register("jane@one.example", "jane").await;

        let outcome = env
            .login_uc()
            .execute_federated(identity("jane@two.example"), &client())
            .await
            .unwrap();

        let LoginOutcome::Authenticated { access_token } = outcome else {
            panic!("expected direct authentication");
        };
        let id = env.tokens.verify(&access_token).unwrap().principal_id().unwrap();
        let stored = env.repo.stored(&id).unwrap();
        assert_eq!(stored.username.as_str(), "jane1");
    }
}

// ============================================================================
// Refresh and request authentication
// ============================================================================

mod token_consumer_tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue, header};

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn test_refresh_token_yields_new_access_token() {
        let env = env();
        let id = env.register("ito@example.com", "ito").await;
        let principal = env.repo.stored(&id).unwrap();

        let refresh_token = env.tokens.issue_refresh_token(&principal).unwrap();
        let use_case = RefreshUseCase::new(env.repo.clone(), env.tokens.clone());

        let access = use_case.execute(&refresh_token).await.unwrap();
        let claims = env.tokens.verify(&access).unwrap();
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.sub, id.to_string());
    }

    #[tokio::test]
    async fn test_access_token_cannot_refresh() {
        let env = env();
        let id = env.register("ito@example.com", "ito").await;
        let principal = env.repo.stored(&id).unwrap();

        let access_token = env.tokens.issue_access_token(&principal).unwrap();
        let use_case = RefreshUseCase::new(env.repo.clone(), env.tokens.clone());

        let err = use_case.execute(&access_token).await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn test_authenticate_bearer_accepts_only_access_tokens() {
        let env = env();
        let id = env.register("ito@example.com", "ito").await;
        let principal = env.repo.stored(&id).unwrap();

        let access = env.tokens.issue_access_token(&principal).unwrap();
        let caller = authenticate_bearer(env.repo.as_ref(), &env.tokens, &bearer(&access))
            .await
            .unwrap();
        assert_eq!(caller.principal_id, id);
        assert_eq!(caller.role, Role::PetOwner);
        assert!(caller.has_authority(Role::PetOwner));

        // refresh and challenge tokens are not bearer credentials
        let refresh = env.tokens.issue_refresh_token(&principal).unwrap();
        assert!(
            authenticate_bearer(env.repo.as_ref(), &env.tokens, &bearer(&refresh))
                .await
                .is_err()
        );

        let challenge = env.tokens.issue_mfa_challenge(id).unwrap();
        assert!(
            authenticate_bearer(env.repo.as_ref(), &env.tokens, &bearer(&challenge))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_authenticate_bearer_missing_header() {
        let env = env();
        let err = authenticate_bearer(env.repo.as_ref(), &env.tokens, &HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn test_change_password() {
        let env = env();
        let id = env.register("ito@example.com", "ito").await;

        let use_case = ChangePasswordUseCase::new(env.repo.clone(), env.config.clone());
        use_case
            .execute(
                &id,
                PASSWORD.to_string(),
                "EntirelyNewPass456!".to_string(),
            )
            .await
            .unwrap();

        // old password no longer logs in, new one does
        let old = env
            .login_uc()
            .execute(
                LoginInput {
                    identifier: "ito".to_string(),
                    password: PASSWORD.to_string(),
                },
                &client(),
            )
            .await;
        assert!(old.is_err());

        let new = env
            .login_uc()
            .execute(
                LoginInput {
                    identifier: "ito".to_string(),
                    password: "EntirelyNewPass456!".to_string(),
                },
                &client(),
            )
            .await;
        assert!(new.is_ok());
    }

    #[tokio::test]
    async fn test_change_password_requires_current() {
        let env = env();
        let id = env.register("ito@example.com", "ito").await;

        let use_case = ChangePasswordUseCase::new(env.repo.clone(), env.config.clone());
        let err = use_case
            .execute(
                &id,
                "WrongPassword123!".to_string(),
                "EntirelyNewPass456!".to_string(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, IdentityError::InvalidCredential));
    }
}

// ============================================================================
// Registration
// ============================================================================

mod register_tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let env = env();
        env.register("uno@example.com", "uno").await;

        let use_case = RegisterUseCase::new(env.repo.clone(), env.config.clone());
        let err = use_case
            .execute(RegisterInput {
                email: "uno@example.com".to_string(),
                username: "other".to_string(),
                password: PASSWORD.to_string(),
                phone: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, IdentityError::EmailTaken));
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let env = env();
        env.register("uno@example.com", "uno").await;

        let use_case = RegisterUseCase::new(env.repo.clone(), env.config.clone());
        let err = use_case
            .execute(RegisterInput {
                email: "other@example.com".to_string(),
                username: "UNO".to_string(), // canonical collision
                password: PASSWORD.to_string(),
                phone: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, IdentityError::UsernameTaken));
    }

    #[tokio::test]
    async fn test_weak_password_rejected() {
        let env = env();
        let use_case = RegisterUseCase::new(env.repo.clone(), env.config.clone());

        let err = use_case
            .execute(RegisterInput {
                email: "uno@example.com".to_string(),
                username: "uno".to_string(),
                password: "short".to_string(),
                phone: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, IdentityError::Validation(_)));
    }

    #[tokio::test]
    async fn test_phone_is_stored() {
        let env = env();
        let use_case = RegisterUseCase::new(env.repo.clone(), env.config.clone());

        let output = use_case
            .execute(RegisterInput {
                email: "uno@example.com".to_string(),
                username: "uno".to_string(),
                password: PASSWORD.to_string(),
                phone: Some("03-1234-5678".to_string()),
            })
            .await
            .unwrap();

        let id = PrincipalId::parse_str(&output.principal_id).unwrap();
        let stored = env.repo.stored(&id).unwrap();
        assert_eq!(stored.phone.as_deref(), Some("03-1234-5678"));
    }
}

// ============================================================================
// TOTP secret of a stored enrollment round-trips through verify
// ============================================================================

mod enrollment_consistency_tests {
    use super::*;

    #[tokio::test]
    async fn test_setup_secret_matches_stored_secret() {
        let env = env();
        let id = env.register("sano@example.com", "sano").await;

        let output = env.mfa_uc().setup(&id).await.unwrap();

        // the secret handed to the user is exactly the persisted one: a
        // code generated from the response verifies against the store
        let secret = TotpSecret::from_base32(output.secret).unwrap();
        let code = secret.current_code("sano@example.com").unwrap();

        let stored = env.repo.stored(&id).unwrap();
        assert!(stored.verify_mfa_code(&code));
    }
}
