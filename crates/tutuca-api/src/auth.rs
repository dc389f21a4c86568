use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{SecondsFormat, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use tutuca_db::models::NewProfile;
use tutuca_db::{Database, is_unique_violation};
use tutuca_types::api::{Claims, SessionResponse, SignInRequest, SignUpRequest};
use tutuca_types::models::Profile;

use crate::error::ApiError;
use crate::extract::Json;
use crate::with_db;

/// Argon2id hash of no real password, with the default cost parameters.
/// Sign-in verifies against it when the email is unknown so that a miss
/// costs as much as a wrong password.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$nnk/yBTFckgOY21bXMN02A$uaT9rW8fh+t2IxG1xMYRYltkaZPYnKuyguuDZHyYQ3s";

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub session_ttl: chrono::Duration,
}

pub async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = register(&state, req).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Creates an identity plus profile and opens a session for it. Shared by the
/// HTTP handler and the `create-user` command.
pub async fn register(state: &AppState, req: SignUpRequest) -> Result<SessionResponse, ApiError> {
    let req = check_credentials(req)?;

    let metadata = req.data;
    let full_name = non_empty(metadata.full_name.as_deref())
        .unwrap_or(metadata.user_type.default_full_name())
        .to_string();
    let company_name = non_empty(metadata.company_name.as_deref())
        .unwrap_or(full_name.as_str())
        .to_string();
    let user_type = metadata.user_type;
    let metadata_json = serde_json::to_string(&metadata).map_err(anyhow::Error::from)?;

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();

    let user_id = Uuid::new_v4().to_string();
    let account_email = req.email.clone();
    let row = with_db(state, move |db| {
        db.create_account(
            &user_id,
            &account_email,
            &password_hash,
            &metadata_json,
            &NewProfile {
                full_name: Some(full_name.as_str()),
                company_name: Some(company_name.as_str()),
                user_type: user_type.as_str(),
            },
        )
    })
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::Conflict("User already registered".into())
        } else {
            e.into()
        }
    })?;

    let profile = Profile::try_from(row)?;
    info!("Registered {} {} ({})", profile.user_type, profile.email, profile.id);

    open_session(state, profile).await
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid login credentials".into());

    let email = req.email.trim().to_lowercase();
    let lookup = email.clone();
    let Some(identity) = with_db(&state, move |db| db.get_identity_by_email(&lookup)).await? else {
        password_matches(&req.password, DUMMY_HASH)?;
        warn!("Sign-in for unknown email {}", email);
        return Err(invalid());
    };

    if !password_matches(&req.password, &identity.password)
        .map_err(|e| e.context(format!("identity {}", identity.id)))?
    {
        warn!("Failed sign-in for {}", identity.email);
        return Err(invalid());
    }

    let identity_id = identity.id.clone();
    let row = with_db(&state, move |db| db.get_profile(&identity_id))
        .await?
        .ok_or_else(|| anyhow::anyhow!("identity {} has no profile", identity.id))?;
    let profile = Profile::try_from(row)?;

    Ok(Json(open_session(&state, profile).await?))
}

pub async fn sign_out(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    let sid = claims.sid.to_string();
    with_db(&state, move |db| db.revoke_session(&sid)).await?;
    info!("Session {} for {} signed out", claims.sid, claims.email);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn current_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Profile>, ApiError> {
    let id = claims.sub.to_string();
    let row = with_db(&state, move |db| db.get_profile(&id))
        .await?
        .ok_or(ApiError::NotFound("profile"))?;
    Ok(Json(Profile::try_from(row)?))
}

async fn open_session(state: &AppState, profile: Profile) -> Result<SessionResponse, ApiError> {
    let sid = Uuid::new_v4();
    let expires_at = Utc::now() + state.session_ttl;

    let claims = Claims {
        sub: profile.id,
        sid,
        email: profile.email.clone(),
        user_type: profile.user_type,
        exp: expires_at.timestamp() as usize,
    };
    let token = create_token(&state.jwt_secret, &claims)?;

    let session_id = sid.to_string();
    let identity_id = profile.id.to_string();
    let expires = expires_at.to_rfc3339_opts(SecondsFormat::Millis, true);
    with_db(state, move |db| db.create_session(&session_id, &identity_id, &expires)).await?;

    Ok(SessionResponse {
        token,
        redirect: profile.user_type.dashboard_path().to_string(),
        profile,
    })
}

fn create_token(secret: &str, claims: &Claims) -> anyhow::Result<String> {
    let token = encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

fn password_matches(password: &str, phc: &str) -> anyhow::Result<bool> {
    let parsed_hash =
        PasswordHash::new(phc).map_err(|e| anyhow::anyhow!("corrupt password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Trims and lower-cases the email, then validates both credentials. The
/// email is reported first when both are wrong.
fn check_credentials(mut req: SignUpRequest) -> Result<SignUpRequest, ApiError> {
    req.email = req.email.trim().to_lowercase();
    req.validate().map_err(validation_error)?;
    Ok(req)
}

fn validation_error(errors: ValidationErrors) -> ApiError {
    let fields = errors.field_errors();
    let message = ["email", "password"]
        .iter()
        .filter_map(|field| fields.get(*field))
        .flat_map(|list| list.iter())
        .find_map(|error| error.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| errors.to_string());
    ApiError::BadRequest(message)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutuca_types::api::SignUpMetadata;
    use tutuca_types::models::UserType;

    fn request(email: &str, password: &str) -> SignUpRequest {
        SignUpRequest {
            email: email.into(),
            password: password.into(),
            data: SignUpMetadata {
                user_type: UserType::Brand,
                full_name: None,
                company_name: None,
            },
        }
    }

    fn rejection(email: &str, password: &str) -> String {
        match check_credentials(request(email, password)) {
            Err(ApiError::BadRequest(message)) => message,
            other => panic!("{email:?}/{password:?} accepted: {other:?}"),
        }
    }

    #[test]
    fn emails_are_normalized() {
        let req = check_credentials(request("  Marca@Tutuca.CO ", "secret123")).unwrap();
        assert_eq!(req.email, "marca@tutuca.co");
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for bad in [
            "",
            "marca",
            "@tutuca.co",
            "marca@",
            "ma rca@tutuca.co",
            "a@b@c.co",
            "a@.co",
            "a@b..co",
            "<x>@y.co",
            "a\"b@c.co",
            "a@-x.co",
        ] {
            assert_eq!(
                rejection(bad, "secret123"),
                "Unable to validate email address: invalid format",
                "{bad}"
            );
        }
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert_eq!(rejection("a@tutuca.co", "12345"), "Password should be at least 6 characters");
    }

    #[test]
    fn password_length_counts_characters() {
        // six bytes, three characters
        assert_eq!(rejection("a@tutuca.co", "ñññ"), "Password should be at least 6 characters");
        assert!(check_credentials(request("a@tutuca.co", "ññññññ")).is_ok());
    }

    #[test]
    fn email_error_wins_over_password_error() {
        assert_eq!(rejection("nope", "1"), "Unable to validate email address: invalid format");
    }

    #[test]
    fn dummy_hash_parses_and_matches_nothing() {
        assert!(!password_matches("", DUMMY_HASH).unwrap());
        assert!(!password_matches("secret123", DUMMY_HASH).unwrap());
    }

    #[test]
    fn blank_names_fall_back() {
        assert_eq!(non_empty(Some("  ")), None);
        assert_eq!(non_empty(Some(" Marca ")), Some("Marca"));
        assert_eq!(non_empty(None), None);
    }
}
