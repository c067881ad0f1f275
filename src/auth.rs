use crate::db::{self, NewUser, User};
use crate::error::AppError;
use crate::startup::AppState;
use crate::utils::validate_wallet_address;
use axum::http::HeaderMap;
use tracing::debug;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const WALLET_ADDRESS_HEADER: &str = "x-wallet-address";
pub const FARCASTER_ID_HEADER: &str = "x-farcaster-id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub wallet_address: Option<String>,
    pub farcaster_id: Option<String>,
}

/// Resolves the caller's identity from an inbound request.
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, headers: &HeaderMap) -> Result<Identity, AppError>;
}

/// Trusts the identity headers exactly as the client sent them. Nothing is
/// checked cryptographically, so any caller can claim any user id.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderVerifier;

impl IdentityVerifier for HeaderVerifier {
    fn verify(&self, headers: &HeaderMap) -> Result<Identity, AppError> {
        let user_id = header_value(headers, USER_ID_HEADER)
            .ok_or_else(|| AppError::Authentication("Authentication required".to_string()))?;

        let wallet_address = header_value(headers, WALLET_ADDRESS_HEADER);
        if let Some(address) = wallet_address.as_deref() {
            validate_wallet_address(address)?;
        }

        Ok(Identity {
            user_id,
            wallet_address,
            farcaster_id: header_value(headers, FARCASTER_ID_HEADER),
        })
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Verifies the caller and returns their stored user, creating it on first contact.
pub async fn authenticate(app_state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let identity = app_state.verifier.verify(headers)?;
    debug!("Authenticated {}", identity.user_id);

    let user = db::get_or_create_user(
        &app_state.db,
        NewUser {
            user_id: Some(identity.user_id),
            wallet_address: identity.wallet_address,
            farcaster_id: identity.farcaster_id,
            token_balance: Some(0),
        },
    )
    .await?;

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn test_missing_user_id_is_unauthenticated() {
        let err = HeaderVerifier.verify(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));

        let err = HeaderVerifier
            .verify(&headers(&[(USER_ID_HEADER, "   ")]))
            .unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[test]
    fn test_reads_identity_headers() {
        let identity = HeaderVerifier
            .verify(&headers(&[
                (USER_ID_HEADER, "demo-user-123"),
                (WALLET_ADDRESS_HEADER, "0x742d35Cc6634C0532925a3b844Bc454e4438f44e"),
                (FARCASTER_ID_HEADER, "demo-farcaster-456"),
            ]))
            .unwrap();

        assert_eq!(identity.user_id, "demo-user-123");
        assert_eq!(
            identity.wallet_address.as_deref(),
            Some("0x742d35Cc6634C0532925a3b844Bc454e4438f44e")
        );
        assert_eq!(identity.farcaster_id.as_deref(), Some("demo-farcaster-456"));
    }

    #[test]
    fn test_malformed_wallet_rejected() {
        let err = HeaderVerifier
            .verify(&headers(&[
                (USER_ID_HEADER, "demo-user-123"),
                (WALLET_ADDRESS_HEADER, "not-a-wallet"),
            ]))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
