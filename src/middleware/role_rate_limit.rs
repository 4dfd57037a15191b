use axum::http::Request;
use std::sync::Arc;
use tower_governor::{
    governor::GovernorConfigBuilder,
    key_extractor::KeyExtractor,
    GovernorError, GovernorLayer,
};
use uuid::Uuid;

use crate::middleware::rate_limit::rate_limit_error_handler;
use crate::utils::jwt::Claims;

/// Buckets requests by the staff member or driver behind the token, so a
/// shared front-desk IP does not throttle every clerk at once.
#[derive(Debug, Clone, Copy)]
pub struct AccountKeyExtractor;

impl KeyExtractor for AccountKeyExtractor {
    type Key = Uuid;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        req.extensions()
            .get::<Claims>()
            .map(|claims| claims.sub)
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

pub type RoleGovernorLayer = GovernorLayer<
    AccountKeyExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    axum::body::Body,
>;

/// Route groups with a per-account budget. Admin routes only sit behind the
/// global per-IP limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitedRole {
    Staff,
    Driver,
}

impl RateLimitedRole {
    /// `(replenish interval in ms, burst size)`.
    pub fn budget(self) -> (u64, u32) {
        match self {
            // 600/min; check-in rush produces bursts of lookups and amendments
            RateLimitedRole::Staff => (100, 600),
            // 120/min; the driver app mostly polls its trip list
            RateLimitedRole::Driver => (500, 120),
        }
    }
}

pub fn create_role_governor(role: RateLimitedRole) -> RoleGovernorLayer {
    let (per_ms, burst) = role.budget();

    let config = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(burst)
            .key_extractor(AccountKeyExtractor)
            .finish()
            .expect("role governor configuration is valid"),
    );

    tracing::debug!(role = ?role, per_ms, burst, "Role rate limiter configured");
    GovernorLayer::new(config).error_handler(rate_limit_error_handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::user::UserRole;

    #[test]
    fn test_budgets_per_minute() {
        for (role, per_minute) in [(RateLimitedRole::Staff, 600), (RateLimitedRole::Driver, 120)] {
            let (per_ms, _) = role.budget();
            assert_eq!(60_000 / per_ms, per_minute);
        }
    }

    #[test]
    fn test_key_is_token_subject() {
        let sub = Uuid::new_v4();
        let mut req = Request::new(());
        req.extensions_mut().insert(Claims {
            sub,
            email: "desk@hotel.test".to_string(),
            role: UserRole::Staff,
            exp: 0,
            iat: 0,
        });

        assert_eq!(AccountKeyExtractor.extract(&req).unwrap(), sub);
    }

    #[test]
    fn test_missing_claims_cannot_be_keyed() {
        let req = Request::new(());
        assert!(AccountKeyExtractor.extract(&req).is_err());
    }
}
