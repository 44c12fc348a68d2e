use fanshop_facebook::{TokenCheck, TokenValidator};
use fanshop_persist::trait_client::MAX_PAGE_LIMIT;
use fanshop_persist::{Page, Persistence, TokenStatusUpdate};
use fanshop_types::{ApiToken, Record};

use crate::error::{ApiError, ApiResult};

/// Fields persisted on the ApiToken from a check result
pub fn status_update(check: &TokenCheck) -> TokenStatusUpdate {
    TokenStatusUpdate {
        status: check.status,
        message: Some(check.message.clone()).filter(|m| !m.is_empty()),
        scopes: check.scopes.clone(),
        checked_at: check.checked_at,
    }
}

/// Check a stored token against the provider and record the outcome
pub async fn validate_stored(
    persist: &dyn Persistence,
    validator: &dyn TokenValidator,
    id: &str,
) -> ApiResult<ApiToken> {
    let token = persist
        .api_tokens()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found(ApiToken::KIND, id))?;

    let check = validator.validate(&token.token).await;
    tracing::info!(
        token_id = %id,
        status = check.status.as_str(),
        "Token checked"
    );

    persist
        .api_tokens()
        .update_status(id, &status_update(&check))
        .await?
        .ok_or_else(|| ApiError::not_found(ApiToken::KIND, id))
}

/// Replace a stored token with `new_token` once the provider accepts it.
/// A rejected token leaves the stored document untouched.
pub async fn rotate(
    persist: &dyn Persistence,
    validator: &dyn TokenValidator,
    id: &str,
    new_token: &str,
    notes: Option<String>,
) -> ApiResult<ApiToken> {
    let new_token = new_token.trim();
    if new_token.is_empty() {
        return Err(ApiError::field("newToken", "must not be empty"));
    }

    persist
        .api_tokens()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found(ApiToken::KIND, id))?;

    let check = validator.validate(new_token).await;
    if !check.is_valid() {
        tracing::warn!(
            token_id = %id,
            status = check.status.as_str(),
            "Rotation rejected"
        );
        return Err(ApiError::field(
            "newToken",
            format!("token is {}: {}", check.status.as_str(), check.message),
        ));
    }

    let rotated = persist
        .api_tokens()
        .rotate(id, new_token, &status_update(&check), notes)
        .await?
        .ok_or_else(|| ApiError::not_found(ApiToken::KIND, id))?;

    tracing::info!(token_id = %id, "Token rotated");
    Ok(rotated)
}

/// Check every stored token, returning how each came out. Tokens that fail
/// to update are logged and left out.
pub async fn check_all(persist: &dyn Persistence, validator: &dyn TokenValidator) -> ApiResult<Vec<ApiToken>> {
    let mut checked = Vec::new();
    let mut skip = 0u64;

    loop {
        let page = persist
            .api_tokens()
            .list(Page::new(Some(MAX_PAGE_LIMIT), Some(skip)))
            .await?;
        if page.is_empty() {
            break;
        }
        skip += page.len() as u64;

        for token in page {
            match validate_stored(persist, validator, &token.id).await {
                Ok(updated) => checked.push(updated),
                Err(e) => tracing::error!(token_id = %token.id, error = %e, "Token check failed"),
            }
        }
    }

    Ok(checked)
}
