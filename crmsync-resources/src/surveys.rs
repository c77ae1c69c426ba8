//! Embedded survey sign-in.

use crate::crm::Crm;
use crmsync_client::ApiResult;
use crmsync_query::{Query, Resource, keys};
use crmsync_types::LoginToken;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Surveys {
    crm: Crm,
}

impl Surveys {
    pub(crate) fn new(crm: Crm) -> Self {
        Self { crm }
    }

    /// One-time login token for the survey platform. Tokens are single use,
    /// so the cached value is always stale.
    pub fn login_token(&self) -> Query<LoginToken> {
        let key = keys::all(Resource::Surveys).with("login_token");
        self.crm
            .get_query(Some((key, "/formbricks/login-token".to_string())))
            .with_stale_time(Duration::ZERO)
    }

    /// Iframe URL signing the user into the survey platform with `token`.
    pub fn embed_url(&self, token: &LoginToken) -> String {
        embed_url(&self.crm.api().config().survey_url, &token.token)
    }

    /// Fetches a fresh token and returns the iframe URL.
    pub async fn fetch_embed_url(&self) -> ApiResult<String> {
        let token = self.login_token().refetch().await.into_result()?;
        debug!("survey login token issued");
        Ok(self.embed_url(&token))
    }
}

fn embed_url(survey_url: &str, token: &str) -> String {
    let separator = if survey_url.contains('?') { '&' } else { '?' };
    format!("{survey_url}{separator}token={}", urlencoding::encode(token))
}
