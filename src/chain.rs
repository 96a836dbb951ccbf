use crate::auth::{
    AuthResponse, AuthenticationRequest, IdentityUpdate, PrimaryAuthenticationProvider,
};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of walking the chain for one attempt.
#[derive(Debug)]
pub struct ChainOutcome {
    pub response: AuthResponse,
    /// Index of the provider that answered, `None` when every provider abstained.
    pub provider: Option<usize>,
}

/// Ordered list of primary providers consulted for each login attempt.
#[derive(Default)]
pub struct AuthenticationChain {
    providers: Vec<Arc<dyn PrimaryAuthenticationProvider>>,
}

impl AuthenticationChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: Arc<dyn PrimaryAuthenticationProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Ask each provider in turn; the first one that does not abstain decides.
    pub async fn begin(&self, reqs: &[AuthenticationRequest]) -> Result<ChainOutcome> {
        for (index, provider) in self.providers.iter().enumerate() {
            let response = provider.begin_primary_authentication(reqs).await?;
            if response.is_abstain() {
                debug!("Provider '{}' abstained", provider.name());
                continue;
            }

            info!("Provider '{}' answered: {}", provider.name(), response);
            return Ok(ChainOutcome { response, provider: Some(index) });
        }

        Ok(ChainOutcome {
            response: AuthResponse::Fail {
                message: "no primary provider accepted the request".to_string(),
            },
            provider: None,
        })
    }

    /// Run post-authentication on the provider that accepted the attempt.
    pub fn finish(&self, identity: &mut dyn IdentityUpdate, outcome: &ChainOutcome) -> Result<()> {
        let Some(provider) = outcome.provider.and_then(|index| self.providers.get(index)) else {
            return Ok(());
        };

        match &outcome.response {
            AuthResponse::Pass { .. } => provider.post_authentication(identity, &outcome.response),
            AuthResponse::Fail { .. }
            | AuthResponse::Abstain
            | AuthResponse::Ui { .. }
            | AuthResponse::Redirect { .. } => Ok(()),
        }
    }
}
