// ABOUTME: OIDC/OAuth2 discovery metadata served on the well-known endpoints
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mock-oauth2-server contributors

use serde::{Deserialize, Serialize};
use url::Url;

use crate::grants::GrantType;

/// Discovery document describing one issuer's endpoints and capabilities.
///
/// Served on both the OIDC (`openid-configuration`) and OAuth2
/// (`oauth-authorization-server`) well-known aliases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WellKnownConfiguration {
    /// Issuer base URL
    pub issuer: String,
    /// Authorization endpoint
    pub authorization_endpoint: String,
    /// Token endpoint
    pub token_endpoint: String,
    /// End-session (logout) endpoint
    pub end_session_endpoint: String,
    /// JWKS endpoint
    pub jwks_uri: String,
    /// Supported response types
    pub response_types_supported: Vec<String>,
    /// Supported subject identifier types
    pub subject_types_supported: Vec<String>,
    /// ID-token signing algorithms
    pub id_token_signing_alg_values_supported: Vec<String>,
    /// Supported grant types
    pub grant_types_supported: Vec<String>,
    /// Supported token-endpoint client authentication methods
    pub token_endpoint_auth_methods_supported: Vec<String>,
}

impl WellKnownConfiguration {
    /// Build the document for `issuer_url`.
    #[must_use]
    pub fn for_issuer(issuer_url: &Url) -> Self {
        let issuer = issuer_url.as_str().trim_end_matches('/').to_owned();
        Self {
            authorization_endpoint: format!("{issuer}/authorize"),
            token_endpoint: format!("{issuer}/token"),
            end_session_endpoint: format!("{issuer}/endsession"),
            jwks_uri: format!("{issuer}/jwks"),
            issuer,
            response_types_supported: vec!["code".to_owned()],
            subject_types_supported: vec!["public".to_owned()],
            id_token_signing_alg_values_supported: vec!["RS256".to_owned()],
            grant_types_supported: GrantType::all()
                .into_iter()
                .map(|grant_type| grant_type.as_str().to_owned())
                .collect(),
            token_endpoint_auth_methods_supported: vec![
                "client_secret_basic".to_owned(),
                "client_secret_post".to_owned(),
            ],
        }
    }
}
