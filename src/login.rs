// ABOUTME: Interactive login form for the authorize endpoint
// ABOUTME: Renders an HTML form posting back to the same URL and parses the submission
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mock-oauth2-server contributors

use std::collections::HashMap;

use url::Url;

use crate::errors::{ErrorObject, HandlerError};
use crate::grants::AuthenticationRequest;

/// Identity submitted through the login form.
#[derive(Debug, Clone)]
pub struct Login {
    /// Username, used as the token subject
    pub username: String,
}

impl Login {
    /// Parse the submitted login form.
    ///
    /// # Errors
    /// Returns a parse failure carrying an `invalid_request` error object
    /// when `username` is missing or empty.
    pub fn from_form(form: &HashMap<String, String>) -> Result<Self, HandlerError> {
        let username = form
            .get("username")
            .map(String::as_str)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                HandlerError::parse(ErrorObject::invalid_request("missing username parameter"))
            })?;
        Ok(Self {
            username: username.to_owned(),
        })
    }
}

/// Render the login form for an authentication request.
///
/// The form posts back to the request's own URL so the query string (and
/// with it the full authentication request) survives the round trip.
#[must_use]
pub fn render_login_form(action_url: &Url, request: &AuthenticationRequest) -> String {
    let action = match action_url.query() {
        Some(query) => format!("{}?{query}", action_url.path()),
        None => action_url.path().to_owned(),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Mock OAuth2 Server - Sign In</title>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 40px; }}
        .login-form {{ max-width: 400px; margin: 0 auto; padding: 20px; border: 1px solid #ddd; border-radius: 8px; }}
        .client-info {{ background-color: #f8f9fa; padding: 15px; border-radius: 4px; margin-bottom: 20px; }}
        label {{ display: block; margin-bottom: 5px; font-weight: bold; }}
        input {{ width: 100%; padding: 8px; border: 1px solid #ccc; border-radius: 4px; }}
        button {{ margin-top: 15px; background-color: #007bff; color: white; padding: 10px 20px; border: none; border-radius: 4px; cursor: pointer; }}
    </style>
</head>
<body>
    <div class="login-form">
        <h2>Sign In</h2>
        <div class="client-info">
            <strong>Client:</strong> {client_id}<br>
            <strong>Scope:</strong> {scope}
        </div>
        <form method="post" action="{action}">
            <label for="username">Username:</label>
            <input type="text" id="username" name="username" autofocus required>
            <button type="submit">Sign In</button>
        </form>
    </div>
</body>
</html>
"#,
        client_id = request.client_id,
        scope = request.scope.as_deref().unwrap_or("(none)"),
        action = action,
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn form_requires_username() {
        let mut form = HashMap::new();
        assert!(Login::from_form(&form).is_err());

        form.insert("username".to_owned(), "alice".to_owned());
        let login = Login::from_form(&form).expect("login");
        assert_eq!(login.username, "alice");
    }

    #[test]
    fn rendered_form_posts_back_to_request_url() {
        let url = Url::parse("http://localhost/default/authorize?client_id=c1&redirect_uri=r")
            .expect("static url");
        let request = AuthenticationRequest::from_query(&url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect())
        .expect("auth request");

        let html = render_login_form(&url, &request);
        assert!(html.contains(r#"action="/default/authorize?client_id=c1&redirect_uri=r""#));
        assert!(html.contains("name=\"username\""));
    }
}
