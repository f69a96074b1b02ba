/// Token probe: asks the identity provider whether a bearer token is live.
///
/// Backs `GET /api/test-token`. The provider's `userinfo` endpoint is the
/// authority on validity; the roles in the answer are read from the token
/// payload for display only.
use serde_json::{Value, json};

use crate::auth::{self, claims};
use crate::environment::EnvironmentProfile;
use crate::reply::JsonReply;

pub fn probe_token(
    agent: &ureq::Agent,
    profile: &EnvironmentProfile,
    authorization: Option<&str>,
) -> JsonReply {
    let Some(token) = authorization.and_then(|h| auth::bearer_token(h).ok()) else {
        return JsonReply::error(401, "No token provided");
    };

    let url = profile.openid_endpoint("userinfo");
    let result = agent
        .get(&url)
        .set("Authorization", &format!("Bearer {token}"))
        .call();

    match result {
        Ok(resp) => {
            let user: Value = match resp.into_json() {
                Ok(user) => user,
                Err(error) => return JsonReply::error(500, error.to_string()),
            };
            let claims = claims::decode_unverified(token).unwrap_or_default();
            JsonReply::ok(json!({
                "valid": true,
                "user": user,
                "roles": {
                    "realm_access": claims.realm_access,
                    "resource_access": claims.resource_access,
                },
                "effective_roles": claims.effective_roles(&profile.client_id),
                "message": "Token is valid",
            }))
        }
        Err(ureq::Error::Status(code, _)) => JsonReply::new(
            401,
            json!({ "valid": false, "message": format!("Token validation failed: {code}") }),
        ),
        Err(error) => {
            tracing::error!(url = %url, %error, "userinfo request failed");
            JsonReply::error(500, error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;

    #[test]
    fn missing_token_is_401() {
        let agent = ureq::AgentBuilder::new().build();
        let profile = EnvironmentProfile::builtin(Environment::Development);
        let reply = probe_token(&agent, &profile, None);
        assert_eq!(reply.status, 401);
        assert_eq!(reply.body["error"], "No token provided");

        let reply = probe_token(&agent, &profile, Some("Basic abc"));
        assert_eq!(reply.status, 401);
    }
}
