//! Wire types of the cloud API

use serde::{Deserialize, Serialize};

/// Header carrying the user's token
pub const TOKEN_HEADER: &str = "X-Devloop-Token";
/// Header carrying the team id, only sent when a team is configured
pub const TEAM_ID_HEADER: &str = "X-Devloop-TeamID";

/// Everything needed to make one identity lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct WhoAmIRequest {
    pub address: String,
    pub token: String,
    pub team_id: String,
    pub version: String,
    pub wait_for_registration: bool,
}

/// JSON body of an identity lookup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WhoAmIBody {
    pub version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct WhoAmIResponse {
    pub found: bool,
    pub username: String,
    pub team_name: String,
    pub suggested_version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_response_tolerates_missing_fields() {
        let resp: WhoAmIResponse = serde_json::from_str(r#"{"foo": "bar"}"#).unwrap();
        assert_eq!(resp, WhoAmIResponse::default());

        let resp: WhoAmIResponse =
            serde_json::from_str(r#"{"Username": "user1", "Found": true, "SuggestedVersion": "10.0.0"}"#)
                .unwrap();
        assert_eq!(
            resp,
            WhoAmIResponse {
                found: true,
                username: "user1".to_string(),
                team_name: String::new(),
                suggested_version: "10.0.0".to_string(),
            }
        );
    }
}
