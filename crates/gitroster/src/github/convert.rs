//! Conversion from GitHub's wire format to gitroster types.

use serde::Deserialize;

use super::types::{BasicUser, FullUser};

/// Entry of `GET /users/{u}/followers` and `/following`.
#[derive(Debug, Deserialize)]
pub(crate) struct RawListedUser {
    pub login: String,
    pub html_url: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Body of `GET /users/{u}`.
#[derive(Debug, Deserialize)]
pub(crate) struct RawProfile {
    pub login: String,
    pub name: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub company: Option<String>,
    pub blog: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub public_repos: u32,
    #[serde(default)]
    pub followers: u32,
    #[serde(default)]
    pub following: u32,
}

/// Body of GitHub error responses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawErrorBody {
    #[serde(default)]
    pub message: String,
}

/// GitHub returns `""` for unset profile fields; treat those as absent.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn to_basic_user(raw: RawListedUser) -> BasicUser {
    BasicUser {
        login: raw.login,
        name: None,
        html_url: raw.html_url,
        avatar_url: raw.avatar_url.unwrap_or_default(),
    }
}

pub(crate) fn to_full_user(raw: RawProfile) -> FullUser {
    FullUser {
        login: raw.login,
        name: non_empty(raw.name),
        html_url: raw.html_url,
        avatar_url: raw.avatar_url.unwrap_or_default(),
        bio: non_empty(raw.bio),
        company: non_empty(raw.company),
        blog: non_empty(raw.blog),
        location: non_empty(raw.location),
        public_repos: raw.public_repos,
        followers: raw.followers,
        following: raw.following,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_blank_fields_become_none() {
        let raw: RawProfile = serde_json::from_value(serde_json::json!({
            "login": "octocat",
            "name": "The Octocat",
            "html_url": "https://github.com/octocat",
            "avatar_url": "https://avatars.githubusercontent.com/u/583231",
            "bio": "",
            "company": "@github",
            "blog": "  ",
            "location": "San Francisco",
            "public_repos": 8,
            "followers": 20000,
            "following": 9
        }))
        .unwrap();

        let user = to_full_user(raw);
        assert_eq!(user.name.as_deref(), Some("The Octocat"));
        assert_eq!(user.bio, None);
        assert_eq!(user.blog, None);
        assert_eq!(user.company.as_deref(), Some("@github"));
        assert_eq!(user.public_repos, 8);
        assert_eq!(user.following, 9);
    }

    #[test]
    fn listed_user_ignores_extra_fields() {
        let raw: RawListedUser = serde_json::from_value(serde_json::json!({
            "login": "bob",
            "id": 2,
            "html_url": "https://github.com/bob",
            "avatar_url": "https://avatars.githubusercontent.com/u/2",
            "type": "User",
            "site_admin": false
        }))
        .unwrap();

        let user = to_basic_user(raw);
        assert_eq!(user.login, "bob");
        assert_eq!(user.name, None);
        assert_eq!(user.avatar_url, "https://avatars.githubusercontent.com/u/2");
    }
}
