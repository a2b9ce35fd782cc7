use std::fmt;

use clap::ValueEnum;
use reqwest::Url;
use serde_json::Value;

use crate::config::Credentials;
use crate::constants::{INSTAGRAM_API_BASE, TIKTOK_API_BASE, YOUTUBE_API_BASE};
use crate::error::{Error, Result};

/// A video platform whose view counts can be tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Platform {
    #[value(name = "tiktok")]
    TikTok,
    #[value(name = "instagram")]
    Instagram,
    #[value(name = "youtube")]
    YouTube,
}

impl Platform {
    pub fn name(self) -> &'static str {
        match self {
            Platform::TikTok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::YouTube => "youtube",
        }
    }

    // "Tiktok", "Instagram", "Youtube"
    pub fn title(self) -> &'static str {
        match self {
            Platform::TikTok => "Tiktok",
            Platform::Instagram => "Instagram",
            Platform::YouTube => "Youtube",
        }
    }

    pub fn default_base(self) -> &'static str {
        match self {
            Platform::TikTok => TIKTOK_API_BASE,
            Platform::Instagram => INSTAGRAM_API_BASE,
            Platform::YouTube => YOUTUBE_API_BASE,
        }
    }

    // Query parameter that carries the secret, if any
    pub fn secret_param(self) -> Option<&'static str> {
        match self {
            Platform::TikTok => None,
            Platform::Instagram => Some("access_token"),
            Platform::YouTube => Some("key"),
        }
    }

    /// Builds the request URL for one identifier against `base`.
    ///
    /// The identifier and secret are percent-encoded, so `&`, `#`, `/` or `+`
    /// inside them never change the shape of the request.
    pub fn endpoint(self, base: &str, id: &str, credentials: &Credentials) -> Result<Url> {
        let bad_base = |e| Error::Config(format!("invalid api url {base:?}: {e}"));
        let url = match self {
            Platform::TikTok => Url::parse_with_params(base, &[("video_id", id)]).map_err(bad_base)?,
            Platform::Instagram => {
                let mut url = Url::parse(base).map_err(bad_base)?;
                url.path_segments_mut()
                    .map_err(|()| Error::Config(format!("api url {base:?} cannot take a path")))?
                    .pop_if_empty()
                    .push(id);
                url.query_pairs_mut()
                    .append_pair("fields", "video_views")
                    .append_pair("access_token", credentials.secret(self)?);
                url
            }
            Platform::YouTube => Url::parse_with_params(
                base,
                &[
                    ("part", "statistics"),
                    ("id", id),
                    ("key", credentials.secret(self)?),
                ],
            )
            .map_err(bad_base)?,
        };
        Ok(url)
    }

    fn views_pointer(self) -> &'static str {
        match self {
            Platform::TikTok => "/itemInfo/itemStruct/stats/playCount",
            Platform::Instagram => "/video_views",
            Platform::YouTube => "/items/0/statistics/viewCount",
        }
    }

    /// Pulls the view count out of a decoded response body.
    ///
    /// YouTube reports `viewCount` as a decimal string, the others as a JSON
    /// integer; both forms are accepted for every platform.
    pub fn extract_views(self, body: &Value) -> std::result::Result<u64, String> {
        let pointer = self.views_pointer();
        let field = body
            .pointer(pointer)
            .ok_or_else(|| format!("field `{pointer}` missing from response"))?;

        match field {
            Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| format!("field `{pointer}` is not a non-negative integer: {n}")),
            Value::String(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| format!("field `{pointer}` is not a non-negative integer: {s:?}")),
            other => Err(format!("field `{pointer}` has unexpected type: {other}")),
        }
    }

    pub fn retrieval_error(self, id: &str, reason: impl Into<String>) -> Error {
        Error::Retrieval {
            platform: self,
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn creds() -> Credentials {
        Credentials::from_lookup(|key| Some(format!("secret-{key}")))
    }

    #[test]
    fn tiktok_reads_nested_play_count() {
        let body = json!({"itemInfo": {"itemStruct": {"stats": {"playCount": 4321}}}});
        assert_eq!(Platform::TikTok.extract_views(&body), Ok(4321));
    }

    #[test]
    fn instagram_reads_video_views() {
        let body = json!({"video_views": 17, "id": "abc"});
        assert_eq!(Platform::Instagram.extract_views(&body), Ok(17));
    }

    #[test]
    fn youtube_reads_string_view_count() {
        let body = json!({"items": [{"statistics": {"viewCount": "987654"}}]});
        assert_eq!(Platform::YouTube.extract_views(&body), Ok(987654));
    }

    #[test]
    fn missing_field_is_an_error() {
        // e.g. a rate-limited or revoked-token response
        let body = json!({"error": {"message": "quota exceeded"}});
        let err = Platform::YouTube.extract_views(&body).unwrap_err();
        assert!(err.contains("/items/0/statistics/viewCount"), "{err}");

        let empty = json!({"items": []});
        assert!(Platform::YouTube.extract_views(&empty).is_err());
    }

    #[test]
    fn negative_or_fractional_counts_are_rejected() {
        assert!(Platform::Instagram.extract_views(&json!({"video_views": -3})).is_err());
        assert!(Platform::Instagram.extract_views(&json!({"video_views": 1.5})).is_err());
        assert!(Platform::Instagram.extract_views(&json!({"video_views": null})).is_err());
    }

    #[test]
    fn endpoints_fill_in_identifier_and_secret() {
        let creds = creds();
        let url = |p: Platform, id| p.endpoint(p.default_base(), id, &creds).unwrap().to_string();
        assert_eq!(
            url(Platform::TikTok, "v1"),
            "https://www.tiktok.com/api/video/details/?video_id=v1"
        );
        assert_eq!(
            url(Platform::Instagram, "p9"),
            "https://graph.instagram.com/p9?fields=video_views&access_token=secret-INSTAGRAM_ACCESS_TOKEN"
        );
        assert_eq!(
            url(Platform::YouTube, "yt"),
            "https://www.googleapis.com/youtube/v3/videos?part=statistics&id=yt&key=secret-YOUTUBE_API_KEY"
        );
    }

    #[test]
    fn identifiers_and_secrets_are_encoded() {
        let creds = Credentials::from_lookup(|_| Some("a+b&c".into()));

        let tiktok = Platform::TikTok
            .endpoint(TIKTOK_API_BASE, "v1&evil=1#frag", &creds)
            .unwrap();
        assert_eq!(tiktok.fragment(), None);
        let pairs: Vec<_> = tiktok.query_pairs().into_owned().collect();
        assert_eq!(pairs, [("video_id".to_string(), "v1&evil=1#frag".to_string())]);

        let youtube = Platform::YouTube
            .endpoint(YOUTUBE_API_BASE, "yt", &creds)
            .unwrap();
        assert!(youtube.as_str().ends_with("&key=a%2Bb%26c"), "{youtube}");
        let key = youtube.query_pairs().find(|(k, _)| k == "key").map(|(_, v)| v.into_owned());
        assert_eq!(key.as_deref(), Some("a+b&c"));

        let instagram = Platform::Instagram
            .endpoint(INSTAGRAM_API_BASE, "p/1?x#y", &creds)
            .unwrap();
        assert_eq!(instagram.path(), "/p%2F1%3Fx%23y");
        assert_eq!(instagram.query_pairs().count(), 2);
    }

    #[test]
    fn endpoint_without_secret_is_a_config_error() {
        let creds = Credentials::from_lookup(|_| None);
        assert!(matches!(
            Platform::Instagram.endpoint(INSTAGRAM_API_BASE, "p9", &creds),
            Err(Error::Config(_))
        ));
        assert!(Platform::TikTok.endpoint(TIKTOK_API_BASE, "v1", &creds).is_ok());
    }

    #[test]
    fn names_and_titles() {
        assert_eq!(Platform::YouTube.to_string(), "youtube");
        assert_eq!(Platform::TikTok.title(), "Tiktok");
    }
}
