//! WebFinger resource documents
//!
//! Lets remote OStatus servers discover a bridged account's feed, salmon
//! endpoint and public key from `acct:` addresses.

use serde::{Deserialize, Serialize};

use crate::feed::{BridgeUrls, profile_url};
use crate::upstream::Profile;

pub const REL_PROFILE_PAGE: &str = "http://webfinger.net/rel/profile-page";
pub const REL_UPDATES_FROM: &str = "http://schemas.google.com/g/2010#updates-from";
pub const REL_SALMON: &str = "salmon";
pub const REL_MAGIC_PUBLIC_KEY: &str = "magic-public-key";
pub const REL_LRDD: &str = "lrdd";

/// WebFinger JRD response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WebFingerResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    pub links: Vec<WebFingerLink>,
}

impl WebFingerResponse {
    /// First link with the given relation
    pub fn link(&self, rel: &str) -> Option<&WebFingerLink> {
        self.links.iter().find(|link| link.rel == rel)
    }
}

/// WebFinger link
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WebFingerLink {
    pub rel: String,
    #[serde(rename = "type")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl WebFingerLink {
    fn href(rel: &str, link_type: Option<&str>, href: String) -> Self {
        Self {
            rel: rel.to_string(),
            link_type: link_type.map(str::to_string),
            href: Some(href),
            template: None,
        }
    }
}

/// Resource document of a bridged account
///
/// # Arguments
/// * `urls` - Bridge URL layout
/// * `profile` - Upstream account
/// * `public_key_url` - Magic public key data URL of the account's signing key
pub fn resource_document(
    urls: &BridgeUrls,
    profile: &Profile,
    public_key_url: String,
) -> WebFingerResponse {
    let handle = &profile.screen_name;
    let profile_page = profile_url(handle);

    WebFingerResponse {
        subject: Some(urls.account_uri(handle)),
        aliases: vec![profile_page.clone()],
        links: vec![
            WebFingerLink::href(REL_PROFILE_PAGE, Some("text/html"), profile_page),
            WebFingerLink::href(
                REL_UPDATES_FROM,
                Some("application/atom+xml"),
                urls.profile_feed_url(handle),
            ),
            WebFingerLink::href(REL_SALMON, None, urls.salmon_url()),
            WebFingerLink::href(REL_MAGIC_PUBLIC_KEY, None, public_key_url),
        ],
    }
}

/// Host-meta XRD pointing at the WebFinger endpoint
pub fn host_meta_xml(urls: &BridgeUrls) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<XRD xmlns="http://docs.oasis-open.org/ns/xri/xrd-1.0">
  <Link rel="{}" type="application/jrd+json" template="{}"/>
</XRD>"#,
        REL_LRDD,
        html_escape::encode_double_quoted_attribute(&urls.webfinger_template())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls() -> BridgeUrls {
        BridgeUrls::new("https://bridge.example.com", "bridge.example.com")
    }

    #[test]
    fn test_resource_document() {
        let profile = Profile {
            id: 1,
            screen_name: "alice".to_string(),
            name: "Alice".to_string(),
            description: None,
            profile_image_url_https: None,
            profile_banner_url: None,
            status: None,
        };

        let doc = resource_document(&urls(), &profile, "data:key".to_string());
        assert_eq!(doc.subject.as_deref(), Some("acct:alice@bridge.example.com"));
        assert_eq!(doc.aliases, vec!["https://twitter.com/alice".to_string()]);
        assert_eq!(
            doc.link(REL_UPDATES_FROM).and_then(|l| l.href.as_deref()),
            Some("https://bridge.example.com/@alice.atom")
        );
        assert_eq!(
            doc.link(REL_SALMON).and_then(|l| l.href.as_deref()),
            Some("https://bridge.example.com/salmon")
        );
        assert_eq!(
            doc.link(REL_MAGIC_PUBLIC_KEY).and_then(|l| l.href.as_deref()),
            Some("data:key")
        );

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["links"][0]["type"], "text/html");
        assert!(json["links"][2].get("type").is_none());
    }

    #[test]
    fn test_host_meta() {
        let xml = host_meta_xml(&urls());
        assert!(xml.contains(
            r#"template="https://bridge.example.com/.well-known/webfinger?resource={uri}""#
        ));
        assert!(xml.contains(r#"rel="lrdd""#));
    }
}
