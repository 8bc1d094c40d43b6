//! Entry rendering
//!
//! Turns one upstream post into one feed entry, classifying it as a
//! share, a reply or a plain post, and rewriting entity spans into links.

use super::model::{COLLECTION_PUBLIC, Content, Entry, InReplyTo, Link, ObjectType, Person, Verb};
use super::topic::{BridgeUrls, hashtag_url, post_url, profile_url};
use crate::upstream::{Entities, Post, Profile};

const LINK_CLOSE: &str = "</a>";

/// Link target anchored in a post's text
///
/// Offsets are code points into the original text. A span without `end`
/// marks an insertion point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: Option<usize>,
    pub target: String,
}

impl Span {
    fn from_indices(indices: &[usize], target: String) -> Option<Self> {
        let start = *indices.first()?;
        Some(Self {
            start,
            end: indices.get(1).copied(),
            target,
        })
    }

    fn open_tag(&self) -> String {
        format!(
            "<a href=\"{}\">",
            html_escape::encode_double_quoted_attribute(&self.target)
        )
    }
}

/// Collect spans from entity annotations
///
/// Order: links, mentions, hashtags, media. Sorting later is stable, so
/// this order breaks ties between equal start offsets.
pub fn collect_spans(entities: &Entities) -> Vec<Span> {
    let links = entities
        .urls
        .iter()
        .filter_map(|u| Span::from_indices(&u.indices, u.url.clone()));
    let mentions = entities
        .user_mentions
        .iter()
        .filter_map(|m| Span::from_indices(&m.indices, profile_url(&m.screen_name)));
    let hashtags = entities
        .hashtags
        .iter()
        .filter_map(|h| Span::from_indices(&h.indices, hashtag_url(&h.text)));
    let media = entities
        .media
        .iter()
        .filter_map(|m| Span::from_indices(&m.indices, m.media_url.clone()));

    links.chain(mentions).chain(hashtags).chain(media).collect()
}

/// Wrap every span of `text` in an anchor
///
/// Spans falling outside the text, or whose offsets overflow, are skipped.
pub fn rewrite_spans(text: &str, mut spans: Vec<Span>) -> String {
    spans.sort_by_key(|span| span.start);

    let mut buffer: Vec<char> = text.chars().collect();
    // Code points inserted so far, all before the current span.
    let mut delta = 0usize;

    for span in spans {
        let Some(start) = span.start.checked_add(delta).filter(|s| *s <= buffer.len()) else {
            continue;
        };
        let end = match span.end {
            Some(end) => match end.checked_add(delta) {
                Some(end) if end >= start && end <= buffer.len() => end,
                _ => continue,
            },
            None => start,
        };

        let open = span.open_tag();
        let mut rebuilt = Vec::with_capacity(buffer.len() + open.len() + LINK_CLOSE.len());
        rebuilt.extend_from_slice(&buffer[..start]);
        rebuilt.extend(open.chars());
        rebuilt.extend_from_slice(&buffer[start..end]);
        rebuilt.extend(LINK_CLOSE.chars());
        rebuilt.extend_from_slice(&buffer[end..]);

        delta += open.chars().count() + LINK_CLOSE.chars().count();
        buffer = rebuilt;
    }

    buffer.into_iter().collect()
}

/// Render a post's text as entry HTML
pub fn format_text(post: &Post) -> String {
    rewrite_spans(&post.text, collect_spans(&post.entities)).replace('\n', "<br>")
}

/// Renders posts into entries for one bridge
#[derive(Debug, Clone)]
pub struct EntryRenderer {
    urls: BridgeUrls,
}

impl EntryRenderer {
    pub fn new(urls: BridgeUrls) -> Self {
        Self { urls }
    }

    pub fn urls(&self) -> &BridgeUrls {
        &self.urls
    }

    /// Author block for an upstream account
    pub fn person(&self, profile: &Profile) -> Person {
        let mut links =
            vec![Link::new("alternate", profile_url(&profile.screen_name)).with_type("text/html")];
        if let Some(avatar) = &profile.profile_image_url_https {
            links.push(Link::new("avatar", avatar.clone()));
        }
        if let Some(banner) = &profile.profile_banner_url {
            links.push(Link::new("header", banner.clone()));
        }

        Person {
            id: self.urls.account_uri(&profile.screen_name),
            name: profile.name.clone(),
            email: format!("{}@{}", profile.screen_name, self.urls.domain()),
            summary: profile.description.clone().unwrap_or_default(),
            links,
            preferred_username: profile.screen_name.clone(),
        }
    }

    /// Render one post as seen in `owner`'s feed
    ///
    /// Shares embed the shared post, rendered recursively.
    pub fn render(&self, owner: &Profile, post: &Post) -> Entry {
        let handle = &post.user.screen_name;
        let lang = post
            .lang
            .as_deref()
            .filter(|lang| !lang.is_empty() && *lang != "und")
            .map(str::to_string);

        let mut entry = Entry {
            id: self.urls.entry_id(post.id),
            title: "Tweet".to_string(),
            published: post.created_at,
            updated: post.created_at,
            links: vec![
                Link::new("self", self.urls.post_feed_url(handle, post.id))
                    .with_type("application/atom+xml"),
                Link::new("alternate", post_url(handle, post.id)).with_type("text/html"),
                Link::new("mentioned", COLLECTION_PUBLIC)
                    .with_object_type(ObjectType::Collection),
            ],
            content: Content {
                kind: "html".to_string(),
                lang,
                body: format_text(post),
            },
            author: None,
            object_type: ObjectType::Note,
            verb: Verb::Post,
            in_reply_to: None,
            object: None,
        };

        if owner.id != post.user.id {
            entry.author = Some(self.person(&post.user));
        }

        if let Some(shared) = &post.retweeted_status {
            entry.title = "Retweet".to_string();
            entry.object_type = ObjectType::Activity;
            entry.verb = Verb::Share;
            entry.object = Some(Box::new(self.render(owner, shared)));
        } else if let Some(reply_id) = post.in_reply_to_status_id.filter(|id| *id != 0) {
            let reply_handle = post.in_reply_to_screen_name.as_deref().unwrap_or(handle);

            entry.title = "Reply".to_string();
            entry.object_type = ObjectType::Comment;
            entry.in_reply_to = Some(InReplyTo {
                reference: self.urls.entry_id(reply_id),
                href: post_url(reply_handle, reply_id),
                media_type: "text/html".to_string(),
            });
            entry.links.extend(post.entities.user_mentions.iter().map(|mention| {
                Link::new("mentioned", self.urls.account_uri(&mention.screen_name))
                    .with_object_type(ObjectType::Person)
            }));
        }

        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::{HashtagEntity, MentionEntity, UrlEntity};
    use chrono::{TimeZone, Utc};

    fn profile(id: u64, handle: &str) -> Profile {
        Profile {
            id,
            screen_name: handle.to_string(),
            name: handle.to_uppercase(),
            description: Some(format!("{handle}'s bio")),
            profile_image_url_https: Some(format!("https://img.example/{handle}.png")),
            profile_banner_url: None,
            status: None,
        }
    }

    fn post(id: u64, author: &Profile, text: &str) -> Post {
        Post {
            id,
            text: text.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            user: author.clone(),
            lang: Some("en".to_string()),
            entities: Entities::default(),
            retweeted_status: None,
            in_reply_to_status_id: None,
            in_reply_to_screen_name: None,
        }
    }

    fn renderer() -> EntryRenderer {
        EntryRenderer::new(BridgeUrls::new(
            "https://bridge.example.com",
            "bridge.example.com",
        ))
    }

    #[test]
    fn test_mention_span_wraps_exactly_the_mention() {
        let spans = vec![Span {
            start: 3,
            end: Some(7),
            target: "https://twitter.com/bob".to_string(),
        }];

        assert_eq!(
            rewrite_spans("hi @bob", spans),
            "hi <a href=\"https://twitter.com/bob\">@bob</a>"
        );
    }

    #[test]
    fn test_two_spans_grow_by_markup_length() {
        let text = "see #rust and @bob now";
        let spans = vec![
            Span {
                start: 14,
                end: Some(18),
                target: "https://twitter.com/bob".to_string(),
            },
            Span {
                start: 4,
                end: Some(9),
                target: "https://twitter.com/hashtag/rust".to_string(),
            },
        ];
        let markup: usize = spans
            .iter()
            .map(|s| s.open_tag().chars().count() + LINK_CLOSE.len())
            .sum();

        let rendered = rewrite_spans(text, spans);
        assert_eq!(
            rendered,
            "see <a href=\"https://twitter.com/hashtag/rust\">#rust</a> and \
             <a href=\"https://twitter.com/bob\">@bob</a> now"
        );
        assert_eq!(
            rendered.chars().count(),
            text.chars().count() + markup
        );
    }

    #[test]
    fn test_offsets_are_code_points() {
        let spans = vec![Span {
            start: 2,
            end: Some(6),
            target: "https://twitter.com/bob".to_string(),
        }];

        assert_eq!(
            rewrite_spans("é @bob ✓", spans),
            "é <a href=\"https://twitter.com/bob\">@bob</a> ✓"
        );
    }

    #[test]
    fn test_out_of_bounds_span_is_skipped() {
        let spans = vec![
            Span {
                start: 40,
                end: Some(45),
                target: "https://t.co/x".to_string(),
            },
            Span {
                start: 0,
                end: Some(2),
                target: "https://t.co/y".to_string(),
            },
            Span {
                start: 3,
                end: Some(99),
                target: "https://t.co/z".to_string(),
            },
        ];

        assert_eq!(
            rewrite_spans("hi there", spans),
            "<a href=\"https://t.co/y\">hi</a> there"
        );
    }

    #[test]
    fn test_huge_offsets_after_a_valid_span_are_skipped() {
        let spans = vec![
            Span {
                start: 0,
                end: Some(2),
                target: "https://t.co/y".to_string(),
            },
            Span {
                start: usize::MAX,
                end: Some(usize::MAX),
                target: "https://t.co/z".to_string(),
            },
        ];

        assert_eq!(
            rewrite_spans("hi there", spans),
            "<a href=\"https://t.co/y\">hi</a> there"
        );
    }

    #[test]
    fn test_malformed_entity_json_does_not_panic() {
        let alice = profile(1, "alice");
        let mut post = post(10, &alice, "hi @bob there");
        post.entities = serde_json::from_str(
            r#"{
                "urls": [{"indices": [0, 2], "url": "https://t.co/y"}],
                "user_mentions": [{"indices": [18446744073709551615], "screen_name": "bob"}]
            }"#,
        )
        .unwrap();

        assert_eq!(
            format_text(&post),
            "<a href=\"https://t.co/y\">hi</a> @bob there"
        );
    }

    #[test]
    fn test_link_target_is_attribute_escaped() {
        let spans = vec![Span {
            start: 0,
            end: Some(4),
            target: "https://t.co/?a=1&b=\"2\"".to_string(),
        }];

        assert_eq!(
            rewrite_spans("link", spans),
            "<a href=\"https://t.co/?a=1&amp;b=&quot;2&quot;\">link</a>"
        );
    }

    #[test]
    fn test_point_span_inserts_empty_anchor() {
        let spans = vec![Span {
            start: 2,
            end: None,
            target: "https://pbs.example/a.jpg".to_string(),
        }];

        assert_eq!(
            rewrite_spans("ab cd", spans),
            "ab<a href=\"https://pbs.example/a.jpg\"></a> cd"
        );
    }

    #[test]
    fn test_equal_starts_keep_collection_order() {
        let entities = Entities {
            urls: vec![UrlEntity {
                indices: vec![0, 0],
                url: "https://t.co/first".to_string(),
                display_url: None,
                expanded_url: None,
            }],
            hashtags: vec![HashtagEntity {
                indices: vec![0, 0],
                text: "second".to_string(),
            }],
            ..Entities::default()
        };

        let spans = collect_spans(&entities);
        assert_eq!(
            rewrite_spans("x", spans),
            "<a href=\"https://t.co/first\"></a><a href=\"https://twitter.com/hashtag/second\"></a>x"
        );
    }

    #[test]
    fn test_format_text_replaces_newlines() {
        let alice = profile(1, "alice");
        let mut post = post(10, &alice, "line one\nhi @bob");
        post.entities.user_mentions = vec![MentionEntity {
            indices: vec![12, 16],
            screen_name: "bob".to_string(),
        }];

        assert_eq!(
            format_text(&post),
            "line one<br>hi <a href=\"https://twitter.com/bob\">@bob</a>"
        );
    }

    #[test]
    fn test_plain_post() {
        let alice = profile(1, "alice");
        let post = post(10, &alice, "hello");

        let entry = renderer().render(&alice, &post);
        assert_eq!(entry.id, "tag:bridge.example.com,2017-04-23:tweet:10");
        assert_eq!(entry.title, "Tweet");
        assert_eq!(entry.object_type, ObjectType::Note);
        assert_eq!(entry.verb, Verb::Post);
        assert_eq!(entry.published, post.created_at);
        assert_eq!(entry.updated, post.created_at);
        assert_eq!(entry.content.lang.as_deref(), Some("en"));
        assert!(entry.author.is_none());
        assert!(entry.in_reply_to.is_none());
        assert!(entry.object.is_none());
        assert_eq!(renderer().render(&alice, &post).id, entry.id);
    }

    #[test]
    fn test_undetermined_language_is_omitted() {
        let alice = profile(1, "alice");
        let mut post = post(10, &alice, "🙂");
        post.lang = Some("und".to_string());

        assert!(renderer().render(&alice, &post).content.lang.is_none());
    }

    #[test]
    fn test_share_nests_standalone_rendering() {
        let alice = profile(1, "alice");
        let bob = profile(2, "bob");
        let original = post(5, &bob, "original");
        let mut share = post(10, &alice, "RT @bob: original");
        share.retweeted_status = Some(Box::new(original.clone()));
        // Shares classify before replies.
        share.in_reply_to_status_id = Some(3);

        let renderer = renderer();
        let entry = renderer.render(&alice, &share);
        assert_eq!(entry.title, "Retweet");
        assert_eq!(entry.object_type, ObjectType::Activity);
        assert_eq!(entry.verb, Verb::Share);
        assert!(entry.in_reply_to.is_none());

        let nested = entry.object.expect("share must nest the shared post");
        assert_eq!(*nested, renderer.render(&alice, &original));
        assert_eq!(
            nested.author.as_ref().map(|a| a.id.as_str()),
            Some("acct:bob@bridge.example.com")
        );
    }

    #[test]
    fn test_reply_references_target_entry() {
        let alice = profile(1, "alice");
        let mut reply = post(10, &alice, "@bob yes");
        reply.in_reply_to_status_id = Some(7);
        reply.in_reply_to_screen_name = Some("bob".to_string());
        reply.entities.user_mentions = vec![MentionEntity {
            indices: vec![0, 4],
            screen_name: "bob".to_string(),
        }];

        let renderer = renderer();
        let entry = renderer.render(&alice, &reply);
        assert_eq!(entry.title, "Reply");
        assert_eq!(entry.object_type, ObjectType::Comment);
        assert_eq!(entry.verb, Verb::Post);

        let in_reply_to = entry.in_reply_to.expect("reply must reference its target");
        assert_eq!(in_reply_to.reference, renderer.urls().entry_id(7));
        assert_eq!(in_reply_to.href, "https://twitter.com/bob/status/7");

        let mentioned: Vec<&str> = entry
            .links
            .iter()
            .filter(|l| l.rel == "mentioned" && l.object_type == Some(ObjectType::Person))
            .map(|l| l.href.as_str())
            .collect();
        assert_eq!(mentioned, vec!["acct:bob@bridge.example.com"]);
    }

    #[test]
    fn test_zero_reply_id_is_plain_post() {
        let alice = profile(1, "alice");
        let mut post = post(10, &alice, "hello");
        post.in_reply_to_status_id = Some(0);

        assert_eq!(renderer().render(&alice, &post).title, "Tweet");
    }
}
