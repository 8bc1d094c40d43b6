//! Atom serialization
//!
//! Writes feeds as Atom 1.0 with the ActivityStreams, threading and
//! Portable Contacts extensions OStatus consumers read.

use chrono::{DateTime, SecondsFormat, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};

use super::model::{Entry, Feed, Link, Person};

pub const ATOM_CONTENT_TYPE: &str = "application/atom+xml; charset=utf-8";

const NAMESPACES: &str = concat!(
    r#"xmlns="http://www.w3.org/2005/Atom" "#,
    r#"xmlns:activity="http://activitystrea.ms/spec/1.0/" "#,
    r#"xmlns:thr="http://purl.org/syndication/thread/1.0" "#,
    r#"xmlns:poco="http://portablecontacts.net/spec/1.0" "#,
    r#"xmlns:ostatus="http://ostatus.org/schema/1.0""#,
);

/// Serialize a feed as an Atom document
pub fn to_atom(feed: &Feed) -> String {
    let mut out = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    out.push('\n');
    out.push_str(&format!("<feed {}>\n", NAMESPACES));

    push_text(&mut out, 1, "id", &feed.id);
    push_text(&mut out, 1, "title", &feed.title);
    if !feed.subtitle.is_empty() {
        push_text(&mut out, 1, "subtitle", &feed.subtitle);
    }
    if let Some(logo) = &feed.logo {
        push_text(&mut out, 1, "logo", logo);
    }
    push_text(&mut out, 1, "updated", &timestamp(&feed.updated));
    for link in &feed.links {
        push_link(&mut out, 1, link);
    }
    if let Some(author) = &feed.author {
        push_person(&mut out, 1, "author", author);
    }
    for entry in &feed.entries {
        push_entry(&mut out, 1, "entry", entry);
    }

    out.push_str("</feed>\n");
    out
}

fn push_entry(out: &mut String, depth: usize, tag: &str, entry: &Entry) {
    open(out, depth, tag);
    let inner = depth + 1;

    push_text(out, inner, "id", &entry.id);
    push_text(out, inner, "title", &entry.title);
    push_text(out, inner, "published", &timestamp(&entry.published));
    push_text(out, inner, "updated", &timestamp(&entry.updated));
    push_text(out, inner, "activity:object-type", entry.object_type.as_uri());
    push_text(out, inner, "activity:verb", entry.verb.as_uri());

    indent(out, inner);
    out.push_str(&format!(
        r#"<content type="{}""#,
        encode_double_quoted_attribute(&entry.content.kind)
    ));
    if let Some(lang) = &entry.content.lang {
        out.push_str(&format!(
            r#" xml:lang="{}""#,
            encode_double_quoted_attribute(lang)
        ));
    }
    out.push_str(&format!(">{}</content>\n", encode_text(&entry.content.body)));

    for link in &entry.links {
        push_link(out, inner, link);
    }
    if let Some(author) = &entry.author {
        push_person(out, inner, "author", author);
    }
    if let Some(reply) = &entry.in_reply_to {
        indent(out, inner);
        out.push_str(&format!(
            "<thr:in-reply-to ref=\"{}\" href=\"{}\" type=\"{}\"/>\n",
            encode_double_quoted_attribute(&reply.reference),
            encode_double_quoted_attribute(&reply.href),
            encode_double_quoted_attribute(&reply.media_type),
        ));
    }
    if let Some(object) = &entry.object {
        push_entry(out, inner, "activity:object", object);
    }

    close(out, depth, tag);
}

fn push_person(out: &mut String, depth: usize, tag: &str, person: &Person) {
    open(out, depth, tag);
    let inner = depth + 1;

    push_text(out, inner, "id", &person.id);
    push_text(out, inner, "uri", &person.id);
    push_text(out, inner, "name", &person.name);
    push_text(out, inner, "email", &person.email);
    push_text(out, inner, "summary", &person.summary);
    push_text(
        out,
        inner,
        "activity:object-type",
        "http://activitystrea.ms/schema/1.0/person",
    );
    for link in &person.links {
        push_link(out, inner, link);
    }
    push_text(out, inner, "poco:preferredUsername", &person.preferred_username);
    push_text(out, inner, "poco:displayName", &person.name);
    push_text(out, inner, "poco:note", &person.summary);

    close(out, depth, tag);
}

fn push_link(out: &mut String, depth: usize, link: &Link) {
    indent(out, depth);
    out.push_str(&format!(
        r#"<link rel="{}""#,
        encode_double_quoted_attribute(&link.rel)
    ));
    if let Some(media_type) = &link.media_type {
        out.push_str(&format!(
            r#" type="{}""#,
            encode_double_quoted_attribute(media_type)
        ));
    }
    out.push_str(&format!(
        r#" href="{}""#,
        encode_double_quoted_attribute(&link.href)
    ));
    if let Some(object_type) = &link.object_type {
        out.push_str(&format!(
            r#" ostatus:object-type="{}""#,
            encode_double_quoted_attribute(object_type.as_uri())
        ));
    }
    out.push_str("/>\n");
}

fn push_text(out: &mut String, depth: usize, tag: &str, value: &str) {
    indent(out, depth);
    out.push_str(&format!("<{tag}>{}</{tag}>\n", encode_text(value)));
}

fn open(out: &mut String, depth: usize, tag: &str) {
    indent(out, depth);
    out.push_str(&format!("<{tag}>\n"));
}

fn close(out: &mut String, depth: usize, tag: &str) {
    indent(out, depth);
    out.push_str(&format!("</{tag}>\n"));
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}
