//! Server-rendered pages. Markup is small enough to build with `format!`;
//! every interpolated value goes through [`escape`].

use crate::models::Bookmark;

const DASHBOARD_SCRIPT: &str = include_str!("../../assets/dashboard.js");

const STYLE: &str = "\
body{font-family:system-ui,sans-serif;margin:0;background:#f5f7fb;color:#1f2937}\
main{max-width:720px;margin:0 auto;padding:2rem 1rem}\
.card{background:#fff;border:1px solid #e5e7eb;border-radius:12px;padding:2rem;text-align:center}\
.error{background:#fee2e2;color:#991b1b;padding:.75rem;border-radius:8px;margin-bottom:1rem}\
form.add{display:flex;gap:.5rem;margin-bottom:2rem;flex-wrap:wrap}\
form.add input{flex:1;padding:.5rem;border:1px solid #d1d5db;border-radius:6px}\
button{cursor:pointer;border:0;border-radius:6px;padding:.5rem 1rem;background:#2563eb;color:#fff}\
ul#bookmarks{list-style:none;padding:0;display:grid;gap:1rem}\
li.bookmark{display:flex;justify-content:space-between;align-items:center;background:#fff;border:1px solid #e5e7eb;border-radius:8px;padding:1rem}\
li.bookmark button{background:none;color:#dc2626}\
p.host{margin:.25rem 0 0;font-size:.875rem;color:#6b7280}\
header{display:flex;justify-content:space-between;align-items:center}";

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
<title>{}</title><style>{}</style></head><body><main>{}</main></body></html>",
        escape(title),
        STYLE,
        body
    )
}

fn error_banner(error: Option<&str>) -> String {
    match error {
        Some(message) if !message.is_empty() => {
            format!("<div class=\"error\" role=\"alert\">{}</div>", escape(message))
        }
        _ => String::new(),
    }
}

pub fn login_page(error: Option<&str>, provider_label: &str) -> String {
    let body = format!(
        "<div class=\"card\"><h1>Smart Bookmark App</h1>\
<p>Save and manage your links securely</p>{}\
<form method=\"get\" action=\"/auth/signin\">\
<button type=\"submit\">Continue with {}</button></form></div>",
        error_banner(error),
        escape(provider_label)
    );
    layout("Sign in", &body)
}

fn bookmark_item(bookmark: &Bookmark) -> String {
    let title = if bookmark.is_web_link() {
        format!(
            "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>",
            escape(&bookmark.url),
            escape(&bookmark.title)
        )
    } else {
        format!("<span class=\"title\">{}</span>", escape(&bookmark.title))
    };

    format!(
        "<li class=\"bookmark\" data-id=\"{id}\"><div>{title}\
<p class=\"host\">{host}</p></div>\
<form method=\"post\" action=\"/dashboard/bookmarks/{id}/delete\">\
<button type=\"submit\">Delete</button></form></li>",
        id = bookmark.id,
        title = title,
        host = escape(&bookmark.display_host()),
    )
}

pub fn dashboard_page(email: Option<&str>, bookmarks: &[Bookmark], error: Option<&str>) -> String {
    let items: String = bookmarks.iter().map(bookmark_item).collect();
    let empty_hidden = if bookmarks.is_empty() { "" } else { " hidden" };

    let body = format!(
        "<header><h1>My Bookmarks</h1>\
<form method=\"post\" action=\"/auth/signout\"><span>{email}</span> \
<button type=\"submit\">Sign out</button></form></header>{error}\
<form class=\"add\" method=\"post\" action=\"/dashboard/bookmarks\">\
<input type=\"text\" name=\"title\" placeholder=\"Title\" required>\
<input type=\"url\" name=\"url\" placeholder=\"URL\" required>\
<button type=\"submit\">Add Bookmark</button></form>\
<p id=\"empty\"{empty_hidden}>No bookmarks yet.</p>\
<ul id=\"bookmarks\">{items}</ul><script>{script}</script>",
        email = escape(email.unwrap_or("")),
        error = error_banner(error),
        empty_hidden = empty_hidden,
        items = items,
        script = DASHBOARD_SCRIPT,
    );
    layout("My Bookmarks", &body)
}

/// "google" -> "Google"
pub fn provider_label(provider: &str) -> String {
    let mut chars = provider.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
