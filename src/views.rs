use chrono::{DateTime, Local};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::{auth::SessionUser, config::prefixed};

/// RenderError
///
/// The renderer was asked for a view it does not know.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown view `{0}`")]
    UnknownView(String),
}

/// ViewContext
///
/// Everything a view may read: the page's data object, the identity of the
/// current request (for the navigation bar) and the route prefix for links.
pub struct ViewContext<'a> {
    pub base_path: &'a str,
    pub user: Option<&'a SessionUser>,
    pub data: &'a Value,
}

impl ViewContext<'_> {
    fn link(&self, route: &str) -> String {
        prefixed(self.base_path, route)
    }

    fn field(&self, key: &str) -> String {
        scalar(self.data.get(key))
    }

    fn list(&self, key: &str) -> &[Value] {
        self.data
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// ViewRenderer
///
/// Turns a view name plus a plain data object into an HTML document.
/// Implementations must escape every interpolated value.
pub trait ViewRenderer: Send + Sync {
    fn render(&self, view: &str, ctx: &ViewContext<'_>) -> Result<String, RenderError>;
}

pub type RendererState = Arc<dyn ViewRenderer>;

/// HtmlViews
///
/// Built-in renderer for the site's pages: a shared layout with the navigation
/// bar, and one body per view.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlViews;

impl ViewRenderer for HtmlViews {
    fn render(&self, view: &str, ctx: &ViewContext<'_>) -> Result<String, RenderError> {
        let body = match view {
            "index" => index(ctx),
            "database" => database(ctx),
            "contact" => contact(ctx),
            "messages" => messages(ctx),
            "crud" => crud(ctx),
            "login" => login(ctx),
            "register" => register(ctx),
            other => return Err(RenderError::UnknownView(other.to_string())),
        };
        Ok(layout(ctx, &body))
    }
}

/// Minimal HTML escaping for text and attribute positions.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Formats a stored timestamp (RFC 3339) in the local zone, Hungarian style.
pub fn format_date(value: Option<&Value>) -> String {
    let Some(raw) = value.and_then(Value::as_str) else {
        return String::new();
    };
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => ts
            .with_timezone(&Local)
            .format("%Y. %m. %d. %H:%M:%S")
            .to_string(),
        Err(_) => raw.to_string(),
    }
}

// Unescaped text of a scalar JSON value; null and missing become "".
fn scalar(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn esc(value: Option<&Value>) -> String {
    escape(&scalar(value))
}

fn layout(ctx: &ViewContext<'_>, body: &str) -> String {
    let title = escape(&ctx.field("title"));
    let mut nav = format!(
        r#"<a href="{}">Főoldal</a> <a href="{}">Adatbázis</a> <a href="{}">Kapcsolat</a>"#,
        ctx.link("/"),
        ctx.link("/adatbazis"),
        ctx.link("/kapcsolat"),
    );
    match ctx.user {
        Some(user) => {
            nav.push_str(&format!(r#" <a href="{}">Üzenetek</a>"#, ctx.link("/uzenetek")));
            if user.is_admin() {
                nav.push_str(&format!(r#" <a href="{}">CRUD</a>"#, ctx.link("/crud")));
            }
            nav.push_str(&format!(
                r#" <span class="user">{} ({})</span> <a href="{}">Kilépés</a>"#,
                escape(&user.username),
                user.role,
                ctx.link("/logout"),
            ));
        }
        None => nav.push_str(&format!(
            r#" <a href="{}">Belépés</a> <a href="{}">Regisztráció</a>"#,
            ctx.link("/login"),
            ctx.link("/register"),
        )),
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="hu">
<head>
<meta charset="utf-8">
<title>{title}</title>
<link rel="stylesheet" href="{css}">
</head>
<body>
<nav>{nav}</nav>
<main>
<h1>{title}</h1>
{body}
</main>
</body>
</html>
"#,
        css = ctx.link("/css/style.css"),
    )
}

// `<p class="...">text</p>` line for a non-empty flash field, else nothing.
fn notice(ctx: &ViewContext<'_>, key: &str, class: &str) -> String {
    let text = ctx.field(key);
    if text.is_empty() {
        String::new()
    } else {
        format!("<p class=\"{}\">{}</p>\n", class, escape(&text))
    }
}

fn index(_ctx: &ViewContext<'_>) -> String {
    "<p>Üdvözöljük a SzerencseAdat Kft. lottó eredményeket közlő oldalán.</p>".to_string()
}

fn database(ctx: &ViewContext<'_>) -> String {
    let rows = ctx.list("huzasok");
    if rows.is_empty() {
        return "<p>Nincs megjeleníthető adat.</p>".to_string();
    }
    let body: String = rows
        .iter()
        .map(|row| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                esc(row.get("ev")),
                esc(row.get("het")),
                esc(row.get("szam")),
                esc(row.get("talalat")),
                esc(row.get("ertek")),
            )
        })
        .collect();
    format!(
        "<table>\n<tr><th>Év</th><th>Hét</th><th>Szám</th><th>Találat</th><th>Érték</th></tr>\n{}</table>",
        body
    )
}

fn contact(ctx: &ViewContext<'_>) -> String {
    format!(
        r#"{}<form method="post" action="{}">
<label>Név <input name="name" required></label>
<label>E-mail <input type="email" name="email" required></label>
<label>Üzenet <textarea name="text" required></textarea></label>
<button type="submit">Küldés</button>
</form>"#,
        notice(ctx, "msg", "msg"),
        ctx.link("/kapcsolat"),
    )
}

fn messages(ctx: &ViewContext<'_>) -> String {
    let items = ctx.list("messages");
    if items.is_empty() {
        return "<p>Nincs üzenet.</p>".to_string();
    }
    let body: String = items
        .iter()
        .map(|item| {
            format!(
                "<li><strong>{}</strong> &lt;{}&gt; <em>{}</em><p>{}</p></li>\n",
                esc(item.get("sender_name")),
                esc(item.get("email")),
                escape(&format_date(item.get("created_at"))),
                esc(item.get("message")),
            )
        })
        .collect();
    format!("<ul class=\"messages\">\n{}</ul>", body)
}

fn children<'v>(item: &'v Value, key: &str) -> impl Iterator<Item = &'v Value> {
    item.get(key).and_then(Value::as_array).into_iter().flatten()
}

fn crud(ctx: &ViewContext<'_>) -> String {
    let mut html = format!(
        r#"<form method="post" action="{}">
<label>Év <input type="number" name="ev" required></label>
<label>Hét <input type="number" name="het" required></label>
<button type="submit">Új húzás</button>
</form>
"#,
        ctx.link("/crud/add"),
    );
    for item in ctx.list("items") {
        html.push_str(&crud_item(ctx, item));
    }
    html
}

fn crud_item(ctx: &ViewContext<'_>, item: &Value) -> String {
    let id = esc(item.get("id"));
    let numbers: String = children(item, "numbers")
        .map(|number| {
            format!(
                r#"<li>{} <a href="{}">x</a></li>"#,
                esc(number.get("szam")),
                ctx.link(&format!("/crud/delete-number/{}", esc(number.get("id")))),
            )
        })
        .collect();
    let prizes: String = children(item, "prizes")
        .map(|prize| {
            format!(
                r#"<tr><td>{}</td><td>{}</td><td>{}</td><td><a href="{}">x</a></td></tr>"#,
                esc(prize.get("talalat")),
                esc(prize.get("darab")),
                esc(prize.get("ertek")),
                ctx.link(&format!("/crud/delete-prize/{}", esc(prize.get("id")))),
            )
        })
        .collect();

    format!(
        r#"<section class="draw"><h2>{ev} / {het}. hét</h2> <a href="{delete}">Húzás törlése</a>
<ul class="numbers">{numbers}</ul>
<form method="post" action="{add_number}"><input type="number" name="szam" required><button type="submit">Szám hozzáadása</button></form>
<table class="prizes"><tr><th>Találat</th><th>Darab</th><th>Érték</th><th></th></tr>{prizes}</table>
<form method="post" action="{add_prize}"><input type="number" name="talalat" required><input type="number" name="darab" required><input type="number" name="ertek" required><button type="submit">Nyeremény hozzáadása</button></form></section>
"#,
        ev = esc(item.get("ev")),
        het = esc(item.get("het")),
        delete = ctx.link(&format!("/crud/delete/{}", id)),
        add_number = ctx.link(&format!("/crud/add-number/{}", id)),
        add_prize = ctx.link(&format!("/crud/add-prize/{}", id)),
    )
}

fn login(ctx: &ViewContext<'_>) -> String {
    format!(
        r#"{}<form method="post" action="{}">
<label>Felhasználónév <input name="username" required></label>
<label>Jelszó <input type="password" name="password" required></label>
<button type="submit">Belépés</button>
</form>"#,
        notice(ctx, "error", "error"),
        ctx.link("/login"),
    )
}

fn register(ctx: &ViewContext<'_>) -> String {
    format!(
        r#"<form method="post" action="{}">
<label>Felhasználónév <input name="username" required></label>
<label>Jelszó <input type="password" name="password" required></label>
<button type="submit">Regisztráció</button>
</form>"#,
        ctx.link("/register"),
    )
}
