//! Thin HTML rendering. Plain string assembly, no template engine: the
//! pages exist to exercise the CRUD and chat surfaces, not to be pretty.

use axum::response::Html;

use botforge_db::models::{ChatbotRow, CssFileRow, TextFileRow, UserRow};
use botforge_types::{Role, Turn};

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

/// Uploaded CSS is embedded inside a `<style>` element, where entity
/// escaping does not apply; the only sequence that can terminate the
/// element early is `</`. `<\/` is a valid CSS string escape and inert
/// in HTML, so the stylesheet keeps working while the markup stays
/// closed.
fn sanitize_css(css: &str) -> String {
    css.replace("</", "<\\/")
}

fn layout(title: &str, user: Option<&UserRow>, flash: Option<&str>, body: &str) -> Html<String> {
    let nav = match user {
        Some(user) => format!(
            r#"<nav><a href="/catalog">Catalog</a> <a href="/chatbot/new">New chatbot</a> <a href="/profile">{}</a> <a href="/logout">Logout</a></nav>"#,
            escape(&user.username)
        ),
        None => r#"<nav><a href="/login">Login</a> <a href="/register">Register</a></nav>"#
            .to_string(),
    };

    let flash_html = flash
        .map(|msg| format!(r#"<p class="flash">{}</p>"#, escape(msg)))
        .unwrap_or_default();

    Html(format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>{title} - Botforge</title></head>
<body>
<header><h1><a href="/">Botforge</a></h1>{nav}</header>
{flash_html}
<main>
{body}
</main>
</body>
</html>"#,
        title = escape(title),
    ))
}

pub fn home(user: &UserRow, flash: Option<&str>) -> Html<String> {
    let body = format!(
        "<p>Welcome back, {}.</p>\n<p><a href=\"/catalog\">Browse your chatbots</a> or <a href=\"/chatbot/new\">create a new one</a>.</p>",
        escape(&user.username)
    );
    layout("Home", Some(user), flash, &body)
}

pub fn login(flash: Option<&str>) -> Html<String> {
    let body = r#"<h2>Login</h2>
<form method="post" action="/login">
<label>Username <input name="username" autofocus></label><br>
<label>Password <input name="password" type="password"></label><br>
<button type="submit">Login</button>
</form>
<p>No account? <a href="/register">Register</a>.</p>"#;
    layout("Login", None, flash, body)
}

pub fn register(flash: Option<&str>) -> Html<String> {
    let body = r#"<h2>Register</h2>
<form method="post" action="/register">
<label>Username <input name="username" autofocus></label><br>
<label>Password <input name="password" type="password"></label><br>
<label>Confirm password <input name="confirm" type="password"></label><br>
<button type="submit">Create account</button>
</form>"#;
    layout("Register", None, flash, body)
}

pub fn catalog(user: &UserRow, chatbots: &[ChatbotRow], flash: Option<&str>) -> Html<String> {
    let mut rows = String::new();
    for bot in chatbots {
        let name = bot.name.as_deref().filter(|n| !n.is_empty()).unwrap_or("(unnamed)");
        let owned = bot.user_id.as_deref() == Some(user.id.as_str());
        let actions = if owned {
            format!(
                r#"<a href="/chatbot/{id}/edit">Edit</a> <form class="inline" method="post" action="/chatbot/{id}/delete"><button type="submit">Delete</button></form>"#,
                id = bot.id
            )
        } else {
            String::new()
        };
        rows.push_str(&format!(
            "<tr><td><a href=\"/cb/{id}\">{name}</a></td><td>{created}</td><td>{actions}</td></tr>\n",
            id = bot.id,
            name = escape(name),
            created = escape(&bot.created_at),
        ));
    }

    let body = if chatbots.is_empty() {
        "<h2>Catalog</h2>\n<p>No chatbots yet. <a href=\"/chatbot/new\">Create one</a>.</p>"
            .to_string()
    } else {
        format!(
            "<h2>Catalog</h2>\n<table>\n<tr><th>Name</th><th>Created</th><th></th></tr>\n{rows}</table>"
        )
    };
    layout("Catalog", Some(user), flash, &body)
}

pub fn profile(user: &UserRow, chatbot_count: u32, flash: Option<&str>) -> Html<String> {
    let body = format!(
        "<h2>Profile</h2>\n<p>Username: {}</p>\n<p>Chatbots: {}</p>",
        escape(&user.username),
        chatbot_count
    );
    layout("Profile", Some(user), flash, &body)
}

/// Shared create/edit form. On edit, existing attachments are listed with
/// their delete actions.
pub fn chatbot_form(
    user: &UserRow,
    flash: Option<&str>,
    heading: &str,
    action: &str,
    bot: Option<&ChatbotRow>,
    text_files: &[TextFileRow],
    css_file: Option<&CssFileRow>,
) -> Html<String> {
    let name = bot.and_then(|b| b.name.as_deref()).unwrap_or("");
    let system_prompt = bot.and_then(|b| b.system_prompt.as_deref()).unwrap_or("");
    let welcome = bot.and_then(|b| b.welcome_message.as_deref()).unwrap_or("");

    let mut attachments = String::new();
    if let Some(bot) = bot {
        attachments.push_str("<h3>Attached files</h3>\n<ul>\n");
        for file in text_files {
            attachments.push_str(&format!(
                r#"<li>{name} <form class="inline" method="post" action="/chatbot/{bid}/textfile/{fid}/delete"><button type="submit">Delete</button></form></li>
"#,
                name = escape(&file.filename),
                bid = bot.id,
                fid = file.id,
            ));
        }
        match css_file {
            Some(css) => attachments.push_str(&format!(
                r#"<li>{name} (theme) <form class="inline" method="post" action="/chatbot/{bid}/cssfile/delete"><button type="submit">Delete</button></form></li>
"#,
                name = escape(&css.filename),
                bid = bot.id,
            )),
            None => attachments.push_str("<li>(no theme)</li>\n"),
        }
        attachments.push_str("</ul>\n");
    }

    let body = format!(
        r#"<h2>{heading}</h2>
<form method="post" action="{action}" enctype="multipart/form-data">
<label>Name <input name="name" value="{name}"></label><br>
<label>System prompt <textarea name="system_prompt">{system_prompt}</textarea></label><br>
<label>Welcome message <textarea name="welcome_message">{welcome}</textarea></label><br>
<label>Reference files <input name="textfiles" type="file" multiple></label><br>
<label>CSS theme <input name="cssfile" type="file"></label><br>
<button type="submit">Save</button>
</form>
{attachments}"#,
        heading = escape(heading),
        name = escape(name),
        system_prompt = escape(system_prompt),
        welcome = escape(welcome),
    );
    layout(heading, Some(user), flash, &body)
}

pub fn chat(
    user: &UserRow,
    bot: &ChatbotRow,
    history: &[Turn],
    css: Option<&str>,
    flash: Option<&str>,
) -> Html<String> {
    let name = bot.name.as_deref().filter(|n| !n.is_empty()).unwrap_or("(unnamed)");

    let mut bubbles = String::new();
    // The welcome message is UI chrome, not part of the stored history.
    if let Some(welcome) = bot.welcome_message.as_deref().filter(|w| !w.trim().is_empty()) {
        bubbles.push_str(&format!(
            "<div class=\"bubble bot\">{}</div>\n",
            escape(welcome)
        ));
    }
    for turn in history {
        let class = match turn.role {
            Role::User => "bubble user",
            Role::Assistant => "bubble bot",
        };
        bubbles.push_str(&format!(
            "<div class=\"{class}\">{}</div>\n",
            escape(&turn.text)
        ));
    }

    let theme = css
        .map(|css| format!("<style>\n{}\n</style>", sanitize_css(css)))
        .unwrap_or_default();

    let body = format!(
        r#"<h2>{name}</h2>
{theme}
<div id="chat-window">
{bubbles}</div>
<p id="typing" class="hidden">...</p>
<form id="chat-form" data-send-url="/cb/{id}/send_json" data-reset-url="/cb/{id}/reset">
<input id="user-input" autocomplete="off">
<button type="submit">Send</button>
<button type="button" id="reset-btn">Reset</button>
</form>
<script>
{script}
</script>"#,
        name = escape(name),
        id = bot.id,
        script = CHAT_SCRIPT,
    );
    layout(name, Some(user), flash, &body)
}

/// Browser-side chat: enter sends over fetch, reset clears the session
/// history and reloads.
const CHAT_SCRIPT: &str = r#"(function () {
  const form = document.getElementById('chat-form');
  const input = document.getElementById('user-input');
  const win = document.getElementById('chat-window');
  const typing = document.getElementById('typing');
  const resetBtn = document.getElementById('reset-btn');
  if (!form || !win || !input) return;

  const sendUrl = form.dataset.sendUrl;
  const resetUrl = form.dataset.resetUrl;

  input.focus();
  input.addEventListener('keydown', (e) => {
    if (e.key === 'Enter' && !e.shiftKey) {
      e.preventDefault();
      form.requestSubmit();
    }
  });

  form.addEventListener('submit', async (e) => {
    e.preventDefault();
    const text = (input.value || '').trim();
    if (!text) return;

    addBubble('user', text);
    input.value = '';
    input.disabled = true;
    typing && typing.classList.remove('hidden');

    try {
      const res = await fetch(sendUrl, {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify({ message: text })
      });
      const data = await res.json();
      addBubble('bot', data.ok ? data.bot.text : 'Error: message could not be sent.');
    } catch (err) {
      addBubble('bot', 'Network error.');
    } finally {
      typing && typing.classList.add('hidden');
      input.disabled = false;
      input.focus();
    }
  });

  if (resetBtn) {
    resetBtn.addEventListener('click', async () => {
      try { await fetch(resetUrl, { method: 'POST' }); } catch (e) {}
      location.reload();
    });
  }

  function addBubble(role, text) {
    const div = document.createElement('div');
    div.className = role === 'user' ? 'bubble user' : 'bubble bot';
    div.textContent = text;
    win.appendChild(div);
    win.scrollTop = win.scrollHeight;
  }
})();"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(
            escape(r#"<script>alert("&'")</script>"#),
            "&lt;script&gt;alert(&quot;&amp;&#39;&quot;)&lt;/script&gt;"
        );
    }

    #[test]
    fn css_theme_cannot_break_out_of_its_style_tag() {
        let user = UserRow {
            id: "u1".into(),
            username: "alice".into(),
            password: String::new(),
            salt: None,
            created_at: String::new(),
        };
        let bot = ChatbotRow {
            id: "bot00001".into(),
            user_id: Some("u1".into()),
            name: Some("Helper".into()),
            system_prompt: None,
            welcome_message: None,
            created_at: String::new(),
        };
        let hostile = "</style><script>document.location='https://evil.example'</script>";

        let Html(page) = chat(&user, &bot, &[], Some(hostile), None);
        assert!(!page.contains("</style><script>"));
        assert!(page.contains("<\\/style>"));

        // An honest stylesheet passes through untouched
        let Html(page) = chat(&user, &bot, &[], Some("body { color: red }"), None);
        assert!(page.contains("body { color: red }"));
    }

    #[test]
    fn chat_page_shows_welcome_and_history() {
        let user = UserRow {
            id: "u1".into(),
            username: "alice".into(),
            password: String::new(),
            salt: None,
            created_at: String::new(),
        };
        let bot = ChatbotRow {
            id: "bot00001".into(),
            user_id: Some("u1".into()),
            name: Some("Helper".into()),
            system_prompt: None,
            welcome_message: Some("Hi, I am Helper".into()),
            created_at: String::new(),
        };
        let history = vec![Turn::user("hello <b>bold</b>")];

        let Html(page) = chat(&user, &bot, &history, Some("body { color: red }"), None);
        assert!(page.contains("Hi, I am Helper"));
        assert!(page.contains("hello &lt;b&gt;bold&lt;/b&gt;"));
        assert!(page.contains("body { color: red }"));
        assert!(page.contains("/cb/bot00001/send_json"));
    }
}
