//! Server-rendered HTML for the two-tab research page.

use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Profit,
    Descriptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Info(String),
    Warning(String),
    Error(String),
}

impl Notice {
    fn class(&self) -> &'static str {
        match self {
            Notice::Success(_) => "success",
            Notice::Info(_) => "info",
            Notice::Warning(_) => "warning",
            Notice::Error(_) => "error",
        }
    }

    fn text(&self) -> &str {
        match self {
            Notice::Success(t) | Notice::Info(t) | Notice::Warning(t) | Notice::Error(t) => t,
        }
    }
}

/// State of one tab after a submission.
#[derive(Debug, Clone, Default)]
pub struct TabView {
    pub product_name: String,
    pub product_url: String,
    pub notices: Vec<Notice>,
    /// Raw agent output.
    pub result: Option<String>,
    /// Report file offered for download.
    pub download: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PageView {
    pub active: Tab,
    pub profit: TabView,
    pub descriptions: TabView,
}

impl PageView {
    /// Page with `view` shown on the `active` tab and the other tab empty.
    pub fn with_tab(active: Tab, view: TabView) -> Self {
        match active {
            Tab::Profit => Self {
                active,
                profit: view,
                ..Default::default()
            },
            Tab::Descriptions => Self {
                active,
                descriptions: view,
                ..Default::default()
            },
        }
    }
}

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 960px; margin: 2rem auto; padding: 0 1rem; color: #222; }
h1 { margin-bottom: 0.2rem; }
.subtitle { color: #666; margin-top: 0; }
.tabs > input[type=radio] { display: none; }
.tabs > label { display: inline-block; padding: 0.6rem 1.2rem; cursor: pointer; border-bottom: 3px solid transparent; }
.tabs > input:checked + label { border-bottom-color: #e4572e; font-weight: 600; }
.panel { display: none; padding: 1rem 0; border-top: 1px solid #ddd; }
#tab-profit:checked ~ .panel-profit, #tab-descriptions:checked ~ .panel-descriptions { display: block; }
form .row { display: flex; gap: 1rem; }
form .row > div { flex: 2; } form .row > div.narrow { flex: 1; }
input[type=text], input[type=url] { width: 100%; padding: 0.5rem; box-sizing: border-box; }
button { margin-top: 0.8rem; padding: 0.5rem 1.2rem; cursor: pointer; }
.notice { padding: 0.6rem 1rem; border-radius: 4px; margin: 0.8rem 0; }
.success { background: #e6f4ea; } .info { background: #e8f0fe; } .warning { background: #fef7e0; } .error { background: #fce8e6; }
pre.result { white-space: pre-wrap; background: #f8f8f8; padding: 1rem; border-radius: 4px; }
footer { text-align: center; color: #666; margin-top: 3rem; }
"#;

pub fn render_page(view: &PageView) -> String {
    let mut html = String::with_capacity(8 * 1024);
    let checked = |tab: Tab| if view.active == tab { " checked" } else { "" };

    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Product Research Tool</title>
<style>{STYLE}</style>
</head>
<body>
<h1>AI Product Research Tool</h1>
<p class="subtitle">Web search over MCP + a hosted language model</p>
<div class="tabs">
<input type="radio" name="tab" id="tab-profit"{profit_checked}><label for="tab-profit">Profit Calculator</label>
<input type="radio" name="tab" id="tab-descriptions"{desc_checked}><label for="tab-descriptions">Description Generator</label>
"#,
        profit_checked = checked(Tab::Profit),
        desc_checked = checked(Tab::Descriptions),
    );

    let _ = write!(
        html,
        r#"<section class="panel panel-profit">
<h2>Product Profit Calculator</h2>
<p>Analyze profitability by comparing Amazon and AliExpress prices.</p>
<form method="post" action="/profit">
<label for="profit-name">Product name</label>
<input type="text" id="profit-name" name="product_name" placeholder="e.g., sunset lamp projector" value="{name}">
<button type="submit">Analyze Profitability</button>
</form>
"#,
        name = escape_html(&view.profit.product_name),
    );
    render_outcome(&mut html, &view.profit, "Download Report");
    html.push_str("</section>\n");

    let _ = write!(
        html,
        r#"<section class="panel panel-descriptions">
<h2>Product Description Generator</h2>
<p>Generate SEO-optimized product descriptions from web research.</p>
<form method="post" action="/descriptions">
<div class="row">
<div><label for="desc-name">Product name</label>
<input type="text" id="desc-name" name="product_name" placeholder="e.g., wireless bluetooth earbuds" value="{name}"></div>
<div class="narrow"><label for="desc-url">Product URL (optional)</label>
<input type="text" id="desc-url" name="product_url" placeholder="https://amazon.com/..." value="{url}"></div>
</div>
<button type="submit">Generate Descriptions</button>
</form>
"#,
        name = escape_html(&view.descriptions.product_name),
        url = escape_html(&view.descriptions.product_url),
    );
    render_outcome(&mut html, &view.descriptions, "Download Descriptions");
    html.push_str("</section>\n</div>\n");

    html.push_str(
        "<footer><p>Tavily MCP search, filesystem MCP reports, OpenAI-compatible model</p></footer>\n</body>\n</html>\n",
    );
    html
}

fn render_outcome(html: &mut String, view: &TabView, download_label: &str) {
    for notice in &view.notices {
        let _ = writeln!(
            html,
            r#"<div class="notice {}">{}</div>"#,
            notice.class(),
            escape_html(notice.text())
        );
    }

    if let Some(result) = &view.result {
        let _ = writeln!(html, "<hr>\n<pre class=\"result\">{}</pre>", escape_html(result));
    }

    if let Some(file) = &view.download {
        let _ = writeln!(
            html,
            r#"<p><a href="/download/{}" download>{}</a></p>"#,
            urlencoding::encode(file),
            escape_html(download_label)
        );
    }
}

/// Escape text for HTML element content and quoted attributes.
pub fn escape_html(s: &str) -> String {
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
