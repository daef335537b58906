use super::Digest;

pub(super) fn render_html(digest: &Digest) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\">");
    html.push_str(&format!(
        "<title>{}</title></head>\n<body>\n",
        escape_html(&digest.subject())
    ));
    html.push_str(&format!(
        "<h1>{} new job posting{}</h1>\n",
        digest.count(),
        if digest.count() == 1 { "" } else { "s" }
    ));

    for company in digest.companies() {
        html.push_str(&format!("<h2>{}</h2>\n<ul>\n", escape_html(company)));
        for record in digest.records().iter().filter(|record| record.company == company) {
            html.push_str(&format!(
                "<li><a href=\"{}\">{}</a><br>{}",
                escape_html(&record.link),
                escape_html(&record.title),
                escape_html(&record.locations.join("; "))
            ));
            if let Some(job_id) = &record.job_id {
                html.push_str(&format!(" <small>({})</small>", escape_html(job_id)));
            }
            html.push_str("</li>\n");
        }
        html.push_str("</ul>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

pub(super) fn render_text(digest: &Digest) -> String {
    let mut text = format!("{}\n\n", digest.subject());
    for record in digest.records() {
        text.push_str(&format!(
            "- {} | {} | {}\n  {}\n",
            record.company,
            record.title,
            record.locations.join("; "),
            record.link
        ));
    }
    text
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
