// WHY: Renderers only read a finished ClassificationResult; no classification logic lives here

use serde_json::json;
use std::fmt::Write;

use crate::classifier::{ClassificationResult, Resolution};
use crate::input::ExtractedPage;
use crate::label::Label;
use crate::text::Sentence;

/// Number of sentences and results echoed in the JSON summary
const SUMMARY_SENTENCES: usize = 5;
const SUMMARY_STAGE2: usize = 3;

pub trait Renderer {
    fn render(&self, result: &ClassificationResult, page: Option<&ExtractedPage>) -> String;
}

const STYLE: &str = "\
:root{--ink:#1f2933;--muted:#52606d;--b:#d9e2ec}
body{font:16px/1.6 system-ui,-apple-system,Segoe UI,Roboto;color:var(--ink);max-width:60rem;margin:0 auto;padding:1rem}
.source-info{border-bottom:1px solid var(--b);margin-bottom:1rem}
.breakdown{display:flex;height:1.25rem;border-radius:4px;overflow:hidden;margin:.5rem 0}
.breakdown div{height:100%}
.legend{font:14px/1.4 system-ui;color:var(--muted);margin:0 0 1.5rem 0;display:flex;gap:1rem;flex-wrap:wrap}
.legend span{display:inline-flex;align-items:center;gap:.4rem}
.chip{display:inline-block;width:.9rem;height:.9rem;border-radius:2px}
.info{background:lightblue}
.promo{background:lightcoral}
.risk{background:lightgreen}
.issues{font-size:.875rem;color:var(--muted)}
";

fn legend_name(label: Label) -> &'static str {
    match label {
        Label::Info => "Informational",
        Label::Promo => "Promotional",
        Label::Risk => "Risk warning",
    }
}

/// Self-contained HTML document with breakdown bar, legend and highlighting
#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    fn render_source(&self, out: &mut String, page: &ExtractedPage) {
        if page.title.is_none() && page.url.is_none() {
            return;
        }
        out.push_str("<div class=\"source-info\">\n");
        if let Some(title) = &page.title {
            let _ = writeln!(out, "<h1>{}</h1>", escape_html(title));
        }
        if let Some(url) = &page.url {
            let _ = writeln!(out, "<p><strong>URL:</strong> <span class=\"source-url\">{}</span></p>", escape_html(url));
        }
        out.push_str("</div>\n");
    }

    fn render_breakdown(&self, out: &mut String, result: &ClassificationResult) {
        let stats = result.statistics();
        out.push_str("<div class=\"breakdown\">");
        for label in Label::ALL {
            let pct = stats.percentage(label);
            if pct > 0.0 {
                let _ = write!(
                    out,
                    "<div class=\"{label}\" style=\"width:{pct:.1}%\" title=\"{} {pct:.1}%\"></div>",
                    legend_name(label)
                );
            }
        }
        out.push_str("</div>\n<div class=\"legend\">\n");
        for label in Label::ALL {
            let _ = writeln!(
                out,
                "  <span><i class=\"chip {label}\"></i> {} {:.1}%</span>",
                legend_name(label),
                stats.percentage(label)
            );
        }
        out.push_str("</div>\n");
    }

    fn render_sentence(&self, out: &mut String, sentence: &Sentence, resolution: &Resolution) {
        match resolution {
            Resolution::PhraseLevel { spans } => {
                for span in spans {
                    let _ = write!(
                        out,
                        "<span class=\"{}\">{}</span>",
                        span.label,
                        escape_html(span.slice(&sentence.text))
                    );
                }
            }
            Resolution::SentenceLevel { label } => {
                let _ = write!(out, "<span class=\"{label}\">{}</span>", escape_html(&sentence.text));
            }
        }
    }
}

impl Renderer for HtmlRenderer {
    fn render(&self, result: &ClassificationResult, page: Option<&ExtractedPage>) -> String {
        let title = page
            .and_then(|p| p.title.as_deref())
            .unwrap_or("Content classification");

        let mut out = String::with_capacity(4096);
        out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        let _ = writeln!(out, "<title>{}</title>", escape_html(title));
        let _ = writeln!(out, "<style>\n{STYLE}</style>\n</head>\n<body>");

        if let Some(page) = page {
            self.render_source(&mut out, page);
        }
        self.render_breakdown(&mut out, result);

        out.push_str("<div class=\"classified-content\">\n<p>");
        for (i, (sentence, resolution)) in result.resolved().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            self.render_sentence(&mut out, sentence, resolution);
        }
        out.push_str("</p>\n</div>\n");

        if result.is_degraded() {
            let _ = writeln!(
                out,
                "<p class=\"issues\">{} issue(s) during classification; affected sentences fell back to sentence-level labels.</p>",
                result.issues().len()
            );
        }

        out.push_str("</body>\n</html>\n");
        out
    }
}

/// Pretty-printed summary of counts, statistics and the first results
#[derive(Debug, Clone, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, result: &ClassificationResult, page: Option<&ExtractedPage>) -> String {
        let stats = result.statistics();
        let summary = json!({
            "sentences_count": result.sentences().len(),
            "stage1_results_count": result.stage1_results().len(),
            "stage2_results_count": result.stage2_results().len(),
            "statistics": {
                "info_chars": stats.info_chars,
                "promo_chars": stats.promo_chars,
                "risk_chars": stats.risk_chars,
                "total_chars": stats.total_chars,
                "info_percentage": stats.percentage(Label::Info),
                "promo_percentage": stats.percentage(Label::Promo),
                "risk_percentage": stats.percentage(Label::Risk),
                "phrase_level_sentences": stats.phrase_level_sentences,
            },
            "sentences": result.sentences().iter().take(SUMMARY_SENTENCES).collect::<Vec<_>>(),
            "stage1_sample": result.stage1_results().iter().take(SUMMARY_SENTENCES).collect::<Vec<_>>(),
            "stage2_sample": result.stage2_results().iter().take(SUMMARY_STAGE2).collect::<Vec<_>>(),
            "issues": result.issues(),
            "debug_info": result.debug(),
            "source": page.map(|p| json!({ "title": p.title, "url": p.url })),
        });
        format!("{summary:#}")
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Stage1Result, Stage2Result};
    use crate::span::Span;

    fn sample() -> ClassificationResult {
        let sentences = vec![
            Sentence::new(0, "Win <big>!"),
            Sentence::new(1, "Deposit now."),
        ];
        let stage1 = vec![
            Stage1Result {
                hash: sentences[0].hash.clone(),
                label: Label::Promo,
                needs_phrase_level: false,
            },
            Stage1Result {
                hash: sentences[1].hash.clone(),
                label: Label::Info,
                needs_phrase_level: true,
            },
        ];
        let stage2 = vec![Stage2Result {
            hash: sentences[1].hash.clone(),
            spans: vec![Span::new(0, 8, Label::Promo), Span::new(8, 12, Label::Risk)],
        }];
        ClassificationResult::new(sentences, stage1, stage2, Vec::new(), None)
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
    }

    #[test]
    fn test_html_highlights_sentences_and_spans() {
        let html = HtmlRenderer.render(&sample(), None);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<span class=\"promo\">Win &lt;big&gt;!</span>"));
        assert!(html.contains("<span class=\"promo\">Deposit </span><span class=\"risk\">now.</span>"));
        assert!(html.contains("lightcoral"));
        assert!(html.contains("Informational 0.0%"));
        assert!(!html.contains("class=\"issues\""));
    }

    #[test]
    fn test_html_includes_page_metadata() {
        let page = ExtractedPage {
            title: Some("Casino & Co".to_string()),
            url: Some("https://casino.test/".to_string()),
            success: true,
            ..Default::default()
        };
        let html = HtmlRenderer.render(&sample(), Some(&page));
        assert!(html.contains("<title>Casino &amp; Co</title>"));
        assert!(html.contains("https://casino.test/"));
    }

    #[test]
    fn test_json_summary_counts() {
        let rendered = JsonRenderer.render(&sample(), None);
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["sentences_count"], 2);
        assert_eq!(value["stage2_results_count"], 1);
        assert_eq!(value["statistics"]["total_chars"], 22);
        assert_eq!(value["statistics"]["promo_chars"], 18);
        assert!(value["debug_info"].is_null());
    }
}
