//! TwiML rendering
//!
//! Minimal builder for the gateway dialog markup the telephony handlers
//! answer with. Only the verbs this service emits are modelled: `<Say>`,
//! `<Gather>` (speech input), `<Redirect>` and `<Hangup>`.

use axum::http::header;
use axum::response::{IntoResponse, Response};

/// Speech capture settings for one `<Gather>` verb.
#[derive(Debug, Clone)]
pub struct Gather {
    /// Callback URL the gateway posts the speech result to.
    pub action: String,
    /// Spoken-language tag for recognition.
    pub language: String,
    /// Prompt spoken inside the gather, while capture is armed.
    pub prompt: Option<String>,
}

#[derive(Debug, Clone)]
enum Verb {
    Say { text: String, language: String },
    Gather(Gather),
    Redirect(String),
    Hangup,
}

/// Accumulates verbs and renders the `<Response>` document.
#[derive(Debug, Default)]
pub struct TwimlBuilder {
    verbs: Vec<Verb>,
}

impl TwimlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn say(mut self, text: impl Into<String>, language: impl Into<String>) -> Self {
        self.verbs.push(Verb::Say {
            text: text.into(),
            language: language.into(),
        });
        self
    }

    pub fn gather(mut self, gather: Gather) -> Self {
        self.verbs.push(Verb::Gather(gather));
        self
    }

    pub fn redirect(mut self, url: impl Into<String>) -> Self {
        self.verbs.push(Verb::Redirect(url.into()));
        self
    }

    pub fn hangup(mut self) -> Self {
        self.verbs.push(Verb::Hangup);
        self
    }

    pub fn render(self) -> Twiml {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response>");
        for verb in &self.verbs {
            render_verb(&mut out, verb);
        }
        out.push_str("</Response>");
        Twiml(out)
    }
}

fn render_verb(out: &mut String, verb: &Verb) {
    match verb {
        Verb::Say { text, language } => {
            out.push_str(&format!(
                "<Say language=\"{}\">{}</Say>",
                escape(language),
                escape(text)
            ));
        }
        Verb::Gather(gather) => {
            out.push_str(&format!(
                "<Gather input=\"speech\" language=\"{}\" action=\"{}\" \
                 method=\"POST\" speechTimeout=\"auto\">",
                escape(&gather.language),
                escape(&gather.action)
            ));
            if let Some(prompt) = &gather.prompt {
                render_verb(
                    out,
                    &Verb::Say {
                        text: prompt.clone(),
                        language: gather.language.clone(),
                    },
                );
            }
            out.push_str("</Gather>");
        }
        Verb::Redirect(url) => {
            out.push_str(&format!("<Redirect method=\"POST\">{}</Redirect>", escape(url)));
        }
        Verb::Hangup => out.push_str("<Hangup/>"),
    }
}

/// Rendered document; responds as `application/xml`.
#[derive(Debug, Clone)]
pub struct Twiml(pub String);

impl IntoResponse for Twiml {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, "application/xml")], self.0).into_response()
    }
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn say_and_hangup_render_in_order() {
        let doc = TwimlBuilder::new()
            .say("Hasta luego", "es-ES")
            .hangup()
            .render();
        assert_eq!(
            doc.0,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response>\
             <Say language=\"es-ES\">Hasta luego</Say><Hangup/></Response>"
        );
    }

    #[test]
    fn gather_carries_action_and_nested_prompt() {
        let doc = TwimlBuilder::new()
            .gather(Gather {
                action: "/api/telephony/gather?call_id=7&attempt=0".into(),
                language: "es-ES".into(),
                prompt: Some("¿En qué puedo ayudarle?".into()),
            })
            .render();
        assert!(doc.0.contains("input=\"speech\""));
        assert!(doc.0.contains("action=\"/api/telephony/gather?call_id=7&amp;attempt=0\""));
        assert!(doc.0.contains("<Say language=\"es-ES\">¿En qué puedo ayudarle?</Say></Gather>"));
    }

    #[test]
    fn redirect_posts_back_to_the_action() {
        let doc = TwimlBuilder::new()
            .gather(Gather {
                action: "/api/telephony/gather?call_id=7&attempt=1".into(),
                language: "es-ES".into(),
                prompt: None,
            })
            .redirect("/api/telephony/gather?call_id=7&attempt=1")
            .render();
        assert!(doc.0.contains(
            "</Gather><Redirect method=\"POST\">\
             /api/telephony/gather?call_id=7&amp;attempt=1</Redirect>"
        ));
    }

    #[test]
    fn text_is_xml_escaped() {
        let doc = TwimlBuilder::new().say("Precios <50> & \"más\"", "es-ES").render();
        assert!(doc.0.contains("Precios &lt;50&gt; &amp; &quot;más&quot;"));
    }
}
