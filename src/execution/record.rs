use crate::engine::{EnrichedArticle, Stage};
use serde::Serialize;

/// Content-store timestamp format (UTC).
pub const PUBLISH_DATE_FORMAT: &str = "%Y%m%dT%H%M%S";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub value: String,
}

/// One item to create in the content store. Serialized as the `input`
/// variable of the create mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishRecord {
    pub name: String,
    #[serde(rename = "templateId")]
    pub template_id: String,
    pub parent: String,
    pub language: String,
    pub fields: Vec<Field>,
}

/// Where and how records are created.
#[derive(Debug, Clone)]
pub struct ItemTemplate {
    pub template_id: String,
    pub parent_id: String,
    pub language: String,
}

impl PublishRecord {
    pub fn from_enriched(enriched: &EnrichedArticle, template: &ItemTemplate) -> Self {
        let a = &enriched.article;
        let mut fields = vec![
            field("Title", &a.title),
            field("Author", &a.author),
            field("Description", &a.description),
            field("Url", &external_link(&a.url)),
        ];
        for (stage, name) in [
            (Stage::Authenticity, "Authenticity"),
            (Stage::Sentiment, "Sentiment"),
            (Stage::Category, "Category"),
        ] {
            let (label, score) = match enriched.classification(stage) {
                Some(c) => (c.label.clone(), format!("{:.2}", c.score)),
                None => (String::new(), String::new()),
            };
            fields.push(field(name, &label));
            fields.push(field(&format!("{} Score", name), &score));
        }
        fields.push(field(
            "PublishedAt",
            &a.published_at.format(PUBLISH_DATE_FORMAT).to_string(),
        ));

        Self {
            name: enriched.id().to_string(),
            template_id: template.template_id.clone(),
            parent: template.parent_id.clone(),
            language: template.language.clone(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

fn field(name: &str, value: &str) -> Field {
    Field {
        name: name.to_string(),
        value: value.to_string(),
    }
}

/// General Link field markup for an external URL.
pub fn external_link(url: &str) -> String {
    format!(
        "<link text='' linktype='external' url='{}' target='_blank' />",
        escape_attr(url)
    )
}

fn escape_attr(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
