//! Outbound Slack structures: legacy message attachments and dialogs.
//!
//! Everything here is pure data. Builders never touch the network; the send
//! boundary decides whether a payload is posted, replaces the original
//! message, or opens a dialog.

use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Slack refuses dialogs with more elements than this.
pub const MAX_DIALOG_ELEMENTS: usize = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("dialog title must not be empty")]
    EmptyTitle,
    #[error("dialog callback id must not be empty")]
    EmptyCallbackId,
    #[error("dialog field `{name}` is declared more than once")]
    DuplicateField { name: String },
    #[error("dialog has {count} elements; at most {MAX_DIALOG_ELEMENTS} are allowed")]
    TooManyElements { count: usize },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl ReplyPayload {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), attachments: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.text.as_deref().map_or(true, str::is_empty) && self.attachments.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pretext: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default = "default_attachment_type")]
    pub attachment_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionSpec>,
}

fn default_attachment_type() -> String {
    "default".to_owned()
}

impl Default for Attachment {
    fn default() -> Self {
        Self {
            title: None,
            text: None,
            pretext: None,
            fallback: None,
            callback_id: None,
            color: None,
            attachment_type: default_attachment_type(),
            actions: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Button,
    Select,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStyle {
    Default,
    Primary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    #[serde(rename = "text")]
    pub label: String,
    pub value: String,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self { label: label.into(), value: value.into() }
    }
}

/// Popup shown by Slack before a button's action is delivered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub title: String,
    pub text: String,
    #[serde(rename = "ok_text")]
    pub ok_label: String,
    #[serde(rename = "dismiss_text")]
    pub dismiss_label: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub name: String,
    #[serde(rename = "text")]
    pub label: String,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<ActionStyle>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm: Option<Confirmation>,
}

impl ActionSpec {
    /// A button whose value defaults to its name.
    pub fn button(name: impl Into<String>, label: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            value: name.clone(),
            name,
            label: label.into(),
            kind: ActionKind::Button,
            style: None,
            options: Vec::new(),
            confirm: None,
        }
    }

    pub fn select(
        name: impl Into<String>,
        label: impl Into<String>,
        options: Vec<SelectOption>,
    ) -> Self {
        let name = name.into();
        Self {
            value: name.clone(),
            name,
            label: label.into(),
            kind: ActionKind::Select,
            style: None,
            options,
            confirm: None,
        }
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn style(mut self, style: ActionStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn confirm(mut self, confirmation: Confirmation) -> Self {
        self.confirm = Some(confirmation);
        self
    }
}

pub struct MessageBuilder {
    text: Option<String>,
    attachments: Vec<Attachment>,
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self { text: None, attachments: Vec::new() }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn attachment<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut AttachmentBuilder),
    {
        let mut builder = AttachmentBuilder::default();
        build(&mut builder);
        self.attachments.push(builder.build());
        self
    }

    pub fn build(self) -> ReplyPayload {
        ReplyPayload { text: self.text, attachments: self.attachments }
    }
}

#[derive(Default)]
pub struct AttachmentBuilder {
    attachment: Attachment,
}

impl AttachmentBuilder {
    pub fn title(&mut self, title: impl Into<String>) -> &mut Self {
        self.attachment.title = Some(title.into());
        self
    }

    pub fn text(&mut self, text: impl Into<String>) -> &mut Self {
        self.attachment.text = Some(text.into());
        self
    }

    pub fn pretext(&mut self, pretext: impl Into<String>) -> &mut Self {
        self.attachment.pretext = Some(pretext.into());
        self
    }

    pub fn fallback(&mut self, fallback: impl Into<String>) -> &mut Self {
        self.attachment.fallback = Some(fallback.into());
        self
    }

    pub fn callback_id(&mut self, callback_id: impl Into<String>) -> &mut Self {
        self.attachment.callback_id = Some(callback_id.into());
        self
    }

    pub fn color(&mut self, color: impl Into<String>) -> &mut Self {
        self.attachment.color = Some(color.into());
        self
    }

    pub fn action(&mut self, action: ActionSpec) -> &mut Self {
        self.attachment.actions.push(action);
        self
    }

    fn build(self) -> Attachment {
        self.attachment
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataSource {
    Static(Vec<SelectOption>),
    Users,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Email,
    Number { min_length: Option<u16>, max_length: Option<u16> },
    Select { data_source: DataSource },
    Textarea { max_length: Option<u16> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub label: String,
    pub name: String,
    pub kind: FieldKind,
    pub placeholder: Option<String>,
    pub hint: Option<String>,
    pub optional: bool,
}

impl FieldSpec {
    fn new(label: impl Into<String>, name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            label: label.into(),
            name: name.into(),
            kind,
            placeholder: None,
            hint: None,
            optional: false,
        }
    }

    pub fn text(label: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(label, name, FieldKind::Text)
    }

    pub fn email(label: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(label, name, FieldKind::Email)
    }

    pub fn number(label: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(label, name, FieldKind::Number { min_length: None, max_length: None })
    }

    pub fn select(
        label: impl Into<String>,
        name: impl Into<String>,
        data_source: DataSource,
    ) -> Self {
        Self::new(label, name, FieldKind::Select { data_source })
    }

    pub fn textarea(label: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(label, name, FieldKind::Textarea { max_length: None })
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Applies to number and textarea fields; ignored elsewhere.
    pub fn length(mut self, min: Option<u16>, max: Option<u16>) -> Self {
        match &mut self.kind {
            FieldKind::Number { min_length, max_length } => {
                *min_length = min;
                *max_length = max;
            }
            FieldKind::Textarea { max_length } => *max_length = max,
            FieldKind::Text | FieldKind::Email | FieldKind::Select { .. } => {}
        }
        self
    }
}

#[derive(Serialize)]
struct DialogOptionWire<'a> {
    label: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct DialogElementWire<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    subtype: Option<&'static str>,
    label: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    placeholder: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'a str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    optional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_length: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_length: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_source: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    options: Vec<DialogOptionWire<'a>>,
}

impl Serialize for FieldSpec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut wire = DialogElementWire {
            kind: "text",
            subtype: None,
            label: &self.label,
            name: &self.name,
            placeholder: self.placeholder.as_deref(),
            hint: self.hint.as_deref(),
            optional: self.optional,
            min_length: None,
            max_length: None,
            data_source: None,
            options: Vec::new(),
        };

        match &self.kind {
            FieldKind::Text => {}
            FieldKind::Email => wire.subtype = Some("email"),
            FieldKind::Number { min_length, max_length } => {
                wire.subtype = Some("number");
                wire.min_length = *min_length;
                wire.max_length = *max_length;
            }
            FieldKind::Select { data_source } => {
                wire.kind = "select";
                match data_source {
                    DataSource::Users => wire.data_source = Some("users"),
                    DataSource::Static(options) => {
                        wire.data_source = Some("static");
                        wire.options = options
                            .iter()
                            .map(|option| DialogOptionWire {
                                label: &option.label,
                                value: &option.value,
                            })
                            .collect();
                    }
                }
            }
            FieldKind::Textarea { max_length } => {
                wire.kind = "textarea";
                wire.max_length = *max_length;
            }
        }

        wire.serialize(serializer)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DialogSpec {
    title: String,
    callback_id: String,
    submit_label: String,
    #[serde(rename = "elements")]
    fields: Vec<FieldSpec>,
}

impl DialogSpec {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn callback_id(&self) -> &str {
        &self.callback_id
    }

    pub fn submit_label(&self) -> &str {
        &self.submit_label
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }
}

/// Persistent accumulator: every `with_field` call leaves `self` untouched and
/// returns an extended copy, so a partially built dialog can be shared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DialogBuilder {
    title: String,
    callback_id: String,
    submit_label: String,
    fields: Vec<FieldSpec>,
}

impl DialogBuilder {
    pub fn new(
        title: impl Into<String>,
        callback_id: impl Into<String>,
        submit_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            callback_id: callback_id.into(),
            submit_label: submit_label.into(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_field(&self, field: FieldSpec) -> Self {
        let mut next = self.clone();
        next.fields.push(field);
        next
    }

    #[must_use]
    pub fn with_fields(&self, fields: impl IntoIterator<Item = FieldSpec>) -> Self {
        let mut next = self.clone();
        next.fields.extend(fields);
        next
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn build(&self) -> Result<DialogSpec, PayloadError> {
        if self.title.trim().is_empty() {
            return Err(PayloadError::EmptyTitle);
        }
        if self.callback_id.trim().is_empty() {
            return Err(PayloadError::EmptyCallbackId);
        }
        if self.fields.len() > MAX_DIALOG_ELEMENTS {
            return Err(PayloadError::TooManyElements { count: self.fields.len() });
        }

        let mut seen = std::collections::HashSet::with_capacity(self.fields.len());
        if let Some(duplicate) = self.fields.iter().find(|field| !seen.insert(field.name.as_str()))
        {
            return Err(PayloadError::DuplicateField { name: duplicate.name.clone() });
        }

        Ok(DialogSpec {
            title: self.title.clone(),
            callback_id: self.callback_id.clone(),
            submit_label: self.submit_label.clone(),
            fields: self.fields.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        ActionSpec, ActionStyle, Confirmation, DataSource, DialogBuilder, FieldSpec,
        MessageBuilder, PayloadError, ReplyPayload, SelectOption,
    };

    #[test]
    fn message_builder_serializes_legacy_attachment_wire_names() {
        let payload = MessageBuilder::new()
            .text("hello")
            .attachment(|attachment| {
                attachment.title("Pick one").callback_id("123").action(
                    ActionSpec::button("no", "NAW!").value("delete").style(ActionStyle::Danger).confirm(
                        Confirmation {
                            title: "Are you sure?".to_owned(),
                            text: "This will do something!".to_owned(),
                            ok_label: "Yes".to_owned(),
                            dismiss_label: "No".to_owned(),
                        },
                    ),
                );
            })
            .build();

        let json = serde_json::to_value(&payload).expect("serialize");
        let action = &json["attachments"][0]["actions"][0];

        assert_eq!(json["text"], "hello");
        assert_eq!(json["attachments"][0]["attachment_type"], "default");
        assert_eq!(action["text"], "NAW!");
        assert_eq!(action["type"], "button");
        assert_eq!(action["style"], "danger");
        assert_eq!(action["value"], "delete");
        assert_eq!(action["confirm"]["ok_text"], "Yes");
        assert_eq!(action["confirm"]["dismiss_text"], "No");
    }

    #[test]
    fn select_menu_options_use_text_value_pairs() {
        let action = ActionSpec::select("form", "Form", vec![SelectOption::new("One", "001")]);
        let json = serde_json::to_value(&action).expect("serialize");

        assert_eq!(json["type"], "select");
        assert_eq!(json["options"], json!([{ "text": "One", "value": "001" }]));
    }

    #[test]
    fn empty_payload_detection() {
        assert!(ReplyPayload::empty().is_empty());
        assert!(ReplyPayload::text("").is_empty());
        assert!(!ReplyPayload::text("hi").is_empty());
        assert_eq!(serde_json::to_value(ReplyPayload::empty()).expect("serialize"), json!({}));
    }

    #[test]
    fn dialog_builder_is_persistent() {
        let base = DialogBuilder::new("Card", "dialog", "Submit");
        let extended = base.with_field(FieldSpec::text("Name", "name"));

        assert_eq!(base.field_count(), 0);
        assert_eq!(extended.field_count(), 1);
    }

    #[test]
    fn dialog_builder_rejects_duplicate_names() {
        let result = DialogBuilder::new("Card", "dialog", "Submit")
            .with_field(FieldSpec::text("Name", "name"))
            .with_field(FieldSpec::email("Also name", "name"))
            .build();

        assert_eq!(result, Err(PayloadError::DuplicateField { name: "name".to_owned() }));
    }

    #[test]
    fn dialog_builder_rejects_empty_title_and_oversized_forms() {
        let empty = DialogBuilder::new("  ", "dialog", "Submit").build();
        assert_eq!(empty, Err(PayloadError::EmptyTitle));

        let oversized = DialogBuilder::new("Card", "dialog", "Submit")
            .with_fields((0..11).map(|index| FieldSpec::text("Field", format!("f{index}"))))
            .build();
        assert_eq!(oversized, Err(PayloadError::TooManyElements { count: 11 }));
    }

    #[test]
    fn dialog_elements_serialize_with_slack_subtypes() {
        let dialog = DialogBuilder::new("Card", "dialog", "Submit")
            .with_field(FieldSpec::email("Email", "email").placeholder("xxx@berkeley.edu"))
            .with_field(
                FieldSpec::number("Number", "num").length(Some(10), Some(12)).optional(),
            )
            .with_field(FieldSpec::select("Person", "person", DataSource::Users).optional())
            .with_field(
                FieldSpec::textarea("Pitch", "pitch").length(None, Some(800)).hint("be fun"),
            )
            .build()
            .expect("valid dialog");

        let json = serde_json::to_value(&dialog).expect("serialize");
        let elements = &json["elements"];

        assert_eq!(json["submit_label"], "Submit");
        assert_eq!(elements[0]["type"], "text");
        assert_eq!(elements[0]["subtype"], "email");
        assert_eq!(elements[1]["subtype"], "number");
        assert_eq!(elements[1]["min_length"], 10);
        assert_eq!(elements[1]["optional"], true);
        assert_eq!(elements[2]["type"], "select");
        assert_eq!(elements[2]["data_source"], "users");
        assert_eq!(elements[3]["type"], "textarea");
        assert_eq!(elements[3]["max_length"], 800);
        assert!(elements[0].get("optional").is_none());
    }
}
