//! Callback payload decoding.
//!
//! Every inline button carries an opaque string payload. All parsing happens
//! here, up front, into one exhaustive enum; the router switches on the
//! variant and never splits strings itself. Payloads reference triggers by
//! numeric id only — trigger text never travels inside a payload, so a
//! trigger containing the `_` delimiter can't corrupt the encoding.

use crate::storage::ResponseKind;

/// Static help-tree leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Register,
    Learn,
    Manage,
    Formatting,
    Lang,
    Cancel,
}

impl HelpTopic {
    /// The catalog key holding this topic's detail text.
    pub fn text_key(self) -> &'static str {
        match self {
            HelpTopic::Register => "help_register_text",
            HelpTopic::Learn => "help_learn_text",
            HelpTopic::Manage => "help_manage_text",
            HelpTopic::Formatting => "help_formatting_text",
            HelpTopic::Lang => "help_lang_text",
            HelpTopic::Cancel => "help_cancel_text",
        }
    }
}

/// A decoded button press.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackAction {
    /// Inert display button: acknowledge, change nothing.
    Noop,
    HelpMain,
    HelpTopic(HelpTopic),
    LangPrompt,
    SetLang(String),
    /// Channel picked in the learn wizard.
    LearnChannel(i64),
    /// Response kind picked in the learn wizard.
    LearnType(ResponseKind),
    ManagePage {
        channel_id: i64,
        page: usize,
    },
    DeletePrompt {
        trigger_id: i64,
        channel_id: i64,
        page: usize,
    },
    DeleteConfirm {
        trigger_id: i64,
        channel_id: i64,
        page: usize,
    },
    PlaceholderHelp,
    BackToResponsePrompt,
}

impl CallbackAction {
    /// Decode a raw payload. `None` means malformed or unknown — the caller
    /// acknowledges the callback and does nothing else.
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "noop" => return Some(CallbackAction::Noop),
            "help_main" => return Some(CallbackAction::HelpMain),
            "help_register" => return Some(CallbackAction::HelpTopic(HelpTopic::Register)),
            "help_learn" => return Some(CallbackAction::HelpTopic(HelpTopic::Learn)),
            "help_manage" => return Some(CallbackAction::HelpTopic(HelpTopic::Manage)),
            "help_formatting" => return Some(CallbackAction::HelpTopic(HelpTopic::Formatting)),
            "help_lang" => return Some(CallbackAction::HelpTopic(HelpTopic::Lang)),
            "help_cancel" => return Some(CallbackAction::HelpTopic(HelpTopic::Cancel)),
            "lang_prompt" => return Some(CallbackAction::LangPrompt),
            "show_placeholder_help" => return Some(CallbackAction::PlaceholderHelp),
            "back_to_response_prompt" => return Some(CallbackAction::BackToResponsePrompt),
            _ => {}
        }

        if let Some(code) = data.strip_prefix("lang_") {
            if !code.is_empty() {
                return Some(CallbackAction::SetLang(code.to_owned()));
            }
        }
        if let Some(rest) = data.strip_prefix("learn_channel_") {
            return rest.parse().ok().map(CallbackAction::LearnChannel);
        }
        if let Some(rest) = data.strip_prefix("learn_type_") {
            return ResponseKind::parse(rest).map(CallbackAction::LearnType);
        }
        if let Some(rest) = data.strip_prefix("manage_ch_") {
            let (channel_id, page) = parse_id_pair(rest, "_page_")?;
            return Some(CallbackAction::ManagePage { channel_id, page });
        }
        if let Some(rest) = data.strip_prefix("del_prompt_") {
            let (trigger_id, channel_id, page) = parse_delete(rest)?;
            return Some(CallbackAction::DeletePrompt {
                trigger_id,
                channel_id,
                page,
            });
        }
        if let Some(rest) = data.strip_prefix("del_confirm_") {
            let (trigger_id, channel_id, page) = parse_delete(rest)?;
            return Some(CallbackAction::DeleteConfirm {
                trigger_id,
                channel_id,
                page,
            });
        }

        None
    }
}

/// Encode side — keeps every payload format next to its decoder.
pub fn manage_page(channel_id: i64, page: usize) -> String {
    format!("manage_ch_{channel_id}_page_{page}")
}

pub fn learn_channel(channel_id: i64) -> String {
    format!("learn_channel_{channel_id}")
}

pub fn learn_type(kind: ResponseKind) -> String {
    format!("learn_type_{kind}")
}

pub fn del_prompt(trigger_id: i64, channel_id: i64, page: usize) -> String {
    format!("del_prompt_{trigger_id}_ch_{channel_id}_pg_{page}")
}

pub fn del_confirm(trigger_id: i64, channel_id: i64, page: usize) -> String {
    format!("del_confirm_{trigger_id}_ch_{channel_id}_pg_{page}")
}

/// `<a><sep><b>` where both halves are integers.
fn parse_id_pair(s: &str, sep: &str) -> Option<(i64, usize)> {
    let (a, b) = s.split_once(sep)?;
    Some((a.parse().ok()?, b.parse().ok()?))
}

/// `<trigger_id>_ch_<channel_id>_pg_<page>`.
fn parse_delete(s: &str) -> Option<(i64, i64, usize)> {
    let (trigger_id, rest) = s.split_once("_ch_")?;
    let (channel_id, page) = rest.split_once("_pg_")?;
    Some((trigger_id.parse().ok()?, channel_id.parse().ok()?, page.parse().ok()?))
}
