//! Trigger management dashboard — pure rendering of a paged trigger list
//! into text plus an inline keyboard.

use super::callback;
use crate::i18n::Catalog;
use crate::storage::TriggerRecord;
use crate::telegram::{InlineButton, Keyboard};

pub const PAGE_SIZE: usize = 5;

/// Longest trigger label shown on a button before truncation.
const MAX_LABEL_CHARS: usize = 20;

pub struct Dashboard {
    pub text: String,
    pub keyboard: Keyboard,
    /// The page actually rendered, after clamping.
    pub page: usize,
}

/// Render one page of a channel's triggers.
///
/// An out-of-range `page` (including 0) clamps back to page 1. One row per
/// trigger (label + delete button), then prev/next where applicable, then a
/// back-to-menu row.
pub fn build(
    catalog: &Catalog,
    lang: &str,
    channel_id: i64,
    channel_title: &str,
    triggers: &[TriggerRecord],
    page: usize,
) -> Dashboard {
    let total_pages = triggers.len().div_ceil(PAGE_SIZE).max(1);
    // Clamp before any index arithmetic: `page` comes from callback data,
    // which any client can forge up to usize::MAX.
    let page = if page == 0 || page > total_pages { 1 } else { page };

    let start = (page - 1) * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(triggers.len());
    let window = &triggers[start..end];

    let mut text = catalog.render(
        lang,
        "manage_title",
        &[
            ("channel_title", channel_title),
            ("current_page", &page.to_string()),
            ("total_pages", &total_pages.to_string()),
        ],
    );
    text.push_str("\n\n");
    if window.is_empty() {
        text.push_str(&catalog.render(lang, "manage_empty", &[]));
    }

    let mut keyboard: Keyboard = window
        .iter()
        .map(|trigger| {
            vec![
                InlineButton::callback(truncate_label(&trigger.trigger_text), "noop"),
                InlineButton::callback(
                    catalog.render(lang, "delete_button", &[]),
                    callback::del_prompt(trigger.id, channel_id, page),
                ),
            ]
        })
        .collect();

    let mut nav = Vec::new();
    if page > 1 {
        nav.push(InlineButton::callback(
            catalog.render(lang, "prev_button", &[]),
            callback::manage_page(channel_id, page - 1),
        ));
    }
    if page < total_pages {
        nav.push(InlineButton::callback(
            catalog.render(lang, "next_button", &[]),
            callback::manage_page(channel_id, page + 1),
        ));
    }
    if !nav.is_empty() {
        keyboard.push(nav);
    }

    keyboard.push(vec![InlineButton::callback(
        catalog.render(lang, "back_to_main_menu_button", &[]),
        "help_main",
    )]);

    Dashboard {
        text,
        keyboard,
        page,
    }
}

/// Truncate a trigger label to a fixed width with an ellipsis marker.
fn truncate_label(text: &str) -> String {
    if text.chars().count() <= MAX_LABEL_CHARS {
        return text.to_owned();
    }
    let head: String = text.chars().take(MAX_LABEL_CHARS - 3).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ResponseKind;
    use std::collections::HashMap;

    fn catalog() -> Catalog {
        let mut en = HashMap::new();
        for (key, value) in [
            ("manage_title", "{{channel_title}} — page {{current_page}}/{{total_pages}}"),
            ("manage_empty", "No triggers yet."),
            ("delete_button", "Delete"),
            ("prev_button", "Prev"),
            ("next_button", "Next"),
            ("back_to_main_menu_button", "Menu"),
        ] {
            en.insert(key.to_owned(), value.to_owned());
        }
        let mut tables = HashMap::new();
        tables.insert("en".to_owned(), en);
        Catalog::from_tables("en", tables)
    }

    fn triggers(n: usize) -> Vec<TriggerRecord> {
        (0..n)
            .map(|i| TriggerRecord {
                id: i as i64 + 1,
                channel_id: -100,
                trigger_text: format!("trigger-{i}"),
                response_type: ResponseKind::Text,
                response_text: "hi".into(),
                response_file_id: None,
            })
            .collect()
    }

    #[test]
    fn test_out_of_range_page_clamps_to_one() {
        let dash = build(&catalog(), "en", -100, "News", &triggers(12), 99);
        assert_eq!(dash.page, 1);
        assert!(dash.text.contains("page 1/3"));
    }

    #[test]
    fn test_page_zero_clamps_to_one() {
        let dash = build(&catalog(), "en", -100, "News", &triggers(3), 0);
        assert_eq!(dash.page, 1);
    }

    #[test]
    fn test_forged_huge_page_clamps_to_one() {
        // Page numbers arrive in callback payloads, so any usize can show up.
        let dash = build(&catalog(), "en", -100, "News", &triggers(12), usize::MAX);
        assert_eq!(dash.page, 1);
        assert!(dash.text.contains("page 1/3"));

        let dash = build(&catalog(), "en", -100, "News", &[], usize::MAX);
        assert_eq!(dash.page, 1);
    }

    #[test]
    fn test_middle_page_has_both_nav_buttons() {
        let dash = build(&catalog(), "en", -100, "News", &triggers(12), 2);
        // 5 trigger rows + nav row + menu row.
        assert_eq!(dash.keyboard.len(), 7);

        let nav = &dash.keyboard[5];
        assert_eq!(nav.len(), 2);
        assert_eq!(nav[0].callback_data.as_deref(), Some("manage_ch_-100_page_1"));
        assert_eq!(nav[1].callback_data.as_deref(), Some("manage_ch_-100_page_3"));
    }

    #[test]
    fn test_first_page_has_only_next() {
        let dash = build(&catalog(), "en", -100, "News", &triggers(12), 1);
        let nav = &dash.keyboard[5];
        assert_eq!(nav.len(), 1);
        assert_eq!(nav[0].text, "Next");
    }

    #[test]
    fn test_last_page_has_only_prev_and_partial_window() {
        let dash = build(&catalog(), "en", -100, "News", &triggers(12), 3);
        // 2 triggers on the last page + nav + menu.
        assert_eq!(dash.keyboard.len(), 4);
        let nav = &dash.keyboard[2];
        assert_eq!(nav.len(), 1);
        assert_eq!(nav[0].text, "Prev");
    }

    #[test]
    fn test_single_page_has_no_nav_row() {
        let dash = build(&catalog(), "en", -100, "News", &triggers(4), 1);
        // 4 trigger rows + menu row only.
        assert_eq!(dash.keyboard.len(), 5);
        assert_eq!(dash.keyboard[4][0].callback_data.as_deref(), Some("help_main"));
    }

    #[test]
    fn test_empty_channel_renders_empty_notice() {
        let dash = build(&catalog(), "en", -100, "News", &[], 1);
        assert!(dash.text.contains("No triggers yet."));
        assert!(dash.text.contains("page 1/1"));
        assert_eq!(dash.keyboard.len(), 1);
    }

    #[test]
    fn test_long_labels_truncate_with_ellipsis() {
        let mut list = triggers(1);
        list[0].trigger_text = "a very long trigger phrase indeed".into();
        let dash = build(&catalog(), "en", -100, "News", &list, 1);

        let label = &dash.keyboard[0][0].text;
        assert_eq!(label.chars().count(), 20);
        assert!(label.ends_with("..."));
    }

    #[test]
    fn test_delete_buttons_carry_trigger_ids() {
        let dash = build(&catalog(), "en", -100, "News", &triggers(2), 1);
        assert_eq!(
            dash.keyboard[0][1].callback_data.as_deref(),
            Some("del_prompt_1_ch_-100_pg_1")
        );
        assert_eq!(
            dash.keyboard[1][1].callback_data.as_deref(),
            Some("del_prompt_2_ch_-100_pg_1")
        );
    }
}
