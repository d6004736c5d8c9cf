//! Callback-driven flows: help navigation, language switching, the manage
//! dashboard, and trigger deletion.

mod common;

use common::{callback_update, fixture, text_update};
use parrot::storage::json::new_trigger;
use parrot::storage::{ResponseKind, Storage};

const CHANNEL: i64 = -1001000;
const USER: i64 = 7;
const CHAT: i64 = 7;

fn seed_triggers(fx: &common::Fixture, n: usize) -> Vec<i64> {
    (0..n)
        .map(|i| {
            fx.store
                .upsert_trigger(new_trigger(
                    CHANNEL,
                    &format!("trigger {i}"),
                    ResponseKind::Text,
                    "reply".into(),
                    None,
                ))
                .unwrap()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Help and language
// ---------------------------------------------------------------------------

#[tokio::test]
async fn help_topic_and_back_navigation() {
    let fx = fixture();

    fx.bot
        .handle_update(callback_update(CHAT, USER, "help_register"))
        .await
        .unwrap();
    let edit = fx.api.last_edit();
    assert!(edit.text.contains("Registering a channel"));
    let back = &edit.reply_markup.unwrap().inline_keyboard[0][0];
    assert_eq!(back.callback_data.as_deref(), Some("help_main"));

    fx.bot
        .handle_update(callback_update(CHAT, USER, "help_main"))
        .await
        .unwrap();
    // Main menu: three rows of two topics.
    let menu = fx.api.last_edit().reply_markup.unwrap().inline_keyboard;
    assert_eq!(menu.len(), 3);
    assert!(menu.iter().all(|row| row.len() == 2));
}

#[tokio::test]
async fn set_language_persists_and_confirms_in_new_language() {
    let fx = fixture();

    fx.bot
        .handle_update(callback_update(CHAT, USER, "lang_ru"))
        .await
        .unwrap();

    assert_eq!(fx.store.get_user_language(USER).unwrap().as_deref(), Some("ru"));

    // The confirmation is an alert, in Russian.
    let answers = fx.api.answered.lock().unwrap();
    let alert = answers.last().unwrap();
    assert!(alert.show_alert);
    assert!(alert.text.as_deref().unwrap().contains("Язык"));
    drop(answers);

    // Subsequent interactions speak Russian too.
    fx.bot.handle_update(text_update(CHAT, USER, "/cancel")).await.unwrap();
    assert!(fx.api.last_sent().text.contains("Нечего отменять"));
}

#[tokio::test]
async fn malformed_payload_is_acknowledged_and_ignored() {
    let fx = fixture();

    fx.bot
        .handle_update(callback_update(CHAT, USER, "del_prompt_x_ch_y_pg_z"))
        .await
        .unwrap();

    assert_eq!(fx.api.answered.lock().unwrap().len(), 1);
    assert!(fx.api.edited.lock().unwrap().is_empty());
    assert!(fx.api.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn learn_type_without_session_reports_expiry() {
    let fx = fixture();

    fx.bot
        .handle_update(callback_update(CHAT, USER, "learn_type_text"))
        .await
        .unwrap();

    assert!(fx.api.last_edit().text.contains("expired"));
}

// ---------------------------------------------------------------------------
// Placeholder help detour
// ---------------------------------------------------------------------------

async fn learn_up_to_awaiting_text(fx: &common::Fixture) {
    fx.store.register_channel(CHANNEL, "My News", USER).unwrap();
    fx.api.set_admins(CHANNEL, &[USER]);

    fx.bot.handle_update(text_update(CHAT, USER, "/learn")).await.unwrap();
    fx.bot
        .handle_update(callback_update(CHAT, USER, &format!("learn_channel_{CHANNEL}")))
        .await
        .unwrap();
    fx.bot.handle_update(text_update(CHAT, USER, "hours")).await.unwrap();
    fx.bot
        .handle_update(callback_update(CHAT, USER, "learn_type_text"))
        .await
        .unwrap();
}

#[tokio::test]
async fn placeholder_help_back_restores_text_prompt() {
    let fx = fixture();
    learn_up_to_awaiting_text(&fx).await;

    fx.bot
        .handle_update(callback_update(CHAT, USER, "show_placeholder_help"))
        .await
        .unwrap();
    let help = fx.api.last_edit();
    assert!(help.text.contains("user_first_name"));
    assert_eq!(
        help.reply_markup.unwrap().inline_keyboard[0][0].callback_data.as_deref(),
        Some("back_to_response_prompt")
    );

    fx.bot
        .handle_update(callback_update(CHAT, USER, "back_to_response_prompt"))
        .await
        .unwrap();
    let prompt = fx.api.last_edit();
    assert!(prompt.text.contains("reply text"));
    assert_eq!(
        prompt.reply_markup.unwrap().inline_keyboard[0][0].callback_data.as_deref(),
        Some("show_placeholder_help")
    );

    // The session is intact: the next text completes the wizard.
    fx.bot
        .handle_update(text_update(CHAT, USER, "we open at 9"))
        .await
        .unwrap();
    assert!(fx.store.get_trigger(CHANNEL, "hours").unwrap().is_some());
}

#[tokio::test]
async fn placeholder_back_after_cancel_reports_expiry() {
    let fx = fixture();
    learn_up_to_awaiting_text(&fx).await;

    fx.bot.handle_update(text_update(CHAT, USER, "/cancel")).await.unwrap();
    fx.bot
        .handle_update(callback_update(CHAT, USER, "back_to_response_prompt"))
        .await
        .unwrap();
    assert!(fx.api.last_edit().text.contains("expired"));

    // No session was recreated behind the user's back.
    fx.bot.handle_update(text_update(CHAT, USER, "stray")).await.unwrap();
    assert!(fx.store.list_triggers(CHANNEL).unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Manage dashboard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn manage_command_lists_admin_channels_from_cache() {
    let fx = fixture();
    let other: i64 = -1002000;
    fx.store.register_channel(CHANNEL, "My News", USER).unwrap();
    fx.store.register_channel(other, "Other", 999).unwrap();
    fx.api.set_admins(CHANNEL, &[USER]);
    fx.api.set_admins(other, &[999]);

    fx.bot.handle_update(text_update(CHAT, USER, "/manage")).await.unwrap();

    // Only the channel the user administers, opening on page 1.
    let keyboard = fx.api.last_sent().reply_markup.expect("channel keyboard").inline_keyboard;
    assert_eq!(keyboard.len(), 1);
    assert_eq!(keyboard[0][0].text, "My News");
    assert_eq!(
        keyboard[0][0].callback_data.as_deref(),
        Some(format!("manage_ch_{CHANNEL}_page_1").as_str())
    );

    // A second /manage inside the TTL is served from the cache: no further
    // admin lookups hit the platform.
    let lookups_after_first = fx.api.admin_calls.lock().unwrap().len();
    fx.bot.handle_update(text_update(CHAT, USER, "/manage")).await.unwrap();
    assert_eq!(fx.api.admin_calls.lock().unwrap().len(), lookups_after_first);
}

#[tokio::test]
async fn manage_pages_through_triggers() {
    let fx = fixture();
    fx.api.add_chat(CHANNEL, "My News");
    seed_triggers(&fx, 12);

    fx.bot
        .handle_update(callback_update(CHAT, USER, &format!("manage_ch_{CHANNEL}_page_2")))
        .await
        .unwrap();

    let edit = fx.api.last_edit();
    assert!(edit.text.contains("page 2/3"));
    let keyboard = edit.reply_markup.unwrap().inline_keyboard;
    // 5 triggers + nav + back-to-menu.
    assert_eq!(keyboard.len(), 7);
}

#[tokio::test]
async fn manage_out_of_range_page_clamps_to_first() {
    let fx = fixture();
    fx.api.add_chat(CHANNEL, "My News");
    seed_triggers(&fx, 12);

    fx.bot
        .handle_update(callback_update(CHAT, USER, &format!("manage_ch_{CHANNEL}_page_99")))
        .await
        .unwrap();

    assert!(fx.api.last_edit().text.contains("page 1/3"));
}

// ---------------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_prompt_then_confirm_removes_trigger() {
    let fx = fixture();
    fx.api.add_chat(CHANNEL, "My News");
    let ids = seed_triggers(&fx, 3);
    let victim = ids[1];

    fx.bot
        .handle_update(callback_update(
            CHAT,
            USER,
            &format!("del_prompt_{victim}_ch_{CHANNEL}_pg_1"),
        ))
        .await
        .unwrap();
    let prompt = fx.api.last_edit();
    assert!(prompt.text.contains("trigger 1"));
    let row = &prompt.reply_markup.unwrap().inline_keyboard[0];
    assert_eq!(
        row[0].callback_data.as_deref(),
        Some(format!("del_confirm_{victim}_ch_{CHANNEL}_pg_1").as_str())
    );
    // Cancelling goes back to the same dashboard page.
    assert_eq!(
        row[1].callback_data.as_deref(),
        Some(format!("manage_ch_{CHANNEL}_page_1").as_str())
    );

    fx.bot
        .handle_update(callback_update(
            CHAT,
            USER,
            &format!("del_confirm_{victim}_ch_{CHANNEL}_pg_1"),
        ))
        .await
        .unwrap();

    assert!(fx.store.get_trigger_by_id(victim).unwrap().is_none());
    assert_eq!(fx.store.list_triggers(CHANNEL).unwrap().len(), 2);

    // Deletion is announced as an alert and the dashboard re-renders.
    let answers = fx.api.answered.lock().unwrap();
    assert!(answers.last().unwrap().show_alert);
    drop(answers);
    assert!(fx.api.last_edit().text.contains("page 1/1"));
}

#[tokio::test]
async fn delete_confirm_twice_is_idempotent() {
    let fx = fixture();
    fx.api.add_chat(CHANNEL, "My News");
    let ids = seed_triggers(&fx, 2);
    let victim = ids[0];
    let payload = format!("del_confirm_{victim}_ch_{CHANNEL}_pg_1");

    fx.bot.handle_update(callback_update(CHAT, USER, &payload)).await.unwrap();
    // A duplicate press (retransmitted or raced) must not error and still
    // lands on a fresh dashboard.
    fx.bot.handle_update(callback_update(CHAT, USER, &payload)).await.unwrap();

    assert_eq!(fx.store.list_triggers(CHANNEL).unwrap().len(), 1);
    let answers = fx.api.answered.lock().unwrap();
    assert_eq!(answers.len(), 2);
    // Second press has nothing to announce.
    assert!(!answers.last().unwrap().show_alert);
    drop(answers);
    assert!(fx.api.last_edit().text.contains("My News"));
}

#[tokio::test]
async fn delete_prompt_for_missing_trigger_is_a_no_op() {
    let fx = fixture();
    fx.api.add_chat(CHANNEL, "My News");
    seed_triggers(&fx, 1);

    fx.bot
        .handle_update(callback_update(CHAT, USER, &format!("del_prompt_999_ch_{CHANNEL}_pg_1")))
        .await
        .unwrap();

    assert!(fx.api.edited.lock().unwrap().is_empty());
    assert_eq!(fx.store.list_triggers(CHANNEL).unwrap().len(), 1);
}
