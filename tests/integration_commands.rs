use async_trait::async_trait;
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;
use teloxide::dptree;
use teloxide_tests::{MockBot, MockCallbackQuery, MockMessageText};
use vibecaption_bot::handlers::get_update_handler;
use vibecaption_bot::model::{GenerativeModel, ImageInput, ModelError};
use vibecaption_bot::quota::QuotaPolicy;
use vibecaption_bot::service::CaptionService;
use vibecaption_bot::store::SqliteStore;

// Command paths never reach the model.
struct UnreachableModel;

#[async_trait]
impl GenerativeModel for UnreachableModel {
    async fn complete(
        &self,
        _prompt: &str,
        _image: Option<ImageInput<'_>>,
        _max_output_tokens: u32,
    ) -> Result<String, ModelError> {
        Err(ModelError::Transport("not available in tests".into()))
    }
}

async fn service() -> Arc<CaptionService> {
    let store = SqliteStore::in_memory()
        .await
        .expect("in-memory store could not be created");
    Arc::new(CaptionService::new(
        Arc::new(store),
        Arc::new(UnreachableModel),
        QuotaPolicy::default(),
        Duration::from_secs(5),
    ))
}

async fn last_reply(text: &str) -> String {
    let mock = MockMessageText::new().text(text);
    let handler = get_update_handler();

    let mut bot = MockBot::new(mock, handler);
    bot.dependencies(dptree::deps![service().await]);

    bot.dispatch().await;

    let binding = bot.get_responses();
    let last = binding
        .sent_messages
        .last()
        .expect("At least 1 sent message was expected");
    last.text().unwrap_or_default().to_string()
}

#[tokio::test]
#[serial]
async fn help_command_integration() {
    let text = last_reply("/help").await;
    assert!(
        text.contains("Available commands") && text.contains("/favorites"),
        "Unexpected help text: {text}"
    );
}

#[tokio::test]
#[serial]
async fn start_command_opens_the_wizard() {
    let text = last_reply("/start").await;
    assert!(text.contains("Step 1/3"), "Unexpected start text: {text}");
}

#[tokio::test]
#[serial]
async fn plain_text_asks_for_a_photo() {
    let text = last_reply("hello there").await;
    assert!(text.contains("send me a photo") || text.contains("Send me a photo"), "Unexpected reply: {text}");
}

#[tokio::test]
#[serial]
async fn favorites_start_empty() {
    let text = last_reply("/favorites").await;
    assert!(text.starts_with("No favorites"), "Unexpected reply: {text}");
}

#[tokio::test]
#[serial]
async fn quota_reports_a_fresh_day() {
    let text = last_reply("/quota").await;
    assert!(text.contains("0 of 20 used, 20 left"), "Unexpected reply: {text}");
}

#[tokio::test]
#[serial]
async fn settings_show_defaults() {
    let text = last_reply("/settings").await;
    assert!(text.contains("Your settings") && text.contains("Super mode: off"), "Unexpected reply: {text}");
}

async fn settings_after(payload: &str) -> String {
    let handler = get_update_handler();
    let mut bot = MockBot::new(MockCallbackQuery::new().data(payload), handler);
    bot.dependencies(dptree::deps![service().await]);
    bot.dispatch().await;

    bot.update(MockMessageText::new().text("/settings"));
    bot.dispatch().await;

    let binding = bot.get_responses();
    binding
        .sent_messages
        .last()
        .and_then(|m| m.text())
        .unwrap_or_default()
        .to_string()
}

async fn callback_notice(payload: &str) -> Option<String> {
    let handler = get_update_handler();
    let mut bot = MockBot::new(MockCallbackQuery::new().data(payload), handler);
    bot.dependencies(dptree::deps![service().await]);
    bot.dispatch().await;

    let binding = bot.get_responses();
    let answered = binding
        .answered_callback_queries
        .last()
        .expect("The callback query was expected to be answered");
    answered.text.clone()
}

#[tokio::test]
#[serial]
async fn adult_button_alone_keeps_clean_mode() {
    let text = settings_after("mode:adult").await;
    assert!(text.contains("Mode: 😇 Clean"), "Unexpected settings: {text}");
}

#[tokio::test]
#[serial]
async fn adult_confirmation_switches_mode() {
    let text = settings_after("adult:yes").await;
    assert!(text.contains("Mode: 🔥 18+"), "Unexpected settings: {text}");
}

#[tokio::test]
#[serial]
async fn adult_button_asks_for_age() {
    let handler = get_update_handler();
    let mut bot = MockBot::new(MockCallbackQuery::new().data("mode:adult"), handler);
    bot.dependencies(dptree::deps![service().await]);
    bot.dispatch().await;

    let binding = bot.get_responses();
    let asked = binding
        .edited_messages_text
        .last()
        .map(|e| e.message.text().unwrap_or_default().to_string())
        .or_else(|| binding.sent_messages.last().and_then(|m| m.text()).map(str::to_string))
        .unwrap_or_default();
    assert!(asked.contains("Are you 18 or older?"), "Unexpected prompt: {asked}");
}

#[tokio::test]
#[serial]
async fn pick_from_unknown_batch_is_answered_softly() {
    let notice = callback_notice("pick:bogus:0").await.unwrap_or_default();
    assert!(notice.contains("outdated"), "Unexpected notice: {notice}");
}

#[tokio::test]
#[serial]
async fn undecodable_button_is_answered_softly() {
    let notice = callback_notice("teleport:mars").await.unwrap_or_default();
    assert!(notice.contains("This button is outdated"), "Unexpected notice: {notice}");
}
