use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "set up your caption style.")]
    Start,

    #[command(description = "show your settings.")]
    Settings,

    #[command(description = "list your saved captions.")]
    Favorites,

    #[command(description = "show today's usage.")]
    Quota,

    #[command(description = "display this text.")]
    Help,
}
