//! Echo Bot Example
//!
//! Shows the main pieces of skiff:
//!
//! - commands with templates (`/echo %s`, `/dice {kind}`)
//! - a `#[handler]` function with a default parameter
//! - a two-step FSM conversation
//! - registered buttons, callbacks and a paginated list
//! - inline queries and polls
//! - a logging middleware and an operator error report
//!
//! # Usage
//!
//! ```bash
//! SKIFF_BOT__TOKEN=123456:ABC cargo run --package echo-bot
//! SKIFF_BOT__TOKEN=123456:ABC cargo run --package echo-bot -- --webhook
//! ```

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use skiff::framework::ChatErrorReporter;
use skiff::prelude::*;

#[derive(Parser, Debug)]
#[command(about = "A simple echo bot built on skiff")]
struct Args {
    /// Configuration file (defaults to ./skiff.toml when present).
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Receive updates through the webhook server instead of long polling.
    #[arg(long)]
    webhook: bool,

    /// Chat that receives error reports.
    #[arg(long)]
    operator: Option<i64>,
}

const FRUITS: &[&str] = &[
    "Apple", "Banana", "Cherry", "Date", "Elderberry", "Fig", "Grape", "Honeydew", "Kiwi",
    "Lemon", "Mango", "Nectarine", "Orange", "Papaya", "Quince",
];

// ============================================================================
// Handler Functions
// ============================================================================

/// `/roll` or `/roll 20`.
#[handler]
async fn roll(#[default(6)] sides: i64, bot: Bot) -> BotResult<String> {
    if sides < 2 {
        return Ok("A die needs at least two sides.".to_string());
    }
    let seed = bot.message_id().unwrap_or_default() * 7919 + bot.user_id().unwrap_or_default();
    Ok(format!("🎲 {} (d{sides})", seed.rem_euclid(sides) + 1))
}

async fn fruit_page(bot: Bot, page: i64) -> BotResult<()> {
    let mut pagination = bot.pagination();
    pagination
        .items(FRUITS.iter().map(|name| Button::cb(*name, format!("fruit_{name}"))))
        .mode(PaginationMode::Numbers)
        .layout(PaginationLayout::Smart)
        .return_btn("⬅ Back", "menu");
    pagination.per_page(4)?.columns(2)?.page(page)?;

    let text = format!(
        "Fruits, page {} of {}",
        pagination.current_page(),
        pagination.total_pages()
    );
    let mut message = bot.msg(text);
    message.inline_kbd(pagination.keyboard());
    if bot.context().is_callback() {
        message.edit_text().await?;
    } else {
        message.send().await?;
    }
    Ok(())
}

async fn message_info(bot: Bot, user: UserDto) -> String {
    let chat = bot.chat_id().map_or("-".to_string(), |id| id.to_string());
    format!(
        "📋 Message Info\n• From: {} ({})\n• Chat: {chat}\n• Message ID: {}",
        user.first_name,
        user.id,
        bot.message_id().unwrap_or_default()
    )
}

fn router(operator: Option<i64>) -> Router {
    let mut router = Router::new();

    router.middleware(|bot: Bot, next: Next| async move {
        info!(
            user = ?bot.user_id(),
            kind = %bot.context().kind(),
            text = bot.text().unwrap_or_default(),
            "Incoming update"
        );
        next.run().await
    });

    if let Some(chat_id) = operator {
        router.error_reporter(Arc::new(ChatErrorReporter::new([chat_id])));
    }

    // Buttons shared by several keyboards
    router.btn("menu", "📋 Menu");
    router.btn("help", "❓ Help").redirect("help_cmd");
    router.btn("fruits", "🍎 Fruits");

    // Commands
    router.on_start().text("Welcome! Send /help to see what I can do.").kbd(keyboard([
        ["menu", "help"],
    ]));
    router
        .on_referral()
        .func(|payload: String| async move { format!("Welcome! You came via \"{payload}\".") });
    router.on_bot_command(("help_cmd", "/help")).text(
        "/echo <text> - Echo text\n\
         /roll [sides] - Roll a die\n\
         /dice [kind] - Animated dice\n\
         /fruits - Paginated list\n\
         /name - Tell me your name\n\
         /quiz - A quick quiz\n\
         /info - Message info",
    );
    router.on_bot_command("/ping").text("Pong! 🏓");
    router.on_bot_command("/info").func(message_info);
    router
        .on_command("/echo %s")
        .func(|text: String| async move { text });
    router
        .on_command(("roll", ["/roll %n", "/roll"]))
        .func(roll);
    router.on_command("/dice {kind}").func(|bot: Bot, kind: String| async move {
        let dice = match kind.as_str() {
            "darts" => Dice::Darts,
            "basketball" => Dice::Basketball,
            "football" => Dice::Football,
            "bowling" => Dice::Bowling,
            "casino" => Dice::Casino,
            _ => Dice::Dice,
        };
        bot.msg("").dice(dice).send().await.map(|_| ())
    });
    router.on_bot_command("/quiz").func(|bot: Bot| async move {
        bot.poll(PollKind::Quiz)
            .question("Which planet is the largest?")
            .answers(["Mars", "Jupiter", "Venus"])
            .correct_answer(1)
            .explanation("Jupiter is more than twice as massive as all other planets combined.")
            .send()
            .await
            .map(|_| ())
    });

    // FSM: /name → ask → greet
    router.on_bot_command("/name").func(|bot: Bot| async move {
        bot.step("ask_name").await?;
        bot.reply("What is your name?").await.map(|_| ())
    });
    router.on_state("ask_name").func(|bot: Bot, name: String| async move {
        bot.end_step(true).await?;
        bot.reply(format!("Nice to meet you, {name}!")).await.map(|_| ())
    });

    // Callbacks
    router
        .on_callback(("open_menu", ["menu"]))
        .edit_text("📋 Menu")
        .inline_kbd(keyboard([["fruits", "help"]]));
    router
        .on_callback(("fruits_cb", ["fruits"]))
        .func(|bot: Bot| fruit_page(bot, 1));
    router.on_bot_command("/fruits").func(|bot: Bot| fruit_page(bot, 1));
    router
        .on_callback(("fruit_page", ["page_%n"]))
        .func(fruit_page);
    router
        .on_callback("fruit_{name}")
        .func(|name: String| async move { format!("You picked {name}.") });

    // Inline mode
    router.on_inline().func(|bot: Bot| async move {
        let query = bot.text().unwrap_or_default().to_string();
        let results = vec![
            bot.inline(InlineKind::Article)
                .title(format!("Echo \"{query}\""))
                .text(query.clone())
                .build(),
            bot.inline(InlineKind::Article)
                .title("Shout")
                .text(query.to_uppercase())
                .build(),
        ];
        bot.answer_inline_query(results, Default::default())
            .await
            .map(|_| ())
    });

    // Everything else
    router.on_photo().text("Nice picture!");
    router.on_sticker().text("Nice sticker!");
    router
        .on_message()
        .func(|bot: Bot| async move { bot.text().map(str::to_string) });
    router.on_default().func(|bot: Bot| async move {
        debug!(kind = %bot.context().kind(), "Unhandled update");
    });

    router
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = SkiffRuntime::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    let runtime = builder.build()?;

    let dispatcher = runtime.dispatcher(router(args.operator)).await?;

    if args.webhook {
        runtime.run_webhook(dispatcher).await?;
    } else {
        runtime.run_polling(dispatcher).await?;
    }
    Ok(())
}
