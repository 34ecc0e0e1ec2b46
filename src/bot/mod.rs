use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;

pub mod notification;

use notification::{LogNotifier, Notifier, TelegramNotifier};

/// Telegram when both credentials are present, otherwise log-only delivery
pub fn build_notifier(config: &Config) -> Arc<dyn Notifier> {
    match (&config.telegram_bot_token, &config.telegram_chat_id) {
        (Some(token), Some(chat_id)) => match TelegramNotifier::new(token, chat_id) {
            Ok(notifier) => {
                info!("📨 Telegram notifications enabled for chat {}", chat_id);
                Arc::new(notifier)
            }
            Err(e) => {
                warn!("Failed to build Telegram client, falling back to logs: {}", e);
                Arc::new(LogNotifier)
            }
        },
        _ => {
            info!("TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID not set, notifications are logged only");
            Arc::new(LogNotifier)
        }
    }
}
