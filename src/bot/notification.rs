use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::models::{Alert, TrackedWallet};
use crate::smart_money::discovery::DiscoveryReport;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Wallets listed in a discovery summary
const SUMMARY_TOP_WALLETS: usize = 5;

/// Delivery channel for formatted messages. Best effort: returns false on failure.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, message: &str) -> bool;
}

// ============================================================================
// TELEGRAM
// ============================================================================

/// Sends HTML formatted messages through the Telegram Bot API
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: &str) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            api_base: TELEGRAM_API_BASE.to_string(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, message: &str) -> bool {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let body = json!({
            "chat_id": self.chat_id,
            "text": message,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });

        match self.client.post(&url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Notification sent to chat {}", self.chat_id);
                true
            }
            Ok(response) => {
                error!("Telegram rejected notification: HTTP {}", response.status());
                false
            }
            Err(e) => {
                error!("Failed to send notification: {}", e);
                false
            }
        }
    }
}

/// Used when no Telegram credentials are configured
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, message: &str) -> bool {
        info!("📣 {}", message);
        true
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct RecordingNotifier {
    messages: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, message: &str) -> bool {
        self.messages.lock().unwrap().push(message.to_string());
        true
    }
}

// ============================================================================
// FORMATTING
// ============================================================================

/// Escape text for Telegram's HTML parse mode
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// `AbCd...WxYz` for long addresses
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 12 {
        return address.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

pub fn format_buy_alert(alert: &Alert, wallet: &TrackedWallet) -> String {
    format!(
        "🟢 <b>Smart Money Buy</b>\n\n\
        Wallet: <code>{}</code>\n\
        Token: {} (<code>{}</code>)\n\
        Spent: {:.4} SOL\n\
        Wallet profit: {:.2} USD | Win rate: {:.1}%\n\
        Tx: <code>{}</code>",
        escape_html(&alert.wallet),
        escape_html(&alert.token_symbol),
        escape_html(&alert.token_mint),
        alert.amount_sol,
        wallet.profit_usd,
        wallet.win_rate,
        escape_html(&alert.signature)
    )
}

pub fn format_discovery_summary(report: &DiscoveryReport) -> String {
    let mut message = format!(
        "🔍 <b>Discovery Complete</b>\n\n\
        Tokens scanned: {}\n\
        Wallets analysed: {}\n\
        Smart money found: {}",
        report.tokens_scanned.len(),
        report.wallets_analyzed,
        report.qualifying.len()
    );

    if !report.qualifying.is_empty() {
        message.push_str("\n\n<b>Top wallets</b>");
        for wallet in report.qualifying.iter().take(SUMMARY_TOP_WALLETS) {
            let metrics = &wallet.classification.metrics;
            message.push_str(&format!(
                "\n• <code>{}</code> {:.2} USD, {:.1}% win rate, {} swaps",
                escape_html(&short_address(wallet.address())),
                metrics.profit_usd,
                metrics.win_rate,
                metrics.swap_count
            ));
        }
    }

    if !report.clusters.is_empty() {
        message.push_str("\n\n⚠️ <b>Possible clusters</b>");
        for cluster in &report.clusters {
            message.push_str(&format!(
                "\n• {} wallets funded by <code>{}</code>",
                cluster.count,
                escape_html(&short_address(&cluster.funding_source))
            ));
        }
    }

    message
}

// ============================================================================
// NOTIFICATION MANAGER
// ============================================================================

/// Formats and delivers alerts; delivery failures are logged and otherwise ignored
pub struct NotificationManager {
    notifier: Arc<dyn Notifier>,
}

impl NotificationManager {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub fn channel(&self) -> &'static str {
        self.notifier.name()
    }

    pub async fn send_buy_alert(&self, alert: &Alert, wallet: &TrackedWallet) -> bool {
        self.notifier.send(&format_buy_alert(alert, wallet)).await
    }

    pub async fn send_discovery_summary(&self, report: &DiscoveryReport) -> bool {
        self.notifier.send(&format_discovery_summary(report)).await
    }

    pub async fn send_status_update(&self, status_type: &str, message: &str) -> bool {
        let text = format!(
            "ℹ️ <b>{} Update</b>\n\n{}",
            escape_html(status_type),
            escape_html(message)
        );
        self.notifier.send(&text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn empty_report() -> DiscoveryReport {
        DiscoveryReport {
            started_at: Utc::now(),
            finished_at: Utc::now(),
            tokens_scanned: vec!["MintA".to_string()],
            buyers_seen: 4,
            candidates_ranked: 4,
            wallets_analyzed: 4,
            sol_usd_rate: 150.0,
            qualifying: vec![],
            clusters: vec![],
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>A&B</b>"), "&lt;b&gt;A&amp;B&lt;/b&gt;");
    }

    #[test]
    fn test_short_address() {
        assert_eq!(short_address("short"), "short");
        assert_eq!(
            short_address("So11111111111111111111111111111111111111112"),
            "So11...1112"
        );
    }

    #[test]
    fn test_buy_alert_format() {
        let alert = Alert::new_buy("Wallet1", "MintA", "<PEPE>", 1.25, "Sig1");
        let mut wallet = TrackedWallet::new_manual("Wallet1");
        wallet.profit_usd = 321.5;
        wallet.win_rate = 55.0;

        let text = format_buy_alert(&alert, &wallet);
        assert!(text.contains("&lt;PEPE&gt;"));
        assert!(text.contains("1.2500 SOL"));
        assert!(text.contains("321.50 USD"));
        assert!(text.contains("55.0%"));
    }

    #[test]
    fn test_discovery_summary_lists_clusters() {
        let mut report = empty_report();
        report.clusters.push(crate::models::WalletCluster {
            funding_source: "FunderZ".to_string(),
            wallets: vec!["W1".to_string(), "W2".to_string()],
            count: 2,
        });
        let text = format_discovery_summary(&report);
        assert!(text.contains("Smart money found: 0"));
        assert!(text.contains("2 wallets funded by <code>FunderZ</code>"));
    }

    #[tokio::test]
    async fn test_telegram_notifier_posts_html() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/botTOKEN/sendMessage")
            .match_body(mockito::Matcher::PartialJson(json!({
                "chat_id": "42",
                "parse_mode": "HTML",
            })))
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let notifier = TelegramNotifier::new("TOKEN", "42").unwrap().with_api_base(&server.url());
        assert!(notifier.send("hello").await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_telegram_failure_is_reported_not_raised() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/botTOKEN/sendMessage")
            .with_status(403)
            .create_async()
            .await;

        let notifier = TelegramNotifier::new("TOKEN", "42").unwrap().with_api_base(&server.url());
        let manager = NotificationManager::new(Arc::new(notifier));
        assert!(!manager.send_status_update("Monitor", "started").await);
    }
}
