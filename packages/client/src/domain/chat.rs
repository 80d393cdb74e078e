//! Chat: throttled posting, receipt-ordered history and per-sender colors.

use std::collections::HashMap;

use rand::{Rng, SeedableRng, rngs::StdRng};
use uuid::Uuid;

use super::{
    error::ChatError,
    signal::{Chat, OutboundSignal},
};

/// Channel value above which a color counts as too light to read.
const LIGHT_CHANNEL_THRESHOLD: u8 = 150;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: String,
    pub text: String,
    pub is_host: bool,
}

impl From<Chat> for ChatMessage {
    fn from(chat: Chat) -> Self {
        Self {
            id: chat.id,
            sender: chat.user,
            text: chat.text,
            is_host: chat.is_creator,
        }
    }
}

/// Generate a random "#RRGGBB" color that is not too light on a white
/// background (at least one channel at or below the threshold).
pub fn generate_color<R: Rng>(rng: &mut R) -> String {
    loop {
        let [r, g, b]: [u8; 3] = rng.random();
        if r > LIGHT_CHANNEL_THRESHOLD
            && g > LIGHT_CHANNEL_THRESHOLD
            && b > LIGHT_CHANNEL_THRESHOLD
        {
            continue;
        }
        return format!("#{:02X}{:02X}{:02X}", r, g, b);
    }
}

/// Sender name → color, assigned on first sight.
#[derive(Debug)]
pub struct ColorCache {
    colors: HashMap<String, String>,
    rng: StdRng,
}

impl ColorCache {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            colors: HashMap::new(),
            rng,
        }
    }

    pub fn color_for(&mut self, sender: &str) -> &str {
        let rng = &mut self.rng;
        self.colors
            .entry(sender.to_string())
            .or_insert_with(|| generate_color(rng))
    }

    pub fn get(&self, sender: &str) -> Option<&str> {
        self.colors.get(sender).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn clear(&mut self) {
        self.colors.clear();
    }
}

impl Default for ColorCache {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ChatAggregator {
    messages: Vec<ChatMessage>,
    colors: ColorCache,
    last_accepted_at: Option<i64>,
    throttle_ms: i64,
}

impl ChatAggregator {
    pub fn new(throttle_ms: i64) -> Self {
        Self::with_colors(throttle_ms, ColorCache::new())
    }

    pub fn with_colors(throttle_ms: i64, colors: ColorCache) -> Self {
        Self {
            messages: Vec::new(),
            colors,
            last_accepted_at: None,
            throttle_ms,
        }
    }

    /// Validate and build the `chat` broadcast. The message is not appended
    /// here; it shows up when the broadcast comes back. The throttle window
    /// only starts once the message is handed off ([`Self::mark_sent`]).
    pub fn post_message(
        &mut self,
        sender: &str,
        is_host: bool,
        text: &str,
        now_ms: i64,
    ) -> Result<OutboundSignal, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::Empty);
        }
        if let Some(last) = self.last_accepted_at {
            let elapsed = now_ms - last;
            if elapsed < self.throttle_ms {
                return Err(ChatError::Throttled {
                    retry_after_ms: self.throttle_ms - elapsed,
                });
            }
        }

        let signal = OutboundSignal::broadcast(&Chat {
            id: Uuid::new_v4(),
            user: sender.to_string(),
            text: text.to_string(),
            is_creator: is_host,
        })?;
        Ok(signal)
    }

    /// Start the throttle window of a message the transport accepted.
    pub fn mark_sent(&mut self, now_ms: i64) {
        self.last_accepted_at = Some(now_ms);
    }

    /// Append a received message and return its sender's color.
    pub fn apply_chat(&mut self, message: ChatMessage) -> String {
        let color = self.colors.color_for(&message.sender).to_string();
        self.messages.push(message);
        color
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn color_of(&self, sender: &str) -> Option<&str> {
        self.colors.get(sender)
    }

    /// Drop history, colors and the throttle window.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.colors.clear();
        self.last_accepted_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(sender: &str, text: &str) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            sender: sender.to_string(),
            text: text.to_string(),
            is_host: false,
        }
    }

    #[test]
    fn test_generated_colors_are_never_too_light() {
        // テスト項目: 生成される色は 3 チャンネル全てが 150 を超えることがない
        // given (前提条件):
        let mut rng = StdRng::seed_from_u64(7);

        // when (操作):
        let colors: Vec<String> = (0..500).map(|_| generate_color(&mut rng)).collect();

        // then (期待する結果):
        for color in colors {
            assert_eq!(color.len(), 7);
            assert!(color.starts_with('#'));
            let channels: Vec<u8> = (0..3)
                .map(|i| u8::from_str_radix(&color[1 + i * 2..3 + i * 2], 16).unwrap())
                .collect();
            assert!(channels.iter().any(|c| *c <= LIGHT_CHANNEL_THRESHOLD));
        }
    }

    #[test]
    fn test_color_is_stable_per_sender() {
        // テスト項目: 同じ送信者には同じ色が割り当てられる
        // given (前提条件):
        let mut chat = ChatAggregator::with_colors(500, ColorCache::with_rng(StdRng::seed_from_u64(1)));

        // when (操作):
        let first = chat.apply_chat(message("uaena", "안녕"));
        let second = chat.apply_chat(message("uaena", "hi again"));

        // then (期待する結果):
        assert_eq!(first, second);
        assert_eq!(chat.messages().len(), 2);
        assert_eq!(chat.color_of("uaena"), Some(first.as_str()));
    }

    #[test]
    fn test_post_message_is_throttled() {
        // テスト項目: 前回から 500ms 未満の投稿は拒否され、以降は受け付けられる
        // given (前提条件):
        let mut chat = ChatAggregator::new(500);

        // when (操作):
        let first = chat.post_message("uaena", false, "hello", 1_000);
        chat.mark_sent(1_000);
        let too_fast = chat.post_message("uaena", false, "again", 1_200);
        let later = chat.post_message("uaena", false, "again", 1_600);

        // then (期待する結果):
        assert!(first.is_ok());
        assert_eq!(too_fast, Err(ChatError::Throttled { retry_after_ms: 300 }));
        assert!(later.is_ok());
    }

    #[test]
    fn test_unsent_message_does_not_start_throttle() {
        // テスト項目: 送信されなかったメッセージでは連投制限が始まらない
        // given (前提条件):
        let mut chat = ChatAggregator::new(500);

        // when (操作):
        let unsent = chat.post_message("uaena", false, "hello", 1_000);
        let retry = chat.post_message("uaena", false, "hello", 1_100);

        // then (期待する結果):
        assert!(unsent.is_ok());
        assert!(retry.is_ok());
    }

    #[test]
    fn test_post_message_trims_and_rejects_empty() {
        // テスト項目: 空白のみのメッセージは拒否され、前後の空白は取り除かれる
        // given (前提条件):
        let mut chat = ChatAggregator::new(500);

        // when (操作):
        let empty = chat.post_message("uaena", false, "   ", 0);
        let signal = chat.post_message("IU", true, "  hi  ", 0).unwrap();

        // then (期待する結果):
        assert_eq!(empty, Err(ChatError::Empty));
        let payload = signal.payload::<Chat>().unwrap();
        assert_eq!(payload.text, "hi");
        assert!(payload.is_creator);
        assert!(chat.messages().is_empty());
    }

    #[test]
    fn test_clear_drops_colors() {
        // テスト項目: clear で履歴と色のキャッシュが消える
        // given (前提条件):
        let mut chat = ChatAggregator::new(500);
        chat.apply_chat(message("uaena", "hi"));

        // when (操作):
        chat.clear();

        // then (期待する結果):
        assert!(chat.messages().is_empty());
        assert!(chat.color_of("uaena").is_none());
    }
}
