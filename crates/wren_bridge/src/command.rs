//! Host command parsing and reply formatting.
//!
//! Commands arrive as `!`-prefixed lines; `parse_line` receives
//! everything after the `!`. Prefixes are matched longest-first so
//! `STOP_THINKING` never falls into `THINKING`. Every command gets
//! exactly one JSON reply line except `VISION:`, which is
//! fire-and-forget.

use wren_core::EmotionLabel;

use crate::vision::RichVisionUpdate;

// ============================================
// Reply vocabulary
// ============================================

/// Closed set of failure reasons. Hosts match on these strings, so the
/// vocabulary never grows casually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyReason {
    UnknownCommand,
    ParseError,
    NotInitialized,
    Animating,
    TrackingActive,
    UnknownEmotion,
    UnknownDirection,
    UnknownNeed,
    UseOnOrOff,
}

impl ReplyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ReplyReason::UnknownCommand => "unknown_command",
            ReplyReason::ParseError => "parse_error",
            ReplyReason::NotInitialized => "not_initialized",
            ReplyReason::Animating => "animating",
            ReplyReason::TrackingActive => "tracking_active",
            ReplyReason::UnknownEmotion => "unknown_emotion",
            ReplyReason::UnknownDirection => "unknown_direction",
            ReplyReason::UnknownNeed => "unknown_need",
            ReplyReason::UseOnOrOff => "use_on_or_off",
        }
    }
}

/// One JSON reply line. `to_json_line` is the only serializer; replies
/// are small enough that hand-built JSON beats pulling state through
/// serde.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ok,
    Streaming(bool),
    NeedValue { need: NeedKind, value: f32 },
    Failed { reason: ReplyReason, detail: Option<(&'static str, String)> },
}

impl Reply {
    pub fn failed(reason: ReplyReason) -> Self {
        Reply::Failed { reason, detail: None }
    }

    pub fn failed_with(reason: ReplyReason, key: &'static str, value: &str) -> Self {
        Reply::Failed {
            reason,
            detail: Some((key, escape_json(value, 20))),
        }
    }

    pub fn to_json_line(&self) -> String {
        match self {
            Reply::Ok => "{\"ok\":true}".to_owned(),
            Reply::Streaming(on) => format!("{{\"ok\":true,\"streaming\":{}}}", on),
            Reply::NeedValue { need, value } => format!(
                "{{\"ok\":true,\"need\":\"{}\",\"value\":{:.2}}}",
                need.as_str(),
                value
            ),
            Reply::Failed { reason, detail } => match detail {
                Some((key, value)) => format!(
                    "{{\"ok\":false,\"reason\":\"{}\",\"{}\":\"{}\"}}",
                    reason.as_str(),
                    key,
                    value
                ),
                None => format!("{{\"ok\":false,\"reason\":\"{}\"}}", reason.as_str()),
            },
        }
    }
}

fn escape_json(raw: &str, max_chars: usize) -> String {
    let mut out = String::new();
    for c in raw.chars().take(max_chars) {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

// ============================================
// Command grammar
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeedKind {
    Social,
    Stimulation,
    Novelty,
}

impl NeedKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NeedKind::Social => "social",
            NeedKind::Stimulation => "stimulation",
            NeedKind::Novelty => "novelty",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "social" => Some(NeedKind::Social),
            "stimulation" => Some(NeedKind::Stimulation),
            "novelty" => Some(NeedKind::Novelty),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttentionDirection {
    Center,
    Left,
    Right,
    Up,
    Down,
}

impl AttentionDirection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "center" => Some(AttentionDirection::Center),
            "left" => Some(AttentionDirection::Left),
            "right" => Some(AttentionDirection::Right),
            "up" => Some(AttentionDirection::Up),
            "down" => Some(AttentionDirection::Down),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Query,
    Look { base: i32, nod: i32 },
    Satisfy { need: NeedKind, amount: f32 },
    Presence,
    Express(EmotionLabel),
    Nod(u32),
    Shake(u32),
    Attention(AttentionDirection),
    Listening,
    Thinking,
    Speaking,
    StopThinking,
    StopSpeaking,
    Acknowledge,
    Celebrate,
    Idle,
    Stream(bool),
    Vision(RichVisionUpdate),
    Spoke,
}

/// Result of feeding one post-`!` line through the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    Command(Command),
    /// Malformed or unknown input whose reply is already decided.
    Reply(Reply),
    /// Fire-and-forget input that was dropped; no reply is owed.
    Ignored,
}

/// Parse everything after the `!`. Longest prefixes are tried first.
pub fn parse_line(line: &str) -> Parsed {
    let line = line.trim_end();

    if let Some(rest) = line.strip_prefix("STOP_THINKING") {
        if rest.is_empty() {
            return Parsed::Command(Command::StopThinking);
        }
    }
    if let Some(rest) = line.strip_prefix("STOP_SPEAKING") {
        if rest.is_empty() {
            return Parsed::Command(Command::StopSpeaking);
        }
    }
    if line == "QUERY" {
        return Parsed::Command(Command::Query);
    }
    if let Some(args) = line.strip_prefix("LOOK:") {
        return parse_look(args);
    }
    if let Some(args) = line.strip_prefix("SATISFY:") {
        return parse_satisfy(args);
    }
    if line == "PRESENCE" {
        return Parsed::Command(Command::Presence);
    }
    if let Some(args) = line.strip_prefix("EXPRESS:") {
        return parse_express(args);
    }
    if let Some(args) = line.strip_prefix("NOD:") {
        return parse_count(args).map_or(
            Parsed::Reply(Reply::failed(ReplyReason::ParseError)),
            |n| Parsed::Command(Command::Nod(n)),
        );
    }
    if let Some(args) = line.strip_prefix("SHAKE:") {
        return parse_count(args).map_or(
            Parsed::Reply(Reply::failed(ReplyReason::ParseError)),
            |n| Parsed::Command(Command::Shake(n)),
        );
    }
    if let Some(args) = line.strip_prefix("ATTENTION:") {
        return match AttentionDirection::parse(args) {
            Some(dir) => Parsed::Command(Command::Attention(dir)),
            None => Parsed::Reply(Reply::failed_with(
                ReplyReason::UnknownDirection,
                "direction",
                args,
            )),
        };
    }
    if line == "LISTENING" {
        return Parsed::Command(Command::Listening);
    }
    if line == "THINKING" {
        return Parsed::Command(Command::Thinking);
    }
    if line == "SPEAKING" {
        return Parsed::Command(Command::Speaking);
    }
    if line == "ACKNOWLEDGE" {
        return Parsed::Command(Command::Acknowledge);
    }
    if line == "CELEBRATE" {
        return Parsed::Command(Command::Celebrate);
    }
    if line == "IDLE" {
        return Parsed::Command(Command::Idle);
    }
    if let Some(args) = line.strip_prefix("STREAM:") {
        return match args {
            "on" => Parsed::Command(Command::Stream(true)),
            "off" => Parsed::Command(Command::Stream(false)),
            _ => Parsed::Reply(Reply::failed(ReplyReason::UseOnOrOff)),
        };
    }
    if let Some(args) = line.strip_prefix("VISION:") {
        return match serde_json::from_str::<RichVisionUpdate>(args) {
            Ok(update) => Parsed::Command(Command::Vision(update)),
            Err(err) => {
                tracing::debug!(%err, "dropping malformed vision update");
                Parsed::Ignored
            }
        };
    }
    if line == "SPOKE" {
        return Parsed::Command(Command::Spoke);
    }

    Parsed::Reply(Reply::failed_with(ReplyReason::UnknownCommand, "cmd", line))
}

fn parse_look(args: &str) -> Parsed {
    let parsed = args.split_once(',').and_then(|(base, nod)| {
        let base = base.trim().parse::<i32>().ok()?;
        let nod = nod.trim().parse::<i32>().ok()?;
        Some(Command::Look { base, nod })
    });
    match parsed {
        Some(cmd) => Parsed::Command(cmd),
        None => Parsed::Reply(Reply::failed(ReplyReason::ParseError)),
    }
}

fn parse_satisfy(args: &str) -> Parsed {
    let Some((name, amount)) = args.split_once(',') else {
        return Parsed::Reply(Reply::failed(ReplyReason::ParseError));
    };
    let Ok(amount) = amount.trim().parse::<f32>() else {
        return Parsed::Reply(Reply::failed(ReplyReason::ParseError));
    };
    match NeedKind::parse(name.trim()) {
        Some(need) => Parsed::Command(Command::Satisfy {
            need,
            amount: amount.clamp(0.0, 1.0),
        }),
        None => Parsed::Reply(Reply::failed_with(ReplyReason::UnknownNeed, "need", name)),
    }
}

fn parse_express(args: &str) -> Parsed {
    match EmotionLabel::parse(&args.trim().to_ascii_uppercase()) {
        Some(label) => Parsed::Command(Command::Express(label)),
        None => Parsed::Reply(Reply::failed_with(
            ReplyReason::UnknownEmotion,
            "emotion",
            args,
        )),
    }
}

fn parse_count(args: &str) -> Option<u32> {
    args.trim().parse::<u32>().ok().map(|n| n.clamp(1, 10))
}
