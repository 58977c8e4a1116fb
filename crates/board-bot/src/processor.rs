use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use rand::Rng;
use rand::rngs::StdRng;
use regex::Regex;

use board_types::models::NewMessage;

use crate::client::{KeywordClient, TalkClient};
use crate::error::{ProcessError, UnknownBot};

/// Username attached to every bot reply.
pub const BOT_USERNAME: &str = "bot";

pub const FORTUNES: [&str; 6] = ["大吉", "吉", "中吉", "小吉", "末吉", "凶"];
pub const RARITIES: [&str; 4] = ["SSレア", "Sレア", "レア", "ノーマル"];

static HELLO: LazyLock<Regex> = LazyLock::new(|| trigger(r"\Ahello\z"));
static OMIKUJI: LazyLock<Regex> = LazyLock::new(|| trigger(r"\Aomikuji\z"));
static KEYWORD: LazyLock<Regex> = LazyLock::new(|| trigger(r"\Akeyword (.+)\z"));
static GACHA: LazyLock<Regex> = LazyLock::new(|| trigger(r"\Agacha\z"));
static TALK: LazyLock<Regex> = LazyLock::new(|| trigger(r"\Atalk (.+)\z"));

fn trigger(pattern: &str) -> Regex {
    Regex::new(pattern).expect("trigger patterns are valid")
}

/// Match `body` against `re`. Returns the first capture group, or the whole match
/// when the pattern has none.
fn capture<'a>(re: &Regex, body: &'a str) -> Option<&'a str> {
    let caps = re.captures(body)?;
    caps.get(1).or_else(|| caps.get(0)).map(|m| m.as_str())
}

/// The bots the board knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BotKind {
    HelloWorld,
    Omikuji,
    Keyword,
    Gacha,
    Talk,
}

impl BotKind {
    pub const ALL: [BotKind; 5] = [
        BotKind::HelloWorld,
        BotKind::Omikuji,
        BotKind::Keyword,
        BotKind::Gacha,
        BotKind::Talk,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BotKind::HelloWorld => "helloworld",
            BotKind::Omikuji => "omikuji",
            BotKind::Keyword => "keyword",
            BotKind::Gacha => "gacha",
            BotKind::Talk => "talk",
        }
    }
}

impl fmt::Display for BotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BotKind {
    type Err = UnknownBot;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        BotKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownBot(s.to_string()))
    }
}

/// Uniform draw from a fixed, non-empty set.
#[derive(Debug)]
pub struct Lottery {
    choices: &'static [&'static str],
    rng: StdRng,
}

impl Lottery {
    fn new(choices: &'static [&'static str], rng: StdRng) -> Self {
        Self { choices, rng }
    }

    pub fn draw(&mut self) -> &'static str {
        self.choices[self.rng.random_range(0..self.choices.len())]
    }
}

/// Turns a message body into an optional reply.
#[derive(Debug)]
pub enum Processor {
    /// `hello` → `hello, world!`
    HelloWorld,
    /// `omikuji` → a random fortune
    Omikuji(Lottery),
    /// `keyword <sentence>` → keyphrases of the sentence
    Keyword(KeywordClient),
    /// `gacha` → a random rarity
    Gacha(Lottery),
    /// `talk <text>` → a small-talk reply
    Talk(TalkClient),
}

impl Processor {
    pub fn omikuji(rng: StdRng) -> Self {
        Self::Omikuji(Lottery::new(&FORTUNES, rng))
    }

    pub fn gacha(rng: StdRng) -> Self {
        Self::Gacha(Lottery::new(&RARITIES, rng))
    }

    pub fn kind(&self) -> BotKind {
        match self {
            Self::HelloWorld => BotKind::HelloWorld,
            Self::Omikuji(_) => BotKind::Omikuji,
            Self::Keyword(_) => BotKind::Keyword,
            Self::Gacha(_) => BotKind::Gacha,
            Self::Talk(_) => BotKind::Talk,
        }
    }

    fn trigger(&self) -> &'static Regex {
        match self.kind() {
            BotKind::HelloWorld => &*HELLO,
            BotKind::Omikuji => &*OMIKUJI,
            BotKind::Keyword => &*KEYWORD,
            BotKind::Gacha => &*GACHA,
            BotKind::Talk => &*TALK,
        }
    }

    pub fn matches(&self, body: &str) -> bool {
        self.trigger().is_match(body)
    }

    /// `Ok(None)` when the body does not match this processor's trigger.
    pub async fn process(&mut self, body: &str) -> Result<Option<NewMessage>, ProcessError> {
        let Some(arg) = capture(self.trigger(), body).map(str::trim) else {
            return Ok(None);
        };
        if arg.is_empty() {
            return Ok(None);
        }

        let reply = match self {
            Self::HelloWorld => format!("{body}, world!"),
            Self::Omikuji(lottery) | Self::Gacha(lottery) => lottery.draw().to_string(),
            Self::Keyword(client) => {
                let keywords = client.extract(arg).await?;
                format!("キーワード：{}", keywords.join(", "))
            }
            Self::Talk(client) => client.reply(arg).await?,
        };

        Ok(Some(NewMessage::new(reply, BOT_USERNAME)))
    }
}
