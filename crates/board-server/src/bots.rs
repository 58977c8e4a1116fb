use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::warn;

use board_bot::client::{KeywordClient, TalkClient};
use board_bot::processor::{BotKind, Processor};

use crate::config::Config;

/// Build the processor for one configured bot. API-backed bots without a
/// credential are skipped.
pub fn build_processor(
    kind: BotKind,
    config: &Config,
    http: &reqwest::Client,
    index: usize,
) -> Option<Processor> {
    // A fixed seed still gives each bot its own sequence.
    let rng = || match config.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
        None => StdRng::from_os_rng(),
    };

    match kind {
        BotKind::HelloWorld => Some(Processor::HelloWorld),
        BotKind::Omikuji => Some(Processor::omikuji(rng())),
        BotKind::Gacha => Some(Processor::gacha(rng())),
        BotKind::Keyword => match &config.keyword.key {
            Some(app_id) => Some(Processor::Keyword(KeywordClient::new(
                http.clone(),
                config.keyword.url.as_str(),
                app_id.as_str(),
            ))),
            None => {
                warn!("KEYWORD_API_APP_ID is not set, keyword bot disabled");
                None
            }
        },
        BotKind::Talk => match &config.talk.key {
            Some(api_key) => Some(Processor::Talk(TalkClient::new(
                http.clone(),
                config.talk.url.as_str(),
                api_key.as_str(),
            ))),
            None => {
                warn!("TALK_API_KEY is not set, talk bot disabled");
                None
            }
        },
    }
}
