//! Example: routing a media player's effects.
//!
//! A player loop emits effects; the router sends playback effects to a
//! handler that simulates slow I/O, analytics effects to a fire-and-forget
//! consumer, and fails on the one effect nobody registered.
//!
//! Run with: `cargo run --example media_player -p effect-router`

use std::time::Duration;

use effect_router::*;
use futures::StreamExt;

const PLAYBACK: EffectType = EffectType::new("playback");
const PLAY: EffectType = EffectType::new("playback.play");
const SEEK: EffectType = EffectType::new("playback.seek");
const TRACK: EffectType = EffectType::new("analytics.track");
const PLAYBACK_SUPERTYPES: &[EffectType] = &[PLAYBACK];

#[derive(Debug, Clone)]
enum PlayerEffect {
    Play { track: String },
    Seek { seconds: u32 },
    Track { event: String },
    ClearCache,
}

impl Effect for PlayerEffect {
    fn effect_type(&self) -> EffectType {
        match self {
            PlayerEffect::Play { .. } => PLAY,
            PlayerEffect::Seek { .. } => SEEK,
            PlayerEffect::Track { .. } => TRACK,
            PlayerEffect::ClearCache => EffectType::new("storage.clear_cache"),
        }
    }

    fn supertypes(&self) -> &[EffectType] {
        match self {
            PlayerEffect::Play { .. } | PlayerEffect::Seek { .. } => PLAYBACK_SUPERTYPES,
            _ => &[],
        }
    }
}

#[derive(Debug)]
enum PlayerEvent {
    Started(String),
    Moved(u32),
}

// --- Playback: one handler for the whole playback family ---

fn playback(effects: EffectStream<PlayerEffect>) -> EventStream<PlayerEvent> {
    effects
        .then(|effect| async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            match effect {
                PlayerEffect::Play { track } => Ok(PlayerEvent::Started(track)),
                PlayerEffect::Seek { seconds } => Ok(PlayerEvent::Moved(seconds)),
                other => Err::<_, BoxError>(format!("not a playback effect: {other:?}").into()),
            }
        })
        .boxed()
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let router = RouterBuilder::<PlayerEffect, PlayerEvent>::new()
        .add_handler(PLAYBACK, playback)
        .add_consumer(TRACK, |effect| {
            if let PlayerEffect::Track { event } = effect {
                println!("analytics: {event}");
            }
        })
        .build();

    let effects = futures::stream::iter(vec![
        PlayerEffect::Play {
            track: "intro".into(),
        },
        PlayerEffect::Track {
            event: "play_pressed".into(),
        },
        PlayerEffect::Seek { seconds: 42 },
        PlayerEffect::ClearCache,
    ]);

    let mut events = router.apply(effects);
    while let Some(event) = events.next().await {
        match event {
            Ok(event) => println!("event: {event:?}"),
            Err(err) => println!("router stopped: {err}"),
        }
    }
}
