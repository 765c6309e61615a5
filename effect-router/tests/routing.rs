//! Routing, fan-in, failure, and cancellation behavior of `EffectRouter::apply`.

use effect_core::test_utils::{DropProbe, RecordingHandler, probed};
use effect_router::*;
use futures::channel::mpsc;
use futures::stream::FusedStream;
use futures::{Stream, StreamExt};
use std::future::Future;
use std::time::Duration;

const IO: EffectType = EffectType::new("io");
const LOAD: EffectType = EffectType::new("io.load");
const SAVE: EffectType = EffectType::new("io.save");
const NOTIFY: EffectType = EffectType::new("ui.notify");
const IO_SUPERTYPES: &[EffectType] = &[IO];

#[derive(Debug, Clone, PartialEq)]
enum Cmd {
    Load(u32),
    Save(u32),
    Notify(String),
    Reboot,
}

impl Effect for Cmd {
    fn effect_type(&self) -> EffectType {
        match self {
            Cmd::Load(_) => LOAD,
            Cmd::Save(_) => SAVE,
            Cmd::Notify(_) => NOTIFY,
            Cmd::Reboot => EffectType::new("system.reboot"),
        }
    }

    fn supertypes(&self) -> &[EffectType] {
        match self {
            Cmd::Load(_) | Cmd::Save(_) => IO_SUPERTYPES,
            _ => &[],
        }
    }
}

fn describe(cmd: Cmd) -> String {
    match cmd {
        Cmd::Load(n) => format!("loaded {n}"),
        Cmd::Save(n) => format!("saved {n}"),
        Cmd::Notify(text) => format!("notified {text}"),
        Cmd::Reboot => "rebooted".into(),
    }
}

fn recorder() -> RecordingHandler<Cmd, String> {
    RecordingHandler::new(describe)
}

async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}

/// Drain a routed stream into its events and its terminal error, if any.
async fn drain(
    mut events: impl Stream<Item = Result<String, RouterError<Cmd>>> + Unpin,
) -> (Vec<String>, Option<RouterError<Cmd>>) {
    within(async move {
        let mut out = Vec::new();
        while let Some(event) = events.next().await {
            match event {
                Ok(event) => out.push(event),
                Err(err) => return (out, Some(err)),
            }
        }
        (out, None)
    })
    .await
}

// --- Routing ---

#[tokio::test]
async fn routes_each_effect_to_its_handler_only() {
    let loads = recorder();
    let notes = recorder();
    let router = EffectRouter::new(
        [LOAD, NOTIFY],
        vec![
            Registration::new(LOAD, loads.clone()),
            Registration::new(NOTIFY, notes.clone()),
        ],
    );

    let effects = futures::stream::iter(vec![Cmd::Load(1), Cmd::Notify("hi".into())]);
    let (mut events, err) = drain(router.apply(effects)).await;

    assert!(err.is_none());
    events.sort();
    assert_eq!(events, vec!["loaded 1", "notified hi"]);
    assert_eq!(loads.seen(), vec![Cmd::Load(1)]);
    assert_eq!(notes.seen(), vec![Cmd::Notify("hi".into())]);
}

#[tokio::test]
async fn supertype_registration_receives_subtypes() {
    let io = recorder();
    let router = EffectRouter::new(IO, vec![Registration::new(IO, io.clone())]);

    let effects = futures::stream::iter(vec![Cmd::Load(1), Cmd::Save(2)]);
    let (events, err) = drain(router.apply(effects)).await;

    assert!(err.is_none());
    assert_eq!(events, vec!["loaded 1", "saved 2"]);
    assert_eq!(io.seen(), vec![Cmd::Load(1), Cmd::Save(2)]);
}

#[tokio::test]
async fn per_branch_order_is_preserved() {
    let router = EffectRouter::new(
        [LOAD, NOTIFY],
        vec![
            Registration::new(LOAD, recorder()),
            Registration::new(NOTIFY, recorder()),
        ],
    );

    let mut effects = Vec::new();
    for n in 0..50 {
        effects.push(Cmd::Load(n));
        effects.push(Cmd::Notify(n.to_string()));
    }
    let (events, err) = drain(router.apply(futures::stream::iter(effects))).await;
    assert!(err.is_none());
    assert_eq!(events.len(), 100);

    let loads: Vec<&String> = events.iter().filter(|e| e.starts_with("loaded")).collect();
    let expected: Vec<String> = (0..50).map(|n| format!("loaded {n}")).collect();
    assert_eq!(loads, expected.iter().collect::<Vec<_>>());

    let notes: Vec<&String> = events.iter().filter(|e| e.starts_with("notified")).collect();
    let expected: Vec<String> = (0..50).map(|n| format!("notified {n}")).collect();
    assert_eq!(notes, expected.iter().collect::<Vec<_>>());
}

#[tokio::test]
async fn empty_source_completes_empty() {
    let router = EffectRouter::new(LOAD, vec![Registration::new(LOAD, recorder())]);
    let (events, err) = drain(router.apply(futures::stream::empty())).await;
    assert!(events.is_empty());
    assert!(err.is_none());
}

#[tokio::test]
async fn router_with_no_registrations_rejects_everything() {
    let router: EffectRouter<Cmd, String> = EffectRouter::new(EffectTypeSet::new(), vec![]);
    let (events, err) = drain(router.apply(futures::stream::iter(vec![Cmd::Load(1)]))).await;
    assert!(events.is_empty());
    assert_eq!(err.unwrap().unknown_effect(), Some(&Cmd::Load(1)));
}

#[tokio::test]
async fn overlapping_registrations_reach_every_match() {
    let first = recorder();
    let second = recorder();
    let router = EffectRouter::new(
        LOAD,
        vec![
            Registration::new(LOAD, first.clone()),
            Registration::new(IO, second.clone()),
        ],
    );

    let (events, err) = drain(router.apply(futures::stream::iter(vec![Cmd::Load(7)]))).await;

    assert!(err.is_none());
    assert!(events.contains(&"loaded 7".to_string()));
    assert_eq!(first.seen(), vec![Cmd::Load(7)]);
    assert_eq!(second.seen(), vec![Cmd::Load(7)]);
}

#[tokio::test]
async fn declared_type_without_registration_is_dropped() {
    let router = EffectRouter::new([LOAD, SAVE], vec![Registration::new(LOAD, recorder())]);
    let effects = futures::stream::iter(vec![Cmd::Save(1), Cmd::Load(2)]);
    let (events, err) = drain(router.apply(effects)).await;
    assert!(err.is_none());
    assert_eq!(events, vec!["loaded 2"]);
}

#[tokio::test]
async fn registered_type_outside_declared_set_is_still_handled() {
    let router = EffectRouter::new(LOAD, vec![Registration::new(NOTIFY, recorder())]);
    assert!(router.handled_types().contains(&NOTIFY));

    let effects = futures::stream::iter(vec![Cmd::Notify("x".into())]);
    let (events, err) = drain(router.apply(effects)).await;
    assert!(err.is_none());
    assert_eq!(events, vec!["notified x"]);
}

#[tokio::test]
async fn handler_that_drops_its_input_is_detached() {
    let first_only = |effects: EffectStream<Cmd>| -> EventStream<String> {
        effects.take(1).map(|cmd| Ok(describe(cmd))).boxed()
    };
    let router = EffectRouter::new(
        [LOAD, NOTIFY],
        vec![
            Registration::new(LOAD, first_only),
            Registration::new(NOTIFY, recorder()),
        ],
    );

    let mut effects = vec![Cmd::Load(0)];
    effects.extend((1..20).map(Cmd::Load));
    effects.push(Cmd::Notify("done".into()));
    let (mut events, err) = drain(router.apply(futures::stream::iter(effects))).await;

    assert!(err.is_none());
    events.sort();
    assert_eq!(events, vec!["loaded 0", "notified done"]);
}

#[tokio::test]
async fn stalled_handler_does_not_starve_other_branches() {
    let loads = recorder().stall_after(1);
    let router = EffectRouter::new(
        [LOAD, NOTIFY],
        vec![
            Registration::new(LOAD, loads.clone()),
            Registration::new(NOTIFY, recorder()),
        ],
    );

    let mut effects = Vec::new();
    for n in 0..200 {
        effects.push(Cmd::Load(n));
        effects.push(Cmd::Notify(n.to_string()));
    }
    let mut events = router.apply(futures::stream::iter(effects));

    // "loaded 0", then every notification; the stalled branch never ends.
    let received: Vec<String> =
        within(events.by_ref().take(201).map(Result::unwrap).collect()).await;
    let notes = received.iter().filter(|e| e.starts_with("notified")).count();
    assert_eq!(notes, 200);
    assert!(received.contains(&"loaded 0".to_string()));
    assert_eq!(loads.seen(), vec![Cmd::Load(0)]);

    events.cancel();
    within(loads.probe().wait_dropped()).await;
}

#[tokio::test]
async fn router_is_reusable_across_applications() {
    let loads = recorder();
    let router = EffectRouter::new(LOAD, vec![Registration::new(LOAD, loads.clone())]);

    let first = router.apply(futures::stream::iter(vec![Cmd::Load(1)]));
    let second = router.clone().apply(futures::stream::iter(vec![Cmd::Load(2)]));
    let ((first, _), (second, _)) = tokio::join!(drain(first), drain(second));

    assert_eq!(first, vec!["loaded 1"]);
    assert_eq!(second, vec!["loaded 2"]);
    assert_eq!(loads.seen().len(), 2);
}

// --- Failures ---

#[tokio::test]
async fn unknown_effect_fails_after_earlier_events() {
    let router = EffectRouter::new(LOAD, vec![Registration::new(LOAD, recorder())]);
    let (tx, rx) = mpsc::unbounded();
    let mut events = router.apply(rx);

    tx.unbounded_send(Cmd::Load(1)).unwrap();
    assert_eq!(within(events.next()).await.unwrap().unwrap(), "loaded 1");

    tx.unbounded_send(Cmd::Reboot).unwrap();
    let err = within(events.next()).await.unwrap().unwrap_err();
    assert!(err.is_unknown_effect());
    assert_eq!(err.unknown_effect(), Some(&Cmd::Reboot));

    // Nothing after the failure, even if the source keeps going.
    let _ = tx.unbounded_send(Cmd::Load(2));
    assert!(within(events.next()).await.is_none());
    assert!(events.is_terminated());
}

#[derive(Debug)]
struct DiskFull;

impl std::fmt::Display for DiskFull {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("disk full")
    }
}

impl std::error::Error for DiskFull {}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unknown_effect_never_overtakes_earlier_events() {
    let router = RouterBuilder::<Cmd, String>::new()
        .add_function(LOAD, describe)
        .build();

    for _ in 0..200 {
        let effects = futures::stream::iter(vec![Cmd::Load(1), Cmd::Reboot]);
        let (events, err) = drain(router.apply(effects)).await;
        assert_eq!(events, vec!["loaded 1"]);
        assert_eq!(err.unwrap().unknown_effect(), Some(&Cmd::Reboot));
    }
}

#[tokio::test]
async fn nothing_after_an_unknown_effect_is_routed() {
    let loads = recorder();
    let router = EffectRouter::new(LOAD, vec![Registration::new(LOAD, loads.clone())]);

    let source = DropProbe::new();
    let effects = futures::stream::iter(vec![Cmd::Load(1), Cmd::Reboot, Cmd::Load(2)]);
    let (events, err) = drain(router.apply(probed(effects, &source))).await;

    assert_eq!(events, vec!["loaded 1"]);
    assert!(err.unwrap().is_unknown_effect());
    assert_eq!(loads.seen(), vec![Cmd::Load(1)]);
    assert!(source.is_dropped());
}

#[tokio::test]
async fn handler_error_passes_through_after_sibling_events() {
    let failing = |effects: EffectStream<Cmd>| -> EventStream<String> {
        effects
            .map(|_| Err::<String, BoxError>(Box::new(DiskFull)))
            .boxed()
    };
    let notes = recorder();
    let router = EffectRouter::new(
        [SAVE, NOTIFY],
        vec![
            Registration::new(SAVE, failing),
            Registration::new(NOTIFY, notes.clone()),
        ],
    );

    let effects = futures::stream::iter(vec![
        Cmd::Notify("first".into()),
        Cmd::Notify("second".into()),
        Cmd::Save(1),
    ]);
    let (events, err) = drain(router.apply(effects)).await;

    assert_eq!(events, vec!["notified first", "notified second"]);
    let source = err.unwrap().into_handler_error().expect("handler error");
    assert!(source.downcast_ref::<DiskFull>().is_some());
    assert!(notes.probe().is_dropped());
}

#[tokio::test]
async fn failure_stops_the_source_and_waits_for_busy_branches() {
    let failing = |effects: EffectStream<Cmd>| -> EventStream<String> {
        effects
            .map(|_| Err::<String, BoxError>(Box::new(DiskFull)))
            .boxed()
    };
    let stalled = recorder().stall_after(1);
    let router = EffectRouter::new(
        [SAVE, NOTIFY],
        vec![
            Registration::new(SAVE, failing),
            Registration::new(NOTIFY, stalled.clone()),
        ],
    );

    let source = DropProbe::new();
    let (tx, rx) = mpsc::unbounded();
    let mut events = router.apply(probed(rx, &source));

    tx.unbounded_send(Cmd::Notify("first".into())).unwrap();
    assert_eq!(within(events.next()).await.unwrap().unwrap(), "notified first");

    tx.unbounded_send(Cmd::Save(1)).unwrap();
    // The failure is held while the notify branch is still busy, but the
    // source is released straight away.
    within(async {
        tokio::select! {
            _ = source.wait_dropped() => {}
            next = events.next() => panic!("failure delivered while a branch was busy: {next:?}"),
        }
    })
    .await;
    assert!(tx.is_closed());

    events.cancel();
    assert!(within(events.next()).await.is_none());
    within(stalled.probe().wait_dropped()).await;
}

#[tokio::test]
async fn handler_panic_fails_the_stream() {
    let panicking = |effects: EffectStream<Cmd>| -> EventStream<String> {
        effects
            .map(|_| -> Result<String, BoxError> { panic!("boom") })
            .boxed()
    };
    let router = EffectRouter::new(
        SAVE,
        vec![Registration::new(SAVE, panicking).named("saver")],
    );

    let (events, err) = drain(router.apply(futures::stream::iter(vec![Cmd::Save(1)]))).await;
    assert!(events.is_empty());
    match err {
        Some(RouterError::Panicked { branch, message }) => {
            assert_eq!(branch, "saver");
            assert_eq!(message, "boom");
        }
        other => panic!("expected a panic failure, got {other:?}"),
    }
}

// --- Cancellation ---

#[tokio::test]
async fn dropping_the_stream_cancels_source_and_branches() {
    let loads = recorder().stall_after(1);
    let notes = recorder();
    let router = EffectRouter::new(
        [LOAD, NOTIFY],
        vec![
            Registration::new(LOAD, loads.clone()),
            Registration::new(NOTIFY, notes.clone()),
        ],
    );

    let source_probe = DropProbe::new();
    let (tx, rx) = mpsc::unbounded();
    let mut events = router.apply(probed(rx, &source_probe));

    tx.unbounded_send(Cmd::Load(1)).unwrap();
    assert_eq!(within(events.next()).await.unwrap().unwrap(), "loaded 1");
    tx.unbounded_send(Cmd::Load(2)).unwrap();

    drop(events);

    within(loads.probe().wait_dropped()).await;
    within(notes.probe().wait_dropped()).await;
    within(source_probe.wait_dropped()).await;
    assert!(tx.is_closed());
}

#[tokio::test]
async fn cancel_ends_the_stream_immediately() {
    let loads = recorder().stall_after(1);
    let router = EffectRouter::new(LOAD, vec![Registration::new(LOAD, loads.clone())]);

    let (tx, rx) = mpsc::unbounded();
    let mut events = router.apply(rx);
    tx.unbounded_send(Cmd::Load(1)).unwrap();
    assert_eq!(within(events.next()).await.unwrap().unwrap(), "loaded 1");

    events.cancel();
    let _ = tx.unbounded_send(Cmd::Load(2));
    let _ = tx.unbounded_send(Cmd::Reboot);

    assert!(within(events.next()).await.is_none());
    assert!(events.is_terminated());
    within(loads.probe().wait_dropped()).await;
}

#[tokio::test]
async fn completed_stream_has_released_every_handler() {
    let loads = recorder();
    let router = EffectRouter::new(LOAD, vec![Registration::new(LOAD, loads.clone())]);

    let (events, _) = drain(router.apply(futures::stream::iter(vec![Cmd::Load(1)]))).await;
    assert_eq!(events, vec!["loaded 1"]);
    assert_eq!(loads.probe().dropped(), 1);
}

#[tokio::test]
async fn drop_tracked_source_outlives_the_tracker_borrow() {
    let probe = DropProbe::new();
    let source = {
        let local = probe.clone();
        probed(futures::stream::iter(vec![Cmd::Load(1)]), &local)
    };
    let router = EffectRouter::new(LOAD, vec![Registration::new(LOAD, recorder())]);

    let (events, err) = drain(router.apply(source)).await;
    assert!(err.is_none());
    assert_eq!(events, vec!["loaded 1"]);
    assert!(probe.is_dropped());
}
