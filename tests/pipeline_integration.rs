use std::time::{Duration, Instant};

use chroma_booth::compositor::{COMPOSITE_NODE, Compositor};
use chroma_booth::config::{Configuration, SurfaceConfig};
use chroma_booth::events::{CompositorCommand, PipelineEvent};
use chroma_booth::render::canvas::CanvasPresenter;
use chroma_booth::schedule::QualityProfile;
use chroma_booth::source::{StaticTrackProvider, TrackId};
use chroma_booth::tasks::pipeline;
use chroma_booth::transform::{PointerTarget, Vec2};
use image::{Rgba, RgbaImage};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const W: u32 = 32;
const H: u32 = 24;

fn fast_config() -> Configuration {
    Configuration {
        quality: QualityProfile::High,
        surface: SurfaceConfig {
            width: W,
            height: H,
        },
        driver_interval: Duration::from_millis(4),
        ..Configuration::default()
    }
}

async fn next_matching<F>(rx: &mut mpsc::Receiver<PipelineEvent>, mut pred: F) -> PipelineEvent
where
    F: FnMut(&PipelineEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(event) = rx.recv().await {
            if pred(&event) {
                return event;
            }
        }
        panic!("pipeline event channel closed");
    })
    .await
    .expect("timed out waiting for pipeline event")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pipeline_keys_frames_and_honours_live_toggle() {
    let cfg = fast_config();
    let cam = TrackId::new("cam");
    let mut provider = StaticTrackProvider::new();
    provider.insert(cam.clone(), vec![RgbaImage::from_pixel(W, H, Rgba([0, 255, 1, 255]))]);

    let mut compositor = Compositor::new(&cfg, Instant::now());
    compositor
        .attach(&mut provider, cam.clone(), Instant::now())
        .unwrap();
    let toggle = compositor.key_toggle();

    let (control_tx, control_rx) = mpsc::channel(8);
    let (events_tx, mut events_rx) = mpsc::channel(256);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(pipeline::run(
        compositor,
        provider,
        CanvasPresenter::new(W, H, [0, 0, 0, 255]),
        control_rx,
        events_tx,
        cancel.clone(),
        cfg.driver_interval,
    ));

    let keyed_all = Some((W * H) as usize);
    next_matching(&mut events_rx, |e| {
        matches!(e, PipelineEvent::Presented { keyed, .. } if *keyed == keyed_all)
    })
    .await;

    toggle.set(false);
    next_matching(&mut events_rx, |e| {
        matches!(e, PipelineEvent::Presented { keyed: Some(0), .. })
    })
    .await;

    control_tx
        .send(CompositorCommand::Pointer(PointerTarget::Node(COMPOSITE_NODE)))
        .await
        .unwrap();
    control_tx
        .send(CompositorCommand::CommitDrag(Vec2::new(8.0, 0.0)))
        .await
        .unwrap();
    // give the driver a few ticks to redraw with the new placement
    tokio::time::sleep(Duration::from_millis(100)).await;

    cancel.cancel();
    let presenter = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("pipeline did not stop")
        .expect("pipeline panicked")
        .expect("pipeline failed");

    assert!(presenter.presented() >= 2);
    assert_eq!(presenter.canvas().get_pixel(2, 2).0, [0, 0, 0, 255]);
    assert_eq!(presenter.canvas().get_pixel(12, 2).0, [0, 255, 1, 255]);

    let detached = next_matching(&mut events_rx, |e| matches!(e, PipelineEvent::Detached(_))).await;
    assert_eq!(detached, PipelineEvent::Detached(cam));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn attach_failure_is_reported_and_pipeline_stays_idle() {
    let cfg = fast_config();
    let compositor = Compositor::new(&cfg, Instant::now());

    let (control_tx, control_rx) = mpsc::channel(8);
    let (events_tx, mut events_rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(pipeline::run(
        compositor,
        StaticTrackProvider::new(),
        CanvasPresenter::new(W, H, [0, 0, 0, 255]),
        control_rx,
        events_tx,
        cancel.clone(),
        cfg.driver_interval,
    ));

    let ghost = TrackId::new("ghost");
    control_tx
        .send(CompositorCommand::Attach(ghost.clone()))
        .await
        .unwrap();
    match next_matching(&mut events_rx, |_| true).await {
        PipelineEvent::AttachFailed { track, .. } => assert_eq!(track, ghost),
        other => panic!("unexpected event: {other:?}"),
    }

    let quiet = tokio::time::timeout(Duration::from_millis(100), events_rx.recv()).await;
    assert!(quiet.is_err(), "idle pipeline should not present frames");

    cancel.cancel();
    let presenter = handle.await.unwrap().unwrap();
    assert_eq!(presenter.presented(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn detach_command_stops_presentation() {
    let cfg = fast_config();
    let cam = TrackId::new("cam");
    let mut provider = StaticTrackProvider::new();
    provider.insert(cam.clone(), vec![RgbaImage::from_pixel(W, H, Rgba([90, 90, 90, 255]))]);

    let (control_tx, control_rx) = mpsc::channel(8);
    let (events_tx, mut events_rx) = mpsc::channel(256);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(pipeline::run(
        Compositor::new(&cfg, Instant::now()),
        provider,
        CanvasPresenter::new(W, H, [0, 0, 0, 255]),
        control_rx,
        events_tx,
        cancel.clone(),
        cfg.driver_interval,
    ));

    control_tx
        .send(CompositorCommand::Attach(cam.clone()))
        .await
        .unwrap();
    next_matching(&mut events_rx, |e| matches!(e, PipelineEvent::Presented { .. })).await;

    control_tx.send(CompositorCommand::Detach).await.unwrap();
    next_matching(&mut events_rx, |e| matches!(e, PipelineEvent::Detached(_))).await;

    let quiet = tokio::time::timeout(Duration::from_millis(100), events_rx.recv()).await;
    assert!(quiet.is_err(), "no frames after detach");

    cancel.cancel();
    handle.await.unwrap().unwrap();
}
