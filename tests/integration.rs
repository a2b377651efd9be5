//! Integration tests for stream-playout.
//!
//! These exercise the full pipeline: provider audio through the hub's
//! chain routing into the player, with a mock output device standing in
//! for the platform audio API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use stream_playout::{
    event_callback, ChannelError, EndpointChannel, EndpointRole, Hub, MockOutput, PlayState,
    Player, PlayerConfig, Resampler, Sink, StreamEvent,
};

/// A test endpoint that records audio writes and can be told to fail.
struct TestEndpoint {
    name: String,
    fail: AtomicUsize,
    audio: Mutex<Vec<Vec<u8>>>,
    responses: Mutex<Vec<u32>>,
}

impl TestEndpoint {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail: AtomicUsize::new(0),
            audio: Mutex::new(Vec::new()),
            responses: Mutex::new(Vec::new()),
        })
    }

    fn always_failing(name: &str) -> Arc<Self> {
        let endpoint = Self::new(name);
        endpoint.fail.store(usize::MAX, Ordering::SeqCst);
        endpoint
    }

    fn writes(&self) -> usize {
        self.audio.lock().len()
    }
}

#[async_trait]
impl EndpointChannel for TestEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write_audio(&self, data: &[u8], _last: bool) -> Result<u32, ChannelError> {
        if self.fail.load(Ordering::SeqCst) > 0 {
            return Err(ChannelError::write_failed("endpoint refused"));
        }
        self.audio.lock().push(data.to_vec());
        Ok(data.len() as u32)
    }

    async fn write_response(&self, written: u32) -> Result<(), ChannelError> {
        self.responses.lock().push(written);
        Ok(())
    }

    async fn write_buffer_info(&self, _samples: i32, _stutters: i32) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn write_format_info(&self, _channels: i32, _rate: i32) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// Waits until the router has processed every command posted so far.
///
/// Commands are handled strictly in order, so the reply to a throwaway
/// registration doubles as a barrier.
async fn settle(hub: &Hub) {
    let marker = TestEndpoint::new("settle-marker");
    hub.create_endpoint(marker, EndpointRole::Provider)
        .await
        .unwrap();
    hub.release_endpoint("settle-marker").await.unwrap();
}

/// Installs a subscriber so failing tests show pipeline logs.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn player_at(rate: u32, channels: u32) -> (Arc<MockOutput>, Arc<Player>) {
    init_logging();
    let output = Arc::new(MockOutput::new());
    let player = Arc::new(Player::new(output.clone()));
    player.set_format(rate, 16, channels).unwrap();
    (output, player)
}

#[test]
fn test_flush_idempotence() {
    let (output, player) = player_at(8000, 1);

    player.enqueue(&[0u8; 512]);
    player.enqueue(&[0u8; 512]);
    output.consume_one();
    player.on_drained();
    player.on_drained();
    player.on_drained(); // underrun

    Sink::flush(player.as_ref());
    assert_eq!(player.buffered_count(), 0);
    assert_eq!(player.underflow_count(), 0);
    assert_eq!(player.total_written_samples(), 0);

    // A second flush changes nothing
    Sink::flush(player.as_ref());
    assert_eq!(player.buffered_count(), 0);

    // Refill past min_playback (8000 bytes). The first chunk takes the
    // fast path to the device, so two more must queue to cross it.
    player.enqueue(&[0u8; 512]);
    player.enqueue(&[0u8; 4096]);
    player.enqueue(&[0u8; 4096]);
    assert_eq!(player.play_state(), PlayState::Playing);
}

#[test]
fn test_byte_conservation() {
    let (output, player) = player_at(44100, 2);

    // Interleave enqueues with drain cycles; every accepted byte must be
    // accounted for in the device or the queue
    let mut accepted: u64 = 0;
    for round in 0..50u64 {
        let len = 512 + (round % 7) * 128;
        let written = player.enqueue(&vec![0u8; len as usize]);
        accepted += u64::from(written);

        if round % 3 == 0 && output.consume_one().is_some() {
            player.on_drained();
        }
    }

    let queued = player.buffered_count() as u64;
    assert_eq!(accepted, output.submitted_bytes() + queued);
}

#[test]
fn test_backpressure_exactness() {
    let (_output, player) = player_at(8000, 1);

    // Occupy the device, then fill the queue exactly to capacity
    player.enqueue(&[0u8; 16]);
    let free = player.free_count() as usize;

    assert_eq!(player.enqueue(&vec![0u8; free + 1]), 0);
    assert_eq!(player.enqueue(&vec![0u8; free]) as usize, free);
    assert_eq!(player.free_count(), 0);
    assert_eq!(player.enqueue(&[0u8; 1]), 0);
}

#[test]
fn test_underflow_monotonic_across_drains() {
    let (output, player) = player_at(44100, 2);
    player.enqueue(&[0u8; 256]); // fast path
    player.enqueue(&[0u8; 256]); // queued

    let mut last = player.underflow_count();
    for _ in 0..8 {
        output.consume_one();
        player.on_drained();
        let now = player.underflow_count();
        assert!(now >= last);
        last = now;
    }
    // Exactly one increment per empty-queue drain: first drain found the
    // queued chunk, the remaining seven found nothing
    assert_eq!(last, 7);
}

#[test]
fn test_oversized_chunk_sentinel() {
    let output = Arc::new(MockOutput::new());
    let player = Player::with_config(
        output,
        PlayerConfig {
            max_chunk_bytes: 4096,
            ..Default::default()
        },
    );
    player.set_format(44100, 16, 2).unwrap();
    player.enqueue(&[0u8; 64]); // occupy the fast path

    let before = player.buffered_count();
    assert_eq!(player.enqueue(&vec![0u8; 4097]), 4097);
    assert_eq!(player.buffered_count(), before);
}

#[test]
fn test_resample_length_and_bounds() {
    let mut resampler = Resampler::new(22000, 48000);
    let input: Vec<i16> = (0..2200)
        .map(|i| if i % 2 == 0 { 20000 } else { -20000 })
        .collect();

    let output = resampler.resample_block(&input);

    let expected = (2200.0 * (48000.0 / 22000.0)) as i64;
    assert!((output.len() as i64 - expected).abs() <= 1);
    // Linear interpolation between in-range samples stays in range;
    // saturation would show up in the overflow counter
    assert_eq!(resampler.overflow_count(), 0);
}

#[test]
fn test_resampling_player_end_to_end() {
    let (output, player) = player_at(22000, 1);

    // One chunk of 1100 samples comes out as ~2400 at 48kHz
    let bytes = vec![0u8; 2200];
    assert_eq!(player.enqueue(&bytes) as usize, bytes.len());

    let block = output.consume_one().unwrap();
    let produced = block.len() as i64 / 2;
    assert!((produced - 2400).abs() <= 1);
    assert_eq!(player.sample_rate(), 48000);
}

#[tokio::test]
async fn test_chain_fallback_delivers_to_surviving_stage() {
    let (_output, player) = player_at(44100, 2);
    let hub = Hub::builder().with_sink(player.clone()).build();

    let provider = TestEndpoint::new("src");
    let a = TestEndpoint::always_failing("a");
    let b = TestEndpoint::always_failing("b");
    let c = TestEndpoint::new("c");
    for (endpoint, role) in [
        (provider.clone(), EndpointRole::Provider),
        (a.clone(), EndpointRole::Stage),
        (b.clone(), EndpointRole::Stage),
        (c.clone(), EndpointRole::Stage),
    ] {
        assert!(hub.create_endpoint(endpoint, role).await.unwrap());
    }
    hub.set_chain(vec!["a".into(), "b".into(), "c".into()])
        .await
        .unwrap();

    hub.provider_audio("src", vec![0u8; 128]).await.unwrap();
    hub.shutdown().await.unwrap();

    assert_eq!(a.writes(), 0);
    assert_eq!(b.writes(), 0);
    assert_eq!(c.writes(), 1);
    assert_eq!(player.buffered_count(), 0); // chunk is at stage c, not the sink
    // No ack until stage c hands the chunk back and it reaches the sink
    assert!(provider.responses.lock().is_empty());
}

#[tokio::test]
async fn test_chain_total_failure_falls_through_to_sink() {
    let (output, player) = player_at(44100, 2);
    let events = Arc::new(Mutex::new(Vec::new()));
    let events_clone = events.clone();
    let hub = Hub::builder()
        .with_sink(player.clone())
        .with_event_callback(event_callback(move |e| events_clone.lock().push(e)))
        .build();

    let provider = TestEndpoint::new("src");
    let a = TestEndpoint::always_failing("a");
    let b = TestEndpoint::always_failing("b");
    assert!(hub
        .create_endpoint(provider.clone(), EndpointRole::Provider)
        .await
        .unwrap());
    assert!(hub.create_endpoint(a, EndpointRole::Stage).await.unwrap());
    assert!(hub.create_endpoint(b, EndpointRole::Stage).await.unwrap());
    hub.set_chain(vec!["a".into(), "b".into()]).await.unwrap();

    hub.provider_audio("src", vec![0u8; 128]).await.unwrap();
    // A second chunk still routes; no in-flight leak from the failures
    hub.provider_audio("src", vec![0u8; 128]).await.unwrap();
    hub.shutdown().await.unwrap();

    assert_eq!(output.submitted_bytes() + player.buffered_count() as u64, 256);
    assert_eq!(provider.responses.lock().as_slice(), &[128, 128]);

    let skips = events
        .lock()
        .iter()
        .filter(|e| matches!(e, StreamEvent::StageWriteFailed { .. }))
        .count();
    assert_eq!(skips, 4); // two stages skipped, twice
}

#[tokio::test]
async fn test_stage_response_completes_the_chain() {
    let (output, player) = player_at(44100, 2);
    let hub = Hub::builder().with_sink(player.clone()).build();

    let provider = TestEndpoint::new("src");
    let stage = TestEndpoint::new("eq");
    assert!(hub
        .create_endpoint(provider.clone(), EndpointRole::Provider)
        .await
        .unwrap());
    assert!(hub
        .create_endpoint(stage.clone(), EndpointRole::Stage)
        .await
        .unwrap());
    hub.set_chain(vec!["eq".into()]).await.unwrap();

    hub.provider_audio("src", vec![7u8; 256]).await.unwrap();
    settle(&hub).await;

    // The stage hands its processed audio back; it was the last chain
    // entry, so the bytes land in the sink
    let processed = stage.audio.lock()[..].concat();
    hub.stage_audio("eq", processed).await.unwrap();
    hub.shutdown().await.unwrap();

    assert_eq!(stage.writes(), 1);
    assert_eq!(output.submitted_bytes(), 256);
    // Exactly one ack per chunk, fired when the sink accepted the bytes
    assert_eq!(provider.responses.lock().as_slice(), &[256]);
}

#[tokio::test]
async fn test_provider_flush_signal_resets_player() {
    let (_output, player) = player_at(8000, 1);
    let hub = Hub::builder().with_sink(player.clone()).build();

    let provider = TestEndpoint::new("src");
    assert!(hub
        .create_endpoint(provider.clone(), EndpointRole::Provider)
        .await
        .unwrap());

    hub.provider_audio("src", vec![0u8; 2048]).await.unwrap();
    hub.provider_audio("src", vec![0u8; 2048]).await.unwrap();
    hub.provider_audio("src", Vec::new()).await.unwrap();
    hub.shutdown().await.unwrap();

    assert_eq!(player.buffered_count(), 0);
    assert_eq!(player.play_state(), PlayState::Stopped);
    assert_eq!(*provider.responses.lock().last().unwrap(), 0);
}

#[tokio::test]
async fn test_format_announcement_reconfigures_player() {
    let (output, player) = player_at(44100, 2);
    let hub = Hub::builder().with_sink(player.clone()).build();

    let provider = TestEndpoint::new("src");
    assert!(hub
        .create_endpoint(provider, EndpointRole::Provider)
        .await
        .unwrap());

    // 22050 is a supported rate; the player follows it without resampling
    hub.format_info("src", 22050, 1).await.unwrap();
    hub.shutdown().await.unwrap();

    assert_eq!(player.sample_rate(), 22050);
    assert_eq!(player.channels(), 1);
    assert_eq!(output.configured_format(), Some((22050, 16, 1)));
}

#[test]
fn test_underrun_events_reach_callback() {
    let (_output, player) = player_at(44100, 2);
    let events = Arc::new(Mutex::new(Vec::new()));
    let events_clone = events.clone();
    player.set_event_callback(event_callback(move |e| events_clone.lock().push(e)));

    player.on_drained();

    let events = events.lock();
    assert!(events
        .iter()
        .any(|e| matches!(e, StreamEvent::Underrun { count: 1 })));
    assert!(events
        .iter()
        .any(|e| matches!(e, StreamEvent::ThresholdsGrown { .. })));
}
