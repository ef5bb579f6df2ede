// Speaker stream multiplexer: pipeline lifecycle per participant and
// append-interleaving of concurrent speakers into one capture file.

mod common;

use anyhow::Result;
use common::{silence, wait_until, Harness, RejectingFactory, UNDECODABLE};
use std::sync::Arc;

#[tokio::test]
async fn duplicate_speaking_start_tracks_one_pipeline() -> Result<()> {
    let h = Harness::new()?;
    let session = h.manager.get_or_create("guild-a").await;
    session.join("general").await?;
    session.start_recording().await?;

    let handle = h.voice.handle("general").expect("loopback handle");
    handle.speaking_started(7).await;
    handle.speaking_started(7).await;
    handle.speaking_started(7).await;

    assert!(wait_until(|| async { session.status().await.active_speakers == 1 }).await);
    // Give any (incorrect) second pipeline a chance to appear.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(session.status().await.active_speakers, 1);
    Ok(())
}

#[tokio::test]
async fn speaking_end_releases_pipeline() -> Result<()> {
    let h = Harness::new()?;
    let session = h.manager.get_or_create("guild-a").await;
    session.join("general").await?;
    session.start_recording().await?;

    let handle = h.voice.handle("general").expect("loopback handle");
    handle.speaking_started(7).await;
    assert!(wait_until(|| async { session.status().await.active_speakers == 1 }).await);

    handle.speaking_ended(7).await;
    assert!(wait_until(|| async { session.status().await.active_speakers == 0 }).await);

    // A fresh start signal opens a fresh pipeline.
    handle.speaking_started(7).await;
    assert!(wait_until(|| async { session.status().await.active_speakers == 1 }).await);
    Ok(())
}

#[tokio::test]
async fn speaker_events_are_noops_while_idle() -> Result<()> {
    let h = Harness::new()?;
    let session = h.manager.get_or_create("guild-a").await;
    session.join("general").await?;

    let handle = h.voice.handle("general").expect("loopback handle");
    handle.speaking_started(7).await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(session.status().await.active_speakers, 0);
    Ok(())
}

#[tokio::test]
async fn concurrent_speakers_append_into_one_file() -> Result<()> {
    let h = Harness::new()?;
    let session = h.manager.get_or_create("guild-a").await;
    session.join("general").await?;
    session.start_recording().await?;

    let handle = h.voice.handle("general").expect("loopback handle");
    handle.speaking_started(1).await;
    handle.speaking_started(2).await;
    assert!(wait_until(|| async { session.status().await.active_speakers == 2 }).await);

    // Distinct byte patterns per speaker; three whole-buffer appends each.
    let chunk_a = vec![0x11u8; 9600];
    let chunk_b = vec![0x22u8; 9600];
    for _ in 0..3 {
        handle.send_frame(1, chunk_a.clone()).await;
        handle.send_frame(2, chunk_b.clone()).await;
    }

    let path = h.capture_path("guild-a", 1);
    let expected = (chunk_a.len() + chunk_b.len()) as u64 * 3;
    assert!(
        wait_until(|| {
            let path = path.clone();
            async move { std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0) == expected }
        })
        .await,
        "both speakers' chunks end up in the shared capture file"
    );

    let bytes = std::fs::read(&path)?;
    let from_a = bytes.iter().filter(|&&b| b == 0x11).count();
    let from_b = bytes.iter().filter(|&&b| b == 0x22).count();
    assert_eq!(from_a, chunk_a.len() * 3);
    assert_eq!(from_b, chunk_b.len() * 3);

    // Chunks never interleave within themselves: every aligned 9600-byte
    // run is single-valued.
    for run in bytes.chunks_exact(9600) {
        assert!(run.iter().all(|&b| b == run[0]));
    }

    session.stop_recording().await?;
    Ok(())
}

#[tokio::test]
async fn decode_failure_is_isolated_to_one_speaker() -> Result<()> {
    let h = Harness::with_decoders(Arc::new(RejectingFactory))?;
    let session = h.manager.get_or_create("guild-a").await;
    session.join("general").await?;
    session.start_recording().await?;

    let handle = h.voice.handle("general").expect("loopback handle");
    handle.speaking_started(1).await;
    handle.speaking_started(2).await;
    assert!(wait_until(|| async { session.status().await.active_speakers == 2 }).await);

    // Speaker 1's frame fails to decode, tearing down its own task only.
    handle.send_frame(1, vec![UNDECODABLE; 9600]).await;

    let good = vec![0x22u8; 9600];
    for _ in 0..3 {
        handle.send_frame(2, good.clone()).await;
    }

    let path = h.capture_path("guild-a", 1);
    let expected = (good.len() * 3) as u64;
    assert!(
        wait_until(|| {
            let path = path.clone();
            async move { std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0) >= expected }
        })
        .await,
        "healthy speaker keeps appending past the other's decode failure"
    );

    let bytes = std::fs::read(&path)?;
    assert_eq!(bytes.len(), good.len() * 3);
    assert!(
        bytes.iter().all(|&b| b == 0x22),
        "the failed speaker contributes nothing to the capture"
    );

    // The dead pipeline stays tracked until its speaking-end signal; the
    // session itself carries on and stops cleanly.
    assert_eq!(session.status().await.active_speakers, 2);
    let (segment, _) = session.stop_recording().await?;
    assert_eq!(segment, 1);
    assert!(session.status().await.connected);
    Ok(())
}

#[tokio::test]
async fn stop_recording_clears_pipelines_and_monitor() -> Result<()> {
    let h = Harness::new()?;
    let session = h.manager.get_or_create("guild-a").await;
    session.join("general").await?;
    session.start_recording().await?;

    let handle = h.voice.handle("general").expect("loopback handle");
    handle.speaking_started(1).await;
    handle.speaking_started(2).await;
    assert!(wait_until(|| async { session.status().await.active_speakers == 2 }).await);

    session.stop_recording().await?;

    let status = session.status().await;
    assert_eq!(status.active_speakers, 0);
    assert!(!status.inactivity_monitor);
    Ok(())
}
