//! Sector fetch state machine: validation, retry, cancellation.

mod common;

use common::*;
use sdlog_lib::constants::SECTOR_SIZE;
use sdlog_lib::crc::crc32;
use sdlog_lib::device::FetchOutcome;
use sdlog_lib::error::SdlogError;
use sdlog_lib::ProtocolConfig;

#[tokio::test]
async fn valid_sector_on_first_attempt() {
    let payload = [0x5Au8; SECTOR_SIZE];
    let mut transport = MockTransport::new();
    transport.queue_response(&sector_response(&payload, None));

    let mut logger = scripted_logger(transport, ProtocolConfig::default());
    let got = logger.fetch_sector(644).await.expect("fetch");
    assert_eq!(got.as_ref(), &payload[..]);
    assert_eq!(logger.transport().frames_with_opcode(0x01), 1);
}

#[tokio::test]
async fn retries_until_the_checksum_matches() {
    let payload = [0xA5u8; SECTOR_SIZE];
    let mut transport = MockTransport::new();
    transport.queue_response(&sector_response(&payload, Some(corrupted_crc(&payload))));
    transport.queue_response(&sector_response(&payload, Some(corrupted_crc(&payload))));
    transport.queue_response(&sector_response(&payload, None));

    let mut logger = scripted_logger(transport, ProtocolConfig::default());
    let got = logger.fetch_sector(644).await.expect("fetch");

    assert_eq!(got.as_ref(), &payload[..]);
    // Two mismatches plus the validating attempt: exactly three frames sent.
    assert_eq!(logger.transport().frames_with_opcode(0x01), 3);
}

#[tokio::test]
async fn single_attempt_reports_the_mismatch() {
    let payload = [0x11u8; SECTOR_SIZE];
    let bad_crc = corrupted_crc(&payload);
    let mut transport = MockTransport::new();
    transport.queue_response(&sector_response(&payload, Some(bad_crc)));

    let mut logger = scripted_logger(transport, ProtocolConfig::default());
    match logger.read_sector(3).await.expect("read") {
        FetchOutcome::ChecksumMismatch { computed, received } => {
            assert_eq!(computed, crc32(&payload));
            assert_eq!(received, bad_crc);
        }
        FetchOutcome::Valid(_) => panic!("corrupted sector reported valid"),
    }
}

#[tokio::test]
async fn mismatch_converts_to_an_error_with_context() {
    let payload = [0x22u8; SECTOR_SIZE];
    let mut transport = MockTransport::new();
    transport.queue_response(&sector_response(&payload, Some(corrupted_crc(&payload))));

    let mut logger = scripted_logger(transport, ProtocolConfig::default());
    let outcome = logger.read_sector(9).await.expect("read");
    match outcome.into_payload(9) {
        Err(SdlogError::ChecksumMismatch { sector, .. }) => assert_eq!(sector, 9),
        other => panic!("expected ChecksumMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn trailer_is_interpreted_big_endian() {
    // A response whose trailer is the correct CRC serialized little-endian
    // must NOT validate; the inbound direction is big-endian.
    let payload = [0x3Cu8; SECTOR_SIZE];
    let crc = crc32(&payload);
    let mut response = Vec::new();
    response.push(0x00);
    response.extend_from_slice(&payload);
    response.extend_from_slice(&crc.to_le_bytes());

    let mut transport = MockTransport::new();
    transport.queue_response(&response);

    let mut logger = scripted_logger(transport, ProtocolConfig::default());
    match logger.read_sector(0).await.expect("read") {
        FetchOutcome::ChecksumMismatch { computed, received } => {
            assert_eq!(computed, crc);
            assert_eq!(received, crc.swap_bytes());
        }
        FetchOutcome::Valid(_) => panic!("little-endian trailer must not validate"),
    }
}

#[tokio::test]
async fn attempt_ceiling_gives_up() {
    let payload = [0x77u8; SECTOR_SIZE];
    let mut transport = MockTransport::new();
    for _ in 0..2 {
        transport.queue_response(&sector_response(&payload, Some(corrupted_crc(&payload))));
    }

    let config = ProtocolConfig::default().with_max_attempts(2);
    let mut logger = scripted_logger(transport, config);
    match logger.fetch_sector(5).await {
        Err(SdlogError::RetriesExhausted { sector, attempts }) => {
            assert_eq!(sector, 5);
            assert_eq!(attempts, 2);
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
    assert_eq!(logger.transport().frames_with_opcode(0x01), 2);
}

#[tokio::test]
async fn cancellation_stops_the_fetch() {
    let transport = MockTransport::new();
    let mut logger = scripted_logger(transport, ProtocolConfig::default());
    logger.cancel_token().cancel();

    match logger.fetch_sector(0).await {
        Err(SdlogError::Cancelled) => {}
        other => panic!("expected Cancelled, got {other:?}"),
    }
    // Cancellation is observed before any frame goes out.
    assert!(logger.transport().writes.is_empty());
}

#[tokio::test]
async fn short_response_is_fatal_not_retried() {
    let mut transport = MockTransport::new();
    transport.queue_response(&[0x00; 100]);

    let mut logger = scripted_logger(transport, ProtocolConfig::default());
    match logger.fetch_sector(0).await {
        Err(SdlogError::Io(_)) => {}
        other => panic!("expected Io error, got {other:?}"),
    }
    assert_eq!(logger.transport().frames_with_opcode(0x01), 1);
}

#[tokio::test]
async fn quit_sends_the_terminate_frame() {
    let transport = MockTransport::new();
    let mut logger = scripted_logger(transport, ProtocolConfig::default());
    logger.quit().await.expect("quit");

    let writes = &logger.transport().writes;
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0][0], 0x00);
    assert_eq!(writes[0].len(), 9);
}

#[tokio::test]
async fn loopback_counts_mismatches() {
    let mut transport = MockTransport::new();
    // Rounds echo (round % 129) after one discarded byte; corrupt round 2.
    for round in 1u32..=3 {
        transport.queue_response(&[0xFF]);
        let echo = if round == 2 { 0xEE } else { (round % 129) as u8 };
        transport.queue_response(&[echo]);
    }

    let mut logger = scripted_logger(transport, ProtocolConfig::default());
    let errors = logger.loopback_test(3).await.expect("loopback");
    assert_eq!(errors, 1);
}

#[tokio::test]
async fn swapped_opcode_map_changes_the_read_frame() {
    let payload = [0u8; SECTOR_SIZE];
    let mut transport = MockTransport::new();
    transport.queue_response(&sector_response(&payload, None));

    let config = ProtocolConfig::default().with_opcodes(sdlog_lib::frame::OpcodeMap::WRITE_TEST);
    let mut logger = scripted_logger(transport, config);
    logger.fetch_sector(0).await.expect("fetch");

    assert_eq!(logger.transport().frames_with_opcode(0x02), 1);
    assert_eq!(logger.transport().frames_with_opcode(0x01), 0);
}
