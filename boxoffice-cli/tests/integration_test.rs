use boxoffice_catalog::VenueCatalog;
use boxoffice_cli::handle_line;
use boxoffice_core::app_config::HoldSettings;
use boxoffice_core::ManualClock;
use boxoffice_order::ReservationService;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_console_session_with_live_sweeper() {
    let clock = Arc::new(ManualClock::default());
    let settings = HoldSettings { ttl_seconds: 120, sweep_interval_ms: 10 };
    let service = ReservationService::start(VenueCatalog::default(), settings, clock.clone());

    // 1. Hold and confirm ten seats
    let (held, _) = handle_line(&service, "hold 10 fan@example.com");
    let hold_id = held["id"].as_u64().unwrap();
    let (reserved, _) = handle_line(&service, &format!("reserve {} fan@example.com", hold_id));
    assert!(reserved["reservation_id"].is_string());

    // 2. Hold thirty more and let them lapse
    let (second, _) = handle_line(&service, "hold 30 other@example.com 3 4");
    assert_eq!(second["level_id"], 3);
    let (available, _) = handle_line(&service, "available");
    assert_eq!(available["available"], 6210);

    clock.advance(chrono::Duration::seconds(121));
    let mut restored = false;
    for _ in 0..300 {
        let (available, _) = handle_line(&service, "available");
        if available["available"] == 6240 {
            restored = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(restored, "expired hold was never swept");

    // 3. The lapsed hold can no longer be confirmed
    let second_id = second["id"].as_u64().unwrap();
    let (response, _) = handle_line(&service, &format!("reserve {} other@example.com", second_id));
    assert_eq!(response["error"], "HOLD_NOT_FOUND");

    let (_, done) = handle_line(&service, "quit");
    assert!(done);
    tokio::time::timeout(Duration::from_secs(2), service.shutdown())
        .await
        .expect("sweeper should stop");
}
