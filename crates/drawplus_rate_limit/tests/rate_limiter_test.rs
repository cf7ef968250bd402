//! Tests for the sliding-window rate limiter.

use drawplus_rate_limit::{RateLimitConfig, RateLimitErrorKind, RateLimiter};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_allows_up_to_max_then_rejects() {
    let limiter = RateLimiter::new(RateLimitConfig::new(3, 60));

    for _ in 0..3 {
        assert!(limiter.check_and_record("user-1").allowed());
    }

    let denied = limiter.check_and_record("user-1");
    assert!(!denied.allowed());
    assert_eq!(denied.retry_after_secs(), 60);
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_counts_from_oldest_request() {
    let limiter = RateLimiter::new(RateLimitConfig::new(2, 60));

    assert!(limiter.check_and_record("group-7").allowed());
    tokio::time::advance(Duration::from_secs(20)).await;
    assert!(limiter.check_and_record("group-7").allowed());
    tokio::time::advance(Duration::from_millis(5_500)).await;

    // Oldest request is 25.5s old, so 34.5s remain -> rounded up to 35
    let denied = limiter.check_and_record("group-7");
    assert!(!denied.allowed());
    assert_eq!(denied.retry_after_secs(), 35);
}

#[tokio::test(start_paused = true)]
async fn test_window_slides() {
    let limiter = RateLimiter::new(RateLimitConfig::new(2, 10));

    assert!(limiter.check_and_record("user").allowed());
    tokio::time::advance(Duration::from_secs(6)).await;
    assert!(limiter.check_and_record("user").allowed());
    assert!(!limiter.check_and_record("user").allowed());

    // First request leaves the window, second one is still inside
    tokio::time::advance(Duration::from_secs(5)).await;
    assert!(limiter.check_and_record("user").allowed());
    assert!(!limiter.check_and_record("user").allowed());
}

#[tokio::test(start_paused = true)]
async fn test_rejected_attempts_are_not_recorded() {
    let limiter = RateLimiter::new(RateLimitConfig::new(1, 10));

    assert!(limiter.check_and_record("user").allowed());
    for _ in 0..5 {
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!limiter.check_and_record("user").allowed());
    }

    // Only the admitted request counts, so the caller is free after 10s total
    tokio::time::advance(Duration::from_secs(5)).await;
    assert!(limiter.check_and_record("user").allowed());
}

#[tokio::test(start_paused = true)]
async fn test_recorded_requests_never_exceed_max_in_any_window() {
    let max = 4u32;
    let window = Duration::from_secs(30);
    let limiter = RateLimiter::new(RateLimitConfig::new(max, window.as_secs()));
    let mut admitted: Vec<tokio::time::Instant> = Vec::new();

    for _ in 0..200 {
        if limiter.check_and_record("busy").allowed() {
            admitted.push(tokio::time::Instant::now());
        }
        tokio::time::advance(Duration::from_millis(1_700)).await;
    }

    assert!(!admitted.is_empty());
    for (i, start) in admitted.iter().enumerate() {
        let in_window = admitted[i..]
            .iter()
            .take_while(|t| t.duration_since(*start) < window)
            .count();
        assert!(in_window <= max as usize);
    }
}

#[tokio::test(start_paused = true)]
async fn test_callers_are_independent() {
    let limiter = RateLimiter::new(RateLimitConfig::new(1, 60));

    assert!(limiter.check_and_record("group-a").allowed());
    assert!(!limiter.check_and_record("group-a").allowed());
    assert!(limiter.check_and_record("group-b").allowed());
    assert_eq!(limiter.tracked_callers(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_idle_callers_are_swept_after_cleanup_interval() {
    let config = RateLimitConfig::new(5, 10).with_cleanup_interval_secs(30);
    let limiter = RateLimiter::new(config);

    for i in 0..20 {
        limiter.check_and_record(&format!("one-off-{}", i));
    }
    assert_eq!(limiter.tracked_callers(), 20);

    // Histories expired but the sweep interval has not elapsed yet
    tokio::time::advance(Duration::from_secs(15)).await;
    limiter.check_and_record("regular");
    assert_eq!(limiter.tracked_callers(), 21);

    tokio::time::advance(Duration::from_secs(16)).await;
    limiter.check_and_record("regular");
    assert_eq!(limiter.tracked_callers(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_manual_sweep_reports_removed_callers() {
    let limiter = RateLimiter::new(RateLimitConfig::new(5, 10));
    limiter.check_and_record("a");
    limiter.check_and_record("b");

    tokio::time::advance(Duration::from_secs(11)).await;
    assert_eq!(limiter.sweep(), 2);
    assert_eq!(limiter.tracked_callers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_update_config_keeps_history() {
    let limiter = RateLimiter::new(RateLimitConfig::new(5, 60));
    for _ in 0..3 {
        assert!(limiter.check_and_record("user").allowed());
    }

    limiter
        .update_config(RateLimitConfig::new(3, 60))
        .expect("valid config");
    assert_eq!(*limiter.config().max_requests(), 3);
    assert!(!limiter.check_and_record("user").allowed());

    limiter
        .update_config(RateLimitConfig::new(4, 60))
        .expect("valid config");
    assert!(limiter.check_and_record("user").allowed());
}

#[tokio::test(start_paused = true)]
async fn test_update_config_rejects_zero_limits() {
    let limiter = RateLimiter::new(RateLimitConfig::new(2, 60));

    let err = limiter
        .update_config(RateLimitConfig::new(0, 60))
        .unwrap_err();
    assert!(matches!(err.kind(), RateLimitErrorKind::Config(_)));
    assert_eq!(*limiter.config().max_requests(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_check_returns_limit_exceeded_error() {
    let limiter = RateLimiter::new(RateLimitConfig::new(1, 60));
    limiter.check("user").expect("first request allowed");

    let err = limiter.check("user").unwrap_err();
    match err.kind() {
        RateLimitErrorKind::LimitExceeded {
            caller,
            retry_after_secs,
        } => {
            assert_eq!(caller, "user");
            assert!(*retry_after_secs > 0);
        }
        other => panic!("unexpected error kind: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_reset_clears_caller() {
    let limiter = RateLimiter::new(RateLimitConfig::new(1, 60));
    assert!(limiter.check_and_record("user").allowed());
    limiter.reset("user");
    assert!(limiter.check_and_record("user").allowed());
}
