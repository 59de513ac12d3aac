use super::*;

const EMAIL_A: &str = "a@example.com";
const EMAIL_B: &str = "b@example.com";

// =============================================================================
// per-email limit
// =============================================================================

#[test]
fn allows_up_to_per_email_limit() {
    let limiter = RateLimiter::new();
    let now = Instant::now();

    for _ in 0..DEFAULT_PER_EMAIL_LIMIT {
        assert!(limiter.check_and_record_at(EMAIL_A, now).is_ok());
    }
    let denied = limiter.check_and_record_at(EMAIL_A, now);
    assert!(matches!(denied, Err(RateLimitError::PerEmailExceeded { .. })));
}

#[test]
fn per_email_denial_does_not_block_other_addresses() {
    let limiter = RateLimiter::new();
    let now = Instant::now();

    for _ in 0..DEFAULT_PER_EMAIL_LIMIT {
        limiter.check_and_record_at(EMAIL_A, now).unwrap();
    }
    assert!(limiter.check_and_record_at(EMAIL_A, now).is_err());
    assert!(limiter.check_and_record_at(EMAIL_B, now).is_ok());
}

#[test]
fn addresses_are_limited_independently() {
    let limiter = RateLimiter::new();
    let now = Instant::now();

    for _ in 0..DEFAULT_PER_EMAIL_LIMIT {
        limiter.check_and_record_at(EMAIL_A, now).unwrap();
    }
    assert!(limiter.check_and_record_at(EMAIL_B, now).is_ok());
}

#[test]
fn window_expiry_frees_the_address() {
    let limiter = RateLimiter::new();
    let start = Instant::now();

    for _ in 0..DEFAULT_PER_EMAIL_LIMIT {
        limiter.check_and_record_at(EMAIL_A, start).unwrap();
    }
    assert!(limiter.check_and_record_at(EMAIL_A, start).is_err());

    let later = start + Duration::from_secs(DEFAULT_PER_EMAIL_WINDOW_SECS + 1);
    assert!(limiter.check_and_record_at(EMAIL_A, later).is_ok());
}

// =============================================================================
// global limit
// =============================================================================

#[test]
fn global_limit_caps_across_addresses() {
    let limiter = RateLimiter::new();
    let now = Instant::now();

    let mut accepted = 0usize;
    for i in 0..DEFAULT_GLOBAL_LIMIT + 5 {
        // Spread over many addresses so the per-email limit never trips.
        let email = format!("user{i}@example.com");
        if limiter.check_and_record_at(&email, now).is_ok() {
            accepted += 1;
        }
    }
    assert_eq!(accepted, DEFAULT_GLOBAL_LIMIT);

    let denied = limiter.check_and_record_at("late@example.com", now);
    assert!(matches!(denied, Err(RateLimitError::GlobalExceeded { .. })));
}

#[test]
fn global_window_expiry_reopens_the_gate() {
    let limiter = RateLimiter::new();
    let start = Instant::now();

    for i in 0..DEFAULT_GLOBAL_LIMIT {
        limiter
            .check_and_record_at(&format!("user{i}@example.com"), start)
            .unwrap();
    }
    assert!(limiter.check_and_record_at("late@example.com", start).is_err());

    let later = start + Duration::from_secs(DEFAULT_GLOBAL_WINDOW_SECS + 1);
    assert!(limiter.check_and_record_at("late@example.com", later).is_ok());
}

// =============================================================================
// errors
// =============================================================================

#[test]
fn error_messages_name_the_window() {
    let err = RateLimitError::PerEmailExceeded { limit: 3, window_secs: 600 };
    assert!(err.to_string().contains("3"));
    assert!(err.to_string().contains("600"));
}
