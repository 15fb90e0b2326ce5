use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec,
};

lazy_static! {
    /// Feed requests by mode (home, explore, saved, search).
    pub static ref FEED_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "feed_requests_total",
        "Total feed requests segmented by mode",
        &["mode"]
    )
    .expect("failed to register feed_requests_total");

    pub static ref FEED_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "feed_request_duration_seconds",
        "Feed composition duration segmented by mode",
        &["mode"]
    )
    .expect("failed to register feed_request_duration_seconds");

    /// Number of posts returned per page.
    pub static ref FEED_PAGE_SIZE: HistogramVec = register_histogram_vec!(
        "feed_page_size",
        "Posts returned per feed page segmented by mode",
        &["mode"],
        vec![0.0, 1.0, 5.0, 10.0, 20.0, 30.0, 50.0]
    )
    .expect("failed to register feed_page_size");

    /// Like/save/follow/comment mutations by outcome (created, removed, conflict, noop).
    pub static ref INTERACTION_EVENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "interaction_events_total",
        "Interaction mutations segmented by action and outcome",
        &["action", "outcome"]
    )
    .expect("failed to register interaction_events_total");

    pub static ref NOTIFICATIONS_CREATED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "notifications_created_total",
        "Notifications created segmented by kind",
        &["kind"]
    )
    .expect("failed to register notifications_created_total");
}

pub fn record_feed(mode: &str, seconds: f64, returned: usize) {
    FEED_REQUESTS_TOTAL.with_label_values(&[mode]).inc();
    FEED_REQUEST_DURATION_SECONDS
        .with_label_values(&[mode])
        .observe(seconds);
    FEED_PAGE_SIZE
        .with_label_values(&[mode])
        .observe(returned as f64);
}

pub fn record_interaction(action: &str, outcome: &str) {
    INTERACTION_EVENTS_TOTAL
        .with_label_values(&[action, outcome])
        .inc();
}

pub fn record_notification(kind: &str) {
    NOTIFICATIONS_CREATED_TOTAL.with_label_values(&[kind]).inc();
}
