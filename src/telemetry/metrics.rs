use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::LazyLock;

pub static METER: LazyLock<Meter> = LazyLock::new(|| global::meter("intake-desk"));

// --- Request service calls ---

pub static API_CALLS_TOTAL: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("intake.api.calls")
        .with_description("Calls made to the request service")
        .with_unit("{call}")
        .build()
});

pub static API_CALL_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("intake.api.call.duration")
        .with_description("Request service call duration in milliseconds")
        .with_unit("ms")
        .with_boundaries(vec![
            5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
        ])
        .build()
});

// --- Domain Metrics ---

pub static REQUESTS_CREATED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("intake.requests.created")
        .with_description("Document requests created")
        .with_unit("{request}")
        .build()
});

pub static MODULES_ATTACHED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("intake.modules.attached")
        .with_description("Modules attached to created requests")
        .with_unit("{module}")
        .build()
});

pub static ATTACHMENT_FAILURES: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("intake.modules.attach_failures")
        .with_description("Modules that could not be attached, including ones not attempted")
        .with_unit("{module}")
        .build()
});
