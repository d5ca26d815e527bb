use sla_core::config::EngineConfig;
use sla_core::domain::TimeWindow;
use sla_core::engine::resolve_window;
use sla_core::period::{resolve_range, BusinessCalendar, PeriodRequest};

const JAN_2026: i64 = 1_767_225_600;
const FEB_2026: i64 = 1_769_904_000;

fn calendar_for(timezone: &str, start: u32, end: u32, step: u32) -> BusinessCalendar {
    EngineConfig {
        timezone: timezone.to_string(),
        business_start_hour: start,
        business_end_hour: end,
        shift_step_minutes: step,
        ..EngineConfig::default()
    }
    .calendar()
    .expect("calendar")
}

#[test]
fn past_month_resolves_to_full_utc_month() {
    let cal = calendar_for("UTC", 7, 24, 5);
    let w = cal.resolve_period("2026-01", FEB_2026 + 10 * 86_400).expect("period");
    assert_eq!(
        w,
        TimeWindow {
            start: JAN_2026,
            end: FEB_2026
        }
    );
}

#[test]
fn month_boundaries_follow_configured_timezone() {
    // America/Sao_Paulo is a fixed UTC-03:00 in 2026.
    let cal = calendar_for("America/Sao_Paulo", 7, 24, 5);
    let w = cal.resolve_period("2026-03", 1_800_000_000).expect("period");
    assert_eq!(w.start, 1_772_334_000);
    assert_eq!(w.end, 1_775_012_400);

    let day = cal.resolve_period("2026-03-15", 1_800_000_000).expect("day");
    assert_eq!(day.start, 1_773_543_600);
    assert_eq!(day.end, 1_773_630_000);
}

#[test]
fn current_period_is_clamped_to_now() {
    let cal = calendar_for("UTC", 7, 24, 5);
    let now = JAN_2026 + 3 * 86_400 + 123;
    let w = cal.resolve_period("2026-01", now).expect("period");
    assert_eq!(w.start, JAN_2026);
    assert_eq!(w.end, now);
}

#[test]
fn future_period_resolves_to_empty_window() {
    let cal = calendar_for("UTC", 7, 24, 5);
    let w = cal.resolve_period("2026-02", JAN_2026).expect("period");
    assert_eq!(w.start, FEB_2026);
    assert_eq!(w.length(), 0);
}

#[test]
fn unparsable_tokens_fail_with_invalid_period() {
    let cal = calendar_for("UTC", 7, 24, 5);
    for token in ["", "2026", "2026-13", "2026-00", "26-01", "2026/01", "2026-02-30", "abc", "2026-01-01-01"] {
        let err = cal.resolve_period(token, FEB_2026).expect_err(token);
        assert_eq!(err.code, "PERIOD_INVALID", "token={token}");
    }
}

#[test]
fn invalid_period_is_reported_before_any_fetch() {
    let config = EngineConfig::default();
    let err = resolve_window(
        &config,
        &PeriodRequest::Calendar {
            token: "last-month".to_string(),
        },
        FEB_2026,
    )
    .expect_err("invalid");
    assert_eq!(err.code, "PERIOD_INVALID");
}

#[test]
fn explicit_range_requires_ordered_bounds_and_clamps_to_now() {
    assert_eq!(resolve_range(10, 10, 100).expect_err("empty").code, "PERIOD_INVALID");
    assert_eq!(resolve_range(20, 10, 100).expect_err("inverted").code, "PERIOD_INVALID");
    assert_eq!(
        resolve_range(10, 500, 100).expect("range"),
        TimeWindow { start: 10, end: 100 }
    );
}

#[test]
fn explicit_range_rejects_boundaries_before_the_epoch() {
    let err = resolve_range(i64::MIN + 10, 0, FEB_2026).expect_err("negative start");
    assert_eq!(err.code, "PERIOD_INVALID");
    assert_eq!(resolve_range(-1, 10, 100).expect_err("negative").code, "PERIOD_INVALID");
    assert_eq!(
        resolve_range(0, 10, 100).expect("epoch"),
        TimeWindow { start: 0, end: 10 }
    );
}

#[test]
fn windows_longer_than_the_configured_maximum_are_rejected() {
    let config = EngineConfig {
        max_period_days: 31,
        ..EngineConfig::default()
    };
    let err = resolve_window(
        &config,
        &PeriodRequest::Range {
            start: 0,
            end: FEB_2026,
        },
        FEB_2026,
    )
    .expect_err("too long");
    assert_eq!(err.code, "PERIOD_INVALID");

    let month = resolve_window(
        &config,
        &PeriodRequest::Range {
            start: FEB_2026 - 31 * 86_400,
            end: FEB_2026,
        },
        FEB_2026,
    )
    .expect("exactly the maximum");
    assert_eq!(month.length(), 31 * 86_400);

    let zero = EngineConfig {
        max_period_days: 0,
        ..EngineConfig::default()
    };
    assert_eq!(zero.validate().expect_err("zero").code, "CONFIG_INVALID");
}

#[test]
fn unknown_timezone_is_a_config_error() {
    let config = EngineConfig {
        timezone: "Mars/Olympus_Mons".to_string(),
        ..EngineConfig::default()
    };
    assert_eq!(config.calendar().expect_err("tz").code, "CONFIG_INVALID");

    let config = EngineConfig {
        shift_step_minutes: 0,
        ..EngineConfig::default()
    };
    assert_eq!(config.validate().expect_err("step").code, "CONFIG_INVALID");
}

#[test]
fn split_counts_business_hours_in_local_time() {
    // 06:00-08:00 UTC with business starting at 07:00.
    let cal = calendar_for("UTC", 7, 24, 5);
    let split = cal.split_by_shift(JAN_2026 + 6 * 3600, JAN_2026 + 8 * 3600);
    assert_eq!(split.business, 3600);
    assert_eq!(split.off, 3600);

    // Same UTC span is 03:00-05:00 in Sao Paulo: all off-hours.
    let cal = calendar_for("America/Sao_Paulo", 7, 24, 5);
    let split = cal.split_by_shift(JAN_2026 + 6 * 3600, JAN_2026 + 8 * 3600);
    assert_eq!(split.business, 0);
    assert_eq!(split.off, 7200);
}

#[test]
fn end_hour_24_runs_through_midnight() {
    let cal = calendar_for("UTC", 7, 24, 5);
    let split = cal.split_by_shift(JAN_2026 + 23 * 3600, JAN_2026 + 25 * 3600);
    assert_eq!(split.business, 3600);
    assert_eq!(split.off, 3600);
}

#[test]
fn business_plus_off_equals_total_for_any_step() {
    for step in [1u32, 5, 7, 15, 60, 1440] {
        let cal = calendar_for("Europe/Berlin", 8, 18, step);
        for i in 0..50i64 {
            // Deterministic spread of starts and lengths, including partial trailing slices.
            let start = JAN_2026 + (i * 7919) % 86_400 + i * 3_600;
            let len = (i * 104_729) % 20_000 + i;
            let split = cal.split_by_shift(start, start + len);
            assert_eq!(split.business + split.off, len, "step={step} i={i}");
        }
    }
}

#[test]
fn split_error_is_bounded_by_one_step_per_crossing() {
    // 06:58 -> 07:30 with 5 minute slices: the 06:58 slice is classified off-hours.
    let cal = calendar_for("UTC", 7, 24, 5);
    let start = JAN_2026 + 6 * 3600 + 58 * 60;
    let split = cal.split_by_shift(start, JAN_2026 + 7 * 3600 + 30 * 60);
    let exact_business = 30 * 60;
    assert!((split.business - exact_business).abs() <= 5 * 60);
    assert_eq!(split.total(), 32 * 60);
}

#[test]
fn local_timestamps_are_formatted_in_configured_zone() {
    let cal = calendar_for("America/Sao_Paulo", 7, 24, 5);
    assert_eq!(cal.format_local(JAN_2026), "2025-12-31 21:00:00");
}
