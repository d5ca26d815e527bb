mod common;

use common::*;
use pretty_assertions::assert_eq;
use sla_core::classify::AlertType;
use sla_core::config::EngineConfig;
use sla_core::reachability::{build_reachability_report, paginate, sort_rows};
use sla_core::report::{format_duration_seconds, reachability_csv, write_reachability_csv};
use sla_core::scope::ReportScope;
use sla_core::source::Dataset;

fn estate() -> Dataset {
    let mut ds = dataset(
        vec![group("g1", "Core"), group("g2", "Edge")],
        vec![
            host("h1", "router-1", &["g1"]),
            host("h2", "switch-2", &["g1", "g2"]),
            host("h3", "ap-3", &["g2"]),
        ],
    );

    let mut ping = incident("e1", T0 + 100, 4, &["h1"]);
    icmp_trigger(&mut ds, &ping);
    recover(&mut ds, &mut ping, T0 + 400);

    let agent = with_name(incident("e2", T0 + 200, 3, &["h2"]), "Zabbix agent is not available");

    let disk = with_name(incident("e3", T0 + 50, 2, &["h3"]), "Disk space is low");

    let mut uptime = with_name(incident("e4", T0 + 600, 2, &["h3"]), "Host has been restarted");
    recover(&mut ds, &mut uptime, T0 + 700);

    ds.incidents = vec![ping, agent, disk, uptime];
    ds
}

#[test]
fn only_reachability_incidents_are_listed() {
    let ds = estate();
    let report = build_reachability_report(
        &ds,
        &EngineConfig::default(),
        window(T0, T0 + 1000),
        &ReportScope::Global,
    )
    .expect("report");

    let ids: Vec<&str> = report.rows.iter().map(|r| r.event_id.as_str()).collect();
    // Window downtime desc: e2 (800s, open), e1 (300s), e4 (100s).
    assert_eq!(ids, vec!["e2", "e1", "e4"]);
    assert_eq!(report.summary.incident_count, 3);
    assert_eq!(report.summary.open_incident_count, 1);

    let ping = &report.rows[1];
    assert_eq!(ping.alert_type, AlertType::Icmp);
    assert_eq!(ping.item_keys, vec!["icmpping".to_string()]);
    assert_eq!(ping.host_names, vec!["router-1".to_string()]);
    assert_eq!(ping.opened_at, Some(T0 + 100));
    assert_eq!(ping.closed_at, Some(T0 + 400));
    assert_eq!(ping.severity_label, "High");
    assert!(!ping.is_open);

    let agent = &report.rows[0];
    assert_eq!(agent.alert_type, AlertType::Agent);
    assert!(agent.is_open);
    assert_eq!(agent.total_downtime_seconds, 800);
}

#[test]
fn allow_list_narrows_the_report() {
    let ds = estate();
    let config = EngineConfig {
        reachability_types: vec!["icmp".to_string()],
        ..EngineConfig::default()
    };
    let report =
        build_reachability_report(&ds, &config, window(T0, T0 + 1000), &ReportScope::Global)
            .expect("report");
    let ids: Vec<&str> = report.rows.iter().map(|r| r.event_id.as_str()).collect();
    assert_eq!(ids, vec!["e1"]);
}

#[test]
fn all_groups_scope_emits_one_row_per_group() {
    let ds = estate();
    let report = build_reachability_report(
        &ds,
        &EngineConfig::default(),
        window(T0, T0 + 1000),
        &ReportScope::AllGroups,
    )
    .expect("report");

    let rows: Vec<(&str, Option<&str>)> = report
        .rows
        .iter()
        .map(|r| (r.event_id.as_str(), r.group_name.as_deref()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("e2", Some("Core")),
            ("e2", Some("Edge")),
            ("e1", Some("Core")),
            ("e4", Some("Edge")),
        ]
    );
    // The summary still counts each incident once.
    assert_eq!(report.summary.incident_count, 3);
}

#[test]
fn group_scope_labels_rows_with_the_group() {
    let ds = estate();
    let report = build_reachability_report(
        &ds,
        &EngineConfig::default(),
        window(T0, T0 + 1000),
        &ReportScope::Group {
            group_id: "g2".to_string(),
        },
    )
    .expect("report");
    let rows: Vec<(&str, Option<&str>)> = report
        .rows
        .iter()
        .map(|r| (r.event_id.as_str(), r.group_name.as_deref()))
        .collect();
    assert_eq!(rows, vec![("e2", Some("Edge")), ("e4", Some("Edge"))]);
}

#[test]
fn reachability_availability_pools_active_hosts() {
    let ds = estate();
    let report = build_reachability_report(
        &ds,
        &EngineConfig::default(),
        window(T0, T0 + 1000),
        &ReportScope::Global,
    )
    .expect("report");
    // 300 + 800 + 100 seconds over 3 hosts x 1000 seconds.
    assert_close(report.summary.availability.overall, 100.0 * (3000.0 - 1200.0) / 3000.0);
    assert_close(report.summary.downtime.total, 1200.0 / 60.0);
}

#[test]
fn ties_break_on_most_recent_start() {
    let mut ds = estate();
    ds.incidents.clear();
    for (id, clock) in [("a", T0 + 100), ("b", T0 + 300), ("c", T0 + 200)] {
        let mut e = with_name(incident(id, clock, 3, &["h1"]), "ICMP ping loss");
        recover(&mut ds, &mut e, clock + 50);
        ds.incidents.push(e);
    }
    let report = build_reachability_report(
        &ds,
        &EngineConfig::default(),
        window(T0, T0 + 1000),
        &ReportScope::Global,
    )
    .expect("report");
    let ids: Vec<&str> = report.rows.iter().map(|r| r.event_id.as_str()).collect();
    assert_eq!(ids, vec!["b", "c", "a"]);

    let mut shuffled = report.rows.clone();
    shuffled.reverse();
    sort_rows(&mut shuffled);
    assert_eq!(shuffled, report.rows);
}

#[test]
fn pagination_covers_every_row_exactly_once() {
    let items: Vec<u32> = (0..23).collect();
    for page_size in 1..30usize {
        let first = paginate(&items, 1, page_size);
        let mut seen = Vec::new();
        for page in 1..=first.pages {
            let p = paginate(&items, page, page_size);
            assert!(p.items.len() <= page_size);
            assert_eq!(p.total, 23);
            seen.extend(p.items);
        }
        assert_eq!(seen, items, "page_size={page_size}");
        assert_eq!(first.pages, 23usize.div_ceil(page_size));
    }
}

#[test]
fn pagination_clamps_out_of_range_pages() {
    let items: Vec<u32> = (0..5).collect();
    let p = paginate(&items, 99, 2);
    assert_eq!(p.page, 3);
    assert_eq!(p.items, vec![4]);

    let p = paginate(&items, 0, 2);
    assert_eq!(p.page, 1);

    let empty: Vec<u32> = Vec::new();
    let p = paginate(&empty, 4, 10);
    assert_eq!(p.pages, 1);
    assert_eq!(p.page, 1);
    assert!(p.items.is_empty());
}

#[test]
fn report_page_keeps_summary() {
    let ds = estate();
    let report = build_reachability_report(
        &ds,
        &EngineConfig::default(),
        window(T0, T0 + 1000),
        &ReportScope::Global,
    )
    .expect("report");
    let page = report.page(2, 2);
    assert_eq!(page.page.items.len(), 1);
    assert_eq!(page.page.items[0].event_id, "e4");
    assert_eq!(page.summary, report.summary);
}

#[test]
fn durations_are_human_readable() {
    assert_eq!(format_duration_seconds(None), "UNKNOWN");
    assert_eq!(format_duration_seconds(Some(42)), "42s");
    assert_eq!(format_duration_seconds(Some(125)), "2m 5s");
    assert_eq!(format_duration_seconds(Some(2 * 3600 + 15 * 60)), "2h 15m");
    assert_eq!(format_duration_seconds(Some(3 * 86_400 + 4 * 3600)), "3d 4h");
    assert_eq!(format_duration_seconds(Some(-5)), "0s");
}

#[test]
fn csv_export_uses_local_time() {
    let ds = estate();
    let config = EngineConfig {
        timezone: "America/Sao_Paulo".to_string(),
        ..EngineConfig::default()
    };
    let report =
        build_reachability_report(&ds, &config, window(T0, T0 + 1000), &ReportScope::Global)
            .expect("report");
    let calendar = config.calendar().expect("calendar");
    let csv = reachability_csv(&report.rows, &calendar).expect("csv");

    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("event_id,name,severity,alert_type,item_keys,hosts,group,opened_at,closed_at,window_downtime,total_downtime,status")
    );
    let agent = lines.next().expect("row");
    assert!(agent.starts_with("e2,Zabbix agent is not available,Average,Agent,"));
    assert!(agent.ends_with(",13m 20s,13m 20s,open"));
    let ping = lines.next().expect("row");
    assert!(ping.contains("2025-12-31 21:01:40,2025-12-31 21:06:40"));
    assert!(ping.ends_with("resolved"));
}

#[test]
fn csv_export_writes_file() {
    let ds = estate();
    let config = EngineConfig::default();
    let report =
        build_reachability_report(&ds, &config, window(T0, T0 + 1000), &ReportScope::Global)
            .expect("report");
    let calendar = config.calendar().expect("calendar");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("reachability.csv");
    write_reachability_csv(&path, &report.rows, &calendar).expect("write");

    let mut rdr = csv::Reader::from_path(&path).expect("read");
    let records: Vec<csv::StringRecord> = rdr.records().collect::<Result<_, _>>().expect("records");
    assert_eq!(records.len(), 3);
    assert_eq!(&records[1][3], "ICMP");
    assert_eq!(&records[1][5], "router-1");
}

#[test]
fn csv_export_to_missing_directory_fails() {
    let calendar = EngineConfig::default().calendar().expect("calendar");
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("missing").join("out.csv");
    let err = write_reachability_csv(&path, &[], &calendar).expect_err("should fail");
    assert_eq!(err.code, "REPORT_CSV_FAILED");
}
