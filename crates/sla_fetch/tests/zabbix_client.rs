use mockito::{Matcher, Server, ServerGuard};
use pretty_assertions::assert_eq;
use serde_json::json;
use sla_core::config::EngineConfig;
use sla_core::engine::collect_metrics;
use sla_core::period::PeriodRequest;
use sla_core::scope::ReportScope;
use sla_core::source::{IncidentQuery, IncidentSource};
use sla_fetch::{ZabbixClient, ZabbixConfig};

const T0: i64 = 1_767_225_600;
const RPC: &str = "/api_jsonrpc.php";

fn client(server: &ServerGuard, tweak: impl FnOnce(&mut ZabbixConfig)) -> ZabbixClient {
    let mut config = ZabbixConfig::new(server.url(), "tok");
    config.retry_backoff_ms = 1;
    tweak(&mut config);
    ZabbixClient::new(config).expect("client")
}

fn ok(result: serde_json::Value) -> String {
    json!({"jsonrpc": "2.0", "result": result, "id": 1}).to_string()
}

fn method(name: &str) -> Matcher {
    Matcher::PartialJson(json!({"jsonrpc": "2.0", "method": name}))
}

fn event(id: &str, clock: i64) -> serde_json::Value {
    json!({
        "eventid": id,
        "r_eventid": "0",
        "objectid": "100",
        "name": "Unavailable by ICMP ping",
        "clock": clock.to_string(),
        "severity": "4",
        "hosts": [{"hostid": "10"}],
        "acknowledges": [],
        "tags": []
    })
}

#[test]
fn host_groups_are_fetched_with_bearer_token() {
    let mut server = Server::new();
    let m = server
        .mock("POST", RPC)
        .match_header("authorization", "Bearer tok")
        .match_body(method("hostgroup.get"))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(ok(json!([{"groupid": "2", "name": "Linux servers"}])))
        .create();

    let groups = client(&server, |_| {}).fetch_host_groups().expect("groups");
    m.assert();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].id, "2");
    assert_eq!(groups[0].name, "Linux servers");
}

#[test]
fn rpc_errors_fail_without_retry() {
    let mut server = Server::new();
    let m = server
        .mock("POST", RPC)
        .with_status(200)
        .with_body(
            json!({
                "jsonrpc": "2.0",
                "error": {"code": -32602, "message": "Invalid params.", "data": "Not authorized."},
                "id": 1
            })
            .to_string(),
        )
        .expect(1)
        .create();

    let err = client(&server, |_| {}).fetch_host_groups().expect_err("rpc error");
    m.assert();
    assert_eq!(err.code, "FETCH_RPC_ERROR");
    assert!(!err.retryable);
    assert!(err.details.unwrap_or_default().contains("Not authorized."));
}

#[test]
fn server_errors_are_retried_then_fail() {
    let mut server = Server::new();
    let m = server.mock("POST", RPC).with_status(503).expect(3).create();

    let err = client(&server, |c| c.max_retries = 2)
        .fetch_host_groups()
        .expect_err("unavailable");
    m.assert();
    assert_eq!(err.code, "FETCH_FAILED");
    assert!(err.retryable);
}

#[test]
fn client_errors_are_not_retried() {
    let mut server = Server::new();
    let m = server.mock("POST", RPC).with_status(401).expect(1).create();

    let err = client(&server, |_| {}).fetch_host_groups().expect_err("unauthorized");
    m.assert();
    assert_eq!(err.code, "FETCH_FAILED");
    assert!(!err.retryable);
}

#[test]
fn garbage_payload_is_a_decode_error() {
    let mut server = Server::new();
    let _m = server
        .mock("POST", RPC)
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create();

    let err = client(&server, |_| {}).fetch_host_groups().expect_err("decode");
    assert_eq!(err.code, "FETCH_DECODE_FAILED");
}

#[test]
fn incidents_in_one_second_page_by_event_id() {
    let mut server = Server::new();
    // Created first with a single expected hit: later requests fall through to the
    // cursor-specific mocks below.
    let first = server
        .mock("POST", RPC)
        .match_body(Matcher::PartialJson(json!({
            "method": "event.get",
            "params": {"sortfield": ["eventid"], "sortorder": "DESC", "time_till": T0 + 1000}
        })))
        .with_status(200)
        .with_body(ok(json!([event("4", T0 + 900), event("3", T0 + 500)])))
        .expect(1)
        .create();
    let mut after = |cursor: &str, events: serde_json::Value| {
        server
            .mock("POST", RPC)
            .match_body(Matcher::PartialJson(
                json!({"method": "event.get", "params": {"eventid_till": cursor}}),
            ))
            .with_status(200)
            .with_body(ok(events))
            .expect(1)
            .create()
    };
    let second = after("2", json!([event("3", T0 + 500), event("2", T0 + 500)]));
    let third = after("1", json!([event("1", T0 + 500)]));

    let source = client(&server, |c| c.page_size = 2);
    let batch = source
        .fetch_incidents(&IncidentQuery {
            group_ids: None,
            time_from: T0,
            time_till: T0 + 1000,
        })
        .expect("incidents");

    first.assert();
    second.assert();
    third.assert();
    let ids: Vec<&str> = batch.incidents.iter().map(|i| i.event_id.as_str()).collect();
    assert_eq!(ids, vec!["4", "3", "2", "1"]);
    assert!(batch.warnings.is_empty());
    assert_eq!(batch.incidents[0].clock, Some(T0 + 900));
    assert_eq!(batch.incidents[0].severity, Some(4));
}

#[test]
fn page_limit_is_reported_as_warning() {
    let mut server = Server::new();
    let _m = server
        .mock("POST", RPC)
        .match_body(method("event.get"))
        .with_status(200)
        .with_body(ok(json!([event("3", T0 + 900), event("2", T0 + 800)])))
        .create();

    let source = client(&server, |c| {
        c.page_size = 2;
        c.max_pages = 1;
    });
    let batch = source
        .fetch_incidents(&IncidentQuery {
            group_ids: Some(vec!["2".to_string()]),
            time_from: T0,
            time_till: T0 + 1000,
        })
        .expect("incidents");
    assert_eq!(batch.incidents.len(), 2);
    assert_eq!(batch.warnings.len(), 1);
    assert_eq!(batch.warnings[0].code, "SOURCE_PAGE_LIMIT");
}

#[test]
fn full_page_without_numeric_ids_stops_with_warning() {
    let mut server = Server::new();
    let m = server
        .mock("POST", RPC)
        .match_body(method("event.get"))
        .with_status(200)
        .with_body(ok(json!([event("a", T0 + 900), event("b", T0 + 800)])))
        .expect(1)
        .create();

    let batch = client(&server, |c| c.page_size = 2)
        .fetch_incidents(&IncidentQuery {
            group_ids: None,
            time_from: T0,
            time_till: T0 + 1000,
        })
        .expect("incidents");
    m.assert();
    assert_eq!(batch.incidents.len(), 2);
    let codes: Vec<&str> = batch.warnings.iter().map(|w| w.code.as_str()).collect();
    assert_eq!(codes, vec!["SOURCE_PAGE_STALLED"]);
}

#[test]
fn malformed_event_fields_become_warnings() {
    let mut server = Server::new();
    let mut bad = event("9", T0);
    bad["clock"] = json!("not-a-clock");
    bad["severity"] = json!("11");
    let _m = server
        .mock("POST", RPC)
        .match_body(method("event.get"))
        .with_status(200)
        .with_body(ok(json!([bad])))
        .create();

    let batch = client(&server, |_| {})
        .fetch_incidents(&IncidentQuery {
            group_ids: None,
            time_from: T0,
            time_till: T0 + 1000,
        })
        .expect("incidents");
    assert_eq!(batch.incidents.len(), 1);
    assert_eq!(batch.incidents[0].clock, None);
    assert_eq!(batch.incidents[0].severity, None);
    let codes: Vec<&str> = batch.warnings.iter().map(|w| w.code.as_str()).collect();
    assert_eq!(codes, vec!["SOURCE_CLOCK_MALFORMED", "SOURCE_SEVERITY_MALFORMED"]);
}

#[test]
fn host_lookups_are_batched() {
    let mut server = Server::new();
    let host = |id: &str| {
        json!({
            "hostid": id,
            "host": format!("h-{id}"),
            "name": format!("Host {id}"),
            "status": "0",
            "hostgroups": [{"groupid": "2"}],
            "tags": [{"tag": "site", "value": "north"}],
            "inventory": {"location": "rack 4", "os": ""}
        })
    };
    let first = server
        .mock("POST", RPC)
        .match_body(Matcher::Regex(r#""hostids":\["1","2"\]"#.to_string()))
        .with_status(200)
        .with_body(ok(json!([host("1"), host("2")])))
        .expect(1)
        .create();
    let second = server
        .mock("POST", RPC)
        .match_body(Matcher::Regex(r#""hostids":\["3"\]"#.to_string()))
        .with_status(200)
        .with_body(ok(json!([host("3")])))
        .expect(1)
        .create();

    let ids: Vec<String> = ["1", "2", "3"].iter().map(|s| s.to_string()).collect();
    let hosts = client(&server, |c| c.batch_size = 2)
        .fetch_hosts_by_ids(&ids)
        .expect("hosts");

    first.assert();
    second.assert();
    let names: Vec<&str> = hosts.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, vec!["Host 1", "Host 2", "Host 3"]);
    assert_eq!(hosts[0].group_ids, vec!["2".to_string()]);
    assert_eq!(hosts[0].inventory.get("location").map(String::as_str), Some("rack 4"));
    assert!(!hosts[0].inventory.contains_key("os"));
}

#[test]
fn recovery_events_skip_malformed_clocks() {
    let mut server = Server::new();
    let _m = server
        .mock("POST", RPC)
        .match_body(method("event.get"))
        .with_status(200)
        .with_body(ok(json!([
            {"eventid": "r1", "clock": (T0 + 60).to_string()},
            {"eventid": "r2", "clock": ""}
        ])))
        .create();

    let ids = vec!["r1".to_string(), "r2".to_string()];
    let recoveries = client(&server, |_| {})
        .fetch_recovery_events(&ids)
        .expect("recoveries");
    assert_eq!(recoveries.len(), 1);
    assert_eq!(recoveries["r1"].clock, T0 + 60);
}

#[test]
fn metrics_can_be_collected_from_zabbix() {
    let mut server = Server::new();
    let _groups = server
        .mock("POST", RPC)
        .match_body(method("hostgroup.get"))
        .with_status(200)
        .with_body(ok(json!([{"groupid": "2", "name": "Core"}])))
        .create();
    let _hosts = server
        .mock("POST", RPC)
        .match_body(method("host.get"))
        .with_status(200)
        .with_body(ok(json!([{
            "hostid": "10",
            "host": "router-1",
            "name": "router-1",
            "status": "0",
            "hostgroups": [{"groupid": "2"}],
            "inventory": []
        }])))
        .create();
    let mut problem = event("500", T0 + 100);
    problem["r_eventid"] = json!("501");
    let _problems = server
        .mock("POST", RPC)
        .match_body(Matcher::PartialJson(
            json!({"method": "event.get", "params": {"source": 0}}),
        ))
        .with_status(200)
        .with_body(ok(json!([problem])))
        .create();
    let _recoveries = server
        .mock("POST", RPC)
        .match_body(Matcher::Regex(r#""eventids":\["501"\]"#.to_string()))
        .with_status(200)
        .with_body(ok(json!([{"eventid": "501", "clock": (T0 + 400).to_string()}])))
        .create();
    let _triggers = server
        .mock("POST", RPC)
        .match_body(method("trigger.get"))
        .with_status(200)
        .with_body(ok(json!([{
            "triggerid": "100",
            "description": "Unavailable by ICMP ping",
            "comments": "",
            "items": [{"key_": "icmpping"}]
        }])))
        .create();

    let source = client(&server, |_| {});
    let report = collect_metrics(
        &source,
        &EngineConfig::default(),
        &PeriodRequest::Range {
            start: T0,
            end: T0 + 1000,
        },
        &ReportScope::Group {
            group_id: "2".to_string(),
        },
        T0 + 10_000,
    )
    .expect("metrics");

    assert_eq!(report.summary.incident_count, 1);
    assert_eq!(report.summary.reachability_incident_count, 1);
    assert_eq!(report.groups[0].availability.overall, 70.0);
    assert_eq!(report.groups[0].name, "Core");
}
