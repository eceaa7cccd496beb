//! VI/JSON client tests against a mock vSphere endpoint

use chrono::{TimeZone, Utc};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use url::Url;
use vinga_lib::models::{MoRef, ObjectKind, ProviderKind};
use vinga_lib::provider::{ConnectParams, InfrastructureProvider, MetricQuery, VimClient};
use vinga_lib::ProviderError;

const BASE: &str = "/sdk/vim25/8.0.1.0";
const SESSION: &str = "f0d1e2c3b4a5";

fn service_content() -> serde_json::Value {
    json!({
        "_typeName": "ServiceContent",
        "rootFolder": {"_typeName": "ManagedObjectReference", "type": "Folder", "value": "group-d1"},
        "propertyCollector": {"_typeName": "ManagedObjectReference", "type": "PropertyCollector", "value": "propertyCollector"},
        "viewManager": {"_typeName": "ManagedObjectReference", "type": "ViewManager", "value": "ViewManager"},
        "sessionManager": {"_typeName": "ManagedObjectReference", "type": "SessionManager", "value": "SessionManager"},
        "perfManager": {"_typeName": "ManagedObjectReference", "type": "PerformanceManager", "value": "PerfMgr"},
        "about": {
            "_typeName": "AboutInfo",
            "name": "VMware vCenter Server",
            "fullName": "VMware vCenter Server 8.0.1 build-21560480",
            "apiType": "VirtualCenter",
            "apiVersion": "8.0.1.0"
        }
    })
}

fn params() -> ConnectParams {
    ConnectParams::new("127.0.0.1", 443, "administrator@vsphere.local", "secret")
}

fn base_url(server: &ServerGuard) -> Url {
    Url::parse(&format!("{}{}/", server.url(), BASE)).unwrap()
}

async fn mock_login(server: &mut ServerGuard) {
    server
        .mock("GET", format!("{}/ServiceInstance/ServiceInstance/content", BASE).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(service_content().to_string())
        .create_async()
        .await;
    server
        .mock("POST", format!("{}/SessionManager/SessionManager/Login", BASE).as_str())
        .match_body(Matcher::PartialJson(json!({
            "userName": "administrator@vsphere.local",
            "password": "secret"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("vmware-api-session-id", SESSION)
        .with_body(r#"{"_typeName":"UserSession","userName":"VSPHERE.LOCAL\\Administrator"}"#)
        .create_async()
        .await;
}

async fn connected(server: &mut ServerGuard) -> VimClient {
    mock_login(server).await;
    VimClient::connect_with_base(base_url(server), &params())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_connect_reads_about_info() {
    let mut server = Server::new_async().await;
    let client = connected(&mut server).await;

    let about = client.about().await.unwrap();
    assert_eq!(about.api_type, "VirtualCenter");
    assert_eq!(about.provider_kind(), ProviderKind::VCenter);
}

#[tokio::test]
async fn test_invalid_login_is_an_authentication_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", format!("{}/ServiceInstance/ServiceInstance/content", BASE).as_str())
        .with_status(200)
        .with_body(service_content().to_string())
        .create_async()
        .await;
    server
        .mock("POST", format!("{}/SessionManager/SessionManager/Login", BASE).as_str())
        .with_status(500)
        .with_body(
            r#"{"_typeName":"InvalidLogin","faultCause":null,"faultMessage":[{"_typeName":"LocalizableMessage","key":"com.vmware.vim.vpxd.vpx.login","message":"Cannot complete login due to an incorrect user name or password."}]}"#,
        )
        .create_async()
        .await;

    let err = VimClient::connect_with_base(base_url(&server), &params())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ProviderError::Authentication(_)));
    assert!(err.to_string().contains("incorrect user name or password"));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_a_connection_error() {
    let url = Url::parse("http://127.0.0.1:9/sdk/vim25/8.0.1.0/").unwrap();
    let err = VimClient::connect_with_base(url, &params())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ProviderError::Connection(_)));
}

#[tokio::test]
async fn test_retrieve_properties_follows_session_and_token() {
    let mut server = Server::new_async().await;
    let client = connected(&mut server).await;

    let view = server
        .mock("POST", format!("{}/ViewManager/ViewManager/CreateContainerView", BASE).as_str())
        .match_header("vmware-api-session-id", SESSION)
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""type":\["VirtualMachine"\]"#.into()),
            Matcher::Regex(r#""recursive":true"#.into()),
        ]))
        .with_status(200)
        .with_body(r#"{"_typeName":"ManagedObjectReference","type":"ContainerView","value":"session-52a1"}"#)
        .create_async()
        .await;

    let first = server
        .mock(
            "POST",
            format!("{}/PropertyCollector/propertyCollector/RetrievePropertiesEx", BASE).as_str(),
        )
        .match_header("vmware-api-session-id", SESSION)
        .match_body(Matcher::Regex(
            r#""pathSet":\["name","runtime.powerState"\]"#.into(),
        ))
        .with_status(200)
        .with_body(
            json!({
                "_typeName": "RetrieveResult",
                "token": "2",
                "objects": [{
                    "obj": {"_typeName": "ManagedObjectReference", "type": "VirtualMachine", "value": "vm-42"},
                    "propSet": [
                        {"name": "name", "val": {"_typeName": "string", "_value": "web01"}},
                        {"name": "runtime.powerState", "val": {"_typeName": "VirtualMachinePowerState", "_value": "poweredOn"}}
                    ]
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let second = server
        .mock(
            "POST",
            format!("{}/PropertyCollector/propertyCollector/ContinueRetrievePropertiesEx", BASE)
                .as_str(),
        )
        .match_body(Matcher::Json(json!({"token": "2"})))
        .with_status(200)
        .with_body(
            json!({
                "_typeName": "RetrieveResult",
                "objects": [{
                    "obj": {"_typeName": "ManagedObjectReference", "type": "VirtualMachine", "value": "vm-43"},
                    "propSet": [
                        {"name": "name", "val": {"_typeName": "string", "_value": "db01"}}
                    ]
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let destroy = server
        .mock("POST", format!("{}/ContainerView/session-52a1/DestroyView", BASE).as_str())
        .with_status(204)
        .create_async()
        .await;

    let fetcher = vinga_lib::PropertyFetcher::new(&client);
    let records = fetcher
        .fetch(ObjectKind::VirtualMachine, &["name", "runtime.powerState"])
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get_str("runtime.powerState"), Some("poweredOn"));
    assert_eq!(records[1].name.as_deref(), Some("db01"));
    assert!(records[1].get("runtime.powerState").is_none());

    view.assert_async().await;
    first.assert_async().await;
    second.assert_async().await;
    destroy.assert_async().await;
}

#[tokio::test]
async fn test_perf_counters_and_query() {
    let mut server = Server::new_async().await;
    let client = connected(&mut server).await;

    server
        .mock("GET", format!("{}/PerformanceManager/PerfMgr/perfCounter", BASE).as_str())
        .with_status(200)
        .with_body(
            json!([{
                "_typeName": "PerfCounterInfo",
                "key": 2,
                "nameInfo": {"_typeName": "ElementDescription", "label": "Usage", "summary": "CPU usage", "key": "usage"},
                "groupInfo": {"_typeName": "ElementDescription", "label": "CPU", "summary": "CPU", "key": "cpu"},
                "unitInfo": {"_typeName": "ElementDescription", "label": "%", "summary": "Percentage", "key": "percent"},
                "rollupType": "average",
                "statsType": "rate"
            }])
            .to_string(),
        )
        .create_async()
        .await;

    let counters = client.perf_counters().await.unwrap();
    assert_eq!(counters.len(), 1);
    assert_eq!(counters[0].qualified_name(), "cpu.usage.average");

    let query = server
        .mock("POST", format!("{}/PerformanceManager/PerfMgr/QueryPerf", BASE).as_str())
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""value":"vm-42""#.into()),
            Matcher::Regex(r#""startTime":"2026-10-18T11:59:00.000Z""#.into()),
            Matcher::Regex(r#""endTime":"2026-10-18T11:59:20.000Z""#.into()),
            Matcher::Regex(r#""intervalId":20"#.into()),
            Matcher::Regex(r#""counterId":2,"instance":"""#.into()),
        ]))
        .with_status(200)
        .with_body(
            json!([{
                "_typeName": "PerfEntityMetric",
                "entity": {"_typeName": "ManagedObjectReference", "type": "VirtualMachine", "value": "vm-42"},
                "value": [{
                    "_typeName": "PerfMetricIntSeries",
                    "id": {"_typeName": "PerfMetricId", "counterId": 2, "instance": ""},
                    "value": [2500, 5000]
                }]
            }])
            .to_string(),
        )
        .create_async()
        .await;

    let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
    let series = client
        .query_metric(&MetricQuery {
            entity: MoRef::new("VirtualMachine", "vm-42"),
            counter_id: 2,
            instance: String::new(),
            start: now - chrono::Duration::seconds(60),
            end: now - chrono::Duration::seconds(40),
            interval_secs: 20,
        })
        .await
        .unwrap();

    query.assert_async().await;
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].values, vec![2500, 5000]);
}

#[tokio::test]
async fn test_current_time_and_logout() {
    let mut server = Server::new_async().await;
    let client = connected(&mut server).await;

    server
        .mock("POST", format!("{}/ServiceInstance/ServiceInstance/CurrentTime", BASE).as_str())
        .with_status(200)
        .with_body(r#""2026-10-18T12:00:00.123Z""#)
        .create_async()
        .await;
    let logout = server
        .mock("POST", format!("{}/SessionManager/SessionManager/Logout", BASE).as_str())
        .match_header("vmware-api-session-id", SESSION)
        .with_status(204)
        .create_async()
        .await;

    let now = client.current_time().await.unwrap();
    assert_eq!(now.timestamp(), Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap().timestamp());

    client.logout().await.unwrap();
    logout.assert_async().await;
}

#[tokio::test]
async fn test_method_fault_is_decoded() {
    let mut server = Server::new_async().await;
    let client = connected(&mut server).await;

    server
        .mock("POST", format!("{}/ServiceInstance/ServiceInstance/CurrentTime", BASE).as_str())
        .with_status(500)
        .with_body(r#"{"_typeName":"NotAuthenticated","faultMessage":[{"message":"The session is not authenticated."}]}"#)
        .create_async()
        .await;

    let err = client.current_time().await.unwrap_err();
    match err {
        ProviderError::Fault {
            status,
            fault,
            message,
        } => {
            assert_eq!(status, 500);
            assert_eq!(fault, "NotAuthenticated");
            assert_eq!(message, "The session is not authenticated.");
        }
        other => panic!("unexpected error {:?}", other),
    }
}
