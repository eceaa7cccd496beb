//! vSphere VI/JSON client
//!
//! Speaks the JSON flavour of the vSphere Web Services API:
//! - `GET  {base}/{MoType}/{moId}/{property}` reads a property
//! - `POST {base}/{MoType}/{moId}/{Method}` invokes a method
//!
//! where `{base}` is `https://host:port/sdk/vim25/{release}/`. The session
//! token returned by `Login` travels in the `vmware-api-session-id` header.

use super::{
    AboutInfo, InfrastructureProvider, MetricQuery, MetricSeries, PerfCounterInfo, RetrievePage,
};
use crate::error::ProviderError;
use crate::models::{ManagedObjectRecord, MoRef, ObjectKind};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// API release used in request paths unless configured otherwise
pub const DEFAULT_API_RELEASE: &str = "8.0.1.0";

const SESSION_HEADER: &str = "vmware-api-session-id";

/// Connection settings for a vCenter or ESXi endpoint
#[derive(Debug, Clone)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub api_release: String,
    /// Accept self-signed certificates
    pub insecure: bool,
    pub timeout: Duration,
}

impl ConnectParams {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            api_release: DEFAULT_API_RELEASE.to_string(),
            insecure: false,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn base_url(&self) -> Result<Url, ProviderError> {
        let url = Url::parse(&format!(
            "https://{}:{}/sdk/vim25/{}/",
            self.host, self.port, self.api_release
        ))?;
        Ok(url)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceContent {
    root_folder: MoRef,
    property_collector: MoRef,
    view_manager: MoRef,
    session_manager: MoRef,
    #[serde(default)]
    perf_manager: Option<MoRef>,
    about: AboutWire,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AboutWire {
    name: String,
    full_name: String,
    api_type: String,
    api_version: String,
}

#[derive(Debug, Deserialize)]
struct RetrieveResultWire {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    objects: Vec<ObjectContentWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectContentWire {
    obj: MoRef,
    #[serde(default)]
    prop_set: Vec<DynamicPropertyWire>,
}

#[derive(Debug, Deserialize)]
struct DynamicPropertyWire {
    name: String,
    #[serde(default)]
    val: Value,
}

#[derive(Debug, Deserialize)]
struct ElementDescriptionWire {
    key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PerfCounterWire {
    key: i32,
    name_info: ElementDescriptionWire,
    group_info: ElementDescriptionWire,
    rollup_type: String,
}

#[derive(Debug, Deserialize)]
struct PerfEntityMetricWire {
    #[serde(default)]
    value: Vec<PerfMetricSeriesWire>,
}

#[derive(Debug, Deserialize)]
struct PerfMetricSeriesWire {
    id: PerfMetricIdWire,
    #[serde(default)]
    value: Vec<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PerfMetricIdWire {
    counter_id: i32,
    #[serde(default)]
    instance: String,
}

/// Authenticated VI/JSON session
#[derive(Clone)]
pub struct VimClient {
    client: Client,
    base_url: Url,
    session_id: String,
    content: ServiceContent,
}

impl VimClient {
    /// Connect and log in to the endpoint described by `params`
    pub async fn connect(params: &ConnectParams) -> Result<Self, ProviderError> {
        let base_url = params.base_url()?;
        Self::connect_with_base(base_url, params).await
    }

    /// Connect using an explicit API base URL (must end with `/`)
    pub async fn connect_with_base(
        base_url: Url,
        params: &ConnectParams,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(params.timeout)
            .danger_accept_invalid_certs(params.insecure)
            .build()
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        let content_url = base_url.join("ServiceInstance/ServiceInstance/content")?;
        let response = client
            .get(content_url)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;
        let content: ServiceContent = check_status(response)
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("service content: {}", e)))?;

        let login_url = base_url.join(&method_path(&content.session_manager, "Login"))?;
        let response = client
            .post(login_url)
            .json(&json!({ "userName": params.user, "password": params.password }))
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;
        let response = check_status(response)
            .await
            .map_err(|e| ProviderError::Authentication(e.to_string()))?;

        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::Authentication("login response carried no session id".into())
            })?;

        info!(
            host = %params.host,
            api_type = %content.about.api_type,
            api_version = %content.about.api_version,
            "Connected to vSphere endpoint"
        );

        Ok(Self {
            client,
            base_url,
            session_id,
            content,
        })
    }

    async fn invoke(
        &self,
        target: &MoRef,
        method: &str,
        body: Option<Value>,
    ) -> Result<Option<Value>, ProviderError> {
        let url = self.base_url.join(&method_path(target, method))?;
        debug!(target = %target, method = %method, "Invoking method");

        let mut request = self
            .client
            .post(url)
            .header(SESSION_HEADER, &self.session_id);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = check_status(request.send().await?).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ProviderError::Decode(format!("{}: {}", method, e)))
    }

    async fn read_property(&self, target: &MoRef, property: &str) -> Result<Value, ProviderError> {
        let url = self.base_url.join(&method_path(target, property))?;
        let response = self
            .client
            .get(url)
            .header(SESSION_HEADER, &self.session_id)
            .send()
            .await?;
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("{}: {}", property, e)))
    }

    fn perf_manager(&self) -> Result<&MoRef, ProviderError> {
        self.content
            .perf_manager
            .as_ref()
            .ok_or_else(|| ProviderError::Decode("endpoint exposes no performance manager".into()))
    }
}

#[async_trait]
impl InfrastructureProvider for VimClient {
    async fn about(&self) -> Result<AboutInfo, ProviderError> {
        let about = &self.content.about;
        Ok(AboutInfo {
            name: about.name.clone(),
            full_name: about.full_name.clone(),
            api_type: about.api_type.clone(),
            api_version: about.api_version.clone(),
        })
    }

    async fn create_container_view(&self, kind: ObjectKind) -> Result<MoRef, ProviderError> {
        let body = json!({
            "container": moref_json(&self.content.root_folder),
            "type": [kind.as_str()],
            "recursive": true,
        });
        let value = self
            .invoke(&self.content.view_manager, "CreateContainerView", Some(body))
            .await?
            .ok_or_else(|| ProviderError::Decode("CreateContainerView returned nothing".into()))?;
        MoRef::from_value(&value)
            .ok_or_else(|| ProviderError::Decode("CreateContainerView returned no reference".into()))
    }

    async fn retrieve_properties(
        &self,
        view: &MoRef,
        kind: ObjectKind,
        properties: &[String],
    ) -> Result<RetrievePage, ProviderError> {
        let body = json!({
            "specSet": [{
                "_typeName": "PropertyFilterSpec",
                "propSet": [{
                    "_typeName": "PropertySpec",
                    "type": kind.as_str(),
                    "all": false,
                    "pathSet": properties,
                }],
                "objectSet": [{
                    "_typeName": "ObjectSpec",
                    "obj": moref_json(view),
                    "skip": true,
                    "selectSet": [{
                        "_typeName": "TraversalSpec",
                        "name": "traverseView",
                        "type": "ContainerView",
                        "path": "view",
                        "skip": false,
                    }],
                }],
                "reportMissingObjectsInResults": false,
            }],
            "options": { "_typeName": "RetrieveOptions" },
        });
        let value = self
            .invoke(&self.content.property_collector, "RetrievePropertiesEx", Some(body))
            .await?;
        decode_retrieve_result(value)
    }

    async fn continue_retrieve(&self, token: &str) -> Result<RetrievePage, ProviderError> {
        let value = self
            .invoke(
                &self.content.property_collector,
                "ContinueRetrievePropertiesEx",
                Some(json!({ "token": token })),
            )
            .await?;
        decode_retrieve_result(value)
    }

    async fn destroy_view(&self, view: &MoRef) -> Result<(), ProviderError> {
        self.invoke(view, "DestroyView", None).await?;
        Ok(())
    }

    async fn perf_counters(&self) -> Result<Vec<PerfCounterInfo>, ProviderError> {
        let value = self
            .read_property(self.perf_manager()?, "perfCounter")
            .await?;
        let counters: Vec<PerfCounterWire> = serde_json::from_value(unwrap_any(value))
            .map_err(|e| ProviderError::Decode(format!("perfCounter: {}", e)))?;

        Ok(counters
            .into_iter()
            .map(|c| PerfCounterInfo {
                key: c.key,
                group: c.group_info.key,
                name: c.name_info.key,
                rollup: c.rollup_type,
            })
            .collect())
    }

    async fn query_metric(&self, query: &MetricQuery) -> Result<Vec<MetricSeries>, ProviderError> {
        let body = json!({
            "querySpec": [{
                "_typeName": "PerfQuerySpec",
                "entity": moref_json(&query.entity),
                "startTime": query.start.to_rfc3339_opts(SecondsFormat::Millis, true),
                "endTime": query.end.to_rfc3339_opts(SecondsFormat::Millis, true),
                "intervalId": query.interval_secs,
                "metricId": [{
                    "_typeName": "PerfMetricId",
                    "counterId": query.counter_id,
                    "instance": query.instance,
                }],
            }],
        });
        let value = self
            .invoke(self.perf_manager()?, "QueryPerf", Some(body))
            .await?;
        let Some(value) = value else {
            return Ok(Vec::new());
        };

        let entities: Vec<PerfEntityMetricWire> = serde_json::from_value(unwrap_any(value))
            .map_err(|e| ProviderError::Decode(format!("QueryPerf: {}", e)))?;

        Ok(entities
            .into_iter()
            .flat_map(|entity| entity.value)
            .map(|series| MetricSeries {
                counter_id: series.id.counter_id,
                instance: series.id.instance,
                values: series.value,
            })
            .collect())
    }

    async fn current_time(&self) -> Result<DateTime<Utc>, ProviderError> {
        let service_instance = MoRef::new("ServiceInstance", "ServiceInstance");
        let value = self
            .invoke(&service_instance, "CurrentTime", None)
            .await?
            .map(unwrap_any);
        let raw = value
            .as_ref()
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::Decode("CurrentTime returned no timestamp".into()))?;

        DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| ProviderError::Decode(format!("CurrentTime '{}': {}", raw, e)))
    }

    async fn logout(&self) -> Result<(), ProviderError> {
        self.invoke(&self.content.session_manager, "Logout", None)
            .await?;
        debug!("Logged out of vSphere session");
        Ok(())
    }
}

fn method_path(target: &MoRef, method: &str) -> String {
    format!("{}/{}/{}", target.kind, target.value, method)
}

fn moref_json(reference: &MoRef) -> Value {
    json!({
        "_typeName": "ManagedObjectReference",
        "type": reference.kind,
        "value": reference.value,
    })
}

/// Strip the `{"_typeName": .., "_value": ..}` wrapper used for values in
/// `anyType` positions
fn unwrap_any(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("_value") => {
            map.remove("_value").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn decode_retrieve_result(value: Option<Value>) -> Result<RetrievePage, ProviderError> {
    let Some(value) = value else {
        return Ok(RetrievePage::default());
    };
    let result: RetrieveResultWire = serde_json::from_value(value)
        .map_err(|e| ProviderError::Decode(format!("RetrieveResult: {}", e)))?;

    let objects = result
        .objects
        .into_iter()
        .map(|object| {
            let attributes: HashMap<String, Value> = object
                .prop_set
                .into_iter()
                .map(|prop| (prop.name, unwrap_any(prop.val)))
                .collect();
            ManagedObjectRecord::new(object.obj, attributes)
        })
        .collect();

    Ok(RetrievePage {
        objects,
        token: result.token.filter(|t| !t.is_empty()),
    })
}

async fn check_status(response: Response) -> Result<Response, ProviderError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let (fault, message) = parse_fault(&body);
    Err(ProviderError::Fault {
        status,
        fault,
        message,
    })
}

fn parse_fault(body: &str) -> (String, String) {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return ("HttpError".to_string(), body.trim().to_string());
    };

    let fault = value
        .get("_typeName")
        .and_then(Value::as_str)
        .unwrap_or("MethodFault")
        .to_string();
    let message = value
        .get("faultMessage")
        .and_then(Value::as_array)
        .and_then(|messages| messages.first())
        .and_then(|m| m.get("message"))
        .or_else(|| value.get("message"))
        .and_then(Value::as_str)
        .unwrap_or(&fault)
        .to_string();

    (fault, message)
}
