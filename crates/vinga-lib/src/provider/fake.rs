//! In-memory provider used by unit tests

use super::{
    AboutInfo, InfrastructureProvider, MetricQuery, MetricSeries, PerfCounterInfo, RetrievePage,
};
use crate::error::ProviderError;
use crate::models::{ManagedObjectRecord, MoRef, ObjectKind};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub(crate) struct FakeProvider {
    pub about: AboutInfo,
    pub now: DateTime<Utc>,
    pub page_size: usize,
    objects: HashMap<ObjectKind, Vec<ManagedObjectRecord>>,
    pub counters: Vec<PerfCounterInfo>,
    series: HashMap<i32, Vec<MetricSeries>>,
    pub fail_continue: bool,
    pages: Mutex<HashMap<String, (ObjectKind, usize)>>,
    pub queries: Mutex<Vec<MetricQuery>>,
    pub requested_properties: Mutex<Vec<(ObjectKind, Vec<String>)>>,
    pub views_created: AtomicUsize,
    pub views_destroyed: AtomicUsize,
    pub counter_list_calls: AtomicUsize,
    pub logouts: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            about: AboutInfo {
                name: "VMware vCenter Server".into(),
                full_name: "VMware vCenter Server 8.0.1".into(),
                api_type: "VirtualCenter".into(),
                api_version: "8.0.1.0".into(),
            },
            now: Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap(),
            page_size: 100,
            objects: HashMap::new(),
            counters: Vec::new(),
            series: HashMap::new(),
            fail_continue: false,
            pages: Mutex::new(HashMap::new()),
            queries: Mutex::new(Vec::new()),
            requested_properties: Mutex::new(Vec::new()),
            views_created: AtomicUsize::new(0),
            views_destroyed: AtomicUsize::new(0),
            counter_list_calls: AtomicUsize::new(0),
            logouts: AtomicUsize::new(0),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Register an object under the kind a view will be created for
    pub fn add_object(&mut self, kind: ObjectKind, reference: MoRef, attributes: &[(&str, Value)]) {
        let attributes = attributes
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        self.objects
            .entry(kind)
            .or_default()
            .push(ManagedObjectRecord::new(reference, attributes));
    }

    pub fn add_counter(&mut self, key: i32, qualified: &str) {
        let mut parts = qualified.splitn(3, '.');
        let group = parts.next().unwrap_or_default().to_string();
        let name = parts.next().unwrap_or_default().to_string();
        let rollup = parts.next().unwrap_or_default().to_string();
        self.counters.push(PerfCounterInfo {
            key,
            group,
            name,
            rollup,
        });
    }

    pub fn add_series(&mut self, counter_id: i32, instance: &str, values: Vec<i64>) {
        self.series.entry(counter_id).or_default().push(MetricSeries {
            counter_id,
            instance: instance.to_string(),
            values,
        });
    }

    fn page(&self, kind: ObjectKind, offset: usize, properties: Option<&[String]>) -> RetrievePage {
        let all = self.objects.get(&kind).cloned().unwrap_or_default();
        let end = (offset + self.page_size).min(all.len());
        let objects = all[offset.min(all.len())..end]
            .iter()
            .map(|record| match properties {
                Some(props) => filter_properties(record, props),
                None => record.clone(),
            })
            .collect();

        let token = if end < all.len() {
            let token = format!("{}-{}", kind, end);
            self.pages
                .lock()
                .unwrap()
                .insert(token.clone(), (kind, end));
            Some(token)
        } else {
            None
        };

        RetrievePage { objects, token }
    }
}

fn filter_properties(record: &ManagedObjectRecord, properties: &[String]) -> ManagedObjectRecord {
    let attributes = record
        .attributes
        .iter()
        .filter(|(k, _)| properties.contains(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    ManagedObjectRecord::new(record.opaque_ref.clone(), attributes)
}

#[async_trait]
impl InfrastructureProvider for FakeProvider {
    async fn about(&self) -> Result<AboutInfo, ProviderError> {
        Ok(self.about.clone())
    }

    async fn create_container_view(&self, kind: ObjectKind) -> Result<MoRef, ProviderError> {
        let n = self.views_created.fetch_add(1, Ordering::SeqCst);
        Ok(MoRef::new("ContainerView", format!("session[{}]{}", n, kind)))
    }

    async fn retrieve_properties(
        &self,
        _view: &MoRef,
        kind: ObjectKind,
        properties: &[String],
    ) -> Result<RetrievePage, ProviderError> {
        self.requested_properties
            .lock()
            .unwrap()
            .push((kind, properties.to_vec()));
        Ok(self.page(kind, 0, Some(properties)))
    }

    async fn continue_retrieve(&self, token: &str) -> Result<RetrievePage, ProviderError> {
        if self.fail_continue {
            return Err(ProviderError::Fault {
                status: 500,
                fault: "InvalidArgument".into(),
                message: "token expired".into(),
            });
        }
        let (kind, offset) = self
            .pages
            .lock()
            .unwrap()
            .remove(token)
            .ok_or_else(|| ProviderError::Decode(format!("unknown token {}", token)))?;
        let properties = self
            .requested_properties
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(k, _)| *k == kind)
            .map(|(_, p)| p.clone());
        Ok(self.page(kind, offset, properties.as_deref()))
    }

    async fn destroy_view(&self, _view: &MoRef) -> Result<(), ProviderError> {
        self.views_destroyed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn perf_counters(&self) -> Result<Vec<PerfCounterInfo>, ProviderError> {
        self.counter_list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.counters.clone())
    }

    async fn query_metric(&self, query: &MetricQuery) -> Result<Vec<MetricSeries>, ProviderError> {
        self.queries.lock().unwrap().push(query.clone());
        Ok(self
            .series
            .get(&query.counter_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn current_time(&self) -> Result<DateTime<Utc>, ProviderError> {
        Ok(self.now)
    }

    async fn logout(&self) -> Result<(), ProviderError> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
