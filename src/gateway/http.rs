use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

use super::wire::{WireAttendanceRequest, WireEmployee, WireLastRecordResponse, record_type};
use super::{RemoteAttendance, RemoteGateway};
use crate::error::GatewayError;
use crate::model::attendance::RecordKind;
use crate::model::employee::Employee;

/// reqwest-backed gateway. Every request carries the client-wide timeout.
#[derive(Clone, Debug)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    probe_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str, probe_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            probe_url: probe_url.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn employee_from(response: reqwest::Response) -> Result<Employee, GatewayError> {
        let wire = response.error_for_status()?.json::<WireEmployee>().await?;
        Employee::try_from(wire)
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    async fn list_employees(&self) -> Result<Vec<Employee>, GatewayError> {
        let url = self.url("/employees");
        debug!(%url, "Fetching employees");

        let wire = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<WireEmployee>>()
            .await?;

        wire.into_iter().map(Employee::try_from).collect()
    }

    async fn fetch_employee(&self, id: i64) -> Result<Employee, GatewayError> {
        let response = self
            .client
            .get(self.url(&format!("/employees/{id}")))
            .send()
            .await?;
        Self::employee_from(response).await
    }

    async fn create_employee(&self, employee: &Employee) -> Result<Employee, GatewayError> {
        let response = self
            .client
            .post(self.url("/employees"))
            .json(&WireEmployee::body(employee))
            .send()
            .await?;
        Self::employee_from(response).await
    }

    async fn update_employee(
        &self,
        id: i64,
        employee: &Employee,
    ) -> Result<Employee, GatewayError> {
        let response = self
            .client
            .put(self.url(&format!("/employees/{id}")))
            .json(&WireEmployee::body(employee))
            .send()
            .await?;
        Self::employee_from(response).await
    }

    async fn delete_employee(&self, id: i64) -> Result<(), GatewayError> {
        self.client
            .delete(self.url(&format!("/employees/{id}")))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn record_attendance(
        &self,
        employee_id: i64,
        kind: RecordKind,
    ) -> Result<(), GatewayError> {
        let body = WireAttendanceRequest {
            employee_id,
            record_type: record_type(kind),
        };

        self.client
            .post(self.url("/attendance"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn last_record(
        &self,
        employee_id: i64,
    ) -> Result<Option<RemoteAttendance>, GatewayError> {
        let response = self
            .client
            .get(self.url(&format!("/employees/{employee_id}/last-record")))
            .send()
            .await?
            .error_for_status()?
            .json::<WireLastRecordResponse>()
            .await?;

        debug!(employee_id, message = %response.message, "Last record answered");
        response.last_record.map(RemoteAttendance::try_from).transpose()
    }

    async fn probe(&self) -> bool {
        match self.client.get(&self.probe_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                error!(error = %e, url = %self.probe_url, "Liveness probe failed");
                false
            }
        }
    }
}
