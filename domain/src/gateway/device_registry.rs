//! Device registry API client.
//!
//! This module provides an HTTP client for the device registry service,
//! which owns device records, per-user ownership and current machine status.

use crate::device::{Device, DeviceRegistry, StatusSnapshot};
use crate::error::{DomainErrorKind, Error, ExternalErrorKind};
use async_trait::async_trait;
use log::*;
use reqwest::StatusCode;

/// HTTP implementation of [`DeviceRegistry`].
pub struct HttpDeviceRegistry {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpDeviceRegistry {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let mut request = self.client.get(format!("{}{}", self.base_url, path));
        if let Some(api_key) = &self.api_key {
            request = request.header("x-api-key", api_key);
        }
        request
    }
}

#[async_trait]
impl DeviceRegistry for HttpDeviceRegistry {
    async fn find_owned_device(
        &self,
        device_id: &str,
        user_id: &str,
    ) -> Result<Option<Device>, Error> {
        let response = self
            .request(&format!("/devices/{device_id}"))
            .query(&[("userId", user_id)])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json::<Device>().await?)),
            status => {
                warn!("device registry returned {status} for device {device_id}");
                Err(Error {
                    source: None,
                    error_kind: DomainErrorKind::External(ExternalErrorKind::Other(format!(
                        "device registry returned {status}"
                    ))),
                })
            }
        }
    }

    async fn get_device_status(&self, device_id: &str) -> Result<StatusSnapshot, Error> {
        let response = self
            .request(&format!("/devices/{device_id}/status"))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            warn!("device registry status fetch returned {status} for device {device_id}");
            return Err(Error {
                source: None,
                error_kind: DomainErrorKind::External(ExternalErrorKind::Other(format!(
                    "device registry returned {status}"
                ))),
            });
        }

        Ok(response.json::<StatusSnapshot>().await?)
    }
}
