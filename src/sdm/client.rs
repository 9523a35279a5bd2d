// Smart Device Management REST client

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::auth::TokenProvider;
use super::error::{SdmError, SdmResult};
use crate::capture::AnswerExchanger;

pub const DEFAULT_API_BASE: &str = "https://smartdevicemanagement.googleapis.com/v1";
pub const CAMERA_DEVICE_TYPE: &str = "sdm.devices.types.CAMERA";
pub const GENERATE_WEBRTC_STREAM: &str = "sdm.devices.commands.CameraLiveStream.GenerateWebRtcStream";

const INFO_TRAIT: &str = "sdm.devices.traits.Info";

/// A device as listed by the API
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Device {
    /// Resource name, `enterprises/<id>/devices/<id>`
    pub name: String,
    #[serde(rename = "type", default)]
    pub device_type: String,
    #[serde(default)]
    pub traits: Value,
}

impl Device {
    pub fn is_camera(&self) -> bool {
        self.device_type == CAMERA_DEVICE_TYPE
    }

    /// User-assigned name, falling back to the resource name
    pub fn label(&self) -> &str {
        self.traits
            .get(INFO_TRAIT)
            .and_then(|info| info.get("customName"))
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.name)
    }
}

#[derive(Deserialize)]
struct ListDevicesResponse {
    #[serde(default)]
    devices: Vec<Device>,
}

/// Device-discovery collaborator
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    /// First camera-class device of the enterprise
    async fn find_capture_device(&self, enterprise_id: &str) -> SdmResult<Device>;

    /// Relay a local offer to the device and return its answer
    async fn relay_offer(&self, device: &Device, offer_sdp: &str) -> SdmResult<String>;
}

/// Pick the first camera from a device listing
pub fn select_camera(enterprise_id: &str, devices: Vec<Device>) -> SdmResult<Device> {
    if devices.is_empty() {
        return Err(SdmError::NoDevices(enterprise_id.to_string()));
    }
    let count = devices.len();
    devices
        .into_iter()
        .find(Device::is_camera)
        .ok_or(SdmError::NoCamera { count })
}

/// Read `answerSdp` from the `results` of an executeCommand response
pub fn parse_answer(response: &Value) -> SdmResult<String> {
    let answer = response
        .get("results")
        .and_then(|results| results.get("answerSdp"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    if answer.is_empty() {
        return Err(SdmError::invalid_response(
            "failed to get answer SDP: empty response",
        ));
    }
    Ok(answer.to_string())
}

/// REST implementation of the device directory
pub struct SdmClient {
    http: reqwest::Client,
    api_base: String,
    tokens: Arc<dyn TokenProvider>,
}

impl SdmClient {
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Self {
        Self::with_api_base(tokens, DEFAULT_API_BASE)
    }

    pub fn with_api_base(tokens: Arc<dyn TokenProvider>, api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    /// List every device of the enterprise
    pub async fn list_devices(&self, enterprise_id: &str) -> SdmResult<Vec<Device>> {
        if enterprise_id.is_empty() {
            return Err(SdmError::MissingEnterpriseId);
        }
        let endpoint = format!("{}/enterprises/{}/devices", self.api_base, enterprise_id);
        let token = self.tokens.access_token().await?;

        let response = self.http.get(&endpoint).bearer_auth(token).send().await?;
        let body = Self::check_status(&endpoint, response).await?;
        let listing: ListDevicesResponse = serde_json::from_value(body)
            .map_err(|e| SdmError::invalid_response(format!("device list: {}", e)))?;

        log::debug!("Enterprise {} has {} devices", enterprise_id, listing.devices.len());
        Ok(listing.devices)
    }

    /// Run a device command and return the raw response body
    pub async fn execute_command(&self, device: &Device, command: &str, params: Value) -> SdmResult<Value> {
        let endpoint = format!("{}/{}:executeCommand", self.api_base, device.name);
        let token = self.tokens.access_token().await?;

        log::debug!("Executing {} on {}", command, device.name);
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(token)
            .json(&json!({ "command": command, "params": params }))
            .send()
            .await?;
        Self::check_status(&endpoint, response).await
    }

    async fn check_status(endpoint: &str, response: reqwest::Response) -> SdmResult<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(String::from))
                .unwrap_or(body);
            return Err(SdmError::Api {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                message,
            });
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| SdmError::invalid_response(format!("{}: {}", endpoint, e)))
    }
}

#[async_trait]
impl DeviceDirectory for SdmClient {
    async fn find_capture_device(&self, enterprise_id: &str) -> SdmResult<Device> {
        let devices = self.list_devices(enterprise_id).await?;
        let camera = select_camera(enterprise_id, devices)?;
        log::info!("Found camera: {}", camera.label());
        Ok(camera)
    }

    async fn relay_offer(&self, device: &Device, offer_sdp: &str) -> SdmResult<String> {
        let response = self
            .execute_command(device, GENERATE_WEBRTC_STREAM, json!({ "offerSdp": offer_sdp }))
            .await?;
        parse_answer(&response)
    }
}

/// Adapts a directory and a chosen device into an answer exchanger
pub struct DeviceOfferExchanger {
    directory: Arc<dyn DeviceDirectory>,
    device: Device,
}

impl DeviceOfferExchanger {
    pub fn new(directory: Arc<dyn DeviceDirectory>, device: Device) -> Self {
        Self { directory, device }
    }
}

#[async_trait]
impl AnswerExchanger for DeviceOfferExchanger {
    async fn exchange(&self, offer_sdp: &str) -> crate::Result<String> {
        Ok(self.directory.relay_offer(&self.device, offer_sdp).await?)
    }
}
