//! AirPlay protocol client adapter
//!
//! Talks to the device's HTTP control surface on the advertised service port
//! (7000 on current receivers). Playback of a URL needs only `POST /play`
//! with a `Content-Location` body; `POST /stop` ends it. Devices that demand
//! pairing show a PIN after `POST /pair-pin-start`; the PIN is stored as the
//! credential and sent as Basic authorization on later control requests.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::StatusCode;

use crate::application::ports::{CastError, CastSession, Caster, MediaUrl, PinPrompt};
use crate::domain::config::DeviceConfig;
use crate::domain::device::{Credentials, DeviceDescriptor, Protocol};
use crate::infrastructure::discovery;

/// Request timeout for control requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// AirPlay protocol client
pub struct AirplayCaster {
    client: reqwest::Client,
}

impl AirplayCaster {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for AirplayCaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Basic authorization header for a stored PIN credential.
fn auth_header(pin: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("AirPlay:{pin}")))
}

/// Body for `POST /play`: points the device at the local streaming URL.
fn play_body(url: &str) -> String {
    format!("Content-Location: {url}\nStart-Position: 0.0\n")
}

/// Map a control-request status to a casting error, if it is one.
fn status_error(status: StatusCode, device: &str) -> Option<CastError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Some(CastError::AuthenticationRequired {
            device: device.to_string(),
        });
    }
    if !status.is_success() {
        return Some(CastError::Protocol(format!(
            "\"{device}\" answered {status}"
        )));
    }
    None
}

fn unreachable(device: &str, address: &str, err: &reqwest::Error) -> CastError {
    CastError::NetworkUnreachable {
        device: device.to_string(),
        address: address.to_string(),
        reason: err.to_string(),
    }
}

#[async_trait]
impl Caster for AirplayCaster {
    fn protocol(&self) -> Protocol {
        Protocol::Airplay
    }

    async fn discover(&self, timeout: Duration) -> Result<Vec<DeviceDescriptor>, CastError> {
        tokio::task::spawn_blocking(move || discovery::browse(Protocol::Airplay, timeout))
            .await
            .map_err(|e| CastError::Discovery(format!("Discovery task failed: {e}")))?
    }

    async fn pair(
        &self,
        device: &DeviceDescriptor,
        read_pin: PinPrompt,
    ) -> Result<Credentials, CastError> {
        let base = format!("http://{}:{}", device.address, device.port);

        // Ask the device to display its PIN. Receivers without PIN pairing
        // answer 404; the prompt still runs so a fixed password can be stored.
        let response = self
            .client
            .post(format!("{base}/pair-pin-start"))
            .send()
            .await
            .map_err(|e| unreachable(&device.name, &device.address.to_string(), &e))?;
        if response.status().is_server_error() {
            return Err(CastError::Protocol(format!(
                "\"{}\" rejected pairing: {}",
                device.name,
                response.status()
            )));
        }

        let pin = tokio::task::spawn_blocking(move || read_pin())
            .await
            .map_err(|e| CastError::Protocol(format!("PIN prompt failed: {e}")))?
            .ok_or_else(|| CastError::Protocol("Pairing cancelled".to_string()))?;

        Ok(Credentials::new(pin))
    }

    async fn connect(&self, config: &DeviceConfig) -> Result<Box<dyn CastSession>, CastError> {
        let base = format!("http://{}:{}", config.address, config.port);
        let auth = config.credentials.as_deref().map(auth_header);

        // Reachability probe; also surfaces a pairing demand up front.
        let mut request = self.client.get(format!("{base}/server-info"));
        if let Some(header) = &auth {
            request = request.header(reqwest::header::AUTHORIZATION, header.clone());
        }
        let response = request
            .send()
            .await
            .map_err(|e| unreachable(&config.name, &config.address, &e))?;
        if let Some(err) = status_error(response.status(), &config.name) {
            // Some receivers do not serve /server-info; only auth demands
            // are fatal at this point.
            if matches!(err, CastError::AuthenticationRequired { .. }) {
                return Err(err);
            }
        }

        Ok(Box::new(AirplaySession {
            client: self.client.clone(),
            base,
            auth,
            device_name: config.name.clone(),
        }))
    }
}

/// An open AirPlay control session.
struct AirplaySession {
    client: reqwest::Client,
    base: String,
    auth: Option<String>,
    device_name: String,
}

impl AirplaySession {
    async fn control(&self, path: &str, body: Option<String>) -> Result<(), CastError> {
        let mut request = self.client.post(format!("{}{}", self.base, path));
        if let Some(header) = &self.auth {
            request = request.header(reqwest::header::AUTHORIZATION, header.clone());
        }
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "text/parameters")
                .body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| unreachable(&self.device_name, &self.base, &e))?;
        match status_error(response.status(), &self.device_name) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CastSession for AirplaySession {
    async fn play(&mut self, media: &MediaUrl) -> Result<(), CastError> {
        self.control("/play", Some(play_body(&media.url))).await
    }

    async fn stop(&mut self) -> Result<(), CastError> {
        self.control("/stop", None).await
    }
}
