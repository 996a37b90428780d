//! Typed payloads for the REST surface of the cloud API.
//!
//! Unknown fields are ignored on decode so the SDK stays compatible with
//! additive server-side changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A device registered to the account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Device identifier.
    pub id: String,
    /// User-assigned name, if any.
    pub name: Option<String>,
    /// Whether the device currently holds a cloud connection.
    #[serde(default)]
    pub online: bool,
    /// Last time the cloud heard from the device.
    pub last_heard: Option<DateTime<Utc>>,
    /// Product this device belongs to, for product-owned devices.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<u64>,
    /// Firmware version last reported by the device.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware_version: Option<String>,
}

/// A product (fleet) owned by the account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Product identifier.
    pub id: u64,
    /// Product name.
    pub name: String,
    /// Hardware platform the product targets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A published firmware library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Library {
    /// Library name.
    pub name: String,
    /// Latest published version.
    pub version: String,
    /// Author attribution string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Install count, when the registry exposes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installs: Option<u64>,
}

/// Request body for publishing an event into the account's event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    /// Event name the stream will deliver it under.
    pub name: String,
    /// JSON payload.
    pub data: serde_json::Value,
    /// Whether the event is visible only to the owning account.
    #[serde(default)]
    pub private: bool,
}

/// Server acknowledgement for a publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishResponse {
    /// Whether the event was accepted.
    pub ok: bool,
}
