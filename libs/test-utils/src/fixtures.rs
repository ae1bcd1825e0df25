//! Test fixtures with sample data.
//!
//! This module provides pre-built configurations and resource payloads for use in tests.

use provider_client::{AkSkOptions, SessionConfig};
use serde::{Deserialize, Serialize};

/// Project id used by the sample configurations.
pub const SAMPLE_PROJECT_ID: &str = "0970dd7a1300f5672ff2c003c60ae115";

/// Domain id used by the sample configurations.
pub const SAMPLE_DOMAIN_ID: &str = "d78cbac186b744899480f25bd022f468";

/// Initial token used by the sample configurations.
pub const SAMPLE_TOKEN: &str = "initial-token";

/// Token-authenticated configuration against `identity_endpoint`.
#[must_use]
pub fn token_config(identity_endpoint: &str) -> SessionConfig {
    SessionConfig::new(identity_endpoint)
        .with_token(SAMPLE_TOKEN)
        .with_project_id(SAMPLE_PROJECT_ID)
        .with_region("eu-de")
}

/// AK/SK-signed configuration against `identity_endpoint`.
#[must_use]
pub fn aksk_config(identity_endpoint: &str) -> SessionConfig {
    SessionConfig::new(identity_endpoint)
        .with_project_id(SAMPLE_PROJECT_ID)
        .with_aksk(
            AkSkOptions::new("HPUAEXAMPLEACCESSKEY", "example-secret-key")
                .with_project_id(SAMPLE_PROJECT_ID)
                .with_domain_id(SAMPLE_DOMAIN_ID),
        )
}

/// Sample subnet resource for testing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SampleSubnet {
    /// Subnet id
    #[serde(default)]
    pub id: String,
    /// Subnet name
    pub name: String,
    /// CIDR block
    pub cidr: String,
    /// Gateway address
    pub gateway_ip: String,
    /// Owning VPC
    pub vpc_id: String,
}

impl SampleSubnet {
    /// A subnet as sent in a create request.
    #[must_use]
    pub fn create_request() -> Self {
        Self {
            id: String::new(),
            name: "subnet-test".to_string(),
            cidr: "192.168.10.0/24".to_string(),
            gateway_ip: "192.168.10.1".to_string(),
            vpc_id: "3ec3b33f-ac1c-4630-ad1c-7dba1ed79d85".to_string(),
        }
    }

    /// The same subnet as returned by the service.
    #[must_use]
    pub fn created() -> Self {
        Self {
            id: "4779ab1c-7c1a-44b1-a02e-93dfc361b32d".to_string(),
            ..Self::create_request()
        }
    }

    /// The body of a create request.
    #[must_use]
    pub fn request_body() -> serde_json::Value {
        serde_json::json!({ "subnet": Self::create_request() })
    }

    /// The body of a create response.
    #[must_use]
    pub fn response_body() -> serde_json::Value {
        serde_json::json!({ "subnet": Self::created() })
    }
}

/// Envelope used by the subnet API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubnetEnvelope {
    /// The wrapped subnet
    pub subnet: SampleSubnet,
}

/// A typical error body returned by the services.
#[must_use]
pub fn error_body(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({ "error": { "code": code, "message": message } })
}
