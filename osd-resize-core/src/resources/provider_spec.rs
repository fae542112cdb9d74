use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;
use thiserror::Error;

pub const AWS_PROVIDER_SPEC_KIND: &str = "AWSMachineProviderConfig";
pub const GCP_PROVIDER_SPEC_KIND: &str = "GCPMachineProviderSpec";

#[derive(Debug, Error)]
pub enum ProviderSpecError {
    #[error("Unsupported cloud provider ({})! Only 'aws' and 'gcp' are supported.", .0)]
    UnsupportedProvider(String),
    #[error("Provider spec of kind '{}' doesn't match the '{}' cloud provider!", .found, .provider)]
    KindMismatch {
        provider: CloudProvider,
        found: String,
    },
    #[error("Couldn't decode the provider spec! Reason: {}", .0)]
    Decode(serde_json::Error),
    #[error("Couldn't encode the provider spec! Reason: {}", .0)]
    Encode(serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudProvider {
    Aws,
    Gcp,
}

impl FromStr for CloudProvider {
    type Err = ProviderSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aws" => Ok(Self::Aws),
            "gcp" => Ok(Self::Gcp),
            other => Err(ProviderSpecError::UnsupportedProvider(other.to_owned())),
        }
    }
}

impl Display for CloudProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloudProvider::Aws => f.write_str("aws"),
            CloudProvider::Gcp => f.write_str("gcp"),
        }
    }
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsMachineProviderConfig {
    pub api_version: Option<String>,
    pub kind: Option<String>,
    pub instance_type: String,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GcpMachineProviderSpec {
    pub api_version: Option<String>,
    pub kind: Option<String>,
    pub machine_type: String,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Provider-specific machine configuration embedded as raw JSON in machine templates.
#[derive(Clone, Debug, PartialEq)]
pub enum ProviderSpec {
    Aws(AwsMachineProviderConfig),
    Gcp(GcpMachineProviderSpec),
}

impl ProviderSpec {
    pub fn decode(provider: CloudProvider, raw: &Value) -> Result<Self, ProviderSpecError> {
        let spec = match provider {
            CloudProvider::Aws => ProviderSpec::Aws(
                serde_json::from_value(raw.clone()).map_err(ProviderSpecError::Decode)?,
            ),
            CloudProvider::Gcp => ProviderSpec::Gcp(
                serde_json::from_value(raw.clone()).map_err(ProviderSpecError::Decode)?,
            ),
        };

        spec.validated()
    }

    pub fn encode(&self) -> Result<Value, ProviderSpecError> {
        match self {
            ProviderSpec::Aws(spec) => serde_json::to_value(spec),
            ProviderSpec::Gcp(spec) => serde_json::to_value(spec),
        }
        .map_err(ProviderSpecError::Encode)
    }

    pub fn provider(&self) -> CloudProvider {
        match self {
            ProviderSpec::Aws(_) => CloudProvider::Aws,
            ProviderSpec::Gcp(_) => CloudProvider::Gcp,
        }
    }

    pub fn instance_type(&self) -> &str {
        match self {
            ProviderSpec::Aws(spec) => &spec.instance_type,
            ProviderSpec::Gcp(spec) => &spec.machine_type,
        }
    }

    pub fn set_instance_type(&mut self, instance_type: &str) {
        match self {
            ProviderSpec::Aws(spec) => spec.instance_type = instance_type.to_owned(),
            ProviderSpec::Gcp(spec) => spec.machine_type = instance_type.to_owned(),
        }
    }

    fn kind(&self) -> Option<&str> {
        match self {
            ProviderSpec::Aws(spec) => spec.kind.as_deref(),
            ProviderSpec::Gcp(spec) => spec.kind.as_deref(),
        }
    }

    fn validated(self) -> Result<Self, ProviderSpecError> {
        let expected = match self.provider() {
            CloudProvider::Aws => AWS_PROVIDER_SPEC_KIND,
            CloudProvider::Gcp => GCP_PROVIDER_SPEC_KIND,
        };

        match self.kind() {
            Some(kind) if kind != expected => Err(ProviderSpecError::KindMismatch {
                provider: self.provider(),
                found: kind.to_owned(),
            }),
            _ => Ok(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{CloudProvider, ProviderSpec, ProviderSpecError};

    fn aws_raw() -> serde_json::Value {
        json!({
            "apiVersion": "machine.openshift.io/v1beta1",
            "kind": "AWSMachineProviderConfig",
            "ami": { "id": "ami-0123456789" },
            "blockDevices": [{ "ebs": { "encrypted": true, "iops": 0, "volumeSize": 350, "volumeType": "gp3" } }],
            "credentialsSecret": { "name": "aws-cloud-credentials" },
            "instanceType": "m5.2xlarge",
            "placement": { "availabilityZone": "", "region": "us-east-1" },
            "userDataSecret": { "name": "master-user-data" }
        })
    }

    #[test]
    fn parses_supported_providers() {
        assert_eq!("aws".parse::<CloudProvider>().unwrap(), CloudProvider::Aws);
        assert_eq!("gcp".parse::<CloudProvider>().unwrap(), CloudProvider::Gcp);
        assert!(matches!(
            "azure".parse::<CloudProvider>(),
            Err(ProviderSpecError::UnsupportedProvider(p)) if p == "azure"
        ));
    }

    #[test]
    fn aws_round_trip_only_changes_instance_type() {
        let raw = aws_raw();
        let mut spec = ProviderSpec::decode(CloudProvider::Aws, &raw).unwrap();

        assert_eq!(spec.instance_type(), "m5.2xlarge");

        spec.set_instance_type("m5.4xlarge");
        let encoded = spec.encode().unwrap();

        let mut expected = raw.clone();
        expected["instanceType"] = json!("m5.4xlarge");

        assert_eq!(encoded, expected);
    }

    #[test]
    fn decode_rejects_mismatched_kind() {
        let raw = json!({ "kind": "GCPMachineProviderSpec", "instanceType": "m5.xlarge" });

        assert!(matches!(
            ProviderSpec::decode(CloudProvider::Aws, &raw),
            Err(ProviderSpecError::KindMismatch { .. })
        ));
    }

    #[test]
    fn decode_requires_instance_type_field() {
        let raw = json!({ "kind": "GCPMachineProviderSpec", "instanceType": "n2-standard-4" });

        assert!(matches!(
            ProviderSpec::decode(CloudProvider::Gcp, &raw),
            Err(ProviderSpecError::Decode(_))
        ));
    }
}
