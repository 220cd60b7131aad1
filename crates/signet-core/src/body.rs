//! Request bodies sent to the broker. Field order follows the declared structs,
//! so identical inputs always serialize to identical bytes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::contract::{Pact, Spec, SpecFormat};

#[derive(Debug, Error)]
pub enum BodyError {
    #[error("consumer contract does not have a consumer name")]
    MissingConsumerName,
    #[error("must set provider name")]
    MissingProviderName,
    #[error("failed to encode request body")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerPublishRequest {
    pub contract: Pact,
    pub consumer_name: String,
    pub consumer_version: String,
    pub consumer_branch: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderPublishRequest {
    pub spec: Spec,
    pub provider_name: String,
    pub provider_version: String,
    pub provider_branch: String,
    pub spec_format: SpecFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentRequest {
    pub environment_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRequest {
    pub environment_name: String,
    pub participant_name: String,
    pub participant_version: String,
    pub deployed: bool,
}

pub fn build_consumer_request(
    contract: &Pact,
    name: &str,
    version: &str,
    branch: &str,
) -> Result<Vec<u8>, BodyError> {
    if name.is_empty() {
        return Err(BodyError::MissingConsumerName);
    }
    let body = ConsumerPublishRequest {
        contract: contract.clone(),
        consumer_name: name.to_string(),
        consumer_version: version.to_string(),
        consumer_branch: branch.to_string(),
    };
    Ok(serde_json::to_vec(&body)?)
}

/// The spec format field is taken from the spec itself.
pub fn build_provider_request(
    spec: &Spec,
    provider_name: &str,
    version: &str,
    branch: &str,
) -> Result<Vec<u8>, BodyError> {
    if provider_name.is_empty() {
        return Err(BodyError::MissingProviderName);
    }
    let body = ProviderPublishRequest {
        spec: spec.clone(),
        provider_name: provider_name.to_string(),
        provider_version: version.to_string(),
        provider_branch: branch.to_string(),
        spec_format: spec.format(),
    };
    Ok(serde_json::to_vec(&body)?)
}

pub fn build_environment_request(name: &str) -> Result<Vec<u8>, BodyError> {
    Ok(serde_json::to_vec(&EnvironmentRequest {
        environment_name: name.to_string(),
    })?)
}

pub fn build_deployment_request(
    environment: &str,
    name: &str,
    version: &str,
    deployed: bool,
) -> Result<Vec<u8>, BodyError> {
    Ok(serde_json::to_vec(&DeploymentRequest {
        environment_name: environment.to_string(),
        participant_name: name.to_string(),
        participant_version: version.to_string(),
        deployed,
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::Participant;
    use serde_json::{json, Value as JsonValue};

    fn sample_pact() -> Pact {
        Pact {
            consumer: Participant {
                name: "frontend".into(),
            },
            interactions: json!([{"description": "GET /orders 200"}]),
            metadata: json!({"pactSpecification": {"version": "3.0.0"}}),
            provider: json!({"name": "orders"}),
        }
    }

    #[test]
    fn consumer_request_embeds_contract_unchanged() {
        let pact = sample_pact();
        let bytes = build_consumer_request(&pact, "frontend", "a1b2c3d4e5", "main").unwrap();
        let decoded: ConsumerPublishRequest = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded.consumer_name, "frontend");
        assert_eq!(decoded.consumer_version, "a1b2c3d4e5");
        assert_eq!(decoded.consumer_branch, "main");
        assert_eq!(decoded.contract, pact);
    }

    #[test]
    fn consumer_request_uses_camel_case_keys_in_declared_order() {
        let bytes = build_consumer_request(&sample_pact(), "frontend", "v1", "").unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let positions: Vec<usize> = [
            "\"contract\"",
            "\"consumerName\"",
            "\"consumerVersion\"",
            "\"consumerBranch\"",
        ]
        .iter()
        .map(|key| text.find(key).expect("key present"))
        .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
        let again = build_consumer_request(&sample_pact(), "frontend", "v1", "").unwrap();
        assert_eq!(text.as_bytes(), again.as_slice());
    }

    #[test]
    fn consumer_request_requires_a_name() {
        let mut pact = sample_pact();
        pact.consumer.name.clear();
        let err = build_consumer_request(&pact, "", "v1", "main").unwrap_err();
        assert_eq!(
            err.to_string(),
            "consumer contract does not have a consumer name"
        );
    }

    #[test]
    fn provider_request_carries_format() {
        let spec = Spec::Yaml("openapi: 3.0.0\n".into());
        let bytes = build_provider_request(&spec, "orders", "", "main").unwrap();
        let value: JsonValue = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            value,
            json!({
                "spec": "openapi: 3.0.0\n",
                "providerName": "orders",
                "providerVersion": "",
                "providerBranch": "main",
                "specFormat": "yaml"
            })
        );
    }

    #[test]
    fn provider_request_requires_a_name_regardless_of_other_inputs() {
        let specs = [Spec::Json(json!({"openapi": "3.0.0"})), Spec::Yaml(String::new())];
        for spec in specs {
            for (version, branch) in [("", ""), ("v1", "main"), ("auto", "auto")] {
                let err = build_provider_request(&spec, "", version, branch).unwrap_err();
                assert!(matches!(err, BodyError::MissingProviderName));
            }
        }
    }

    #[test]
    fn environment_and_deployment_shapes() {
        let env: JsonValue =
            serde_json::from_slice(&build_environment_request("production").unwrap()).unwrap();
        assert_eq!(env, json!({"environmentName": "production"}));

        let deployment: JsonValue = serde_json::from_slice(
            &build_deployment_request("production", "user_service", "version1", false).unwrap(),
        )
        .unwrap();
        assert_eq!(
            deployment,
            json!({
                "environmentName": "production",
                "participantName": "user_service",
                "participantVersion": "version1",
                "deployed": false
            })
        );
    }
}
