//! Lightweight AWS HTTP Client with SigV4 signing
//!
//! Speaks the query and JSON protocols directly over HTTP instead of
//! pulling in one SDK crate per service.

use anyhow::anyhow;
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4::SigningParams;
use aws_smithy_runtime_api::client::identity::Identity;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use serde_json::{Map, Value};
use std::error::Error as _;
use std::time::SystemTime;
use tracing::{debug, trace, warn};

use super::credentials::Credentials;
use crate::operation::error::{RemoteError, TransportKind};
use crate::operation::path_extractor::{extract_by_path, value_to_string};

const EUSC_PREFIX: &str = "eusc-";

/// Mask sensitive credential values for logging
fn mask_credential(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

/// AWS Service definition
#[derive(Debug, Clone)]
pub struct ServiceDefinition {
    /// Service signing name (e.g., "ec2", "sts", "logs")
    pub signing_name: &'static str,
    /// Service endpoint prefix
    pub endpoint_prefix: &'static str,
    /// API version sent with query-protocol requests
    pub api_version: &'static str,
    /// Target prefix for JSON protocol (e.g., "DynamoDB_20120810")
    pub target_prefix: Option<&'static str>,
    /// JSON protocol content type version ("1.0" or "1.1")
    pub json_version: &'static str,
    /// Query lists serialize as `Name.N` instead of `Name.member.N` (EC2)
    pub flat_query_lists: bool,
    /// Whether this is a global service (signs with us-east-1)
    pub is_global: bool,
}

impl ServiceDefinition {
    const fn new(signing_name: &'static str, api_version: &'static str) -> Self {
        Self {
            signing_name,
            endpoint_prefix: signing_name,
            api_version,
            target_prefix: None,
            json_version: "1.1",
            flat_query_lists: false,
            is_global: false,
        }
    }
}

/// Service definitions for the services the catalog reaches
pub fn get_service(name: &str) -> Option<ServiceDefinition> {
    let service = match name {
        "ec2" => ServiceDefinition {
            flat_query_lists: true,
            ..ServiceDefinition::new("ec2", "2016-11-15")
        },
        "iam" => ServiceDefinition {
            is_global: true,
            ..ServiceDefinition::new("iam", "2010-05-08")
        },
        "sts" => ServiceDefinition::new("sts", "2011-06-15"),
        "sqs" => ServiceDefinition::new("sqs", "2012-11-05"),
        "sns" => ServiceDefinition::new("sns", "2010-03-31"),
        "dynamodb" => ServiceDefinition {
            target_prefix: Some("DynamoDB_20120810"),
            json_version: "1.0",
            ..ServiceDefinition::new("dynamodb", "2012-08-10")
        },
        "ssm" => ServiceDefinition {
            target_prefix: Some("AmazonSSM"),
            ..ServiceDefinition::new("ssm", "2014-11-06")
        },
        "cloudwatchlogs" | "logs" => ServiceDefinition {
            target_prefix: Some("Logs_20140328"),
            ..ServiceDefinition::new("logs", "2014-03-28")
        },
        "secretsmanager" => ServiceDefinition {
            target_prefix: Some("secretsmanager"),
            ..ServiceDefinition::new("secretsmanager", "2017-10-17")
        },
        _ => return None,
    };
    Some(service)
}

fn unknown_service(name: &str) -> RemoteError {
    RemoteError::Other(anyhow!("Unknown service: {}", name))
}

/// AWS HTTP Client
pub struct AwsHttpClient {
    http_client: Client,
    credentials: Credentials,
    region: String,
    endpoint_url: Option<String>,
}

impl AwsHttpClient {
    /// Create a new AWS HTTP client
    pub fn new(credentials: Credentials, region: &str, endpoint_url: Option<String>) -> Self {
        debug!(
            "Creating AWS HTTP client for region: {}, access_key: {}, endpoint_url: {:?}",
            region,
            mask_credential(&credentials.access_key_id),
            endpoint_url
        );
        Self {
            http_client: Client::new(),
            credentials,
            region: region.to_string(),
            endpoint_url,
        }
    }

    /// Determine which region should be used for a service (handles global services in ESC)
    fn effective_region<'a>(&'a self, service: &ServiceDefinition) -> &'a str {
        if service.is_global && !self.region.starts_with(EUSC_PREFIX) {
            "us-east-1"
        } else {
            &self.region
        }
    }

    /// Get the endpoint URL for a service
    fn get_endpoint(&self, service: &ServiceDefinition) -> String {
        // A custom endpoint applies to ALL services (LocalStack, etc.)
        if let Some(ref endpoint) = self.endpoint_url {
            return endpoint.trim_end_matches('/').to_string();
        }

        let domain = Self::endpoint_domain(&self.region);
        if service.is_global {
            return if domain == "amazonaws.eu" {
                format!("https://{}.{}.{}", service.endpoint_prefix, self.region, domain)
            } else {
                format!("https://{}.{}", service.endpoint_prefix, domain)
            };
        }

        format!(
            "https://{}.{}.{}",
            service.endpoint_prefix, self.region, domain
        )
    }

    /// Determine the endpoint domain for a region (standard vs. sovereign)
    fn endpoint_domain(region: &str) -> &'static str {
        if region.starts_with(EUSC_PREFIX) {
            "amazonaws.eu"
        } else {
            "amazonaws.com"
        }
    }

    /// Make a Query protocol request (EC2, IAM, SQS, etc.)
    pub async fn query_request(
        &self,
        service_name: &str,
        action: &str,
        params: &[(String, String)],
    ) -> Result<String, RemoteError> {
        debug!("Query request: service={}, action={}", service_name, action);
        trace!("Query params: {:?}", params);

        let service = get_service(service_name).ok_or_else(|| unknown_service(service_name))?;
        let endpoint = self.get_endpoint(&service);
        debug!("Endpoint: {}", endpoint);

        let mut query_params: Vec<(&str, &str)> =
            vec![("Action", action), ("Version", service.api_version)];
        query_params.extend(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let query_string: String = query_params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let url = format!("{}/?{}", endpoint, query_string);
        self.signed_request(&service, "POST", &url, "", &[]).await
    }

    /// Make a JSON protocol request (DynamoDB, SSM, Logs, etc.)
    pub async fn json_request(
        &self,
        service_name: &str,
        target: &str,
        body: &str,
    ) -> Result<String, RemoteError> {
        debug!("JSON request: service={}, target={}", service_name, target);
        trace!("JSON body: {}", body);

        let service = get_service(service_name).ok_or_else(|| unknown_service(service_name))?;
        let endpoint = self.get_endpoint(&service);
        let url = format!("{}/", endpoint);
        debug!("Endpoint: {}", endpoint);

        let target_header = format!(
            "{}.{}",
            service.target_prefix.unwrap_or(service.signing_name),
            target
        );
        let content_type = format!("application/x-amz-json-{}", service.json_version);

        let headers = [
            ("x-amz-target", target_header.as_str()),
            ("content-type", content_type.as_str()),
        ];
        self.signed_request(&service, "POST", &url, body, &headers)
            .await
    }

    /// Make a signed request
    async fn signed_request(
        &self,
        service: &ServiceDefinition,
        method: &str,
        url: &str,
        body: &str,
        extra_headers: &[(&str, &str)],
    ) -> Result<String, RemoteError> {
        let region = self.effective_region(service);

        let parsed_url = url::Url::parse(url).map_err(|e| anyhow!("Invalid URL {}: {}", url, e))?;
        let host = match (parsed_url.host_str(), parsed_url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(anyhow!("Invalid URL: {}", url).into()),
        };
        let path_and_query = match parsed_url.query() {
            Some(query) => format!("{}?{}", parsed_url.path(), query),
            None => parsed_url.path().to_string(),
        };

        let mut headers = vec![("host".to_string(), host)];
        headers.extend(extra_headers.iter().map(|(k, v)| (k.to_lowercase(), v.to_string())));

        let creds = aws_credential_types::Credentials::new(
            &self.credentials.access_key_id,
            &self.credentials.secret_access_key,
            self.credentials.session_token.clone(),
            None,
            "awsop",
        );
        let identity: Identity = creds.into();

        let signing_params = SigningParams::builder()
            .identity(&identity)
            .region(region)
            .name(service.signing_name)
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| anyhow!("Could not build signing params: {}", e))?
            .into();

        let signable_request = SignableRequest::new(
            method,
            &path_and_query,
            headers.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            SignableBody::Bytes(body.as_bytes()),
        )
        .map_err(|e| anyhow!("Could not sign request: {}", e))?;

        let (signing_instructions, _signature) = sign(signable_request, &signing_params)
            .map_err(|e| anyhow!("Could not sign request: {}", e))?
            .into_parts();

        let mut request = match method {
            "GET" => self.http_client.get(url),
            "POST" => self.http_client.post(url),
            _ => return Err(anyhow!("Unsupported HTTP method: {}", method).into()),
        };

        for (name, value) in signing_instructions.headers() {
            request = request.header(name.to_string(), value.to_string());
        }
        for (name, value) in extra_headers {
            request = request.header(*name, *value);
        }
        if !body.is_empty() {
            request = request.body(body.to_string());
        }

        trace!("Sending {} request to {}", method, url);
        let endpoint = format!("{}://{}", parsed_url.scheme(), headers[0].1);
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(&endpoint, &e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(&endpoint, &e))?;

        debug!("Response status: {}", status);
        trace!(
            "Response body (first 2000 chars): {}",
            text.chars().take(2000).collect::<String>()
        );

        if !status.is_success() {
            warn!(
                "AWS request failed: status={}, body={}",
                status,
                text.chars().take(500).collect::<String>()
            );
            return Err(parse_error_body(service.signing_name, status.as_u16(), &text));
        }

        Ok(text)
    }
}

/// Classify a reqwest failure into a transport error
fn transport_error(endpoint: &str, err: &reqwest::Error) -> RemoteError {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }

    let kind = if err.is_timeout() {
        TransportKind::Timeout
    } else if is_name_resolution(&message) {
        TransportKind::NameResolution
    } else if err.is_connect() {
        TransportKind::Connect
    } else {
        TransportKind::Other
    };

    RemoteError::Transport {
        kind,
        endpoint: endpoint.to_string(),
        message,
    }
}

fn is_name_resolution(message: &str) -> bool {
    let lower = message.to_lowercase();
    [
        "dns error",
        "failed to lookup address",
        "name or service not known",
        "nodename nor servname",
        "no such host",
    ]
    .iter()
    .any(|needle| lower.contains(needle))
}

/// Build a service error from a failed response body (JSON or XML)
pub fn parse_error_body(service: &str, status: u16, body: &str) -> RemoteError {
    let text = |value: Value| {
        let s = value_to_string(&value, "");
        (!s.is_empty()).then_some(s)
    };

    let (code, message, request_id) = if let Ok(json) = serde_json::from_str::<Value>(body) {
        // JSON protocol: {"__type": "com.amazonaws...#ResourceNotFoundException", "message": "..."}
        let code = text(extract_by_path(&json, "/__type"))
            .or_else(|| text(extract_by_path(&json, "/code")))
            .map(|t| t.rsplit('#').next().unwrap_or(&t).to_string());
        let message = text(extract_by_path(&json, "/message"))
            .or_else(|| text(extract_by_path(&json, "/Message")));
        (code, message, None)
    } else if let Ok(json) = xml_to_json(body) {
        // Query protocol: ErrorResponse/Error or, for EC2, Response/Errors/Error
        let error = ["/ErrorResponse/Error", "/Response/Errors/Error", "/Error"]
            .iter()
            .map(|path| extract_by_path(&json, path))
            .find(|v| !v.is_null())
            .unwrap_or_default();
        let request_id = text(extract_by_path(&json, "/ErrorResponse/RequestId"))
            .or_else(|| text(extract_by_path(&json, "/Response/RequestID")));
        (
            text(extract_by_path(&error, "/Code")),
            text(extract_by_path(&error, "/Message")),
            request_id,
        )
    } else {
        (None, None, None)
    };

    RemoteError::Service {
        service: service.to_string(),
        code: code.unwrap_or_else(|| format!("HTTP{}", status)),
        message: message.unwrap_or_else(|| body.chars().take(200).collect()),
        status,
        request_id,
    }
}

/// Convert a query-protocol XML document to JSON.
///
/// Leaf elements become strings, self-closing elements become null and
/// repeated siblings collapse into an array in document order.
pub fn xml_to_json(xml: &str) -> Result<Value, RemoteError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    // Bottom frame collects the document's root element
    let mut stack = vec![XmlFrame::default()];

    loop {
        let event = reader
            .read_event()
            .map_err(|e| anyhow!("XML parse error at byte {}: {}", reader.buffer_position(), e))?;
        match event {
            Event::Start(e) => stack.push(XmlFrame {
                name: tag_name(e.name().as_ref()),
                ..Default::default()
            }),
            Event::Empty(e) => {
                if let Some(parent) = stack.last_mut() {
                    parent.push_child(tag_name(e.name().as_ref()), Value::Null);
                }
            }
            Event::Text(e) => {
                let text = e
                    .xml_content()
                    .map_err(|e| anyhow!("XML parse error: {}", e))?;
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(text.trim());
                }
            }
            Event::End(_) => {
                if stack.len() < 2 {
                    return Err(anyhow!("XML parse error: unbalanced end tag").into());
                }
                if let Some(frame) = stack.pop() {
                    let (name, value) = frame.finish();
                    if let Some(parent) = stack.last_mut() {
                        parent.push_child(name, value);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match stack.pop() {
        Some(document) if stack.is_empty() && !document.children.is_empty() => {
            Ok(Value::Object(document.children))
        }
        Some(_) if !stack.is_empty() => {
            Err(anyhow!("XML parse error: document ends inside an element").into())
        }
        _ => Err(anyhow!("XML document has no root element").into()),
    }
}

#[derive(Default)]
struct XmlFrame {
    name: String,
    children: Map<String, Value>,
    text: String,
}

impl XmlFrame {
    fn push_child(&mut self, name: String, value: Value) {
        match self.children.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.children.insert(name, value);
            }
        }
    }

    fn finish(self) -> (String, Value) {
        let value = if self.children.is_empty() && !self.text.is_empty() {
            Value::String(self.text)
        } else {
            Value::Object(self.children)
        };
        (self.name, value)
    }
}

fn tag_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dummy_credentials() -> Credentials {
        Credentials {
            access_key_id: "TESTACCESSKEY".to_string(),
            secret_access_key: "TESTSECRETKEY".to_string(),
            session_token: None,
        }
    }

    fn client_with_region(region: &str) -> AwsHttpClient {
        AwsHttpClient::new(dummy_credentials(), region, None)
    }

    #[test]
    fn regional_service_endpoint() {
        let client = client_with_region("eu-west-1");
        let service = get_service("sqs").expect("sqs service definition");
        assert_eq!(client.get_endpoint(&service), "https://sqs.eu-west-1.amazonaws.com");
    }

    #[test]
    fn logs_alias_resolves() {
        let service = get_service("cloudwatchlogs").expect("logs service definition");
        assert_eq!(service.signing_name, "logs");
        assert_eq!(service.target_prefix, Some("Logs_20140328"));
    }

    #[test]
    fn iam_includes_region_for_esc() {
        let client = client_with_region("eusc-de-east-1");
        let service = get_service("iam").expect("iam service definition");
        assert_eq!(
            client.get_endpoint(&service),
            "https://iam.eusc-de-east-1.amazonaws.eu"
        );
        assert_eq!(client.effective_region(&service), "eusc-de-east-1");
    }

    #[test]
    fn iam_uses_classic_endpoint_for_standard_regions() {
        let client = client_with_region("us-west-2");
        let service = get_service("iam").expect("iam service definition");
        assert_eq!(client.get_endpoint(&service), "https://iam.amazonaws.com");
        assert_eq!(client.effective_region(&service), "us-east-1");
    }

    #[test]
    fn custom_endpoint_wins() {
        let client = AwsHttpClient::new(
            dummy_credentials(),
            "us-east-1",
            Some("http://localhost:4566/".to_string()),
        );
        let service = get_service("dynamodb").expect("dynamodb service definition");
        assert_eq!(client.get_endpoint(&service), "http://localhost:4566");
    }

    #[test]
    fn mask_credential_hides_middle() {
        assert_eq!(mask_credential("AKIA1234567890"), "AKIA...7890");
        assert_eq!(mask_credential("short"), "*****");
        assert_eq!(mask_credential("ÄKIA12345678Ü"), "ÄKIA...678Ü");
    }

    #[test]
    fn name_resolution_detection() {
        assert!(is_name_resolution(
            "error sending request: client error (Connect): dns error: failed to lookup address information"
        ));
        assert!(!is_name_resolution("connection refused"));
    }

    #[test]
    fn parse_json_error() {
        let body = r#"{"__type":"com.amazonaws.dynamodb.v20120810#ResourceNotFoundException","message":"Requested resource not found"}"#;
        match parse_error_body("dynamodb", 400, body) {
            RemoteError::Service { code, message, status, .. } => {
                assert_eq!(code, "ResourceNotFoundException");
                assert_eq!(message, "Requested resource not found");
                assert_eq!(status, 400);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn parse_query_error() {
        let body = r#"<ErrorResponse><Error><Type>Sender</Type><Code>AccessDenied</Code><Message>Access to the resource is denied.</Message></Error><RequestId>req-1</RequestId></ErrorResponse>"#;
        match parse_error_body("sqs", 403, body) {
            RemoteError::Service { code, message, request_id, .. } => {
                assert_eq!(code, "AccessDenied");
                assert_eq!(message, "Access to the resource is denied.");
                assert_eq!(request_id.as_deref(), Some("req-1"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn parse_ec2_error() {
        let body = r#"<Response><Errors><Error><Code>InvalidInstanceID.NotFound</Code><Message>The instance ID 'i-1' does not exist</Message></Error></Errors><RequestID>abc</RequestID></Response>"#;
        match parse_error_body("ec2", 400, body) {
            RemoteError::Service { code, request_id, .. } => {
                assert_eq!(code, "InvalidInstanceID.NotFound");
                assert_eq!(request_id.as_deref(), Some("abc"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn parse_unstructured_error() {
        match parse_error_body("sts", 502, "Bad Gateway") {
            RemoteError::Service { code, message, .. } => {
                assert_eq!(code, "HTTP502");
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn xml_empty_and_nested_elements() {
        let xml = r#"<DeleteQueueResponse><ResponseMetadata><RequestId>r-1</RequestId></ResponseMetadata><Marker/></DeleteQueueResponse>"#;
        let json = xml_to_json(xml).unwrap();
        assert_eq!(
            json,
            json!({"DeleteQueueResponse": {"ResponseMetadata": {"RequestId": "r-1"}, "Marker": null}})
        );
    }

    #[test]
    fn xml_truncated_document_is_an_error() {
        assert!(xml_to_json("<ListUsersResponse><ListUsersResult>").is_err());
        assert!(xml_to_json("Bad Gateway").is_err());
    }

    #[test]
    fn xml_repeated_elements_become_arrays() {
        let xml = r#"<ListQueuesResponse><ListQueuesResult><QueueUrl>https://q/1</QueueUrl><QueueUrl>https://q/2</QueueUrl></ListQueuesResult></ListQueuesResponse>"#;
        let json = xml_to_json(xml).unwrap();
        assert_eq!(
            json,
            json!({"ListQueuesResponse": {"ListQueuesResult": {"QueueUrl": ["https://q/1", "https://q/2"]}}})
        );
    }
}
