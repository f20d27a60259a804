//! Envelope model: the header part of every multipart message.
//!
//! Inbound headers are first read into a [`PartialEnvelope`] where every
//! field is optional, so that a rejection can still be correlated against
//! whatever was parsed. [`EnvelopeBuilder`] then enforces the required
//! fields and yields an immutable [`Envelope`].

use crate::domain::error::EnvelopeError;
use crate::domain::reason::RejectionReason;
use crate::domain::request::Route;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Vocabulary namespace of message and token types
pub const IDS_NAMESPACE: &str = "https://w3id.org/idsa/core/";
/// Vocabulary namespace of codes (token formats, rejection reasons)
pub const IDSC_NAMESPACE: &str = "https://w3id.org/idsa/code/";
/// Type tag of dynamic attribute tokens
pub const DYNAMIC_ATTRIBUTE_TOKEN: &str = "ids:DynamicAttributeToken";

// =============================================================================
// MESSAGE TYPE
// =============================================================================

/// Closed set of message types understood by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    RequestMessage,
    LogMessage,
    QueryMessage,
    RejectionMessage,
    ProcessedNotification,
    ResultMessage,
}

impl MessageType {
    pub const ALL: [MessageType; 6] = [
        MessageType::RequestMessage,
        MessageType::LogMessage,
        MessageType::QueryMessage,
        MessageType::RejectionMessage,
        MessageType::ProcessedNotification,
        MessageType::ResultMessage,
    ];

    /// Local name inside the vocabulary namespace
    pub fn local_name(&self) -> &'static str {
        match self {
            MessageType::RequestMessage => "RequestMessage",
            MessageType::LogMessage => "LogMessage",
            MessageType::QueryMessage => "QueryMessage",
            MessageType::RejectionMessage => "RejectionMessage",
            MessageType::ProcessedNotification => "MessageProcessedNotificationMessage",
            MessageType::ResultMessage => "ResultMessage",
        }
    }

    /// Compact wire name, e.g. `ids:LogMessage`
    pub fn wire_name(&self) -> String {
        format!("ids:{}", self.local_name())
    }

    /// Accepts the compact (`ids:X`), expanded (`https://w3id.org/idsa/core/X`)
    /// and bare (`X`) forms.
    pub fn from_wire(value: &str) -> Option<Self> {
        let local = value
            .strip_prefix("ids:")
            .or_else(|| value.strip_prefix(IDS_NAMESPACE))
            .unwrap_or(value);
        Self::ALL.iter().copied().find(|t| t.local_name() == local)
    }

    /// Route that owns this type, if any.
    pub fn route(&self) -> Option<Route> {
        match self {
            MessageType::LogMessage => Some(Route::Log),
            MessageType::RequestMessage => Some(Route::CreateProcess),
            MessageType::QueryMessage => Some(Route::Query),
            _ => None,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ids:{}", self.local_name())
    }
}

impl Serialize for MessageType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.wire_name())
    }
}

impl<'de> Deserialize<'de> for MessageType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        MessageType::from_wire(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown message type: {}", raw)))
    }
}

// =============================================================================
// CONTEXT & TIMESTAMPS
// =============================================================================

/// JSON-LD `@context` prefix map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(pub BTreeMap<String, serde_json::Value>);

impl Default for Context {
    fn default() -> Self {
        let mut prefixes = BTreeMap::new();
        prefixes.insert("ids".to_string(), IDS_NAMESPACE.into());
        prefixes.insert("idsc".to_string(), IDSC_NAMESPACE.into());
        Self(prefixes)
    }
}

/// Issue timestamp of a message, normalized to UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct IssuedAt(DateTime<Utc>);

impl IssuedAt {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Parse RFC 3339, or a naive `yyyy-MM-ddTHH:mm:ss[.SSS]` taken as UTC.
    pub fn parse(value: &str) -> Result<Self, EnvelopeError> {
        let trimmed = value.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Self(dt.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Self(naive.and_utc()))
            .map_err(|_| EnvelopeError::InvalidTimestamp(value.to_string()))
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// RFC 3339 with millisecond precision
    pub fn to_wire(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl From<DateTime<Utc>> for IssuedAt {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl Serialize for IssuedAt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire())
    }
}

// =============================================================================
// SECURITY TOKEN
// =============================================================================

/// Format of the token value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenFormat {
    Jwt,
    Other(String),
}

impl TokenFormat {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "idsc:JWT" | "https://w3id.org/idsa/code/JWT" | "JWT" => TokenFormat::Jwt,
            other => TokenFormat::Other(other.to_string()),
        }
    }

    pub fn is_jwt(&self) -> bool {
        matches!(self, TokenFormat::Jwt)
    }

    pub fn as_uri(&self) -> &str {
        match self {
            TokenFormat::Jwt => "idsc:JWT",
            TokenFormat::Other(other) => other,
        }
    }
}

impl Serialize for TokenFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        jsonld::UriRef::new(self.as_uri()).serialize(serializer)
    }
}

/// Security token attached to a message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityToken {
    #[serde(rename = "@type")]
    token_type: String,
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "ids:tokenFormat")]
    token_format: TokenFormat,
    #[serde(rename = "ids:tokenValue")]
    token_value: String,
}

impl SecurityToken {
    /// A JWT-formatted dynamic attribute token.
    pub fn jwt(id: impl Into<String>, token_value: impl Into<String>) -> Self {
        Self {
            token_type: DYNAMIC_ATTRIBUTE_TOKEN.to_string(),
            id: id.into(),
            token_format: TokenFormat::Jwt,
            token_value: token_value.into(),
        }
    }

    /// Build from the partial form. A missing `@id` is filled by `generate_id`.
    pub fn from_partial(
        partial: &PartialSecurityToken,
        generate_id: impl FnOnce() -> String,
    ) -> Result<Self, EnvelopeError> {
        let token_value = non_blank(&partial.token_value)
            .ok_or(EnvelopeError::MissingField("ids:tokenValue"))?;
        let token_format = non_blank(&partial.token_format)
            .map(TokenFormat::parse)
            .ok_or(EnvelopeError::MissingField("ids:tokenFormat"))?;
        Ok(Self {
            token_type: non_blank(&partial.token_type)
                .unwrap_or(DYNAMIC_ATTRIBUTE_TOKEN)
                .to_string(),
            id: non_blank(&partial.id)
                .map(str::to_string)
                .unwrap_or_else(generate_id),
            token_format,
            token_value: token_value.to_string(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    pub fn token_format(&self) -> &TokenFormat {
        &self.token_format
    }

    pub fn token_value(&self) -> &str {
        &self.token_value
    }
}

/// Security token as read off the wire
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PartialSecurityToken {
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
    #[serde(rename = "@type", default)]
    pub token_type: Option<String>,
    #[serde(
        rename = "ids:tokenFormat",
        alias = "tokenFormat",
        default,
        deserialize_with = "jsonld::opt_uri"
    )]
    pub token_format: Option<String>,
    #[serde(rename = "ids:tokenValue", alias = "tokenValue", default)]
    pub token_value: Option<String>,
}

// =============================================================================
// ENVELOPE
// =============================================================================

/// Validated, immutable message header
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    #[serde(rename = "@context")]
    context: Context,
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type")]
    message_type: MessageType,
    #[serde(rename = "ids:securityToken", skip_serializing_if = "Option::is_none")]
    security_token: Option<SecurityToken>,
    #[serde(rename = "ids:issuerConnector", serialize_with = "jsonld::ser_uri")]
    issuer_connector: String,
    #[serde(rename = "ids:senderAgent", serialize_with = "jsonld::ser_uri")]
    sender_agent: String,
    #[serde(rename = "ids:modelVersion")]
    model_version: String,
    #[serde(rename = "ids:issued")]
    issued: IssuedAt,
    #[serde(
        rename = "ids:recipientConnector",
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "jsonld::ser_uri_list"
    )]
    recipient_connector: Vec<String>,
    #[serde(
        rename = "ids:recipientAgent",
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "jsonld::ser_uri_list"
    )]
    recipient_agent: Vec<String>,
    #[serde(
        rename = "ids:correlationMessage",
        skip_serializing_if = "Option::is_none",
        serialize_with = "jsonld::ser_opt_uri"
    )]
    correlation_message: Option<String>,
    #[serde(rename = "ids:rejectionReason", skip_serializing_if = "Option::is_none")]
    rejection_reason: Option<RejectionReason>,
}

impl Envelope {
    pub fn builder() -> EnvelopeBuilder {
        EnvelopeBuilder::default()
    }

    /// Parse and validate a header in one go.
    pub fn parse(bytes: &[u8], generate_id: impl FnOnce() -> String) -> Result<Self, EnvelopeError> {
        let partial = PartialEnvelope::parse(bytes)?;
        EnvelopeBuilder::from_partial(&partial, generate_id)?.build()
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn security_token(&self) -> Option<&SecurityToken> {
        self.security_token.as_ref()
    }

    pub fn issuer_connector(&self) -> &str {
        &self.issuer_connector
    }

    pub fn sender_agent(&self) -> &str {
        &self.sender_agent
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    pub fn issued(&self) -> IssuedAt {
        self.issued
    }

    pub fn recipient_connector(&self) -> &[String] {
        &self.recipient_connector
    }

    pub fn recipient_agent(&self) -> &[String] {
        &self.recipient_agent
    }

    pub fn correlation_message(&self) -> Option<&str> {
        self.correlation_message.as_deref()
    }

    pub fn rejection_reason(&self) -> Option<RejectionReason> {
        self.rejection_reason
    }
}

/// Builder enforcing the required envelope fields.
///
/// Required: id, type, issuer connector, sender agent, model version,
/// issued. A security token is required for every type except
/// `ids:RejectionMessage`.
#[derive(Debug, Clone, Default)]
pub struct EnvelopeBuilder {
    context: Option<Context>,
    id: Option<String>,
    message_type: Option<MessageType>,
    security_token: Option<SecurityToken>,
    issuer_connector: Option<String>,
    sender_agent: Option<String>,
    model_version: Option<String>,
    issued: Option<IssuedAt>,
    recipient_connector: Vec<String>,
    recipient_agent: Vec<String>,
    correlation_message: Option<String>,
    rejection_reason: Option<RejectionReason>,
}

impl EnvelopeBuilder {
    /// Seed a builder from a partially parsed header.
    pub fn from_partial(
        partial: &PartialEnvelope,
        generate_id: impl FnOnce() -> String,
    ) -> Result<Self, EnvelopeError> {
        let issued = match non_blank(&partial.issued) {
            Some(raw) => Some(IssuedAt::parse(raw)?),
            None => None,
        };
        let security_token = match &partial.security_token {
            Some(token) => Some(SecurityToken::from_partial(token, generate_id)?),
            None => None,
        };
        Ok(Self {
            context: partial.context.clone(),
            id: non_blank(&partial.id).map(str::to_string),
            message_type: partial.message_type,
            security_token,
            issuer_connector: non_blank(&partial.issuer_connector).map(str::to_string),
            sender_agent: non_blank(&partial.sender_agent).map(str::to_string),
            model_version: non_blank(&partial.model_version).map(str::to_string),
            issued,
            recipient_connector: partial.recipient_connector.clone(),
            recipient_agent: partial.recipient_agent.clone(),
            correlation_message: non_blank(&partial.correlation_message).map(str::to_string),
            rejection_reason: partial.rejection_reason,
        })
    }

    pub fn context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn message_type(mut self, message_type: MessageType) -> Self {
        self.message_type = Some(message_type);
        self
    }

    pub fn security_token(mut self, token: SecurityToken) -> Self {
        self.security_token = Some(token);
        self
    }

    pub fn issuer_connector(mut self, uri: impl Into<String>) -> Self {
        self.issuer_connector = Some(uri.into());
        self
    }

    pub fn sender_agent(mut self, uri: impl Into<String>) -> Self {
        self.sender_agent = Some(uri.into());
        self
    }

    pub fn model_version(mut self, version: impl Into<String>) -> Self {
        self.model_version = Some(version.into());
        self
    }

    pub fn issued(mut self, issued: IssuedAt) -> Self {
        self.issued = Some(issued);
        self
    }

    pub fn recipient_connector(mut self, uri: impl Into<String>) -> Self {
        self.recipient_connector.push(uri.into());
        self
    }

    pub fn recipient_agent(mut self, uri: impl Into<String>) -> Self {
        self.recipient_agent.push(uri.into());
        self
    }

    pub fn correlation_message(mut self, id: impl Into<String>) -> Self {
        self.correlation_message = Some(id.into());
        self
    }

    pub fn rejection_reason(mut self, reason: RejectionReason) -> Self {
        self.rejection_reason = Some(reason);
        self
    }

    pub fn build(self) -> Result<Envelope, EnvelopeError> {
        let id = required(self.id, "@id")?;
        let message_type = self
            .message_type
            .ok_or(EnvelopeError::MissingField("@type"))?;
        let issuer_connector = required(self.issuer_connector, "ids:issuerConnector")?;
        let sender_agent = required(self.sender_agent, "ids:senderAgent")?;
        let model_version = required(self.model_version, "ids:modelVersion")?;
        let issued = self.issued.ok_or(EnvelopeError::MissingField("ids:issued"))?;
        if self.security_token.is_none() && message_type != MessageType::RejectionMessage {
            return Err(EnvelopeError::MissingField("ids:securityToken"));
        }
        if message_type == MessageType::RejectionMessage && self.rejection_reason.is_none() {
            return Err(EnvelopeError::MissingField("ids:rejectionReason"));
        }

        Ok(Envelope {
            context: self.context.unwrap_or_default(),
            id,
            message_type,
            security_token: self.security_token,
            issuer_connector,
            sender_agent,
            model_version,
            issued,
            recipient_connector: self.recipient_connector,
            recipient_agent: self.recipient_agent,
            correlation_message: self.correlation_message,
            rejection_reason: self.rejection_reason,
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, EnvelopeError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(EnvelopeError::MissingField(field)),
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

// =============================================================================
// PARTIAL ENVELOPE
// =============================================================================

/// Header as read off the wire, every field optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PartialEnvelope {
    #[serde(rename = "@context", default)]
    pub context: Option<Context>,
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
    #[serde(rename = "@type", default)]
    pub message_type: Option<MessageType>,
    #[serde(rename = "ids:securityToken", alias = "securityToken", default)]
    pub security_token: Option<PartialSecurityToken>,
    #[serde(
        rename = "ids:issuerConnector",
        alias = "issuerConnector",
        default,
        deserialize_with = "jsonld::opt_uri"
    )]
    pub issuer_connector: Option<String>,
    #[serde(
        rename = "ids:senderAgent",
        alias = "senderAgent",
        default,
        deserialize_with = "jsonld::opt_uri"
    )]
    pub sender_agent: Option<String>,
    #[serde(rename = "ids:modelVersion", alias = "modelVersion", default)]
    pub model_version: Option<String>,
    #[serde(
        rename = "ids:issued",
        alias = "issued",
        default,
        deserialize_with = "jsonld::opt_literal"
    )]
    pub issued: Option<String>,
    #[serde(
        rename = "ids:recipientConnector",
        alias = "recipientConnector",
        default,
        deserialize_with = "jsonld::uri_list"
    )]
    pub recipient_connector: Vec<String>,
    #[serde(
        rename = "ids:recipientAgent",
        alias = "recipientAgent",
        default,
        deserialize_with = "jsonld::uri_list"
    )]
    pub recipient_agent: Vec<String>,
    #[serde(
        rename = "ids:correlationMessage",
        alias = "correlationMessage",
        default,
        deserialize_with = "jsonld::opt_uri"
    )]
    pub correlation_message: Option<String>,
    #[serde(rename = "ids:rejectionReason", alias = "rejectionReason", default)]
    pub rejection_reason: Option<RejectionReason>,
}

impl PartialEnvelope {
    pub fn parse(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        serde_json::from_slice(bytes).map_err(|e| EnvelopeError::Parse(e.to_string()))
    }

    /// First missing header field, in validation order. The security
    /// token is checked separately.
    pub fn first_missing_field(&self) -> Option<&'static str> {
        let checks: [(&'static str, bool); 6] = [
            ("@id", non_blank(&self.id).is_some()),
            ("@type", self.message_type.is_some()),
            ("ids:modelVersion", non_blank(&self.model_version).is_some()),
            ("ids:issued", non_blank(&self.issued).is_some()),
            ("ids:issuerConnector", non_blank(&self.issuer_connector).is_some()),
            ("ids:senderAgent", non_blank(&self.sender_agent).is_some()),
        ];
        checks
            .iter()
            .find(|(_, present)| !present)
            .map(|(field, _)| *field)
    }

    /// Whatever is known about the caller, for addressing a rejection.
    pub fn correlation(&self) -> Correlation {
        Correlation {
            message_id: non_blank(&self.id).map(str::to_string),
            issuer_connector: non_blank(&self.issuer_connector).map(str::to_string),
            sender_agent: non_blank(&self.sender_agent).map(str::to_string),
        }
    }
}

/// Fields of an inbound message that a response refers back to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Correlation {
    pub message_id: Option<String>,
    pub issuer_connector: Option<String>,
    pub sender_agent: Option<String>,
}

impl Correlation {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.message_id.is_none() && self.issuer_connector.is_none() && self.sender_agent.is_none()
    }
}

impl From<&Envelope> for Correlation {
    fn from(envelope: &Envelope) -> Self {
        Self {
            message_id: Some(envelope.id.clone()),
            issuer_connector: Some(envelope.issuer_connector.clone()),
            sender_agent: Some(envelope.sender_agent.clone()),
        }
    }
}

// =============================================================================
// JSON-LD HELPERS
// =============================================================================

mod jsonld {
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// `{"@id": "..."}` reference
    #[derive(Serialize)]
    pub struct UriRef<'a> {
        #[serde(rename = "@id")]
        id: &'a str,
    }

    impl<'a> UriRef<'a> {
        pub fn new(id: &'a str) -> Self {
            Self { id }
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum UriRepr {
        Plain(String),
        Reference {
            #[serde(rename = "@id")]
            id: String,
        },
    }

    impl UriRepr {
        fn into_string(self) -> String {
            match self {
                UriRepr::Plain(s) | UriRepr::Reference { id: s } => s,
            }
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum LiteralRepr {
        Plain(String),
        Typed {
            #[serde(rename = "@value")]
            value: String,
        },
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum UriListRepr {
        Many(Vec<UriRepr>),
        One(UriRepr),
    }

    pub fn opt_uri<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<UriRepr>::deserialize(d)?.map(UriRepr::into_string))
    }

    pub fn opt_literal<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<LiteralRepr>::deserialize(d)?.map(|l| match l {
            LiteralRepr::Plain(s) | LiteralRepr::Typed { value: s } => s,
        }))
    }

    pub fn uri_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match Option::<UriListRepr>::deserialize(d)? {
            Some(UriListRepr::Many(items)) => items.into_iter().map(UriRepr::into_string).collect(),
            Some(UriListRepr::One(item)) => vec![item.into_string()],
            None => Vec::new(),
        })
    }

    pub fn ser_uri<S: Serializer>(value: &str, s: S) -> Result<S::Ok, S::Error> {
        UriRef::new(value).serialize(s)
    }

    pub fn ser_opt_uri<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => UriRef::new(v).serialize(s),
            None => s.serialize_none(),
        }
    }

    pub fn ser_uri_list<S: Serializer>(values: &[String], s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(values.len()))?;
        for v in values {
            seq.serialize_element(&UriRef::new(v))?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_header() -> serde_json::Value {
        json!({
            "@context": {
                "ids": "https://w3id.org/idsa/core/",
                "idsc": "https://w3id.org/idsa/code/"
            },
            "@type": "ids:LogMessage",
            "@id": "https://w3id.org/idsa/autogen/logMessage/c6c15a91-7d6c-4fb5-b13a-ef1fbc17b7ba",
            "ids:modelVersion": "4.1.0",
            "ids:issued": {
                "@value": "2024-03-01T12:00:00.000+01:00",
                "@type": "http://www.w3.org/2001/XMLSchema#dateTimeStamp"
            },
            "ids:issuerConnector": {"@id": "https://connector.example.com"},
            "ids:senderAgent": "https://connector.example.com",
            "ids:securityToken": {
                "@type": "ids:DynamicAttributeToken",
                "@id": "https://w3id.org/idsa/autogen/dat/1",
                "ids:tokenFormat": {"@id": "idsc:JWT"},
                "ids:tokenValue": "a.b.c"
            }
        })
    }

    fn fixed_id() -> String {
        "urn:generated".to_string()
    }

    #[test]
    fn test_message_type_wire_forms() {
        assert_eq!(
            MessageType::from_wire("ids:LogMessage"),
            Some(MessageType::LogMessage)
        );
        assert_eq!(
            MessageType::from_wire("https://w3id.org/idsa/core/QueryMessage"),
            Some(MessageType::QueryMessage)
        );
        assert_eq!(
            MessageType::from_wire("ids:MessageProcessedNotificationMessage"),
            Some(MessageType::ProcessedNotification)
        );
        assert_eq!(MessageType::from_wire("ids:BogusMessage"), None);
    }

    #[test]
    fn test_message_type_routes() {
        assert_eq!(MessageType::LogMessage.route(), Some(Route::Log));
        assert_eq!(MessageType::RequestMessage.route(), Some(Route::CreateProcess));
        assert_eq!(MessageType::QueryMessage.route(), Some(Route::Query));
        assert_eq!(MessageType::ResultMessage.route(), None);
    }

    #[test]
    fn test_parse_full_header() {
        let bytes = serde_json::to_vec(&sample_header()).unwrap();
        let envelope = Envelope::parse(&bytes, fixed_id).unwrap();

        assert_eq!(envelope.message_type(), MessageType::LogMessage);
        assert_eq!(envelope.issuer_connector(), "https://connector.example.com");
        assert_eq!(envelope.sender_agent(), "https://connector.example.com");
        assert_eq!(envelope.issued().to_wire(), "2024-03-01T11:00:00.000Z");
        let token = envelope.security_token().unwrap();
        assert!(token.token_format().is_jwt());
        assert_eq!(token.token_value(), "a.b.c");
    }

    #[test]
    fn test_token_id_generated_when_absent() {
        let mut header = sample_header();
        header["ids:securityToken"]
            .as_object_mut()
            .unwrap()
            .remove("@id");
        let bytes = serde_json::to_vec(&header).unwrap();
        let envelope = Envelope::parse(&bytes, fixed_id).unwrap();
        assert_eq!(envelope.security_token().unwrap().id(), "urn:generated");
    }

    #[test]
    fn test_unknown_type_fails_parse() {
        let mut header = sample_header();
        header["@type"] = json!("ids:BogusMessage");
        let bytes = serde_json::to_vec(&header).unwrap();
        assert!(matches!(
            PartialEnvelope::parse(&bytes),
            Err(EnvelopeError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_field_detection_order() {
        let mut header = sample_header();
        let obj = header.as_object_mut().unwrap();
        obj.remove("ids:modelVersion");
        obj.remove("ids:senderAgent");
        let partial: PartialEnvelope = serde_json::from_value(header).unwrap();
        assert_eq!(partial.first_missing_field(), Some("ids:modelVersion"));
    }

    #[test]
    fn test_partial_correlation_survives_missing_fields() {
        let header = json!({
            "@id": "urn:msg:1",
            "ids:issuerConnector": "https://caller.example.com"
        });
        let partial: PartialEnvelope = serde_json::from_value(header).unwrap();
        let correlation = partial.correlation();
        assert_eq!(correlation.message_id.as_deref(), Some("urn:msg:1"));
        assert_eq!(
            correlation.issuer_connector.as_deref(),
            Some("https://caller.example.com")
        );
        assert!(correlation.sender_agent.is_none());
    }

    #[test]
    fn test_builder_rejects_blank_required_field() {
        let result = Envelope::builder()
            .id("urn:msg:1")
            .message_type(MessageType::LogMessage)
            .security_token(SecurityToken::jwt("urn:token", "a.b.c"))
            .issuer_connector("   ")
            .sender_agent("https://agent")
            .model_version("4.1.0")
            .issued(IssuedAt::now())
            .build();
        assert_eq!(
            result,
            Err(EnvelopeError::MissingField("ids:issuerConnector"))
        );
    }

    #[test]
    fn test_rejection_needs_no_token_but_needs_reason() {
        let base = Envelope::builder()
            .id("urn:msg:2")
            .message_type(MessageType::RejectionMessage)
            .issuer_connector("https://gateway")
            .sender_agent("https://gateway")
            .model_version("4.1.0")
            .issued(IssuedAt::now());

        assert_eq!(
            base.clone().build(),
            Err(EnvelopeError::MissingField("ids:rejectionReason"))
        );
        let rejection = base
            .rejection_reason(RejectionReason::NotFound)
            .build()
            .unwrap();
        assert!(rejection.security_token().is_none());
    }

    #[test]
    fn test_serialized_envelope_shape() {
        let envelope = Envelope::builder()
            .id("urn:msg:3")
            .message_type(MessageType::ProcessedNotification)
            .security_token(SecurityToken::jwt("urn:token", "x.y.z"))
            .issuer_connector("https://gateway")
            .sender_agent("https://gateway")
            .model_version("4.1.0")
            .issued(IssuedAt::parse("2024-01-01T00:00:00Z").unwrap())
            .recipient_connector("https://caller")
            .correlation_message("urn:msg:1")
            .build()
            .unwrap();

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["@type"], "ids:MessageProcessedNotificationMessage");
        assert_eq!(json["ids:issuerConnector"]["@id"], "https://gateway");
        assert_eq!(json["ids:recipientConnector"][0]["@id"], "https://caller");
        assert_eq!(json["ids:correlationMessage"]["@id"], "urn:msg:1");
        assert_eq!(json["ids:issued"], "2024-01-01T00:00:00.000Z");
        assert_eq!(json["ids:securityToken"]["ids:tokenFormat"]["@id"], "idsc:JWT");
        assert!(json.get("ids:rejectionReason").is_none());
    }

    #[test]
    fn test_issued_accepts_naive_timestamp() {
        let issued = IssuedAt::parse("2021-06-23T17:27:23.566").unwrap();
        assert_eq!(issued.to_wire(), "2021-06-23T17:27:23.566Z");
        assert!(IssuedAt::parse("yesterday").is_err());
    }

    #[test]
    fn test_token_format_recognition() {
        assert!(TokenFormat::parse("idsc:JWT").is_jwt());
        assert!(TokenFormat::parse("https://w3id.org/idsa/code/JWT").is_jwt());
        assert!(!TokenFormat::parse("idsc:OTHER").is_jwt());
    }
}
