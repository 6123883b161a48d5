// UPnP device-description document.
//
// Canon bodies put their CCAPI details in namespaced vendor elements
// (`<ns:X_accessURL xmlns:ns="urn:schemas-canon-com:schema-upnp">`). The
// prefix is not stable across firmware, so each field is looked up through
// an ordered list of name-matching strategies.

use std::time::Duration;

use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::Error;

/// How an element name is compared against a wanted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractStrategy {
    /// Exact qualified name, prefix included (`ns:X_accessURL`).
    Qualified,
    /// Local name with any prefix stripped (`X_accessURL`).
    LocalName,
    /// Local name, ASCII case-insensitive.
    LocalNameIgnoreCase,
}

/// Strategies in the order they are tried.
pub const EXTRACT_STRATEGIES: [ExtractStrategy; 3] = [
    ExtractStrategy::Qualified,
    ExtractStrategy::LocalName,
    ExtractStrategy::LocalNameIgnoreCase,
];

impl ExtractStrategy {
    fn matches(self, element: &str, wanted: &str) -> bool {
        match self {
            Self::Qualified => element == wanted,
            Self::LocalName => local_name(element) == local_name(wanted),
            Self::LocalNameIgnoreCase => {
                local_name(element).eq_ignore_ascii_case(local_name(wanted))
            }
        }
    }
}

fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// Text content of every element, in document order.
#[derive(Debug, Clone, Default)]
pub struct ElementTexts {
    entries: Vec<(String, String)>,
}

impl ElementTexts {
    /// First non-empty text for `wanted`, trying each strategy in turn.
    pub fn lookup(&self, wanted: &str) -> Option<&str> {
        EXTRACT_STRATEGIES.iter().find_map(|strategy| {
            self.entries
                .iter()
                .find(|(name, text)| !text.is_empty() && strategy.matches(name, wanted))
                .map(|(_, text)| text.as_str())
        })
    }

    /// Every non-empty text for `wanted` under the first strategy that
    /// finds any.
    pub fn lookup_all(&self, wanted: &str) -> Vec<&str> {
        for strategy in EXTRACT_STRATEGIES {
            let found: Vec<&str> = self
                .entries
                .iter()
                .filter(|(name, text)| !text.is_empty() && strategy.matches(name, wanted))
                .map(|(_, text)| text.as_str())
                .collect();
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collect element texts from an XML document.
pub fn collect_texts(xml: &str) -> Result<ElementTexts, Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut entries = Vec::new();
    let mut saw_element = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                saw_element = true;
                stack.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Ok(Event::Empty(_)) => saw_element = true,
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Text(t)) => {
                if let Some(name) = stack.last() {
                    let text = t
                        .unescape()
                        .map_err(|e| Error::Description(e.to_string()))?;
                    entries.push((name.clone(), text.trim().to_owned()));
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(name) = stack.last() {
                    let text = String::from_utf8_lossy(&c).trim().to_owned();
                    entries.push((name.clone(), text));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(Error::Description(format!(
                    "XML error at position {}: {e}",
                    reader.buffer_position()
                )));
            }
        }
    }

    if !saw_element {
        return Err(Error::Description("document has no elements".into()));
    }
    Ok(ElementTexts { entries })
}

/// Fields of interest from a camera's device description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescription {
    pub friendly_name: Option<String>,
    pub manufacturer: Option<String>,
    pub model_name: Option<String>,
    pub serial_number: Option<String>,
    pub udn: Option<String>,
    pub presentation_url: Option<String>,
    /// CCAPI root (`X_accessURL`).
    pub access_url: Option<String>,
    pub nickname: Option<String>,
    /// Camera reports it is already paired with another client.
    pub on_service: bool,
    pub device_usage: Option<String>,
    pub service_types: Vec<String>,
}

impl DeviceDescription {
    pub fn from_texts(texts: &ElementTexts) -> Self {
        let field = |name: &str| texts.lookup(name).map(str::to_owned);
        Self {
            friendly_name: field("friendlyName"),
            manufacturer: field("manufacturer"),
            model_name: field("modelName"),
            serial_number: field("serialNumber"),
            udn: field("UDN"),
            presentation_url: field("presentationURL"),
            access_url: field("ns:X_accessURL"),
            nickname: field("ns:X_deviceNickname"),
            on_service: texts
                .lookup("ns:X_onService")
                .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
            device_usage: field("ns:X_deviceUsage"),
            service_types: texts
                .lookup_all("serviceType")
                .into_iter()
                .map(str::to_owned)
                .collect(),
        }
    }
}

/// Parse a device-description document.
pub fn parse_description(xml: &str) -> Result<DeviceDescription, Error> {
    let texts = collect_texts(xml)?;
    Ok(DeviceDescription::from_texts(&texts))
}

/// GET and parse the description at an SSDP `Location` (plain HTTP).
pub async fn fetch_description(
    http: &reqwest::Client,
    location: &Url,
    timeout: Duration,
) -> Result<DeviceDescription, Error> {
    debug!(%location, "fetching device description");
    let resp = http
        .get(location.clone())
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                }
            } else {
                Error::Transport(e)
            }
        })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(Error::Api {
            status: status.as_u16(),
            message: format!("description fetch failed for {location}"),
        });
    }
    let body = resp.text().await?;
    parse_description(&body)
}
