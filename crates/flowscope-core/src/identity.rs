// ── Device identity resolution ──
//
// Turns a client source IP into a display name and device kind.
// Lookups go through the appliance's helper endpoints at most once per IP;
// whatever comes out (including the synthetic fallback) is cached for the
// life of the process. Network failures never reach the caller.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::net::Ipv4Addr;

use dashmap::DashMap;
use flowscope_api::{ApplianceClient, DeviceInfoResponse};
use tracing::debug;

use crate::model::ClientKind;

// ── Lookup seam ──────────────────────────────────────────────────────

/// Network side of identity resolution.
pub trait IdentityLookup: Send + Sync {
    /// Reverse lookup; `Ok(None)` when the appliance has no name.
    fn hostname(
        &self,
        ip: &str,
    ) -> impl Future<Output = Result<Option<String>, flowscope_api::Error>> + Send;

    /// Fingerprint lookup.
    fn device_info(
        &self,
        ip: &str,
    ) -> impl Future<Output = Result<DeviceInfoResponse, flowscope_api::Error>> + Send;
}

impl IdentityLookup for ApplianceClient {
    async fn hostname(&self, ip: &str) -> Result<Option<String>, flowscope_api::Error> {
        Ok(self.resolve_hostname(ip).await?.hostname)
    }

    async fn device_info(&self, ip: &str) -> Result<DeviceInfoResponse, flowscope_api::Error> {
        ApplianceClient::device_info(self, ip).await
    }
}

/// Offline lookup: every IP resolves through the fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

impl IdentityLookup for NoLookup {
    async fn hostname(&self, _ip: &str) -> Result<Option<String>, flowscope_api::Error> {
        Ok(None)
    }

    async fn device_info(&self, _ip: &str) -> Result<DeviceInfoResponse, flowscope_api::Error> {
        Ok(DeviceInfoResponse::default())
    }
}

// ── Identity ─────────────────────────────────────────────────────────

/// Which resolution step produced an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    Hostname,
    DeviceInfo,
    Fallback,
}

/// Display identity of a client device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub kind: ClientKind,
    pub source: IdentitySource,
}

// ── Resolver ─────────────────────────────────────────────────────────

/// Memoizing resolver over an [`IdentityLookup`].
#[derive(Debug)]
pub struct IdentityResolver<L> {
    lookup: L,
    cache: DashMap<String, Identity>,
}

impl<L: IdentityLookup> IdentityResolver<L> {
    pub fn new(lookup: L) -> Self {
        Self {
            lookup,
            cache: DashMap::new(),
        }
    }

    /// Resolve one IP, hitting the network only on the first call.
    pub async fn resolve(&self, ip: &str) -> Identity {
        let cached = self.cache.get(ip).map(|entry| entry.value().clone());
        if let Some(identity) = cached {
            return identity;
        }

        let identity = self.lookup_identity(ip).await;
        self.cache
            .entry(ip.to_owned())
            .or_insert(identity)
            .value()
            .clone()
    }

    pub async fn resolve_name(&self, ip: &str) -> String {
        self.resolve(ip).await.name
    }

    pub async fn resolve_type(&self, ip: &str) -> ClientKind {
        self.resolve(ip).await.kind
    }

    /// Resolve every distinct IP concurrently.
    pub async fn resolve_all<I, S>(&self, ips: I) -> HashMap<String, Identity>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: BTreeSet<String> = ips.into_iter().map(|ip| ip.as_ref().to_owned()).collect();
        let lookups = unique.into_iter().map(|ip| async move {
            let identity = self.resolve(&ip).await;
            (ip, identity)
        });
        futures::future::join_all(lookups).await.into_iter().collect()
    }

    /// Cached identity without triggering a lookup.
    pub fn cached(&self, ip: &str) -> Option<Identity> {
        self.cache.get(ip).map(|entry| entry.value().clone())
    }

    /// Number of IPs resolved so far.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Hostname first, device info only when that yields nothing, then
    /// the fallback.
    async fn lookup_identity(&self, ip: &str) -> Identity {
        let hostname = self.lookup.hostname(ip).await.unwrap_or_else(|e| {
            debug!(ip, error = %e, "hostname lookup failed");
            None
        });
        if let Some(identity) = hostname.as_deref().and_then(|h| from_hostname(ip, h)) {
            return identity;
        }

        let info = self
            .lookup
            .device_info(ip)
            .await
            .map_err(|e| debug!(ip, error = %e, "device-info lookup failed"))
            .ok();
        if let Some(identity) = info.as_ref().and_then(|i| from_device_info(ip, i)) {
            return identity;
        }

        let identity = fallback_identity(ip);
        debug!(ip, name = %identity.name, kind = %identity.kind, "using fallback identity");
        identity
    }
}

// ── Pure helpers ─────────────────────────────────────────────────────

/// Combine lookup results into an identity, first success wins.
///
/// A hostname that is not just the IP echoed back decides the name, and
/// the kind comes from its keywords or the fallback. Otherwise a device
/// info answer carrying a name or an explicit type decides both. Anything
/// else is the fallback.
pub fn identify(ip: &str, hostname: Option<&str>, info: Option<&DeviceInfoResponse>) -> Identity {
    hostname
        .and_then(|h| from_hostname(ip, h))
        .or_else(|| info.and_then(|i| from_device_info(ip, i)))
        .unwrap_or_else(|| fallback_identity(ip))
}

/// Step one: the reverse lookup.
pub fn from_hostname(ip: &str, hostname: &str) -> Option<Identity> {
    let hostname = hostname.trim();
    if hostname.is_empty() || hostname == ip {
        return None;
    }
    let name = normalize_hostname(hostname)?;
    let kind = infer_kind(hostname).unwrap_or_else(|| fallback_identity(ip).kind);
    Some(Identity {
        name,
        kind,
        source: IdentitySource::Hostname,
    })
}

/// Step two: the fingerprint. Needs a name or an explicit type; the kind
/// is the explicit type, then keywords in user agent / vendor / OS.
pub fn from_device_info(ip: &str, info: &DeviceInfoResponse) -> Option<Identity> {
    let name = info
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());
    let explicit = info
        .device_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if name.is_none() && explicit.is_none() {
        return None;
    }

    let fallback = fallback_identity(ip);
    let kind = explicit
        .and_then(parse_device_type)
        .or_else(|| {
            let text = [&info.user_agent, &info.vendor, &info.os]
                .into_iter()
                .flatten()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" ");
            infer_kind(&text)
        })
        .unwrap_or(fallback.kind);

    Some(Identity {
        name: name.map_or(fallback.name, str::to_owned),
        kind,
        source: IdentitySource::DeviceInfo,
    })
}

/// `"dens-tv.lan"` becomes `"Dens Tv"`. `None` when nothing is left.
pub fn normalize_hostname(hostname: &str) -> Option<String> {
    let label = hostname.trim().split('.').next().unwrap_or_default();
    let words: Vec<String> = label
        .split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Parse an explicit type from the fingerprint endpoint.
fn parse_device_type(raw: &str) -> Option<ClientKind> {
    raw.trim().parse::<ClientKind>().ok().or_else(|| infer_kind(raw))
}

/// Keyword rules, checked in order. Short keywords must match a whole
/// token; longer ones may appear anywhere in the text.
const KEYWORDS: &[(ClientKind, &[&str])] = &[
    (
        ClientKind::Console,
        &["playstation", "xbox", "nintendo", "switch", "console", "gaming", "steamdeck", "ps4", "ps5"],
    ),
    (ClientKind::Tablet, &["ipad", "tablet", "kindle", "galaxy tab"]),
    (
        ClientKind::Tv,
        &["tv", "television", "roku", "chromecast", "bravia", "webos", "tizen", "firestick"],
    ),
    (
        ClientKind::Phone,
        &["iphone", "android", "phone", "mobile", "pixel", "oneplus", "ios"],
    ),
    (
        ClientKind::Laptop,
        &["macbook", "laptop", "thinkpad", "notebook", "chromebook", "xps"],
    ),
    (
        ClientKind::Iot,
        &[
            "iot", "espressif", "esp32", "esp8266", "nest", "echo", "alexa", "sonos", "camera",
            "thermostat", "tuya", "shelly", "hue", "printer", "speaker",
        ],
    ),
    (
        ClientKind::Desktop,
        &["desktop", "imac", "workstation", "pc", "windows", "macos", "linux", "computer"],
    ),
];

const SUBSTRING_MIN_LEN: usize = 5;

/// Guess a device kind from free text (user agent, vendor, hostname).
pub fn infer_kind(text: &str) -> Option<ClientKind> {
    let lower = text.to_ascii_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    KEYWORDS.iter().find_map(|(kind, words)| {
        let hit = words.iter().any(|word| {
            tokens.contains(word) || (word.len() >= SUBSTRING_MIN_LEN && lower.contains(word))
        });
        hit.then_some(*kind)
    })
}

// ── Deterministic fallback ───────────────────────────────────────────

const DESKTOP_NAMES: &[&str] = &["Desktop PC", "Workstation", "iMac"];
const LAPTOP_NAMES: &[&str] = &["MacBook Pro", "ThinkPad", "Laptop"];
const PHONE_NAMES: &[&str] = &["iPhone", "Android Phone", "Pixel"];
const TABLET_NAMES: &[&str] = &["iPad Air", "Galaxy Tab"];
const TV_NAMES: &[&str] = &["Smart TV", "Apple TV", "Chromecast"];
const CONSOLE_NAMES: &[&str] = &["Gaming Console", "PlayStation", "Xbox"];
const IOT_NAMES: &[&str] = &["Smart Speaker", "Thermostat", "Camera", "Smart Plug"];

fn names_for(kind: ClientKind) -> &'static [&'static str] {
    match kind {
        ClientKind::Desktop => DESKTOP_NAMES,
        ClientKind::Laptop => LAPTOP_NAMES,
        ClientKind::Phone => PHONE_NAMES,
        ClientKind::Tablet => TABLET_NAMES,
        ClientKind::Tv => TV_NAMES,
        ClientKind::Console => CONSOLE_NAMES,
        ClientKind::Iot => IOT_NAMES,
    }
}

/// Kind bucket by the last octet.
///
/// `0..50` desktop, `50..100` laptop, `100..150` phone, `150..200` tablet,
/// `200..230` TV, `230..=255` IoT. Consoles only come from keywords.
pub fn fallback_kind(last_octet: u8) -> ClientKind {
    match last_octet {
        0..50 => ClientKind::Desktop,
        50..100 => ClientKind::Laptop,
        100..150 => ClientKind::Phone,
        150..200 => ClientKind::Tablet,
        200..230 => ClientKind::Tv,
        _ => ClientKind::Iot,
    }
}

/// Seed from an IP: `third_octet * 256 + fourth_octet` for IPv4, a stable
/// byte hash folded into the same range for anything else.
pub fn ip_seed(ip: &str) -> u16 {
    if let Ok(addr) = ip.trim().parse::<Ipv4Addr>() {
        let [_, _, third, fourth] = addr.octets();
        return u16::from_be_bytes([third, fourth]);
    }
    let hash = ip
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
    let [_, _, hi, lo] = hash.to_be_bytes();
    u16::from_be_bytes([hi, lo])
}

/// Deterministic synthetic identity for an IP nothing else could name.
pub fn fallback_identity(ip: &str) -> Identity {
    let seed = ip_seed(ip);
    let [_, last_octet] = seed.to_be_bytes();
    let kind = fallback_kind(last_octet);
    let names = names_for(kind);
    let base = names[usize::from(seed) % names.len()];
    Identity {
        name: format!("{base} {:02}", seed % 100),
        kind,
        source: IdentitySource::Fallback,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;

    // ── Helpers ──────────────────────────────────────────────────────

    /// Lookup that always fails and counts attempts.
    #[derive(Default)]
    struct FailingLookup {
        calls: AtomicUsize,
    }

    impl IdentityLookup for FailingLookup {
        async fn hostname(&self, _ip: &str) -> Result<Option<String>, flowscope_api::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(flowscope_api::Error::Status {
                status: 502,
                endpoint: "/api/resolve-hostname".into(),
            })
        }

        async fn device_info(&self, _ip: &str) -> Result<DeviceInfoResponse, flowscope_api::Error> {
            Err(flowscope_api::Error::Tls("handshake".into()))
        }
    }

    /// Lookup with canned answers that counts device-info calls.
    struct StaticLookup {
        hostname: Option<String>,
        info: DeviceInfoResponse,
        info_calls: AtomicUsize,
    }

    impl StaticLookup {
        fn new(hostname: Option<&str>, info: DeviceInfoResponse) -> Self {
            Self {
                hostname: hostname.map(str::to_owned),
                info,
                info_calls: AtomicUsize::new(0),
            }
        }
    }

    impl IdentityLookup for StaticLookup {
        async fn hostname(&self, _ip: &str) -> Result<Option<String>, flowscope_api::Error> {
            Ok(self.hostname.clone())
        }

        async fn device_info(&self, _ip: &str) -> Result<DeviceInfoResponse, flowscope_api::Error> {
            self.info_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.info.clone())
        }
    }

    // ── Fallback ─────────────────────────────────────────────────────

    #[test]
    fn fallback_thresholds() {
        assert_eq!(fallback_kind(0), ClientKind::Desktop);
        assert_eq!(fallback_kind(49), ClientKind::Desktop);
        assert_eq!(fallback_kind(50), ClientKind::Laptop);
        assert_eq!(fallback_kind(99), ClientKind::Laptop);
        assert_eq!(fallback_kind(100), ClientKind::Phone);
        assert_eq!(fallback_kind(149), ClientKind::Phone);
        assert_eq!(fallback_kind(150), ClientKind::Tablet);
        assert_eq!(fallback_kind(199), ClientKind::Tablet);
        assert_eq!(fallback_kind(200), ClientKind::Tv);
        assert_eq!(fallback_kind(229), ClientKind::Tv);
        assert_eq!(fallback_kind(230), ClientKind::Iot);
        assert_eq!(fallback_kind(255), ClientKind::Iot);
    }

    #[test]
    fn fallback_is_pinned_for_known_ip() {
        // seed = 1 * 256 + 5 = 261
        assert_eq!(ip_seed("192.168.1.5"), 261);
        let identity = fallback_identity("192.168.1.5");
        assert_eq!(identity.kind, ClientKind::Desktop);
        assert_eq!(identity.name, "Desktop PC 61");
        assert_eq!(identity.source, IdentitySource::Fallback);
    }

    #[test]
    fn fallback_handles_non_ipv4() {
        let a = fallback_identity("fe80::1");
        let b = fallback_identity("fe80::1");
        assert_eq!(a, b);
        assert!(!a.name.is_empty());
    }

    // ── Heuristics ───────────────────────────────────────────────────

    #[test]
    fn hostname_normalization() {
        assert_eq!(normalize_hostname("dens-tv.lan").as_deref(), Some("Dens Tv"));
        assert_eq!(
            normalize_hostname("office_printer_2.example.com").as_deref(),
            Some("Office Printer 2")
        );
        assert_eq!(normalize_hostname(".lan"), None);
        assert_eq!(normalize_hostname(""), None);
    }

    #[test]
    fn keyword_inference() {
        assert_eq!(infer_kind("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0)"), Some(ClientKind::Phone));
        assert_eq!(infer_kind("Mozilla/5.0 (iPad; CPU OS 17_0)"), Some(ClientKind::Tablet));
        assert_eq!(infer_kind("Sony PlayStation 5"), Some(ClientKind::Console));
        assert_eq!(infer_kind("living-room-tv"), Some(ClientKind::Tv));
        assert_eq!(infer_kind("Espressif Inc."), Some(ClientKind::Iot));
        assert_eq!(infer_kind("Windows NT 10.0"), Some(ClientKind::Desktop));
        assert_eq!(infer_kind("Apple, Inc."), None);
        // "tv" must be a whole token.
        assert_eq!(infer_kind("ctvbox"), None);
    }

    #[test]
    fn hostname_echoing_ip_is_ignored() {
        let id = identify("192.168.1.5", Some("192.168.1.5"), None);
        assert_eq!(id, fallback_identity("192.168.1.5"));
    }

    #[test]
    fn name_and_kind_precedence() {
        let info = DeviceInfoResponse {
            name: Some("Kitchen Speaker".into()),
            device_type: Some("laptop".into()),
            user_agent: Some("Android 14 mobile".into()),
            ..DeviceInfoResponse::default()
        };
        // A usable hostname decides both; device info is not consulted.
        let id = identify("192.168.1.9", Some("dens-tv.lan"), Some(&info));
        assert_eq!(id.name, "Dens Tv");
        assert_eq!(id.kind, ClientKind::Tv);
        assert_eq!(id.source, IdentitySource::Hostname);

        // Without hostname: fingerprint name and explicit type.
        let id = identify("192.168.1.9", None, Some(&info));
        assert_eq!(id.name, "Kitchen Speaker");
        assert_eq!(id.kind, ClientKind::Laptop);
        assert_eq!(id.source, IdentitySource::DeviceInfo);

        // No explicit type: user-agent keywords.
        let info = DeviceInfoResponse {
            device_type: None,
            ..info
        };
        let id = identify("192.168.1.9", None, Some(&info));
        assert_eq!(id.kind, ClientKind::Phone);
    }

    #[test]
    fn device_info_needs_name_or_type() {
        let info = DeviceInfoResponse {
            vendor: Some("Apple, Inc.".into()),
            ..DeviceInfoResponse::default()
        };
        assert_eq!(from_device_info("192.168.1.5", &info), None);
        assert_eq!(
            identify("192.168.1.5", None, Some(&info)),
            fallback_identity("192.168.1.5")
        );

        // Type only: fallback name, explicit kind.
        let info = DeviceInfoResponse {
            device_type: Some("console".into()),
            ..DeviceInfoResponse::default()
        };
        let id = from_device_info("192.168.1.5", &info).unwrap();
        assert_eq!(id.name, fallback_identity("192.168.1.5").name);
        assert_eq!(id.kind, ClientKind::Console);
    }

    #[test]
    fn hostname_keywords_beat_fallback_kind() {
        // Last octet 5 would fall back to desktop.
        let id = identify("192.168.1.5", Some("living-room-tv"), None);
        assert_eq!(id.kind, ClientKind::Tv);
    }

    // ── Resolver ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn failing_lookup_is_deterministic_and_cached() {
        let resolver = IdentityResolver::new(FailingLookup::default());

        let first = resolver.resolve("192.168.1.5").await;
        let kind = resolver.resolve_type("192.168.1.5").await;
        let name = resolver.resolve_name("192.168.1.5").await;

        assert_eq!(first, fallback_identity("192.168.1.5"));
        assert_eq!(kind, first.kind);
        assert_eq!(name, first.name);
        assert_eq!(resolver.lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resolve_all_dedupes() {
        let resolver = IdentityResolver::new(FailingLookup::default());
        let out = resolver
            .resolve_all(["10.0.0.7", "10.0.0.8", "10.0.0.7"])
            .await;
        assert_eq!(out.len(), 2);
        assert_eq!(resolver.len(), 2);
        assert_eq!(resolver.lookup.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn static_lookup_uses_hostname() {
        let resolver = IdentityResolver::new(StaticLookup::new(
            Some("gaming-rig.home"),
            DeviceInfoResponse::default(),
        ));
        let id = resolver.resolve("192.168.1.20").await;
        assert_eq!(id.name, "Gaming Rig");
        assert_eq!(id.kind, ClientKind::Console);
        assert_eq!(resolver.cached("192.168.1.20"), Some(id));
    }

    #[tokio::test]
    async fn hostname_hit_skips_device_info() {
        let info = DeviceInfoResponse {
            device_type: Some("laptop".into()),
            ..DeviceInfoResponse::default()
        };
        let resolver = IdentityResolver::new(StaticLookup::new(Some("dens-tv.lan"), info));

        let id = resolver.resolve("192.168.1.9").await;
        assert_eq!(id.name, "Dens Tv");
        assert_eq!(id.kind, ClientKind::Tv);
        assert_eq!(resolver.lookup.info_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn hostname_miss_asks_device_info() {
        let info = DeviceInfoResponse {
            name: Some("Kitchen Speaker".into()),
            ..DeviceInfoResponse::default()
        };
        let resolver = IdentityResolver::new(StaticLookup::new(Some("192.168.1.9"), info));

        let id = resolver.resolve("192.168.1.9").await;
        assert_eq!(id.name, "Kitchen Speaker");
        assert_eq!(id.source, IdentitySource::DeviceInfo);
        assert_eq!(resolver.lookup.info_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_lookup_falls_back() {
        let resolver = IdentityResolver::new(NoLookup);
        let id = resolver.resolve("192.168.1.240").await;
        assert_eq!(id.kind, ClientKind::Iot);
    }
}
