// Controller API response and resource types
//
// Every site-scoped endpoint wraps its payload in the `ApiResponse<T>`
// envelope. Resource fields are all optional: the controller omits what it
// doesn't know, and updates only touch what the caller sets. Fields this
// crate doesn't model survive a get -> update round trip via `extra`, and
// enum values it doesn't know survive it as their raw text.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

// ── Response Envelope ────────────────────────────────────────────────

/// Standard UniFi API response envelope.
///
/// ```json
/// { "meta": { "rc": "ok", "msg": "optional" }, "data": [...] }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub meta: Meta,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Metadata from the envelope. `rc` == `"ok"` means success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub rc: String,
    /// Error message key, e.g. `api.err.FirewallGroupExisted`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    /// The conflicting group name when a duplicate name was used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The conflicting rule index when a duplicate index was used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_index: Option<i64>,
}

impl Meta {
    pub fn is_ok(&self) -> bool {
        self.rc == "ok"
    }

    /// Human-readable summary of a failed `meta` block.
    pub fn describe(&self) -> String {
        let mut message = self
            .msg
            .clone()
            .unwrap_or_else(|| format!("rc={}", self.rc));
        if let Some(ref name) = self.name {
            message.push_str(&format!(" (name: {name})"));
        }
        if let Some(index) = self.rule_index {
            message.push_str(&format!(" (rule_index: {index})"));
        }
        message
    }
}

/// A field the controller refused, with the pattern it expected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Shape of a `data` entry when the request failed validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataValidationError {
    #[serde(
        default,
        rename = "validationError",
        skip_serializing_if = "Option::is_none"
    )]
    pub validation_error: Option<ValidationError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

/// UniFi OS wraps some errors as `{"error":{"code":N,"message":"..."}}` with HTTP 200.
#[derive(Deserialize)]
struct UnifiOsError {
    error: Option<UnifiOsErrorInner>,
}

#[derive(Deserialize)]
struct UnifiOsErrorInner {
    code: u16,
    message: Option<String>,
}

/// Turn an error envelope into `Error::Api`, collecting validation details.
pub(crate) fn api_error(meta: &Meta, data: Vec<serde_json::Value>) -> Error {
    let validation = data
        .into_iter()
        .filter_map(|item| serde_json::from_value::<DataValidationError>(item).ok())
        .filter_map(|item| item.validation_error)
        .collect();
    Error::Api {
        message: meta.describe(),
        validation,
    }
}

/// Parse an envelope body, returning `data` on success.
///
/// Handles both the `{ meta, data }` envelope (`meta.rc != "ok"` becomes
/// `Error::Api`) and the UniFi OS `{"error": {...}}` shape.
pub(crate) fn decode_envelope<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, Error> {
    if let Ok(wrapper) = serde_json::from_str::<UnifiOsError>(body) {
        if let Some(err) = wrapper.error {
            let msg = err.message.unwrap_or_default();
            return Err(if err.code == 401 {
                Error::Authentication { message: msg }
            } else {
                Error::Http {
                    status: err.code,
                    message: format!("UniFi OS error: {msg}"),
                }
            });
        }
    }

    let envelope: ApiResponse<serde_json::Value> =
        serde_json::from_str(body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(body)),
            body: body.to_owned(),
        })?;

    if !envelope.meta.is_ok() {
        return Err(api_error(&envelope.meta, envelope.data));
    }

    envelope
        .data
        .into_iter()
        .map(|item| {
            serde_json::from_value(item.clone()).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: item.to_string(),
            })
        })
        .collect()
}

/// Leading slice of a response body for error messages and logs.
pub(crate) fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}

// ── Firewall enums ───────────────────────────────────────────────────

/// Closed value sets as the controller spells them on the wire.
///
/// A value newer firmware sends that isn't listed lands in `Unknown` with
/// its raw text, and serializes back as that text, so a get -> update round
/// trip never rewrites it.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// A value this crate doesn't model, kept verbatim.
            Unknown(String),
        }

        impl $name {
            /// The value as the controller spells it.
            pub fn as_str(&self) -> &str {
                match self {
                    $( Self::$variant => $wire, )+
                    Self::Unknown(raw) => raw,
                }
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                match raw {
                    $( $wire => Self::$variant, )+
                    other => Self::Unknown(other.to_owned()),
                }
            }
        }

        impl FromStr for $name {
            type Err = Infallible;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                Ok(Self::from(raw))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Ok(Self::from(raw.as_str()))
            }
        }
    };
}

wire_enum! {
    /// Where and in which direction a firewall rule applies.
    pub enum Ruleset {
        /// IPv4 traffic from a WAN network, destined for other networks.
        WanIn => "WAN_IN",
        /// IPv4 traffic from other networks, destined for a WAN network.
        WanOut => "WAN_OUT",
        /// IPv4 traffic from a WAN network, destined for the gateway itself.
        WanLocal => "WAN_LOCAL",
        LanIn => "LAN_IN",
        LanOut => "LAN_OUT",
        LanLocal => "LAN_LOCAL",
        GuestIn => "GUEST_IN",
        GuestOut => "GUEST_OUT",
        GuestLocal => "GUEST_LOCAL",
        WanV6In => "WANv6_IN",
        WanV6Out => "WANv6_OUT",
        WanV6Local => "WANv6_LOCAL",
        LanV6In => "LANv6_IN",
        LanV6Out => "LANv6_OUT",
        LanV6Local => "LANv6_LOCAL",
        GuestV6In => "GUESTv6_IN",
        GuestV6Out => "GUESTv6_OUT",
        GuestV6Local => "GUESTv6_LOCAL",
    }
}

impl Ruleset {
    /// IPv6 rulesets use `protocol_v6` / `icmpv6_typename` instead of the
    /// IPv4 protocol fields.
    pub fn is_ipv6(&self) -> bool {
        matches!(
            self,
            Self::WanV6In
                | Self::WanV6Out
                | Self::WanV6Local
                | Self::LanV6In
                | Self::LanV6Out
                | Self::LanV6Local
                | Self::GuestV6In
                | Self::GuestV6Out
                | Self::GuestV6Local
        )
    }
}

wire_enum! {
    /// What a firewall rule does with matched traffic.
    pub enum FirewallAction {
        /// Traffic is allowed.
        Accept => "accept",
        /// Traffic is dropped and the source gets a response.
        Reject => "reject",
        /// Traffic is silently dropped.
        Drop => "drop",
    }
}

wire_enum! {
    /// How a rule's advanced (state/IPsec/logging) settings are managed.
    pub enum SettingPreference {
        /// The controller picks advanced settings automatically.
        Auto => "auto",
        /// Advanced settings are taken from the rule.
        Manual => "manual",
    }
}

wire_enum! {
    /// How a source/destination network is matched on IPv4 rules.
    pub enum NetworkConfType {
        /// The gateway address of the network.
        AddressV4 => "ADDRv4",
        /// The whole subnet of the network.
        NetworkV4 => "NETv4",
    }
}

wire_enum! {
    /// Kind of members a firewall group holds.
    pub enum GroupType {
        /// IPv4 addresses and subnets.
        AddressGroup => "address-group",
        /// IPv6 addresses and subnets.
        Ipv6AddressGroup => "ipv6-address-group",
        /// Ports and port ranges, e.g. `80`, `8000-9000`.
        PortGroup => "port-group",
    }
}

// ── Firewall rule ────────────────────────────────────────────────────

/// A firewall rule from `rest/firewallrule`.
///
/// All fields are optional so partial payloads can be sent; the
/// controller rejects incomplete creates with a validation error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirewallRule {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    /// Lower indexes are matched first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ruleset: Option<Ruleset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<FirewallAction>,

    /// IPv4 protocol: `all`, `tcp_udp`, a protocol name, or an IANA number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// ICMP type name when `protocol` is `icmp`, e.g. `echo-request`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icmp_typename: Option<String>,
    /// IPv6 protocol: `all`, a protocol name, or an IANA number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_v6: Option<String>,
    /// ICMPv6 type name when `protocol_v6` is `icmpv6`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icmpv6_typename: Option<String>,
    /// Match every protocol except the selected one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_match_excepted: Option<bool>,

    #[serde(
        rename = "src_firewallgroup_ids",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub src_firewall_group_ids: Option<Vec<String>>,
    #[serde(
        rename = "src_networkconf_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub src_network_conf_id: Option<String>,
    #[serde(
        rename = "src_networkconf_type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub src_network_conf_type: Option<NetworkConfType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_address: Option<String>,
    /// Comma-separated ports and ranges, e.g. `80,443,8000-9000`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_mac_address: Option<String>,

    #[serde(
        rename = "dst_firewallgroup_ids",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub dst_firewall_group_ids: Option<Vec<String>>,
    #[serde(
        rename = "dst_networkconf_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub dst_network_conf_id: Option<String>,
    #[serde(
        rename = "dst_networkconf_type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub dst_network_conf_type: Option<NetworkConfType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst_port: Option<String>,

    /// `manual` is required for the state/IPsec/logging fields to apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setting_preference: Option<SettingPreference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_new: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_invalid: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_established: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_related: Option<bool>,
    /// `match-ipsec`, `match-none`, or empty for any traffic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipsec: Option<String>,
    /// Write a syslog entry when the rule matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<bool>,

    /// Catch-all for fields not modelled above.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ── Firewall group ───────────────────────────────────────────────────

/// An address or port group from `rest/firewallgroup`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirewallGroup {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_type: Option<GroupType>,
    /// Addresses or ports, depending on `group_type`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_members: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl FirewallGroup {
    pub fn new(
        name: impl Into<String>,
        group_type: GroupType,
        members: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            group_type: Some(group_type),
            group_members: Some(members.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn rule_omits_unset_fields_but_keeps_false() {
        let rule = FirewallRule {
            name: Some("block iot".into()),
            enabled: Some(false),
            ruleset: Some(Ruleset::LanIn),
            action: Some(FirewallAction::Drop),
            src_firewall_group_ids: Some(vec!["g1".into()]),
            ..FirewallRule::default()
        };
        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            json!({
                "name": "block iot",
                "enabled": false,
                "ruleset": "LAN_IN",
                "action": "drop",
                "src_firewallgroup_ids": ["g1"],
            })
        );
    }

    #[test]
    fn rule_keeps_unknown_fields() {
        let rule: FirewallRule = serde_json::from_value(json!({
            "_id": "r1",
            "ruleset": "WANv6_LOCAL",
            "action": "accept",
            "src_networkconf_type": "NETv4",
            "some_future_field": 7,
        }))
        .unwrap();
        assert_eq!(rule.id.as_deref(), Some("r1"));
        assert_eq!(rule.ruleset, Some(Ruleset::WanV6Local));
        assert!(Ruleset::WanV6Local.is_ipv6());
        assert_eq!(rule.src_network_conf_type, Some(NetworkConfType::NetworkV4));
        assert_eq!(rule.extra.get("some_future_field"), Some(&json!(7)));

        let back = serde_json::to_value(&rule).unwrap();
        assert_eq!(back["some_future_field"], json!(7));
    }

    #[test]
    fn unknown_enum_values_keep_raw_text() {
        let rule: FirewallRule = serde_json::from_value(json!({
            "ruleset": "VPN_IN",
            "action": "tarpit",
            "setting_preference": "custom",
        }))
        .unwrap();
        assert_eq!(rule.ruleset, Some(Ruleset::Unknown("VPN_IN".into())));
        assert_eq!(rule.action, Some(FirewallAction::Unknown("tarpit".into())));
        assert!(!Ruleset::Unknown("VPNv6_IN".into()).is_ipv6());

        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            json!({
                "ruleset": "VPN_IN",
                "action": "tarpit",
                "setting_preference": "custom",
            })
        );
    }

    #[test]
    fn unknown_group_type_displays_raw_text() {
        let group: FirewallGroup =
            serde_json::from_value(json!({ "group_type": "mac-group" })).unwrap();
        let group_type = group.group_type.unwrap();
        assert_eq!(group_type, GroupType::Unknown("mac-group".into()));
        assert_eq!(group_type.to_string(), "mac-group");
    }

    #[test]
    fn enums_parse_wire_names() {
        assert_eq!("GUESTv6_OUT".parse::<Ruleset>().ok(), Some(Ruleset::GuestV6Out));
        assert_eq!(
            "ipv6-address-group".parse::<GroupType>().ok(),
            Some(GroupType::Ipv6AddressGroup)
        );
        assert_eq!(GroupType::PortGroup.to_string(), "port-group");
        assert_eq!(Ruleset::WanLocal.to_string(), "WAN_LOCAL");
    }

    #[test]
    fn group_new_sets_fields() {
        let group = FirewallGroup::new("web", GroupType::PortGroup, ["80", "443"]);
        assert_eq!(
            serde_json::to_value(&group).unwrap(),
            json!({
                "name": "web",
                "group_type": "port-group",
                "group_members": ["80", "443"],
            })
        );
    }

    #[test]
    fn decode_envelope_returns_data() {
        let body = r#"{"meta":{"rc":"ok"},"data":[{"_id":"g1","name":"web"}]}"#;
        let groups: Vec<FirewallGroup> = decode_envelope(body).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name.as_deref(), Some("web"));
    }

    #[test]
    fn decode_envelope_surfaces_validation() {
        let body = r#"{
            "meta": {"rc": "error", "msg": "api.err.Invalid"},
            "data": [{
                "validationError": {"field": "group_members", "pattern": "^[0-9]+$"},
                "rc": "error",
                "msg": "api.err.Invalid"
            }]
        }"#;
        let err = decode_envelope::<FirewallGroup>(body).unwrap_err();
        match err {
            Error::Api {
                ref message,
                ref validation,
            } => {
                assert_eq!(message, "api.err.Invalid");
                assert_eq!(validation.len(), 1);
                assert_eq!(validation[0].field.as_deref(), Some("group_members"));
            }
            other => panic!("expected Api error, got: {other:?}"),
        }
    }

    #[test]
    fn decode_envelope_describes_duplicates() {
        let body = r#"{"meta":{"rc":"error","msg":"api.err.FirewallGroupExisted","name":"web"},"data":[]}"#;
        let err = decode_envelope::<FirewallGroup>(body).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Controller API error: api.err.FirewallGroupExisted (name: web)"
        );
    }

    #[test]
    fn decode_envelope_unifi_os_error() {
        let body = r#"{"error":{"code":401,"message":"Unauthorized"}}"#;
        let err = decode_envelope::<FirewallGroup>(body).unwrap_err();
        assert!(matches!(err, Error::Authentication { .. }));
    }

    #[test]
    fn decode_envelope_rejects_garbage() {
        let err = decode_envelope::<FirewallGroup>("<html>").unwrap_err();
        assert!(matches!(err, Error::Deserialization { .. }));
    }
}
