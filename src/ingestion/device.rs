//! User-agent to device-class normalization.

use crate::models::DeviceType;

const MOBILE_HINTS: &[&str] = &[
    "mobile", "iphone", "ipod", "android", "blackberry", "windows phone", "opera mini", "ipad",
    "tablet", "kindle", "silk", "playbook",
];

const DESKTOP_HINTS: &[&str] = &[
    "windows nt", "macintosh", "x11", "linux x86_64", "cros", "smart-tv", "smarttv", "xbox",
    "playstation", "nintendo",
];

/// Classifies a request user-agent into a device class.
///
/// Mobile hints win over desktop hints so hybrid strings like Android
/// tablets land in the mobile bucket. Anything unrecognized, including a
/// missing header, is treated as desktop.
pub fn device_type_from_user_agent(user_agent: Option<&str>) -> DeviceType {
    let Some(user_agent) = user_agent else {
        return DeviceType::Desktop;
    };
    let ua = user_agent.to_ascii_lowercase();

    if MOBILE_HINTS.iter().any(|hint| ua.contains(hint)) {
        return DeviceType::Mobile;
    }
    if DESKTOP_HINTS.iter().any(|hint| ua.contains(hint)) {
        return DeviceType::Desktop;
    }
    DeviceType::Desktop
}
