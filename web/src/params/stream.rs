use serde::Deserialize;

/// Query parameters for the alerts stream endpoint.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct AlertStreamParams {
    pub(crate) ticket: Option<String>,
}

/// Query parameters for the device-scoped data stream endpoint.
///
/// `device_id` selects a single device; `device_ids` is a CSV list. The two
/// are merged and deduplicated by [`device_selector`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DataStreamParams {
    pub(crate) ticket: Option<String>,
    pub(crate) device_id: Option<String>,
    pub(crate) device_ids: Option<String>,
    /// When false, the per-device status snapshot emitted at stream start is
    /// suppressed. Defaults to emitting it.
    pub(crate) include_status: Option<bool>,
}

/// Merge the singular and CSV device selectors into a deduplicated list,
/// preserving first-seen order.
pub(crate) fn device_selector(
    device_id: Option<&str>,
    device_ids: Option<&str>,
) -> Vec<String> {
    let mut devices: Vec<String> = Vec::new();

    let mut push = |raw: &str| {
        let id = raw.trim();
        if !id.is_empty() && !devices.iter().any(|seen| seen == id) {
            devices.push(id.to_string());
        }
    };

    if let Some(id) = device_id {
        push(id);
    }
    if let Some(csv) = device_ids {
        for id in csv.split(',') {
            push(id);
        }
    }

    devices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_merges_and_dedupes() {
        let devices = device_selector(Some("C02"), Some("C03,C02,C04"));
        assert_eq!(devices, vec!["C02", "C03", "C04"]);
    }

    #[test]
    fn test_selector_trims_and_skips_blanks() {
        let devices = device_selector(None, Some(" C02 ,, C03 ,"));
        assert_eq!(devices, vec!["C02", "C03"]);
    }

    #[test]
    fn test_selector_with_no_input_is_empty() {
        assert!(device_selector(None, None).is_empty());
        assert!(device_selector(None, Some("")).is_empty());
    }
}
