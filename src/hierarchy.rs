//! UI hierarchy extraction.
//!
//! Fetches a uiautomator dump (fast streamed path with an on-device
//! fallback), strips the diagnostic text framing the payload, and flattens
//! the XML into interactive-element descriptors in document order.

use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

use crate::device::adb;

const END_MARKER: &str = "</hierarchy>";
const REMOTE_DUMP_PATH: &str = "/sdcard/ui_dump.xml";

#[derive(Debug, Clone, Serialize)]
pub struct Bounds {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// One element from the view hierarchy snapshot. No identity persists across
/// dumps; the list index is only meaningful within a single snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct UiNode {
    pub class: String,
    pub resource_id: String,
    pub content_desc: String,
    pub text: String,
    pub bounds: Bounds,
    pub clickable: bool,
    pub enabled: bool,
    pub focusable: bool,
}

#[derive(Debug, Serialize)]
pub struct DumpReport {
    pub serial: Option<String>,
    pub xml: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<UiNode>>,
}

/// Fetch and normalize the hierarchy dump, optionally parsing it.
pub async fn dump_ui(serial: Option<&str>, parse: bool) -> Result<DumpReport> {
    let xml = match fetch_streamed(serial).await {
        Ok(xml) => xml,
        Err(err) => {
            log::debug!("streamed ui dump failed, falling back to pull: {err:#}");
            fetch_pulled(serial).await?
        }
    };

    let nodes = parse.then(|| parse_hierarchy(&xml));

    Ok(DumpReport {
        serial: serial.map(str::to_string),
        xml,
        nodes,
    })
}

/// Fast path: stream the dump over exec-out without touching device storage.
async fn fetch_streamed(serial: Option<&str>) -> Result<String> {
    let result = adb::run_adb(serial, &["exec-out", "uiautomator", "dump", "/dev/tty"]).await?;
    Ok(normalize_dump(&result.stdout))
}

/// Fallback: dump to device storage, pull to a local temp file, read it back.
async fn fetch_pulled(serial: Option<&str>) -> Result<String> {
    adb::run_adb(serial, &["shell", "uiautomator", "dump", REMOTE_DUMP_PATH]).await?;

    let local = std::env::temp_dir().join(format!("ui_dump_{}.xml", Uuid::new_v4()));
    let local_str = local.to_string_lossy().to_string();
    adb::run_adb(serial, &["pull", REMOTE_DUMP_PATH, &local_str]).await?;

    let raw = std::fs::read(&local)
        .with_context(|| format!("failed to read pulled dump {}", local.display()))?;
    let _ = std::fs::remove_file(&local);

    Ok(normalize_dump(&String::from_utf8_lossy(&raw)))
}

/// Strip incidental log text framing the dump, such as the trailing
/// "UI hierchary dumped to: /dev/tty" line uiautomator emits.
///
/// Returns exactly the substring from the first `<?xml` declaration through
/// the first closing `</hierarchy>` inclusive. Without a declaration the
/// input passes through unchanged; without a closing tag everything from the
/// declaration onward is kept.
pub fn normalize_dump(raw: &str) -> String {
    let Some(start) = raw.find("<?xml") else {
        return raw.to_string();
    };
    match raw[start..].find(END_MARKER) {
        Some(offset) => raw[start..start + offset + END_MARKER.len()].to_string(),
        None => raw[start..].to_string(),
    }
}

/// Pull the four integers out of a `[x1,y1][x2,y2]` attribute.
///
/// The scan is a permissive signed-digit-run search rather than a strict
/// format match; anything that does not resolve to exactly four integers is
/// rejected.
pub fn parse_bounds(bounds: &str) -> Option<(i32, i32, i32, i32)> {
    let re = Regex::new(r"-?\d+").unwrap();
    let values: Vec<i32> = re
        .find_iter(bounds)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    if values.len() != 4 {
        return None;
    }
    Some((values[0], values[1], values[2], values[3]))
}

/// Walk every element of the normalized dump and emit a descriptor for each
/// one carrying a parseable bounds attribute. Elements without bounds, or
/// with malformed bounds, are silently skipped. Output order is document
/// order (pre-order, depth-first).
pub fn parse_hierarchy(xml: &str) -> Vec<UiNode> {
    let mut nodes = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let mut class = String::new();
                let mut resource_id = String::new();
                let mut content_desc = String::new();
                let mut text = String::new();
                let mut raw_bounds: Option<String> = None;
                let mut clickable = false;
                let mut enabled = false;
                let mut focusable = false;

                for attr in e.attributes().filter_map(|a| a.ok()) {
                    let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
                    let value = attr
                        .unescape_value()
                        .map(|v| v.to_string())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).to_string());

                    match key.as_str() {
                        "class" => class = value,
                        "resource-id" => resource_id = value,
                        "content-desc" => content_desc = value,
                        "text" => text = value,
                        "bounds" => raw_bounds = Some(value),
                        "clickable" => clickable = value == "true",
                        "enabled" => enabled = value == "true",
                        "focusable" => focusable = value == "true",
                        _ => {}
                    }
                }

                if let Some(raw) = raw_bounds {
                    if let Some((x1, y1, x2, y2)) = parse_bounds(&raw) {
                        nodes.push(UiNode {
                            class,
                            resource_id,
                            content_desc,
                            text,
                            bounds: Bounds { x1, y1, x2, y2 },
                            clickable,
                            enabled,
                            focusable,
                        });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                log::warn!("ui dump parse error: {err:?}");
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bounds_valid() {
        assert_eq!(parse_bounds("[0,0][454,454]"), Some((0, 0, 454, 454)));
        assert_eq!(parse_bounds("[10,20][30,40]"), Some((10, 20, 30, 40)));
    }

    #[test]
    fn test_parse_bounds_negative_coordinates() {
        assert_eq!(parse_bounds("[-5,10][20,30]"), Some((-5, 10, 20, 30)));
    }

    #[test]
    fn test_parse_bounds_rejects_wrong_count() {
        assert_eq!(parse_bounds("[0,0][454]"), None);
        assert_eq!(parse_bounds("[0,0][1,2][3,4]"), None);
        assert_eq!(parse_bounds("no digits here"), None);
        assert_eq!(parse_bounds(""), None);
    }

    #[test]
    fn test_normalize_dump_strips_framing() {
        let raw = "some leading noise\n<?xml version='1.0'?><hierarchy rotation=\"0\"><node/></hierarchy>\nUI hierchary dumped to: /dev/tty\n";
        let normalized = normalize_dump(raw);
        assert!(normalized.starts_with("<?xml"));
        assert!(normalized.ends_with("</hierarchy>"));
        assert!(!normalized.contains("noise"));
        assert!(!normalized.contains("dumped to"));
    }

    #[test]
    fn test_normalize_dump_without_declaration_passes_through() {
        let raw = "not xml at all";
        assert_eq!(normalize_dump(raw), raw);
    }

    #[test]
    fn test_normalize_dump_without_closing_tag_keeps_tail() {
        let raw = "junk<?xml version='1.0'?><hierarchy><node/>";
        assert_eq!(
            normalize_dump(raw),
            "<?xml version='1.0'?><hierarchy><node/>"
        );
    }

    #[test]
    fn test_parse_hierarchy_extracts_descriptors() {
        let xml = r#"<?xml version='1.0'?><hierarchy rotation="0"><node class="android.widget.Button" resource-id="com.example:id/ok" content-desc="Confirm" text="OK" bounds="[0,0][100,50]" clickable="true" enabled="true" focusable="true"/></hierarchy>"#;
        let nodes = parse_hierarchy(xml);
        assert_eq!(nodes.len(), 1);
        let node = &nodes[0];
        assert_eq!(node.class, "android.widget.Button");
        assert_eq!(node.resource_id, "com.example:id/ok");
        assert_eq!(node.content_desc, "Confirm");
        assert_eq!(node.text, "OK");
        assert_eq!(node.bounds.x2, 100);
        assert!(node.clickable);
        assert!(node.enabled);
        assert!(node.focusable);
    }

    #[test]
    fn test_parse_hierarchy_skips_malformed_bounds() {
        let xml = r#"<?xml version='1.0'?><hierarchy><node text="good" bounds="[0,0][10,10]"/><node text="bad" bounds="[0,0][10]"/></hierarchy>"#;
        let nodes = parse_hierarchy(xml);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].text, "good");
    }

    #[test]
    fn test_parse_hierarchy_skips_elements_without_bounds() {
        // The root element carries no bounds attribute and must not appear.
        let xml = r#"<?xml version='1.0'?><hierarchy rotation="0"><node text="a" bounds="[1,2][3,4]"/></hierarchy>"#;
        let nodes = parse_hierarchy(xml);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].text, "a");
    }

    #[test]
    fn test_parse_hierarchy_preserves_document_order() {
        let xml = r#"<?xml version='1.0'?><hierarchy><node text="outer" bounds="[0,0][100,100]"><node text="inner" bounds="[10,10][20,20]"/></node><node text="sibling" bounds="[0,100][100,200]"/></hierarchy>"#;
        let nodes = parse_hierarchy(xml);
        let order: Vec<&str> = nodes.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(order, vec!["outer", "inner", "sibling"]);
    }

    #[test]
    fn test_parse_hierarchy_decodes_entities() {
        let xml = r#"<?xml version='1.0'?><hierarchy><node text="Devices &amp; Groups" content-desc="" bounds="[0,0][100,100]"/></hierarchy>"#;
        let nodes = parse_hierarchy(xml);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].text, "Devices & Groups");
    }

    #[test]
    fn test_parse_hierarchy_defaults_flags_to_false() {
        let xml = r#"<?xml version='1.0'?><hierarchy><node bounds="[0,0][1,1]"/></hierarchy>"#;
        let nodes = parse_hierarchy(xml);
        assert!(!nodes[0].clickable);
        assert!(!nodes[0].enabled);
        assert!(!nodes[0].focusable);
    }
}
