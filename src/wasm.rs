use wasm_bindgen::prelude::*;

use crate::raster::{decode_capture, NoCapture};
use crate::ExportConfig;

/// Result handed back to JavaScript: the download name plus the file bytes.
#[derive(serde::Serialize)]
struct JsArtifact {
    filename: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
}

fn to_js(artifact: crate::ReportArtifact) -> Result<js_sys::Object, JsValue> {
    let meta = serde_wasm_bindgen::to_value(&JsArtifact {
        filename: artifact.filename,
        mime_type: artifact.mime_type.to_string(),
    })?;
    let object: js_sys::Object = meta.into();
    let bytes = js_sys::Uint8Array::from(artifact.bytes.as_slice());
    js_sys::Reflect::set(&object, &JsValue::from_str("bytes"), &bytes)?;
    Ok(object)
}

fn config_from(config_json: Option<String>) -> Result<ExportConfig, JsValue> {
    match config_json {
        Some(json) => ExportConfig::from_json(&json).map_err(|e| JsValue::from_str(&e.to_string())),
        None => Ok(ExportConfig::default()),
    }
}

/// Build the XLSX workbook from snapshot JSON.
#[wasm_bindgen]
pub fn export_xlsx_json(
    snapshot_json: &str,
    config_json: Option<String>,
) -> Result<js_sys::Object, JsValue> {
    let config = config_from(config_json)?;
    let snapshot =
        crate::snapshot_from_json(snapshot_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let artifact = crate::export_xlsx_snapshot(&snapshot, &config)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_js(artifact)
}

/// Build the PDF from snapshot JSON and, optionally, a PNG/JPEG capture of
/// the dashboard taken in the browser.
#[wasm_bindgen]
pub fn export_pdf_json(
    snapshot_json: &str,
    capture: Option<Vec<u8>>,
    config_json: Option<String>,
) -> Result<js_sys::Object, JsValue> {
    let config = config_from(config_json)?;
    let snapshot =
        crate::snapshot_from_json(snapshot_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let artifact = match capture {
        Some(bytes) => {
            let from_browser = move |_: &crate::ReportSurface, options: &crate::RasterOptions| {
                decode_capture(&bytes, options.background)
            };
            crate::export_pdf_snapshot(&snapshot, &from_browser, &config)
        }
        None => crate::export_pdf_snapshot(&snapshot, &NoCapture, &config),
    };
    to_js(artifact)
}
