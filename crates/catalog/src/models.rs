//! Wire models for scene search.
//!
//! Lightweight serde types for the archive's `POST /search` interface:
//! bbox/datetime/collection filtering, per-scene cloud-cover metadata,
//! band asset hrefs and pagination links.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Search request
// ---------------------------------------------------------------------------

/// Body for `POST /search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneSearchParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,

    /// Datetime range, e.g. `"2018-01-01/2018-12-31"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// Pagination token (next page).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl SceneSearchParams {
    /// Create empty search params.
    pub fn new() -> Self {
        Self {
            bbox: None,
            datetime: None,
            collections: None,
            limit: None,
            token: None,
        }
    }

    /// Set the bounding box `[west, south, east, north]`.
    pub fn bbox(mut self, bbox: [f64; 4]) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// Set the datetime range.
    pub fn datetime(mut self, dt: &str) -> Self {
        self.datetime = Some(dt.to_string());
        self
    }

    /// Set the collection filter.
    pub fn collection(mut self, id: &str) -> Self {
        self.collections = Some(vec![id.to_string()]);
        self
    }

    /// Set maximum items per page.
    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }
}

impl Default for SceneSearchParams {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// One page of scene search results.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenePage {
    pub features: Vec<SceneRef>,

    #[serde(default)]
    pub links: Vec<PageLink>,

    #[serde(rename = "numberMatched", skip_serializing_if = "Option::is_none")]
    pub number_matched: Option<u64>,
}

impl ScenePage {
    /// Find the `"next"` pagination link, if any.
    pub fn next_link(&self) -> Option<&PageLink> {
        self.links.iter().find(|l| l.rel == "next")
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// A reference to one archived scene, with the metadata the pipeline
/// filters on and the band assets it can fetch.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SceneRef {
    /// Unique scene identifier.
    pub id: String,

    /// Collection this scene belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    pub properties: SceneProperties,

    /// Band name → asset.
    pub assets: HashMap<String, SceneAsset>,
}

impl SceneRef {
    /// Reported cloud-cover percentage, if the archive published one.
    /// Scenes without the property are treated as fully cloudy by the
    /// composite builder's filter, so a missing value is never "clear".
    pub fn cloud_cover(&self) -> Option<f64> {
        self.properties.cloud_cover
    }

    /// Acquisition date parsed from the ISO datetime.
    pub fn acquired(&self) -> Option<NaiveDate> {
        let dt = self.properties.datetime.as_deref()?;
        dt.get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    }

    /// Get a band's asset by name.
    pub fn asset(&self, band: &str) -> Option<&SceneAsset> {
        self.assets.get(band)
    }
}

/// Scene metadata the service cares about; everything else rides along
/// in `extra`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SceneProperties {
    /// ISO 8601 acquisition datetime.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    /// Cloud cover percentage.
    #[serde(rename = "eo:cloud_cover", skip_serializing_if = "Option::is_none")]
    pub cloud_cover: Option<f64>,

    /// Platform name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A single band asset (file reference).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SceneAsset {
    /// URL to the asset file.
    pub href: String,

    /// Media type.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A pagination link.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PageLink {
    /// Relationship: `"self"`, `"next"`, ...
    pub rel: String,

    /// Target URL.
    pub href: String,

    /// Request body for POST-based pagination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
  "features": [
    {
      "id": "S2B_MSIL2A_20180714T022319_T50QRL",
      "collection": "sentinel-2-l2a",
      "properties": {
        "datetime": "2018-07-14T02:23:19Z",
        "eo:cloud_cover": 8.4,
        "platform": "sentinel-2b"
      },
      "assets": {
        "B3": {
          "href": "https://archive.example.com/T50QRL/B03.tif",
          "type": "image/tiff; application=geotiff"
        },
        "B8": {
          "href": "https://archive.example.com/T50QRL/B08.tif",
          "type": "image/tiff; application=geotiff"
        },
        "SCL": {
          "href": "https://archive.example.com/T50QRL/SCL.tif",
          "type": "image/tiff; application=geotiff"
        }
      }
    }
  ],
  "links": [
    {
      "rel": "next",
      "href": "https://archive.example.com/search",
      "body": {"token": "page2"}
    }
  ],
  "numberMatched": 17
}"#;

    #[test]
    fn parse_scene_page() {
        let page: ScenePage = serde_json::from_str(FIXTURE).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page.number_matched, Some(17));
        assert!(page.next_link().is_some());
    }

    #[test]
    fn scene_metadata() {
        let page: ScenePage = serde_json::from_str(FIXTURE).unwrap();
        let scene = &page.features[0];

        assert_eq!(scene.id, "S2B_MSIL2A_20180714T022319_T50QRL");
        assert_eq!(scene.collection.as_deref(), Some("sentinel-2-l2a"));
        assert!((scene.cloud_cover().unwrap() - 8.4).abs() < f64::EPSILON);
        assert_eq!(
            scene.acquired(),
            NaiveDate::from_ymd_opt(2018, 7, 14)
        );
    }

    #[test]
    fn band_asset_lookup() {
        let page: ScenePage = serde_json::from_str(FIXTURE).unwrap();
        let scene = &page.features[0];

        assert!(scene.asset("B3").is_some());
        assert!(scene.asset("SCL").is_some());
        assert!(scene.asset("B99").is_none());
        assert!(scene.asset("B8").unwrap().href.ends_with("B08.tif"));
    }

    #[test]
    fn search_params_serialize_sparsely() {
        let params = SceneSearchParams::new()
            .bbox([119.27, 23.17, 119.81, 23.88])
            .datetime("2018-01-01/2018-12-31")
            .collection("sentinel-2-l2a")
            .limit(50);

        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["datetime"], "2018-01-01/2018-12-31");
        assert_eq!(json["collections"], serde_json::json!(["sentinel-2-l2a"]));
        assert!(json.get("token").is_none());

        let empty = serde_json::to_value(SceneSearchParams::new()).unwrap();
        assert!(empty.as_object().unwrap().is_empty());
    }
}
