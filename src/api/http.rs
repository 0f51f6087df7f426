use std::collections::HashMap;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::debug;

use crate::api::{ImageDetail, ImageHit, ImageryApi, RawTimestamp, SequenceImage};
use crate::geom::BBox;

/// Client for the imagery graph API.
///
/// Endpoints, relative to `base_url`:
/// - `image_ids?sequence_id=..` for the ordered ids of a sequence,
/// - `?ids=a,b,c&fields=..` for batched per-image fields keyed by id,
/// - `{id}?fields=sequence` for the owning sequence of one image,
/// - `images?bbox=..` for a bounding-box search.
#[derive(Debug, Clone)]
pub struct GraphApi {
    client: Client,
    base_url: String,
    access_token: String,
}

#[derive(Deserialize)]
struct DataList<T> { data: Vec<T> }

#[derive(Deserialize)]
struct IdOnly { id: String }

#[derive(Deserialize)]
struct PointGeometry { coordinates: [f64; 2] }

#[derive(Deserialize)]
struct GeometryFields {
    id: String,
    computed_geometry: Option<PointGeometry>,
    geometry: Option<PointGeometry>,
}

#[derive(Deserialize)]
struct Creator { username: Option<String> }

#[derive(Deserialize)]
struct DetailFields {
    id: String,
    creator: Option<Creator>,
    sequence: Option<String>,
    captured_at: Option<Value>,
    is_pano: Option<bool>,
}

#[derive(Deserialize)]
struct SequenceField { sequence: Option<String> }

#[derive(Deserialize)]
struct SearchFields {
    id: String,
    geometry: Option<PointGeometry>,
    sequence: Option<String>,
    captured_at: Option<Value>,
}

/// Interpret a JSON capture time (epoch millis number or string).
fn parse_captured_at(value: &Value) -> Option<chrono::DateTime<chrono::Utc>> {
    let raw = match value {
        Value::Number(n) => RawTimestamp::Millis(n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?),
        Value::String(s) => RawTimestamp::Text(s.clone()),
        _ => return None,
    };
    raw.parse()
}

impl GraphApi {
    pub fn new(client: Client, base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, "graph request");
        self.client.get(&url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send().await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url} returned error status"))?
            .json::<T>().await
            .with_context(|| format!("parse response of {url}"))
    }

    async fn get_by_ids<T: DeserializeOwned>(&self, ids: &[String], fields: &str) -> Result<HashMap<String, T>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.get_json("", &[("ids", ids.join(",")), ("fields", fields.to_string())]).await
    }
}

impl ImageryApi for GraphApi {
    async fn sequence_image_ids(&self, sequence_id: &str) -> Result<Vec<String>> {
        let list: DataList<IdOnly> = self.get_json("image_ids", &[("sequence_id", sequence_id.to_string())]).await?;
        Ok(list.data.into_iter().map(|i| i.id).collect())
    }

    async fn image_geometries(&self, ids: &[String]) -> Result<HashMap<String, SequenceImage>> {
        let by_id: HashMap<String, GeometryFields> = self.get_by_ids(ids, "id,computed_geometry,geometry").await?;
        Ok(by_id.into_values()
            .filter_map(|f| {
                let [lon, lat] = f.computed_geometry.or(f.geometry)?.coordinates;
                Some((f.id.clone(), SequenceImage { id: f.id, lon, lat }))
            })
            .collect())
    }

    async fn image_details(&self, ids: &[String]) -> Result<Vec<ImageDetail>> {
        let by_id: HashMap<String, DetailFields> = self.get_by_ids(ids, "id,creator,sequence,captured_at,is_pano").await?;
        Ok(by_id.into_values()
            .map(|f| ImageDetail {
                id: f.id,
                creator_username: f.creator.and_then(|c| c.username),
                sequence_id: f.sequence,
                captured_at: f.captured_at.as_ref().and_then(parse_captured_at),
                is_pano: f.is_pano,
            })
            .collect())
    }

    async fn image_sequence(&self, image_id: &str) -> Result<Option<String>> {
        let field: SequenceField = self.get_json(image_id, &[("fields", "sequence".to_string())]).await?;
        Ok(field.sequence)
    }

    async fn images_in_bbox(&self, bbox: &BBox, limit: usize) -> Result<Vec<ImageHit>> {
        let list: DataList<SearchFields> = self.get_json("images", &[
            ("fields", "id,geometry,sequence,captured_at".to_string()),
            ("bbox", bbox.to_query()),
            ("limit", limit.to_string()),
        ]).await?;
        Ok(list.data.into_iter()
            .filter_map(|f| {
                let [lon, lat] = f.geometry?.coordinates;
                Some(ImageHit {
                    id: f.id,
                    lon,
                    lat,
                    sequence_id: f.sequence,
                    captured_at: f.captured_at.as_ref().and_then(parse_captured_at),
                })
            })
            .collect())
    }
}
